use anyhow::{Context, Result};
use clap::Parser;
use pivotal_tools::{
    browser::{SystemBrowser, UrlOpener},
    cli::{Cli, Commands, ShowTarget},
    error::user_friendly_error,
    poker::{PokerOutcome, PokerSession},
    project::{lookup_scope, select_project, Account, Project},
    report::{changelog, scrum, scrum_stories, show_stories, show_story, Palette},
    tracker::{backfill_strategy, NewStory, Story, TrackerClient},
    workflow::WorkflowState,
    Config,
};
use std::io::{self, IsTerminal};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    setup_logging(cli.verbose);

    if let Err(e) = run(cli) {
        error!("{:#}", e);
        user_friendly_error(&e).display();
        std::process::exit(1);
    }
}

fn setup_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    info!("Loading configuration");
    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;

    let token = config.api_token(cli.token.as_deref())?;
    let client = TrackerClient::new(token, &config.tracker)?;
    let account = Account::new(
        client,
        backfill_strategy(config.query.owner_backfill, config.query.max_workers),
        config.workflow.exit_state,
    );
    let palette = Palette::detect();
    let index = cli.project_index;

    match &cli.command {
        Commands::Changelog => {
            let project = choose_project(&account, index)?;
            print_lines(changelog(
                project.name(),
                &project.finished_stories()?,
                &project.finished_bugs()?,
                &project.open_bugs()?,
                palette,
            ));
        }
        Commands::Show {
            target: ShowTarget::Stories { for_user, number },
        } => {
            let project = choose_project(&account, index)?;
            let stories = project.open_stories(for_user.as_deref())?;
            print_lines(show_stories(&stories, *number));
        }
        Commands::Show {
            target: ShowTarget::Story { story_id },
        } => match locate_story(&account, index, *story_id)? {
            Some((_, story)) => print_lines(show_story(&story, palette)),
            None => println!("hmmm could not find story"),
        },
        Commands::Open { story_id } => match locate_story(&account, index, *story_id)? {
            Some((_, story)) => SystemBrowser.open(&story.url)?,
            None => println!("hmmm could not find story"),
        },
        Commands::Scrum {
            show_finished,
            show_delivered,
        } => {
            let project = choose_project(&account, index)?;
            let stories = scrum_stories(
                project.in_progress_stories()?,
                *show_finished,
                *show_delivered,
            );
            let bugs = project.open_bugs()?;
            let date = jiff::Zoned::now().strftime("%b %d, %Y").to_string();
            print_lines(scrum(project.name(), &date, &stories, &bugs, palette));
        }
        Commands::Poker => {
            let project = choose_project(&account, index)?;
            poker_command(&project, palette)?;
        }
        Commands::Create {
            kind,
            title,
            description,
        } => {
            let project = choose_project(&account, index)?;
            let story = NewStory::new(*kind, title.clone(), description.clone());
            project.create_story(&story)?;
            println!("Created {} '{}' in {}", kind, title, project.name());
        }
        command => {
            if let Some((state, story_id)) = command.transition() {
                transition_command(&account, index, story_id, state)?;
            }
        }
    }

    Ok(())
}

/// Resolve the active project, prompting on the terminal if needed
fn choose_project(account: &Account, index: Option<usize>) -> Result<Project<'_>> {
    let projects = account.projects()?;
    let selected = select_project(&projects, index, &mut io::stdin().lock(), &mut io::stdout())?;
    info!("Using project {} ({})", selected.name, selected.id);
    Ok(account.project(selected))
}

fn locate_story(
    account: &Account,
    index: Option<usize>,
    story_id: u64,
) -> Result<Option<(Project<'_>, Story)>> {
    let projects = account.projects()?;
    let scope = lookup_scope(&projects, index)?;
    account.find_story(story_id, &scope)
}

fn transition_command(
    account: &Account,
    index: Option<usize>,
    story_id: u64,
    state: WorkflowState,
) -> Result<()> {
    match locate_story(account, index, story_id)? {
        Some((project, story)) => {
            project.transition(story.id, state)?;
            println!(
                "Story: [{}] {} is {}",
                story.id,
                story.name,
                state.as_str().to_uppercase()
            );
        }
        None => println!("hmmm could not find story"),
    }
    Ok(())
}

fn poker_command(project: &Project<'_>, palette: Palette) -> Result<()> {
    let stdout = io::stdout();
    let interactive = stdout.is_terminal();
    let width = crossterm::terminal::size()
        .map(|(cols, _)| cols as usize)
        .unwrap_or(80);

    let outcome = PokerSession::new(io::stdin().lock(), stdout.lock(), &SystemBrowser)
        .with_palette(palette)
        .with_width(width)
        .with_clear_screen(interactive)
        .run(project)?;

    match outcome {
        PokerOutcome::Completed { estimated, skipped } => {
            info!("Poker finished: {} estimated, {} skipped", estimated, skipped)
        }
        PokerOutcome::Quit { estimated, skipped } => {
            info!("Poker quit: {} estimated, {} skipped", estimated, skipped)
        }
    }
    Ok(())
}

fn print_lines(lines: Vec<String>) {
    for line in lines {
        println!("{}", line);
    }
}

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::tracker::StoryType;
use crate::workflow::WorkflowState;

#[derive(Parser, Debug)]
#[command(
    name = "pivotal-tools",
    about = "A collection of tools to help with your Pivotal Tracker workflow",
    version,
    author
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "PIVOTAL_TOOLS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Pivotal Tracker API token
    #[arg(long, global = true, env = "PIVOTAL_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// If you have multiple projects, the 1-based position it shows up in the
    /// project prompt. Skips the prompt so output can be piped
    #[arg(long, global = true, value_name = "PI")]
    pub project_index: Option<usize>,

    /// Verbosity level (can be repeated)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List finished features and bugs, plus the bugs still open
    Changelog,

    /// Show stories for a project, or the details of one story
    Show {
        #[command(subcommand)]
        target: ShowTarget,
    },

    /// Open a story in the browser
    Open {
        story_id: u64,
    },

    /// List what each team member is working on, and the open bugs
    Scrum {
        /// Show finished (but undelivered) stories, if your workflow requires this
        #[arg(long)]
        show_finished: bool,

        /// Show delivered stories, if your workflow requires this
        #[arg(long)]
        show_delivered: bool,
    },

    /// Run a planning poker session over the unestimated stories
    #[command(alias = "planning")]
    Poker,

    /// Create a story
    Create {
        #[arg(value_enum)]
        kind: StoryType,

        title: String,

        description: Option<String>,
    },

    /// Mark a story started
    Start {
        #[command(subcommand)]
        target: StoryTarget,
    },

    /// Mark a story finished
    Finish {
        #[command(subcommand)]
        target: StoryTarget,
    },

    /// Mark a story delivered
    Deliver {
        #[command(subcommand)]
        target: StoryTarget,
    },

    /// Mark a story accepted
    Accept {
        #[command(subcommand)]
        target: StoryTarget,
    },

    /// Mark a story rejected
    Reject {
        #[command(subcommand)]
        target: StoryTarget,
    },
}

#[derive(Subcommand, Debug)]
pub enum ShowTarget {
    /// List open stories, the top 20 unless --number is given
    Stories {
        /// Username, or initials
        #[arg(long = "for", value_name = "USER_NAME")]
        for_user: Option<String>,

        /// How many stories to show
        #[arg(long)]
        number: Option<usize>,
    },

    /// Show the details for a single story
    Story { story_id: u64 },
}

#[derive(Subcommand, Debug)]
pub enum StoryTarget {
    Story { story_id: u64 },
}

impl StoryTarget {
    pub fn story_id(&self) -> u64 {
        match self {
            StoryTarget::Story { story_id } => *story_id,
        }
    }
}

impl Commands {
    /// Target state and story for the workflow transition commands
    pub fn transition(&self) -> Option<(WorkflowState, u64)> {
        let (state, target) = match self {
            Commands::Start { target } => (WorkflowState::Started, target),
            Commands::Finish { target } => (WorkflowState::Finished, target),
            Commands::Deliver { target } => (WorkflowState::Delivered, target),
            Commands::Accept { target } => (WorkflowState::Accepted, target),
            Commands::Reject { target } => (WorkflowState::Rejected, target),
            _ => return None,
        };
        Some((state, target.story_id()))
    }
}

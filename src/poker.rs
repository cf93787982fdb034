//! Interactive planning poker over a project's unestimated stories.
//!
//! The session walks the stories in order as an explicit state machine:
//!
//! ```text
//! Presenting(i) -> AwaitingInput(i) -> Applying(i, points) -> Presenting(i + 1) | Done
//!                        |  ^     \--> Skipped(i) ---------> Presenting(i + 1) | Done
//!                        \--/ (open, invalid input)
//! ```
//!
//! Quitting, or running out of input, ends the session at once.

use anyhow::{Context, Result};
use crossterm::cursor::MoveTo;
use crossterm::queue;
use crossterm::terminal::{Clear, ClearType};
use std::io::{BufRead, Write};
use tracing::{info, warn};

use crate::browser::UrlOpener;
use crate::project::Project;
use crate::report::{poker_header, story_card};
use crate::style::Palette;
use crate::tracker::{PointScale, Story};

/// One line typed at the estimate prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PokerInput {
    Skip,
    Open,
    Quit,
    Estimate(i32),
    Invalid,
}

impl PokerInput {
    /// Commands are single letters in either case; anything else must be a
    /// value on the project's point scale
    pub fn parse(raw: &str, scale: &PointScale) -> Self {
        let raw = raw.trim();
        match raw {
            "s" | "S" => PokerInput::Skip,
            "o" | "O" => PokerInput::Open,
            "q" | "Q" => PokerInput::Quit,
            _ => scale
                .estimate(raw)
                .map(PokerInput::Estimate)
                .unwrap_or(PokerInput::Invalid),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PokerState {
    Presenting(usize),
    AwaitingInput(usize),
    Applying(usize, i32),
    Skipped(usize),
    Done,
}

/// How a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PokerOutcome {
    Completed { estimated: usize, skipped: usize },
    Quit { estimated: usize, skipped: usize },
}

pub struct PokerSession<'o, R, W> {
    input: R,
    output: W,
    opener: &'o dyn UrlOpener,
    palette: Palette,
    width: usize,
    clear_screen: bool,
}

impl<'o, R: BufRead, W: Write> PokerSession<'o, R, W> {
    pub fn new(input: R, output: W, opener: &'o dyn UrlOpener) -> Self {
        PokerSession {
            input,
            output,
            opener,
            palette: Palette::plain(),
            width: 80,
            clear_screen: false,
        }
    }

    pub fn with_palette(mut self, palette: Palette) -> Self {
        self.palette = palette;
        self
    }

    /// Width of the rule under the session header
    pub fn with_width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }

    /// Clear the terminal before each story
    pub fn with_clear_screen(mut self, clear: bool) -> Self {
        self.clear_screen = clear;
        self
    }

    /// Estimate every unestimated story in the project
    pub fn run(&mut self, project: &Project<'_>) -> Result<PokerOutcome> {
        let stories = project.unestimated_stories()?;
        info!("{} stories to estimate in {}", stories.len(), project.name());
        self.run_stories(project, &stories)
    }

    fn run_stories(&mut self, project: &Project<'_>, stories: &[Story]) -> Result<PokerOutcome> {
        let total = stories.len();
        let scale = project.point_scale();
        let next = |index: usize| {
            if index + 1 < total {
                PokerState::Presenting(index + 1)
            } else {
                PokerState::Done
            }
        };

        let mut estimated = 0;
        let mut skipped = 0;
        let mut state = if total == 0 {
            PokerState::Done
        } else {
            PokerState::Presenting(0)
        };

        loop {
            state = match state {
                PokerState::Presenting(index) => {
                    self.present(project.name(), &stories[index], index + 1, total)?;
                    PokerState::AwaitingInput(index)
                }
                PokerState::AwaitingInput(index) => {
                    let Some(line) = self.prompt(scale)? else {
                        return Ok(PokerOutcome::Quit { estimated, skipped });
                    };

                    match PokerInput::parse(&line, scale) {
                        PokerInput::Quit => {
                            return Ok(PokerOutcome::Quit { estimated, skipped });
                        }
                        PokerInput::Skip => PokerState::Skipped(index),
                        PokerInput::Estimate(points) => PokerState::Applying(index, points),
                        PokerInput::Open => {
                            let story = &stories[index];
                            if let Err(e) = self.opener.open(&story.url) {
                                warn!("Could not open story #{}: {:#}", story.id, e);
                            }
                            PokerState::AwaitingInput(index)
                        }
                        PokerInput::Invalid => {
                            writeln!(self.output, "Invalid Input, Try again")?;
                            PokerState::AwaitingInput(index)
                        }
                    }
                }
                PokerState::Applying(index, points) => {
                    project.assign_estimate(stories[index].id, points)?;
                    estimated += 1;
                    next(index)
                }
                PokerState::Skipped(index) => {
                    skipped += 1;
                    next(index)
                }
                PokerState::Done => {
                    writeln!(self.output, "KaBoom!!! Nice Work Team")?;
                    return Ok(PokerOutcome::Completed { estimated, skipped });
                }
            };
        }
    }

    fn present(
        &mut self,
        project_name: &str,
        story: &Story,
        position: usize,
        total: usize,
    ) -> Result<()> {
        if self.clear_screen {
            queue!(self.output, Clear(ClearType::All), MoveTo(0, 0))
                .context("Failed to clear the terminal")?;
        }

        let lines = poker_header(project_name, position, total, self.width, self.palette)
            .into_iter()
            .chain(story_card(story, self.palette));
        for line in lines {
            writeln!(self.output, "{}", line)?;
        }

        Ok(())
    }

    /// Show the estimate prompt and read one line; `None` at end of input
    fn prompt(&mut self, scale: &PointScale) -> Result<Option<String>> {
        writeln!(self.output)?;
        writeln!(
            self.output,
            "{}",
            self.palette
                .bold(&format!("Estimate: [{}, (s)kip, (o)pen, (q)uit]", scale))
        )?;
        write!(self.output, "{}", self.palette.bold(">> "))?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line))
    }
}

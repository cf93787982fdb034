//! The fixed story workflow and the search filters derived from it.
//!
//! Pivotal Tracker moves every story through the same ordered list of
//! states. Which of those count as "open", "in progress" or "done" depends on
//! the project's configured exit state; the builders here are pure functions
//! of that boundary.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TrackerError;
use crate::tracker::StoryType;

/// One stage of the story lifecycle, declared in workflow order
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Deserialize, Serialize,
)]
#[serde(try_from = "String", into = "String")]
pub enum WorkflowState {
    #[default]
    Unscheduled,
    Unstarted,
    Rejected,
    Started,
    Finished,
    Delivered,
    Accepted,
}

impl WorkflowState {
    /// Every state, in workflow order
    pub const ALL: [WorkflowState; 7] = [
        WorkflowState::Unscheduled,
        WorkflowState::Unstarted,
        WorkflowState::Rejected,
        WorkflowState::Started,
        WorkflowState::Finished,
        WorkflowState::Delivered,
        WorkflowState::Accepted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowState::Unscheduled => "unscheduled",
            WorkflowState::Unstarted => "unstarted",
            WorkflowState::Rejected => "rejected",
            WorkflowState::Started => "started",
            WorkflowState::Finished => "finished",
            WorkflowState::Delivered => "delivered",
            WorkflowState::Accepted => "accepted",
        }
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for WorkflowState {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WorkflowState::ALL
            .into_iter()
            .find(|state| state.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                TrackerError::Configuration(format!(
                    "unknown workflow state '{}' (expected one of: {})",
                    s,
                    join_states(&WorkflowState::ALL)
                ))
            })
    }
}

impl TryFrom<String> for WorkflowState {
    type Error = TrackerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<WorkflowState> for String {
    fn from(state: WorkflowState) -> Self {
        state.as_str().to_string()
    }
}

/// A single term of the tracker search grammar
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    Type(StoryType),
    State {
        states: Vec<WorkflowState>,
        include_done: bool,
    },
    Owner(String),
    Id(u64),
    /// Renders as nothing; joined queries skip it
    Empty,
}

impl Filter {
    /// A state term with no states cannot match any story
    pub fn matches_nothing(&self) -> bool {
        matches!(self, Filter::State { states, .. } if states.is_empty())
    }

    fn is_empty(&self) -> bool {
        matches!(self, Filter::Empty)
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Type(story_type) => write!(f, "type:{}", story_type),
            Filter::State {
                states,
                include_done,
            } => {
                write!(f, "state:{}", join_states(states))?;
                if *include_done {
                    f.write_str(" includedone:true")?;
                }
                Ok(())
            }
            Filter::Owner(owner) => write!(f, "owner:{}", owner),
            Filter::Id(id) => write!(f, "id:{}", id),
            Filter::Empty => Ok(()),
        }
    }
}

/// States strictly before the exit state
pub fn filter_open(exit: WorkflowState) -> Filter {
    Filter::State {
        states: states_where(|state| state < exit),
        include_done: false,
    }
}

/// States from `rejected` up to, but excluding, the exit state
pub fn filter_in_progress(exit: WorkflowState) -> Filter {
    Filter::State {
        states: states_where(|state| state >= WorkflowState::Rejected && state < exit),
        include_done: false,
    }
}

/// The exit state and everything after it, including archived stories
pub fn filter_done(exit: WorkflowState) -> Filter {
    Filter::State {
        states: states_where(|state| state >= exit),
        include_done: true,
    }
}

/// Owner name or initials; the tracker resolves which
pub fn filter_owner(owner: Option<&str>) -> Filter {
    match owner.map(str::trim) {
        Some(owner) if !owner.is_empty() => Filter::Owner(owner.to_string()),
        _ => Filter::Empty,
    }
}

/// Join filter terms into one search string, dropping empty terms
pub fn join_filters(filters: &[Filter]) -> String {
    filters
        .iter()
        .filter(|filter| !filter.is_empty())
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

fn states_where(keep: impl Fn(WorkflowState) -> bool) -> Vec<WorkflowState> {
    WorkflowState::ALL.into_iter().filter(|s| keep(*s)).collect()
}

fn join_states(states: &[WorkflowState]) -> String {
    states
        .iter()
        .map(WorkflowState::as_str)
        .collect::<Vec<_>>()
        .join(",")
}

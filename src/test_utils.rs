//! Test utilities for pivotal-tools
#![cfg(test)]

use crate::project::Account;
use crate::tracker::{
    MockTracker, Person, PointScale, ProjectInfo, SequentialBackfill, Story, StoryType,
    TrackerClient,
};
use crate::workflow::WorkflowState;

/// Create an account backed by a mock tracker
pub fn mock_account(mock: MockTracker, exit: WorkflowState) -> Account {
    Account::new(TrackerClient::Mock(mock), Box::new(SequentialBackfill), exit)
}

pub fn project_info(id: u64, name: &str) -> ProjectInfo {
    ProjectInfo {
        id,
        name: name.to_string(),
        point_scale: PointScale::default(),
    }
}

pub fn person(id: u64, name: &str, initials: &str) -> Person {
    Person {
        id,
        name: name.to_string(),
        initials: initials.to_string(),
        username: None,
    }
}

/// Create a bare story
pub fn story(id: u64, name: &str, story_type: StoryType, state: WorkflowState) -> Story {
    Story {
        id,
        name: name.to_string(),
        story_type,
        current_state: state.into(),
        url: format!("https://www.pivotaltracker.com/story/show/{}", id),
        ..Default::default()
    }
}

/// Create a story whose owners were listed by id only
pub fn story_owned_by_ids(id: u64, owner_ids: &[u64]) -> Story {
    let mut story = story(id, &format!("Story {}", id), StoryType::Feature, WorkflowState::Started);
    story.owner_ids = owner_ids.to_vec();
    story
}

/// The story most report tests render
pub fn sample_story() -> Story {
    Story {
        id: 42,
        project_id: None,
        name: "Føø".to_string(),
        description: Some("Føø is a thing".to_string()),
        story_type: StoryType::Bug,
        current_state: WorkflowState::Started.into(),
        estimate: Some(1),
        owner_ids: vec![1],
        owners: vec![person(1, "Some Pørson", "SP")],
        url: "http://example.com".to_string(),
        ..Default::default()
    }
}

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::workflow::WorkflowState;

/// Represents a Pivotal Tracker story
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Story {
    pub id: u64,
    #[serde(default)]
    pub project_id: Option<u64>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub story_type: StoryType,
    pub current_state: StoryState,
    /// Points, or `-1` / absent while unestimated
    #[serde(default, deserialize_with = "estimate_from_number")]
    pub estimate: Option<i32>,
    #[serde(default)]
    pub owner_ids: Vec<u64>,
    #[serde(default)]
    pub owners: Vec<Person>,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub url: String,
}

impl Story {
    pub fn is_estimated(&self) -> bool {
        matches!(self.estimate, Some(points) if points >= 0)
    }

    /// First label name, or empty when unlabelled
    pub fn primary_label(&self) -> &str {
        self.labels.first().map(|l| l.name.as_str()).unwrap_or("")
    }

    pub fn first_owner(&self) -> Option<&Person> {
        self.owners.first()
    }

    pub fn owner_initials(&self) -> String {
        self.owners
            .iter()
            .map(|owner| owner.initials.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn attachments(&self) -> impl Iterator<Item = &Attachment> {
        self.comments.iter().flat_map(|c| c.file_attachments.iter())
    }
}

/// The tracker sends estimates as JSON numbers that may carry a fraction
fn estimate_from_number<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<f64>::deserialize(deserializer)?;
    Ok(value.map(|points| points.round() as i32))
}

/// Story kind
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum StoryType {
    #[default]
    Feature,
    Bug,
    Chore,
    #[value(skip)]
    Release,
}

impl StoryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoryType::Feature => "feature",
            StoryType::Bug => "bug",
            StoryType::Chore => "chore",
            StoryType::Release => "release",
        }
    }
}

impl fmt::Display for StoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A story's `current_state` as the tracker reports it.
///
/// States outside the workflow (`planned` on some project types) are kept
/// verbatim and sort after every workflow state.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum StoryState {
    Workflow(WorkflowState),
    Other(String),
}

impl StoryState {
    pub fn as_str(&self) -> &str {
        match self {
            StoryState::Workflow(state) => state.as_str(),
            StoryState::Other(raw) => raw,
        }
    }

    pub fn workflow(&self) -> Option<WorkflowState> {
        match self {
            StoryState::Workflow(state) => Some(*state),
            StoryState::Other(_) => None,
        }
    }
}

impl Default for StoryState {
    fn default() -> Self {
        StoryState::Workflow(WorkflowState::default())
    }
}

impl From<WorkflowState> for StoryState {
    fn from(state: WorkflowState) -> Self {
        StoryState::Workflow(state)
    }
}

impl From<String> for StoryState {
    fn from(raw: String) -> Self {
        match raw.parse() {
            Ok(state) => StoryState::Workflow(state),
            Err(_) => StoryState::Other(raw),
        }
    }
}

impl From<StoryState> for String {
    fn from(state: StoryState) -> Self {
        match state {
            StoryState::Workflow(state) => state.as_str().to_string(),
            StoryState::Other(raw) => raw,
        }
    }
}

impl PartialEq<WorkflowState> for StoryState {
    fn eq(&self, other: &WorkflowState) -> bool {
        self.workflow() == Some(*other)
    }
}

impl fmt::Display for StoryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A tracker account member
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Person {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub initials: String,
    #[serde(default)]
    pub username: Option<String>,
}

/// Label on a story
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Label {
    #[serde(default)]
    pub id: Option<u64>,
    pub name: String,
}

/// Represents a comment on a story
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Comment {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub person: Option<Person>,
    #[serde(default)]
    pub file_attachments: Vec<Attachment>,
}

/// File attached to a comment
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Attachment {
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub download_url: Option<String>,
}

/// A task on a story
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Task {
    pub description: String,
    #[serde(default)]
    pub complete: bool,
}

/// Project information as listed by the tracker
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProjectInfo {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub point_scale: PointScale,
}

/// The estimate values a project accepts, in the project's order
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub struct PointScale(Vec<String>);

impl PointScale {
    pub fn values(&self) -> &[String] {
        &self.0
    }

    pub fn contains(&self, value: &str) -> bool {
        self.0.iter().any(|v| v == value)
    }

    /// Parse an estimate, accepting only values on this scale
    pub fn estimate(&self, value: &str) -> Option<i32> {
        let value = value.trim();
        if !self.contains(value) {
            return None;
        }
        value
            .parse::<f64>()
            .ok()
            .map(|points| points.round() as i32)
    }
}

impl Default for PointScale {
    fn default() -> Self {
        PointScale::from("0,1,2,3,5,8".to_string())
    }
}

impl From<String> for PointScale {
    fn from(raw: String) -> Self {
        PointScale(
            raw.split(',')
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }
}

impl From<PointScale> for String {
    fn from(scale: PointScale) -> Self {
        scale.to_string()
    }
}

impl fmt::Display for PointScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(","))
    }
}

/// Body of a story-creation request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewStory {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub story_type: String,
}

impl NewStory {
    pub fn new(story_type: StoryType, name: impl Into<String>, description: Option<String>) -> Self {
        NewStory {
            name: name.into(),
            description: description.filter(|d| !d.trim().is_empty()),
            story_type: story_type.as_str().to_string(),
        }
    }

    /// Serialize as the `<story>` XML document the create endpoint accepts
    pub fn to_xml(&self) -> anyhow::Result<String> {
        Ok(quick_xml::se::to_string_with_root("story", self)?)
    }
}

/// A single-field change applied with a bodiless PUT
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoryUpdate {
    State(WorkflowState),
    Estimate(i32),
}

impl StoryUpdate {
    pub fn query_pair(&self) -> (&'static str, String) {
        match self {
            StoryUpdate::State(state) => ("current_state", state.to_string()),
            StoryUpdate::Estimate(points) => ("estimate", points.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_story_deserialization() {
        let json = r#"{
            "kind": "story",
            "id": 555,
            "project_id": 99,
            "name": "Ship it",
            "story_type": "feature",
            "current_state": "started",
            "estimate": 2.0,
            "owner_ids": [7],
            "owners": [{"kind": "person", "id": 7, "name": "Some Person", "initials": "SP"}],
            "labels": [{"id": 1, "name": "api"}, {"id": 2, "name": "backend"}],
            "comments": [{
                "id": 3,
                "text": "see screenshot",
                "person": {"id": 7, "name": "Some Person", "initials": "SP"},
                "file_attachments": [{"filename": "shot.png", "download_url": "/file_attachments/1/download"}]
            }],
            "tasks": [{"description": "write docs", "complete": true}],
            "url": "https://www.pivotaltracker.com/story/show/555"
        }"#;

        let story: Story = serde_json::from_str(json).unwrap();
        assert_eq!(story.id, 555);
        assert_eq!(story.story_type, StoryType::Feature);
        assert_eq!(story.current_state, WorkflowState::Started);
        assert_eq!(story.estimate, Some(2));
        assert_eq!(story.primary_label(), "api");
        assert_eq!(story.owner_initials(), "SP");
        assert_eq!(story.attachments().count(), 1);
        assert!(story.tasks[0].complete);
    }

    #[test]
    fn test_sparse_story_defaults() {
        let json = r#"{"id": 1, "name": "bare", "story_type": "chore", "current_state": "unscheduled"}"#;
        let story: Story = serde_json::from_str(json).unwrap();

        assert!(story.owners.is_empty());
        assert!(story.labels.is_empty());
        assert_eq!(story.primary_label(), "");
        assert!(!story.is_estimated());
    }

    #[test]
    fn test_state_outside_the_workflow_is_kept() {
        let json = r#"[
            {"id": 1, "name": "in flight", "story_type": "feature", "current_state": "started"},
            {"id": 2, "name": "later", "story_type": "feature", "current_state": "planned"}
        ]"#;
        let stories: Vec<Story> = serde_json::from_str(json).unwrap();

        assert_eq!(stories.len(), 2);
        assert_eq!(stories[0].current_state, WorkflowState::Started);
        assert_eq!(stories[1].current_state, StoryState::Other("planned".to_string()));
        assert_eq!(stories[1].current_state.workflow(), None);
        assert_eq!(format!("{:<9}|", stories[1].current_state), "planned  |");
        assert!(stories[1].current_state > StoryState::from(WorkflowState::Accepted));
        assert_eq!(
            serde_json::to_string(&stories[1].current_state).unwrap(),
            "\"planned\""
        );
    }

    #[test]
    fn test_unestimated_marker() {
        let mut story = Story {
            estimate: Some(-1),
            ..Default::default()
        };
        assert!(!story.is_estimated());

        story.estimate = Some(0);
        assert!(story.is_estimated());
    }

    #[test]
    fn test_point_scale() {
        let scale = PointScale::from("0,1,2,3,5,8".to_string());

        assert_eq!(scale.values().len(), 6);
        assert!(scale.contains("5"));
        assert!(!scale.contains("4"));
        assert_eq!(scale.estimate("3"), Some(3));
        assert_eq!(scale.estimate(" 8 "), Some(8));
        assert_eq!(scale.estimate("4"), None);
        assert_eq!(scale.estimate("s"), None);
        assert_eq!(scale.to_string(), "0,1,2,3,5,8");
    }

    #[test]
    fn test_project_info_point_scale() {
        let json = r#"{"id": 12, "name": "Test", "point_scale": "0,1,2,4,8"}"#;
        let project: ProjectInfo = serde_json::from_str(json).unwrap();

        assert!(project.point_scale.contains("4"));
        assert!(!project.point_scale.contains("3"));
    }

    #[test]
    fn test_new_story_xml() {
        let story = NewStory::new(StoryType::Bug, "Broken & sad", Some("It <crashes>".to_string()));
        let xml = story.to_xml().unwrap();

        assert!(xml.starts_with("<story>"));
        assert!(xml.contains("<name>Broken &amp; sad</name>"));
        assert!(xml.contains("<description>It &lt;crashes"));
        assert!(xml.contains("<story_type>bug</story_type>"));
        assert!(xml.ends_with("</story>"));
    }

    #[test]
    fn test_new_story_without_description() {
        let story = NewStory::new(StoryType::Chore, "Tidy up", Some("  ".to_string()));
        let xml = story.to_xml().unwrap();

        assert!(story.description.is_none());
        assert!(!xml.contains("description"));
    }

    #[test]
    fn test_story_update_query() {
        assert_eq!(
            StoryUpdate::State(WorkflowState::Delivered).query_pair(),
            ("current_state", "delivered".to_string())
        );
        assert_eq!(StoryUpdate::Estimate(3).query_pair(), ("estimate", "3".to_string()));
    }
}

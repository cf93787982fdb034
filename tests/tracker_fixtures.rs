use pivotal_tools::report::{changelog, scrum, scrum_stories, show_stories, show_story, Palette};
use pivotal_tools::tracker::{ProjectInfo, Story, StoryType};
use pivotal_tools::WorkflowState;

// Integration tests render fixture data through the public API
// Query behaviour against the mock tracker lives in the unit tests

fn fixture_stories() -> Vec<Story> {
    let stories_json = include_str!("../fixtures/tracker/stories.json");
    serde_json::from_str(stories_json).unwrap()
}

#[test]
fn test_fixture_deserialization() {
    let stories = fixture_stories();

    assert_eq!(stories.len(), 4);
    assert_eq!(stories[0].id, 561);
    assert_eq!(stories[0].current_state, WorkflowState::Started);
    assert_eq!(stories[0].owner_initials(), "AL");
    assert_eq!(stories[1].estimate, Some(1));
    assert_eq!(stories[2].story_type, StoryType::Bug);
    assert!(!stories[3].is_estimated());
    // Owners listed by id but never expanded
    assert_eq!(stories[3].owner_ids, vec![7]);
    assert!(stories[3].owners.is_empty());

    let projects_json = include_str!("../fixtures/tracker/projects.json");
    let projects: Vec<ProjectInfo> = serde_json::from_str(projects_json).unwrap();

    assert_eq!(projects.len(), 2);
    assert_eq!(projects[0].name, "Ledger");
    assert!(projects[1].point_scale.contains("16"));
    assert_eq!(projects[1].point_scale.estimate("3"), None);
}

#[test]
fn test_show_stories_from_fixture() {
    let lines = show_stories(&fixture_stories(), Some(10));

    assert_eq!(
        lines,
        vec![
            "#561          AL  feature  started      [***     ] Export reports as CSV",
            "#562          GH  feature  delivered    [*       ] Remember last selected project",
            "#563              bug      unstarted    [        ] Login fails with expired cookie",
            "#564              feature  finished     [        ] Retry flaky uploads",
        ]
    );
}

#[test]
fn test_show_story_from_fixture() {
    let story = &fixture_stories()[0];
    let lines = show_story(story, Palette::plain());

    insta::assert_snapshot!(lines.join("\n"), @r"
    #561        AL  feature  [***     ] Export reports as CSV

    Story Url: https://www.pivotaltracker.com/story/show/561
    Description: Accounting wants spreadsheets

    Comments:
    [GH] Use the same column order as the web view

    Tasks:
    [X] Pick a CSV crate
    [ ] Wire up the download button
    ");
}

#[test]
fn test_scrum_from_fixture() {
    let stories: Vec<Story> = fixture_stories()
        .into_iter()
        .filter(|s| s.story_type == StoryType::Feature)
        .collect();
    let bugs: Vec<Story> = fixture_stories()
        .into_iter()
        .filter(|s| s.story_type == StoryType::Bug)
        .collect();

    let visible = scrum_stories(stories, false, true);
    let lines = scrum("Ledger", "Oct 27, 2013", &visible, &bugs, Palette::plain());

    insta::assert_snapshot!(lines.join("\n"), @r"
    Ledger SCRUM -- Oct 27, 2013

    Ada Lovelace
       #561         [***     ] feature Export reports as CSV

    Grace Hopper
       #562         [*       ] feature delivered: Remember last selected project

    Bugs
       #563               Login fails with expired cookie
    ");
}

#[test]
fn test_changelog_from_fixture() {
    let stories = fixture_stories();
    let features: Vec<Story> = stories
        .iter()
        .filter(|s| s.story_type == StoryType::Feature)
        .cloned()
        .collect();
    let bugs: Vec<Story> = stories
        .iter()
        .filter(|s| s.story_type == StoryType::Bug)
        .cloned()
        .collect();

    let lines = changelog("Ledger", &features, &[], &bugs, Palette::plain());

    assert!(lines.contains(&"Reporting".to_string()));
    assert!(lines.contains(&"Other".to_string()));
    assert!(lines.contains(&"    * [561]          Export reports as CSV".to_string()));
    assert!(lines.contains(&"* [563]          [auth, web] Login fails with expired cookie".to_string()));
}

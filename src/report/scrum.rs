use crate::report::{estimate_visual, group_in_order, Palette};
use crate::tracker::Story;
use crate::workflow::WorkflowState;

/// Daily standup board: in-progress stories per owner, then open bugs
pub fn scrum(
    project_name: &str,
    date: &str,
    stories: &[Story],
    bugs: &[Story],
    palette: Palette,
) -> Vec<String> {
    let mut lines = vec![
        palette.bold(&format!("{} SCRUM -- {}", project_name, date)),
        String::new(),
    ];

    let by_owner = group_in_order(stories, |story| {
        story.first_owner().map(|owner| owner.name.as_str())
    });

    for (owner, stories) in by_owner {
        lines.push(palette.bold(owner));
        for story in stories {
            let name = match story.current_state.workflow() {
                Some(WorkflowState::Finished | WorkflowState::Delivered) => format!(
                    "{}: {}",
                    palette.bold(story.current_state.as_str()),
                    story.name
                ),
                _ => story.name.clone(),
            };
            lines.push(format!(
                "   #{:<12}{:<9} {:<7} {}",
                story.id,
                estimate_visual(story.estimate),
                story.story_type,
                name
            ));
        }
        lines.push(String::new());
    }

    lines.push(palette.bold("Bugs"));
    if bugs.is_empty() {
        lines.push("Not sure that I believe it, but there are no bugs".to_string());
    }
    for bug in bugs {
        let initials = bug.first_owner().map(|p| p.initials.as_str()).unwrap_or("");
        lines.push(format!("   #{:<12} {:<4} {}", bug.id, initials, bug.name));
    }

    lines
}

/// Drop finished and delivered stories unless the team's workflow wants them
pub fn scrum_stories(stories: Vec<Story>, show_finished: bool, show_delivered: bool) -> Vec<Story> {
    stories
        .into_iter()
        .filter(|story| match story.current_state.workflow() {
            Some(WorkflowState::Finished) => show_finished,
            Some(WorkflowState::Delivered) => show_delivered,
            _ => true,
        })
        .collect()
}

use crate::report::{group_in_order, title_case, Palette};
use crate::tracker::Story;

/// Release notes for a project: new features grouped by label, fixed bugs,
/// and the bugs still open
pub fn changelog(
    project_name: &str,
    features: &[Story],
    bugs_fixed: &[Story],
    known_issues: &[Story],
    palette: Palette,
) -> Vec<String> {
    let title = format!("Change Log {}", project_name);

    let mut lines = vec![
        String::new(),
        palette.bold(&title),
        palette.bold(&"=".repeat(title.chars().count())),
        String::new(),
        palette.bold("New Features"),
        palette.bold("============"),
    ];

    for (label, stories) in group_in_order(features, |story| Some(story.primary_label())) {
        let heading = if label.is_empty() { "Other" } else { label };
        lines.push(palette.bold(&title_case(heading)));
        for story in stories {
            lines.push(format!("    * {:<14} {}", format!("[{}]", story.id), story.name));
        }
    }

    lines.push(String::new());
    lines.push(palette.bold("Bugs Fixed"));
    lines.push(palette.bold("=========="));
    push_labelled(&mut lines, bugs_fixed);

    lines.push(String::new());
    lines.push(palette.bold("Known Issues"));
    lines.push(palette.bold("=========="));
    push_labelled(&mut lines, known_issues);

    lines.push(String::new());
    lines
}

fn push_labelled(lines: &mut Vec<String>, stories: &[Story]) {
    if stories.is_empty() {
        lines.push("None".to_string());
        lines.push(String::new());
        return;
    }

    for story in stories {
        let mut text = String::new();
        if !story.labels.is_empty() {
            let labels: Vec<&str> = story.labels.iter().map(|l| l.name.as_str()).collect();
            text.push_str(&format!("[{}] ", labels.join(", ")));
        }
        text.push_str(&story.name);

        lines.push(format!("* {:<14} {}", format!("[{}]", story.id), text));
    }
}

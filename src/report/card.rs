use crate::report::{x_or_space, Palette};
use crate::tracker::Story;

/// Session banner plus a rule spanning the terminal
pub fn poker_header(
    project_name: &str,
    position: usize,
    total: usize,
    width: usize,
    palette: Palette,
) -> Vec<String> {
    vec![
        format!(
            "{} PLANNING POKER SESSION [{}]",
            project_name.to_uppercase(),
            palette.bold(&format!("{}/{} Stories Estimated", position, total))
        ),
        "-".repeat(width),
    ]
}

/// Everything the team needs to estimate a story
pub fn story_card(story: &Story, palette: Palette) -> Vec<String> {
    let mut lines = vec![palette.bold(&story.name)];

    if let Some(description) = story.description.as_deref().filter(|d| !d.is_empty()) {
        lines.push(String::new());
        lines.push(description.to_string());
        lines.push(String::new());
    }

    if !story.comments.is_empty() {
        lines.push(String::new());
        lines.push(palette.bold("Notes:"));
        for comment in &story.comments {
            lines.push(format!(
                "[{}] {}",
                comment.person.as_ref().map(|p| p.initials.as_str()).unwrap_or(""),
                comment.text.as_deref().unwrap_or("")
            ));
        }
    }

    let attachments: Vec<_> = story.attachments().collect();
    if !attachments.is_empty() {
        lines.push(String::new());
        lines.push(palette.bold("Attachments:"));
        for attachment in attachments {
            if !attachment.filename.is_empty() {
                lines.push(format!("Description: {}", attachment.filename));
            }
            if let Some(url) = &attachment.download_url {
                lines.push(format!("Url: {}", palette.link(url)));
            }
        }
    }

    if !story.tasks.is_empty() {
        lines.push(String::new());
        lines.push(palette.bold("Tasks:"));
        for task in &story.tasks {
            lines.push(format!("[{}] {}", x_or_space(task.complete), task.description));
        }
    }

    if !story.labels.is_empty() {
        let labels: Vec<&str> = story.labels.iter().map(|l| l.name.as_str()).collect();
        lines.push(String::new());
        lines.push(format!("{} {}", palette.bold("Labels:"), labels.join(", ")));
    }

    lines
}

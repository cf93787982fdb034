use crate::report::{estimate_visual, x_or_space, Palette};
use crate::tracker::Story;

/// Rows shown by `show stories` without `--number`
pub const DEFAULT_STORY_LIMIT: usize = 20;

/// One line per story, preceded by a hint when no explicit limit was given
pub fn show_stories(stories: &[Story], limit: Option<usize>) -> Vec<String> {
    let mut lines = Vec::new();

    if limit.is_none() {
        lines.push(String::new());
        lines.push(format!(
            "Showing the top {} stories, if you want to show more, specify number with the --number option",
            DEFAULT_STORY_LIMIT
        ));
        lines.push(String::new());
    }

    if stories.is_empty() {
        lines.push("None".to_string());
        return lines;
    }

    for story in stories.iter().take(limit.unwrap_or(DEFAULT_STORY_LIMIT)) {
        let initials = story.first_owner().map(|p| p.initials.as_str()).unwrap_or("");
        lines.push(format!(
            "{:<14}{:<4}{:<9}{:<13}{:<10} {}",
            format!("#{}", story.id),
            initials,
            story.story_type,
            story.current_state,
            estimate_visual(story.estimate),
            story.name
        ));
    }

    lines
}

/// Story detail view
pub fn show_story(story: &Story, palette: Palette) -> Vec<String> {
    let mut lines = vec![
        palette.bold(&format!(
            "{:<12}{:<4}{:<9}{:<10} {}",
            format!("#{}", story.id),
            story.owner_initials(),
            story.story_type,
            estimate_visual(story.estimate),
            story.name
        )),
        String::new(),
        format!("{}{}", palette.bold("Story Url: "), palette.link(&story.url)),
        format!(
            "{}{}",
            palette.bold("Description: "),
            story.description.as_deref().unwrap_or("")
        ),
    ];

    if !story.comments.is_empty() {
        lines.push(String::new());
        lines.push(palette.bold("Comments:"));
        for comment in &story.comments {
            lines.push(format!(
                "[{}] {}",
                comment.person.as_ref().map(|p| p.initials.as_str()).unwrap_or(""),
                comment.text.as_deref().unwrap_or("")
            ));
        }
    }

    if !story.tasks.is_empty() {
        lines.push(String::new());
        lines.push(palette.bold("Tasks:"));
        for task in &story.tasks {
            lines.push(format!("[{}] {}", x_or_space(task.complete), task.description));
        }
    }

    lines.push(String::new());
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{person, sample_story};
    use crate::tracker::{Comment, StoryState, Task};

    #[test]
    fn test_show_stories_line() {
        let lines = show_stories(&[sample_story()], Some(2));

        assert_eq!(
            lines,
            vec!["#42           SP  bug      started      [*       ] Føø"]
        );
    }

    #[test]
    fn test_show_stories_planned_state() {
        let story = Story {
            current_state: StoryState::Other("planned".to_string()),
            ..sample_story()
        };

        assert_eq!(
            show_stories(&[story], Some(1)),
            vec!["#42           SP  bug      planned      [*       ] Føø"]
        );
    }

    #[test]
    fn test_show_stories_hint_without_limit() {
        let lines = show_stories(&[sample_story()], None);

        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "");
        assert!(lines[1].starts_with("Showing the top 20 stories"));
        assert_eq!(lines[2], "");
    }

    #[test]
    fn test_show_stories_limit() {
        let stories: Vec<Story> = (1..=5)
            .map(|id| Story {
                id,
                ..sample_story()
            })
            .collect();

        assert_eq!(show_stories(&stories, Some(3)).len(), 3);
        assert_eq!(show_stories(&stories, Some(0)).len(), 0);
    }

    #[test]
    fn test_show_stories_empty() {
        assert_eq!(show_stories(&[], Some(5)), vec!["None"]);
    }

    #[test]
    fn test_show_story_plain() {
        let mut story = sample_story();
        story.comments.push(Comment {
            id: Some(1),
            text: Some("Looks good".to_string()),
            person: Some(person(1, "Some Pørson", "SP")),
            file_attachments: vec![],
        });
        story.tasks.push(Task {
            description: "Write tests".to_string(),
            complete: true,
        });
        story.tasks.push(Task {
            description: "Ship".to_string(),
            complete: false,
        });

        let lines = show_story(&story, Palette::plain());

        insta::assert_snapshot!(lines.join("\n"), @r"
        #42         SP  bug      [*       ] Føø

        Story Url: http://example.com
        Description: Føø is a thing

        Comments:
        [SP] Looks good

        Tasks:
        [X] Write tests
        [ ] Ship
        ");
    }

    #[test]
    fn test_show_story_styled_header() {
        let lines = show_story(&sample_story(), Palette::ansi());

        assert!(lines[0].starts_with("\x1b[1m\x1b[37m#42"));
        assert_eq!(
            lines[2],
            "\x1b[1m\x1b[37mStory Url: \x1b[0m\x1b[4m\x1b[34mhttp://example.com\x1b[0m"
        );
        assert_eq!(lines.last().map(String::as_str), Some(""));
    }
}

//! Plain-text report views.
//!
//! Every renderer is a pure function from stories to output lines. Styling
//! goes through a [`Palette`] and dates are passed in, so the same input
//! always renders the same lines.

use crate::tracker::Story;

mod card;
mod changelog;
mod scrum;
mod stories;

pub use card::{poker_header, story_card};
pub use changelog::changelog;
pub use scrum::{scrum, scrum_stories};
pub use stories::{show_stories, show_story, DEFAULT_STORY_LIMIT};

pub use crate::style::Palette;

/// Estimate as a bar of stars, `[**      ]`
pub fn estimate_visual(estimate: Option<i32>) -> String {
    match estimate {
        Some(points) if points >= 0 => format!("[{:<8}]", "*".repeat(points as usize)),
        _ => format!("[{:8}]", ""),
    }
}

pub fn x_or_space(complete: bool) -> &'static str {
    if complete {
        "X"
    } else {
        " "
    }
}

/// Capitalize the first letter of every word, lowercase the rest
pub fn title_case(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut word_start = true;

    for c in text.chars() {
        if word_start {
            result.extend(c.to_uppercase());
        } else {
            result.extend(c.to_lowercase());
        }
        word_start = !c.is_alphabetic();
    }

    result
}

/// Group stories by key, keeping groups and members in first-seen order.
/// Stories without a key are left out.
fn group_in_order<'a, K, F>(stories: &'a [Story], key: F) -> Vec<(K, Vec<&'a Story>)>
where
    K: PartialEq,
    F: Fn(&'a Story) -> Option<K>,
{
    let mut groups: Vec<(K, Vec<&'a Story>)> = Vec::new();

    for story in stories {
        let Some(key) = key(story) else {
            continue;
        };
        match groups.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, members)) => members.push(story),
            None => groups.push((key, vec![story])),
        }
    }

    groups
}

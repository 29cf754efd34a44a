//! Display helpers shared by every page that renders cached site data.

use std::borrow::Cow;
use std::collections::HashMap;

use time::{format_description::FormatItem, macros::format_description};

use crate::domain::{BlobRef, BlogPost, ContentSection, DomainError, Timestamp};

pub const HUMAN_DATE_FORMAT: &[FormatItem<'static>] =
    format_description!("[month repr:long] [day padding:none], [year]");
pub const MONTH_LABEL_FORMAT: &[FormatItem<'static>] =
    format_description!("[month repr:long] [year]");

pub const PROFILE_PLACEHOLDER: &str = "/assets/generated/profile-picture.dim_400x400.png";
pub const ACHIEVEMENT_PLACEHOLDER: &str =
    "/assets/generated/achievement-placeholder.dim_600x400.png";
pub const AI_AVATAR_PLACEHOLDER: &str = "/assets/generated/ai-assistant-avatar.dim_200x200.png";

/// "January 5, 2024".
pub fn date_label(timestamp: Timestamp) -> Result<String, DomainError> {
    format_with(timestamp, HUMAN_DATE_FORMAT)
}

/// "January 2024".
pub fn month_label(timestamp: Timestamp) -> Result<String, DomainError> {
    format_with(timestamp, MONTH_LABEL_FORMAT)
}

fn format_with(
    timestamp: Timestamp,
    format: &[FormatItem<'static>],
) -> Result<String, DomainError> {
    timestamp
        .calendar_date()?
        .format(format)
        .map_err(|err| DomainError::validation(format!("failed to format date: {err}")))
}

/// Image source for an optional attachment. The placeholder is used only when
/// no image is attached at all.
pub fn image_src<'a>(image: Option<&'a BlobRef>, placeholder: &'static str) -> Cow<'a, str> {
    match image {
        Some(blob) => blob.direct_url(),
        None => Cow::Borrowed(placeholder),
    }
}

/// Content split into paragraphs on blank lines.
pub fn paragraphs(content: &str) -> Vec<&str> {
    content
        .split("\n\n")
        .map(str::trim)
        .filter(|paragraph| !paragraph.is_empty())
        .collect()
}

/// Sections listed in `order` first, in that order, then the rest in backend order.
/// Unknown ids in `order` are ignored.
pub fn order_sections<'a>(
    sections: &'a [ContentSection],
    order: &[String],
) -> Vec<&'a ContentSection> {
    let rank: HashMap<&str, usize> = order
        .iter()
        .enumerate()
        .rev()
        .map(|(index, id)| (id.as_str(), index))
        .collect();

    let mut ordered: Vec<_> = sections.iter().collect();
    ordered.sort_by_key(|section| rank.get(section.id.as_str()).copied().unwrap_or(usize::MAX));
    ordered
}

/// Parse the comma-separated section order typed into the settings form.
pub fn parse_section_order(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

/// Newest publication first; posts sharing a date keep backend order.
pub fn posts_newest_first(posts: &[BlogPost]) -> Vec<&BlogPost> {
    let mut ordered: Vec<_> = posts.iter().collect();
    ordered.sort_by(|a, b| b.publication_date.cmp(&a.publication_date));
    ordered
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use super::*;

    fn section(id: &str) -> ContentSection {
        ContentSection {
            id: id.to_string(),
            title: id.to_uppercase(),
            content: String::new(),
            image: None,
        }
    }

    fn post(id: &str, millis: i64) -> BlogPost {
        BlogPost {
            id: id.to_string(),
            title: id.to_string(),
            content: String::new(),
            publication_date: Timestamp::from_millis(millis),
            featured_image: None,
        }
    }

    #[test]
    fn labels_use_long_month_names() {
        let ts = Timestamp::from_date(date!(2024 - 01 - 05));
        assert_eq!(date_label(ts).expect("label"), "January 5, 2024");
        assert_eq!(month_label(ts).expect("label"), "January 2024");
    }

    #[test]
    fn listed_sections_come_first_then_backend_order() {
        let sections = vec![section("a"), section("b"), section("c"), section("d")];
        let order = vec!["c".to_string(), "missing".to_string(), "a".to_string()];

        let ids: Vec<_> = order_sections(&sections, &order)
            .into_iter()
            .map(|s| s.id.as_str())
            .collect();
        assert_eq!(ids, ["c", "a", "b", "d"]);
    }

    #[test]
    fn empty_order_keeps_backend_order() {
        let sections = vec![section("x"), section("y")];
        let ids: Vec<_> = order_sections(&sections, &[])
            .into_iter()
            .map(|s| s.id.as_str())
            .collect();
        assert_eq!(ids, ["x", "y"]);
    }

    #[test]
    fn section_order_form_value_is_trimmed() {
        assert_eq!(
            parse_section_order(" about, skills ,, contact "),
            vec!["about", "skills", "contact"]
        );
    }

    #[test]
    fn posts_sort_newest_first_stably() {
        let posts = vec![post("old", 1), post("new", 3), post("tie-a", 2), post("tie-b", 2)];
        let ids: Vec<_> = posts_newest_first(&posts)
            .into_iter()
            .map(|p| p.id.as_str())
            .collect();
        assert_eq!(ids, ["new", "tie-a", "tie-b", "old"]);
    }

    #[test]
    fn placeholder_only_when_image_absent() {
        assert_eq!(image_src(None, ACHIEVEMENT_PLACEHOLDER), ACHIEVEMENT_PLACEHOLDER);

        let blob = BlobRef::from_url("https://cdn.example.com/a.png").expect("url");
        assert_eq!(
            image_src(Some(&blob), ACHIEVEMENT_PLACEHOLDER),
            "https://cdn.example.com/a.png"
        );
    }

    #[test]
    fn paragraphs_split_on_blank_lines() {
        assert_eq!(
            paragraphs("First line\nstill first\n\nSecond\n\n\n\nThird"),
            vec!["First line\nstill first", "Second", "Third"]
        );
    }
}

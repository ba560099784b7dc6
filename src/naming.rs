//! Collection naming: folder-name parsing and filesystem-safe slugs.
//!
//! Sticker collections arrive in directories named by whatever tool downloaded
//! them. Three shapes are recognised, tried in order, first match wins:
//!
//! | Directory name | Title | Subtitle |
//! |---|---|---|
//! | `01 春意慵懒kitty` / `007_Bunny` | text after the numeric prefix | none |
//! | `春意慵懒kitty·精选合集` | text before the middle dot | text after it |
//! | anything else | the whole name | none |
//!
//! Each shape is a pure [`NameMatcher`]; adding a shape means appending a
//! function to [`NAME_MATCHERS`].
//!
//! ## Slugs
//!
//! Titles become path components and archive entry names only after
//! [`sanitize`]: the characters `/ \ : * ? " < > |` are replaced by `_`.
//! [`SlugAllocator`] then guarantees distinct slugs within one run by appending
//! `_2`, `_3`, … to later collisions. A title made only of dots (`.`, `..`)
//! would name the output root or its parent, so it becomes `untitled`; names
//! the output root already uses (see [`SlugAllocator::with_reserved`]) are
//! treated as taken.

use std::collections::HashSet;

/// Title and optional subtitle derived from a directory name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedName {
    pub title: String,
    pub subtitle: Option<String>,
}

/// A folder-name pattern: returns `Some` when the name has this shape.
pub type NameMatcher = fn(&str) -> Option<ParsedName>;

/// Matchers in priority order. The fallback always matches.
pub const NAME_MATCHERS: &[NameMatcher] = &[numbered_title, dotted_subtitle, whole_name];

/// Separator between title and subtitle.
const MIDDLE_DOT: char = '·';

/// Characters illegal in common file systems.
const ILLEGAL_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Parse a collection directory name into title and subtitle.
pub fn parse_collection_name(name: &str) -> ParsedName {
    NAME_MATCHERS
        .iter()
        .find_map(|matcher| matcher(name))
        .unwrap_or_else(|| ParsedName {
            title: name.to_string(),
            subtitle: None,
        })
}

/// `<digits><space|underscore…><title>` → title without the prefix.
pub fn numbered_title(name: &str) -> Option<ParsedName> {
    let digits = name.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        return None;
    }
    let rest = &name[digits..];
    let title = rest.trim_start_matches([' ', '_']);
    if title.len() == rest.len() {
        // No separator right after the digits
        return None;
    }
    let title = title.trim();
    if title.is_empty() {
        return None;
    }
    Some(ParsedName {
        title: title.to_string(),
        subtitle: None,
    })
}

/// `<title>·<subtitle>` → split at the first middle dot.
pub fn dotted_subtitle(name: &str) -> Option<ParsedName> {
    let (title, subtitle) = name.split_once(MIDDLE_DOT)?;
    let title = title.trim();
    if title.is_empty() {
        return None;
    }
    let subtitle = subtitle.trim();
    Some(ParsedName {
        title: title.to_string(),
        subtitle: (!subtitle.is_empty()).then(|| subtitle.to_string()),
    })
}

/// Fallback: the whole directory name is the title.
pub fn whole_name(name: &str) -> Option<ParsedName> {
    Some(ParsedName {
        title: name.trim().to_string(),
        subtitle: None,
    })
}

/// Replace characters that are illegal in common file systems with `_`.
pub fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if ILLEGAL_CHARS.contains(&c) { '_' } else { c })
        .collect()
}

/// Slug used when a title has nothing usable as a path component.
const UNTITLED: &str = "untitled";

/// Hands out unique slugs for the collections of one run.
///
/// Allocation order decides which collection keeps the bare slug, so callers
/// allocate in scan order to keep runs reproducible.
#[derive(Debug, Default)]
pub struct SlugAllocator {
    taken: HashSet<String>,
}

impl SlugAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// An allocator that never hands out any of `names`.
    pub fn with_reserved<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            taken: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Sanitize `title` and make it unique among slugs allocated so far.
    pub fn allocate(&mut self, title: &str) -> String {
        let base = sanitize(title.trim());
        let base = if base.chars().all(|c| c == '.') {
            UNTITLED.to_string()
        } else {
            base
        };
        let mut candidate = base.clone();
        let mut n = 2;
        while self.taken.contains(&candidate) {
            candidate = format!("{base}_{n}");
            n += 1;
        }
        self.taken.insert(candidate.clone());
        candidate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(title: &str, subtitle: Option<&str>) -> ParsedName {
        ParsedName {
            title: title.to_string(),
            subtitle: subtitle.map(str::to_string),
        }
    }

    #[test]
    fn numeric_prefix_with_space() {
        assert_eq!(
            parse_collection_name("01 春意慵懒kitty"),
            parsed("春意慵懒kitty", None)
        );
    }

    #[test]
    fn numeric_prefix_with_underscore() {
        assert_eq!(parse_collection_name("007_Bunny"), parsed("Bunny", None));
    }

    #[test]
    fn numeric_prefix_with_repeated_separators() {
        assert_eq!(parse_collection_name("12 _ Cats"), parsed("Cats", None));
    }

    #[test]
    fn middle_dot_splits_subtitle() {
        assert_eq!(
            parse_collection_name("春意慵懒kitty·精选合集"),
            parsed("春意慵懒kitty", Some("精选合集"))
        );
    }

    #[test]
    fn fallback_uses_whole_name() {
        assert_eq!(
            parse_collection_name("randomFolder"),
            parsed("randomFolder", None)
        );
    }

    #[test]
    fn numeric_prefix_wins_over_middle_dot() {
        assert_eq!(
            parse_collection_name("03 Kitty·Best"),
            parsed("Kitty·Best", None)
        );
    }

    #[test]
    fn digits_without_separator_are_not_a_prefix() {
        assert_eq!(numbered_title("2024cats"), None);
        assert_eq!(parse_collection_name("2024cats"), parsed("2024cats", None));
    }

    #[test]
    fn prefix_only_falls_through() {
        assert_eq!(numbered_title("42 "), None);
        assert_eq!(numbered_title("42"), None);
    }

    #[test]
    fn trailing_middle_dot_has_no_subtitle() {
        assert_eq!(dotted_subtitle("Kitty·"), Some(parsed("Kitty", None)));
    }

    #[test]
    fn leading_middle_dot_is_not_a_title() {
        assert_eq!(dotted_subtitle("·Kitty"), None);
    }

    #[test]
    fn sanitize_replaces_illegal_characters() {
        assert_eq!(sanitize("a/b:c"), "a_b_c");
        assert_eq!(sanitize(r#"x\y*z?"<>|"#), "x_y_z_____");
        assert_eq!(sanitize("春意慵懒kitty"), "春意慵懒kitty");
    }

    #[test]
    fn slugs_are_disambiguated_in_allocation_order() {
        let mut slugs = SlugAllocator::new();
        assert_eq!(slugs.allocate("Cats/Dogs"), "Cats_Dogs");
        assert_eq!(slugs.allocate("Cats:Dogs"), "Cats_Dogs_2");
        assert_eq!(slugs.allocate("Cats_Dogs"), "Cats_Dogs_3");
        assert_eq!(slugs.allocate("Birds"), "Birds");
    }

    #[test]
    fn distinct_sanitized_titles_do_not_collide() {
        let mut slugs = SlugAllocator::new();
        assert_eq!(slugs.allocate("a/b"), "a_b");
        assert_eq!(slugs.allocate("a/c"), "a_c");
    }

    #[test]
    fn dot_only_titles_become_untitled() {
        let mut slugs = SlugAllocator::new();
        assert_eq!(slugs.allocate(".."), "untitled");
        assert_eq!(slugs.allocate("."), "untitled_2");
        assert_eq!(slugs.allocate(" ... "), "untitled_3");
        assert_eq!(slugs.allocate("..Kitty"), "..Kitty");
    }

    #[test]
    fn reserved_names_are_never_allocated() {
        let mut slugs = SlugAllocator::with_reserved(["_zip_packages", "_processing_report.json"]);
        assert_eq!(slugs.allocate("_zip_packages"), "_zip_packages_2");
        assert_eq!(
            slugs.allocate("_processing_report.json"),
            "_processing_report.json_2"
        );
        assert_eq!(slugs.allocate("Kitty"), "Kitty");
    }

    #[test]
    fn empty_title_becomes_untitled() {
        let mut slugs = SlugAllocator::new();
        assert_eq!(slugs.allocate("  "), "untitled");
        assert_eq!(slugs.allocate(""), "untitled_2");
    }
}

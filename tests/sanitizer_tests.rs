//! Integration and property tests for title derivation
//!
//! These tests verify that the Sanitizer:
//! - Derives the expected titles for typical note layouts
//! - Never emits characters that are illegal in filenames
//! - Is deterministic and never returns an empty title
//! - Keeps titles within the configured length

use autotitle::services::sanitizer::{ELLIPSIS, ILLEGAL_CHARACTERS, strip_front_matter};
use autotitle::services::FALLBACK_TITLE;
use autotitle::{RenameSettings, Sanitizer};
use proptest::prelude::*;

fn plain_scan_settings(char_count: u32) -> RenameSettings {
    RenameSettings {
        use_header: false,
        use_first_line: false,
        support_yaml: false,
        char_count,
        ..RenameSettings::default()
    }
}

#[test]
fn test_empty_content_is_untitled() {
    let sanitizer = Sanitizer::new();
    assert_eq!(sanitizer.derive("", &RenameSettings::default()), FALLBACK_TITLE);
    assert_eq!(sanitizer.derive("   \n\t", &RenameSettings::default()), FALLBACK_TITLE);
}

#[test]
fn test_reserved_device_name_is_untitled() {
    let sanitizer = Sanitizer::new();
    assert_eq!(sanitizer.derive("CON", &RenameSettings::default()), FALLBACK_TITLE);
    assert_eq!(sanitizer.derive("# aux", &RenameSettings::default()), FALLBACK_TITLE);
}

#[test]
fn test_front_matter_is_skipped_before_heading() {
    let sanitizer = Sanitizer::new();
    let content = "---\ntitle: x\n---\n# Hello World\nbody";
    assert_eq!(sanitizer.derive(content, &RenameSettings::default()), "Hello World");
}

#[test]
fn test_front_matter_kept_when_yaml_support_disabled() {
    let sanitizer = Sanitizer::new();
    let settings = RenameSettings {
        support_yaml: false,
        ..RenameSettings::default()
    };
    // "---" is the first line, so the scan stops there.
    assert_eq!(sanitizer.derive("---\ntitle: x\n---\nBody", &settings), "---...");
}

#[test]
fn test_first_line_scenario() {
    let sanitizer = Sanitizer::new();
    let settings = RenameSettings {
        use_header: false,
        use_first_line: true,
        char_count: 50,
        ..RenameSettings::default()
    };
    assert_eq!(
        sanitizer.derive("Just a plain line\nsecond line", &settings),
        "Just a plain line..."
    );
}

#[test]
fn test_long_heading_is_truncated() {
    let sanitizer = Sanitizer::new();
    let settings = RenameSettings {
        char_count: 10,
        ..RenameSettings::default()
    };
    assert_eq!(
        sanitizer.derive("# A very long heading indeed", &settings),
        "A very lon..."
    );
}

#[test]
fn test_illegal_characters_are_dropped_from_heading() {
    let sanitizer = Sanitizer::new();
    assert_eq!(
        sanitizer.derive("# Q3: plans / risks?", &RenameSettings::default()),
        "Q3 plans risks"
    );
}

#[test]
fn test_char_count_is_clamped() {
    let sanitizer = Sanitizer::new();
    let settings = plain_scan_settings(1);
    // Clamped up to 10 scanned characters.
    assert_eq!(sanitizer.scan_title("abcdefghijklmnop", &settings), "abcdefghij...");
}

#[test]
fn test_front_matter_only_is_untitled() {
    let sanitizer = Sanitizer::new();
    let content = "---\ntitle: x\n---\n   \n";
    assert_eq!(sanitizer.derive(content, &RenameSettings::default()), FALLBACK_TITLE);
}

#[test]
fn test_strip_front_matter_requires_closing_delimiter() {
    assert_eq!(strip_front_matter("---\nopen: true"), "---\nopen: true");
    assert_eq!(strip_front_matter("---\na: 1\n---\nrest"), "rest");
}

proptest! {
    #[test]
    fn prop_derived_title_is_filename_safe(content in ".{0,200}") {
        let title = Sanitizer::new().derive(&content, &RenameSettings::default());
        prop_assert!(!title.is_empty());
        prop_assert!(!title.chars().any(|c| ILLEGAL_CHARACTERS.contains(&c)));
        prop_assert!(!title.contains('\n'));
        prop_assert!(!title.starts_with('.'));
        prop_assert_eq!(title.trim(), title.as_str());
    }

    #[test]
    fn prop_derivation_is_deterministic(content in "\\PC{0,120}", char_count in 10u32..=100) {
        let settings = RenameSettings {
            char_count,
            ..RenameSettings::default()
        };
        let sanitizer = Sanitizer::new();
        prop_assert_eq!(
            sanitizer.derive(&content, &settings),
            sanitizer.derive(&content, &settings)
        );
    }

    #[test]
    fn prop_scan_is_bounded(content in "\\PC{0,300}", char_count in 10u32..=100) {
        let settings = plain_scan_settings(char_count);
        let scanned = Sanitizer::new().scan_title(&content, &settings);
        prop_assert!(scanned.chars().count() <= char_count as usize + ELLIPSIS.len());
    }

    #[test]
    fn prop_long_scan_keeps_prefix(content in "\\PC{100,300}", char_count in 10u32..=100) {
        let settings = plain_scan_settings(char_count);
        let expected: String = content
            .chars()
            .take(char_count as usize)
            .filter(|c| !ILLEGAL_CHARACTERS.contains(c))
            .collect();

        let scanned = Sanitizer::new().scan_title(&content, &settings);
        prop_assert_eq!(scanned, format!("{}{}", expected, ELLIPSIS));
    }

    #[test]
    fn prop_derived_title_is_bounded(content in "[a-z #\n]{0,300}", char_count in 10u32..=100) {
        let settings = RenameSettings {
            char_count,
            ..RenameSettings::default()
        };
        let title = Sanitizer::new().derive(&content, &settings);
        prop_assert!(title.chars().count() <= char_count as usize + ELLIPSIS.len());
    }
}

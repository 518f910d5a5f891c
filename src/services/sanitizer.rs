use crate::models::RenameSettings;
use regex::Regex;

/// Title used when derivation produces nothing usable.
pub const FALLBACK_TITLE: &str = "Untitled";

/// Appended when the title was cut short.
pub const ELLIPSIS: &str = "...";

/// Marker line that opens and closes a YAML front matter block.
pub const FRONT_MATTER_DELIMITER: &str = "---";

/// Characters that never appear in a derived filename.
pub const ILLEGAL_CHARACTERS: &[char] = &[
    '\\', '/', ':', '*', '?', '"', '<', '>', '|', '#', '^', '[', ']',
];

/// Device names reserved by Windows, compared case-insensitively.
pub const RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM0", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7",
    "COM8", "COM9", "LPT0", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8",
    "LPT9",
];

/// Unicode ranges stripped when emojis are not allowed.
const EMOJI_RANGES: &[(u32, u32)] = &[
    (0x200D, 0x200D),   // zero width joiner
    (0x20E3, 0x20E3),   // combining enclosing keycap
    (0x2190, 0x21FF),   // arrows
    (0x2300, 0x23FF),   // miscellaneous technical
    (0x2600, 0x26FF),   // miscellaneous symbols
    (0x2700, 0x27BF),   // dingbats
    (0x2B00, 0x2BFF),   // miscellaneous symbols and arrows
    (0x3030, 0x3030),   // wavy dash
    (0x303D, 0x303D),   // part alternation mark
    (0x3297, 0x3297),   // circled ideograph congratulation
    (0x3299, 0x3299),   // circled ideograph secret
    (0xFE00, 0xFE0F),   // variation selectors
    (0x1F000, 0x1FAFF), // mahjong tiles through symbols and pictographs extended-A
    (0xE0020, 0xE007F), // tag characters
];

/// Derives a filesystem-safe note title from note content.
///
/// The sanitizer is pure: the same content and settings always give the same
/// title, and the result is never empty. Regex patterns are compiled once at
/// construction time:
///
/// - `heading_pattern`: a leading ATX heading marker, `^#{1,6} `
/// - `whitespace_pattern`: runs of whitespace collapsed to one space
/// - `emoji_pattern`: a character class built from the emoji and symbol ranges
///
/// # Derivation order
///
/// 1. Skip a front matter block when `support_yaml` is set
/// 2. Use the leading heading when `use_header` is set
/// 3. Otherwise scan the body, stopping at `char_count` characters or, with
///    `use_first_line`, at the first line break
/// 4. Drop emoji unless `include_emojis` is set
/// 5. Collapse whitespace and trim
/// 6. Strip leading dots together with any whitespace between them, so
///    `". . x"` becomes `"x"`
/// 7. Replace empty or reserved device names with [`FALLBACK_TITLE`]
pub struct Sanitizer {
    heading_pattern: Regex,
    whitespace_pattern: Regex,
    emoji_pattern: Regex,
}

impl Sanitizer {
    pub fn new() -> Self {
        Self {
            heading_pattern: Regex::new(r"^#{1,6} ").expect("Invalid heading regex"),
            whitespace_pattern: Regex::new(r"\s+").expect("Invalid whitespace regex"),
            emoji_pattern: Regex::new(&emoji_class()).expect("Invalid emoji regex"),
        }
    }

    /// Derive the title for `content`.
    pub fn derive(&self, content: &str, settings: &RenameSettings) -> String {
        let title = self.scan_title(content, settings);

        let title = if settings.include_emojis {
            title
        } else {
            self.emoji_pattern.replace_all(&title, "").into_owned()
        };

        let title = self.whitespace_pattern.replace_all(&title, " ");
        let title = title
            .trim()
            .trim_start_matches(|c: char| c == '.' || c.is_whitespace());

        if title.is_empty() || is_reserved_name(title) {
            tracing::trace!("Derived title empty or reserved, using fallback");
            return FALLBACK_TITLE.to_string();
        }

        title.to_string()
    }

    /// Raw title before emoji filtering and whitespace cleanup.
    ///
    /// Illegal characters are already gone and the ellipsis is already
    /// appended when the scan was cut short.
    pub fn scan_title(&self, content: &str, settings: &RenameSettings) -> String {
        let char_count = settings.effective_char_count();

        let body = if settings.support_yaml {
            strip_front_matter(content)
        } else {
            content
        };

        if settings.use_header {
            if let Some(marker) = self.heading_pattern.find(body) {
                let rest = &body[marker.end()..];
                let heading = rest.split_once('\n').map_or(rest, |(line, _)| line);
                return scan(heading, char_count, false);
            }
        }

        scan(body, char_count, settings.use_first_line)
    }
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Remove a leading front matter block.
///
/// Content without a closing delimiter is returned unchanged.
pub fn strip_front_matter(content: &str) -> &str {
    let Some(rest) = content.strip_prefix(FRONT_MATTER_DELIMITER) else {
        return content;
    };

    match rest.find(FRONT_MATTER_DELIMITER) {
        Some(end) => rest[end + FRONT_MATTER_DELIMITER.len()..].trim_start(),
        None => content,
    }
}

/// Check `title` against the reserved device names.
pub fn is_reserved_name(title: &str) -> bool {
    RESERVED_NAMES
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(title))
}

/// Walk `source` left to right, dropping illegal characters.
///
/// `char_count` counts scanned characters, so dropped characters still count
/// toward the limit.
fn scan(source: &str, char_count: usize, stop_at_newline: bool) -> String {
    let mut title = String::with_capacity(source.len().min(char_count * 4) + ELLIPSIS.len());
    let mut scanned = 0;

    for ch in source.chars() {
        if stop_at_newline && ch == '\n' {
            title.push_str(ELLIPSIS);
            break;
        }

        if !ILLEGAL_CHARACTERS.contains(&ch) {
            title.push(ch);
        }

        scanned += 1;
        if scanned >= char_count {
            title.push_str(ELLIPSIS);
            break;
        }
    }

    title
}

fn emoji_class() -> String {
    let mut class = String::from("[");
    for &(start, end) in EMOJI_RANGES {
        if start == end {
            class.push_str(&format!("\\x{{{:X}}}", start));
        } else {
            class.push_str(&format!("\\x{{{:X}}}-\\x{{{:X}}}", start, end));
        }
    }
    class.push(']');
    class
}

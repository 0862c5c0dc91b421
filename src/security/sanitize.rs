//! Input sanitization.
//!
//! # Responsibilities
//! - Clean free-form user input before it reaches a remote query
//! - Restrict resource path segments to URL-safe characters
//!
//! # Design Decisions
//! - Sanitizers never fail; they return the cleaned (possibly empty) value
//! - Length limits count characters, not bytes

/// Default character limit for free-form input.
pub const DEFAULT_MAX_INPUT_LEN: usize = 500;

/// Character limit for a single resource path segment.
pub const MAX_SEGMENT_LEN: usize = 128;

/// Trim, drop control characters and angle brackets, collapse whitespace runs
/// and truncate to `max_len` characters.
pub fn sanitize_input(raw: &str, max_len: usize) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '<' | '>'))
        .filter(|c| !c.is_control() || c.is_whitespace())
        .collect();

    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    let truncated: String = collapsed.chars().take(max_len).collect();
    truncated.trim_end().to_string()
}

/// Sanitize one path segment: only ASCII alphanumerics and `-_.~` survive.
///
/// `.` and `..` collapse to an empty segment.
pub fn sanitize_path_segment(raw: &str) -> String {
    let segment: String = sanitize_input(raw, MAX_SEGMENT_LEN)
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~'))
        .collect();

    if segment == "." || segment == ".." {
        String::new()
    } else {
        segment
    }
}

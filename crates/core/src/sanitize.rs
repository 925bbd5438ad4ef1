/// Characters that must not appear in a single path segment.
///
/// Covers both unix and Windows reserved characters plus line breaks;
/// underscore is included because it is the index/title separator in the
/// output file names.
const FORBIDDEN: [char; 12] = [
    '/', '\\', ':', '*', '?', '"', '<', '>', '|', '\r', '\n', '_',
];

/// Make a chapter title safe to embed as one path segment.
///
/// Each forbidden character is replaced with a single space and the result is
/// trimmed of surrounding spaces, one character at a time, so replacements
/// compound: `"chapter_1/intro"` becomes `"chapter 1 intro"`. Deterministic,
/// no I/O, and a fixed point on already-clean input. Uniqueness is not
/// guaranteed; the planner's positional index keeps colliding titles apart.
pub fn sanitize_title(raw: &str) -> String {
    let mut title = raw.to_string();
    for c in FORBIDDEN {
        title = title.replace(c, " ").trim_matches(' ').to_string();
    }
    title
}

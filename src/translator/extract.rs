/*!
 * Statement extraction from raw model output.
 */

use once_cell::sync::Lazy;
use regex::Regex;

static FENCED_BLOCK_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```(?:[A-Za-z]+[ \t]*\r?\n)?(.*?)```").expect("Invalid fenced block regex")
});

static FENCE_MARKER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"```(?:[A-Za-z]+[ \t]*(?:\r?\n|$))?").expect("Invalid fence marker regex")
});

/// Strip markdown artifacts and surrounding whitespace
///
/// Takes the body of the first fenced block when there is one, then removes
/// any stray fence markers left behind (an unterminated ```` ```sql ```` for
/// instance). Returns `None` when nothing but whitespace remains.
pub fn extract_statement(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let body = match FENCED_BLOCK_REGEX.captures(trimmed) {
        Some(caps) => caps.get(1).map_or("", |m| m.as_str()),
        None => trimmed,
    };

    let cleaned = FENCE_MARKER_REGEX.replace_all(body, "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}

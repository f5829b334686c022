//! Marker-based field extraction from provider page buffers.
//!
//! The embed page carries post metadata as an escaped JSON fragment inside a
//! script block. The page as a whole is not stable JSON and changes layout
//! across revisions, but the `\"field\":` markers around the values of
//! interest have stayed reliable, so this is a substring search, not a
//! structural parse.

use crate::models::ExtractedFragment;
use crate::services::unescape::unescape;

/// Escaped quote token that both opens string values and terminates every
/// value region.
const QUOTE: &str = r#"\""#;

/// Marker found in place of a permalink when the post has been removed or
/// requires login. Its presence invalidates the whole extraction.
const REMOVED_SENTINEL: &str = "/accounts/login";

/// Pull all known fields out of one line of the host page. Returns `None`
/// when nothing matched, or when the removed-post sentinel shows up in any
/// of the URL-bearing fields.
pub fn extract_fields(line: &str) -> Option<ExtractedFragment> {
    let fragment = ExtractedFragment {
        video_url: extract_value(line, r#"\"video_url\":"#, true),
        thumbnail_url: extract_value(line, r#"\"display_url\":"#, true),
        is_video: extract_value(line, r#"\"is_video\":"#, false),
        title: extract_value(line, r#"\"title\":"#, true),
        views: extract_value(line, r#"\"video_view_count\":"#, false),
        comments: extract_value(line, r#"\"comment_count\":"#, false),
        likes: extract_value(line, r#"\"like_count\":"#, false),
        username: extract_value(line, r#"\"username\":"#, true),
    };

    if fragment.is_empty() {
        return None;
    }

    // A removed post still renders a page, but its link fields point at the
    // provider's login wall. Treat the whole line as "nothing found".
    for field in [&fragment.video_url, &fragment.thumbnail_url, &fragment.title] {
        if field.as_deref().is_some_and(|v| v.contains(REMOVED_SENTINEL)) {
            return None;
        }
    }

    Some(fragment)
}

/// Extract the raw value following `marker`, up to the next quote-escape
/// token. Quoted values carry one leading delimiter byte that is trimmed;
/// bare values (numbers, booleans) are taken as-is up to the terminator and
/// stripped of trailing punctuation.
fn extract_value(line: &str, marker: &str, quoted: bool) -> Option<String> {
    let start = line.find(marker)? + marker.len();
    let rest = &line[start..];

    // Quoted values open with the `\` of the `\"` token; step past it so the
    // terminator search finds the closing token, not the opening one.
    let rest = if quoted { rest.get(1..)? } else { rest };

    let end = rest.find(QUOTE)?;
    let raw = &rest[..end];
    let value = unescape(raw);

    if quoted {
        Some(match value.strip_prefix('"') {
            Some(trimmed) => trimmed.to_string(),
            None => value.into_owned(),
        })
    } else {
        Some(value.trim_end_matches([',', '}', ' ']).to_string())
    }
}

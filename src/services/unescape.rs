//! Recovery of backslash-escaped values embedded in non-JSON host pages.
//!
//! The provider ships post metadata as an escaped JSON fragment inside a
//! larger document that is not itself valid JSON, so a structural parser is
//! useless here. This routine unescapes whatever it recognizes and passes
//! everything else through untouched. It never fails: worst case the output
//! is the input with some segments unescaped and the rest left raw.

use std::borrow::Cow;

/// Unescape a backslash-escaped fragment.
///
/// Inputs without a backslash are returned borrowed, without allocating.
/// Recognized escapes: `\" \\ \/ \b \f \n \r \t \uXXXX`, including UTF-16
/// surrogate pairs. Malformed `\uXXXX` sequences and unknown escapes are
/// preserved verbatim.
pub fn unescape(s: &str) -> Cow<'_, str> {
    if !s.contains('\\') {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(pos) = rest.find('\\') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        match tail.as_bytes().get(1) {
            Some(b'"') => {
                out.push('"');
                rest = &tail[2..];
            }
            Some(b'\\') => {
                out.push('\\');
                rest = &tail[2..];
            }
            Some(b'/') => {
                out.push('/');
                rest = &tail[2..];
            }
            Some(b'b') => {
                out.push('\u{0008}');
                rest = &tail[2..];
            }
            Some(b'f') => {
                out.push('\u{000C}');
                rest = &tail[2..];
            }
            Some(b'n') => {
                out.push('\n');
                rest = &tail[2..];
            }
            Some(b'r') => {
                out.push('\r');
                rest = &tail[2..];
            }
            Some(b't') => {
                out.push('\t');
                rest = &tail[2..];
            }
            Some(b'u') => match decode_unicode(tail) {
                Some((ch, consumed)) => {
                    out.push(ch);
                    rest = &tail[consumed..];
                }
                None => {
                    // Malformed escape: keep the marker verbatim, the hex
                    // digits (if any) flow through as literal text.
                    out.push_str("\\u");
                    rest = &tail[2..];
                }
            },
            Some(other) if other.is_ascii() => {
                // Unknown escape: marker byte plus following byte, untouched.
                out.push('\\');
                out.push(*other as char);
                rest = &tail[2..];
            }
            Some(_) => {
                // Backslash followed by a multi-byte character.
                out.push('\\');
                rest = &tail[1..];
            }
            None => {
                out.push('\\');
                rest = "";
            }
        }
    }

    out.push_str(rest);
    Cow::Owned(out)
}

/// Decode a `\uXXXX` escape starting at `tail` (which begins with `\u`).
/// Returns the scalar value and the number of bytes consumed, or `None`
/// when the sequence is short, non-hex, or a broken surrogate pair.
fn decode_unicode(tail: &str) -> Option<(char, usize)> {
    let hex = tail.get(2..6)?;
    let unit = u16::from_str_radix(hex, 16).ok()?;

    if (0xD800..0xDC00).contains(&unit) {
        // High surrogate: must be followed immediately by a low surrogate.
        let low_esc = tail.get(6..12)?;
        let low_hex = low_esc.strip_prefix("\\u")?;
        let low = u16::from_str_radix(low_hex, 16).ok()?;
        if !(0xDC00..0xE000).contains(&low) {
            return None;
        }
        let scalar = 0x10000 + ((u32::from(unit) - 0xD800) << 10) + (u32::from(low) - 0xDC00);
        return char::from_u32(scalar).map(|ch| (ch, 12));
    }

    if (0xDC00..0xE000).contains(&unit) {
        // Lone low surrogate.
        return None;
    }

    char::from_u32(u32::from(unit)).map(|ch| (ch, 6))
}

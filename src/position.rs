//! Mapping between the page's position token (the URL fragment, 1-based) and the
//! gallery's internal 0-based index.
//!
//! Nothing here knows how many photos exist; callers clamp once they do.

/// Separator written after the index, e.g. `#5/`.
pub const TOKEN_SEPARATOR: char = '/';

/// Extracts the leading integer of `token` and converts it to a 0-based index.
///
/// Leading separators (`#`, `/`) and whitespace are skipped. A token without digits
/// resolves to `0`. The result is not clamped: `"0/"` yields `-1`.
pub fn parse(token: &str) -> i64 {
    let trimmed = token.trim_start_matches(is_leading_filler);
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let mut seen_digit = false;
    let mut value: i64 = 0;
    for b in digits.bytes().take_while(u8::is_ascii_digit) {
        seen_digit = true;
        value = value.saturating_mul(10).saturating_add(i64::from(b - b'0'));
    }
    if !seen_digit {
        return 0;
    }

    let external = if negative { -value } else { value };
    external.saturating_sub(1)
}

fn is_leading_filler(c: char) -> bool {
    c == '#' || c == TOKEN_SEPARATOR || c.is_whitespace()
}

/// Clamps `index` into `[0, len - 1]`.
///
/// `len` must be at least one; an empty set is rejected when the set is built.
pub fn clamp(index: i64, len: usize) -> usize {
    debug_assert!(len > 0, "clamp against an empty photo set");
    let last = len.saturating_sub(1);
    if index < 0 {
        0
    } else {
        usize::try_from(index).map_or(last, |i| i.min(last))
    }
}

/// Renders the external token for a 0-based index: `4` becomes `"5/"`.
pub fn format(index: usize) -> String {
    format!("{}{}", index + 1, TOKEN_SEPARATOR)
}

/// Resolves an optional fragment against a set of `len` photos.
pub fn resolve(fragment: Option<&str>, len: usize) -> usize {
    clamp(parse(fragment.unwrap_or_default()), len)
}

//! Index arithmetic and the `?p=` position parameter.
//!
//! The URL carries a 1-based position (`?p=3` is the third image); the
//! viewer works with 0-based indices. Every index the viewer settles on goes
//! through [`resolve_index`]:
//!
//! - [`IndexPolicy::Wrap`] for next/previous, so navigation is cyclic
//! - [`IndexPolicy::Clamp`] for direct positioning (deep links, thumbnail
//!   picks), so `?p=999` on a 4-image collection lands on the last image

/// Query parameter holding the 1-based position.
pub const POSITION_PARAM: &str = "p";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexPolicy {
    Wrap,
    Clamp,
}

/// `index` modulo `total`; 0 for an empty collection.
pub fn wrap_index(index: i64, total: usize) -> usize {
    if total == 0 {
        return 0;
    }
    index.rem_euclid(total as i64) as usize
}

/// `index` limited to `[0, total - 1]`; 0 for an empty collection.
pub fn clamp_index(index: i64, total: usize) -> usize {
    if total == 0 {
        return 0;
    }
    index.clamp(0, total as i64 - 1) as usize
}

pub fn resolve_index(index: i64, total: usize, policy: IndexPolicy) -> usize {
    match policy {
        IndexPolicy::Wrap => wrap_index(index, total),
        IndexPolicy::Clamp => clamp_index(index, total),
    }
}

/// Leading integer of `value`, the way HTML forms read numbers: surrounding
/// whitespace and trailing junk are ignored (`" 3abc"` is 3), no digits is `None`.
pub fn parse_position(value: &str) -> Option<i64> {
    let s = value.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    // saturate absurdly long numbers; they clamp to the last image anyway
    let magnitude = digits[..end].parse::<i64>().unwrap_or(i64::MAX);
    Some(if negative { -magnitude } else { magnitude })
}

/// Index for a viewer opened with `?p=<param>`.
///
/// Absent, non-numeric, zero and negative positions all mean the first image;
/// positions past the end mean the last.
pub fn initial_index(param: Option<&str>, total: usize) -> usize {
    match param.and_then(parse_position) {
        Some(position) => clamp_index(position.saturating_sub(1), total),
        None => 0,
    }
}

/// Raw value of the position parameter in a query string (`a=1&p=3`).
pub fn position_from_query(query: &str) -> Option<&str> {
    query
        .trim_start_matches('?')
        .split('&')
        .filter_map(|pair| pair.split_once('=').or(Some((pair, ""))))
        .find(|(key, _)| *key == POSITION_PARAM)
        .map(|(_, value)| value)
}

/// Position parameter value for `index`, or `None` when it should be omitted
/// (the first image).
pub fn position_value(index: usize) -> Option<String> {
    (index > 0).then(|| (index + 1).to_string())
}

/// `query` with the position parameter set for `index`.
///
/// Other parameters keep their order; the position goes last, or disappears
/// for the first image.
pub fn with_position(query: &str, index: usize) -> String {
    let mut pairs: Vec<String> = query
        .trim_start_matches('?')
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter(|pair| pair.split('=').next() != Some(POSITION_PARAM))
        .map(String::from)
        .collect();
    if let Some(value) = position_value(index) {
        pairs.push(format!("{POSITION_PARAM}={value}"));
    }
    pairs.join("&")
}

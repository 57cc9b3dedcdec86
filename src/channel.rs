//! Channel names and subscription patterns
//!
//! Channels are slash-separated paths such as `/foo/bar`. A subscription
//! pattern may end in a wildcard segment:
//!
//! - `*` matches exactly one trailing segment (`/foo/*` matches `/foo/bar`)
//! - `**` matches one or more trailing segments (`/foo/**` matches
//!   `/foo/bar` and `/foo/bar/baz`)
//!
//! Rather than testing each registered pattern against a published channel,
//! the engine expands the published name into every pattern that would match
//! it and looks those up directly in the subscription index.

pub const DELIMITER: char = '/';
pub const WILDCARD: &str = "*";
pub const DEEP_WILDCARD: &str = "**";

const META_PREFIX: &str = "/meta/";
const SERVICE_PREFIX: &str = "/service/";

/// Split a channel name into its segments
///
/// Returns `None` when the name does not start with the delimiter.
pub fn parse(name: &str) -> Option<Vec<&str>> {
    name.strip_prefix(DELIMITER)
        .map(|rest| rest.split(DELIMITER).collect())
}

/// Join segments back into a channel name
pub fn unparse<S: AsRef<str>>(segments: &[S]) -> String {
    let mut name = String::new();
    for segment in segments {
        name.push(DELIMITER);
        name.push_str(segment.as_ref());
    }
    name
}

/// Every subscription pattern that matches a message published on `name`
///
/// For `/a/b/c` this yields `/**`, `/a/b/c`, `/a/b/*`, `/a/**` and
/// `/a/b/**`.
pub fn expand(name: &str) -> Vec<String> {
    let segments = match parse(name) {
        Some(segments) => segments,
        None => return vec![name.to_string()],
    };

    let mut patterns = Vec::with_capacity(segments.len() + 2);
    patterns.push(unparse(&[DEEP_WILDCARD]));
    patterns.push(name.to_string());

    let mut copy = segments.clone();
    if let Some(last) = copy.last_mut() {
        *last = WILDCARD;
    }
    patterns.push(unparse(&copy));

    for i in 1..segments.len() {
        let mut prefix = segments[..i].to_vec();
        prefix.push(DEEP_WILDCARD);
        patterns.push(unparse(&prefix));
    }

    patterns
}

/// Whether a subscription `pattern` matches the published channel `name`
///
/// Reference predicate for checking `expand` against.
#[cfg(test)]
fn matches(pattern: &str, name: &str) -> bool {
    let (Some(pattern), Some(name)) = (parse(pattern), parse(name)) else {
        return false;
    };

    match pattern.split_last() {
        Some((&DEEP_WILDCARD, prefix)) => {
            name.len() > prefix.len() && name[..prefix.len()] == *prefix
        }
        Some((&WILDCARD, prefix)) => {
            name.len() == prefix.len() + 1 && name[..prefix.len()] == *prefix
        }
        _ => pattern == name,
    }
}

fn is_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_!~()$@".contains(c))
}

/// Whether `name` is a concrete channel name with no wildcards
pub fn is_name(name: &str) -> bool {
    parse(name).is_some_and(|segments| segments.iter().all(|s| is_segment(s)))
}

/// Whether `name` is a subscription pattern ending in `*` or `**`
pub fn is_pattern(name: &str) -> bool {
    match parse(name).as_deref().and_then(|s| s.split_last()) {
        Some((last, prefix)) => {
            (*last == WILDCARD || *last == DEEP_WILDCARD) && prefix.iter().all(|s| is_segment(s))
        }
        None => false,
    }
}

/// Whether `name` is a channel name or a subscription pattern
pub fn is_valid(name: &str) -> bool {
    is_name(name) || is_pattern(name)
}

pub fn is_meta(name: &str) -> bool {
    name.starts_with(META_PREFIX)
}

pub fn is_service(name: &str) -> bool {
    name.starts_with(SERVICE_PREFIX)
}

/// Whether clients may subscribe to `name`
///
/// Meta and service channels are handled by the protocol layer and never
/// reach the subscription index.
pub fn is_subscribable(name: &str) -> bool {
    is_valid(name) && !is_meta(name) && !is_service(name)
}

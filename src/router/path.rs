//! Segment-based path matching.
//!
//! A pattern is split on `/` into literal segments and `:name` parameter
//! segments. Matching is purely structural: every pattern has a fixed segment
//! count, literals compare exactly against the already decoded request
//! segments, and a parameter captures exactly one non-empty segment. There is no backtracking and no wildcard capture.

use std::collections::HashMap;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::request::Params;

/// Reserved prefix that turns a pattern segment into a parameter.
pub(crate) const PARAM_MARKER: char = ':';

/// One `/`-delimited component of a route pattern.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Segment {
    Literal(String),
    Param(String),
}

/// Splits a pattern into segments.
///
/// The root pattern `/` yields no segments. A parameter marker without a name
/// (`/users/:`) is a wiring error and panics.
pub(crate) fn parse_pattern(pattern: &str) -> Vec<Segment> {
    let trimmed = pattern.trim_matches('/');
    if trimmed.is_empty() {
        return Vec::new();
    }
    trimmed
        .split('/')
        .map(|seg| match seg.strip_prefix(PARAM_MARKER) {
            Some("") => panic!("router: empty parameter name in pattern `{pattern}`"),
            Some(name) => Segment::Param(name.to_owned()),
            None => Segment::Literal(seg.to_owned()),
        })
        .collect()
}

/// Matches the decoded segments of a request path (see
/// [`Request::path_segments`](crate::Request::path_segments)) against
/// `segments`, returning the bound parameters on success.
///
/// The root pattern matches only a path with no segments. Literals compare
/// exactly against the decoded text; the matcher does no decoding itself.
pub(crate) fn match_segments<S: AsRef<str>>(segments: &[Segment], path: &[S]) -> Option<Params> {
    if path.len() != segments.len() {
        return None;
    }

    let mut params = HashMap::new();
    for (segment, part) in segments.iter().zip(path) {
        let part = part.as_ref();
        match segment {
            Segment::Literal(lit) if lit == part => {}
            Segment::Literal(_) => return None,
            Segment::Param(_) if part.is_empty() => return None,
            Segment::Param(name) => {
                params.insert(name.clone(), part.to_owned());
            }
        }
    }
    Some(Params::from_map(params))
}

/// Characters left as-is in an escaped segment: unreserved characters plus
/// the sub-delimiters legal inside a segment. `/` and `?` are encoded.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b',')
    .remove(b';')
    .remove(b'=')
    .remove(b':')
    .remove(b'@');

/// Escapes `value` for use as a single path segment.
pub(crate) fn escape_segment(value: &str) -> String {
    utf8_percent_encode(value, SEGMENT).to_string()
}

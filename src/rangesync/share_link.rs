//! Shareable links carrying a range in the query string.
//!
//! A range travels as three query parameters: `s` (start), `e` (end) and `t` (step).
//! Both directions are pure functions with no knowledge of the page they belong to.
//!
//! ```rust
//! use rangesync::sequence::RangeParameters;
//! use rangesync::share_link::{decode_share_link, encode_share_link};
//!
//! let params = RangeParameters::new(1.0, 100.0, 0.5);
//! let link = encode_share_link("https://example.com/calc", &params);
//! assert_eq!(link, "https://example.com/calc?s=1&e=100&t=0.5");
//! assert_eq!(decode_share_link(&link), Some(params));
//! ```

use crate::rangesync::sequence::RangeParameters;

const START_PARAM: &str = "s";
const END_PARAM: &str = "e";
const STEP_PARAM: &str = "t";

/// The `s=..&e=..&t=..` query string for `params`, without a leading `?`.
///
/// Numbers use Rust's shortest round-trip formatting, so decoding restores the exact
/// same `f64` values.
pub fn encode_query(params: &RangeParameters) -> String {
    format!(
        "{}={}&{}={}&{}={}",
        START_PARAM,
        urlencoding::encode(&params.start.to_string()),
        END_PARAM,
        urlencoding::encode(&params.end.to_string()),
        STEP_PARAM,
        urlencoding::encode(&params.step.to_string()),
    )
}

/// `base_url` with its query and fragment replaced by the encoded range.
pub fn encode_share_link(base_url: &str, params: &RangeParameters) -> String {
    let end = base_url.find(|c: char| c == '?' || c == '#').unwrap_or(base_url.len());
    format!("{}?{}", &base_url[..end], encode_query(params))
}

/// Read a range back out of a full URL or a bare query string.
///
/// Returns `None` when any of `s`, `e`, `t` is missing, is not a number, or is not
/// finite. Each value must parse as a number in full: unlike a browser's
/// `parseFloat`, a trailing suffix such as `12abc` is rejected rather than read as
/// `12`. When a parameter repeats, its first occurrence is used. Unrelated
/// parameters are ignored.
pub fn decode_share_link(url_or_query: &str) -> Option<RangeParameters> {
    let query = match url_or_query.find('?') {
        Some(idx) => &url_or_query[idx + 1..],
        None => url_or_query,
    };
    let query = query.split('#').next().unwrap_or("");

    let mut start = None;
    let mut end = None;
    let mut step = None;

    for pair in query.split('&') {
        let (raw_key, raw_value) = match pair.split_once('=') {
            Some(kv) => kv,
            None => (pair, ""),
        };
        let slot = match decode_component(raw_key).as_deref() {
            Some(START_PARAM) => &mut start,
            Some(END_PARAM) => &mut end,
            Some(STEP_PARAM) => &mut step,
            _ => continue,
        };
        if slot.is_none() {
            *slot = Some(raw_value);
        }
    }

    Some(RangeParameters::new(
        parse_number(start?)?,
        parse_number(end?)?,
        parse_number(step?)?,
    ))
}

fn decode_component(raw: &str) -> Option<String> {
    // Query strings may encode spaces as '+'.
    urlencoding::decode(&raw.replace('+', " "))
        .ok()
        .map(|decoded| decoded.into_owned())
}

fn parse_number(raw: &str) -> Option<f64> {
    let decoded = decode_component(raw)?;
    let value: f64 = decoded.trim().parse().ok()?;
    if value.is_finite() {
        Some(value)
    } else {
        None
    }
}

//! Form Payload Parser
//!
//! `application/x-www-form-urlencoded` bodies, including redirect callbacks of
//! the form `https://app/cb?code=...&state=...`.

use crate::types::ParameterList;

/// Name of the pair produced for a segment carrying a `?`.
pub const REDIRECT_URI_PARAM: &str = "redirect_uri";

/// Parse a form body into ordered pairs.
///
/// Segments are split on `&`; a segment containing `?` yields
/// `(redirect_uri, <text before ?>)` and continues with the text after it.
/// Each remaining segment splits on its first `=`; segments without `=` are
/// skipped. Names and values are percent-decoded with `+` as space.
pub fn parse_form_parameters(body: &str) -> ParameterList {
    let mut params = ParameterList::new();
    for segment in body.trim().split('&') {
        let segment = match segment.split_once('?') {
            Some((prefix, rest)) => {
                params.push(REDIRECT_URI_PARAM, decode(prefix));
                rest
            }
            None => segment,
        };
        if let Some((name, value)) = segment.split_once('=') {
            params.push(decode(name), decode(value));
        }
    }
    params
}

fn decode(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|decoded| decoded.into_owned())
        .unwrap_or(spaced)
}

//! Query string decoding.
//!
//! The smallest piece of the harness: turn `"a=1&b=2"` into the parameter
//! map the route matcher and translator merge over recognized path params.

use crate::routing::RecognizedParams;

/// Decode a query string into a parameter map.
///
/// Splits on `&` then `=`. An empty string yields an empty map. A piece
/// without `=` maps the key to the empty string. When a key occurs more than
/// once, the last occurrence wins. Values are taken verbatim; no
/// percent-decoding is performed.
///
/// # Examples
///
/// ```
/// use webspec::querystring::params_from_querystring;
///
/// let params = params_from_querystring("id=1&flag=true");
/// assert_eq!(params.get("id").map(String::as_str), Some("1"));
/// assert_eq!(params.get("flag").map(String::as_str), Some("true"));
///
/// assert!(params_from_querystring("").is_empty());
/// ```
pub fn params_from_querystring(querystring: &str) -> RecognizedParams {
	let mut params = RecognizedParams::new();
	if querystring.is_empty() {
		return params;
	}
	for piece in querystring.split('&') {
		if piece.is_empty() {
			continue;
		}
		match piece.split_once('=') {
			Some((key, value)) => params.insert(key.to_string(), value.to_string()),
			None => params.insert(piece.to_string(), String::new()),
		};
	}
	params
}

/// Split a path into its bare path and optional query string.
pub(crate) fn split_query(path: &str) -> (&str, Option<&str>) {
	match path.split_once('?') {
		Some((bare, qs)) => (bare, Some(qs)),
		None => (path, None),
	}
}

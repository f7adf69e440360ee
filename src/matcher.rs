//! Route assertion matcher.
//!
//! A [`RouteForMatcher`] is handed out by the test context with a fixed set
//! of generation options (controller, action, params). Comparing it against
//! a literal path or an options map asserts that the path recognizes to
//! exactly those options. A mismatch is a hard test failure with an
//! expected/actual diff, never a silent `false`.

use crate::error::SpecResult;
use crate::querystring::{params_from_querystring, split_query};
use crate::routing::{RecognizedParams, RouteOptions, RouteTranslator};
use http::Method;
use std::collections::BTreeMap;

/// What a route assertion compares against: a bare path (optionally with a
/// query string) or an options mapping carrying a path in the same combined
/// form plus a method and extra params.
#[derive(Debug, Clone)]
pub enum RouteExpectation {
	Path(String),
	Options {
		path: String,
		method: Method,
		params: RecognizedParams,
	},
}

impl RouteExpectation {
	/// Start an options-form expectation for `path`.
	///
	/// # Examples
	///
	/// ```
	/// use webspec::matcher::RouteExpectation;
	/// use http::Method;
	///
	/// let expected = RouteExpectation::options("/things/1")
	///     .method(Method::PUT)
	///     .param("format", "json");
	/// ```
	pub fn options(path: impl Into<String>) -> Self {
		Self::Options {
			path: path.into(),
			method: Method::GET,
			params: RecognizedParams::new(),
		}
	}

	pub fn method(self, method: Method) -> Self {
		match self {
			Self::Options { path, params, .. } => Self::Options {
				path,
				method,
				params,
			},
			Self::Path(path) => Self::Options {
				path,
				method,
				params: RecognizedParams::new(),
			},
		}
	}

	pub fn param(self, name: impl Into<String>, value: impl ToString) -> Self {
		match self {
			Self::Options {
				path,
				method,
				mut params,
			} => {
				params.insert(name.into(), value.to_string());
				Self::Options {
					path,
					method,
					params,
				}
			}
			Self::Path(path) => Self::Path(path).method(Method::GET).param(name, value),
		}
	}
}

impl From<&str> for RouteExpectation {
	fn from(path: &str) -> Self {
		Self::Path(path.to_string())
	}
}

impl From<String> for RouteExpectation {
	fn from(path: String) -> Self {
		Self::Path(path)
	}
}

/// Value returned by `route_for`; compare it against the expected path.
pub struct RouteForMatcher {
	translator: RouteTranslator,
	options: RouteOptions,
}

impl RouteForMatcher {
	pub fn new(translator: RouteTranslator, options: RouteOptions) -> Self {
		Self {
			translator,
			options,
		}
	}

	/// Assert that `expected` recognizes to exactly the fixed options.
	///
	/// Returns `true` when the assertion holds. On failure this panics with
	/// a descriptive expected/actual diff; the panic is the test failure
	/// signal, so a mismatch fails the running test rather than returning
	/// `false`.
	///
	/// # Examples
	///
	/// ```should_panic
	/// use webspec::matcher::RouteForMatcher;
	/// use webspec::routing::{route, RouteOptions, RouteTable, RouteTranslator, RoutingService};
	/// use std::sync::Arc;
	///
	/// let table = RouteTable::new();
	/// table.draw(vec![route("/things/{id}", "things", "show")]);
	/// let matcher = RouteForMatcher::new(
	///     RouteTranslator::new(Arc::new(table)),
	///     RouteOptions::new("things", "show").param("id", 1),
	/// );
	/// matcher.matches("/wrong/path"); // panics with the diff
	/// ```
	pub fn matches(&self, expected: impl Into<RouteExpectation>) -> bool {
		if let Err(failure) = self.check(expected) {
			panic!("{}", failure);
		}
		true
	}

	/// Non-panicking form of [`matches`](Self::matches); used where the
	/// failure itself is under test.
	pub fn check(&self, expected: impl Into<RouteExpectation>) -> Result<(), String> {
		let (path, method, embedded) = match expected.into() {
			RouteExpectation::Path(path) => (path, Method::GET, RecognizedParams::new()),
			RouteExpectation::Options {
				path,
				method,
				params,
			} => (path, method, params),
		};
		let (bare, querystring) = split_query(&path);

		let mut expected_params = self.options.to_params();
		expected_params.extend(embedded);
		if let Some(qs) = querystring {
			expected_params.extend(params_from_querystring(qs));
		}

		let actual = self
			.recognized(&method, bare)
			.map_err(|err| format!("route assertion failed: {}", err))?;
		if actual == expected_params {
			Ok(())
		} else {
			Err(format!(
				"expected {} {} to route to {} but it routed to {}",
				method,
				bare,
				fmt_params(&expected_params),
				fmt_params(&actual),
			))
		}
	}

	fn recognized(&self, method: &Method, bare: &str) -> SpecResult<RecognizedParams> {
		self.translator.params_for(method, bare)
	}
}

fn fmt_params(params: &RecognizedParams) -> String {
	let sorted: BTreeMap<&str, &str> = params
		.iter()
		.map(|(k, v)| (k.as_str(), v.as_str()))
		.collect();
	let pairs: Vec<String> = sorted
		.into_iter()
		.map(|(k, v)| format!("{}: {:?}", k, v))
		.collect();
	format!("{{{}}}", pairs.join(", "))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::routing::{RouteTable, route};
	use std::sync::Arc;

	fn matcher(options: RouteOptions) -> RouteForMatcher {
		let table = RouteTable::with_loader(|| {
			vec![
				route("/things/{id}", "things", "show").via(Method::GET),
				route("/things/{id}/edit", "things", "edit").via(Method::GET),
				route("/things/{id}", "things", "update").via(Method::PUT),
			]
		});
		RouteForMatcher::new(RouteTranslator::new(Arc::new(table)), options)
	}

	#[test]
	fn test_matches_literal_path() {
		let m = matcher(RouteOptions::new("things", "show").param("id", 1));
		assert!(m.matches("/things/1"));
	}

	#[test]
	fn test_matches_path_with_querystring() {
		let m = matcher(
			RouteOptions::new("things", "edit")
				.param("id", 1)
				.param("flag", "true"),
		);
		assert!(m.matches("/things/1/edit?flag=true"));
	}

	#[test]
	fn test_matches_options_form_with_method() {
		let m = matcher(RouteOptions::new("things", "update").param("id", 3));
		let expected = RouteExpectation::options("/things/3").method(Method::PUT);
		assert!(m.matches(expected));
	}

	#[test]
	fn test_mismatch_reports_expected_and_actual() {
		let m = matcher(RouteOptions::new("things", "show").param("id", 1));
		let failure = m.check("/things/2").unwrap_err();
		assert!(failure.contains("id: \"1\""), "missing expected side: {}", failure);
		assert!(failure.contains("id: \"2\""), "missing actual side: {}", failure);
	}

	#[test]
	fn test_unrecognized_path_is_a_failure() {
		let m = matcher(RouteOptions::new("things", "show").param("id", 1));
		let failure = m.check("/wrong/path/here").unwrap_err();
		assert!(failure.contains("no route matches"), "{}", failure);
	}

	#[test]
	#[should_panic(expected = "expected GET /things/2 to route to")]
	fn test_matches_panics_on_mismatch() {
		let m = matcher(RouteOptions::new("things", "show").param("id", 1));
		m.matches("/things/2");
	}
}

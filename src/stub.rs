//! Render expectations and stubs.
//!
//! A spec may mock or stub `render` directly; those registrations take
//! precedence over the recording shim. When a call matches one of them the
//! mock's canned behavior runs (or the stub simply marks that a render
//! occurred) and the recording logic is skipped for that call entirely.

use crate::render::RenderOptions;
use parking_lot::Mutex;
use std::sync::Arc;

/// Argument matcher for a render expectation or stub.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderMatcher {
	/// Matches every render call.
	Any,
	/// Matches a call whose `template` option equals the name.
	Template(String),
	/// Matches a call whose `partial` option equals the name.
	Partial(String),
	/// Matches a call whose `file` option equals the name.
	File(String),
}

impl RenderMatcher {
	fn matches(&self, options: &RenderOptions) -> bool {
		match self {
			Self::Any => true,
			Self::Template(name) => options.template.as_deref() == Some(name.as_str()),
			Self::Partial(name) => options.partial.as_deref() == Some(name.as_str()),
			Self::File(name) => options.file.as_deref() == Some(name.as_str()),
		}
	}
}

struct Expectation {
	matcher: RenderMatcher,
	body: Option<String>,
	calls: usize,
}

#[derive(Default)]
struct ProxyState {
	expectations: Vec<Expectation>,
	stubs: Vec<RenderMatcher>,
}

/// Per-controller-instance registry of render expectations and stubs,
/// consulted before any interception. Cheap to clone; clones share state.
#[derive(Clone, Default)]
pub struct RenderProxy {
	state: Arc<Mutex<ProxyState>>,
}

impl RenderProxy {
	pub fn new() -> Self {
		Self::default()
	}

	/// Expect a matching render call. Unmet expectations fail
	/// [`verify`](Self::verify).
	pub fn expect(&self, matcher: RenderMatcher) {
		self.state.lock().expectations.push(Expectation {
			matcher,
			body: None,
			calls: 0,
		});
	}

	/// Expect a matching render call and answer it with a canned body.
	pub fn expect_with_body(&self, matcher: RenderMatcher, body: impl Into<String>) {
		self.state.lock().expectations.push(Expectation {
			matcher,
			body: Some(body.into()),
			calls: 0,
		});
	}

	/// Stub out matching render calls: they are swallowed, marked as
	/// performed, and nothing is recorded.
	pub fn stub(&self, matcher: RenderMatcher) {
		self.state.lock().stubs.push(matcher);
	}

	/// Find and tally the first expectation matching `options`. Returns the
	/// expectation's canned body (possibly `None`) wrapped in `Some` when
	/// one matched.
	pub(crate) fn consume_expectation(&self, options: &RenderOptions) -> Option<Option<String>> {
		let mut state = self.state.lock();
		for expectation in &mut state.expectations {
			if expectation.matcher.matches(options) {
				expectation.calls += 1;
				return Some(expectation.body.clone());
			}
		}
		None
	}

	pub(crate) fn has_matching_stub(&self, options: &RenderOptions) -> bool {
		self.state.lock().stubs.iter().any(|m| m.matches(options))
	}

	/// Verify every registered expectation was met at least once.
	pub fn verify(&self) -> Result<(), String> {
		let state = self.state.lock();
		let unmet: Vec<String> = state
			.expectations
			.iter()
			.filter(|e| e.calls == 0)
			.map(|e| format!("{:?}", e.matcher))
			.collect();
		if unmet.is_empty() {
			Ok(())
		} else {
			Err(format!(
				"render expectation(s) never satisfied: {}",
				unmet.join(", ")
			))
		}
	}
}

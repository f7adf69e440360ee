//! Error taxonomy for the spec harness.
//!
//! Three things can genuinely fail here: resolving which controller a group
//! exercises, generating a path from route options, and recognizing a path
//! against the routing table. Integration-mode rendering additionally
//! surfaces engine failures. Render interception itself never fails; it is
//! pure bookkeeping.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpecError {
	/// No controller type could be resolved for an example group. Fatal at
	/// test setup; the test never runs.
	#[error("no controller bound for this example group: {0}")]
	Binding(String),

	/// The routing service could not produce a path from the given options.
	#[error("route generation failed: {0}")]
	RouteGeneration(String),

	/// The routing service found no route matching the method and path.
	#[error("no route matches {method} {path}")]
	RouteNotFound { method: http::Method, path: String },

	/// Real rendering failed in integration mode. Never raised in isolation
	/// mode, where templates are observed but not executed.
	#[error("template error: {0}")]
	Template(String),
}

pub type SpecResult<T> = std::result::Result<T, SpecError>;

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_route_not_found_display() {
		let err = SpecError::RouteNotFound {
			method: http::Method::GET,
			path: "/nowhere".to_string(),
		};
		assert_eq!(err.to_string(), "no route matches GET /nowhere");
	}

	#[test]
	fn test_binding_display() {
		let err = SpecError::Binding("ThingController".to_string());
		assert!(err.to_string().contains("ThingController"));
	}
}

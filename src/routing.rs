//! Route translation between symbolic options and path strings.
//!
//! The routing table itself is an external service to the harness: tests
//! only need something that can generate a path from options, recognize a
//! path back into params, and report/refresh its own emptiness. That
//! contract is [`RoutingService`]; [`RouteTable`] is the in-crate
//! implementation specs use, and [`RouteTranslator`] is the thin layer the
//! harness goes through (lazy table load, query string handling).

use crate::error::{SpecError, SpecResult};
use crate::querystring::{params_from_querystring, split_query};
use http::Method;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Parameters recognized from a path or query string. Keys are unique;
/// insertion order is irrelevant.
pub type RecognizedParams = HashMap<String, String>;

/// Symbolic route options: the controller/action pair plus any extra params.
///
/// # Examples
///
/// ```
/// use webspec::routing::RouteOptions;
///
/// let options = RouteOptions::new("things", "show").param("id", "1");
/// assert_eq!(options.controller, "things");
/// assert_eq!(options.action, "show");
/// ```
#[derive(Debug, Clone)]
pub struct RouteOptions {
	pub controller: String,
	pub action: String,
	pub params: RecognizedParams,
}

impl RouteOptions {
	pub fn new(controller: impl Into<String>, action: impl Into<String>) -> Self {
		Self {
			controller: controller.into(),
			action: action.into(),
			params: RecognizedParams::new(),
		}
	}

	/// Add an extra parameter (path segment or query value).
	pub fn param(mut self, name: impl Into<String>, value: impl ToString) -> Self {
		self.params.insert(name.into(), value.to_string());
		self
	}

	/// Flatten into a single params map with `controller` and `action` keys,
	/// the shape route recognition produces.
	pub fn to_params(&self) -> RecognizedParams {
		let mut params = self.params.clone();
		params.insert("controller".to_string(), self.controller.clone());
		params.insert("action".to_string(), self.action.clone());
		params
	}
}

/// Contract of the web framework's routing table, consumed as an opaque
/// service: path generation, path recognition, and table lifecycle.
pub trait RoutingService: Send + Sync {
	/// Produce a canonical path from symbolic options.
	fn generate(&self, options: &RouteOptions) -> SpecResult<String>;

	/// Recognize a bare path (no query string) into params, including
	/// `controller` and `action` keys.
	fn recognize(&self, method: &Method, path: &str) -> SpecResult<RecognizedParams>;

	/// Whether the table currently holds no routes.
	fn is_empty(&self) -> bool;

	/// Repopulate the table from its route source.
	fn reload(&self);
}

/// A single route definition: a `{name}`-placeholder pattern mapped to a
/// controller/action pair, optionally restricted to specific methods.
#[derive(Debug, Clone)]
pub struct RouteDef {
	pub pattern: String,
	pub controller: String,
	pub action: String,
	/// Empty means any method matches.
	pub methods: Vec<Method>,
}

impl RouteDef {
	pub fn new(
		pattern: impl Into<String>,
		controller: impl Into<String>,
		action: impl Into<String>,
	) -> Self {
		Self {
			pattern: pattern.into(),
			controller: controller.into(),
			action: action.into(),
			methods: Vec::new(),
		}
	}

	/// Restrict the route to a method. May be called repeatedly.
	pub fn via(mut self, method: Method) -> Self {
		self.methods.push(method);
		self
	}

	fn allows(&self, method: &Method) -> bool {
		self.methods.is_empty() || self.methods.contains(method)
	}

	/// Match a bare path against the pattern, capturing placeholder segments.
	fn capture(&self, path: &str) -> Option<RecognizedParams> {
		let pattern_segments: Vec<&str> = self.pattern.trim_matches('/').split('/').collect();
		let path_segments: Vec<&str> = path.trim_matches('/').split('/').collect();
		if pattern_segments.len() != path_segments.len() {
			return None;
		}
		let mut captures = RecognizedParams::new();
		for (pat, seg) in pattern_segments.iter().zip(&path_segments) {
			if let Some(name) = pat.strip_prefix('{').and_then(|p| p.strip_suffix('}')) {
				if seg.is_empty() {
					return None;
				}
				captures.insert(name.to_string(), seg.to_string());
			} else if pat != seg {
				return None;
			}
		}
		Some(captures)
	}

	fn param_names(&self) -> Vec<&str> {
		self.pattern
			.split('/')
			.filter_map(|seg| seg.strip_prefix('{').and_then(|p| p.strip_suffix('}')))
			.collect()
	}
}

/// Shorthand for [`RouteDef::new`].
///
/// # Examples
///
/// ```
/// use webspec::routing::route;
/// use http::Method;
///
/// let def = route("/things/{id}", "things", "show").via(Method::GET);
/// assert_eq!(def.pattern, "/things/{id}");
/// ```
pub fn route(
	pattern: impl Into<String>,
	controller: impl Into<String>,
	action: impl Into<String>,
) -> RouteDef {
	RouteDef::new(pattern, controller, action)
}

type RouteLoader = Box<dyn Fn() -> Vec<RouteDef> + Send + Sync>;

/// Pattern-based [`RoutingService`] with a lazily invoked route source.
///
/// The table starts empty; [`RouteTable::reload`] pulls definitions from the
/// loader closure. [`RouteTranslator`] reloads only when the table reports
/// itself empty, so the source runs at most once per process under the
/// harness's single-threaded test execution.
///
/// # Examples
///
/// ```
/// use webspec::routing::{route, RouteTable, RoutingService, RouteOptions};
///
/// let table = RouteTable::with_loader(|| {
///     vec![route("/things/{id}", "things", "show")]
/// });
/// assert!(table.is_empty());
/// table.reload();
///
/// let options = RouteOptions::new("things", "show").param("id", "1");
/// assert_eq!(table.generate(&options).unwrap(), "/things/1");
/// ```
pub struct RouteTable {
	routes: RwLock<Vec<RouteDef>>,
	loader: Option<RouteLoader>,
}

impl RouteTable {
	/// An empty table with no route source.
	pub fn new() -> Self {
		Self {
			routes: RwLock::new(Vec::new()),
			loader: None,
		}
	}

	/// A table whose routes come from `loader` on [`reload`](RoutingService::reload).
	pub fn with_loader<F>(loader: F) -> Self
	where
		F: Fn() -> Vec<RouteDef> + Send + Sync + 'static,
	{
		Self {
			routes: RwLock::new(Vec::new()),
			loader: Some(Box::new(loader)),
		}
	}

	/// Replace the table contents directly.
	pub fn draw(&self, routes: Vec<RouteDef>) {
		*self.routes.write() = routes;
	}
}

impl Default for RouteTable {
	fn default() -> Self {
		Self::new()
	}
}

impl RoutingService for RouteTable {
	fn generate(&self, options: &RouteOptions) -> SpecResult<String> {
		let routes = self.routes.read();
		let candidate = routes
			.iter()
			.find(|r| r.controller == options.controller && r.action == options.action)
			.ok_or_else(|| {
				SpecError::RouteGeneration(format!(
					"no route for controller {:?} action {:?}",
					options.controller, options.action
				))
			})?;

		// Single-pass placeholder substitution over the pattern segments.
		let mut path = String::with_capacity(candidate.pattern.len());
		let mut used: Vec<&str> = Vec::new();
		for segment in candidate.pattern.trim_matches('/').split('/') {
			path.push('/');
			if let Some(name) = segment.strip_prefix('{').and_then(|p| p.strip_suffix('}')) {
				let value = options.params.get(name).ok_or_else(|| {
					SpecError::RouteGeneration(format!(
						"missing param {:?} for route {:?}",
						name, candidate.pattern
					))
				})?;
				path.push_str(value);
				used.push(name);
			} else {
				path.push_str(segment);
			}
		}

		// Leftover params ride along as a query string, sorted for
		// deterministic output.
		let mut leftovers: Vec<(&String, &String)> = options
			.params
			.iter()
			.filter(|(k, _)| !used.contains(&k.as_str()))
			.collect();
		if !leftovers.is_empty() {
			leftovers.sort_by_key(|(k, _)| k.as_str());
			let qs: Vec<String> = leftovers
				.into_iter()
				.map(|(k, v)| format!("{}={}", k, v))
				.collect();
			path.push('?');
			path.push_str(&qs.join("&"));
		}
		Ok(path)
	}

	fn recognize(&self, method: &Method, path: &str) -> SpecResult<RecognizedParams> {
		let routes = self.routes.read();
		for def in routes.iter() {
			if !def.allows(method) {
				continue;
			}
			if let Some(mut params) = def.capture(path) {
				params.insert("controller".to_string(), def.controller.clone());
				params.insert("action".to_string(), def.action.clone());
				tracing::debug!(%method, path, controller = %def.controller, action = %def.action, "route recognized");
				return Ok(params);
			}
		}
		Err(SpecError::RouteNotFound {
			method: method.clone(),
			path: path.to_string(),
		})
	}

	fn is_empty(&self) -> bool {
		self.routes.read().is_empty()
	}

	fn reload(&self) {
		if let Some(loader) = &self.loader {
			let routes = loader();
			tracing::debug!(count = routes.len(), "route table reloaded");
			*self.routes.write() = routes;
		}
	}
}

/// Stateless front to a [`RoutingService`]: symbolic options to paths and
/// back, with query strings stripped and merged for the caller.
#[derive(Clone)]
pub struct RouteTranslator {
	service: Arc<dyn RoutingService>,
}

impl RouteTranslator {
	pub fn new(service: Arc<dyn RoutingService>) -> Self {
		Self { service }
	}

	/// Generate the canonical path for the given options.
	///
	/// # Errors
	///
	/// [`SpecError::RouteGeneration`] when the service cannot produce a path
	/// (unknown controller/action or missing required params).
	pub fn path_for(&self, options: &RouteOptions) -> SpecResult<String> {
		self.ensure_loaded();
		self.service.generate(options)
	}

	/// Recognize `path` (optionally carrying a query string) into params.
	/// Query params are decoded and merged over the recognized ones.
	///
	/// # Errors
	///
	/// [`SpecError::RouteNotFound`] when no route matches the method+path.
	pub fn params_for(&self, method: &Method, path: &str) -> SpecResult<RecognizedParams> {
		self.ensure_loaded();
		let (bare, querystring) = split_query(path);
		let mut params = self.service.recognize(method, bare)?;
		if let Some(qs) = querystring {
			params.extend(params_from_querystring(qs));
		}
		Ok(params)
	}

	// Check-then-act is safe only because tests run one at a time; parallel
	// runners must load the table once at process start instead.
	fn ensure_loaded(&self) {
		if self.service.is_empty() {
			self.service.reload();
		}
	}
}

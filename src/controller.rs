//! Controller contract and per-action plumbing.
//!
//! The web framework's controller base type is consumed as a contract:
//! anything implementing [`Controller`] can be bound to an example group.
//! Whether a type is a genuine controller is an explicit capability fact
//! held by the [`ControllerRegistry`], populated once when the application's
//! types are registered, instead of ancestor-chain introspection at test
//! time.

use crate::error::SpecResult;
use crate::render::{RenderOptions, RenderSurface};
use crate::routing::RecognizedParams;
use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// A simulated request, dispatched synchronously into a controller action.
#[derive(Debug, Clone)]
pub struct TestRequest {
	pub method: Method,
	pub path: String,
	pub headers: HeaderMap,
	pub body: Bytes,
}

impl TestRequest {
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self {
			method,
			path: path.into(),
			headers: HeaderMap::new(),
			body: Bytes::new(),
		}
	}
}

/// The response assembled while an action runs.
#[derive(Debug)]
pub struct Response {
	pub status: StatusCode,
	pub headers: HeaderMap,
	pub body: Bytes,
}

impl Response {
	pub fn ok() -> Self {
		Self {
			status: StatusCode::OK,
			headers: HeaderMap::new(),
			body: Bytes::new(),
		}
	}

	/// The body as UTF-8, lossily decoded.
	pub fn body_string(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}
}

/// Session state attached to the controller instance for the duration of a
/// test. Values are JSON so specs can store whatever the application does.
#[derive(Debug, Clone, Default)]
pub struct Session {
	values: HashMap<String, serde_json::Value>,
}

impl Session {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn insert(&mut self, key: impl Into<String>, value: serde_json::Value) {
		self.values.insert(key.into(), value);
	}

	pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
		self.values.get(key)
	}

	pub fn contains(&self, key: &str) -> bool {
		self.values.contains_key(key)
	}

	pub fn is_empty(&self) -> bool {
		self.values.is_empty()
	}
}

/// Everything an action sees for one dispatch: the request, the merged
/// params, the attached session, and the render surface installed for the
/// test's mode.
pub struct ActionContext {
	pub request: TestRequest,
	pub params: RecognizedParams,
	pub session: Session,
	surface: Arc<RenderSurface>,
	status: StatusCode,
	body: String,
}

impl ActionContext {
	pub(crate) fn new(
		request: TestRequest,
		params: RecognizedParams,
		session: Session,
		surface: Arc<RenderSurface>,
	) -> Self {
		Self {
			request,
			params,
			session,
			surface,
			status: StatusCode::OK,
			body: String::new(),
		}
	}

	pub fn param(&self, name: &str) -> Option<&str> {
		self.params.get(name).map(String::as_str)
	}

	/// Render through the installed surface. In integration mode the output
	/// is appended to the response body; in isolation mode the attempt is
	/// recorded and nothing is produced.
	pub fn render(&mut self, options: RenderOptions) -> SpecResult<()> {
		if let Some(html) = self.surface.render(&options)? {
			self.body.push_str(&html);
		}
		Ok(())
	}

	pub fn render_template(&mut self, name: impl Into<String>) -> SpecResult<()> {
		self.render(RenderOptions::template(name))
	}

	pub fn render_partial(&mut self, name: impl Into<String>) -> SpecResult<()> {
		self.render(RenderOptions::partial(name))
	}

	pub fn template_exists(&self, name: &str) -> bool {
		self.surface.template_exists(name)
	}

	pub fn set_status(&mut self, status: StatusCode) {
		self.status = status;
	}

	pub(crate) fn finish(self) -> (Response, Session) {
		(
			Response {
				status: self.status,
				headers: HeaderMap::new(),
				body: Bytes::from(self.body),
			},
			self.session,
		)
	}
}

/// The controller contract: a type name for binding and path derivation,
/// and a dispatch entry point for named actions.
#[async_trait]
pub trait Controller: Send + Sync {
	/// The controller's type name, e.g. `"ThingController"`.
	fn name(&self) -> &str;

	async fn dispatch(&self, action: &str, ctx: &mut ActionContext) -> SpecResult<()>;
}

type ControllerFactory = Arc<dyn Fn() -> Arc<dyn Controller> + Send + Sync>;

/// Registry of known controller types. Registration is the "is a
/// controller" fact the harness checks at setup; each test gets a fresh
/// instance from the factory, so no state leaks between tests.
#[derive(Clone, Default)]
pub struct ControllerRegistry {
	factories: Arc<RwLock<HashMap<String, ControllerFactory>>>,
}

impl ControllerRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Register a controller type by name with its per-test factory.
	///
	/// # Examples
	///
	/// ```
	/// use webspec::controller::{ActionContext, Controller, ControllerRegistry};
	/// use webspec::error::SpecResult;
	/// use async_trait::async_trait;
	/// use std::sync::Arc;
	///
	/// struct PingController;
	///
	/// #[async_trait]
	/// impl Controller for PingController {
	///     fn name(&self) -> &str { "PingController" }
	///     async fn dispatch(&self, _action: &str, _ctx: &mut ActionContext) -> SpecResult<()> {
	///         Ok(())
	///     }
	/// }
	///
	/// let registry = ControllerRegistry::new();
	/// registry.register("PingController", || Arc::new(PingController));
	/// assert!(registry.is_controller("PingController"));
	/// ```
	pub fn register<F>(&self, name: impl Into<String>, factory: F)
	where
		F: Fn() -> Arc<dyn Controller> + Send + Sync + 'static,
	{
		self.factories
			.write()
			.insert(name.into(), Arc::new(factory));
	}

	pub fn is_controller(&self, name: &str) -> bool {
		self.factories.read().contains_key(name)
	}

	/// Build a fresh instance of the named controller.
	pub fn build(&self, name: &str) -> Option<Arc<dyn Controller>> {
		let factory = self.factories.read().get(name).cloned()?;
		Some(factory())
	}
}

/// Derive the controller path from a type name: lower-snake-case minus the
/// trailing `controller` segment.
///
/// # Examples
///
/// ```
/// use webspec::controller::controller_path;
///
/// assert_eq!(controller_path("ThingController"), "thing");
/// assert_eq!(controller_path("AdminUsersController"), "admin_users");
/// ```
pub fn controller_path(type_name: &str) -> String {
	let snake = underscore(type_name);
	snake
		.strip_suffix("_controller")
		.unwrap_or(&snake)
		.to_string()
}

/// Resolve a short binding name to the controller type name:
/// `"thing"` becomes `"ThingController"`. Names already carrying the suffix
/// pass through unchanged.
pub fn controller_type_name(name: &str) -> String {
	if name.ends_with("Controller") {
		return name.to_string();
	}
	format!("{}Controller", camelize(name))
}

fn underscore(s: &str) -> String {
	let mut out = String::with_capacity(s.len() + 4);
	for (i, ch) in s.chars().enumerate() {
		if ch.is_uppercase() {
			if i > 0 {
				out.push('_');
			}
			out.extend(ch.to_lowercase());
		} else {
			out.push(ch);
		}
	}
	out
}

fn camelize(s: &str) -> String {
	s.split('_')
		.filter(|part| !part.is_empty())
		.map(|part| {
			let mut chars = part.chars();
			match chars.next() {
				Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
				None => String::new(),
			}
		})
		.collect()
}

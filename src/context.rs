//! Example groups and the per-test controller context.
//!
//! A group declares which controller it exercises and in which mode its
//! examples run; both settings are inherited by nested groups until
//! overridden. For each example, [`ControllerTestContext::new`] performs the
//! setup sequence: reset mail capture, resolve and verify the controller
//! binding, derive the controller path, install the render surface for the
//! effective mode, and attach session state. The context then dispatches
//! simulated requests and answers the queries specs assert against.

use crate::controller::{
	ActionContext, Controller, ControllerRegistry, Response, Session, TestRequest,
	controller_path, controller_type_name,
};
use crate::error::{SpecError, SpecResult};
use crate::mail::MailOutbox;
use crate::matcher::RouteForMatcher;
use crate::querystring::params_from_querystring;
use crate::render::{RenderRecord, RenderSurface};
use crate::routing::{RecognizedParams, RouteOptions, RouteTranslator, RoutingService};
use crate::stub::{RenderMatcher, RenderProxy};
use crate::template::{TemplateEngine, TeraEngine};
use http::Method;
use parking_lot::Mutex;
use std::sync::Arc;

/// How a group's examples run: with views faked out (the default) or with
/// the full rendering pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestGroupMode {
	Isolation,
	Integration,
}

/// A node in the example-group tree. Mode and controller binding are
/// optional overrides; unset values are inherited from the nearest ancestor.
pub struct ExampleGroup {
	name: String,
	mode: Option<TestGroupMode>,
	controller: Option<String>,
	parent: Option<Arc<ExampleGroup>>,
}

impl ExampleGroup {
	/// A root group describing `subject` (typically a controller type name).
	pub fn describe(subject: impl Into<String>) -> Self {
		Self {
			name: subject.into(),
			mode: None,
			controller: None,
			parent: None,
		}
	}

	/// A nested group inheriting this group's mode and binding.
	pub fn subgroup(self: &Arc<Self>, name: impl Into<String>) -> ExampleGroup {
		ExampleGroup {
			name: name.into(),
			mode: None,
			controller: None,
			parent: Some(Arc::clone(self)),
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	/// Switch this group (and, by inheritance, its children) between
	/// integration and isolation mode.
	pub fn set_integration_mode(&mut self, integrate: bool) {
		self.mode = Some(if integrate {
			TestGroupMode::Integration
		} else {
			TestGroupMode::Isolation
		});
	}

	/// Bind the controller explicitly by short name:
	/// `controller_name("thing")` binds `ThingController`.
	pub fn controller_name(&mut self, name: &str) {
		self.controller = Some(controller_type_name(name));
	}

	/// Bind the controller explicitly by full type name.
	pub fn describes(&mut self, type_name: impl Into<String>) {
		self.controller = Some(type_name.into());
	}

	/// Effective mode: the nearest ancestor's explicit setting, defaulting
	/// to isolation at the root.
	pub fn effective_mode(&self) -> TestGroupMode {
		match (self.mode, &self.parent) {
			(Some(mode), _) => mode,
			(None, Some(parent)) => parent.effective_mode(),
			(None, None) => TestGroupMode::Isolation,
		}
	}

	pub fn is_integration_mode(&self) -> bool {
		self.effective_mode() == TestGroupMode::Integration
	}

	fn resolved_controller(&self, registry: &ControllerRegistry) -> Option<String> {
		if let Some(explicit) = &self.controller {
			return Some(explicit.clone());
		}
		if registry.is_controller(&self.name) {
			return Some(self.name.clone());
		}
		self.parent
			.as_ref()
			.and_then(|p| p.resolved_controller(registry))
	}
}

/// The externally owned collaborators a spec run wires together once.
pub struct SpecEnv {
	pub registry: ControllerRegistry,
	pub routing: Arc<dyn RoutingService>,
	pub engine: Arc<dyn TemplateEngine>,
	pub outbox: Option<Arc<MailOutbox>>,
}

impl SpecEnv {
	pub fn new(registry: ControllerRegistry, routing: Arc<dyn RoutingService>) -> Self {
		Self {
			registry,
			routing,
			engine: Arc::new(TeraEngine::new()),
			outbox: None,
		}
	}

	pub fn with_engine(mut self, engine: Arc<dyn TemplateEngine>) -> Self {
		self.engine = engine;
		self
	}

	pub fn with_outbox(mut self, outbox: Arc<MailOutbox>) -> Self {
		self.outbox = Some(outbox);
		self
	}
}

/// Per-test orchestrator: owns the controller instance, its render surface
/// and record, the session, and the last request/response pair.
pub struct ControllerTestContext {
	mode: TestGroupMode,
	controller: Arc<dyn Controller>,
	controller_path: String,
	translator: RouteTranslator,
	surface: Arc<RenderSurface>,
	proxy: RenderProxy,
	record: Option<Arc<Mutex<RenderRecord>>>,
	session: Session,
	request: Option<TestRequest>,
	response: Option<Response>,
}

impl std::fmt::Debug for ControllerTestContext {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ControllerTestContext")
			.field("mode", &self.mode)
			.field("controller_path", &self.controller_path)
			.finish_non_exhaustive()
	}
}

impl ControllerTestContext {
	/// Run the per-test setup sequence for `group`.
	///
	/// # Errors
	///
	/// [`SpecError::Binding`] when no controller type resolves for the
	/// group, with a message telling the author how to bind one.
	pub fn new(group: &ExampleGroup, env: &SpecEnv) -> SpecResult<Self> {
		if let Some(outbox) = &env.outbox {
			outbox.clear();
		}

		let type_name = group
			.resolved_controller(&env.registry)
			.filter(|name| env.registry.is_controller(name))
			.ok_or_else(|| binding_error(group))?;
		let controller = env
			.registry
			.build(&type_name)
			.ok_or_else(|| binding_error(group))?;

		let mode = group.effective_mode();
		let proxy = RenderProxy::new();
		let record = match mode {
			TestGroupMode::Isolation => Some(Arc::new(Mutex::new(RenderRecord::default()))),
			TestGroupMode::Integration => None,
		};
		let surface = Arc::new(match &record {
			Some(record) => RenderSurface::recording(Arc::clone(record), proxy.clone()),
			None => RenderSurface::pass_through(Arc::clone(&env.engine), proxy.clone()),
		});

		tracing::debug!(
			group = group.name(),
			controller = %type_name,
			?mode,
			"controller test context ready"
		);

		Ok(Self {
			mode,
			controller,
			controller_path: controller_path(&type_name),
			translator: RouteTranslator::new(Arc::clone(&env.routing)),
			surface,
			proxy,
			record,
			session: Session::new(),
			request: None,
			response: None,
		})
	}

	pub fn mode(&self) -> TestGroupMode {
		self.mode
	}

	pub fn controller(&self) -> &Arc<dyn Controller> {
		&self.controller
	}

	pub fn controller_path(&self) -> &str {
		&self.controller_path
	}

	/// The last dispatched request.
	pub fn request(&self) -> Option<&TestRequest> {
		self.request.as_ref()
	}

	/// The last response.
	pub fn response(&self) -> Option<&Response> {
		self.response.as_ref()
	}

	pub fn session(&self) -> &Session {
		&self.session
	}

	pub fn session_mut(&mut self) -> &mut Session {
		&mut self.session
	}

	// ---- dispatch -------------------------------------------------------

	pub async fn get(&mut self, action: &str) -> SpecResult<&Response> {
		self.process(Method::GET, action, RecognizedParams::new())
			.await
	}

	pub async fn get_with(
		&mut self,
		action: &str,
		params: RecognizedParams,
	) -> SpecResult<&Response> {
		self.process(Method::GET, action, params).await
	}

	pub async fn post(&mut self, action: &str) -> SpecResult<&Response> {
		self.process(Method::POST, action, RecognizedParams::new())
			.await
	}

	pub async fn post_with(
		&mut self,
		action: &str,
		params: RecognizedParams,
	) -> SpecResult<&Response> {
		self.process(Method::POST, action, params).await
	}

	pub async fn put(&mut self, action: &str) -> SpecResult<&Response> {
		self.process(Method::PUT, action, RecognizedParams::new())
			.await
	}

	pub async fn put_with(
		&mut self,
		action: &str,
		params: RecognizedParams,
	) -> SpecResult<&Response> {
		self.process(Method::PUT, action, params).await
	}

	pub async fn delete(&mut self, action: &str) -> SpecResult<&Response> {
		self.process(Method::DELETE, action, RecognizedParams::new())
			.await
	}

	pub async fn delete_with(
		&mut self,
		action: &str,
		params: RecognizedParams,
	) -> SpecResult<&Response> {
		self.process(Method::DELETE, action, params).await
	}

	/// Dispatch a simulated request into the bound controller's action and
	/// capture the request/response pair.
	pub async fn process(
		&mut self,
		method: Method,
		action: &str,
		extra: RecognizedParams,
	) -> SpecResult<&Response> {
		let mut options = RouteOptions::new(&self.controller_path, action);
		options.params = extra;

		// The routing table is not required for dispatch; fall back to a
		// synthesized path when no route generates.
		let path = self
			.translator
			.path_for(&options)
			.unwrap_or_else(|_| format!("/{}/{}", self.controller_path, action));
		let request = TestRequest::new(method, path);

		tracing::debug!(
			method = %request.method,
			path = %request.path,
			action,
			"dispatching simulated request"
		);

		let session = std::mem::take(&mut self.session);
		let mut ctx = ActionContext::new(
			request.clone(),
			options.to_params(),
			session,
			Arc::clone(&self.surface),
		);
		self.controller.dispatch(action, &mut ctx).await?;
		let (response, session) = ctx.finish();

		self.session = session;
		self.request = Some(request);
		Ok(self.response.insert(response))
	}

	// ---- render queries -------------------------------------------------

	/// The first non-layout template the action attempted to render.
	/// Always `None` in integration mode, where nothing is recorded.
	pub fn rendered_template(&self) -> Option<String> {
		self.record
			.as_ref()
			.and_then(|r| r.lock().first_template().map(str::to_string))
	}

	/// How many times the named partial was rendered (isolation mode).
	pub fn partial_count(&self, name: &str) -> usize {
		self.record
			.as_ref()
			.map(|r| r.lock().partial_count(name))
			.unwrap_or(0)
	}

	/// True when no render attempt has been recorded.
	pub fn render_record_is_empty(&self) -> bool {
		self.record.as_ref().is_none_or(|r| r.lock().is_empty())
	}

	/// Whether an expectation or stub consumed a render call.
	pub fn performed_render(&self) -> bool {
		self.surface.performed_render()
	}

	// ---- render expectations -------------------------------------------

	pub fn expect_render(&self, matcher: RenderMatcher) {
		self.proxy.expect(matcher);
	}

	pub fn expect_render_with_body(&self, matcher: RenderMatcher, body: impl Into<String>) {
		self.proxy.expect_with_body(matcher, body);
	}

	pub fn stub_render(&self, matcher: RenderMatcher) {
		self.proxy.stub(matcher);
	}

	/// Fail the test if any registered render expectation was never met.
	pub fn verify_render_expectations(&self) {
		if let Err(failure) = self.proxy.verify() {
			panic!("{}", failure);
		}
	}

	// ---- routes ---------------------------------------------------------

	/// A matcher asserting that a path recognizes to exactly `options`.
	pub fn route_for(&self, options: RouteOptions) -> RouteForMatcher {
		RouteForMatcher::new(self.translator.clone(), options)
	}

	/// Recognize a path (optionally with query string) into params.
	pub fn params_from(&self, method: Method, path: &str) -> SpecResult<RecognizedParams> {
		self.translator.params_for(&method, path)
	}

	/// Decode a bare query string.
	pub fn params_from_querystring(&self, querystring: &str) -> RecognizedParams {
		params_from_querystring(querystring)
	}
}

fn binding_error(group: &ExampleGroup) -> SpecError {
	SpecError::Binding(format!(
		"group {:?} does not resolve to a registered controller; \
		 declare one with controller_name(\"example\") or describe a \
		 registered controller type",
		group.name()
	))
}

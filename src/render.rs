//! Render interception.
//!
//! Every controller instance under test carries a [`RenderSurface`], the
//! strategy chosen at setup time. Integration mode gets a pass-through
//! surface whose calls hit the real [`TemplateEngine`](crate::template::TemplateEngine)
//! untouched. Isolation mode gets a recording surface: the template
//! existence probe always answers yes, template selection notes the first
//! non-layout name and hands back an inert [`PickedTemplate`], and the
//! top-level render entry point updates the [`RenderRecord`] instead of
//! producing output. Explicit render expectations and stubs
//! ([`RenderProxy`](crate::stub::RenderProxy)) take precedence over both.

use crate::error::SpecResult;
use crate::stub::RenderProxy;
use crate::template::TemplateEngine;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Templates under this prefix never populate the first-template slot.
pub const LAYOUT_PREFIX: &str = "layouts/";

/// Options for a single render call. Unknown combinations are not an error:
/// in isolation mode unrecognized fields are silently ignored, and in
/// integration mode they are the real pipeline's concern.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderOptions {
	pub template: Option<String>,
	pub file: Option<String>,
	pub partial: Option<String>,
	/// Context handed to the engine in integration mode; ignored when
	/// recording.
	pub context: serde_json::Value,
}

impl RenderOptions {
	pub fn template(name: impl Into<String>) -> Self {
		Self {
			template: Some(name.into()),
			..Default::default()
		}
	}

	pub fn file(name: impl Into<String>) -> Self {
		Self {
			file: Some(name.into()),
			..Default::default()
		}
	}

	pub fn partial(name: impl Into<String>) -> Self {
		Self {
			partial: Some(name.into()),
			..Default::default()
		}
	}

	pub fn with_context(mut self, context: serde_json::Value) -> Self {
		self.context = context;
		self
	}
}

/// Per-test capture of what a controller action tried to render.
///
/// Created empty at test start (isolation mode only), populated by the
/// recording surface, read by assertions, dropped with the test.
#[derive(Debug, Default)]
pub struct RenderRecord {
	first_template: Option<String>,
	partial_counts: HashMap<String, usize>,
}

impl RenderRecord {
	/// Note a selected template. First write wins; layout names are ignored.
	fn note_template(&mut self, name: &str) {
		if name.starts_with(LAYOUT_PREFIX) {
			return;
		}
		if self.first_template.is_none() {
			self.first_template = Some(name.to_string());
		}
	}

	/// Note a `file` render option. First write wins; no layout filter, the
	/// caller named the file explicitly.
	fn note_file(&mut self, name: &str) {
		if self.first_template.is_none() {
			self.first_template = Some(name.to_string());
		}
	}

	fn note_partial(&mut self, name: &str) {
		*self.partial_counts.entry(name.to_string()).or_insert(0) += 1;
	}

	/// The first non-layout template an action attempted to render.
	pub fn first_template(&self) -> Option<&str> {
		self.first_template.as_deref()
	}

	/// How many times the named partial was rendered.
	pub fn partial_count(&self, name: &str) -> usize {
		self.partial_counts.get(name).copied().unwrap_or(0)
	}

	pub fn partials(&self) -> &HashMap<String, usize> {
		&self.partial_counts
	}

	pub fn is_empty(&self) -> bool {
		self.first_template.is_none() && self.partial_counts.is_empty()
	}
}

/// Inert placeholder handed back by template selection in isolation mode.
/// Its render operations deliberately do nothing.
pub struct PickedTemplate;

impl PickedTemplate {
	pub fn render_template(&self) {}
	pub fn render_partial(&self) {}
}

/// Which rendering behavior a controller instance carries.
pub enum RenderStrategy {
	/// Integration mode: the real pipeline executes untouched.
	PassThrough(Arc<dyn TemplateEngine>),
	/// Isolation mode: render attempts are observed, never executed.
	Recording(Arc<Mutex<RenderRecord>>),
}

/// The rendering surface installed on a controller instance at test setup.
pub struct RenderSurface {
	strategy: RenderStrategy,
	proxy: RenderProxy,
	performed_render: AtomicBool,
}

impl RenderSurface {
	pub fn pass_through(engine: Arc<dyn TemplateEngine>, proxy: RenderProxy) -> Self {
		Self {
			strategy: RenderStrategy::PassThrough(engine),
			proxy,
			performed_render: AtomicBool::new(false),
		}
	}

	pub fn recording(record: Arc<Mutex<RenderRecord>>, proxy: RenderProxy) -> Self {
		Self {
			strategy: RenderStrategy::Recording(record),
			proxy,
			performed_render: AtomicBool::new(false),
		}
	}

	pub fn is_recording(&self) -> bool {
		matches!(self.strategy, RenderStrategy::Recording(_))
	}

	/// Whether an expectation or stub consumed a render call.
	pub fn performed_render(&self) -> bool {
		self.performed_render.load(Ordering::Relaxed)
	}

	/// The template existence probe. When recording, always true: the normal
	/// pipeline must believe any requested template exists, since it will
	/// never actually be loaded.
	pub fn template_exists(&self, name: &str) -> bool {
		match &self.strategy {
			RenderStrategy::Recording(_) => true,
			RenderStrategy::PassThrough(engine) => engine.template_exists(name),
		}
	}

	/// The top-level render entry point. Returns the rendered body in
	/// integration mode, `None` when the call was recorded, stubbed, or
	/// answered by a bodiless expectation.
	pub fn render(&self, options: &RenderOptions) -> SpecResult<Option<String>> {
		if let Some(body) = self.proxy.consume_expectation(options) {
			tracing::debug!(?options, "render call answered by expectation");
			self.performed_render.store(true, Ordering::Relaxed);
			return Ok(body);
		}
		if self.proxy.has_matching_stub(options) {
			tracing::debug!(?options, "render call swallowed by stub");
			self.performed_render.store(true, Ordering::Relaxed);
			return Ok(None);
		}

		match &self.strategy {
			RenderStrategy::Recording(record) => {
				let mut record = record.lock();
				if let Some(name) = &options.template {
					// The select-and-load step, replaced: note the name and
					// hand the pipeline an inert renderer.
					record.note_template(name);
					let picked = PickedTemplate;
					picked.render_template();
				}
				if let Some(file) = &options.file {
					record.note_file(file);
				}
				if let Some(partial) = &options.partial {
					record.note_partial(partial);
				}
				Ok(None)
			}
			RenderStrategy::PassThrough(engine) => {
				let context = if options.context.is_null() {
					serde_json::json!({})
				} else {
					options.context.clone()
				};
				if let Some(partial) = &options.partial {
					let name = partial_template_name(partial);
					return engine.render(&name, &context).map(Some);
				}
				if let Some(name) = options.template.as_ref().or(options.file.as_ref()) {
					return engine.render(name, &context).map(Some);
				}
				// Nothing to render is bookkeeping, not an error.
				Ok(None)
			}
		}
	}
}

/// Resolve a partial name to its template file by the leading-underscore
/// convention: `"thing"` becomes `"_thing"`, `"things/thing"` becomes
/// `"things/_thing"`.
pub fn partial_template_name(name: &str) -> String {
	match name.rsplit_once('/') {
		Some((dir, base)) => format!("{}/_{}", dir, base),
		None => format!("_{}", name),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::stub::RenderMatcher;
	use crate::template::TeraEngine;

	fn recording_surface() -> (RenderSurface, Arc<Mutex<RenderRecord>>) {
		let record = Arc::new(Mutex::new(RenderRecord::default()));
		let surface = RenderSurface::recording(record.clone(), RenderProxy::new());
		(surface, record)
	}

	#[test]
	fn test_recording_captures_first_template() {
		let (surface, record) = recording_surface();
		surface.render(&RenderOptions::template("things/show")).unwrap();
		surface.render(&RenderOptions::template("things/other")).unwrap();
		assert_eq!(record.lock().first_template(), Some("things/show"));
	}

	#[test]
	fn test_recording_ignores_layout_templates() {
		let (surface, record) = recording_surface();
		surface
			.render(&RenderOptions::template("layouts/application"))
			.unwrap();
		surface.render(&RenderOptions::template("things/show")).unwrap();
		assert_eq!(record.lock().first_template(), Some("things/show"));
	}

	#[test]
	fn test_recording_counts_partials() {
		let (surface, record) = recording_surface();
		surface.render(&RenderOptions::partial("thing")).unwrap();
		surface.render(&RenderOptions::partial("thing")).unwrap();
		surface.render(&RenderOptions::partial("other")).unwrap();
		let record = record.lock();
		assert_eq!(record.partial_count("thing"), 2);
		assert_eq!(record.partial_count("other"), 1);
		assert_eq!(record.partial_count("missing"), 0);
	}

	#[test]
	fn test_recording_file_option_fills_template_slot() {
		let (surface, record) = recording_surface();
		surface.render(&RenderOptions::file("things/export")).unwrap();
		assert_eq!(record.lock().first_template(), Some("things/export"));
	}

	#[test]
	fn test_recording_probe_always_reports_existing() {
		let (surface, _) = recording_surface();
		assert!(surface.template_exists("definitely/not/there"));
	}

	#[test]
	fn test_recording_produces_no_output() {
		let (surface, _) = recording_surface();
		let body = surface.render(&RenderOptions::template("things/show")).unwrap();
		assert!(body.is_none());
	}

	#[test]
	fn test_stub_takes_precedence_over_recording() {
		let record = Arc::new(Mutex::new(RenderRecord::default()));
		let proxy = RenderProxy::new();
		proxy.stub(RenderMatcher::Template("things/show".into()));
		let surface = RenderSurface::recording(record.clone(), proxy);

		surface.render(&RenderOptions::template("things/show")).unwrap();
		assert!(surface.performed_render());
		assert!(record.lock().is_empty());
	}

	#[test]
	fn test_expectation_answers_with_canned_body() {
		let record = Arc::new(Mutex::new(RenderRecord::default()));
		let proxy = RenderProxy::new();
		proxy.expect_with_body(RenderMatcher::Any, "<canned/>");
		let surface = RenderSurface::recording(record.clone(), proxy);

		let body = surface.render(&RenderOptions::template("things/show")).unwrap();
		assert_eq!(body.as_deref(), Some("<canned/>"));
		assert!(surface.performed_render());
		assert!(record.lock().is_empty());
	}

	#[test]
	fn test_pass_through_renders_for_real() {
		let engine = Arc::new(
			TeraEngine::with_templates(&[("things/show", "<p>{{ name }}</p>")]).unwrap(),
		);
		let surface = RenderSurface::pass_through(engine, RenderProxy::new());
		let body = surface
			.render(
				&RenderOptions::template("things/show")
					.with_context(serde_json::json!({"name": "widget"})),
			)
			.unwrap();
		assert_eq!(body.as_deref(), Some("<p>widget</p>"));
	}

	#[test]
	fn test_pass_through_partial_uses_underscore_convention() {
		let engine =
			Arc::new(TeraEngine::with_templates(&[("things/_thing", "<li>x</li>")]).unwrap());
		let surface = RenderSurface::pass_through(engine, RenderProxy::new());
		let body = surface
			.render(&RenderOptions::partial("things/thing"))
			.unwrap();
		assert_eq!(body.as_deref(), Some("<li>x</li>"));
	}

	#[test]
	fn test_pass_through_unknown_template_errors() {
		let engine = Arc::new(TeraEngine::new());
		let surface = RenderSurface::pass_through(engine, RenderProxy::new());
		let result = surface.render(&RenderOptions::template("missing"));
		assert!(result.is_err());
	}

	#[test]
	fn test_partial_template_name() {
		assert_eq!(partial_template_name("thing"), "_thing");
		assert_eq!(partial_template_name("things/thing"), "things/_thing");
	}
}

//! Template engine contract and the tera-backed implementation.
//!
//! Integration mode renders for real; the engine behind it is pluggable so
//! the harness never depends on how a host application resolves templates.

use crate::error::{SpecError, SpecResult};

/// The rendering surface the harness consumes from the view layer: a
/// template existence probe and a render call. Isolation mode bypasses both.
pub trait TemplateEngine: Send + Sync {
	fn template_exists(&self, name: &str) -> bool;

	/// Render `name` with the given context. Errors are the real pipeline's
	/// responsibility and surface as [`SpecError::Template`].
	fn render(&self, name: &str, context: &serde_json::Value) -> SpecResult<String>;
}

/// [`TemplateEngine`] backed by [`tera`], with templates registered inline.
///
/// # Examples
///
/// ```
/// use webspec::template::{TemplateEngine, TeraEngine};
///
/// let engine = TeraEngine::with_templates(&[
///     ("things/show", "<h1>{{ title }}</h1>"),
/// ]).unwrap();
///
/// assert!(engine.template_exists("things/show"));
/// let html = engine.render("things/show", &serde_json::json!({"title": "hi"})).unwrap();
/// assert_eq!(html, "<h1>hi</h1>");
/// ```
pub struct TeraEngine {
	tera: tera::Tera,
}

impl TeraEngine {
	/// An engine with no templates registered.
	pub fn new() -> Self {
		Self {
			tera: tera::Tera::default(),
		}
	}

	/// Register `(name, body)` pairs as raw templates.
	pub fn with_templates(templates: &[(&str, &str)]) -> SpecResult<Self> {
		let mut tera = tera::Tera::default();
		tera.add_raw_templates(templates.to_vec())
			.map_err(|e| SpecError::Template(e.to_string()))?;
		Ok(Self { tera })
	}
}

impl Default for TeraEngine {
	fn default() -> Self {
		Self::new()
	}
}

impl TemplateEngine for TeraEngine {
	fn template_exists(&self, name: &str) -> bool {
		self.tera.get_template_names().any(|n| n == name)
	}

	fn render(&self, name: &str, context: &serde_json::Value) -> SpecResult<String> {
		let context = tera::Context::from_value(context.clone())
			.map_err(|e| SpecError::Template(e.to_string()))?;
		self.tera
			.render(name, &context)
			.map_err(|e| SpecError::Template(e.to_string()))
	}
}

//! Controller spec harness: dispatch simulated requests into controllers
//! and assert on what they tried to render and how routes resolve.
//!
//! Examples run in one of two modes. In **isolation mode** (the default)
//! templates are faked out entirely: the action runs, the harness records
//! which template it selected and which partials it rendered, and no markup
//! is produced. Failures point at the controller, not at the view layer. In
//! **integration mode** the real template engine executes, so one group can
//! cover the full request-to-markup path. Groups nest, and both the mode and
//! the controller binding are inherited until a child overrides them.
//!
//! # Quick start
//!
//! ```
//! use std::sync::Arc;
//! use webspec::prelude::*;
//!
//! struct ThingController;
//!
//! #[async_trait::async_trait]
//! impl Controller for ThingController {
//!     fn name(&self) -> &str {
//!         "ThingController"
//!     }
//!
//!     async fn dispatch(&self, action: &str, ctx: &mut ActionContext) -> SpecResult<()> {
//!         match action {
//!             "show" => ctx.render_template("things/show"),
//!             _ => Ok(()),
//!         }
//!     }
//! }
//!
//! # tokio_test::block_on(async {
//! let registry = ControllerRegistry::new();
//! registry.register("ThingController", || Arc::new(ThingController));
//!
//! let table = RouteTable::with_loader(|| {
//!     vec![route("/things/{id}", "things", "show")]
//! });
//! let env = SpecEnv::new(registry, Arc::new(table));
//!
//! let group = ExampleGroup::describe("ThingController");
//! let mut ctx = ControllerTestContext::new(&group, &env).unwrap();
//!
//! ctx.get_with("show", [("id".to_string(), "1".to_string())].into()).await.unwrap();
//! assert_eq!(ctx.rendered_template().as_deref(), Some("things/show"));
//! assert!(ctx.route_for(RouteOptions::new("things", "show").param("id", 1))
//!     .matches("/things/1"));
//! # });
//! ```

pub mod context;
pub mod controller;
pub mod error;
pub mod logging;
pub mod mail;
pub mod matcher;
pub mod querystring;
pub mod render;
pub mod routing;
pub mod stub;
pub mod template;

pub use context::{ControllerTestContext, ExampleGroup, SpecEnv, TestGroupMode};
pub use controller::{ActionContext, Controller, ControllerRegistry};
pub use error::{SpecError, SpecResult};
pub use matcher::{RouteExpectation, RouteForMatcher};
pub use querystring::params_from_querystring;
pub use render::{RenderOptions, RenderRecord};
pub use routing::{RecognizedParams, RouteOptions, RouteTable, RoutingService, route};
pub use stub::{RenderMatcher, RenderProxy};

/// Everything a controller spec typically imports.
pub mod prelude {
	pub use crate::context::{ControllerTestContext, ExampleGroup, SpecEnv, TestGroupMode};
	pub use crate::controller::{
		ActionContext, Controller, ControllerRegistry, Response, Session, TestRequest,
	};
	pub use crate::error::{SpecError, SpecResult};
	pub use crate::mail::{EmailDelivery, MailOutbox};
	pub use crate::matcher::{RouteExpectation, RouteForMatcher};
	pub use crate::querystring::params_from_querystring;
	pub use crate::render::{RenderOptions, RenderRecord};
	pub use crate::routing::{
		RecognizedParams, RouteDef, RouteOptions, RouteTable, RouteTranslator, RoutingService,
		route,
	};
	pub use crate::stub::{RenderMatcher, RenderProxy};
	pub use crate::template::{TemplateEngine, TeraEngine};
}

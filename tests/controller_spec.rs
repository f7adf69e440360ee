//! End-to-end controller specs: a small application wired through the
//! harness, exercised in both modes.

use std::sync::Arc;

use webspec::logging::init_test_logging;
use webspec::prelude::*;

/// Shows a thing and lists its widgets through a partial rendered twice.
struct ThingController;

#[async_trait::async_trait]
impl Controller for ThingController {
	fn name(&self) -> &str {
		"ThingController"
	}

	async fn dispatch(&self, action: &str, ctx: &mut ActionContext) -> SpecResult<()> {
		match action {
			"show" => {
				ctx.render(
					RenderOptions::template("things/show")
						.with_context(serde_json::json!({"name": "widget"})),
				)?;
				ctx.render_partial("things/thing")?;
				ctx.render_partial("things/thing")?;
				Ok(())
			}
			"remember" => {
				ctx.session.insert("last_thing", serde_json::json!("widget"));
				Ok(())
			}
			_ => Ok(()),
		}
	}
}

/// Sends a notification instead of rendering.
struct NotifierController {
	outbox: Arc<MailOutbox>,
}

#[async_trait::async_trait]
impl Controller for NotifierController {
	fn name(&self) -> &str {
		"NotifierController"
	}

	async fn dispatch(&self, action: &str, _ctx: &mut ActionContext) -> SpecResult<()> {
		if action == "notify" {
			self.outbox.deliver(EmailDelivery {
				to: vec!["user@example.com".to_string()],
				subject: "Thing updated".to_string(),
				body: "A thing changed.".to_string(),
			});
		}
		Ok(())
	}
}

fn registry(outbox: &Arc<MailOutbox>) -> ControllerRegistry {
	let registry = ControllerRegistry::new();
	registry.register("ThingController", || Arc::new(ThingController));
	let outbox = Arc::clone(outbox);
	registry.register("NotifierController", move || {
		Arc::new(NotifierController {
			outbox: Arc::clone(&outbox),
		})
	});
	registry
}

fn routes() -> RouteTable {
	RouteTable::with_loader(|| {
		vec![
			route("/things/{id}", "thing", "show").via(http::Method::GET),
			route("/things/{id}/edit", "thing", "edit").via(http::Method::GET),
			route("/notifier/notify", "notifier", "notify").via(http::Method::POST),
		]
	})
}

fn engine() -> Arc<TeraEngine> {
	let engine = TeraEngine::with_templates(&[
		("things/show", "<h1>{{ name }}</h1>"),
		("things/_thing", "<li>thing</li>"),
	])
	.expect("test templates parse");
	Arc::new(engine)
}

fn env() -> (SpecEnv, Arc<MailOutbox>) {
	init_test_logging();
	let outbox = Arc::new(MailOutbox::new());
	let env = SpecEnv::new(registry(&outbox), Arc::new(routes()))
		.with_engine(engine())
		.with_outbox(Arc::clone(&outbox));
	(env, outbox)
}

fn id_param(id: &str) -> RecognizedParams {
	[("id".to_string(), id.to_string())].into()
}

#[tokio::test]
async fn isolation_records_template_and_partials_without_output() {
	let (env, _) = env();
	let group = ExampleGroup::describe("ThingController");
	let mut ctx = ControllerTestContext::new(&group, &env).unwrap();

	let response = ctx.get_with("show", id_param("1")).await.unwrap();
	assert!(response.body_string().is_empty());

	assert_eq!(ctx.rendered_template().as_deref(), Some("things/show"));
	assert_eq!(ctx.partial_count("things/thing"), 2);
	assert_eq!(ctx.partial_count("things/other"), 0);
}

#[tokio::test]
async fn integration_renders_real_markup_and_records_nothing() {
	let (env, _) = env();
	let mut group = ExampleGroup::describe("ThingController");
	group.set_integration_mode(true);
	let mut ctx = ControllerTestContext::new(&group, &env).unwrap();

	let response = ctx.get_with("show", id_param("1")).await.unwrap();
	let body = response.body_string();
	assert!(body.contains("<h1>widget</h1>"), "body was {:?}", body);
	assert!(body.contains("<li>thing</li>"));

	assert_eq!(ctx.rendered_template(), None);
	assert!(ctx.render_record_is_empty());
}

#[tokio::test]
async fn nested_groups_inherit_and_override_mode_independently() {
	let (env, _) = env();
	let root = Arc::new(ExampleGroup::describe("ThingController"));
	let inherited = root.subgroup("with defaults");
	let mut overridden = root.subgroup("rendering views");
	overridden.set_integration_mode(true);
	let sibling = root.subgroup("still isolated");

	assert_eq!(inherited.effective_mode(), TestGroupMode::Isolation);
	assert_eq!(overridden.effective_mode(), TestGroupMode::Integration);
	assert_eq!(sibling.effective_mode(), TestGroupMode::Isolation);

	let ctx = ControllerTestContext::new(&overridden, &env).unwrap();
	assert_eq!(ctx.mode(), TestGroupMode::Integration);
	let ctx = ControllerTestContext::new(&sibling, &env).unwrap();
	assert_eq!(ctx.mode(), TestGroupMode::Isolation);
}

#[tokio::test]
async fn binding_resolves_from_group_name_or_explicit_declaration() {
	let (env, _) = env();

	// The group name is a registered controller type.
	let by_name = ExampleGroup::describe("ThingController");
	let ctx = ControllerTestContext::new(&by_name, &env).unwrap();
	assert_eq!(ctx.controller().name(), "ThingController");
	assert_eq!(ctx.controller_path(), "thing");

	// An arbitrary group name with an explicit short-name binding.
	let mut described = ExampleGroup::describe("showing things");
	described.controller_name("thing");
	let ctx = ControllerTestContext::new(&described, &env).unwrap();
	assert_eq!(ctx.controller().name(), "ThingController");

	// Full type name binding.
	let mut by_type = ExampleGroup::describe("notifications");
	by_type.describes("NotifierController");
	let ctx = ControllerTestContext::new(&by_type, &env).unwrap();
	assert_eq!(ctx.controller().name(), "NotifierController");

	// Children inherit the binding.
	let parent = Arc::new(described);
	let child = parent.subgroup("with an id");
	let ctx = ControllerTestContext::new(&child, &env).unwrap();
	assert_eq!(ctx.controller().name(), "ThingController");
}

#[tokio::test]
async fn unresolved_binding_fails_setup_with_guidance() {
	let (env, _) = env();
	let group = ExampleGroup::describe("behavior with no controller");
	let err = ControllerTestContext::new(&group, &env).unwrap_err();
	match err {
		SpecError::Binding(message) => {
			assert!(message.contains("controller_name"), "{}", message);
		}
		other => panic!("expected a binding error, got {:?}", other),
	}
}

#[tokio::test]
async fn route_for_matches_literal_and_options_forms() {
	let (env, _) = env();
	let group = ExampleGroup::describe("ThingController");
	let ctx = ControllerTestContext::new(&group, &env).unwrap();

	assert!(
		ctx.route_for(RouteOptions::new("thing", "show").param("id", 1))
			.matches("/things/1")
	);
	assert!(
		ctx.route_for(
			RouteOptions::new("thing", "edit")
				.param("id", 2)
				.param("flag", "true")
		)
		.matches("/things/2/edit?flag=true")
	);
	assert!(
		ctx.route_for(RouteOptions::new("notifier", "notify")).matches(
			RouteExpectation::options("/notifier/notify").method(http::Method::POST)
		)
	);
}

#[tokio::test]
async fn route_for_mismatch_reports_both_sides() {
	let (env, _) = env();
	let group = ExampleGroup::describe("ThingController");
	let ctx = ControllerTestContext::new(&group, &env).unwrap();

	let failure = ctx
		.route_for(RouteOptions::new("thing", "show").param("id", 1))
		.check("/things/2")
		.unwrap_err();
	assert!(failure.contains("id: \"1\""), "{}", failure);
	assert!(failure.contains("id: \"2\""), "{}", failure);
}

#[tokio::test]
async fn params_from_recognizes_path_and_merges_query() {
	let (env, _) = env();
	let group = ExampleGroup::describe("ThingController");
	let ctx = ControllerTestContext::new(&group, &env).unwrap();

	let params = ctx
		.params_from(http::Method::GET, "/things/1/edit?flag=true")
		.unwrap();
	assert_eq!(params["controller"], "thing");
	assert_eq!(params["action"], "edit");
	assert_eq!(params["id"], "1");
	assert_eq!(params["flag"], "true");

	let qs = ctx.params_from_querystring("a=1&b=2&c");
	assert_eq!(qs["a"], "1");
	assert_eq!(qs["b"], "2");
	assert_eq!(qs["c"], "");
}

#[tokio::test]
async fn session_survives_across_requests_in_one_test() {
	let (env, _) = env();
	let group = ExampleGroup::describe("ThingController");
	let mut ctx = ControllerTestContext::new(&group, &env).unwrap();

	ctx.get("remember").await.unwrap();
	assert_eq!(
		ctx.session().get("last_thing"),
		Some(&serde_json::json!("widget"))
	);

	ctx.get_with("show", id_param("1")).await.unwrap();
	assert!(ctx.session().contains("last_thing"));
}

#[tokio::test]
async fn outbox_is_cleared_at_setup_and_captures_deliveries() {
	let (env, outbox) = env();

	let group = ExampleGroup::describe("NotifierController");
	let mut ctx = ControllerTestContext::new(&group, &env).unwrap();
	ctx.post("notify").await.unwrap();
	assert_eq!(outbox.deliveries().len(), 1);
	assert_eq!(outbox.deliveries()[0].subject, "Thing updated");

	// The next test's setup sees a clean outbox.
	let _ctx = ControllerTestContext::new(&group, &env).unwrap();
	assert!(outbox.is_empty());
}

#[tokio::test]
async fn render_stub_suppresses_recording_for_matching_calls() {
	let (env, _) = env();
	let group = ExampleGroup::describe("ThingController");
	let mut ctx = ControllerTestContext::new(&group, &env).unwrap();

	ctx.stub_render(RenderMatcher::Template("things/show".into()));
	ctx.get_with("show", id_param("1")).await.unwrap();

	// The stubbed template call was swallowed; the partials still recorded.
	assert!(ctx.performed_render());
	assert_eq!(ctx.rendered_template(), None);
	assert_eq!(ctx.partial_count("things/thing"), 2);
}

#[tokio::test]
async fn render_expectation_answers_with_canned_body_in_integration_mode() {
	let (env, _) = env();
	let mut group = ExampleGroup::describe("ThingController");
	group.set_integration_mode(true);
	let mut ctx = ControllerTestContext::new(&group, &env).unwrap();

	ctx.expect_render_with_body(
		RenderMatcher::Template("things/show".into()),
		"<canned/>",
	);
	let response = ctx.get_with("show", id_param("1")).await.unwrap();
	let body = response.body_string();
	assert!(body.contains("<canned/>"), "body was {:?}", body);
	assert!(!body.contains("<h1>"), "real template ran: {:?}", body);

	ctx.verify_render_expectations();
}

#[tokio::test]
#[should_panic(expected = "never satisfied")]
async fn unmet_render_expectation_fails_verification() {
	let (env, _) = env();
	let group = ExampleGroup::describe("ThingController");
	let ctx = ControllerTestContext::new(&group, &env).unwrap();

	ctx.expect_render(RenderMatcher::Template("things/missing".into()));
	ctx.verify_render_expectations();
}

#[tokio::test]
async fn dispatch_synthesizes_a_path_when_no_route_generates() {
	let (env, _) = env();
	let group = ExampleGroup::describe("ThingController");
	let mut ctx = ControllerTestContext::new(&group, &env).unwrap();

	// "remember" has no route; dispatch still works against a fallback path.
	ctx.get("remember").await.unwrap();
	let request = ctx.request().unwrap();
	assert_eq!(request.path, "/thing/remember");
	assert_eq!(request.method, http::Method::GET);
}

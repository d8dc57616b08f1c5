//! End-to-end page lifecycles across the server and client.

use std::sync::Arc;

use edge_core::{
    variables, BufferedResponse, ClientPageContext, ExecutionContext, Method, Navigator,
    PropsResult, Redirect, RequestContext, RouteState, ServerPageContext,
};
use edge_data::memory::{network, MemoryEnvironment};
use edge_data::{FetchError, FetchPolicy, QueryDescriptor, QuerySet, QueryStatus, SharedEnvironment};
use edge_hydration::HydrationSlot;
use edge_preload::{
    wire, Page, PageProps, PreloadOptions, PreloadedPage, PropsFn, ReadyQueries, RenderOutcome,
    SeedSource,
};
use edge_streaming::{BoundaryState, DocumentShell, HeadContent};
use futures::executor::block_on;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct ProductProps {
    currency: String,
}

struct ProductPage;

impl Page for ProductPage {
    type Props = ProductProps;

    fn render(&self, props: &ProductProps, queries: &ReadyQueries) -> String {
        let title = queries
            .get("home")
            .and_then(|data| data["title"].as_str())
            .unwrap_or("none");
        format!("<article><h1>{}</h1><span>{}</span></article>", title, props.currency)
    }
}

struct NoopNavigator;

impl Navigator for NoopNavigator {
    fn push(&self, _destination: &str) {}
}

fn d1() -> QueryDescriptor {
    QueryDescriptor::new("d1", "ProductQuery")
}

fn descriptors() -> QuerySet {
    QuerySet::single("home", d1())
}

fn catalog() -> Arc<MemoryEnvironment> {
    Arc::new(MemoryEnvironment::new(network(|_, vars| async move {
        let id = vars.get("id").and_then(Value::as_str).unwrap_or("?").to_string();
        Ok(json!({ "title": format!("Product {}", id) }))
    })))
}

fn eur(_: &ExecutionContext) -> anyhow::Result<PropsResult<ProductProps>> {
    Ok(PropsResult::Props(ProductProps {
        currency: "EUR".into(),
    }))
}

fn server_page(env: Arc<MemoryEnvironment>) -> PreloadedPage<ProductPage> {
    let options = PreloadOptions::new()
        .with_server_props(PropsFn(eur))
        .with_server_environment(move |_, _| env.clone() as SharedEnvironment)
        .with_hydration_slot(Arc::new(HydrationSlot::new()));
    wire(ProductPage, descriptors(), options)
}

fn client_page(env: Arc<MemoryEnvironment>) -> PreloadedPage<ProductPage> {
    let options = PreloadOptions::new()
        .with_fallback("<p>Loading...</p>")
        .with_client_props(PropsFn(eur))
        .with_client_environment(move || env.clone() as SharedEnvironment)
        .with_hydration_slot(Arc::new(HydrationSlot::new()));
    wire(ProductPage, descriptors(), options)
}

fn server_context(route: &RouteState) -> (ExecutionContext, Arc<BufferedResponse>) {
    let response = Arc::new(BufferedResponse::new());
    let request = RequestContext::new(Method::Get, route.clone());
    let context = ExecutionContext::Server(ServerPageContext::new(request, response.clone()));
    (context, response)
}

fn route(id: &str, revision: u64) -> RouteState {
    RouteState {
        revision,
        ..RouteState::new("/product").with_query("id", id)
    }
}

// === Server Happy Path ===

#[test]
fn test_server_happy_path() {
    let env = catalog();
    let page = server_page(env.clone());
    let (ctx, response) = server_context(&route("7", 0));

    let props = block_on(page.initial_props(&ctx)).unwrap();

    assert!(response.status().is_none());
    let loads = env.loads();
    assert_eq!(loads.len(), 1);
    assert_eq!(loads[0].descriptor, d1());
    assert_eq!(loads[0].variables, variables([("id", "7")]));

    let context = props.server_context().unwrap();
    assert_eq!(context.variables.for_slot("home"), variables([("id", "7")]));
    assert_eq!(context.descriptors, descriptors());
    assert_eq!(context.preloaded_queries.len(), 1);
    assert_eq!(
        context.query("home").unwrap().status(),
        QueryStatus::Ready(Arc::new(json!({"title": "Product 7"})))
    );
}

#[test]
fn test_server_default_variables_include_route_params() {
    let env = catalog();
    let page = server_page(env.clone());
    let (ctx, _) = server_context(&RouteState::new("/products/42").with_param("id", "42"));

    let props = block_on(page.initial_props(&ctx)).unwrap();

    assert_eq!(env.loads()[0].variables, variables([("id", "42")]));
    assert_eq!(
        props.server_context().unwrap().query("home").unwrap().status(),
        QueryStatus::Ready(Arc::new(json!({"title": "Product 42"})))
    );
}

// === Redirect Precedence ===

#[test]
fn test_redirect_status_precedence() {
    let cases = [
        (Redirect::to("/login").with_permanent(true), 308),
        (Redirect::to("/login").with_permanent(false), 307),
        (Redirect::to("/login").with_permanent(true).with_status(301), 301),
        (Redirect::to("/login"), 302),
    ];

    for (redirect, expected) in cases {
        let env = catalog();
        let handle = env.clone();
        let directive = redirect.clone();
        let options = PreloadOptions::<ProductProps>::new()
            .with_server_props(PropsFn(
                move |_: &ExecutionContext| -> anyhow::Result<PropsResult<ProductProps>> {
                    Ok(PropsResult::Redirect(directive.clone()))
                },
            ))
            .with_server_environment(move |_, _| handle.clone() as SharedEnvironment);
        let page = wire(ProductPage, descriptors(), options);
        let (ctx, response) = server_context(&route("7", 0));

        let props = block_on(page.initial_props(&ctx)).unwrap();

        assert_eq!(response.status().map(|s| s.as_u16()), Some(expected));
        assert_eq!(response.location().as_deref(), Some("/login"));
        assert!(props.server_context().is_none());
        assert_eq!(env.load_count(), 0, "no load for {:?}", redirect);
    }
}

#[test]
fn test_server_redirect_to_non_ascii_destination_keeps_location() {
    let env = catalog();
    let handle = env.clone();
    let options = PreloadOptions::<ProductProps>::new()
        .with_server_props(PropsFn(
            |_: &ExecutionContext| -> anyhow::Result<PropsResult<ProductProps>> {
                Ok(PropsResult::Redirect(Redirect::to("/café")))
            },
        ))
        .with_server_environment(move |_, _| handle.clone() as SharedEnvironment);
    let page = wire(ProductPage, descriptors(), options);
    let (ctx, response) = server_context(&route("7", 0));

    let props = block_on(page.initial_props(&ctx)).unwrap();

    assert_eq!(response.status().map(|s| s.as_u16()), Some(302));
    assert_eq!(response.location().as_deref(), Some("/caf%C3%A9"));
    assert_eq!(props.redirect.unwrap().destination, "/café");
    assert_eq!(env.load_count(), 0);
}

// === Settle-All Flush ===

#[test]
fn test_server_flush_settles_partial_failure() {
    let env = Arc::new(MemoryEnvironment::new(network(|descriptor, _| async move {
        match descriptor.id.as_str() {
            "broken" => Err(FetchError::Http {
                status: 502,
                message: "bad gateway".into(),
            }),
            _ => Ok(json!({"title": "ok"})),
        }
    })));
    let handle = env.clone();
    let options = PreloadOptions::<ProductProps>::new()
        .with_server_environment(move |_, _| handle.clone() as SharedEnvironment);
    let descriptors = QuerySet::new()
        .with("home", d1())
        .with("reviews", QueryDescriptor::new("broken", "ReviewsQuery"));
    let page = wire(ProductPage, descriptors, options);
    let (ctx, _) = server_context(&route("7", 0));

    let props = block_on(page.initial_props(&ctx)).unwrap();

    let context = props.server_context().unwrap();
    assert!(matches!(
        context.query("reviews").unwrap().status(),
        QueryStatus::Failed(FetchError::Http { status: 502, .. })
    ));
    assert!(matches!(
        context.query("home").unwrap().status(),
        QueryStatus::Ready(_)
    ));
    assert_eq!(env.load_count(), 2);
}

// === Client Rehydration ===

#[test]
fn test_client_rehydration_avoids_refetch() {
    let server = server_page(catalog());
    let first_paint = route("7", 0);
    let (ctx, _) = server_context(&first_paint);
    let server_props = block_on(server.initial_props(&ctx)).unwrap();
    let render = server.render_server(&server_props, &first_paint).unwrap();
    let state_json = render.state.as_ref().unwrap().to_json().unwrap();
    let props_json = serde_json::to_string(&server_props).unwrap();

    let client_env = Arc::new(MemoryEnvironment::offline());
    let client = client_page(client_env.clone());
    client.bootstrap_from_document_state(&state_json).unwrap();
    let props: PageProps<ProductProps> = serde_json::from_str(&props_json).unwrap();

    let mut instance = client.mount(&props, &first_paint);
    let outcome = instance.render(&props, &first_paint).unwrap();

    assert_eq!(instance.seed_source(), SeedSource::SerializedState);
    let home = instance.query("home").unwrap();
    assert!(home.source().is_none());
    let loads = client_env.loads();
    assert_eq!(loads.len(), 1);
    assert_eq!(loads[0].fetch_policy, FetchPolicy::StoreOrNetwork);
    assert!(!loads[0].hit_network);

    match outcome {
        RenderOutcome::Rendered(html) => assert_eq!(html, render.html),
        other => panic!("expected direct render, got {:?}", other),
    }
}

#[test]
fn test_serialized_state_consumed_once() {
    let server = server_page(catalog());
    let first_paint = route("7", 0);
    let (ctx, _) = server_context(&first_paint);
    let server_props = block_on(server.initial_props(&ctx)).unwrap();
    let state = server.render_server(&server_props, &first_paint).unwrap().state.unwrap();

    let client = client_page(Arc::new(MemoryEnvironment::offline()));
    client.bootstrap_from_document_state(&state.to_json().unwrap()).unwrap();
    let props = PageProps::new(ProductProps::default());

    let first = client.mount(&props, &first_paint);
    let second = client.mount(&props, &first_paint);

    assert_eq!(first.seed_source(), SeedSource::SerializedState);
    assert_eq!(second.seed_source(), SeedSource::Empty);
}

// === Navigation ===

#[test]
fn test_in_place_navigation_uses_boundary_initial_mount_does_not() {
    let server = server_page(catalog());
    let first_paint = route("7", 0);
    let (ctx, _) = server_context(&first_paint);
    let server_props = block_on(server.initial_props(&ctx)).unwrap();
    let render = server.render_server(&server_props, &first_paint).unwrap();

    let client_env = catalog();
    let client = client_page(client_env.clone());
    client
        .bootstrap_from_document_state(&render.state.unwrap().to_json().unwrap())
        .unwrap();
    let props = PageProps::new(ProductProps {
        currency: "EUR".into(),
    });
    let mut instance = client.mount(&props, &first_paint);

    let initial = instance.render(&props, &first_paint).unwrap();
    assert!(!initial.has_boundary());
    assert!(!instance.detector().has_changed());
    assert_eq!(initial.html(), Some(render.html.as_str()));

    let navigated = first_paint.navigate("/product", [("id".to_string(), "8".to_string())].into());
    let after = instance.render(&props, &navigated).unwrap();

    assert!(instance.detector().has_changed());
    match after {
        RenderOutcome::Boundary { state, html } => {
            assert_eq!(state, BoundaryState::Ready);
            assert_eq!(html, "<article><h1>Product 8</h1><span>EUR</span></article>");
        }
        other => panic!("expected boundary, got {:?}", other),
    }
    let refetch = &client_env.loads()[1];
    assert_eq!(refetch.fetch_policy, FetchPolicy::StoreAndNetwork);
    assert_eq!(refetch.variables, variables([("id", "8")]));
}

#[test]
fn test_client_side_navigation_renders_in_boundary() {
    let env = catalog();
    let page = client_page(env.clone());
    let target = route("9", 3);
    let ctx = ExecutionContext::Client(ClientPageContext::new(
        target.clone(),
        Arc::new(NoopNavigator),
    ));

    let props = block_on(page.initial_props(&ctx)).unwrap();
    let mut instance = page.mount(&props, &target);
    let outcome = instance.render(&props, &target).unwrap();

    assert_eq!(instance.seed_source(), SeedSource::ClientContext);
    assert!(outcome.has_boundary());
    assert_eq!(
        outcome.html(),
        Some("<article><h1>Product 9</h1><span>EUR</span></article>")
    );
    assert_eq!(env.load_count(), 1);

    instance.unmount();
    assert_eq!(env.dispose_count(), 1);
}

// === Document ===

#[test]
fn test_document_embeds_state_after_markup() {
    let server = server_page(catalog());
    let first_paint = route("7", 0);
    let (ctx, _) = server_context(&first_paint);
    let props = block_on(server.initial_props(&ctx)).unwrap();

    let document = server
        .render_server(&props, &first_paint)
        .unwrap()
        .document(DocumentShell::new(HeadContent::new("Product")))
        .unwrap();

    let markup = document.find("<article>").unwrap();
    let script = document.find(edge_hydration::STATE_SCRIPT_ID).unwrap();
    assert!(markup < script);
    assert!(document.contains("<title>Product</title>"));
}

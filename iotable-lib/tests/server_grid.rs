//! Server-mode refresh ordering, cancellation and failure handling.

use async_trait::async_trait;
use serde_json::{Value as Json, json};
use tokio::sync::{mpsc, oneshot};

use iotable_lib::error::TransportError;
use iotable_lib::event::{EventLog, LoadStatus};
use iotable_lib::render::Body;
use iotable_lib::{
    ColumnDef, Grid, GridEvent, GridHooks, GridOptions, GridRegistry, GridSeed, PageTarget, SortDirective,
    Value,
};

type Reply = oneshot::Sender<Result<Json, TransportError>>;

/// Hands every request to the test, which decides when and how to answer.
struct ScriptedSource {
    calls: mpsc::UnboundedSender<(Json, Reply)>,
}

#[async_trait]
impl iotable_lib::remote::DataSource for ScriptedSource {
    async fn fetch(&self, request: Json) -> Result<Json, TransportError> {
        let (tx, rx) = oneshot::channel();
        self.calls
            .send((request, tx))
            .map_err(|_| TransportError::Handler("test harness gone".into()))?;
        rx.await
            .unwrap_or_else(|_| Err(TransportError::Handler("reply dropped".into())))
    }
}

fn options() -> GridOptions {
    GridOptions::default().server("http://scripted.test/rows")
}

fn seed() -> GridSeed {
    GridSeed::new(vec![ColumnDef::new("id").identifier(), ColumnDef::new("name")])
}

fn server_grid(options: GridOptions, hooks: GridHooks) -> (Grid, mpsc::UnboundedReceiver<(Json, Reply)>, EventLog) {
    let (tx, rx) = mpsc::unbounded_channel();
    let log = EventLog::new();
    let grid = Grid::builder(seed())
        .options(options)
        .hooks(hooks)
        .data_source(ScriptedSource { calls: tx })
        .listener(log.listener())
        .build()
        .unwrap();
    (grid, rx, log)
}

fn page(current: usize, ids: &[i64], totals: usize) -> Json {
    let rows: Vec<Json> = ids.iter().map(|id| json!({"id": id, "name": format!("n{id}")})).collect();
    json!({"current": current, "rows": rows, "totals": totals})
}

fn ids(grid: &Grid) -> Vec<Value> {
    grid.current_rows().iter().map(|r| r.get("id").clone()).collect()
}

async fn yield_a_few() {
    for _ in 0..5 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn first_refresh_requests_page_one() {
    let (mut grid, mut calls, log) = server_grid(options(), GridHooks::new());
    let (request, reply) = calls.recv().await.unwrap();
    assert_eq!(
        request,
        json!({"current": 1, "resultCount": 10, "sort": {}, "searchPhrase": ""})
    );
    reply.send(Ok(page(1, &[1, 2], 12))).unwrap();
    grid.settle().await;

    assert_eq!(ids(&grid), vec![Value::from(1), Value::from(2)]);
    assert_eq!(grid.total_rows(), 12);
    assert_eq!(grid.total_pages(), 2);
    assert!(grid.view().refresh.is_some());
    assert_eq!(log.names().last(), Some(&"loaded"));
}

#[tokio::test]
async fn slow_fetch_is_superseded_by_newer_refresh() {
    let (mut grid, mut calls, _log) = server_grid(options(), GridHooks::new());
    let (_, slow_reply) = calls.recv().await.unwrap();

    grid.search("x");
    let (request, fast_reply) = calls.recv().await.unwrap();
    assert_eq!(request["searchPhrase"], json!("x"));

    fast_reply.send(Ok(page(1, &[7], 1))).unwrap();
    grid.settle().await;
    assert_eq!(ids(&grid), vec![Value::from(7)]);

    // The superseded fetch was cancelled; its late answer goes nowhere.
    let _ = slow_reply.send(Ok(page(1, &[1, 2, 3], 3)));
    yield_a_few().await;
    assert_eq!(grid.pump(), 0);
    assert_eq!(ids(&grid), vec![Value::from(7)]);
    assert_eq!(grid.total_rows(), 1);
}

#[tokio::test]
async fn completed_but_stale_result_is_discarded() {
    let (mut grid, mut calls, log) = server_grid(options(), GridHooks::new());
    let (_, first_reply) = calls.recv().await.unwrap();
    first_reply.send(Ok(page(1, &[1], 1))).unwrap();
    yield_a_few().await;

    // The first answer is already queued when the next refresh starts.
    grid.reload();
    let (_, second_reply) = calls.recv().await.unwrap();
    second_reply.send(Ok(page(1, &[2], 1))).unwrap();
    grid.settle().await;

    assert_eq!(ids(&grid), vec![Value::from(2)]);
    assert_eq!(log.names(), vec!["initialize", "initialized", "load", "load", "loaded"]);
}

#[tokio::test]
async fn transport_failure_renders_no_results_and_keeps_state() {
    let (mut grid, mut calls, log) = server_grid(options().with_selection(true), GridHooks::new());
    let (_, reply) = calls.recv().await.unwrap();
    reply.send(Ok(page(1, &[1, 2], 2))).unwrap();
    grid.settle().await;
    grid.select(Some(&[Value::from(1)]));
    log.take();

    grid.reload();
    let (_, reply) = calls.recv().await.unwrap();
    reply.send(Err(TransportError::http(500, "boom"))).unwrap();
    grid.settle().await;

    assert!(matches!(grid.view().body, Body::NoResults(_)));
    assert_eq!(grid.selected_ids(), &[Value::from(1)]);
    assert_eq!(grid.total_rows(), 2);
    assert_eq!(grid.last_error().and_then(TransportError::status_code), Some(500));
    assert_eq!(
        log.take(),
        vec![GridEvent::Load, GridEvent::Loaded(LoadStatus::Failed)]
    );
}

#[tokio::test]
async fn request_carries_state_hooks_and_extensions() {
    let post = json!({"tenant": "acme", "current": 99}).as_object().cloned().unwrap();
    let hooks = GridHooks::new()
        .with_request_handler(|mut request| {
            request["hooked"] = json!(true);
            request
        })
        .with_response_handler(|response| {
            response
                .get("payload")
                .cloned()
                .ok_or_else(|| "missing payload".to_string())
        });
    let (mut grid, mut calls, _log) = server_grid(options().with_post(post), hooks);

    let (_, reply) = calls.recv().await.unwrap();
    reply.send(Ok(json!({"payload": page(1, &[1], 30)}))).unwrap();
    grid.settle().await;

    grid.sort(Some(SortDirective::desc("name")));
    let (request, reply) = calls.recv().await.unwrap();
    assert_eq!(request["current"], json!(1));
    assert_eq!(request["sort"], json!({"name": "desc"}));
    assert_eq!(request["tenant"], json!("acme"));
    assert_eq!(request["hooked"], json!(true));

    // The server decides which page it actually returned.
    reply.send(Ok(json!({"payload": page(3, &[21], 30)}))).unwrap();
    grid.settle().await;
    assert_eq!(grid.current_page(), 3);
    assert_eq!(grid.total_pages(), 3);

    grid.go_to_page(PageTarget::Prev);
    let (request, reply) = calls.recv().await.unwrap();
    assert_eq!(request["current"], json!(2));
    reply.send(Ok(json!({"unexpected": true}))).unwrap();
    grid.settle().await;
    assert!(matches!(grid.last_error(), Some(TransportError::Handler(_))));
}

#[tokio::test]
async fn local_only_operations_are_ignored_in_server_mode() {
    let (mut grid, mut calls, _log) = server_grid(options(), GridHooks::new());
    let (_, reply) = calls.recv().await.unwrap();
    reply.send(Ok(page(1, &[1], 1))).unwrap();
    grid.settle().await;

    assert_eq!(grid.append(vec![iotable_lib::Row::new().with("id", 5)]), 0);
    assert_eq!(grid.remove(Some(&[Value::from(1)])), 0);
    assert_eq!(grid.clear(), 0);
    assert!(!grid.is_busy());
}

#[tokio::test]
async fn unmount_cancels_outstanding_fetch() {
    let (grid, mut calls, _log) = server_grid(options(), GridHooks::new());
    let mut registry = GridRegistry::new();
    let handle = registry.mount(grid);

    let (_, reply) = calls.recv().await.unwrap();
    drop(registry.unmount(handle));
    yield_a_few().await;

    assert!(reply.is_closed());
}

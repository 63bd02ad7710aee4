mod common;

use blazegraph::{ConnectorError, GraphUpdate, HttpMethod, QueryResult, StoredGraph, TabularResult};
use common::{
    begin_response, book_graph, connector, kind, ok, status, store_with, triple, Kind,
    MockTransport,
};
use oxigraph::model::NamedNode;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc, Arc, Barrier};
use std::thread;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(10);

fn g1() -> NamedNode {
    NamedNode::new("http://example/g1").unwrap()
}

#[test]
fn test_async_save_matches_blocking_sequence() {
    let transport = MockTransport::accepting();
    let conn = connector(&transport);
    let (tx, rx) = mpsc::channel();

    conn.save_graph_async(StoredGraph::named(g1(), book_graph()), move |result| {
        tx.send(result).unwrap();
    });
    let saved = rx.recv_timeout(WAIT).unwrap().unwrap();
    assert_eq!(saved.name, Some(g1()));
    assert_eq!(saved.graph, book_graph());

    assert_eq!(
        transport.kinds(),
        vec![Kind::Begin, Kind::Data(HttpMethod::Put), Kind::Commit]
    );
    assert!(conn.active_transaction().is_none());
}

#[test]
fn test_async_failure_rolls_back_before_callback() {
    let transport = MockTransport::new(store_with(|_| status(500, "update failed")));
    let conn = connector(&transport);
    let (tx, rx) = mpsc::channel();

    let update = GraphUpdate::new(Some(g1())).add(triple(
        "http://example/book1",
        "http://example.org/ns#price",
        "42",
    ));
    let probe = conn.clone();
    conn.update_graph_async(update, move |result| {
        // the rollback has finished by the time the callback runs
        tx.send((result, probe.active_transaction())).unwrap();
    });
    let (result, active) = rx.recv_timeout(WAIT).unwrap();
    let err = result.unwrap_err();
    assert_eq!(err.status(), Some(500));
    assert!(active.is_none());
    assert_eq!(
        transport.kinds(),
        vec![Kind::Begin, Kind::Data(HttpMethod::Post), Kind::Abort]
    );
}

#[test]
fn test_async_empty_update_calls_back_once_without_requests() {
    let transport = MockTransport::accepting();
    let conn = connector(&transport);
    let (tx, rx) = mpsc::channel();

    conn.update_graph_async(GraphUpdate::new(None), move |result| {
        tx.send(result.is_ok()).unwrap();
    });
    assert!(rx.recv_timeout(WAIT).unwrap());
    assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
    assert!(transport.requests().is_empty());
}

#[test]
fn test_async_callback_runs_off_the_calling_thread() {
    let transport = MockTransport::new(store_with(|_| {
        ok("text/boolean", "true")
    }));
    let conn = connector(&transport);
    let (tx, rx) = mpsc::channel();
    let caller = thread::current().id();

    conn.query_async("ASK { ?s ?p ?o }", move |result| {
        tx.send((result, thread::current().id())).unwrap();
    });
    let (result, callback_thread) = rx.recv_timeout(WAIT).unwrap();
    assert_eq!(
        result.unwrap(),
        QueryResult::Tabular(TabularResult::Boolean(true))
    );
    assert_ne!(callback_thread, caller);
}

#[test]
fn test_async_transaction_lifecycle() {
    let transport = MockTransport::accepting();
    let conn = connector(&transport);

    let (tx, rx) = mpsc::channel();
    conn.begin_async(move |result| tx.send(result).unwrap());
    let id = rx.recv_timeout(WAIT).unwrap().unwrap();
    assert_eq!(conn.active_transaction(), Some(id.clone()));

    let (tx, rx) = mpsc::channel();
    conn.begin_async(move |result| tx.send(result).unwrap());
    assert!(matches!(
        rx.recv_timeout(WAIT).unwrap(),
        Err(ConnectorError::TransactionState(_))
    ));
    assert_eq!(conn.active_transaction(), Some(id.clone()));

    let (tx, rx) = mpsc::channel();
    conn.delete_graph_async(Some(g1()), move |result| tx.send(result).unwrap());
    rx.recv_timeout(WAIT).unwrap().unwrap();
    assert_eq!(conn.active_transaction(), Some(id.clone()));

    let (tx, rx) = mpsc::channel();
    conn.commit_async(move |result| tx.send(result).unwrap());
    rx.recv_timeout(WAIT).unwrap().unwrap();
    assert!(conn.active_transaction().is_none());

    let (tx, rx) = mpsc::channel();
    conn.rollback_async(move |result| tx.send(result).unwrap());
    assert!(matches!(
        rx.recv_timeout(WAIT).unwrap(),
        Err(ConnectorError::TransactionState(_))
    ));

    assert_eq!(
        transport.kinds(),
        vec![Kind::Begin, Kind::Data(HttpMethod::Delete), Kind::Commit]
    );
    assert!(transport.data_requests()[0]
        .url
        .ends_with(&format!("timestamp={id}")));
}

#[test]
fn test_async_transport_error_reaches_callback() {
    let transport = MockTransport::unreachable();
    let conn = connector(&transport);
    let (tx, rx) = mpsc::channel();

    conn.list_graphs_async(move |result| tx.send(result).unwrap());
    assert!(matches!(
        rx.recv_timeout(WAIT).unwrap(),
        Err(ConnectorError::Transport { .. })
    ));

    let (tx, rx) = mpsc::channel();
    conn.save_graph_async(StoredGraph::default_graph(book_graph()), move |result| {
        tx.send(result).unwrap()
    });
    // begin never succeeded, so there is nothing to roll back
    assert!(matches!(
        rx.recv_timeout(WAIT).unwrap(),
        Err(ConnectorError::Transport { .. })
    ));
    assert_eq!(transport.kinds(), vec![Kind::Data(HttpMethod::Get), Kind::Begin]);
}

#[test]
fn test_async_load_graph() {
    let transport = MockTransport::new(store_with(|_| {
        ok(
            "text/turtle",
            "<http://example/book1> <http://purl.org/dc/elements/1.1/title> \"SPARQL Tutorial\" .",
        )
    }));
    let conn = connector(&transport);
    let (tx, rx) = mpsc::channel();

    conn.load_graph_async(Some(g1()), move |result| tx.send(result).unwrap());
    let loaded = rx.recv_timeout(WAIT).unwrap().unwrap();
    assert_eq!(loaded, StoredGraph::named(g1(), book_graph()));
    assert!(transport.requests().iter().all(|r| kind(r) == Kind::Data(HttpMethod::Get)));
}

#[test]
fn test_async_caller_managed_failure_leaves_transaction_open() {
    let transport = MockTransport::new(store_with(|_| status(400, "bad graph")));
    let conn = connector(&transport);
    let id = conn.begin().unwrap();
    let (tx, rx) = mpsc::channel();

    let observer = conn.clone();
    conn.save_graph_async(StoredGraph::default_graph(book_graph()), move |result| {
        tx.send((result, observer.active_transaction())).unwrap();
    });
    let (result, active) = rx.recv_timeout(WAIT).unwrap();
    assert_eq!(result.unwrap_err().status(), Some(400));
    assert_eq!(active, Some(id.clone()));
    assert_eq!(
        transport.kinds(),
        vec![Kind::Begin, Kind::Data(HttpMethod::Post)]
    );

    conn.rollback().unwrap();
    assert!(conn.active_transaction().is_none());
}

#[test]
fn test_async_commit_failure_is_reported_without_rollback() {
    let transport = MockTransport::new(Box::new(|request| match kind(request) {
        Kind::Begin => begin_response("11"),
        Kind::Commit => status(500, "commit failed"),
        _ => ok("text/plain", ""),
    }));
    let conn = connector(&transport);
    let (tx, rx) = mpsc::channel();

    let observer = conn.clone();
    conn.delete_graph_async(Some(g1()), move |result| {
        tx.send((result, observer.active_transaction())).unwrap();
    });
    let (result, active) = rx.recv_timeout(WAIT).unwrap();
    let err = result.unwrap_err();
    assert!(matches!(err, ConnectorError::CommitFailed { .. }));
    assert_eq!(err.status(), Some(500));
    assert!(active.is_none());
    assert_eq!(
        transport.kinds(),
        vec![Kind::Begin, Kind::Data(HttpMethod::Delete), Kind::Commit]
    );
}

#[test]
fn test_async_concurrent_begin_aborts_the_losing_transaction() {
    // both begins reach the store before either id is installed
    let barrier = Arc::new(Barrier::new(2));
    let next = AtomicU64::new(1);
    let transport = MockTransport::new(Box::new(move |request| match kind(request) {
        Kind::Begin => {
            barrier.wait();
            begin_response(&next.fetch_add(1, Ordering::SeqCst).to_string())
        }
        _ => ok("application/xml", "<response/>"),
    }));
    let conn = connector(&transport);
    let (tx, rx) = mpsc::channel();

    let callers: Vec<_> = (0..2)
        .map(|_| {
            let conn = conn.clone();
            let tx = tx.clone();
            thread::spawn(move || conn.begin_async(move |result| tx.send(result).unwrap()))
        })
        .collect();
    for caller in callers {
        caller.join().unwrap();
    }
    let outcomes = [
        rx.recv_timeout(WAIT).unwrap(),
        rx.recv_timeout(WAIT).unwrap(),
    ];

    let winners: Vec<_> = outcomes.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(winners.len(), 1);
    assert!(outcomes
        .iter()
        .any(|r| matches!(r, Err(ConnectorError::TransactionState(_)))));
    assert_eq!(conn.active_transaction().as_ref(), Some(winners[0]));

    let mut kinds = transport.kinds();
    kinds.sort_by_key(|k| format!("{k:?}"));
    assert_eq!(kinds, vec![Kind::Abort, Kind::Begin, Kind::Begin]);
    let aborted = transport
        .requests()
        .into_iter()
        .find(|r| kind(r) == Kind::Abort)
        .unwrap();
    assert!(!aborted.url.contains(&format!("/tx/{}?", winners[0])));
}

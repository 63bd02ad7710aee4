mod common;

use blazegraph::consts::QUERY_TIMEOUT_HEADER;
use blazegraph::{ConnectorError, HttpMethod, QueryResult, QueryTimeout, TabularResult};
use common::{connector, ok, status, store_with, Kind, MockTransport, BASE};
use oxigraph::model::{NamedNode, Term};
use std::time::Duration;

const SELECT_JSON: &str = r#"{
  "head": { "vars": ["book", "title"] },
  "results": { "bindings": [
    { "book": { "type": "uri", "value": "http://example/book1" },
      "title": { "type": "literal", "value": "SPARQL Tutorial" } }
  ] }
}"#;

const TURTLE: &str =
    "<http://example/book1> <http://purl.org/dc/elements/1.1/title> \"SPARQL Tutorial\" .";

#[test]
fn test_ask_query_is_tabular() {
    let transport = MockTransport::new(store_with(|_| {
        ok(
            "application/sparql-results+xml",
            r#"<?xml version="1.0"?><sparql xmlns="http://www.w3.org/2005/sparql-results#"><head/><boolean>true</boolean></sparql>"#,
        )
    }));
    let conn = connector(&transport);

    let result = conn.query("ASK WHERE { ?s ?p ?o }").unwrap();
    assert_eq!(result, QueryResult::Tabular(TabularResult::Boolean(true)));
    assert!(result.as_graph().is_none());
}

#[test]
fn test_construct_falls_back_to_graph() {
    let transport = MockTransport::new(store_with(|_| ok("text/turtle", TURTLE)));
    let conn = connector(&transport);

    let result = conn
        .query("CONSTRUCT { ?s ?p ?o } WHERE { ?s ?p ?o }")
        .unwrap();
    assert_eq!(result.as_graph().map(|g| g.len()), Some(1));
}

#[test]
fn test_select_rows() {
    let transport = MockTransport::new(store_with(|_| {
        ok("application/sparql-results+json", SELECT_JSON)
    }));
    let conn = connector(&transport);

    let result = conn
        .query("SELECT ?book ?title WHERE { ?book <http://purl.org/dc/elements/1.1/title> ?title }")
        .unwrap();
    let Some(TabularResult::Solutions { variables, rows }) = result.as_tabular() else {
        panic!("expected solutions, got {result:?}");
    };
    assert_eq!(variables, &vec!["book".to_string(), "title".to_string()]);
    assert_eq!(rows.len(), 1);
    assert_eq!(
        rows[0].get("book"),
        Some(&Term::NamedNode(NamedNode::new("http://example/book1").unwrap()))
    );
}

#[test]
fn test_queries_never_open_transactions() {
    let transport = MockTransport::new(store_with(|_| ok("text/turtle", TURTLE)));
    let conn = connector(&transport);

    conn.query("CONSTRUCT WHERE { ?s ?p ?o }").unwrap();
    conn.load_graph(None).unwrap();
    assert_eq!(
        transport.kinds(),
        vec![Kind::Data(HttpMethod::Get), Kind::Data(HttpMethod::Get)]
    );
    let query = &transport.requests()[0];
    assert!(query
        .relative_to(BASE)
        .starts_with("/namespace/kb/sparql?query=CONSTRUCT"));
    assert!(!query.url.contains("timestamp"));
}

#[test]
fn test_query_inside_transaction_reads_through_it() {
    let transport = MockTransport::new(store_with(|_| ok("text/turtle", TURTLE)));
    let conn = connector(&transport);

    let id = conn.begin().unwrap();
    conn.query("CONSTRUCT WHERE { ?s ?p ?o }").unwrap();
    let query = &transport.data_requests()[0];
    assert!(query.url.ends_with(&format!("&timestamp={id}")));
    assert_eq!(conn.active_transaction(), Some(id));
}

#[test]
fn test_long_queries_are_posted_as_form() {
    let transport = MockTransport::new(store_with(|_| ok("text/turtle", TURTLE)));
    let conn = connector(&transport);
    let filler = "x".repeat(3000);
    let query = format!("CONSTRUCT WHERE {{ ?s ?p ?o }} # {filler}");

    conn.query(&query).unwrap();
    let request = &transport.requests()[0];
    assert_eq!(request.method, HttpMethod::Post);
    assert_eq!(request.relative_to(BASE), "/namespace/kb/sparql");
    assert_eq!(
        request.header("Content-Type"),
        Some("application/x-www-form-urlencoded;charset=utf-8")
    );
    let body = common::body_text(request);
    assert!(body.starts_with("query=CONSTRUCT+WHERE"));
    assert!(body.ends_with(&filler));
}

#[test]
fn test_timeout_header() {
    let transport = MockTransport::new(store_with(|_| ok("text/turtle", TURTLE)));
    let conn = connector(&transport);

    conn.query_with_timeout("CONSTRUCT WHERE { ?s ?p ?o }", Duration::from_secs(2))
        .unwrap();
    conn.query_with_timeout("CONSTRUCT WHERE { ?s ?p ?o }", -1i64)
        .unwrap();
    conn.query_with_timeout("CONSTRUCT WHERE { ?s ?p ?o }", QueryTimeout::Unspecified)
        .unwrap();

    let requests = transport.requests();
    assert_eq!(requests[0].header(QUERY_TIMEOUT_HEADER), Some("2000"));
    assert!(requests[1].header(QUERY_TIMEOUT_HEADER).is_none());
    assert!(requests[2].header(QUERY_TIMEOUT_HEADER).is_none());
}

#[test]
fn test_query_errors_are_classified() {
    let transport = MockTransport::new(store_with(|_| {
        status(400, "org.openrdf.query.MalformedQueryException")
    }));
    let err = connector(&transport).query("SELEC oops").unwrap_err();
    assert!(matches!(err, ConnectorError::Store { .. }));
    assert_eq!(err.status(), Some(400));

    let err = connector(&MockTransport::unreachable())
        .query("SELECT * WHERE { ?s ?p ?o }")
        .unwrap_err();
    assert!(matches!(err, ConnectorError::Transport { .. }));
    assert!(std::error::Error::source(&err).is_some());

    let transport = MockTransport::new(store_with(|_| ok("application/pdf", "%PDF")));
    let err = connector(&transport)
        .query("SELECT * WHERE { ?s ?p ?o }")
        .unwrap_err();
    assert!(matches!(err, ConnectorError::Parse { .. }));
}

#[test]
fn test_load_named_graph() {
    let transport = MockTransport::new(store_with(|_| ok("text/turtle", TURTLE)));
    let conn = connector(&transport);
    let g1 = NamedNode::new("http://example/g1").unwrap();

    let loaded = conn.load_graph(Some(g1.clone())).unwrap();
    assert_eq!(loaded.name, Some(g1));
    assert_eq!(loaded.len(), 1);
    let request = &transport.requests()[0];
    assert!(request.url.contains("GRAPH+%3Chttp%3A%2F%2Fexample%2Fg1%3E"));
}

#[test]
fn test_list_graphs() {
    let transport = MockTransport::new(store_with(|_| {
        ok(
            "application/sparql-results+json",
            r#"{"head":{"vars":["g"]},"results":{"bindings":[{"g":{"type":"uri","value":"http://example/g1"}}]}}"#,
        )
    }));
    let conn = connector(&transport);

    assert_eq!(
        conn.list_graphs().unwrap(),
        vec![NamedNode::new("http://example/g1").unwrap()]
    );
    assert!(transport.requests()[0].url.contains("SELECT+DISTINCT+%3Fg"));
}

#[test]
fn test_connector_describes_itself() {
    let conn = connector(&MockTransport::accepting());
    assert_eq!(
        conn.to_string(),
        "[Blazegraph] Namespace 'kb' on Server 'http://localhost:9999/bigdata'"
    );
    let caps = conn.capabilities();
    assert!(caps.delete_supported && caps.update_supported && caps.ready);
    assert!(!caps.read_only);
}

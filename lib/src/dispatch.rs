//! Routes a query response to the right decoder: SPARQL results first, RDF graph
//! second, and a parse error when neither recognizes the content type.

use crate::codec::RdfCodec;
use crate::errors::{ConnectorError, Result};
use crate::model::{QueryResult, TabularResult};
use crate::transport::HttpResponse;
use anyhow::anyhow;
use lazy_static::lazy_static;
use log::debug;
use oxigraph::model::Graph;
use regex::Regex;

lazy_static! {
    static ref ASK_KEYWORD: Regex = Regex::new(r"(?i)\bASK\b").unwrap();
}

/// Whether `query` looks like an ASK query, which lets a bare `true`/`false` body
/// through as a boolean result.
pub fn is_boolean_query(query: &str) -> bool {
    ASK_KEYWORD.is_match(query)
}

/// Outcome of trying every decoder against one body.
#[derive(Debug)]
pub enum Decoded {
    Tabular(TabularResult),
    Graph(Graph),
    Unrecognized(String),
}

pub struct ResponseDispatcher<'a> {
    codec: &'a dyn RdfCodec,
}

impl<'a> ResponseDispatcher<'a> {
    pub fn new(codec: &'a dyn RdfCodec) -> Self {
        ResponseDispatcher { codec }
    }

    /// Tries the results decoder, then the graph decoder. A decoder that claims the
    /// content type but fails to parse the body ends the attempt with an error.
    pub fn decode(&self, response: &HttpResponse, query: &str) -> Result<Decoded> {
        let context = "querying";
        let content_type = response.content_type.as_deref().unwrap_or("");
        let boolean = is_boolean_query(query);
        if let Some(tabular) = self
            .codec
            .decode_results(content_type, &response.body, boolean)
            .map_err(|e| ConnectorError::parse(context, e))?
        {
            return Ok(Decoded::Tabular(tabular));
        }
        if let Some(graph) = self
            .codec
            .decode_graph(content_type, &response.body)
            .map_err(|e| ConnectorError::parse(context, e))?
        {
            return Ok(Decoded::Graph(graph));
        }
        debug!("no decoder for content type '{}'", content_type);
        Ok(Decoded::Unrecognized(content_type.to_string()))
    }

    pub fn dispatch(&self, response: &HttpResponse, query: &str) -> Result<QueryResult> {
        match self.decode(response, query)? {
            Decoded::Tabular(t) => Ok(QueryResult::Tabular(t)),
            Decoded::Graph(g) => Ok(QueryResult::Graph(g)),
            Decoded::Unrecognized(content_type) => Err(ConnectorError::parse(
                "querying",
                anyhow!(
                    "unrecognized response content type '{}'",
                    if content_type.is_empty() {
                        "none"
                    } else {
                        content_type.as_str()
                    }
                ),
            )),
        }
    }

    /// Decodes a response that must be a graph, e.g. a CONSTRUCT issued by the connector.
    pub fn expect_graph(&self, response: &HttpResponse, context: &str) -> Result<Graph> {
        let content_type = response.content_type.as_deref().unwrap_or("");
        self.codec
            .decode_graph(content_type, &response.body)
            .map_err(|e| ConnectorError::parse(context, e))?
            .ok_or_else(|| {
                ConnectorError::parse(
                    context,
                    anyhow!("expected an RDF graph, got content type '{}'", content_type),
                )
            })
    }
}

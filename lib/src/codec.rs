//! The RDF toolkit the connector consumes: decoding SPARQL results and graphs by
//! content type, and serializing triples for upload. [`OxigraphCodec`] is the
//! default implementation.

use crate::model::{SolutionRow, TabularResult};
use anyhow::{anyhow, Result};
use oxigraph::io::{RdfFormat, RdfParser, RdfSerializer};
use oxigraph::model::{Graph, NamedNodeRef, QuadRef, Triple, TripleRef};
use oxigraph::sparql::results::{
    QueryResultsFormat, QueryResultsParser, ReaderQueryResultsParserOutput,
};

/// Strips parameters (`; charset=...`) and normalizes case.
pub fn media_type_essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}

pub trait RdfCodec: Send + Sync {
    /// Decodes a SPARQL results document. `Ok(None)` means the content type is not a
    /// results format at all, as opposed to a results document that failed to parse.
    fn decode_results(
        &self,
        content_type: &str,
        body: &[u8],
        boolean_query: bool,
    ) -> Result<Option<TabularResult>>;

    /// Decodes an RDF document into a graph. `Ok(None)` means no parser handles the
    /// content type.
    fn decode_graph(&self, content_type: &str, body: &[u8]) -> Result<Option<Graph>>;

    /// Media type produced by [`RdfCodec::encode_triples`].
    fn graph_media_type(&self) -> &'static str;

    /// Serializes `triples`, placed in `graph_name` when one is given.
    fn encode_triples(
        &self,
        graph_name: Option<NamedNodeRef<'_>>,
        triples: &mut dyn Iterator<Item = TripleRef<'_>>,
    ) -> Result<Vec<u8>>;
}

/// [`RdfCodec`] over `oxigraph::io` and `oxigraph::sparql::results`; uploads are TriG.
#[derive(Debug, Default, Clone, Copy)]
pub struct OxigraphCodec;

fn parse_boolean_text(body: &[u8]) -> Result<bool> {
    let text = std::str::from_utf8(body)?.trim();
    if text.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if text.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(anyhow!("expected 'true' or 'false', got '{}'", text))
    }
}

impl RdfCodec for OxigraphCodec {
    fn decode_results(
        &self,
        content_type: &str,
        body: &[u8],
        boolean_query: bool,
    ) -> Result<Option<TabularResult>> {
        let media = media_type_essence(content_type);
        if boolean_query && (media == "text/boolean" || media == "text/plain") {
            return Ok(Some(TabularResult::Boolean(parse_boolean_text(body)?)));
        }
        // CSV results are lossy and unparseable; `text/plain` also maps to CSV here but
        // is N-Triples on the graph side, so both fall through to the graph decoder.
        let Some(format) = QueryResultsFormat::from_media_type(&media).filter(|f| {
            matches!(
                f,
                QueryResultsFormat::Xml | QueryResultsFormat::Json | QueryResultsFormat::Tsv
            )
        }) else {
            return Ok(None);
        };
        match QueryResultsParser::from_format(format).for_reader(body)? {
            ReaderQueryResultsParserOutput::Boolean(value) => {
                Ok(Some(TabularResult::Boolean(value)))
            }
            ReaderQueryResultsParserOutput::Solutions(solutions) => {
                let variables: Vec<String> = solutions
                    .variables()
                    .iter()
                    .map(|v| v.as_str().to_string())
                    .collect();
                let mut rows = Vec::new();
                for solution in solutions {
                    let solution = solution?;
                    let row: SolutionRow = solution
                        .iter()
                        .map(|(var, term)| (var.as_str().to_string(), term.clone()))
                        .collect();
                    rows.push(row);
                }
                Ok(Some(TabularResult::Solutions { variables, rows }))
            }
        }
    }

    fn decode_graph(&self, content_type: &str, body: &[u8]) -> Result<Option<Graph>> {
        let Some(format) = RdfFormat::from_media_type(&media_type_essence(content_type)) else {
            return Ok(None);
        };
        let mut graph = Graph::new();
        for quad in RdfParser::from_format(format).for_reader(body) {
            let quad = quad?;
            let triple = Triple::new(quad.subject, quad.predicate, quad.object);
            graph.insert(&triple);
        }
        Ok(Some(graph))
    }

    fn graph_media_type(&self) -> &'static str {
        RdfFormat::TriG.media_type()
    }

    fn encode_triples(
        &self,
        graph_name: Option<NamedNodeRef<'_>>,
        triples: &mut dyn Iterator<Item = TripleRef<'_>>,
    ) -> Result<Vec<u8>> {
        let mut serializer = RdfSerializer::from_format(RdfFormat::TriG).for_writer(Vec::new());
        for t in triples {
            match graph_name {
                Some(name) => {
                    serializer.serialize_quad(QuadRef::new(t.subject, t.predicate, t.object, name))?
                }
                None => serializer.serialize_triple(t)?,
            }
        }
        Ok(serializer.finish()?)
    }
}

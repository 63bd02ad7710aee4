//! Request bodies for graph uploads: a bare TriG document for named-graph
//! replacement, multipart `add`/`remove` sections for everything else.

use crate::codec::RdfCodec;
use crate::consts::FORM_MULTIPART;
use crate::errors::{ConnectorError, Result};
use crate::model::{GraphUpdate, StoredGraph};
use oxigraph::model::{NamedNodeRef, TripleRef};

pub const ADD_PART: &str = "add";
pub const REMOVE_PART: &str = "remove";

/// Encoded body plus the `Content-Type` it must be sent with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedPayload {
    pub content_type: String,
    pub body: Vec<u8>,
    /// Set for multipart bodies.
    pub boundary: Option<String>,
}

fn new_boundary() -> String {
    format!("----------{:032x}", rand::random::<u128>())
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

struct Part {
    name: &'static str,
    content_type: String,
    data: Vec<u8>,
}

fn multipart(parts: Vec<Part>) -> EncodedPayload {
    let boundary = loop {
        let candidate = new_boundary();
        if !parts
            .iter()
            .any(|p| contains(&p.data, candidate.as_bytes()))
        {
            break candidate;
        }
    };
    let mut body = Vec::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                part.name, part.content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(&part.data);
    }
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    EncodedPayload {
        content_type: format!("{FORM_MULTIPART}; boundary={boundary}"),
        body,
        boundary: Some(boundary),
    }
}

pub struct PayloadEncoder<'a> {
    codec: &'a dyn RdfCodec,
}

impl<'a> PayloadEncoder<'a> {
    pub fn new(codec: &'a dyn RdfCodec) -> Self {
        PayloadEncoder { codec }
    }

    fn serialize(
        &self,
        graph_name: Option<NamedNodeRef<'_>>,
        triples: &mut dyn Iterator<Item = TripleRef<'_>>,
        context: &str,
    ) -> Result<Vec<u8>> {
        self.codec
            .encode_triples(graph_name, triples)
            .map_err(|e| ConnectorError::encode(context, e))
    }

    /// Whole-graph upload. A named graph becomes the entire body; the default graph
    /// is wrapped in a single multipart `add` section.
    pub fn whole_graph(&self, graph: &StoredGraph) -> Result<EncodedPayload> {
        let context = "saving a graph";
        let data = self.serialize(graph.name(), &mut graph.graph.iter(), context)?;
        if graph.name.is_some() {
            return Ok(EncodedPayload {
                content_type: self.codec.graph_media_type().to_string(),
                body: data,
                boundary: None,
            });
        }
        Ok(multipart(vec![Part {
            name: ADD_PART,
            content_type: self.codec.graph_media_type().to_string(),
            data,
        }]))
    }

    /// Incremental update: `add` then `remove`, both always present.
    pub fn update(&self, update: &GraphUpdate) -> Result<EncodedPayload> {
        let context = "updating a graph";
        let graph_name = update.graph.as_ref().map(|n| n.as_ref());
        let additions = self.serialize(
            graph_name,
            &mut update.additions.iter().map(|t| t.as_ref()),
            context,
        )?;
        let removals = self.serialize(
            graph_name,
            &mut update.removals.iter().map(|t| t.as_ref()),
            context,
        )?;
        Ok(multipart(vec![
            Part {
                name: ADD_PART,
                content_type: self.codec.graph_media_type().to_string(),
                data: additions,
            },
            Part {
                name: REMOVE_PART,
                content_type: self.codec.graph_media_type().to_string(),
                data: removals,
            },
        ]))
    }
}

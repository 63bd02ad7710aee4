use anyhow::{anyhow, Result};

use std::io::{BufReader, Write};
use std::path::Path;

use oxigraph::io::{RdfFormat, RdfParser, RdfSerializer};
use oxigraph::model::{Graph, Triple};

use log::{debug, info};

use crate::model::{QueryResult, TabularResult};

/// RDF format implied by a file extension; Turtle when unknown.
pub fn format_for_path(file: &Path) -> RdfFormat {
    let ext = file.extension().and_then(|ext| ext.to_str());
    ext.and_then(|ext| match ext.to_ascii_lowercase().as_str() {
        "ttl" | "n3" => Some(RdfFormat::Turtle),
        "xml" | "rdf" | "owl" => Some(RdfFormat::RdfXml),
        "nt" => Some(RdfFormat::NTriples),
        "nq" => Some(RdfFormat::NQuads),
        "trig" => Some(RdfFormat::TriG),
        _ => None,
    })
    .unwrap_or(RdfFormat::Turtle)
}

/// Reads every triple of an RDF file, dropping graph names of quad formats.
pub fn read_file(file: &Path) -> Result<Graph> {
    debug!("Reading file: {}", file.display());
    let format = format_for_path(file);
    let content = BufReader::new(std::fs::File::open(file)?);
    let mut graph = Graph::new();
    for quad in RdfParser::from_format(format).for_reader(content) {
        let quad = quad.map_err(|e| anyhow!("failed to parse {}: {}", file.display(), e))?;
        graph.insert(&Triple::new(quad.subject, quad.predicate, quad.object));
    }
    Ok(graph)
}

pub fn write_graph<W: Write>(graph: &Graph, format: RdfFormat, writer: W) -> Result<()> {
    let mut serializer = RdfSerializer::from_format(format).for_writer(writer);
    for triple in graph.iter() {
        serializer.serialize_triple(triple)?;
    }
    serializer.finish()?;
    Ok(())
}

pub fn write_graph_to_file(graph: &Graph, file: &Path) -> Result<()> {
    info!(
        "Writing graph to file: {} with length {}",
        file.display(),
        graph.len()
    );
    let file_handle = std::fs::File::create(file)?;
    write_graph(graph, format_for_path(file), file_handle)
}

/// Renders a query answer for terminal output: `true`/`false`, tab-separated
/// bindings with a header line, or N-Triples.
pub fn render_query_result(result: &QueryResult) -> Result<String> {
    match result {
        QueryResult::Tabular(TabularResult::Boolean(value)) => Ok(value.to_string()),
        QueryResult::Tabular(TabularResult::Solutions { variables, rows }) => {
            let mut out = variables
                .iter()
                .map(|v| format!("?{v}"))
                .collect::<Vec<_>>()
                .join("\t");
            for row in rows {
                out.push('\n');
                let cells: Vec<String> = variables
                    .iter()
                    .map(|v| row.get(v).map(|t| t.to_string()).unwrap_or_default())
                    .collect();
                out.push_str(&cells.join("\t"));
            }
            Ok(out)
        }
        QueryResult::Graph(graph) => {
            let mut buf = Vec::new();
            write_graph(graph, RdfFormat::NTriples, &mut buf)?;
            Ok(String::from_utf8(buf)?.trim_end().to_string())
        }
    }
}

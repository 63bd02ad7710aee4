use anyhow::{anyhow, Error, Result};
use blazegraph::util::{read_file, render_query_result, write_graph, write_graph_to_file};
use blazegraph::{BlazegraphConnector, ConnectionConfig, GraphUpdate, QueryTimeout, StoredGraph};
use clap::{Parser, Subcommand};
use log::info;
use oxigraph::io::RdfFormat;
use oxigraph::model::{BlankNode, NamedNode};
use std::ffi::OsString;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "blazegraph")]
#[command(about = "Query and update a Blazegraph namespace")]
#[command(arg_required_else_help = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Verbose mode - sets the RUST_LOG level to info, defaults to warning level
    #[clap(long, short, action, default_value = "false", global = true)]
    verbose: bool,
    /// Debug mode - sets the RUST_LOG level to debug, defaults to warning level
    #[clap(long, action, default_value = "false", global = true)]
    debug: bool,
    /// Server root, defaults to http://localhost:9999/blazegraph
    #[clap(long, short, global = true)]
    endpoint: Option<String>,
    /// Namespace to address, defaults to 'kb'
    #[clap(long, short, global = true)]
    namespace: Option<String>,
    /// Transport timeout for each request, in seconds
    #[clap(long, global = true)]
    request_timeout: Option<u64>,
    /// Read connection settings from a JSON file; --endpoint and --namespace override it
    #[clap(long, short, global = true)]
    config: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run a SPARQL query and print the answer
    Query {
        /// The query text; read from --file when omitted
        query: Option<String>,
        /// File containing the query
        #[clap(long, short)]
        file: Option<PathBuf>,
        /// Store-side evaluation limit in milliseconds
        #[clap(long, short)]
        timeout: Option<u64>,
    },
    /// Fetch a graph and print it or write it to a file
    Load {
        /// Name (URI) of the graph, the default graph when omitted
        graph: Option<String>,
        /// File to write the graph to, format chosen by extension
        #[clap(long, short)]
        output: Option<PathBuf>,
    },
    /// Replace a graph with the contents of a file
    Save {
        /// RDF file to upload
        file: PathBuf,
        /// Name (URI) of the graph, the default graph when omitted
        #[clap(long, short)]
        graph: Option<String>,
    },
    /// Delete a graph
    Delete {
        /// Name (URI) of the graph, the default graph when omitted
        graph: Option<String>,
    },
    /// Add and remove triples in one graph
    Update {
        /// Name (URI) of the graph, the default graph when omitted
        #[clap(long, short)]
        graph: Option<String>,
        /// RDF file with triples to add
        #[clap(long)]
        add: Option<PathBuf>,
        /// RDF file with triples to remove
        #[clap(long)]
        remove: Option<PathBuf>,
    },
    /// List the names of all non-empty graphs
    Graphs,
    /// Print the connection settings, or write them to a JSON file
    Config {
        /// File to write the settings to
        #[clap(long, short)]
        output: Option<PathBuf>,
        /// Print the settings as RDF in the dotNetRDF configuration vocabulary
        #[clap(long, action, default_value = "false")]
        rdf: bool,
    },
}

const DEFAULT_ENDPOINT: &str = "http://localhost:9999/blazegraph";

fn graph_name(graph: Option<String>) -> Result<Option<NamedNode>> {
    graph
        .map(|g| NamedNode::new(g).map_err(|e| anyhow!(e.to_string())))
        .transpose()
}

fn connection_config(cmd: &Cli) -> Result<ConnectionConfig> {
    let base = match &cmd.config {
        Some(path) => Some(ConnectionConfig::from_file(path)?),
        None => None,
    };
    let mut builder = ConnectionConfig::builder();
    builder.base_uri(
        cmd.endpoint
            .clone()
            .or_else(|| base.as_ref().map(|c| c.base_uri().to_string()))
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
    );
    if let Some(ns) = cmd
        .namespace
        .clone()
        .or_else(|| base.as_ref().map(|c| c.namespace().to_string()))
    {
        builder.namespace(ns);
    }
    if let Some(secs) = cmd
        .request_timeout
        .or_else(|| base.as_ref().map(|c| c.request_timeout().as_secs()))
    {
        builder.request_timeout_secs(secs);
    }
    Ok(builder.build()?)
}

pub fn run() -> Result<()> {
    blazegraph::init_logging();
    let cmd = Cli::parse();
    execute(cmd)
}

pub fn run_from_args<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    blazegraph::init_logging();
    let cmd = Cli::try_parse_from(args).map_err(Error::from)?;
    execute(cmd)
}

fn execute(cmd: Cli) -> Result<()> {
    // CLI flags for verbosity take precedence over RUST_LOG / BLAZEGRAPH_LOG.
    if cmd.debug {
        std::env::set_var("RUST_LOG", "debug");
    } else if cmd.verbose {
        std::env::set_var("RUST_LOG", "info");
    } else if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "warn");
    }
    let _ = env_logger::try_init();

    let config = connection_config(&cmd)?;
    if cmd.verbose || cmd.debug {
        config.print();
    }

    if let Commands::Config { output, rdf } = &cmd.command {
        match output {
            Some(path) => {
                config.save_to_file(path)?;
                println!("Wrote configuration to {}", path.display());
            }
            None if *rdf => {
                let node = BlankNode::default();
                write_graph(
                    &config.to_graph(node.as_ref().into()),
                    RdfFormat::Turtle,
                    std::io::stdout(),
                )?;
            }
            None => println!("{}", serde_json::to_string_pretty(&config)?),
        }
        return Ok(());
    }

    let connector = BlazegraphConnector::from_config(config)?;
    info!("Connected: {connector}");

    match cmd.command {
        Commands::Query {
            query,
            file,
            timeout,
        } => {
            let query = match (query, file) {
                (Some(q), None) => q,
                (None, Some(f)) => std::fs::read_to_string(f)?,
                _ => return Err(anyhow!("Must specify either a query or --file")),
            };
            let result = connector.query_with_timeout(&query, QueryTimeout::from(timeout))?;
            println!("{}", render_query_result(&result)?);
        }
        Commands::Load { graph, output } => {
            let loaded = connector.load_graph(graph_name(graph)?)?;
            match output {
                Some(path) => write_graph_to_file(&loaded.graph, &path)?,
                None => write_graph(&loaded.graph, RdfFormat::Turtle, std::io::stdout())?,
            }
        }
        Commands::Save { file, graph } => {
            let contents = read_file(&file)?;
            let stored = match graph_name(graph)? {
                Some(name) => StoredGraph::named(name, contents),
                None => StoredGraph::default_graph(contents),
            };
            let saved = connector.save_graph(stored)?;
            println!("Saved {} triples", saved.len());
        }
        Commands::Delete { graph } => {
            connector.delete_graph(graph_name(graph)?)?;
        }
        Commands::Update { graph, add, remove } => {
            if add.is_none() && remove.is_none() {
                return Err(anyhow!("Must specify --add and/or --remove"));
            }
            let mut update = GraphUpdate::new(graph_name(graph)?);
            if let Some(path) = add {
                update.additions = read_file(&path)?.iter().map(|t| t.into_owned()).collect();
            }
            if let Some(path) = remove {
                update.removals = read_file(&path)?.iter().map(|t| t.into_owned()).collect();
            }
            connector.update_graph(update)?;
        }
        Commands::Graphs => {
            let mut graphs = connector.list_graphs()?;
            graphs.sort_by(|a, b| a.as_str().cmp(b.as_str()));
            for graph in graphs {
                println!("{}", graph.as_str());
            }
        }
        Commands::Config { .. } => {
            // handled before connecting
        }
    }

    Ok(())
}

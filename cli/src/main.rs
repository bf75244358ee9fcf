//! SPARQL Portal CLI: terminal front end for the query portal
//!
//! Lists the configured queries, runs them against the endpoint, prints the
//! result and exports it to files.

use clap::{Parser, Subcommand};
use comfy_table::{ContentArrangement, Table};
use sparql_portal::relay::DEFAULT_RELAY_PORT;
use sparql_portal::{
    to_csv, to_json, ClientConfig, DirectorySink, DisplayCell, DisplayTree, EndpointClient,
    Execution, ExecutionReport, FileSink, LoadingIndicator, Portal, PortalConfig, PortalError,
    RelayConfig, RelayServer,
};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "sparql-portal", version, about = "Run predefined SPARQL queries and export the results")]
struct Cli {
    /// Portal configuration file (JSON or YAML)
    #[arg(long, default_value = "config.json", global = true, env = "PORTAL_CONFIG")]
    config: PathBuf,

    /// Override the configured SPARQL endpoint
    #[arg(long, global = true, env = "PORTAL_ENDPOINT")]
    endpoint: Option<String>,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 30, global = true)]
    timeout: u64,

    /// Output format for query results
    #[arg(long, default_value = "table", global = true)]
    format: OutputFormat,

    /// Log debug output to stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, clap::ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

#[derive(Subcommand)]
enum Commands {
    /// List the configured queries
    Queries,
    /// Show a query with its SPARQL text
    Show {
        /// Query id
        id: String,
    },
    /// Execute a query and print the result
    Run {
        /// Query id
        id: String,
    },
    /// Execute a query and export the result to a file
    Export {
        /// Query id
        id: String,

        /// Export format id (json, csv, turtle, ...)
        #[arg(value_name = "FORMAT")]
        format_id: String,

        /// Output directory
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
    /// Check that the endpoint answers
    Ping,
    /// Run the local development CORS relay
    Relay {
        /// Bind address
        #[arg(long, default_value = "127.0.0.1")]
        address: String,

        /// Port
        #[arg(long, default_value_t = DEFAULT_RELAY_PORT)]
        port: u16,
    },
    /// Start an interactive REPL
    Shell,
}

/// Prints a loading line on stderr while a request is in flight
struct StderrIndicator;

impl LoadingIndicator for StderrIndicator {
    fn set_loading(&self, loading: bool) {
        let mut stderr = std::io::stderr();
        if loading {
            let _ = write!(stderr, "Loading...");
        } else {
            let _ = write!(stderr, "\r          \r");
        }
        let _ = stderr.flush();
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(if cli.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::WARN
        })
        .init();

    let portal = match build_portal(&cli) {
        Ok(portal) => portal,
        Err(e) => {
            report_error("Application could not be loaded", &e);
            std::process::exit(1);
        }
    };

    let result = match &cli.command {
        Commands::Queries => run_queries(&portal),
        Commands::Show { id } => run_show(&portal, id),
        Commands::Run { id } => run_query(&portal, id, &cli.format).await,
        Commands::Export { id, format_id, out } => run_export(&portal, id, format_id, out).await,
        Commands::Ping => run_ping(&portal).await,
        Commands::Relay { address, port } => run_relay(&portal, address, *port).await,
        Commands::Shell => run_shell(&portal, &cli.format).await,
    };

    if let Err(e) = result {
        report_error(command_context(&cli.command), &e);
        std::process::exit(1);
    }
}

fn build_portal(cli: &Cli) -> Result<Portal, PortalError> {
    let mut config = match (PortalConfig::from_file(&cli.config), &cli.endpoint) {
        (Ok(config), _) => config,
        (Err(_), Some(endpoint)) if !cli.config.exists() => PortalConfig::new(endpoint),
        (Err(e), _) => return Err(e),
    };
    if let Some(endpoint) = &cli.endpoint {
        config.triple_store.endpoint = endpoint.clone();
    }

    let client_config = ClientConfig {
        timeout: Duration::from_secs(cli.timeout),
        ..ClientConfig::default()
    };
    Ok(Portal::from_config(config, client_config)?.with_indicator(Arc::new(StderrIndicator)))
}

fn command_context(command: &Commands) -> &'static str {
    match command {
        Commands::Run { .. } | Commands::Shell => "Query execution failed",
        Commands::Export { .. } => "Download failed",
        Commands::Relay { .. } => "Relay failed",
        _ => "Command failed",
    }
}

fn report_error(context: &str, e: &PortalError) {
    eprintln!("Error: {}", context);
    eprintln!("  {}", e);
}

fn run_queries(portal: &Portal) -> Result<(), PortalError> {
    let org = &portal.config().organization;
    if !org.name.is_empty() {
        println!("{}", org.name);
        if !org.description.is_empty() {
            println!("{}", org.description);
        }
    }
    if let Some(dataset) = portal.config().triple_store.dataset_path() {
        println!("Dataset: {}", dataset);
    }
    println!("Endpoint: {}", portal.config().endpoint());
    println!();

    if portal.queries().is_empty() {
        println!("(no queries configured)");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["id", "name", "category", "shape"]);
    for query in portal.queries() {
        table.add_row(vec![
            query.id.clone(),
            query.name.clone(),
            query.category.clone(),
            format!("{:?}", query.expected_shape).to_lowercase(),
        ]);
    }
    println!("{}", table);
    Ok(())
}

fn run_show(portal: &Portal, id: &str) -> Result<(), PortalError> {
    let query = portal
        .config()
        .query(id)
        .ok_or_else(|| PortalError::UnknownQuery(id.to_string()))?;

    println!("{}", query.name);
    if !query.description.is_empty() {
        println!("{}", query.description);
    }
    println!();
    println!("{}", query.sparql);

    let client = EndpointClient::new(portal.config().endpoint())?;
    println!();
    println!(
        "Download: {}",
        client.download_url(&query.sparql, query.expected_shape.accept())
    );
    Ok(())
}

async fn run_query(portal: &Portal, id: &str, format: &OutputFormat) -> Result<(), PortalError> {
    portal.select_query(id).await?;
    let report = match portal.execute().await? {
        Execution::Completed(report) => report,
        Execution::Superseded => {
            println!("(superseded by a newer query)");
            return Ok(());
        }
    };

    print_report(&report, format)
}

fn print_report(report: &ExecutionReport, format: &OutputFormat) -> Result<(), PortalError> {
    println!("{}", report_text(report, format)?);
    Ok(())
}

fn report_text(report: &ExecutionReport, format: &OutputFormat) -> Result<String, PortalError> {
    match format {
        OutputFormat::Json => to_json(&report.outcome.payload),
        OutputFormat::Csv => {
            let table = report.outcome.result.as_tabular().ok_or_else(|| {
                PortalError::UnsupportedShape {
                    shape: report.outcome.result.shape_name(),
                    format: "csv".to_string(),
                }
            })?;
            to_csv(table)
        }
        OutputFormat::Table => Ok(format!(
            "{}\n{} results, {}ms",
            display_text(&report.display),
            report.stats.rows,
            report.elapsed.as_millis()
        )),
    }
}

async fn run_export(
    portal: &Portal,
    id: &str,
    format_id: &str,
    out: &Path,
) -> Result<(), PortalError> {
    portal.select_query(id).await?;
    portal.execute().await?;

    let artifact = portal.export(format_id).await?;
    let path = DirectorySink::new(out).save(&artifact)?;
    println!("Saved {} ({} bytes)", path.display(), artifact.bytes.len());
    Ok(())
}

async fn run_ping(portal: &Portal) -> Result<(), PortalError> {
    if portal.client().ping().await {
        println!("OK {}", portal.config().endpoint());
        Ok(())
    } else {
        Err(PortalError::ConfigError(format!(
            "endpoint {} did not answer",
            portal.config().endpoint()
        )))
    }
}

async fn run_relay(portal: &Portal, address: &str, port: u16) -> Result<(), PortalError> {
    let config = RelayConfig {
        address: address.to_string(),
        port,
        endpoint: portal.config().endpoint().to_string(),
    };
    println!("Relay listening on http://{}:{}/sparql", address, port);
    println!("Forwarding to {}", config.endpoint);
    RelayServer::new(config).start().await
}

async fn run_shell(portal: &Portal, format: &OutputFormat) -> Result<(), PortalError> {
    println!("SPARQL Portal Interactive Shell");
    println!("Type :help for commands. :quit to exit.\n");

    let stdin = std::io::stdin();
    let mut line = String::new();

    loop {
        match portal.active_query().await {
            Some(query) => eprint!("portal({})> ", query.id),
            None => eprint!("portal> "),
        }

        line.clear();
        if stdin.read_line(&mut line)? == 0 {
            break; // EOF
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let (command, arg) = match trimmed.split_once(char::is_whitespace) {
            Some((command, arg)) => (command, arg.trim()),
            None => (trimmed, ""),
        };

        match command {
            ":quit" | ":exit" | ":q" => break,
            ":help" | ":h" => {
                println!("Commands:");
                println!("  :queries          List queries");
                println!("  :select <id>      Select a query");
                println!("  :run              Execute the selected query");
                println!("  :export <format>  Export the displayed result");
                println!("  :quit             Exit shell");
            }
            ":queries" => {
                if let Err(e) = run_queries(portal) {
                    report_error("Command failed", &e);
                }
            }
            ":select" => match portal.select_query(arg).await {
                Ok(query) => {
                    println!("{}", query.name);
                    println!("{}", query.sparql);
                }
                Err(e) => report_error("Command failed", &e),
            },
            ":run" => match portal.execute().await {
                Ok(Execution::Completed(report)) => {
                    if let Err(e) = print_report(&report, format) {
                        report_error("Query execution failed", &e);
                    }
                }
                Ok(Execution::Superseded) => println!("(superseded by a newer query)"),
                Err(e) => report_error("Query execution failed", &e),
            },
            ":export" => {
                let saved = match portal.export(arg).await {
                    Ok(artifact) => DirectorySink::new(".").save(&artifact),
                    Err(e) => Err(e),
                };
                match saved {
                    Ok(path) => println!("Saved {}", path.display()),
                    Err(e) => report_error("Download failed", &e),
                }
            }
            other => println!("Unknown command {}, try :help", other),
        }
    }

    println!("Bye!");
    Ok(())
}

fn display_text(tree: &DisplayTree) -> String {
    match tree {
        DisplayTree::Table { header, rows } => {
            let mut table = Table::new();
            table.set_content_arrangement(ContentArrangement::Dynamic);
            table.set_header(header);
            for row in rows {
                table.add_row(row.iter().map(format_cell).collect::<Vec<_>>());
            }
            table.to_string()
        }
        DisplayTree::NoResults { header } if header.is_empty() => "(no results)".to_string(),
        DisplayTree::NoResults { header } => format!("{}\n(no results)", header.join(" | ")),
        DisplayTree::Preformatted(text) => text.clone(),
    }
}

fn format_cell(cell: &DisplayCell) -> String {
    match cell.annotation() {
        Some(annotation) => format!("{} [{}]", cell.text(), annotation),
        None => cell.text().to_string(),
    }
}

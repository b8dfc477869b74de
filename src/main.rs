use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use regdex::config::{load_config, Config, ConfigOverrides};
use regdex::embed::{Embedder, HashingEmbedder};
use regdex::error::CoreError;
use regdex::model::{Page, RegulationInfo};
use regdex::store::PageStore;
use regdex::tools::ToolSurface;

#[derive(Parser)]
#[command(name = "regdex", version, about = "Agentic retrieval core over page-addressable regulatory documents")]
struct Cli {
    /// Path to a layered config.toml tier; optional.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the data directory resolved from config/environment.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest a regulation from a parser-emitted JSON file
    /// (`{"info": RegulationInfo, "pages": [Page]}`).
    Ingest {
        #[arg(long)]
        file: PathBuf,
    },
    /// Remove a previously ingested regulation and rebuild the search indices.
    Remove {
        #[arg(long)]
        reg_id: String,
    },
    /// List every ingested regulation.
    List,
    /// Rebuild the lexical and vector indices from the Page Store.
    BuildIndex,
    /// Run a line-oriented JSON command loop over stdin/stdout exposing the
    /// tool surface (§10.5): each line is `{"op": "...", "args": {...}}`.
    Serve,
}

#[derive(Deserialize)]
struct IngestFile {
    info: RegulationInfo,
    pages: Vec<Page>,
}

#[derive(Deserialize)]
struct Request {
    op: String,
    #[serde(default)]
    args: Value,
}

#[derive(Serialize)]
struct Response {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorEnvelope>,
}

#[derive(Serialize)]
struct ErrorEnvelope {
    kind: String,
    message: String,
}

/// Entry point runs on a current-thread `tokio` runtime (§5): index
/// lookups themselves are synchronous/rayon-driven, but the `serve` loop's
/// stdio transport is async so a future network-backed embedder or
/// SSE-framed transport can suspend between, not inside, lookups without a
/// runtime change at this boundary.
#[tokio::main(flavor = "current_thread")]
async fn main() {
    regdex::logging::init();
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref()).with_overrides(ConfigOverrides {
        data_dir: cli.data_dir,
        fts_weight: None,
        vector_weight: None,
    });

    let exit_code = match run(cli.command, config).await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("error: {e}");
            e.exit_code()
        }
    };
    std::process::exit(exit_code);
}

async fn run(command: Command, config: Config) -> Result<(), CoreError> {
    let store = PageStore::new(config.data_dir.clone());
    let dimension = config.vector_dimension.unwrap_or(256);
    let embedder: Box<dyn Embedder> = Box::new(HashingEmbedder::new(dimension));
    let surface = ToolSurface::new(store, embedder, config);

    match command {
        Command::Ingest { file } => {
            let content = std::fs::read_to_string(&file)
                .map_err(|e| CoreError::external("filesystem", e.to_string()))?;
            let parsed: IngestFile = serde_json::from_str(&content)
                .map_err(|e| CoreError::external("serde_json", e.to_string()))?;
            surface.ingest(parsed.info, parsed.pages)?;
            println!("ingested");
            Ok(())
        }
        Command::Remove { reg_id } => {
            surface.remove_regulation(&reg_id)?;
            println!("removed {reg_id}");
            Ok(())
        }
        Command::List => {
            let regs = surface.list_regulations()?;
            for r in regs {
                println!("{}\t{}\t{} pages", r.reg_id, r.title, r.total_pages);
            }
            Ok(())
        }
        Command::BuildIndex => {
            surface.rebuild_search_indices()?;
            println!("indices rebuilt");
            Ok(())
        }
        Command::Serve => serve(&surface).await,
    }
}

async fn serve(surface: &ToolSurface) -> Result<(), CoreError> {
    surface.rebuild_search_indices().ok();
    let stdin = tokio::io::stdin();
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(stdin).lines();
    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| CoreError::external("stdio", e.to_string()))?
    {
        if line.trim().is_empty() {
            continue;
        }
        let response = match serde_json::from_str::<Request>(&line) {
            Ok(req) => dispatch(surface, &req.op, req.args),
            Err(e) => Response {
                ok: false,
                result: None,
                error: Some(ErrorEnvelope {
                    kind: "Validation".to_string(),
                    message: format!("malformed request: {e}"),
                }),
            },
        };
        let out = serde_json::to_string(&response).unwrap_or_else(|_| "{}".to_string());
        stdout.write_all(out.as_bytes()).await.ok();
        stdout.write_all(b"\n").await.ok();
        stdout.flush().await.ok();
    }
    Ok(())
}

fn dispatch(surface: &ToolSurface, op: &str, args: Value) -> Response {
    let result = dispatch_inner(surface, op, args);
    match result {
        Ok(value) => Response {
            ok: true,
            result: Some(value),
            error: None,
        },
        Err(e) => Response {
            ok: false,
            result: None,
            error: Some(ErrorEnvelope {
                kind: error_kind(&e),
                message: e.to_string(),
            }),
        },
    }
}

fn error_kind(e: &CoreError) -> String {
    match e {
        CoreError::Validation(_) => "Validation",
        CoreError::RegulationNotFound { .. }
        | CoreError::PageNotFound { .. }
        | CoreError::TableNotFound { .. }
        | CoreError::AnnotationNotFound { .. }
        | CoreError::ReferenceNotResolved { .. }
        | CoreError::SectionNotFound { .. } => "NotFound",
        CoreError::IntegrityError { .. } => "IntegrityError",
        CoreError::IndexMissing { .. } | CoreError::RegistryNotBuilt { .. } => "IndexMissing",
        CoreError::DimensionMismatch { .. } | CoreError::ExternalFailure { .. } => "ExternalFailure",
    }
    .to_string()
}

fn dispatch_inner(surface: &ToolSurface, op: &str, args: Value) -> Result<Value, CoreError> {
    let to_json = |e: serde_json::Error| CoreError::validation(format!("bad arguments: {e}"));

    match op {
        "list_regulations" => {
            let regs = surface.list_regulations()?;
            Ok(serde_json::to_value(regs).unwrap())
        }
        "get_toc" => {
            #[derive(Deserialize)]
            struct Args {
                reg_id: String,
                max_level: Option<u32>,
            }
            let a: Args = serde_json::from_value(args).map_err(to_json)?;
            let toc = surface.get_toc(&a.reg_id, a.max_level)?;
            Ok(serde_json::to_value(toc).unwrap())
        }
        "smart_search" => {
            #[derive(Deserialize)]
            struct Args {
                query: String,
                reg_ids: Option<Vec<String>>,
                chapter_scope: Option<Vec<String>>,
                #[serde(default = "default_limit")]
                limit: i64,
            }
            fn default_limit() -> i64 {
                10
            }
            let a: Args = serde_json::from_value(args).map_err(to_json)?;
            let scope = a.chapter_scope.map(regdex::model::ChapterPath::new);
            let results = surface.smart_search(&a.query, a.reg_ids, scope, a.limit)?;
            Ok(serde_json::to_value(results).unwrap())
        }
        "read_page_range" => {
            #[derive(Deserialize)]
            struct Args {
                reg_id: String,
                start: u32,
                end: u32,
            }
            let a: Args = serde_json::from_value(args).map_err(to_json)?;
            let content = surface.read_page_range(&a.reg_id, a.start, a.end)?;
            Ok(serde_json::to_value(content).unwrap())
        }
        "read_chapter_content" => {
            #[derive(Deserialize)]
            struct Args {
                reg_id: String,
                section_number: String,
                #[serde(default)]
                include_children: bool,
            }
            let a: Args = serde_json::from_value(args).map_err(to_json)?;
            let content = surface.read_chapter_content(&a.reg_id, &a.section_number, a.include_children)?;
            Ok(serde_json::to_value(content).unwrap())
        }
        "search_tables" => {
            #[derive(Deserialize)]
            struct Args {
                query: String,
                reg_id: Option<String>,
                #[serde(default)]
                mode: String,
            }
            let a: Args = serde_json::from_value(args).map_err(to_json)?;
            let mode = match a.mode.as_str() {
                "semantic" => regdex::tables::SearchTablesMode::Semantic,
                "hybrid" => regdex::tables::SearchTablesMode::Hybrid,
                _ => regdex::tables::SearchTablesMode::Lexical,
            };
            let hits = surface.search_tables(&a.query, a.reg_id.as_deref(), mode)?;
            Ok(serde_json::to_value(hits).unwrap())
        }
        "get_table_by_id" => {
            #[derive(Deserialize)]
            struct Args {
                reg_id: String,
                table_id: String,
            }
            let a: Args = serde_json::from_value(args).map_err(to_json)?;
            let table = surface.get_table_by_id(&a.reg_id, &a.table_id)?;
            Ok(serde_json::to_value(table).unwrap())
        }
        "lookup_annotation" => {
            #[derive(Deserialize)]
            struct Args {
                reg_id: String,
                label: String,
                page_hint: Option<u32>,
            }
            let a: Args = serde_json::from_value(args).map_err(to_json)?;
            let ann = surface.lookup_annotation(&a.reg_id, &a.label, a.page_hint)?;
            Ok(serde_json::to_value(ann).unwrap())
        }
        "resolve_reference" => {
            #[derive(Deserialize)]
            struct Args {
                reg_id: String,
                phrase: String,
            }
            let a: Args = serde_json::from_value(args).map_err(to_json)?;
            let targets = surface.resolve_reference(&a.reg_id, &a.phrase)?;
            Ok(serde_json::to_value(targets).unwrap())
        }
        other => Err(CoreError::validation(format!("unknown operation: {other}"))),
    }
}

//! Horn CLI
//!
//! Front end for the resolution core: loads a knowledge-base configuration,
//! runs a conjunctive query and streams the answers, pulling one at a time
//! until the configured limit or the exhausted signal.
//!
//! `RUST_LOG=horn_resolve=debug` surfaces the per-actor protocol trace.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use horn_resolve::{
    AnswerRecord, DerivationRecord, KnowledgeBase, Pagination, Registry, Response, Session,
};

#[derive(Parser)]
#[command(name = "horn")]
#[command(
    author,
    version,
    about = "Horn: streaming resolution of conjunctive queries with recursive rules"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a conjunctive query against a knowledge base.
    Resolve(ResolveArgs),
}

#[derive(Args)]
struct ResolveArgs {
    /// Knowledge base configuration (JSON). Defaults apply when omitted.
    #[arg(long)]
    knowledge: Option<PathBuf>,

    /// Conjunction pattern ids, e.g. "1,2".
    #[arg(long, value_delimiter = ',', required = true)]
    query: Vec<i64>,

    /// Page size of the conjunction's own base-data traversal.
    #[arg(long, default_value_t = 0)]
    size: u64,

    /// Page offset of the conjunction's own base-data traversal.
    #[arg(long, default_value_t = 0)]
    offset: i64,

    /// Maximum number of answers to pull.
    #[arg(long, default_value_t = 16)]
    limit: usize,

    /// Output format.
    #[arg(long, value_enum, default_value = "text")]
    format: Format,

    /// Print the derivation tree of each inferred answer.
    #[arg(long)]
    show_derivations: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Resolve(args) => resolve(args).await,
    }
}

async fn resolve(args: ResolveArgs) -> Result<()> {
    let knowledge = match &args.knowledge {
        Some(path) => KnowledgeBase::load(path)
            .with_context(|| format!("loading knowledge base from {}", path.display()))?,
        None => KnowledgeBase::default(),
    };

    let registry = Registry::new(knowledge);
    let mut session = Session::new(
        &registry,
        args.query.clone(),
        Pagination::new(args.size, args.offset),
    );

    let mut answers = 0usize;
    while answers < args.limit {
        let Some(response) = session.resolve_next().await else {
            break;
        };
        match response {
            Response::Answer(answer) => {
                answers += 1;
                let record = AnswerRecord::from_answer(&answer);
                match args.format {
                    Format::Json => println!("{}", serde_json::to_string(&record)?),
                    Format::Text => {
                        let marker = if record.inferred {
                            "inferred".yellow()
                        } else {
                            "base".green()
                        };
                        println!("{} {:?}  [{marker}]", "answer".bold(), record.concept_map);
                        if args.show_derivations && !record.derivations.is_empty() {
                            print_derivations(&record.derivations, 1);
                        }
                    }
                }
            }
            Response::Exhausted(_) => {
                match args.format {
                    Format::Text => println!("{}", "exhausted".red()),
                    Format::Json => {}
                }
                break;
            }
        }
    }
    Ok(())
}

fn print_derivations(derivations: &[DerivationRecord], depth: usize) {
    for derivation in derivations {
        println!(
            "{}{} {} {:?}",
            "  ".repeat(depth),
            "via".dimmed(),
            derivation.resolver,
            derivation.concept_map
        );
        print_derivations(&derivation.derivations, depth + 1);
    }
}

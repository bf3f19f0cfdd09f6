//! expert-finder - Command-line driver for the expert index and query pipeline

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use expert_finder::config::Settings;
use expert_finder::domain::{ExpertId, MetadataValue, NewExpert};
use expert_finder::index::ExpertIndex;
use expert_finder::retrieval::Retriever;
use expert_finder::services::ExpertService;
use expert_finder::synthesis::AnswerSynthesizer;
use expert_finder::Pipeline;

#[derive(Debug, Parser)]
#[command(name = "expert-finder")]
#[command(about = "Find subject-matter experts for a question")]
struct Cli {
    /// Settings file. Defaults to the platform config directory.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Register an expert
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        expertise: String,
        #[arg(long)]
        description: String,
        /// Extra metadata as key=value, repeatable
        #[arg(long = "meta", value_parser = parse_key_value)]
        meta: Vec<(String, String)>,
    },
    /// Register every expert in a JSON array file
    Import { file: PathBuf },
    /// List registered experts
    List,
    /// Remove an expert by id
    Remove { id: String },
    /// Remove every expert
    Clear,
    /// Show index details
    Info,
    /// Ask a question and print the answer with the matched experts as JSON
    Ask {
        query: String,
        #[arg(long)]
        top_k: Option<usize>,
        #[arg(long)]
        min_score: Option<f32>,
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
}

fn parse_key_value(raw: &str) -> std::result::Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got `{}`", raw))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in `{}`", raw));
    }
    Ok((key.to_string(), value.trim().to_string()))
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(Cli::parse()).await {
        tracing::error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let settings_path = match cli.config {
        Some(path) => path,
        None => Settings::default_path()?,
    };
    let settings = Settings::load(&settings_path)
        .with_context(|| format!("load settings from {}", settings_path.display()))?;

    let index_path = settings.index_path()?;
    let index = Arc::new(
        ExpertIndex::open(&index_path)
            .await
            .with_context(|| format!("open index at {}", index_path.display()))?
            .with_name(settings.index.name.clone()),
    );

    let service = ExpertService::new(build_embedder(&settings).await?, index);
    service
        .ensure_dimension()
        .await
        .with_context(|| format!("configured embedder does not match {}", index_path.display()))?;

    match cli.command {
        Commands::List => {
            print_json(&service.list().await)?;
        }
        Commands::Info => {
            print_json(&service.info().await)?;
        }
        Commands::Remove { id } => {
            let id = ExpertId::from(id);
            if !service.remove(&id).await? {
                anyhow::bail!("no expert with id {}", id);
            }
            println!("removed {}", id);
        }
        Commands::Clear => {
            let removed = service.clear().await?;
            println!("removed {} experts", removed);
        }
        Commands::Add {
            name,
            expertise,
            description,
            meta,
        } => {
            let mut expert = NewExpert::new(name, expertise, description);
            for (key, value) in meta {
                expert = expert.with_metadata(key, MetadataValue::parse(&value));
            }
            print_json(&service.add_expert(expert).await?)?;
        }
        Commands::Import { file } => {
            let summary = service
                .import_file(&file)
                .await
                .with_context(|| format!("import {}", file.display()))?;
            print_json(&summary)?;
        }
        Commands::Ask {
            query,
            top_k,
            min_score,
            timeout_secs,
        } => {
            let mut options = settings.query_options();
            if let Some(top_k) = top_k {
                options = options.top_k(top_k);
            }
            if let Some(min_score) = min_score {
                options = options.min_score(min_score);
            }
            if let Some(secs) = timeout_secs {
                options = options.timeout(Duration::from_secs(secs));
            }

            let retriever = Retriever::with_config(
                service.embedder().clone(),
                service.index().clone(),
                settings.retrieval.config(),
            );
            let synthesizer =
                AnswerSynthesizer::with_config(settings.provider.build()?, settings.synthesis.clone());
            let pipeline = Pipeline::new(Arc::new(retriever), Arc::new(synthesizer));

            let outcome = pipeline.answer_query_detailed(&query, &options).await?;
            print_json(&outcome)?;
        }
    }

    Ok(())
}

async fn build_embedder(
    settings: &Settings,
) -> Result<Arc<dyn expert_finder::embedding::Embedder>> {
    let embedding = settings.embedding.clone();
    // Model loading may download weights.
    let embedder = tokio::task::spawn_blocking(move || embedding.build())
        .await
        .context("embedder initialization task")??;
    Ok(embedder)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

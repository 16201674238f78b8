//! eval-doc: evaluate a document through the worker and print a summary.
//!
//! Usage:
//!   eval-doc model.json
//!   eval-doc --mock --config worker.json model.json

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use cad_types::ObjectSpec;
use clap::Parser;
use geom_kernel::{MockKernel, TruckKernel};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;
use worker_bridge::{DocumentContent, Worker, WorkerConfig, WorkerReply};

#[derive(Parser, Debug)]
#[command(name = "eval-doc", about = "Evaluate a CAD document and summarize the meshes")]
struct Args {
    /// Document JSON: `{"objects": [...]}` or a bare object array
    document: PathBuf,

    /// Worker configuration JSON
    #[arg(long)]
    config: Option<PathBuf>,

    /// Use the coarse preview configuration
    #[arg(long, conflicts_with = "config")]
    preview: bool,

    /// Evaluate against the mock kernel
    #[arg(long)]
    mock: bool,

    /// Print the full DISPLAY_SHAPE reply instead of a summary
    #[arg(long)]
    raw: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ObjectSummary {
    name: String,
    faces: usize,
    edges: usize,
    triangles: usize,
    mass: f64,
    center_of_mass: [f64; 3],
}

#[derive(Serialize)]
struct Summary {
    objects: Vec<ObjectSummary>,
    hidden: Vec<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(&args)?;
    let content = load_document(&args.document)?;
    info!(
        objects = content.objects.len(),
        mock = args.mock,
        "evaluating document"
    );

    let worker = if args.mock {
        Worker::spawn(config, || Ok(MockKernel::new()))?
    } else {
        Worker::spawn(config, || Ok(TruckKernel::new()))?
    };
    let consumer = worker.connect("eval-doc");
    consumer.register()?;
    let reply = consumer.load_file(content)?;
    worker.shutdown();

    if args.raw {
        println!("{}", reply.to_json()?);
        return Ok(());
    }

    let (payload, hidden) = match reply {
        WorkerReply::DisplayShape {
            payload, hidden, ..
        } => (payload, hidden),
        other => bail!("unexpected reply: {other:?}"),
    };
    let summary = Summary {
        objects: payload
            .into_iter()
            .map(|(name, entry)| ObjectSummary {
                name,
                faces: entry.face_list.len(),
                edges: entry.edge_list.len(),
                triangles: entry.face_list.iter().map(|f| f.triangle_count).sum(),
                mass: entry.meta.mass,
                center_of_mass: entry.meta.center_of_mass,
            })
            .collect(),
        hidden,
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn load_config(args: &Args) -> Result<WorkerConfig> {
    if args.preview {
        return Ok(WorkerConfig::preview());
    }
    let Some(path) = &args.config else {
        return Ok(WorkerConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
}

fn load_document(path: &Path) -> Result<DocumentContent> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading document {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&text)
        .with_context(|| format!("parsing document {}", path.display()))?;
    if value.is_array() {
        let objects: Vec<ObjectSpec> = serde_json::from_value(value)?;
        return Ok(DocumentContent {
            objects,
            ..DocumentContent::default()
        });
    }
    Ok(serde_json::from_value(value)?)
}

// SPDX-License-Identifier: MIT

use anyhow::Context;
use clap::Parser;
use dotenv::dotenv;
use research_graph::config::{Config, DEFAULT_REQUEST};
use research_graph::model::gemini::GeminiModel;
use research_graph::services::{
    describe, export_diagram, Collaborators, FsArtifactWriter, MermaidInkRenderer, ModelGenerator,
    StdinReader,
};
use research_graph::workflow::{RunOptions, WorkflowBuilder, WorkflowLoader};

use std::future::Future;
use std::io;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Multi-agent shaorma research assistant
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Initial free-text request
    #[arg(default_value = DEFAULT_REQUEST)]
    request: String,
}

/// Cancel on the first interrupt; returns true on a second one, while a
/// pending read or model call may still be holding the run
async fn watch_interrupts<F, Fut>(mut interrupted: F, cancel: CancellationToken) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = io::Result<()>>,
{
    if interrupted().await.is_err() {
        return false;
    }
    eprintln!("\nInterrupted, stopping after the current step (Ctrl-C again to quit)...");
    cancel.cancel();
    interrupted().await.is_ok()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();
    let config = Config::from_env();

    let definition = match &config.workflow {
        Some(path) => WorkflowLoader::new()
            .load_workflow(path)
            .with_context(|| format!("loading workflow {}", path.display()))?,
        None => WorkflowLoader::reference()?,
    };

    let mut model = GeminiModel::new(config.model.clone(), config.require_api_key()?);
    if let Some(base_url) = &config.base_url {
        model = model.with_base_url(base_url.clone());
    }
    log::info!("Using Gemini model: {}", config.model);

    let services = Collaborators::new(
        Arc::new(ModelGenerator::new(
            Arc::new(model),
            definition.prompts.clone(),
        )),
        Arc::new(StdinReader::new()),
        Arc::new(FsArtifactWriter::new(config.output_dir.clone())),
    );
    let graph = WorkflowBuilder::new(services).build(&definition)?;

    println!("Starting {}", definition.name);
    println!("Initial request: {}\n", args.request);

    let topology = graph.topology();
    println!("{}", describe(&topology));
    if let Some(path) = &config.diagram {
        if export_diagram(&MermaidInkRenderer::new(), &topology, path).await {
            println!("Workflow graph saved as '{}'", path.display());
        }
    }

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if watch_interrupts(tokio::signal::ctrl_c, trigger).await {
            eprintln!("Interrupted again, exiting");
            std::process::exit(130);
        }
    });

    println!("Executing workflow...\n");
    let initial = graph.initial_state(&definition.initial_values(&args.request))?;
    let options = RunOptions {
        cancel: Some(cancel),
        ..Default::default()
    };

    match graph.run_with(initial, options).await {
        Ok(outcome) => {
            println!("\nResearch assistant workflow completed!");
            println!("Path: {}", outcome.path().join(" -> "));
            if let Some(field) = &definition.approval_field {
                if outcome.state.boolean(field) != Some(true) {
                    println!(
                        "Note: quality validation did not pass; the report was produced from unapproved research."
                    );
                }
            }
            Ok(())
        }
        Err(failure) => {
            let node = failure.error.node().unwrap_or("<graph>").to_string();
            eprintln!("\nWorkflow failed at '{}': {}", node, failure.error);
            Err(anyhow::Error::new(failure).context(format!("node '{}' failed", node)))
        }
    }
}

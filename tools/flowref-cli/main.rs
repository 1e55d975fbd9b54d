use clap::{Parser, Subcommand};
use flowref::graph::UiWorkflow;
use flowref::prelude::*;
use flowref::template::highlight;
use std::fs;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Inspect the references, templates and validation state of a workflow document
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the workflow JSON file
    workflow_path: String,

    /// Optional path to an engine config JSON file
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the reference tree visible to a node
    References {
        /// Id of the node
        node_id: String,
    },
    /// Show autocomplete candidates for a template at a cursor offset
    Complete {
        /// Id of the node owning the template
        node_id: String,
        /// Template text; defaults to the node's stored template
        #[arg(short, long)]
        text: Option<String>,
        /// Byte offset of the cursor; defaults to the end of the text
        #[arg(long)]
        cursor: Option<usize>,
    },
    /// Validate every node and list the remaining problems
    Validate {
        /// Print the exported workflow, including error messages, as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let load_start = Instant::now();
    let config = match &cli.config {
        Some(path) => {
            let json = fs::read_to_string(path).unwrap_or_else(|e| {
                exit_with_error(&format!("Failed to read config file '{}': {}", path, e))
            });
            EngineConfig::from_json(&json)
                .unwrap_or_else(|e| exit_with_error(&format!("Invalid config: {}", e)))
        }
        None => EngineConfig::default(),
    };
    let workflow_json = fs::read_to_string(&cli.workflow_path).unwrap_or_else(|e| {
        exit_with_error(&format!(
            "Failed to read workflow file '{}': {}",
            cli.workflow_path, e
        ))
    });
    let graph = UiWorkflow::from_json(&workflow_json)
        .and_then(|ui| ui.into_workflow())
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to load workflow: {}", e)));
    let mut store = WorkflowStore::builder(graph).with_config(config).build();
    tracing::info!(elapsed = ?load_start.elapsed(), "workflow loaded");

    match cli.command {
        Command::References { node_id } => print_references(&mut store, &node_id),
        Command::Complete {
            node_id,
            text,
            cursor,
        } => print_completions(&mut store, &node_id, text, cursor),
        Command::Validate { json } => print_validation(&mut store, json),
    }
}

fn print_references(store: &mut WorkflowStore, node_id: &str) {
    require_node(store, node_id);
    let references = store.references(node_id);
    println!("References visible to '{}':", node_id);
    print!("{}", DisplayReferences(&references));
}

fn print_completions(
    store: &mut WorkflowStore,
    node_id: &str,
    text: Option<String>,
    cursor: Option<usize>,
) {
    let references = store.references(node_id);
    let node = require_node(store, node_id);
    let text = text
        .or_else(|| node.node_param.template.clone())
        .unwrap_or_default();
    let cursor = cursor.unwrap_or(text.len());
    let options = input_options(&node.inputs, &references);

    let state = on_cursor_move(&text, cursor, &options)
        .unwrap_or_else(|e| exit_with_error(&format!("Invalid cursor: {}", e)));
    match &state {
        AutocompleteState::Idle => println!("No open token at offset {}.", cursor),
        AutocompleteState::Matching(ctx) => {
            println!(
                "Token '{}' (keyword '{}'), {} candidate(s):",
                ctx.typed,
                ctx.keyword,
                ctx.candidates.len()
            );
            for candidate in &ctx.candidates {
                let rendered: String = highlight(&candidate.label, &state)
                    .iter()
                    .map(|span| match span.kind {
                        flowref::template::SpanKind::Matched => format!("[{}]", span.text),
                        _ => span.text.clone(),
                    })
                    .collect();
                let type_name = candidate
                    .param_type
                    .map(|t| t.display_name())
                    .unwrap_or_default();
                println!("  -> {} {}", rendered, type_name);
            }
        }
    }
}

fn print_validation(store: &mut WorkflowStore, json: bool) {
    let publishable = store.validate_all();
    if json {
        let exported = UiWorkflow::from_graph(store.graph())
            .to_json()
            .unwrap_or_else(|e| exit_with_error(&format!("Failed to export workflow: {}", e)));
        println!("{}", exported);
        return;
    }

    let mut problems = 0;
    for node in store.graph().nodes() {
        for (side, tree) in [("input", &node.inputs), ("output", &node.outputs)] {
            for param in tree.walk() {
                for msg in [&param.errors.name, &param.errors.content, &param.errors.description]
                    .into_iter()
                    .flatten()
                {
                    println!("  {} [{}] {} '{}': {}", node.label, node.id, side, param.name, msg);
                    problems += 1;
                }
            }
        }
        for case in node.node_param.cases.iter().flatten() {
            for (index, condition) in case.conditions.iter().enumerate() {
                for msg in [&condition.compare_operator_err_msg, &condition.operand_err_msg]
                    .into_iter()
                    .flatten()
                {
                    println!(
                        "  {} [{}] case {} condition {}: {}",
                        node.label, node.id, case.level, index, msg
                    );
                    problems += 1;
                }
            }
        }
        if let Some(msg) = &node.node_param.template_err_msg {
            println!("  {} [{}] template: {}", node.label, node.id, msg);
            problems += 1;
        }
        if let Some(msg) = node
            .retry_config
            .as_ref()
            .and_then(|r| r.custom_output_err_msg.as_ref())
        {
            println!("  {} [{}] custom output: {}", node.label, node.id, msg);
            problems += 1;
        }
    }

    println!("\n--- Validation Summary ---");
    println!("Nodes:       {}", store.graph().nodes().len());
    println!("Problems:    {}", problems);
    println!("Publishable: {}", publishable);
}

fn require_node<'s>(store: &'s WorkflowStore, node_id: &str) -> &'s Node {
    store
        .node(node_id)
        .unwrap_or_else(|| exit_with_error(&format!("Node '{}' not found", node_id)))
}

fn exit_with_error(message: &str) -> ! {
    eprintln!("\nError: {}", message);
    std::process::exit(1);
}

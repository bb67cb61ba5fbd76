use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use mxgraph_core::{Cell, DocumentBuilder, GraphDocument, HostEvent, ModelResult, Root};
use mxgraph_core::{SyncConfig, SyncSession};
use serde::Deserialize;

#[derive(Parser)]
#[command(name = "mxtree", about = "Inspect and normalize draw.io graph models")]
#[command(version)]
struct Cli {
    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the cell tree with kinds, visibility and labels
    Tree { file: PathBuf },
    /// List the drawable layers
    Layers { file: PathBuf },
    /// Print the canonical <mxGraphModel> text
    Normalize { file: PathBuf },
    /// Dump the cells as JSON
    Json { file: PathBuf },
    /// Wrap the model in an <mxfile> with a compressed diagram
    Compress {
        file: PathBuf,
        #[arg(long, default_value = "Page-1")]
        name: String,
    },
    /// Feed recorded host events through a sync session and print what it sends back
    Replay {
        /// Starting document
        file: PathBuf,
        /// One `{"at_ms": .., "event": {..}}` object per line
        events: PathBuf,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[derive(Deserialize)]
struct RecordedEvent {
    at_ms: u64,
    event: HostEvent,
}

fn main() {
    let cli = Cli::parse();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| cli.log_level.clone().into());
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match run(cli.command) {
        Ok(output) => print!("{output}"),
        Err(e) => {
            eprintln!("ERROR: {e}");
            std::process::exit(1);
        }
    }
}

fn run(command: Command) -> ModelResult<String> {
    match command {
        Command::Tree { file } => {
            let document = load(&file)?;
            Ok(render_tree(document.root()))
        }
        Command::Layers { file } => {
            let builder = DocumentBuilder::new(load(&file)?);
            let mut out = String::new();
            for layer in builder.list_layers() {
                let _ = writeln!(out, "{}\t{}", layer.id(), layer.label());
            }
            Ok(out)
        }
        Command::Normalize { file } => {
            let mut out = load(&file)?.serialize();
            out.push('\n');
            Ok(out)
        }
        Command::Json { file } => {
            let document = load(&file)?;
            let mut out = serde_json::to_string_pretty(document.root().cells())?;
            out.push('\n');
            Ok(out)
        }
        Command::Compress { file, name } => {
            let mut out = load(&file)?.to_mxfile(&name)?;
            out.push('\n');
            Ok(out)
        }
        Command::Replay {
            file,
            events,
            config,
        } => {
            let config = match config {
                Some(path) => SyncConfig::load(path)?,
                None => SyncConfig::default(),
            };
            replay(load(&file)?, &events, &config)
        }
    }
}

fn load(path: &Path) -> ModelResult<GraphDocument> {
    let xml = std::fs::read_to_string(path)?;
    GraphDocument::parse(&xml)
}

fn render_tree(root: &Root) -> String {
    let mut children_by_parent: HashMap<&str, Vec<&Cell>> = HashMap::new();
    for cell in root.cells() {
        if let Some(parent) = cell.parent() {
            children_by_parent.entry(parent).or_default().push(cell);
        }
    }
    let visible_by_id = root.effective_visibility();

    let mut out = String::new();
    if let Some(layer) = root.default_layer() {
        let _ = writeln!(out, "- id={} kind=root", layer.id());
        render_children(layer.id(), 1, &children_by_parent, &visible_by_id, &mut out);
    }
    out
}

fn render_children(
    parent_id: &str,
    depth: usize,
    children_by_parent: &HashMap<&str, Vec<&Cell>>,
    visible_by_id: &BTreeMap<String, bool>,
    out: &mut String,
) {
    let Some(children) = children_by_parent.get(parent_id) else {
        return;
    };
    for cell in children {
        let visible = visible_by_id.get(cell.id()).copied().unwrap_or(true);
        let indent = "  ".repeat(depth);
        let _ = writeln!(
            out,
            "{indent}- id={} kind={:?} visible={} label=\"{}\"",
            cell.id(),
            cell.kind(),
            visible,
            cell.label()
        );
        render_children(cell.id(), depth + 1, children_by_parent, visible_by_id, out);
    }
}

fn replay(document: GraphDocument, events: &Path, config: &SyncConfig) -> ModelResult<String> {
    let text = std::fs::read_to_string(events)?;
    let mut session = SyncSession::with_builder(config, DocumentBuilder::new(document));
    let start = Instant::now();
    let mut out = String::new();

    for line in text.lines().filter(|l| !l.trim().is_empty()) {
        let recorded: RecordedEvent = serde_json::from_str(line)?;
        let now = start + Duration::from_millis(recorded.at_ms);
        while let Some(deadline) = session.next_deadline().filter(|d| *d <= now) {
            flush(&mut session, deadline, &mut out)?;
        }
        session.handle_event(recorded.event, now);
    }
    while let Some(deadline) = session.next_deadline() {
        flush(&mut session, deadline, &mut out)?;
    }
    let _ = writeln!(out, "{}", session.builder().to_xml());
    Ok(out)
}

fn flush(session: &mut SyncSession, now: Instant, out: &mut String) -> ModelResult<()> {
    let tick = session.poll(now);
    if let Some(err) = tick.error {
        let _ = writeln!(out, "# rejected: {err}");
    }
    for command in tick.commands {
        let _ = writeln!(out, "{}", command.to_json()?);
    }
    Ok(())
}

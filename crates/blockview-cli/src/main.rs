use anyhow::{Context, Result};
use blockview_core::{Address, AnalysisSource, EdgeClass, ProgramSnapshot, Vec2};
use blockview_graph::LayoutResult;
use blockview_view::{DisasmGraphView, ViewSettings};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "blockview", author, version, about, long_about = None)]
struct Cli {
    /// Settings file to use instead of the platform default
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the functions of a snapshot
    Functions {
        #[arg(short, long)]
        snapshot: PathBuf,
    },
    /// Lay out one function and emit block positions and edge routes as JSON
    Layout {
        #[arg(short, long)]
        snapshot: PathBuf,
        /// Function entry address (0x-prefixed hex or decimal)
        #[arg(short, long)]
        function: Address,
        /// Write JSON here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Render one function's graph to an image
    Render {
        #[arg(short, long)]
        snapshot: PathBuf,
        #[arg(short, long)]
        function: Address,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(short, long, default_value_t = 20.0)]
        margin: f32,
    },
}

#[derive(Serialize, Debug)]
struct NodeReport {
    addr: String,
    rank: usize,
    x: f32,
    y: f32,
    width: f32,
    height: f32,
}

#[derive(Serialize, Debug)]
struct EdgeReport {
    source: String,
    target: String,
    class: EdgeClass,
    coordinates: Vec<Vec2>,
}

#[derive(Serialize, Debug)]
struct LayoutReport {
    function: String,
    nodes: Vec<NodeReport>,
    edges: Vec<EdgeReport>,
}

impl LayoutReport {
    fn new(function: Address, layout: &LayoutResult) -> Self {
        let mut addrs: Vec<Address> = layout.node_coordinates.keys().copied().collect();
        addrs.sort_unstable();
        let nodes = addrs
            .into_iter()
            .filter_map(|addr| {
                let rect = layout.node_rect(addr)?;
                Some(NodeReport {
                    addr: addr.to_string(),
                    rank: layout.ranks.get(&addr).copied().unwrap_or_default(),
                    x: rect.min.x,
                    y: rect.min.y,
                    width: rect.width(),
                    height: rect.height(),
                })
            })
            .collect();
        let edges = layout
            .edges
            .iter()
            .map(|edge| EdgeReport {
                source: edge.source.to_string(),
                target: edge.target.to_string(),
                class: edge.class,
                coordinates: edge.coordinates.clone(),
            })
            .collect();
        Self {
            function: function.to_string(),
            nodes,
            edges,
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_settings(config: Option<&Path>) -> ViewSettings {
    match config {
        Some(path) => ViewSettings::load_or_default(path),
        None => ViewSettings::load(),
    }
}

fn load_snapshot(path: &Path) -> Result<ProgramSnapshot> {
    let json = std::fs::read_to_string(path).with_context(|| format!("Failed to read snapshot {:?}", path))?;
    ProgramSnapshot::from_json(&json).with_context(|| format!("Failed to parse snapshot {:?}", path))
}

fn open_view(snapshot: &Path, function: Address, settings: ViewSettings) -> Result<DisasmGraphView<ProgramSnapshot>> {
    let program = load_snapshot(snapshot)?;
    let mut view = DisasmGraphView::new(program, settings, Vec2::new(1280.0, 800.0));
    view.set_function(function)
        .with_context(|| format!("Function {} is not in {:?}", function, snapshot))?;
    Ok(view)
}

fn run(cli: Cli) -> Result<()> {
    let settings = load_settings(cli.config.as_deref());
    match cli.command {
        Command::Functions { snapshot } => {
            let program = load_snapshot(&snapshot)?;
            for function in program.functions() {
                let name = program.label(function).unwrap_or_default();
                println!("{}  {}", function, name);
            }
        }
        Command::Layout {
            snapshot,
            function,
            output,
        } => {
            let view = open_view(&snapshot, function, settings)?;
            let report = LayoutReport::new(function, view.layout());
            let json = serde_json::to_string_pretty(&report)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, json).with_context(|| format!("Failed to write {:?}", path))?;
                    tracing::info!("Layout written to {:?}", path);
                }
                None => println!("{}", json),
            }
        }
        Command::Render {
            snapshot,
            function,
            output,
            margin,
        } => {
            let view = open_view(&snapshot, function, settings)?;
            let written = view
                .save_image_to(&output, margin)
                .with_context(|| format!("Failed to render {:?}", output))?;
            println!("Wrote {}", written.display());
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    init_logging();
    run(Cli::parse())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    const SNAPSHOT: &str = r#"{
        "functions": [{
            "function": 4096,
            "entry": 4096,
            "blocks": [
                {"addr": 4096, "instructions": [{"addr": 4096, "mnemonic": "jmp", "operands": [{"text": "0x1010"}]}],
                 "terminator": {"kind": "jump", "target": 4112}},
                {"addr": 4112, "instructions": [{"addr": 4112, "mnemonic": "ret"}],
                 "terminator": {"kind": "return"}}
            ],
            "edges": [[4096, 4112]]
        }]
    }"#;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_hex_function() {
        let cli = Cli::parse_from(["blockview", "layout", "-s", "snap.json", "-f", "0x401000"]);
        match cli.command {
            Command::Layout { function, output, .. } => {
                assert_eq!(function, Address(0x401000));
                assert!(output.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_layout_report() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = dir.path().join("snap.json");
        std::fs::write(&snapshot, SNAPSHOT).unwrap();

        let view = open_view(&snapshot, Address(4096), ViewSettings::default()).unwrap();
        let report = LayoutReport::new(Address(4096), view.layout());
        assert_eq!(report.nodes.len(), 2);
        assert_eq!(report.nodes[0].addr, "00001000");
        assert_eq!(report.nodes[1].rank, 1);
        assert_eq!(report.edges.len(), 1);
        assert_eq!(report.edges[0].class, EdgeClass::Normal);

        assert!(open_view(&snapshot, Address(0x9999), ViewSettings::default()).is_err());
    }
}

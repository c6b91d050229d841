use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use roaddata_core::RoadDataConfig;
use roaddata_tools::{builtin_tools, find_tool, to_definitions, ToolMessage, ToolOutput};
use tracing::{info, warn};

/// Run the roaddata PostgreSQL tools from the command line.
#[derive(Debug, Parser)]
#[command(name = "roaddata", version)]
struct Cli {
    /// Config file (default: $ROADDATA_CONFIG or ~/.roaddata/roaddata.toml).
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the tool definitions as JSON.
    Tools,
    /// Invoke a tool with a JSON parameter bag.
    Run {
        /// Tool name, e.g. road_map_plot.
        tool: String,
        /// Parameters as inline JSON.
        #[arg(long, conflicts_with = "params_file")]
        params: Option<String>,
        /// Parameters read from a JSON file.
        #[arg(long)]
        params_file: Option<PathBuf>,
        /// Directory for binary outputs such as rendered maps.
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout carries tool output; logs go to stderr.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "roaddata=info,roaddata_tools=info,roaddata_render=info".into()
            }),
        )
        .init();

    let cli = Cli::parse();

    let config = RoadDataConfig::load(cli.config.as_deref()).unwrap_or_else(|e| {
        warn!("Config load failed ({}), using defaults", e);
        RoadDataConfig::default()
    });
    let tools = builtin_tools(Arc::new(config));

    match cli.command {
        Command::Tools => {
            println!("{}", serde_json::to_string_pretty(&to_definitions(&tools))?);
        }
        Command::Run {
            tool,
            params,
            params_file,
            out_dir,
        } => {
            let input = read_params(params.as_deref(), params_file.as_deref())?;
            let handler =
                find_tool(&tools, &tool).with_context(|| format!("unknown tool: {tool}"))?;

            info!(tool = %tool, "invoking tool");
            let output = handler.execute(input).await;
            write_output(&tool, &output, &out_dir)?;

            if output.is_error {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

fn read_params(inline: Option<&str>, file: Option<&Path>) -> anyhow::Result<serde_json::Value> {
    let raw = match (inline, file) {
        (Some(json), _) => json.to_string(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        (None, None) => return Ok(serde_json::json!({})),
    };
    serde_json::from_str(&raw).context("parameters are not valid JSON")
}

/// Print text messages; write blobs to `<out_dir>/<tool>-<n>.<ext>`.
fn write_output(tool: &str, output: &ToolOutput, out_dir: &Path) -> anyhow::Result<()> {
    let mut blobs = 0usize;
    for message in &output.messages {
        match message {
            ToolMessage::Text { text } => println!("{text}"),
            ToolMessage::Blob { mime_type, data } => {
                blobs += 1;
                std::fs::create_dir_all(out_dir)
                    .with_context(|| format!("failed to create {}", out_dir.display()))?;
                let path = out_dir.join(format!("{tool}-{blobs}.{}", extension_for(mime_type)));
                std::fs::write(&path, data)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                info!(path = %path.display(), bytes = data.len(), "blob written");
                println!("[{mime_type}] {}", path.display());
            }
        }
    }
    Ok(())
}

fn extension_for(mime_type: &str) -> &'static str {
    match mime_type {
        "image/png" => "png",
        "image/jpeg" => "jpg",
        "application/json" => "json",
        "text/plain" => "txt",
        _ => "bin",
    }
}

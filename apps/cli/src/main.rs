use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::fs;
use tracing_subscriber::EnvFilter;

use chapsplit_core::{Toolchain, get_root_cache_dir, split_by_chapters};

#[derive(Parser)]
#[command(name = "chapsplit")]
#[command(about = "Split an audio file into one track per embedded chapter, losslessly")]
struct Cli {
    /// Input audio file
    input: PathBuf,

    /// Output directory for the chapter files
    #[arg(short, long, default_value = "chapters")]
    output: PathBuf,

    /// Remove the original file after a fully successful split
    #[arg(short, long)]
    remove: bool,

    /// Require ffmpeg/ffprobe from PATH instead of downloading a build
    #[arg(long)]
    local_tools: bool,
}

fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .template("{spinner:.cyan} {msg}")
            .unwrap(),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    println!(
        "\n{}  {}\n",
        style("chapsplit").cyan().bold(),
        style("Chapter Splitter").dim()
    );

    // Resolve the external tools before touching the input
    let tools = if cli.local_tools {
        let tools = Toolchain::from_path();
        if let Err(e) = tools.verify().await {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            std::process::exit(1);
        }
        tools
    } else {
        let spinner = create_spinner("Preparing ffmpeg...");
        match Toolchain::resolve(&get_root_cache_dir()).await {
            Ok(tools) => {
                spinner.finish_with_message(format!("{} ffmpeg ready", style("✓").green().bold()));
                tools
            }
            Err(e) => {
                spinner.finish_and_clear();
                eprintln!("{} {}", style("Error:").red().bold(), e);
                std::process::exit(1);
            }
        }
    };

    if let Err(e) = split_by_chapters(&tools, &cli.input, &cli.output).await {
        eprintln!("{} {}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }

    println!(
        "\n{} Audio split completed: {}",
        style("✓").green().bold(),
        style(cli.output.display()).cyan()
    );

    if cli.remove {
        match fs::remove_file(&cli.input).await {
            Ok(()) => println!("{} Original file removed", style("✓").green().bold()),
            // The split itself succeeded; a failed cleanup only warns.
            Err(e) => eprintln!(
                "{} could not remove {}: {}",
                style("Warning:").yellow().bold(),
                cli.input.display(),
                e
            ),
        }
    }

    Ok(())
}

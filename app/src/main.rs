use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use watermark_engine::Filter;

use watermarker_lib::config::{self, AppConfig};
use watermarker_lib::{EditorSession, LoadStatus, WatermarkSettings, fonts};

/// Tile text watermarks across images
#[derive(Parser, Debug)]
#[command(name = "watermarker")]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Watermark an image and write the result as PNG
    Render {
        /// Image to watermark
        input: PathBuf,

        /// JSON settings file ({ "filter": ..., "layers": [...] })
        #[arg(short, long)]
        settings: Option<PathBuf>,

        /// Filter override (none, grayscale, sepia, invert)
        #[arg(short, long)]
        filter: Option<Filter>,

        /// Container width in pixels
        #[arg(long)]
        width: Option<u32>,

        /// Container height in pixels
        #[arg(long)]
        height: Option<u32>,

        /// Output directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the default settings as JSON
    Defaults,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    config::load_dotenv();

    match args.command {
        Command::Defaults => {
            println!("{}", WatermarkSettings::default().to_json_pretty()?);
        }
        Command::Render {
            input,
            settings,
            filter,
            width,
            height,
            output,
        } => {
            let mut config = AppConfig::from_env()?;
            if let Some(width) = width {
                config.container_width = width;
            }
            if let Some(height) = height {
                config.container_height = height;
            }
            if let Some(output) = output {
                config.output_dir = output;
            }

            let path = render_file(&config, input, settings, filter).await?;
            println!("{}", path.display());
        }
    }
    Ok(())
}

async fn render_file(
    config: &AppConfig,
    input: PathBuf,
    settings: Option<PathBuf>,
    filter: Option<Filter>,
) -> anyhow::Result<PathBuf> {
    let fonts = Arc::new(fonts::load_fonts(config));
    let mut session = EditorSession::new(config.container(), config.default_color, fonts);

    if let Some(path) = settings {
        let loaded = WatermarkSettings::from_file(&path)?;
        session.apply_settings(loaded)?;
        tracing::info!(
            path = %path.display(),
            layers = session.layers().len(),
            "Settings loaded"
        );
    }
    if let Some(filter) = filter {
        session.set_filter(filter);
    }

    let bytes = tokio::fs::read(&input)
        .await
        .with_context(|| format!("failed to read {}", input.display()))?;
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let status = session.select_image(&name, bytes).await?;
    anyhow::ensure!(status == LoadStatus::Applied, "image load was superseded");

    tokio::fs::create_dir_all(&config.output_dir)
        .await
        .with_context(|| format!("failed to create {}", config.output_dir.display()))?;
    let path = session.export(&config.output_dir)?;
    Ok(path)
}

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use ecobotcore::detection::{content_type_for_path, ImageUpload};
use gui_bridge::bridge::GuiBridge;
use log::info;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;
use workflow::config::SimulatorConfig;
use workflow::offline::write_artifacts;
use workflow::runner::Runner;

mod generator;
mod gui_bridge;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "EcoBot mock detection driver")]
struct Args {
    /// Load a simulator config from YAML
    #[arg(long)]
    config: Option<PathBuf>,
    /// Image to run through the mock detector
    #[arg(long)]
    image: Option<PathBuf>,
    /// Run the image once and write an overlay PNG plus export JSON
    #[arg(long, default_value_t = false)]
    offline: bool,
    /// Only draw boxes of this class in the offline overlay
    #[arg(long)]
    filter: Option<String>,
    /// Override the artificial detection delay
    #[arg(long)]
    delay_ms: Option<u64>,
    #[arg(long)]
    output_dir: Option<PathBuf>,
    /// TrueType font used for box labels
    #[arg(long)]
    font: Option<PathBuf>,
    /// Keep the HTTP bridge alive for the visualizer
    #[arg(long, default_value_t = false)]
    serve: bool,
}

impl Args {
    fn apply_overrides(&self, config: &mut SimulatorConfig) {
        if let Some(delay_ms) = self.delay_ms {
            config.delay_ms = delay_ms;
        }
        if let Some(dir) = self.output_dir.as_ref() {
            config.output_dir = dir.clone();
        }
        if let Some(font) = self.font.as_ref() {
            config.font_path = Some(font.clone());
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = if let Some(path) = args.config.as_ref() {
        SimulatorConfig::load(path)?
    } else {
        SimulatorConfig::default()
    };
    args.apply_overrides(&mut config);

    let runner = Arc::new(Runner::new(config.clone())?);
    let gui_bridge = GuiBridge::new(runner.clone());

    if args.offline {
        let path = args
            .image
            .as_ref()
            .context("--offline needs --image <PATH>")?;
        let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".into());
        let content_type = content_type_for_path(path);
        let upload = ImageUpload::new(name, content_type.clone(), bytes);

        let runtime = TokioBuilder::new_current_thread()
            .enable_all()
            .build()
            .context("creating runtime for offline detection")?;
        info!("Processing file: {}", upload.name);
        let run = runtime
            .block_on(runner.execute(&upload))
            .map_err(|err| anyhow::anyhow!(err.user_message()))?;

        let artifacts = write_artifacts(
            &config,
            &run,
            &upload.bytes,
            args.filter.as_deref(),
            Utc::now(),
        )?;

        println!(
            "Offline run -> detections {}, drawn {}, overlay {}, export {}",
            run.results.len(),
            artifacts.outcome.boxes(),
            artifacts.overlay_png.display(),
            artifacts.export_json.display()
        );

        gui_bridge.publish(
            &run,
            upload.bytes,
            content_type.unwrap_or_else(|| "application/octet-stream".into()),
        );
        gui_bridge.publish_status("Offline detection results ready.");
    }

    if args.serve {
        gui_bridge.spawn(config.bind_addr()?)?;
        gui_bridge.publish_status("HTTP bridge running (Ctrl+C to stop)...");
        let runtime = TokioBuilder::new_current_thread()
            .enable_all()
            .build()
            .context("creating runtime for signal handling")?;
        runtime.block_on(async {
            signal::ctrl_c().await.context("awaiting Ctrl+C to exit")?;
            Ok::<(), anyhow::Error>(())
        })?;
    }

    Ok(())
}

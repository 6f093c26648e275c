use anyhow::{bail, Context};
use clap::Parser;
use frtmcore::prelude::StageConfig;
use frtmcore::RadarCapture;
use generator::profile::write_capture;
use gui_bridge::bridge::GuiBridge;
use gui_bridge::model::VisualizationModel;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;
use workflow::config::{TransformKind, WorkflowConfig};
use workflow::runner::Runner;

mod generator;
mod gui_bridge;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Turns FRTM radar captures into plot frames")]
struct Args {
    /// Capture to process
    #[arg(long)]
    input: Option<PathBuf>,
    /// Load a workflow config from YAML
    #[arg(long)]
    workflow: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = TransformKind::RangeProfile)]
    transform: TransformKind,
    /// Flat, Hann or Hamming
    #[arg(long, default_value = "Flat")]
    window: String,
    #[arg(long)]
    range_bins: Option<usize>,
    #[arg(long)]
    doppler_bins: Option<usize>,
    #[arg(long, default_value_t = 181)]
    cross_range_bins: usize,
    /// Bartlett, Capon or MUSIC
    #[arg(long, default_value = "Bartlett")]
    doa: String,
    /// Channel name such as `Rx1:Tx`
    #[arg(long)]
    channel: Option<String>,
    /// Pulse to process, the middle one by default
    #[arg(long)]
    pulse: Option<usize>,
    /// Display conversion (real, imag, mag, db10, db20, phase, phase_deg)
    #[arg(long)]
    conversion: Option<String>,
    /// One frame per pulse
    #[arg(long, default_value_t = false)]
    animate: bool,
    #[arg(long, default_value = "tools/data/frames.json")]
    output: PathBuf,
    /// Write a synthetic capture here and exit
    #[arg(long)]
    synthesize: Option<PathBuf>,
    /// Keep the HTTP bridge alive until Ctrl+C
    #[arg(long, default_value_t = false)]
    serve: bool,
}

impl Args {
    fn workflow_config(&self) -> anyhow::Result<WorkflowConfig> {
        let mut config = match &self.workflow {
            Some(path) => WorkflowConfig::load(path)?,
            None => WorkflowConfig::from_args(
                self.transform,
                StageConfig {
                    window: self.window.clone(),
                    range_bins: self.range_bins,
                    doppler_bins: self.doppler_bins,
                    cross_range_bins: self.cross_range_bins,
                    doa_method: self.doa.clone(),
                    channel: self.channel.clone(),
                    conversion: self.conversion.clone(),
                    ..StageConfig::default()
                },
                self.pulse,
                self.animate,
            ),
        };
        if self.input.is_some() {
            config.input = self.input.clone();
        }
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();
    let workflow_config = args.workflow_config()?;

    if let Some(path) = &args.synthesize {
        write_capture(&workflow_config.generator, path)?;
        println!("Synthetic capture written to {}", path.display());
        for (name, [x, y]) in workflow_config.generator.receiver_positions() {
            println!("  receiver {name}: [{x:.6}, {y:.6}]");
        }
        return Ok(());
    }

    let Some(input) = workflow_config.input.clone() else {
        bail!("no capture given; pass --input or set `input` in the workflow");
    };
    let mut capture = RadarCapture::open(&input)
        .with_context(|| format!("opening capture {}", input.display()))?;
    let runner = Runner::new(workflow_config.clone());
    runner.prepare(&mut capture)?;

    let derived = capture.derived();
    println!(
        "{}: {} channel(s), {} pulses x {} bins, range res {:.4} m (max {:.2} m), velocity res {:.4} m/s (max {:.2} m/s)",
        input.display(),
        capture.channel_count(),
        capture.pulse_count(),
        capture.bin_count(),
        derived.range_resolution,
        derived.range_maximum,
        derived.velocity_resolution,
        derived.velocity_maximum
    );

    let result = runner.execute(&capture)?;
    if let Some(parent) = args.output.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating output directory {}", parent.display()))?;
    }
    let file = File::create(&args.output)
        .with_context(|| format!("creating {}", args.output.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), &result.sequence)
        .with_context(|| format!("writing frames to {}", args.output.display()))?;

    let metrics = runner.metrics();
    println!(
        "{:?} -> {} frame(s) in {:?}, errors {}, output {}",
        workflow_config.transform,
        metrics.frames,
        metrics.busy,
        metrics.errors,
        args.output.display()
    );
    if let Some(Some(((row, column), value))) = result.peaks.first() {
        println!("  peak at row {row}, column {column}: {value:.3}");
    }

    if args.serve {
        let gui_bridge = GuiBridge::new(Arc::new(runner.clone()), Arc::new(capture));
        gui_bridge.publish(VisualizationModel::from_result(
            Some(input.display().to_string()),
            workflow_config.transform,
            &result,
        ));
        gui_bridge.serve();
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

use crate::workflow::config::{TransformKind, WorkflowConfig};
use anyhow::Context;
use frtmcore::plot::PlotSequence;
use frtmcore::prelude::{ProcessingStage, StageInput, StageOutput};
use frtmcore::processing::{AngleStage, DopplerStage, RangeStage};
use frtmcore::telemetry::{MetricsRecorder, MetricsSnapshot};
use frtmcore::RadarCapture;
use log::warn;
use std::sync::Arc;
use std::time::Instant;

pub struct WorkflowResult {
    pub sequence: PlotSequence,
    pub notes: Vec<String>,
    /// Strongest cell of each frame and its plotted value.
    pub peaks: Vec<Option<((usize, usize), f64)>>,
}

#[derive(Clone)]
pub struct Runner {
    config: WorkflowConfig,
    metrics: Arc<MetricsRecorder>,
}

impl Runner {
    pub fn new(config: WorkflowConfig) -> Self {
        Self {
            config,
            metrics: Arc::new(MetricsRecorder::new()),
        }
    }

    /// Runner for another workflow that reports into the same metrics.
    pub fn with_config(&self, config: WorkflowConfig) -> Self {
        Self {
            config,
            metrics: self.metrics.clone(),
        }
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Applies the workflow's receiver positions to `capture`.
    pub fn prepare(&self, capture: &mut RadarCapture) -> anyhow::Result<()> {
        for (name, position) in &self.config.receiver_positions {
            capture
                .set_receiver_position(name, *position)
                .with_context(|| format!("placing receiver {name}"))?;
        }
        Ok(())
    }

    pub fn execute(&self, capture: &RadarCapture) -> anyhow::Result<WorkflowResult> {
        let transform = self.config.transform;
        let mut stage: Box<dyn ProcessingStage> = match transform {
            TransformKind::RangeProfile => Box::new(RangeStage::new()),
            TransformKind::RangeDoppler => Box::new(DopplerStage::new()),
            TransformKind::RangeAngle => Box::new(AngleStage::new()),
        };
        stage
            .initialize(&self.config.stage)
            .with_context(|| format!("initializing {transform:?} stage"))?;

        let pulses: Vec<Option<usize>> = if self.config.animate && transform.animates() {
            (0..capture.pulse_count()).map(Some).collect()
        } else {
            if self.config.animate {
                warn!("{transform:?} has no pulse animation; plotting a single frame");
            }
            vec![self.config.pulse]
        };

        let mut outputs = Vec::with_capacity(pulses.len());
        for pulse_index in pulses {
            let started = Instant::now();
            let output = stage.execute(&StageInput {
                capture,
                pulse_index,
            });
            match output {
                Ok(output) => {
                    self.metrics.record_frame(started.elapsed());
                    outputs.push(output);
                }
                Err(err) => {
                    self.metrics.record_error();
                    stage.cleanup();
                    return Err(err).with_context(|| format!("executing {transform:?} stage"));
                }
            }
        }
        stage.cleanup();

        Ok(Self::collect(outputs, self.config.animate && transform.animates()))
    }

    fn collect(outputs: Vec<StageOutput>, animated: bool) -> WorkflowResult {
        let peaks = outputs
            .iter()
            .map(|output| output.metadata.peak.zip(output.metadata.peak_value))
            .collect();
        let notes = outputs
            .first()
            .map(|output| output.metadata.notes.clone())
            .unwrap_or_default();
        let frames: Vec<_> = outputs.into_iter().map(|output| output.frame).collect();
        let sequence = match (animated, frames.len()) {
            (false, 1) => frames
                .into_iter()
                .next()
                .map(PlotSequence::single)
                .unwrap_or_default(),
            _ => PlotSequence::animated(frames),
        };
        WorkflowResult {
            sequence,
            notes,
            peaks,
        }
    }
}

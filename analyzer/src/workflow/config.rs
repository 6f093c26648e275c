use anyhow::Context;
use clap::ValueEnum;
use frtmcore::prelude::StageConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::generator::profile::GeneratorConfig;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum TransformKind {
    #[default]
    RangeProfile,
    RangeDoppler,
    RangeAngle,
}

impl TransformKind {
    /// Whether an animation over pulses makes sense for this transform.
    pub fn animates(self) -> bool {
        !matches!(self, TransformKind::RangeDoppler)
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub input: Option<PathBuf>,
    pub transform: TransformKind,
    #[serde(flatten)]
    pub stage: StageConfig,
    pub pulse: Option<usize>,
    pub animate: bool,
    /// Receiver offsets in metres keyed by channel name (`"Rx1:Tx"`).
    pub receiver_positions: BTreeMap<String, [f64; 2]>,
    pub generator: GeneratorConfig,
}

impl WorkflowConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading workflow config {}", path_ref.display()))?;
        let config: WorkflowConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing workflow config {}", path_ref.display()))?;
        Ok(config)
    }

    pub fn from_args(
        transform: TransformKind,
        stage: StageConfig,
        pulse: Option<usize>,
        animate: bool,
    ) -> Self {
        Self {
            transform,
            stage,
            pulse,
            animate,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn config_from_args_keeps_stage_settings() {
        let stage = StageConfig {
            window: "Hann".into(),
            range_bins: Some(512),
            ..StageConfig::default()
        };
        let cfg = WorkflowConfig::from_args(TransformKind::RangeDoppler, stage, Some(3), false);
        assert_eq!(cfg.stage.range_bins, Some(512));
        assert_eq!(cfg.stage.window, "Hann");
        assert_eq!(cfg.pulse, Some(3));
        assert!(cfg.receiver_positions.is_empty());
    }

    #[test]
    fn config_load_reads_yaml() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(
            b"transform: range-angle\nwindow: Hamming\ndoa_method: Capon\ncross_range_bins: 91\n\
receiver_positions:\n  \"Rx1:Tx\": [0.0, 0.0]\n  \"Rx2:Tx\": [0.0, 0.002]\ngenerator:\n  receivers: 2\n",
        )
        .unwrap();
        let path = temp.into_temp_path();
        let cfg = WorkflowConfig::load(&path).unwrap();
        assert_eq!(cfg.transform, TransformKind::RangeAngle);
        assert_eq!(cfg.stage.doa_method, "Capon");
        assert_eq!(cfg.stage.cross_range_bins, 91);
        assert_eq!(cfg.stage.field_of_view, [-90.0, 90.0]);
        assert_eq!(cfg.receiver_positions["Rx2:Tx"], [0.0, 0.002]);
        assert_eq!(cfg.generator.receivers, 2);
    }

    #[test]
    fn missing_workflow_file_is_reported() {
        let err = WorkflowConfig::load("does/not/exist.yaml").unwrap_err();
        assert!(err.to_string().contains("reading workflow config"));
    }
}

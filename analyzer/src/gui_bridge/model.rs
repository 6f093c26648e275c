use crate::workflow::config::TransformKind;
use crate::workflow::runner::WorkflowResult;
use frtmcore::plot::PlotSequence;
use serde::{Deserialize, Serialize};

/// Latest processing result as served to the plotting front end.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct VisualizationModel {
    pub source: Option<String>,
    pub transform: TransformKind,
    pub sequence: PlotSequence,
    pub notes: Vec<String>,
}

impl VisualizationModel {
    pub fn from_result(source: Option<String>, transform: TransformKind, result: &WorkflowResult) -> Self {
        Self {
            source,
            transform,
            sequence: result.sequence.clone(),
            notes: result.notes.clone(),
        }
    }
}

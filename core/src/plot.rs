//! Frames handed to an external plotter.
//!
//! A frame is a real-valued 2D array with its axis vectors and a legend
//! label; `data[row][column]` is plotted at `(x_axis[column], y_axis[row])`.
//! One-dimensional traces are stored one per row.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlotMode {
    #[default]
    Single,
    Animate,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlotFrame {
    pub label: String,
    pub data: Vec<Vec<f64>>,
    pub x_axis: Vec<f64>,
    pub y_axis: Vec<f64>,
}

impl PlotFrame {
    pub fn from_array(
        label: impl Into<String>,
        data: &Array2<f64>,
        x_axis: Vec<f64>,
        y_axis: Vec<f64>,
    ) -> Self {
        Self {
            label: label.into(),
            data: data.rows().into_iter().map(|row| row.to_vec()).collect(),
            x_axis,
            y_axis,
        }
    }

    /// `(rows, columns)` of the data grid.
    pub fn shape(&self) -> (usize, usize) {
        (self.data.len(), self.data.first().map_or(0, Vec::len))
    }
}

/// Frames for one plot, either a still or an animation over pulses.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlotSequence {
    pub mode: PlotMode,
    pub frames: Vec<PlotFrame>,
}

impl PlotSequence {
    pub fn single(frame: PlotFrame) -> Self {
        Self {
            mode: PlotMode::Single,
            frames: vec![frame],
        }
    }

    pub fn animated(frames: Vec<PlotFrame>) -> Self {
        Self {
            mode: PlotMode::Animate,
            frames,
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn frame_keeps_rows_in_order() {
        let frame = PlotFrame::from_array(
            "map",
            &array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]],
            vec![0.0, 1.0, 2.0],
            vec![10.0, 20.0],
        );
        assert_eq!(frame.shape(), (2, 3));
        assert_eq!(frame.data[1], vec![4.0, 5.0, 6.0]);
    }

    #[test]
    fn sequence_serializes_mode_in_snake_case() {
        let sequence = PlotSequence::animated(vec![PlotFrame::default()]);
        let json = serde_json::to_string(&sequence).unwrap();
        assert!(json.contains("\"mode\":\"animate\""));
        assert_eq!(sequence.len(), 1);
    }
}

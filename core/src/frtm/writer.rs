use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use byteorder::{ByteOrder, LittleEndian};
use ndarray::Array2;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use super::header::{AxisSpec, ElementType, BEGIN_DATA};
use crate::prelude::{FrtmError, FrtmResult};

/// Everything needed to lay out a capture on disk besides the samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureLayout {
    pub version: String,
    pub waveform: String,
    pub radar_channels: String,
    pub freq_domain_type: String,
    pub antenna_names: Vec<String>,
    /// Zero-based `(rx, tx)` antenna indices, one per channel.
    pub coupling_combos: Vec<(usize, usize)>,
    pub time_steps: AxisSpec,
    pub freq_sweep: AxisSpec,
    /// Write a single real column instead of real/imaginary pairs.
    pub in_phase_only: bool,
    pub element_type: ElementType,
}

impl Default for CaptureLayout {
    fn default() -> Self {
        Self {
            version: "1.0".into(),
            waveform: "CS-FMCW".into(),
            radar_channels: "IQ".into(),
            freq_domain_type: "FreqSweep".into(),
            antenna_names: vec!["Tx".into(), "Rx".into()],
            coupling_combos: vec![(1, 0)],
            time_steps: AxisSpec::new(0.0, 1e-3, 64),
            freq_sweep: AxisSpec::new(76.0e9, 77.0e9, 256),
            in_phase_only: false,
            element_type: ElementType::F64,
        }
    }
}

impl CaptureLayout {
    fn column_count(&self) -> usize {
        if self.in_phase_only {
            1
        } else {
            2
        }
    }

    fn rows_per_channel(&self) -> usize {
        self.time_steps.count * self.freq_sweep.count
    }

    fn record_count(&self) -> usize {
        self.coupling_combos.len() * self.rows_per_channel()
    }
}

/// Serializes channel cubes into the `.frtm` layout.
#[derive(Debug, Clone)]
pub struct FrtmWriter {
    layout: CaptureLayout,
}

impl FrtmWriter {
    pub fn new(layout: CaptureLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &CaptureLayout {
        &self.layout
    }

    /// Encodes one `(pulse_count, bin_count)` array per coupling combination.
    pub fn encode(&self, channels: &[Array2<Complex64>]) -> FrtmResult<Vec<u8>> {
        self.validate(channels)?;

        let header = self.render_header();
        let record_length = self.layout.column_count() * self.layout.element_type.size();
        let mut bytes = Vec::with_capacity(header.len() + self.layout.record_count() * record_length);
        bytes.extend_from_slice(header.as_bytes());

        let mut record = vec![0u8; record_length];
        let width = self.layout.element_type.size();
        for value in channels.iter().flat_map(|channel| channel.iter()) {
            self.write_element(&mut record[..width], value.re);
            if !self.layout.in_phase_only {
                self.write_element(&mut record[width..], value.im);
            }
            bytes.extend_from_slice(&record);
        }
        Ok(bytes)
    }

    pub fn write_to<P: AsRef<Path>>(&self, path: P, channels: &[Array2<Complex64>]) -> FrtmResult<()> {
        let path = path.as_ref();
        let bytes = self.encode(channels)?;
        fs::write(path, bytes).map_err(|source| FrtmError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    fn validate(&self, channels: &[Array2<Complex64>]) -> FrtmResult<()> {
        let layout = &self.layout;
        if channels.len() != layout.coupling_combos.len() {
            return Err(FrtmError::InvalidInput(format!(
                "{} channel arrays for {} coupling combinations",
                channels.len(),
                layout.coupling_combos.len()
            )));
        }
        let shape = (layout.time_steps.count, layout.freq_sweep.count);
        if let Some(channel) = channels.iter().find(|channel| channel.dim() != shape) {
            return Err(FrtmError::InvalidInput(format!(
                "channel shape {:?} differs from (pulses, bins) = {:?}",
                channel.dim(),
                shape
            )));
        }
        let antennas = layout.antenna_names.len();
        if layout
            .coupling_combos
            .iter()
            .any(|&(rx, tx)| rx >= antennas || tx >= antennas)
        {
            return Err(FrtmError::InvalidInput(format!(
                "coupling combination refers past {antennas} antennas"
            )));
        }
        Ok(())
    }

    fn write_element(&self, target: &mut [u8], value: f64) {
        match self.layout.element_type {
            ElementType::F32 => LittleEndian::write_f32(target, value as f32),
            ElementType::F64 => LittleEndian::write_f64(target, value),
        }
    }

    /// Renders the header, settling `BinaryStartByte` on the header's own length.
    fn render_header(&self) -> String {
        let mut start_byte = 0;
        loop {
            let text = self.header_with_start(start_byte);
            if text.len() == start_byte {
                return text;
            }
            start_byte = text.len();
        }
    }

    fn header_with_start(&self, start_byte: usize) -> String {
        let layout = &self.layout;
        let columns = layout.column_count();
        let element = layout.element_type;
        let schema = vec![element.schema_token(); columns].join(" ");
        let combos = layout
            .coupling_combos
            .iter()
            .map(|(rx, tx)| format!("{},{}", rx + 1, tx + 1))
            .collect::<Vec<_>>()
            .join(";");

        let mut text = String::new();
        let mut field = |key: &str, value: &dyn std::fmt::Display| {
            let _ = writeln!(text, "@ {key} = \"{value}\"");
        };
        field("DlxCdVersion", &layout.version);
        field("RowCount", &layout.rows_per_channel());
        field("ColumnCount", &columns);
        field("ColHead1", &"Real");
        if columns == 2 {
            field("ColHead2", &"Imag");
        }
        field("BinaryRecordLength", &(columns * element.size()));
        field("BinaryStartByte", &start_byte);
        field("BinaryRecordSchema", &schema);
        field("RadarWaveform", &layout.waveform);
        field("RadarChannels", &layout.radar_channels);
        field("TimeSteps", &layout.time_steps);
        field("FreqDomainType", &layout.freq_domain_type);
        field("FreqSweep", &layout.freq_sweep);
        field("AntennaNames", &layout.antenna_names.join(";"));
        field(
            "CouplingCombos",
            &format!("{} {combos}", layout.coupling_combos.len()),
        );
        text.push_str(BEGIN_DATA);
        text.push('\n');
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frtm::{FrtmHeader, RadarCapture};

    #[test]
    fn start_byte_points_past_the_sentinel() {
        let layout = CaptureLayout::default();
        let channels: Vec<Array2<Complex64>> = vec![Array2::zeros((64, 256))];
        let bytes = FrtmWriter::new(layout).encode(&channels).unwrap();
        let (header, end) = FrtmHeader::parse(&bytes).unwrap();
        assert_eq!(header.start_byte, end);
        assert_eq!(bytes.len() - end, 64 * 256 * 16);
    }

    #[test]
    fn single_precision_payload_parses_back() {
        let layout = CaptureLayout {
            element_type: ElementType::F32,
            time_steps: AxisSpec::new(0.0, 1e-3, 2),
            freq_sweep: AxisSpec::new(10.0e9, 10.5e9, 4),
            ..CaptureLayout::default()
        };
        let samples = Array2::from_shape_fn((2, 4), |(p, k)| {
            Complex64::new(p as f64 + 0.5, k as f64 - 0.25)
        });
        let bytes = FrtmWriter::new(layout)
            .encode(std::slice::from_ref(&samples))
            .unwrap();
        let capture = RadarCapture::from_bytes(&bytes).unwrap();
        assert_eq!(capture.channel_data("Rx:Tx").unwrap(), samples.view());
    }

    #[test]
    fn mismatched_channel_shape_is_rejected() {
        let channels: Vec<Array2<Complex64>> = vec![Array2::zeros((3, 3))];
        let err = FrtmWriter::new(CaptureLayout::default())
            .encode(&channels)
            .unwrap_err();
        assert!(matches!(err, FrtmError::InvalidInput(_)));
    }
}

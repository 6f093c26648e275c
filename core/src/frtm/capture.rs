use std::fmt;
use std::fs;
use std::path::Path;

use byteorder::{ByteOrder, LittleEndian};
use log::debug;
use ndarray::{Array2, Array3, ArrayView2, Axis};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use super::header::{ElementType, FrtmHeader};
use super::SPEED_OF_LIGHT;
use crate::math::convert::Conversion;
use crate::prelude::{FrtmError, FrtmResult};

/// Receive/transmit antenna pair naming one radar channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelId {
    pub rx: String,
    pub tx: String,
}

impl ChannelId {
    pub fn new(rx: impl Into<String>, tx: impl Into<String>) -> Self {
        Self {
            rx: rx.into(),
            tx: tx.into(),
        }
    }

    /// `"<rx>:<tx>"`
    pub fn name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.rx, self.tx)
    }
}

/// Channel-ordered complex cubes of a capture.
///
/// Entries keep the order of the header's coupling combinations, which is
/// also the channel order of the binary payload. Each array has shape
/// `(pulse_count, bin_count)`.
#[derive(Debug, Clone, Default)]
pub struct ChannelDataset {
    entries: Vec<(ChannelId, Array2<Complex64>)>,
}

impl ChannelDataset {
    fn from_cube(ids: Vec<ChannelId>, cube: Array3<Complex64>) -> Self {
        let entries = ids
            .into_iter()
            .zip(cube.axis_iter(Axis(0)))
            .map(|(id, slab)| (id, slab.to_owned()))
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ChannelId, &Array2<Complex64>)> {
        self.entries.iter().map(|(id, data)| (id, data))
    }

    pub fn ids(&self) -> impl Iterator<Item = &ChannelId> {
        self.entries.iter().map(|(id, _)| id)
    }

    pub fn get(&self, id: &ChannelId) -> Option<&Array2<Complex64>> {
        self.entries
            .iter()
            .find(|(candidate, _)| candidate == id)
            .map(|(_, data)| data)
    }

    /// Looks a channel up by its `"rx:tx"` name.
    pub fn get_by_name(&self, name: &str) -> Option<&Array2<Complex64>> {
        self.position(name).map(|index| &self.entries[index].1)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(id, _)| id.name() == name)
    }

    pub fn get_index(&self, index: usize) -> Option<(&ChannelId, &Array2<Complex64>)> {
        self.entries.get(index).map(|(id, data)| (id, data))
    }
}

/// Physical quantities derived from the header, computed once.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DerivedQuantities {
    pub pulse_interval: f64,
    pub capture_duration: f64,
    pub bin_spacing: f64,
    pub bandwidth: f64,
    pub center_frequency: f64,
    pub range_resolution: f64,
    pub range_maximum: f64,
    pub velocity_resolution: f64,
    pub velocity_maximum: f64,
}

impl DerivedQuantities {
    pub fn from_header(header: &FrtmHeader) -> Self {
        let pulses = header.pulse_count() as f64;
        let bins = header.bin_count() as f64;

        let pulse_interval = header.time_steps.step();
        let capture_duration = pulse_interval * pulses;

        let bin_spacing = header.freq_sweep.step();
        let bandwidth = bin_spacing.abs() * bins;
        let center_frequency = (header.freq_sweep.start + header.freq_sweep.stop) / 2.0;

        let range_resolution = SPEED_OF_LIGHT / (2.0 * bandwidth);
        let effective_bins = if header.in_phase_only() {
            bins / 2.0
        } else {
            bins
        };
        let range_maximum = range_resolution * effective_bins;

        let velocity_resolution = if capture_duration > 0.0 && center_frequency > 0.0 {
            SPEED_OF_LIGHT / (2.0 * center_frequency * capture_duration)
        } else {
            f64::INFINITY
        };
        let velocity_maximum = velocity_resolution * pulses / 2.0;

        Self {
            pulse_interval,
            capture_duration,
            bin_spacing,
            bandwidth,
            center_frequency,
            range_resolution,
            range_maximum,
            velocity_resolution,
            velocity_maximum,
        }
    }
}

/// One parsed `.frtm` capture.
///
/// Samples are immutable after parsing. Only the receiver positions used for
/// direction finding and the display conversion can change.
#[derive(Debug, Clone)]
pub struct RadarCapture {
    header: FrtmHeader,
    derived: DerivedQuantities,
    data: ChannelDataset,
    receiver_positions: Vec<[f64; 2]>,
    conversion: Option<Conversion>,
}

/// Opens and parses the capture at `path`.
pub fn open_capture<P: AsRef<Path>>(path: P) -> FrtmResult<RadarCapture> {
    RadarCapture::open(path)
}

impl RadarCapture {
    pub fn open<P: AsRef<Path>>(path: P) -> FrtmResult<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(FrtmError::FileNotFound(path.to_path_buf()));
        }
        let bytes = fs::read(path).map_err(|source| FrtmError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("read {} bytes from {}", bytes.len(), path.display());
        Self::from_bytes(&bytes)
    }

    /// Parses a capture held in memory.
    pub fn from_bytes(bytes: &[u8]) -> FrtmResult<Self> {
        let (header, header_end) = FrtmHeader::parse(bytes)?;
        if header.start_byte < header_end || header.start_byte > bytes.len() {
            return Err(FrtmError::malformed(
                "BinaryStartByte",
                format!(
                    "offset {} lies outside the payload ({}..={})",
                    header.start_byte,
                    header_end,
                    bytes.len()
                ),
            ));
        }

        let samples = decode_payload(&header, &bytes[header.start_byte..])?;
        let shape = (
            header.channel_count(),
            header.pulse_count(),
            header.bin_count(),
        );
        let cube = Array3::from_shape_vec(shape, samples)
            .map_err(|err| FrtmError::Internal(format!("reshaping payload: {err}")))?;

        let ids = header
            .coupling_combos
            .iter()
            .map(|combo| {
                ChannelId::new(
                    header.antenna_names[combo.rx].clone(),
                    header.antenna_names[combo.tx].clone(),
                )
            })
            .collect();
        let data = ChannelDataset::from_cube(ids, cube);
        let derived = DerivedQuantities::from_header(&header);
        debug!(
            "parsed capture: {} channels, {} pulses, {} bins",
            shape.0, shape.1, shape.2
        );

        Ok(Self {
            receiver_positions: vec![[0.0, 0.0]; data.len()],
            header,
            derived,
            data,
            conversion: None,
        })
    }

    pub fn header(&self) -> &FrtmHeader {
        &self.header
    }

    pub fn derived(&self) -> &DerivedQuantities {
        &self.derived
    }

    pub fn range_resolution(&self) -> f64 {
        self.derived.range_resolution
    }

    pub fn range_maximum(&self) -> f64 {
        self.derived.range_maximum
    }

    pub fn velocity_resolution(&self) -> f64 {
        self.derived.velocity_resolution
    }

    pub fn velocity_maximum(&self) -> f64 {
        self.derived.velocity_maximum
    }

    pub fn center_frequency(&self) -> f64 {
        self.derived.center_frequency
    }

    pub fn bandwidth(&self) -> f64 {
        self.derived.bandwidth
    }

    pub fn pulse_interval(&self) -> f64 {
        self.derived.pulse_interval
    }

    pub fn pulse_count(&self) -> usize {
        self.header.pulse_count()
    }

    pub fn bin_count(&self) -> usize {
        self.header.bin_count()
    }

    pub fn channel_count(&self) -> usize {
        self.data.len()
    }

    pub fn channel_ids(&self) -> impl Iterator<Item = &ChannelId> {
        self.data.ids()
    }

    pub fn channel_names(&self) -> Vec<String> {
        self.data.ids().map(ChannelId::name).collect()
    }

    pub fn all_data(&self) -> &ChannelDataset {
        &self.data
    }

    pub fn channel_data(&self, name: &str) -> FrtmResult<ArrayView2<'_, Complex64>> {
        self.data
            .get_by_name(name)
            .map(Array2::view)
            .ok_or_else(|| FrtmError::UnknownChannel(name.to_string()))
    }

    pub fn receiver_position(&self, name: &str) -> FrtmResult<[f64; 2]> {
        self.data
            .position(name)
            .map(|index| self.receiver_positions[index])
            .ok_or_else(|| FrtmError::UnknownChannel(name.to_string()))
    }

    /// Sets the 2D receiver offset (metres) of one channel.
    pub fn set_receiver_position(&mut self, name: &str, position: [f64; 2]) -> FrtmResult<()> {
        let index = self
            .data
            .position(name)
            .ok_or_else(|| FrtmError::UnknownChannel(name.to_string()))?;
        self.receiver_positions[index] = position;
        Ok(())
    }

    /// Receiver offsets in channel order.
    pub fn receiver_positions(&self) -> &[[f64; 2]] {
        &self.receiver_positions
    }

    pub fn conversion(&self) -> Option<Conversion> {
        self.conversion
    }

    pub fn set_conversion(&mut self, conversion: Option<Conversion>) {
        self.conversion = conversion;
    }

    /// Start time of every pulse.
    pub fn time_axis(&self) -> Vec<f64> {
        self.header.time_steps.values()
    }

    /// Frequency of every bin.
    pub fn frequency_axis(&self) -> Vec<f64> {
        self.header.freq_sweep.values()
    }
}

fn decode_payload(header: &FrtmHeader, payload: &[u8]) -> FrtmResult<Vec<Complex64>> {
    let record_length = header.record_length;
    let expected = header.record_count();
    if payload.len() % record_length != 0 || payload.len() / record_length != expected {
        return Err(FrtmError::PayloadSizeMismatch {
            expected,
            actual: payload.len() / record_length,
        });
    }

    let width = header.element_type.size();
    let read = |bytes: &[u8]| match header.element_type {
        ElementType::F32 => f64::from(LittleEndian::read_f32(bytes)),
        ElementType::F64 => LittleEndian::read_f64(bytes),
    };

    Ok(payload
        .chunks_exact(record_length)
        .map(|record| {
            let re = read(&record[..width]);
            let im = if header.column_count == 2 {
                read(&record[width..2 * width])
            } else {
                0.0
            };
            Complex64::new(re, im)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frtm::writer::{CaptureLayout, FrtmWriter};
    use crate::frtm::AxisSpec;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn constant_channels(layout: &CaptureLayout) -> Vec<Array2<Complex64>> {
        (0..layout.coupling_combos.len())
            .map(|k| {
                Array2::from_elem(
                    (layout.time_steps.count, layout.freq_sweep.count),
                    Complex64::new(k as f64 + 1.0, -(k as f64)),
                )
            })
            .collect()
    }

    fn three_channel_layout() -> CaptureLayout {
        CaptureLayout {
            antenna_names: vec!["Tx".into(), "Rx1".into(), "Rx2".into()],
            coupling_combos: vec![(1, 0), (2, 0), (0, 0)],
            time_steps: AxisSpec::new(0.0, 3e-4, 4),
            freq_sweep: AxisSpec::new(76.0e9, 77.0e9, 8),
            ..CaptureLayout::default()
        }
    }

    #[test]
    fn channels_keep_header_order() {
        let layout = three_channel_layout();
        let bytes = FrtmWriter::new(layout.clone())
            .encode(&constant_channels(&layout))
            .unwrap();
        let capture = RadarCapture::from_bytes(&bytes).unwrap();

        assert_eq!(capture.channel_names(), vec!["Rx1:Tx", "Rx2:Tx", "Tx:Tx"]);
        for (k, (_, data)) in capture.all_data().iter().enumerate() {
            let expected = Complex64::new(k as f64 + 1.0, -(k as f64));
            assert!(data.iter().all(|value| *value == expected));
        }
    }

    #[test]
    fn two_channel_scenario_names_and_shapes() {
        let layout = CaptureLayout {
            antenna_names: vec!["A".into(), "B".into()],
            coupling_combos: vec![(0, 1), (1, 0)],
            time_steps: AxisSpec::new(0.0, 3e-4, 4),
            freq_sweep: AxisSpec::new(76.0e9, 77.0e9, 8),
            ..CaptureLayout::default()
        };
        let bytes = FrtmWriter::new(layout.clone())
            .encode(&constant_channels(&layout))
            .unwrap();
        let capture = RadarCapture::from_bytes(&bytes).unwrap();

        assert_eq!(capture.channel_names()[0], "A:B");
        assert_eq!(capture.channel_data("A:B").unwrap().dim(), (4, 8));
        assert!(matches!(
            capture.channel_data("B:B"),
            Err(FrtmError::UnknownChannel(_))
        ));
    }

    fn hand_written_two_channel(row_count: usize) -> Vec<u8> {
        let header = |start: usize| {
            format!(
                "@ DlxCdVersion = \"1.0\"\n\
                 @ RowCount = \"{row_count}\"\n\
                 @ ColumnCount = \"2\"\n\
                 @ ColHead1 = \"Re\"\n\
                 @ ColHead2 = \"Im\"\n\
                 @ BinaryRecordLength = \"16\"\n\
                 @ BinaryStartByte = \"{start:06}\"\n\
                 @ BinaryRecordSchema = \"double, double\"\n\
                 @ RadarWaveform = \"CS-FMCW\"\n\
                 @ RadarChannels = \"IQ\"\n\
                 @ TimeSteps = \"0 0.0003 3\"\n\
                 @ FreqDomainType = \"FreqSweep\"\n\
                 @ FreqSweep = \"76e9 77e9 7\"\n\
                 @ AntennaNames = \"A;B\"\n\
                 @ CouplingCombos = \"2 1,2;2,1\"\n\
                 @ BeginData\n"
            )
        };
        let start = header(0).len();
        let mut bytes = header(start).into_bytes();
        for record in 0..64 {
            bytes.extend_from_slice(&(record as f64).to_le_bytes());
            bytes.extend_from_slice(&0.0_f64.to_le_bytes());
        }
        bytes
    }

    #[test]
    fn row_count_is_declared_per_channel() {
        let capture = RadarCapture::from_bytes(&hand_written_two_channel(32)).unwrap();
        assert_eq!(capture.channel_names(), vec!["A:B", "B:A"]);
        assert_eq!(capture.header().row_count, 32);
        let second = capture.channel_data("B:A").unwrap();
        assert_eq!(second.dim(), (4, 8));
        assert_eq!(second[[0, 0]], Complex64::new(32.0, 0.0));

        assert!(matches!(
            RadarCapture::from_bytes(&hand_written_two_channel(64)),
            Err(FrtmError::MalformedHeader { key, .. }) if key == "RowCount"
        ));
    }

    #[test]
    fn derived_quantities_follow_bandwidth() {
        let layout = three_channel_layout();
        let bytes = FrtmWriter::new(layout.clone())
            .encode(&constant_channels(&layout))
            .unwrap();
        let capture = RadarCapture::from_bytes(&bytes).unwrap();

        let spacing = (77.0e9 - 76.0e9) / 7.0;
        let bandwidth = spacing * 8.0;
        assert_eq!(capture.bandwidth(), bandwidth);
        assert_eq!(
            capture.range_resolution(),
            SPEED_OF_LIGHT / (2.0 * capture.bandwidth())
        );
        assert_eq!(capture.range_maximum(), capture.range_resolution() * 8.0);

        let duration = 1e-4 * 4.0;
        let expected_velocity = SPEED_OF_LIGHT / (2.0 * 76.5e9 * duration);
        assert!((capture.velocity_resolution() - expected_velocity).abs() < 1e-9);
        assert_eq!(
            capture.velocity_maximum(),
            capture.velocity_resolution() * 4.0 / 2.0
        );
    }

    #[test]
    fn in_phase_captures_halve_the_maximum_range() {
        let layout = CaptureLayout {
            in_phase_only: true,
            ..three_channel_layout()
        };
        let bytes = FrtmWriter::new(layout.clone())
            .encode(&constant_channels(&layout))
            .unwrap();
        let capture = RadarCapture::from_bytes(&bytes).unwrap();

        assert_eq!(capture.header().column_count, 1);
        assert_eq!(
            capture.range_maximum(),
            capture.range_resolution() * 8.0 / 2.0
        );
        let (_, data) = capture.all_data().get_index(1).unwrap();
        assert!(data.iter().all(|value| value.im == 0.0 && value.re == 2.0));
    }

    #[test]
    fn truncated_payload_is_fatal() {
        let layout = three_channel_layout();
        let mut bytes = FrtmWriter::new(layout.clone())
            .encode(&constant_channels(&layout))
            .unwrap();
        bytes.truncate(bytes.len() - 16);
        assert!(matches!(
            RadarCapture::from_bytes(&bytes),
            Err(FrtmError::PayloadSizeMismatch {
                expected: 96,
                actual: 95
            })
        ));
    }

    #[test]
    fn missing_file_is_reported() {
        let err = open_capture("/definitely/not/here.frtm").unwrap_err();
        assert!(matches!(err, FrtmError::FileNotFound(_)));
    }

    #[test]
    fn opens_capture_from_disk() {
        let layout = three_channel_layout();
        let bytes = FrtmWriter::new(layout.clone())
            .encode(&constant_channels(&layout))
            .unwrap();
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&bytes).unwrap();

        let capture = open_capture(file.path()).unwrap();
        assert_eq!(capture.channel_count(), 3);
        assert_eq!(capture.time_axis().len(), 4);
        assert_eq!(capture.frequency_axis()[0], 76.0e9);
    }

    #[test]
    fn receiver_positions_default_to_origin() {
        let layout = three_channel_layout();
        let bytes = FrtmWriter::new(layout.clone())
            .encode(&constant_channels(&layout))
            .unwrap();
        let mut capture = RadarCapture::from_bytes(&bytes).unwrap();

        assert_eq!(capture.receiver_position("Rx2:Tx").unwrap(), [0.0, 0.0]);
        capture.set_receiver_position("Rx2:Tx", [0.0, 0.002]).unwrap();
        assert_eq!(capture.receiver_positions()[1], [0.0, 0.002]);
        assert!(capture.set_receiver_position("Rx9:Tx", [1.0, 1.0]).is_err());
    }
}

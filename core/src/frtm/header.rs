//! Text header of an `.frtm` capture.
//!
//! The header is a run of ASCII lines of the form
//! `@ <Key> <extra tokens> = "<value>"` terminated by the [`BEGIN_DATA`]
//! sentinel. The binary payload follows at the declared start byte.

use std::collections::HashMap;
use std::fmt;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::prelude::{FrtmError, FrtmResult};

/// Sentinel line separating the text header from the binary payload.
pub const BEGIN_DATA: &str = "@ BeginData";

const RECOGNIZED_KEYS: [&str; 15] = [
    "DlxCdVersion",
    "RowCount",
    "ColumnCount",
    "ColHead1",
    "ColHead2",
    "BinaryRecordLength",
    "BinaryStartByte",
    "BinaryRecordSchema",
    "RadarWaveform",
    "RadarChannels",
    "TimeSteps",
    "FreqDomainType",
    "FreqSweep",
    "AntennaNames",
    "CouplingCombos",
];

/// Storage type of one payload column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElementType {
    F32,
    F64,
}

impl ElementType {
    pub fn size(self) -> usize {
        match self {
            ElementType::F32 => 4,
            ElementType::F64 => 8,
        }
    }

    pub fn schema_token(self) -> &'static str {
        match self {
            ElementType::F32 => "float",
            ElementType::F64 => "double",
        }
    }

    fn from_token(token: &str) -> Option<Self> {
        match token
            .to_ascii_lowercase()
            .trim_start_matches(|c: char| c == '<' || c == '=')
        {
            "double" | "d" | "f8" | "float64" => Some(ElementType::F64),
            "float" | "single" | "f" | "f4" | "float32" => Some(ElementType::F32),
            _ => None,
        }
    }
}

/// `start stop n` triplet describing an evenly sampled axis of `n + 1` points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisSpec {
    pub start: f64,
    pub stop: f64,
    pub count: usize,
}

impl AxisSpec {
    pub fn new(start: f64, stop: f64, count: usize) -> Self {
        Self { start, stop, count }
    }

    /// Spacing between neighbouring points; zero for a single-point axis.
    pub fn step(&self) -> f64 {
        if self.count > 1 {
            (self.stop - self.start) / (self.count - 1) as f64
        } else {
            0.0
        }
    }

    pub fn values(&self) -> Vec<f64> {
        let step = self.step();
        (0..self.count)
            .map(|i| self.start + step * i as f64)
            .collect()
    }
}

impl fmt::Display for AxisSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.start,
            self.stop,
            self.count.saturating_sub(1)
        )
    }
}

/// Zero-based receive/transmit antenna indices of one radar channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouplingCombo {
    pub rx: usize,
    pub tx: usize,
}

/// Parsed header fields of a capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrtmHeader {
    pub version: String,
    pub row_count: usize,
    pub column_count: usize,
    pub column_heads: Vec<String>,
    pub record_length: usize,
    pub start_byte: usize,
    pub element_type: ElementType,
    pub waveform: String,
    pub radar_channels: String,
    pub time_steps: AxisSpec,
    pub freq_domain_type: String,
    pub freq_sweep: AxisSpec,
    pub antenna_names: Vec<String>,
    pub coupling_combos: Vec<CouplingCombo>,
}

impl FrtmHeader {
    /// Parses the header at the front of `bytes`.
    ///
    /// Returns the header and the offset of the first byte after the
    /// sentinel line.
    pub fn parse(bytes: &[u8]) -> FrtmResult<(Self, usize)> {
        let (text, header_end) = split_header(bytes)?;
        let fields = HeaderFields::collect(text)?;
        let header = Self::from_fields(&fields)?;
        Ok((header, header_end))
    }

    fn from_fields(fields: &HeaderFields) -> FrtmResult<Self> {
        let column_count: usize = fields.number("ColumnCount")?;
        if !(1..=2).contains(&column_count) {
            return Err(FrtmError::malformed(
                "ColumnCount",
                format!("expected 1 or 2 columns, found {column_count}"),
            ));
        }

        let mut column_heads = vec![fields.text("ColHead1")?.to_string()];
        if column_count == 2 {
            column_heads.push(fields.text("ColHead2")?.to_string());
        }

        let element_type = parse_schema(fields.text("BinaryRecordSchema")?, column_count)?;
        let record_length: usize = fields.number("BinaryRecordLength")?;
        if record_length != column_count * element_type.size() {
            return Err(FrtmError::malformed(
                "BinaryRecordLength",
                format!(
                    "{record_length} bytes does not fit {column_count} x {}",
                    element_type.schema_token()
                ),
            ));
        }

        let time_steps = fields.axis("TimeSteps")?;
        let freq_sweep = fields.axis("FreqSweep")?;
        if freq_sweep.count < 2 || freq_sweep.step() == 0.0 {
            return Err(FrtmError::malformed(
                "FreqSweep",
                "sweep must span a non-zero bandwidth with at least two points",
            ));
        }

        let antenna_names = parse_antenna_names(fields.text("AntennaNames")?)?;
        let coupling_combos = parse_coupling_combos(fields.text("CouplingCombos")?)?;
        if let Some(combo) = coupling_combos
            .iter()
            .find(|combo| combo.rx >= antenna_names.len() || combo.tx >= antenna_names.len())
        {
            return Err(FrtmError::malformed(
                "CouplingCombos",
                format!(
                    "pair {},{} refers past the {} declared antennas",
                    combo.rx + 1,
                    combo.tx + 1,
                    antenna_names.len()
                ),
            ));
        }

        let header = Self {
            version: fields.text("DlxCdVersion")?.to_string(),
            row_count: fields.number("RowCount")?,
            column_count,
            column_heads,
            record_length,
            start_byte: fields.number("BinaryStartByte")?,
            element_type,
            waveform: fields.text("RadarWaveform")?.to_string(),
            radar_channels: fields.text("RadarChannels")?.to_string(),
            time_steps,
            freq_domain_type: fields.text("FreqDomainType")?.to_string(),
            freq_sweep,
            antenna_names,
            coupling_combos,
        };

        let rows_per_channel = header.pulse_count() * header.bin_count();
        if header.row_count != rows_per_channel {
            return Err(FrtmError::malformed(
                "RowCount",
                format!(
                    "declares {} rows per channel but {} pulses x {} bins = {}",
                    header.row_count,
                    header.pulse_count(),
                    header.bin_count(),
                    rows_per_channel
                ),
            ));
        }

        Ok(header)
    }

    pub fn channel_count(&self) -> usize {
        self.coupling_combos.len()
    }

    pub fn pulse_count(&self) -> usize {
        self.time_steps.count
    }

    pub fn bin_count(&self) -> usize {
        self.freq_sweep.count
    }

    /// Number of payload records: `RowCount` records for each channel.
    pub fn record_count(&self) -> usize {
        self.row_count * self.channel_count()
    }

    /// True when the payload carries in-phase samples only.
    ///
    /// CS-FMCW captures tagged with `RadarChannels = "I"` count as in-phase
    /// only even when they declare two columns.
    pub fn in_phase_only(&self) -> bool {
        self.column_count == 1 || (self.waveform == "CS-FMCW" && self.radar_channels == "I")
    }
}

/// Locates the sentinel and returns the header text plus the payload offset.
fn split_header(bytes: &[u8]) -> FrtmResult<(&str, usize)> {
    let sentinel = BEGIN_DATA.as_bytes();
    let position = bytes
        .windows(sentinel.len())
        .enumerate()
        .find(|(offset, window)| {
            let line_start = *offset == 0 || bytes[offset - 1] == b'\n';
            let line_end = matches!(bytes.get(offset + sentinel.len()), None | Some(b'\r' | b'\n'));
            *window == sentinel && line_start && line_end
        })
        .map(|(offset, _)| offset)
        .ok_or(FrtmError::MissingSentinel)?;

    let text = std::str::from_utf8(&bytes[..position])
        .map_err(|err| FrtmError::malformed("header", format!("non-ASCII header text: {err}")))?;

    let mut end = position + sentinel.len();
    if bytes.get(end) == Some(&b'\r') {
        end += 1;
    }
    if bytes.get(end) == Some(&b'\n') {
        end += 1;
    }
    Ok((text, end))
}

/// Recognized `key -> tokens` pairs of one header.
struct HeaderFields {
    values: HashMap<&'static str, String>,
}

impl HeaderFields {
    fn collect(text: &str) -> FrtmResult<Self> {
        let mut values = HashMap::new();
        for line in text.lines() {
            let Some((key, tokens)) = split_line(line)? else {
                continue;
            };
            match RECOGNIZED_KEYS.iter().find(|known| **known == key) {
                Some(known) => {
                    if values.insert(*known, tokens).is_some() {
                        return Err(FrtmError::malformed(key, "declared more than once"));
                    }
                }
                None => debug!("skipping unrecognized header key {key}"),
            }
        }
        Ok(Self { values })
    }

    fn text(&self, key: &'static str) -> FrtmResult<&str> {
        self.values
            .get(key)
            .map(String::as_str)
            .ok_or(FrtmError::MissingHeaderKey(key))
    }

    fn number<T: std::str::FromStr>(&self, key: &'static str) -> FrtmResult<T> {
        let raw = self.text(key)?;
        raw.trim()
            .parse()
            .map_err(|_| FrtmError::malformed(key, format!("expected a number, found {raw:?}")))
    }

    fn axis(&self, key: &'static str) -> FrtmResult<AxisSpec> {
        let raw = self.text(key)?;
        let tokens: Vec<&str> = raw.split_whitespace().collect();
        let [start, stop, last] = tokens.as_slice() else {
            return Err(FrtmError::malformed(
                key,
                format!("expected \"start stop count\", found {raw:?}"),
            ));
        };
        let parse = |token: &str| {
            token
                .parse::<f64>()
                .map_err(|_| FrtmError::malformed(key, format!("{token:?} is not a number")))
        };
        let last = parse(last)?;
        if last < 0.0 || last.fract() != 0.0 {
            return Err(FrtmError::malformed(
                key,
                format!("point count {last} is not a non-negative integer"),
            ));
        }
        Ok(AxisSpec::new(parse(start)?, parse(stop)?, last as usize + 1))
    }
}

/// Splits one header line into its key and the tokens that follow it.
///
/// Extra tokens before `=` are kept ahead of the unquoted value.
fn split_line(line: &str) -> FrtmResult<Option<(&str, String)>> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let body = trimmed
        .strip_prefix('@')
        .ok_or_else(|| FrtmError::malformed("header", format!("line {trimmed:?} lacks '@'")))?
        .trim_start();

    let (left, value) = match body.split_once('=') {
        Some((left, value)) => (left.trim(), Some(unquote(value.trim()))),
        None => (body, None),
    };
    let (key, extra) = match left.split_once(char::is_whitespace) {
        Some((key, extra)) => (key, extra.trim()),
        None => (left, ""),
    };
    if key.is_empty() {
        return Err(FrtmError::malformed("header", format!("line {trimmed:?} has no key")));
    }

    let tokens = match value {
        Some(value) if extra.is_empty() => value.to_string(),
        Some(value) => format!("{extra} {value}"),
        None => extra.to_string(),
    };
    Ok(Some((key, tokens)))
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(value)
}

fn parse_schema(raw: &str, column_count: usize) -> FrtmResult<ElementType> {
    let types = raw
        .split(|c: char| c == ',' || c == ';' || c.is_whitespace() || "()[]".contains(c))
        .filter(|token| !token.is_empty())
        .map(|token| {
            ElementType::from_token(token).ok_or_else(|| {
                FrtmError::malformed("BinaryRecordSchema", format!("unknown type {token:?}"))
            })
        })
        .collect::<FrtmResult<Vec<_>>>()?;

    match types.split_first() {
        Some((first, rest)) if types.len() == column_count && rest.iter().all(|t| t == first) => {
            Ok(*first)
        }
        _ => Err(FrtmError::malformed(
            "BinaryRecordSchema",
            format!("{raw:?} does not describe {column_count} columns of one type"),
        )),
    }
}

fn parse_antenna_names(raw: &str) -> FrtmResult<Vec<String>> {
    let names: Vec<String> = raw
        .split(';')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect();
    if names.is_empty() {
        return Err(FrtmError::malformed("AntennaNames", "no antenna names declared"));
    }
    Ok(names)
}

/// Parses `"<count> rx,tx;rx,tx;..."` into zero-based pairs, keeping order.
fn parse_coupling_combos(raw: &str) -> FrtmResult<Vec<CouplingCombo>> {
    let (count, pairs) = raw
        .trim()
        .split_once(char::is_whitespace)
        .ok_or_else(|| {
            FrtmError::malformed("CouplingCombos", format!("expected a count and pairs, found {raw:?}"))
        })?;
    let count: usize = count.parse().map_err(|_| {
        FrtmError::malformed("CouplingCombos", format!("count {count:?} is not an integer"))
    })?;

    let combos = pairs
        .split(';')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(parse_pair)
        .collect::<FrtmResult<Vec<_>>>()?;

    if combos.len() != count {
        return Err(FrtmError::malformed(
            "CouplingCombos",
            format!("declares {count} pairs but lists {}", combos.len()),
        ));
    }
    Ok(combos)
}

fn parse_pair(pair: &str) -> FrtmResult<CouplingCombo> {
    let (rx, tx) = pair
        .split_once(',')
        .ok_or_else(|| FrtmError::malformed("CouplingCombos", format!("pair {pair:?} lacks ','")))?;
    Ok(CouplingCombo {
        rx: antenna_index(rx)?,
        tx: antenna_index(tx)?,
    })
}

/// Converts a one-based `index` or `index:sub` token to a zero-based index.
fn antenna_index(token: &str) -> FrtmResult<usize> {
    let index = token.split(':').next().unwrap_or(token).trim();
    match index.parse::<usize>() {
        Ok(value) if value >= 1 => Ok(value - 1),
        _ => Err(FrtmError::malformed(
            "CouplingCombos",
            format!("antenna index {token:?} is not a one-based integer"),
        )),
    }
}

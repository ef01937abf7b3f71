//! Delta-compressed option list codec
//!
//! Each option starts with a header byte: the high nibble is the delta to the previous
//! option number, the low nibble the value length. A length nibble of 15 is followed by
//! extension bytes that are added to it; an extension byte of 255 means another one follows.
//!
//! The enclosing message header only has four bits for the option count. Counts 0-14 are
//! exact. A count of 15 means "15 or more": the list is then terminated by an end-of-options
//! marker byte (`0xF0`). Deltas never exceed 14 on the wire; larger gaps are bridged with
//! zero-length fencepost options placed on multiples of 14.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::number::{FENCEPOST_DIVISOR, OptionKind, encode_uint};
use crate::{AnalysisError, Result};

/// Header byte of the end-of-options marker.
pub const END_OF_OPTIONS: u8 = 0xF0;

/// Option count value meaning "look for the end-of-options marker".
pub const COUNT_WITH_MARKER: u8 = 15;

const MAX_WIRE_DELTA: u16 = 14;
const EXTENDED_LENGTH: usize = 15;

/// One option of an option list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoapOption {
    /// Option number
    pub number: u16,
    /// Raw value bytes
    pub value: Vec<u8>,
    /// Explicit delta to emit on the wire instead of the computed one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<u8>,
}

impl CoapOption {
    pub fn new(number: u16, value: impl Into<Vec<u8>>) -> Self {
        Self { number, value: value.into(), delta: None }
    }

    pub fn with_kind(kind: OptionKind, value: impl Into<Vec<u8>>) -> Self {
        Self::new(kind.number(), value)
    }

    pub fn uint(kind: OptionKind, value: u32) -> Self {
        Self::new(kind.number(), encode_uint(value))
    }

    pub fn string(kind: OptionKind, value: &str) -> Self {
        Self::new(kind.number(), value.as_bytes())
    }

    /// Zero-length jump option.
    pub fn fencepost(number: u16) -> Self {
        Self::new(number, Vec::new())
    }

    /// Set an explicit wire delta (used to craft non-canonical option chains).
    pub fn with_delta(mut self, delta: u8) -> Self {
        self.delta = Some(delta);
        self
    }

    pub fn kind(&self) -> OptionKind {
        OptionKind::from_number(self.number)
    }
}

/// Ordered option list of one message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OptionList {
    options: Vec<CoapOption>,
}

impl OptionList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style append, returns the extended list.
    pub fn with(mut self, option: CoapOption) -> Self {
        self.options.push(option);
        self
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CoapOption> {
        self.options.iter()
    }

    pub fn as_slice(&self) -> &[CoapOption] {
        &self.options
    }

    /// First option of the given kind.
    pub fn get(&self, kind: OptionKind) -> Option<&CoapOption> {
        self.options.iter().find(|o| o.number == kind.number())
    }

    /// All options of the given kind, in list order.
    pub fn all(&self, kind: OptionKind) -> impl Iterator<Item = &CoapOption> {
        let number = kind.number();
        self.options.iter().filter(move |o| o.number == number)
    }

    pub fn contains(&self, kind: OptionKind) -> bool {
        self.get(kind).is_some()
    }

    /// Copy of the list without fencepost options.
    pub fn without_fenceposts(&self) -> OptionList {
        self.options.iter().filter(|o| !o.kind().is_fencepost()).cloned().collect()
    }

    /// Whether any option carries an explicit wire delta.
    pub fn has_explicit_deltas(&self) -> bool {
        self.options.iter().any(|o| o.delta.is_some())
    }

    /// Rebuild the list exactly as it will be written on the wire.
    ///
    /// Every option of the result carries its delta. Without explicit deltas the options
    /// are sorted by number (stable), fenceposts bridge gaps above 14 and an end-of-options
    /// marker is appended once 15 or more options are emitted. With explicit deltas the
    /// list is kept verbatim, still closed by the marker once it holds 15 or more options;
    /// such a list may not use delta 15.
    pub fn with_deltas(&self) -> Result<OptionList> {
        if self.has_explicit_deltas() {
            return self.verbatim_deltas();
        }

        let mut sorted: Vec<&CoapOption> = self.options.iter().collect();
        sorted.sort_by_key(|o| o.number);

        let mut rebuilt = Vec::with_capacity(sorted.len() + 1);
        let mut current: u16 = 0;
        for option in sorted {
            while option.number - current > MAX_WIRE_DELTA {
                let boundary = (current / FENCEPOST_DIVISOR + 1) * FENCEPOST_DIVISOR;
                trace!(boundary, next_option = option.number, "Inserting fencepost option");
                rebuilt.push(CoapOption::fencepost(boundary).with_delta((boundary - current) as u8));
                current = boundary;
            }
            let delta = (option.number - current) as u8;
            rebuilt.push(CoapOption { delta: Some(delta), ..option.clone() });
            current = option.number;
        }

        if rebuilt.len() >= COUNT_WITH_MARKER as usize {
            debug!(options = rebuilt.len(), "Option count overflows header, appending end marker");
            rebuilt.push(end_marker(current));
        }

        Ok(OptionList { options: rebuilt })
    }

    fn verbatim_deltas(&self) -> Result<OptionList> {
        let needs_marker = self.options.len() >= COUNT_WITH_MARKER as usize;
        let mut rebuilt = Vec::with_capacity(self.options.len() + 1);
        let mut current: u16 = 0;
        for (index, option) in self.options.iter().enumerate() {
            let delta = match option.delta {
                Some(delta) => delta as u16,
                None => option.number.checked_sub(current).ok_or_else(|| {
                    AnalysisError::encode(format!(
                        "option {} (number {}) precedes running number {}",
                        index, option.number, current
                    ))
                })?,
            };
            if delta > 15 {
                return Err(AnalysisError::encode(format!(
                    "option {} (number {}) needs delta {} which does not fit in 4 bits",
                    index, option.number, delta
                )));
            }
            if delta == 15 && needs_marker {
                return Err(AnalysisError::encode(format!(
                    "option {} (number {}) has delta 15, which reads back as the end-of-options marker",
                    index, option.number
                )));
            }
            current = current.saturating_add(delta);
            rebuilt.push(CoapOption { delta: Some(delta as u8), ..option.clone() });
        }
        if needs_marker {
            debug!(options = rebuilt.len(), "Option count overflows header, appending end marker");
            rebuilt.push(end_marker(current));
        }
        Ok(OptionList { options: rebuilt })
    }

    pub fn into_vec(self) -> Vec<CoapOption> {
        self.options
    }
}

impl From<Vec<CoapOption>> for OptionList {
    fn from(options: Vec<CoapOption>) -> Self {
        Self { options }
    }
}

impl FromIterator<CoapOption> for OptionList {
    fn from_iter<I: IntoIterator<Item = CoapOption>>(iter: I) -> Self {
        Self { options: iter.into_iter().collect() }
    }
}

impl<'a> IntoIterator for &'a OptionList {
    type Item = &'a CoapOption;
    type IntoIter = std::slice::Iter<'a, CoapOption>;

    fn into_iter(self) -> Self::IntoIter {
        self.options.iter()
    }
}

fn end_marker(current: u16) -> CoapOption {
    CoapOption { number: current.saturating_add(15), value: Vec::new(), delta: Some(15) }
}

/// Decode an option chain.
///
/// `declared_count` is the option count field of the enclosing header: `None` decodes
/// greedily until the input is exhausted, `Some(0..=14)` reads exactly that many options,
/// `Some(15)` reads until the end-of-options marker. Returns the options and the bytes
/// following them (the payload).
pub fn decode_options(data: &[u8], declared_count: Option<u8>) -> Result<(OptionList, &[u8])> {
    if let Some(count) = declared_count {
        if count > COUNT_WITH_MARKER {
            return Err(AnalysisError::decode(
                "Option count",
                0,
                format!("declared option count {} does not fit in 4 bits", count),
            ));
        }
    }

    let mut options = Vec::new();
    let mut position = 0usize;
    let mut current: u16 = 0;

    loop {
        if let Some(count) = declared_count {
            if count < COUNT_WITH_MARKER && options.len() == count as usize {
                break;
            }
        }

        if position >= data.len() {
            match declared_count {
                None => break,
                Some(COUNT_WITH_MARKER) => {
                    return Err(AnalysisError::decode(
                        "Option list",
                        position,
                        format!(
                            "input ended after {} options without an end-of-options marker",
                            options.len()
                        ),
                    ));
                }
                Some(count) => {
                    return Err(AnalysisError::decode(
                        "Option list",
                        position,
                        format!("expected {} options, input ended after {}", count, options.len()),
                    ));
                }
            }
        }

        let header_offset = position;
        let header = data[position];
        position += 1;

        let delta = (header >> 4) as u16;
        if delta == 0x0F && declared_count == Some(COUNT_WITH_MARKER) {
            trace!(offset = header_offset, "End-of-options marker");
            break;
        }

        let mut length = (header & 0x0F) as usize;
        if length == EXTENDED_LENGTH {
            loop {
                let extension = *data.get(position).ok_or_else(|| {
                    AnalysisError::decode(
                        "Option header",
                        header_offset,
                        "length extension byte missing",
                    )
                })?;
                position += 1;
                length += extension as usize;
                if extension != 0xFF {
                    break;
                }
            }
        }

        let end = position + length;
        if end > data.len() {
            return Err(AnalysisError::decode(
                "Option value",
                header_offset,
                format!(
                    "value of {} bytes overruns input ({} bytes remaining)",
                    length,
                    data.len() - position
                ),
            ));
        }

        current = current.checked_add(delta).ok_or_else(|| {
            AnalysisError::decode("Option header", header_offset, "option number overflows 16 bits")
        })?;

        trace!(offset = header_offset, number = current, length, "Decoded option");
        options.push(CoapOption::new(current, &data[position..end]));
        position = end;
    }

    Ok((OptionList { options }, &data[position..]))
}

/// Encode an option list.
///
/// Returns the option bytes and the value for the 4-bit option count field of the
/// enclosing header (`min(15, emitted options)`).
pub fn encode_options(list: &OptionList) -> Result<(Vec<u8>, u8)> {
    let rebuilt = list.with_deltas()?;
    let mut out = Vec::new();

    for option in rebuilt.iter() {
        let delta = option.delta.unwrap_or(0);
        write_option(&mut out, delta, &option.value);
    }

    let count = rebuilt.len().min(COUNT_WITH_MARKER as usize) as u8;
    Ok((out, count))
}

fn write_option(out: &mut Vec<u8>, delta: u8, value: &[u8]) {
    let length = value.len();
    if length < EXTENDED_LENGTH {
        out.push((delta << 4) | length as u8);
    } else {
        out.push((delta << 4) | EXTENDED_LENGTH as u8);
        let mut remaining = length - EXTENDED_LENGTH;
        while remaining >= 0xFF {
            out.push(0xFF);
            remaining -= 0xFF;
        }
        out.push(remaining as u8);
    }
    out.extend_from_slice(value);
}

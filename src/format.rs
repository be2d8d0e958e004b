//! Format codec: format-code strings, byte widths, pack/unpack.
//!
//! A format string is a sequence of single-letter codes, one per scalar
//! component: `f` (32-bit float), `i` (32-bit signed int), `?` (1-byte
//! bool), `B` (unsigned byte). A one-letter format packs a scalar value;
//! a longer format packs the leading components of a vector value.
//!
//! All multi-byte codes are little-endian. The byte order is pinned here
//! and recorded in the manifest; consumers must not assume host order.

use byteorder::{ByteOrder, LittleEndian};
use smallvec::SmallVec;
use std::fmt;

use crate::util::{Error, Result};
use crate::value::{Components, Value};

/// One scalar component's binary representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatCode {
    /// `f` - 32-bit IEEE float
    Float32,
    /// `i` - 32-bit signed integer
    Int32,
    /// `?` - boolean, one byte, 0 or 1
    Bool,
    /// `B` - unsigned byte
    Uint8,
}

impl FormatCode {
    /// Parse a single format letter.
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'f' => Some(FormatCode::Float32),
            'i' => Some(FormatCode::Int32),
            '?' => Some(FormatCode::Bool),
            'B' => Some(FormatCode::Uint8),
            _ => None,
        }
    }

    /// The format letter for this code.
    pub const fn code(&self) -> char {
        match self {
            FormatCode::Float32 => 'f',
            FormatCode::Int32 => 'i',
            FormatCode::Bool => '?',
            FormatCode::Uint8 => 'B',
        }
    }

    /// Packed size in bytes.
    pub const fn num_bytes(&self) -> usize {
        match self {
            FormatCode::Float32 | FormatCode::Int32 => 4,
            FormatCode::Bool | FormatCode::Uint8 => 1,
        }
    }
}

/// A parsed, validated format string.
///
/// Byte length is fixed at parse time; the codec never infers the format
/// from a runtime value. A mismatch between the declared format and the
/// actual value shape is an error, never silently corrected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeFormat {
    codes: SmallVec<[FormatCode; 4]>,
    text: String,
}

impl AttributeFormat {
    /// Parse a format string such as `"fff"` or `"BBBB"`.
    pub fn parse(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(Error::EmptyFormat);
        }
        let mut codes = SmallVec::new();
        for c in s.chars() {
            let code = FormatCode::from_char(c).ok_or(Error::UnknownFormatCode {
                code: c,
                format: s.to_string(),
            })?;
            codes.push(code);
        }
        Ok(Self {
            codes,
            text: s.to_string(),
        })
    }

    /// The component codes, in order.
    pub fn codes(&self) -> &[FormatCode] {
        &self.codes
    }

    /// The original format string.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// True for one-letter formats, which pack scalar values.
    pub fn is_scalar(&self) -> bool {
        self.codes.len() == 1
    }

    /// Total packed size in bytes.
    pub fn byte_len(&self) -> usize {
        self.codes.iter().map(|c| c.num_bytes()).sum()
    }

    /// Pack `value` into `out`, which must be exactly [`byte_len`] bytes.
    ///
    /// Scalar formats require a scalar value. Vector formats consume the
    /// first N components of a vector value; extra components are
    /// ignored, fewer is a [`Error::ComponentCount`].
    ///
    /// [`byte_len`]: AttributeFormat::byte_len
    pub fn pack(&self, value: &Value, out: &mut [u8]) -> Result<()> {
        if out.len() != self.byte_len() {
            return Err(self.mismatch("output buffer length does not match format size"));
        }
        if self.is_scalar() {
            let scalar = value.as_f64().ok_or_else(|| self.mismatch("expected a scalar, got a vector"))?;
            // Bools pack from any scalar by truthiness, like the presets expect.
            if self.codes[0] == FormatCode::Bool {
                out[0] = u8::from(scalar != 0.0);
                return Ok(());
            }
            self.pack_component(self.codes[0], scalar, out)
        } else {
            let components = value
                .components()
                .ok_or_else(|| self.mismatch("expected a vector, got a scalar"))?;
            if components.len() < self.codes.len() {
                return Err(Error::ComponentCount {
                    format: self.text.clone(),
                    expected: self.codes.len(),
                    actual: components.len(),
                });
            }
            let mut pos = 0;
            for (code, component) in self.codes.iter().zip(components) {
                let width = code.num_bytes();
                self.pack_component(*code, *component, &mut out[pos..pos + width])?;
                pos += width;
            }
            Ok(())
        }
    }

    /// Unpack one record previously written by [`pack`].
    ///
    /// Scalar formats yield the matching scalar variant; vector formats
    /// yield a vector of `f64` components.
    ///
    /// [`pack`]: AttributeFormat::pack
    pub fn unpack(&self, bytes: &[u8]) -> Result<Value> {
        if bytes.len() != self.byte_len() {
            return Err(self.mismatch("input length does not match format size"));
        }
        if self.is_scalar() {
            return Ok(match self.codes[0] {
                FormatCode::Float32 => Value::Float(LittleEndian::read_f32(bytes) as f64),
                FormatCode::Int32 => Value::Int(LittleEndian::read_i32(bytes) as i64),
                FormatCode::Bool => Value::Bool(bytes[0] != 0),
                FormatCode::Uint8 => Value::Int(bytes[0] as i64),
            });
        }
        let mut components = Components::new();
        let mut pos = 0;
        for code in &self.codes {
            let width = code.num_bytes();
            let chunk = &bytes[pos..pos + width];
            components.push(match code {
                FormatCode::Float32 => LittleEndian::read_f32(chunk) as f64,
                FormatCode::Int32 => LittleEndian::read_i32(chunk) as f64,
                FormatCode::Bool => f64::from(chunk[0] != 0),
                FormatCode::Uint8 => chunk[0] as f64,
            });
            pos += width;
        }
        Ok(Value::Vector(components))
    }

    fn pack_component(&self, code: FormatCode, v: f64, out: &mut [u8]) -> Result<()> {
        match code {
            FormatCode::Float32 => LittleEndian::write_f32(out, v as f32),
            FormatCode::Int32 => {
                if v.fract() != 0.0 {
                    return Err(self.mismatch("non-integral value for code 'i'"));
                }
                if v < i32::MIN as f64 || v > i32::MAX as f64 {
                    return Err(self.mismatch("value out of range for code 'i'"));
                }
                LittleEndian::write_i32(out, v as i32);
            }
            FormatCode::Bool => out[0] = u8::from(v != 0.0),
            FormatCode::Uint8 => {
                if v.fract() != 0.0 {
                    return Err(self.mismatch("non-integral value for code 'B'"));
                }
                if !(0.0..=255.0).contains(&v) {
                    return Err(self.mismatch("value out of range for code 'B'"));
                }
                out[0] = v as u8;
            }
        }
        Ok(())
    }

    fn mismatch(&self, reason: &str) -> Error {
        Error::ValueMismatch {
            format: self.text.clone(),
            reason: reason.to_string(),
        }
    }
}

impl fmt::Display for AttributeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

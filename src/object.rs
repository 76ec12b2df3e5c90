//! PDF object model.
//!
//! A single tagged sum type represents every PDF value. Containers own their
//! immediate children; every cross-object edge in the logical graph goes
//! through a [`Reference`](Object::Reference) resolved by the object
//! registry, so ownership never cycles.
//!
//! Dictionaries are insertion-ordered: a loaded document serializes its
//! entries back in the order they were read.

use crate::error::{Error, Result};
pub use crate::lexer::StringFormat;
use bytes::Bytes;
use indexmap::IndexMap;

/// Insertion-ordered dictionary mapping names to objects.
///
/// Duplicate keys are impossible by construction; inserting an existing key
/// replaces its value in place.
pub type Dict = IndexMap<String, Object>;

/// Reference to an indirect object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectRef {
    /// Object number (>= 1 for real objects)
    pub id: u32,
    /// Generation number
    pub gen: u16,
}

impl ObjectRef {
    /// Create a new object reference.
    pub fn new(id: u32, gen: u16) -> Self {
        Self { id, gen }
    }
}

impl std::fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} R", self.id, self.gen)
    }
}

/// PDF object representation.
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    /// Null object
    Null,
    /// Boolean value
    Boolean(bool),
    /// Numeric value. Integers and reals share the variant; `integer`
    /// records that the source had integer form. Integrality is a fact
    /// about the value, not a separate type.
    Number {
        /// Numeric value
        value: f64,
        /// True when the source form was an integral number
        integer: bool,
    },
    /// String: opaque bytes plus the serialization form they came from
    String {
        /// Decoded payload bytes
        bytes: Vec<u8>,
        /// Literal or hex form
        format: StringFormat,
    },
    /// Name (written with a leading /)
    Name(String),
    /// Array of objects
    Array(Vec<Object>),
    /// Dictionary (insertion-ordered key-value pairs)
    Dictionary(Dict),
    /// Stream: dictionary plus raw (still encoded) payload
    Stream {
        /// Stream dictionary
        dict: Dict,
        /// Raw payload bytes; `/Length` equals this length on emission
        data: Bytes,
    },
    /// Indirect object reference
    Reference(ObjectRef),
}

impl Object {
    /// Create an integer number.
    pub fn integer(value: i64) -> Self {
        Object::Number {
            value: value as f64,
            integer: true,
        }
    }

    /// Create a real number.
    pub fn real(value: f64) -> Self {
        Object::Number {
            value,
            integer: false,
        }
    }

    /// Create a name.
    pub fn name(value: impl Into<String>) -> Self {
        Object::Name(value.into())
    }

    /// Create a literal-form string from raw bytes (the low-level escape
    /// hatch; no text encoding is applied).
    pub fn string_literal(bytes: impl Into<Vec<u8>>) -> Self {
        Object::String {
            bytes: bytes.into(),
            format: StringFormat::Literal,
        }
    }

    /// Create a hex-form string from raw bytes.
    pub fn string_hex(bytes: impl Into<Vec<u8>>) -> Self {
        Object::String {
            bytes: bytes.into(),
            format: StringFormat::Hex,
        }
    }

    /// Create a text string, choosing PDFDocEncoding when every character
    /// is representable and UTF-16BE with BOM otherwise.
    pub fn text_string(text: &str) -> Self {
        Object::String {
            bytes: encode_text_string(text),
            format: StringFormat::Literal,
        }
    }

    /// Create a reference.
    pub fn reference(id: u32, gen: u16) -> Self {
        Object::Reference(ObjectRef::new(id, gen))
    }

    /// Get the type name of this object (without data).
    pub fn type_name(&self) -> &'static str {
        match self {
            Object::Null => "Null",
            Object::Boolean(_) => "Boolean",
            Object::Number { integer: true, .. } => "Integer",
            Object::Number { integer: false, .. } => "Real",
            Object::String { .. } => "String",
            Object::Name(_) => "Name",
            Object::Array(_) => "Array",
            Object::Dictionary(_) => "Dictionary",
            Object::Stream { .. } => "Stream",
            Object::Reference(_) => "Reference",
        }
    }

    /// Check if object is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Object::Null)
    }

    /// Try to cast to boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Object::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to cast to an integer. Numbers with real source form are absent.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Object::Number {
                value,
                integer: true,
            } => Some(*value as i64),
            _ => None,
        }
    }

    /// Try to cast to a number of either form.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Object::Number { value, .. } => Some(*value),
            _ => None,
        }
    }

    /// Try to cast to name.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Object::Name(s) => Some(s),
            _ => None,
        }
    }

    /// Try to cast to string bytes.
    pub fn as_string_bytes(&self) -> Option<&[u8]> {
        match self {
            Object::String { bytes, .. } => Some(bytes),
            _ => None,
        }
    }

    /// Decode a string object as text (UTF-16BE via BOM, else
    /// PDFDocEncoding).
    pub fn as_text(&self) -> Option<String> {
        self.as_string_bytes().map(decode_text_string)
    }

    /// Try to cast to array.
    pub fn as_array(&self) -> Option<&[Object]> {
        match self {
            Object::Array(arr) => Some(arr),
            _ => None,
        }
    }

    /// Try to cast to a mutable array.
    pub fn as_array_mut(&mut self) -> Option<&mut Vec<Object>> {
        match self {
            Object::Array(arr) => Some(arr),
            _ => None,
        }
    }

    /// Try to cast to dictionary. Works for both dictionaries and streams.
    pub fn as_dict(&self) -> Option<&Dict> {
        match self {
            Object::Dictionary(d) => Some(d),
            Object::Stream { dict, .. } => Some(dict),
            _ => None,
        }
    }

    /// Try to cast to a mutable dictionary (dictionary or stream dict).
    pub fn as_dict_mut(&mut self) -> Option<&mut Dict> {
        match self {
            Object::Dictionary(d) => Some(d),
            Object::Stream { dict, .. } => Some(dict),
            _ => None,
        }
    }

    /// Try to cast to a stream's dictionary and raw payload.
    pub fn as_stream(&self) -> Option<(&Dict, &Bytes)> {
        match self {
            Object::Stream { dict, data } => Some((dict, data)),
            _ => None,
        }
    }

    /// Try to cast to reference.
    pub fn as_reference(&self) -> Option<ObjectRef> {
        match self {
            Object::Reference(r) => Some(*r),
            _ => None,
        }
    }

    /// Decode stream payload through the filter pipeline described by
    /// `/Filter` and `/DecodeParms`.
    pub fn decoded_stream_data(&self) -> Result<Vec<u8>> {
        match self {
            Object::Stream { dict, data } => {
                let chain = filter_chain(dict);
                crate::decoders::decode_chain(data, &chain)
            },
            _ => Err(Error::Decode(format!(
                "expected Stream, found {}",
                self.type_name()
            ))),
        }
    }
}

/// One stage of a stream's filter pipeline: the filter name plus its
/// positionally paired `/DecodeParms` entry.
#[derive(Debug, Clone, Default)]
pub struct FilterSpec {
    /// Filter name, e.g. "FlateDecode"
    pub name: String,
    /// Decode parameters for this stage, if any
    pub parms: Option<Dict>,
}

/// Extract the filter chain from a stream dictionary.
///
/// `/Filter` may be a single name or an array of names; `/DecodeParms` may
/// be a single dictionary, or an array of dictionaries and nulls paired
/// positionally with the filter array.
pub fn filter_chain(dict: &Dict) -> Vec<FilterSpec> {
    let names: Vec<String> = match dict.get("Filter") {
        Some(Object::Name(name)) => vec![name.clone()],
        Some(Object::Array(arr)) => arr
            .iter()
            .filter_map(|o| o.as_name().map(str::to_string))
            .collect(),
        _ => return Vec::new(),
    };

    let parms: Vec<Option<Dict>> = match dict.get("DecodeParms") {
        Some(Object::Dictionary(d)) => vec![Some(d.clone())],
        Some(Object::Array(arr)) => arr
            .iter()
            .map(|o| match o {
                Object::Dictionary(d) => Some(d.clone()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };

    names
        .into_iter()
        .enumerate()
        .map(|(i, name)| FilterSpec {
            name,
            parms: parms.get(i).cloned().flatten(),
        })
        .collect()
}

/// Decode a text string: UTF-16BE when it carries the `FE FF` byte order
/// mark, PDFDocEncoding otherwise.
pub fn decode_text_string(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    bytes.iter().map(|&b| pdf_doc_decode(b)).collect()
}

/// Encode a text string, preferring PDFDocEncoding and falling back to
/// UTF-16BE with BOM when any character is not representable.
pub fn encode_text_string(text: &str) -> Vec<u8> {
    let mut doc_encoded = Vec::with_capacity(text.len());
    for c in text.chars() {
        match pdf_doc_encode(c) {
            Some(b) => doc_encoded.push(b),
            None => {
                let mut out = vec![0xFE, 0xFF];
                for unit in text.encode_utf16() {
                    out.extend_from_slice(&unit.to_be_bytes());
                }
                return out;
            },
        }
    }
    doc_encoded
}

/// PDFDocEncoding byte to character (PDF 32000-1:2008, Annex D.3).
///
/// The encoding matches Latin-1 except for 0x18..0x1F (accents) and
/// 0x80..0xA0 (punctuation, ligatures, Euro).
fn pdf_doc_decode(b: u8) -> char {
    match b {
        0x18 => '\u{02D8}',
        0x19 => '\u{02C7}',
        0x1A => '\u{02C6}',
        0x1B => '\u{02D9}',
        0x1C => '\u{02DD}',
        0x1D => '\u{02DB}',
        0x1E => '\u{02DA}',
        0x1F => '\u{02DC}',
        0x80 => '\u{2022}',
        0x81 => '\u{2020}',
        0x82 => '\u{2021}',
        0x83 => '\u{2026}',
        0x84 => '\u{2014}',
        0x85 => '\u{2013}',
        0x86 => '\u{0192}',
        0x87 => '\u{2044}',
        0x88 => '\u{2039}',
        0x89 => '\u{203A}',
        0x8A => '\u{2212}',
        0x8B => '\u{2030}',
        0x8C => '\u{201E}',
        0x8D => '\u{201C}',
        0x8E => '\u{201D}',
        0x8F => '\u{2018}',
        0x90 => '\u{2019}',
        0x91 => '\u{201A}',
        0x92 => '\u{2122}',
        0x93 => '\u{FB01}',
        0x94 => '\u{FB02}',
        0x95 => '\u{0141}',
        0x96 => '\u{0152}',
        0x97 => '\u{0160}',
        0x98 => '\u{0178}',
        0x99 => '\u{017D}',
        0x9A => '\u{0131}',
        0x9B => '\u{0142}',
        0x9C => '\u{0153}',
        0x9D => '\u{0161}',
        0x9E => '\u{017E}',
        0xA0 => '\u{20AC}',
        other => other as char,
    }
}

/// Character to PDFDocEncoding byte, `None` when not representable.
fn pdf_doc_encode(c: char) -> Option<u8> {
    match c {
        '\u{02D8}' => Some(0x18),
        '\u{02C7}' => Some(0x19),
        '\u{02C6}' => Some(0x1A),
        '\u{02D9}' => Some(0x1B),
        '\u{02DD}' => Some(0x1C),
        '\u{02DB}' => Some(0x1D),
        '\u{02DA}' => Some(0x1E),
        '\u{02DC}' => Some(0x1F),
        '\u{2022}' => Some(0x80),
        '\u{2020}' => Some(0x81),
        '\u{2021}' => Some(0x82),
        '\u{2026}' => Some(0x83),
        '\u{2014}' => Some(0x84),
        '\u{2013}' => Some(0x85),
        '\u{0192}' => Some(0x86),
        '\u{2044}' => Some(0x87),
        '\u{2039}' => Some(0x88),
        '\u{203A}' => Some(0x89),
        '\u{2212}' => Some(0x8A),
        '\u{2030}' => Some(0x8B),
        '\u{201E}' => Some(0x8C),
        '\u{201C}' => Some(0x8D),
        '\u{201D}' => Some(0x8E),
        '\u{2018}' => Some(0x8F),
        '\u{2019}' => Some(0x90),
        '\u{201A}' => Some(0x91),
        '\u{2122}' => Some(0x92),
        '\u{FB01}' => Some(0x93),
        '\u{FB02}' => Some(0x94),
        '\u{0141}' => Some(0x95),
        '\u{0152}' => Some(0x96),
        '\u{0160}' => Some(0x97),
        '\u{0178}' => Some(0x98),
        '\u{017D}' => Some(0x99),
        '\u{0131}' => Some(0x9A),
        '\u{0142}' => Some(0x9B),
        '\u{0153}' => Some(0x9C),
        '\u{0161}' => Some(0x9D),
        '\u{017E}' => Some(0x9E),
        // Control range 0x00..0x17 and printable Latin-1 map through;
        // the bytes whose PDFDoc meaning differs from Latin-1 must not.
        c if (c as u32) <= 0x17 => Some(c as u8),
        c if ('\u{20}'..='\u{7E}').contains(&c) => Some(c as u8),
        c if ('\u{A1}'..='\u{FF}').contains(&c) => Some(c as u8),
        _ => None,
    }
}

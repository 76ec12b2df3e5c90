//! Cross-reference parsing.
//!
//! The cross-reference index maps object numbers to byte offsets (or to
//! object-stream slots), enabling random access into the file. Two formats
//! exist and are handled transparently:
//!
//! - traditional tables (`xref` keyword, 20-byte entries, `trailer` dict)
//! - cross-reference streams (PDF 1.5+, a `/Type /XRef` stream of
//!   fixed-width big-endian records)
//!
//! Revisions chain through `/Prev`. The chain is walked newest-first with
//! first-definition-wins precedence, so the most recent definition of every
//! object number survives. The first trailer encountered is the logical
//! trailer of the document.

use crate::error::{Error, Result};
use crate::indirect::{self, ParseOutcome};
use crate::object::{Dict, Object};
use crate::parser::ObjectParser;
use std::collections::{HashMap, HashSet};

/// How far from the end of the file `startxref` may sit.
const STARTXREF_WINDOW: usize = 1024;

/// Cap on entries in one table subsection, against hostile counts.
const MAX_SUBSECTION_ENTRIES: u64 = 1_000_000;

/// One cross-reference entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XRefEntry {
    /// Slot is free; `generation` is what a reuse would bump to.
    Free {
        /// Object number of the next free slot
        next_free: u64,
        /// Generation a reuse of this slot would carry
        generation: u16,
    },
    /// Object body lives at `offset` bytes from the start of the file.
    InUse {
        /// Absolute byte offset of the object header
        offset: u64,
        /// Generation number
        generation: u16,
    },
    /// Object body is an entry of a compressed object stream.
    Compressed {
        /// Object number of the containing `/Type /ObjStm` stream
        stream_id: u32,
        /// Index of this object within the stream
        index: u16,
    },
}

impl XRefEntry {
    /// Generation number of this entry (compressed entries are generation 0).
    pub fn generation(&self) -> u16 {
        match self {
            XRefEntry::Free { generation, .. } => *generation,
            XRefEntry::InUse { generation, .. } => *generation,
            XRefEntry::Compressed { .. } => 0,
        }
    }

    /// True for free entries.
    pub fn is_free(&self) -> bool {
        matches!(self, XRefEntry::Free { .. })
    }
}

/// Cross-reference table: object number to entry, plus the trailer.
#[derive(Debug, Clone, Default)]
pub struct XRefTable {
    entries: HashMap<u32, XRefEntry>,
    trailer: Option<Dict>,
}

impl XRefTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry, replacing any previous one for the number.
    pub fn add_entry(&mut self, id: u32, entry: XRefEntry) {
        self.entries.insert(id, entry);
    }

    /// Look up an entry.
    pub fn get(&self, id: u32) -> Option<&XRefEntry> {
        self.entries.get(&id)
    }

    /// Whether an object number is known.
    pub fn contains(&self, id: u32) -> bool {
        self.entries.contains_key(&id)
    }

    /// All known object numbers.
    pub fn object_numbers(&self) -> impl Iterator<Item = u32> + '_ {
        self.entries.keys().copied()
    }

    /// Highest object number in the table, 0 when empty.
    pub fn max_object_number(&self) -> u32 {
        self.entries.keys().copied().max().unwrap_or(0)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no entries exist.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Trailer dictionary, if one was parsed.
    pub fn trailer(&self) -> Option<&Dict> {
        self.trailer.as_ref()
    }

    /// Set the trailer dictionary.
    pub fn set_trailer(&mut self, trailer: Dict) {
        self.trailer = Some(trailer);
    }

    /// Merge an older revision into this one. Existing entries win (the
    /// newest definition of each object number takes precedence), and an
    /// existing trailer is kept.
    pub fn merge_older(&mut self, older: XRefTable) {
        for (id, entry) in older.entries {
            self.entries.entry(id).or_insert(entry);
        }
        if self.trailer.is_none() {
            self.trailer = older.trailer;
        }
    }
}

/// Result of walking a cross-reference chain.
#[derive(Debug)]
pub struct ChainParse {
    /// Merged table with the logical trailer
    pub table: XRefTable,
    /// Warnings recorded along the chain
    pub warnings: Vec<String>,
    /// True when the newest revision used a cross-reference stream
    pub newest_is_stream: bool,
}

/// Locate the `startxref` offset by scanning backward over at most the
/// final 1024 bytes of the file.
pub fn find_startxref(bytes: &[u8]) -> Result<u64> {
    let window_start = bytes.len().saturating_sub(STARTXREF_WINDOW);
    let window = &bytes[window_start..];

    let keyword = b"startxref";
    let at = window
        .windows(keyword.len())
        .rposition(|w| w == keyword)
        .ok_or_else(|| Error::XRefParse("startxref keyword not found".to_string()))?;

    let mut parser = ObjectParser::at(bytes, window_start + at + keyword.len());
    match parser.parse_object() {
        Ok(obj) => obj
            .as_i64()
            .filter(|&v| v >= 0)
            .map(|v| v as u64)
            .ok_or_else(|| Error::XRefParse("startxref offset is not an integer".to_string())),
        Err(_) => Err(Error::XRefParse("startxref offset is not an integer".to_string())),
    }
}

/// Parse the cross-reference chain beginning at `offset`, following `/Prev`
/// links with first-definition-wins precedence and cycle detection.
pub fn parse_chain(bytes: &[u8], offset: u64) -> Result<ChainParse> {
    let mut warnings = Vec::new();
    let mut visited: HashSet<u64> = HashSet::new();
    let mut merged: Option<XRefTable> = None;
    let mut newest_is_stream = false;
    let mut next = Some(offset);

    while let Some(offset) = next {
        if !visited.insert(offset) {
            warnings.push(format!(
                "Circular /Prev chain revisits xref at offset {}, stopping",
                offset
            ));
            break;
        }

        let (section, is_stream) = parse_section(bytes, offset, &mut warnings)?;
        if merged.is_none() {
            newest_is_stream = is_stream;
        }

        next = section
            .trailer()
            .and_then(|t| t.get("Prev"))
            .and_then(Object::as_i64)
            .filter(|&v| v >= 0)
            .map(|v| v as u64);

        match merged.as_mut() {
            None => merged = Some(section),
            Some(table) => table.merge_older(section),
        }
    }

    let table = merged.ok_or_else(|| Error::XRefParse("empty cross-reference chain".to_string()))?;
    Ok(ChainParse {
        table,
        warnings,
        newest_is_stream,
    })
}

/// Parse one revision's cross-reference section, detecting its format.
fn parse_section(
    bytes: &[u8],
    offset: u64,
    warnings: &mut Vec<String>,
) -> Result<(XRefTable, bool)> {
    if offset as usize >= bytes.len() {
        return Err(Error::XRefParse(format!(
            "xref offset {} is past end of file ({} bytes)",
            offset,
            bytes.len()
        )));
    }

    let mut probe = &bytes[offset as usize..];
    while let Some((&b, rest)) = probe.split_first() {
        if crate::lexer::is_whitespace(b) {
            probe = rest;
        } else {
            break;
        }
    }

    if probe.starts_with(b"xref") {
        log::debug!("Traditional xref table at offset {}", offset);
        parse_table(bytes, offset as usize, warnings).map(|t| (t, false))
    } else if probe.first().is_some_and(u8::is_ascii_digit) {
        log::debug!("Cross-reference stream at offset {}", offset);
        parse_stream(bytes, offset as usize, warnings).map(|t| (t, true))
    } else {
        Err(Error::XRefParse(format!(
            "no xref table or stream at offset {}",
            offset
        )))
    }
}

/// Parse a traditional cross-reference table.
///
/// ```text
/// xref
/// 0 3
/// 0000000000 65535 f
/// 0000000015 00000 n
/// 0000000072 00000 n
/// trailer
/// << /Size 3 /Root 1 0 R >>
/// ```
fn parse_table(bytes: &[u8], offset: usize, warnings: &mut Vec<String>) -> Result<XRefTable> {
    let mut parser = ObjectParser::at(bytes, offset).with_recovery(true);
    let mut table = XRefTable::new();

    if !parser.tokens().next_token().is_keyword("xref") {
        return Err(Error::XRefParse(format!("missing xref keyword at offset {}", offset)));
    }

    loop {
        if parser.tokens().peek().is_keyword("trailer") {
            parser.tokens().next_token();
            let trailer = parse_trailer_dict(&mut parser)?;
            table.set_trailer(trailer);
            break;
        }

        // Subsection header: first count
        let first = match parser.tokens().next_token().as_integer() {
            Some(v) if v >= 0 => v as u64,
            _ => {
                warnings.push(format!(
                    "Malformed xref subsection header near offset {}",
                    offset
                ));
                break;
            },
        };
        let count = match parser.tokens().next_token().as_integer() {
            Some(v) if v >= 0 => v as u64,
            _ => {
                warnings.push(format!(
                    "Malformed xref subsection count near offset {}",
                    offset
                ));
                break;
            },
        };
        if count > MAX_SUBSECTION_ENTRIES {
            return Err(Error::XRefParse(format!(
                "xref subsection count {} exceeds limit",
                count
            )));
        }

        for i in 0..count {
            let id = (first + i) as u32;
            let field1 = parser.tokens().next_token().as_integer();
            let field2 = parser.tokens().next_token().as_integer();
            let kind = parser.tokens().next_token();

            let (Some(field1), Some(field2)) = (field1, field2) else {
                warnings.push(format!("Malformed xref entry for object {}", id));
                table.add_entry(id, XRefEntry::Free {
                    next_free: 0,
                    generation: 65535,
                });
                continue;
            };
            let generation = field2.clamp(0, u16::MAX as i64) as u16;

            let entry = if kind.is_keyword("n") {
                XRefEntry::InUse {
                    offset: field1.max(0) as u64,
                    generation,
                }
            } else if kind.is_keyword("f") {
                XRefEntry::Free {
                    next_free: field1.max(0) as u64,
                    generation,
                }
            } else {
                warnings.push(format!(
                    "Invalid xref entry type for object {}, treating as free",
                    id
                ));
                XRefEntry::Free {
                    next_free: 0,
                    generation: 65535,
                }
            };
            table.add_entry(id, entry);
        }
    }

    Ok(table)
}

/// Parse a cross-reference stream (`/Type /XRef`).
///
/// The stream dictionary supplies `/Size`, `/W [w1 w2 w3]` field widths,
/// and optionally `/Index [first count ...]` (default `[0 Size]`). The
/// decoded payload is a sequence of fixed-width big-endian records:
/// field 1 is the entry type (0 free, 1 in use, 2 compressed; defaults to
/// 1 when w1 is 0), fields 2 and 3 are interpreted per type.
fn parse_stream(bytes: &[u8], offset: usize, warnings: &mut Vec<String>) -> Result<XRefTable> {
    let parsed = indirect::parse_indirect_object(bytes, offset, None, true)
        .map_err(|e| Error::XRefParse(format!("bad xref stream object: {}", e)))?;
    warnings.extend(parsed.warnings);

    let object = match parsed.outcome {
        ParseOutcome::Object(obj) => obj,
        ParseOutcome::PendingStream {
            dict,
            payload_start,
            ..
        } => {
            // An xref stream must carry a direct /Length to be
            // bootstrappable; fall back to scanning.
            warnings.push(format!(
                "Cross-reference stream at offset {} lacks a direct /Length",
                offset
            ));
            let (obj, more) = indirect::finish_stream(bytes, dict, payload_start, None, true)
                .map_err(|e| Error::XRefParse(format!("bad xref stream payload: {}", e)))?;
            warnings.extend(more);
            obj
        },
    };

    let (dict, _) = object
        .as_stream()
        .ok_or_else(|| Error::XRefParse("xref object is not a stream".to_string()))?;

    if let Some(type_name) = dict.get("Type").and_then(Object::as_name) {
        if type_name != "XRef" {
            return Err(Error::XRefParse(format!(
                "expected /Type /XRef, found /{}",
                type_name
            )));
        }
    }

    let widths = dict
        .get("W")
        .and_then(Object::as_array)
        .ok_or_else(|| Error::XRefParse("missing /W in xref stream".to_string()))?;
    if widths.len() != 3 {
        return Err(Error::XRefParse(format!("/W has {} fields, expected 3", widths.len())));
    }
    let w: Vec<usize> = widths
        .iter()
        .map(|o| o.as_i64().filter(|&v| (0..=8).contains(&v)).map(|v| v as usize))
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| Error::XRefParse("invalid /W field width".to_string()))?;
    let record_len = w.iter().sum::<usize>();
    if record_len == 0 {
        return Err(Error::XRefParse("zero-width xref stream records".to_string()));
    }

    let size = dict
        .get("Size")
        .and_then(Object::as_i64)
        .filter(|&v| v >= 0)
        .ok_or_else(|| Error::XRefParse("missing /Size in xref stream".to_string()))? as u32;

    let ranges: Vec<(u32, u32)> = match dict.get("Index").and_then(Object::as_array) {
        Some(index) => {
            if index.len() % 2 != 0 {
                return Err(Error::XRefParse("odd /Index length".to_string()));
            }
            index
                .chunks(2)
                .map(|pair| {
                    let first = pair[0].as_i64().filter(|&v| v >= 0)?;
                    let count = pair[1].as_i64().filter(|&v| v >= 0)?;
                    Some((first as u32, count as u32))
                })
                .collect::<Option<Vec<_>>>()
                .ok_or_else(|| Error::XRefParse("invalid /Index entry".to_string()))?
        },
        None => vec![(0, size)],
    };

    let decoded = object
        .decoded_stream_data()
        .map_err(|e| Error::XRefParse(format!("failed to decode xref stream: {}", e)))?;

    let mut table = XRefTable::new();
    let mut pos = 0usize;

    for (first, count) in ranges {
        for i in 0..count {
            let id = first + i;
            if pos + record_len > decoded.len() {
                warnings.push(format!(
                    "Cross-reference stream truncated at object {}",
                    id
                ));
                table.set_trailer(dict.clone());
                return Ok(table);
            }
            let record = &decoded[pos..pos + record_len];
            pos += record_len;

            // w1 = 0 means every record is type 1
            let kind = if w[0] == 0 { 1 } else { read_be(&record[..w[0]]) };
            let field2 = read_be(&record[w[0]..w[0] + w[1]]);
            let field3 = read_be(&record[w[0] + w[1]..]);

            let entry = match kind {
                0 => XRefEntry::Free {
                    next_free: field2,
                    generation: field3 as u16,
                },
                1 => XRefEntry::InUse {
                    offset: field2,
                    generation: field3 as u16,
                },
                2 => XRefEntry::Compressed {
                    stream_id: field2 as u32,
                    index: field3 as u16,
                },
                other => {
                    return Err(Error::XRefParse(format!(
                        "invalid xref stream entry type {}",
                        other
                    )));
                },
            };
            table.add_entry(id, entry);
        }
    }

    // The stream dictionary doubles as the trailer
    table.set_trailer(dict.clone());
    Ok(table)
}

/// Fold big-endian bytes into an integer. Empty input is 0.
fn read_be(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64)
}

/// Parse the dictionary that must follow the `trailer` keyword.
fn parse_trailer_dict(parser: &mut ObjectParser<'_>) -> Result<Dict> {
    match parser.parse_object()? {
        Object::Dictionary(dict) => Ok(dict),
        other => Err(Error::XRefParse(format!(
            "expected trailer dictionary, found {}",
            other.type_name()
        ))),
    }
}

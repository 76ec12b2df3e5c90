//! Object streams (PDF 1.5+).
//!
//! An object stream (`/Type /ObjStm`) packs many objects into one
//! compressed stream. The decoded payload has two parts: the first
//! `/First` bytes hold `/N` whitespace-separated `objNum offset` pairs
//! (offsets relative to the object section), and the remainder holds the
//! object values concatenated without `obj`/`endobj` wrappers.
//!
//! By the time the payload is decoded the containing stream has already
//! been decrypted, so the objects inside are stored in clear and need no
//! per-object decryption.

use crate::error::{Error, Result};
use crate::object::Object;
use crate::parser::ObjectParser;

/// A decoded object stream with its index of contained objects.
#[derive(Debug, Clone)]
pub struct ObjectStream {
    /// `(object_number, offset into the object section)` per entry
    index: Vec<(u32, usize)>,
    /// Decoded payload
    data: Vec<u8>,
    /// Byte offset of the object section within `data`
    first: usize,
}

impl ObjectStream {
    /// Decode and index an object stream.
    pub fn parse(stream: &Object) -> Result<Self> {
        let dict = match stream.as_stream() {
            Some((dict, _)) => dict,
            None => {
                return Err(Error::ObjectParse {
                    offset: 0,
                    reason: "object stream is not a stream".to_string(),
                });
            },
        };

        if let Some(type_name) = dict.get("Type").and_then(Object::as_name) {
            if type_name != "ObjStm" {
                return Err(Error::ObjectParse {
                    offset: 0,
                    reason: format!("expected /Type /ObjStm, found /{}", type_name),
                });
            }
        }

        let n = dict
            .get("N")
            .and_then(Object::as_i64)
            .filter(|v| (0..=1_000_000).contains(v))
            .ok_or_else(|| Error::ObjectParse {
                offset: 0,
                reason: "object stream missing or invalid /N".to_string(),
            })? as usize;

        let first = dict
            .get("First")
            .and_then(Object::as_i64)
            .filter(|v| (0..=10_000_000).contains(v))
            .ok_or_else(|| Error::ObjectParse {
                offset: 0,
                reason: "object stream missing or invalid /First".to_string(),
            })? as usize;

        let data = stream.decoded_stream_data()?;
        if data.len() < first {
            return Err(Error::ObjectParse {
                offset: 0,
                reason: format!(
                    "object stream data is {} bytes, /First says {}",
                    data.len(),
                    first
                ),
            });
        }

        let index = parse_pairs(&data[..first], n)?;
        Ok(Self { index, data, first })
    }

    /// Number of objects in the stream.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// True when the stream holds no objects.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Object number stored at `index`.
    pub fn object_number(&self, index: usize) -> Option<u32> {
        self.index.get(index).map(|&(id, _)| id)
    }

    /// Parse and return the object at `index`.
    pub fn get(&self, index: usize) -> Result<Object> {
        let &(id, offset) = self.index.get(index).ok_or_else(|| Error::ObjectParse {
            offset: 0,
            reason: format!("object stream index {} out of range ({})", index, self.len()),
        })?;

        let section = &self.data[self.first..];
        if offset >= section.len() {
            return Err(Error::ObjectParse {
                offset,
                reason: format!("object {} offset {} is past the object section", id, offset),
            });
        }

        ObjectParser::at(section, offset)
            .with_recovery(true)
            .parse_object()
    }

    /// Find the index of a given object number.
    pub fn index_of(&self, id: u32) -> Option<usize> {
        self.index.iter().position(|&(n, _)| n == id)
    }
}

/// Parse `count` whitespace-separated `objNum offset` pairs.
fn parse_pairs(data: &[u8], count: usize) -> Result<Vec<(u32, usize)>> {
    let mut parser = ObjectParser::at(data, 0);
    let mut pairs = Vec::with_capacity(count);

    for i in 0..count {
        let id = parser
            .tokens()
            .next_token()
            .as_integer()
            .filter(|&v| v >= 0)
            .ok_or_else(|| Error::ObjectParse {
                offset: 0,
                reason: format!("bad object number in pair {}", i),
            })? as u32;
        let offset = parser
            .tokens()
            .next_token()
            .as_integer()
            .filter(|&v| v >= 0)
            .ok_or_else(|| Error::ObjectParse {
                offset: 0,
                reason: format!("bad offset in pair {}", i),
            })? as usize;
        pairs.push((id, offset));
    }

    Ok(pairs)
}

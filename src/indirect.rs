//! Indirect object parsing (`N G obj ... endobj`).
//!
//! Parsing is two-phase because a stream's `/Length` may itself be an
//! indirect reference: phase one reads the header and the object value and,
//! for a stream whose length is not directly available, stops right after
//! the `stream` keyword. The registry then resolves the length (parsing the
//! remote number object with an independent cursor) and phase two reads the
//! payload and the trailing keywords.
//!
//! The payload is read straight from the raw buffer; it never passes
//! through the lexer.

use crate::error::{Error, Result};
use crate::lexer::{Token, TokenReader};
use crate::object::{Dict, Object, ObjectRef};
use crate::parser::ObjectParser;
use bytes::Bytes;

/// Result of phase one.
#[derive(Debug)]
pub struct IndirectParse {
    /// Object number from the header
    pub id: u32,
    /// Generation number from the header
    pub gen: u16,
    /// Parsed value or a stream awaiting its payload
    pub outcome: ParseOutcome,
    /// Warnings recorded while parsing
    pub warnings: Vec<String>,
}

/// Value or pending stream from phase one.
#[derive(Debug)]
pub enum ParseOutcome {
    /// Fully parsed object
    Object(Object),
    /// Stream dictionary parsed; payload starts right after the `stream`
    /// keyword and its length must be resolved before phase two
    PendingStream {
        /// The stream dictionary
        dict: Dict,
        /// Absolute offset just past the `stream` keyword
        payload_start: usize,
        /// The indirect `/Length` to resolve, if the dictionary has one
        length: Option<ObjectRef>,
    },
}

/// Parse the indirect object at `offset`.
///
/// When `expected` is given, a mismatched object or generation number is
/// recorded as a warning but the value is still returned.
pub fn parse_indirect_object(
    bytes: &[u8],
    offset: usize,
    expected: Option<ObjectRef>,
    recover: bool,
) -> Result<IndirectParse> {
    let mut parser = ObjectParser::at(bytes, offset).with_recovery(recover);

    let (id, gen) = read_header(parser.tokens(), offset)?;
    let mut warnings = Vec::new();
    if let Some(expected) = expected {
        if expected.id != id {
            warnings.push(format!(
                "Object header {} {} does not match expected {}",
                id, gen, expected
            ));
        } else if expected.gen != gen {
            warnings.push(format!(
                "Generation {} does not match expected {} for object {}",
                gen, expected.gen, id
            ));
        }
    }

    let value = parser.parse_object()?;

    // A dictionary directly followed by the `stream` keyword is a stream;
    // lookahead stops at the keyword so payload bytes are never lexed.
    if matches!(value, Object::Dictionary(_)) && parser.tokens().peek().is_keyword("stream") {
        parser.tokens().next_token();
        let payload_start = parser.tokens().cursor();
        let dict = match value {
            Object::Dictionary(d) => d,
            _ => unreachable!("matched a dictionary"),
        };
        warnings.extend(parser.take_warnings());

        // Classify /Length without holding a borrow into the dictionary
        enum LengthKind {
            Direct(Option<i64>),
            Indirect(ObjectRef),
            Missing,
        }
        let length_kind = match dict.get("Length") {
            Some(number @ Object::Number { .. }) => LengthKind::Direct(number.as_i64()),
            Some(Object::Reference(r)) => LengthKind::Indirect(*r),
            _ => LengthKind::Missing,
        };

        return match length_kind {
            LengthKind::Direct(length) => {
                let length = match length {
                    Some(n) if n >= 0 => Some(n as usize),
                    _ => {
                        if !recover {
                            return Err(Error::ObjectParse {
                                offset: payload_start,
                                reason: format!("invalid stream /Length in object {}", id),
                            });
                        }
                        warnings.push(format!(
                            "Invalid /Length in stream object {}, scanning for endstream",
                            id
                        ));
                        None
                    },
                };
                let (object, mut more) =
                    finish_stream(bytes, dict, payload_start, length, recover)?;
                warnings.append(&mut more);
                Ok(IndirectParse {
                    id,
                    gen,
                    outcome: ParseOutcome::Object(object),
                    warnings,
                })
            },
            LengthKind::Indirect(r) => Ok(IndirectParse {
                id,
                gen,
                outcome: ParseOutcome::PendingStream {
                    dict,
                    payload_start,
                    length: Some(r),
                },
                warnings,
            }),
            LengthKind::Missing => Ok(IndirectParse {
                id,
                gen,
                outcome: ParseOutcome::PendingStream {
                    dict,
                    payload_start,
                    length: None,
                },
                warnings,
            }),
        };
    }

    // Consume `endobj` leniently
    if parser.tokens().peek().is_keyword("endobj") {
        parser.tokens().next_token();
    } else {
        warnings.push(format!("Missing endobj after object {} {}", id, gen));
    }
    warnings.extend(parser.take_warnings());

    Ok(IndirectParse {
        id,
        gen,
        outcome: ParseOutcome::Object(value),
        warnings,
    })
}

/// Phase two: read a stream payload of `length` bytes (or scan for
/// `endstream` when no usable length exists) and consume the trailing
/// keywords leniently.
pub fn finish_stream(
    bytes: &[u8],
    dict: Dict,
    payload_start: usize,
    length: Option<usize>,
    recover: bool,
) -> Result<(Object, Vec<String>)> {
    let mut warnings = Vec::new();
    let mut pos = payload_start;

    // A single EOL follows the stream keyword: LF, or CR optionally
    // followed by LF.
    match bytes.get(pos) {
        Some(b'\n') => pos += 1,
        Some(b'\r') => {
            pos += 1;
            if bytes.get(pos) == Some(&b'\n') {
                pos += 1;
            }
        },
        _ => warnings.push(format!("Missing EOL after stream keyword at byte {}", payload_start)),
    }

    let payload = match length {
        Some(n) if pos + n <= bytes.len() => &bytes[pos..pos + n],
        Some(n) => {
            if !recover {
                return Err(Error::ObjectParse {
                    offset: pos,
                    reason: format!("stream length {} exceeds input", n),
                });
            }
            warnings.push(format!(
                "Stream length {} runs past end of input, truncating",
                n
            ));
            &bytes[pos..]
        },
        None => match scan_for_endstream(&bytes[pos..]) {
            Some(end) => &bytes[pos..pos + end],
            None => {
                if !recover {
                    return Err(Error::ObjectParse {
                        offset: pos,
                        reason: "missing endstream keyword".to_string(),
                    });
                }
                warnings.push("Unterminated stream, keeping remaining bytes".to_string());
                &bytes[pos..]
            },
        },
    };
    pos += payload.len();

    // Optional EOL, then `endstream` and `endobj`, both lenient
    let mut tokens = TokenReader::at(bytes, pos);
    if tokens.peek().is_keyword("endstream") {
        tokens.next_token();
    } else {
        warnings.push(format!("Missing endstream keyword near byte {}", pos));
    }
    if tokens.peek().is_keyword("endobj") {
        tokens.next_token();
    } else {
        warnings.push(format!("Missing endobj after stream near byte {}", pos));
    }

    let object = Object::Stream {
        dict,
        data: Bytes::copy_from_slice(payload),
    };
    Ok((object, warnings))
}

/// Locate `endstream` in the remaining bytes, trimming the EOL that
/// precedes it from the payload.
fn scan_for_endstream(input: &[u8]) -> Option<usize> {
    let keyword = b"endstream";
    let at = input
        .windows(keyword.len())
        .position(|window| window == keyword)?;
    let mut end = at;
    if end > 0 && input[end - 1] == b'\n' {
        end -= 1;
    }
    if end > 0 && input[end - 1] == b'\r' {
        end -= 1;
    }
    Some(end)
}

/// Read the `N G obj` header tokens.
fn read_header(tokens: &mut TokenReader<'_>, offset: usize) -> Result<(u32, u16)> {
    let id = match tokens.next_token() {
        Token::Number {
            value,
            integer: true,
        } if value >= 0.0 && value <= u32::MAX as f64 => value as u32,
        other => {
            return Err(Error::ObjectParse {
                offset,
                reason: format!("expected object number, found {:?}", other),
            });
        },
    };
    let gen = match tokens.next_token() {
        Token::Number {
            value,
            integer: true,
        } if value >= 0.0 && value <= u16::MAX as f64 => value as u16,
        other => {
            return Err(Error::ObjectParse {
                offset,
                reason: format!("expected generation number, found {:?}", other),
            });
        },
    };
    if !tokens.next_token().is_keyword("obj") {
        return Err(Error::ObjectParse {
            offset,
            reason: "expected obj keyword".to_string(),
        });
    }
    Ok((id, gen))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete(bytes: &[u8], offset: usize) -> (u32, u16, Object, Vec<String>) {
        let parsed = parse_indirect_object(bytes, offset, None, true).unwrap();
        match parsed.outcome {
            ParseOutcome::Object(obj) => (parsed.id, parsed.gen, obj, parsed.warnings),
            ParseOutcome::PendingStream { .. } => panic!("expected a complete object"),
        }
    }

    #[test]
    fn test_parse_simple_object() {
        let (id, gen, obj, warnings) =
            complete(b"1 0 obj\n<< /Type /Catalog >>\nendobj\n", 0);
        assert_eq!((id, gen), (1, 0));
        assert_eq!(obj.as_dict().unwrap().get("Type").unwrap().as_name(), Some("Catalog"));
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_parse_object_at_offset() {
        let bytes = b"garbage 7 3 obj 42 endobj";
        let (id, gen, obj, _) = complete(bytes, 8);
        assert_eq!((id, gen), (7, 3));
        assert_eq!(obj, Object::integer(42));
    }

    #[test]
    fn test_missing_endobj_warns() {
        let (_, _, obj, warnings) = complete(b"1 0 obj\n(text)\n", 0);
        assert_eq!(obj, Object::string_literal(b"text".to_vec()));
        assert!(warnings.iter().any(|w| w.contains("endobj")));
    }

    #[test]
    fn test_generation_mismatch_warns_but_returns() {
        let parsed = parse_indirect_object(
            b"5 2 obj\n99\nendobj\n",
            0,
            Some(ObjectRef::new(5, 0)),
            true,
        )
        .unwrap();
        assert!(parsed.warnings.iter().any(|w| w.contains("Generation")));
        match parsed.outcome {
            ParseOutcome::Object(obj) => assert_eq!(obj, Object::integer(99)),
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_stream_with_direct_length() {
        let bytes = b"4 0 obj\n<< /Length 5 >>\nstream\nhello\nendstream\nendobj\n";
        let (_, _, obj, warnings) = complete(bytes, 0);
        let (dict, data) = obj.as_stream().unwrap();
        assert_eq!(dict.get("Length").unwrap().as_i64(), Some(5));
        assert_eq!(&data[..], b"hello");
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_stream_payload_may_contain_binary() {
        let mut bytes = b"4 0 obj\n<< /Length 4 >>\nstream\n".to_vec();
        bytes.extend_from_slice(&[0x00, 0xFF, b'(', 0x80]);
        bytes.extend_from_slice(b"\nendstream\nendobj\n");
        let (_, _, obj, _) = complete(&bytes, 0);
        let (_, data) = obj.as_stream().unwrap();
        assert_eq!(&data[..], &[0x00, 0xFF, b'(', 0x80]);
    }

    #[test]
    fn test_stream_with_crlf_after_keyword() {
        let bytes = b"4 0 obj << /Length 2 >> stream\r\nAB\r\nendstream endobj";
        let (_, _, obj, _) = complete(bytes, 0);
        let (_, data) = obj.as_stream().unwrap();
        assert_eq!(&data[..], b"AB");
    }

    #[test]
    fn test_stream_with_indirect_length_is_pending() {
        let bytes = b"4 0 obj\n<< /Length 9 0 R >>\nstream\nhello\nendstream\nendobj\n";
        let parsed = parse_indirect_object(bytes, 0, None, true).unwrap();
        match parsed.outcome {
            ParseOutcome::PendingStream {
                dict,
                payload_start,
                length,
            } => {
                assert_eq!(length, Some(ObjectRef::new(9, 0)));
                assert!(dict.contains_key("Length"));
                // Phase two with the resolved length
                let (obj, warnings) =
                    finish_stream(bytes, dict, payload_start, Some(5), true).unwrap();
                let (_, data) = obj.as_stream().unwrap();
                assert_eq!(&data[..], b"hello");
                assert!(warnings.is_empty());
            },
            ParseOutcome::Object(_) => panic!("expected pending stream"),
        }
    }

    #[test]
    fn test_stream_missing_length_scans_for_endstream() {
        let bytes = b"4 0 obj\n<< /Type /Data >>\nstream\npayload here\nendstream\nendobj\n";
        let parsed = parse_indirect_object(bytes, 0, None, true).unwrap();
        match parsed.outcome {
            ParseOutcome::PendingStream {
                dict,
                payload_start,
                length,
            } => {
                assert_eq!(length, None);
                let (obj, _) = finish_stream(bytes, dict, payload_start, None, true).unwrap();
                let (_, data) = obj.as_stream().unwrap();
                assert_eq!(&data[..], b"payload here");
            },
            ParseOutcome::Object(_) => panic!("expected pending stream"),
        }
    }

    #[test]
    fn test_bad_header_fails() {
        assert!(parse_indirect_object(b"not an object", 0, None, true).is_err());
    }
}

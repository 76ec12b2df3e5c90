//! PDF object serialization.
//!
//! Emits valid PDF syntax for every object kind. Dictionaries are written
//! in insertion order and entries whose value is null are omitted; streams
//! are always written with a direct `/Length` matching the payload.

use crate::error::Result;
use crate::lexer::StringFormat;
use crate::object::{Dict, Object};
use crate::writer::byte_writer::ByteWriter;
use bytes::Bytes;

/// Serialize one object to bytes.
pub fn serialize(object: &Object) -> Vec<u8> {
    let mut w = ByteWriter::new();
    write_object(&mut w, object).expect("unbounded writer cannot overflow");
    w.into_bytes()
}

/// Write one object.
pub fn write_object(w: &mut ByteWriter, object: &Object) -> Result<()> {
    match object {
        Object::Null => w.write_str("null"),
        Object::Boolean(true) => w.write_str("true"),
        Object::Boolean(false) => w.write_str("false"),
        Object::Number { value, integer } => write_number(w, *value, *integer),
        Object::String { bytes, format } => write_string(w, bytes, *format),
        Object::Name(name) => write_name(w, name),
        Object::Array(items) => write_array(w, items),
        Object::Dictionary(dict) => write_dict(w, dict),
        Object::Stream { dict, data } => write_stream(w, dict, data),
        Object::Reference(r) => w.write_str(&format!("{} {} R", r.id, r.gen)),
    }
}

/// Write an indirect object definition: `N G obj\n<body>\nendobj\n`.
pub fn write_indirect(w: &mut ByteWriter, id: u32, gen: u16, object: &Object) -> Result<()> {
    w.write_str(&format!("{} {} obj\n", id, gen))?;
    write_object(w, object)?;
    w.write_str("\nendobj\n")
}

/// Minimal number text: integers without a decimal point, reals without
/// trailing zeros. An integral real keeps a bare trailing dot so its form
/// survives a round-trip.
fn write_number(w: &mut ByteWriter, value: f64, integer: bool) -> Result<()> {
    if integer {
        return w.write_str(&format!("{}", value as i64));
    }
    if !value.is_finite() {
        log::warn!("Non-finite number {} written as 0", value);
        return w.write_str("0");
    }
    let text = format!("{:.6}", value);
    let text = text.trim_end_matches('0');
    w.write_str(text)
}

/// Write a name with `#XX` escaping of whitespace, delimiters, `#`, and
/// bytes outside `!`..`~`.
fn write_name(w: &mut ByteWriter, name: &str) -> Result<()> {
    w.write_byte(b'/')?;
    for byte in name.bytes() {
        let needs_escape = !(33..=126).contains(&byte)
            || byte == b'#'
            || crate::lexer::is_delimiter(byte);
        if needs_escape {
            w.write_str(&format!("#{:02X}", byte))?;
        } else {
            w.write_byte(byte)?;
        }
    }
    Ok(())
}

/// Write a string in its recorded form: literal with `\`, `(`, `)` and
/// EOL bytes escaped (a raw CR would be normalized away on re-read), or
/// upper-case hex.
fn write_string(w: &mut ByteWriter, bytes: &[u8], format: StringFormat) -> Result<()> {
    match format {
        StringFormat::Literal => {
            w.write_byte(b'(')?;
            for &byte in bytes {
                match byte {
                    b'\\' => w.write_str("\\\\")?,
                    b'(' => w.write_str("\\(")?,
                    b')' => w.write_str("\\)")?,
                    b'\r' => w.write_str("\\r")?,
                    b'\n' => w.write_str("\\n")?,
                    other => w.write_byte(other)?,
                }
            }
            w.write_byte(b')')
        },
        StringFormat::Hex => {
            w.write_byte(b'<')?;
            for byte in bytes {
                w.write_str(&format!("{:02X}", byte))?;
            }
            w.write_byte(b'>')
        },
    }
}

fn write_array(w: &mut ByteWriter, items: &[Object]) -> Result<()> {
    w.write_byte(b'[')?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            w.write_byte(b' ')?;
        }
        write_object(w, item)?;
    }
    w.write_byte(b']')
}

/// Write a dictionary in insertion order, omitting null-valued entries.
fn write_dict(w: &mut ByteWriter, dict: &Dict) -> Result<()> {
    w.write_str("<<\n")?;
    for (key, value) in dict {
        if value.is_null() {
            continue;
        }
        write_name(w, key)?;
        w.write_byte(b' ')?;
        write_object(w, value)?;
        w.write_byte(b'\n')?;
    }
    w.write_str(">>")
}

/// Write a stream: its dictionary with `/Length` overridden to the actual
/// payload size, then the raw bytes verbatim.
fn write_stream(w: &mut ByteWriter, dict: &Dict, data: &Bytes) -> Result<()> {
    let mut dict = dict.clone();
    dict.insert("Length".to_string(), Object::integer(data.len() as i64));
    write_dict(w, &dict)?;
    w.write_str("\nstream\n")?;
    w.write_bytes(data)?;
    w.write_str("\nendstream")
}

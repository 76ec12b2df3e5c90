//! Document writer: complete rewrite and byte-preserving incremental
//! update.
//!
//! A complete save resolves every object reachable from the trailer and
//! emits a fresh file. An incremental save seeds the output with the exact
//! original bytes and appends only the changed and new objects plus a
//! cross-reference section covering them, with `/Prev` pointing at the
//! original `startxref` — the original byte sequence is the integrity
//! guarantee.

use crate::error::{Error, Result};
use crate::object::{Dict, Object, ObjectRef};
use crate::registry::ObjectRegistry;
use crate::writer::byte_writer::ByteWriter;
use crate::writer::serializer::{write_indirect, write_object};
use crate::xref::XRefEntry;
use md5::{Digest, Md5};

/// Binary marker comment after the header: `%` plus four bytes above 0x80
/// so transfer tools treat the file as binary.
const BINARY_MARKER: &[u8] = b"%\x80\x81\x82\x83\n";

/// Outcome of a save: the file bytes plus the cross-reference entries
/// constructed for the write, so the registry can absorb them.
#[derive(Debug)]
pub struct SaveResult {
    /// The serialized file
    pub bytes: Vec<u8>,
    /// `(id, generation, offset)` for every object written
    pub xref_entries: Vec<(u32, u16, u64)>,
    /// Offset of the cross-reference section that was written
    pub startxref: u64,
}

/// Save options.
#[derive(Debug, Clone, Copy, Default)]
pub struct SaveOptions {
    /// Append an incremental revision instead of rewriting.
    pub incremental: bool,
    /// Emit a cross-reference stream instead of a table. `None` matches
    /// the format of the file being saved.
    pub use_xref_stream: Option<bool>,
    /// Deflate streams that carry no `/Filter` yet (complete save only).
    pub compress_streams: bool,
}

/// Writer over a registry and the document's trailer state.
pub struct PdfWriter<'a> {
    registry: &'a mut ObjectRegistry,
    trailer: &'a Dict,
    version: (u8, u8),
    original_startxref: u64,
    original_is_stream: bool,
}

impl<'a> PdfWriter<'a> {
    /// Create a writer.
    pub fn new(
        registry: &'a mut ObjectRegistry,
        trailer: &'a Dict,
        version: (u8, u8),
        original_startxref: u64,
        original_is_stream: bool,
    ) -> Self {
        Self {
            registry,
            trailer,
            version,
            original_startxref,
            original_is_stream,
        }
    }

    fn wants_xref_stream(&self, options: &SaveOptions) -> bool {
        options.use_xref_stream.unwrap_or(self.original_is_stream)
    }

    /// Write a complete file: header, every reachable object, a
    /// cross-reference section, and the trailer.
    pub fn save_complete(&mut self, options: &SaveOptions) -> Result<SaveResult> {
        if self.trailer.get("Root").and_then(Object::as_reference).is_none() {
            return Err(Error::Structure("trailer has no /Root".to_string()));
        }

        // Load everything reachable so the cache is complete
        let reachable = self.collect_reachable();

        let mut w = ByteWriter::new();
        w.write_str(&format!("%PDF-{}.{}\n", self.version.0, self.version.1))?;
        w.write_bytes(BINARY_MARKER)?;

        let mut offsets: Vec<(u32, u16, u64)> = Vec::with_capacity(reachable.len());
        for r in &reachable {
            let Some(object) = self.registry.get_object(*r).cloned() else {
                continue;
            };
            let object = if options.compress_streams {
                compress_filterless_stream(object)?
            } else {
                object
            };
            offsets.push((r.id, r.gen, w.position()));
            write_indirect(&mut w, r.id, r.gen, &object)?;
        }

        let size_hint = offsets.iter().map(|&(id, _, _)| id).max().unwrap_or(0) + 1;

        if self.wants_xref_stream(options) {
            let xref_id = self.registry.allocate_object_number();
            let xref_offset = w.position();
            offsets.push((xref_id, 0, xref_offset));
            let dict = self.trailer_entries(xref_id + 1, None);
            let stream = build_xref_stream(&offsets, dict)?;
            write_indirect(&mut w, xref_id, 0, &stream)?;
            w.write_str(&format!("startxref\n{}\n%%EOF\n", xref_offset))?;
            return Ok(SaveResult {
                bytes: w.into_bytes(),
                xref_entries: offsets,
                startxref: xref_offset,
            });
        }

        let xref_offset = w.position();
        write_xref_table(&mut w, &offsets, true)?;
        w.write_str("trailer\n")?;
        let trailer = self.trailer_entries(size_hint, None);
        write_object(&mut w, &Object::Dictionary(trailer))?;
        w.write_str(&format!("\nstartxref\n{}\n%%EOF\n", xref_offset))?;

        Ok(SaveResult {
            bytes: w.into_bytes(),
            xref_entries: offsets,
            startxref: xref_offset,
        })
    }

    /// Append an incremental revision. The caller is responsible for
    /// eligibility checks; an unchanged document comes back as the exact
    /// original bytes.
    pub fn save_incremental(&mut self, options: &SaveOptions) -> Result<SaveResult> {
        let original = self.registry.buffer().clone();
        if !self.registry.has_changes() {
            return Ok(SaveResult {
                bytes: original.to_vec(),
                xref_entries: Vec::new(),
                startxref: self.original_startxref,
            });
        }

        let mut changed: Vec<ObjectRef> = self.registry.dirty_refs();
        changed.extend(self.registry.new_refs());
        changed.sort();
        changed.dedup();

        let mut w = ByteWriter::new();
        w.write_bytes(&original)?;
        if !original.ends_with(b"\n") && !original.ends_with(b"\r") {
            w.write_byte(b'\n')?;
        }

        let mut offsets: Vec<(u32, u16, u64)> = Vec::with_capacity(changed.len());
        for r in changed {
            let Some(object) = self.registry.get_object(r).cloned() else {
                continue;
            };
            // A slot that was free in the superseded revision is reused at
            // its bumped generation; everything else keeps its generation.
            let gen = match self.registry.xref().get(r.id) {
                Some(XRefEntry::Free { generation, .. }) => *generation,
                _ => r.gen,
            };
            offsets.push((r.id, gen, w.position()));
            write_indirect(&mut w, r.id, gen, &object)?;
        }

        let size = self.registry.next_object_number();
        if self.wants_xref_stream(options) {
            let xref_id = self.registry.allocate_object_number();
            let xref_offset = w.position();
            offsets.push((xref_id, 0, xref_offset));
            let dict = self.trailer_entries(xref_id + 1, Some(self.original_startxref));
            let stream = build_xref_stream(&offsets, dict)?;
            write_indirect(&mut w, xref_id, 0, &stream)?;
            w.write_str(&format!("startxref\n{}\n%%EOF\n", xref_offset))?;
            return Ok(SaveResult {
                bytes: w.into_bytes(),
                xref_entries: offsets,
                startxref: xref_offset,
            });
        }

        let xref_offset = w.position();
        write_xref_table(&mut w, &offsets, false)?;
        w.write_str("trailer\n")?;
        let trailer = self.trailer_entries(size, Some(self.original_startxref));
        write_object(&mut w, &Object::Dictionary(trailer))?;
        w.write_str(&format!("\nstartxref\n{}\n%%EOF\n", xref_offset))?;

        Ok(SaveResult {
            bytes: w.into_bytes(),
            xref_entries: offsets,
            startxref: xref_offset,
        })
    }

    /// Every reference reachable from the trailer's `/Root`, `/Info`, and
    /// `/Encrypt`, resolved into the cache, in ascending number order.
    fn collect_reachable(&mut self) -> Vec<ObjectRef> {
        let mut pending: Vec<ObjectRef> = Vec::new();
        for key in ["Root", "Info", "Encrypt"] {
            if let Some(r) = self.trailer.get(key).and_then(Object::as_reference) {
                pending.push(r);
            }
        }

        let mut seen: std::collections::HashSet<ObjectRef> = std::collections::HashSet::new();
        while let Some(r) = pending.pop() {
            if !seen.insert(r) {
                continue;
            }
            let Some(object) = self.registry.resolve(r) else {
                continue;
            };
            collect_refs(&object, &mut pending);
        }

        let mut refs: Vec<ObjectRef> = seen.into_iter().collect();
        refs.sort();
        refs
    }

    /// Assemble trailer entries in canonical order: Size, Root, Info,
    /// Encrypt, ID, then Prev for incremental sections.
    fn trailer_entries(&self, size: u32, prev: Option<u64>) -> Dict {
        let mut out = Dict::new();
        out.insert("Size".to_string(), Object::integer(size as i64));
        for key in ["Root", "Info", "Encrypt"] {
            if let Some(value) = self.trailer.get(key) {
                out.insert(key.to_string(), value.clone());
            }
        }
        match self.trailer.get("ID") {
            Some(id) => {
                out.insert("ID".to_string(), id.clone());
            },
            None => {
                let id = generate_file_id();
                out.insert(
                    "ID".to_string(),
                    Object::Array(vec![
                        Object::string_hex(id.clone()),
                        Object::string_hex(id),
                    ]),
                );
            },
        }
        if let Some(prev) = prev {
            out.insert("Prev".to_string(), Object::integer(prev as i64));
        }
        out
    }
}

/// Verify an incremental save result against its original: the original
/// bytes must be preserved verbatim, the file must not shrink, and it must
/// end with `%%EOF` (optionally followed by whitespace).
pub fn verify_incremental(original: &[u8], result: &[u8]) -> Result<()> {
    if result.len() < original.len() {
        return Err(Error::Structure(
            "incremental result is shorter than the original".to_string(),
        ));
    }
    if &result[..original.len()] != original {
        return Err(Error::Structure(
            "incremental result does not preserve the original bytes".to_string(),
        ));
    }
    let tail: Vec<u8> = result
        .iter()
        .rev()
        .copied()
        .skip_while(|&b| crate::lexer::is_whitespace(b))
        .take(5)
        .collect();
    if tail != b"FOE%%" {
        return Err(Error::Structure(
            "incremental result does not end with %%EOF".to_string(),
        ));
    }
    Ok(())
}

/// Deflate a stream that has no `/Filter`, tagging it `/FlateDecode`.
/// Objects of every other shape pass through unchanged.
fn compress_filterless_stream(object: Object) -> Result<Object> {
    match object {
        Object::Stream { mut dict, data }
            if !dict.contains_key("Filter") && dict.get("Type").and_then(Object::as_name) != Some("XRef") =>
        {
            let (compressed, filter_name) = crate::decoders::flate_compress(&data)?;
            dict.insert("Filter".to_string(), filter_name);
            Ok(Object::Stream {
                dict,
                data: compressed.into(),
            })
        },
        other => Ok(other),
    }
}

/// Walk a value collecting every reference it contains.
fn collect_refs(object: &Object, out: &mut Vec<ObjectRef>) {
    match object {
        Object::Reference(r) => out.push(*r),
        Object::Array(items) => {
            for item in items {
                collect_refs(item, out);
            }
        },
        Object::Dictionary(dict) => {
            for value in dict.values() {
                collect_refs(value, out);
            }
        },
        Object::Stream { dict, .. } => {
            for value in dict.values() {
                collect_refs(value, out);
            }
        },
        _ => {},
    }
}

/// Split recorded offsets into subsections of contiguous object numbers.
fn subsections(offsets: &[(u32, u16, u64)]) -> Vec<&[(u32, u16, u64)]> {
    let mut out = Vec::new();
    let mut start = 0;
    for i in 1..offsets.len() {
        if offsets[i].0 != offsets[i - 1].0 + 1 {
            out.push(&offsets[start..i]);
            start = i;
        }
    }
    if !offsets.is_empty() {
        out.push(&offsets[start..]);
    }
    out
}

/// Write a traditional cross-reference table. Offsets must be sorted by
/// object number. For a complete save the head free entry for object 0 is
/// prepended; each entry is exactly 20 bytes.
fn write_xref_table(
    w: &mut ByteWriter,
    offsets: &[(u32, u16, u64)],
    include_free_head: bool,
) -> Result<()> {
    w.write_str("xref\n")?;

    if include_free_head {
        w.write_str("0 1\n")?;
        w.write_str("0000000000 65535 f\r\n")?;
    }

    for section in subsections(offsets) {
        let first = section[0].0;
        w.write_str(&format!("{} {}\n", first, section.len()))?;
        for &(_, gen, offset) in section {
            w.write_str(&format!("{:010} {:05} n\r\n", offset, gen))?;
        }
    }
    Ok(())
}

/// Build a `/Type /XRef` stream object covering the recorded offsets with
/// `/W [1 4 2]`, deflate-compressed. The trailer entries ride in the
/// stream dictionary.
fn build_xref_stream(offsets: &[(u32, u16, u64)], mut dict: Dict) -> Result<Object> {
    // One 7-byte record per row, sorted by object number. When numbering
    // starts at object 1 the conventional free head for object 0 leads.
    let mut rows: Vec<(u32, [u8; 7])> = Vec::with_capacity(offsets.len() + 1);
    if offsets.first().map(|&(id, _, _)| id == 1).unwrap_or(false) {
        rows.push((0, [0, 0, 0, 0, 0, 0xFF, 0xFF]));
    }
    for &(id, gen, offset) in offsets {
        let mut record = [0u8; 7];
        record[0] = 1;
        record[1..5].copy_from_slice(&(offset as u32).to_be_bytes());
        record[5..7].copy_from_slice(&gen.to_be_bytes());
        rows.push((id, record));
    }

    let mut index = Vec::new();
    let mut data = Vec::with_capacity(rows.len() * 7);
    let mut i = 0;
    while i < rows.len() {
        let mut j = i;
        while j + 1 < rows.len() && rows[j + 1].0 == rows[j].0 + 1 {
            j += 1;
        }
        index.push(Object::integer(rows[i].0 as i64));
        index.push(Object::integer((j - i + 1) as i64));
        for (_, record) in &rows[i..=j] {
            data.extend_from_slice(record);
        }
        i = j + 1;
    }

    let (compressed, filter_name) = crate::decoders::flate_compress(&data)?;

    dict.insert("Type".to_string(), Object::name("XRef"));
    dict.insert(
        "W".to_string(),
        Object::Array(vec![Object::integer(1), Object::integer(4), Object::integer(2)]),
    );
    dict.insert("Index".to_string(), Object::Array(index));
    dict.insert("Filter".to_string(), filter_name);

    Ok(Object::Stream {
        dict,
        data: compressed.into(),
    })
}

/// Generate a fresh 16-byte file identifier: MD5 over a random UUID plus
/// the current time.
fn generate_file_id() -> Vec<u8> {
    let uuid = uuid::Uuid::new_v4();
    let mut hasher = Md5::new();
    hasher.update(uuid.as_bytes());
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    hasher.update(now.as_nanos().to_le_bytes());
    hasher.finalize().to_vec()
}

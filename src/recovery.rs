//! Brute-force recovery for damaged cross-reference data.
//!
//! When the cross-reference chain cannot be parsed, the whole file is swept
//! for `N G obj` markers and a synthetic table and trailer are built from
//! what is found. This is strictly a fallback: it is only invoked from
//! lenient-mode loading after a recoverable error.

use crate::error::{Error, Result};
use crate::indirect::{self, ParseOutcome};
use crate::lexer::{is_delimiter, is_whitespace};
use crate::object::{Dict, Object, ObjectRef};
use crate::xref::{XRefEntry, XRefTable};
use lazy_static::lazy_static;

/// Largest object number accepted from a swept header.
const MAX_OBJECT_NUMBER: u32 = 10_000_000;

lazy_static! {
    /// `N G obj` header pattern
    static ref OBJ_HEADER: regex::bytes::Regex =
        regex::bytes::Regex::new(r"(\d{1,10})\s+(\d{1,5})\s+obj").expect("valid pattern");
}

/// Result of a brute-force sweep.
#[derive(Debug)]
pub struct Recovery {
    /// Synthetic cross-reference table keyed by discovered offsets
    pub table: XRefTable,
    /// Synthetic trailer with `/Root` and `/Size`
    pub trailer: Dict,
    /// Warnings recorded while recovering
    pub warnings: Vec<String>,
}

/// Sweep the file for object headers and synthesize a cross-reference
/// table and trailer.
pub fn recover(bytes: &[u8]) -> Result<Recovery> {
    log::info!("Recovering document structure by scanning {} bytes", bytes.len());
    let mut warnings = vec!["Cross-reference data unusable, recovered by scanning for objects".to_string()];

    let mut table = XRefTable::new();
    for capture in OBJ_HEADER.captures_iter(bytes) {
        let header = capture.get(0).expect("group 0 always present");
        let start = header.start();

        // The header must sit at the start of the file or after whitespace,
        // and `obj` must be followed by whitespace or a delimiter.
        if start > 0 && !is_whitespace(bytes[start - 1]) {
            continue;
        }
        match bytes.get(header.end()) {
            Some(&b) if !is_whitespace(b) && !is_delimiter(b) => continue,
            _ => {},
        }

        let id: u32 = match parse_digits(capture.get(1).expect("group").as_bytes()) {
            Some(v) if v >= 1 && v <= MAX_OBJECT_NUMBER as u64 => v as u32,
            _ => continue,
        };
        let gen: u16 = match parse_digits(capture.get(2).expect("group").as_bytes()) {
            Some(v) if v <= u16::MAX as u64 => v as u16,
            _ => continue,
        };

        // Later occurrences win: a rewritten object shadows earlier copies
        table.add_entry(id, XRefEntry::InUse {
            offset: start as u64,
            generation: gen,
        });
    }

    if table.is_empty() {
        return Err(Error::Structure(
            "no objects found while scanning for recovery".to_string(),
        ));
    }
    log::info!("Recovered {} objects", table.len());

    let root = find_root(bytes, &table, &mut warnings).ok_or_else(|| {
        Error::Structure("no catalog found in recovered objects".to_string())
    })?;

    let mut trailer = Dict::new();
    trailer.insert("Root".to_string(), Object::Reference(root));
    trailer.insert(
        "Size".to_string(),
        Object::integer(table.max_object_number() as i64 + 1),
    );

    Ok(Recovery {
        table,
        trailer,
        warnings,
    })
}

/// Opportunistically parse recovered objects looking for the catalog
/// (`/Type /Catalog`), falling back to a page-tree root (`/Type /Pages`).
fn find_root(bytes: &[u8], table: &XRefTable, warnings: &mut Vec<String>) -> Option<ObjectRef> {
    let mut ids: Vec<u32> = table.object_numbers().collect();
    ids.sort_unstable();

    let mut pages_fallback = None;
    for id in ids {
        let Some(&XRefEntry::InUse { offset, generation }) = table.get(id) else {
            continue;
        };

        let parsed = match indirect::parse_indirect_object(bytes, offset as usize, None, true) {
            Ok(parsed) => parsed,
            Err(e) => {
                log::debug!("Recovered object {} unparseable: {}", id, e);
                continue;
            },
        };
        let dict = match &parsed.outcome {
            ParseOutcome::Object(obj) => obj.as_dict(),
            ParseOutcome::PendingStream { dict, .. } => Some(dict),
        };
        let Some(type_name) = dict.and_then(|d| d.get("Type")).and_then(Object::as_name) else {
            continue;
        };

        if type_name == "Catalog" {
            return Some(ObjectRef::new(id, generation));
        }
        if type_name == "Pages" && pages_fallback.is_none() {
            // Only a root-level pages node qualifies
            let has_parent = dict.is_some_and(|d| d.contains_key("Parent"));
            if !has_parent {
                pages_fallback = Some(ObjectRef::new(id, generation));
            }
        }
    }

    if pages_fallback.is_some() {
        warnings.push("No catalog found, using root pages node".to_string());
    }
    pages_fallback
}

/// Parse an ASCII digit run.
fn parse_digits(bytes: &[u8]) -> Option<u64> {
    std::str::from_utf8(bytes).ok()?.parse().ok()
}

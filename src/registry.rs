//! Object registry: identity, resolution, and mutation tracking.
//!
//! The registry owns every addressable object in a single arena keyed by
//! reference. Cross-object edges in dictionaries and arrays stay symbolic
//! (`Object::Reference`), which keeps the logical graph free of ownership
//! cycles; resolution walks the cross-reference index lazily and caches
//! loaded bodies.
//!
//! Change tracking drives the writer: bodies loaded from the file live in
//! `cache`, objects created after load live in `new_objects`, and loaded
//! objects replaced since load are flagged in `dirty`. A successful save
//! commits `new_objects` into `cache` and clears the dirty set.
//!
//! The registry is a single-threaded broker; it is not safe for concurrent
//! mutation.

use crate::crypt::SecurityHandler;
use crate::error::{Error, Result};
use crate::indirect::{self, ParseOutcome};
use crate::object::{Object, ObjectRef};
use crate::objstm::ObjectStream;
use crate::xref::{XRefEntry, XRefTable};
use bytes::Bytes;
use std::collections::{HashMap, HashSet};

/// Central broker for object identity, resolution, and mutation tracking.
#[derive(Debug)]
pub struct ObjectRegistry {
    /// Original file bytes, parsed lazily
    buffer: Bytes,
    /// Cross-reference index from the parser
    xref: XRefTable,
    /// Bodies loaded from the file
    cache: HashMap<ObjectRef, Object>,
    /// Objects created after load, not yet persisted
    new_objects: HashMap<ObjectRef, Object>,
    /// Loaded objects replaced since load
    dirty: HashSet<ObjectRef>,
    /// Append-only warning list
    warnings: Vec<String>,
    /// Allocation counter for new objects; never reused
    next_object_number: u32,
    /// Decoded object streams, cached by stream object number
    streams: HashMap<u32, ObjectStream>,
    /// In-flight resolutions, guarding against reference cycles
    resolving: HashSet<ObjectRef>,
    /// Installed security handler, if the document is encrypted
    security: Option<Box<dyn SecurityHandler>>,
    /// Lenient parsing mode
    lenient: bool,
}

impl ObjectRegistry {
    /// Create a registry over the file bytes and its parsed index.
    pub fn new(buffer: Bytes, xref: XRefTable, lenient: bool) -> Self {
        let next_object_number = xref.max_object_number() + 1;
        Self {
            buffer,
            xref,
            cache: HashMap::new(),
            new_objects: HashMap::new(),
            dirty: HashSet::new(),
            warnings: Vec::new(),
            next_object_number,
            streams: HashMap::new(),
            resolving: HashSet::new(),
            security: None,
            lenient,
        }
    }

    /// The original file bytes.
    pub fn buffer(&self) -> &Bytes {
        &self.buffer
    }

    /// The cross-reference index.
    pub fn xref(&self) -> &XRefTable {
        &self.xref
    }

    /// Warnings accumulated so far.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Append a warning.
    pub fn warn(&mut self, message: String) {
        log::warn!("{}", message);
        self.warnings.push(message);
    }

    /// Append several warnings.
    pub fn extend_warnings(&mut self, warnings: impl IntoIterator<Item = String>) {
        for w in warnings {
            self.warn(w);
        }
    }

    /// Install a security handler for an encrypted document.
    pub fn set_security_handler(&mut self, handler: Box<dyn SecurityHandler>) {
        self.security = Some(handler);
    }

    /// The installed security handler.
    pub fn security_handler_mut(&mut self) -> Option<&mut Box<dyn SecurityHandler>> {
        self.security.as_mut()
    }

    /// Register a newly created object, assigning it a fresh object number
    /// with generation 0.
    pub fn register(&mut self, object: Object) -> ObjectRef {
        let r = ObjectRef::new(self.next_object_number, 0);
        self.next_object_number += 1;
        self.new_objects.insert(r, object);
        r
    }

    /// Next object number that would be allocated.
    pub fn next_object_number(&self) -> u32 {
        self.next_object_number
    }

    /// Consume and return a fresh object number without registering a body
    /// (used for writer-synthesized objects such as cross-reference
    /// streams). Numbers are never reused.
    pub fn allocate_object_number(&mut self) -> u32 {
        let id = self.next_object_number;
        self.next_object_number += 1;
        id
    }

    /// Replace the object stored under `r`, marking it dirty when it was
    /// loaded from the file.
    pub fn update(&mut self, r: ObjectRef, object: Object) -> Result<()> {
        if let std::collections::hash_map::Entry::Occupied(mut e) = self.new_objects.entry(r) {
            e.insert(object);
            return Ok(());
        }
        if self.cache.contains_key(&r) || self.xref.contains(r.id) {
            self.cache.insert(r, object);
            self.dirty.insert(r);
            return Ok(());
        }
        Err(Error::ObjectNotFound(r.id, r.gen))
    }

    /// Flag a loaded object as mutated.
    pub fn mark_dirty(&mut self, r: ObjectRef) {
        if !self.new_objects.contains_key(&r) {
            self.dirty.insert(r);
        }
    }

    /// Whether `r` was mutated since load.
    pub fn is_dirty(&self, r: ObjectRef) -> bool {
        self.dirty.contains(&r)
    }

    /// Whether `r` was created after load.
    pub fn is_new(&self, r: ObjectRef) -> bool {
        self.new_objects.contains_key(&r)
    }

    /// Whether any object was added or mutated since load (or last commit).
    pub fn has_changes(&self) -> bool {
        !self.dirty.is_empty() || !self.new_objects.is_empty()
    }

    /// Refs dirtied since load, in object-number order.
    pub fn dirty_refs(&self) -> Vec<ObjectRef> {
        let mut refs: Vec<ObjectRef> = self.dirty.iter().copied().collect();
        refs.sort();
        refs
    }

    /// Refs created since load, in object-number order.
    pub fn new_refs(&self) -> Vec<ObjectRef> {
        let mut refs: Vec<ObjectRef> = self.new_objects.keys().copied().collect();
        refs.sort();
        refs
    }

    /// Synchronous cache lookup; never parses.
    pub fn get_object(&self, r: ObjectRef) -> Option<&Object> {
        self.new_objects.get(&r).or_else(|| self.cache.get(&r))
    }

    /// Reverse lookup from a value back to its reference, used when
    /// rebuilding structural indexes. Structural equality over the cached
    /// and new objects.
    pub fn find_ref(&self, object: &Object) -> Option<ObjectRef> {
        self.cache
            .iter()
            .chain(self.new_objects.iter())
            .find(|(_, o)| *o == object)
            .map(|(&r, _)| r)
    }

    /// Resolve a reference to its object, loading and caching it on first
    /// access. Returns `None` for free slots, unknown numbers, and bodies
    /// that cannot be parsed (each with a warning).
    pub fn resolve(&mut self, r: ObjectRef) -> Option<Object> {
        if let Some(obj) = self.get_object(r) {
            return Some(obj.clone());
        }

        if !self.resolving.insert(r) {
            self.warn(format!("Circular resolution of {}", r));
            return None;
        }
        let loaded = self.load(r);
        self.resolving.remove(&r);

        match loaded {
            Ok(Some(object)) => {
                let object = self.decrypt_if_needed(r, object);
                self.cache.insert(r, object.clone());
                Some(object)
            },
            Ok(None) => None,
            Err(e) => {
                self.warn(format!("Failed to load {}: {}", r, e));
                None
            },
        }
    }

    /// Resolve a value that may be a reference (following chains), cloning
    /// direct values through.
    pub fn resolve_value(&mut self, value: &Object) -> Option<Object> {
        let mut seen = HashSet::new();
        let mut current = value.clone();
        while let Object::Reference(r) = current {
            if !seen.insert(r) {
                self.warn(format!("Reference cycle through {}", r));
                return None;
            }
            current = self.resolve(r)?;
        }
        Some(current)
    }

    /// Load a body from the file per its cross-reference entry.
    fn load(&mut self, r: ObjectRef) -> Result<Option<Object>> {
        let entry = match self.xref.get(r.id) {
            Some(entry) => *entry,
            None => return Ok(None),
        };

        match entry {
            XRefEntry::Free { .. } => Ok(None),
            XRefEntry::InUse { offset, .. } => self.load_at_offset(r, offset as usize).map(Some),
            XRefEntry::Compressed { stream_id, index } => self.load_compressed(r, stream_id, index),
        }
    }

    /// Parse an uncompressed body at `offset`.
    fn load_at_offset(&mut self, r: ObjectRef, offset: usize) -> Result<Object> {
        let buffer = self.buffer.clone();
        let parsed =
            indirect::parse_indirect_object(&buffer, offset, Some(r), self.lenient)?;
        self.extend_warnings(parsed.warnings);

        match parsed.outcome {
            ParseOutcome::Object(object) => Ok(object),
            ParseOutcome::PendingStream {
                dict,
                payload_start,
                length,
            } => {
                // Resolve an indirect /Length with an independent cursor,
                // then finish the payload read.
                let resolved = length.and_then(|length_ref| {
                    self.resolve(length_ref)
                        .as_ref()
                        .and_then(Object::as_i64)
                        .filter(|&n| n >= 0)
                        .map(|n| n as usize)
                });
                if length.is_some() && resolved.is_none() {
                    self.warn(format!(
                        "Could not resolve indirect /Length for {}, scanning for endstream",
                        r
                    ));
                }
                let (object, warnings) =
                    indirect::finish_stream(&buffer, dict, payload_start, resolved, self.lenient)?;
                self.extend_warnings(warnings);
                Ok(object)
            },
        }
    }

    /// Fetch an entry of a compressed object stream, decoding and caching
    /// the containing stream on first access.
    fn load_compressed(
        &mut self,
        r: ObjectRef,
        stream_id: u32,
        index: u16,
    ) -> Result<Option<Object>> {
        if !self.streams.contains_key(&stream_id) {
            let container = match self.resolve(ObjectRef::new(stream_id, 0)) {
                Some(container) => container,
                None => {
                    self.warn(format!(
                        "Object stream {} 0 R for {} could not be loaded",
                        stream_id, r
                    ));
                    return Ok(None);
                },
            };
            let stream = ObjectStream::parse(&container)?;
            self.streams.insert(stream_id, stream);
        }
        let index = index as usize;
        let (entry_matches, lookup) = {
            let stream = &self.streams[&stream_id];
            let entry_matches = stream.object_number(index) == Some(r.id);
            // When the recorded index disagrees with the stream's own
            // header, trust the header.
            let lookup = if entry_matches {
                Some(index)
            } else {
                stream.index_of(r.id)
            };
            (entry_matches, lookup)
        };

        let Some(lookup) = lookup else {
            self.warn(format!("Object {} not present in object stream {}", r, stream_id));
            return Ok(None);
        };
        if !entry_matches {
            self.warn(format!(
                "Cross-reference index {} stale for {}, using stream header",
                index, r
            ));
        }
        self.streams[&stream_id].get(lookup).map(Some)
    }

    /// Recursive decryption pass for authenticated documents: strings and
    /// stream bodies only. Cross-reference streams are never encrypted and
    /// object-stream contents are decrypted with their container.
    fn decrypt_if_needed(&mut self, owner: ObjectRef, object: Object) -> Object {
        let handler = match &self.security {
            Some(handler) if handler.is_authenticated() => handler,
            _ => return object,
        };
        match decrypt_object(handler.as_ref(), owner, object) {
            Ok(object) => object,
            Err((object, e)) => {
                self.warn(format!("Decryption of {} failed: {}", owner, e));
                object
            },
        }
    }

    /// Merge new objects into the cache and clear all dirty flags. Called
    /// after a successful save.
    pub fn commit_after_save(&mut self) {
        self.cache.extend(self.new_objects.drain());
        self.dirty.clear();
    }

    /// Adopt the bytes of a completed incremental save together with the
    /// cross-reference entries constructed for it, so further revisions
    /// append to the saved file instead of the one originally loaded.
    pub fn absorb_save(&mut self, buffer: Bytes, entries: &[(u32, u16, u64)]) {
        self.buffer = buffer;
        for &(id, gen, offset) in entries {
            self.xref.add_entry(id, XRefEntry::InUse {
                offset,
                generation: gen,
            });
        }
    }
}

/// Walk a value decrypting strings and stream payloads. On failure the
/// original object is handed back with the error.
fn decrypt_object(
    handler: &dyn SecurityHandler,
    owner: ObjectRef,
    object: Object,
) -> std::result::Result<Object, (Object, Error)> {
    match object {
        Object::String { bytes, format } => match handler.decrypt_string(owner, &bytes) {
            Ok(bytes) => Ok(Object::String { bytes, format }),
            Err(e) => Err((Object::String { bytes, format }, e)),
        },
        Object::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                match decrypt_object(handler, owner, item) {
                    Ok(item) => out.push(item),
                    Err((item, e)) => {
                        out.push(item);
                        return Err((Object::Array(out), e));
                    },
                }
            }
            Ok(Object::Array(out))
        },
        Object::Dictionary(dict) => {
            let mut out = crate::object::Dict::with_capacity(dict.len());
            for (key, value) in dict {
                match decrypt_object(handler, owner, value) {
                    Ok(value) => {
                        out.insert(key, value);
                    },
                    Err((value, e)) => {
                        out.insert(key, value);
                        return Err((Object::Dictionary(out), e));
                    },
                }
            }
            Ok(Object::Dictionary(out))
        },
        Object::Stream { dict, data } => {
            // /Type /XRef streams are written in clear by construction
            if dict.get("Type").and_then(Object::as_name) == Some("XRef") {
                return Ok(Object::Stream { dict, data });
            }
            match handler.decrypt_stream(owner, &data) {
                Ok(decrypted) => {
                    let dict = match decrypt_object(handler, owner, Object::Dictionary(dict)) {
                        Ok(Object::Dictionary(d)) => d,
                        Ok(_) => unreachable!("dictionary stays a dictionary"),
                        Err((Object::Dictionary(d), e)) => {
                            return Err((
                                Object::Stream {
                                    dict: d,
                                    data: Bytes::from(decrypted),
                                },
                                e,
                            ));
                        },
                        Err(_) => unreachable!("dictionary stays a dictionary"),
                    };
                    Ok(Object::Stream {
                        dict,
                        data: Bytes::from(decrypted),
                    })
                },
                Err(e) => Err((Object::Stream { dict, data }, e)),
            }
        },
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Dict;

    /// Assemble a buffer of indirect objects plus a matching xref table.
    fn registry_from(objects: &[(u32, u16, &str)]) -> ObjectRegistry {
        let mut buffer = Vec::new();
        let mut xref = XRefTable::new();
        for &(id, gen, body) in objects {
            let offset = buffer.len() as u64;
            buffer.extend_from_slice(format!("{} {} obj\n{}\nendobj\n", id, gen, body).as_bytes());
            xref.add_entry(id, XRefEntry::InUse {
                offset,
                generation: gen,
            });
        }
        ObjectRegistry::new(Bytes::from(buffer), xref, true)
    }

    #[test]
    fn test_resolve_caches() {
        let mut registry = registry_from(&[(1, 0, "42")]);
        let r = ObjectRef::new(1, 0);
        assert!(registry.get_object(r).is_none());
        assert_eq!(registry.resolve(r), Some(Object::integer(42)));
        // Now present synchronously
        assert_eq!(registry.get_object(r), Some(&Object::integer(42)));
        // Idempotent
        assert_eq!(registry.resolve(r), Some(Object::integer(42)));
    }

    #[test]
    fn test_resolve_unknown_is_absent() {
        let mut registry = registry_from(&[(1, 0, "42")]);
        assert_eq!(registry.resolve(ObjectRef::new(99, 0)), None);
    }

    #[test]
    fn test_resolve_free_slot_is_absent() {
        let mut xref = XRefTable::new();
        xref.add_entry(3, XRefEntry::Free {
            next_free: 0,
            generation: 1,
        });
        let mut registry = ObjectRegistry::new(Bytes::new(), xref, true);
        assert_eq!(registry.resolve(ObjectRef::new(3, 0)), None);
    }

    #[test]
    fn test_register_allocates_monotonic_numbers() {
        let mut registry = registry_from(&[(7, 0, "null")]);
        let a = registry.register(Object::integer(1));
        let b = registry.register(Object::integer(2));
        assert_eq!(a.id, 8);
        assert_eq!(b.id, 9);
        assert_eq!(a.gen, 0);
        assert!(registry.is_new(a));
        assert!(!registry.is_dirty(a));
        assert_eq!(registry.resolve(a), Some(Object::integer(1)));
    }

    #[test]
    fn test_update_marks_dirty() {
        let mut registry = registry_from(&[(1, 0, "42")]);
        let r = ObjectRef::new(1, 0);
        registry.resolve(r);
        registry.update(r, Object::integer(43)).unwrap();
        assert!(registry.is_dirty(r));
        assert_eq!(registry.resolve(r), Some(Object::integer(43)));
    }

    #[test]
    fn test_update_unknown_fails() {
        let mut registry = registry_from(&[(1, 0, "42")]);
        let result = registry.update(ObjectRef::new(50, 0), Object::Null);
        assert!(matches!(result, Err(Error::ObjectNotFound(50, 0))));
    }

    #[test]
    fn test_commit_after_save() {
        let mut registry = registry_from(&[(1, 0, "42")]);
        let r1 = ObjectRef::new(1, 0);
        registry.resolve(r1);
        registry.update(r1, Object::integer(43)).unwrap();
        let r2 = registry.register(Object::name("New"));

        assert!(registry.has_changes());
        registry.commit_after_save();
        assert!(!registry.has_changes());
        assert!(!registry.is_new(r2));
        assert_eq!(registry.get_object(r2), Some(&Object::name("New")));
    }

    #[test]
    fn test_find_ref() {
        let mut registry = registry_from(&[(1, 0, "(needle)")]);
        let r = ObjectRef::new(1, 0);
        registry.resolve(r);
        assert_eq!(
            registry.find_ref(&Object::string_literal(b"needle".to_vec())),
            Some(r)
        );
        assert_eq!(registry.find_ref(&Object::integer(7)), None);
    }

    #[test]
    fn test_resolve_value_follows_chain() {
        let mut registry = registry_from(&[(1, 0, "2 0 R"), (2, 0, "(end)")]);
        let value = Object::reference(1, 0);
        assert_eq!(
            registry.resolve_value(&value),
            Some(Object::string_literal(b"end".to_vec()))
        );
    }

    #[test]
    fn test_resolve_value_detects_cycle() {
        let mut registry = registry_from(&[(1, 0, "2 0 R"), (2, 0, "1 0 R")]);
        assert_eq!(registry.resolve_value(&Object::reference(1, 0)), None);
        assert!(registry.warnings().iter().any(|w| w.contains("cycle") || w.contains("Circular")));
    }

    #[test]
    fn test_stream_with_indirect_length() {
        let mut buffer = Vec::new();
        let mut xref = XRefTable::new();
        let s_off = buffer.len() as u64;
        buffer.extend_from_slice(b"1 0 obj\n<< /Length 2 0 R >>\nstream\nhello\nendstream\nendobj\n");
        xref.add_entry(1, XRefEntry::InUse {
            offset: s_off,
            generation: 0,
        });
        let l_off = buffer.len() as u64;
        buffer.extend_from_slice(b"2 0 obj\n5\nendobj\n");
        xref.add_entry(2, XRefEntry::InUse {
            offset: l_off,
            generation: 0,
        });

        let mut registry = ObjectRegistry::new(Bytes::from(buffer), xref, true);
        let obj = registry.resolve(ObjectRef::new(1, 0)).unwrap();
        let (_, data) = obj.as_stream().unwrap();
        assert_eq!(&data[..], b"hello");
    }

    #[test]
    fn test_resolve_compressed_object() {
        // Object stream 3 holds objects 5 (42) and 8 ((hi))
        let payload = b"5 0 8 3 42 (hi)";
        let mut buffer = Vec::new();
        let mut xref = XRefTable::new();
        buffer.extend_from_slice(
            format!(
                "3 0 obj\n<< /Type /ObjStm /N 2 /First 8 /Length {} >>\nstream\n",
                payload.len()
            )
            .as_bytes(),
        );
        buffer.extend_from_slice(payload);
        buffer.extend_from_slice(b"\nendstream\nendobj\n");
        xref.add_entry(3, XRefEntry::InUse {
            offset: 0,
            generation: 0,
        });
        xref.add_entry(5, XRefEntry::Compressed {
            stream_id: 3,
            index: 0,
        });
        xref.add_entry(8, XRefEntry::Compressed {
            stream_id: 3,
            index: 1,
        });

        let mut registry = ObjectRegistry::new(Bytes::from(buffer), xref, true);
        assert_eq!(registry.resolve(ObjectRef::new(5, 0)), Some(Object::integer(42)));
        assert_eq!(
            registry.resolve(ObjectRef::new(8, 0)),
            Some(Object::string_literal(b"hi".to_vec()))
        );
    }

    #[test]
    fn test_stale_compressed_index_falls_back_to_header() {
        let payload = b"5 0 8 3 42 (hi)";
        let mut buffer = Vec::new();
        let mut xref = XRefTable::new();
        buffer.extend_from_slice(
            format!(
                "3 0 obj\n<< /Type /ObjStm /N 2 /First 8 /Length {} >>\nstream\n",
                payload.len()
            )
            .as_bytes(),
        );
        buffer.extend_from_slice(payload);
        buffer.extend_from_slice(b"\nendstream\nendobj\n");
        xref.add_entry(3, XRefEntry::InUse {
            offset: 0,
            generation: 0,
        });
        // Index 5 is wrong; the stream header still locates object 8
        xref.add_entry(8, XRefEntry::Compressed {
            stream_id: 3,
            index: 5,
        });

        let mut registry = ObjectRegistry::new(Bytes::from(buffer), xref, true);
        assert_eq!(
            registry.resolve(ObjectRef::new(8, 0)),
            Some(Object::string_literal(b"hi".to_vec()))
        );
        assert!(!registry.warnings().is_empty());
    }

    #[test]
    fn test_dirty_and_new_ref_ordering() {
        let mut registry = registry_from(&[(1, 0, "1"), (2, 0, "2"), (3, 0, "3")]);
        for id in [3u32, 1, 2] {
            let r = ObjectRef::new(id, 0);
            registry.resolve(r);
            registry.update(r, Object::Null).unwrap();
        }
        let ids: Vec<u32> = registry.dirty_refs().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    /// Toy handler that XORs with a constant, for exercising the
    /// decryption pass without a real cipher.
    #[derive(Debug)]
    struct XorHandler;

    impl SecurityHandler for XorHandler {
        fn authenticate(&mut self, _: &crate::crypt::Credentials) -> Result<crate::crypt::AuthResult> {
            Ok(crate::crypt::AuthResult::full_access())
        }
        fn is_authenticated(&self) -> bool {
            true
        }
        fn decrypt_string(&self, _: ObjectRef, data: &[u8]) -> Result<Vec<u8>> {
            Ok(data.iter().map(|b| b ^ 0x5A).collect())
        }
        fn decrypt_stream(&self, _: ObjectRef, data: &[u8]) -> Result<Vec<u8>> {
            Ok(data.iter().map(|b| b ^ 0x5A).collect())
        }
    }

    #[test]
    fn test_decryption_pass_covers_strings_only() {
        let ciphertext: Vec<u8> = b"secret".iter().map(|b| b ^ 0x5A).collect();
        let mut dict = Dict::new();
        dict.insert("S".to_string(), Object::string_literal(ciphertext));
        dict.insert("N".to_string(), Object::integer(7));
        let decrypted = decrypt_object(
            &XorHandler,
            ObjectRef::new(1, 0),
            Object::Dictionary(dict),
        )
        .unwrap();
        let dict = decrypted.as_dict().unwrap();
        assert_eq!(dict.get("S").unwrap().as_string_bytes(), Some(&b"secret"[..]));
        // Numbers pass through untouched
        assert_eq!(dict.get("N").unwrap().as_i64(), Some(7));
    }

    #[test]
    fn test_xref_streams_exempt_from_decryption() {
        let mut dict = Dict::new();
        dict.insert("Type".to_string(), Object::name("XRef"));
        let stream = Object::Stream {
            dict,
            data: Bytes::from_static(b"raw"),
        };
        let out = decrypt_object(&XorHandler, ObjectRef::new(1, 0), stream).unwrap();
        let (_, data) = out.as_stream().unwrap();
        assert_eq!(&data[..], b"raw");
    }
}

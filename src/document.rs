//! Document façade.
//!
//! [`Document::load`] recovers a document's object graph from bytes:
//! header, cross-reference chain (with brute-force recovery as the lenient
//! fallback), and the registry that resolves everything else on demand.
//! Mutation goes through [`Document::update`] and [`Document::register`];
//! [`Document::save`] emits a complete rewrite or a byte-preserving
//! incremental revision.

use crate::crypt::{AuthResult, Credentials};
use crate::error::{Error, Result};
use crate::indirect::{self, ParseOutcome};
use crate::lexer::{Token, TokenReader};
use crate::object::{Dict, Object, ObjectRef};
use crate::recovery;
use crate::registry::ObjectRegistry;
use crate::writer::{PdfWriter, SaveOptions, verify_incremental};
use crate::xref;
use bytes::Bytes;
use std::collections::HashSet;

/// How far into the file the `%PDF-` header may sit.
const HEADER_WINDOW: usize = 1024;

/// Load options.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Recover from structural damage instead of failing (default true).
    pub lenient: bool,
    /// Credentials to hand to the security handler once installed.
    pub credentials: Option<Credentials>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            lenient: true,
            credentials: None,
        }
    }
}

/// An open PDF document.
#[derive(Debug)]
pub struct Document {
    version: (u8, u8),
    registry: ObjectRegistry,
    trailer: Dict,
    original_startxref: u64,
    newest_is_stream: bool,
    recovered: bool,
    linearized: bool,
    lenient: bool,
}

impl Document {
    /// Load a document from bytes.
    pub fn load(bytes: impl Into<Bytes>, options: LoadOptions) -> Result<Self> {
        let buffer: Bytes = bytes.into();
        let lenient = options.lenient;
        let mut warnings = Vec::new();

        let version = parse_header(&buffer, lenient, &mut warnings)?;

        // Regular path: startxref then the /Prev chain; lenient loads fall
        // back to a whole-file sweep on any recoverable failure.
        let mut recovered = false;
        let (table, startxref, newest_is_stream) = match load_xref_chain(&buffer) {
            Ok((parsed, startxref)) => {
                warnings.extend(parsed.warnings);
                (parsed.table, startxref, parsed.newest_is_stream)
            },
            Err(e) if lenient && e.is_recoverable() => {
                log::warn!("Cross-reference parsing failed ({}), recovering", e);
                let recovery = recovery::recover(&buffer)?;
                warnings.extend(recovery.warnings);
                recovered = true;
                let mut table = recovery.table;
                table.set_trailer(recovery.trailer);
                (table, 0, false)
            },
            Err(e) => return Err(e),
        };

        let trailer = match table.trailer() {
            Some(trailer) if trailer.contains_key("Root") => trailer.clone(),
            _ if lenient && !recovered => {
                // A chain that parsed but names no catalog is as good as
                // broken
                log::warn!("Trailer has no /Root, recovering");
                let recovery = recovery::recover(&buffer)?;
                warnings.extend(recovery.warnings);
                recovered = true;
                recovery.trailer
            },
            Some(trailer) => trailer.clone(),
            None => return Err(Error::Structure("no trailer dictionary".to_string())),
        };
        if !trailer.contains_key("Root") {
            return Err(Error::Structure("no catalog reference in trailer".to_string()));
        }

        let linearized = detect_linearized(&buffer);

        let mut registry = ObjectRegistry::new(buffer, table, lenient);
        registry.extend_warnings(warnings);

        let mut document = Self {
            version,
            registry,
            trailer,
            original_startxref: startxref,
            newest_is_stream,
            recovered,
            linearized,
            lenient,
        };

        if let Some(credentials) = options.credentials {
            document.authenticate_with(&credentials)?;
        }
        Ok(document)
    }

    /// PDF version as `(major, minor)`.
    pub fn version(&self) -> (u8, u8) {
        self.version
    }

    /// PDF version as text, e.g. `"1.4"`.
    pub fn version_string(&self) -> String {
        format!("{}.{}", self.version.0, self.version.1)
    }

    /// The logical trailer dictionary.
    pub fn trailer(&self) -> &Dict {
        &self.trailer
    }

    /// Warnings accumulated by loading, resolution, and saves.
    pub fn warnings(&self) -> &[String] {
        self.registry.warnings()
    }

    /// Whether the document was loaded via brute-force recovery.
    pub fn was_recovered(&self) -> bool {
        self.recovered
    }

    /// Whether the file is linearized (web-optimized).
    pub fn is_linearized(&self) -> bool {
        self.linearized
    }

    /// Resolve a reference, loading lazily.
    pub fn resolve(&mut self, r: ObjectRef) -> Option<Object> {
        self.registry.resolve(r)
    }

    /// Resolve a value that may be (a chain of) references.
    pub fn resolve_value(&mut self, value: &Object) -> Option<Object> {
        self.registry.resolve_value(value)
    }

    /// Cache-only lookup; never parses.
    pub fn get_object(&self, r: ObjectRef) -> Option<&Object> {
        self.registry.get_object(r)
    }

    /// Register a new object, returning its reference.
    pub fn register(&mut self, object: Object) -> ObjectRef {
        self.registry.register(object)
    }

    /// Replace an object, marking it dirty.
    pub fn update(&mut self, r: ObjectRef, object: Object) -> Result<()> {
        self.registry.update(r, object)
    }

    /// The underlying registry.
    pub fn registry(&self) -> &ObjectRegistry {
        &self.registry
    }

    /// The underlying registry, mutably.
    pub fn registry_mut(&mut self) -> &mut ObjectRegistry {
        &mut self.registry
    }

    /// Reference to the catalog from the trailer's `/Root`.
    pub fn catalog_ref(&self) -> Result<ObjectRef> {
        self.trailer
            .get("Root")
            .and_then(Object::as_reference)
            .ok_or_else(|| Error::Structure("no catalog reference in trailer".to_string()))
    }

    /// The catalog dictionary.
    pub fn catalog(&mut self) -> Result<Object> {
        let r = self.catalog_ref()?;
        let catalog = self
            .resolve(r)
            .ok_or_else(|| Error::ObjectNotFound(r.id, r.gen))?;
        if catalog.as_dict().is_none() {
            return Err(Error::Structure(format!(
                "catalog {} is a {}, not a dictionary",
                r,
                catalog.type_name()
            )));
        }
        Ok(catalog)
    }

    /// References of all page objects, in document order.
    pub fn pages(&mut self) -> Result<Vec<ObjectRef>> {
        let catalog = self.catalog()?;
        let pages_ref = catalog
            .as_dict()
            .and_then(|d| d.get("Pages"))
            .and_then(Object::as_reference);

        let mut out = Vec::new();
        match pages_ref {
            Some(root) => {
                let mut visited = HashSet::new();
                self.walk_page_tree(root, &mut out, &mut visited);
            },
            None => {
                self.registry
                    .warn("Catalog has no /Pages reference".to_string());
            },
        }
        Ok(out)
    }

    /// Number of pages.
    pub fn page_count(&mut self) -> Result<usize> {
        Ok(self.pages()?.len())
    }

    fn walk_page_tree(
        &mut self,
        r: ObjectRef,
        out: &mut Vec<ObjectRef>,
        visited: &mut HashSet<ObjectRef>,
    ) {
        if !visited.insert(r) {
            self.registry
                .warn(format!("Page tree cycle through {}, stopping", r));
            return;
        }
        let Some(node) = self.resolve(r) else {
            self.registry.warn(format!("Page tree node {} missing", r));
            return;
        };
        let Some(dict) = node.as_dict() else {
            self.registry
                .warn(format!("Page tree node {} is not a dictionary", r));
            return;
        };

        let type_name = dict.get("Type").and_then(Object::as_name);
        let kids = dict.get("Kids").and_then(Object::as_array).map(|s| s.to_vec());

        match (type_name, kids) {
            (Some("Page"), _) => out.push(r),
            (_, Some(kids)) => {
                for kid in kids {
                    match kid.as_reference() {
                        Some(kid) => self.walk_page_tree(kid, out, visited),
                        None => self
                            .registry
                            .warn(format!("Non-reference kid under {}", r)),
                    }
                }
            },
            (Some("Pages"), None) => {},
            _ => {
                // Leaf without a /Type: treat as a page
                out.push(r);
            },
        }
    }

    /// The document information dictionary from the trailer's `/Info`,
    /// if present.
    pub fn info(&mut self) -> Option<Dict> {
        let info = self.trailer.get("Info")?.clone();
        self.resolve_value(&info)?.as_dict().cloned()
    }

    /// Authenticate against an encrypted document with a password.
    ///
    /// Unencrypted documents report full access. A malformed `/Encrypt`
    /// dictionary is recorded as a warning and treated as unauthenticated.
    /// An encrypted document with no installed security handler cannot
    /// accept credentials.
    pub fn authenticate(&mut self, password: &str) -> Result<AuthResult> {
        self.authenticate_with(&Credentials::Password(password.to_string()))
    }

    /// Authenticate with arbitrary credentials.
    pub fn authenticate_with(&mut self, credentials: &Credentials) -> Result<AuthResult> {
        let Some(encrypt) = self.trailer.get("Encrypt").cloned() else {
            return Ok(AuthResult::full_access());
        };

        let resolved = self.registry.resolve_value(&encrypt);
        if resolved.as_ref().and_then(Object::as_dict).is_none() {
            self.registry.warn(format!(
                "Malformed encryption dictionary ({}), treating document as unauthenticated",
                Error::EncryptionDict(encrypt.type_name().to_string())
            ));
            return Ok(AuthResult::denied());
        }

        match self.registry.security_handler_mut() {
            Some(handler) => handler.authenticate(credentials),
            None => Err(Error::UnsupportedCredentials(
                "no security handler installed for this document".to_string(),
            )),
        }
    }

    /// Install a security handler (cipher implementations live outside the
    /// core).
    pub fn set_security_handler(&mut self, handler: Box<dyn crate::crypt::SecurityHandler>) {
        self.registry.set_security_handler(handler);
    }

    /// Serialize the document.
    ///
    /// An incremental save preserves the loaded bytes verbatim and appends
    /// a revision; documents that were brute-force recovered or are
    /// linearized fall back to a complete rewrite with a warning. A
    /// complete save rewrites every reachable object.
    pub fn save(&mut self, options: &SaveOptions) -> Result<Vec<u8>> {
        let mut options = *options;
        if options.incremental && (self.recovered || self.linearized) {
            let reason = if self.recovered {
                "document was recovered by scanning"
            } else {
                "document is linearized"
            };
            self.registry.warn(format!(
                "Incremental save unavailable ({}), writing complete file",
                reason
            ));
            options.incremental = false;
        }

        let incremental = options.incremental;
        let original = self.registry.buffer().clone();

        let result = {
            let mut writer = PdfWriter::new(
                &mut self.registry,
                &self.trailer,
                self.version,
                self.original_startxref,
                self.newest_is_stream,
            );
            if incremental {
                writer.save_incremental(&options)?
            } else {
                writer.save_complete(&options)?
            }
        };

        self.registry.commit_after_save();
        if incremental {
            debug_assert!(verify_incremental(&original, &result.bytes).is_ok());
            self.original_startxref = result.startxref;
            self.registry
                .absorb_save(Bytes::from(result.bytes.clone()), &result.xref_entries);
        }
        Ok(result.bytes)
    }

    /// Whether lenient parsing is active.
    pub fn is_lenient(&self) -> bool {
        self.lenient
    }
}

/// Locate and parse the `%PDF-X.Y` header within the first kilobyte.
fn parse_header(bytes: &[u8], lenient: bool, warnings: &mut Vec<String>) -> Result<(u8, u8)> {
    let window = &bytes[..bytes.len().min(HEADER_WINDOW)];
    let at = window.windows(5).position(|w| w == b"%PDF-");

    let fallback = |message: String, warnings: &mut Vec<String>| -> Result<(u8, u8)> {
        if lenient {
            log::warn!("{}, assuming 1.7", message);
            warnings.push(format!("{}, assuming version 1.7", message));
            Ok((1, 7))
        } else {
            Err(Error::Structure(message))
        }
    };

    let Some(at) = at else {
        return fallback("Missing %PDF- header".to_string(), warnings);
    };

    let version = &bytes[at + 5..];
    let (major, minor) = match (version.first(), version.get(1), version.get(2)) {
        (Some(&major), Some(&b'.'), Some(&minor))
            if major.is_ascii_digit() && minor.is_ascii_digit() =>
        {
            (major - b'0', minor - b'0')
        },
        _ => {
            return fallback("Unreadable header version".to_string(), warnings);
        },
    };

    match (major, minor) {
        (1, 0..=7) | (2, 0) => Ok((major, minor)),
        _ => fallback(format!("Unsupported PDF version {}.{}", major, minor), warnings),
    }
}

/// Find `startxref` and walk the chain.
fn load_xref_chain(bytes: &[u8]) -> Result<(xref::ChainParse, u64)> {
    let startxref = xref::find_startxref(bytes)?;
    let parsed = xref::parse_chain(bytes, startxref)?;
    // An index with no entries is as unusable as a missing one
    if parsed.table.is_empty() {
        return Err(Error::XRefParse("cross-reference chain is empty".to_string()));
    }
    Ok((parsed, startxref))
}

/// A linearized file begins with a `/Linearized` parameter dictionary as
/// its first object.
fn detect_linearized(bytes: &[u8]) -> bool {
    let window = &bytes[..bytes.len().min(2048)];
    let mut tokens = TokenReader::new(window);
    if !matches!(tokens.peek(), Token::Number { integer: true, .. }) {
        return false;
    }
    let start = tokens.peek_start();
    match indirect::parse_indirect_object(window, start, None, true) {
        Ok(parsed) => match parsed.outcome {
            ParseOutcome::Object(obj) => obj
                .as_dict()
                .map(|d| d.contains_key("Linearized"))
                .unwrap_or(false),
            ParseOutcome::PendingStream { dict, .. } => dict.contains_key("Linearized"),
        },
        Err(_) => false,
    }
}

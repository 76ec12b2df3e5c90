//! # pdf_mend
//!
//! An engine for reading, modifying, and writing PDF files in place
//! without loss of fidelity.
//!
//! ## What it does
//!
//! - **Byte-level parsing**: scanner, tokenizer, and recursive-descent
//!   object parser over the raw file, with lenient recovery for corrupted
//!   inputs (brute-force object sweep when the cross-reference data is
//!   unusable).
//! - **Full cross-reference support**: traditional tables, PDF 1.5+
//!   cross-reference streams, `/Prev` revision chains with
//!   newest-definition-wins precedence, and compressed object streams.
//! - **Object model and registry**: one tagged sum type for every PDF
//!   value, insertion-ordered dictionaries, and a registry that resolves
//!   indirect references lazily while tracking new and mutated objects.
//! - **Filter pipeline**: composable decode/encode stages driven by
//!   `/Filter` and `/DecodeParms` (Flate, LZW, ASCII85, ASCIIHex,
//!   RunLength, PNG/TIFF predictors; image codecs pass through).
//! - **Writing**: complete rewrites, and byte-preserving incremental
//!   updates that append a revision while keeping the original bytes
//!   verbatim.
//!
//! ## Quick start
//!
//! ```
//! use pdf_mend::{Document, LoadOptions, Object, SaveOptions};
//!
//! # fn main() -> Result<(), pdf_mend::Error> {
//! # let bytes: Vec<u8> = pdf_mend::doc_fixture();
//! let mut doc = Document::load(bytes, LoadOptions::default())?;
//! println!("PDF version {}", doc.version_string());
//! println!("{} pages", doc.page_count()?);
//!
//! // Mutate the catalog and append an incremental revision
//! let root = doc.catalog_ref()?;
//! let mut catalog = doc.catalog()?;
//! catalog
//!     .as_dict_mut()
//!     .expect("catalog is a dictionary")
//!     .insert("ModDate".to_string(), Object::text_string("D:20240101000000Z"));
//! doc.update(root, catalog)?;
//!
//! let saved = doc.save(&SaveOptions {
//!     incremental: true,
//!     ..Default::default()
//! })?;
//! # assert!(saved.len() > 0);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

// Error handling
pub mod error;

// Core parsing
pub mod indirect;
pub mod lexer;
pub mod object;
pub mod objstm;
pub mod parser;
pub mod recovery;
pub mod scanner;
pub mod xref;

// Object identity and documents
pub mod crypt;
pub mod document;
pub mod registry;

// Stream filters
pub mod decoders;

// Output
pub mod writer;

pub use crypt::{AuthResult, Credentials, Permissions, SecurityHandler};
pub use document::{Document, LoadOptions};
pub use error::{Error, Result};
pub use object::{Dict, Object, ObjectRef, StringFormat};
pub use registry::ObjectRegistry;
pub use writer::{SaveOptions, verify_incremental};

/// Minimal well-formed PDF bytes for doctests.
#[doc(hidden)]
pub fn doc_fixture() -> Vec<u8> {
    let body = [
        (1u32, "<< /Type /Catalog /Pages 2 0 R >>"),
        (2u32, "<< /Type /Pages /Kids [] /Count 0 >>"),
    ];
    let mut out = Vec::new();
    out.extend_from_slice(b"%PDF-1.4\n%\x80\x81\x82\x83\n");
    let mut offsets = Vec::new();
    for &(id, text) in &body {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", id, text).as_bytes());
    }
    let xref_at = out.len();
    out.extend_from_slice(b"xref\n0 3\n0000000000 65535 f\r\n");
    for offset in offsets {
        out.extend_from_slice(format!("{:010} 00000 n\r\n", offset).as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size 3 /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            xref_at
        )
        .as_bytes(),
    );
    out
}

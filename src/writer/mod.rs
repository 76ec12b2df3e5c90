//! PDF output: object serialization, the byte writer primitive, and the
//! complete / incremental document writers.

mod byte_writer;
mod pdf_writer;
mod serializer;

pub use byte_writer::ByteWriter;
pub use pdf_writer::{PdfWriter, SaveOptions, SaveResult, verify_incremental};
pub use serializer::{serialize, write_indirect, write_object};

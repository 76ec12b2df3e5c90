//! JBIG2Decode (bi-level image compression).
//!
//! Pass-through like the other image codecs.

use crate::decoders::{DecodeParams, StreamFilter};
use crate::error::Result;

/// JBIG2Decode filter (pass-through).
pub struct Jbig2Filter;

impl StreamFilter for Jbig2Filter {
    fn decode(&self, input: &[u8], _params: &DecodeParams) -> Result<Vec<u8>> {
        log::debug!("JBIG2Decode: passing through {} bytes", input.len());
        Ok(input.to_vec())
    }

    fn name(&self) -> &'static str {
        "JBIG2Decode"
    }
}

//! CCITTFaxDecode (Group 3/4 fax compression).
//!
//! Like the other image codecs, fax payloads pass through unchanged; image
//! consumers decode them with their `/DecodeParms` in hand.

use crate::decoders::{DecodeParams, StreamFilter};
use crate::error::Result;

/// CCITTFaxDecode filter (pass-through).
pub struct CcittFaxFilter;

impl StreamFilter for CcittFaxFilter {
    fn decode(&self, input: &[u8], _params: &DecodeParams) -> Result<Vec<u8>> {
        log::debug!("CCITTFaxDecode: passing through {} bytes", input.len());
        Ok(input.to_vec())
    }

    fn name(&self) -> &'static str {
        "CCITTFaxDecode"
    }
}

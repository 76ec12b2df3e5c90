//! DCTDecode (JPEG).
//!
//! JPEG payloads are consumed by image pipelines, not by the object layer,
//! so the pipeline hands the bytes through unchanged in both directions.

use crate::decoders::{DecodeParams, StreamFilter};
use crate::error::Result;

/// DCTDecode filter (pass-through).
pub struct DctFilter;

impl StreamFilter for DctFilter {
    fn decode(&self, input: &[u8], _params: &DecodeParams) -> Result<Vec<u8>> {
        log::debug!("DCTDecode: passing through {} bytes of JPEG data", input.len());
        Ok(input.to_vec())
    }

    fn name(&self) -> &'static str {
        "DCTDecode"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passthrough() {
        let jpeg_start = [0xFF, 0xD8, 0xFF, 0xE0];
        let params = DecodeParams::from_dict(None);
        assert_eq!(DctFilter.decode(&jpeg_start, &params).unwrap(), jpeg_start);
        assert_eq!(DctFilter.encode(&jpeg_start).unwrap(), jpeg_start);
    }
}

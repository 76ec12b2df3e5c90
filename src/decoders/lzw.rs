//! LZWDecode (PDF 32000-1:2008, 7.4.4).
//!
//! PDF LZW uses MSB-first bit order with 8-bit symbols, clear code 256 and
//! EOD 257. With the default `/EarlyChange 1` the code width grows one code
//! earlier than plain LZW, which is exactly TIFF's behavior.

use crate::decoders::{DecodeParams, StreamFilter};
use crate::error::{Error, Result};
use weezl::{BitOrder, decode::Decoder};

/// LZWDecode filter (decode-only).
pub struct LzwFilter;

impl StreamFilter for LzwFilter {
    fn decode(&self, input: &[u8], params: &DecodeParams) -> Result<Vec<u8>> {
        let mut decoder = if params.early_change {
            Decoder::with_tiff_size_switch(BitOrder::Msb, 8)
        } else {
            Decoder::new(BitOrder::Msb, 8)
        };
        decoder
            .decode(input)
            .map_err(|e| Error::Decode(format!("LZWDecode failed: {:?}", e)))
    }

    fn name(&self) -> &'static str {
        "LZWDecode"
    }
}

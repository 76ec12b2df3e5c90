//! FlateDecode (zlib/deflate), the workhorse PDF filter.

use crate::decoders::{DecodeParams, StreamFilter};
use crate::error::{Error, Result};
use flate2::Compression;
use flate2::read::{DeflateDecoder, ZlibDecoder};
use flate2::write::ZlibEncoder;
use std::io::{Read, Write};

/// FlateDecode filter.
pub struct FlateFilter;

impl StreamFilter for FlateFilter {
    fn decode(&self, input: &[u8], _params: &DecodeParams) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        match ZlibDecoder::new(input).read_to_end(&mut output) {
            Ok(_) => Ok(output),
            Err(e) => {
                // Partial recovery: keep whatever decoded before corruption
                if !output.is_empty() {
                    log::warn!(
                        "FlateDecode recovered {} bytes before corruption: {}",
                        output.len(),
                        e
                    );
                    return Ok(output);
                }

                // Some generators emit raw deflate with a broken or missing
                // zlib header
                output.clear();
                if DeflateDecoder::new(input).read_to_end(&mut output).is_ok() && !output.is_empty()
                {
                    log::info!("FlateDecode fell back to raw deflate ({} bytes)", output.len());
                    return Ok(output);
                }
                if input.len() > 2 {
                    output.clear();
                    if DeflateDecoder::new(&input[2..]).read_to_end(&mut output).is_ok()
                        && !output.is_empty()
                    {
                        log::info!(
                            "FlateDecode skipped corrupt zlib header ({} bytes)",
                            output.len()
                        );
                        return Ok(output);
                    }
                }

                Err(Error::Decode(format!("FlateDecode failed: {}", e)))
            },
        }
    }

    fn encode(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(input)
            .and_then(|_| encoder.finish())
            .map_err(|e| Error::Decode(format!("FlateDecode encoding failed: {}", e)))
    }

    fn name(&self) -> &'static str {
        "FlateDecode"
    }
}

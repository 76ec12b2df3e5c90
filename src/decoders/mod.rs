//! Stream filter pipeline.
//!
//! Stages are named by `/Filter` (single name or array) and parameterized by
//! the positionally paired `/DecodeParms`. Decoding applies the stages in
//! listed order, each followed by its predictor pass when one is declared.
//! Encoding runs the chain in reverse; it is symmetric for `FlateDecode` and
//! the ASCII filters, while the image codecs (`DCTDecode`, `CCITTFaxDecode`,
//! `JBIG2Decode`) pass through untouched in both directions — their payloads
//! belong to image pipelines outside this crate.

use crate::error::{Error, Result};
use crate::object::{Dict, FilterSpec, Object};

mod ascii85;
mod ascii_hex;
mod ccitt;
mod dct;
mod flate;
mod jbig2;
mod lzw;
mod predictor;
mod runlength;

pub use ascii85::Ascii85Filter;
pub use ascii_hex::AsciiHexFilter;
pub use ccitt::CcittFaxFilter;
pub use dct::DctFilter;
pub use flate::FlateFilter;
pub use jbig2::Jbig2Filter;
pub use lzw::LzwFilter;
pub use predictor::{DecodeParams, apply_predictor};
pub use runlength::RunLengthFilter;

/// Decompression bomb guards: output growth and absolute size caps.
const MAX_DECOMPRESSION_RATIO: u64 = 100;
const MAX_DECOMPRESSED_SIZE: usize = 100 * 1024 * 1024;

/// One stream filter stage.
pub trait StreamFilter {
    /// Decode the input data.
    fn decode(&self, input: &[u8], params: &DecodeParams) -> Result<Vec<u8>>;

    /// Encode data for this filter. Decode-only filters hand the input
    /// through unchanged.
    fn encode(&self, input: &[u8]) -> Result<Vec<u8>> {
        Ok(input.to_vec())
    }

    /// The filter's `/Filter` name.
    fn name(&self) -> &'static str;
}

/// Look up a filter implementation by its `/Filter` name.
pub fn filter_by_name(name: &str) -> Result<Box<dyn StreamFilter>> {
    match name {
        "FlateDecode" => Ok(Box::new(FlateFilter)),
        "LZWDecode" => Ok(Box::new(LzwFilter)),
        "ASCIIHexDecode" => Ok(Box::new(AsciiHexFilter)),
        "ASCII85Decode" => Ok(Box::new(Ascii85Filter)),
        "RunLengthDecode" => Ok(Box::new(RunLengthFilter)),
        "DCTDecode" => Ok(Box::new(DctFilter)),
        "CCITTFaxDecode" => Ok(Box::new(CcittFaxFilter)),
        "JBIG2Decode" => Ok(Box::new(Jbig2Filter)),
        other => Err(Error::UnsupportedFilter(other.to_string())),
    }
}

/// Decode raw stream bytes through a filter chain.
pub fn decode_chain(data: &[u8], chain: &[FilterSpec]) -> Result<Vec<u8>> {
    let compressed_len = data.len().max(1) as u64;
    let mut current = data.to_vec();

    for spec in chain {
        let filter = filter_by_name(&spec.name)?;
        let params = DecodeParams::from_dict(spec.parms.as_ref());

        current = filter.decode(&current, &params)?;
        if params.predictor > 1 {
            current = apply_predictor(&current, &params)?;
        }

        // Growth guards after every stage
        if current.len() as u64 / compressed_len > MAX_DECOMPRESSION_RATIO {
            return Err(Error::Decode(format!(
                "decompression ratio exceeds {}:1 ({} bytes from {})",
                MAX_DECOMPRESSION_RATIO,
                current.len(),
                data.len()
            )));
        }
        if current.len() > MAX_DECOMPRESSED_SIZE {
            return Err(Error::Decode(format!(
                "decompressed size {} exceeds {} byte limit",
                current.len(),
                MAX_DECOMPRESSED_SIZE
            )));
        }
    }

    Ok(current)
}

/// Encode data for a filter chain. Stages run in reverse of decode order so
/// that decoding the result with the same chain restores the input.
pub fn encode_chain(data: &[u8], chain: &[FilterSpec]) -> Result<Vec<u8>> {
    let mut current = data.to_vec();
    for spec in chain.iter().rev() {
        let filter = filter_by_name(&spec.name)?;
        current = filter.encode(&current)?;
    }
    Ok(current)
}

/// Deflate-compress data and describe it: the writer uses this to compress
/// filterless streams on save.
pub fn flate_compress(data: &[u8]) -> Result<(Vec<u8>, Object)> {
    let encoded = FlateFilter.encode(data)?;
    Ok((encoded, Object::name("FlateDecode")))
}

/// Build an always-usable [`DecodeParams`] from an optional `/DecodeParms`
/// dictionary.
impl DecodeParams {
    /// Read predictor and LZW parameters, defaulting per the PDF spec.
    pub fn from_dict(dict: Option<&Dict>) -> Self {
        let get = |key: &str, default: i64| {
            dict.and_then(|d| d.get(key))
                .and_then(Object::as_i64)
                .unwrap_or(default)
        };
        Self {
            predictor: get("Predictor", 1).clamp(1, 15) as u8,
            colors: get("Colors", 1).clamp(1, 64) as usize,
            bits_per_component: get("BitsPerComponent", 8).clamp(1, 16) as usize,
            columns: get("Columns", 1).clamp(1, 1 << 24) as usize,
            early_change: get("EarlyChange", 1) != 0,
        }
    }
}

//! ASCIIHexDecode: pairs of hex digits, `>` as EOD.

use crate::decoders::{DecodeParams, StreamFilter};
use crate::error::{Error, Result};

/// ASCIIHexDecode filter.
pub struct AsciiHexFilter;

impl StreamFilter for AsciiHexFilter {
    fn decode(&self, input: &[u8], _params: &DecodeParams) -> Result<Vec<u8>> {
        let mut digits = Vec::with_capacity(input.len());
        for &b in input {
            match b {
                b'>' => break,
                b if b.is_ascii_hexdigit() => digits.push(b),
                b if crate::lexer::is_whitespace(b) => {},
                other => {
                    return Err(Error::Decode(format!(
                        "ASCIIHexDecode: invalid byte 0x{:02x}",
                        other
                    )));
                },
            }
        }

        // An odd final digit is padded with zero
        if digits.len() % 2 == 1 {
            digits.push(b'0');
        }

        let mut output = Vec::with_capacity(digits.len() / 2);
        for pair in digits.chunks(2) {
            let hi = (pair[0] as char).to_digit(16).expect("hex digit") as u8;
            let lo = (pair[1] as char).to_digit(16).expect("hex digit") as u8;
            output.push(hi << 4 | lo);
        }
        Ok(output)
    }

    fn encode(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::with_capacity(input.len() * 2 + 1);
        for b in input {
            output.extend_from_slice(format!("{:02X}", b).as_bytes());
        }
        output.push(b'>');
        Ok(output)
    }

    fn name(&self) -> &'static str {
        "ASCIIHexDecode"
    }
}

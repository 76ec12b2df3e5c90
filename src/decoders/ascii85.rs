//! ASCII85Decode: 4 binary bytes as 5 characters in `!`..`u`, with the `z`
//! shorthand for an all-zero group and `~>` as EOD.

use crate::decoders::{DecodeParams, StreamFilter};
use crate::error::{Error, Result};

/// ASCII85Decode filter.
pub struct Ascii85Filter;

impl StreamFilter for Ascii85Filter {
    fn decode(&self, input: &[u8], _params: &DecodeParams) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        let mut acc: u32 = 0;
        let mut count = 0usize;

        for &byte in input {
            match byte {
                b'~' => break,
                b'z' if count == 0 => output.extend_from_slice(&[0, 0, 0, 0]),
                b'z' => {
                    return Err(Error::Decode(
                        "ASCII85Decode: 'z' inside a group".to_string(),
                    ));
                },
                b'!'..=b'u' => {
                    acc = acc
                        .checked_mul(85)
                        .and_then(|v| v.checked_add((byte - b'!') as u32))
                        .ok_or_else(|| Error::Decode("ASCII85Decode: group overflow".to_string()))?;
                    count += 1;
                    if count == 5 {
                        output.extend_from_slice(&acc.to_be_bytes());
                        acc = 0;
                        count = 0;
                    }
                },
                b if crate::lexer::is_whitespace(b) => {},
                other => {
                    return Err(Error::Decode(format!(
                        "ASCII85Decode: invalid byte 0x{:02x}",
                        other
                    )));
                },
            }
        }

        // Final partial group: pad with 'u', emit count-1 bytes
        if count == 1 {
            return Err(Error::Decode("ASCII85Decode: dangling final digit".to_string()));
        }
        if count > 1 {
            for _ in count..5 {
                acc = acc
                    .checked_mul(85)
                    .and_then(|v| v.checked_add(84))
                    .ok_or_else(|| Error::Decode("ASCII85Decode: group overflow".to_string()))?;
            }
            output.extend_from_slice(&acc.to_be_bytes()[..count - 1]);
        }

        Ok(output)
    }

    fn encode(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::with_capacity(input.len() / 4 * 5 + 8);

        let mut chunks = input.chunks_exact(4);
        for group in &mut chunks {
            let value = u32::from_be_bytes([group[0], group[1], group[2], group[3]]);
            if value == 0 {
                output.push(b'z');
                continue;
            }
            output.extend_from_slice(&to_base85(value));
        }

        let tail = chunks.remainder();
        if !tail.is_empty() {
            let mut group = [0u8; 4];
            group[..tail.len()].copy_from_slice(tail);
            let value = u32::from_be_bytes(group);
            // A partial group is never abbreviated to 'z'
            output.extend_from_slice(&to_base85(value)[..tail.len() + 1]);
        }

        output.extend_from_slice(b"~>");
        Ok(output)
    }

    fn name(&self) -> &'static str {
        "ASCII85Decode"
    }
}

fn to_base85(mut value: u32) -> [u8; 5] {
    let mut digits = [0u8; 5];
    for slot in digits.iter_mut().rev() {
        *slot = (value % 85) as u8 + b'!';
        value /= 85;
    }
    digits
}

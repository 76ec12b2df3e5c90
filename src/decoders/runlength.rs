//! RunLengthDecode: length byte 0..=127 copies N+1 literal bytes,
//! 129..=255 repeats the next byte 257-N times, 128 is EOD.

use crate::decoders::{DecodeParams, StreamFilter};
use crate::error::{Error, Result};

/// RunLengthDecode filter (decode-only).
pub struct RunLengthFilter;

impl StreamFilter for RunLengthFilter {
    fn decode(&self, input: &[u8], _params: &DecodeParams) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        let mut i = 0;

        while i < input.len() {
            let length = input[i];
            i += 1;

            match length {
                0..=127 => {
                    let count = length as usize + 1;
                    if i + count > input.len() {
                        return Err(Error::Decode(format!(
                            "RunLengthDecode: literal run of {} bytes exceeds input",
                            count
                        )));
                    }
                    output.extend_from_slice(&input[i..i + count]);
                    i += count;
                },
                128 => break,
                129..=255 => {
                    let count = 257 - length as usize;
                    let Some(&byte) = input.get(i) else {
                        return Err(Error::Decode(
                            "RunLengthDecode: missing byte for repeat run".to_string(),
                        ));
                    };
                    i += 1;
                    output.resize(output.len() + count, byte);
                },
            }
        }

        Ok(output)
    }

    fn name(&self) -> &'static str {
        "RunLengthDecode"
    }
}

//! Predictor post-processing for FlateDecode and LZWDecode
//! (PDF 32000-1:2008, 7.4.4.4).
//!
//! Predictor 2 is the TIFF horizontal differencing predictor; predictors
//! 10..=15 are the PNG row filters, where every row carries its own filter
//! type byte regardless of the declared predictor value.

use crate::error::{Error, Result};

/// Parameters from `/DecodeParms` driving predictors and LZW.
#[derive(Debug, Clone, Copy)]
pub struct DecodeParams {
    /// `/Predictor`: 1 none, 2 TIFF, 10..=15 PNG
    pub predictor: u8,
    /// `/Colors`: samples per pixel
    pub colors: usize,
    /// `/BitsPerComponent`
    pub bits_per_component: usize,
    /// `/Columns`: pixels per row
    pub columns: usize,
    /// `/EarlyChange` for LZWDecode
    pub early_change: bool,
}

/// Undo the declared predictor over decoded data.
pub fn apply_predictor(data: &[u8], params: &DecodeParams) -> Result<Vec<u8>> {
    match params.predictor {
        1 => Ok(data.to_vec()),
        2 => tiff_predictor(data, params),
        10..=15 => png_predictor(data, params),
        other => Err(Error::Decode(format!("unsupported predictor {}", other))),
    }
}

/// Bytes a full pixel occupies, minimum 1.
fn bytes_per_pixel(params: &DecodeParams) -> usize {
    (params.colors * params.bits_per_component).div_ceil(8).max(1)
}

/// Bytes in one row of samples.
fn row_len(params: &DecodeParams) -> usize {
    (params.colors * params.bits_per_component * params.columns).div_ceil(8)
}

/// TIFF predictor 2: each sample is stored as a delta against the sample
/// one pixel to its left. Only 8-bit components are handled.
fn tiff_predictor(data: &[u8], params: &DecodeParams) -> Result<Vec<u8>> {
    if params.bits_per_component != 8 {
        return Err(Error::Decode(format!(
            "TIFF predictor with {} bits per component is not supported",
            params.bits_per_component
        )));
    }

    let row = row_len(params);
    let colors = params.colors;
    let mut output = data.to_vec();

    for row_start in (0..output.len()).step_by(row.max(1)) {
        let row_end = (row_start + row).min(output.len());
        for i in row_start + colors..row_end {
            output[i] = output[i].wrapping_add(output[i - colors]);
        }
    }
    Ok(output)
}

/// PNG row filters: None, Sub, Up, Average, Paeth, selected per row by the
/// leading filter type byte.
fn png_predictor(data: &[u8], params: &DecodeParams) -> Result<Vec<u8>> {
    let row = row_len(params);
    if row == 0 {
        return Ok(Vec::new());
    }
    let bpp = bytes_per_pixel(params);
    let stride = row + 1;

    if data.len() % stride != 0 {
        log::warn!(
            "PNG predictor data length {} is not a multiple of row stride {}",
            data.len(),
            stride
        );
    }

    let rows = data.len() / stride;
    let mut output = Vec::with_capacity(rows * row);
    let mut previous = vec![0u8; row];

    for r in 0..rows {
        let filter = data[r * stride];
        let line = &data[r * stride + 1..r * stride + stride];
        let mut current = line.to_vec();

        match filter {
            0 => {},
            1 => {
                for i in bpp..row {
                    current[i] = current[i].wrapping_add(current[i - bpp]);
                }
            },
            2 => {
                for i in 0..row {
                    current[i] = current[i].wrapping_add(previous[i]);
                }
            },
            3 => {
                for i in 0..row {
                    let left = if i >= bpp { current[i - bpp] as u16 } else { 0 };
                    let up = previous[i] as u16;
                    current[i] = current[i].wrapping_add(((left + up) / 2) as u8);
                }
            },
            4 => {
                for i in 0..row {
                    let left = if i >= bpp { current[i - bpp] } else { 0 };
                    let up = previous[i];
                    let up_left = if i >= bpp { previous[i - bpp] } else { 0 };
                    current[i] = current[i].wrapping_add(paeth(left, up, up_left));
                }
            },
            other => {
                return Err(Error::Decode(format!("invalid PNG filter type {}", other)));
            },
        }

        output.extend_from_slice(&current);
        previous = current;
    }

    Ok(output)
}

/// Paeth predictor function (PNG specification, 9.4).
fn paeth(a: u8, b: u8, c: u8) -> u8 {
    let p = a as i16 + b as i16 - c as i16;
    let pa = (p - a as i16).abs();
    let pb = (p - b as i16).abs();
    let pc = (p - c as i16).abs();
    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(predictor: u8, colors: usize, columns: usize) -> DecodeParams {
        DecodeParams {
            predictor,
            colors,
            bits_per_component: 8,
            columns,
            early_change: true,
        }
    }

    #[test]
    fn test_predictor_none() {
        let data = [1, 2, 3, 4];
        assert_eq!(apply_predictor(&data, &params(1, 1, 4)).unwrap(), data);
    }

    #[test]
    fn test_png_up_filter() {
        // Two rows of 3 columns, second row is deltas against the first
        let data = [
            0, 10, 20, 30, // row 0, filter None
            2, 1, 1, 1, // row 1, filter Up
        ];
        let decoded = apply_predictor(&data, &params(12, 1, 3)).unwrap();
        assert_eq!(decoded, vec![10, 20, 30, 11, 21, 31]);
    }

    #[test]
    fn test_png_sub_filter() {
        let data = [1, 5, 3, 3]; // filter Sub: 5, 8, 11
        let decoded = apply_predictor(&data, &params(10, 1, 3)).unwrap();
        assert_eq!(decoded, vec![5, 8, 11]);
    }

    #[test]
    fn test_png_average_filter() {
        let data = [
            0, 10, 10, // row 0
            3, 5, 10, // row 1: avg(left, up)
        ];
        let decoded = apply_predictor(&data, &params(11, 1, 2)).unwrap();
        // col0: 5 + (0+10)/2 = 10; col1: 10 + (10+10)/2 = 20
        assert_eq!(decoded, vec![10, 10, 10, 20]);
    }

    #[test]
    fn test_png_paeth_filter() {
        let data = [
            0, 10, 20, // row 0
            4, 1, 2, // row 1, Paeth
        ];
        let decoded = apply_predictor(&data, &params(14, 1, 2)).unwrap();
        // col0: paeth(0,10,0)=10 -> 11; col1: paeth(11,20,10) -> p=21,
        // pa=10, pb=1, pc=11 -> up=20 -> 22
        assert_eq!(decoded, vec![10, 20, 11, 22]);
    }

    #[test]
    fn test_tiff_predictor_rgb() {
        // One row, two RGB pixels; second pixel stored as deltas
        let data = [100, 110, 120, 5, 6, 7];
        let decoded = apply_predictor(&data, &params(2, 3, 2)).unwrap();
        assert_eq!(decoded, vec![100, 110, 120, 105, 116, 127]);
    }

    #[test]
    fn test_invalid_png_filter_type() {
        let data = [9, 1, 2, 3];
        assert!(apply_predictor(&data, &params(12, 1, 3)).is_err());
    }

    #[test]
    fn test_xref_stream_style_rows() {
        // Predictor 12, columns = 4 (a typical /W [1 2 1] xref stream)
        let rows = [
            [1u8, 0, 0x10, 0],
            [1, 0, 0x20, 0],
            [1, 0, 0x30, 0],
        ];
        // Encode with Up filter manually
        let mut encoded = Vec::new();
        let mut prev = [0u8; 4];
        for row in rows {
            encoded.push(2);
            for i in 0..4 {
                encoded.push(row[i].wrapping_sub(prev[i]));
            }
            prev = row;
        }
        let decoded = apply_predictor(&encoded, &params(12, 1, 4)).unwrap();
        assert_eq!(decoded, rows.concat());
    }
}

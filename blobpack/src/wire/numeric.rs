//! Numeric header + raw bytes, the payload behind `00nmpy_` and `00npdf_`.

use crate::error::{PackError, Result};
use crate::types::{DType, NdArray, ValueKind};

/// UTF-8 for `§`, the header section separator.
const SECTION: [u8; 2] = [0xc2, 0xa7];
const DIM_WIDTH: usize = 4;

pub(crate) fn encode(arr: &NdArray) -> Result<Vec<u8>> {
    if arr.data().len() != arr.len() * arr.dtype().size() {
        return Err(PackError::Malformed(String::from(
            "array buffer does not match its shape",
        )));
    }

    let mut rest = Vec::new();
    rest.extend_from_slice(&SECTION);
    rest.extend_from_slice(arr.ndim().to_string().as_bytes());
    rest.extend_from_slice(&SECTION);
    rest.extend_from_slice(arr.dtype().name().as_bytes());
    rest.extend_from_slice(&SECTION);
    for &dim in arr.shape() {
        let dim = u32::try_from(dim).map_err(|_| PackError::Unsupported {
            kind: ValueKind::Array,
            reason: format!("dimension extent {dim} exceeds the 4-byte limit"),
        })?;
        rest.extend_from_slice(&dim.to_le_bytes());
    }

    let mut out = rest.len().to_string().into_bytes();
    out.extend_from_slice(&rest);
    out.extend_from_slice(arr.data());
    Ok(out)
}

pub(crate) fn decode(payload: &[u8]) -> Result<NdArray> {
    /* decimal length of the rest of the header */
    let mut digits_end = 0;
    while digits_end < payload.len() && payload[digits_end].is_ascii_digit() {
        digits_end += 1;
    }
    if digits_end == 0 {
        return Err(PackError::Malformed(String::from(
            "numeric header is missing its length prefix",
        )));
    }
    let rest_len: usize = std::str::from_utf8(&payload[..digits_end])
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| {
            PackError::Malformed(String::from("numeric header length prefix is not decimal"))
        })?;
    let header_end = digits_end
        .checked_add(rest_len)
        .filter(|&end| end <= payload.len())
        .ok_or_else(|| PackError::Malformed(String::from("truncated numeric header")))?;

    /* §ndims§dtype§shape */
    let rest = &payload[digits_end..header_end];
    let rest = rest.strip_prefix(&SECTION[..]).ok_or_else(|| {
        PackError::Malformed(String::from("numeric header is missing its section mark"))
    })?;
    let (ndims_ascii, rest) = split_section(rest)?;
    let (dtype_ascii, shape_bytes) = split_section(rest)?;

    let ndims: usize = std::str::from_utf8(ndims_ascii)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| {
            PackError::Malformed(String::from("numeric header dimension count is not decimal"))
        })?;
    let dtype_name = std::str::from_utf8(dtype_ascii).map_err(|_| {
        PackError::Malformed(String::from("numeric header dtype is not ASCII"))
    })?;
    let dtype = DType::parse(dtype_name.trim_end()).ok_or_else(|| {
        PackError::Malformed(format!("unknown dtype {dtype_name:?} in numeric header"))
    })?;
    if shape_bytes.len() != ndims * DIM_WIDTH {
        return Err(PackError::Malformed(format!(
            "numeric header shape section holds {} bytes, {ndims} dimensions require {}",
            shape_bytes.len(),
            ndims * DIM_WIDTH
        )));
    }
    let shape = shape_bytes
        .chunks_exact(DIM_WIDTH)
        .map(|chunk| {
            let mut raw = [0u8; DIM_WIDTH];
            raw.copy_from_slice(chunk);
            u32::from_le_bytes(raw) as usize
        })
        .collect::<Vec<_>>();

    NdArray::from_raw_parts(dtype, shape, payload[header_end..].to_vec())
}

fn split_section(buf: &[u8]) -> Result<(&[u8], &[u8])> {
    buf.windows(SECTION.len())
        .position(|window| window == SECTION)
        .map(|at| (&buf[..at], &buf[at + SECTION.len()..]))
        .ok_or_else(|| {
            PackError::Malformed(String::from("numeric header is missing a section mark"))
        })
}

#[cfg(test)]
mod test {
    use super::{decode, encode};
    use crate::error::PackError;
    use crate::types::{DType, NdArray};
    use anyhow::Result;

    #[test]
    fn header_layout_is_stable() -> Result<()> {
        let arr = NdArray::from_vec(vec![1u8, 2, 3]);
        let payload = encode(&arr)?;
        assert_eq!(
            payload,
            b"16\xc2\xa71\xc2\xa7uint8\xc2\xa7\x03\x00\x00\x00\x01\x02\x03"
        );
        Ok(())
    }

    #[test]
    fn two_dim_floats_round_trip_bit_exactly() -> Result<()> {
        let arr = NdArray::from_shape_vec(
            vec![2, 2],
            vec![1.0f64, 2.0 / 3.0, f64::NAN, 5.0],
        )?;
        let decoded = decode(&encode(&arr)?)?;
        assert_eq!(decoded, arr);
        assert_eq!(decoded.dtype(), DType::F64);
        assert_eq!(decoded.shape(), &[2, 2]);
        Ok(())
    }

    #[test]
    fn empty_and_one_dim_arrays_round_trip() -> Result<()> {
        for arr in [
            NdArray::from_vec(Vec::<i64>::new()),
            NdArray::from_vec(vec![true, false, true]),
            NdArray::from_vec(vec![-1i32, 0, i32::MAX]),
        ] {
            assert_eq!(decode(&encode(&arr)?)?, arr);
        }
        Ok(())
    }

    #[test]
    fn malformed_headers_are_rejected() -> Result<()> {
        let arr = NdArray::from_vec(vec![7i64; 4]);
        let payload = encode(&arr)?;

        for bad in [
            &b"\xc2\xa71\xc2\xa7int64\xc2\xa7"[..], // no length prefix
            &payload[..payload.len() - 1],          // truncated data
            &payload[..4],                          // truncated header
            &b"16\xc2\xa71\xc2\xa7nosuch\xc2\xa7\x04\x00\x00\x00"[..], // unknown dtype
        ] {
            assert!(matches!(decode(bad), Err(PackError::Malformed(_))));
        }
        Ok(())
    }
}

use crate::error::{PackError, Result};
use crate::types::ValueKind;
use serde::{Deserialize, Serialize};

/// Fixed-width element types a numeric buffer may hold.
///
/// Names follow the conventional dtype vocabulary (`"int64"`,
/// `"float32"`, ...) because they travel as ASCII inside the numeric
/// header.
#[derive(PartialEq, Eq, Clone, Copy, Hash, Debug, Serialize, Deserialize)]
pub enum DType {
    Bool,
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
}

impl DType {
    pub fn name(&self) -> &'static str {
        match self {
            DType::Bool => "bool",
            DType::I8 => "int8",
            DType::U8 => "uint8",
            DType::I16 => "int16",
            DType::U16 => "uint16",
            DType::I32 => "int32",
            DType::U32 => "uint32",
            DType::I64 => "int64",
            DType::U64 => "uint64",
            DType::F32 => "float32",
            DType::F64 => "float64",
        }
    }

    pub fn parse(name: &str) -> Option<DType> {
        let dtype = match name {
            "bool" => DType::Bool,
            "int8" => DType::I8,
            "uint8" => DType::U8,
            "int16" => DType::I16,
            "uint16" => DType::U16,
            "int32" => DType::I32,
            "uint32" => DType::U32,
            "int64" => DType::I64,
            "uint64" => DType::U64,
            "float32" => DType::F32,
            "float64" => DType::F64,
            _ => return None,
        };
        Some(dtype)
    }

    /// Element width in bytes.
    pub fn size(&self) -> usize {
        match self {
            DType::Bool | DType::I8 | DType::U8 => 1,
            DType::I16 | DType::U16 => 2,
            DType::I32 | DType::U32 | DType::F32 => 4,
            DType::I64 | DType::U64 | DType::F64 => 8,
        }
    }
}

mod private {
    pub trait Sealed {}
}

/// Rust scalar types storable in an [`NdArray`].
pub trait Element: Copy + private::Sealed {
    const DTYPE: DType;
    fn write_le(self, buf: &mut Vec<u8>);
    fn read_le(buf: &[u8]) -> Self;
}

macro_rules! impl_element {
    ($ty:ty, $dtype:expr, $size:literal) => {
        impl private::Sealed for $ty {}
        impl Element for $ty {
            const DTYPE: DType = $dtype;
            fn write_le(self, buf: &mut Vec<u8>) {
                buf.extend_from_slice(&self.to_le_bytes());
            }
            fn read_le(buf: &[u8]) -> Self {
                let mut raw = [0u8; $size];
                raw.copy_from_slice(&buf[..$size]);
                <$ty>::from_le_bytes(raw)
            }
        }
    };
}

impl_element!(i8, DType::I8, 1);
impl_element!(u8, DType::U8, 1);
impl_element!(i16, DType::I16, 2);
impl_element!(u16, DType::U16, 2);
impl_element!(i32, DType::I32, 4);
impl_element!(u32, DType::U32, 4);
impl_element!(i64, DType::I64, 8);
impl_element!(u64, DType::U64, 8);
impl_element!(f32, DType::F32, 4);
impl_element!(f64, DType::F64, 8);

impl private::Sealed for bool {}
impl Element for bool {
    const DTYPE: DType = DType::Bool;
    fn write_le(self, buf: &mut Vec<u8>) {
        buf.push(self as u8);
    }
    fn read_le(buf: &[u8]) -> Self {
        buf[0] != 0
    }
}

/// A homogeneous, fixed-shape numeric buffer.
///
/// Elements are stored little-endian; equality is byte equality, so a
/// round trip preserves every bit, NaN payloads included.
#[derive(PartialEq, Clone, Debug, Serialize, Deserialize)]
pub struct NdArray {
    dtype: DType,
    shape: Vec<usize>,
    data: Vec<u8>,
}

impl NdArray {
    /// 1-D array over `elems`.
    pub fn from_vec<T: Element>(elems: Vec<T>) -> NdArray {
        let mut data = Vec::with_capacity(elems.len() * T::DTYPE.size());
        for elem in &elems {
            elem.write_le(&mut data);
        }
        NdArray {
            dtype: T::DTYPE,
            shape: vec![elems.len()],
            data,
        }
    }

    /// Multi-dimensional array over `elems` in row-major order.
    pub fn from_shape_vec<T: Element>(shape: Vec<usize>, elems: Vec<T>) -> Result<NdArray> {
        let expected: usize = shape.iter().product();
        if expected != elems.len() {
            return Err(PackError::Unsupported {
                kind: ValueKind::Array,
                reason: format!(
                    "shape {:?} covers {} elements, got {}",
                    shape,
                    expected,
                    elems.len()
                ),
            });
        }
        let mut arr = NdArray::from_vec(elems);
        arr.shape = shape;
        Ok(arr)
    }

    pub(crate) fn from_raw_parts(dtype: DType, shape: Vec<usize>, data: Vec<u8>) -> Result<NdArray> {
        let required = shape
            .iter()
            .try_fold(dtype.size(), |acc, &dim| acc.checked_mul(dim))
            .ok_or_else(|| {
                PackError::Malformed(format!("shape {shape:?} overflows the addressable size"))
            })?;
        if required != data.len() {
            return Err(PackError::Malformed(format!(
                "array buffer holds {} bytes, shape {:?} of {} requires {}",
                data.len(),
                shape,
                dtype.name(),
                required
            )));
        }
        Ok(NdArray { dtype, shape, data })
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Total element count.
    pub fn len(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Elements in row-major order, or `None` when `T` is not this array's
    /// dtype.
    pub fn to_vec<T: Element>(&self) -> Option<Vec<T>> {
        if self.dtype != T::DTYPE {
            return None;
        }
        let size = self.dtype.size();
        let out = self
            .data
            .chunks_exact(size)
            .map(|chunk| T::read_le(chunk))
            .collect();
        Some(out)
    }

    pub(crate) fn data(&self) -> &[u8] {
        &self.data
    }
}

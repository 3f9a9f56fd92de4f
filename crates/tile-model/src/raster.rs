//! Numeric element types and 2-D raster payloads.

use crate::error::{ModelError, ModelResult};
use num_traits::AsPrimitive;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Element type of a band variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float32,
    Float64,
}

impl DType {
    pub const ALL: [DType; 10] = [
        DType::Int8,
        DType::UInt8,
        DType::Int16,
        DType::UInt16,
        DType::Int32,
        DType::UInt32,
        DType::Int64,
        DType::UInt64,
        DType::Float32,
        DType::Float64,
    ];

    /// Parse a NumPy-style type name (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.to_lowercase();
        Self::ALL.into_iter().find(|d| d.name() == lower)
    }

    pub fn name(&self) -> &'static str {
        match self {
            DType::Int8 => "int8",
            DType::UInt8 => "uint8",
            DType::Int16 => "int16",
            DType::UInt16 => "uint16",
            DType::Int32 => "int32",
            DType::UInt32 => "uint32",
            DType::Int64 => "int64",
            DType::UInt64 => "uint64",
            DType::Float32 => "float32",
            DType::Float64 => "float64",
        }
    }

    /// Element size in bytes.
    pub fn size_of(&self) -> usize {
        match self {
            DType::Int8 | DType::UInt8 => 1,
            DType::Int16 | DType::UInt16 => 2,
            DType::Int32 | DType::UInt32 | DType::Float32 => 4,
            DType::Int64 | DType::UInt64 | DType::Float64 => 8,
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(self, DType::Float32 | DType::Float64)
    }

    /// Inclusive value range, as f64.
    pub fn range(&self) -> (f64, f64) {
        match self {
            DType::Int8 => (i8::MIN as f64, i8::MAX as f64),
            DType::UInt8 => (0.0, u8::MAX as f64),
            DType::Int16 => (i16::MIN as f64, i16::MAX as f64),
            DType::UInt16 => (0.0, u16::MAX as f64),
            DType::Int32 => (i32::MIN as f64, i32::MAX as f64),
            DType::UInt32 => (0.0, u32::MAX as f64),
            DType::Int64 => (i64::MIN as f64, i64::MAX as f64),
            DType::UInt64 => (0.0, u64::MAX as f64),
            DType::Float32 => (f32::MIN as f64, f32::MAX as f64),
            DType::Float64 => (f64::MIN, f64::MAX),
        }
    }

    /// Whether `value` can be stored without loss as a nodata sentinel.
    pub fn can_represent(&self, value: f64) -> bool {
        if value.is_nan() || value.is_infinite() {
            return self.is_float();
        }
        let (min, max) = self.range();
        if value < min || value > max {
            return false;
        }
        self.is_float() || value.fract() == 0.0
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Typed, row-major element buffer.
#[derive(Debug, Clone, PartialEq)]
pub enum RasterValues {
    Int8(Vec<i8>),
    UInt8(Vec<u8>),
    Int16(Vec<i16>),
    UInt16(Vec<u16>),
    Int32(Vec<i32>),
    UInt32(Vec<u32>),
    Int64(Vec<i64>),
    UInt64(Vec<u64>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
}

macro_rules! dispatch {
    ($values:expr, $v:ident => $body:expr) => {
        match $values {
            RasterValues::Int8($v) => $body,
            RasterValues::UInt8($v) => $body,
            RasterValues::Int16($v) => $body,
            RasterValues::UInt16($v) => $body,
            RasterValues::Int32($v) => $body,
            RasterValues::UInt32($v) => $body,
            RasterValues::Int64($v) => $body,
            RasterValues::UInt64($v) => $body,
            RasterValues::Float32($v) => $body,
            RasterValues::Float64($v) => $body,
        }
    };
}

macro_rules! impl_from_vec {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<Vec<$ty>> for RasterValues {
                fn from(values: Vec<$ty>) -> Self {
                    RasterValues::$variant(values)
                }
            }
        )*
    };
}

impl_from_vec!(
    i8 => Int8,
    u8 => UInt8,
    i16 => Int16,
    u16 => UInt16,
    i32 => Int32,
    u32 => UInt32,
    i64 => Int64,
    u64 => UInt64,
    f32 => Float32,
    f64 => Float64,
);

impl RasterValues {
    pub fn dtype(&self) -> DType {
        match self {
            RasterValues::Int8(_) => DType::Int8,
            RasterValues::UInt8(_) => DType::UInt8,
            RasterValues::Int16(_) => DType::Int16,
            RasterValues::UInt16(_) => DType::UInt16,
            RasterValues::Int32(_) => DType::Int32,
            RasterValues::UInt32(_) => DType::UInt32,
            RasterValues::Int64(_) => DType::Int64,
            RasterValues::UInt64(_) => DType::UInt64,
            RasterValues::Float32(_) => DType::Float32,
            RasterValues::Float64(_) => DType::Float64,
        }
    }

    pub fn len(&self) -> usize {
        dispatch!(self, v => v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `len` copies of `value` converted to `dtype`.
    pub fn filled(dtype: DType, len: usize, value: f64) -> Self {
        cast_slice(&vec![value; len], dtype)
    }

    /// Element-wise numeric conversion with `as` semantics.
    ///
    /// Float to integer conversion truncates toward zero and saturates at
    /// the type bounds; NaN becomes zero.
    pub fn cast(&self, dtype: DType) -> Self {
        if self.dtype() == dtype {
            return self.clone();
        }
        dispatch!(self, v => cast_slice(v, dtype))
    }

    /// Convert to `dtype`, storing `fill` wherever a value has no
    /// counterpart in `dtype`: NaN or infinity for integer types, and
    /// anything outside the type's range. Returns the converted values and
    /// the number of elements replaced.
    ///
    /// Values already of `dtype` are returned unchanged.
    pub fn cast_or_fill(&self, dtype: DType, fill: f64) -> (Self, usize) {
        if self.dtype() == dtype {
            return (self.clone(), 0);
        }
        let (min, max) = dtype.range();
        let mut replaced = 0;
        let checked: Vec<f64> = self
            .to_f64_vec()
            .into_iter()
            .map(|v| {
                let representable = if !v.is_finite() {
                    dtype.is_float()
                } else {
                    // Integer targets truncate toward zero before the range check
                    let stored = if dtype.is_float() { v } else { v.trunc() };
                    stored >= min && stored <= max
                };
                if representable {
                    v
                } else {
                    replaced += 1;
                    fill
                }
            })
            .collect();
        (cast_slice(&checked, dtype), replaced)
    }

    pub fn to_f64_vec(&self) -> Vec<f64> {
        dispatch!(self, v => v.iter().map(|x| AsPrimitive::<f64>::as_(*x)).collect())
    }

    pub fn get_f64(&self, index: usize) -> Option<f64> {
        dispatch!(self, v => v.get(index).map(|x| AsPrimitive::<f64>::as_(*x)))
    }
}

fn cast_slice<T>(src: &[T], dtype: DType) -> RasterValues
where
    T: AsPrimitive<i8>
        + AsPrimitive<u8>
        + AsPrimitive<i16>
        + AsPrimitive<u16>
        + AsPrimitive<i32>
        + AsPrimitive<u32>
        + AsPrimitive<i64>
        + AsPrimitive<u64>
        + AsPrimitive<f32>
        + AsPrimitive<f64>,
{
    match dtype {
        DType::Int8 => RasterValues::Int8(src.iter().map(|v| AsPrimitive::<i8>::as_(*v)).collect()),
        DType::UInt8 => RasterValues::UInt8(src.iter().map(|v| AsPrimitive::<u8>::as_(*v)).collect()),
        DType::Int16 => RasterValues::Int16(src.iter().map(|v| AsPrimitive::<i16>::as_(*v)).collect()),
        DType::UInt16 => RasterValues::UInt16(src.iter().map(|v| AsPrimitive::<u16>::as_(*v)).collect()),
        DType::Int32 => RasterValues::Int32(src.iter().map(|v| AsPrimitive::<i32>::as_(*v)).collect()),
        DType::UInt32 => RasterValues::UInt32(src.iter().map(|v| AsPrimitive::<u32>::as_(*v)).collect()),
        DType::Int64 => RasterValues::Int64(src.iter().map(|v| AsPrimitive::<i64>::as_(*v)).collect()),
        DType::UInt64 => RasterValues::UInt64(src.iter().map(|v| AsPrimitive::<u64>::as_(*v)).collect()),
        DType::Float32 => RasterValues::Float32(src.iter().map(|v| AsPrimitive::<f32>::as_(*v)).collect()),
        DType::Float64 => RasterValues::Float64(src.iter().map(|v| AsPrimitive::<f64>::as_(*v)).collect()),
    }
}

/// A 2-D raster in row-major order (row 0 first).
#[derive(Debug, Clone, PartialEq)]
pub struct RasterArray {
    height: usize,
    width: usize,
    values: RasterValues,
}

impl RasterArray {
    /// Wrap a value buffer, checking it holds exactly `height * width` elements.
    pub fn new(height: usize, width: usize, values: impl Into<RasterValues>) -> ModelResult<Self> {
        let values = values.into();
        let len = values.len();
        if len != height * width {
            // Report a row-major shape when the buffer divides into whole rows.
            let found = if width > 0 && len % width == 0 {
                (len / width, width)
            } else {
                (1, len)
            };
            return Err(ModelError::ShapeMismatch {
                expected: (height, width),
                found,
            });
        }
        Ok(Self {
            height,
            width,
            values,
        })
    }

    /// Array of the given shape with every element set to `value`.
    pub fn filled(height: usize, width: usize, dtype: DType, value: f64) -> Self {
        Self {
            height,
            width,
            values: RasterValues::filled(dtype, height * width, value),
        }
    }

    /// Shape as (rows, columns).
    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn dtype(&self) -> DType {
        self.values.dtype()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &RasterValues {
        &self.values
    }

    pub fn into_values(self) -> RasterValues {
        self.values
    }

    /// Value at (row, col) widened to f64.
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row >= self.height || col >= self.width {
            return None;
        }
        self.values.get_f64(row * self.width + col)
    }

    /// Convert to `dtype`, replacing unrepresentable values with `fill`.
    ///
    /// See [`RasterValues::cast_or_fill`].
    pub fn cast_or_fill(&self, dtype: DType, fill: f64) -> (Self, usize) {
        let (values, replaced) = self.values.cast_or_fill(dtype, fill);
        (
            Self {
                height: self.height,
                width: self.width,
                values,
            },
            replaced,
        )
    }

    /// Convert to another element type.
    pub fn cast(&self, dtype: DType) -> Self {
        Self {
            height: self.height,
            width: self.width,
            values: self.values.cast(dtype),
        }
    }

    pub fn to_f64_vec(&self) -> Vec<f64> {
        self.values.to_f64_vec()
    }
}

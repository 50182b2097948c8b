//! Numeric profiles.
//!
//! A [`NumericProfile`] fixes, once per network type, how activations, weights and biases are
//! stored and which unsigned widths are used for neuron/layer/output/training-set counts.
//!
//! All arithmetic goes through [`Scalar::to_real`] / [`Scalar::from_real`]:
//!
//! - `f32` / `f64` are real-valued and converted as-is.
//! - Integer types are fixed-point fractions of their maximum value (`v / T::MAX`), so `i8`
//!   holds `[-1, 1]` as `[-127, 127]` and `u8` holds `[0, 1]` as `[0, 255]`. Conversions back
//!   truncate toward zero and saturate at the type bounds; unsigned types clamp negatives to 0.
//!
//! Training is only defined for floating activations and weights. Trainer APIs carry a
//! [`FloatScalar`] bound, so selecting an integer profile for training is a compile error.

use std::fmt;

use num_traits::{Float, FloatConst};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Concrete representation chosen for a profile slot.
pub enum DataType {
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Float,
    Double,
}

impl DataType {
    #[inline]
    pub fn is_float(self) -> bool {
        matches!(self, DataType::Float | DataType::Double)
    }

    #[inline]
    pub fn is_signed(self) -> bool {
        matches!(
            self,
            DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64
        )
    }

    /// Storage width in bits.
    #[inline]
    pub fn bits(self) -> u32 {
        match self {
            DataType::Int8 | DataType::Uint8 => 8,
            DataType::Int16 | DataType::Uint16 => 16,
            DataType::Int32 | DataType::Uint32 | DataType::Float => 32,
            DataType::Int64 | DataType::Uint64 | DataType::Double => 64,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::Int8 => "int8",
            DataType::Int16 => "int16",
            DataType::Int32 => "int32",
            DataType::Int64 => "int64",
            DataType::Uint8 => "uint8",
            DataType::Uint16 => "uint16",
            DataType::Uint32 => "uint32",
            DataType::Uint64 => "uint64",
            DataType::Float => "float",
            DataType::Double => "double",
        };
        f.write_str(name)
    }
}

/// Storage type for activations, weights and biases.
pub trait Scalar: Copy + PartialOrd + fmt::Debug + Send + Sync + 'static {
    const DATA_TYPE: DataType;
    /// Additive identity.
    const ZERO: Self;

    fn to_real(self) -> f64;
    fn from_real(value: f64) -> Self;
}

/// Scalars the trainer can differentiate through.
pub trait FloatScalar: Scalar + Float + FloatConst {}

impl<T: Scalar + Float + FloatConst> FloatScalar for T {}

macro_rules! float_scalar {
    ($t:ty, $dt:ident) => {
        impl Scalar for $t {
            const DATA_TYPE: DataType = DataType::$dt;
            const ZERO: Self = 0.0;

            #[inline]
            fn to_real(self) -> f64 {
                self as f64
            }

            #[inline]
            fn from_real(value: f64) -> Self {
                value as $t
            }
        }
    };
}

macro_rules! fixed_scalar {
    ($t:ty, $dt:ident) => {
        impl Scalar for $t {
            const DATA_TYPE: DataType = DataType::$dt;
            const ZERO: Self = 0;

            #[inline]
            fn to_real(self) -> f64 {
                self as f64 / <$t>::MAX as f64
            }

            #[inline]
            fn from_real(value: f64) -> Self {
                // `as` saturates and maps NaN to 0.
                (value * <$t>::MAX as f64) as $t
            }
        }
    };
}

float_scalar!(f32, Float);
float_scalar!(f64, Double);
fixed_scalar!(i8, Int8);
fixed_scalar!(i16, Int16);
fixed_scalar!(i32, Int32);
fixed_scalar!(i64, Int64);
fixed_scalar!(u8, Uint8);
fixed_scalar!(u16, Uint16);
fixed_scalar!(u32, Uint32);
fixed_scalar!(u64, Uint64);

/// Unsigned count type (neurons, layers, outputs, training entries).
pub trait IndexScalar:
    Copy + Eq + Ord + fmt::Debug + fmt::Display + Send + Sync + 'static
{
    const DATA_TYPE: DataType;

    fn from_usize(n: usize) -> Option<Self>;
    fn to_usize(self) -> usize;
}

macro_rules! index_scalar {
    ($t:ty, $dt:ident) => {
        impl IndexScalar for $t {
            const DATA_TYPE: DataType = DataType::$dt;

            #[inline]
            fn from_usize(n: usize) -> Option<Self> {
                <$t>::try_from(n).ok()
            }

            #[inline]
            fn to_usize(self) -> usize {
                usize::try_from(self).unwrap_or(usize::MAX)
            }
        }
    };
}

index_scalar!(u8, Uint8);
index_scalar!(u16, Uint16);
index_scalar!(u32, Uint32);
index_scalar!(u64, Uint64);

/// Type-level selection of every numeric representation a network uses.
pub trait NumericProfile: fmt::Debug + 'static {
    type Activation: Scalar;
    type Weight: Scalar;
    type Bias: Scalar;

    type NeuronCount: IndexScalar;
    type LayerCount: IndexScalar;
    type OutputCount: IndexScalar;
    type TrainingCount: IndexScalar;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
/// Single-precision floats. The default profile.
pub struct Float32;

impl NumericProfile for Float32 {
    type Activation = f32;
    type Weight = f32;
    type Bias = f32;

    type NeuronCount = u16;
    type LayerCount = u8;
    type OutputCount = u16;
    type TrainingCount = u16;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Float64;

impl NumericProfile for Float64 {
    type Activation = f64;
    type Weight = f64;
    type Bias = f64;

    type NeuronCount = u16;
    type LayerCount = u8;
    type OutputCount = u16;
    type TrainingCount = u16;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
/// 16-bit activations and weights with a 32-bit bias (Xtensa MAC16 layout).
///
/// Inference only.
pub struct Mac16;

impl NumericProfile for Mac16 {
    type Activation = i16;
    type Weight = i16;
    type Bias = i32;

    type NeuronCount = u16;
    type LayerCount = u8;
    type OutputCount = u16;
    type TrainingCount = u16;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
/// Unsigned 8-bit activations, signed 8-bit weights, 32-bit bias (VPDPBUSD layout).
///
/// Inference only. Hidden activations cannot go negative under this profile.
pub struct Vnni;

impl NumericProfile for Vnni {
    type Activation = u8;
    type Weight = i8;
    type Bias = i32;

    type NeuronCount = u16;
    type LayerCount = u8;
    type OutputCount = u16;
    type TrainingCount = u16;
}

use std::fmt::{Display, Formatter};
use wasmtime::{Val, ValType};

/// The scalar types that cross the host/module boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    I32,
    I64,
    F32,
    F64,
}
impl ScalarType {
    pub const ALL: [ScalarType; 4] = [ScalarType::I32, ScalarType::I64, ScalarType::F32, ScalarType::F64];

    /// Width in bytes when the scalar lives in linear memory.
    pub fn size(&self) -> usize {
        match self {
            ScalarType::I32 | ScalarType::F32 => 4,
            ScalarType::I64 | ScalarType::F64 => 8,
        }
    }
    pub fn from_val_type(ty: &ValType) -> Option<Self> {
        match ty {
            ValType::I32 => Some(ScalarType::I32),
            ValType::I64 => Some(ScalarType::I64),
            ValType::F32 => Some(ScalarType::F32),
            ValType::F64 => Some(ScalarType::F64),
            _ => None,
        }
    }
}
impl Display for ScalarType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                ScalarType::I32 => "i32",
                ScalarType::I64 => "i64",
                ScalarType::F32 => "f32",
                ScalarType::F64 => "f64",
            }
        )
    }
}

/// A scalar value tagged with its type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
}
impl Scalar {
    pub fn ty(&self) -> ScalarType {
        match self {
            Scalar::I32(_) => ScalarType::I32,
            Scalar::I64(_) => ScalarType::I64,
            Scalar::F32(_) => ScalarType::F32,
            Scalar::F64(_) => ScalarType::F64,
        }
    }
    /// Lossy view used by diagnostics (`js_log` prints numbers).
    pub fn as_f64(&self) -> f64 {
        match self {
            Scalar::I32(v) => *v as f64,
            Scalar::I64(v) => *v as f64,
            Scalar::F32(v) => *v as f64,
            Scalar::F64(v) => *v,
        }
    }
    /// The bare number, without the type suffix `Display` adds.
    pub fn number(&self) -> String {
        match self {
            Scalar::I32(v) => v.to_string(),
            Scalar::I64(v) => v.to_string(),
            Scalar::F32(v) => v.to_string(),
            Scalar::F64(v) => v.to_string(),
        }
    }
    pub fn to_le_bytes(&self) -> Vec<u8> {
        match self {
            Scalar::I32(v) => v.to_le_bytes().to_vec(),
            Scalar::I64(v) => v.to_le_bytes().to_vec(),
            Scalar::F32(v) => v.to_le_bytes().to_vec(),
            Scalar::F64(v) => v.to_le_bytes().to_vec(),
        }
    }
    /// Decodes `bytes` (exactly `ty.size()` long) as a little-endian scalar.
    pub fn from_le_bytes(ty: ScalarType, bytes: &[u8]) -> Option<Self> {
        Some(match ty {
            ScalarType::I32 => Scalar::I32(i32::from_le_bytes(bytes.try_into().ok()?)),
            ScalarType::I64 => Scalar::I64(i64::from_le_bytes(bytes.try_into().ok()?)),
            ScalarType::F32 => Scalar::F32(f32::from_le_bytes(bytes.try_into().ok()?)),
            ScalarType::F64 => Scalar::F64(f64::from_le_bytes(bytes.try_into().ok()?)),
        })
    }
    pub fn to_val(&self) -> Val {
        match self {
            Scalar::I32(v) => Val::I32(*v),
            Scalar::I64(v) => Val::I64(*v),
            Scalar::F32(v) => Val::F32(v.to_bits()),
            Scalar::F64(v) => Val::F64(v.to_bits()),
        }
    }
    pub fn from_val(val: &Val) -> Option<Self> {
        match val {
            Val::I32(v) => Some(Scalar::I32(*v)),
            Val::I64(v) => Some(Scalar::I64(*v)),
            Val::F32(bits) => Some(Scalar::F32(f32::from_bits(*bits))),
            Val::F64(bits) => Some(Scalar::F64(f64::from_bits(*bits))),
            _ => None,
        }
    }
}
impl Display for Scalar {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Scalar::I32(v) => write!(f, "{v}:i32"),
            Scalar::I64(v) => write!(f, "{v}:i64"),
            Scalar::F32(v) => write!(f, "{v}:f32"),
            Scalar::F64(v) => write!(f, "{v}:f64"),
        }
    }
}
impl From<i32> for Scalar {
    fn from(v: i32) -> Self {
        Scalar::I32(v)
    }
}
impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::I64(v)
    }
}
impl From<f32> for Scalar {
    fn from(v: f32) -> Self {
        Scalar::F32(v)
    }
}
impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::F64(v)
    }
}

/// A scalar paired with its taint flag, as exchanged across a module call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaintedScalar {
    pub value: Scalar,
    pub tainted: bool,
}
impl TaintedScalar {
    pub fn clean(value: impl Into<Scalar>) -> Self {
        Self { value: value.into(), tainted: false }
    }
    pub fn tainted(value: impl Into<Scalar>) -> Self {
        Self { value: value.into(), tainted: true }
    }
}
impl Display for TaintedScalar {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", if self.tainted { "*" } else { "" }, self.value)
    }
}

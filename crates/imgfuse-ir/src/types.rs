//! The scalar type system shared by every IR node.
//!
//! Eight scalar types with explicit width and signedness, a fixed promotion
//! table (Bool ≺ U8 ≺ I16 ≺ I32 ≺ I64/U64 ≺ F32 ≺ F64), and the canonical
//! textual spelling each type takes in emitted C/CUDA source. Both code
//! generators (CPU and GPU) read these tables rather than keeping their own
//! copies, since the spellings are identical across targets.

use serde::{Deserialize, Serialize};

/// Scalar (primitive) types carried by tensors, constants, and iteration
/// variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarType {
    Bool,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt64,
    Float32,
    Float64,
}

impl ScalarType {
    /// Bit width of this type's C representation.
    pub fn width_bits(self) -> u32 {
        match self {
            ScalarType::Bool => 8,
            ScalarType::Int16 => 16,
            ScalarType::Int32 => 32,
            ScalarType::Int64 => 64,
            ScalarType::UInt8 => 8,
            ScalarType::UInt64 => 64,
            ScalarType::Float32 => 32,
            ScalarType::Float64 => 64,
        }
    }

    /// Whether this type is a signed integer type (excludes `Bool`, `UInt8`,
    /// `UInt64`, and the floating types).
    pub fn is_signed_int(self) -> bool {
        matches!(
            self,
            ScalarType::Int16 | ScalarType::Int32 | ScalarType::Int64
        )
    }

    pub fn is_integer(self) -> bool {
        matches!(
            self,
            ScalarType::Bool
                | ScalarType::Int16
                | ScalarType::Int32
                | ScalarType::Int64
                | ScalarType::UInt8
                | ScalarType::UInt64
        )
    }

    pub fn is_float(self) -> bool {
        matches!(self, ScalarType::Float32 | ScalarType::Float64)
    }

    /// Rank in the fixed promotion chain. A strictly higher rank wins when
    /// unifying two operand types.
    fn rank(self) -> u8 {
        match self {
            ScalarType::Bool => 0,
            ScalarType::UInt8 => 1,
            ScalarType::Int16 => 2,
            ScalarType::Int32 => 3,
            ScalarType::Int64 => 4,
            ScalarType::UInt64 => 4,
            ScalarType::Float32 => 5,
            ScalarType::Float64 => 6,
        }
    }

    /// The unified type of two operand types per the fixed promotion table:
    /// `Bool ≺ U8 ≺ I16 ≺ I32 ≺ I64/U64 ≺ F32 ≺ F64`.
    pub fn promote(self, other: ScalarType) -> ScalarType {
        if self.rank() >= other.rank() {
            self
        } else {
            other
        }
    }

    /// Canonical spelling of this type in emitted C/CUDA source. Identical
    /// for both targets -- divergence between CPU and GPU lives in the
    /// operator and intrinsic tables, not here.
    pub fn c_spelling(self) -> &'static str {
        match self {
            ScalarType::Bool => "bool",
            ScalarType::Int16 => "int16_t",
            ScalarType::Int32 => "int32_t",
            ScalarType::Int64 => "int64_t",
            ScalarType::UInt8 => "uint8_t",
            ScalarType::UInt64 => "uint64_t",
            ScalarType::Float32 => "float",
            ScalarType::Float64 => "double",
        }
    }
}

/// Constant literal values bound by `constant::<T>(v)` (the only place
/// numeric literals enter the IR).
///
/// `Float32` is stored as `f64` internally -- `f32` does not implement `Eq`
/// (NaN), which would block deriving `PartialEq`/`Hash` on this enum. The
/// narrowing to `f32` spelling happens only at code-gen time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ConstValue {
    Bool(bool),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt8(u8),
    UInt64(u64),
    /// Stored as f64 internally to avoid f32 comparison issues. See module docs.
    Float32(f64),
    Float64(f64),
}

impl ConstValue {
    pub fn scalar_type(&self) -> ScalarType {
        match self {
            ConstValue::Bool(_) => ScalarType::Bool,
            ConstValue::Int16(_) => ScalarType::Int16,
            ConstValue::Int32(_) => ScalarType::Int32,
            ConstValue::Int64(_) => ScalarType::Int64,
            ConstValue::UInt8(_) => ScalarType::UInt8,
            ConstValue::UInt64(_) => ScalarType::UInt64,
            ConstValue::Float32(_) => ScalarType::Float32,
            ConstValue::Float64(_) => ScalarType::Float64,
        }
    }

    /// Minimal textual spelling for code generation: `true`/`false` for
    /// `Bool`, otherwise the numeric literal.
    pub fn spelling(&self) -> String {
        match self {
            ConstValue::Bool(b) => b.to_string(),
            ConstValue::Int16(v) => v.to_string(),
            ConstValue::Int32(v) => v.to_string(),
            ConstValue::Int64(v) => v.to_string(),
            ConstValue::UInt8(v) => v.to_string(),
            ConstValue::UInt64(v) => v.to_string(),
            ConstValue::Float32(v) => format!("{}f", v),
            ConstValue::Float64(v) => v.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn promotion_chain_is_total_order() {
        use ScalarType::*;
        let chain = [Bool, UInt8, Int16, Int32, Int64, Float32, Float64];
        for pair in chain.windows(2) {
            assert_eq!(pair[0].promote(pair[1]), pair[1]);
            assert_eq!(pair[1].promote(pair[0]), pair[1]);
        }
    }

    #[test]
    fn int64_and_uint64_are_same_rank() {
        assert_eq!(ScalarType::Int64.promote(ScalarType::UInt64), ScalarType::Int64);
        assert_eq!(ScalarType::UInt64.promote(ScalarType::Int64), ScalarType::UInt64);
    }

    #[test]
    fn promote_is_idempotent_on_equal_types() {
        assert_eq!(ScalarType::Int32.promote(ScalarType::Int32), ScalarType::Int32);
    }

    #[test]
    fn c_spellings_match_target_header_types() {
        assert_eq!(ScalarType::UInt8.c_spelling(), "uint8_t");
        assert_eq!(ScalarType::Float32.c_spelling(), "float");
        assert_eq!(ScalarType::Bool.c_spelling(), "bool");
    }

    #[test]
    fn const_value_spelling_uses_boolalpha_style() {
        assert_eq!(ConstValue::Bool(true).spelling(), "true");
        assert_eq!(ConstValue::Bool(false).spelling(), "false");
    }

    #[test]
    fn const_value_scalar_type_roundtrips() {
        assert_eq!(ConstValue::Int32(7).scalar_type(), ScalarType::Int32);
        assert_eq!(ConstValue::Float32(1.5).scalar_type(), ScalarType::Float32);
    }

    #[test]
    fn serde_roundtrip_const_value() {
        let values = vec![
            ConstValue::Bool(true),
            ConstValue::Int16(1000),
            ConstValue::Int32(100_000),
            ConstValue::Int64(1_000_000_000),
            ConstValue::UInt8(200),
            ConstValue::UInt64(9_000_000_000),
            ConstValue::Float32(3.5),
            ConstValue::Float64(2.718281828),
        ];
        for val in &values {
            let json = serde_json::to_string(val).unwrap();
            let back: ConstValue = serde_json::from_str(&json).unwrap();
            let json2 = serde_json::to_string(&back).unwrap();
            assert_eq!(json, json2);
        }
    }

    #[test]
    fn serde_roundtrip_scalar_type() {
        for ty in [
            ScalarType::Bool,
            ScalarType::Int16,
            ScalarType::Int32,
            ScalarType::Int64,
            ScalarType::UInt8,
            ScalarType::UInt64,
            ScalarType::Float32,
            ScalarType::Float64,
        ] {
            let json = serde_json::to_string(&ty).unwrap();
            let back: ScalarType = serde_json::from_str(&json).unwrap();
            assert_eq!(ty, back);
        }
    }
}

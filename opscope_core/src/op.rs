//! Operation kinds
//!
//! `OpKind` is the closed set of primitives a graph node can perform. Its
//! discriminant is a dense index shared by the cost model and the frequency
//! table, and its name matches the executor's own op names (`MUL_MAT`,
//! `SOFT_MAX`, ...) so config files and diagnostic lines read the same as the
//! engine's logs.

use crate::error::{OpscopeError, OpscopeResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

macro_rules! op_kinds {
    ($($variant:ident => $name:literal),+ $(,)?) => {
        /// Computation primitive performed by a graph node
        #[repr(u8)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum OpKind {
            $($variant),+
        }

        impl OpKind {
            /// Every kind, in index order
            pub const ALL: &'static [OpKind] = &[$(OpKind::$variant),+];

            /// Engine-facing name of this kind
            pub const fn name(self) -> &'static str {
                match self {
                    $(OpKind::$variant => $name),+
                }
            }
        }
    };
}

op_kinds! {
    Noop => "NONE",
    Dup => "DUP",
    Add => "ADD",
    Add1 => "ADD1",
    Acc => "ACC",
    Sub => "SUB",
    Mul => "MUL",
    Div => "DIV",
    Sqr => "SQR",
    Sqrt => "SQRT",
    Log => "LOG",
    Sum => "SUM",
    SumRows => "SUM_ROWS",
    Mean => "MEAN",
    Argmax => "ARGMAX",
    Repeat => "REPEAT",
    Concat => "CONCAT",
    Norm => "NORM",
    RmsNorm => "RMS_NORM",
    GroupNorm => "GROUP_NORM",
    MulMat => "MUL_MAT",
    MulMatId => "MUL_MAT_ID",
    OutProd => "OUT_PROD",
    Scale => "SCALE",
    Set => "SET",
    Cpy => "CPY",
    Cont => "CONT",
    Reshape => "RESHAPE",
    View => "VIEW",
    Permute => "PERMUTE",
    Transpose => "TRANSPOSE",
    GetRows => "GET_ROWS",
    DiagMaskInf => "DIAG_MASK_INF",
    SoftMax => "SOFT_MAX",
    Rope => "ROPE",
    Clamp => "CLAMP",
    ConvTranspose1d => "CONV_TRANSPOSE_1D",
    Im2Col => "IM2COL",
    Pool2d => "POOL_2D",
    Upscale => "UPSCALE",
    Pad => "PAD",
    Argsort => "ARGSORT",
    LeakyRelu => "LEAKY_RELU",
    FlashAttnExt => "FLASH_ATTN_EXT",
    Unary => "UNARY",
    Glu => "GLU",
}

impl OpKind {
    /// Number of kinds
    pub const COUNT: usize = Self::ALL.len();

    /// Dense index of this kind
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Kind at `index`, or `None` if out of range
    #[inline]
    pub fn from_index(index: usize) -> Option<OpKind> {
        Self::ALL.get(index).copied()
    }

    /// True for kinds that only move or reinterpret data
    pub fn is_data_movement(self) -> bool {
        matches!(
            self,
            OpKind::Cpy
                | OpKind::Cont
                | OpKind::Reshape
                | OpKind::View
                | OpKind::Permute
                | OpKind::Transpose
        )
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // pad() so width/alignment specifiers work in report lines
        f.pad(self.name())
    }
}

impl FromStr for OpKind {
    type Err = OpscopeError;

    fn from_str(s: &str) -> OpscopeResult<Self> {
        let wanted = s.trim();
        OpKind::ALL
            .iter()
            .copied()
            .find(|op| op.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| OpscopeError::UnknownOp(wanted.to_string()))
    }
}

impl Serialize for OpKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for OpKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_is_dense() {
        for (i, op) in OpKind::ALL.iter().enumerate() {
            assert_eq!(op.index(), i);
            assert_eq!(OpKind::from_index(i), Some(*op));
        }
        assert_eq!(OpKind::from_index(OpKind::COUNT), None);
    }

    #[test]
    fn test_names_parse_back() {
        for op in OpKind::ALL {
            assert_eq!(op.name().parse::<OpKind>().unwrap(), *op);
        }
        assert_eq!("mul_mat".parse::<OpKind>().unwrap(), OpKind::MulMat);
        assert!("MATMUL".parse::<OpKind>().is_err());
    }

    #[test]
    fn test_display_honours_width() {
        assert_eq!(format!("{:<8}|", OpKind::Add), "ADD     |");
    }
}

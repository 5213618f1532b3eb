// Copyright 2025 SieveDB Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Core type definitions for SieveDB
//!
//! This module defines the fundamental types: DataType, FieldId, Timestamp,
//! SegmentKind and the operator enums used by the expression tree.

use std::fmt;

/// Field data types supported by segments
///
/// Only the scalar types, `Varchar` and `Json` are filterable; the remaining
/// variants exist so schemas can describe full rows, and evaluators reject
/// them with `TypeInvalid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum DataType {
    /// Boolean true/false
    #[default]
    Bool = 0,

    /// 8-bit signed integer
    Int8 = 1,

    /// 16-bit signed integer
    Int16 = 2,

    /// 32-bit signed integer
    Int32 = 3,

    /// 64-bit signed integer
    Int64 = 4,

    /// 32-bit floating point
    Float = 5,

    /// 64-bit floating point
    Double = 6,

    /// UTF-8 text string
    Varchar = 7,

    /// JSON document
    Json = 8,

    /// Nested array
    Array = 9,

    /// Heterogeneous row
    Row = 10,

    /// Dense float vector
    VectorFloat = 11,

    /// Binary vector
    VectorBinary = 12,
}

impl DataType {
    /// Returns true for the signed integer types
    pub fn is_integral(&self) -> bool {
        matches!(
            self,
            DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64
        )
    }

    /// Returns true for the floating point types
    pub fn is_floating(&self) -> bool {
        matches!(self, DataType::Float | DataType::Double)
    }

    /// Returns true if this type is numeric
    pub fn is_numeric(&self) -> bool {
        self.is_integral() || self.is_floating()
    }

    /// Returns true if the type can feed a filter evaluator
    pub fn is_filterable(&self) -> bool {
        self.is_numeric() || matches!(self, DataType::Bool | DataType::Varchar | DataType::Json)
    }

    /// Returns the type ID as u8 for serialization
    pub fn as_u8(&self) -> u8 {
        *self as u8
    }

    /// Create DataType from u8
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(DataType::Bool),
            1 => Some(DataType::Int8),
            2 => Some(DataType::Int16),
            3 => Some(DataType::Int32),
            4 => Some(DataType::Int64),
            5 => Some(DataType::Float),
            6 => Some(DataType::Double),
            7 => Some(DataType::Varchar),
            8 => Some(DataType::Json),
            9 => Some(DataType::Array),
            10 => Some(DataType::Row),
            11 => Some(DataType::VectorFloat),
            12 => Some(DataType::VectorBinary),
            _ => None,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Bool => write!(f, "BOOL"),
            DataType::Int8 => write!(f, "INT8"),
            DataType::Int16 => write!(f, "INT16"),
            DataType::Int32 => write!(f, "INT32"),
            DataType::Int64 => write!(f, "INT64"),
            DataType::Float => write!(f, "FLOAT"),
            DataType::Double => write!(f, "DOUBLE"),
            DataType::Varchar => write!(f, "VARCHAR"),
            DataType::Json => write!(f, "JSON"),
            DataType::Array => write!(f, "ARRAY"),
            DataType::Row => write!(f, "ROW"),
            DataType::VectorFloat => write!(f, "VECTOR_FLOAT"),
            DataType::VectorBinary => write!(f, "VECTOR_BINARY"),
        }
    }
}

/// Opaque per-segment field identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId(pub i64);

impl FieldId {
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotone, totally ordered insert timestamp
pub type Timestamp = u64;

/// Timestamp that makes every row visible
pub const MAX_TIMESTAMP: Timestamp = u64::MAX;

/// Segment lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SegmentKind {
    /// Mutable, many fixed-size chunks, no scalar indexes
    Growing = 0,
    /// Immutable, one logical chunk per field, optionally indexed
    Sealed = 1,
}

/// Comparison operators for range and compare expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CompareOp {
    /// Equality (=)
    Eq = 0,

    /// Inequality (!=)
    Ne = 1,

    /// Less than (<)
    Lt = 2,

    /// Less than or equal (<=)
    Le = 3,

    /// Greater than (>)
    Gt = 4,

    /// Greater than or equal (>=)
    Ge = 5,

    /// String prefix match
    PrefixMatch = 6,
}

impl CompareOp {
    /// Returns true for the six ordering operators (excludes PrefixMatch)
    pub fn is_ordering(&self) -> bool {
        !matches!(self, CompareOp::PrefixMatch)
    }

    /// Returns the negation of this operator, if applicable
    pub fn negate(&self) -> Option<Self> {
        match self {
            CompareOp::Eq => Some(CompareOp::Ne),
            CompareOp::Ne => Some(CompareOp::Eq),
            CompareOp::Lt => Some(CompareOp::Ge),
            CompareOp::Le => Some(CompareOp::Gt),
            CompareOp::Gt => Some(CompareOp::Le),
            CompareOp::Ge => Some(CompareOp::Lt),
            CompareOp::PrefixMatch => None,
        }
    }

    /// Operator with operands swapped: `a op b` == `b op.swap() a`
    pub fn swap(&self) -> Option<Self> {
        match self {
            CompareOp::Eq => Some(CompareOp::Eq),
            CompareOp::Ne => Some(CompareOp::Ne),
            CompareOp::Lt => Some(CompareOp::Gt),
            CompareOp::Le => Some(CompareOp::Ge),
            CompareOp::Gt => Some(CompareOp::Lt),
            CompareOp::Ge => Some(CompareOp::Le),
            CompareOp::PrefixMatch => None,
        }
    }

    /// Apply this operator to two ordered values
    #[inline]
    pub fn compare<T: PartialOrd>(&self, left: &T, right: &T) -> bool {
        match self {
            CompareOp::Eq => left == right,
            CompareOp::Ne => left != right,
            CompareOp::Lt => left < right,
            CompareOp::Le => left <= right,
            CompareOp::Gt => left > right,
            CompareOp::Ge => left >= right,
            CompareOp::PrefixMatch => false,
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompareOp::Eq => write!(f, "=="),
            CompareOp::Ne => write!(f, "!="),
            CompareOp::Lt => write!(f, "<"),
            CompareOp::Le => write!(f, "<="),
            CompareOp::Gt => write!(f, ">"),
            CompareOp::Ge => write!(f, ">="),
            CompareOp::PrefixMatch => write!(f, "PrefixMatch"),
        }
    }
}

/// Arithmetic operators for arith-on-range expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ArithOp {
    Add = 0,
    Sub = 1,
    Mul = 2,
    Div = 3,
    Mod = 4,
}

impl fmt::Display for ArithOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArithOp::Add => write!(f, "+"),
            ArithOp::Sub => write!(f, "-"),
            ArithOp::Mul => write!(f, "*"),
            ArithOp::Div => write!(f, "/"),
            ArithOp::Mod => write!(f, "%"),
        }
    }
}

/// Binary logical operators over boolean vectors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum LogicalOp {
    And = 0,
    Or = 1,
    Xor = 2,
    /// Set difference: `left AND NOT right`
    Minus = 3,
}

impl fmt::Display for LogicalOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalOp::And => write!(f, "AND"),
            LogicalOp::Or => write!(f, "OR"),
            LogicalOp::Xor => write!(f, "XOR"),
            LogicalOp::Minus => write!(f, "MINUS"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_type_roundtrip() {
        for v in 0..=12u8 {
            let dt = DataType::from_u8(v).unwrap();
            assert_eq!(dt.as_u8(), v);
        }
        assert!(DataType::from_u8(13).is_none());
    }

    #[test]
    fn test_data_type_classes() {
        assert!(DataType::Int8.is_integral());
        assert!(DataType::Int64.is_integral());
        assert!(!DataType::Float.is_integral());
        assert!(DataType::Double.is_floating());
        assert!(DataType::Int32.is_numeric());
        assert!(DataType::Varchar.is_filterable());
        assert!(DataType::Json.is_filterable());
        assert!(!DataType::VectorFloat.is_filterable());
        assert!(!DataType::Row.is_filterable());
    }

    #[test]
    fn test_compare_op_negate() {
        assert_eq!(CompareOp::Eq.negate(), Some(CompareOp::Ne));
        assert_eq!(CompareOp::Lt.negate(), Some(CompareOp::Ge));
        assert_eq!(CompareOp::Ge.negate(), Some(CompareOp::Lt));
        assert_eq!(CompareOp::PrefixMatch.negate(), None);
    }

    #[test]
    fn test_compare_op_swap() {
        assert_eq!(CompareOp::Lt.swap(), Some(CompareOp::Gt));
        assert_eq!(CompareOp::Le.swap(), Some(CompareOp::Ge));
        assert_eq!(CompareOp::Eq.swap(), Some(CompareOp::Eq));
    }

    #[test]
    fn test_compare_op_apply() {
        assert!(CompareOp::Lt.compare(&1, &2));
        assert!(!CompareOp::Lt.compare(&2, &2));
        assert!(CompareOp::Le.compare(&2, &2));
        assert!(CompareOp::Ne.compare(&1, &2));
        // NaN compares false under every ordered predicate
        assert!(!CompareOp::Eq.compare(&f64::NAN, &f64::NAN));
        assert!(!CompareOp::Lt.compare(&f64::NAN, &1.0));
        assert!(!CompareOp::Ge.compare(&f64::NAN, &1.0));
    }
}

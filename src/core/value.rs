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

//! Literal values carried by expression nodes
//!
//! Integer literals are always carried widened to `i64`; comparison against
//! narrower column types collapses the predicate when the literal falls
//! outside the column's domain (see the unary/binary range evaluators).

use std::fmt;
use std::hash::{Hash, Hasher};

use super::error::{Error, Result};
use super::types::DataType;

/// A constant operand of a filter expression
#[derive(Debug, Clone)]
pub enum ScalarValue {
    /// Boolean literal
    Bool(bool),

    /// Integer literal, widened to 64 bits at plan decode
    Int64(i64),

    /// Floating point literal
    Float64(f64),

    /// String literal
    String(String),
}

impl ScalarValue {
    /// Create a string literal
    pub fn string(value: impl Into<String>) -> Self {
        ScalarValue::String(value.into())
    }

    /// The widest data type that can carry this literal
    pub fn data_type(&self) -> DataType {
        match self {
            ScalarValue::Bool(_) => DataType::Bool,
            ScalarValue::Int64(_) => DataType::Int64,
            ScalarValue::Float64(_) => DataType::Double,
            ScalarValue::String(_) => DataType::Varchar,
        }
    }

    /// Extract a bool; errors on any other variant
    pub fn as_bool(&self) -> Result<bool> {
        match self {
            ScalarValue::Bool(v) => Ok(*v),
            other => Err(Error::expr_invalid(format!(
                "expected BOOL literal, got {}",
                other.data_type()
            ))),
        }
    }

    /// Extract a widened integer; errors on non-integer variants
    pub fn as_i64(&self) -> Result<i64> {
        match self {
            ScalarValue::Int64(v) => Ok(*v),
            other => Err(Error::expr_invalid(format!(
                "expected INT64 literal, got {}",
                other.data_type()
            ))),
        }
    }

    /// Extract a float; integer literals are accepted and widened
    pub fn as_f64(&self) -> Result<f64> {
        match self {
            ScalarValue::Float64(v) => Ok(*v),
            ScalarValue::Int64(v) => Ok(*v as f64),
            other => Err(Error::expr_invalid(format!(
                "expected numeric literal, got {}",
                other.data_type()
            ))),
        }
    }

    /// Extract a string slice; errors on any other variant
    pub fn as_str(&self) -> Result<&str> {
        match self {
            ScalarValue::String(v) => Ok(v.as_str()),
            other => Err(Error::expr_invalid(format!(
                "expected VARCHAR literal, got {}",
                other.data_type()
            ))),
        }
    }

    /// Returns true if this literal is numeric
    pub fn is_numeric(&self) -> bool {
        matches!(self, ScalarValue::Int64(_) | ScalarValue::Float64(_))
    }
}

impl PartialEq for ScalarValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ScalarValue::Bool(a), ScalarValue::Bool(b)) => a == b,
            (ScalarValue::Int64(a), ScalarValue::Int64(b)) => a == b,
            (ScalarValue::Float64(a), ScalarValue::Float64(b)) => a.to_bits() == b.to_bits(),
            (ScalarValue::String(a), ScalarValue::String(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for ScalarValue {}

impl Hash for ScalarValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            ScalarValue::Bool(v) => {
                0u8.hash(state);
                v.hash(state);
            }
            ScalarValue::Int64(v) => {
                1u8.hash(state);
                v.hash(state);
            }
            ScalarValue::Float64(v) => {
                2u8.hash(state);
                v.to_bits().hash(state);
            }
            ScalarValue::String(v) => {
                3u8.hash(state);
                v.hash(state);
            }
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Bool(v) => write!(f, "{}", v),
            ScalarValue::Int64(v) => write!(f, "{}", v),
            ScalarValue::Float64(v) => write!(f, "{}", v),
            ScalarValue::String(v) => write!(f, "{:?}", v),
        }
    }
}

impl From<bool> for ScalarValue {
    fn from(v: bool) -> Self {
        ScalarValue::Bool(v)
    }
}

impl From<i64> for ScalarValue {
    fn from(v: i64) -> Self {
        ScalarValue::Int64(v)
    }
}

impl From<f64> for ScalarValue {
    fn from(v: f64) -> Self {
        ScalarValue::Float64(v)
    }
}

impl From<&str> for ScalarValue {
    fn from(v: &str) -> Self {
        ScalarValue::String(v.to_string())
    }
}

impl From<String> for ScalarValue {
    fn from(v: String) -> Self {
        ScalarValue::String(v)
    }
}

/// Inclusive integer domain of a column type, if it is integral
pub fn int_domain(data_type: DataType) -> Option<(i64, i64)> {
    match data_type {
        DataType::Int8 => Some((i8::MIN as i64, i8::MAX as i64)),
        DataType::Int16 => Some((i16::MIN as i64, i16::MAX as i64)),
        DataType::Int32 => Some((i32::MIN as i64, i32::MAX as i64)),
        DataType::Int64 => Some((i64::MIN, i64::MAX)),
        _ => None,
    }
}

/// Where a widened literal sits relative to an integral column's domain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainCheck {
    /// Literal representable by the column type
    InRange,
    /// Literal below the column type's minimum
    BelowMin,
    /// Literal above the column type's maximum
    AboveMax,
}

/// Classify a widened `i64` literal against an integral column's domain
pub fn check_int_domain(val: i64, data_type: DataType) -> DomainCheck {
    match int_domain(data_type) {
        Some((lo, _)) if val < lo => DomainCheck::BelowMin,
        Some((_, hi)) if val > hi => DomainCheck::AboveMax,
        _ => DomainCheck::InRange,
    }
}

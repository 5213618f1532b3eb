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

//! Filter expression trees
//!
//! The logical `TypedExpr` tree is the user-facing plan description; it is
//! compiled per invocation into a physical `Expr` whose leaves own cursors
//! into the segment. Physical evaluators are a closed set of variants
//! dispatched by node kind first, then by (operator, datatype) inside each
//! family, outside the element loops.
//!
//! # Expression families
//!
//! - [`UnaryRangeExpr`] - `col OP const` with `PrefixMatch` for strings
//! - [`BinaryRangeExpr`] - `lo (<|<=) col (<|<=) hi`
//! - [`TermExpr`] - `col IN (v1, v2, ...)` and the JSON `is_in_field` form
//! - [`ArithRangeExpr`] - `(col ARITH operand) OP value`
//! - [`CompareExpr`] - `col OP col`
//! - [`ExistsExpr`], [`JsonContainsExpr`] - JSON path predicates
//! - [`LogicalBinaryExpr`], [`LogicalNotExpr`], [`ConjunctExpr`],
//!   [`AlwaysTrueExpr`] - combinators over bool vectors

pub mod arith;
pub mod binary_range;
pub mod compare;
pub mod compile;
pub mod json;
pub mod logical;
pub mod segment_cursor;
pub mod term;
pub mod unary;

use smallvec::SmallVec;

use crate::core::{ArithOp, BoolVector, CompareOp, DataType, FieldId, LogicalOp, Result, ScalarValue};

pub use arith::ArithRangeExpr;
pub use binary_range::BinaryRangeExpr;
pub use compare::CompareExpr;
pub use compile::compile;
pub use json::{ExistsExpr, JsonContainsExpr};
pub use logical::{AlwaysTrueExpr, ConjunctExpr, LogicalBinaryExpr, LogicalNotExpr};
pub use segment_cursor::SegmentCursor;
pub use term::TermExpr;
pub use unary::UnaryRangeExpr;

/// Column reference carried by leaf expressions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub field_id: FieldId,
    pub data_type: DataType,
    /// Path into a JSON document, outermost key first
    pub nested_path: SmallVec<[String; 2]>,
}

impl ColumnInfo {
    pub fn new(field_id: FieldId, data_type: DataType) -> Self {
        ColumnInfo {
            field_id,
            data_type,
            nested_path: SmallVec::new(),
        }
    }

    /// Builder method to descend into a JSON document
    pub fn with_nested_path<I, S>(mut self, path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.nested_path = path.into_iter().map(Into::into).collect();
        self
    }
}

/// JSON-contains matching mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainsMode {
    /// At least one literal appears in the array
    Any,
    /// Every literal appears in the array
    All,
}

/// Logical filter-expression tree
///
/// The root of a filter plan is statically BOOL; every node here evaluates
/// to a boolean row selection.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedExpr {
    /// `col OP const`
    UnaryRange {
        column: ColumnInfo,
        op: CompareOp,
        value: ScalarValue,
    },

    /// `lower (<|<=) col (<|<=) upper`
    BinaryRange {
        column: ColumnInfo,
        lower: ScalarValue,
        upper: ScalarValue,
        lower_inclusive: bool,
        upper_inclusive: bool,
    },

    /// `col IN (values)`; with `is_in_field`, the single value is probed for
    /// membership in the JSON array at the column's nested path
    Term {
        column: ColumnInfo,
        values: Vec<ScalarValue>,
        is_in_field: bool,
    },

    /// `(col ARITH operand) OP value`, OP restricted to `==` / `!=`
    ArithRange {
        column: ColumnInfo,
        arith_op: ArithOp,
        right_operand: ScalarValue,
        op: CompareOp,
        value: ScalarValue,
    },

    /// `left_col OP right_col`
    Compare {
        left: ColumnInfo,
        right: ColumnInfo,
        op: CompareOp,
    },

    /// JSON pointer resolves to any value
    Exists { column: ColumnInfo },

    /// JSON array at the nested path contains any/all of the literals
    JsonContains {
        column: ColumnInfo,
        mode: ContainsMode,
        values: Vec<ScalarValue>,
    },

    /// `left OP right` over bool vectors
    Binary {
        op: LogicalOp,
        left: Box<TypedExpr>,
        right: Box<TypedExpr>,
    },

    /// `NOT child`
    Not { child: Box<TypedExpr> },

    /// Every visible row passes
    AlwaysTrue,
}

impl TypedExpr {
    /// `col OP const`
    pub fn unary_range(column: ColumnInfo, op: CompareOp, value: impl Into<ScalarValue>) -> Self {
        TypedExpr::UnaryRange {
            column,
            op,
            value: value.into(),
        }
    }

    /// `lower (<|<=) col (<|<=) upper`
    pub fn binary_range(
        column: ColumnInfo,
        lower: impl Into<ScalarValue>,
        upper: impl Into<ScalarValue>,
        lower_inclusive: bool,
        upper_inclusive: bool,
    ) -> Self {
        TypedExpr::BinaryRange {
            column,
            lower: lower.into(),
            upper: upper.into(),
            lower_inclusive,
            upper_inclusive,
        }
    }

    /// `col IN (values)`
    pub fn term<V: Into<ScalarValue>>(column: ColumnInfo, values: impl IntoIterator<Item = V>) -> Self {
        TypedExpr::Term {
            column,
            values: values.into_iter().map(Into::into).collect(),
            is_in_field: false,
        }
    }

    /// `value IN col` over the JSON array at the column's nested path
    pub fn term_in_field(column: ColumnInfo, value: impl Into<ScalarValue>) -> Self {
        TypedExpr::Term {
            column,
            values: vec![value.into()],
            is_in_field: true,
        }
    }

    /// `(col ARITH operand) OP value`
    pub fn arith_range(
        column: ColumnInfo,
        arith_op: ArithOp,
        right_operand: impl Into<ScalarValue>,
        op: CompareOp,
        value: impl Into<ScalarValue>,
    ) -> Self {
        TypedExpr::ArithRange {
            column,
            arith_op,
            right_operand: right_operand.into(),
            op,
            value: value.into(),
        }
    }

    /// `left_col OP right_col`
    pub fn compare(left: ColumnInfo, right: ColumnInfo, op: CompareOp) -> Self {
        TypedExpr::Compare { left, right, op }
    }

    /// JSON pointer resolves to any value
    pub fn exists(column: ColumnInfo) -> Self {
        TypedExpr::Exists { column }
    }

    /// JSON array contains any/all of the literals
    pub fn json_contains<V: Into<ScalarValue>>(
        column: ColumnInfo,
        mode: ContainsMode,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        TypedExpr::JsonContains {
            column,
            mode,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// `self AND other`
    pub fn and(self, other: TypedExpr) -> Self {
        TypedExpr::Binary {
            op: LogicalOp::And,
            left: Box::new(self),
            right: Box::new(other),
        }
    }

    /// `self OR other`
    pub fn or(self, other: TypedExpr) -> Self {
        TypedExpr::Binary {
            op: LogicalOp::Or,
            left: Box::new(self),
            right: Box::new(other),
        }
    }

    /// `self XOR other`
    pub fn xor(self, other: TypedExpr) -> Self {
        TypedExpr::Binary {
            op: LogicalOp::Xor,
            left: Box::new(self),
            right: Box::new(other),
        }
    }

    /// `self AND NOT other`
    pub fn minus(self, other: TypedExpr) -> Self {
        TypedExpr::Binary {
            op: LogicalOp::Minus,
            left: Box::new(self),
            right: Box::new(other),
        }
    }

    /// `NOT self`
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        TypedExpr::Not {
            child: Box::new(self),
        }
    }

    /// Static result type; BOOL for every filter node
    pub fn data_type(&self) -> DataType {
        DataType::Bool
    }
}

/// Physical filter expression
///
/// Leaves hold evaluation cursors; inner nodes own their children. Trees
/// are compiled per invocation, so no state survives across queries.
#[derive(Debug)]
pub enum Expr {
    UnaryRange(UnaryRangeExpr),
    BinaryRange(BinaryRangeExpr),
    Term(TermExpr),
    ArithRange(ArithRangeExpr),
    Compare(CompareExpr),
    Exists(ExistsExpr),
    JsonContains(JsonContainsExpr),
    Logical(LogicalBinaryExpr),
    Not(LogicalNotExpr),
    Conjunct(ConjunctExpr),
    AlwaysTrue(AlwaysTrueExpr),
}

impl Expr {
    /// Produce the next batch, or `None` when the row stream is exhausted
    pub fn eval(&mut self) -> Result<Option<BoolVector>> {
        match self {
            Expr::UnaryRange(e) => e.eval(),
            Expr::BinaryRange(e) => e.eval(),
            Expr::Term(e) => e.eval(),
            Expr::ArithRange(e) => e.eval(),
            Expr::Compare(e) => e.eval(),
            Expr::Exists(e) => e.eval(),
            Expr::JsonContains(e) => e.eval(),
            Expr::Logical(e) => e.eval(),
            Expr::Not(e) => e.eval(),
            Expr::Conjunct(e) => e.eval(),
            Expr::AlwaysTrue(e) => e.eval(),
        }
    }

    /// Advance one batch without computing it; returns the rows skipped
    ///
    /// Used by the n-ary conjunction so short-circuited children keep the
    /// same batch boundaries as evaluated ones.
    pub fn skip_batch(&mut self) -> Result<usize> {
        match self {
            Expr::UnaryRange(e) => e.skip_batch(),
            Expr::BinaryRange(e) => e.skip_batch(),
            Expr::Term(e) => e.skip_batch(),
            Expr::ArithRange(e) => e.skip_batch(),
            Expr::Compare(e) => e.skip_batch(),
            Expr::Exists(e) => e.skip_batch(),
            Expr::JsonContains(e) => e.skip_batch(),
            Expr::Logical(e) => e.skip_batch(),
            Expr::Not(e) => e.skip_batch(),
            Expr::Conjunct(e) => e.skip_batch(),
            Expr::AlwaysTrue(e) => e.skip_batch(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_builders() {
        let col = ColumnInfo::new(FieldId(1), DataType::Int64);
        let expr = TypedExpr::unary_range(col.clone(), CompareOp::Lt, 10i64)
            .and(TypedExpr::unary_range(col, CompareOp::Ge, 0i64))
            .not();
        assert_eq!(expr.data_type(), DataType::Bool);
        match expr {
            TypedExpr::Not { child } => match *child {
                TypedExpr::Binary { op, .. } => assert_eq!(op, LogicalOp::And),
                other => panic!("unexpected node {:?}", other),
            },
            other => panic!("unexpected node {:?}", other),
        }
    }

    #[test]
    fn test_nested_path() {
        let col = ColumnInfo::new(FieldId(5), DataType::Json).with_nested_path(["a", "b"]);
        assert_eq!(col.nested_path.as_slice(), &["a", "b"]);
    }
}

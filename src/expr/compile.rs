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

//! Compilation of the logical tree into physical evaluators
//!
//! One compile per filter invocation; the produced tree owns all mutable
//! evaluation state. With `eval_simplified` set, nested same-operator
//! AND/OR subtrees flatten into one n-ary conjunct so the short-circuit
//! spans the whole run instead of one pair at a time.

use std::sync::Arc;

use crate::core::{LogicalOp, Result, Timestamp};
use crate::storage::config::EvalConfig;
use crate::storage::segment::Segment;

use super::arith::ArithRangeExpr;
use super::binary_range::BinaryRangeExpr;
use super::compare::CompareExpr;
use super::json::{ExistsExpr, JsonContainsExpr};
use super::logical::{AlwaysTrueExpr, ConjunctExpr, LogicalBinaryExpr, LogicalNotExpr};
use super::term::TermExpr;
use super::unary::UnaryRangeExpr;
use super::{Expr, TypedExpr};

/// Compile a logical filter tree against a segment snapshot
pub fn compile(
    expr: &TypedExpr,
    segment: &Arc<Segment>,
    query_timestamp: Timestamp,
    config: &EvalConfig,
) -> Result<Expr> {
    build(
        expr,
        segment,
        query_timestamp,
        config.eval_batch_size,
        config.eval_simplified,
    )
}

fn build(
    expr: &TypedExpr,
    segment: &Arc<Segment>,
    ts: Timestamp,
    batch_size: usize,
    simplified: bool,
) -> Result<Expr> {
    match expr {
        TypedExpr::UnaryRange { column, op, value } => Ok(Expr::UnaryRange(UnaryRangeExpr::new(
            column.clone(),
            *op,
            value.clone(),
            segment.clone(),
            ts,
            batch_size,
        )?)),
        TypedExpr::BinaryRange {
            column,
            lower,
            upper,
            lower_inclusive,
            upper_inclusive,
        } => Ok(Expr::BinaryRange(BinaryRangeExpr::new(
            column.clone(),
            lower.clone(),
            upper.clone(),
            *lower_inclusive,
            *upper_inclusive,
            segment.clone(),
            ts,
            batch_size,
        )?)),
        TypedExpr::Term {
            column,
            values,
            is_in_field,
        } => Ok(Expr::Term(TermExpr::new(
            column.clone(),
            values.clone(),
            *is_in_field,
            segment.clone(),
            ts,
            batch_size,
        )?)),
        TypedExpr::ArithRange {
            column,
            arith_op,
            right_operand,
            op,
            value,
        } => Ok(Expr::ArithRange(ArithRangeExpr::new(
            column.clone(),
            *arith_op,
            right_operand.clone(),
            *op,
            value.clone(),
            segment.clone(),
            ts,
            batch_size,
        )?)),
        TypedExpr::Compare { left, right, op } => Ok(Expr::Compare(CompareExpr::new(
            left.clone(),
            right.clone(),
            *op,
            segment.clone(),
            ts,
            batch_size,
        )?)),
        TypedExpr::Exists { column } => Ok(Expr::Exists(ExistsExpr::new(
            column.clone(),
            segment.clone(),
            ts,
            batch_size,
        )?)),
        TypedExpr::JsonContains {
            column,
            mode,
            values,
        } => Ok(Expr::JsonContains(JsonContainsExpr::new(
            column.clone(),
            *mode,
            values.clone(),
            segment.clone(),
            ts,
            batch_size,
        )?)),
        TypedExpr::Binary { op, left, right } => {
            if simplified && matches!(op, LogicalOp::And | LogicalOp::Or) {
                let mut flat = Vec::new();
                flatten(expr, *op, &mut flat);
                let children = flat
                    .into_iter()
                    .map(|child| build(child, segment, ts, batch_size, simplified))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Expr::Conjunct(ConjunctExpr::new(
                    *op == LogicalOp::And,
                    children,
                )?))
            } else {
                Ok(Expr::Logical(LogicalBinaryExpr::new(
                    *op,
                    build(left, segment, ts, batch_size, simplified)?,
                    build(right, segment, ts, batch_size, simplified)?,
                )))
            }
        }
        TypedExpr::Not { child } => Ok(Expr::Not(LogicalNotExpr::new(build(
            child, segment, ts, batch_size, simplified,
        )?))),
        TypedExpr::AlwaysTrue => Ok(Expr::AlwaysTrue(AlwaysTrueExpr::new(
            segment, ts, batch_size,
        )?)),
    }
}

// gather the leaves of a same-operator AND/OR subtree, left to right
fn flatten<'a>(expr: &'a TypedExpr, op: LogicalOp, out: &mut Vec<&'a TypedExpr>) {
    match expr {
        TypedExpr::Binary {
            op: node_op,
            left,
            right,
        } if *node_op == op => {
            flatten(left, op, out);
            flatten(right, op, out);
        }
        other => out.push(other),
    }
}

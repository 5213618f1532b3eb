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

//! Algebraic identities over produced bitsets

use rustc_hash::FxHashMap;
use sievedb::{
    execute_filter, Bitset, ColumnBatch, ColumnInfo, CompareOp, DataType, EvalConfig, FieldId,
    Schema, ScalarValue, Segment, TypedExpr, MAX_TIMESTAMP,
};
use std::sync::Arc;

const X: FieldId = FieldId(1);

fn segment() -> Arc<Segment> {
    let schema = Schema::new().add_field(X, "x", DataType::Int64);
    let segment = Segment::growing(schema, 64).unwrap();
    let mut batches = FxHashMap::default();
    batches.insert(X, ColumnBatch::Int64((0..500).map(|v| (v * 37) % 101).collect()));
    let timestamps: Vec<u64> = (1..=500).collect();
    segment.insert(&timestamps, &batches).unwrap();
    segment
}

fn eval(segment: &Arc<Segment>, plan: &TypedExpr) -> Bitset {
    execute_filter(segment, plan, MAX_TIMESTAMP, &EvalConfig::new(), None).unwrap()
}

fn p() -> TypedExpr {
    TypedExpr::unary_range(
        ColumnInfo::new(X, DataType::Int64),
        CompareOp::Lt,
        ScalarValue::Int64(50),
    )
}

fn q() -> TypedExpr {
    TypedExpr::unary_range(
        ColumnInfo::new(X, DataType::Int64),
        CompareOp::Ge,
        ScalarValue::Int64(20),
    )
}

#[test]
fn test_double_negation() {
    let segment = segment();
    assert_eq!(eval(&segment, &p().not().not()), eval(&segment, &p()));
}

#[test]
fn test_and_absorption() {
    // (P AND Q) OR (P AND NOT Q) == P
    let segment = segment();
    let composed = p().and(q()).or(p().and(q().not()));
    assert_eq!(eval(&segment, &composed), eval(&segment, &p()));
}

#[test]
fn test_repeat_evaluation_is_deterministic() {
    let segment = segment();
    let plan = p().and(q()).xor(q().not());
    let first = eval(&segment, &plan);
    let second = eval(&segment, &plan);
    assert_eq!(first, second);
}

#[test]
fn test_binary_ops_agree_with_per_element_definitions() {
    let segment = segment();
    let p_bits = eval(&segment, &p());
    let q_bits = eval(&segment, &q());

    let and = eval(&segment, &p().and(q()));
    let or = eval(&segment, &p().or(q()));
    let xor = eval(&segment, &p().xor(q()));
    let minus = eval(&segment, &p().minus(q()));

    for i in 0..p_bits.len() {
        assert_eq!(and.get(i), p_bits.get(i) && q_bits.get(i), "AND bit {}", i);
        assert_eq!(or.get(i), p_bits.get(i) || q_bits.get(i), "OR bit {}", i);
        assert_eq!(xor.get(i), p_bits.get(i) ^ q_bits.get(i), "XOR bit {}", i);
        assert_eq!(
            minus.get(i),
            p_bits.get(i) && !q_bits.get(i),
            "MINUS bit {}",
            i
        );
    }
}

#[test]
fn test_simplified_flattening_preserves_results() {
    let segment = segment();
    let plan = p().and(q()).and(p().or(q()));
    let plain = execute_filter(&segment, &plan, MAX_TIMESTAMP, &EvalConfig::new(), None).unwrap();
    let simplified = execute_filter(
        &segment,
        &plan,
        MAX_TIMESTAMP,
        &EvalConfig::new().with_simplified(true),
        None,
    )
    .unwrap();
    assert_eq!(plain, simplified);
}

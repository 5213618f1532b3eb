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

//! End-to-end filter scenarios over growing segments

use rustc_hash::FxHashMap;
use serde_json::json;
use sievedb::{
    execute_filter, ArithOp, ColumnBatch, ColumnInfo, CompareOp, ContainsMode, DataType,
    EvalConfig, FieldId, Schema, ScalarValue, Segment, TypedExpr, MAX_TIMESTAMP,
};
use std::sync::Arc;

const ID: FieldId = FieldId(100);

fn int64_segment(n: i64) -> Arc<Segment> {
    let schema = Schema::new().add_field(ID, "id", DataType::Int64);
    let segment = Segment::growing(schema, 256).unwrap();
    let mut batches = FxHashMap::default();
    batches.insert(ID, ColumnBatch::Int64((0..n).collect()));
    let timestamps: Vec<u64> = (1..=n as u64).collect();
    segment.insert(&timestamps, &batches).unwrap();
    segment
}

fn id_col() -> ColumnInfo {
    ColumnInfo::new(ID, DataType::Int64)
}

#[test]
fn test_point_range_on_int64() {
    let segment = int64_segment(1000);
    let plan = TypedExpr::unary_range(id_col(), CompareOp::Lt, ScalarValue::Int64(10));
    let bits = execute_filter(&segment, &plan, MAX_TIMESTAMP, &EvalConfig::new(), None).unwrap();

    assert_eq!(bits.len(), 1000);
    assert_eq!(bits.count_ones(), 10);
    for i in 0..10 {
        assert!(bits.get(i), "bit {} should be set", i);
    }
    for i in 10..1000 {
        assert!(!bits.get(i), "bit {} should be clear", i);
    }
}

#[test]
fn test_composed_range_and_point() {
    let segment = int64_segment(1000);
    // (id >= 100 AND id < 200) OR id == 500
    let plan = TypedExpr::unary_range(id_col(), CompareOp::Ge, ScalarValue::Int64(100))
        .and(TypedExpr::unary_range(
            id_col(),
            CompareOp::Lt,
            ScalarValue::Int64(200),
        ))
        .or(TypedExpr::unary_range(
            id_col(),
            CompareOp::Eq,
            ScalarValue::Int64(500),
        ));
    let bits = execute_filter(&segment, &plan, MAX_TIMESTAMP, &EvalConfig::new(), None).unwrap();

    assert_eq!(bits.count_ones(), 101);
    for i in 100..200 {
        assert!(bits.get(i));
    }
    assert!(bits.get(500));
    assert!(!bits.get(99));
    assert!(!bits.get(200));
    assert!(!bits.get(501));
}

#[test]
fn test_varchar_prefix_match() {
    let field = FieldId(7);
    let schema = Schema::new().add_field(field, "s", DataType::Varchar);
    let segment = Segment::growing(schema, 16).unwrap();
    let mut batches = FxHashMap::default();
    batches.insert(
        field,
        ColumnBatch::Varchar(vec!["a".into(), "aa".into(), "ab".into(), "b".into()]),
    );
    segment.insert(&[1, 2, 3, 4], &batches).unwrap();

    let plan = TypedExpr::unary_range(
        ColumnInfo::new(field, DataType::Varchar),
        CompareOp::PrefixMatch,
        ScalarValue::string("a"),
    );
    let bits = execute_filter(&segment, &plan, MAX_TIMESTAMP, &EvalConfig::new(), None).unwrap();

    assert!(bits.get(0));
    assert!(bits.get(1));
    assert!(bits.get(2));
    assert!(!bits.get(3));
    assert_eq!(bits.count_ones(), 3);
}

#[test]
fn test_arith_on_range() {
    let field = FieldId(3);
    let schema = Schema::new().add_field(field, "x", DataType::Int32);
    let segment = Segment::growing(schema, 16).unwrap();
    let mut batches = FxHashMap::default();
    batches.insert(field, ColumnBatch::Int32(vec![1, 2, 3, 4, 5]));
    segment.insert(&[1, 2, 3, 4, 5], &batches).unwrap();

    // (x * 2) == 6 selects only x == 3
    let plan = TypedExpr::arith_range(
        ColumnInfo::new(field, DataType::Int32),
        ArithOp::Mul,
        ScalarValue::Int64(2),
        CompareOp::Eq,
        ScalarValue::Int64(6),
    );
    let bits = execute_filter(&segment, &plan, MAX_TIMESTAMP, &EvalConfig::new(), None).unwrap();
    assert_eq!(bits.count_ones(), 1);
    assert!(bits.get(2));

    // (x % 2) == 0 selects the even values
    let plan = TypedExpr::arith_range(
        ColumnInfo::new(field, DataType::Int32),
        ArithOp::Mod,
        ScalarValue::Int64(2),
        CompareOp::Eq,
        ScalarValue::Int64(0),
    );
    let bits = execute_filter(&segment, &plan, MAX_TIMESTAMP, &EvalConfig::new(), None).unwrap();
    assert_eq!(bits.count_ones(), 2);
    assert!(bits.get(1));
    assert!(bits.get(3));
}

#[test]
fn test_json_contains_all() {
    let field = FieldId(9);
    let schema = Schema::new().add_field(field, "j", DataType::Json);
    let segment = Segment::growing(schema, 16).unwrap();
    let mut batches = FxHashMap::default();
    batches.insert(
        field,
        ColumnBatch::Json(vec![json!({"a": [1, 2, 3]}), json!({"a": [4]})]),
    );
    segment.insert(&[1, 2], &batches).unwrap();

    let plan = TypedExpr::json_contains(
        ColumnInfo::new(field, DataType::Json).with_nested_path(["a"]),
        ContainsMode::All,
        [ScalarValue::Int64(1), ScalarValue::Int64(3)],
    );
    let bits = execute_filter(&segment, &plan, MAX_TIMESTAMP, &EvalConfig::new(), None).unwrap();
    assert!(bits.get(0));
    assert!(!bits.get(1));
}

#[test]
fn test_query_timestamp_bounds_visibility() {
    let t_field = FieldId(1);
    let v_field = FieldId(2);
    let schema = Schema::new()
        .add_field(t_field, "t", DataType::Int64)
        .add_field(v_field, "v", DataType::Int64);
    let segment = Segment::growing(schema, 128).unwrap();
    let mut batches = FxHashMap::default();
    batches.insert(t_field, ColumnBatch::Int64((0..1000).collect()));
    batches.insert(v_field, ColumnBatch::Int64((0..1000).map(|v| v % 7).collect()));
    let timestamps: Vec<u64> = (1..=1000).collect();
    segment.insert(&timestamps, &batches).unwrap();

    // at the 500th row's timestamp only rows [0, 500) are visible
    let t_500 = 500;
    let plan = TypedExpr::AlwaysTrue;
    let bits = execute_filter(&segment, &plan, t_500, &EvalConfig::new(), None).unwrap();
    assert_eq!(bits.len(), 500);
    assert_eq!(bits.count_ones(), 500);

    // a real predicate sees the same bound
    let plan = TypedExpr::unary_range(
        ColumnInfo::new(v_field, DataType::Int64),
        CompareOp::Eq,
        ScalarValue::Int64(3),
    );
    let bits = execute_filter(&segment, &plan, t_500, &EvalConfig::new(), None).unwrap();
    assert_eq!(bits.len(), 500);
    let expected = (0..500).filter(|v| v % 7 == 3).count();
    assert_eq!(bits.count_ones(), expected);
}

#[test]
fn test_small_batches_agree_with_large() {
    let segment = int64_segment(1000);
    let plan = TypedExpr::unary_range(id_col(), CompareOp::Ge, ScalarValue::Int64(750));

    let big = execute_filter(&segment, &plan, MAX_TIMESTAMP, &EvalConfig::new(), None).unwrap();
    let small = execute_filter(
        &segment,
        &plan,
        MAX_TIMESTAMP,
        &EvalConfig::new().with_batch_size(17),
        None,
    )
    .unwrap();
    assert_eq!(big, small);
    assert_eq!(big.count_ones(), 250);
}

#[test]
fn test_empty_result_short_circuit_signal() {
    let segment = int64_segment(100);
    let plan = TypedExpr::unary_range(id_col(), CompareOp::Lt, ScalarValue::Int64(0));
    let bits = execute_filter(&segment, &plan, MAX_TIMESTAMP, &EvalConfig::new(), None).unwrap();
    // zero cardinality tells the caller to skip vector search
    assert!(bits.none());
    assert_eq!(bits.len(), 100);
}

#[test]
fn test_deleted_rows_masked() {
    let segment = int64_segment(100);
    segment.delete(3, 50).unwrap();
    segment.delete(7, 2000).unwrap();

    let plan = TypedExpr::unary_range(id_col(), CompareOp::Lt, ScalarValue::Int64(10));

    // both deletes visible at MAX_TIMESTAMP
    let bits = execute_filter(&segment, &plan, MAX_TIMESTAMP, &EvalConfig::new(), None).unwrap();
    assert_eq!(bits.count_ones(), 8);
    assert!(!bits.get(3));
    assert!(!bits.get(7));

    // at ts 100 only the first delete applies
    let bits = execute_filter(&segment, &plan, 100, &EvalConfig::new(), None).unwrap();
    assert!(!bits.get(3));
    assert!(bits.get(7));
    assert_eq!(bits.count_ones(), 9);
}

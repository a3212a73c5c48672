//! Chunking properties of batched inserts.

use sqlbatch_core::prelude::*;
use sqlbatch_core::{BatchPlan, ValidationError};

fn rows(n: usize, k: usize) -> Vec<Row> {
    (0..n)
        .map(|i| (0..k).map(|c| (format!("c{c}"), (i * k + c) as i64)).collect())
        .collect()
}

fn expected_chunks(n: usize, k: usize, max: usize) -> usize {
    let total_values = n * k;
    let per_statement = (max / k) * k;
    total_values.div_ceil(per_statement)
}

#[test]
fn chunk_count_matches_formula() {
    for (n, k, max) in [
        (1, 1, 1),
        (10, 3, 9),
        (10, 3, 10),
        (7, 2, 60_000),
        (30_001, 2, 60_000),
        (60_000, 1, 60_000),
        (60_001, 1, 60_000),
        (100, 7, 20),
    ] {
        let plan = BatchPlan::new(n, k, max).unwrap();
        assert_eq!(
            plan.chunk_count(),
            expected_chunks(n, k, max),
            "n={n} k={k} max={max}"
        );
        assert_eq!(plan.ranges().count(), plan.chunk_count());
    }
}

#[test]
fn chunks_preserve_input_order() {
    let rows = rows(23, 3);
    let chunks: Vec<_> = BatchInsert::new("t", &rows)
        .compile(Dialect::Sqlite, 10)
        .unwrap()
        .collect();

    assert_eq!(chunks.len(), expected_chunks(23, 3, 10));
    let flattened: Vec<SqlValue> = chunks.iter().flat_map(|c| c.params.clone()).collect();
    let expected: Vec<SqlValue> = (0..69).map(SqlValue::Int).collect();
    assert_eq!(flattened, expected);

    let mut next = 0;
    for chunk in &chunks {
        assert_eq!(chunk.rows.start, next);
        assert!(chunk.params.len() <= 10);
        assert_eq!(chunk.params.len(), chunk.rows.len() * 3);
        next = chunk.rows.end;
    }
    assert_eq!(next, 23);
}

#[test]
fn every_statement_stays_under_the_ceiling() {
    let rows = rows(1000, 4);
    for chunk in BatchInsert::new("t", &rows)
        .ignore()
        .compile(Dialect::MySql, 150)
        .unwrap()
    {
        let placeholders = chunk.sql.matches('?').count();
        assert_eq!(placeholders, chunk.params.len());
        assert!(placeholders <= 150);
    }
}

#[test]
fn row_wider_than_ceiling_is_rejected() {
    let rows = rows(3, 5);
    let result = BatchInsert::new("t", &rows).compile(Dialect::Sqlite, 4);
    assert!(matches!(
        result,
        Err(ValidationError::RowTooWide {
            columns: 5,
            max_params: 4
        })
    ));
}

#[test]
fn empty_rows_are_rejected() {
    let rows = vec![Row::new()];
    assert_eq!(
        BatchInsert::new("t", &rows).plan(100),
        Err(ValidationError::NoColumns("t".into()))
    );
}

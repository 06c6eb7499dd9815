//! Query-related data models.
//!
//! This module defines the normalized result of running one statement.

use crate::models::value::Row;
use serde::Serialize;

/// Outcome metadata for statements that do not produce rows (mirrors the MySQL OK packet).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecOutcome {
    pub affected_rows: u64,
    pub insert_id: u64,
}

/// What a statement returned: a row sequence or outcome metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QueryData {
    Rows(Vec<Row>),
    Outcome(ExecOutcome),
}

impl QueryData {
    pub fn rows(&self) -> Option<&[Row]> {
        match self {
            Self::Rows(rows) => Some(rows),
            Self::Outcome(_) => None,
        }
    }

    pub fn into_rows(self) -> Option<Vec<Row>> {
        match self {
            Self::Rows(rows) => Some(rows),
            Self::Outcome(_) => None,
        }
    }
}

/// Normalized statement result, serialized as the `query` tool envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    pub success: bool,
    pub row_count: usize,
    pub data: QueryData,
}

impl QueryResult {
    /// `row_count` is the number of rows for row results and 0 otherwise.
    pub fn from_data(data: QueryData) -> Self {
        let row_count = data.rows().map_or(0, <[Row]>::len);
        Self {
            success: true,
            row_count,
            data,
        }
    }
}

//! Sheets v4 value ranges.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::info;

use crate::api::{ApiClient, ApiError};

/// Errors raised by the Sheets client.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum SheetsError {
    /// Raised when the range is empty.
    #[error("range must not be empty")]
    EmptyRange,
    /// Wrapper for API level failures.
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Values of a range as returned by `values.get`.
#[derive(Debug, Default, Deserialize)]
pub struct ValueRange {
    /// Range the values cover, in A1 notation.
    #[serde(default)]
    pub range: Option<String>,
    /// Rows of cells; trailing empty rows and cells are omitted by the API.
    #[serde(default)]
    pub values: Vec<Vec<Value>>,
}

#[derive(Debug, Serialize)]
struct ValueRangeBody<'a> {
    range: &'a str,
    values: &'a [Vec<String>],
}

/// Result of `values.update`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateValuesResponse {
    /// Range that was written.
    #[serde(default)]
    pub updated_range: Option<String>,
    /// Number of cells written.
    #[serde(default)]
    pub updated_cells: u64,
}

/// Client for a single spreadsheet.
#[derive(Clone, Debug)]
pub struct SheetsClient {
    api: ApiClient,
    spreadsheet_id: String,
}

fn cell_text(value: Value) -> String {
    match value {
        Value::String(text) => text,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

impl SheetsClient {
    /// Creates a client for `spreadsheet_id`.
    #[must_use]
    pub fn new(api: ApiClient, spreadsheet_id: impl Into<String>) -> Self {
        Self {
            api,
            spreadsheet_id: spreadsheet_id.into(),
        }
    }

    /// Spreadsheet the client reads and writes.
    #[must_use]
    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    /// Reads a range as rows of cell text. An empty range yields no rows.
    ///
    /// # Errors
    ///
    /// Returns [`SheetsError::EmptyRange`] for a blank range and
    /// [`SheetsError::Api`] when the read fails.
    pub async fn read_range(&self, range: &str) -> Result<Vec<Vec<String>>, SheetsError> {
        if range.trim().is_empty() {
            return Err(SheetsError::EmptyRange);
        }
        let url = self.api.url(&[
            "spreadsheets",
            self.spreadsheet_id.as_str(),
            "values",
            range,
        ])?;
        let result: ValueRange = self.api.get_json(&url).await?;
        let rows = result
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect::<Vec<Vec<String>>>();
        info!(range, rows = rows.len(), "read range");
        Ok(rows)
    }

    /// Overwrites a range with raw, unparsed values and returns the number of
    /// cells updated.
    ///
    /// # Errors
    ///
    /// Returns [`SheetsError::EmptyRange`] for a blank range and
    /// [`SheetsError::Api`] when the update fails.
    pub async fn write_range(&self, range: &str, rows: &[Vec<String>]) -> Result<u64, SheetsError> {
        if range.trim().is_empty() {
            return Err(SheetsError::EmptyRange);
        }
        let mut url = self.api.url(&[
            "spreadsheets",
            self.spreadsheet_id.as_str(),
            "values",
            range,
        ])?;
        url.query_pairs_mut().append_pair("valueInputOption", "RAW");
        let body = ValueRangeBody {
            range,
            values: rows,
        };
        let result: UpdateValuesResponse = self.api.put_json(&url, &body).await?;
        info!(range, updated_cells = result.updated_cells, "updated range");
        Ok(result.updated_cells)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case(json!("Alice"), "Alice")]
    #[case(json!(30), "30")]
    #[case(json!(true), "true")]
    #[case(Value::Null, "")]
    fn cells_render_as_text(#[case] value: Value, #[case] expected: &str) {
        assert_eq!(cell_text(value), expected);
    }

    #[rstest]
    fn missing_values_decode_as_empty() {
        let range: ValueRange = serde_json::from_value(json!({"range": "Sheet1!A1:C10"}))
            .unwrap_or_else(|err| panic!("decode: {err}"));
        assert!(range.values.is_empty());
    }
}

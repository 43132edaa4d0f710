//! Owned result sets and typed row deserialization.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::error::{DuckDbError, DuckDbResult};
use crate::rows::{Row, Rows};
use crate::value::Value;

/// Trait for deserializing rows into typed structs.
///
/// Implemented for every `serde` deserializable type; columns map to fields
/// by name.
pub trait FromRow: Sized {
    /// Deserialize from a JSON object keyed by column name.
    fn from_json(json: JsonValue) -> DuckDbResult<Self>;

    /// Deserialize from a row.
    fn from_row(row: &Row) -> DuckDbResult<Self> {
        Self::from_json(row.to_json())
    }
}

impl<T: DeserializeOwned> FromRow for T {
    fn from_json(json: JsonValue) -> DuckDbResult<Self> {
        serde_json::from_value(json)
            .map_err(|e| DuckDbError::deserialization(format!("failed to deserialize row: {}", e)))
    }
}

/// Extension trait for converting JSON values to typed rows.
pub trait JsonRowExt {
    /// Convert to a typed row.
    fn to_row<T: FromRow>(&self) -> DuckDbResult<T>;
}

impl JsonRowExt for JsonValue {
    fn to_row<T: FromRow>(&self) -> DuckDbResult<T> {
        T::from_json(self.clone())
    }
}

/// A fully materialized query result.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultSet {
    /// Column names.
    pub columns: Vec<String>,
    /// Rows of values in column order.
    #[serde(skip)]
    pub rows: Vec<Vec<Value>>,
}

impl ResultSet {
    /// Drain a cursor.
    pub fn from_rows(rows: Rows<'_>) -> DuckDbResult<Self> {
        let columns = rows.column_names().to_vec();
        let rows = rows
            .map(|row| row.map(Row::into_values))
            .collect::<DuckDbResult<_>>()?;
        Ok(Self { columns, rows })
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether there are no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The value at `row`, `col`.
    pub fn value(&self, row: usize, col: usize) -> Option<&Value> {
        self.rows.get(row).and_then(|r| r.get(col))
    }

    /// Rows as JSON objects keyed by column name.
    pub fn to_json(&self) -> Vec<JsonValue> {
        self.rows
            .iter()
            .map(|row| {
                JsonValue::Object(
                    self.columns
                        .iter()
                        .zip(row)
                        .map(|(c, v)| (c.clone(), v.to_json()))
                        .collect(),
                )
            })
            .collect()
    }

    /// Deserialize every row.
    pub fn deserialize<T: FromRow>(&self) -> DuckDbResult<Vec<T>> {
        self.to_json().into_iter().map(T::from_json).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Connection;
    use serde::Deserialize;
    use tokio_util::sync::CancellationToken;

    #[derive(Debug, Deserialize, PartialEq)]
    struct User {
        id: i64,
        name: String,
    }

    #[test]
    fn test_from_json() {
        let json = serde_json::json!({
            "id": 1,
            "name": "Alice"
        });

        let user = User::from_json(json).unwrap();
        assert_eq!(user.id, 1);
        assert_eq!(user.name, "Alice");
    }

    #[test]
    fn test_json_row_ext() {
        let json = serde_json::json!({"id": 2, "name": "Bob"});
        let user: User = json.to_row().unwrap();
        assert_eq!(user, User { id: 2, name: "Bob".into() });
    }

    #[test]
    fn test_from_json_error() {
        let json = serde_json::json!({"id": "not a number", "name": "Alice"});
        let err = User::from_json(json).unwrap_err();
        assert!(matches!(err, DuckDbError::Deserialization(_)));
    }

    #[test]
    fn test_result_set_deserialize() {
        let conn = Connection::open_in_memory().unwrap();
        let rows = conn
            .query(
                &CancellationToken::new(),
                "SELECT * FROM (VALUES (1, 'Alice'), (2, 'Bob')) t(id, name) ORDER BY id",
                &[],
            )
            .unwrap();
        let set = ResultSet::from_rows(rows).unwrap();
        assert_eq!(set.columns, vec!["id", "name"]);
        assert_eq!(set.len(), 2);
        assert_eq!(set.value(1, 1), Some(&Value::Text("Bob".into())));

        let users: Vec<User> = set.deserialize().unwrap();
        assert_eq!(users[0], User { id: 1, name: "Alice".into() });

        let row = conn
            .query(&CancellationToken::new(), "SELECT 3 AS id, 'Cy' AS name", &[])
            .unwrap()
            .next()
            .unwrap()
            .unwrap();
        assert_eq!(User::from_row(&row).unwrap(), User { id: 3, name: "Cy".into() });
    }
}

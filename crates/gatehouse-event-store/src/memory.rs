//! In-memory key-value table with an insert change feed.
//!
//! Backs local runs and the test suite. Tables are declared up front with
//! their key schema; saves honor "must not exist" preconditions against the
//! composite key, and every mutation is pushed to that table's change feed
//! subscribers.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use gatehouse_core::error::Error;
use gatehouse_core::table::{
    ChangeKind, ChangeNotification, KeyValueTable, ListFilter, SaveCondition,
};

struct TableState {
    key_fields: Vec<String>,
    rows: BTreeMap<String, Value>,
}

/// In-memory [`KeyValueTable`].
#[derive(Default)]
pub struct MemoryTable {
    tables: Mutex<HashMap<String, TableState>>,
    feeds: Mutex<HashMap<String, Vec<mpsc::UnboundedSender<ChangeNotification>>>>,
}

impl MemoryTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a table and its key schema (one or two key attributes).
    pub fn declare(&self, table: &str, key_fields: &[&str]) {
        if let Ok(mut tables) = self.tables.lock() {
            tables.insert(
                table.to_owned(),
                TableState {
                    key_fields: key_fields.iter().map(|&field| field.to_owned()).collect(),
                    rows: BTreeMap::new(),
                },
            );
        }
    }

    /// Subscribes to the change feed of one table.
    ///
    /// Every save and delete on that table is delivered as a
    /// [`ChangeNotification`]; closed receivers are dropped silently.
    pub fn subscribe(&self, table: &str) -> mpsc::UnboundedReceiver<ChangeNotification> {
        let (sender, receiver) = mpsc::unbounded_channel();
        if let Ok(mut feeds) = self.feeds.lock() {
            feeds.entry(table.to_owned()).or_default().push(sender);
        }
        receiver
    }

    fn tables(&self) -> Result<MutexGuard<'_, HashMap<String, TableState>>, Error> {
        self.tables
            .lock()
            .map_err(|_| Error::Internal("memory table state poisoned".to_owned()))
    }

    fn notify(&self, table: &str, kind: ChangeKind, new_image: Option<Value>) {
        let Ok(mut feeds) = self.feeds.lock() else {
            return;
        };
        if let Some(senders) = feeds.get_mut(table) {
            let notification = ChangeNotification {
                table: table.to_owned(),
                kind,
                new_image,
            };
            senders.retain(|sender| sender.send(notification.clone()).is_ok());
        }
    }
}

fn attribute_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn composite_key(state: &TableState, record: &Value) -> Result<String, Error> {
    let mut parts = Vec::with_capacity(state.key_fields.len());
    for field in &state.key_fields {
        let Some(value) = record.get(field) else {
            return Err(Error::Validation(format!(
                "record is missing key attribute {field}"
            )));
        };
        parts.push(attribute_text(value));
    }
    Ok(parts.join("#"))
}

fn matches_contains(record: &Value, contains: &str) -> Result<bool, Error> {
    let Some((attribute, fragment)) = contains.split_once(':') else {
        return Err(Error::Validation(format!(
            "contains filter {contains} is not attr:fragment"
        )));
    };
    Ok(record
        .get(attribute)
        .is_some_and(|value| attribute_text(value).contains(fragment)))
}

#[async_trait]
impl KeyValueTable for MemoryTable {
    async fn get(
        &self,
        table: &str,
        key_name: &str,
        key_value: &str,
    ) -> Result<Option<Value>, Error> {
        let tables = self.tables()?;
        let Some(state) = tables.get(table) else {
            return Err(Error::FileNotFound(format!("table {table}")));
        };
        Ok(state
            .rows
            .values()
            .find(|row| {
                row.get(key_name)
                    .is_some_and(|value| attribute_text(value) == key_value)
            })
            .cloned())
    }

    async fn list(&self, table: &str, filter: ListFilter) -> Result<Vec<Value>, Error> {
        let tables = self.tables()?;
        let Some(state) = tables.get(table) else {
            return Err(Error::FileNotFound(format!("table {table}")));
        };
        let mut records = Vec::new();
        for row in state.rows.values() {
            if let Some(contains) = &filter.contains
                && !matches_contains(row, contains)?
            {
                continue;
            }
            records.push(row.clone());
            if let Some(limit) = filter.limit
                && records.len() >= limit
            {
                break;
            }
        }
        Ok(records)
    }

    async fn save(
        &self,
        table: &str,
        record: Value,
        condition: SaveCondition,
    ) -> Result<(), Error> {
        let kind = {
            let mut tables = self.tables()?;
            let Some(state) = tables.get_mut(table) else {
                return Err(Error::FileNotFound(format!("table {table}")));
            };
            let key = composite_key(state, &record)?;
            let existed = state.rows.contains_key(&key);
            if existed && condition == SaveCondition::MustNotExist {
                return Err(Error::UniqueConstraintViolated(key));
            }
            state.rows.insert(key, record.clone());
            if existed {
                ChangeKind::Modify
            } else {
                ChangeKind::Insert
            }
        };
        self.notify(table, kind, Some(record));
        Ok(())
    }

    async fn delete(&self, table: &str, key_name: &str, key_value: &str) -> Result<bool, Error> {
        let removed = {
            let mut tables = self.tables()?;
            let Some(state) = tables.get_mut(table) else {
                return Err(Error::FileNotFound(format!("table {table}")));
            };
            let key = state.rows.iter().find_map(|(key, row)| {
                row.get(key_name)
                    .is_some_and(|value| attribute_text(value) == key_value)
                    .then(|| key.clone())
            });
            match key {
                Some(key) => {
                    state.rows.remove(&key);
                    true
                }
                None => false,
            }
        };
        if removed {
            self.notify(table, ChangeKind::Remove, None);
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn table_with(name: &str, key_fields: &[&str]) -> MemoryTable {
        let table = MemoryTable::new();
        table.declare(name, key_fields);
        table
    }

    #[tokio::test]
    async fn test_save_then_get_returns_the_record() {
        // Arrange
        let table = table_with("things", &["id"]);
        let record = json!({ "id": "a1", "label": "first" });

        // Act
        table
            .save("things", record.clone(), SaveCondition::None)
            .await
            .unwrap();
        let fetched = table.get("things", "id", "a1").await.unwrap();

        // Assert
        assert_eq!(fetched, Some(record));
    }

    #[tokio::test]
    async fn test_get_missing_record_is_none_not_an_error() {
        let table = table_with("things", &["id"]);

        let fetched = table.get("things", "id", "absent").await.unwrap();

        assert!(fetched.is_none());
    }

    #[tokio::test]
    async fn test_undeclared_table_is_file_not_found() {
        let table = MemoryTable::new();

        let result = table.get("nowhere", "id", "a1").await;

        assert!(matches!(result, Err(Error::FileNotFound(_))));
    }

    #[tokio::test]
    async fn test_must_not_exist_rejects_a_taken_composite_key() {
        // Arrange
        let table = table_with("log", &["id", "version"]);
        let first = json!({ "id": "agg", "version": 1, "name": "one" });
        let second = json!({ "id": "agg", "version": 1, "name": "two" });

        // Act
        table
            .save("log", first, SaveCondition::MustNotExist)
            .await
            .unwrap();
        let result = table.save("log", second, SaveCondition::MustNotExist).await;

        // Assert
        assert!(matches!(result, Err(Error::UniqueConstraintViolated(_))));
    }

    #[tokio::test]
    async fn test_same_id_different_version_occupies_a_new_slot() {
        let table = table_with("log", &["id", "version"]);

        table
            .save(
                "log",
                json!({ "id": "agg", "version": 1 }),
                SaveCondition::MustNotExist,
            )
            .await
            .unwrap();
        let result = table
            .save(
                "log",
                json!({ "id": "agg", "version": 2 }),
                SaveCondition::MustNotExist,
            )
            .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_list_filters_by_attribute_fragment_and_limit() {
        // Arrange
        let table = table_with("log", &["id", "version"]);
        for version in 1..=3 {
            table
                .save(
                    "log",
                    json!({ "id": "agg-a", "version": version }),
                    SaveCondition::None,
                )
                .await
                .unwrap();
        }
        table
            .save(
                "log",
                json!({ "id": "agg-b", "version": 1 }),
                SaveCondition::None,
            )
            .await
            .unwrap();

        // Act
        let all_a = table
            .list(
                "log",
                ListFilter {
                    contains: Some("id:agg-a".to_owned()),
                    limit: None,
                },
            )
            .await
            .unwrap();
        let capped = table
            .list(
                "log",
                ListFilter {
                    contains: Some("id:agg-a".to_owned()),
                    limit: Some(2),
                },
            )
            .await
            .unwrap();

        // Assert
        assert_eq!(all_a.len(), 3);
        assert_eq!(capped.len(), 2);
    }

    #[tokio::test]
    async fn test_malformed_contains_filter_is_a_validation_error() {
        let table = table_with("log", &["id"]);

        let result = table
            .list(
                "log",
                ListFilter {
                    contains: Some("no-colon".to_owned()),
                    limit: None,
                },
            )
            .await;

        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn test_change_feed_reports_insert_modify_and_remove() {
        // Arrange
        let table = table_with("things", &["id"]);
        let mut feed = table.subscribe("things");

        // Act
        table
            .save("things", json!({ "id": "a1", "n": 1 }), SaveCondition::None)
            .await
            .unwrap();
        table
            .save("things", json!({ "id": "a1", "n": 2 }), SaveCondition::None)
            .await
            .unwrap();
        table.delete("things", "id", "a1").await.unwrap();

        // Assert
        let first = feed.recv().await.unwrap();
        assert_eq!(first.kind, ChangeKind::Insert);
        assert_eq!(first.new_image.unwrap()["n"], 1);
        let second = feed.recv().await.unwrap();
        assert_eq!(second.kind, ChangeKind::Modify);
        let third = feed.recv().await.unwrap();
        assert_eq!(third.kind, ChangeKind::Remove);
        assert!(third.new_image.is_none());
    }

    #[tokio::test]
    async fn test_delete_reports_whether_a_row_existed() {
        let table = table_with("things", &["id"]);
        table
            .save("things", json!({ "id": "a1" }), SaveCondition::None)
            .await
            .unwrap();

        assert!(table.delete("things", "id", "a1").await.unwrap());
        assert!(!table.delete("things", "id", "a1").await.unwrap());
    }
}

//! Test table — a `KeyValueTable` that always fails. Useful for testing
//! error-handling paths.

use async_trait::async_trait;
use serde_json::Value;

use gatehouse_core::error::Error;
use gatehouse_core::table::{KeyValueTable, ListFilter, SaveCondition};

/// A key-value table whose every operation returns an internal error.
#[derive(Debug)]
pub struct FailingTable;

#[async_trait]
impl KeyValueTable for FailingTable {
    async fn get(
        &self,
        _table: &str,
        _key_name: &str,
        _key_value: &str,
    ) -> Result<Option<Value>, Error> {
        Err(Error::Internal("connection refused".to_owned()))
    }

    async fn list(&self, _table: &str, _filter: ListFilter) -> Result<Vec<Value>, Error> {
        Err(Error::Internal("connection refused".to_owned()))
    }

    async fn save(
        &self,
        _table: &str,
        _record: Value,
        _condition: SaveCondition,
    ) -> Result<(), Error> {
        Err(Error::Internal("connection refused".to_owned()))
    }

    async fn delete(&self, _table: &str, _key_name: &str, _key_value: &str) -> Result<bool, Error> {
        Err(Error::Internal("connection refused".to_owned()))
    }
}

//! Runtime configuration read from the environment.

use gatehouse_core::error::Error;

/// Runtime settings, each with an environment override and a default that
/// lets a bare process start without any variables set.
#[derive(Debug, Clone)]
pub struct Config {
    /// Event log table name (`EVENT_LOG_TABLE`).
    pub event_log_table: String,
    /// Uniqueness constraint table name (`CONSTRAINTS_TABLE`).
    pub constraints_table: String,
    /// User projection table name (`USER_PROJECTIONS_TABLE`).
    pub user_projections_table: String,
    /// Role projection table name (`ROLE_PROJECTIONS_TABLE`).
    pub role_projections_table: String,
    /// Ordered stream name (`EVENT_STREAM`).
    pub event_stream: String,
    /// Records drained from the stream per router pass (`RELAY_BATCH`).
    pub relay_batch: usize,
    /// Messages received per queue poll (`DISPATCH_BATCH`).
    pub dispatch_batch: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            event_log_table: "event-log".to_owned(),
            constraints_table: "constraints".to_owned(),
            user_projections_table: "user-projections".to_owned(),
            role_projections_table: "role-projections".to_owned(),
            event_stream: "iam-events".to_owned(),
            relay_batch: 25,
            dispatch_batch: 10,
        }
    }
}

impl Config {
    /// Reads configuration from process environment variables, falling back
    /// to the defaults for anything unset.
    ///
    /// # Errors
    /// Returns [`Error::Validation`] when a batch-size variable is not a
    /// positive integer.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(&|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let defaults = Self::default();
        Ok(Self {
            event_log_table: text(lookup, "EVENT_LOG_TABLE", defaults.event_log_table),
            constraints_table: text(lookup, "CONSTRAINTS_TABLE", defaults.constraints_table),
            user_projections_table: text(
                lookup,
                "USER_PROJECTIONS_TABLE",
                defaults.user_projections_table,
            ),
            role_projections_table: text(
                lookup,
                "ROLE_PROJECTIONS_TABLE",
                defaults.role_projections_table,
            ),
            event_stream: text(lookup, "EVENT_STREAM", defaults.event_stream),
            relay_batch: batch(lookup, "RELAY_BATCH", defaults.relay_batch)?,
            dispatch_batch: batch(lookup, "DISPATCH_BATCH", defaults.dispatch_batch)?,
        })
    }
}

fn text(lookup: &dyn Fn(&str) -> Option<String>, key: &str, default: String) -> String {
    lookup(key).unwrap_or(default)
}

fn batch(
    lookup: &dyn Fn(&str) -> Option<String>,
    key: &str,
    default: usize,
) -> Result<usize, Error> {
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };
    let value = raw.parse::<usize>().map_err(|source| {
        Error::Validation(format!("{key} must be a positive integer: {source}"))
    })?;
    // A zero batch would make its pump poll forever without moving anything.
    if value == 0 {
        return Err(Error::Validation(format!("{key} must be at least 1")));
    }
    Ok(value)
}

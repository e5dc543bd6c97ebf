use quarry_core::{Result, WireQuery};

/// Executes serialized queries
///
/// Implementations return the data of the requested action (a record, a
/// list of records, a count, ...) with tagged values left as they are on
/// the wire. Validation failures reported by the engine should come back
/// as [`QueryError::Validation`](quarry_core::QueryError::Validation) built
/// with [`ValidationError::from_engine_json`](quarry_core::ValidationError::from_engine_json).
pub trait Engine {
    fn execute(&self, query: &WireQuery) -> Result<serde_json::Value>;
}

impl<F> Engine for F
where
    F: Fn(&WireQuery) -> Result<serde_json::Value>,
{
    fn execute(&self, query: &WireQuery) -> Result<serde_json::Value> {
        self(query)
    }
}

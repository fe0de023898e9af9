//! Application Services

pub mod bars_query;

pub use bars_query::{BarsQuery, BarsQueryService, QueryError};

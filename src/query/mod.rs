//! Structured query building
//!
//! - `criteria`: immutable restriction/order sets and their count form
//! - `count`: best-effort row-count rewriting for query strings

pub mod count;
pub mod criteria;

pub use count::count_query_for;
pub use criteria::{CountQuery, Criteria, Order, Restriction};

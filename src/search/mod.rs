//! Full-text search support
//!
//! - `descriptor`: static per-entity search-field declarations
//! - `fields`: the ordered field index a repository builds from them
//! - `criteria`: full-text query building

pub mod criteria;
pub mod descriptor;
pub mod fields;

pub use criteria::{FieldFilter, FullTextCriteria, RangeFilter, SearchQuery, SortField, SortType};
pub use descriptor::{Analyze, EmbeddedField, SearchDescriptor, SearchField};
pub use fields::SearchFieldIndex;

pub mod compose;
pub mod error;
pub mod types;

pub use compose::Compose;
pub use error::FilterError;
pub use types::{FilterValue, Filters, OrderBy, SelectOptions, SortDirection, SqlQuery};

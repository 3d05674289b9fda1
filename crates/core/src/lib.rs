pub mod error;
pub mod model;
pub mod types;

pub use model::{Details, Episode, Link, SearchResult};
pub use types::{MediaId, MediaIdError, MediaType};

pub mod recency_list;
pub mod tag_index;

pub use recency_list::{NodeId, RecencyList};
pub use tag_index::TagIndex;

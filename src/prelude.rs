pub use crate::config::CacheConfig;
pub use crate::ds::{NodeId, RecencyList, TagIndex};
pub use crate::engine::cache::{CacheCore, TagCache};
pub use crate::engine::stats::StatsSnapshot;
pub use crate::error::{InvariantError, InvariantKind};
pub use crate::exporter::PrometheusTextExporter;

pub mod hash;
pub mod symbols;

pub use hash::calculate_hash;
pub use symbols::{IndexStats, SymbolIndexer};

use crate::config::IndexingConfig;

/// Dedicated rayon pool for per-file work, or `None` to run on the global one.
pub(crate) fn worker_pool(config: &IndexingConfig, role: &str) -> Option<rayon::ThreadPool> {
    let prefix = format!("codescope-{role}");
    match rayon::ThreadPoolBuilder::new()
        .num_threads(config.parallel_threads)
        .thread_name(move |i| format!("{prefix}-{i}"))
        .build()
    {
        Ok(pool) => Some(pool),
        Err(e) => {
            tracing::warn!(target: "indexer", "{role} pool unavailable, using the global rayon pool: {e}");
            None
        }
    }
}

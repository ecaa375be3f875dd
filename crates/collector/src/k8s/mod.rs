//! Cluster observation: client setup, per-kind watch loops, shape extraction,
//! quantity normalization, and record composition.

pub(crate) mod client;
pub(crate) mod extract;
pub(crate) mod quantity;
pub(crate) mod record;
pub(crate) mod types;
pub(crate) mod watcher;

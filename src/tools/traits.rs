//! Trait definitions for clustering tool abstractions
//!
//! Implementations group variants judged identical; the caller checks that
//! the result partitions the registered variants.

use crate::core::{clusters::ClusterMap, registry::SequenceRegistry};
use crate::Result;

/// Common interface for exact-match clustering tools
pub trait Clusterer {
    /// Group the registered variants into clusters of identical sequences
    fn cluster(&self, registry: &SequenceRegistry) -> Result<ClusterMap>;

    /// Verify that the tool is installed and runnable
    fn verify_installation(&self) -> Result<()>;

    /// Get the name of this clusterer
    fn name(&self) -> &str;
}

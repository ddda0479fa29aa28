//! External clustering tools
//!
//! Exact-match clustering is delegated to an external program. The
//! [`Clusterer`] trait hides which one, so the pipeline can be driven by
//! cd-hit-est in production and by fixed cluster maps in tests.

pub mod cdhit;
pub mod traits;

pub use cdhit::CdHitClusterer;
pub use traits::Clusterer;

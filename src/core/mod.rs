pub mod clusters;
pub mod collapser;
pub mod config;
pub mod matrix;
pub mod pipeline;
pub mod registry;

pub use clusters::ClusterMap;
pub use collapser::Collapser;
pub use config::Config;
pub use matrix::AbundanceMatrix;
pub use pipeline::Pipeline;
pub use registry::SequenceRegistry;

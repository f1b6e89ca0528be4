pub mod config;
pub mod error;
pub mod logging;
pub mod pipeline;

// Domain data shapes shared across layers
pub mod domain;

// Observability: metrics recording and rendering
pub mod observability;

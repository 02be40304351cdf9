//! Business logic services

pub mod comparison;
pub mod consolidation;
pub mod geo;
pub mod metrics;
pub mod render;
pub mod resolver;
pub mod routing;
pub mod scenario;
pub mod stop_import;

#[cfg(test)]
pub(crate) mod testing;

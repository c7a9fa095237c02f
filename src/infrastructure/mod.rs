//! Adapters behind the domain ports: storage backends, the simulated
//! settlement rail and audit sinks.

pub mod audit;
pub mod in_memory;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
pub mod simulator;

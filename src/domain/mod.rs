//! Domain layer: entities, value objects and the ports the application layer
//! depends on. Nothing in here knows about storage engines or the CLI.

pub mod audit;
pub mod money;
pub mod ports;
pub mod transaction;
pub mod treasury;
pub mod wallet;

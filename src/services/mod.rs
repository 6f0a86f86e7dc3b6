//! Service layer for GPU discovery
//!
//! Services combine the runtime probe, discovery and host introspection
//! into the operations the CLI exposes.

pub mod inventory;

pub use inventory::InventoryService;

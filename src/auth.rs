//! Credential kinds and the redacting secret wrapper shared by stores and the coordinator.

pub mod kind;
pub mod secret;

pub use kind::*;
pub use secret::*;

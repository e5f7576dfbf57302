//! Serialisable event types.
//!
//! Everything here derives `serde::Serialize` + `serde::Deserialize` so events
//! can be recorded, replayed, and forwarded to a UI as JSON.

pub mod events;

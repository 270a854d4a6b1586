//! Pure, deterministic logic: no filesystem, network, or process access.

pub mod fence;
pub mod imports;
pub mod language;
pub mod repair;
pub mod session;
pub mod slug;
pub mod types;

//! Side-effecting collaborators: filesystem, processes, network.

pub mod completion;
pub mod config;
pub mod dependencies;
pub mod fsutil;
pub mod process;
pub mod prompt;
pub mod session_store;
pub mod test_runner;
pub mod workspace;

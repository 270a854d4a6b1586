//! Test-first code generation driven by a language model.
//!
//! Given a natural-language description, aiterate asks the model for tests, then for
//! an implementation, runs the tests in a throwaway workspace, and feeds failures
//! back for a joint repair until the tests pass or the iteration budget runs out.
//!
//! - **[`core`]**: Pure, deterministic logic (response cleaning, repair parsing, slugs,
//!   import scanning, session records). No I/O.
//! - **[`io`]**: Side-effecting collaborators (completion client, workspace, test
//!   runner, dependency updater, session store, config) behind narrow traits.
//!
//! Orchestration modules ([`generator`], [`iterate`], [`run`]) compose the two.

pub mod cancel;
pub mod core;
pub mod error;
pub mod exit_codes;
pub mod generator;
pub mod io;
pub mod iterate;
pub mod logging;
pub mod run;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use error::{AiterateError, Result};

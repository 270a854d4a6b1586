//! Stable exit codes for aiterate CLI commands.

/// Command succeeded, or `new` produced passing tests.
pub const OK: i32 = 0;
/// Command failed due to invalid input/config or any fatal error.
pub const INVALID: i32 = 1;
/// `new` used every iteration without a passing run. Files were still written.
pub const EXHAUSTED: i32 = 2;
/// Run interrupted (SIGINT convention).
pub const CANCELLED: i32 = 130;

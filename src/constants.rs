//! Application-wide constants
//!
//! Constant values used throughout the judge, grouped by purpose.

// =============================================================================
// SERVER DEFAULTS
// =============================================================================

/// Default server host address
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port
pub const DEFAULT_PORT: u16 = 5000;

/// Default path of the embedded database
pub const DEFAULT_DATABASE_PATH: &str = "arbiter.db";

/// Default maximum read connections in the SQLite pool
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 8;

// =============================================================================
// JUDGING DEFAULTS
// =============================================================================

/// Default size of the judging worker pool (and the sandbox slot semaphore)
pub const DEFAULT_MAX_CHECKS: usize = 20;

/// Unresolved submissions a single participant may have in flight
pub const MAX_PENDING_PER_PARTICIPANT: i64 = 3;

/// Memory cap for a sandbox container, in megabytes
pub const SANDBOX_MEMORY_LIMIT_MB: i64 = 512;

/// Process-count cap inside a sandbox container
pub const SANDBOX_PIDS_LIMIT: i64 = 64;

/// Writable scratch size inside a sandbox container, in megabytes
pub const SANDBOX_SCRATCH_MB: u64 = 64;

/// Grace added to each test's wall-clock limit, in seconds
pub const PER_TEST_GRACE_SECONDS: f64 = 0.5;

/// Grace added to the whole-submission timeout, in seconds
pub const OVERALL_GRACE_SECONDS: f64 = 10.0;

/// Default per-test time limit when none is given, in seconds
pub const DEFAULT_TEST_TIME_LIMIT: f64 = 1.0;

// =============================================================================
// CONTEST SETTINGS
// =============================================================================

/// Minimum number of tasks in a contest
pub const MIN_CONTEST_TASKS: usize = 1;

/// Maximum number of tasks in a contest
pub const MAX_CONTEST_TASKS: usize = 10;

/// Penalty for a wrong submission in ICPC scoring, in minutes
pub const ICPC_PENALTY_MINUTES: i64 = 20;

/// Lifecycle controller tick interval, in seconds
pub const LIFECYCLE_TICK_SECONDS: u64 = 10;

/// Running contests whose end is further in the past than this are not
/// rehydrated on restart, in seconds
pub const RECOVERY_STALE_SECONDS: i64 = 3600;

/// Task letters by position in `task_ids`
pub const TASK_LETTERS: &str = "ABCDEFGHIJ";

// =============================================================================
// SUPPORTED LANGUAGES
// =============================================================================

/// Language identifiers as they appear on the wire
pub mod languages {
    pub const PYTHON: &str = "Python";
    pub const CPP: &str = "C++";
    pub const CSHARP: &str = "C#";

    /// All supported language identifiers
    pub const ALL: &[&str] = &[PYTHON, CPP, CSHARP];
}

/// Container images for each language
pub mod container_images {
    pub const PYTHON: &str = "arbiter/python:latest";
    pub const CPP: &str = "arbiter/cpp:latest";
    pub const CSHARP: &str = "arbiter/csharp:latest";
}

// =============================================================================
// AUTHENTICATION
// =============================================================================

/// Admin session token lifetime, in hours
pub const ADMIN_TOKEN_EXPIRY_HOURS: i64 = 12;

// =============================================================================
// VALIDATION
// =============================================================================

/// Maximum source code size in bytes (1 MB)
pub const MAX_SOURCE_CODE_SIZE: u64 = 1024 * 1024;

/// Maximum upload size for test archives and rosters in bytes (32 MB)
pub const MAX_UPLOAD_SIZE: usize = 32 * 1024 * 1024;

//! Standard exit codes for CLI operations
//!
//! These exit codes follow Unix conventions and sysexits.h where applicable.

/// Success - nothing would change, or access is granted
pub const SUCCESS: i32 = 0;

/// General error - unspecified failure
pub const ERROR: i32 = 1;

/// Changes found - at least one object would be created or configured
pub const CHANGES_FOUND: i32 = 2;

/// Access denied - the reference is not allowed
pub const ACCESS_DENIED: i32 = 3;

/// Invalid input - malformed manifest, policy or configuration
pub const INVALID_INPUT: i32 = 4;

/// IO error - file not found, permission denied, etc.
pub const IO_ERROR: i32 = 5;

/// Usage error - invalid arguments or options (following sysexits.h convention)
pub const USAGE_ERROR: i32 = 64;

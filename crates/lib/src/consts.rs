/// Application name used for per-user directories.
pub const APP_NAME: &str = "buildline";

/// Environment variable overriding the root of all build directories.
pub const BUILD_DIR_ENV: &str = "BUILDLINE_BUILD_DIR";

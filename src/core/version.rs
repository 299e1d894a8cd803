//! Build metadata and module API version accessors.
//! The generated version.rs from the build script is included here so the
//! binary and the library share a single source of truth.

include!(concat!(env!("OUT_DIR"), "/version.rs"));

/// Module API version from `[package.metadata]`, with a stable fallback.
pub fn get_api_version() -> u32 {
    MODULE_API_VERSION.parse().unwrap_or(20250727)
}

/// Build time string from the build script (UTC)
pub fn build_time() -> &'static str {
    BUILD_TIME
}

/// Short git hash captured by the build script
pub fn git_hash() -> &'static str {
    GIT_HASH
}

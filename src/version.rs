// Package metadata baked in at build time

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const NAME: &str = env!("CARGO_PKG_NAME");

/// One-line description from Cargo.toml, reported by GET /version.
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

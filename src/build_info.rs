//! Build metadata embedded at compile time by `build.rs`.

use serde::Serialize;

/// Build counter, bumped on every recompilation
pub const BUILD_NUMBER: u64 = match option_env!("NUTRICALC_BUILD_NUMBER") {
    Some(s) => parse_build_number(s),
    None => 0,
};

/// Build timestamp (ISO 8601, UTC)
pub const BUILD_TIMESTAMP: &str = match option_env!("NUTRICALC_BUILD_TIMESTAMP") {
    Some(s) => s,
    None => "unknown",
};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// `str::parse` is not const, so digits are folded by hand. Any non-digit yields 0.
const fn parse_build_number(s: &str) -> u64 {
    let bytes = s.as_bytes();
    let mut value: u64 = 0;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if !b.is_ascii_digit() {
            return 0;
        }
        value = value * 10 + (b - b'0') as u64;
        i += 1;
    }
    value
}

#[derive(Debug, Clone, Serialize)]
pub struct BuildInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub build_number: u64,
    pub build_timestamp: &'static str,
    pub description: &'static str,
}

impl BuildInfo {
    pub fn current() -> Self {
        Self {
            name: NAME,
            version: VERSION,
            build_number: BUILD_NUMBER,
            build_timestamp: BUILD_TIMESTAMP,
            description: DESCRIPTION,
        }
    }
}

/// Log the startup banner. Goes through tracing so it lands on stderr with everything else.
pub fn log_startup_banner() {
    let info = BuildInfo::current();
    tracing::info!(
        version = info.version,
        build = info.build_number,
        compiled = info.build_timestamp,
        "{} starting",
        info.name
    );
}

use std::env;
use std::process::Command;

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Package version, suffixed with the short commit when built from a checkout.
/// `ZXART_VERSION` replaces the whole string.
fn version() -> String {
    if let Some(version) = env::var("ZXART_VERSION").ok().filter(|v| !v.trim().is_empty()) {
        return version;
    }
    let package = env::var("CARGO_PKG_VERSION").unwrap_or_default();
    let commit = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|out| out.status.success())
        .map(|out| String::from_utf8_lossy(&out.stdout).trim().to_owned());
    match commit {
        Some(commit) if !commit.is_empty() => format!("{package}+{commit}"),
        _ => package,
    }
}

/// Honours `SOURCE_DATE_EPOCH` so packaged builds are reproducible.
fn build_time() -> String {
    let now = env::var("SOURCE_DATE_EPOCH")
        .ok()
        .and_then(|epoch| epoch.parse::<i64>().ok())
        .and_then(|epoch| OffsetDateTime::from_unix_timestamp(epoch).ok())
        .unwrap_or_else(OffsetDateTime::now_utc);
    now.format(&Rfc3339).unwrap_or_else(|_| "unknown".to_owned())
}

fn main() {
    println!("cargo:rerun-if-env-changed=ZXART_VERSION");
    println!("cargo:rerun-if-env-changed=SOURCE_DATE_EPOCH");
    println!("cargo:rustc-env=ZXART_VERSION={}", version());
    println!("cargo:rustc-env=ZXART_BUILD_TIME={}", build_time());
}

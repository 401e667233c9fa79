//! File logging

use std::fs::File;
use std::path::Path;
use std::sync::Mutex;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

/// Log file used when none is configured
pub const DEFAULT_LOG_FILE: &str = "app.log";

/// `RUST_LOG` wins; otherwise info, or debug for our own crates when verbose
fn build_filter(verbose: bool, env: Option<&str>) -> EnvFilter {
    if let Some(directives) = env.filter(|d| !d.trim().is_empty()) {
        return EnvFilter::new(directives);
    }
    if verbose {
        EnvFilter::new("info,pith=debug,pith_agent=debug,pith_ai=debug")
    } else {
        EnvFilter::new("info")
    }
}

/// Install the global subscriber, truncating `path`. The terminal stays free of log output.
pub fn init(path: &Path, verbose: bool) -> anyhow::Result<()> {
    let file = File::create(path)
        .with_context(|| format!("cannot open log file {}", path.display()))?;

    let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(build_filter(verbose, env.as_deref()))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!("cannot install logger: {}", e))?;

    tracing::info!(path = %path.display(), "logging started");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_defaults_to_info() {
        assert_eq!(build_filter(false, None).to_string(), "info");
    }

    #[test]
    fn test_verbose_raises_own_crates() {
        let filter = build_filter(true, None).to_string();
        assert!(filter.contains("pith_agent=debug"), "got {}", filter);
    }

    #[test]
    fn test_env_overrides_verbose() {
        assert_eq!(build_filter(true, Some("warn")).to_string(), "warn");
        assert_eq!(build_filter(false, Some("  ")).to_string(), "info");
    }
}

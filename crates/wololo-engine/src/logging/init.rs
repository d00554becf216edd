use std::sync::Once;

use log::LevelFilter;

/// Target the Vulkan debug messenger logs under.
pub const VULKAN_TARGET: &str = "vulkan";

/// Logger configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// `env_logger` directives, e.g. `"wololo_engine=debug"`. Overrides `RUST_LOG`.
    pub env_filter: Option<String>,
    /// Level for validation-layer output; applied unless a directive already
    /// names the `vulkan` target.
    pub vulkan_level: LevelFilter,
    pub write_style: env_logger::WriteStyle,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            env_filter: None,
            vulkan_level: LevelFilter::Warn,
            write_style: env_logger::WriteStyle::Auto,
        }
    }
}

/// Filter directives for the logger: `configured`, else `from_env`, else
/// `info`, with the `vulkan` target level appended when not already set.
pub fn resolve_filter(
    configured: Option<&str>,
    from_env: Option<&str>,
    vulkan_level: LevelFilter,
) -> String {
    let base = configured
        .or(from_env)
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .unwrap_or("info");

    let names_vulkan = base
        .split(',')
        .any(|d| d.trim().split('=').next() == Some(VULKAN_TARGET) && d.contains('='));
    if names_vulkan {
        base.to_string()
    } else {
        format!("{base},{VULKAN_TARGET}={}", vulkan_level.as_str().to_ascii_lowercase())
    }
}

static INIT: Once = Once::new();

/// Installs `env_logger` on the first call; later calls do nothing.
///
/// A logger installed by someone else is left in place.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let from_env = std::env::var("RUST_LOG").ok();
        let filter = resolve_filter(config.env_filter.as_deref(), from_env.as_deref(), config.vulkan_level);

        let installed = env_logger::Builder::new()
            .parse_filters(&filter)
            .write_style(config.write_style)
            .try_init();

        if installed.is_ok() {
            log::debug!("logging initialized with \"{filter}\"");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_info() {
        assert_eq!(resolve_filter(None, None, LevelFilter::Warn), "info,vulkan=warn");
    }

    #[test]
    fn config_beats_environment() {
        let f = resolve_filter(Some("wololo_engine=debug"), Some("trace"), LevelFilter::Error);
        assert_eq!(f, "wololo_engine=debug,vulkan=error");
    }

    #[test]
    fn environment_used_when_unconfigured() {
        assert_eq!(resolve_filter(None, Some("debug"), LevelFilter::Warn), "debug,vulkan=warn");
    }

    #[test]
    fn blank_filter_falls_back() {
        assert_eq!(resolve_filter(Some("  "), None, LevelFilter::Info), "info,vulkan=info");
    }

    #[test]
    fn explicit_vulkan_directive_is_kept() {
        let f = resolve_filter(Some("info, vulkan=trace"), None, LevelFilter::Warn);
        assert_eq!(f, "info, vulkan=trace");
    }
}

//! Log subscriber setup. Records from the `log` facade (the engine and LWK)
//! are captured alongside `tracing` events.

use tracing_subscriber::EnvFilter;

use crate::config::LogArgs;

/// Used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "zion=info";

/// Start from `RUST_LOG` (or [`DEFAULT_FILTER`]) and add the directives of
/// `--log.filter`. Unparsable directives are skipped.
pub fn build_filter(base: Option<&str>, extra: Option<&str>) -> EnvFilter {
    let mut filter = EnvFilter::new(base.unwrap_or(DEFAULT_FILTER));
    if let Some(extra) = extra {
        for directive in extra.split(',').map(str::trim).filter(|d| !d.is_empty()) {
            match directive.parse() {
                Ok(d) => filter = filter.add_directive(d),
                Err(e) => eprintln!("ignoring log directive '{directive}': {e}"),
            }
        }
    }
    filter
}

pub fn init_logging(args: &LogArgs) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = build_filter(rust_log.as_deref(), args.filter.as_deref());

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if args.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_without_rust_log() {
        let filter = build_filter(None, None).to_string();
        assert_eq!(filter, DEFAULT_FILTER);
    }

    #[test]
    fn extra_directives_are_added() {
        let filter = build_filter(Some("warn"), Some("lwk_wollet=debug, zion_sdk=trace"));
        let text = filter.to_string();
        assert!(text.contains("lwk_wollet=debug"));
        assert!(text.contains("zion_sdk=trace"));
        assert!(text.contains("warn"));
    }
}

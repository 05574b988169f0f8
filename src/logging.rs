use crate::config::AppConfig;
use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Directives applied after `log_level` and before `log_directives`.
/// sqlx logs every statement at info and hyper every connection at debug.
const QUIET_DEPENDENCIES: &[&str] = &["sqlx=warn", "hyper=warn", "h2=warn"];

/// `RUST_LOG` wins outright; otherwise the level, the dependency defaults,
/// then the configured per-target overrides.
pub fn filter_directives(config: &AppConfig) -> String {
    let mut directives = vec![config.log_level.clone()];
    directives.extend(QUIET_DEPENDENCIES.iter().map(|d| d.to_string()));
    directives.extend(config.log_directives.iter().cloned());
    directives.join(",")
}

fn build_filter(config: &AppConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    let directives = filter_directives(config);
    EnvFilter::try_new(&directives)
        .with_context(|| format!("Invalid log filter: {}", directives))
}

/// Install the global subscriber. Keep the returned guard alive for the
/// lifetime of the process or buffered file output is lost.
pub fn init_logging(config: &AppConfig) -> Result<WorkerGuard> {
    let filter = build_filter(config)?;

    let file_appender = match config.rotation.as_str() {
        "hourly" => tracing_appender::rolling::hourly(&config.log_dir, &config.log_file),
        "daily" => tracing_appender::rolling::daily(&config.log_dir, &config.log_file),
        _ => tracing_appender::rolling::never(&config.log_dir, &config.log_file),
    };
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let registry = tracing_subscriber::registry().with(filter);

    if config.use_json {
        let file_layer = fmt::layer()
            .json()
            .with_target(true)
            .with_writer(non_blocking)
            .with_ansi(false);
        registry.with(file_layer).init();
    } else {
        // Transfer and account events carry their own fields; target is noise
        let file_layer = fmt::layer()
            .with_target(false)
            .with_writer(non_blocking)
            .with_ansi(false);
        let stdout_layer = fmt::layer().with_target(false).with_ansi(true);
        registry.with(file_layer).with(stdout_layer).init();
    }

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(yaml_tail: &str) -> AppConfig {
        let yaml = format!(
            "log_level: info\nlog_dir: ./logs\nlog_file: t.log\nuse_json: false\nrotation: never\n\
             gateway: {{host: 127.0.0.1, port: 0}}\n\
             store: {{backend: memory, max_connections: 1, acquire_timeout_ms: 10, lock_timeout_ms: 10}}\n\
             auth: {{jwt_secret: \"\", issuer: ledger, token_ttl_minutes: 5}}\n{}",
            yaml_tail
        );
        AppConfig::from_yaml(&yaml).unwrap()
    }

    #[test]
    fn test_overrides_follow_dependency_defaults() {
        let config = config("log_directives: [\"bank_ledger::ledger=debug\", \"sqlx=info\"]\n");
        assert_eq!(
            filter_directives(&config),
            "info,sqlx=warn,hyper=warn,h2=warn,bank_ledger::ledger=debug,sqlx=info"
        );
        assert!(EnvFilter::try_new(filter_directives(&config)).is_ok());
    }

    #[test]
    fn test_directives_default_to_empty() {
        let config = config("");
        assert!(config.log_directives.is_empty());
        assert_eq!(filter_directives(&config), "info,sqlx=warn,hyper=warn,h2=warn");
    }

    #[test]
    fn test_rejects_unparseable_directive() {
        let config = config("log_directives: [\"bank_ledger=notalevel\"]\n");
        assert!(EnvFilter::try_new(filter_directives(&config)).is_err());
    }
}

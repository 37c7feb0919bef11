use std::fs;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initializes the logging system with both console and file output.
///
/// Console output is human readable; the file under `log_dir` is JSON, rotated daily.
/// `RUST_LOG` replaces the `tweet_ingest=info` default when it is set.
pub fn init_logging(log_dir: &str) {
    let _ = fs::create_dir_all(log_dir);

    let file_appender = tracing_appender::rolling::daily(log_dir, "tweet_ingest.log");
    let (non_blocking_writer, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer().json().with_writer(non_blocking_writer);
    let console_layer = fmt::layer().with_writer(std::io::stderr);

    let filter = default_filter(std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref());

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .try_init();

    // The guard flushes the file writer on drop; keep it for the life of the process.
    std::mem::forget(guard);
}

fn default_filter(rust_log: Option<&str>) -> EnvFilter {
    rust_log
        .filter(|directives| !directives.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new("tweet_ingest=info"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rust_log_overrides_the_default_level() {
        assert_eq!(default_filter(Some("tweet_ingest=debug")).to_string(), "tweet_ingest=debug");
        assert_eq!(default_filter(None).to_string(), "tweet_ingest=info");
        assert_eq!(default_filter(Some("  ")).to_string(), "tweet_ingest=info");
    }
}

use std::env;
use std::io;
use tracing_appender::rolling;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

const STDOUT_FILTER: &str = "info,text_prep=warn,record_parse=info,patient_link=info";
const FILE_FILTER: &str = "info,text_prep=debug,record_parse=debug,patient_link=debug";

/// Stdout and daily rolling file logging. `RUST_LOG`, when set, replaces the
/// stdout filter.
pub fn configure_logging() {
    let stdout_filter = env::var("RUST_LOG")
        .ok()
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(STDOUT_FILTER));

    // Stdout log configuration
    let stdout_log = fmt::layer()
        .with_writer(io::stdout)
        .with_filter(stdout_filter);

    // File log configuration
    let file_appender = rolling::daily("logs", "medlink.log");
    let file_log = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .with_filter(EnvFilter::new(FILE_FILTER));

    // A second call (tests, embedding) keeps the first subscriber
    let _ = tracing_subscriber::Registry::default()
        .with(stdout_log)
        .with(file_log)
        .try_init();
}

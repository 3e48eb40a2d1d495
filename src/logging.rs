//! Logger setup for the command-line front end

use flexi_logger::{DeferredNow, FileSpec, Logger, LoggerHandle};
use std::path::Path;

/// Start logging at `level` (a flexi_logger spec such as `info` or
/// `hyio=debug`), to stderr or to `log_file`. Keep the returned handle alive.
pub fn init_logging(level: &str, log_file: Option<&Path>) -> Result<LoggerHandle, flexi_logger::FlexiLoggerError> {
    let mut logger = Logger::try_with_str(level)?.format(line_format);

    if let Some(path) = log_file {
        logger = logger.log_to_file(FileSpec::try_from(path)?);
    }

    logger.start()
}

// "YYYY-MM-DD HH:mm:ss.fff INF message (engine.rs:42)"
fn line_format(
    w: &mut dyn std::io::Write,
    now: &mut DeferredNow,
    record: &log::Record,
) -> Result<(), std::io::Error> {
    let level_abbr = match record.level() {
        log::Level::Error => "ERR",
        log::Level::Warn => "WRN",
        log::Level::Info => "INF",
        log::Level::Debug => "DBG",
        log::Level::Trace => "TRC",
    };

    write!(
        w,
        "{} {} {} ({})",
        now.format("%Y-%m-%d %H:%M:%S%.3f"),
        level_abbr,
        record.args(),
        format_target_as_path(record.target(), record.line())
    )
}

// hyio::engine -> engine.rs:42
fn format_target_as_path(target: &str, line: Option<u32>) -> String {
    let path_like = match target.strip_prefix("hyio::") {
        Some(module) => module.replace("::", "/") + ".rs",
        None => target.replace("::", "/"),
    };

    match line {
        Some(line_num) => format!("{}:{}", path_like, line_num),
        None => path_like,
    }
}

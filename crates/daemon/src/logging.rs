// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Global tracing subscriber init (C15): pretty-to-stderr when attached to a
//! TTY, JSON otherwise, plus a non-blocking rolling file writer under
//! `.mission/logs/`. Grounded on the teacher's `tracing-subscriber` +
//! `tracing-appender` setup.

use std::io::IsTerminal;
use std::path::Path;

use mc_core::config::LogFormat;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Holds the file-appender worker guard; dropping it flushes pending writes.
/// Must be kept alive for the process lifetime.
pub struct LoggingGuard {
    _file_guard: WorkerGuard,
}

pub fn init(log_level: &str, log_format: LogFormat, logs_dir: &Path) -> Result<LoggingGuard, std::io::Error> {
    std::fs::create_dir_all(logs_dir)?;
    let file_appender = tracing_appender::rolling::daily(logs_dir, "mcd.log");
    let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr_is_tty = std::io::stderr().is_terminal();

    let registry = tracing_subscriber::registry().with(filter);

    match log_format {
        LogFormat::Pretty if stderr_is_tty => {
            let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
            let file_layer = tracing_subscriber::fmt::layer().with_ansi(false).with_writer(file_writer);
            registry.with(stderr_layer).with(file_layer).init();
        }
        _ => {
            let json_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr.and(file_writer));
            registry.with(json_layer).init();
        }
    }

    Ok(LoggingGuard { _file_guard: file_guard })
}

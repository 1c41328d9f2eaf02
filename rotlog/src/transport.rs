use std::io::Write;

use chrono::{DateTime, Utc};

use crate::format::{DefaultFormatter, LogFormatter, Metadata};
use crate::LogLevel;

// ===== Транспорты =====

/// Приёмник лог-записей. Транспорт никогда не возвращает ошибку
/// вызывающему коду: внутренние сбои гасятся на его границе.
pub trait Transport: Send + Sync {
    fn log(&self, level: LogLevel, message: &str, metadata: &Metadata, timestamp: DateTime<Utc>);

    /// Освобождение ресурсов (файловых дескрипторов и т.п.)
    fn close(&self) {}
}

/// Консольный транспорт: Warning и выше — в stderr, остальное — в stdout
pub struct ConsoleTransport {
    formatter: Box<dyn LogFormatter>,
}

impl ConsoleTransport {
    pub fn new() -> Self {
        ConsoleTransport {
            formatter: Box::new(DefaultFormatter),
        }
    }

    pub fn with_formatter(formatter: Box<dyn LogFormatter>) -> Self {
        ConsoleTransport { formatter }
    }
}

impl Default for ConsoleTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for ConsoleTransport {
    fn log(&self, level: LogLevel, message: &str, metadata: &Metadata, timestamp: DateTime<Utc>) {
        let line = self.formatter.format(level, message, metadata, timestamp);
        if level >= LogLevel::Warning {
            let _ = std::io::stderr().write_all(line.as_bytes());
        } else {
            let _ = std::io::stdout().write_all(line.as_bytes());
        }
    }
}

// ===== Системные транспорты (платформозависимо) =====

#[cfg(target_os = "linux")]
pub struct SyslogTransport {
    logger: std::sync::Mutex<syslog::Logger<syslog::LoggerBackend, syslog::Formatter3164>>,
}

#[cfg(target_os = "linux")]
impl SyslogTransport {
    pub fn new(app_name: &str) -> std::io::Result<Self> {
        let formatter = syslog::Formatter3164 {
            facility: syslog::Facility::LOG_USER,
            hostname: None,
            process: app_name.to_owned(),
            pid: std::process::id() as _,
        };
        match syslog::unix(formatter) {
            Ok(logger) => Ok(SyslogTransport {
                logger: std::sync::Mutex::new(logger),
            }),
            Err(e) => Err(std::io::Error::new(std::io::ErrorKind::Other, e.to_string())),
        }
    }
}

#[cfg(target_os = "linux")]
impl Transport for SyslogTransport {
    fn log(&self, level: LogLevel, message: &str, metadata: &Metadata, _timestamp: DateTime<Utc>) {
        let text = with_metadata_suffix(message, metadata);
        if let Ok(mut logger) = self.logger.lock() {
            let _ = match level {
                LogLevel::Debug => logger.debug(&text),
                LogLevel::Info => logger.info(&text),
                LogLevel::Warning => logger.warning(&text),
                LogLevel::Error => logger.err(&text),
            };
        }
    }
}

#[cfg(target_os = "windows")]
pub struct WinEventTransport {
    logger: winevt_rs::WinEventLogger,
}

#[cfg(target_os = "windows")]
impl WinEventTransport {
    pub fn new(app_name: &str) -> Self {
        WinEventTransport {
            logger: winevt_rs::WinEventLogger::new(app_name),
        }
    }
}

#[cfg(target_os = "windows")]
impl Transport for WinEventTransport {
    fn log(&self, level: LogLevel, message: &str, metadata: &Metadata, _timestamp: DateTime<Utc>) {
        let kind = match level {
            LogLevel::Debug | LogLevel::Info => winevt_rs::EventKind::Information,
            LogLevel::Warning => winevt_rs::EventKind::Warning,
            LogLevel::Error => winevt_rs::EventKind::Error,
        };
        self.logger.report(kind, &with_metadata_suffix(message, metadata));
    }
}

#[allow(dead_code)] // используется только платформенными транспортами
fn with_metadata_suffix(message: &str, metadata: &Metadata) -> String {
    let mut text = message.to_owned();
    for (key, value) in metadata {
        text.push_str(&format!(" {}={}", key, value));
    }
    text
}

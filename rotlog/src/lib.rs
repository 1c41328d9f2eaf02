//! rotlog — подключаемая библиотека логгирования: диспетчер раздаёт
//! записи по транспортам (консоль, файл, syslog / журнал Windows, APM).
//! Файловый транспорт ведёт ротацию по размеру, по дате или гибридную,
//! сжимает ротированные файлы и убирает старые по количеству/возрасту.
//! Всё медленное выполняет фоновая очередь: `log()` не блокируется.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use chrono::Utc;
use once_cell::sync::Lazy;

mod apm;
mod file;
mod format;
mod queue;
mod retention;
mod transport;

pub use apm::ApmTransport;
pub use file::{FileTransport, FileTransportConfig, RotationTrigger};
pub use format::{DefaultFormatter, JsonFormatter, LogFormatter, Metadata};
pub use queue::{Task, TaskQueue, DEFAULT_QUEUE_CAPACITY};
#[cfg(target_os = "linux")]
pub use transport::SyslogTransport;
#[cfg(target_os = "windows")]
pub use transport::WinEventTransport;
pub use transport::{ConsoleTransport, Transport};

// ===== Уровни логгирования =====

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
        }
    }
}

// ===== Глобальный уровень фильтрации =====

static GLOBAL_LOG_LEVEL: AtomicUsize = AtomicUsize::new(0); // по умолчанию Debug

pub fn set_global_log_level(level: LogLevel) {
    GLOBAL_LOG_LEVEL.store(level as usize, Ordering::SeqCst);
}

fn should_log(level: LogLevel) -> bool {
    (level as usize) >= GLOBAL_LOG_LEVEL.load(Ordering::SeqCst)
}

// ===== Диспетчер =====

/// Раздаёт каждую запись всем зарегистрированным транспортам.
/// Ошибки транспортов не доходят до вызывающего кода.
pub struct Logger {
    transports: Vec<Box<dyn Transport>>,
}

impl Logger {
    pub fn new() -> Self {
        Logger {
            transports: Vec::new(),
        }
    }

    pub fn with_transports(transports: Vec<Box<dyn Transport>>) -> Self {
        Logger { transports }
    }

    /// Только консоль, без файлов
    pub fn console_only() -> Self {
        Logger::with_transports(vec![Box::new(ConsoleTransport::new())])
    }

    /// Файловый логгер с собственной фоновой очередью
    pub fn file_only(config: FileTransportConfig) -> std::io::Result<Self> {
        let queue = TaskQueue::new();
        let file = FileTransport::new(config, queue)?;
        Ok(Logger::with_transports(vec![Box::new(file)]))
    }

    /// Файл и консоль; файл получает собственную очередь
    pub fn file_and_console(config: FileTransportConfig) -> std::io::Result<Self> {
        let queue = TaskQueue::new();
        let file = FileTransport::new(config, queue)?;
        Ok(Logger::with_transports(vec![
            Box::new(file),
            Box::new(ConsoleTransport::new()),
        ]))
    }

    pub fn add_transport(&mut self, transport: Box<dyn Transport>) {
        self.transports.push(transport);
    }

    pub fn set_log_level(&self, level: LogLevel) {
        set_global_log_level(level);
    }

    pub fn log(&self, level: LogLevel, message: &str) {
        self.log_with(level, message, &Metadata::new());
    }

    /// Запись с метаданными. Время проставляется здесь, один раз,
    /// и передаётся всем транспортам одинаковым.
    pub fn log_with(&self, level: LogLevel, message: &str, metadata: &Metadata) {
        if !should_log(level) {
            return;
        }
        let timestamp = Utc::now();
        for transport in &self.transports {
            transport.log(level, message, metadata, timestamp);
        }
    }

    /// Дожидается фоновых задач и закрывает файловые дескрипторы
    pub fn close(&self) {
        for transport in &self.transports {
            transport.close();
        }
    }
}

impl Default for Logger {
    fn default() -> Self {
        Logger::new()
    }
}

// ===== Макросы =====

#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:tt)*) => {{
        $logger.log($crate::LogLevel::Debug, &format!($($arg)*));
    }};
}
#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:tt)*) => {{
        $logger.log($crate::LogLevel::Info, &format!($($arg)*));
    }};
}
#[macro_export]
macro_rules! warning {
    ($logger:expr, $($arg:tt)*) => {{
        $logger.log($crate::LogLevel::Warning, &format!($($arg)*));
    }};
}
#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:tt)*) => {{
        $logger.log($crate::LogLevel::Error, &format!($($arg)*));
    }};
}

// ===== Глобальные макросы =====

#[macro_export]
macro_rules! gdebug {
    ($($arg:tt)*) => {{
        if let Some(ref logger) = *$crate::GLOBAL_LOGGER.lock().unwrap() {
            logger.log($crate::LogLevel::Debug, &format!($($arg)*));
        }
    }};
}
#[macro_export]
macro_rules! ginfo {
    ($($arg:tt)*) => {{
        if let Some(ref logger) = *$crate::GLOBAL_LOGGER.lock().unwrap() {
            logger.log($crate::LogLevel::Info, &format!($($arg)*));
        }
    }};
}
#[macro_export]
macro_rules! gwarning {
    ($($arg:tt)*) => {{
        if let Some(ref logger) = *$crate::GLOBAL_LOGGER.lock().unwrap() {
            logger.log($crate::LogLevel::Warning, &format!($($arg)*));
        }
    }};
}
#[macro_export]
macro_rules! gerror {
    ($($arg:tt)*) => {{
        if let Some(ref logger) = *$crate::GLOBAL_LOGGER.lock().unwrap() {
            logger.log($crate::LogLevel::Error, &format!($($arg)*));
        }
    }};
}

// ===== Глобальный логгер =====

pub static GLOBAL_LOGGER: Lazy<Mutex<Option<Logger>>> = Lazy::new(|| Mutex::new(None));

pub fn init_global_logger(logger: Logger) {
    *GLOBAL_LOGGER.lock().unwrap() = Some(logger);
}

pub fn init_global_logger_file_only(config: FileTransportConfig) -> std::io::Result<()> {
    let logger = Logger::file_only(config)?;
    *GLOBAL_LOGGER.lock().unwrap() = Some(logger);
    Ok(())
}

pub fn close_global_logger() {
    if let Some(ref logger) = *GLOBAL_LOGGER.lock().unwrap() {
        logger.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use std::sync::{Arc, Mutex};

    struct CollectingTransport {
        entries: Arc<Mutex<Vec<(LogLevel, String)>>>,
    }

    impl Transport for CollectingTransport {
        fn log(
            &self,
            level: LogLevel,
            message: &str,
            _metadata: &Metadata,
            _timestamp: DateTime<Utc>,
        ) {
            self.entries.lock().unwrap().push((level, message.to_owned()));
        }
    }

    #[test]
    fn dispatcher_fans_out_to_every_transport() {
        let first = Arc::new(Mutex::new(Vec::new()));
        let second = Arc::new(Mutex::new(Vec::new()));
        let logger = Logger::with_transports(vec![
            Box::new(CollectingTransport {
                entries: Arc::clone(&first),
            }),
            Box::new(CollectingTransport {
                entries: Arc::clone(&second),
            }),
        ]);

        // Error проходит при любом глобальном уровне — тесты идут параллельно
        error!(logger, "fan out {}", 42);

        assert_eq!(*first.lock().unwrap(), vec![(LogLevel::Error, "fan out 42".to_owned())]);
        assert_eq!(*second.lock().unwrap(), vec![(LogLevel::Error, "fan out 42".to_owned())]);
    }

    #[test]
    fn global_level_filters_low_severity_entries() {
        let entries = Arc::new(Mutex::new(Vec::new()));
        let logger = Logger::with_transports(vec![Box::new(CollectingTransport {
            entries: Arc::clone(&entries),
        })]);

        set_global_log_level(LogLevel::Warning);
        debug!(logger, "filtered out");
        error!(logger, "kept");
        set_global_log_level(LogLevel::Debug);

        assert_eq!(*entries.lock().unwrap(), vec![(LogLevel::Error, "kept".to_owned())]);
    }

    #[test]
    fn level_ordering_matches_severity() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warning);
        assert!(LogLevel::Warning < LogLevel::Error);
        assert_eq!(LogLevel::Warning.as_str(), "WARNING");
    }
}

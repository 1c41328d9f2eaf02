//! example_rotation — демонстрация ротации логов по размеру

use rotlog::{debug, warning, FileTransportConfig, Logger, RotationTrigger};
use std::thread;
use std::time::Duration;

const APP_NAME: &str = "example_rotation";

// Маленький максимальный размер — чтобы ротация сработала быстро
const MAX_LOG_SIZE: u64 = 4096; // 4 КБ
const MAX_LOG_FILES: usize = 5;

fn main() {
    // 1. Инициализация: файловый лог с маленьким лимитом и сжатием
    let config = FileTransportConfig {
        file_path: "logs/rotation.log".into(),
        rotation: RotationTrigger::Size,
        max_file_size: MAX_LOG_SIZE,
        max_files: MAX_LOG_FILES,
        compress: true,
        ..Default::default()
    };

    let logger = match Logger::file_only(config) {
        Ok(l) => l,
        Err(e) => {
            eprintln!("[FATAL] Cannot create log file: {}. Exiting.", e);
            std::process::exit(1);
        }
    };

    debug!(logger, "{} started: max_size={} bytes, max_files={}", APP_NAME, MAX_LOG_SIZE, MAX_LOG_FILES);

    // 2. Основной код: генерируем много сообщений, чтобы вызвать ротацию
    for i in 0..200 {
        debug!(logger, "This is a debug message number {}", i);
        if i % 30 == 0 {
            warning!(logger, "Warning message at iteration {}", i);
        }
        // Небольшая пауза, чтобы фоновая очередь успевала за нами
        thread::sleep(Duration::from_millis(5));
    }

    // 3. Завершение: дождаться фоновых ротаций перед выходом
    logger.close();

    // 4. Показываем, что осталось на диске
    println!("--- Files in logs/ ---");
    if let Ok(entries) = std::fs::read_dir("logs") {
        for entry in entries.flatten() {
            println!("  {}", entry.file_name().to_string_lossy());
        }
    }
}

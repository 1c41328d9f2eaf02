//! example_simple — минимальная настройка: файл + консоль

use rotlog::{debug, error, info, FileTransportConfig, Logger, RotationTrigger};

const APP_NAME: &str = "example_simple";

fn main() {
    // 1. Инициализация: файл с ротацией по размеру и дублирование в консоль
    let config = FileTransportConfig {
        file_path: "logs/simple.log".into(),
        rotation: RotationTrigger::Size,
        ..Default::default()
    };

    let logger = match Logger::file_and_console(config) {
        Ok(l) => l,
        Err(e) => {
            eprintln!("[FATAL] Cannot initialize logger: {}. Exiting.", e);
            std::process::exit(1);
        }
    };

    // 2. Основной код
    debug!(logger, "{} started", APP_NAME);
    info!(logger, "Doing some useful work");
    error!(logger, "Simulated failure, code={}", 42);

    // 3. Завершение: дожидаемся фоновых задач и закрываем файлы
    logger.close();
}

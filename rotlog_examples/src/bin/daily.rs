//! example_daily — один файл на календарный день (UTC)

use rotlog::{info, FileTransportConfig, Logger, RotationTrigger};

fn main() {
    // 1. Инициализация: дневные корзины, храним неделю
    let config = FileTransportConfig {
        file_path: "logs/daily.log".into(),
        file_name_pattern: "daily".to_owned(),
        rotation: RotationTrigger::Date,
        max_days: 7,
        ..Default::default()
    };

    let logger = match Logger::file_only(config) {
        Ok(l) => l,
        Err(e) => {
            eprintln!("[FATAL] Cannot create log file: {}. Exiting.", e);
            std::process::exit(1);
        }
    };

    // 2. Основной код: все записи сегодняшнего дня попадут в один файл
    info!(logger, "System startup");
    info!(logger, "Configuration loaded");
    info!(logger, "Server listening on port {}", 8080);

    logger.close();
    println!("Check logs/daily-YYYY-MM-DD.log");
}

//! example_tokio — логгер в асинхронном приложении.
//! log() синхронный и не ждёт диска, поэтому его можно звать прямо
//! из задач tokio без spawn_blocking.

use rotlog::{info, warning, FileTransportConfig, Logger, RotationTrigger};
use std::sync::Arc;
use std::time::Duration;

const APP_NAME: &str = "example_tokio";

#[tokio::main]
async fn main() {
    // 1. Инициализация
    let config = FileTransportConfig {
        file_path: "logs/tokio.log".into(),
        rotation: RotationTrigger::Size,
        max_file_size: 64 * 1024,
        ..Default::default()
    };

    let logger = match Logger::file_only(config) {
        Ok(l) => Arc::new(l),
        Err(e) => {
            eprintln!("[FATAL] Cannot create log file: {}. Exiting.", e);
            std::process::exit(1);
        }
    };

    info!(logger, "{} started", APP_NAME);

    // 2. Основной код: несколько конкурентных задач пишут в один логгер
    let mut handles = Vec::new();
    for worker_id in 0..4u32 {
        let logger = Arc::clone(&logger);
        handles.push(tokio::spawn(async move {
            for step in 0..10 {
                info!(logger, "worker {} step {}", worker_id, step);
                tokio::time::sleep(Duration::from_millis(25)).await;
            }
            if worker_id % 2 == 1 {
                warning!(logger, "worker {} finished with odd workload", worker_id);
            }
        }));
    }

    for handle in handles {
        let _ = handle.await;
    }

    // 3. Завершение
    info!(logger, "All workers have finished");
    logger.close();
}

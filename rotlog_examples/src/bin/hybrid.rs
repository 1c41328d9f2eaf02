//! example_hybrid — дневные корзины плюс ротация по размеру внутри дня.
//! Файловый транспорт и APM-транспорт разделяют одну фоновую очередь.

use rotlog::{
    debug, info, ApmTransport, FileTransport, FileTransportConfig, Logger, RotationTrigger,
    TaskQueue,
};

const APP_NAME: &str = "example_hybrid";

fn main() {
    // 1. Общая фоновая очередь: ротации и отправки сериализуются в ней
    let queue = TaskQueue::new();

    let config = FileTransportConfig {
        file_path: "logs/hybrid.log".into(),
        file_name_pattern: "hybrid".to_owned(),
        rotation: RotationTrigger::Hybrid,
        max_file_size: 2048, // 2 КБ, чтобы ротация была видна сразу
        max_files: 4,
        max_days: 7,
        compress: true,
        ..Default::default()
    };

    let file = match FileTransport::new(config, queue.clone()) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("[FATAL] Cannot create log file: {}. Exiting.", e);
            std::process::exit(1);
        }
    };

    // APM-агент по этому адресу может и не слушать — записи просто пропадут
    let apm = ApmTransport::new("127.0.0.1:8200", APP_NAME, queue.clone());

    let logger = Logger::with_transports(vec![Box::new(file), Box::new(apm)]);

    // 2. Основной код
    debug!(logger, "{} started", APP_NAME);
    for i in 0..100 {
        info!(logger, "Hybrid entry number {} with some padding to grow the bucket file", i);
    }

    // 3. Завершение
    queue.wait_for_completion();
    logger.close();

    println!("--- Files in logs/ ---");
    if let Ok(entries) = std::fs::read_dir("logs") {
        for entry in entries.flatten() {
            println!("  {}", entry.file_name().to_string_lossy());
        }
    }
}

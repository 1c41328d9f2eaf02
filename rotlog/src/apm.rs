use std::io::{self, Write};
use std::net::TcpStream;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::json;

use crate::format::Metadata;
use crate::queue::TaskQueue;
use crate::transport::Transport;
use crate::LogLevel;

// ===== APM-транспорт =====
// Отправка «выстрелил и забыл»: записи уходят JSON-строками по TCP
// агенту APM. Доставка не гарантируется, повторов и подтверждений нет.

pub struct ApmTransport {
    server_addr: String,
    app_name: String,
    queue: TaskQueue,
    timeout: Duration,
}

impl ApmTransport {
    pub fn new(server_addr: &str, app_name: &str, queue: TaskQueue) -> Self {
        ApmTransport {
            server_addr: server_addr.to_owned(),
            app_name: app_name.to_owned(),
            queue,
            timeout: Duration::from_secs(5),
        }
    }

    fn payload(
        &self,
        level: LogLevel,
        message: &str,
        metadata: &Metadata,
        timestamp: DateTime<Utc>,
    ) -> String {
        json!({
            "app": self.app_name,
            "level": level.as_str(),
            "message": message,
            "metadata": metadata,
            "timestamp": timestamp.to_rfc3339(),
        })
        .to_string()
    }
}

impl Transport for ApmTransport {
    fn log(&self, level: LogLevel, message: &str, metadata: &Metadata, timestamp: DateTime<Utc>) {
        let line = self.payload(level, message, metadata, timestamp);
        let addr = self.server_addr.clone();
        let timeout = self.timeout;
        // Сеть — только из фоновой очереди, log() не ждёт соединения
        self.queue.enqueue(Box::new(move || send_line(&addr, timeout, &line)));
    }
}

fn send_line(addr: &str, timeout: Duration, line: &str) -> io::Result<()> {
    let mut stream = TcpStream::connect(addr)?;
    stream.set_write_timeout(Some(timeout))?;
    stream.write_all(line.as_bytes())?;
    stream.write_all(b"\n")?;
    Ok(())
}

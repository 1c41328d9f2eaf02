use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::LogLevel;

// ===== Форматтеры =====

/// Открытая карта метаданных записи
pub type Metadata = BTreeMap<String, String>;

/// Чистое преобразование записи в строку. Реализация сама решает,
/// чем завершать строку; оба встроенных форматтера добавляют перевод
/// строки, поэтому длина результата — это ровно то, что ляжет на диск.
pub trait LogFormatter: Send + Sync {
    fn format(
        &self,
        level: LogLevel,
        message: &str,
        metadata: &Metadata,
        timestamp: DateTime<Utc>,
    ) -> String;
}

/// Текстовый формат по умолчанию
pub struct DefaultFormatter;

impl LogFormatter for DefaultFormatter {
    fn format(
        &self,
        level: LogLevel,
        message: &str,
        metadata: &Metadata,
        timestamp: DateTime<Utc>,
    ) -> String {
        let pid = std::process::id();
        let thread_id = format!("{:?}", std::thread::current().id());
        let mut line = format!(
            "[{}] {} PID:{} TID:{} {}",
            timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
            level.as_str(),
            pid,
            thread_id,
            message
        );
        for (key, value) in metadata {
            line.push_str(&format!(" {}={}", key, value));
        }
        line.push('\n');
        line
    }
}

/// JSON-формат: одна запись — один объект на строке
pub struct JsonFormatter;

impl LogFormatter for JsonFormatter {
    fn format(
        &self,
        level: LogLevel,
        message: &str,
        metadata: &Metadata,
        timestamp: DateTime<Utc>,
    ) -> String {
        let mut object = serde_json::Map::new();
        object.insert("timestamp".to_owned(), timestamp.to_rfc3339().into());
        object.insert("level".to_owned(), level.as_str().into());
        object.insert("message".to_owned(), message.into());
        if !metadata.is_empty() {
            let mut fields = serde_json::Map::new();
            for (key, value) in metadata {
                fields.insert(key.clone(), value.clone().into());
            }
            object.insert("metadata".to_owned(), fields.into());
        }

        let mut line = serde_json::Value::Object(object).to_string();
        line.push('\n');
        line
    }
}

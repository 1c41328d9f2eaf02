use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::format::{DefaultFormatter, LogFormatter, Metadata};
use crate::queue::TaskQueue;
use crate::retention;
use crate::transport::Transport;
use crate::LogLevel;

// ===== Файловый транспорт с ротацией =====

/// Условие ротации; фиксируется при создании транспорта
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RotationTrigger {
    /// `{file_path}` + поколения `{file_path}.N[.gz]`, 1 — самое свежее
    Size,
    /// Один файл на календарный день (UTC): `{pattern}-YYYY-MM-DD.log`
    Date,
    /// Дневные корзины + ротация внутри дня: `{pattern}-YYYY-MM-DD.N.log[.gz]`
    Hybrid,
}

/// Конфигурация файлового транспорта. Не перепроверяется после
/// создания: ошибочный путь проявится как молчаливые сбои записи.
#[derive(Debug, Clone)]
pub struct FileTransportConfig {
    pub file_path: PathBuf,
    /// Основа имени для режимов Date и Hybrid
    pub file_name_pattern: String,
    pub rotation: RotationTrigger,
    pub max_file_size: u64,
    pub compress: bool,
    pub max_files: usize,
    pub max_days: i64,
}

impl Default for FileTransportConfig {
    fn default() -> Self {
        FileTransportConfig {
            file_path: PathBuf::from("app.log"),
            file_name_pattern: "app".to_owned(),
            rotation: RotationTrigger::Size,
            max_file_size: 10 * 1024 * 1024,
            compress: true,
            max_files: 5,
            max_days: 30,
        }
    }
}

// Живое состояние транспорта. Дескриптор заменяется целиком, на месте
// не мутируется; одновременно открыт не более чем один поток.
struct LiveState {
    file: Option<File>,
    bytes_written: u64,
    bucket: Option<String>,
    rotation_pending: bool,
}

/// Файловый приёмник записей. Сама запись выполняется синхронно в
/// вызывающем потоке; всё медленное (ротация, сжатие, уборка) уходит
/// в фоновую очередь и никогда не задерживает `log()`.
pub struct FileTransport {
    config: FileTransportConfig,
    formatter: Box<dyn LogFormatter>,
    queue: TaskQueue,
    state: Arc<Mutex<LiveState>>,
}

impl FileTransport {
    pub fn new(config: FileTransportConfig, queue: TaskQueue) -> io::Result<Self> {
        Self::with_formatter(config, queue, Box::new(DefaultFormatter))
    }

    pub fn with_formatter(
        config: FileTransportConfig,
        queue: TaskQueue,
        formatter: Box<dyn LogFormatter>,
    ) -> io::Result<Self> {
        let dir = directory_of(&config.file_path);
        fs::create_dir_all(&dir)?;

        let mut state = LiveState {
            file: None,
            bytes_written: 0,
            bucket: None,
            rotation_pending: false,
        };

        if config.rotation == RotationTrigger::Size {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&config.file_path)?;
            // Файл мог остаться с прошлого запуска — счётчик стартует
            // с его фактического размера
            state.bytes_written = fs::metadata(&config.file_path).map(|m| m.len()).unwrap_or(0);
            state.file = Some(file);
        }

        let transport = FileTransport {
            config,
            formatter,
            queue,
            state: Arc::new(Mutex::new(state)),
        };
        transport.cleanup();
        Ok(transport)
    }

    /// Уборка ротированных файлов: по возрасту и/или по количеству.
    /// Выполняется при создании транспорта и по ручному вызову; любой
    /// сбой молча прерывает текущий проход.
    pub fn cleanup(&self) {
        let _ = self.sweep(Utc::now());
    }

    fn sweep(&self, reference: DateTime<Utc>) -> io::Result<()> {
        let dir = directory_of(&self.config.file_path);
        let names = list_file_names(&dir)?;
        let pattern = &self.config.file_name_pattern;

        match self.config.rotation {
            RotationTrigger::Size => {
                let base = base_name(&self.config.file_path)?;
                for name in retention::overflow_by_count(&base, &names, self.config.max_files) {
                    fs::remove_file(dir.join(name))?;
                }
            }
            RotationTrigger::Date => {
                for name in retention::expired_by_age(pattern, &names, reference, self.config.max_days)
                {
                    fs::remove_file(dir.join(name))?;
                }
            }
            RotationTrigger::Hybrid => {
                for name in retention::expired_by_age(pattern, &names, reference, self.config.max_days)
                {
                    fs::remove_file(dir.join(name))?;
                }
                let names = list_file_names(&dir)?;
                for name in
                    retention::hybrid_overflow_by_count(pattern, &names, self.config.max_files)
                {
                    fs::remove_file(dir.join(name))?;
                }
            }
        }
        Ok(())
    }

    // --- Режим Size ---

    fn write_size(&self, line: &str) {
        let length = line.len() as u64;
        let mut state = self.state.lock().unwrap();
        let state = &mut *state;

        // Порог проверяется ДО записи, но запись всё равно идёт в текущий
        // файл: он может превысить лимит на длину одной записи
        if state.bytes_written + length > self.config.max_file_size && !state.rotation_pending {
            state.rotation_pending = true;
            self.enqueue_size_rotation();
        }

        if state.file.is_none() && !state.rotation_pending {
            // Восстановление потока после прошлого сбоя
            state.file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.config.file_path)
                .ok();
        }

        if let Some(ref mut file) = state.file {
            let _ = file.write_all(line.as_bytes());
            let _ = file.flush();
            state.bytes_written += length;
        }
    }

    fn enqueue_size_rotation(&self) {
        let state = Arc::clone(&self.state);
        let path = self.config.file_path.clone();
        let max_files = self.config.max_files;
        let compress = self.config.compress;

        self.queue.enqueue(Box::new(move || {
            let result = rotate_by_size(&state, &path, max_files, compress);

            // Поток и флаг восстанавливаются при любом исходе, иначе
            // следующая ротация никогда не запустится
            let mut state = state.lock().unwrap();
            state.rotation_pending = false;
            if state.file.is_none() {
                state.file = OpenOptions::new().create(true).append(true).open(&path).ok();
            }
            // После удачной ротации здесь ноль; после сбоя — фактический
            // размер недоротированного файла
            state.bytes_written = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);

            result
        }));
    }

    // --- Режимы Date и Hybrid ---

    fn write_date(&self, line: &str, timestamp: DateTime<Utc>) {
        let bucket = bucket_of(timestamp);
        let mut state = self.state.lock().unwrap();
        self.ensure_bucket_stream(&mut state, &bucket);

        if let Some(ref mut file) = state.file {
            let _ = file.write_all(line.as_bytes());
            let _ = file.flush();
        }
    }

    fn write_hybrid(&self, line: &str, timestamp: DateTime<Utc>) {
        let bucket = bucket_of(timestamp);
        let mut state = self.state.lock().unwrap();
        self.ensure_bucket_stream(&mut state, &bucket);

        // Размер корзины читается с диска: корзина могла только что
        // смениться, а счётчик в памяти здесь не ведётся
        let on_disk = fs::metadata(self.bucket_path(&bucket))
            .map(|m| m.len())
            .unwrap_or(0);
        if on_disk + line.len() as u64 > self.config.max_file_size && !state.rotation_pending {
            state.rotation_pending = true;
            self.enqueue_bucket_rotation(&bucket);
        }

        if let Some(ref mut file) = state.file {
            let _ = file.write_all(line.as_bytes());
            let _ = file.flush();
        }
    }

    // Проверка и смена корзины. Выполняется синхронно: разрушительных
    // операций здесь нет, только открытие нового потока на дозапись.
    fn ensure_bucket_stream(&self, state: &mut LiveState, bucket: &str) {
        let switched = state.bucket.as_deref() != Some(bucket);
        if !switched && state.file.is_some() {
            return;
        }
        if !switched && state.rotation_pending {
            // Файл этой корзины сейчас переименовывается — не переоткрываем
            return;
        }

        // Сначала закрывается прежний поток, затем открывается новый
        state.file.take();
        state.bucket = Some(bucket.to_owned());
        // При сбое открытия потока нет: записи молча теряются, пока
        // очередной вызов не откроет его заново
        state.file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.bucket_path(bucket))
            .ok();
    }

    fn enqueue_bucket_rotation(&self, bucket: &str) {
        let state = Arc::clone(&self.state);
        let dir = directory_of(&self.config.file_path);
        let pattern = self.config.file_name_pattern.clone();
        let bucket = bucket.to_owned();
        let compress = self.config.compress;

        self.queue.enqueue(Box::new(move || {
            let result = rotate_bucket(&state, &dir, &pattern, &bucket, compress);
            // Живой поток переоткроет следующий log() при проверке корзины
            state.lock().unwrap().rotation_pending = false;
            result
        }));
    }

    fn bucket_path(&self, bucket: &str) -> PathBuf {
        directory_of(&self.config.file_path)
            .join(format!("{}-{}.log", self.config.file_name_pattern, bucket))
    }
}

impl Transport for FileTransport {
    fn log(&self, level: LogLevel, message: &str, metadata: &Metadata, timestamp: DateTime<Utc>) {
        let line = self.formatter.format(level, message, metadata, timestamp);
        match self.config.rotation {
            RotationTrigger::Size => self.write_size(&line),
            RotationTrigger::Date => self.write_date(&line, timestamp),
            RotationTrigger::Hybrid => self.write_hybrid(&line, timestamp),
        }
    }

    fn close(&self) {
        self.queue.wait_for_completion();
        let mut state = self.state.lock().unwrap();
        state.file.take(); // Drop закрывает дескриптор
    }
}

// Последовательность ротации по размеру. Выполняется в фоновой очереди;
// очередь же сериализует ротации, так что сдвиги не перекрываются.
fn rotate_by_size(
    state: &Arc<Mutex<LiveState>>,
    path: &Path,
    max_files: usize,
    compress: bool,
) -> io::Result<()> {
    // 1. Закрываем текущий поток (Drop выполняет flush и close)
    state.lock().unwrap().file.take();

    let dir = directory_of(path);
    let base = base_name(path)?;

    // 2. Существующие поколения, по убыванию номера
    let names = list_file_names(&dir)?;
    let mut generations: Vec<(u32, bool)> = names
        .iter()
        .filter_map(|name| retention::generation_of(&base, name))
        .collect();
    generations.sort_by(|a, b| b.0.cmp(&a.0));

    // 3. Сдвиг строго от старших к младшим: .2 → .3 раньше, чем .1 → .2,
    // иначе ещё не сдвинутый файл был бы затёрт
    for (generation, compressed) in generations {
        let suffix = if compressed { ".gz" } else { "" };
        let src = dir.join(format!("{}.{}{}", base, generation, suffix));
        if generation + 1 > max_files as u32 {
            let _ = fs::remove_file(&src);
        } else {
            let dst = dir.join(format!("{}.{}{}", base, generation + 1, suffix));
            let _ = fs::remove_file(&dst);
            fs::rename(&src, &dst)?;
        }
    }

    // 4. Текущий файл становится поколением 1; если его нет — нечего
    // ни переименовывать, ни сжимать
    if path.exists() {
        let first = dir.join(format!("{}.1", base));
        let _ = fs::remove_file(&first);
        fs::rename(path, &first)?;

        // 5. Сжатие — после переименования, чтобы живой путь
        // освободился как можно раньше
        if compress {
            gzip_file(&first)?;
        }
    }

    Ok(())
}

// Ротация переполненного файла дневной корзины (гибридный режим).
// Плотный сдвиг не нужен: файлы разделены по дням, берётся первый
// свободный номер внутри корзины.
fn rotate_bucket(
    state: &Arc<Mutex<LiveState>>,
    dir: &Path,
    pattern: &str,
    bucket: &str,
    compress: bool,
) -> io::Result<()> {
    let live = dir.join(format!("{}-{}.log", pattern, bucket));

    // 1. Закрываем поток, только если он смотрит на переполненный файл
    {
        let mut state = state.lock().unwrap();
        if state.bucket.as_deref() == Some(bucket) {
            state.file.take();
        }
    }

    if !live.exists() {
        return Ok(());
    }

    // 2. Первый свободный номер: .1, .2, ... (учитывая сжатые)
    let mut generation: u32 = 1;
    let rotated = loop {
        let candidate = dir.join(format!("{}-{}.{}.log", pattern, bucket, generation));
        let compressed = dir.join(format!("{}-{}.{}.log.gz", pattern, bucket, generation));
        if !candidate.exists() && !compressed.exists() {
            break candidate;
        }
        generation += 1;
    };

    // 3-4. Переименование и сжатие
    fs::rename(&live, &rotated)?;
    if compress {
        gzip_file(&rotated)?;
    }

    Ok(())
}

// Сжимает файл на месте: `x` → `x.gz`, оригинал удаляется
fn gzip_file(path: &Path) -> io::Result<()> {
    let mut source = File::open(path)?;

    let mut target_path = path.as_os_str().to_owned();
    target_path.push(".gz");
    let target = File::create(PathBuf::from(target_path))?;

    let mut encoder = GzEncoder::new(target, Compression::default());
    io::copy(&mut source, &mut encoder)?;
    encoder.finish()?;

    drop(source);
    fs::remove_file(path)
}

fn bucket_of(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d").to_string()
}

fn base_name(path: &Path) -> io::Result<String> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.to_owned())
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "log path has no file name"))
}

fn directory_of(path: &Path) -> PathBuf {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn list_file_names(dir: &Path) -> io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_owned());
        }
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io::Read;

    // Форматтер без префиксов: длина записи предсказуема до байта
    struct RawFormatter;

    impl LogFormatter for RawFormatter {
        fn format(
            &self,
            _level: LogLevel,
            message: &str,
            _metadata: &Metadata,
            _timestamp: DateTime<Utc>,
        ) -> String {
            format!("{}\n", message)
        }
    }

    fn config(dir: &Path, rotation: RotationTrigger) -> FileTransportConfig {
        FileTransportConfig {
            file_path: dir.join("app.log"),
            file_name_pattern: "app".to_owned(),
            rotation,
            max_file_size: 100,
            compress: false,
            max_files: 3,
            max_days: 30,
        }
    }

    fn raw_transport(config: FileTransportConfig, queue: TaskQueue) -> FileTransport {
        FileTransport::with_formatter(config, queue, Box::new(RawFormatter)).unwrap()
    }

    fn log(transport: &FileTransport, message: &str, timestamp: DateTime<Utc>) {
        transport.log(LogLevel::Info, message, &Metadata::new(), timestamp);
    }

    #[test]
    fn size_trigger_fires_after_write_lands_in_old_file() {
        let dir = tempfile::tempdir().unwrap();
        let queue = TaskQueue::new();
        let transport = raw_transport(config(dir.path(), RotationTrigger::Size), queue.clone());
        let now = Utc::now();

        // 90 байт: 0 + 90 <= 100, ротации нет
        log(&transport, &"a".repeat(89), now);
        // 50 байт: 90 + 50 > 100 — ротация ставится в очередь, но запись
        // всё равно уходит в текущий файл
        log(&transport, &"b".repeat(49), now);
        queue.wait_for_completion();

        let rotated = fs::read_to_string(dir.path().join("app.log.1")).unwrap();
        assert_eq!(rotated.len(), 140);
        assert!(rotated.contains(&"a".repeat(89)));
        assert!(rotated.contains(&"b".repeat(49)));

        let live = fs::read_to_string(dir.path().join("app.log")).unwrap();
        assert!(live.is_empty());
    }

    #[test]
    fn generation_shift_preserves_order_and_drops_overflow() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("app.log.1"), "gen1").unwrap();
        fs::write(dir.path().join("app.log.2"), "gen2").unwrap();
        fs::write(dir.path().join("app.log.3"), "gen3").unwrap();

        let queue = TaskQueue::new();
        let transport = raw_transport(config(dir.path(), RotationTrigger::Size), queue.clone());

        // Одна запись длиннее лимита — немедленный триггер
        log(&transport, &"x".repeat(150), Utc::now());
        queue.wait_for_completion();

        // .1 — свежая ротация, .2 — бывший .1, .3 — бывший .2,
        // бывший .3 вытеснен за пределы max_files
        assert!(fs::read_to_string(dir.path().join("app.log.1"))
            .unwrap()
            .contains(&"x".repeat(150)));
        assert_eq!(fs::read_to_string(dir.path().join("app.log.2")).unwrap(), "gen1");
        assert_eq!(fs::read_to_string(dir.path().join("app.log.3")).unwrap(), "gen2");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 4); // app.log + 3 поколения
    }

    #[test]
    fn compressed_generation_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let queue = TaskQueue::new();
        let mut cfg = config(dir.path(), RotationTrigger::Size);
        cfg.compress = true;
        let transport = raw_transport(cfg, queue.clone());

        let message = "payload ".repeat(20); // 160 байт + \n — триггер
        log(&transport, &message, Utc::now());
        queue.wait_for_completion();

        assert!(!dir.path().join("app.log.1").exists());
        let compressed = File::open(dir.path().join("app.log.1.gz")).unwrap();
        let mut decoder = flate2::read::GzDecoder::new(compressed);
        let mut restored = String::new();
        decoder.read_to_string(&mut restored).unwrap();
        assert_eq!(restored, format!("{}\n", message));
    }

    #[test]
    fn date_mode_splits_entries_by_their_own_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let queue = TaskQueue::new();
        let transport = raw_transport(config(dir.path(), RotationTrigger::Date), queue.clone());

        let before_midnight = Utc.with_ymd_and_hms(2024, 1, 15, 23, 59, 0).unwrap();
        let after_midnight = Utc.with_ymd_and_hms(2024, 1, 16, 0, 1, 0).unwrap();
        log(&transport, "first", before_midnight);
        log(&transport, "second", after_midnight);

        assert_eq!(
            fs::read_to_string(dir.path().join("app-2024-01-15.log")).unwrap(),
            "first\n"
        );
        assert_eq!(
            fs::read_to_string(dir.path().join("app-2024-01-16.log")).unwrap(),
            "second\n"
        );
    }

    #[test]
    fn date_mode_same_day_appends_to_one_file() {
        let dir = tempfile::tempdir().unwrap();
        let queue = TaskQueue::new();
        let transport = raw_transport(config(dir.path(), RotationTrigger::Date), queue.clone());

        let morning = Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap();
        let evening = Utc.with_ymd_and_hms(2024, 1, 15, 21, 0, 0).unwrap();
        log(&transport, "first", morning);
        log(&transport, "second", evening);

        assert_eq!(
            fs::read_to_string(dir.path().join("app-2024-01-15.log")).unwrap(),
            "first\nsecond\n"
        );
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn hybrid_overflow_rotates_bucket_and_reopens_lazily() {
        let dir = tempfile::tempdir().unwrap();
        let queue = TaskQueue::new();
        let transport = raw_transport(config(dir.path(), RotationTrigger::Hybrid), queue.clone());
        let day = Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap();

        log(&transport, &"a".repeat(89), day); // 90 байт, лимит не превышен
        log(&transport, &"b".repeat(49), day); // 90 + 50 > 100 — триггер
        queue.wait_for_completion();

        let rotated = fs::read_to_string(dir.path().join("app-2024-01-15.1.log")).unwrap();
        assert_eq!(rotated.len(), 140);
        assert!(!dir.path().join("app-2024-01-15.log").exists());

        // Следующая запись лениво переоткрывает файл корзины
        log(&transport, "third", day);
        assert_eq!(
            fs::read_to_string(dir.path().join("app-2024-01-15.log")).unwrap(),
            "third\n"
        );
    }

    #[test]
    fn hybrid_rotation_picks_first_free_suffix() {
        let dir = tempfile::tempdir().unwrap();

        let queue = TaskQueue::new();
        let transport = raw_transport(config(dir.path(), RotationTrigger::Hybrid), queue.clone());
        // После создания транспорта: уборка при конструировании не должна
        // тронуть файл, который мы подкладываем под занятый номер
        fs::write(dir.path().join("app-2024-01-15.1.log"), "older rotation").unwrap();
        let day = Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap();

        log(&transport, &"x".repeat(150), day);
        queue.wait_for_completion();

        assert_eq!(
            fs::read_to_string(dir.path().join("app-2024-01-15.1.log")).unwrap(),
            "older rotation"
        );
        assert!(fs::read_to_string(dir.path().join("app-2024-01-15.2.log"))
            .unwrap()
            .contains(&"x".repeat(150)));
    }

    #[test]
    fn age_sweep_deletes_only_strictly_older_dated_files() {
        let dir = tempfile::tempdir().unwrap();
        let queue = TaskQueue::new();
        let mut cfg = config(dir.path(), RotationTrigger::Date);
        cfg.max_days = 10;
        let transport = raw_transport(cfg, queue);

        // Файлы появляются после создания транспорта: проверяется именно
        // проход с фиксированным опорным временем
        fs::write(dir.path().join("app-2024-01-20.log"), "old").unwrap();
        fs::write(dir.path().join("app-2024-01-21.log"), "boundary").unwrap();
        fs::write(dir.path().join("app-2024-01-25.log"), "fresh").unwrap();
        fs::write(dir.path().join("app-notadate.log"), "junk").unwrap();

        let reference = Utc.with_ymd_and_hms(2024, 1, 31, 12, 0, 0).unwrap();
        transport.sweep(reference).unwrap();

        assert!(!dir.path().join("app-2024-01-20.log").exists());
        assert!(dir.path().join("app-2024-01-21.log").exists());
        assert!(dir.path().join("app-2024-01-25.log").exists());
        assert!(dir.path().join("app-notadate.log").exists());
    }

    #[test]
    fn construction_sweep_trims_generation_overflow() {
        let dir = tempfile::tempdir().unwrap();
        for generation in 1..=5 {
            fs::write(
                dir.path().join(format!("app.log.{}", generation)),
                generation.to_string(),
            )
            .unwrap();
        }

        let queue = TaskQueue::new();
        let _transport = raw_transport(config(dir.path(), RotationTrigger::Size), queue);

        // max_files = 3: остаются три самых свежих поколения
        assert!(dir.path().join("app.log.1").exists());
        assert!(dir.path().join("app.log.3").exists());
        assert!(!dir.path().join("app.log.4").exists());
        assert!(!dir.path().join("app.log.5").exists());
    }

    #[test]
    fn close_flushes_pending_rotation() {
        let dir = tempfile::tempdir().unwrap();
        let queue = TaskQueue::new();
        let transport = raw_transport(config(dir.path(), RotationTrigger::Size), queue);

        log(&transport, &"x".repeat(150), Utc::now());
        transport.close();

        assert!(dir.path().join("app.log.1").exists());
    }
}

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

// ===== Фоновая очередь задач =====

/// Единица фоновой работы (ротация, сжатие, отправка).
/// Результат видит только сама очередь.
pub type Task = Box<dyn FnOnce() -> io::Result<()> + Send + 'static>;

/// Ограничение очереди по умолчанию
pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;

struct QueueInner {
    pending: Mutex<VecDeque<Task>>,
    draining: AtomicBool,
    capacity: usize,
    delay: Option<Duration>,
}

/// Очередь задач со строгим порядком выполнения: задачи запускаются
/// по одной, в порядке добавления, одним циклом разбора. Может
/// разделяться несколькими транспортами (клонирование дешёвое).
#[derive(Clone)]
pub struct TaskQueue {
    inner: Arc<QueueInner>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_QUEUE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        TaskQueue {
            inner: Arc::new(QueueInner {
                pending: Mutex::new(VecDeque::new()),
                draining: AtomicBool::new(false),
                capacity,
                delay: None,
            }),
        }
    }

    /// Очередь с паузой между задачами
    pub fn with_delay(capacity: usize, delay: Duration) -> Self {
        TaskQueue {
            inner: Arc::new(QueueInner {
                pending: Mutex::new(VecDeque::new()),
                draining: AtomicBool::new(false),
                capacity,
                delay: Some(delay),
            }),
        }
    }

    /// Добавляет задачу, не блокируя вызывающий поток. При переполнении
    /// самая старая ожидающая задача молча отбрасывается, не выполняясь.
    pub fn enqueue(&self, task: Task) {
        {
            let mut pending = self.inner.pending.lock().unwrap();
            if pending.len() >= self.inner.capacity {
                pending.pop_front();
            }
            pending.push_back(task);
        }
        self.spawn_drain();
    }

    // Запускаем цикл разбора, если он ещё не идёт
    fn spawn_drain(&self) {
        if self
            .inner
            .draining
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            let inner = Arc::clone(&self.inner);
            thread::spawn(move || drain(&inner));
        }
    }

    /// Количество ещё не начатых задач
    pub fn size(&self) -> usize {
        self.inner.pending.lock().unwrap().len()
    }

    /// Активен ли цикл разбора
    pub fn is_draining(&self) -> bool {
        self.inner.draining.load(Ordering::SeqCst)
    }

    /// Ожидает (опросом) момента, когда очередь пуста и цикл остановлен.
    /// Точка синхронизации для тестов и корректного завершения.
    pub fn wait_for_completion(&self) {
        while self.is_draining() || self.size() > 0 {
            thread::sleep(Duration::from_millis(2));
        }
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

fn drain(inner: &QueueInner) {
    loop {
        loop {
            let task = inner.pending.lock().unwrap().pop_front();
            let task = match task {
                Some(task) => task,
                None => break,
            };
            // Сбой одной задачи не останавливает цикл и не всплывает наружу
            if let Err(e) = task() {
                eprintln!("[rotlog] background task failed: {}", e);
            }
            if let Some(delay) = inner.delay {
                thread::sleep(delay);
            }
        }
        inner.draining.store(false, Ordering::SeqCst);
        // Между опустошением и сбросом флага могла добавиться задача
        if inner.pending.lock().unwrap().is_empty() {
            return;
        }
        if inner
            .draining
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }
    }
}

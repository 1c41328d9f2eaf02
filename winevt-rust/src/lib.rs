//! # winevt-rs
//!
//! Запись в Windows Event Log для rotlog.
//! Если кастомный источник не зарегистрирован — использует "Application"
//! с префиксом в тексте сообщения.

use windows_sys::Win32::Foundation::PSID;
use windows_sys::Win32::System::EventLog::{
    DeregisterEventSource,
    RegisterEventSourceW,
    ReportEventW,
    EVENTLOG_ERROR_TYPE,
    EVENTLOG_WARNING_TYPE,
    EVENTLOG_INFORMATION_TYPE,
};

/// Класс события журнала
#[derive(Debug, Clone, Copy)]
pub enum EventKind {
    Information,
    Warning,
    Error,
}

impl EventKind {
    fn to_event_type(self) -> u16 {
        match self {
            EventKind::Information => EVENTLOG_INFORMATION_TYPE,
            EventKind::Warning => EVENTLOG_WARNING_TYPE,
            EventKind::Error => EVENTLOG_ERROR_TYPE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct WinEventLogger {
    preferred_source: String,
    fallback_source: &'static str,
}

impl WinEventLogger {
    pub fn new(preferred_source: &str) -> Self {
        Self {
            preferred_source: preferred_source.to_owned(),
            fallback_source: "Application",
        }
    }

    pub fn report(&self, kind: EventKind, message: &str) {
        if self.try_report(&self.preferred_source, kind, message) {
            return;
        }

        let prefixed = format!("[{}] {}", self.preferred_source, message);
        let _ = self.try_report(self.fallback_source, kind, &prefixed);
    }

    fn try_report(&self, source: &str, kind: EventKind, message: &str) -> bool {
        let w_source = to_wide(source);
        let w_message = to_wide(message);
        let msg_ptr = w_message.as_ptr();

        let h_source = unsafe { RegisterEventSourceW(std::ptr::null(), w_source.as_ptr()) };
        if h_source == 0 {
            return false;
        }

        let success: i32 = unsafe {
            ReportEventW(
                h_source,
                kind.to_event_type(),
                0,
                1000,
                0 as PSID,
                1,
                0,
                &msg_ptr,
                std::ptr::null_mut(),
            )
        };

        let _ = unsafe { DeregisterEventSource(h_source) };

        success != 0
    }
}

// UTF-16 с завершающим нулём
fn to_wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

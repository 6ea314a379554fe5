//! Injected diagnostics context.
//!
//! Вместо глобального logger-синглтона — явный `Diagnostics` resource,
//! который передаётся системам через `Res<Diagnostics>`. По умолчанию
//! активен только в debug builds (console sink), в release — no-op.

use bevy::prelude::*;

/// Уровень сообщения.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
        }
    }
}

/// Куда уходят diagnostics сообщения (console, тестовый буфер, host engine).
pub trait LogSink: Send + Sync {
    fn print(&self, level: LogLevel, message: &str);
}

/// Diagnostics context симуляции.
///
/// `None` sink = выключено полностью (production default).
#[derive(Resource)]
pub struct Diagnostics {
    sink: Option<Box<dyn LogSink>>,
    min_level: LogLevel,
}

impl Default for Diagnostics {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            Self::console()
        } else {
            Self::disabled()
        }
    }
}

impl Diagnostics {
    /// No-op diagnostics (ничего не печатаем).
    pub fn disabled() -> Self {
        Self {
            sink: None,
            min_level: LogLevel::Error,
        }
    }

    /// Console sink с timestamp, уровень Debug.
    pub fn console() -> Self {
        Self {
            sink: Some(Box::new(ConsoleSink)),
            min_level: LogLevel::Debug,
        }
    }

    /// Кастомный sink (host engine, тестовый буфер).
    pub fn with_sink(sink: Box<dyn LogSink>, min_level: LogLevel) -> Self {
        Self {
            sink: Some(sink),
            min_level,
        }
    }

    pub fn debug(&self, message: &str) {
        self.emit(LogLevel::Debug, message);
    }

    pub fn info(&self, message: &str) {
        self.emit(LogLevel::Info, message);
    }

    pub fn warning(&self, message: &str) {
        self.emit(LogLevel::Warning, message);
    }

    pub fn error(&self, message: &str) {
        self.emit(LogLevel::Error, message);
    }

    fn emit(&self, level: LogLevel, message: &str) {
        let Some(sink) = self.sink.as_ref() else {
            return;
        };
        if level >= self.min_level {
            sink.print(level, message);
        }
    }
}

/// Console sink (timestamp добавляем здесь, не в host engine)
pub struct ConsoleSink;

impl LogSink for ConsoleSink {
    fn print(&self, level: LogLevel, message: &str) {
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        println!("[{}] [{}] {}", timestamp, level.as_str(), message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct BufferSink(Arc<Mutex<Vec<String>>>);

    impl LogSink for BufferSink {
        fn print(&self, level: LogLevel, message: &str) {
            self.0
                .lock()
                .unwrap()
                .push(format!("[{}] {}", level.as_str(), message));
        }
    }

    #[test]
    fn test_level_ordering() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warning);
        assert!(LogLevel::Warning < LogLevel::Error);
    }

    #[test]
    fn test_disabled_sink_is_silent() {
        let diag = Diagnostics::disabled();
        // Не должно паниковать и ничего не печатает
        diag.error("ignored");
    }

    #[test]
    fn test_min_level_filter() {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let diag = Diagnostics::with_sink(
            Box::new(BufferSink(Arc::clone(&buffer))),
            LogLevel::Warning,
        );

        diag.debug("dropped");
        diag.info("dropped");
        diag.warning("kept");
        diag.error("kept");

        let lines = buffer.lock().unwrap();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("WARNING"));
        assert!(lines[1].contains("ERROR"));
    }
}

use chrono::{DateTime, Utc};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::sync::OnceLock;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageType {
    Error,
    Warning,
    Info,
    Priority,
    Status,
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message_type_str = match self {
            MessageType::Error => "Error",
            MessageType::Warning => "Warning",
            MessageType::Info => "Info",
            MessageType::Priority => "Priority",
            MessageType::Status => "Status",
        };
        write!(f, "{}", message_type_str)
    }
}

impl From<Level> for MessageType {
    fn from(level: Level) -> Self {
        match level {
            Level::Error => MessageType::Error,
            Level::Warn => MessageType::Warning,
            Level::Info => MessageType::Priority,
            Level::Debug => MessageType::Info,
            Level::Trace => MessageType::Status,
        }
    }
}

impl MessageType {
    fn color(&self) -> &'static str {
        match self {
            MessageType::Error => "\x1b[31m",
            MessageType::Warning => "\x1b[33m",
            MessageType::Info => "\x1b[0m",
            MessageType::Priority => "\x1b[32m",
            MessageType::Status => "\x1b[36m",
        }
    }
}

#[derive(Clone, Debug)]
pub struct StatusMessage {
    pub timestamp: DateTime<Utc>,
    pub message_type: MessageType,
    pub content: String,
}

impl StatusMessage {
    pub fn new(message_type: MessageType, content: String) -> Self {
        StatusMessage {
            timestamp: Utc::now(),
            message_type,
            content,
        }
    }
}

impl fmt::Display for StatusMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | {:^8} | {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            self.message_type.to_string(),
            self.content
        )
    }
}

/// Bounded ring of recent messages. When headless, every message is also printed,
/// coloured by type.
pub struct MessageLog {
    messages: Mutex<VecDeque<StatusMessage>>,
    headless: bool,
    max_size: usize,
    level: LevelFilter,
}

impl MessageLog {
    pub fn new(headless: bool, max_size: Option<usize>, level: LevelFilter) -> Self {
        let max_size = max_size.unwrap_or(500).max(1);
        MessageLog {
            messages: Mutex::new(VecDeque::with_capacity(max_size)),
            headless,
            max_size,
            level,
        }
    }

    pub fn add_message(&self, message: StatusMessage) {
        if self.headless {
            let white = "\x1b[0m";
            println!("{}{}{}", message.message_type.color(), message, white);
        }

        let mut messages = self.messages.lock();
        while messages.len() >= self.max_size {
            messages.pop_front();
        }
        messages.push_back(message);
    }

    pub fn get_all_messages(&self) -> Vec<StatusMessage> {
        self.messages.lock().iter().cloned().collect()
    }

    pub fn size(&self) -> usize {
        self.messages.lock().len()
    }
}

impl Log for MessageLog {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        self.add_message(StatusMessage::new(
            record.level().into(),
            record.args().to_string(),
        ));
    }

    fn flush(&self) {}
}

static MESSAGE_LOG: OnceLock<MessageLog> = OnceLock::new();

/// Install a [MessageLog] as the global logger and return it.
pub fn init(
    headless: bool,
    max_size: Option<usize>,
    level: LevelFilter,
) -> Result<&'static MessageLog, SetLoggerError> {
    let log = MESSAGE_LOG.get_or_init(|| MessageLog::new(headless, max_size, level));
    log::set_logger(log)?;
    log::set_max_level(level);
    Ok(log)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_is_bounded() {
        let log = MessageLog::new(false, Some(3), LevelFilter::Info);
        for n in 0..5 {
            log.add_message(StatusMessage::new(MessageType::Info, format!("message {n}")));
        }

        let messages = log.get_all_messages();
        assert_eq!(log.size(), 3);
        assert_eq!(messages[0].content, "message 2");
        assert_eq!(messages[2].content, "message 4");
    }

    #[test]
    fn test_zero_size_keeps_latest() {
        let log = MessageLog::new(false, Some(0), LevelFilter::Info);
        for n in 0..4 {
            log.add_message(StatusMessage::new(MessageType::Info, format!("message {n}")));
        }

        assert_eq!(log.size(), 1);
        assert_eq!(log.get_all_messages()[0].content, "message 3");
    }

    #[test]
    fn test_level_filter() {
        let log = MessageLog::new(false, None, LevelFilter::Warn);
        log.log(
            &Record::builder()
                .level(Level::Info)
                .args(format_args!("hidden"))
                .build(),
        );
        log.log(
            &Record::builder()
                .level(Level::Error)
                .args(format_args!("shown"))
                .build(),
        );

        let messages = log.get_all_messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].message_type, MessageType::Error);
        assert_eq!(messages[0].content, "shown");
    }
}

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::{pointer::JsonPointer, reference::SchemaRef};

/// Severity of a diagnostic, ordered from least to most severe.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warning,
    Error,
    Fatal,
    /// disables logging or aborting altogether
    None,
}

impl Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
            LogLevel::Fatal => "fatal",
            LogLevel::None => "none",
        };
        write!(f, "{s}")
    }
}

/// Which stage of processing produced a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Loading,
    Resolution,
    Syntax,
    Validation,
}

/// A single diagnostic entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub(crate) level: LogLevel,
    pub(crate) domain: Domain,
    pub(crate) keyword: Option<String>,
    pub(crate) schema: Option<SchemaRef>,
    pub(crate) instance: JsonPointer,
    pub(crate) text: String,
    pub(crate) args: Map<String, Value>,
}

impl Message {
    pub fn new(level: LogLevel, domain: Domain, text: impl Into<String>) -> Self {
        Self {
            level,
            domain,
            keyword: None,
            schema: None,
            instance: JsonPointer::root(),
            text: text.into(),
            args: Map::new(),
        }
    }

    pub fn keyword(mut self, kw: impl Into<String>) -> Self {
        self.keyword = Some(kw.into());
        self
    }

    pub fn schema(mut self, schema: SchemaRef) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn instance(mut self, ptr: JsonPointer) -> Self {
        self.instance = ptr;
        self
    }

    pub fn arg(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.args.insert(name.to_owned(), value.into());
        self
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    pub fn keyword_name(&self) -> Option<&str> {
        self.keyword.as_deref()
    }

    pub fn schema_ref(&self) -> Option<&SchemaRef> {
        self.schema.as_ref()
    }

    pub fn instance_ptr(&self) -> &JsonPointer {
        &self.instance
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn args(&self) -> &Map<String, Value> {
        &self.args
    }
}

/// Returned when a message at or above the fatal threshold is logged.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct Aborted {
    message: Box<Message>,
}

impl Aborted {
    pub(crate) fn new(message: Message) -> Self {
        Self {
            message: Box::new(message),
        }
    }

    pub fn message(&self) -> &Message {
        &self.message
    }

    pub fn into_message(self) -> Message {
        *self.message
    }
}

/// Ordered, append-only collection of diagnostics.
///
/// Messages below `log_level` are dropped, but still count towards
/// success. Logging a message at or above `threshold` aborts the
/// current operation.
#[derive(Debug, Clone)]
pub struct Report {
    log_level: LogLevel,
    threshold: LogLevel,
    messages: Vec<Message>,
    failed: bool,
    fatal: bool,
}

impl Default for Report {
    fn default() -> Self {
        Self::new(LogLevel::Info, LogLevel::Fatal)
    }
}

impl Report {
    pub fn new(log_level: LogLevel, threshold: LogLevel) -> Self {
        Self {
            log_level,
            threshold,
            messages: vec![],
            failed: false,
            fatal: false,
        }
    }

    pub fn log_level(&self) -> LogLevel {
        self.log_level
    }

    pub fn threshold(&self) -> LogLevel {
        self.threshold
    }

    pub fn log(&mut self, msg: Message) -> Result<(), Aborted> {
        self.failed |= msg.level >= LogLevel::Error && msg.level != LogLevel::None;
        self.fatal |= msg.level == LogLevel::Fatal;
        if msg.level >= self.threshold && msg.level != LogLevel::None {
            return Err(Aborted::new(msg));
        }
        if msg.level >= self.log_level {
            self.messages.push(msg);
        }
        Ok(())
    }

    /// true iff nothing at error level or above was logged
    pub fn is_success(&self) -> bool {
        !self.failed
    }

    pub(crate) fn has_fatal(&self) -> bool {
        self.fatal
    }

    /// Appends all messages of `other`, checking each against this
    /// report's threshold.
    pub fn merge(&mut self, other: Report) -> Result<(), Aborted> {
        self.failed |= other.failed;
        self.fatal |= other.fatal;
        for msg in other.messages {
            if msg.level >= self.threshold && msg.level != LogLevel::None {
                return Err(Aborted::new(msg));
            }
            if msg.level >= self.log_level {
                self.messages.push(msg);
            }
        }
        Ok(())
    }

    /// An empty report with the same log level and the given threshold.
    pub fn with_fatal_threshold(&self, threshold: LogLevel) -> Report {
        Report::new(self.log_level, threshold)
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    /// messages at error level or above
    pub fn errors(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter().filter(|m| m.level >= LogLevel::Error)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl<'a> IntoIterator for &'a Report {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}

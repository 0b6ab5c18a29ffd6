//! Command output
//!
//! Human output goes to stdout with short status prefixes; warnings and
//! errors go to stderr. JSON output prints one record per message and keeps
//! informational chatter out of the stream so it stays machine-readable.

use serde_json::{json, Value};

/// Selected by the global `--json` flag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
}

impl OutputFormat {
    pub fn is_json(self) -> bool {
        self == OutputFormat::Json
    }
}

/// Sink for everything a command reports to the user
pub trait OutputFormatter {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
    fn warn(&self, message: &str);
    fn info(&self, message: &str);
    /// Prints a complete JSON document
    fn print_json(&self, value: &Value);
    /// Prints one JSON value per line, for streamed output
    fn print_json_line(&self, value: &Value);
}

pub struct HumanFormatter;

impl OutputFormatter for HumanFormatter {
    fn success(&self, message: &str) {
        println!("ok    {message}");
    }

    fn error(&self, message: &str) {
        eprintln!("error {message}");
    }

    fn warn(&self, message: &str) {
        eprintln!("warn  {message}");
    }

    fn info(&self, message: &str) {
        println!("      {message}");
    }

    fn print_json(&self, _value: &Value) {}

    fn print_json_line(&self, _value: &Value) {}
}

pub struct JsonFormatter;

/// `{"status": .., "message": ..}` record used for plain messages
fn record(status: &str, message: &str) -> Value {
    json!({ "status": status, "message": message })
}

impl OutputFormatter for JsonFormatter {
    fn success(&self, message: &str) {
        println!("{}", record("ok", message));
    }

    fn error(&self, message: &str) {
        eprintln!("{}", record("error", message));
    }

    fn warn(&self, message: &str) {
        eprintln!("{}", record("warning", message));
    }

    fn info(&self, _message: &str) {}

    fn print_json(&self, value: &Value) {
        match serde_json::to_string_pretty(value) {
            Ok(text) => println!("{text}"),
            Err(_) => println!("{value}"),
        }
    }

    fn print_json_line(&self, value: &Value) {
        println!("{value}");
    }
}

pub fn get_formatter(format: OutputFormat) -> Box<dyn OutputFormatter> {
    if format.is_json() {
        Box::new(JsonFormatter)
    } else {
        Box::new(HumanFormatter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_shape() {
        let value = record("error", "boom");
        assert_eq!(value["status"], "error");
        assert_eq!(value["message"], "boom");
    }

    #[test]
    fn test_is_json() {
        assert!(OutputFormat::Json.is_json());
        assert!(!OutputFormat::Human.is_json());
    }
}

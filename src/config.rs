//! Startup configuration: the eight settings the bridge needs, read from the
//! process environment and optionally pre-populated from a sibling `.env`
//! file. All eight are required; a missing or unparseable value is a fatal
//! startup error, never a runtime one.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::BridgeError;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub kafka_brokers: String,
    pub kafka_consumer_topic: String,
    pub kafka_producer_topic: String,
    pub kafka_group_id: String,
    pub interface: String,
    pub message_queue_capacity: usize,
    pub kafka_poll_timeout_ms: u64,
}

impl Config {
    /// Loads configuration from the process environment, after first
    /// loading `.env` (if present) into that same environment for any name
    /// not already set. Real environment variables always win over the
    /// file, so operators can override it at the shell or in a container
    /// manifest without editing it.
    pub fn load() -> Result<Config, BridgeError> {
        load_dotenv(Path::new(".env"));

        Ok(Config {
            port: required_int("PORT")? as u16,
            kafka_brokers: required_str("KAFKA_BROKERS")?,
            kafka_consumer_topic: required_str("KAFKA_CONSUMER_TOPIC")?,
            kafka_producer_topic: required_str("KAFKA_PRODUCER_TOPIC")?,
            kafka_group_id: required_str("KAFKA_GROUP_ID")?,
            interface: required_str("INTERFACE")?,
            message_queue_capacity: required_int("MSG_QUEUE_CAP")? as usize,
            kafka_poll_timeout_ms: required_int("KAFKA_POLL")? as u64,
        })
    }
}

fn required_str(name: &str) -> Result<String, BridgeError> {
    std::env::var(name)
        .map_err(|_| BridgeError::Config(format!("missing required config variable: {name}")))
}

fn required_int(name: &str) -> Result<i64, BridgeError> {
    let raw = required_str(name)?;
    raw.trim()
        .parse::<i64>()
        .map_err(|_| BridgeError::Config(format!("{name} must be an integer, got {raw:?}")))
}

/// Parses a `.env`-style file of `NAME=VALUE` lines and inserts each
/// variable into the process environment, skipping names that are already
/// set. Blank lines and lines starting with `#` are ignored. Values are raw
/// text up to end-of-line (trailing `\r`/`\n` stripped); there is no
/// quoting, no escaping, no interpolation. A missing file is not an error:
/// it is the expected case in deployments where configuration arrives
/// purely through real environment variables.
fn load_dotenv(path: &Path) {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(_) => return,
    };

    for (name, value) in parse_dotenv(&contents) {
        if std::env::var(&name).is_err() {
            std::env::set_var(&name, &value);
        }
    }
}

fn parse_dotenv(contents: &str) -> HashMap<String, String> {
    let mut items = HashMap::new();
    for raw_line in contents.lines() {
        let line = raw_line.trim_end_matches(['\r', '\n']);
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some(eq) = line.find('=') else {
            continue;
        };
        let name = &line[..eq];
        let value = &line[eq + 1..];
        items.insert(name.to_string(), value.to_string());
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dotenv_basic() {
        let items = parse_dotenv("PORT=8080\nKAFKA_BROKERS=localhost:9092\n");
        assert_eq!(items.get("PORT").map(String::as_str), Some("8080"));
        assert_eq!(
            items.get("KAFKA_BROKERS").map(String::as_str),
            Some("localhost:9092")
        );
    }

    #[test]
    fn test_parse_dotenv_skips_blank_lines_and_comments() {
        let items = parse_dotenv("# a comment\n\nFOO=bar\n  \n# another\nBAZ=qux\n");
        assert_eq!(items.len(), 2);
        assert_eq!(items.get("FOO").map(String::as_str), Some("bar"));
        assert_eq!(items.get("BAZ").map(String::as_str), Some("qux"));
    }

    #[test]
    fn test_parse_dotenv_ignores_lines_without_equals() {
        let items = parse_dotenv("NOT_A_SETTING\nFOO=bar\n");
        assert_eq!(items.len(), 1);
        assert_eq!(items.get("FOO").map(String::as_str), Some("bar"));
    }

    #[test]
    fn test_parse_dotenv_value_is_raw_no_quoting() {
        let items = parse_dotenv("MSG=\"quoted\"\n");
        assert_eq!(items.get("MSG").map(String::as_str), Some("\"quoted\""));
    }

    #[test]
    fn test_parse_dotenv_value_may_contain_equals() {
        let items = parse_dotenv("URL=http://host?a=1&b=2\n");
        assert_eq!(
            items.get("URL").map(String::as_str),
            Some("http://host?a=1&b=2")
        );
    }

    #[test]
    fn test_required_int_rejects_non_numeric() {
        std::env::set_var("BRIDGE_TEST_NONNUMERIC", "not-a-number");
        let err = required_int("BRIDGE_TEST_NONNUMERIC").unwrap_err();
        assert!(matches!(err, BridgeError::Config(_)));
        std::env::remove_var("BRIDGE_TEST_NONNUMERIC");
    }

    #[test]
    fn test_required_str_missing_is_config_error() {
        std::env::remove_var("BRIDGE_TEST_MISSING_VAR");
        let err = required_str("BRIDGE_TEST_MISSING_VAR").unwrap_err();
        assert!(matches!(err, BridgeError::Config(_)));
    }

    #[test]
    fn test_load_dotenv_reads_a_real_file() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "BRIDGE_TEST_DOTENV_A=from-file").unwrap();
        writeln!(file, "BRIDGE_TEST_DOTENV_B=also-from-file").unwrap();

        std::env::remove_var("BRIDGE_TEST_DOTENV_A");
        std::env::set_var("BRIDGE_TEST_DOTENV_B", "from-real-env");

        load_dotenv(file.path());

        assert_eq!(
            std::env::var("BRIDGE_TEST_DOTENV_A").as_deref(),
            Ok("from-file"),
            "a variable absent from the real environment is populated from the file"
        );
        assert_eq!(
            std::env::var("BRIDGE_TEST_DOTENV_B").as_deref(),
            Ok("from-real-env"),
            "a variable already set in the real environment is never overwritten by the file"
        );

        std::env::remove_var("BRIDGE_TEST_DOTENV_A");
        std::env::remove_var("BRIDGE_TEST_DOTENV_B");
    }

    #[test]
    fn test_load_dotenv_missing_file_is_not_an_error() {
        load_dotenv(std::path::Path::new("/nonexistent/bridge-test.env"));
    }
}

//! Config validation.
//!
//! Detects syntax errors, unknown (likely misspelled) keys, and values the
//! recorder cannot run with.

use std::path::{Path, PathBuf};

use secrecy::ExposeSecret;

use crate::schema::RecordBotConfig;

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// One of "syntax", "unknown-field", "type-error", "value".
    pub category: &'static str,
    /// Dotted path, e.g. "recorder.queue_capacity".
    pub path: String,
    pub message: String,
}

/// Result of validating a configuration file.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
    pub config_path: Option<PathBuf>,
}

impl ValidationResult {
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    fn push(
        &mut self,
        severity: Severity,
        category: &'static str,
        path: &str,
        message: impl Into<String>,
    ) {
        self.diagnostics.push(Diagnostic {
            severity,
            category,
            path: path.into(),
            message: message.into(),
        });
    }
}

const DISCORD_KEYS: &[&str] = &[
    "token",
    "prefix",
    "name",
    "owner",
    "description",
    "record_bot_messages",
];

const RECORDER_KEYS: &[&str] = &[
    "records_dir",
    "queue_capacity",
    "open_timeout_ms",
    "write_timeout_ms",
    "shutdown_grace_ms",
];

const SECTIONS: &[(&str, &[&str])] = &[("discord", DISCORD_KEYS), ("recorder", RECORDER_KEYS)];

/// Shutdown waits longer than this are flagged; most supervisors kill first.
const MAX_REASONABLE_GRACE_MS: u64 = 30_000;

/// Validate the config file at `path`, or the discovered one when `None`.
#[must_use]
pub fn validate(path: Option<&Path>) -> ValidationResult {
    let Some(config_path) = path
        .map(Path::to_path_buf)
        .or_else(crate::loader::find_config_file)
    else {
        let mut result = ValidationResult::default();
        result.push(
            Severity::Info,
            "syntax",
            "",
            "no config file found; using defaults",
        );
        return result;
    };

    let mut result = match std::fs::read_to_string(&config_path) {
        Ok(raw) => {
            let raw = crate::env_subst::substitute_env(&raw);
            match config_path.extension().and_then(|e| e.to_str()) {
                Some("yaml" | "yml") => validate_yaml_str(&raw),
                Some("json") => validate_json_str(&raw),
                _ => validate_toml_str(&raw),
            }
        },
        Err(e) => {
            let mut result = ValidationResult::default();
            result.push(
                Severity::Error,
                "syntax",
                "",
                format!("failed to read config file: {e}"),
            );
            result
        },
    };
    result.config_path = Some(config_path);
    result
}

/// Validate a TOML document without touching the filesystem.
#[must_use]
pub fn validate_toml_str(raw: &str) -> ValidationResult {
    let document = toml::from_str::<toml::Value>(raw)
        .map_err(|e| e.to_string())
        .and_then(|v| serde_json::to_value(v).map_err(|e| e.to_string()));
    validate_document("TOML", document, || {
        toml::from_str(raw).map_err(|e| e.to_string())
    })
}

/// Validate a YAML document without touching the filesystem.
#[must_use]
pub fn validate_yaml_str(raw: &str) -> ValidationResult {
    validate_document(
        "YAML",
        serde_yaml::from_str(raw).map_err(|e| e.to_string()),
        || serde_yaml::from_str(raw).map_err(|e| e.to_string()),
    )
}

/// Validate a JSON document without touching the filesystem.
#[must_use]
pub fn validate_json_str(raw: &str) -> ValidationResult {
    validate_document(
        "JSON",
        serde_json::from_str(raw).map_err(|e| e.to_string()),
        || serde_json::from_str(raw).map_err(|e| e.to_string()),
    )
}

/// Shared checks once a document is parsed into its untyped form: unknown
/// keys first, then the typed parse and value checks.
fn validate_document(
    format: &str,
    document: Result<serde_json::Value, String>,
    typed: impl FnOnce() -> Result<RecordBotConfig, String>,
) -> ValidationResult {
    let mut result = ValidationResult::default();

    let value = match document {
        Ok(v) => v,
        Err(e) => {
            result.push(
                Severity::Error,
                "syntax",
                "",
                format!("{format} syntax error: {e}"),
            );
            return result;
        },
    };

    if let Some(table) = value.as_object() {
        check_unknown_fields(table, &mut result);
    }

    match typed() {
        Ok(config) => {
            let semantic = validate_config(&config);
            result.diagnostics.extend(semantic.diagnostics);
        },
        Err(e) => result.push(
            Severity::Error,
            "type-error",
            "",
            format!("type error: {e}"),
        ),
    }

    result
}

/// Check values of an already-parsed config.
///
/// An empty token is only a warning here: it may still be supplied on the
/// command line or through `DISCORD_TOKEN`.
#[must_use]
pub fn validate_config(config: &RecordBotConfig) -> ValidationResult {
    let mut result = ValidationResult::default();
    let discord = &config.discord;
    let recorder = &config.recorder;

    if discord.token.expose_secret().trim().is_empty() {
        result.push(
            Severity::Warning,
            "value",
            "discord.token",
            "no bot token configured; pass --token or set DISCORD_TOKEN",
        );
    }
    if discord.prefix.is_empty() {
        result.push(
            Severity::Error,
            "value",
            "discord.prefix",
            "command prefix must not be empty",
        );
    } else if discord.prefix.chars().any(char::is_whitespace) {
        result.push(
            Severity::Error,
            "value",
            "discord.prefix",
            "command prefix must not contain whitespace",
        );
    }

    if recorder.queue_capacity == 0 {
        result.push(
            Severity::Error,
            "value",
            "recorder.queue_capacity",
            "queue capacity must be at least 1",
        );
    }
    for (key, value) in [
        ("recorder.open_timeout_ms", recorder.open_timeout_ms),
        ("recorder.write_timeout_ms", recorder.write_timeout_ms),
    ] {
        if value == 0 {
            result.push(Severity::Error, "value", key, "timeout must be non-zero");
        }
    }
    if recorder.shutdown_grace_ms > MAX_REASONABLE_GRACE_MS {
        result.push(
            Severity::Warning,
            "value",
            "recorder.shutdown_grace_ms",
            format!(
                "shutdown grace above {}s is likely to be cut short by the process supervisor",
                MAX_REASONABLE_GRACE_MS / 1000
            ),
        );
    }
    if recorder.records_dir.is_file() {
        result.push(
            Severity::Error,
            "value",
            "recorder.records_dir",
            format!("{} is a file, not a directory", recorder.records_dir.display()),
        );
    }

    result
}

fn check_unknown_fields(
    table: &serde_json::Map<String, serde_json::Value>,
    result: &mut ValidationResult,
) {
    let section_names: Vec<&str> = SECTIONS.iter().map(|(name, _)| *name).collect();

    for (key, value) in table {
        let Some((_, known)) = SECTIONS.iter().find(|(name, _)| *name == key.as_str()) else {
            result.push(
                Severity::Error,
                "unknown-field",
                key,
                unknown_field_message(key, &section_names),
            );
            continue;
        };
        let Some(section) = value.as_object() else {
            continue;
        };
        for field in section.keys() {
            if !known.contains(&field.as_str()) {
                result.push(
                    Severity::Error,
                    "unknown-field",
                    &format!("{key}.{field}"),
                    unknown_field_message(field, known),
                );
            }
        }
    }
}

fn unknown_field_message(key: &str, candidates: &[&str]) -> String {
    match suggest(key, candidates) {
        Some(s) => format!("unknown field (did you mean \"{s}\"?)"),
        None => "unknown field".into(),
    }
}

/// Closest candidate within an edit distance of 3.
fn suggest<'a>(needle: &str, candidates: &[&'a str]) -> Option<&'a str> {
    candidates
        .iter()
        .map(|c| (*c, levenshtein(needle, c)))
        .filter(|(_, d)| (1..=3).contains(d))
        .min_by_key(|(_, d)| *d)
        .map(|(c, _)| c)
}

fn levenshtein(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();

    for (i, ca) in a.chars().enumerate() {
        let mut curr = Vec::with_capacity(b.len() + 1);
        curr.push(i + 1);
        for (j, cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != *cb);
            curr.push(substitution.min(prev[j + 1] + 1).min(curr[j] + 1));
        }
        prev = curr;
    }
    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levenshtein_distances() {
        assert_eq!(levenshtein("prefix", "prefix"), 0);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("prefx", "prefix"), 1);
        assert_eq!(levenshtein("tokne", "token"), 2);
    }

    #[test]
    fn empty_config_only_warns_about_token() {
        let result = validate_toml_str("");
        assert!(!result.has_errors());
        assert_eq!(result.count(Severity::Warning), 1);
        assert_eq!(result.diagnostics[0].path, "discord.token");
    }

    #[test]
    fn full_valid_config_is_clean() {
        let result = validate_toml_str(
            r#"
            [discord]
            token = "abc"
            prefix = "!"
            name = "Record Bot"
            owner = "Techfoxis"
            description = "records"
            record_bot_messages = false

            [recorder]
            records_dir = "records"
            queue_capacity = 64
            open_timeout_ms = 1000
            write_timeout_ms = 1000
            shutdown_grace_ms = 2000
            "#,
        );
        assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
    }

    #[test]
    fn misspelled_keys_get_suggestions() {
        let result = validate_toml_str("[discrod]\n[recorder]\nqueue_capacty = 3\n");
        let unknown: Vec<_> = result
            .diagnostics
            .iter()
            .filter(|d| d.category == "unknown-field")
            .collect();
        assert_eq!(unknown.len(), 2);
        assert!(unknown.iter().any(|d| d.path == "discrod"
            && d.message.contains("did you mean \"discord\"")));
        assert!(unknown.iter().any(|d| d.path == "recorder.queue_capacty"
            && d.message.contains("queue_capacity")));
    }

    #[test]
    fn syntax_error_stops_further_checks() {
        let result = validate_toml_str("[discord\n");
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].category, "syntax");
    }

    #[test]
    fn wrong_type_is_reported() {
        let result = validate_toml_str("[recorder]\nqueue_capacity = \"lots\"\n");
        assert!(result
            .diagnostics
            .iter()
            .any(|d| d.category == "type-error"));
    }

    #[test]
    fn bad_values_are_errors() {
        let result = validate_toml_str(
            "[discord]\ntoken = \"t\"\nprefix = \"! \"\n[recorder]\nqueue_capacity = 0\nwrite_timeout_ms = 0\n",
        );
        let paths: Vec<&str> = result
            .diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .map(|d| d.path.as_str())
            .collect();
        assert_eq!(
            paths,
            vec![
                "discord.prefix",
                "recorder.queue_capacity",
                "recorder.write_timeout_ms"
            ]
        );
    }

    #[test]
    fn long_grace_is_a_warning() {
        let result = validate_toml_str("[discord]\ntoken = \"t\"\n[recorder]\nshutdown_grace_ms = 120000\n");
        assert!(!result.has_errors());
        assert_eq!(result.count(Severity::Warning), 1);
    }

    #[test]
    fn records_dir_pointing_at_file_is_an_error() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut config = RecordBotConfig::default();
        config.recorder.records_dir = file.path().to_path_buf();
        let result = validate_config(&config);
        assert!(result
            .diagnostics
            .iter()
            .any(|d| d.path == "recorder.records_dir" && d.severity == Severity::Error));
    }

    #[test]
    fn misspelled_keys_in_yaml_are_reported() {
        let result = validate_yaml_str("discord:\n  prefx: \"?\"\nrecorder:\n  queue_capacity: 4\n");
        let unknown: Vec<_> = result
            .diagnostics
            .iter()
            .filter(|d| d.category == "unknown-field")
            .collect();
        assert_eq!(unknown.len(), 1);
        assert_eq!(unknown[0].path, "discord.prefx");
        assert!(unknown[0].message.contains("did you mean \"prefix\""));
    }

    #[test]
    fn misspelled_keys_in_json_file_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recordbot.json");
        std::fs::write(
            &path,
            r#"{"discord": {"token": "t"}, "recordr": {"queue_capacity": 4}}"#,
        )
        .unwrap();

        let result = validate(Some(&path));
        assert_eq!(result.config_path.as_deref(), Some(path.as_path()));
        assert!(result.diagnostics.iter().any(|d| d.category == "unknown-field"
            && d.path == "recordr"
            && d.message.contains("did you mean \"recorder\"")));
        assert!(result.has_errors());
    }

    #[test]
    fn clean_yaml_file_passes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recordbot.yaml");
        std::fs::write(&path, "discord:\n  token: t\nrecorder:\n  queue_capacity: 4\n").unwrap();

        let result = validate(Some(&path));
        assert!(!result.has_errors());
        assert_eq!(result.count(Severity::Warning), 0);
    }
}

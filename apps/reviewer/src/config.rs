use std::{collections::HashMap, fs, path::Path, time::Duration};

use audit_client::CallPolicy;

pub const DEFAULT_CONFIG_FILE: &str = "reviewer.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_url: String,
    pub login_timeout: Option<Duration>,
    pub analyze_timeout: Option<Duration>,
    pub history_timeout: Option<Duration>,
    pub history_retries: u32,
}

impl Default for Settings {
    fn default() -> Self {
        let policy = CallPolicy::default();
        Self {
            server_url: "http://localhost:8000".into(),
            login_timeout: policy.login_timeout,
            analyze_timeout: policy.analyze_timeout,
            history_timeout: policy.history_timeout,
            history_retries: policy.history_retries,
        }
    }
}

impl Settings {
    pub fn call_policy(&self) -> CallPolicy {
        CallPolicy {
            login_timeout: self.login_timeout,
            analyze_timeout: self.analyze_timeout,
            history_timeout: self.history_timeout,
            history_retries: self.history_retries,
        }
    }
}

/// Defaults, then `config_path` if it exists, then environment overrides.
pub fn load_settings(config_path: &Path) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(config_path) {
        apply_file(&mut settings, &raw);
    }
    apply_env(&mut settings, |key| std::env::var(key).ok());

    settings
}

fn apply_file(settings: &mut Settings, raw: &str) {
    let Ok(file_cfg) = toml::from_str::<HashMap<String, toml::Value>>(raw) else {
        tracing::warn!("config: ignoring unreadable settings file");
        return;
    };
    let value = |key: &str| {
        file_cfg.get(key).and_then(|value| match value {
            toml::Value::String(text) => Some(text.clone()),
            toml::Value::Integer(number) => Some(number.to_string()),
            _ => None,
        })
    };

    if let Some(v) = value("server_url") {
        settings.server_url = v;
    }
    if let Some(v) = value("login_timeout_secs").and_then(|v| parse_timeout(&v)) {
        settings.login_timeout = v;
    }
    if let Some(v) = value("analyze_timeout_secs").and_then(|v| parse_timeout(&v)) {
        settings.analyze_timeout = v;
    }
    if let Some(v) = value("history_timeout_secs").and_then(|v| parse_timeout(&v)) {
        settings.history_timeout = v;
    }
    if let Some(v) = value("history_retries").and_then(|v| v.parse().ok()) {
        settings.history_retries = v;
    }
}

fn apply_env(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("REVIEWER_SERVER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = lookup("APP__SERVER_URL") {
        settings.server_url = v;
    }

    if let Some(v) = lookup("APP__LOGIN_TIMEOUT_SECS").and_then(|v| parse_timeout(&v)) {
        settings.login_timeout = v;
    }
    if let Some(v) = lookup("APP__ANALYZE_TIMEOUT_SECS").and_then(|v| parse_timeout(&v)) {
        settings.analyze_timeout = v;
    }
    if let Some(v) = lookup("APP__HISTORY_TIMEOUT_SECS").and_then(|v| parse_timeout(&v)) {
        settings.history_timeout = v;
    }
    if let Some(v) = lookup("APP__HISTORY_RETRIES").and_then(|v| v.parse().ok()) {
        settings.history_retries = v;
    }
}

/// `"none"` or `"0"` means wait indefinitely. Unparseable values are ignored.
fn parse_timeout(raw: &str) -> Option<Option<Duration>> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("none") {
        return Some(None);
    }
    match raw.parse::<u64>() {
        Ok(0) => Some(None),
        Ok(secs) => Some(Some(Duration::from_secs(secs))),
        Err(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_wait_forever_except_history() {
        let settings = Settings::default();
        assert_eq!(settings.server_url, "http://localhost:8000");
        assert_eq!(settings.login_timeout, None);
        assert_eq!(settings.analyze_timeout, None);
        assert_eq!(settings.history_timeout, Some(Duration::from_secs(10)));
        assert_eq!(settings.history_retries, 1);
    }

    #[test]
    fn file_values_accept_strings_and_integers() {
        let mut settings = Settings::default();
        apply_file(
            &mut settings,
            r#"
server_url = "https://reviewer.example.edu"
analyze_timeout_secs = 120
history_timeout_secs = "none"
history_retries = 3
"#,
        );

        assert_eq!(settings.server_url, "https://reviewer.example.edu");
        assert_eq!(settings.analyze_timeout, Some(Duration::from_secs(120)));
        assert_eq!(settings.history_timeout, None);
        assert_eq!(settings.history_retries, 3);
    }

    #[test]
    fn unreadable_file_leaves_defaults() {
        let mut settings = Settings::default();
        apply_file(&mut settings, "server_url = [unterminated");
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn app_prefixed_env_wins_over_plain_env() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("REVIEWER_SERVER_URL", "http://plain:8000"),
            ("APP__SERVER_URL", "http://prefixed:8000"),
            ("APP__LOGIN_TIMEOUT_SECS", "15"),
            ("APP__HISTORY_RETRIES", "not-a-number"),
        ]);
        let mut settings = Settings::default();
        apply_env(&mut settings, |key| env.get(key).map(|v| v.to_string()));

        assert_eq!(settings.server_url, "http://prefixed:8000");
        assert_eq!(settings.login_timeout, Some(Duration::from_secs(15)));
        assert_eq!(settings.history_retries, 1);
    }

    #[test]
    fn zero_timeout_means_no_timeout() {
        assert_eq!(parse_timeout("0"), Some(None));
        assert_eq!(parse_timeout(" 30 "), Some(Some(Duration::from_secs(30))));
        assert_eq!(parse_timeout("soon"), None);
    }

    #[test]
    fn settings_translate_into_call_policy() {
        let settings = Settings {
            analyze_timeout: Some(Duration::from_secs(300)),
            ..Settings::default()
        };
        let policy = settings.call_policy();
        assert_eq!(policy.analyze_timeout, Some(Duration::from_secs(300)));
        assert_eq!(policy.history_retries, 1);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let settings = load_settings(Path::new("/nonexistent/reviewer.toml"));
        assert!(!settings.server_url.is_empty());
    }
}

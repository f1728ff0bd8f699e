use crate::ai::KeywordRule;
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_RESPONSE_DELAY_MS: u64 = 1500;

pub const DEFAULT_FALLBACK_REPLY: &str = "That's an interesting question! Based on my experience, I'd approach this by first understanding the core challenge you're facing. Could you provide more context so I can give you a more targeted response?";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read rules file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse rules file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("fallback reply must not be empty")]
    EmptyFallback,
    #[error("rule for keyword {keyword:?} has an empty reply")]
    EmptyReply { keyword: String },
}

/// Everything a chat session needs: the rule table, the fallback and the fake latency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub rules: Vec<KeywordRule>,
    pub fallback_reply: String,
    pub response_delay_ms: u64,
}

impl SessionConfig {
    pub fn new(
        rules: Vec<KeywordRule>,
        fallback_reply: impl Into<String>,
        response_delay_ms: u64,
    ) -> Self {
        Self {
            rules,
            fallback_reply: fallback_reply.into(),
            response_delay_ms,
        }
    }

    pub fn response_delay(&self) -> Duration {
        Duration::from_millis(self.response_delay_ms)
    }

    /// Replaces the rule table (and the fallback, if the file has one) with a JSON rules file.
    ///
    /// Expected shape: `{"rules": [{"keyword": "...", "reply": "..."}], "fallback_reply": "..."}`.
    pub fn with_rules_file(mut self, path: &Path) -> Result<Self, ConfigError> {
        #[derive(Deserialize)]
        struct RulesFile {
            rules: Vec<KeywordRule>,
            #[serde(default)]
            fallback_reply: Option<String>,
        }

        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let file: RulesFile = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        self.rules = file.rules;
        if let Some(fallback) = file.fallback_reply {
            self.fallback_reply = fallback;
        }
        self.validate()?;

        log::info!("📁 Loaded {} keyword rules from {}", self.rules.len(), path.display());
        Ok(self)
    }

    /// Every reply the session can produce must be non-empty text.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fallback_reply.trim().is_empty() {
            return Err(ConfigError::EmptyFallback);
        }

        for rule in &self.rules {
            if rule.reply().trim().is_empty() {
                return Err(ConfigError::EmptyReply {
                    keyword: rule.keyword().to_string(),
                });
            }
            if rule.keyword().is_empty() {
                log::warn!("⚠️ Empty keyword matches every input and shadows all later rules");
            }
        }

        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new(
            default_rules(),
            DEFAULT_FALLBACK_REPLY,
            DEFAULT_RESPONSE_DELAY_MS,
        )
    }
}

/// The coaching replies the dashboard ships with. Order matters: first match wins.
pub fn default_rules() -> Vec<KeywordRule> {
    vec![
        KeywordRule::new(
            "business strategy",
            "Based on my experience scaling companies, I recommend focusing on these three pillars: 1) Clear value proposition, 2) Strong customer feedback loop, 3) Scalable operations. Let me break each down for you...",
        ),
        KeywordRule::new(
            "marketing",
            "Effective marketing starts with understanding your ideal customer deeply. I've found that the 80/20 rule applies here - 80% of your results come from 20% of your channels. Focus on mastering one channel first...",
        ),
        KeywordRule::new(
            "leadership",
            "Great leadership isn't about having all the answers - it's about asking the right questions and empowering your team. In my coaching practice, I've seen that vulnerability and authenticity create stronger teams...",
        ),
        KeywordRule::new(
            "revenue",
            "To increase revenue, look at these levers: 1) Increase customer lifetime value, 2) Reduce churn, 3) Optimize pricing strategy. From my consulting work, I've seen 30-40% revenue increases just from pricing optimization...",
        ),
    ]
}

/// Suggestion shown on an empty transcript: button label and the text it fills in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StarterPrompt {
    pub label: String,
    pub prompt: String,
}

impl StarterPrompt {
    fn new(label: &str, prompt: &str) -> Self {
        Self {
            label: label.to_string(),
            prompt: prompt.to_string(),
        }
    }
}

pub fn default_starter_prompts() -> Vec<StarterPrompt> {
    vec![
        StarterPrompt::new("Business strategy", "How do I scale my business?"),
        StarterPrompt::new("Marketing tips", "What's the best marketing approach?"),
        StarterPrompt::new("Leadership advice", "How can I be a better leader?"),
        StarterPrompt::new("Revenue growth", "How to increase revenue?"),
    ]
}

#[derive(Debug, Clone)]
pub struct Config {
    pub coach_name: String,
    pub window_width: f32,
    pub window_height: f32,
    pub session: SessionConfig,
    pub starter_prompts: Vec<StarterPrompt>,
}

impl Config {
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let coach_name = lookup("COACH_NAME")
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| "AI Coach".to_string());

        let response_delay_ms = lookup("COACH_RESPONSE_DELAY_MS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_RESPONSE_DELAY_MS);

        let mut session = SessionConfig {
            response_delay_ms,
            ..SessionConfig::default()
        };

        if let Some(path) = lookup("COACH_RULES_PATH").filter(|p| !p.trim().is_empty()) {
            match session.clone().with_rules_file(Path::new(&path)) {
                Ok(loaded) => session = loaded,
                Err(e) => log::warn!("⚠️ Keeping built-in rules: {}", e),
            }
        }

        if let Some(fallback) = lookup("COACH_FALLBACK_REPLY").filter(|f| !f.trim().is_empty()) {
            session.fallback_reply = fallback;
        }

        Self {
            coach_name,
            window_width: 720.0,
            window_height: 640.0,
            session,
            starter_prompts: default_starter_prompts(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn config_from(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    fn rules_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults_without_environment() {
        let config = config_from(&[]);
        assert_eq!(config.coach_name, "AI Coach");
        assert_eq!(config.session.response_delay_ms, DEFAULT_RESPONSE_DELAY_MS);
        assert_eq!(config.session.fallback_reply, DEFAULT_FALLBACK_REPLY);
        let keywords: Vec<&str> = config.session.rules.iter().map(|r| r.keyword()).collect();
        assert_eq!(keywords, ["business strategy", "marketing", "leadership", "revenue"]);
        assert_eq!(config.starter_prompts.len(), 4);
    }

    #[test]
    fn environment_overrides() {
        let config = config_from(&[
            ("COACH_NAME", "Sam"),
            ("COACH_RESPONSE_DELAY_MS", "0"),
            ("COACH_FALLBACK_REPLY", "Tell me more."),
        ]);
        assert_eq!(config.coach_name, "Sam");
        assert_eq!(config.session.response_delay_ms, 0);
        assert_eq!(config.session.fallback_reply, "Tell me more.");
    }

    #[test]
    fn unparsable_delay_keeps_default() {
        let config = config_from(&[("COACH_RESPONSE_DELAY_MS", "soon")]);
        assert_eq!(config.session.response_delay_ms, DEFAULT_RESPONSE_DELAY_MS);
    }

    #[test]
    fn rules_file_replaces_table() {
        let file = rules_file(
            r#"{"rules": [{"keyword": "Hiring", "reply": "Hire slow."}], "fallback_reply": "Go on."}"#,
        );
        let session = SessionConfig::default().with_rules_file(file.path()).unwrap();
        assert_eq!(session.rules, vec![KeywordRule::new("hiring", "Hire slow.")]);
        assert_eq!(session.fallback_reply, "Go on.");
        assert_eq!(session.response_delay_ms, DEFAULT_RESPONSE_DELAY_MS);
    }

    #[test]
    fn rules_file_without_fallback_keeps_current_one() {
        let file = rules_file(r#"{"rules": []}"#);
        let session = SessionConfig::default().with_rules_file(file.path()).unwrap();
        assert!(session.rules.is_empty());
        assert_eq!(session.fallback_reply, DEFAULT_FALLBACK_REPLY);
    }

    #[test]
    fn bad_rules_file_is_reported_and_ignored_by_config() {
        let file = rules_file("not json");
        let err = SessionConfig::default().with_rules_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));

        let path = file.path().to_string_lossy().into_owned();
        let config = config_from(&[("COACH_RULES_PATH", path.as_str())]);
        assert_eq!(config.session.rules, default_rules());
    }

    #[test]
    fn missing_rules_file_is_a_read_error() {
        let err = SessionConfig::default()
            .with_rules_file(Path::new("/definitely/not/here.json"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn validate_rejects_empty_replies() {
        let empty_fallback = SessionConfig::new(vec![], "  ", 0);
        assert!(matches!(empty_fallback.validate(), Err(ConfigError::EmptyFallback)));

        let empty_reply = SessionConfig::new(vec![KeywordRule::new("x", "")], "ok", 0);
        assert!(matches!(
            empty_reply.validate(),
            Err(ConfigError::EmptyReply { keyword }) if keyword == "x"
        ));
    }
}

//! Environment configuration

use crate::runtime::SessionSettings;
use crate::voice::SpeechEngine;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 8001;
pub const DEFAULT_ANSWER_URL: &str = "http://localhost:8000/ask";
pub const DEFAULT_LANGUAGE: &str = "en-US";
const DEFAULT_ANSWER_TIMEOUT_SECS: u64 = 60;
const DEFAULT_STT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{var}={value:?} is invalid: expected {expected}")]
    Invalid {
        var: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// Which text-to-speech engine to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechEngineChoice {
    /// Use the first engine found on `PATH`
    Auto,
    Engine(SpeechEngine),
    Disabled,
}

impl SpeechEngineChoice {
    /// Resolve to a concrete engine, probing `PATH` for `Auto`
    pub fn resolve(self) -> Option<SpeechEngine> {
        match self {
            SpeechEngineChoice::Auto => SpeechEngine::detect(),
            SpeechEngineChoice::Engine(engine) => Some(engine),
            SpeechEngineChoice::Disabled => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistantConfig {
    pub port: u16,
    pub answer_url: String,
    pub answer_timeout: Duration,
    /// Locale for recognition and voice selection
    pub language: String,
    pub tts_engine: SpeechEngineChoice,
    /// Recognition command line, split with shell quoting rules; `{lang}`
    /// expands to `language`
    pub stt_command: Option<String>,
    pub stt_timeout: Duration,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            answer_url: DEFAULT_ANSWER_URL.to_string(),
            answer_timeout: Duration::from_secs(DEFAULT_ANSWER_TIMEOUT_SECS),
            language: DEFAULT_LANGUAGE.to_string(),
            tts_engine: SpeechEngineChoice::Auto,
            stt_command: None,
            stt_timeout: Duration::from_secs(DEFAULT_STT_TIMEOUT_SECS),
        }
    }
}

impl AssistantConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let port = match get("ASSISTANT_PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .ok()
                .filter(|p| *p != 0)
                .ok_or_else(|| invalid("ASSISTANT_PORT", &raw, "a port number between 1 and 65535"))?,
            None => defaults.port,
        };

        let answer_url = match get("ASSISTANT_ANSWER_URL") {
            Some(raw) => {
                let url = raw.trim();
                match reqwest::Url::parse(url) {
                    Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => url.to_string(),
                    _ => return Err(invalid("ASSISTANT_ANSWER_URL", &raw, "an http(s) URL")),
                }
            }
            None => defaults.answer_url,
        };

        let language = match get("ASSISTANT_LANGUAGE") {
            Some(raw) => {
                let tag = raw.trim();
                if tag
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
                {
                    tag.to_string()
                } else {
                    return Err(invalid("ASSISTANT_LANGUAGE", &raw, "a locale tag like en-US"));
                }
            }
            None => defaults.language,
        };

        let tts_engine = match get("ASSISTANT_TTS_ENGINE") {
            Some(raw) if raw.trim().eq_ignore_ascii_case("none") => SpeechEngineChoice::Disabled,
            Some(raw) => SpeechEngine::from_name(&raw)
                .map(SpeechEngineChoice::Engine)
                .ok_or_else(|| invalid("ASSISTANT_TTS_ENGINE", &raw, "espeak-ng, say or none"))?,
            None => defaults.tts_engine,
        };

        Ok(Self {
            port,
            answer_url,
            answer_timeout: secs(
                get("ASSISTANT_ANSWER_TIMEOUT_SECS"),
                "ASSISTANT_ANSWER_TIMEOUT_SECS",
                defaults.answer_timeout,
            )?,
            language,
            tts_engine,
            stt_command: get("ASSISTANT_STT_COMMAND").map(|c| c.trim().to_string()),
            stt_timeout: secs(
                get("ASSISTANT_STT_TIMEOUT_SECS"),
                "ASSISTANT_STT_TIMEOUT_SECS",
                defaults.stt_timeout,
            )?,
        })
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            answer_timeout: self.answer_timeout,
            language: self.language.clone(),
        }
    }
}

fn invalid(var: &'static str, value: &str, expected: &'static str) -> ConfigError {
    ConfigError::Invalid {
        var,
        value: value.to_string(),
        expected,
    }
}

fn secs(raw: Option<String>, var: &'static str, default: Duration) -> Result<Duration, ConfigError> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    raw.trim()
        .parse::<u64>()
        .ok()
        .filter(|s| *s > 0)
        .map(Duration::from_secs)
        .ok_or_else(|| invalid(var, &raw, "a positive number of seconds"))
}

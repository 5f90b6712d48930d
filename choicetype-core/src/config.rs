//! Tunable timings with serde defaults.
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::constants::{ACTIVITY_DURATION_SECS, DEFAULT_ALBUM, QUESTION_SECS, SETTLE_MS};

/// Errors raised when configuration values are unusable.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },
    #[error("album name must not be empty")]
    EmptyAlbum,
}

/// Per-question countdown and post-pick pause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizConfig {
    #[serde(default = "QuizConfig::default_question_secs")]
    pub question_secs: u32,
    #[serde(default = "QuizConfig::default_settle_ms")]
    pub settle_ms: u64,
}

impl QuizConfig {
    const fn default_question_secs() -> u32 {
        QUESTION_SECS
    }

    const fn default_settle_ms() -> u64 {
        SETTLE_MS
    }

    #[must_use]
    pub fn question_duration(&self) -> Duration {
        Duration::from_secs(u64::from(self.question_secs))
    }

    #[must_use]
    pub const fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    /// # Errors
    ///
    /// Returns an error if the question countdown is zero.
    pub const fn validate(&self) -> Result<(), ConfigError> {
        if self.question_secs == 0 {
            return Err(ConfigError::Zero {
                field: "quiz.question_secs",
            });
        }
        Ok(())
    }
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            question_secs: Self::default_question_secs(),
            settle_ms: Self::default_settle_ms(),
        }
    }
}

/// Activity timer length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityConfig {
    #[serde(default = "ActivityConfig::default_duration_secs")]
    pub duration_secs: u32,
}

impl ActivityConfig {
    const fn default_duration_secs() -> u32 {
        ACTIVITY_DURATION_SECS
    }

    /// # Errors
    ///
    /// Returns an error if the duration is zero.
    pub const fn validate(&self) -> Result<(), ConfigError> {
        if self.duration_secs == 0 {
            return Err(ConfigError::Zero {
                field: "activity.duration_secs",
            });
        }
        Ok(())
    }
}

impl Default for ActivityConfig {
    fn default() -> Self {
        Self {
            duration_secs: Self::default_duration_secs(),
        }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub quiz: QuizConfig,
    #[serde(default)]
    pub activity: ActivityConfig,
    /// Gallery album exported wallpapers are saved into
    #[serde(default = "AppConfig::default_album")]
    pub album: String,
}

impl AppConfig {
    fn default_album() -> String {
        DEFAULT_ALBUM.to_string()
    }

    /// Parse configuration from JSON; missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// # Errors
    ///
    /// Returns the first invalid field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.quiz.validate()?;
        self.activity.validate()?;
        if self.album.trim().is_empty() {
            return Err(ConfigError::EmptyAlbum);
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            quiz: QuizConfig::default(),
            activity: ActivityConfig::default(),
            album: Self::default_album(),
        }
    }
}

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::transport::{DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL};

/// Main configuration structure for the quiz generator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub gemini: GeminiConfig,
    pub redis: RedisConfig,
    pub quiz: QuizConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout_seconds: u64,
}

impl GeminiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
    pub database: u8,
    /// Prefix for every key the app writes
    pub namespace: String,
    pub pool: PoolConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    pub max_size: usize,
    pub timeout_seconds: u64,
    pub create_timeout_seconds: u64,
    pub recycle_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizConfig {
    pub max_topic_length: usize,
    pub default_question_count: String,
    pub question_counts: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Redis,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

const PLACEHOLDER_API_KEY: &str = "PLACEHOLDER_GEMINI_API_KEY";

impl Config {
    /// Load configuration from file with environment variable overrides
    /// ALWAYS returns a valid config - never fails
    pub fn load() -> Self {
        let env_paths = ["../.env", ".env"];

        let mut env_loaded = false;
        for path in &env_paths {
            if dotenvy::from_path(path).is_ok() {
                tracing::info!("Loaded .env from: {}", path);
                env_loaded = true;
                break;
            }
        }

        if !env_loaded {
            tracing::debug!("No .env file found - continuing with env vars only");
        }

        let config_path =
            env::var("QUIZ_CONFIG_PATH").unwrap_or_else(|_| "config.yaml".to_string());

        let mut config = Self::from_file(Path::new(&config_path));

        config.apply_env_overrides();

        if let Err(e) = config.validate() {
            tracing::warn!("Config validation warnings: {} - continuing anyway", e);
        }

        config
    }

    pub(crate) fn from_file(path: &Path) -> Self {
        if !path.exists() {
            tracing::debug!("Config file not found at {} - using defaults", path.display());
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(contents) => match serde_yaml::from_str::<Config>(&contents) {
                Ok(config) => {
                    tracing::info!("Loaded configuration from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::error!(
                        "Failed to parse config file {}: {} - using defaults",
                        path.display(),
                        e
                    );
                    Self::default()
                }
            },
            Err(e) => {
                tracing::error!(
                    "Failed to read config file {}: {} - using defaults",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // Gemini overrides
        if let Ok(api_key) = env::var("GEMINI_API_KEY") {
            self.gemini.api_key = api_key;
        }
        if let Ok(base_url) = env::var("GEMINI_BASE_URL") {
            self.gemini.base_url = base_url;
        }
        if let Ok(model) = env::var("GEMINI_MODEL") {
            self.gemini.model = model;
        }
        if let Ok(timeout) = env::var("GEMINI_TIMEOUT_SECONDS") {
            if let Ok(secs) = timeout.parse() {
                self.gemini.timeout_seconds = secs;
            }
        }

        // Redis overrides
        if let Ok(host) = env::var("REDIS_HOST") {
            self.redis.host = host;
        }
        if let Ok(port) = env::var("REDIS_PORT") {
            if let Ok(port_num) = port.parse() {
                self.redis.port = port_num;
            }
        }
        if let Ok(db) = env::var("REDIS_DB") {
            if let Ok(db_num) = db.parse() {
                self.redis.database = db_num;
            }
        }
        if let Ok(namespace) = env::var("QUIZ_REDIS_NAMESPACE") {
            self.redis.namespace = namespace;
        }

        // Storage overrides
        if let Ok(backend) = env::var("QUIZ_STORAGE") {
            match backend.to_lowercase().as_str() {
                "redis" => self.storage.backend = StorageBackend::Redis,
                "memory" => self.storage.backend = StorageBackend::Memory,
                other => tracing::warn!("Unknown QUIZ_STORAGE '{}', keeping configured", other),
            }
        }

        if let Ok(level) = env::var("QUIZ_LOG_LEVEL") {
            self.logging.level = level;
        }
    }

    /// Validate configuration
    fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        if self.gemini.api_key == PLACEHOLDER_API_KEY || self.gemini.api_key.is_empty() {
            return Err("GEMINI_API_KEY environment variable must be set".into());
        }
        if self.gemini.timeout_seconds == 0 {
            return Err("Gemini timeout cannot be 0".into());
        }
        if self.redis.port == 0 {
            return Err("Redis port cannot be 0".into());
        }
        if self.quiz.max_topic_length == 0 {
            return Err("quiz.max_topic_length cannot be 0".into());
        }
        if !self
            .quiz
            .question_counts
            .contains(&self.quiz.default_question_count)
        {
            return Err(format!(
                "quiz.default_question_count '{}' is not one of quiz.question_counts",
                self.quiz.default_question_count
            )
            .into());
        }

        Ok(())
    }

    /// Whether a usable Gemini key is configured
    pub fn has_api_key(&self) -> bool {
        !self.gemini.api_key.is_empty() && self.gemini.api_key != PLACEHOLDER_API_KEY
    }

    /// Get Redis URL with password from environment
    pub fn get_redis_url(&self) -> String {
        let password = env::var("REDIS_PASSWORD")
            .or_else(|_| env::var("REDIS_PASS"))
            .unwrap_or_default();

        if password.is_empty() {
            format!(
                "redis://{}:{}/{}",
                self.redis.host, self.redis.port, self.redis.database
            )
        } else {
            format!(
                "redis://:{}@{}:{}/{}",
                password, self.redis.host, self.redis.port, self.redis.database
            )
        }
    }

    pub fn get_pool_timeout(&self) -> Duration {
        Duration::from_secs(self.redis.pool.timeout_seconds)
    }

    pub fn get_pool_create_timeout(&self) -> Duration {
        Duration::from_secs(self.redis.pool.create_timeout_seconds)
    }

    pub fn get_pool_recycle_timeout(&self) -> Duration {
        Duration::from_secs(self.redis.pool.recycle_timeout_seconds)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gemini: GeminiConfig {
                api_key: PLACEHOLDER_API_KEY.to_string(),
                base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
                model: DEFAULT_GEMINI_MODEL.to_string(),
                timeout_seconds: 60,
            },
            redis: RedisConfig {
                host: "localhost".to_string(),
                port: 6379,
                database: 0,
                namespace: "quizgen".to_string(),
                pool: PoolConfig {
                    max_size: 8,
                    timeout_seconds: 5,
                    create_timeout_seconds: 5,
                    recycle_timeout_seconds: 5,
                },
            },
            quiz: QuizConfig {
                max_topic_length: 250,
                default_question_count: "5".to_string(),
                question_counts: ["5", "10", "15", "20"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            },
            storage: StorageConfig {
                backend: StorageBackend::Redis,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }
}

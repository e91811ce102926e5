use std::sync::Arc;

use crate::config::{Config, StorageBackend};
use crate::error::Result;
use crate::generator::QuizGenerator;
use crate::library::Library;
use crate::memory::MemoryStore;
use crate::models::{Difficulty, Question, QuestionType, Quiz, QuizRequest};
use crate::redis::RedisManager;
use crate::repository::RedisRepository;
use crate::repository_traits::Repository;
use crate::session::QuizSession;
use crate::settings::{AppSettings, SettingsStore, SystemDefaults};
use crate::transport::{GeminiTransport, Transport};

/// Storage handles for every persisted kind, backed by one store
#[derive(Clone)]
pub struct Stores {
    pub questions: Arc<dyn Repository<Question>>,
    pub quizzes: Arc<dyn Repository<Quiz>>,
    pub settings: Arc<dyn SettingsStore>,
}

impl Stores {
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: Repository<Question> + Repository<Quiz> + SettingsStore + 'static,
    {
        Self {
            questions: store.clone(),
            quizzes: store.clone(),
            settings: store,
        }
    }

    pub async fn from_config(config: &Config) -> Result<Self> {
        match config.storage.backend {
            StorageBackend::Redis => {
                let manager = Arc::new(RedisManager::new_with_config(config).await?);
                let repo = RedisRepository::new(manager, config.redis.namespace.clone());
                Ok(Self::from_store(Arc::new(repo)))
            }
            StorageBackend::Memory => {
                tracing::info!("Using in-memory storage; nothing survives this process");
                Ok(Self::from_store(Arc::new(MemoryStore::new())))
            }
        }
    }
}

/// Everything the front end talks to, wired from one `Config`
pub struct App {
    pub config: Config,
    pub settings: AppSettings,
    pub questions: Library<Question>,
    pub quizzes: Library<Quiz>,
    generator: Arc<QuizGenerator>,
    stores: Stores,
}

impl App {
    pub async fn assemble(config: Config) -> Result<Self> {
        let stores = Stores::from_config(&config).await?;
        let transport = Arc::new(GeminiTransport::from_config(&config.gemini)?);
        tracing::info!("Gemini endpoint: {}", transport.endpoint());
        Self::with_parts(config, stores, transport, &SystemDefaults::from_env()).await
    }

    pub async fn with_parts(
        config: Config,
        stores: Stores,
        transport: Arc<dyn Transport>,
        defaults: &SystemDefaults,
    ) -> Result<Self> {
        let settings = AppSettings::load(Arc::clone(&stores.settings), defaults).await?;
        let generator = Arc::new(QuizGenerator::new(
            transport,
            config.gemini.api_key.clone(),
        ));

        Ok(Self {
            questions: Library::new(Arc::clone(&stores.questions)),
            quizzes: Library::new(Arc::clone(&stores.quizzes)),
            settings,
            generator,
            stores,
            config,
        })
    }

    /// Validated request; a missing count falls back to the configured default
    pub fn request(
        &self,
        topic: &str,
        difficulty: Difficulty,
        question_type: QuestionType,
        language: &str,
        count: Option<&str>,
    ) -> Result<QuizRequest> {
        let count = count.unwrap_or(&self.config.quiz.default_question_count);
        if !self.config.quiz.question_counts.iter().any(|c| c == count) {
            tracing::warn!(
                "Question count {} is not one of the offered counts {:?}",
                count,
                self.config.quiz.question_counts
            );
        }
        QuizRequest::new(
            topic,
            difficulty,
            question_type,
            language,
            count,
            self.config.quiz.max_topic_length,
        )
    }

    pub fn new_session(&self, request: QuizRequest) -> QuizSession {
        QuizSession::new(
            request,
            Arc::clone(&self.generator),
            Arc::clone(&self.stores.questions),
            Arc::clone(&self.stores.quizzes),
        )
    }
}

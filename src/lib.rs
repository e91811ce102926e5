pub mod app;
pub mod config;
pub mod error;
pub mod extract;
pub mod generator;
pub mod library;
pub mod logging;
pub mod memory;
pub mod models;
pub mod parser;
pub mod prompt;
pub mod redis;
pub mod repository;
pub mod repository_traits;
pub mod session;
pub mod settings;
pub mod transport;

pub use crate::app::{App, Stores};
pub use crate::config::Config;
pub use crate::error::{QuizGeneratorError, Result};
pub use crate::generator::QuizGenerator;
pub use crate::models::{
    Difficulty, FailureKind, GenerationResult, Question, QuestionType, Quiz, QuizRequest,
    SortingOption,
};
pub use crate::session::{QuizSession, SessionHandle, SessionState};

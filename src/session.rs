use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use crate::error::{QuizGeneratorError, Result};
use crate::generator::QuizGenerator;
use crate::models::{GenerationResult, Question, Quiz, QuizRequest};
use crate::repository_traits::Repository;

/// What the rendering layer shows for a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Loading,
    Error {
        message: String,
    },
    Ready {
        total: usize,
    },
    InProgress {
        index: usize,
        total: usize,
        selected: Option<String>,
        revealed: bool,
        correct: usize,
    },
    Completed {
        correct: usize,
        total: usize,
    },
}

impl SessionState {
    /// Percentage of correct answers once completed
    pub fn score_percent(&self) -> Option<u32> {
        match self {
            SessionState::Completed { correct, total } if *total > 0 => {
                Some((*correct * 100 / *total) as u32)
            }
            _ => None,
        }
    }
}

/// One quiz-taking flow: generation, answering, favourites and saving
pub struct QuizSession {
    id: Uuid,
    request: QuizRequest,
    generator: Arc<QuizGenerator>,
    questions_repo: Arc<dyn Repository<Question>>,
    quiz_repo: Arc<dyn Repository<Quiz>>,
    state: watch::Sender<SessionState>,
    questions: Vec<Question>,
    answers: Vec<Option<String>>,
    // index -> the stored record, so unfavouriting deletes exactly what was inserted
    favourites: HashMap<usize, Question>,
    saved_quiz: Option<Quiz>,
}

impl QuizSession {
    pub fn new(
        request: QuizRequest,
        generator: Arc<QuizGenerator>,
        questions_repo: Arc<dyn Repository<Question>>,
        quiz_repo: Arc<dyn Repository<Quiz>>,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::Loading);
        Self {
            id: Uuid::new_v4(),
            request,
            generator,
            questions_repo,
            quiz_repo,
            state,
            questions: Vec::new(),
            answers: Vec::new(),
            favourites: HashMap::new(),
            saved_quiz: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn request(&self) -> &QuizRequest {
        &self.request
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// Selection recorded for each answered question
    pub fn answers(&self) -> &[Option<String>] {
        &self.answers
    }

    pub fn current_question(&self) -> Option<&Question> {
        match &*self.state.borrow() {
            SessionState::Ready { .. } => self.questions.first(),
            SessionState::InProgress { index, .. } => self.questions.get(*index),
            _ => None,
        }
    }

    /// Runs the generation pipeline and moves out of `Loading`.
    ///
    /// Dropping the returned future before it finishes leaves the session untouched.
    pub async fn load(&mut self) {
        let generator = Arc::clone(&self.generator);
        let result = generator
            .generate(&self.request)
            .instrument(info_span!("session", id = %self.id))
            .await;
        self.apply_result(result);
    }

    /// Moves a `Loading` session to `Ready` or `Error`
    pub fn apply_result(&mut self, result: GenerationResult) {
        if *self.state.borrow() != SessionState::Loading {
            warn!(session = %self.id, "Ignoring generation result outside of loading");
            return;
        }

        let next = match result {
            GenerationResult::Success { questions } if !questions.is_empty() => {
                let total = questions.len();
                self.answers = vec![None; total];
                self.questions = questions;
                SessionState::Ready { total }
            }
            GenerationResult::Success { .. } => SessionState::Error {
                message: "No questions were generated.".to_string(),
            },
            failure => SessionState::Error {
                message: failure
                    .user_message()
                    .unwrap_or_else(|| "An unknown error occurred.".to_string()),
            },
        };
        info!(session = %self.id, "Session loaded: {:?}", next);
        self.state.send_replace(next);
    }

    /// Ready -> first question
    pub fn begin(&mut self) -> Result<()> {
        let SessionState::Ready { total } = self.state() else {
            return Err(self.invalid("begin"));
        };
        self.state.send_replace(SessionState::InProgress {
            index: 0,
            total,
            selected: None,
            revealed: false,
            correct: 0,
        });
        Ok(())
    }

    /// Choose an answer for the current question; may be changed until revealed
    pub fn select_answer(&mut self, answer: &str) -> Result<()> {
        let SessionState::InProgress {
            index,
            total,
            revealed: false,
            correct,
            ..
        } = self.state()
        else {
            return Err(self.invalid("select an answer"));
        };
        let question = &self.questions[index];
        if !question.choices.iter().any(|c| c == answer) {
            return Err(QuizGeneratorError::Validation(format!(
                "'{answer}' is not one of the choices"
            )));
        }
        self.state.send_replace(SessionState::InProgress {
            index,
            total,
            selected: Some(answer.to_string()),
            revealed: false,
            correct,
        });
        Ok(())
    }

    /// Show whether the selection was right. Needs a selection.
    pub fn reveal(&mut self) -> Result<()> {
        let SessionState::InProgress {
            index,
            total,
            selected: Some(selected),
            revealed: false,
            correct,
        } = self.state()
        else {
            return Err(self.invalid("reveal"));
        };
        self.state.send_replace(SessionState::InProgress {
            index,
            total,
            selected: Some(selected),
            revealed: true,
            correct,
        });
        Ok(())
    }

    /// Score the revealed question and move on, completing after the last one
    pub fn advance(&mut self) -> Result<()> {
        let SessionState::InProgress {
            index,
            total,
            selected: Some(selected),
            revealed: true,
            correct,
        } = self.state()
        else {
            return Err(self.invalid("advance"));
        };

        let correct = if self.questions[index].is_correct(&selected) {
            correct + 1
        } else {
            correct
        };
        self.answers[index] = Some(selected);

        let next = if index + 1 < total {
            SessionState::InProgress {
                index: index + 1,
                total,
                selected: None,
                revealed: false,
                correct,
            }
        } else {
            info!(session = %self.id, "Quiz completed: {}/{}", correct, total);
            SessionState::Completed { correct, total }
        };
        self.state.send_replace(next);
        Ok(())
    }

    /// Single-button flow: reveal first, advance on the second press
    pub fn next(&mut self) -> Result<()> {
        match self.state() {
            SessionState::InProgress { revealed: false, .. } => self.reveal(),
            SessionState::InProgress { revealed: true, .. } => self.advance(),
            _ => Err(self.invalid("go to the next question")),
        }
    }

    pub fn is_favourite(&self, index: usize) -> bool {
        self.favourites.contains_key(&index)
    }

    pub fn favourite_indices(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = self.favourites.keys().copied().collect();
        indices.sort_unstable();
        indices
    }

    /// Store or remove the question at `index`; returns whether it is now a favourite
    pub async fn toggle_favourite(&mut self, index: usize) -> Result<bool> {
        match self.state() {
            SessionState::Ready { .. } | SessionState::InProgress { .. } => {}
            _ => return Err(self.invalid("favourite a question")),
        }
        let Some(question) = self.questions.get(index) else {
            return Err(QuizGeneratorError::Validation(format!(
                "No question at index {index}"
            )));
        };

        if let Some(stored) = self.favourites.get(&index) {
            let removed = self.questions_repo.delete(stored).await?;
            if !removed {
                debug!(session = %self.id, "Favourite {} was already gone from storage", index);
            }
            self.favourites.remove(&index);
            info!(session = %self.id, "Question {} removed from favourites", index + 1);
            Ok(false)
        } else {
            let stored = self.questions_repo.insert(question).await?;
            self.favourites.insert(index, stored);
            info!(session = %self.id, "Question {} added to favourites", index + 1);
            Ok(true)
        }
    }

    /// Persist the finished quiz. Repeated calls return the quiz saved the first time.
    ///
    /// A second call does not insert a second record, even though callers may expect one per call.
    pub async fn save(&mut self) -> Result<Quiz> {
        if !matches!(self.state(), SessionState::Completed { .. }) {
            return Err(self.invalid("save"));
        }
        if let Some(saved) = &self.saved_quiz {
            debug!(session = %self.id, "Quiz already saved as {}", saved.id);
            return Ok(saved.clone());
        }

        let quiz = Quiz::new(self.request.topic.clone(), self.questions.clone());
        let stored = self.quiz_repo.insert(&quiz).await?;
        info!(session = %self.id, "Quiz saved as {}", stored.id);
        self.saved_quiz = Some(stored.clone());
        Ok(stored)
    }

    pub fn is_saved(&self) -> bool {
        self.saved_quiz.is_some()
    }

    /// Run `load` on its own task
    pub fn spawn(self) -> SessionHandle {
        let state = self.subscribe();
        let task = tokio::spawn(async move {
            let mut session = self;
            session.load().await;
            session
        });
        SessionHandle {
            task: Some(task),
            state,
        }
    }

    fn invalid(&self, action: &str) -> QuizGeneratorError {
        QuizGeneratorError::InvalidState(format!(
            "cannot {action} while {:?}",
            self.state.borrow()
        ))
    }
}

/// A session whose generation runs in the background. Dropping it cancels the request.
pub struct SessionHandle {
    task: Option<JoinHandle<QuizSession>>,
    state: watch::Receiver<SessionState>,
}

impl SessionHandle {
    pub fn state(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }

    /// Wait for loading to finish and take the session back
    ///
    /// The task stays owned by the handle while awaited, so dropping this future
    /// still aborts generation.
    pub async fn join(mut self) -> Result<QuizSession> {
        let task = self
            .task
            .as_mut()
            .ok_or_else(|| QuizGeneratorError::Internal("session already taken".to_string()))?;
        let joined = task.await;
        self.task = None;
        joined.map_err(|e| {
            QuizGeneratorError::Internal(format!("session task did not finish: {e}"))
        })
    }

    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!("Session generation cancelled");
        }
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

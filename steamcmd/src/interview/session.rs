//! Ask/answer protocol between the terminal and the application.
//!
//! The session owns one end of two channels: questions flow out to a
//! [`Respondent`] (capacity one), answers flow back in. `ask` does not
//! return until its question is answered, so at most one question is ever
//! in flight and answers pair with questions in issue order.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::debug;
use tokio::sync::{mpsc, watch};

use crate::error::{Result, SessionError};
use crate::installer::RunState;

/// Replacement for sensitive answers in transcripts.
const MASK: &str = "********";

/// A question SteamCMD asked, handed to the application exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    /// Question text.
    pub message: String,

    /// Whether the answer is a secret (password, guard code).
    pub sensitive: bool,
}

impl Question {
    /// Create a new question.
    pub fn new(message: impl Into<String>, sensitive: bool) -> Self {
        Self {
            message: message.into(),
            sensitive,
        }
    }
}

impl fmt::Display for Question {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// A question and the answer given to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    /// The question that was asked.
    pub question: Question,

    /// The answer (masked if the question is sensitive).
    pub answer: String,
}

/// Lifecycle of a session. A closed session never reopens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Questions can be asked.
    Open,

    /// The sentinel fired; channels are closed.
    Closed,
}

impl SessionState {
    fn is_closed(&self) -> bool {
        *self == SessionState::Closed
    }
}

/// One interview: a single-use ask/answer session.
pub struct InterviewSession {
    questions: Mutex<Option<mpsc::Sender<Question>>>,
    answers: tokio::sync::Mutex<Option<mpsc::Receiver<String>>>,
    state: watch::Sender<SessionState>,
    exchanges: Mutex<Vec<Exchange>>,
    run_state: Option<Arc<RunState>>,
}

impl InterviewSession {
    /// Open a session and the respondent that answers it.
    pub fn open() -> (Arc<Self>, Respondent) {
        Self::open_inner(None)
    }

    /// Open a session that returns `run_state` to idle when it closes.
    pub(crate) fn open_for(run_state: Arc<RunState>) -> (Arc<Self>, Respondent) {
        Self::open_inner(Some(run_state))
    }

    fn open_inner(run_state: Option<Arc<RunState>>) -> (Arc<Self>, Respondent) {
        let (question_tx, question_rx) = mpsc::channel(1);
        let (answer_tx, answer_rx) = mpsc::channel(1);
        let (state, _) = watch::channel(SessionState::Open);

        let session = Arc::new(Self {
            questions: Mutex::new(Some(question_tx)),
            answers: tokio::sync::Mutex::new(Some(answer_rx)),
            state,
            exchanges: Mutex::new(Vec::new()),
            run_state,
        });

        let respondent = Respondent {
            questions: question_rx,
            answers: answer_tx,
            pending: false,
        };

        (session, respondent)
    }

    /// Ask a question and wait for its answer.
    ///
    /// An empty `question` is the sentinel: it closes the session and
    /// returns an empty answer immediately. Asking a closed session, or one
    /// whose respondent went away, fails with [`SessionError::Closed`].
    pub async fn ask(&self, question: &str, sensitive: bool) -> Result<String> {
        if question.is_empty() {
            self.close();
            return Ok(String::new());
        }

        let mut closed = self.state.subscribe();
        if closed.borrow().is_closed() {
            return Err(SessionError::Closed.into());
        }

        let sender = lock(&self.questions).clone().ok_or(SessionError::Closed)?;
        let mut answers = self.answers.lock().await;
        let receiver = answers.as_mut().ok_or(SessionError::Closed)?;

        let question = Question::new(question, sensitive);
        debug!("asking {:?} (sensitive: {})", question.message, sensitive);

        let delivered = tokio::select! {
            sent = sender.send(question.clone()) => sent.is_ok(),
            _ = closed.wait_for(SessionState::is_closed) => false,
        };
        drop(sender);

        let received = if delivered {
            tokio::select! {
                answer = receiver.recv() => answer,
                _ = closed.wait_for(SessionState::is_closed) => None,
            }
        } else {
            None
        };

        let Some(answer) = received else {
            answers.take();
            return Err(SessionError::Closed.into());
        };

        let recorded = if sensitive { MASK.to_string() } else { answer.clone() };
        debug!("answered {:?} with {:?}", question.message, recorded);
        lock(&self.exchanges).push(Exchange {
            question,
            answer: recorded,
        });

        Ok(answer)
    }

    /// Blocking variant of [`ask`](Self::ask) for the terminal read thread.
    ///
    /// Must not be called from inside an async context.
    pub fn blocking_ask(
        &self,
        runtime: &tokio::runtime::Handle,
        question: &str,
        sensitive: bool,
    ) -> Result<String> {
        runtime.block_on(self.ask(question, sensitive))
    }

    /// Close the session.
    ///
    /// Drops the session's channel ends so the respondent sees the question
    /// feed end and further answers are rejected, then returns the owning
    /// installer to idle. Closing twice is a no-op.
    pub fn close(&self) {
        let previous = self.state.send_replace(SessionState::Closed);

        lock(&self.questions).take();
        if let Ok(mut answers) = self.answers.try_lock() {
            answers.take();
        }

        if previous == SessionState::Open {
            if let Some(run_state) = &self.run_state {
                run_state.finish();
            }
            debug!("interview closed after {} exchange(s)", lock(&self.exchanges).len());
        }
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Check if the session is closed.
    pub fn is_closed(&self) -> bool {
        self.state().is_closed()
    }

    /// Question/answer pairs so far, in the order they were asked.
    pub fn exchanges(&self) -> Vec<Exchange> {
        lock(&self.exchanges).clone()
    }
}

impl fmt::Debug for InterviewSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterviewSession")
            .field("state", &self.state())
            .field("exchanges", &lock(&self.exchanges).len())
            .finish()
    }
}

/// The application's side of a session: receives questions, sends answers.
#[derive(Debug)]
pub struct Respondent {
    questions: mpsc::Receiver<Question>,
    answers: mpsc::Sender<String>,
    pending: bool,
}

impl Respondent {
    /// Wait for the next question. Returns `None` once the session closes.
    pub async fn next_question(&mut self) -> Option<Question> {
        let question = self.questions.recv().await;
        self.pending = question.is_some();
        question
    }

    /// Answer the question most recently received.
    ///
    /// Each question takes exactly one answer. Answering before a question
    /// has been received, or twice, fails with
    /// [`SessionError::NoPendingQuestion`].
    pub async fn answer(&mut self, answer: impl Into<String>) -> Result<()> {
        if !std::mem::take(&mut self.pending) {
            return Err(SessionError::NoPendingQuestion.into());
        }
        self.answers
            .send(answer.into())
            .await
            .map_err(|_| SessionError::Closed.into())
    }

    /// Answer every question with `respond` until the session closes.
    pub async fn answer_all<F>(&mut self, mut respond: F) -> usize
    where
        F: FnMut(&Question) -> String,
    {
        let mut answered = 0;
        while let Some(question) = self.next_question().await {
            if self.answer(respond(&question)).await.is_err() {
                break;
            }
            answered += 1;
        }
        answered
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use tokio_test::{assert_pending, assert_ready, task};

    use super::*;
    use crate::error::Error;

    #[tokio::test]
    async fn test_ask_and_answer() {
        let (session, mut respondent) = InterviewSession::open();

        let asker = {
            let session = Arc::clone(&session);
            tokio::spawn(async move { session.ask("What is your Steam username?", false).await })
        };

        let question = respondent.next_question().await.unwrap();
        assert_eq!(question, Question::new("What is your Steam username?", false));
        respondent.answer("gaben").await.unwrap();

        assert_eq!(asker.await.unwrap().unwrap(), "gaben");
        assert_eq!(session.exchanges().len(), 1);
        assert_eq!(session.exchanges()[0].answer, "gaben");
    }

    #[test]
    fn test_ask_blocks_until_answered() {
        let (session, mut respondent) = InterviewSession::open();

        let mut ask = task::spawn(session.ask("Steam Guard code", true));
        assert_pending!(ask.poll());

        let question = tokio_test::block_on(respondent.next_question()).unwrap();
        assert_eq!(question.message, "Steam Guard code");
        assert_pending!(ask.poll());

        tokio_test::block_on(respondent.answer("ABCDE")).unwrap();
        assert!(ask.is_woken());
        assert_eq!(assert_ready!(ask.poll()).unwrap(), "ABCDE");
    }

    #[tokio::test]
    async fn test_answers_pair_in_order() {
        let (session, mut respondent) = InterviewSession::open();

        let asker = {
            let session = Arc::clone(&session);
            tokio::spawn(async move {
                let mut answers = Vec::new();
                for q in ["first", "second", "third"] {
                    answers.push(session.ask(q, false).await.unwrap());
                }
                session.ask("", false).await.unwrap();
                answers
            })
        };

        let answered = respondent.answer_all(|q| format!("{}-answer", q.message)).await;
        assert_eq!(answered, 3);
        assert_eq!(
            asker.await.unwrap(),
            vec!["first-answer", "second-answer", "third-answer"]
        );

        let exchanges = session.exchanges();
        let asked: Vec<_> = exchanges.iter().map(|e| e.question.message.as_str()).collect();
        assert_eq!(asked, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_sensitive_answers_are_masked() {
        let (session, mut respondent) = InterviewSession::open();

        let asker = {
            let session = Arc::clone(&session);
            tokio::spawn(async move { session.ask("Steam Guard code", true).await })
        };

        let question = respondent.next_question().await.unwrap();
        assert!(question.sensitive);
        respondent.answer("ABCDE").await.unwrap();

        assert_eq!(asker.await.unwrap().unwrap(), "ABCDE");
        assert_eq!(session.exchanges()[0].answer, MASK);
    }

    #[tokio::test]
    async fn test_sentinel_closes_channels() {
        let (session, mut respondent) = InterviewSession::open();

        assert_eq!(session.ask("", false).await.unwrap(), "");
        assert!(session.is_closed());

        assert!(respondent.next_question().await.is_none());
        assert!(respondent.answer("late").await.is_err());
        assert!(matches!(
            session.ask("again?", false).await,
            Err(Error::Session(SessionError::Closed))
        ));

        // Idempotent
        session.close();
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[tokio::test]
    async fn test_close_releases_run_state() {
        let run_state = Arc::new(RunState::new());
        assert!(run_state.try_start());

        let (session, _respondent) = InterviewSession::open_for(Arc::clone(&run_state));
        assert!(run_state.is_running());

        session.close();
        assert!(!run_state.is_running());
    }

    #[tokio::test]
    async fn test_close_unblocks_pending_ask() {
        let (session, mut respondent) = InterviewSession::open();

        let asker = {
            let session = Arc::clone(&session);
            tokio::spawn(async move { session.ask("never answered", false).await })
        };

        respondent.next_question().await.unwrap();
        session.close();

        assert!(matches!(
            asker.await.unwrap(),
            Err(Error::Session(SessionError::Closed))
        ));
        assert!(respondent.answer("too late").await.is_err());
    }

    #[tokio::test]
    async fn test_answer_needs_a_pending_question() {
        let (session, mut respondent) = InterviewSession::open();

        assert!(matches!(
            respondent.answer("early").await,
            Err(Error::Session(SessionError::NoPendingQuestion))
        ));

        let asker = {
            let session = Arc::clone(&session);
            tokio::spawn(async move { session.ask("Two-factor code", true).await })
        };
        respondent.next_question().await.unwrap();
        respondent.answer("12345").await.unwrap();
        assert!(matches!(
            respondent.answer("12345 again").await,
            Err(Error::Session(SessionError::NoPendingQuestion))
        ));

        // The early answer was never paired with anything
        assert_eq!(asker.await.unwrap().unwrap(), "12345");
    }

    #[tokio::test]
    async fn test_dropped_respondent_fails_ask() {
        let (session, respondent) = InterviewSession::open();
        drop(respondent);

        assert!(session.ask("anyone there?", false).await.is_err());
    }
}

//! Interview engine: recognizing SteamCMD's questions and relaying answers.
//!
//! This module handles the interactive part of a SteamCMD run, including
//! prompt registration, chunk matching, the ask/answer session, and the
//! pseudo-terminal read loop that ties them together.

mod bridge;
mod matcher;
mod registry;
mod session;

pub use bridge::{CHUNK_SIZE, PtyBridge};
pub use matcher::{PromptMatcher, match_chunk, strip_escapes};
pub use registry::{QuestionRegistry, RegisteredQuestion};
pub use session::{Exchange, InterviewSession, Question, Respondent, SessionState};

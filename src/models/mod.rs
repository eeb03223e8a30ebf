//! Domain models
//!
//! Core data types shared by the registry, the store, and the judging
//! pipeline.

pub mod contest;
pub mod history;
pub mod participant;
pub mod scoreboard;
pub mod task;
pub mod whitelist;

pub use contest::{Contest, ContestConfig, ContestMode, ContestStatus, FreezeState, ScoringMode};
pub use history::HistoryRecord;
pub use participant::{Participant, TaskScore};
pub use scoreboard::{FrozenBoard, RevealStep, ScoreCell, ScoreboardRow, ScoreboardView};
pub use task::{Task, TestCase};
pub use whitelist::WhitelistEntry;

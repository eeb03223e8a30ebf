//! Contest response payloads

use serde::Serialize;

use crate::models::{ContestMode, RevealStep, WhitelistEntry};

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub status: &'static str,
    pub queue_size: i64,
}

#[derive(Debug, Serialize)]
pub struct ModeResponse {
    pub mode: ContestMode,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct RosterUploadResponse {
    pub added: usize,
    pub failed: usize,
}

#[derive(Debug, Serialize)]
pub struct RosterResponse {
    pub entries: Vec<WhitelistEntry>,
}

#[derive(Debug, Serialize)]
pub struct RevealResponse {
    pub steps: Vec<RevealStep>,
}

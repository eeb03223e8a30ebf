//! Broadcast layer
//!
//! One room per contest over `tokio::sync::broadcast`. Events are
//! serialized once and fanned out to every connected websocket; delivery is
//! at-least-once within a session and there is no backlog, so reconnecting
//! clients fetch a fresh snapshot over HTTP.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::Serialize;
use tokio::sync::broadcast;

use crate::judge::PersonalResult;
use crate::models::{RevealStep, ScoreboardView};

/// Buffered events per room before slow clients start losing messages
const ROOM_CAPACITY: usize = 64;

/// Everything a contest room can receive
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ContestEvent {
    /// Fresh scoreboard after any accepted write
    FullStatusUpdate(ScoreboardView),
    /// Verdict for one participant; clients filter by their own id
    PersonalResult {
        participant_id: String,
        result: PersonalResult,
    },
    /// A submission entered the queue
    SubmissionPending {
        participant_id: String,
        task_id: i64,
    },
    Started,
    Finished,
    /// One cell resolving during the reveal stream
    RevealStep(RevealStep),
}

/// Room table. Rooms are created on first use and dropped when their
/// contest closes.
#[derive(Default)]
pub struct Broadcaster {
    rooms: Mutex<HashMap<String, broadcast::Sender<String>>>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    fn room(&self, contest_id: &str) -> broadcast::Sender<String> {
        let mut rooms = self.rooms.lock().unwrap_or_else(|e| e.into_inner());
        rooms
            .entry(contest_id.to_string())
            .or_insert_with(|| broadcast::channel(ROOM_CAPACITY).0)
            .clone()
    }

    /// Subscribe to a contest room, creating it if needed
    pub fn subscribe(&self, contest_id: &str) -> broadcast::Receiver<String> {
        self.room(contest_id).subscribe()
    }

    /// Publish one event to a room. Rooms without subscribers are fine; the
    /// send result is intentionally ignored.
    pub fn publish(&self, contest_id: &str, event: &ContestEvent) {
        match serde_json::to_string(event) {
            Ok(payload) => {
                let _ = self.room(contest_id).send(payload);
            }
            Err(e) => tracing::error!(contest_id, "failed to encode event: {}", e),
        }
    }

    /// Forget a room once its contest is finished
    pub fn drop_room(&self, contest_id: &str) {
        let mut rooms = self.rooms.lock().unwrap_or_else(|e| e.into_inner());
        rooms.remove(contest_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn published_events_reach_subscribers() {
        let broadcaster = Broadcaster::new();
        let mut rx = broadcaster.subscribe("c1");

        broadcaster.publish(
            "c1",
            &ContestEvent::SubmissionPending {
                participant_id: "p1".into(),
                task_id: 3,
            },
        );

        let payload = rx.recv().await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(value["event"], "submission_pending");
        assert_eq!(value["data"]["participant_id"], "p1");
        assert_eq!(value["data"]["task_id"], 3);
    }

    #[tokio::test]
    async fn rooms_are_isolated() {
        let broadcaster = Broadcaster::new();
        let mut other = broadcaster.subscribe("other");

        broadcaster.publish("c1", &ContestEvent::Started);
        assert!(other.try_recv().is_err());
    }

    #[test]
    fn lifecycle_events_serialize_bare() {
        let json = serde_json::to_string(&ContestEvent::Started).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["event"], "started");
    }
}

use std::str::FromStr;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackRating {
    Up,
    Down,
}

impl FromStr for FeedbackRating {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "up" => Ok(Self::Up),
            "down" => Ok(Self::Down),
            other => Err(format!("rating must be 'up' or 'down', got '{}'", other)),
        }
    }
}

/// One thumbs-up/down judgement on a traced turn.
#[derive(Debug, Clone, Serialize)]
pub struct FeedbackRecord {
    pub trace_id: String,
    pub positive: bool,
    pub rationale: Option<String>,
    pub source_id: String,
    pub submitted_at: DateTime<Utc>,
}

/// In-memory feedback keyed by trace id. Several submissions for the same
/// trace are all kept, oldest first.
#[derive(Debug, Default)]
pub struct FeedbackStore {
    by_trace: DashMap<String, Vec<FeedbackRecord>>,
}

impl FeedbackStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &self,
        trace_id: &str,
        rating: FeedbackRating,
        comment: Option<String>,
        user_name: Option<String>,
    ) -> FeedbackRecord {
        let record = FeedbackRecord {
            trace_id: trace_id.to_string(),
            positive: rating == FeedbackRating::Up,
            rationale: comment,
            source_id: user_name
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| "anonymous".to_string()),
            submitted_at: Utc::now(),
        };

        self.by_trace
            .entry(trace_id.to_string())
            .or_default()
            .push(record.clone());
        record
    }

    pub fn for_trace(&self, trace_id: &str) -> Vec<FeedbackRecord> {
        self.by_trace
            .get(trace_id)
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.by_trace.iter().map(|entry| entry.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

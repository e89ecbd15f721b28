use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::attempt::QuizType;
use super::question::Topic;

/// Aggregates across all of one account's completed attempts. Zeroed when no
/// attempt has been completed yet.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    #[serde(default)]
    pub avg_accuracy: f64,
    #[serde(default)]
    pub highest_score: i64,
    #[serde(default)]
    pub total_time: i64,
}

/// One row of the recent-attempt history, chart-ready.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: String,
    pub quiz_type: QuizType,
    pub score: i64,
    pub accuracy: i64,
    pub correct_answers: u32,
    pub total_questions: u32,
    pub duration: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
}

/// Cross-attempt tally for one strand plus the derived mastery percentage.
#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TopicMastery {
    pub topic: Topic,
    pub correct: i64,
    pub wrong: i64,
    pub mastery: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOverviewResponse {
    pub success: bool,
    pub overview: Overview,
    pub total_attempts: i64,
    /// Most recent 10 completed attempts, oldest first.
    pub history: Vec<HistoryEntry>,
    /// Always all four strands, fixed order.
    pub topic_mastery: Vec<TopicMastery>,
}

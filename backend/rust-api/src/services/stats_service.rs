use std::collections::HashMap;

use anyhow::Context;
use futures::TryStreamExt;
use mongodb::bson::{doc, from_document, oid::ObjectId, Document};
use mongodb::Database;
use serde::Deserialize;

use crate::error::ApiError;
use crate::models::attempt::Attempt;
use crate::models::question::Topic;
use crate::models::stats::{HistoryEntry, Overview, TopicMastery, UserOverviewResponse};

const HISTORY_WINDOW: i64 = 10;

pub struct StatsService {
    mongo: Database,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OverviewRow {
    #[serde(default)]
    avg_accuracy: Option<f64>,
    #[serde(default)]
    highest_score: Option<i64>,
    #[serde(default)]
    total_time: Option<i64>,
    #[serde(default)]
    total_attempts: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct MasteryRow {
    #[serde(rename = "_id")]
    topic: Topic,
    #[serde(default)]
    correct: i64,
    #[serde(default)]
    wrong: i64,
}

impl StatsService {
    pub fn new(mongo: Database) -> Self {
        Self { mongo }
    }

    /// Summarizes one account's completed-attempt history, computed fresh on
    /// every call. Zero completed attempts yields zeroed defaults.
    pub async fn user_overview(&self, user_id: &str) -> Result<UserOverviewResponse, ApiError> {
        let user_oid = ObjectId::parse_str(user_id)
            .map_err(|_| ApiError::Validation("Invalid user id".to_string()))?;

        let (overview, total_attempts) = self.aggregate_overview(&user_oid).await?;
        let history = self.recent_history(&user_oid).await?;
        let topic_mastery = self.aggregate_topic_mastery(&user_oid).await?;

        Ok(UserOverviewResponse {
            success: true,
            overview,
            total_attempts,
            history,
            topic_mastery,
        })
    }

    async fn aggregate_overview(&self, user_id: &ObjectId) -> Result<(Overview, i64), ApiError> {
        let pipeline = vec![
            doc! { "$match": { "userId": user_id, "completed": true } },
            doc! { "$group": {
                "_id": null,
                "avgAccuracy": { "$avg": "$accuracy" },
                "highestScore": { "$max": "$score" },
                "totalTime": { "$sum": "$duration" },
                "totalAttempts": { "$sum": 1 },
            } },
        ];

        let mut cursor = self
            .mongo
            .collection::<Document>("attempts")
            .aggregate(pipeline)
            .await?;

        let row = match cursor.try_next().await.context("overview cursor failed")? {
            Some(document) => {
                from_document::<OverviewRow>(document).context("overview row deserialize")?
            }
            None => return Ok((Overview::default(), 0)),
        };

        let overview = Overview {
            avg_accuracy: row.avg_accuracy.unwrap_or(0.0),
            highest_score: row.highest_score.unwrap_or(0),
            total_time: row.total_time.unwrap_or(0),
        };

        Ok((overview, row.total_attempts.unwrap_or(0)))
    }

    /// The 10 most recent completed attempts, queried newest-first and
    /// reversed so charts render chronologically.
    async fn recent_history(&self, user_id: &ObjectId) -> Result<Vec<HistoryEntry>, ApiError> {
        let cursor = self
            .mongo
            .collection::<Attempt>("attempts")
            .find(doc! { "userId": user_id, "completed": true })
            .sort(doc! { "endTime": -1 })
            .limit(HISTORY_WINDOW)
            .await?;

        let attempts: Vec<Attempt> = cursor.try_collect().await?;

        let mut history: Vec<HistoryEntry> = attempts
            .into_iter()
            .map(|attempt| HistoryEntry {
                id: attempt.id.map(|id| id.to_hex()).unwrap_or_default(),
                quiz_type: attempt.quiz_type,
                score: attempt.score,
                accuracy: attempt.accuracy,
                correct_answers: attempt.correct_answers,
                total_questions: attempt.total_questions,
                duration: attempt.duration,
                end_time: attempt.end_time,
            })
            .collect();

        history.reverse();
        Ok(history)
    }

    /// Flattens each attempt's four-strand tally and groups across the whole
    /// history by topic name.
    async fn aggregate_topic_mastery(
        &self,
        user_id: &ObjectId,
    ) -> Result<Vec<TopicMastery>, ApiError> {
        let pipeline = vec![
            doc! { "$match": { "userId": user_id, "completed": true } },
            doc! { "$project": { "entries": { "$objectToArray": "$topicResults" } } },
            doc! { "$unwind": "$entries" },
            doc! { "$group": {
                "_id": "$entries.k",
                "correct": { "$sum": "$entries.v.correct" },
                "wrong": { "$sum": "$entries.v.wrong" },
            } },
        ];

        let mut cursor = self
            .mongo
            .collection::<Document>("attempts")
            .aggregate(pipeline)
            .await?;

        let mut by_topic: HashMap<Topic, (i64, i64)> = HashMap::new();
        while let Some(document) = cursor.try_next().await.context("mastery cursor failed")? {
            let row: MasteryRow = from_document(document).context("mastery row deserialize")?;
            by_topic.insert(row.topic, (row.correct, row.wrong));
        }

        // Fixed strand order; topics never attempted report zero mastery.
        Ok(Topic::ALL
            .iter()
            .map(|topic| {
                let (correct, wrong) = by_topic.get(topic).copied().unwrap_or((0, 0));
                TopicMastery {
                    topic: *topic,
                    correct,
                    wrong,
                    mastery: mastery_percent(correct, wrong),
                }
            })
            .collect())
    }
}

/// `round(correct / max(correct + wrong, 1) * 100)` — the max(.., 1) guards
/// the zero-count division, so an unattempted topic reports 0, not an error.
pub(crate) fn mastery_percent(correct: i64, wrong: i64) -> i64 {
    let denominator = (correct + wrong).max(1);
    (correct as f64 / denominator as f64 * 100.0).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_tally_reports_zero_mastery() {
        assert_eq!(mastery_percent(0, 0), 0);
    }

    #[test]
    fn mastery_rounds_to_the_nearest_percent() {
        assert_eq!(mastery_percent(1, 2), 33);
        assert_eq!(mastery_percent(2, 1), 67);
        assert_eq!(mastery_percent(5, 0), 100);
        assert_eq!(mastery_percent(0, 5), 0);
        assert_eq!(mastery_percent(1, 1), 50);
    }
}

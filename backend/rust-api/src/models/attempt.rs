use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use super::question::Topic;
use super::{bson_datetime_as_chrono, bson_datetime_as_chrono_option};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuizType {
    Year3,
    Year7,
    Multiplication,
    Retake,
}

impl QuizType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuizType::Year3 => "year3",
            QuizType::Year7 => "year7",
            QuizType::Multiplication => "multiplication",
            QuizType::Retake => "retake",
        }
    }

    /// "year3" -> "3"; non-year quiz types have no year label.
    pub fn year_label(&self) -> Option<&'static str> {
        match self {
            QuizType::Year3 => Some("3"),
            QuizType::Year7 => Some("7"),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum QuizMode {
    #[default]
    Full,
    Quick,
    Practice,
    Unlimited,
}

/// One graded response inside an attempt. The answer text and correctness
/// flag are frozen at submission time, independent of later question edits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResponse {
    pub question_id: ObjectId,
    pub user_answer: String,
    pub correct: bool,
    #[serde(default)]
    pub time_spent: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicResult {
    #[serde(default)]
    pub correct: u32,
    #[serde(default)]
    pub wrong: u32,
}

/// Per-topic correct/wrong tallies for one attempt. All four strands are
/// always present so aggregation never meets a missing key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicResults {
    #[serde(default)]
    pub number: TopicResult,
    #[serde(default)]
    pub measurement: TopicResult,
    #[serde(default)]
    pub geometry: TopicResult,
    #[serde(default)]
    pub statistics: TopicResult,
}

impl TopicResults {
    pub fn tally_mut(&mut self, topic: Topic) -> &mut TopicResult {
        match topic {
            Topic::Number => &mut self.number,
            Topic::Measurement => &mut self.measurement,
            Topic::Geometry => &mut self.geometry,
            Topic::Statistics => &mut self.statistics,
        }
    }

    pub fn tally(&self, topic: Topic) -> &TopicResult {
        match topic {
            Topic::Number => &self.number,
            Topic::Measurement => &self.measurement,
            Topic::Geometry => &self.geometry,
            Topic::Statistics => &self.statistics,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Topic, &TopicResult)> {
        Topic::ALL.iter().map(move |topic| (*topic, self.tally(*topic)))
    }
}

/// One quiz session stored in the "attempts" collection. Created as an empty
/// shell on start, populated exactly once on submit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attempt {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: ObjectId,
    pub quiz_type: QuizType,
    #[serde(default)]
    pub mode: QuizMode,
    #[serde(default)]
    pub questions: Vec<QuestionResponse>,
    #[serde(default)]
    pub score: i64,
    pub total_questions: u32,
    #[serde(default)]
    pub correct_answers: u32,
    #[serde(default)]
    pub accuracy: i64,
    #[serde(with = "bson_datetime_as_chrono")]
    pub start_time: DateTime<Utc>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "bson_datetime_as_chrono_option"
    )]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration: i64,
    #[serde(default)]
    pub topic_results: TopicResults,
    #[serde(default)]
    pub completed: bool,
}

/// Body for POST /api/quiz/start.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartQuizRequest {
    pub user_id: String,
    pub quiz_type: QuizType,
    #[serde(default)]
    pub mode: Option<QuizMode>,
    /// Advisory only; the submit operation derives its own denominator.
    pub total_questions: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartQuizResponse {
    pub success: bool,
    pub attempt_id: String,
    pub message: String,
}

/// One answer inside a POST /api/quiz/submit/{attemptId} batch.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedAnswer {
    pub question_id: String,
    pub user_answer: String,
    #[serde(default)]
    pub time_spent: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitQuizRequest {
    pub answers: Vec<SubmittedAnswer>,
}

/// Aggregate summary returned by the submit operation.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptSummary {
    pub id: String,
    pub score: i64,
    pub accuracy: i64,
    pub correct_answers: u32,
    pub total_questions: u32,
    /// Answers whose question reference did not resolve; excluded from the
    /// denominator rather than failing the whole submission.
    pub skipped_questions: u32,
    pub topic_results: TopicResults,
}

#[derive(Debug, Serialize)]
pub struct SubmitQuizResponse {
    pub success: bool,
    pub attempt: AttemptSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tally_mut_addresses_each_strand() {
        let mut results = TopicResults::default();
        results.tally_mut(Topic::Geometry).correct += 1;
        results.tally_mut(Topic::Geometry).wrong += 2;
        results.tally_mut(Topic::Number).correct += 3;

        assert_eq!(results.geometry, TopicResult { correct: 1, wrong: 2 });
        assert_eq!(results.number, TopicResult { correct: 3, wrong: 0 });
        assert_eq!(results.measurement, TopicResult::default());
    }

    #[test]
    fn topic_results_serialize_with_all_four_strands() {
        let json = serde_json::to_value(TopicResults::default()).unwrap();
        for topic in Topic::ALL {
            assert_eq!(json[topic.as_str()]["correct"], 0);
            assert_eq!(json[topic.as_str()]["wrong"], 0);
        }
    }

    #[test]
    fn quiz_type_year_labels() {
        assert_eq!(QuizType::Year3.year_label(), Some("3"));
        assert_eq!(QuizType::Year7.year_label(), Some("7"));
        assert_eq!(QuizType::Multiplication.year_label(), None);
    }
}

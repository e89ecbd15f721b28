use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// The four NAPLAN numeracy strands. Every question and every attempt tally
/// is keyed by one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
    Number,
    Measurement,
    Geometry,
    Statistics,
}

impl Topic {
    pub const ALL: [Topic; 4] = [
        Topic::Number,
        Topic::Measurement,
        Topic::Geometry,
        Topic::Statistics,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::Number => "number",
            Topic::Measurement => "measurement",
            Topic::Geometry => "geometry",
            Topic::Statistics => "statistics",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    Multiple,
    #[default]
    Text,
    Interactive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

/// Bank entry stored in the "questions" collection. Never mutated after
/// creation; retired via `is_active` so historical attempts keep resolving.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub year_level: i32,
    pub topic: Topic,
    #[serde(rename = "type", default)]
    pub question_type: QuestionType,
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<String>>,
    /// Superset of `correct_answer`; any case-insensitive match scores.
    pub acceptable_answers: Vec<String>,
    pub correct_answer: String,
    pub explanation: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hints: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default = "default_time_limit")]
    pub time_limit: u32,
    #[serde(default = "default_points")]
    pub points: u32,
    #[serde(default = "default_is_active")]
    pub is_active: bool,
}

pub(crate) fn default_time_limit() -> u32 {
    30
}

fn default_points() -> u32 {
    10
}

fn default_is_active() -> bool {
    true
}

/// Projection served to quiz takers: the answer-bearing fields
/// (`correctAnswer`, `acceptableAnswers`) are stripped.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicQuestion {
    pub id: String,
    pub year_level: i32,
    pub topic: Topic,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub question: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<String>>,
    pub explanation: String,
    pub difficulty: Difficulty,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hints: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub time_limit: u32,
    pub points: u32,
}

impl From<Question> for PublicQuestion {
    fn from(question: Question) -> Self {
        PublicQuestion {
            id: question.id.map(|id| id.to_hex()).unwrap_or_default(),
            year_level: question.year_level,
            topic: question.topic,
            question_type: question.question_type,
            question: question.question,
            choices: question.choices,
            explanation: question.explanation,
            difficulty: question.difficulty,
            tags: question.tags,
            hints: question.hints,
            image_url: question.image_url,
            time_limit: question.time_limit,
            points: question.points,
        }
    }
}

/// Query params for GET /api/quiz/questions/{yearLevel}
#[derive(Debug, Deserialize)]
pub struct ListQuestionsQuery {
    pub topic: Option<Topic>,
    pub difficulty: Option<Difficulty>,
    pub limit: Option<i64>,
}

/// Body for POST /api/ai/generate-question
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateQuestionRequest {
    pub year_level: i32,
    pub topic: Topic,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_round_trips_through_serde() {
        for topic in Topic::ALL {
            let json = serde_json::to_string(&topic).unwrap();
            assert_eq!(json, format!("\"{}\"", topic.as_str()));
            let back: Topic = serde_json::from_str(&json).unwrap();
            assert_eq!(back, topic);
        }
    }

    #[test]
    fn public_projection_drops_answer_fields() {
        let question = Question {
            id: Some(ObjectId::new()),
            year_level: 3,
            topic: Topic::Number,
            question_type: QuestionType::Text,
            question: "What is half of 50?".to_string(),
            choices: None,
            acceptable_answers: vec!["25".to_string()],
            correct_answer: "25".to_string(),
            explanation: "50 divided by 2 is 25.".to_string(),
            difficulty: Difficulty::Easy,
            tags: vec![],
            hints: None,
            image_url: None,
            time_limit: 30,
            points: 10,
            is_active: true,
        };

        let public = PublicQuestion::from(question);
        let json = serde_json::to_value(&public).unwrap();
        assert!(json.get("correctAnswer").is_none());
        assert!(json.get("acceptableAnswers").is_none());
        assert_eq!(json["question"], "What is half of 50?");
    }
}

use async_trait::async_trait;
use mongodb::bson::doc;
use mongodb::Database;
use serde::Deserialize;
use serde_json::json;

use crate::config::Config;
use crate::error::ApiError;
use crate::metrics::AI_REQUESTS_TOTAL;
use crate::models::attempt::Attempt;
use crate::models::question::{Difficulty, Question, QuestionType, Topic};

const REMOTE_TIMEOUT_SECS: u64 = 10;

/// Capability boundary around the generative-language integration. From the
/// assessment engine's point of view this contract always succeeds: the
/// remote implementation converts every one of its own failures into a call
/// to the local deterministic fallback.
#[async_trait]
pub trait FeedbackProvider: Send + Sync {
    fn name(&self) -> &'static str;

    fn key_detected(&self) -> bool;

    /// Short natural-language summary of one completed attempt.
    async fn summarize(&self, attempt: &Attempt) -> String;

    /// One fresh (or bank-selected) question for the requested slice.
    /// `None` only when the bank itself is empty.
    async fn generate_question(
        &self,
        year_level: i32,
        topic: Topic,
    ) -> Result<Option<Question>, ApiError>;
}

/// Picks the provider by feature detection: a configured credential selects
/// the remote implementation, otherwise the local fallback serves directly.
pub fn provider_from_config(config: &Config, mongo: Database) -> Box<dyn FeedbackProvider> {
    match &config.ai_api_key {
        Some(key) => Box::new(RemoteProvider::new(
            key.clone(),
            config.ai_api_url.clone(),
            mongo,
        )),
        None => Box::new(LocalProvider::new(mongo)),
    }
}

/// Deterministic fallback: summaries are built from the topic-gap tally the
/// attempt already carries, and question generation degrades through the
/// bank (year+topic, year, topic, anything).
pub struct LocalProvider {
    mongo: Database,
}

impl LocalProvider {
    pub fn new(mongo: Database) -> Self {
        Self { mongo }
    }

    async fn pick_from_bank(
        &self,
        year_level: i32,
        topic: Topic,
    ) -> Result<Option<Question>, ApiError> {
        let questions = self.mongo.collection::<Question>("questions");

        let filters = [
            doc! { "yearLevel": year_level, "topic": topic.as_str(), "isActive": true },
            doc! { "yearLevel": year_level, "isActive": true },
            doc! { "topic": topic.as_str(), "isActive": true },
            doc! { "isActive": true },
        ];

        for filter in filters {
            if let Some(question) = questions.find_one(filter).await? {
                return Ok(Some(question));
            }
        }

        Ok(None)
    }
}

#[async_trait]
impl FeedbackProvider for LocalProvider {
    fn name(&self) -> &'static str {
        "local"
    }

    fn key_detected(&self) -> bool {
        false
    }

    async fn summarize(&self, attempt: &Attempt) -> String {
        AI_REQUESTS_TOTAL
            .with_label_values(&["summarize", "local"])
            .inc();
        local_summary(attempt)
    }

    async fn generate_question(
        &self,
        year_level: i32,
        topic: Topic,
    ) -> Result<Option<Question>, ApiError> {
        AI_REQUESTS_TOTAL
            .with_label_values(&["generate", "local"])
            .inc();
        self.pick_from_bank(year_level, topic).await
    }
}

/// Remote-backed implementation. Prompts a generative-language HTTP API and
/// persists any question it produces so later scoring can resolve it by id.
pub struct RemoteProvider {
    api_key: String,
    api_url: String,
    client: reqwest::Client,
    fallback: LocalProvider,
}

impl RemoteProvider {
    pub fn new(api_key: String, api_url: String, mongo: Database) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(REMOTE_TIMEOUT_SECS))
            .build()
            .expect("failed to build HTTP client");

        Self {
            api_key,
            api_url,
            client,
            fallback: LocalProvider::new(mongo),
        }
    }

    async fn prompt_remote(&self, prompt: &str) -> anyhow::Result<String> {
        let url = format!("{}?key={}", self.api_url, self.api_key);
        let body = json!({
            "contents": [ { "parts": [ { "text": prompt } ] } ]
        });

        let response = self.client.post(&url).json(&body).send().await?;

        if !response.status().is_success() {
            anyhow::bail!("generative API returned status {}", response.status());
        }

        let payload: serde_json::Value = response.json().await?;
        payload["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .map(|text| text.to_string())
            .ok_or_else(|| anyhow::anyhow!("generative API response missing text"))
    }
}

#[async_trait]
impl FeedbackProvider for RemoteProvider {
    fn name(&self) -> &'static str {
        "remote"
    }

    fn key_detected(&self) -> bool {
        true
    }

    async fn summarize(&self, attempt: &Attempt) -> String {
        match self.prompt_remote(&summary_prompt(attempt)).await {
            Ok(summary) => {
                AI_REQUESTS_TOTAL
                    .with_label_values(&["summarize", "remote"])
                    .inc();
                summary
            }
            Err(err) => {
                tracing::warn!("remote summary failed, using fallback: {:#}", err);
                AI_REQUESTS_TOTAL
                    .with_label_values(&["summarize", "fallback"])
                    .inc();
                local_summary(attempt)
            }
        }
    }

    async fn generate_question(
        &self,
        year_level: i32,
        topic: Topic,
    ) -> Result<Option<Question>, ApiError> {
        let text = match self.prompt_remote(&generation_prompt(year_level, topic)).await {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!("remote generation failed, using bank fallback: {:#}", err);
                AI_REQUESTS_TOTAL
                    .with_label_values(&["generate", "fallback"])
                    .inc();
                return self.fallback.pick_from_bank(year_level, topic).await;
            }
        };

        let mut question = match parse_generated_payload(&text, year_level, topic) {
            Some(question) => question,
            None => {
                tracing::warn!("generated payload was not parseable, using bank fallback");
                AI_REQUESTS_TOTAL
                    .with_label_values(&["generate", "fallback"])
                    .inc();
                return self.fallback.pick_from_bank(year_level, topic).await;
            }
        };

        // Persist before returning so a later submission resolves the id.
        let insert_result = self
            .fallback
            .mongo
            .collection::<Question>("questions")
            .insert_one(&question)
            .await?;
        question.id = insert_result.inserted_id.as_object_id();

        AI_REQUESTS_TOTAL
            .with_label_values(&["generate", "remote"])
            .inc();

        Ok(Some(question))
    }
}

fn summary_prompt(attempt: &Attempt) -> String {
    let audience = match attempt.quiz_type.year_label() {
        Some(year) => format!("a Year {} student", year),
        None => "a student".to_string(),
    };

    format!(
        "Analyze this NAPLAN practice result for {}:\n\
         - Overall Accuracy: {}%\n\
         - Correct Answers: {}/{}\n\
         - Topic Gaps: {}\n\n\
         Provide a 3-sentence encouraging summary and pinpoint exactly what \
         they should study next.",
        audience,
        attempt.accuracy,
        attempt.correct_answers,
        attempt.total_questions,
        topic_gaps(attempt).unwrap_or_else(|| "None (Perfect Score!)".to_string()),
    )
}

fn generation_prompt(year_level: i32, topic: Topic) -> String {
    format!(
        "Generate a Year {} NAPLAN {} question in JSON format:\n\
         {{\n\
           \"question\": \"...\",\n\
           \"choices\": [\"...\", \"...\"],\n\
           \"correctAnswer\": \"...\",\n\
           \"explanation\": \"...\",\n\
           \"difficulty\": \"medium\"\n\
         }}",
        year_level,
        topic.as_str()
    )
}

/// Comma-joined list of strands with recorded mistakes, e.g.
/// "number (2 wrong), geometry (1 wrong)". None for a perfect score.
fn topic_gaps(attempt: &Attempt) -> Option<String> {
    let gaps: Vec<String> = attempt
        .topic_results
        .iter()
        .filter(|(_, tally)| tally.wrong > 0)
        .map(|(topic, tally)| format!("{} ({} wrong)", topic.as_str(), tally.wrong))
        .collect();

    if gaps.is_empty() {
        None
    } else {
        Some(gaps.join(", "))
    }
}

fn local_summary(attempt: &Attempt) -> String {
    let review = topic_gaps(attempt).unwrap_or_else(|| "your general logic".to_string());
    format!(
        "Great effort! You achieved {}% accuracy. You showed strong skills, \
         but you might want to review {} to improve further. Keep practicing!",
        attempt.accuracy, review
    )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeneratedPayload {
    question: String,
    #[serde(default)]
    choices: Option<Vec<String>>,
    correct_answer: String,
    explanation: String,
    #[serde(default)]
    difficulty: Option<Difficulty>,
}

/// The remote model tends to wrap JSON in markdown fences; tolerate both.
fn parse_generated_payload(text: &str, year_level: i32, topic: Topic) -> Option<Question> {
    let trimmed = text
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    let payload: GeneratedPayload = serde_json::from_str(trimmed).ok()?;

    let question_type = if payload.choices.as_deref().is_some_and(|c| !c.is_empty()) {
        QuestionType::Multiple
    } else {
        QuestionType::Text
    };

    Some(Question {
        id: None,
        year_level,
        topic,
        question_type,
        question: payload.question,
        choices: payload.choices.filter(|c| !c.is_empty()),
        acceptable_answers: vec![payload.correct_answer.clone()],
        correct_answer: payload.correct_answer,
        explanation: payload.explanation,
        difficulty: payload.difficulty.unwrap_or_default(),
        tags: vec!["ai-generated".to_string()],
        hints: None,
        image_url: None,
        time_limit: 30,
        points: 10,
        is_active: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::attempt::{QuizMode, QuizType, TopicResults};
    use chrono::Utc;

    fn completed_attempt(accuracy: i64, topic_results: TopicResults) -> Attempt {
        Attempt {
            id: None,
            user_id: mongodb::bson::oid::ObjectId::new(),
            quiz_type: QuizType::Year3,
            mode: QuizMode::Full,
            questions: vec![],
            score: 10,
            total_questions: 2,
            correct_answers: 1,
            accuracy,
            start_time: Utc::now(),
            end_time: Some(Utc::now()),
            duration: 60,
            topic_results,
            completed: true,
        }
    }

    #[test]
    fn local_summary_names_the_gap_topics() {
        let mut tallies = TopicResults::default();
        tallies.number.correct = 1;
        tallies.number.wrong = 1;

        let summary = local_summary(&completed_attempt(50, tallies));
        assert!(summary.contains("50% accuracy"));
        assert!(summary.contains("number (1 wrong)"));
    }

    #[test]
    fn local_summary_for_a_perfect_score_has_a_generic_hint() {
        let summary = local_summary(&completed_attempt(100, TopicResults::default()));
        assert!(summary.contains("your general logic"));
    }

    #[test]
    fn generated_payload_parses_with_and_without_fences() {
        let raw = r#"{"question":"What is 2+2?","choices":["3","4"],"correctAnswer":"4","explanation":"2+2=4.","difficulty":"easy"}"#;
        let fenced = format!("```json\n{}\n```", raw);

        for text in [raw.to_string(), fenced] {
            let question = parse_generated_payload(&text, 3, Topic::Number).unwrap();
            assert_eq!(question.correct_answer, "4");
            assert_eq!(question.acceptable_answers, vec!["4"]);
            assert_eq!(question.question_type, QuestionType::Multiple);
            assert_eq!(question.year_level, 3);
            assert!(question.is_active);
        }
    }

    #[test]
    fn unparseable_payload_is_rejected() {
        assert!(parse_generated_payload("not json", 3, Topic::Number).is_none());
    }

    #[test]
    fn free_text_payload_without_choices_becomes_a_text_question() {
        let raw = r#"{"question":"Half of 50?","correctAnswer":"25","explanation":"50/2."}"#;
        let question = parse_generated_payload(raw, 7, Topic::Number).unwrap();
        assert_eq!(question.question_type, QuestionType::Text);
        assert!(question.choices.is_none());
    }
}

use std::collections::HashMap;

use chrono::Utc;
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, to_bson, Document};
use mongodb::Database;

use crate::error::ApiError;
use crate::metrics::{ANSWERS_SCORED_TOTAL, QUIZ_ATTEMPTS_TOTAL};
use crate::models::attempt::{
    Attempt, AttemptSummary, QuestionResponse, StartQuizRequest, SubmittedAnswer, TopicResults,
};
use crate::models::question::{ListQuestionsQuery, PublicQuestion, Question};

const DEFAULT_QUESTION_LIMIT: i64 = 35;
const POINTS_PER_CORRECT_ANSWER: i64 = 10;

pub struct QuizService {
    mongo: Database,
}

/// Result of grading one submitted batch, before persistence.
pub(crate) struct ScoringOutcome {
    pub responses: Vec<QuestionResponse>,
    pub correct_count: u32,
    pub topic_results: TopicResults,
    pub skipped: u32,
}

impl QuizService {
    pub fn new(mongo: Database) -> Self {
        Self { mongo }
    }

    /// Serves an active slice of the bank for one year level. Answer-bearing
    /// fields are stripped by the `PublicQuestion` projection.
    pub async fn list_questions(
        &self,
        year_level: i32,
        query: &ListQuestionsQuery,
    ) -> Result<Vec<PublicQuestion>, ApiError> {
        let mut filter = doc! { "yearLevel": year_level, "isActive": true };

        if let Some(topic) = query.topic {
            filter.insert("topic", topic.as_str());
        }
        if let Some(difficulty) = query.difficulty {
            filter.insert("difficulty", difficulty.as_str());
        }

        let limit = query.limit.unwrap_or(DEFAULT_QUESTION_LIMIT).clamp(1, 100);

        let cursor = self
            .mongo
            .collection::<Question>("questions")
            .find(filter)
            .limit(limit)
            .await?;

        let questions: Vec<Question> = cursor.try_collect().await?;
        Ok(questions.into_iter().map(PublicQuestion::from).collect())
    }

    /// Creates the attempt shell: zeroed aggregates, `completed = false`.
    /// `totalQuestions` is advisory and not validated against the bank.
    pub async fn start_attempt(&self, req: StartQuizRequest) -> Result<String, ApiError> {
        let user_id = ObjectId::parse_str(&req.user_id)
            .map_err(|_| ApiError::Validation("Invalid user id".to_string()))?;

        let attempt = Attempt {
            id: None,
            user_id,
            quiz_type: req.quiz_type,
            mode: req.mode.unwrap_or_default(),
            questions: Vec::new(),
            score: 0,
            total_questions: req.total_questions,
            correct_answers: 0,
            accuracy: 0,
            start_time: Utc::now(),
            end_time: None,
            duration: 0,
            topic_results: TopicResults::default(),
            completed: false,
        };

        let insert_result = self
            .mongo
            .collection::<Attempt>("attempts")
            .insert_one(&attempt)
            .await?;

        let attempt_id = insert_result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| anyhow::anyhow!("inserted attempt id was not an ObjectId"))?;

        QUIZ_ATTEMPTS_TOTAL.with_label_values(&["started"]).inc();
        tracing::info!(
            attempt_id = %attempt_id.to_hex(),
            quiz_type = req.quiz_type.as_str(),
            "attempt started"
        );

        Ok(attempt_id.to_hex())
    }

    /// Grades one submitted batch and completes the attempt.
    ///
    /// The Started -> Completed transition is a compare-and-set: the update
    /// filter requires `completed: false`, so a resubmission (or a racing
    /// concurrent submission) matches nothing and is rejected with a 409
    /// instead of silently overwriting stored aggregates.
    pub async fn submit_attempt(
        &self,
        attempt_id: &str,
        answers: &[SubmittedAnswer],
    ) -> Result<AttemptSummary, ApiError> {
        let attempt_oid = ObjectId::parse_str(attempt_id)
            .map_err(|_| ApiError::Validation("Invalid attempt id".to_string()))?;

        let attempts = self.mongo.collection::<Attempt>("attempts");
        let attempt = attempts
            .find_one(doc! { "_id": attempt_oid })
            .await?
            .ok_or(ApiError::NotFound("Attempt"))?;

        if attempt.completed {
            return Err(ApiError::AlreadyCompleted);
        }

        let bank = self.load_referenced_questions(answers).await?;
        let outcome = score_answers(answers, &bank);

        for response in &outcome.responses {
            let label = if response.correct { "true" } else { "false" };
            ANSWERS_SCORED_TOTAL.with_label_values(&[label]).inc();
        }
        if outcome.skipped > 0 {
            ANSWERS_SCORED_TOTAL
                .with_label_values(&["skipped"])
                .inc_by(outcome.skipped as u64);
        }

        let accuracy = accuracy_percent(outcome.correct_count, answers.len());
        let score = outcome.correct_count as i64 * POINTS_PER_CORRECT_ANSWER;
        let end_time = Utc::now();
        let duration = (end_time - attempt.start_time).num_seconds().max(0);

        let update = doc! { "$set": {
            "questions": to_bson(&outcome.responses)?,
            "correctAnswers": outcome.correct_count as i64,
            "accuracy": accuracy,
            "score": score,
            "endTime": mongodb::bson::DateTime::from_millis(end_time.timestamp_millis()),
            "duration": duration,
            "topicResults": to_bson(&outcome.topic_results)?,
            "completed": true,
        } };

        let result = attempts
            .update_one(doc! { "_id": attempt_oid, "completed": false }, update)
            .await?;

        if result.matched_count == 0 {
            // Lost the race against another submission for the same attempt.
            return Err(ApiError::AlreadyCompleted);
        }

        QUIZ_ATTEMPTS_TOTAL.with_label_values(&["completed"]).inc();
        tracing::info!(
            attempt_id = %attempt_oid.to_hex(),
            correct = outcome.correct_count,
            skipped = outcome.skipped,
            accuracy,
            "attempt completed"
        );

        Ok(AttemptSummary {
            id: attempt_oid.to_hex(),
            score,
            accuracy,
            correct_answers: outcome.correct_count,
            total_questions: attempt.total_questions,
            skipped_questions: outcome.skipped,
            topic_results: outcome.topic_results,
        })
    }

    pub async fn get_attempt(&self, attempt_id: &str) -> Result<Attempt, ApiError> {
        let attempt_oid = ObjectId::parse_str(attempt_id)
            .map_err(|_| ApiError::Validation("Invalid attempt id".to_string()))?;

        self.mongo
            .collection::<Attempt>("attempts")
            .find_one(doc! { "_id": attempt_oid })
            .await?
            .ok_or(ApiError::NotFound("Attempt"))
    }

    /// Fetches every resolvable question referenced by the batch in one
    /// `$in` query. Unparseable ids simply end up absent from the map.
    async fn load_referenced_questions(
        &self,
        answers: &[SubmittedAnswer],
    ) -> Result<HashMap<ObjectId, Question>, ApiError> {
        let ids: Vec<ObjectId> = answers
            .iter()
            .filter_map(|answer| ObjectId::parse_str(&answer.question_id).ok())
            .collect();

        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let filter: Document = doc! { "_id": { "$in": ids } };
        let cursor = self
            .mongo
            .collection::<Question>("questions")
            .find(filter)
            .await?;

        let questions: Vec<Question> = cursor.try_collect().await?;
        Ok(questions
            .into_iter()
            .filter_map(|q| q.id.map(|id| (id, q)))
            .collect())
    }
}

/// The scoring loop. An answer is correct when it matches any entry of the
/// question's acceptable-answer set, compared case-insensitively. Answers
/// whose question reference does not resolve are skipped and counted.
pub(crate) fn score_answers(
    answers: &[SubmittedAnswer],
    bank: &HashMap<ObjectId, Question>,
) -> ScoringOutcome {
    let mut responses = Vec::with_capacity(answers.len());
    let mut correct_count = 0u32;
    let mut topic_results = TopicResults::default();
    let mut skipped = 0u32;

    for answer in answers {
        let resolved = ObjectId::parse_str(&answer.question_id)
            .ok()
            .and_then(|id| bank.get(&id).map(|question| (id, question)));

        let Some((question_id, question)) = resolved else {
            skipped += 1;
            continue;
        };

        let is_correct = is_acceptable(question, &answer.user_answer);

        if is_correct {
            correct_count += 1;
            topic_results.tally_mut(question.topic).correct += 1;
        } else {
            topic_results.tally_mut(question.topic).wrong += 1;
        }

        responses.push(QuestionResponse {
            question_id,
            user_answer: answer.user_answer.clone(),
            correct: is_correct,
            time_spent: answer.time_spent.unwrap_or(0),
        });
    }

    ScoringOutcome {
        responses,
        correct_count,
        topic_results,
        skipped,
    }
}

fn is_acceptable(question: &Question, user_answer: &str) -> bool {
    let candidate = user_answer.to_lowercase();
    question
        .acceptable_answers
        .iter()
        .any(|acceptable| acceptable.to_lowercase() == candidate)
}

/// Denominator is the number of submitted answers, not the advisory
/// `totalQuestions` recorded at start. Empty batch reports 0.
pub(crate) fn accuracy_percent(correct: u32, submitted: usize) -> i64 {
    if submitted == 0 {
        return 0;
    }
    (correct as f64 / submitted as f64 * 100.0).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::{Difficulty, QuestionType, Topic};

    fn bank_question(id: ObjectId, topic: Topic, acceptable: &[&str]) -> Question {
        Question {
            id: Some(id),
            year_level: 3,
            topic,
            question_type: QuestionType::Text,
            question: "q".to_string(),
            choices: None,
            acceptable_answers: acceptable.iter().map(|s| s.to_string()).collect(),
            correct_answer: acceptable[0].to_string(),
            explanation: "e".to_string(),
            difficulty: Difficulty::Easy,
            tags: vec![],
            hints: None,
            image_url: None,
            time_limit: 30,
            points: 10,
            is_active: true,
        }
    }

    fn submitted(question_id: &ObjectId, answer: &str) -> SubmittedAnswer {
        SubmittedAnswer {
            question_id: question_id.to_hex(),
            user_answer: answer.to_string(),
            time_spent: Some(5),
        }
    }

    #[test]
    fn canonical_answer_always_scores_correct() {
        let id = ObjectId::new();
        let bank = HashMap::from([(id, bank_question(id, Topic::Number, &["25"]))]);

        let outcome = score_answers(&[submitted(&id, "25")], &bank);
        assert_eq!(outcome.correct_count, 1);
        assert_eq!(outcome.topic_results.number.correct, 1);
        assert_eq!(outcome.skipped, 0);
    }

    #[test]
    fn case_insensitive_match_against_any_acceptable_variant() {
        let id = ObjectId::new();
        let bank = HashMap::from([(id, bank_question(id, Topic::Measurement, &["8cm", "8"]))]);

        for answer in ["8CM", "8cm", "8Cm", "8"] {
            let outcome = score_answers(&[submitted(&id, answer)], &bank);
            assert_eq!(outcome.correct_count, 1, "answer {:?} should score", answer);
        }
    }

    #[test]
    fn wrong_answer_tallies_against_the_topic() {
        let id = ObjectId::new();
        let bank = HashMap::from([(id, bank_question(id, Topic::Geometry, &["4"]))]);

        let outcome = score_answers(&[submitted(&id, "5")], &bank);
        assert_eq!(outcome.correct_count, 0);
        assert_eq!(outcome.topic_results.geometry.wrong, 1);
        assert_eq!(outcome.responses.len(), 1);
        assert!(!outcome.responses[0].correct);
    }

    #[test]
    fn unresolvable_references_are_skipped_and_counted() {
        let known = ObjectId::new();
        let bank = HashMap::from([(known, bank_question(known, Topic::Number, &["1"]))]);

        let answers = vec![
            submitted(&known, "1"),
            submitted(&ObjectId::new(), "1"), // not in the bank
            SubmittedAnswer {
                question_id: "not-an-object-id".to_string(),
                user_answer: "1".to_string(),
                time_spent: None,
            },
        ];

        let outcome = score_answers(&answers, &bank);
        assert_eq!(outcome.correct_count, 1);
        assert_eq!(outcome.skipped, 2);
        assert_eq!(outcome.responses.len(), 1);
    }

    #[test]
    fn mixed_batch_produces_the_expected_tallies() {
        let a = ObjectId::new();
        let b = ObjectId::new();
        let bank = HashMap::from([
            (a, bank_question(a, Topic::Number, &["14"])),
            (b, bank_question(b, Topic::Number, &["602"])),
        ]);

        let outcome = score_answers(&[submitted(&a, "14"), submitted(&b, "601")], &bank);
        assert_eq!(outcome.correct_count, 1);
        assert_eq!(outcome.topic_results.number.correct, 1);
        assert_eq!(outcome.topic_results.number.wrong, 1);
        assert_eq!(accuracy_percent(outcome.correct_count, 2), 50);
    }

    #[test]
    fn accuracy_uses_submitted_count_and_guards_zero() {
        assert_eq!(accuracy_percent(0, 0), 0);
        assert_eq!(accuracy_percent(1, 2), 50);
        assert_eq!(accuracy_percent(2, 3), 67);
        assert_eq!(accuracy_percent(3, 3), 100);
    }
}

use std::collections::{HashMap, HashSet};

use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, error::DatabaseResult};
use serde::{Deserialize, Serialize};
use sqlx::PgConnection;
use sqlx::prelude::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Question {
    id: Uuid,
    mooc_id: Uuid,
    stem: String,
    qtype: String,
    difficulty: String,
}

impl ResourceTyped for Question {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::Question
    }
}

impl Question {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn mooc_id(&self) -> Uuid {
        self.mooc_id
    }

    pub fn stem(&self) -> &str {
        &self.stem
    }

    pub fn qtype(&self) -> &str {
        &self.qtype
    }

    pub fn difficulty(&self) -> &str {
        &self.difficulty
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct QuestionOption {
    id: Uuid,
    question_id: Uuid,
    label: String,
    content: String,
    is_correct: bool,
}

impl ResourceTyped for QuestionOption {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::QuestionOption
    }
}

impl QuestionOption {
    pub fn question_id(&self) -> Uuid {
        self.question_id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn is_correct(&self) -> bool {
        self.is_correct
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, utoipa::ToSchema)]
pub struct QuestionOptionCreate {
    pub label: String,
    pub content: String,
    #[serde(default)]
    pub is_correct: bool,
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct QuestionCreate {
    pub stem: String,
    pub qtype: Option<String>,
    pub difficulty: Option<String>,
    pub options: Vec<QuestionOptionCreate>,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum QuestionValidationError {
    #[error("question stem is empty")]
    EmptyStem,
    #[error("a question needs at least two options")]
    TooFewOptions,
    #[error("option labels must be unique and non-empty")]
    BadLabels,
    #[error("exactly one option must be correct")]
    CorrectCount,
}

impl QuestionCreate {
    pub fn validate(&self) -> Result<(), QuestionValidationError> {
        if self.stem.trim().is_empty() {
            return Err(QuestionValidationError::EmptyStem);
        }

        if self.options.len() < 2 {
            return Err(QuestionValidationError::TooFewOptions);
        }

        let mut labels = HashSet::new();
        let labels_ok = self
            .options
            .iter()
            .all(|o| !o.label.trim().is_empty() && labels.insert(o.label.as_str()));
        if !labels_ok {
            return Err(QuestionValidationError::BadLabels);
        }

        if self.options.iter().filter(|o| o.is_correct).count() != 1 {
            return Err(QuestionValidationError::CorrectCount);
        }

        Ok(())
    }
}

impl Question {
    /// Inserts the question and its options atomically.
    pub async fn create_with_options(
        mm: &ModelManager,
        mooc_id: Uuid,
        data: QuestionCreate,
    ) -> DatabaseResult<(Self, Vec<QuestionOption>)> {
        let mut tx = mm.begin().await?;

        let question: Question = sqlx::query_as(
            r#"
            INSERT INTO questions (id, mooc_id, stem, qtype, difficulty)
            VALUES ($1, $2, $3, COALESCE($4, 'single_choice'), COALESCE($5, 'medium'))
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(mooc_id)
        .bind(&data.stem)
        .bind(data.qtype.as_deref())
        .bind(data.difficulty.as_deref())
        .fetch_one(&mut *tx)
        .await?;

        let mut options = Vec::with_capacity(data.options.len());
        for option in data.options {
            let row: QuestionOption = sqlx::query_as(
                r#"
                INSERT INTO question_options (id, question_id, label, content, is_correct)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING *
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(question.id)
            .bind(&option.label)
            .bind(&option.content)
            .bind(option.is_correct)
            .fetch_one(&mut *tx)
            .await?;
            options.push(row);
        }

        tx.commit().await?;
        Ok((question, options))
    }

    pub async fn count_by_mooc(mm: &ModelManager, mooc_id: Uuid) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM questions WHERE mooc_id = $1")
            .bind(mooc_id)
            .fetch_one(mm.executor())
            .await?;
        Ok(result)
    }

    /// Up to `limit` questions of the module in random order.
    pub async fn random_for_mooc(
        mm: &ModelManager,
        mooc_id: Uuid,
        limit: i64,
    ) -> DatabaseResult<Vec<Self>> {
        let result =
            sqlx::query_as("SELECT * FROM questions WHERE mooc_id = $1 ORDER BY random() LIMIT $2")
                .bind(mooc_id)
                .bind(limit)
                .fetch_all(mm.executor())
                .await?;
        Ok(result)
    }

    pub async fn find_many(mm: &ModelManager, ids: &[Uuid]) -> DatabaseResult<Vec<Self>> {
        let result = sqlx::query_as("SELECT * FROM questions WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(mm.executor())
            .await?;
        Ok(result)
    }
}

impl QuestionOption {
    /// Options of every given question, shuffled.
    pub async fn shuffled_for(mm: &ModelManager, question_ids: &[Uuid]) -> DatabaseResult<Vec<Self>> {
        let result =
            sqlx::query_as("SELECT * FROM question_options WHERE question_id = ANY($1) ORDER BY random()")
                .bind(question_ids)
                .fetch_all(mm.executor())
                .await?;
        Ok(result)
    }

    pub async fn ordered_for(mm: &ModelManager, question_ids: &[Uuid]) -> DatabaseResult<Vec<Self>> {
        let result = sqlx::query_as(
            "SELECT * FROM question_options WHERE question_id = ANY($1) ORDER BY question_id, label",
        )
        .bind(question_ids)
        .fetch_all(mm.executor())
        .await?;
        Ok(result)
    }

    /// Correct option label per question, loaded in a single query.
    pub async fn correct_labels(
        conn: &mut PgConnection,
        question_ids: &[Uuid],
    ) -> DatabaseResult<HashMap<Uuid, String>> {
        let rows: Vec<(Uuid, String)> = sqlx::query_as(
            "SELECT question_id, label FROM question_options WHERE question_id = ANY($1) AND is_correct",
        )
        .bind(question_ids)
        .fetch_all(conn)
        .await?;

        Ok(rows.into_iter().collect())
    }
}

/// Groups options by their question, keeping the input order inside each
/// group.
pub fn group_options(options: Vec<QuestionOption>) -> HashMap<Uuid, Vec<QuestionOption>> {
    let mut grouped: HashMap<Uuid, Vec<QuestionOption>> = HashMap::new();
    for option in options {
        grouped.entry(option.question_id).or_default().push(option);
    }
    grouped
}

#[cfg(test)]
mod test {
    use super::*;

    fn option(label: &str, is_correct: bool) -> QuestionOptionCreate {
        QuestionOptionCreate {
            label: label.into(),
            content: format!("answer {label}"),
            is_correct,
        }
    }

    fn question(options: Vec<QuestionOptionCreate>) -> QuestionCreate {
        QuestionCreate {
            stem: "What does the borrow checker check?".into(),
            qtype: None,
            difficulty: None,
            options,
        }
    }

    #[test]
    fn single_correct_option_is_valid() {
        let q = question(vec![option("A", true), option("B", false), option("C", false)]);
        assert_eq!(q.validate(), Ok(()));
    }

    #[test]
    fn zero_or_two_correct_options_are_rejected() {
        let none = question(vec![option("A", false), option("B", false)]);
        assert_eq!(none.validate(), Err(QuestionValidationError::CorrectCount));

        let two = question(vec![option("A", true), option("B", true)]);
        assert_eq!(two.validate(), Err(QuestionValidationError::CorrectCount));
    }

    #[test]
    fn duplicate_labels_are_rejected() {
        let q = question(vec![option("A", true), option("A", false)]);
        assert_eq!(q.validate(), Err(QuestionValidationError::BadLabels));
    }

    #[test]
    fn empty_stem_and_single_option_are_rejected() {
        let mut q = question(vec![option("A", true), option("B", false)]);
        q.stem = " ".into();
        assert_eq!(q.validate(), Err(QuestionValidationError::EmptyStem));

        let q = question(vec![option("A", true)]);
        assert_eq!(q.validate(), Err(QuestionValidationError::TooFewOptions));
    }

    #[test]
    fn options_are_grouped_by_question() {
        let (q1, q2) = (Uuid::new_v4(), Uuid::new_v4());
        let make = |question_id, label: &str| QuestionOption {
            id: Uuid::new_v4(),
            question_id,
            label: label.into(),
            content: String::new(),
            is_correct: false,
        };

        let grouped = group_options(vec![make(q1, "B"), make(q2, "A"), make(q1, "A")]);
        let labels: Vec<_> = grouped[&q1].iter().map(|o| o.label()).collect();
        assert_eq!(labels, vec!["B", "A"]);
        assert_eq!(grouped[&q2].len(), 1);
    }
}

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::ExamConfig;

#[derive(Debug, Clone, Copy)]
pub struct ExamRules {
    question_count: i64,
    duration: Duration,
    cooldown: Duration,
    passing_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, utoipa::ToSchema)]
pub struct SubmittedAnswer {
    pub question_id: Uuid,
    pub selected_option: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grade {
    pub correct_answers: i32,
    pub total_questions: i32,
    pub score: f64,
    pub passed: bool,
}

impl From<&ExamConfig> for ExamRules {
    fn from(config: &ExamConfig) -> Self {
        Self {
            question_count: config.question_count(),
            duration: Duration::minutes(config.duration_minutes()),
            cooldown: Duration::seconds(config.cooldown_seconds()),
            passing_score: config.passing_score(),
        }
    }
}

impl ExamRules {
    pub fn question_count(&self) -> i64 {
        self.question_count
    }

    pub fn duration_minutes(&self) -> i64 {
        self.duration.num_minutes()
    }

    pub fn passing_score(&self) -> f64 {
        self.passing_score
    }

    /// Number of questions an exam will contain given how many the module has.
    pub fn exam_size(&self, available: i64) -> i64 {
        available.min(self.question_count)
    }

    pub fn can_take_exam(total_lessons: i64, completed_lessons: i64) -> bool {
        total_lessons > 0 && completed_lessons >= total_lessons
    }

    /// Seconds (rounded up) the user still has to wait before starting a new
    /// attempt, `None` when the cooldown is over.
    pub fn cooldown_remaining(
        &self,
        last_started_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Option<i64> {
        let last = last_started_at?;
        let remaining = (last + self.cooldown) - now;
        let millis = remaining.num_milliseconds();
        if millis <= 0 {
            return None;
        }

        Some((millis + 999) / 1000)
    }

    pub fn expires_at(&self, started_at: DateTime<Utc>) -> DateTime<Utc> {
        started_at + self.duration
    }

    /// Whole seconds since the attempt started, never negative.
    pub fn elapsed_seconds(started_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
        (now - started_at).num_seconds().max(0)
    }

    pub fn is_time_exceeded(&self, time_taken_seconds: i64) -> bool {
        time_taken_seconds > self.duration.num_seconds()
    }

    /// Grades `answers` against the correct option label of every issued
    /// question. Answers to questions outside `issued` are ignored and only
    /// the first answer per question counts. Unanswered questions count as
    /// wrong.
    pub fn grade(
        &self,
        issued: &[Uuid],
        answers: &[SubmittedAnswer],
        correct_labels: &HashMap<Uuid, String>,
    ) -> Grade {
        let issued_set: HashSet<&Uuid> = issued.iter().collect();
        let mut seen = HashSet::new();

        let correct_answers = answers
            .iter()
            .filter(|a| issued_set.contains(&a.question_id))
            .filter(|a| seen.insert(a.question_id))
            .filter(|a| {
                correct_labels
                    .get(&a.question_id)
                    .is_some_and(|label| label == &a.selected_option)
            })
            .count() as i32;

        let total_questions = issued.len() as i32;
        let score = if total_questions == 0 {
            0.0
        } else {
            correct_answers as f64 * 100.0 / total_questions as f64
        };

        Grade {
            correct_answers,
            total_questions,
            score,
            passed: score >= self.passing_score,
        }
    }

    /// Enrollment progress (percent) once `completed` modules out of
    /// `module_count` are passed.
    pub fn progress_after(completed: i32, module_count: i64, has_next: bool) -> f64 {
        if !has_next || module_count <= 0 {
            return 100.0;
        }

        (completed as f64 * 100.0 / module_count as f64).min(100.0)
    }
}

pub fn round_score(score: f64) -> f64 {
    (score * 100.0).round() / 100.0
}

#[cfg(test)]
mod test {
    use super::*;

    fn rules() -> ExamRules {
        ExamRules::from(&ExamConfig::default())
    }

    fn answer(id: Uuid, label: &str) -> SubmittedAnswer {
        SubmittedAnswer {
            question_id: id,
            selected_option: label.to_string(),
        }
    }

    fn issued(n: usize) -> (Vec<Uuid>, HashMap<Uuid, String>) {
        let ids: Vec<Uuid> = (0..n).map(|_| Uuid::new_v4()).collect();
        let labels = ids.iter().map(|id| (*id, "A".to_string())).collect();
        (ids, labels)
    }

    #[test]
    fn score_is_percentage_of_correct_answers() {
        let (ids, labels) = issued(10);
        let answers: Vec<_> = ids
            .iter()
            .enumerate()
            .map(|(i, id)| answer(*id, if i < 7 { "A" } else { "B" }))
            .collect();

        let grade = rules().grade(&ids, &answers, &labels);
        assert_eq!(grade.correct_answers, 7);
        assert_eq!(grade.total_questions, 10);
        assert_eq!(grade.score, 70.0);
        assert!(grade.passed);
    }

    #[test]
    fn below_passing_score_fails() {
        let (ids, labels) = issued(10);
        let answers: Vec<_> = ids
            .iter()
            .enumerate()
            .map(|(i, id)| answer(*id, if i < 6 { "A" } else { "C" }))
            .collect();

        let grade = rules().grade(&ids, &answers, &labels);
        assert_eq!(grade.score, 60.0);
        assert!(!grade.passed);
    }

    #[test]
    fn unanswered_questions_count_as_wrong() {
        let (ids, labels) = issued(4);
        let answers = vec![answer(ids[0], "A"), answer(ids[1], "A")];

        let grade = rules().grade(&ids, &answers, &labels);
        assert_eq!(grade.correct_answers, 2);
        assert_eq!(grade.score, 50.0);
    }

    #[test]
    fn foreign_and_duplicate_answers_are_ignored() {
        let (ids, labels) = issued(2);
        let answers = vec![
            answer(ids[0], "B"),
            answer(ids[0], "A"),
            answer(Uuid::new_v4(), "A"),
            answer(ids[1], "A"),
        ];

        let grade = rules().grade(&ids, &answers, &labels);
        assert_eq!(grade.correct_answers, 1);
        assert_eq!(grade.score, 50.0);
    }

    #[test]
    fn empty_exam_scores_zero() {
        let grade = rules().grade(&[], &[], &HashMap::new());
        assert_eq!(grade.score, 0.0);
        assert!(!grade.passed);
    }

    #[test]
    fn question_without_correct_option_never_matches() {
        let ids = vec![Uuid::new_v4()];
        let grade = rules().grade(&ids, &[answer(ids[0], "A")], &HashMap::new());
        assert_eq!(grade.correct_answers, 0);
    }

    #[test]
    fn cooldown_blocks_recent_attempt() {
        let now = Utc::now();
        let last = now - Duration::seconds(100);
        assert_eq!(rules().cooldown_remaining(Some(last), now), Some(200));
    }

    #[test]
    fn cooldown_rounds_up_partial_seconds() {
        let now = Utc::now();
        let last = now - Duration::milliseconds(299_500);
        assert_eq!(rules().cooldown_remaining(Some(last), now), Some(1));
    }

    #[test]
    fn cooldown_is_over_after_window() {
        let now = Utc::now();
        assert_eq!(rules().cooldown_remaining(None, now), None);
        assert_eq!(
            rules().cooldown_remaining(Some(now - Duration::seconds(300)), now),
            None
        );
    }

    #[test]
    fn time_limit_is_twenty_minutes() {
        let rules = rules();
        assert!(!rules.is_time_exceeded(1200));
        assert!(rules.is_time_exceeded(1201));

        let started = Utc::now();
        assert_eq!(rules.expires_at(started) - started, Duration::minutes(20));
    }

    #[test]
    fn elapsed_seconds_floors_and_clamps() {
        let now = Utc::now();
        assert_eq!(
            ExamRules::elapsed_seconds(now - Duration::milliseconds(1_999), now),
            1
        );
        assert_eq!(ExamRules::elapsed_seconds(now + Duration::seconds(5), now), 0);
    }

    #[test]
    fn exam_size_is_capped() {
        assert_eq!(rules().exam_size(25), 10);
        assert_eq!(rules().exam_size(3), 3);
    }

    #[test]
    fn exam_requires_every_lesson() {
        assert!(ExamRules::can_take_exam(3, 3));
        assert!(!ExamRules::can_take_exam(3, 2));
        assert!(!ExamRules::can_take_exam(0, 0));
    }

    #[test]
    fn progress_after_pass() {
        assert_eq!(ExamRules::progress_after(1, 4, true), 25.0);
        assert_eq!(ExamRules::progress_after(4, 4, false), 100.0);
    }

    #[test]
    fn scores_round_to_two_decimals() {
        assert_eq!(round_score(200.0 / 3.0), 66.67);
        assert_eq!(round_score(70.0), 70.0);
    }
}

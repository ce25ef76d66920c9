//! Score weighting, per-student components, letter grades, and GPA.
//!
//! A score configuration splits 100 points across four components. Each
//! student's component score is bounded by that component's weight, so the
//! total is already out of 100.

use serde::{Deserialize, Serialize};

/// Score session status IDs matching `score_session_statuses` seed data.
pub const SCORE_SESSION_DRAFT: i16 = 1;
pub const SCORE_SESSION_SUBMITTED: i16 = 2;
pub const SCORE_SESSION_APPROVED: i16 = 3;
pub const SCORE_SESSION_REJECTED: i16 = 4;

const WEIGHT_TOLERANCE: f64 = 1e-6;

/// Percentage split between the four graded components.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub attendance: f64,
    pub assignment: f64,
    pub midterm: f64,
    pub final_exam: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            attendance: 10.0,
            assignment: 20.0,
            midterm: 30.0,
            final_exam: 40.0,
        }
    }
}

impl ScoreWeights {
    pub fn total(&self) -> f64 {
        self.attendance + self.assignment + self.midterm + self.final_exam
    }

    /// Each weight must be within `0..=100` and together they must be 100.
    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("attendance", self.attendance),
            ("assignment", self.assignment),
            ("midterm", self.midterm),
            ("final", self.final_exam),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(format!(
                    "The {name} percentage must be between 0 and 100, got {value}"
                ));
            }
        }
        let total = self.total();
        if (total - 100.0).abs() > WEIGHT_TOLERANCE {
            return Err(format!(
                "Score percentages must add up to exactly 100%. Current total: {total}%"
            ));
        }
        Ok(())
    }
}

/// Component scores for one student, each already scaled to its weight.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScoreComponents {
    pub attendance: f64,
    pub assignment: f64,
    pub midterm: f64,
    pub final_exam: f64,
}

impl ScoreComponents {
    pub fn total(&self) -> f64 {
        round_to(
            self.attendance + self.assignment + self.midterm + self.final_exam,
            2,
        )
    }

    /// Reject any component outside `0..=weight`.
    pub fn validate_against(&self, weights: &ScoreWeights) -> Result<(), String> {
        for (name, value, max) in [
            ("attendance", self.attendance, weights.attendance),
            ("assignment", self.assignment, weights.assignment),
            ("midterm", self.midterm, weights.midterm),
            ("final", self.final_exam, weights.final_exam),
        ] {
            validate_component(name, value, max)?;
        }
        Ok(())
    }
}

pub fn validate_component(name: &str, value: f64, max: f64) -> Result<(), String> {
    if !(0.0..=max).contains(&value) {
        return Err(format!(
            "The {name} score must be between 0 and {max}, got {value}"
        ));
    }
    Ok(())
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Attendance component earned from finalized sessions.
///
/// Students with no finalized sessions yet keep the full weight.
pub fn attendance_points(weight: f64, attended: i64, finalized: i64) -> f64 {
    if finalized <= 0 {
        return weight;
    }
    round_to(weight * attended as f64 / finalized as f64, 1)
}

/// Letter grade for a total out of 100.
pub fn letter_grade(total: f64) -> &'static str {
    match total {
        t if t >= 95.0 => "A+",
        t if t >= 90.0 => "A",
        t if t >= 85.0 => "A-",
        t if t >= 80.0 => "B+",
        t if t >= 75.0 => "B",
        t if t >= 70.0 => "B-",
        t if t >= 65.0 => "C+",
        t if t >= 60.0 => "C",
        t if t >= 55.0 => "C-",
        t if t >= 50.0 => "D",
        _ => "F",
    }
}

/// Grade points on a 4.0 scale.
pub fn grade_points(letter: &str) -> f64 {
    match letter.to_ascii_uppercase().as_str() {
        "A+" | "A" => 4.0,
        "A-" => 3.7,
        "B+" => 3.3,
        "B" => 3.0,
        "B-" => 2.7,
        "C+" => 2.3,
        "C" => 2.0,
        "C-" => 1.7,
        "D+" => 1.3,
        "D" => 1.0,
        "D-" => 0.7,
        _ => 0.0,
    }
}

pub fn is_passing(letter: &str) -> bool {
    !letter.eq_ignore_ascii_case("F")
}

/// Credit-weighted GPA over `(grade_points, credits)` pairs.
pub fn gpa<I>(courses: I) -> f64
where
    I: IntoIterator<Item = (f64, i32)>,
{
    let (weighted, credits) = courses
        .into_iter()
        .fold((0.0, 0i64), |(sum, creds), (points, c)| {
            (sum + points * f64::from(c), creds + i64::from(c))
        });
    if credits == 0 {
        return 0.0;
    }
    round_to(weighted / credits as f64, 2)
}

pub fn academic_standing(gpa: f64) -> &'static str {
    match gpa {
        g if g >= 3.5 => "Dean's List",
        g if g >= 3.0 => "Good Standing",
        g if g >= 2.0 => "Satisfactory",
        g if g >= 1.0 => "Academic Warning",
        _ => "Academic Probation",
    }
}

pub mod state_machine {
    use super::*;

    /// Status IDs reachable from `from_status`. Approved is terminal.
    pub fn valid_transitions(from_status: i16) -> &'static [i16] {
        match from_status {
            SCORE_SESSION_DRAFT => &[SCORE_SESSION_SUBMITTED],
            SCORE_SESSION_SUBMITTED => &[SCORE_SESSION_APPROVED, SCORE_SESSION_REJECTED],
            SCORE_SESSION_REJECTED => &[SCORE_SESSION_DRAFT],
            _ => &[],
        }
    }

    pub fn validate_transition(from: i16, to: i16) -> Result<(), String> {
        if from == to || valid_transitions(from).contains(&to) {
            Ok(())
        } else {
            Err(format!(
                "Invalid score session transition: {} -> {}",
                status_name(from),
                status_name(to)
            ))
        }
    }

    /// Only draft sessions accept score edits.
    pub fn is_editable(status_id: i16) -> bool {
        status_id == SCORE_SESSION_DRAFT
    }

    fn status_name(id: i16) -> &'static str {
        match id {
            SCORE_SESSION_DRAFT => "Draft",
            SCORE_SESSION_SUBMITTED => "Submitted",
            SCORE_SESSION_APPROVED => "Approved",
            SCORE_SESSION_REJECTED => "Rejected",
            _ => "Unknown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::state_machine::*;
    use super::*;

    #[test]
    fn default_weights_are_valid() {
        let weights = ScoreWeights::default();
        assert_eq!(weights.total(), 100.0);
        assert!(weights.validate().is_ok());
    }

    #[test]
    fn weights_must_sum_to_hundred() {
        let weights = ScoreWeights {
            attendance: 10.0,
            assignment: 20.0,
            midterm: 30.0,
            final_exam: 30.0,
        };
        let err = weights.validate().unwrap_err();
        assert_eq!(
            err,
            "Score percentages must add up to exactly 100%. Current total: 90%"
        );
    }

    #[test]
    fn negative_weight_rejected() {
        let weights = ScoreWeights {
            attendance: -10.0,
            assignment: 40.0,
            midterm: 30.0,
            final_exam: 40.0,
        };
        assert!(weights.validate().unwrap_err().contains("attendance"));
    }

    #[test]
    fn components_bounded_by_weight() {
        let weights = ScoreWeights::default();
        let ok = ScoreComponents {
            attendance: 10.0,
            assignment: 18.5,
            midterm: 0.0,
            final_exam: 40.0,
        };
        assert!(ok.validate_against(&weights).is_ok());
        assert_eq!(ok.total(), 68.5);

        let over = ScoreComponents {
            midterm: 31.0,
            ..ok
        };
        assert!(over.validate_against(&weights).unwrap_err().contains("midterm"));
    }

    #[test]
    fn attendance_points_scale_to_weight() {
        assert_eq!(attendance_points(10.0, 0, 0), 10.0);
        assert_eq!(attendance_points(10.0, 2, 3), 6.7);
        assert_eq!(attendance_points(10.0, 4, 4), 10.0);
        assert_eq!(attendance_points(20.0, 0, 5), 0.0);
    }

    #[test]
    fn letter_grade_boundaries() {
        assert_eq!(letter_grade(100.0), "A+");
        assert_eq!(letter_grade(90.0), "A");
        assert_eq!(letter_grade(79.99), "B");
        assert_eq!(letter_grade(50.0), "D");
        assert_eq!(letter_grade(49.9), "F");
    }

    #[test]
    fn grade_points_scale() {
        assert_eq!(grade_points("A+"), 4.0);
        assert_eq!(grade_points("b-"), 2.7);
        assert_eq!(grade_points("D-"), 0.7);
        assert_eq!(grade_points("F"), 0.0);
        assert!(!is_passing("F"));
        assert!(is_passing("D"));
    }

    #[test]
    fn gpa_is_credit_weighted() {
        assert_eq!(gpa(vec![(4.0, 3), (2.0, 1)]), 3.5);
        assert_eq!(gpa(Vec::new()), 0.0);
    }

    #[test]
    fn standing_thresholds() {
        assert_eq!(academic_standing(3.5), "Dean's List");
        assert_eq!(academic_standing(3.2), "Good Standing");
        assert_eq!(academic_standing(2.0), "Satisfactory");
        assert_eq!(academic_standing(1.5), "Academic Warning");
        assert_eq!(academic_standing(0.5), "Academic Probation");
    }

    #[test]
    fn session_transitions() {
        assert!(validate_transition(SCORE_SESSION_DRAFT, SCORE_SESSION_SUBMITTED).is_ok());
        assert!(validate_transition(SCORE_SESSION_SUBMITTED, SCORE_SESSION_APPROVED).is_ok());
        assert!(validate_transition(SCORE_SESSION_REJECTED, SCORE_SESSION_DRAFT).is_ok());
        assert!(validate_transition(SCORE_SESSION_DRAFT, SCORE_SESSION_APPROVED).is_err());
        assert!(validate_transition(SCORE_SESSION_APPROVED, SCORE_SESSION_DRAFT).is_err());
        assert!(validate_transition(SCORE_SESSION_DRAFT, SCORE_SESSION_DRAFT).is_ok());
    }

    #[test]
    fn only_draft_is_editable() {
        assert!(is_editable(SCORE_SESSION_DRAFT));
        assert!(!is_editable(SCORE_SESSION_SUBMITTED));
    }
}

//! Final grading and recommendation.

use serde::Serialize;

use crate::scoring::profile::SCHOOL_STRICT_RADIUS_M;

/// Discrete suitability grade. `Veto` overrides the numeric score
/// whenever the policy-risk category recorded any hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Grade {
    SPlus,
    A,
    B,
    C,
    D,
    Veto,
}

impl Grade {
    /// Short code stored in the summary CSV.
    pub fn code(self) -> &'static str {
        match self {
            Self::SPlus => "S+",
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
            Self::Veto => "F",
        }
    }
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Map a total score to a grade/recommendation pair. The policy-risk
/// override comes first; band lower bounds are inclusive.
pub fn classify(total_score: f64, policy_risk_count: u32) -> (Grade, String) {
    if policy_risk_count > 0 {
        return (
            Grade::Veto,
            format!(
                "Regulatory veto: {policy_risk_count} primary/secondary school(s) inside the \
                 {SCHOOL_STRICT_RADIUS_M} m protection radius. Do not proceed."
            ),
        );
    }

    let (grade, recommendation) = if total_score >= 180.0 {
        (
            Grade::SPlus,
            "Landmark location with top-tier footfall and spending power; secure it at almost any cost.",
        )
    } else if total_score >= 120.0 {
        (
            Grade::A,
            "Precise audience and mature supporting businesses; an ideal choice with a very high success rate.",
        )
    } else if total_score >= 70.0 {
        (
            Grade::B,
            "Carries one strong anchor such as a campus or a large residential base; operations can cover the gaps.",
        )
    } else if total_score >= 40.0 {
        (
            Grade::C,
            "Visible shortfalls in footfall or the supporting mix; survey the target audience before committing.",
        )
    } else {
        (
            Grade::D,
            "No core footfall anchor and an immature commercial environment; not recommended.",
        )
    };

    (grade, recommendation.to_string())
}

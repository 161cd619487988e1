use serde::{Deserialize, Serialize};

use crate::problem::ProblemSummary;

/// Which session groups go first among course-batches of equal priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Approach {
    #[default]
    Balanced,
    TheoryFirst,
    LabsFirst,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StrategyHint {
    pub approach: Approach,
    /// Scan theory hours from the start of the day. Off scans afternoon first.
    pub morning_theory: bool,
}

impl Default for StrategyHint {
    fn default() -> Self {
        Self {
            approach: Approach::Balanced,
            morning_theory: true,
        }
    }
}

impl StrategyHint {
    /// Every hint combination, default first.
    pub fn all() -> Vec<StrategyHint> {
        let mut hints = Vec::with_capacity(6);
        for morning_theory in [true, false] {
            for approach in [Approach::Balanced, Approach::TheoryFirst, Approach::LabsFirst] {
                hints.push(StrategyHint {
                    approach,
                    morning_theory,
                });
            }
        }
        hints
    }
}

/// Source of strategy hints, e.g. a heuristic or a generative model.
pub trait StrategyAdvisor {
    fn suggest_strategy(&self, summary: &ProblemSummary) -> StrategyHint;
}

/// Always answers with the default hint.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultAdvisor;

impl StrategyAdvisor for DefaultAdvisor {
    fn suggest_strategy(&self, _summary: &ProblemSummary) -> StrategyHint {
        StrategyHint::default()
    }
}

/// Always answers with the same hint.
#[derive(Debug, Clone, Copy)]
pub struct FixedAdvisor(pub StrategyHint);

impl StrategyAdvisor for FixedAdvisor {
    fn suggest_strategy(&self, _summary: &ProblemSummary) -> StrategyHint {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn default_hint_is_balanced_morning() {
        let hint = StrategyHint::default();
        assert_eq!(hint.approach, Approach::Balanced);
        assert!(hint.morning_theory);
        assert_eq!(StrategyHint::all()[0], hint);
        assert_eq!(StrategyHint::all().len(), 6);
    }

    #[test]
    fn partial_hint_deserializes_with_defaults() {
        let hint: StrategyHint = serde_json::from_value(json!({ "approach": "labsFirst" })).unwrap();
        assert_eq!(hint.approach, Approach::LabsFirst);
        assert!(hint.morning_theory);
    }
}

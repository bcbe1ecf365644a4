use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Outcome of a step, an assessment, or a whole control evaluation.
///
/// Only `Passed`, `NeedsReview`, `Unknown` and `Failed` take part in aggregation, ranked
/// `Failed > Unknown > NeedsReview > Passed`. `NotRun` is the value before anything executed
/// and `NotApplicable` is assigned directly when applicability filtering excludes an
/// assessment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum Outcome {
    #[default]
    #[serde(rename = "Not Run")]
    NotRun,
    #[serde(rename = "Passed")]
    Passed,
    #[serde(rename = "Needs Review")]
    NeedsReview,
    #[serde(rename = "Unknown")]
    Unknown,
    #[serde(rename = "Failed")]
    Failed,
    #[serde(rename = "Not Applicable")]
    NotApplicable,
}

impl Outcome {
    pub const ALL: [Outcome; 6] = [
        Outcome::NotRun,
        Outcome::Passed,
        Outcome::NeedsReview,
        Outcome::Unknown,
        Outcome::Failed,
        Outcome::NotApplicable,
    ];

    /// Stable token used in every structured output format.
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::NotRun => "Not Run",
            Outcome::Passed => "Passed",
            Outcome::NeedsReview => "Needs Review",
            Outcome::Unknown => "Unknown",
            Outcome::Failed => "Failed",
            Outcome::NotApplicable => "Not Applicable",
        }
    }

    /// Combine a running outcome with the next one. See [`aggregate`].
    #[must_use]
    pub fn aggregate(self, next: Outcome) -> Outcome {
        aggregate(self, next)
    }

    pub fn is_failed(self) -> bool {
        self == Outcome::Failed
    }
}

/// Return the more severe of two outcomes.
///
/// `Failed` wins over everything, then `Unknown`, then `NeedsReview`; anything else collapses
/// to `Passed`. That last arm is why a `NotRun` accumulator behaves exactly like `Passed` on
/// the first call.
pub fn aggregate(previous: Outcome, next: Outcome) -> Outcome {
    use Outcome::{Failed, NeedsReview, Passed, Unknown};

    if previous == Failed || next == Failed {
        return Failed;
    }
    if previous == Unknown || next == Unknown {
        return Unknown;
    }
    if previous == NeedsReview || next == NeedsReview {
        return NeedsReview;
    }
    Passed
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown outcome token: {0:?}")]
pub struct ParseOutcomeError(pub String);

impl FromStr for Outcome {
    type Err = ParseOutcomeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Outcome::ALL
            .into_iter()
            .find(|o| o.as_str() == s)
            .ok_or_else(|| ParseOutcomeError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Outcome::*;

    const RANKED: [Outcome; 4] = [Passed, NeedsReview, Unknown, Failed];

    #[test]
    fn aggregate_follows_dominance_order() {
        for (i, a) in RANKED.iter().enumerate() {
            for (j, b) in RANKED.iter().enumerate() {
                let expected = RANKED[i.max(j)];
                assert_eq!(aggregate(*a, *b), expected, "{a} + {b}");
                assert_eq!(aggregate(*b, *a), expected, "{b} + {a}");
            }
        }
    }

    #[test]
    fn not_run_accumulator_behaves_like_passed() {
        for next in RANKED {
            assert_eq!(aggregate(NotRun, next), aggregate(Passed, next));
        }
        assert_eq!(aggregate(NotRun, NotRun), Passed);
    }

    #[test]
    fn not_applicable_never_escapes_aggregation() {
        assert_eq!(aggregate(NotApplicable, NotApplicable), Passed);
        assert_eq!(aggregate(NotApplicable, Unknown), Unknown);
    }

    #[test]
    fn serializes_to_stable_tokens() {
        assert_eq!(
            serde_json::to_string(&NeedsReview).unwrap(),
            "\"Needs Review\""
        );
        assert_eq!(
            serde_json::to_string(&NotApplicable).unwrap(),
            "\"Not Applicable\""
        );
        let back: Outcome = serde_json::from_str("\"Failed\"").unwrap();
        assert_eq!(back, Failed);
    }

    #[test]
    fn parses_display_tokens() {
        for o in Outcome::ALL {
            assert_eq!(o.to_string().parse::<Outcome>().unwrap(), o);
        }
        assert!("needs review".parse::<Outcome>().is_err());
    }
}

//! Results for operations with best-effort side effects.
//!
//! Several operations have a primary effect that must succeed (persisting a score) and one or
//! more follow-up effects that are allowed to fail (updating the search projection, dropping a
//! cached payload). A primary failure is reported through the surrounding `Result`; a side-effect
//! failure is carried in [`Outcome::Degraded`] so callers and tests can see both independently.

use crate::CoreError;

/// A side effect that failed after the primary operation succeeded.
#[derive(Debug)]
pub struct SideEffectFailure {
    /// Short name of the side effect, e.g. `search_projection`.
    pub effect: &'static str,
    pub error: CoreError,
}

#[derive(Debug)]
pub enum Outcome<T> {
    /// The primary operation and every side effect succeeded
    Complete(T),
    /// The primary operation succeeded, at least one side effect did not
    Degraded {
        value: T,
        side_effects: Vec<SideEffectFailure>,
    },
}

impl<T> Outcome<T> {
    /// Build an outcome from a value and the side-effect failures collected while producing it.
    pub fn from_parts(value: T, side_effects: Vec<SideEffectFailure>) -> Self {
        if side_effects.is_empty() {
            Outcome::Complete(value)
        } else {
            Outcome::Degraded {
                value,
                side_effects,
            }
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Outcome::Complete(_))
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Outcome::Degraded { .. })
    }

    pub fn value(&self) -> &T {
        match self {
            Outcome::Complete(value) | Outcome::Degraded { value, .. } => value,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            Outcome::Complete(value) | Outcome::Degraded { value, .. } => value,
        }
    }

    pub fn side_effects(&self) -> &[SideEffectFailure] {
        match self {
            Outcome::Complete(_) => &[],
            Outcome::Degraded { side_effects, .. } => side_effects,
        }
    }

    /// Names of the failed side effects, in the order they were attempted.
    pub fn failed_effects(&self) -> Vec<&'static str> {
        self.side_effects().iter().map(|f| f.effect).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_parts_without_failures_is_complete() {
        let outcome = Outcome::from_parts(1.5_f64, Vec::new());
        assert!(outcome.is_complete());
        assert_eq!(*outcome.value(), 1.5);
        assert!(outcome.failed_effects().is_empty());
    }

    #[test]
    fn test_degraded_keeps_value_and_failures() {
        let outcome = Outcome::from_parts(
            7_i64,
            vec![SideEffectFailure {
                effect: "search_projection",
                error: CoreError::Internal {
                    message: "index down".to_string(),
                },
            }],
        );

        assert!(outcome.is_degraded());
        assert_eq!(outcome.failed_effects(), vec!["search_projection"]);
        assert_eq!(outcome.into_value(), 7);
    }
}

// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::time::{Duration, Instant};

/// Recommended number of allowed node expansions in
/// [find_shortest_route](crate::find_shortest_route) and
/// [find_waypoints](crate::find_waypoints) before
/// [SearchError::StepLimitExceeded] is returned.
pub const DEFAULT_STEP_LIMIT: usize = 1_000_000;

/// Error conditions which may occur during [find_shortest_route](crate::find_shortest_route)
/// or [find_waypoints](crate::find_waypoints).
///
/// An exhausted budget is deliberately distinct from "no route found":
/// the caller must be able to tell an aborted search apart from a
/// genuinely disconnected pair of nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SearchError {
    /// The start or end nodes don't exist in the graph's point index.
    #[error("invalid node: {0}")]
    InvalidReference(i64),

    /// Search has exceeded its limit of steps.
    /// Either the nodes are really far apart, or no route exists.
    ///
    /// Concluding that no route exists requires traversing the whole graph,
    /// which can result in a denial-of-service. The step limit protects
    /// against resource exhaustion.
    #[error("step limit exceeded")]
    StepLimitExceeded,

    /// Search has run past the caller's deadline.
    #[error("time limit exceeded")]
    TimeLimitExceeded,
}

/// Caller-supplied bound on a single search call: a step limit and,
/// optionally, a wall-clock deadline. Search cost is graph-shape-dependent
/// and unbounded on pathological inputs, so every query carries a budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchBudget {
    pub step_limit: usize,
    pub deadline: Option<Instant>,
}

impl Default for SearchBudget {
    fn default() -> Self {
        Self {
            step_limit: DEFAULT_STEP_LIMIT,
            deadline: None,
        }
    }
}

impl SearchBudget {
    /// A budget limited to the given number of expansion steps.
    pub fn steps(step_limit: usize) -> Self {
        Self {
            step_limit,
            deadline: None,
        }
    }

    /// Adds a wall-clock limit, counted from now, to this budget.
    pub fn with_time_limit(self, limit: Duration) -> Self {
        Self {
            deadline: Some(Instant::now() + limit),
            ..self
        }
    }

    /// Charges one expansion step against the budget.
    pub(super) fn charge(&self, steps: &mut usize) -> Result<(), SearchError> {
        *steps += 1;
        if *steps > self.step_limit {
            return Err(SearchError::StepLimitExceeded);
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(SearchError::TimeLimitExceeded);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_budget_has_no_deadline() {
        let budget = SearchBudget::default();
        assert_eq!(budget.step_limit, DEFAULT_STEP_LIMIT);
        assert_eq!(budget.deadline, None);
    }

    #[test]
    fn steps_are_charged_until_exhausted() {
        let budget = SearchBudget::steps(2);
        let mut steps = 0;
        assert_eq!(budget.charge(&mut steps), Ok(()));
        assert_eq!(budget.charge(&mut steps), Ok(()));
        assert_eq!(budget.charge(&mut steps), Err(SearchError::StepLimitExceeded));
    }

    #[test]
    fn elapsed_deadline_aborts() {
        let budget = SearchBudget::default().with_time_limit(Duration::ZERO);
        let mut steps = 0;
        assert_eq!(budget.charge(&mut steps), Err(SearchError::TimeLimitExceeded));
    }
}

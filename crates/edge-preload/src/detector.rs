//! Tracks whether a mounted page's variables changed since mount.
//!
//! The first observation after mount only establishes the baseline, so the
//! initial render never introduces a boundary that the server markup lacks.
//! Later updates flip the detector to `Changed` for the rest of the mount.

use edge_core::QueryVariables;

/// How later observations are compared against the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChangeDetection {
    /// Any recompute of the variables counts as a change, even when the new
    /// value equals the old one. Recomputes are keyed by route revision.
    #[default]
    Identity,
    /// Only a recompute producing different values counts as a change.
    Structural,
}

/// Detector state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DetectorState {
    /// Nothing observed since mount.
    #[default]
    Pending,
    /// Baseline observed, no update since.
    Unchanged,
    /// Variables updated after the baseline. Sticky.
    Changed,
}

/// Variable-change state machine for one mounted instance.
#[derive(Debug, Clone, Default)]
pub struct VariableChangeDetector {
    mode: ChangeDetection,
    state: DetectorState,
    last: Option<(u64, QueryVariables)>,
}

impl VariableChangeDetector {
    /// Create a detector in `Pending`.
    pub fn new(mode: ChangeDetection) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    /// Record the variables computed for `revision`.
    pub fn observe(&mut self, revision: u64, variables: &QueryVariables) -> DetectorState {
        let updated = match &self.last {
            None => false,
            Some((last_revision, last_variables)) => {
                revision != *last_revision
                    && (self.mode == ChangeDetection::Identity || variables != last_variables)
            }
        };

        let next = match (self.state, updated) {
            (DetectorState::Pending, _) => DetectorState::Unchanged,
            (DetectorState::Unchanged, true) => DetectorState::Changed,
            (state, _) => state,
        };
        if next != self.state {
            tracing::debug!(
                from = ?self.state,
                to = ?next,
                revision,
                "variable change detector transition"
            );
            self.state = next;
        }

        if self.last.as_ref().map(|(r, _)| *r) != Some(revision) {
            self.last = Some((revision, variables.clone()));
        }
        self.state
    }

    /// Current state.
    pub fn state(&self) -> DetectorState {
        self.state
    }

    /// Whether the variables changed. `Pending` reads as unchanged.
    pub fn has_changed(&self) -> bool {
        self.state == DetectorState::Changed
    }

    /// Comparison mode.
    pub fn mode(&self) -> ChangeDetection {
        self.mode
    }
}

#[cfg(test)]
mod tests {
    use edge_core::variables;

    use super::*;

    fn vars(id: &str) -> QueryVariables {
        QueryVariables::new().with_slot("home", variables([("id", id)]))
    }

    // === Identity Mode Tests ===

    #[test]
    fn test_pending_reads_unchanged() {
        let detector = VariableChangeDetector::default();

        assert_eq!(detector.state(), DetectorState::Pending);
        assert!(!detector.has_changed());
    }

    #[test]
    fn test_first_observation_is_baseline() {
        let mut detector = VariableChangeDetector::default();

        assert_eq!(detector.observe(0, &vars("7")), DetectorState::Unchanged);
        assert!(!detector.has_changed());
    }

    #[test]
    fn test_rerender_same_revision_stays_unchanged() {
        let mut detector = VariableChangeDetector::default();
        detector.observe(3, &vars("7"));

        assert_eq!(detector.observe(3, &vars("7")), DetectorState::Unchanged);
    }

    #[test]
    fn test_new_revision_changes() {
        let mut detector = VariableChangeDetector::default();
        detector.observe(0, &vars("7"));

        assert_eq!(detector.observe(1, &vars("8")), DetectorState::Changed);
        assert!(detector.has_changed());
    }

    #[test]
    fn test_identity_counts_equal_values_as_change() {
        let mut detector = VariableChangeDetector::new(ChangeDetection::Identity);
        detector.observe(0, &vars("7"));

        assert_eq!(detector.observe(1, &vars("7")), DetectorState::Changed);
    }

    #[test]
    fn test_changed_is_sticky() {
        let mut detector = VariableChangeDetector::default();
        detector.observe(0, &vars("7"));
        detector.observe(1, &vars("8"));

        assert_eq!(detector.observe(1, &vars("8")), DetectorState::Changed);
        assert_eq!(detector.observe(2, &vars("7")), DetectorState::Changed);
        assert!(detector.has_changed());
    }

    // === Structural Mode Tests ===

    #[test]
    fn test_structural_ignores_equal_values() {
        let mut detector = VariableChangeDetector::new(ChangeDetection::Structural);
        detector.observe(0, &vars("7"));

        assert_eq!(detector.observe(1, &vars("7")), DetectorState::Unchanged);
        assert_eq!(detector.observe(2, &vars("8")), DetectorState::Changed);
    }
}

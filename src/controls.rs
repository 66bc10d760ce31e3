//! Search tuning knobs shared by the service and its binaries.

/// Bounds applied to semantic similarity lookups.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchControls {
    match_threshold: f64,
    match_count: i32,
}

impl SearchControls {
    /// Constructs controls, clamping the threshold into `[0, 1]` and the
    /// result cap to at least one row.
    pub fn new(match_threshold: f64, match_count: i32) -> Self {
        Self {
            match_threshold: match_threshold.clamp(0.0, 1.0),
            match_count: match_count.max(1),
        }
    }

    /// Minimum similarity for a row to be included.
    pub fn match_threshold(&self) -> f64 {
        self.match_threshold
    }

    /// Maximum rows requested from the index.
    pub fn match_count(&self) -> i32 {
        self.match_count
    }
}

impl Default for SearchControls {
    fn default() -> Self {
        Self {
            match_threshold: 0.3,
            match_count: 20,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn defaults_match_deployment_policy() {
        let controls = SearchControls::default();
        assert_relative_eq!(controls.match_threshold(), 0.3);
        assert_eq!(controls.match_count(), 20);
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let controls = SearchControls::new(1.7, 0);
        assert_relative_eq!(controls.match_threshold(), 1.0);
        assert_eq!(controls.match_count(), 1);

        let controls = SearchControls::new(-0.5, -3);
        assert_relative_eq!(controls.match_threshold(), 0.0);
        assert_eq!(controls.match_count(), 1);
    }
}

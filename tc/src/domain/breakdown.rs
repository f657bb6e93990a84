//! Derived step counts, recomputed on every finalize

use serde::{Deserialize, Serialize};

use super::step::{LeafType, MicroStep};

/// Aggregate counts over a task's current micro-steps
///
/// Never stored or mutated independently; always rebuilt from the step list
/// so `total_steps == digital + human + unknown` holds by construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breakdown {
    pub total_steps: usize,
    pub digital_count: usize,
    pub human_count: usize,
    pub unknown_count: usize,
    pub total_minutes: u32,
}

impl Breakdown {
    /// Recompute from the current step list
    pub fn from_steps(steps: &[MicroStep]) -> Self {
        let mut breakdown = Self {
            total_steps: steps.len(),
            ..Self::default()
        };
        for step in steps {
            match step.leaf_type {
                LeafType::Digital => breakdown.digital_count += 1,
                LeafType::Human => breakdown.human_count += 1,
                LeafType::Unknown => breakdown.unknown_count += 1,
            }
            breakdown.total_minutes += u32::from(step.estimated_minutes);
        }
        breakdown
    }

    /// The clarification signal: any step still UNKNOWN
    pub fn needs_clarification(&self) -> bool {
        self.unknown_count > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_add_up() {
        let mut steps = vec![
            MicroStep::new("t", 1, "a"),
            MicroStep::new("t", 2, "b"),
            MicroStep::new("t", 3, "c"),
        ];
        steps[0].leaf_type = LeafType::Digital;
        steps[0].estimated_minutes = 0;
        steps[1].leaf_type = LeafType::Human;
        steps[1].estimated_minutes = 4;

        let b = Breakdown::from_steps(&steps);
        assert_eq!(b.total_steps, 3);
        assert_eq!(b.digital_count, 1);
        assert_eq!(b.human_count, 1);
        assert_eq!(b.unknown_count, 1);
        assert_eq!(b.total_steps, b.digital_count + b.human_count + b.unknown_count);
        assert_eq!(b.total_minutes, 9);
        assert!(b.needs_clarification());
    }

    #[test]
    fn test_empty_steps() {
        let b = Breakdown::from_steps(&[]);
        assert_eq!(b.total_steps, 0);
        assert!(!b.needs_clarification());
    }
}

//! Per-cycle tally of vetoed candidates, grouped by the critic and
//! reason that rejected them. Feeds the diagnostics when a whole cycle
//! produces no legal trajectory.

use std::collections::HashMap;

use crate::critics::CriticVeto;

#[derive(Debug, Default)]
pub struct IllegalTrajectoryTracker {
    counts: HashMap<CriticVeto, u32>,
    legal_count: u32,
    illegal_count: u32,
}

impl IllegalTrajectoryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_illegal_trajectory(&mut self, veto: &CriticVeto) {
        *self.counts.entry(veto.clone()).or_insert(0) += 1;
        self.illegal_count += 1;
    }

    pub fn add_legal_trajectory(&mut self) {
        self.legal_count += 1;
    }

    pub fn legal_count(&self) -> u32 {
        self.legal_count
    }

    pub fn illegal_count(&self) -> u32 {
        self.illegal_count
    }

    pub fn count_for(&self, veto: &CriticVeto) -> u32 {
        self.counts.get(veto).copied().unwrap_or(0)
    }

    /// Share of all evaluated candidates rejected for this exact reason,
    /// in [0, 1].
    pub fn rejection_rate(&self, veto: &CriticVeto) -> f32 {
        let total = self.legal_count + self.illegal_count;
        if total == 0 {
            return 0.0;
        }
        self.count_for(veto) as f32 / total as f32
    }

    /// Human-readable breakdown, worst offender first.
    pub fn get_message(&self) -> String {
        let total = self.legal_count + self.illegal_count;
        if total == 0 {
            return "no trajectories evaluated".to_string();
        }

        let mut entries: Vec<(&CriticVeto, u32)> =
            self.counts.iter().map(|(v, c)| (v, *c)).collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

        let mut message = format!(
            "{} of {} trajectories were illegal",
            self.illegal_count, total
        );
        for (veto, count) in entries {
            let percent = 100.0 * count as f32 / total as f32;
            message.push_str(&format!(
                "; {:.1}% {}: {}",
                percent, veto.critic, veto.reason
            ));
        }
        message
    }

    pub fn reset(&mut self) {
        self.counts.clear();
        self.legal_count = 0;
        self.illegal_count = 0;
    }
}

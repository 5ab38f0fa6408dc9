//! API request/response models

use serde::{Deserialize, Serialize};

use crate::pipeline::MatchResult;

/// Response payload for a comparison request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareResponse {
    /// Human-readable result lines, one per matched window
    pub matches: Vec<String>,

    /// Structured match data for UI consumers
    pub results: Vec<MatchResult>,

    pub total: usize,
}

impl CompareResponse {
    pub fn from_results(results: Vec<MatchResult>) -> Self {
        let matches = results.iter().map(MatchResult::describe).collect();
        let total = results.len();
        Self {
            matches,
            results,
            total,
        }
    }
}

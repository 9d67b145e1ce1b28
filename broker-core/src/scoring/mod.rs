//! Pure bid scoring: weighted, normalized multi-signal scoring with a
//! `BidScore`/`ScoreBreakdown` split across the broker's four signals and
//! per-category weight sets.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::{Bid, Intent, IntentCategory};

/// Weight set for the four scoring signals. Must not be assumed to sum to
/// 1.0 by callers — category weight sets are configuration, not code.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub cost: f64,
    pub speed: f64,
    pub reputation: f64,
    pub confidence: f64,
}

impl ScoreWeights {
    /// The broker's default weight set (spec §4.1).
    pub const fn default_weights() -> Self {
        ScoreWeights {
            cost: 0.30,
            speed: 0.20,
            reputation: 0.15,
            confidence: 0.35,
        }
    }

    /// LLM/tool subtypes swap in a quality signal (mapped here onto
    /// `confidence`, the closest carried signal) at 0.35 and reduce the
    /// weight otherwise given to raw self-reported confidence.
    pub const fn llm_tool_weights() -> Self {
        ScoreWeights {
            cost: 0.25,
            speed: 0.15,
            reputation: 0.25,
            confidence: 0.35,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ScoreWeightTable {
    weights: [ScoreWeights; 2],
}

impl Default for ScoreWeightTable {
    fn default() -> Self {
        Self {
            weights: [ScoreWeights::default_weights(), ScoreWeights::llm_tool_weights()],
        }
    }
}

impl ScoreWeightTable {
    pub fn for_category(&self, category: IntentCategory) -> ScoreWeights {
        match category {
            IntentCategory::General => self.weights[0],
            IntentCategory::LlmTool => self.weights[1],
        }
    }

    pub fn set(&mut self, category: IntentCategory, weights: ScoreWeights) {
        let slot = match category {
            IntentCategory::General => 0,
            IntentCategory::LlmTool => 1,
        };
        self.weights[slot] = weights;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub cost_score: f64,
    pub speed_score: f64,
    pub reputation_score: f64,
    pub confidence_score: f64,
    pub tee_bonus: f64,
}

/// The 10-second zero point used to normalize `estimatedTime`.
const SPEED_ZERO_POINT_MS: f64 = 10_000.0;
const TEE_BONUS: f64 = 1.10;

/// Score a single bid against its intent. Pure: no IO, no clock reads.
/// Swapping two bids with identical inputs yields identical scores.
pub fn score(bid: &Bid, intent: &Intent, weights: &ScoreWeights) -> (u32, ScoreBreakdown) {
    let max_budget = intent.max_budget.micros().max(1) as f64;
    let cost_score = (1.0 - bid.bid_amount.micros() as f64 / max_budget).max(0.0);
    let speed_score = (1.0 - bid.estimated_time_ms as f64 / SPEED_ZERO_POINT_MS).max(0.0);
    let reputation_score = (bid.reputation_score / 5.0).clamp(0.0, 1.0);
    let confidence_score = (bid.confidence as f64 / 100.0).clamp(0.0, 1.0);
    let tee_bonus = if bid.tee_attested { TEE_BONUS } else { 1.0 };

    let base = weights.cost * cost_score
        + weights.speed * speed_score
        + weights.reputation * reputation_score
        + weights.confidence * confidence_score;

    let raw = (100.0 * base * tee_bonus).round();
    let bounded = raw.clamp(0.0, 110.0) as u32;

    (
        bounded,
        ScoreBreakdown {
            cost_score,
            speed_score,
            reputation_score,
            confidence_score,
            tee_bonus,
        },
    )
}

/// Re-score and re-rank every bid for an intent in place, maintaining the
/// total order (score descending, ties by earlier `submittedAt`).
pub fn rank_bids(bids: &mut [Bid], intent: &Intent, weights: &ScoreWeights) {
    for bid in bids.iter_mut() {
        let (calculated, _) = score(bid, intent, weights);
        bid.calculated_score = calculated;
    }
    bids.sort_by_key(|b| b.rank_key());
    for (idx, bid) in bids.iter_mut().enumerate() {
        bid.rank = (idx + 1) as u32;
    }
}

pub type CategoryWeights = HashMap<IntentCategory, ScoreWeights>;

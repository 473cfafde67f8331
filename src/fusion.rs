use crate::config::FusionConfig;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusedScore {
    pub final_score: f64,
    /// The heuristic side was unavailable and the result rests on
    /// reputation alone.
    pub degraded: bool,
}

/// Weighted blend of the reputation and heuristic scores, both on the 0-100
/// scale. Weights are renormalized so only their ratio matters; a missing
/// heuristic score shifts the full weight onto reputation and flags the
/// result as degraded.
pub fn fuse(
    reputation_score: f64,
    heuristic_score: Option<f64>,
    config: &FusionConfig,
) -> FusedScore {
    let (score, degraded) = match heuristic_score {
        Some(heuristic) => {
            let total = config.reputation_weight + config.heuristic_weight;
            if total <= 0.0 {
                (reputation_score, false)
            } else {
                let rep_w = config.reputation_weight / total;
                let heur_w = config.heuristic_weight / total;
                (reputation_score * rep_w + heuristic * heur_w, false)
            }
        }
        None => (reputation_score, true),
    };

    FusedScore {
        final_score: score.clamp(0.0, 100.0),
        degraded,
    }
}

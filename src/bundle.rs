use serde::Serialize;

use crate::model::{Performance, Pick, PickResult};

/// Stake-lost sentinel stored as `actual_return` for a lost parlay.
pub const LOST_RETURN: f64 = -1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BundleOutcome {
    Won,
    Lost,
    Open,
}

impl BundleOutcome {
    pub fn of(performance: &Performance) -> Self {
        match performance.actual_return {
            Some(value) if value == LOST_RETURN => BundleOutcome::Lost,
            Some(_) => BundleOutcome::Won,
            None => BundleOutcome::Open,
        }
    }
}

/// Product of every pick's decimal odds.
pub fn expected_return(picks: &[Pick]) -> f64 {
    picks.iter().map(|p| p.odds).product()
}

/// Parlay performance for the current pick results.
///
/// One loss settles the bundle at [`LOST_RETURN`] whatever else is pending.
/// The bundle pays the odds product only when every pick won. Anything else,
/// a push included, leaves `actual_return` empty while the counters still
/// reflect partial progress.
pub fn aggregate(picks: &[Pick]) -> Performance {
    let mut perf = Performance {
        total_games: picks.len() as u32,
        ..Performance::default()
    };
    for pick in picks {
        match pick.result {
            Some(PickResult::Win) => perf.wins += 1,
            Some(PickResult::Loss) => perf.losses += 1,
            Some(PickResult::Push) => perf.pushes += 1,
            None => perf.pending += 1,
        }
    }

    perf.actual_return = if perf.losses > 0 {
        Some(LOST_RETURN)
    } else if !picks.is_empty() && perf.wins == perf.total_games {
        Some(expected_return(picks))
    } else {
        None
    };
    perf
}

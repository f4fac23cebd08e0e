//! One settlement pass, plus the operator paths that touch terminal games.

use std::collections::{BTreeMap, HashSet};

use anyhow::{Result, anyhow};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::bundle::{BundleOutcome, aggregate};
use crate::canonical::{build_fetch_pool, collect_live_matches};
use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::live_cache::LiveCache;
use crate::matcher::find_game;
use crate::model::{Bundle, Game, GameStatus, GameUpdate};
use crate::providers::LiveProvider;
use crate::settlement::settle_pick;
use crate::status::{ClockStep, FeedStep, clock_step, feed_step};
use crate::store::{GameFilter, SettlementStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    ProviderUnavailable,
    MalformedPayload,
    NoMatch,
    AmbiguousMarket,
    StaleCoverageGap,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PassSummary {
    pub games_updated_by_feed: usize,
    pub games_updated_by_clock: usize,
    pub picks_settled: usize,
    pub bundles_updated: usize,
    pub stale_games: usize,
    pub served_from_cache: bool,
    pub skipped: BTreeMap<SkipReason, usize>,
}

impl PassSummary {
    fn skip(&mut self, reason: SkipReason) {
        *self.skipped.entry(reason).or_default() += 1;
    }

    pub fn skipped_for(&self, reason: SkipReason) -> usize {
        self.skipped.get(&reason).copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AdminOutcome {
    pub game_id: i64,
    pub picks_updated: usize,
    pub bundles_updated: usize,
}

pub struct Engine<S: SettlementStore, C: Clock> {
    store: S,
    clock: C,
    cache: LiveCache,
    providers: Vec<Box<dyn LiveProvider>>,
    config: EngineConfig,
    pool: Option<rayon::ThreadPool>,
}

impl<S: SettlementStore, C: Clock> Engine<S, C> {
    pub fn new(
        store: S,
        clock: C,
        providers: Vec<Box<dyn LiveProvider>>,
        config: EngineConfig,
    ) -> Self {
        Self {
            cache: LiveCache::new(config.cache_ttl_secs),
            pool: build_fetch_pool(config.fetch_parallelism),
            store,
            clock,
            providers,
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Fetch, reconcile, progress, settle, aggregate. Only store errors abort the pass.
    pub fn run_pass(&mut self) -> Result<PassSummary> {
        let now = self.clock.now();
        let mut summary = PassSummary::default();
        let filter = GameFilter {
            sports: self.config.sports.clone(),
            include_terminal: true,
        };
        let mut games = self.store.find_games_by_active_bundles(&filter)?;
        let mut covered: HashSet<i64> = HashSet::new();

        let needs_feed = games.iter().any(|g| !g.status.is_terminal() || g.stale);
        if needs_feed {
            let days = fetch_days(&games, now);
            let snapshot = collect_live_matches(
                &self.providers,
                &self.config.sports,
                &days,
                &self.cache,
                now,
                self.pool.as_ref(),
            );
            summary.served_from_cache = snapshot.from_cache;
            for _ in &snapshot.failures {
                summary.skip(SkipReason::ProviderUnavailable);
            }

            for live in &snapshot.matches {
                let Some(game_id) = find_game(live, &games, self.config.match_prefix_chars)
                    .map(|g| g.id)
                else {
                    info!(
                        provider = %live.provider,
                        home = %live.home_team,
                        away = %live.away_team,
                        "no stored game for live match"
                    );
                    summary.skip(SkipReason::NoMatch);
                    continue;
                };
                let Some(game) = games.iter_mut().find(|g| g.id == game_id) else {
                    continue;
                };

                match feed_step(game, live) {
                    FeedStep::PreMatchNoise => {
                        debug!(game_id, provider = %live.provider, "pre-match noise skipped");
                    }
                    FeedStep::NoChange => {
                        covered.insert(game_id);
                    }
                    FeedStep::ScorelessFinish(update) => {
                        covered.insert(game_id);
                        self.store.upsert_game(game_id, &update)?;
                        self.store.flag_stale(game_id, true)?;
                        apply_update(game, &update);
                        game.stale = true;
                        summary.games_updated_by_feed += 1;
                        warn!(
                            game_id,
                            provider = %live.provider,
                            "feed reports finished without a score, needs operator resolution"
                        );
                    }
                    FeedStep::Update(update) => {
                        covered.insert(game_id);
                        self.store.upsert_game(game_id, &update)?;
                        let filled_stale = game.stale && update.home_score.is_some();
                        if filled_stale {
                            self.store.flag_stale(game_id, false)?;
                            game.stale = false;
                        }
                        apply_update(game, &update);
                        summary.games_updated_by_feed += 1;
                        info!(
                            game_id,
                            provider = %live.provider,
                            status = game.status.as_str(),
                            period = game.current_period.as_deref().unwrap_or(""),
                            "game updated from feed"
                        );
                    }
                }
            }
        } else {
            debug!("no open games, skipping provider fetch");
        }

        for game in games.iter_mut() {
            if covered.contains(&game.id) || game.status.is_terminal() {
                continue;
            }
            match clock_step(game, now, self.config.stale_after_minutes) {
                ClockStep::NoChange => {}
                ClockStep::Update(update) => {
                    self.store.upsert_game(game.id, &update)?;
                    apply_update(game, &update);
                    summary.games_updated_by_clock += 1;
                    info!(
                        game_id = game.id,
                        status = game.status.as_str(),
                        period = game.current_period.as_deref().unwrap_or(""),
                        "game progressed by clock"
                    );
                }
                ClockStep::StaleCoverageGap(update) => {
                    self.store.upsert_game(game.id, &update)?;
                    self.store.flag_stale(game.id, true)?;
                    apply_update(game, &update);
                    game.stale = true;
                    summary.games_updated_by_clock += 1;
                    warn!(
                        game_id = game.id,
                        home = %game.home_team,
                        away = %game.away_team,
                        "past cutoff with no score from any provider, needs operator resolution"
                    );
                }
            }
        }

        summary.stale_games = games.iter().filter(|g| g.stale).count();
        for _ in 0..summary.stale_games {
            summary.skip(SkipReason::StaleCoverageGap);
        }

        let bundles = self.store.load_bundles_with_picks(true)?;
        for mut bundle in bundles {
            let settled = self.settle_bundle_picks(&mut bundle, &games, Some(&mut summary))?;
            summary.picks_settled += settled;
            if self.refresh_performance(&bundle)? {
                summary.bundles_updated += 1;
            }
        }

        info!(
            feed = summary.games_updated_by_feed,
            clock = summary.games_updated_by_clock,
            picks = summary.picks_settled,
            bundles = summary.bundles_updated,
            stale = summary.stale_games,
            cached = summary.served_from_cache,
            "settlement pass complete"
        );
        Ok(summary)
    }

    /// Operator resolution of a game no provider ever scored: CANCELLED, every pick PUSH.
    pub fn resolve_stale_game(&mut self, game_id: i64) -> Result<AdminOutcome> {
        let game = self
            .store
            .get_game(game_id)?
            .ok_or_else(|| anyhow!("game {game_id} not found"))?;
        if game.status == GameStatus::Finished && game.final_score().is_some() && !game.stale {
            return Err(anyhow!(
                "game {game_id} finished with a score; use a score correction instead"
            ));
        }
        let update = GameUpdate {
            status: GameStatus::Cancelled,
            home_score: None,
            away_score: None,
            current_period: game.current_period.clone(),
        };
        self.store.upsert_game(game_id, &update)?;
        self.store.flag_stale(game_id, false)?;
        warn!(game_id, "game cancelled by operator, picks pushed");
        self.resettle_game(game_id)
    }

    /// Overwrites the final score of a finished game and re-settles its picks.
    pub fn correct_score(&mut self, game_id: i64, home: i32, away: i32) -> Result<AdminOutcome> {
        if home < 0 || away < 0 {
            return Err(anyhow!("scores must be non-negative"));
        }
        let game = self
            .store
            .get_game(game_id)?
            .ok_or_else(|| anyhow!("game {game_id} not found"))?;
        if game.status != GameStatus::Finished {
            return Err(anyhow!(
                "game {game_id} is {}; only finished games take score corrections",
                game.status.as_str()
            ));
        }
        self.store.correct_game_score(game_id, home, away)?;
        if game.stale {
            self.store.flag_stale(game_id, false)?;
        }
        info!(game_id, home, away, "score corrected by operator");
        self.resettle_game(game_id)
    }

    fn resettle_game(&mut self, game_id: i64) -> Result<AdminOutcome> {
        let game = self
            .store
            .get_game(game_id)?
            .ok_or_else(|| anyhow!("game {game_id} not found"))?;
        let games = [game];
        let mut outcome = AdminOutcome {
            game_id,
            ..AdminOutcome::default()
        };
        let bundles = self.store.load_bundles_with_picks(false)?;
        for mut bundle in bundles {
            if !bundle.picks.iter().any(|p| p.game_id == game_id) {
                continue;
            }
            outcome.picks_updated += self.settle_bundle_picks(&mut bundle, &games, None)?;
            if self.refresh_performance(&bundle)? {
                outcome.bundles_updated += 1;
            }
        }
        Ok(outcome)
    }

    fn settle_bundle_picks(
        &mut self,
        bundle: &mut Bundle,
        games: &[Game],
        mut summary: Option<&mut PassSummary>,
    ) -> Result<usize> {
        let mut settled = 0;
        for pick in bundle.picks.iter_mut() {
            let Some(game) = games.iter().find(|g| g.id == pick.game_id) else {
                continue;
            };
            if !game.status.is_terminal() {
                continue;
            }
            match settle_pick(game, pick) {
                Some(result) if pick.result == Some(result) => {}
                Some(result) => {
                    self.store.update_pick_result(pick.id, result)?;
                    pick.result = Some(result);
                    settled += 1;
                    info!(
                        pick_id = pick.id,
                        bundle_id = bundle.id,
                        game_id = game.id,
                        result = result.as_str(),
                        "pick settled"
                    );
                }
                None => {
                    if game.final_score().is_some() && pick.result.is_none() {
                        debug!(pick_id = pick.id, text = %pick.pick, "pick text not recognised, left pending");
                        if let Some(summary) = summary.as_deref_mut() {
                            summary.skip(SkipReason::AmbiguousMarket);
                        }
                    }
                }
            }
        }
        Ok(settled)
    }

    fn refresh_performance(&mut self, bundle: &Bundle) -> Result<bool> {
        let perf = aggregate(&bundle.picks);
        if perf == bundle.performance {
            return Ok(false);
        }
        self.store.upsert_bundle_performance(bundle.id, &perf)?;
        let outcome = BundleOutcome::of(&perf);
        if outcome != BundleOutcome::Open && BundleOutcome::of(&bundle.performance) != outcome {
            info!(
                bundle_id = bundle.id,
                outcome = ?outcome,
                actual_return = perf.actual_return.unwrap_or_default(),
                "bundle resolved"
            );
        }
        Ok(true)
    }
}

// Open games that kicked off before today still need their kickoff day fetched.
fn fetch_days(games: &[Game], now: DateTime<Utc>) -> Vec<NaiveDate> {
    let today = now.date_naive();
    let mut days: Vec<NaiveDate> = games
        .iter()
        .filter(|g| !g.status.is_terminal() || g.stale)
        .map(|g| g.scheduled_at.date_naive())
        .filter(|day| *day < today)
        .collect();
    days.push(today);
    days.sort();
    days.dedup();
    days
}

fn apply_update(game: &mut Game, update: &GameUpdate) {
    game.status = update.status;
    if update.home_score.is_some() {
        game.home_score = update.home_score;
    }
    if update.away_score.is_some() {
        game.away_score = update.away_score;
    }
    game.current_period = update.current_period.clone();
}

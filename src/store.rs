use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};

use crate::bundle::expected_return;
use crate::model::{
    BetType, Bundle, Game, GameStatus, GameUpdate, Performance, Pick, PickResult, Sport,
};

/// Which games the engine asks for. Games outside active bundles are never returned.
#[derive(Debug, Clone, Default)]
pub struct GameFilter {
    /// Empty means every sport.
    pub sports: Vec<Sport>,
    pub include_terminal: bool,
}

#[derive(Debug, Clone)]
pub struct NewGame {
    pub sport: Sport,
    pub home_team: String,
    pub away_team: String,
    pub league: String,
    pub scheduled_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPick {
    pub bundle_id: i64,
    pub game_id: i64,
    pub pick: String,
    pub odds: f64,
    pub bet_type: Option<BetType>,
    pub line: Option<f64>,
}

/// Persistence the settlement engine runs against.
pub trait SettlementStore {
    fn find_games_by_active_bundles(&self, filter: &GameFilter) -> Result<Vec<Game>>;

    fn get_game(&self, game_id: i64) -> Result<Option<Game>>;

    /// Writes status, period and any known scores. Unknown (`None`) scores keep the stored value.
    fn upsert_game(&mut self, game_id: i64, update: &GameUpdate) -> Result<()>;

    fn flag_stale(&mut self, game_id: i64, stale: bool) -> Result<()>;

    /// Overwrites both scores, terminal or not.
    fn correct_game_score(&mut self, game_id: i64, home: i32, away: i32) -> Result<()>;

    fn update_pick_result(&mut self, pick_id: i64, result: PickResult) -> Result<()>;

    fn upsert_bundle_performance(&mut self, bundle_id: i64, perf: &Performance) -> Result<()>;

    fn load_bundles_with_picks(&self, active_only: bool) -> Result<Vec<Bundle>>;

    fn insert_game(&mut self, game: &NewGame) -> Result<i64>;

    fn insert_bundle(&mut self, name: &str, active: bool) -> Result<i64>;

    fn insert_pick(&mut self, pick: &NewPick) -> Result<i64>;
}

/// Games parked for an operator, across every sport.
pub fn stale_games<S: SettlementStore + ?Sized>(store: &S) -> Result<Vec<Game>> {
    let games = store.find_games_by_active_bundles(&GameFilter {
        sports: Vec::new(),
        include_terminal: true,
    })?;
    Ok(games.into_iter().filter(|g| g.stale).collect())
}

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create db directory {}", parent.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("open sqlite db {}", path.display()))?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")
            .context("enable wal")?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory sqlite db")?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA foreign_keys = ON;
        CREATE TABLE IF NOT EXISTS games (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            sport TEXT NOT NULL,
            home_team TEXT NOT NULL,
            away_team TEXT NOT NULL,
            league TEXT NOT NULL,
            scheduled_at TEXT NOT NULL,
            status TEXT NOT NULL,
            home_score INTEGER NULL,
            away_score INTEGER NULL,
            current_period TEXT NULL,
            stale INTEGER NOT NULL DEFAULT 0,
            updated_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_games_status ON games(status);

        CREATE TABLE IF NOT EXISTS bundles (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            active INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS picks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            bundle_id INTEGER NOT NULL REFERENCES bundles(id),
            game_id INTEGER NOT NULL REFERENCES games(id),
            pick TEXT NOT NULL,
            odds REAL NOT NULL,
            bet_type TEXT NULL,
            line REAL NULL,
            result TEXT NULL,
            updated_at TEXT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_picks_bundle ON picks(bundle_id);
        CREATE INDEX IF NOT EXISTS idx_picks_game ON picks(game_id);

        CREATE TABLE IF NOT EXISTS bundle_performance (
            bundle_id INTEGER PRIMARY KEY REFERENCES bundles(id),
            total_games INTEGER NOT NULL,
            wins INTEGER NOT NULL,
            losses INTEGER NOT NULL,
            pushes INTEGER NOT NULL,
            pending INTEGER NOT NULL,
            actual_return REAL NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .context("create sqlite schema")?;
    Ok(())
}

const GAME_COLUMNS: &str = "g.id, g.sport, g.home_team, g.away_team, g.league, g.scheduled_at, \
     g.status, g.home_score, g.away_score, g.current_period, g.stale";

struct GameRow {
    id: i64,
    sport: String,
    home_team: String,
    away_team: String,
    league: String,
    scheduled_at: String,
    status: String,
    home_score: Option<i32>,
    away_score: Option<i32>,
    current_period: Option<String>,
    stale: bool,
}

impl GameRow {
    fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            sport: row.get(1)?,
            home_team: row.get(2)?,
            away_team: row.get(3)?,
            league: row.get(4)?,
            scheduled_at: row.get(5)?,
            status: row.get(6)?,
            home_score: row.get(7)?,
            away_score: row.get(8)?,
            current_period: row.get(9)?,
            stale: row.get::<_, i64>(10)? != 0,
        })
    }

    fn into_game(self) -> Result<Game> {
        let sport = Sport::parse(&self.sport)
            .ok_or_else(|| anyhow!("game {} has unknown sport {:?}", self.id, self.sport))?;
        let status = GameStatus::parse(&self.status)
            .ok_or_else(|| anyhow!("game {} has unknown status {:?}", self.id, self.status))?;
        let scheduled_at = DateTime::parse_from_rfc3339(&self.scheduled_at)
            .with_context(|| format!("game {} scheduled_at", self.id))?
            .with_timezone(&Utc);
        Ok(Game {
            id: self.id,
            sport,
            home_team: self.home_team,
            away_team: self.away_team,
            league: self.league,
            scheduled_at,
            status,
            home_score: self.home_score,
            away_score: self.away_score,
            current_period: self.current_period,
            stale: self.stale,
        })
    }
}

struct PickRow {
    id: i64,
    bundle_id: i64,
    game_id: i64,
    pick: String,
    odds: f64,
    bet_type: Option<String>,
    line: Option<f64>,
    result: Option<String>,
}

impl PickRow {
    fn into_pick(self) -> Pick {
        Pick {
            id: self.id,
            bundle_id: self.bundle_id,
            game_id: self.game_id,
            pick: self.pick,
            odds: self.odds,
            bet_type: self.bet_type.as_deref().and_then(BetType::parse),
            line: self.line,
            result: self.result.as_deref().and_then(PickResult::parse),
        }
    }
}

fn bool_to_i64(v: bool) -> i64 {
    if v { 1 } else { 0 }
}

fn expect_one(changed: usize, what: &str, id: i64) -> Result<()> {
    if changed == 0 {
        return Err(anyhow!("{what} {id} not found"));
    }
    Ok(())
}

impl SettlementStore for SqliteStore {
    fn find_games_by_active_bundles(&self, filter: &GameFilter) -> Result<Vec<Game>> {
        let sql = format!(
            r#"
            SELECT {GAME_COLUMNS}
            FROM games g
            WHERE g.id IN (
                SELECT p.game_id FROM picks p
                JOIN bundles b ON b.id = p.bundle_id
                WHERE b.active = 1
            )
              AND (?1 = 1 OR g.status NOT IN ('FINISHED', 'CANCELLED'))
            ORDER BY g.scheduled_at ASC, g.id ASC
            "#
        );
        let mut stmt = self
            .conn
            .prepare(&sql)
            .context("prepare active games query")?;
        let rows = stmt
            .query_map(params![bool_to_i64(filter.include_terminal)], GameRow::read)
            .context("query active games")?;

        let mut out = Vec::new();
        for row in rows {
            let game = row.context("decode game row")?.into_game()?;
            if filter.sports.is_empty() || filter.sports.contains(&game.sport) {
                out.push(game);
            }
        }
        Ok(out)
    }

    fn get_game(&self, game_id: i64) -> Result<Option<Game>> {
        let sql = format!("SELECT {GAME_COLUMNS} FROM games g WHERE g.id = ?1");
        let row = self
            .conn
            .query_row(&sql, params![game_id], GameRow::read)
            .optional()
            .context("query game")?;
        row.map(GameRow::into_game).transpose()
    }

    fn upsert_game(&mut self, game_id: i64, update: &GameUpdate) -> Result<()> {
        let changed = self
            .conn
            .execute(
                r#"
                UPDATE games SET
                    status = ?2,
                    home_score = COALESCE(?3, home_score),
                    away_score = COALESCE(?4, away_score),
                    current_period = ?5,
                    updated_at = ?6
                WHERE id = ?1
                "#,
                params![
                    game_id,
                    update.status.as_str(),
                    update.home_score,
                    update.away_score,
                    update.current_period,
                    Utc::now().to_rfc3339(),
                ],
            )
            .context("upsert game")?;
        expect_one(changed, "game", game_id)
    }

    fn flag_stale(&mut self, game_id: i64, stale: bool) -> Result<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE games SET stale = ?2, updated_at = ?3 WHERE id = ?1",
                params![game_id, bool_to_i64(stale), Utc::now().to_rfc3339()],
            )
            .context("flag stale game")?;
        expect_one(changed, "game", game_id)
    }

    fn correct_game_score(&mut self, game_id: i64, home: i32, away: i32) -> Result<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE games SET home_score = ?2, away_score = ?3, updated_at = ?4 WHERE id = ?1",
                params![game_id, home, away, Utc::now().to_rfc3339()],
            )
            .context("correct game score")?;
        expect_one(changed, "game", game_id)
    }

    fn update_pick_result(&mut self, pick_id: i64, result: PickResult) -> Result<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE picks SET result = ?2, updated_at = ?3 WHERE id = ?1",
                params![pick_id, result.as_str(), Utc::now().to_rfc3339()],
            )
            .context("update pick result")?;
        expect_one(changed, "pick", pick_id)
    }

    fn upsert_bundle_performance(&mut self, bundle_id: i64, perf: &Performance) -> Result<()> {
        self.conn
            .execute(
                r#"
                INSERT INTO bundle_performance (
                    bundle_id, total_games, wins, losses, pushes, pending,
                    actual_return, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                ON CONFLICT(bundle_id) DO UPDATE SET
                    total_games = excluded.total_games,
                    wins = excluded.wins,
                    losses = excluded.losses,
                    pushes = excluded.pushes,
                    pending = excluded.pending,
                    actual_return = excluded.actual_return,
                    updated_at = excluded.updated_at
                "#,
                params![
                    bundle_id,
                    perf.total_games,
                    perf.wins,
                    perf.losses,
                    perf.pushes,
                    perf.pending,
                    perf.actual_return,
                    Utc::now().to_rfc3339(),
                ],
            )
            .context("upsert bundle performance")?;
        Ok(())
    }

    fn load_bundles_with_picks(&self, active_only: bool) -> Result<Vec<Bundle>> {
        let mut picks_by_bundle: HashMap<i64, Vec<Pick>> = HashMap::new();
        {
            let mut stmt = self
                .conn
                .prepare(
                    r#"
                    SELECT id, bundle_id, game_id, pick, odds, bet_type, line, result
                    FROM picks
                    ORDER BY bundle_id ASC, id ASC
                    "#,
                )
                .context("prepare picks query")?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(PickRow {
                        id: row.get(0)?,
                        bundle_id: row.get(1)?,
                        game_id: row.get(2)?,
                        pick: row.get(3)?,
                        odds: row.get(4)?,
                        bet_type: row.get(5)?,
                        line: row.get(6)?,
                        result: row.get(7)?,
                    })
                })
                .context("query picks")?;
            for row in rows {
                let pick = row.context("decode pick row")?.into_pick();
                picks_by_bundle.entry(pick.bundle_id).or_default().push(pick);
            }
        }

        let mut stmt = self
            .conn
            .prepare(
                r#"
                SELECT b.id, b.name, b.active,
                       bp.total_games, bp.wins, bp.losses, bp.pushes, bp.pending, bp.actual_return
                FROM bundles b
                LEFT JOIN bundle_performance bp ON bp.bundle_id = b.id
                WHERE (?1 = 0 OR b.active = 1)
                ORDER BY b.id ASC
                "#,
            )
            .context("prepare bundles query")?;
        let rows = stmt
            .query_map(params![bool_to_i64(active_only)], |row| {
                let performance = Performance {
                    total_games: row.get::<_, Option<u32>>(3)?.unwrap_or(0),
                    wins: row.get::<_, Option<u32>>(4)?.unwrap_or(0),
                    losses: row.get::<_, Option<u32>>(5)?.unwrap_or(0),
                    pushes: row.get::<_, Option<u32>>(6)?.unwrap_or(0),
                    pending: row.get::<_, Option<u32>>(7)?.unwrap_or(0),
                    actual_return: row.get(8)?,
                };
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)? != 0,
                    performance,
                ))
            })
            .context("query bundles")?;

        let mut out = Vec::new();
        for row in rows {
            let (id, name, active, performance) = row.context("decode bundle row")?;
            let picks = picks_by_bundle.remove(&id).unwrap_or_default();
            out.push(Bundle {
                id,
                name,
                expected_return: expected_return(&picks),
                active,
                picks,
                performance,
            });
        }
        Ok(out)
    }

    fn insert_game(&mut self, game: &NewGame) -> Result<i64> {
        self.conn
            .execute(
                r#"
                INSERT INTO games (
                    sport, home_team, away_team, league, scheduled_at, status, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
                params![
                    game.sport.as_str(),
                    game.home_team,
                    game.away_team,
                    game.league,
                    game.scheduled_at.to_rfc3339(),
                    GameStatus::Upcoming.as_str(),
                    Utc::now().to_rfc3339(),
                ],
            )
            .context("insert game")?;
        Ok(self.conn.last_insert_rowid())
    }

    fn insert_bundle(&mut self, name: &str, active: bool) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO bundles (name, active) VALUES (?1, ?2)",
                params![name, bool_to_i64(active)],
            )
            .context("insert bundle")?;
        Ok(self.conn.last_insert_rowid())
    }

    fn insert_pick(&mut self, pick: &NewPick) -> Result<i64> {
        self.conn
            .execute(
                r#"
                INSERT INTO picks (bundle_id, game_id, pick, odds, bet_type, line)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
                params![
                    pick.bundle_id,
                    pick.game_id,
                    pick.pick,
                    pick.odds,
                    pick.bet_type.map(BetType::as_str),
                    pick.line,
                ],
            )
            .context("insert pick")?;
        Ok(self.conn.last_insert_rowid())
    }
}

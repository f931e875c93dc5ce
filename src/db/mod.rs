use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

use crate::models::PropEdge;

/// Thread-safe SQLite handle (single connection behind a mutex)
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

/// A persisted pick. `actual_result` and `won` stay NULL at write time and
/// are graded later out-of-band.
#[derive(Debug, Clone)]
pub struct Pick {
    pub id: Option<i64>,
    pub timestamp: DateTime<Utc>,
    pub player_name: String,
    pub stat_type: String,
    pub market_line: f64,
    pub projected: f64,
    pub edge: f64,
    pub recommended_side: String,
    pub actual_result: Option<f64>,
    pub won: Option<bool>,
}

/// Win/loss aggregate over graded picks only.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WinRate {
    pub total_graded: i64,
    pub wins: i64,
    pub losses: i64,
    pub win_pct: f64,
}

impl Database {
    /// Open (or create) the SQLite database at the given path
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        let db = Database {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// In-memory database for tests
    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Run schema migrations (idempotent)
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    /// Insert a pre-game pick with the current UTC timestamp; outcome
    /// columns stay NULL for manual grading later.
    pub fn log_pick(&self, prop: &PropEdge, player_name: &str) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO picks (
                timestamp, player_name, stat_type, market_line,
                projected, edge, recommended_side, actual_result, won
             ) VALUES (?1,?2,?3,?4,?5,?6,?7,NULL,NULL)",
            params![
                Utc::now(),
                player_name,
                prop.stat_type.to_string(),
                prop.market_line,
                prop.projected,
                prop.edge,
                prop.recommended_side.to_string(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// List recent picks, newest first
    pub fn list_recent_picks(&self, limit: i64) -> Result<Vec<Pick>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, timestamp, player_name, stat_type, market_line,
                    projected, edge, recommended_side, actual_result, won
             FROM picks ORDER BY timestamp DESC LIMIT ?1",
        )?;
        let picks = stmt
            .query_map(params![limit], map_pick)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(picks)
    }

    /// Grade a pick after the game settles
    pub fn grade_pick(&self, id: i64, actual_result: f64, won: bool) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE picks SET actual_result=?1, won=?2 WHERE id=?3",
            params![actual_result, won, id],
        )?;
        Ok(())
    }

    /// Compute win stats over graded picks only (rows where won IS NOT NULL)
    pub fn get_win_rate(&self) -> Result<WinRate> {
        let conn = self.conn.lock().unwrap();
        let (total, wins, losses): (i64, i64, i64) = conn.query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM(CASE WHEN won = 1 THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN won = 0 THEN 1 ELSE 0 END), 0)
             FROM picks WHERE won IS NOT NULL",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;
        let win_pct = if total == 0 {
            0.0
        } else {
            (wins as f64 / total as f64 * 10_000.0).round() / 100.0
        };
        Ok(WinRate {
            total_graded: total,
            wins,
            losses,
            win_pct,
        })
    }
}

fn map_pick(row: &rusqlite::Row) -> rusqlite::Result<Pick> {
    Ok(Pick {
        id: row.get(0)?,
        timestamp: row.get(1)?,
        player_name: row.get(2)?,
        stat_type: row.get(3)?,
        market_line: row.get(4)?,
        projected: row.get(5)?,
        edge: row.get(6)?,
        recommended_side: row.get(7)?,
        actual_result: row.get(8)?,
        won: row.get(9)?,
    })
}

/// SQLite schema (idempotent CREATE IF NOT EXISTS)
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS picks (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp        TEXT    NOT NULL,
    player_name      TEXT    NOT NULL,
    stat_type        TEXT    NOT NULL,
    market_line      REAL    NOT NULL,
    projected        REAL    NOT NULL,
    edge             REAL    NOT NULL,
    recommended_side TEXT    NOT NULL,
    actual_result    REAL,
    won              INTEGER
);

CREATE INDEX IF NOT EXISTS idx_picks_timestamp ON picks(timestamp);
"#;

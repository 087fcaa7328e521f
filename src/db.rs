// 🗄️ Observation store - one SQLite table of price/quantity experiments
// Every function takes the Connection explicitly; there is no ambient handle.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;

use crate::pricing::{self, PricingError};

/// One price experiment: what the snack sold for and how much moved,
/// before and after a price change. `elasticity` stays `None` until it is
/// derived from the other four fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    /// Stable identity, kept across CSV round trips
    #[serde(default = "default_uuid")]
    pub id: String,

    pub recorded_at: DateTime<Utc>,

    pub price_start: f64,
    pub price_end: f64,
    pub quantity_start: f64,
    pub quantity_end: f64,

    /// Derived field, written back by `analyze` once both pairs are known
    #[serde(default)]
    pub elasticity: Option<f64>,
}

fn default_uuid() -> String {
    uuid::Uuid::new_v4().to_string()
}

impl Observation {
    pub fn new(price_start: f64, price_end: f64, quantity_start: f64, quantity_end: f64) -> Self {
        Observation {
            id: default_uuid(),
            recorded_at: Utc::now(),
            price_start,
            price_end,
            quantity_start,
            quantity_end,
            elasticity: None,
        }
    }

    /// Hash for duplicate detection on re-import. Identity is `id`; this is
    /// only about not inserting the same experiment twice.
    pub fn idempotency_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(format!(
            "{}{}{}{}{}",
            self.recorded_at.to_rfc3339(),
            self.price_start,
            self.price_end,
            self.quantity_start,
            self.quantity_end,
        ));
        format!("{:x}", hasher.finalize())
    }

    /// Arc elasticity for this observation's two (quantity, price) pairs.
    pub fn compute_elasticity(&self) -> std::result::Result<Option<f64>, PricingError> {
        pricing::elasticity(
            self.quantity_start,
            self.quantity_end,
            self.price_start,
            self.price_end,
        )
    }
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS observations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            obs_uuid TEXT UNIQUE NOT NULL,
            idempotency_hash TEXT UNIQUE NOT NULL,
            recorded_at TEXT NOT NULL,
            price_start REAL NOT NULL,
            price_end REAL NOT NULL,
            quantity_start REAL NOT NULL,
            quantity_end REAL NOT NULL,
            elasticity REAL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_observations_recorded_at
         ON observations(recorded_at)",
        [],
    )?;

    Ok(())
}

/// Insert one observation. Returns `false` when an identical experiment
/// (same idempotency hash) is already stored.
pub fn insert_observation(conn: &Connection, obs: &Observation) -> Result<bool> {
    let result = conn.execute(
        "INSERT INTO observations (
            obs_uuid, idempotency_hash, recorded_at,
            price_start, price_end, quantity_start, quantity_end, elasticity
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            obs.id,
            obs.idempotency_hash(),
            obs.recorded_at.to_rfc3339(),
            obs.price_start,
            obs.price_end,
            obs.quantity_start,
            obs.quantity_end,
            obs.elasticity,
        ],
    );

    match result {
        Ok(_) => Ok(true),
        Err(rusqlite::Error::SqliteFailure(err, _))
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}

const SELECT_COLUMNS: &str = "obs_uuid, recorded_at, price_start, price_end,
                              quantity_start, quantity_end, elasticity";

fn row_to_observation(row: &rusqlite::Row) -> rusqlite::Result<Observation> {
    let recorded_at_str: String = row.get(1)?;
    let recorded_at = DateTime::parse_from_rfc3339(&recorded_at_str)
        .map_err(|_| rusqlite::Error::InvalidQuery)?
        .with_timezone(&Utc);

    Ok(Observation {
        id: row.get(0)?,
        recorded_at,
        price_start: row.get(2)?,
        price_end: row.get(3)?,
        quantity_start: row.get(4)?,
        quantity_end: row.get(5)?,
        elasticity: row.get(6)?,
    })
}

/// Most recently inserted observation, if any.
pub fn latest_observation(conn: &Connection) -> Result<Option<Observation>> {
    let sql = format!(
        "SELECT {} FROM observations ORDER BY id DESC LIMIT 1",
        SELECT_COLUMNS
    );
    let obs = conn
        .query_row(&sql, [], row_to_observation)
        .optional()
        .context("Failed to read latest observation")?;

    Ok(obs)
}

/// Write the derived elasticity onto the newest row. Returns `false` when
/// the table is empty.
pub fn update_latest_elasticity(conn: &Connection, elasticity: Option<f64>) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE observations
         SET elasticity = ?1
         WHERE id = (SELECT MAX(id) FROM observations)",
        params![elasticity],
    )?;

    Ok(changed > 0)
}

/// Observations from the last `days` days (all of them when `None`),
/// ascending by time so the result can feed a chart directly.
pub fn observations_since(conn: &Connection, days: Option<u32>) -> Result<Vec<Observation>> {
    let sql = format!(
        "SELECT {} FROM observations
         WHERE recorded_at >= ?1
         ORDER BY recorded_at ASC",
        SELECT_COLUMNS
    );

    let cutoff = match days {
        Some(days) => (Utc::now() - Duration::days(i64::from(days))).to_rfc3339(),
        // RFC 3339 strings compare lexicographically, so "" matches everything
        None => String::new(),
    };

    let mut stmt = conn.prepare(&sql)?;
    let observations = stmt
        .query_map(params![cutoff], row_to_observation)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(observations)
}

pub fn observation_count(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM observations", [], |row| row.get(0))?;

    Ok(count)
}

// ============================================================================
// CSV INTERCHANGE
// ============================================================================

/// Load observations from a CSV export (or a hand-kept spreadsheet with the
/// same columns). Missing `id` cells get fresh UUIDs.
pub fn import_csv(csv_path: &Path) -> Result<Vec<Observation>> {
    let mut rdr = csv::Reader::from_path(csv_path).context("Failed to open CSV file")?;

    let mut observations = Vec::new();
    for result in rdr.deserialize() {
        let obs: Observation = result.context("Failed to deserialize observation")?;
        observations.push(obs);
    }

    Ok(observations)
}

/// Dump the whole table to CSV. Returns the number of rows written.
pub fn export_csv(conn: &Connection, csv_path: &Path) -> Result<usize> {
    let observations = observations_since(conn, None)?;

    let mut wtr = csv::Writer::from_path(csv_path).context("Failed to create CSV file")?;
    for obs in &observations {
        wtr.serialize(obs).context("Failed to serialize observation")?;
    }
    wtr.flush().context("Failed to flush CSV file")?;

    Ok(observations.len())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn open_test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        conn
    }

    fn sample_observation() -> Observation {
        Observation::new(5.0, 6.0, 100.0, 80.0)
    }

    #[test]
    fn test_insert_and_read_back() {
        let conn = open_test_db();
        let obs = sample_observation();

        assert!(insert_observation(&conn, &obs).unwrap());
        assert_eq!(observation_count(&conn).unwrap(), 1);

        let latest = latest_observation(&conn).unwrap().unwrap();
        assert_eq!(latest.id, obs.id);
        assert_eq!(latest.price_start, 5.0);
        assert_eq!(latest.quantity_end, 80.0);
        assert_eq!(latest.elasticity, None);
    }

    #[test]
    fn test_insert_is_idempotent() {
        let conn = open_test_db();
        let obs = sample_observation();

        assert!(insert_observation(&conn, &obs).unwrap());
        assert!(!insert_observation(&conn, &obs).unwrap());
        assert_eq!(observation_count(&conn).unwrap(), 1);
    }

    #[test]
    fn test_update_latest_elasticity() {
        let conn = open_test_db();

        // Nothing to update yet
        assert!(!update_latest_elasticity(&conn, Some(-1.0)).unwrap());

        let obs = sample_observation();
        insert_observation(&conn, &obs).unwrap();

        let epd = obs.compute_elasticity().unwrap();
        assert!(update_latest_elasticity(&conn, epd).unwrap());

        let latest = latest_observation(&conn).unwrap().unwrap();
        let stored = latest.elasticity.unwrap();
        // q: 100 -> 80 at p: 5 -> 6 on averaged bases
        assert!((stored - (-20.0 / 90.0) / (1.0 / 5.5)).abs() < 1e-9);
    }

    #[test]
    fn test_observations_since_filters_old_rows() {
        let conn = open_test_db();

        let mut old = sample_observation();
        old.recorded_at = Utc::now() - Duration::days(30);
        let recent = sample_observation();

        insert_observation(&conn, &old).unwrap();
        insert_observation(&conn, &recent).unwrap();

        let all = observations_since(&conn, None).unwrap();
        assert_eq!(all.len(), 2);
        // Ascending by time
        assert_eq!(all[0].id, old.id);

        let last_week = observations_since(&conn, Some(7)).unwrap();
        assert_eq!(last_week.len(), 1);
        assert_eq!(last_week[0].id, recent.id);
    }

    #[test]
    fn test_latest_observation_on_empty_table() {
        let conn = open_test_db();
        assert!(latest_observation(&conn).unwrap().is_none());
    }

    #[test]
    fn test_csv_round_trip() {
        let conn = open_test_db();

        let mut obs = sample_observation();
        obs.elasticity = Some(-1.22);
        insert_observation(&conn, &obs).unwrap();

        let dir = std::env::temp_dir().join("snackonomics-test-export");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(format!("{}.csv", obs.id));

        assert_eq!(export_csv(&conn, &path).unwrap(), 1);

        let imported = import_csv(&path).unwrap();
        assert_eq!(imported.len(), 1);
        assert_eq!(imported[0].id, obs.id);
        assert_eq!(imported[0].elasticity, Some(-1.22));

        std::fs::remove_file(&path).ok();
    }
}

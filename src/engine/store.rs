//! Durable store interface and SQLite implementation
//!
//! The engine never owns shared mutable state; every counter mutation is
//! an atomic guarded UPDATE at the storage layer so concurrent
//! submissions against the same user cannot lose updates or drive a
//! balance negative.
//!
//! Tables written (see `/sql/` directory):
//! - `users` - one row per registered user (balances, counters)
//! - `tag_events` - INSERT-only tag history, primary key on tag id
//! - `badge_awards` - one row per (user, badge), primary key enforces
//!   at-most-once awards

use super::types::{Balances, GeoPoint, PlateRef, TagEvent, TagPolarity, User};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Store-layer failures
#[derive(Debug)]
pub enum StoreError {
    Database(rusqlite::Error),
    /// Schema directory missing or unreadable
    Migration(String),
    /// Tag id already persisted; the submission chain must short-circuit
    DuplicateTag(String),
    UnknownUser(String),
    /// Guarded decrement refused; balance would have gone negative
    InsufficientBalance,
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Database(err)
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Database(e) => write!(f, "database error: {}", e),
            StoreError::Migration(msg) => write!(f, "schema migration failed: {}", msg),
            StoreError::DuplicateTag(id) => write!(f, "tag already recorded: {}", id),
            StoreError::UnknownUser(id) => write!(f, "unknown user: {}", id),
            StoreError::InsufficientBalance => write!(f, "balance exhausted"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Outcome of a badge award write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AwardOutcome {
    Awarded,
    AlreadyAwarded,
}

/// Filter for tag-event listings
#[derive(Debug, Clone, Copy, Default)]
pub struct EventFilter {
    pub polarity: Option<TagPolarity>,
    /// Inclusive lower bound on created_at
    pub since: Option<i64>,
    /// Exclusive upper bound on created_at
    pub until: Option<i64>,
}

impl EventFilter {
    pub fn all() -> Self {
        Self::default()
    }
}

/// Durable store the engine runs against.
///
/// Every method is one remote call; the pipeline holds no lock across
/// them and treats each as independently fallible.
#[async_trait]
pub trait TagStore: Send + Sync {
    /// Persist a tag event. A duplicate id returns `DuplicateTag`.
    async fn create_tag_event(&self, event: &TagEvent) -> Result<(), StoreError>;

    /// Whether a tag id is already recorded (retry short-circuit probe)
    async fn tag_event_exists(&self, tag_id: &str) -> Result<bool, StoreError>;

    /// Atomically adjust a per-polarity balance by `delta`. Decrements
    /// are guarded so the balance can never go negative.
    async fn adjust_balance(
        &self,
        user_id: &str,
        polarity: TagPolarity,
        delta: i64,
    ) -> Result<Balances, StoreError>;

    /// Increment the given-tag counters (total plus the polarity one)
    async fn increment_given(&self, user_id: &str, polarity: TagPolarity) -> Result<(), StoreError>;

    /// Increment a received-rating counter
    async fn increment_received(&self, user_id: &str, polarity: TagPolarity) -> Result<(), StoreError>;

    async fn set_experience_and_level(
        &self,
        user_id: &str,
        experience: i64,
        level: i32,
    ) -> Result<(), StoreError>;

    /// Record a badge award; at most one row per (user, badge) pair
    async fn record_badge_award(&self, user_id: &str, badge_id: &str) -> Result<AwardOutcome, StoreError>;

    async fn get_user(&self, user_id: &str) -> Result<Option<User>, StoreError>;

    /// Resolve a normalized plate identity to a registered user
    async fn find_user_by_plate(&self, plate: &PlateRef) -> Result<Option<User>, StoreError>;

    /// Register a user (seeds balances and counters from the struct)
    async fn create_user(&self, user: &User) -> Result<(), StoreError>;

    async fn list_tag_events(&self, filter: &EventFilter) -> Result<Vec<TagEvent>, StoreError>;

    async fn list_users(&self) -> Result<Vec<User>, StoreError>;
}

/// Run schema migrations from SQL files.
///
/// Reads all .sql files from the directory in name order and executes
/// them. Files must use "IF NOT EXISTS" clauses so reruns are idempotent.
pub fn run_schema_migrations(conn: &mut Connection, schema_dir: &str) -> Result<(), StoreError> {
    let schema_path = Path::new(schema_dir);

    if !schema_path.exists() {
        return Err(StoreError::Migration(format!(
            "schema directory not found: {}",
            schema_dir
        )));
    }

    // WAL mode: analytics reads run concurrently with submission writes
    conn.pragma_update(None, "journal_mode", "WAL")?;

    let mut sql_files: Vec<_> = fs::read_dir(schema_path)
        .map_err(|e| StoreError::Migration(format!("{}: {}", schema_dir, e)))?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().extension().and_then(|s| s.to_str()) == Some("sql"))
        .collect();

    sql_files.sort_by_key(|entry| entry.file_name());

    log::info!("🔧 Running schema migrations from: {}", schema_dir);

    for entry in sql_files {
        let path = entry.path();
        let filename = path.file_name().unwrap_or_default().to_string_lossy().to_string();

        let sql_content = fs::read_to_string(&path)
            .map_err(|e| StoreError::Migration(format!("{}: {}", filename, e)))?;

        conn.execute_batch(&sql_content)?;
        log::info!("   ├─ ✅ {}", filename);
    }

    log::info!("   └─ All schema migrations completed");

    Ok(())
}

/// SQLite implementation of [`TagStore`]
pub struct SqliteTagStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteTagStore {
    /// Open a database file. Does not create the schema; call
    /// [`run_schema_migrations`] (or [`Self::open_with_schema`]) first.
    pub fn new(db_path: &str) -> Result<Self, StoreError> {
        let conn = Connection::open(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open a database file and run migrations from `schema_dir`
    pub fn open_with_schema(db_path: &str, schema_dir: &str) -> Result<Self, StoreError> {
        let mut conn = Connection::open(db_path)?;
        run_schema_migrations(&mut conn, schema_dir)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Wrap an already-open connection (tests)
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    fn is_constraint_violation(err: &rusqlite::Error) -> bool {
        matches!(
            err,
            rusqlite::Error::SqliteFailure(e, _)
                if e.code == rusqlite::ErrorCode::ConstraintViolation
        )
    }

    fn balance_column(polarity: TagPolarity) -> &'static str {
        match polarity {
            TagPolarity::Positive => "positive_credits",
            TagPolarity::Negative => "negative_credits",
        }
    }

    fn given_column(polarity: TagPolarity) -> &'static str {
        match polarity {
            TagPolarity::Positive => "positive_given",
            TagPolarity::Negative => "negative_given",
        }
    }

    fn received_column(polarity: TagPolarity) -> &'static str {
        match polarity {
            TagPolarity::Positive => "positive_received",
            TagPolarity::Negative => "negative_received",
        }
    }

    fn user_exists(conn: &Connection, user_id: &str) -> Result<bool, StoreError> {
        let mut stmt = conn.prepare("SELECT id FROM users WHERE id = ?1")?;
        Ok(stmt.exists([user_id])?)
    }

    fn load_badges(conn: &Connection, user_id: &str) -> Result<Vec<String>, StoreError> {
        let mut stmt = conn.prepare(
            "SELECT badge_id FROM badge_awards WHERE user_id = ?1 ORDER BY awarded_at, badge_id",
        )?;
        let rows = stmt.query_map([user_id], |row| row.get(0))?;

        let mut badges = Vec::new();
        for badge in rows {
            badges.push(badge?);
        }
        Ok(badges)
    }

    fn row_to_user(conn: &Connection, row: &rusqlite::Row<'_>) -> Result<User, rusqlite::Error> {
        let id: String = row.get(0)?;
        let jurisdiction: Option<String> = row.get(1)?;
        let plate: Option<String> = row.get(2)?;

        let plate_ref = match (jurisdiction, plate) {
            (Some(jurisdiction), Some(plate)) => Some(PlateRef { jurisdiction, plate }),
            _ => None,
        };

        let badges = Self::load_badges(conn, &id).map_err(|e| match e {
            StoreError::Database(e) => e,
            _ => rusqlite::Error::InvalidQuery,
        })?;

        Ok(User {
            id,
            plate: plate_ref,
            positive_credits: row.get(3)?,
            negative_credits: row.get(4)?,
            experience: row.get(5)?,
            level: row.get(6)?,
            positive_received: row.get(7)?,
            negative_received: row.get(8)?,
            total_given: row.get(9)?,
            positive_given: row.get(10)?,
            negative_given: row.get(11)?,
            badges,
            created_at: row.get(12)?,
        })
    }

    const USER_COLUMNS: &'static str = "id, jurisdiction, plate, positive_credits, \
         negative_credits, experience, level, positive_received, negative_received, \
         total_given, positive_given, negative_given, created_at";
}

#[async_trait]
impl TagStore for SqliteTagStore {
    async fn create_tag_event(&self, event: &TagEvent) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();

        let result = conn.execute(
            "INSERT INTO tag_events (
                id, jurisdiction, plate, creator_id, polarity, reason,
                latitude, longitude, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                event.id,
                event.target.jurisdiction,
                event.target.plate,
                event.creator_id,
                event.polarity.as_str(),
                event.reason,
                event.location.map(|g| g.latitude),
                event.location.map(|g| g.longitude),
                event.created_at,
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) if Self::is_constraint_violation(&e) => {
                Err(StoreError::DuplicateTag(event.id.clone()))
            }
            Err(e) => Err(StoreError::Database(e)),
        }
    }

    async fn tag_event_exists(&self, tag_id: &str) -> Result<bool, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT id FROM tag_events WHERE id = ?1")?;
        Ok(stmt.exists([tag_id])?)
    }

    async fn adjust_balance(
        &self,
        user_id: &str,
        polarity: TagPolarity,
        delta: i64,
    ) -> Result<Balances, StoreError> {
        let conn = self.conn.lock().unwrap();
        let column = Self::balance_column(polarity);

        // Guarded atomic adjustment: the row only updates when the
        // resulting balance stays non-negative.
        let updated = conn.execute(
            &format!(
                "UPDATE users SET {col} = {col} + ?2 WHERE id = ?1 AND {col} + ?2 >= 0",
                col = column
            ),
            params![user_id, delta],
        )?;

        if updated == 0 {
            if Self::user_exists(&conn, user_id)? {
                return Err(StoreError::InsufficientBalance);
            }
            return Err(StoreError::UnknownUser(user_id.to_string()));
        }

        let balances = conn.query_row(
            "SELECT positive_credits, negative_credits FROM users WHERE id = ?1",
            [user_id],
            |row| {
                Ok(Balances {
                    positive_credits: row.get(0)?,
                    negative_credits: row.get(1)?,
                })
            },
        )?;

        Ok(balances)
    }

    async fn increment_given(&self, user_id: &str, polarity: TagPolarity) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        let column = Self::given_column(polarity);

        let updated = conn.execute(
            &format!(
                "UPDATE users SET total_given = total_given + 1, {col} = {col} + 1 WHERE id = ?1",
                col = column
            ),
            [user_id],
        )?;

        if updated == 0 {
            return Err(StoreError::UnknownUser(user_id.to_string()));
        }
        Ok(())
    }

    async fn increment_received(&self, user_id: &str, polarity: TagPolarity) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        let column = Self::received_column(polarity);

        let updated = conn.execute(
            &format!("UPDATE users SET {col} = {col} + 1 WHERE id = ?1", col = column),
            [user_id],
        )?;

        if updated == 0 {
            return Err(StoreError::UnknownUser(user_id.to_string()));
        }
        Ok(())
    }

    async fn set_experience_and_level(
        &self,
        user_id: &str,
        experience: i64,
        level: i32,
    ) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();

        let updated = conn.execute(
            "UPDATE users SET experience = ?2, level = ?3 WHERE id = ?1",
            params![user_id, experience, level],
        )?;

        if updated == 0 {
            return Err(StoreError::UnknownUser(user_id.to_string()));
        }
        Ok(())
    }

    async fn record_badge_award(&self, user_id: &str, badge_id: &str) -> Result<AwardOutcome, StoreError> {
        let conn = self.conn.lock().unwrap();

        let inserted = conn.execute(
            "INSERT OR IGNORE INTO badge_awards (user_id, badge_id, awarded_at)
             VALUES (?1, ?2, ?3)",
            params![user_id, badge_id, chrono::Utc::now().timestamp()],
        )?;

        if inserted == 0 {
            Ok(AwardOutcome::AlreadyAwarded)
        } else {
            Ok(AwardOutcome::Awarded)
        }
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<User>, StoreError> {
        let conn = self.conn.lock().unwrap();

        let user = conn
            .query_row(
                &format!("SELECT {} FROM users WHERE id = ?1", Self::USER_COLUMNS),
                [user_id],
                |row| Self::row_to_user(&conn, row),
            )
            .optional()?;

        Ok(user)
    }

    async fn find_user_by_plate(&self, plate: &PlateRef) -> Result<Option<User>, StoreError> {
        let conn = self.conn.lock().unwrap();

        let user = conn
            .query_row(
                &format!(
                    "SELECT {} FROM users WHERE jurisdiction = ?1 AND plate = ?2",
                    Self::USER_COLUMNS
                ),
                params![plate.jurisdiction, plate.plate],
                |row| Self::row_to_user(&conn, row),
            )
            .optional()?;

        Ok(user)
    }

    async fn create_user(&self, user: &User) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "INSERT INTO users (
                id, jurisdiction, plate, positive_credits, negative_credits,
                experience, level, positive_received, negative_received,
                total_given, positive_given, negative_given, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                user.id,
                user.plate.as_ref().map(|p| p.jurisdiction.clone()),
                user.plate.as_ref().map(|p| p.plate.clone()),
                user.positive_credits,
                user.negative_credits,
                user.experience,
                user.level,
                user.positive_received,
                user.negative_received,
                user.total_given,
                user.positive_given,
                user.negative_given,
                user.created_at,
            ],
        )?;

        Ok(())
    }

    async fn list_tag_events(&self, filter: &EventFilter) -> Result<Vec<TagEvent>, StoreError> {
        let conn = self.conn.lock().unwrap();

        let mut sql = String::from(
            "SELECT id, jurisdiction, plate, creator_id, polarity, reason,
                    latitude, longitude, created_at
             FROM tag_events WHERE 1=1",
        );
        let mut bind: Vec<rusqlite::types::Value> = Vec::new();

        if let Some(polarity) = filter.polarity {
            sql.push_str(&format!(" AND polarity = ?{}", bind.len() + 1));
            bind.push(polarity.as_str().to_string().into());
        }
        if let Some(since) = filter.since {
            sql.push_str(&format!(" AND created_at >= ?{}", bind.len() + 1));
            bind.push(since.into());
        }
        if let Some(until) = filter.until {
            sql.push_str(&format!(" AND created_at < ?{}", bind.len() + 1));
            bind.push(until.into());
        }

        // Insertion order doubles as first-seen order for stable ranking
        sql.push_str(" ORDER BY rowid ASC");

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(bind), |row| {
            let polarity_str: String = row.get(4)?;
            let polarity =
                TagPolarity::from_str(&polarity_str).ok_or(rusqlite::Error::InvalidQuery)?;

            let latitude: Option<f64> = row.get(6)?;
            let longitude: Option<f64> = row.get(7)?;
            let location = match (latitude, longitude) {
                (Some(latitude), Some(longitude)) => Some(GeoPoint { latitude, longitude }),
                _ => None,
            };

            Ok(TagEvent {
                id: row.get(0)?,
                target: PlateRef {
                    jurisdiction: row.get(1)?,
                    plate: row.get(2)?,
                },
                creator_id: row.get(3)?,
                polarity,
                reason: row.get(5)?,
                created_at: row.get(8)?,
                location,
            })
        })?;

        let mut events = Vec::new();
        for event in rows {
            events.push(event?);
        }
        Ok(events)
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM users ORDER BY rowid ASC",
            Self::USER_COLUMNS
        ))?;
        let rows = stmt.query_map([], |row| Self::row_to_user(&conn, row))?;

        let mut users = Vec::new();
        for user in rows {
            users.push(user?);
        }
        Ok(users)
    }
}

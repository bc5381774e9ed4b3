// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! SQLite wrapper with typed operations.
//!
//! The connection lives on one dedicated thread. Every operation is sent to
//! that thread as a closure and answered over a oneshot channel, so all
//! writers (watcher, upload endpoint, settings handlers) are serialized
//! without an application-level lock.
//!
//! Provides high-level operations for:
//! - Activities (with their track points and heart rate samples)
//! - Settings (the single profile row)

use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc, Mutex};
use std::thread::{self, JoinHandle};

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tokio::sync::oneshot;

use super::migrations::run_migrations;
use crate::error::AppError;
use crate::models::settings::SETTINGS_ID;
use crate::models::{Activity, Settings, SettingsUpdate, TrackPoint};
use crate::services::metrics;
use crate::time_utils::{format_utc_rfc3339, parse_utc_rfc3339};

type DbTask = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

enum DbCommand {
    Execute(DbTask),
    Shutdown,
}

struct DatabaseInner {
    sender: mpsc::Sender<DbCommand>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for DatabaseInner {
    fn drop(&mut self) {
        let mut guard = match self.worker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(handle) = guard.take() {
            if let Err(err) = self.sender.send(DbCommand::Shutdown) {
                tracing::error!(error = %err, "Failed to send shutdown to database thread");
            }
            if handle.join().is_err() {
                tracing::error!("Database thread panicked");
            }
        }
    }
}

/// Result of storing a parsed activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOutcome {
    /// New activity row with this ID
    Inserted(i64),
    /// An activity with the same natural key already exists
    AlreadyExists,
}

const ACTIVITY_COLUMNS: &str = "id, activity, activity_type, started_at, completed_at, \
     distance, duration, pace, pace_hours, altitude_avg, altitude_max, altitude_min, \
     ascent, descent, calories, calories_derived, heart_rate_avg, heart_rate_max, \
     heart_rate_min, creator, start_latitude, start_longitude";

/// SQLite database client.
#[derive(Clone)]
pub struct SqliteDb {
    inner: Arc<DatabaseInner>,
    db_path: Arc<PathBuf>,
}

impl SqliteDb {
    /// Open (or create) the database and bring the schema up to date.
    pub fn open(db_path: impl Into<PathBuf>) -> Result<Self, AppError> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    AppError::Database(format!(
                        "Failed to create database directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let (command_tx, command_rx) = mpsc::channel::<DbCommand>();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), AppError>>();
        let path_for_thread = db_path.clone();

        let worker = thread::Builder::new()
            .name("runnerdash-db".into())
            .spawn(move || {
                let mut conn = match Connection::open(&path_for_thread) {
                    Ok(connection) => connection,
                    Err(err) => {
                        let _ = ready_tx.send(Err(AppError::Database(format!(
                            "Failed to open SQLite database: {}",
                            err
                        ))));
                        return;
                    }
                };

                if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
                    tracing::warn!(error = %err, "Failed to enable WAL mode");
                }
                if let Err(err) = conn.pragma_update(None, "foreign_keys", "ON") {
                    tracing::warn!(error = %err, "Failed to enable foreign keys");
                }

                let init_result = run_migrations(&mut conn).map_err(AppError::Internal);
                if ready_tx.send(init_result).is_err() {
                    return;
                }

                while let Ok(command) = command_rx.recv() {
                    match command {
                        DbCommand::Execute(task) => task(&mut conn),
                        DbCommand::Shutdown => break,
                    }
                }

                tracing::debug!("Database thread shutting down");
            })
            .map_err(|e| AppError::Database(format!("Failed to spawn database thread: {}", e)))?;

        ready_rx.recv().map_err(|_| {
            AppError::Database("Database thread exited before signaling readiness".to_string())
        })??;

        tracing::info!(path = %db_path.display(), "Opened SQLite database");

        Ok(Self {
            inner: Arc::new(DatabaseInner {
                sender: command_tx,
                worker: Mutex::new(Some(worker)),
            }),
            db_path: Arc::new(db_path),
        })
    }

    pub fn path(&self) -> &Path {
        self.db_path.as_path()
    }

    /// Run a closure on the database thread and wait for its result.
    pub async fn execute<F, T>(&self, task: F) -> Result<T, AppError>
    where
        F: FnOnce(&mut Connection) -> Result<T, AppError> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();

        let command = DbCommand::Execute(Box::new(move |conn| {
            let result = task(conn);
            if reply_tx.send(result).is_err() {
                tracing::debug!("Database caller dropped before receiving result");
            }
        }));

        self.inner
            .sender
            .send(command)
            .map_err(|_| AppError::Database("Database thread is not running".to_string()))?;

        reply_rx
            .await
            .map_err(|_| AppError::Database("Database thread terminated unexpectedly".to_string()))?
    }

    // ─── Activity Operations ─────────────────────────────────────

    /// Store an activity with its samples in one transaction.
    ///
    /// The natural-key check and the inserts run in the same transaction on
    /// the database thread, so two concurrent ingestions of one file can not
    /// both insert. If any detail row fails the activity is rolled back.
    pub async fn insert_activity_atomic(
        &self,
        activity: &Activity,
        track_points: &[TrackPoint],
        heart_rate: &[u32],
    ) -> Result<StoreOutcome, AppError> {
        let activity = activity.clone();
        let track_points = track_points.to_vec();
        let heart_rate = heart_rate.to_vec();

        self.execute(move |conn| {
            let tx = conn.transaction()?;

            let existing: Option<i64> = tx
                .query_row(
                    "SELECT id FROM activities WHERE activity = ?1",
                    params![activity.activity],
                    |row| row.get(0),
                )
                .optional()?;
            if existing.is_some() {
                return Ok(StoreOutcome::AlreadyExists);
            }

            tx.execute(
                "INSERT INTO activities (activity, activity_type, started_at, completed_at,
                     distance, duration, pace, pace_hours, altitude_avg, altitude_max,
                     altitude_min, ascent, descent, calories, calories_derived,
                     heart_rate_avg, heart_rate_max, heart_rate_min, creator,
                     start_latitude, start_longitude)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15,
                     ?16, ?17, ?18, ?19, ?20, ?21)",
                params![
                    activity.activity,
                    activity.activity_type,
                    format_utc_rfc3339(activity.started_at),
                    format_utc_rfc3339(activity.completed_at),
                    activity.distance,
                    activity.duration,
                    activity.pace,
                    activity.pace_hours,
                    activity.altitude_avg,
                    activity.altitude_max,
                    activity.altitude_min,
                    activity.ascent,
                    activity.descent,
                    activity.calories,
                    activity.calories_derived,
                    activity.heart_rate_avg,
                    activity.heart_rate_max,
                    activity.heart_rate_min,
                    activity.creator,
                    activity.start_latitude,
                    activity.start_longitude,
                ],
            )?;
            let activity_id = tx.last_insert_rowid();

            {
                let mut insert_hr = tx.prepare_cached(
                    "INSERT INTO heart_rate_values (activity_id, value) VALUES (?1, ?2)",
                )?;
                for value in &heart_rate {
                    insert_hr.execute(params![activity_id, value])?;
                }

                let mut insert_tp = tx.prepare_cached(
                    "INSERT INTO track_points (activity_id, timestamp, latitude, longitude,
                         altitude, distance)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                )?;
                for tp in &track_points {
                    insert_tp.execute(params![
                        activity_id,
                        format_utc_rfc3339(tp.timestamp),
                        tp.latitude,
                        tp.longitude,
                        tp.altitude,
                        tp.distance,
                    ])?;
                }
            }

            tx.commit()?;
            Ok(StoreOutcome::Inserted(activity_id))
        })
        .await
    }

    /// Get an activity by row ID.
    pub async fn get_activity(&self, activity_id: i64) -> Result<Option<Activity>, AppError> {
        self.execute(move |conn| {
            let sql = format!("SELECT {ACTIVITY_COLUMNS} FROM activities WHERE id = ?1");
            Ok(conn
                .query_row(&sql, params![activity_id], row_to_activity)
                .optional()?)
        })
        .await
    }

    /// Get an activity by its natural key (the source start timestamp).
    pub async fn find_activity_by_date(&self, key: &str) -> Result<Option<Activity>, AppError> {
        let key = key.to_string();
        self.execute(move |conn| {
            let sql = format!("SELECT {ACTIVITY_COLUMNS} FROM activities WHERE activity = ?1");
            Ok(conn
                .query_row(&sql, params![key], row_to_activity)
                .optional()?)
        })
        .await
    }

    /// The most recently started activity.
    pub async fn find_last_activity(&self) -> Result<Option<Activity>, AppError> {
        self.execute(|conn| {
            let sql = format!(
                "SELECT {ACTIVITY_COLUMNS} FROM activities ORDER BY started_at DESC, id DESC LIMIT 1"
            );
            Ok(conn.query_row(&sql, [], row_to_activity).optional()?)
        })
        .await
    }

    /// All activities, newest first.
    pub async fn find_all_activities(&self) -> Result<Vec<Activity>, AppError> {
        self.execute(|conn| {
            let sql = format!(
                "SELECT {ACTIVITY_COLUMNS} FROM activities ORDER BY started_at DESC, id DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([], row_to_activity)?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })
        .await
    }

    /// Activities started at or after `cutoff`, newest first.
    pub async fn find_activities_since(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Activity>, AppError> {
        let cutoff = format_utc_rfc3339(cutoff);
        self.execute(move |conn| {
            let sql = format!(
                "SELECT {ACTIVITY_COLUMNS} FROM activities WHERE started_at >= ?1
                 ORDER BY started_at DESC, id DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![cutoff], row_to_activity)?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })
        .await
    }

    /// Activities from the last `days` days, newest first.
    pub async fn find_past_activities(&self, days: i64) -> Result<Vec<Activity>, AppError> {
        let cutoff = Utc::now() - Duration::days(days);
        self.find_activities_since(cutoff).await
    }

    pub async fn count_activities(&self) -> Result<u64, AppError> {
        self.execute(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM activities", [], |row| {
                row.get(0)
            })?;
            Ok(count.max(0) as u64)
        })
        .await
    }

    /// Track points of an activity in recorded order.
    pub async fn track_points(&self, activity_id: i64) -> Result<Vec<TrackPoint>, AppError> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT timestamp, latitude, longitude, altitude, distance
                 FROM track_points WHERE activity_id = ?1 ORDER BY id",
            )?;
            let rows = stmt.query_map(params![activity_id], |row| {
                Ok(TrackPoint {
                    timestamp: get_datetime(row, "timestamp")?,
                    latitude: row.get("latitude")?,
                    longitude: row.get("longitude")?,
                    altitude: row.get("altitude")?,
                    distance: row.get("distance")?,
                })
            })?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })
        .await
    }

    /// Heart rate samples of an activity in recorded order.
    pub async fn heart_rate_values(&self, activity_id: i64) -> Result<Vec<u32>, AppError> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT value FROM heart_rate_values WHERE activity_id = ?1 ORDER BY id",
            )?;
            let rows = stmt.query_map(params![activity_id], |row| row.get(0))?;
            Ok(rows.collect::<Result<Vec<u32>, _>>()?)
        })
        .await
    }

    /// Recompute calories that were derived (or could not be derived yet)
    /// using a new body weight.
    ///
    /// Calories read from the activity file are left alone. Activities whose
    /// type has no MET table keep NULL. Returns the number of rows updated.
    pub async fn recompute_derived_calories(&self, weight_kg: f64) -> Result<usize, AppError> {
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            let candidates: Vec<(i64, String, f64, f64)> = {
                let mut stmt = tx.prepare(
                    "SELECT id, activity_type, pace_hours, duration FROM activities
                     WHERE calories_derived = 1 OR calories IS NULL",
                )?;
                let rows = stmt.query_map([], |row| {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
                })?;
                rows.collect::<Result<Vec<_>, _>>()?
            };

            let mut updated = 0;
            for (id, activity_type, pace_hours, duration) in candidates {
                match metrics::calories(weight_kg, pace_hours, duration, &activity_type) {
                    Ok(calories) => {
                        updated += tx.execute(
                            "UPDATE activities SET calories = ?1, calories_derived = 1
                             WHERE id = ?2",
                            params![calories, id],
                        )?;
                    }
                    Err(err) => {
                        tracing::debug!(activity_id = id, error = %err, "Calories not derivable");
                    }
                }
            }
            tx.commit()?;
            Ok(updated)
        })
        .await
    }

    // ─── Settings Operations ─────────────────────────────────────

    /// The settings row, if setup has run.
    pub async fn get_settings(&self) -> Result<Option<Settings>, AppError> {
        self.execute(|conn| {
            Ok(conn
                .query_row(
                    "SELECT username, birth_date, gender, weight, gmap_apikey, password, api_key
                     FROM settings WHERE id = ?1",
                    params![SETTINGS_ID],
                    row_to_settings,
                )
                .optional()?)
        })
        .await
    }

    /// True until setup has stored a profile.
    ///
    /// A database whose settings table does not exist yet also counts as a
    /// first run rather than an error.
    pub async fn is_first_run(&self) -> Result<bool, AppError> {
        self.execute(|conn| {
            let result = conn
                .query_row(
                    "SELECT COUNT(*) FROM settings WHERE id = ?1",
                    params![SETTINGS_ID],
                    |row| row.get::<_, i64>(0),
                )
                .map(|count| count == 0);
            match result {
                Ok(first_run) => Ok(first_run),
                Err(err) if is_missing_table(&err) => Ok(true),
                Err(err) => Err(err.into()),
            }
        })
        .await
    }

    /// Create the settings row unless it already exists.
    ///
    /// Returns `None` when setup has already run; the existing row is not
    /// touched.
    pub async fn create_settings(
        &self,
        update: &SettingsUpdate,
        api_key: &str,
    ) -> Result<Option<Settings>, AppError> {
        let update = update.clone();
        let api_key = api_key.to_string();
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            let inserted = tx.execute(
                "INSERT INTO settings (id, username, birth_date, gender, weight, gmap_apikey,
                     password, api_key)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(id) DO NOTHING",
                params![
                    SETTINGS_ID,
                    update.username,
                    update.birth_date,
                    update.gender,
                    update.weight,
                    update.map_key,
                    update.password_hash,
                    api_key,
                ],
            )?;
            if inserted == 0 {
                return Ok(None);
            }
            let settings = tx.query_row(
                "SELECT username, birth_date, gender, weight, gmap_apikey, password, api_key
                 FROM settings WHERE id = ?1",
                params![SETTINGS_ID],
                row_to_settings,
            )?;
            tx.commit()?;
            Ok(Some(settings))
        })
        .await
    }

    /// Create or update the settings row.
    ///
    /// `api_key` is only used when the row is created; an existing key is
    /// kept. Returns the stored settings.
    pub async fn upsert_settings(
        &self,
        update: &SettingsUpdate,
        api_key: &str,
    ) -> Result<Settings, AppError> {
        let update = update.clone();
        let api_key = api_key.to_string();
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO settings (id, username, birth_date, gender, weight, gmap_apikey,
                     password, api_key)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(id) DO UPDATE SET
                     username = excluded.username,
                     birth_date = excluded.birth_date,
                     gender = excluded.gender,
                     weight = excluded.weight,
                     gmap_apikey = excluded.gmap_apikey,
                     password = COALESCE(excluded.password, settings.password)",
                params![
                    SETTINGS_ID,
                    update.username,
                    update.birth_date,
                    update.gender,
                    update.weight,
                    update.map_key,
                    update.password_hash,
                    api_key,
                ],
            )?;
            let settings = tx.query_row(
                "SELECT username, birth_date, gender, weight, gmap_apikey, password, api_key
                 FROM settings WHERE id = ?1",
                params![SETTINGS_ID],
                row_to_settings,
            )?;
            tx.commit()?;
            Ok(settings)
        })
        .await
    }

    /// Replace the API key. Returns false if setup has not run.
    pub async fn set_api_key(&self, api_key: &str) -> Result<bool, AppError> {
        let api_key = api_key.to_string();
        self.execute(move |conn| {
            let changed = conn.execute(
                "UPDATE settings SET api_key = ?1 WHERE id = ?2",
                params![api_key, SETTINGS_ID],
            )?;
            Ok(changed > 0)
        })
        .await
    }

    pub async fn get_map_key(&self) -> Result<Option<String>, AppError> {
        Ok(self.get_settings().await?.and_then(|s| s.map_key))
    }

    /// User ID and password hash for a username.
    pub async fn get_user_credentials(
        &self,
        username: &str,
    ) -> Result<Option<(i64, String)>, AppError> {
        let username = username.to_string();
        self.execute(move |conn| {
            let row: Option<(i64, Option<String>)> = conn
                .query_row(
                    "SELECT id, password FROM settings WHERE username = ?1",
                    params![username],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;
            Ok(row.and_then(|(id, hash)| hash.map(|hash| (id, hash))))
        })
        .await
    }

    pub async fn find_user_by_id(&self, user_id: i64) -> Result<Option<Settings>, AppError> {
        self.execute(move |conn| {
            Ok(conn
                .query_row(
                    "SELECT username, birth_date, gender, weight, gmap_apikey, password, api_key
                     FROM settings WHERE id = ?1",
                    params![user_id],
                    row_to_settings,
                )
                .optional()?)
        })
        .await
    }

    /// Every API key currently accepted by the upload endpoint.
    pub async fn find_all_api_keys(&self) -> Result<Vec<String>, AppError> {
        self.execute(|conn| {
            let mut stmt = conn.prepare("SELECT api_key FROM settings")?;
            let rows = stmt.query_map([], |row| row.get(0))?;
            Ok(rows.collect::<Result<Vec<String>, _>>()?)
        })
        .await
    }
}

fn row_to_activity(row: &Row) -> rusqlite::Result<Activity> {
    Ok(Activity {
        id: row.get("id")?,
        activity: row.get("activity")?,
        activity_type: row.get("activity_type")?,
        started_at: get_datetime(row, "started_at")?,
        completed_at: get_datetime(row, "completed_at")?,
        distance: row.get("distance")?,
        duration: row.get("duration")?,
        pace: row.get("pace")?,
        pace_hours: row.get("pace_hours")?,
        altitude_avg: row.get("altitude_avg")?,
        altitude_max: row.get("altitude_max")?,
        altitude_min: row.get("altitude_min")?,
        ascent: row.get("ascent")?,
        descent: row.get("descent")?,
        calories: row.get("calories")?,
        calories_derived: row.get("calories_derived")?,
        heart_rate_avg: row.get("heart_rate_avg")?,
        heart_rate_max: row.get("heart_rate_max")?,
        heart_rate_min: row.get("heart_rate_min")?,
        creator: row.get("creator")?,
        start_latitude: row.get("start_latitude")?,
        start_longitude: row.get("start_longitude")?,
    })
}

fn row_to_settings(row: &Row) -> rusqlite::Result<Settings> {
    Ok(Settings {
        username: row.get("username")?,
        birth_date: row.get("birth_date")?,
        gender: row.get("gender")?,
        weight: row.get("weight")?,
        map_key: row.get("gmap_apikey")?,
        password_hash: row.get("password")?,
        api_key: row.get("api_key")?,
    })
}

fn get_datetime(row: &Row, column: &str) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(column)?;
    parse_utc_rfc3339(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Text,
            format!("invalid timestamp {raw:?} in column {column}").into(),
        )
    })
}

fn is_missing_table(err: &rusqlite::Error) -> bool {
    matches!(err, rusqlite::Error::SqliteFailure(_, Some(msg)) if msg.contains("no such table"))
}

//! Position and note tables.

// SQLite operations need to hold the lock for the duration of the operation.
#![allow(clippy::significant_drop_tightening)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SubsecRound, Utc};
use log::{debug, info};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

use super::error::{Result, StorageError};
use crate::location::{
    format_timestamp, parse_timestamp, AddNoteRequest, CreatePositionRequest, Note, Position,
    PositionSource, UpdatePositionRequest,
};

const POSITION_COLUMNS: &str = "id, timestamp, latitude, longitude, city, country, source";

/// `SQLite`-based storage for positions.
///
/// Thread-safe wrapper around a single connection. Construct one per
/// application and hand it to whoever needs it.
pub struct PositionStorage {
    conn: Mutex<Connection>,
}

impl std::fmt::Debug for PositionStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PositionStorage").finish_non_exhaustive()
    }
}

impl PositionStorage {
    /// Opens (or creates) the database at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be created or initialized.
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                StorageError::Storage(format!("Failed to create data directory: {e}"))
            })?;
        }
        let storage = Self {
            conn: Mutex::new(Connection::open(path)?),
        };
        storage.initialize_schema()?;
        info!("position database ready at {}", path.display());
        Ok(storage)
    }

    /// Creates an in-memory database, for tests and demos.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be created.
    pub fn in_memory() -> Result<Self> {
        let storage = Self {
            conn: Mutex::new(Connection::open_in_memory()?),
        };
        storage.initialize_schema()?;
        Ok(storage)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StorageError::Storage(format!("Failed to acquire database lock: {e}")))
    }

    fn initialize_schema(&self) -> Result<()> {
        let conn = self.lock()?;

        conn.execute_batch(
            r"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS positions (
                id TEXT PRIMARY KEY,
                timestamp TEXT NOT NULL,
                latitude REAL NOT NULL,
                longitude REAL NOT NULL,
                city TEXT,
                country TEXT,
                source TEXT NOT NULL DEFAULT 'manual'
            );

            CREATE TABLE IF NOT EXISTS notes (
                id TEXT PRIMARY KEY,
                position_id TEXT NOT NULL,
                text TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                source TEXT NOT NULL,
                telegram_user TEXT,
                created_at TEXT DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (position_id) REFERENCES positions (id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_positions_timestamp ON positions(timestamp);
            CREATE INDEX IF NOT EXISTS idx_notes_position_id ON notes(position_id);
            CREATE INDEX IF NOT EXISTS idx_notes_timestamp ON notes(timestamp);
            ",
        )?;

        Ok(())
    }

    // ==================== Position Operations ====================

    /// Records a new position stamped with the current time.
    ///
    /// A legacy `notes` string becomes the position's first note.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid coordinates or if the insert fails.
    pub fn create(&self, request: &CreatePositionRequest) -> Result<Position> {
        request.validate()?;

        let source = request.source.unwrap_or_default();
        let mut position = Position::new(now(), request.latitude, request.longitude);
        position.city.clone_from(&request.city);
        position.country.clone_from(&request.country);
        position.source = source;

        if let Some(text) = request.notes.as_deref().filter(|t| !t.trim().is_empty()) {
            position.notes.push(Note {
                id: uuid::Uuid::new_v4().to_string(),
                text: text.to_string(),
                timestamp: position.timestamp,
                source,
                telegram_user: None,
            });
        }

        self.insert(&position)?;
        info!(
            "recorded position {} from {}",
            position.id,
            position.source.as_str()
        );
        Ok(position)
    }

    /// Inserts a fully-formed position together with its notes.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid coordinates, a duplicate id, or a
    /// database failure.
    pub fn insert(&self, position: &Position) -> Result<()> {
        crate::location::validate_coordinates(position.latitude, position.longitude)?;

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute(
            r"
            INSERT INTO positions (id, timestamp, latitude, longitude, city, country, source)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
            params![
                &position.id,
                format_timestamp(&position.timestamp),
                position.latitude,
                position.longitude,
                &position.city,
                &position.country,
                position.source.as_str(),
            ],
        )?;
        for note in &position.notes {
            insert_note(&tx, &position.id, note)?;
        }
        tx.commit()?;

        Ok(())
    }

    /// All positions, oldest first, each with its notes.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a row cannot be decoded.
    pub fn find_all(&self) -> Result<Vec<Position>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {POSITION_COLUMNS} FROM positions ORDER BY timestamp ASC, id ASC"
        ))?;
        let mut positions = stmt
            .query_map([], read_position_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?
            .into_iter()
            .map(PositionRow::into_position)
            .collect::<Result<Vec<_>>>()?;

        let mut notes = all_notes(&conn)?;
        for position in &mut positions {
            position.notes = notes.remove(&position.id).unwrap_or_default();
        }

        debug!("loaded {} positions", positions.len());
        Ok(positions)
    }

    /// Looks up a single position.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the row cannot be decoded.
    pub fn find_by_id(&self, id: &str) -> Result<Option<Position>> {
        let conn = self.lock()?;
        load_position(&conn, id)
    }

    /// The most recently recorded position.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the row cannot be decoded.
    pub fn latest(&self) -> Result<Option<Position>> {
        let conn = self.lock()?;

        let id: Option<String> = conn
            .query_row(
                "SELECT id FROM positions ORDER BY timestamp DESC, id DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;

        match id {
            Some(id) => load_position(&conn, &id),
            None => Ok(None),
        }
    }

    /// Applies the present fields of `request`.
    ///
    /// Returns `None` when no position has this id. A legacy `notes` string
    /// is appended as a manual note.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid coordinates or a database failure.
    pub fn update(&self, id: &str, request: &UpdatePositionRequest) -> Result<Option<Position>> {
        request.validate()?;

        let mut conn = self.lock()?;
        if load_position(&conn, id)?.is_none() {
            return Ok(None);
        }

        let mut assignments: Vec<(&str, Value)> = Vec::new();
        if let Some(lat) = request.latitude {
            assignments.push(("latitude", Value::Real(lat)));
        }
        if let Some(lon) = request.longitude {
            assignments.push(("longitude", Value::Real(lon)));
        }
        if let Some(city) = &request.city {
            assignments.push(("city", Value::Text(city.clone())));
        }
        if let Some(country) = &request.country {
            assignments.push(("country", Value::Text(country.clone())));
        }

        let tx = conn.transaction()?;
        if !assignments.is_empty() {
            let set_clause = assignments
                .iter()
                .enumerate()
                .map(|(i, (column, _))| format!("{column} = ?{}", i + 1))
                .collect::<Vec<_>>()
                .join(", ");
            let id_param = assignments.len() + 1;
            let values = assignments
                .into_iter()
                .map(|(_, value)| value)
                .chain(std::iter::once(Value::Text(id.to_string())));

            tx.execute(
                &format!("UPDATE positions SET {set_clause} WHERE id = ?{id_param}"),
                params_from_iter(values),
            )?;
        }

        if let Some(text) = request.notes.as_deref().filter(|t| !t.trim().is_empty()) {
            let note = Note {
                id: uuid::Uuid::new_v4().to_string(),
                text: text.to_string(),
                timestamp: now(),
                source: PositionSource::Manual,
                telegram_user: None,
            };
            insert_note(&tx, id, &note)?;
        }
        tx.commit()?;

        debug!("updated position {id}");
        load_position(&conn, id)
    }

    /// Deletes a position and its notes. Returns whether anything was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn delete(&self, id: &str) -> Result<bool> {
        let conn = self.lock()?;
        let removed = conn.execute("DELETE FROM positions WHERE id = ?1", params![id])?;
        if removed > 0 {
            info!("deleted position {id}");
        }
        Ok(removed > 0)
    }

    /// Number of stored positions.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM positions", [], |row| row.get(0))?;
        usize::try_from(n).map_err(|e| StorageError::InvalidData(format!("Invalid count: {e}")))
    }

    // ==================== Note Operations ====================

    /// Attaches a note to a position. Returns `None` for an unknown position.
    ///
    /// # Errors
    ///
    /// Returns an error for blank text or a database failure.
    pub fn add_note(&self, position_id: &str, request: &AddNoteRequest) -> Result<Option<Note>> {
        request.validate()?;

        let conn = self.lock()?;
        let exists: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM positions WHERE id = ?1",
                params![position_id],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_none() {
            return Ok(None);
        }

        let note = Note {
            id: uuid::Uuid::new_v4().to_string(),
            text: request.text.trim().to_string(),
            timestamp: now(),
            source: request.source.unwrap_or_default(),
            telegram_user: request.telegram_user.clone(),
        };
        insert_note(&conn, position_id, &note)?;

        debug!("added note {} to position {position_id}", note.id);
        Ok(Some(note))
    }
}

/// Current time at the millisecond precision timestamps are stored with.
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

struct PositionRow {
    id: String,
    timestamp: String,
    latitude: f64,
    longitude: f64,
    city: Option<String>,
    country: Option<String>,
    source: String,
}

impl PositionRow {
    fn into_position(self) -> Result<Position> {
        Ok(Position {
            timestamp: parse_timestamp(&self.timestamp)?,
            source: parse_source(&self.source)?,
            id: self.id,
            latitude: self.latitude,
            longitude: self.longitude,
            city: self.city,
            country: self.country,
            notes: Vec::new(),
        })
    }
}

fn read_position_row(row: &Row<'_>) -> rusqlite::Result<PositionRow> {
    Ok(PositionRow {
        id: row.get(0)?,
        timestamp: row.get(1)?,
        latitude: row.get(2)?,
        longitude: row.get(3)?,
        city: row.get(4)?,
        country: row.get(5)?,
        source: row.get(6)?,
    })
}

fn parse_source(s: &str) -> Result<PositionSource> {
    PositionSource::parse(s).ok_or_else(|| StorageError::InvalidData(format!("Invalid source: {s}")))
}

fn load_position(conn: &Connection, id: &str) -> Result<Option<Position>> {
    let row = conn
        .query_row(
            &format!("SELECT {POSITION_COLUMNS} FROM positions WHERE id = ?1"),
            params![id],
            read_position_row,
        )
        .optional()?;

    let Some(row) = row else {
        return Ok(None);
    };
    let mut position = row.into_position()?;
    position.notes = notes_for(conn, id)?;
    Ok(Some(position))
}

type NoteRow = (String, String, String, String, String, Option<String>);

fn note_from_row((id, _, text, timestamp, source, telegram_user): NoteRow) -> Result<Note> {
    Ok(Note {
        id,
        text,
        timestamp: parse_timestamp(&timestamp)?,
        source: parse_source(&source)?,
        telegram_user,
    })
}

fn read_note_row(row: &Row<'_>) -> rusqlite::Result<NoteRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn notes_for(conn: &Connection, position_id: &str) -> Result<Vec<Note>> {
    let mut stmt = conn.prepare(
        r"
        SELECT id, position_id, text, timestamp, source, telegram_user
        FROM notes
        WHERE position_id = ?1
        ORDER BY timestamp ASC, id ASC
        ",
    )?;
    let rows = stmt
        .query_map(params![position_id], read_note_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    rows.into_iter().map(note_from_row).collect()
}

fn all_notes(conn: &Connection) -> Result<HashMap<String, Vec<Note>>> {
    let mut stmt = conn.prepare(
        r"
        SELECT id, position_id, text, timestamp, source, telegram_user
        FROM notes
        ORDER BY timestamp ASC, id ASC
        ",
    )?;
    let rows = stmt
        .query_map([], read_note_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut grouped: HashMap<String, Vec<Note>> = HashMap::new();
    for row in rows {
        let position_id = row.1.clone();
        grouped.entry(position_id).or_default().push(note_from_row(row)?);
    }
    Ok(grouped)
}

fn insert_note(conn: &Connection, position_id: &str, note: &Note) -> Result<()> {
    conn.execute(
        r"
        INSERT INTO notes (id, position_id, text, timestamp, source, telegram_user)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ",
        params![
            &note.id,
            position_id,
            &note.text,
            format_timestamp(&note.timestamp),
            note.source.as_str(),
            &note.telegram_user,
        ],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone};

    fn ts(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, d, h, 0, 0).unwrap()
    }

    fn create_test_position(id: &str, d: u32, h: u32) -> Position {
        let mut position = Position::new(ts(d, h), 55.605, 13.0038);
        position.id = id.to_string();
        position.city = Some("Malmö".to_string());
        position.country = Some("Sverige".to_string());
        position.source = PositionSource::HomeAssistant;
        position
    }

    fn create_request(lat: f64, lon: f64) -> CreatePositionRequest {
        CreatePositionRequest {
            latitude: lat,
            longitude: lon,
            ..Default::default()
        }
    }

    // ==================== Position Tests ====================

    #[test]
    fn create_and_find_position() {
        let storage = PositionStorage::in_memory().unwrap();
        let created = storage
            .create(&CreatePositionRequest {
                city: Some("Lund".to_string()),
                source: Some(PositionSource::Telegram),
                ..create_request(55.7047, 13.1910)
            })
            .unwrap();

        let found = storage.find_by_id(&created.id).unwrap().unwrap();
        assert_eq!(found.latitude, 55.7047);
        assert_eq!(found.city.as_deref(), Some("Lund"));
        assert_eq!(found.source, PositionSource::Telegram);
        assert!(found.notes.is_empty());
        assert_eq!(
            format_timestamp(&found.timestamp),
            format_timestamp(&created.timestamp)
        );
    }

    #[test]
    fn create_defaults_to_manual_source() {
        let storage = PositionStorage::in_memory().unwrap();
        let created = storage.create(&create_request(1.0, 2.0)).unwrap();
        assert_eq!(created.source, PositionSource::Manual);
    }

    #[test]
    fn create_converts_legacy_note() {
        let storage = PositionStorage::in_memory().unwrap();
        let created = storage
            .create(&CreatePositionRequest {
                notes: Some("Framme i Hamburg".to_string()),
                source: Some(PositionSource::HomeAssistant),
                ..create_request(53.55, 9.99)
            })
            .unwrap();

        let found = storage.find_by_id(&created.id).unwrap().unwrap();
        assert_eq!(found.notes.len(), 1);
        assert_eq!(found.notes[0].text, "Framme i Hamburg");
        assert_eq!(found.notes[0].source, PositionSource::HomeAssistant);
    }

    #[test]
    fn create_ignores_blank_legacy_note() {
        let storage = PositionStorage::in_memory().unwrap();
        let created = storage
            .create(&CreatePositionRequest {
                notes: Some("  ".to_string()),
                ..create_request(1.0, 1.0)
            })
            .unwrap();
        assert!(created.notes.is_empty());
    }

    #[test]
    fn create_rejects_invalid_coordinates() {
        let storage = PositionStorage::in_memory().unwrap();
        let err = storage.create(&create_request(95.0, 0.0)).unwrap_err();
        assert!(matches!(err, StorageError::Location(_)));
        assert_eq!(storage.count().unwrap(), 0);
    }

    #[test]
    fn find_all_is_chronological() {
        let storage = PositionStorage::in_memory().unwrap();
        storage.insert(&create_test_position("late", 3, 9)).unwrap();
        storage.insert(&create_test_position("early", 2, 9)).unwrap();
        storage.insert(&create_test_position("middle", 2, 22)).unwrap();

        let ids: Vec<String> = storage
            .find_all()
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec!["early", "middle", "late"]);
    }

    #[test]
    fn find_all_attaches_notes() {
        let storage = PositionStorage::in_memory().unwrap();
        storage.insert(&create_test_position("a", 2, 9)).unwrap();
        storage.insert(&create_test_position("b", 2, 10)).unwrap();
        storage
            .add_note("b", &AddNoteRequest::manual("Tåget är sent"))
            .unwrap();

        let all = storage.find_all().unwrap();
        assert!(all[0].notes.is_empty());
        assert_eq!(all[1].notes.len(), 1);
        assert_eq!(all[1].notes[0].text, "Tåget är sent");
    }

    #[test]
    fn insert_roundtrips_all_fields() {
        let storage = PositionStorage::in_memory().unwrap();
        let mut position = create_test_position("full", 2, 9);
        position.notes.push(Note {
            id: "n1".to_string(),
            text: "Hej".to_string(),
            timestamp: ts(2, 9),
            source: PositionSource::Telegram,
            telegram_user: Some("sara".to_string()),
        });
        storage.insert(&position).unwrap();

        let found = storage.find_by_id("full").unwrap().unwrap();
        assert_eq!(found, position);
    }

    #[test]
    fn insert_duplicate_id_fails() {
        let storage = PositionStorage::in_memory().unwrap();
        storage.insert(&create_test_position("dup", 2, 9)).unwrap();
        let err = storage.insert(&create_test_position("dup", 2, 10)).unwrap_err();
        assert!(matches!(err, StorageError::Database(_)));
    }

    #[test]
    fn get_nonexistent_position_returns_none() {
        let storage = PositionStorage::in_memory().unwrap();
        assert!(storage.find_by_id("missing").unwrap().is_none());
    }

    #[test]
    fn latest_returns_newest() {
        let storage = PositionStorage::in_memory().unwrap();
        assert!(storage.latest().unwrap().is_none());

        storage.insert(&create_test_position("old", 2, 9)).unwrap();
        storage.insert(&create_test_position("new", 4, 9)).unwrap();
        storage.insert(&create_test_position("mid", 3, 9)).unwrap();

        assert_eq!(storage.latest().unwrap().unwrap().id, "new");
    }

    #[test]
    fn update_changes_only_present_fields() {
        let storage = PositionStorage::in_memory().unwrap();
        storage.insert(&create_test_position("p", 2, 9)).unwrap();

        let updated = storage
            .update(
                "p",
                &UpdatePositionRequest {
                    latitude: Some(56.0),
                    city: Some("Helsingborg".to_string()),
                    ..Default::default()
                },
            )
            .unwrap()
            .unwrap();

        assert_eq!(updated.latitude, 56.0);
        assert_eq!(updated.longitude, 13.0038);
        assert_eq!(updated.city.as_deref(), Some("Helsingborg"));
        assert_eq!(updated.country.as_deref(), Some("Sverige"));
    }

    #[test]
    fn update_with_no_fields_returns_existing() {
        let storage = PositionStorage::in_memory().unwrap();
        let position = create_test_position("p", 2, 9);
        storage.insert(&position).unwrap();

        let same = storage
            .update("p", &UpdatePositionRequest::default())
            .unwrap()
            .unwrap();
        assert_eq!(same, position);
    }

    #[test]
    fn update_appends_legacy_note() {
        let storage = PositionStorage::in_memory().unwrap();
        storage.insert(&create_test_position("p", 2, 9)).unwrap();

        let updated = storage
            .update(
                "p",
                &UpdatePositionRequest {
                    notes: Some("Glass vid hamnen".to_string()),
                    ..Default::default()
                },
            )
            .unwrap()
            .unwrap();

        assert_eq!(updated.notes.len(), 1);
        assert_eq!(updated.notes[0].source, PositionSource::Manual);
    }

    #[test]
    fn update_nonexistent_returns_none() {
        let storage = PositionStorage::in_memory().unwrap();
        let result = storage
            .update(
                "missing",
                &UpdatePositionRequest {
                    city: Some("x".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn update_rejects_bad_latitude() {
        let storage = PositionStorage::in_memory().unwrap();
        storage.insert(&create_test_position("p", 2, 9)).unwrap();
        let err = storage
            .update(
                "p",
                &UpdatePositionRequest {
                    latitude: Some(-91.0),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, StorageError::Location(_)));
    }

    #[test]
    fn delete_removes_position_and_notes() {
        let storage = PositionStorage::in_memory().unwrap();
        storage.insert(&create_test_position("p", 2, 9)).unwrap();
        storage.add_note("p", &AddNoteRequest::manual("bye")).unwrap();

        assert!(storage.delete("p").unwrap());
        assert!(storage.find_by_id("p").unwrap().is_none());

        let conn = storage.lock().unwrap();
        let orphaned: i64 = conn
            .query_row("SELECT COUNT(*) FROM notes", [], |row| row.get(0))
            .unwrap();
        assert_eq!(orphaned, 0);
    }

    #[test]
    fn delete_nonexistent_returns_false() {
        let storage = PositionStorage::in_memory().unwrap();
        assert!(!storage.delete("missing").unwrap());
    }

    // ==================== Note Tests ====================

    #[test]
    fn add_note_to_unknown_position_returns_none() {
        let storage = PositionStorage::in_memory().unwrap();
        assert!(storage
            .add_note("missing", &AddNoteRequest::manual("hello"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn add_note_keeps_telegram_author() {
        let storage = PositionStorage::in_memory().unwrap();
        storage.insert(&create_test_position("p", 2, 9)).unwrap();

        let note = storage
            .add_note(
                "p",
                &AddNoteRequest {
                    text: "  Vi är i Berlin!  ".to_string(),
                    source: Some(PositionSource::Telegram),
                    telegram_user: Some("erasmus".to_string()),
                },
            )
            .unwrap()
            .unwrap();

        assert_eq!(note.text, "Vi är i Berlin!");
        assert_eq!(note.source, PositionSource::Telegram);
        assert_eq!(note.telegram_user.as_deref(), Some("erasmus"));
    }

    #[test]
    fn add_blank_note_fails() {
        let storage = PositionStorage::in_memory().unwrap();
        storage.insert(&create_test_position("p", 2, 9)).unwrap();
        assert!(storage.add_note("p", &AddNoteRequest::manual("")).is_err());
    }

    #[test]
    fn corrupt_source_is_invalid_data() {
        let storage = PositionStorage::in_memory().unwrap();
        storage.insert(&create_test_position("p", 2, 9)).unwrap();
        storage
            .lock()
            .unwrap()
            .execute("UPDATE positions SET source = 'pigeon'", [])
            .unwrap();

        let err = storage.find_by_id("p").unwrap_err();
        assert!(matches!(err, StorageError::InvalidData(_)));
    }

    #[test]
    fn corrupt_timestamp_surfaces_as_error() {
        let storage = PositionStorage::in_memory().unwrap();
        storage.insert(&create_test_position("p", 2, 9)).unwrap();
        storage
            .lock()
            .unwrap()
            .execute("UPDATE positions SET timestamp = 'someday'", [])
            .unwrap();

        assert!(storage.find_all().is_err());
    }
}

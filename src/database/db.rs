//! SQLite storage for review records
//!
//! Handles database initialization, the review record store used by the
//! scheduler, and the stand-in tables for the collaborators around it: user
//! profiles (level caps), the theme/card catalog, and the simulated current date.

use super::{Modified, ProfileSource, ReviewStore};
use crate::error::{Result as SchedulerResult, SchedulerError};
use crate::models::{CardId, CatalogCard, LevelCap, ReviewRecord, ThemeSnapshot, UserId};
use chrono::{Days, NaiveDate};
use rusqlite::{
    Connection, ErrorCode, OptionalExtension, Result, Row, TransactionBehavior, params,
};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Opens (or creates) the database file and makes sure every table exists.
///
/// `today` seeds the simulated current date the first time the file is created.
pub fn init_database(path: &Path, today: NaiveDate) -> Result<Connection> {
    let conn = Connection::open(path)?;
    init_schema(&conn, today)?;
    Ok(conn)
}

/// Creates tables for users, the card catalog, review records and app state.
pub fn init_schema(conn: &Connection, today: NaiveDate) -> Result<()> {
    conn.execute_batch(
        "PRAGMA foreign_keys = ON;

        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            level_cap INTEGER NOT NULL DEFAULT 7
        );

        CREATE TABLE IF NOT EXISTS themes (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS cards (
            id INTEGER PRIMARY KEY,
            theme_id INTEGER NOT NULL,
            front TEXT NOT NULL,
            back TEXT NOT NULL,
            FOREIGN KEY (theme_id) REFERENCES themes(id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS review_records (
            user_id INTEGER NOT NULL,
            card_id INTEGER NOT NULL,
            level INTEGER NOT NULL DEFAULT 1 CHECK (level BETWEEN 1 AND 7),
            due_date TEXT NOT NULL,
            last_reviewed_date TEXT,
            PRIMARY KEY (user_id, card_id)
        );

        CREATE INDEX IF NOT EXISTS idx_review_records_due_date
            ON review_records (due_date);

        CREATE TABLE IF NOT EXISTS app_state (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );",
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO app_state (key, value) VALUES ('current_date', ?1)",
        params![today],
    )?;

    Ok(())
}

/// Retrieves the simulated current date
pub fn get_current_date(conn: &Connection) -> Result<NaiveDate> {
    conn.query_row(
        "SELECT value FROM app_state WHERE key = 'current_date'",
        [],
        |row| row.get(0),
    )
}

/// Moves the simulated current date forward by one day and returns the new date
pub fn advance_day(conn: &Connection) -> Result<NaiveDate> {
    let next_day = get_current_date(conn)? + Days::new(1);
    conn.execute(
        "UPDATE app_state SET value = ?1 WHERE key = 'current_date'",
        params![next_day],
    )?;
    Ok(next_day)
}

/// Profile row standing in for the user service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserProfile {
    pub id: UserId,
    pub name: String,
    pub level_cap: i64,
}

/// Creates a user with the given level cap and returns its ID
pub fn new_user(name: &str, level_cap: LevelCap, conn: &Connection) -> Result<UserId> {
    conn.execute(
        "INSERT INTO users (name, level_cap) VALUES (?1, ?2)",
        params![name, level_cap.get()],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn set_level_cap(user_id: UserId, level_cap: LevelCap, conn: &Connection) -> Result<()> {
    conn.execute(
        "UPDATE users SET level_cap = ?1 WHERE id = ?2",
        params![level_cap.get(), user_id],
    )?;
    Ok(())
}

pub fn get_all_users(conn: &Connection) -> Result<Vec<UserProfile>> {
    let mut stmt = conn.prepare("SELECT id, name, level_cap FROM users ORDER BY id")?;
    let users = stmt
        .query_map([], |row| {
            Ok(UserProfile {
                id: row.get(0)?,
                name: row.get(1)?,
                level_cap: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>>>()?;
    Ok(users)
}

/// Stores a theme snapshot and its cards, replacing rows with the same IDs.
///
/// Cards the theme had before but the snapshot no longer lists are removed
/// from the catalog; their IDs are returned so the caller can drop their
/// review records.
pub fn save_theme(theme: &ThemeSnapshot, conn: &mut Connection) -> Result<Vec<CardId>> {
    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO themes (id, name) VALUES (?1, ?2)
         ON CONFLICT(id) DO UPDATE SET name = excluded.name",
        params![theme.id, theme.name],
    )?;

    let kept = theme.card_ids();
    let dropped = {
        let mut stmt = tx.prepare("SELECT id FROM cards WHERE theme_id = ?1 ORDER BY id")?;
        let existing = stmt
            .query_map(params![theme.id], |row| row.get::<_, CardId>(0))?
            .collect::<Result<Vec<_>>>()?;
        existing
            .into_iter()
            .filter(|id| !kept.contains(id))
            .collect::<Vec<_>>()
    };
    for card_id in &dropped {
        tx.execute("DELETE FROM cards WHERE id = ?1", params![card_id])?;
    }

    for card in &theme.cards {
        tx.execute(
            "INSERT INTO cards (id, theme_id, front, back) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET
                theme_id = excluded.theme_id, front = excluded.front, back = excluded.back",
            params![card.id, theme.id, card.front, card.back],
        )?;
    }
    tx.commit()?;

    if !dropped.is_empty() {
        debug!(theme_id = theme.id, dropped = dropped.len(), "cards dropped from theme");
    }
    Ok(dropped)
}

/// Retrieves all cards of a theme
pub fn get_cards_for_theme(theme_id: i64, conn: &Connection) -> Result<Vec<CatalogCard>> {
    let mut stmt =
        conn.prepare("SELECT id, front, back FROM cards WHERE theme_id = ?1 ORDER BY id")?;
    let cards = stmt
        .query_map(params![theme_id], |row| {
            Ok(CatalogCard {
                id: row.get(0)?,
                front: row.get(1)?,
                back: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>>>()?;
    Ok(cards)
}

/// Loads all themes with their cards into memory
pub fn load_all_themes(conn: &Connection) -> Result<Vec<ThemeSnapshot>> {
    let mut stmt = conn.prepare("SELECT id, name FROM themes ORDER BY id")?;
    let headers = stmt
        .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))?
        .collect::<Result<Vec<_>>>()?;

    let mut themes = Vec::with_capacity(headers.len());
    for (id, name) in headers {
        let cards = get_cards_for_theme(id, conn)?;
        themes.push(ThemeSnapshot { id, name, cards });
    }
    Ok(themes)
}

/// Deletes a theme and its cards from the catalog.
///
/// Returns the IDs of the removed cards so the caller can drop their review
/// records; the catalog never touches review records itself.
pub fn delete_theme(theme_id: i64, conn: &mut Connection) -> Result<Vec<CardId>> {
    let tx = conn.transaction()?;
    let card_ids = {
        let mut stmt = tx.prepare("SELECT id FROM cards WHERE theme_id = ?1")?;
        let ids = stmt
            .query_map(params![theme_id], |row| row.get(0))?
            .collect::<Result<Vec<CardId>>>()?;
        ids
    };
    tx.execute("DELETE FROM cards WHERE theme_id = ?1", params![theme_id])?;
    tx.execute("DELETE FROM themes WHERE id = ?1", params![theme_id])?;
    tx.commit()?;
    Ok(card_ids)
}

const RECORD_COLUMNS: &str = "user_id, card_id, level, due_date, last_reviewed_date";

fn record_from_row(row: &Row<'_>) -> Result<ReviewRecord> {
    Ok(ReviewRecord {
        user_id: row.get(0)?,
        card_id: row.get(1)?,
        level: row.get(2)?,
        due_date: row.get(3)?,
        last_reviewed_date: row.get(4)?,
    })
}

fn select_record(
    conn: &Connection,
    user_id: UserId,
    card_id: CardId,
) -> Result<Option<ReviewRecord>> {
    conn.query_row(
        &format!("SELECT {RECORD_COLUMNS} FROM review_records WHERE user_id = ?1 AND card_id = ?2"),
        params![user_id, card_id],
        record_from_row,
    )
    .optional()
}

fn select_records(
    conn: &Connection,
    filter: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<ReviewRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {RECORD_COLUMNS} FROM review_records WHERE {filter} ORDER BY due_date, user_id, card_id"
    ))?;
    let records = stmt
        .query_map(params, record_from_row)?
        .collect::<Result<Vec<_>>>()?;
    Ok(records)
}

/// Review record store over a shared SQLite connection.
///
/// Clones share the same connection; every read-modify-write holds the lock
/// for the whole transaction.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn open(path: &Path, today: NaiveDate) -> SchedulerResult<Self> {
        Ok(Self::from_connection(init_database(path, today)?))
    }

    pub fn open_in_memory(today: NaiveDate) -> SchedulerResult<Self> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn, today)?;
        Ok(Self::from_connection(conn))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    pub fn lock(&self) -> SchedulerResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| SchedulerError::PersistenceFailure("database lock poisoned".into()))
    }

    fn delete_where(
        &self,
        filter: &str,
        user_id: Option<UserId>,
        card_ids: &[CardId],
    ) -> SchedulerResult<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut removed = 0;
        for card_id in card_ids {
            removed += match user_id {
                Some(user_id) => tx.execute(
                    &format!("DELETE FROM review_records WHERE {filter}"),
                    params![card_id, user_id],
                )?,
                None => tx.execute(
                    &format!("DELETE FROM review_records WHERE {filter}"),
                    params![card_id],
                )?,
            };
        }
        tx.commit()?;
        Ok(removed)
    }
}

impl ReviewStore for SqliteStore {
    fn insert_new(&self, record: &ReviewRecord) -> SchedulerResult<()> {
        let conn = self.lock()?;
        let inserted = conn.execute(
            &format!("INSERT INTO review_records ({RECORD_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5)"),
            params![
                record.user_id,
                record.card_id,
                record.level,
                record.due_date,
                record.last_reviewed_date
            ],
        );

        match inserted {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                Err(SchedulerError::AlreadyEnrolled {
                    user_id: record.user_id,
                    card_id: record.card_id,
                })
            }
            Err(err) => Err(err.into()),
        }
    }

    fn find(&self, user_id: UserId, card_id: CardId) -> SchedulerResult<Option<ReviewRecord>> {
        let conn = self.lock()?;
        Ok(select_record(&conn, user_id, card_id)?)
    }

    fn modify(
        &self,
        user_id: UserId,
        card_id: CardId,
        update: &mut dyn FnMut(&ReviewRecord) -> Option<ReviewRecord>,
    ) -> SchedulerResult<Modified> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let Some(current) = select_record(&tx, user_id, card_id)? else {
            return Ok(Modified::Missing);
        };
        let Some(next) = update(&current) else {
            return Ok(Modified::Unchanged(current));
        };

        tx.execute(
            "UPDATE review_records
             SET level = ?1, due_date = ?2, last_reviewed_date = ?3
             WHERE user_id = ?4 AND card_id = ?5",
            params![next.level, next.due_date, next.last_reviewed_date, user_id, card_id],
        )?;
        tx.commit()?;

        debug!(user_id, card_id, level = next.level, due_date = %next.due_date, "review record updated");
        Ok(Modified::Updated(next))
    }

    fn records_for_user(&self, user_id: UserId) -> SchedulerResult<Vec<ReviewRecord>> {
        let conn = self.lock()?;
        Ok(select_records(&conn, "user_id = ?1", params![user_id])?)
    }

    fn due_for_user(
        &self,
        user_id: UserId,
        date: NaiveDate,
    ) -> SchedulerResult<Vec<ReviewRecord>> {
        let conn = self.lock()?;
        Ok(select_records(
            &conn,
            "user_id = ?1 AND due_date = ?2",
            params![user_id, date],
        )?)
    }

    fn due_on(&self, date: NaiveDate) -> SchedulerResult<Vec<ReviewRecord>> {
        let conn = self.lock()?;
        Ok(select_records(&conn, "due_date = ?1", params![date])?)
    }

    fn next_due_after(
        &self,
        user_id: UserId,
        date: NaiveDate,
    ) -> SchedulerResult<Option<NaiveDate>> {
        let conn = self.lock()?;
        let next = conn.query_row(
            "SELECT MIN(due_date) FROM review_records WHERE user_id = ?1 AND due_date > ?2",
            params![user_id, date],
            |row| row.get::<_, Option<NaiveDate>>(0),
        )?;
        Ok(next)
    }

    fn due_counts_on(&self, date: NaiveDate) -> SchedulerResult<Vec<(UserId, usize)>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT user_id, COUNT(*) FROM review_records
             WHERE due_date = ?1 GROUP BY user_id ORDER BY user_id",
        )?;
        let counts = stmt
            .query_map(params![date], |row| {
                Ok((row.get::<_, UserId>(0)?, row.get::<_, i64>(1)? as usize))
            })?
            .collect::<Result<Vec<_>>>()?;
        Ok(counts)
    }

    fn delete_for_cards(&self, card_ids: &[CardId]) -> SchedulerResult<usize> {
        self.delete_where("card_id = ?1", None, card_ids)
    }

    fn delete_for_user_cards(
        &self,
        user_id: UserId,
        card_ids: &[CardId],
    ) -> SchedulerResult<usize> {
        self.delete_where("card_id = ?1 AND user_id = ?2", Some(user_id), card_ids)
    }

    fn delete_for_user(&self, user_id: UserId) -> SchedulerResult<usize> {
        let conn = self.lock()?;
        Ok(conn.execute(
            "DELETE FROM review_records WHERE user_id = ?1",
            params![user_id],
        )?)
    }
}

impl ProfileSource for SqliteStore {
    /// Users without a profile row get the default cap.
    fn level_cap(&self, user_id: UserId) -> SchedulerResult<LevelCap> {
        let conn = self.lock()?;
        let stored = conn
            .query_row(
                "SELECT level_cap FROM users WHERE id = ?1",
                params![user_id],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;

        match stored {
            Some(value) => LevelCap::new(value),
            None => Ok(LevelCap::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn store() -> SqliteStore {
        SqliteStore::open_in_memory(date(2024, 1, 10)).unwrap()
    }

    fn record(user_id: UserId, card_id: CardId, level: u8, due: NaiveDate) -> ReviewRecord {
        ReviewRecord {
            user_id,
            card_id,
            level,
            due_date: due,
            last_reviewed_date: None,
        }
    }

    #[test]
    fn test_insert_and_find() {
        let store = store();
        let rec = record(1, 10, 1, date(2024, 1, 10));
        store.insert_new(&rec).unwrap();

        assert_eq!(store.find(1, 10).unwrap(), Some(rec));
        assert_eq!(store.find(1, 11).unwrap(), None);
    }

    #[test]
    fn test_duplicate_insert_is_already_enrolled() {
        let store = store();
        store.insert_new(&record(1, 10, 3, date(2024, 1, 10))).unwrap();

        let err = store
            .insert_new(&record(1, 10, 1, date(2024, 2, 1)))
            .unwrap_err();
        assert!(matches!(
            err,
            SchedulerError::AlreadyEnrolled {
                user_id: 1,
                card_id: 10
            }
        ));
        assert_eq!(store.find(1, 10).unwrap().unwrap().level, 3);
    }

    #[test]
    fn test_modify_writes_and_declines() {
        let store = store();
        store.insert_new(&record(1, 10, 1, date(2024, 1, 10))).unwrap();

        let updated = store
            .modify(1, 10, &mut |r| {
                Some(ReviewRecord {
                    level: 2,
                    ..r.clone()
                })
            })
            .unwrap();
        assert!(matches!(updated, Modified::Updated(ref r) if r.level == 2));
        assert_eq!(store.find(1, 10).unwrap().unwrap().level, 2);

        let unchanged = store.modify(1, 10, &mut |_| None).unwrap();
        assert!(matches!(unchanged, Modified::Unchanged(_)));
        assert_eq!(store.modify(9, 9, &mut |_| None).unwrap(), Modified::Missing);
    }

    #[test]
    fn test_due_queries() {
        let store = store();
        let today = date(2024, 1, 10);
        store.insert_new(&record(1, 10, 1, today)).unwrap();
        store.insert_new(&record(1, 11, 2, date(2024, 1, 14))).unwrap();
        store.insert_new(&record(1, 12, 2, date(2024, 1, 12))).unwrap();
        store.insert_new(&record(2, 10, 1, today)).unwrap();

        assert_eq!(store.due_for_user(1, today).unwrap().len(), 1);
        assert_eq!(store.due_on(today).unwrap().len(), 2);
        assert_eq!(store.next_due_after(1, today).unwrap(), Some(date(2024, 1, 12)));
        assert_eq!(store.next_due_after(2, today).unwrap(), None);
        assert_eq!(store.due_counts_on(today).unwrap(), vec![(1, 1), (2, 1)]);

        let all: Vec<CardId> = store
            .records_for_user(1)
            .unwrap()
            .iter()
            .map(|r| r.card_id)
            .collect();
        assert_eq!(all, vec![10, 12, 11]);
    }

    #[test]
    fn test_deletes() {
        let store = store();
        let today = date(2024, 1, 10);
        for user in [1, 2] {
            for card in [10, 11, 12] {
                store.insert_new(&record(user, card, 1, today)).unwrap();
            }
        }

        assert_eq!(store.delete_for_cards(&[10]).unwrap(), 2);
        assert_eq!(store.delete_for_user_cards(1, &[11, 12]).unwrap(), 2);
        assert_eq!(store.records_for_user(1).unwrap().len(), 0);
        assert_eq!(store.delete_for_user(2).unwrap(), 2);
        assert_eq!(store.due_on(today).unwrap().len(), 0);
    }

    #[test]
    fn test_level_cap_profiles() {
        let store = store();
        let user_id = {
            let conn = store.lock().unwrap();
            new_user("ana", LevelCap::new(4).unwrap(), &conn).unwrap()
        };

        assert_eq!(store.level_cap(user_id).unwrap().get(), 4);
        assert_eq!(store.level_cap(999).unwrap(), LevelCap::default());

        {
            let conn = store.lock().unwrap();
            set_level_cap(user_id, LevelCap::new(2).unwrap(), &conn).unwrap();
            assert_eq!(get_all_users(&conn).unwrap()[0].level_cap, 2);
        }
        assert_eq!(store.level_cap(user_id).unwrap().get(), 2);

        {
            let conn = store.lock().unwrap();
            conn.execute("UPDATE users SET level_cap = 9 WHERE id = ?1", params![user_id])
                .unwrap();
        }
        assert!(matches!(
            store.level_cap(user_id),
            Err(SchedulerError::InvalidLevelCap(9))
        ));
    }

    #[test]
    fn test_current_date_advances() {
        let store = store();
        let conn = store.lock().unwrap();

        assert_eq!(get_current_date(&conn).unwrap(), date(2024, 1, 10));
        assert_eq!(advance_day(&conn).unwrap(), date(2024, 1, 11));
        assert_eq!(get_current_date(&conn).unwrap(), date(2024, 1, 11));

        // Re-running the schema does not reset the stored date
        init_schema(&conn, date(2030, 1, 1)).unwrap();
        assert_eq!(get_current_date(&conn).unwrap(), date(2024, 1, 11));
    }

    #[test]
    fn test_theme_catalog_roundtrip_and_delete() {
        let store = store();
        let theme = ThemeSnapshot {
            id: 3,
            name: "Polish Vocabulary".to_string(),
            cards: vec![
                CatalogCard {
                    id: 30,
                    front: "cześć".to_string(),
                    back: "hello".to_string(),
                },
                CatalogCard {
                    id: 31,
                    front: "proszę".to_string(),
                    back: "please".to_string(),
                },
            ],
        };

        let mut conn = store.lock().unwrap();
        save_theme(&theme, &mut conn).unwrap();

        let themes = load_all_themes(&conn).unwrap();
        assert_eq!(themes.len(), 1);
        assert_eq!(themes[0].cards, theme.cards);

        assert_eq!(delete_theme(3, &mut conn).unwrap(), vec![30, 31]);
        assert!(load_all_themes(&conn).unwrap().is_empty());
    }

    #[test]
    fn test_resaving_theme_updates_in_place() {
        let store = store();
        let card = |id: CardId, back: &str| CatalogCard {
            id,
            front: format!("card {id}"),
            back: back.to_string(),
        };
        let mut theme = ThemeSnapshot {
            id: 4,
            name: "Verbs".to_string(),
            cards: vec![card(40, "to be"), card(41, "to have"), card(42, "to go")],
        };

        let mut conn = store.lock().unwrap();
        assert!(save_theme(&theme, &mut conn).unwrap().is_empty());

        theme.name = "Common Verbs".to_string();
        theme.cards = vec![card(40, "to be"), card(42, "to walk"), card(43, "to eat")];
        assert_eq!(save_theme(&theme, &mut conn).unwrap(), vec![41]);

        let themes = load_all_themes(&conn).unwrap();
        assert_eq!(themes.len(), 1);
        assert_eq!(themes[0].name, "Common Verbs");
        assert_eq!(themes[0].cards, theme.cards);
    }

    #[test]
    fn test_open_file_keeps_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reviews.sqlite3");
        let today = date(2024, 1, 10);

        {
            let store = SqliteStore::open(&path, today).unwrap();
            store.insert_new(&record(1, 10, 5, today)).unwrap();
        }

        let reopened = SqliteStore::open(&path, date(2025, 1, 1)).unwrap();
        assert_eq!(reopened.find(1, 10).unwrap().unwrap().level, 5);
        let conn = reopened.lock().unwrap();
        assert_eq!(get_current_date(&conn).unwrap(), today);
    }
}

// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # SQLite database backend.
//!
//! Document store on SQLite. Every collection is a table `(id TEXT PRIMARY KEY, value BLOB)`,
//! so the primary key index serves the ordered keyset pages directly.
//!

use store::{
    Error,
    database::{DbManager, DocumentCollection},
};

use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use tracing::{debug, info};

use std::sync::{Arc, Mutex, MutexGuard};
use std::{fs, path::Path};

/// SQLite database manager.
///
/// # Storage Model
///
/// - **Collections**: SQLite tables with (id, value) schema, one per agent type
/// - **Connection**: Thread-safe shared connection using Arc<Mutex<Connection>>
///
#[derive(Clone)]
pub struct SqliteManager {
    /// Thread-safe shared SQLite connection.
    conn: Arc<Mutex<Connection>>,
}

impl SqliteManager {
    /// Creates a new SQLite database manager.
    /// Opens or creates a SQLite database file at the specified path.
    ///
    /// # Arguments
    ///
    /// * `path` - Directory path where the database file will be created.
    ///            The database file will be named "database.db" within this directory.
    ///
    /// # Errors
    ///
    /// Returns Error::CreateStore if:
    /// - The directory cannot be created
    /// - The SQLite connection cannot be opened
    ///
    pub fn new(path: &str) -> Result<Self, Error> {
        info!("Creating SQLite database manager");
        if !Path::new(&path).exists() {
            info!("Path does not exist, creating it");
            fs::create_dir_all(path).map_err(|e| {
                Error::CreateStore(format!(
                    "fail SQLite create directory: {}",
                    e
                ))
            })?;
        }

        let conn = open(format!("{}/database.db", path)).map_err(|e| {
            Error::CreateStore(format!("fail SQLite open connection: {}", e))
        })?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, Error> {
        self.conn
            .lock()
            .map_err(|e| Error::Store(format!("sqlite open connection: {}", e)))
    }

    fn table_exists(&self, name: &str) -> Result<bool, Error> {
        let conn = self.lock()?;
        let found: Option<String> = conn
            .query_row(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| Error::Get(format!("sqlite table lookup: {}", e)))?;
        Ok(found.is_some())
    }
}

impl DbManager<SqliteCollection> for SqliteManager {
    fn create_collection(
        &self,
        name: &str,
    ) -> Result<SqliteCollection, Error> {
        let stmt = format!(
            "CREATE TABLE IF NOT EXISTS {} (id TEXT NOT NULL, value BLOB NOT NULL, \
            PRIMARY KEY (id))",
            quote(name)
        );

        {
            let conn = self.lock()?;
            conn.execute(stmt.as_str(), ()).map_err(|e| {
                Error::CreateStore(format!("fail SQLite create table: {}", e))
            })?;
        }

        Ok(SqliteCollection::new(self.conn.clone(), name))
    }

    fn collection(
        &self,
        name: &str,
    ) -> Result<Option<SqliteCollection>, Error> {
        if self.table_exists(name)? {
            Ok(Some(SqliteCollection::new(self.conn.clone(), name)))
        } else {
            debug!("SQLite table {} does not exist", name);
            Ok(None)
        }
    }

    fn collection_names(&self) -> Result<Vec<String>, Error> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT name FROM sqlite_master WHERE type = 'table' \
                AND name NOT LIKE 'sqlite_%' ORDER BY name",
            )
            .map_err(|e| Error::Get(format!("sqlite list tables: {}", e)))?;
        let names = stmt
            .query_map((), |row| row.get::<_, String>(0))
            .and_then(|rows| rows.collect::<Result<Vec<String>, _>>())
            .map_err(|e| Error::Get(format!("sqlite list tables: {}", e)))?;
        Ok(names)
    }

    /// Checkpoints the write-ahead log and closes the connection.
    ///
    /// Collections still alive keep the connection open. It then closes with the last of them.
    fn stop(self) -> Result<(), Error> {
        {
            let conn = self.lock()?;
            checkpoint(&conn)?;
        }
        match Arc::try_unwrap(self.conn) {
            Ok(conn) => {
                let conn = conn.into_inner().map_err(|e| {
                    Error::Store(format!("sqlite open connection: {}", e))
                })?;
                conn.close().map_err(|(_, e)| {
                    Error::Store(format!("SQLite failed to close: {}", e))
                })?;
                info!("SQLite database closed");
            }
            Err(_) => debug!("SQLite connection still in use by collections"),
        }
        Ok(())
    }
}

/// A SQLite table of documents keyed by id.
pub struct SqliteCollection {
    /// Shared SQLite connection.
    conn: Arc<Mutex<Connection>>,
    /// Table name in the database.
    table: String,
}

impl SqliteCollection {
    /// Creates a new SQLite collection over `table`.
    pub fn new(conn: Arc<Mutex<Connection>>, table: &str) -> Self {
        Self {
            conn,
            table: table.to_owned(),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, Error> {
        self.conn
            .lock()
            .map_err(|e| Error::Store(format!("sqlite open connection: {}", e)))
    }
}

impl DocumentCollection for SqliteCollection {
    fn name(&self) -> &str {
        self.table.as_str()
    }

    fn page(
        &self,
        after: Option<&str>,
        limit: usize,
    ) -> Result<Vec<String>, Error> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let conn = self.lock()?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let query = format!(
            "SELECT id FROM {} WHERE ?1 IS NULL OR id > ?1 ORDER BY id LIMIT ?2",
            quote(&self.table)
        );
        let mut stmt = conn
            .prepare(&query)
            .map_err(|e| Error::Get(format!("sqlite page query: {}", e)))?;
        let ids = stmt
            .query_map(params![after, limit], |row| row.get::<_, String>(0))
            .and_then(|rows| rows.collect::<Result<Vec<String>, _>>())
            .map_err(|e| Error::Get(format!("sqlite page query: {}", e)))?;
        Ok(ids)
    }

    fn count(&self) -> Result<u64, Error> {
        let conn = self.lock()?;
        let query = format!("SELECT COUNT(*) FROM {}", quote(&self.table));
        let count: i64 = conn
            .query_row(&query, (), |row| row.get(0))
            .map_err(|e| Error::Get(format!("sqlite count: {}", e)))?;
        Ok(count.max(0) as u64)
    }

    fn insert(&mut self, id: &str, value: &[u8]) -> Result<(), Error> {
        let conn = self.lock()?;
        let stmt = format!(
            "INSERT OR REPLACE INTO {} (id, value) VALUES (?1, ?2)",
            quote(&self.table)
        );
        conn.execute(&stmt, params![id, value])
            .map_err(|e| Error::Store(format!("sqlite insert error: {}", e)))?;
        Ok(())
    }

    fn flush(&self) -> Result<(), Error> {
        let conn = self.lock()?;
        checkpoint(&conn)
    }
}

/// Moves the write-ahead log into the database file and truncates the log.
fn checkpoint(conn: &Connection) -> Result<(), Error> {
    let busy: i64 = conn
        .query_row("PRAGMA wal_checkpoint(TRUNCATE)", (), |row| row.get(0))
        .map_err(|e| Error::Store(format!("sqlite checkpoint: {}", e)))?;
    if busy != 0 {
        return Err(Error::Store("sqlite checkpoint: database busy".to_owned()));
    }
    Ok(())
}

/// Quotes a table name. Collection names carry dots and mixed case.
fn quote(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Open a SQLite database connection.
pub fn open<P: AsRef<Path>>(path: P) -> Result<Connection, Error> {
    let path = path.as_ref();
    let flags =
        OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE;
    let conn = Connection::open_with_flags(path, flags).map_err(|e| {
        Error::Store(format!("SQLite failed to open connection: {}", e))
    })?;

    conn.execute_batch(
        "
        PRAGMA journal_mode=WAL;
        PRAGMA synchronous=NORMAL;
        ",
    )
    .map_err(|e| {
        Error::Store(format!("SQLite failed to execute batch: {}", e))
    })?;

    Ok(conn)
}

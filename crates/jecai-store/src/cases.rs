//! DuckDB storage for case records.

use std::path::Path;

use duckdb::{Connection, OptionalExt, Row, params};
use jecai_core::{CaseRecord, CaseStatus, HistoryRecord, NewCase};
use tracing::{debug, info};

use crate::StoreError;

const SCHEMA: &str = "
CREATE SEQUENCE IF NOT EXISTS processos_id_seq START 1;
CREATE TABLE IF NOT EXISTS processos (
    id               BIGINT PRIMARY KEY DEFAULT nextval('processos_id_seq'),
    cliente_nome     VARCHAR NOT NULL,
    cliente_telefone VARCHAR NOT NULL,
    tribunal         VARCHAR NOT NULL,
    status           VARCHAR NOT NULL,
    historico        VARCHAR NOT NULL
);
";

const SELECT_COLUMNS: &str =
    "SELECT id, cliente_nome, cliente_telefone, tribunal, status, historico FROM processos";

/// Case table (`processos`) backed by DuckDB.
///
/// Supports both in-memory (ephemeral) and persistent (file-backed) modes.
/// The table is created on open if it does not exist yet.
pub struct CaseStore {
    conn: Connection,
}

impl CaseStore {
    /// Open an in-memory database.
    pub fn open() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    /// Open or create a persistent database at the given path.
    pub fn open_persistent(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        info!(path = %path.display(), "opened case database");
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Insert a case and return its id.
    pub fn insert(&self, case: &NewCase) -> Result<i64, StoreError> {
        let id: i64 = self.conn.query_row(
            "INSERT INTO processos (cliente_nome, cliente_telefone, tribunal, status, historico)
             VALUES (?, ?, ?, ?, ?) RETURNING id",
            params![
                case.client_name,
                case.client_phone,
                case.court.as_str(),
                case.status.as_str(),
                case.history,
            ],
            |row| row.get(0),
        )?;
        info!(id, client = %case.client_name, court = %case.court, "case saved");
        Ok(id)
    }

    pub fn get(&self, id: i64) -> Result<CaseRecord, StoreError> {
        self.conn
            .query_row(&format!("{SELECT_COLUMNS} WHERE id = ?"), [id], map_row)
            .optional()?
            .ok_or(StoreError::NotFound(id))
    }

    /// All cases, newest first.
    pub fn list(&self) -> Result<Vec<CaseRecord>, StoreError> {
        let mut stmt = self
            .conn
            .prepare(&format!("{SELECT_COLUMNS} ORDER BY id DESC"))?;
        let rows = stmt
            .query_map([], map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        debug!(count = rows.len(), "listed cases");
        Ok(rows)
    }

    /// Most recent case for an exact client name.
    pub fn find_by_client(&self, name: &str) -> Result<Option<CaseRecord>, StoreError> {
        let record = self
            .conn
            .query_row(
                &format!("{SELECT_COLUMNS} WHERE cliente_nome = ? ORDER BY id DESC LIMIT 1"),
                [name],
                map_row,
            )
            .optional()?;
        Ok(record)
    }

    pub fn count(&self) -> Result<usize, StoreError> {
        let n: i64 = self
            .conn
            .query_row("SELECT count(*)::BIGINT FROM processos", [], |row| row.get(0))?;
        Ok(n as usize)
    }

    /// Replace the history blob verbatim.
    pub fn set_history(&self, id: i64, blob: &str) -> Result<(), StoreError> {
        let changed = self.conn.execute(
            "UPDATE processos SET historico = ? WHERE id = ?",
            params![blob, id],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    /// Append a timestamped event to a case's history.
    ///
    /// Legacy blobs are upgraded to the JSON form on write.
    pub fn append_event(&self, id: i64, note: &str) -> Result<HistoryRecord, StoreError> {
        let case = self.get(id)?;
        let mut history = HistoryRecord::parse(&case.history)?;
        history.push_event(note);
        self.set_history(id, &history.to_blob()?)?;
        debug!(id, note, events = history.events.len(), "history event appended");
        Ok(history)
    }

    /// Change a case's status and log `note` in its history in one write.
    ///
    /// The history is parsed first; if it cannot be read nothing is changed.
    pub fn set_status_with_event(
        &self,
        id: i64,
        status: &CaseStatus,
        note: &str,
    ) -> Result<HistoryRecord, StoreError> {
        let case = self.get(id)?;
        let mut history = HistoryRecord::parse(&case.history)?;
        history.push_event(note);
        let changed = self.conn.execute(
            "UPDATE processos SET status = ?, historico = ? WHERE id = ?",
            params![status.as_str(), history.to_blob()?, id],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(id));
        }
        info!(id, status = %status, "status updated");
        Ok(history)
    }
}

fn map_row(row: &Row<'_>) -> duckdb::Result<CaseRecord> {
    Ok(CaseRecord {
        id: row.get(0)?,
        client_name: row.get(1)?,
        client_phone: row.get(2)?,
        court: row.get::<_, String>(3)?.into(),
        status: row.get::<_, String>(4)?.into(),
        history: row.get(5)?,
    })
}

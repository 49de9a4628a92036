//! Append-only validation and audit history.
//!
//! Uses a separate SQLite file so the history survives a reset of the license
//! record. Update and delete are rejected by triggers.

use crate::error::{StoreError, StoreResult};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tollgate_types::{
    AuditKind, AuditLogEntry, ReasonCode, ValidationLogEntry, ValidationResultKind,
};

/// Persistent log backed by SQLite.
#[derive(Clone)]
pub struct AuditLog {
    conn: Arc<Mutex<Connection>>,
}

impl AuditLog {
    /// Opens (or creates) a log at the given path.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path.as_ref())
            .map_err(|e| StoreError::Database(format!("failed to open audit log: {e}")))?;
        Self::with_connection(conn)
    }

    /// Opens an in-memory log (for testing).
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory().map_err(|e| {
            StoreError::Database(format!("failed to open in-memory audit log: {e}"))
        })?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> StoreResult<Self> {
        let log = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        log.init_schema()?;
        Ok(log)
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.conn()?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS validation_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                result TEXT NOT NULL,
                reason TEXT NOT NULL,
                online INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS audit_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                kind TEXT NOT NULL,
                detail TEXT NOT NULL
            );

            CREATE TRIGGER IF NOT EXISTS validation_log_no_update
            BEFORE UPDATE ON validation_log
            BEGIN SELECT RAISE(ABORT, 'validation log is append-only'); END;

            CREATE TRIGGER IF NOT EXISTS validation_log_no_delete
            BEFORE DELETE ON validation_log
            BEGIN SELECT RAISE(ABORT, 'validation log is append-only'); END;

            CREATE TRIGGER IF NOT EXISTS audit_log_no_update
            BEFORE UPDATE ON audit_log
            BEGIN SELECT RAISE(ABORT, 'audit log is append-only'); END;

            CREATE TRIGGER IF NOT EXISTS audit_log_no_delete
            BEFORE DELETE ON audit_log
            BEGIN SELECT RAISE(ABORT, 'audit log is append-only'); END;
            ",
        )
        .map_err(|e| StoreError::Database(format!("failed to init audit schema: {e}")))?;
        Ok(())
    }

    // ── Validation log ───────────────────────────────────────────

    /// Appends a validation attempt.
    pub fn append_validation(&self, entry: &ValidationLogEntry) -> StoreResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO validation_log (timestamp, result, reason, online) VALUES (?1, ?2, ?3, ?4)",
            params![
                format_ts(entry.timestamp),
                entry.result.as_str(),
                entry.reason.as_str(),
                entry.online,
            ],
        )
        .map_err(|e| StoreError::Database(format!("failed to append validation entry: {e}")))?;
        Ok(())
    }

    /// Loads the most recent validation entries, newest first.
    pub fn recent_validations(&self, limit: usize) -> StoreResult<Vec<ValidationLogEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT timestamp, result, reason, online FROM validation_log ORDER BY id DESC LIMIT ?1",
            )
            .map_err(|e| StoreError::Database(format!("failed to prepare validation query: {e}")))?;

        let rows = stmt
            .query_map(params![limit as i64], |row| {
                let ts: String = row.get(0)?;
                let result: String = row.get(1)?;
                let reason: String = row.get(2)?;
                let online: bool = row.get(3)?;
                Ok((ts, result, reason, online))
            })
            .map_err(|e| StoreError::Database(format!("failed to query validation log: {e}")))?;

        let mut entries = Vec::new();
        for row in rows {
            let (ts, result, reason, online) = row
                .map_err(|e| StoreError::Database(format!("failed to read validation row: {e}")))?;
            entries.push(ValidationLogEntry {
                timestamp: parse_ts(&ts)?,
                result: ValidationResultKind::parse(&result).ok_or_else(|| {
                    StoreError::Corrupt(format!("unknown validation result: {result}"))
                })?,
                reason: ReasonCode::parse(&reason)
                    .ok_or_else(|| StoreError::Corrupt(format!("unknown reason code: {reason}")))?,
                online,
            });
        }
        Ok(entries)
    }

    /// Returns the number of validation entries.
    pub fn validation_count(&self) -> StoreResult<usize> {
        let conn = self.conn()?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM validation_log", [], |row| row.get(0))
            .map_err(|e| StoreError::Database(format!("failed to count validation log: {e}")))?;
        Ok(count as usize)
    }

    // ── Audit log ────────────────────────────────────────────────

    /// Appends an audited event.
    pub fn append_audit(&self, entry: &AuditLogEntry) -> StoreResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO audit_log (timestamp, kind, detail) VALUES (?1, ?2, ?3)",
            params![format_ts(entry.timestamp), entry.kind.as_str(), entry.detail],
        )
        .map_err(|e| StoreError::Database(format!("failed to append audit entry: {e}")))?;
        Ok(())
    }

    /// Loads the most recent audit entries, newest first.
    pub fn recent_audit(&self, limit: usize) -> StoreResult<Vec<AuditLogEntry>> {
        self.query_audit(
            "SELECT timestamp, kind, detail FROM audit_log ORDER BY id DESC LIMIT ?1",
            params![limit as i64],
        )
    }

    /// Loads every audit entry of one kind, oldest first.
    pub fn audit_of_kind(&self, kind: AuditKind) -> StoreResult<Vec<AuditLogEntry>> {
        self.query_audit(
            "SELECT timestamp, kind, detail FROM audit_log WHERE kind = ?1 ORDER BY id ASC",
            params![kind.as_str()],
        )
    }

    /// Returns the number of audit entries.
    pub fn audit_count(&self) -> StoreResult<usize> {
        let conn = self.conn()?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM audit_log", [], |row| row.get(0))
            .map_err(|e| StoreError::Database(format!("failed to count audit log: {e}")))?;
        Ok(count as usize)
    }

    fn query_audit(
        &self,
        sql: &str,
        args: impl rusqlite::Params,
    ) -> StoreResult<Vec<AuditLogEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| StoreError::Database(format!("failed to prepare audit query: {e}")))?;

        let rows = stmt
            .query_map(args, |row| {
                let ts: String = row.get(0)?;
                let kind: String = row.get(1)?;
                let detail: String = row.get(2)?;
                Ok((ts, kind, detail))
            })
            .map_err(|e| StoreError::Database(format!("failed to query audit log: {e}")))?;

        let mut entries = Vec::new();
        for row in rows {
            let (ts, kind, detail) =
                row.map_err(|e| StoreError::Database(format!("failed to read audit row: {e}")))?;
            entries.push(AuditLogEntry {
                timestamp: parse_ts(&ts)?,
                kind: AuditKind::parse(&kind)
                    .ok_or_else(|| StoreError::Corrupt(format!("unknown audit kind: {kind}")))?,
                detail,
            });
        }
        Ok(entries)
    }
}

fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(s: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("invalid timestamp {s}: {e}")))
}

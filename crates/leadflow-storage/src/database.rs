// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and schema
//! creation.
//!
//! All writes are serialized through tokio-rusqlite's single background
//! thread. Do NOT create additional Connection instances for writes.

use leadflow_core::LeadflowError;
use tracing::debug;

/// Fixed lead columns, in schema order. Flattened analysis sub-fields get
/// additional TEXT columns created on first write.
pub(crate) const LEAD_COLUMNS: &[&str] = &[
    "id",
    "phone",
    "whatsapp_phone",
    "email",
    "display_name",
    "partner_tag",
    "call_status",
    "retry_count",
    "next_retry_at",
    "whatsapp_sent",
    "email_sent",
    "external_call_id",
    "summary",
    "qualification",
    "structured_fields",
    "last_call_at",
    "last_terminal_reason",
    "callback_requested_at",
    "created_at",
];

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS leads (
    id TEXT PRIMARY KEY,
    phone TEXT NOT NULL,
    whatsapp_phone TEXT NOT NULL,
    email TEXT NOT NULL,
    display_name TEXT NOT NULL,
    partner_tag TEXT NOT NULL DEFAULT '',
    call_status TEXT NOT NULL,
    retry_count INTEGER NOT NULL DEFAULT 0,
    next_retry_at TEXT,
    whatsapp_sent INTEGER NOT NULL DEFAULT 0,
    email_sent INTEGER NOT NULL DEFAULT 0,
    external_call_id TEXT,
    summary TEXT,
    qualification TEXT,
    structured_fields TEXT,
    last_call_at TEXT,
    last_terminal_reason TEXT,
    callback_requested_at TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_leads_status ON leads (call_status);
CREATE INDEX IF NOT EXISTS idx_leads_next_retry ON leads (next_retry_at);

CREATE TABLE IF NOT EXISTS conversations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    lead_id TEXT NOT NULL,
    channel TEXT NOT NULL,
    direction TEXT NOT NULL,
    timestamp TEXT NOT NULL,
    subject TEXT NOT NULL DEFAULT '',
    content TEXT NOT NULL DEFAULT '',
    status TEXT NOT NULL DEFAULT ''
);

CREATE INDEX IF NOT EXISTS idx_conversations_lead ON conversations (lead_id);
";

/// Handle to the SQLite database behind the lead repository.
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (or create) the database, apply PRAGMAs, and create the schema.
    pub async fn open(path: &str) -> Result<Self, LeadflowError> {
        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(tokio_rusqlite::Error::from)
            .map_err(map_tr_err)?;
        conn.call(|conn| {
            conn.execute_batch(
                "PRAGMA journal_mode = WAL;
                 PRAGMA synchronous = NORMAL;
                 PRAGMA foreign_keys = ON;
                 PRAGMA busy_timeout = 5000;",
            )?;
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;
        debug!(path, "database opened");
        Ok(Self { conn })
    }

    /// In-memory database for tests.
    pub async fn open_in_memory() -> Result<Self, LeadflowError> {
        Self::open(":memory:").await
    }

    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }
}

/// Map a tokio-rusqlite error onto the repository error variant.
pub fn map_tr_err(err: tokio_rusqlite::Error) -> LeadflowError {
    LeadflowError::Repository {
        source: Box::new(err),
    }
}

// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the lead repository.
//!
//! Every `update_fields` call is one batched UPDATE statement. Flattened
//! analysis sub-fields arrive as `LeadPatch::extra` entries; their columns
//! are created with `ALTER TABLE` the first time a key is seen, so the
//! schema grows with whatever the analysis payload exposes.

use std::collections::HashSet;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use leadflow_core::{
    CallId, CallStatus, Channel, ConversationEntry, Direction, Lead, LeadFilter, LeadId,
    LeadPatch, LeadRepository, LeadflowError,
};
use rusqlite::types::ToSql;
use rusqlite::{params, params_from_iter};

use crate::database::{map_tr_err, Database, LEAD_COLUMNS};

pub struct SqliteLeadRepository {
    db: Database,
}

impl SqliteLeadRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

fn ts_to_sql(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339()
}

fn parse_ts(idx: usize, raw: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                idx,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })
}

fn parse_opt_ts(idx: usize, raw: Option<String>) -> rusqlite::Result<Option<DateTime<Utc>>> {
    raw.map(|s| parse_ts(idx, s)).transpose()
}

fn parse_enum<T: FromStr>(idx: usize, raw: String) -> rusqlite::Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.parse().map_err(|e: T::Err| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn lead_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Lead> {
    let id: String = row.get(0)?;
    let id = parse_enum::<uuid::Uuid>(0, id).map(LeadId)?;
    let call_status: String = row.get(6)?;
    let structured: Option<String> = row.get(14)?;
    let structured_fields = match structured {
        Some(raw) => Some(serde_json::from_str(&raw).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                14,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })?),
        None => None,
    };
    Ok(Lead {
        id,
        phone: row.get(1)?,
        whatsapp_phone: row.get(2)?,
        email: row.get(3)?,
        display_name: row.get(4)?,
        partner_tag: row.get(5)?,
        call_status: parse_enum::<CallStatus>(6, call_status)?,
        retry_count: row.get(7)?,
        next_retry_at: parse_opt_ts(8, row.get(8)?)?,
        whatsapp_sent: row.get(9)?,
        email_sent: row.get(10)?,
        external_call_id: row.get::<_, Option<String>>(11)?.map(CallId),
        summary: row.get(12)?,
        qualification: row.get(13)?,
        structured_fields,
        last_call_at: parse_opt_ts(15, row.get(15)?)?,
        last_terminal_reason: row.get(16)?,
        callback_requested_at: parse_opt_ts(17, row.get(17)?)?,
        created_at: parse_ts(18, row.get(18)?)?,
    })
}

/// Analysis keys become column names; anything outside `[A-Za-z0-9_]`
/// is replaced so payload text cannot inject SQL.
fn sanitize_column(key: &str) -> String {
    key.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

const SELECT_LEAD: &str = "SELECT id, phone, whatsapp_phone, email, display_name, partner_tag, \
     call_status, retry_count, next_retry_at, whatsapp_sent, email_sent, external_call_id, \
     summary, qualification, structured_fields, last_call_at, last_terminal_reason, \
     callback_requested_at, created_at FROM leads";

#[async_trait]
impl LeadRepository for SqliteLeadRepository {
    async fn list(&self, filter: &LeadFilter) -> Result<Vec<Lead>, LeadflowError> {
        let filter = filter.clone();
        self.db
            .connection()
            .call(move |conn| {
                let mut clauses: Vec<String> = Vec::new();
                let mut values: Vec<Box<dyn ToSql>> = Vec::new();

                if !filter.statuses.is_empty() {
                    let placeholders = vec!["?"; filter.statuses.len()].join(", ");
                    clauses.push(format!("call_status IN ({placeholders})"));
                    for status in &filter.statuses {
                        values.push(Box::new(status.to_string()));
                    }
                }
                if let Some(due_before) = filter.due_before {
                    // Pending leads carry no schedule but are always due.
                    clauses.push(
                        "((next_retry_at IS NOT NULL AND next_retry_at <= ?) \
                         OR (next_retry_at IS NULL AND call_status = 'pending'))"
                            .to_string(),
                    );
                    values.push(Box::new(ts_to_sql(&due_before)));
                }
                if filter.with_external_call_id {
                    clauses.push("external_call_id IS NOT NULL".to_string());
                }

                let mut sql = SELECT_LEAD.to_string();
                if !clauses.is_empty() {
                    sql.push_str(" WHERE ");
                    sql.push_str(&clauses.join(" AND "));
                }
                sql.push_str(" ORDER BY created_at ASC");

                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(
                    params_from_iter(values.iter().map(|v| v.as_ref())),
                    lead_from_row,
                )?;
                let mut leads = Vec::new();
                for row in rows {
                    leads.push(row?);
                }
                Ok(leads)
            })
            .await
            .map_err(map_tr_err)
    }

    async fn get_by_id(&self, id: LeadId) -> Result<Option<Lead>, LeadflowError> {
        let id = id.to_string();
        self.db
            .connection()
            .call(move |conn| {
                let sql = format!("{SELECT_LEAD} WHERE id = ?1");
                let mut stmt = conn.prepare(&sql)?;
                match stmt.query_row(params![id], lead_from_row) {
                    Ok(lead) => Ok(Some(lead)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(map_tr_err)
    }

    async fn update_fields(&self, id: LeadId, patch: &LeadPatch) -> Result<(), LeadflowError> {
        if patch.is_empty() {
            return Ok(());
        }
        let id_str = id.to_string();
        let patch = patch.clone();
        let affected = self
            .db
            .connection()
            .call(move |conn| {
                let mut sets: Vec<String> = Vec::new();
                let mut values: Vec<Box<dyn ToSql>> = Vec::new();
                let mut set =
                    |sets: &mut Vec<String>, values: &mut Vec<Box<dyn ToSql>>,
                     column: &str,
                     value: Box<dyn ToSql>| {
                        sets.push(format!("\"{column}\" = ?"));
                        values.push(value);
                    };

                if let Some(status) = patch.call_status {
                    set(&mut sets, &mut values, "call_status", Box::new(status.to_string()));
                }
                if let Some(count) = patch.retry_count {
                    set(&mut sets, &mut values, "retry_count", Box::new(count));
                }
                if let Some(next) = patch.next_retry_at {
                    set(
                        &mut sets,
                        &mut values,
                        "next_retry_at",
                        Box::new(next.as_ref().map(ts_to_sql)),
                    );
                }
                if let Some(sent) = patch.whatsapp_sent {
                    set(&mut sets, &mut values, "whatsapp_sent", Box::new(sent));
                }
                if let Some(sent) = patch.email_sent {
                    set(&mut sets, &mut values, "email_sent", Box::new(sent));
                }
                if let Some(call_id) = &patch.external_call_id {
                    set(
                        &mut sets,
                        &mut values,
                        "external_call_id",
                        Box::new(call_id.as_ref().map(|c| c.0.clone())),
                    );
                }
                if let Some(summary) = &patch.summary {
                    set(&mut sets, &mut values, "summary", Box::new(summary.clone()));
                }
                if let Some(qualification) = &patch.qualification {
                    set(
                        &mut sets,
                        &mut values,
                        "qualification",
                        Box::new(qualification.clone()),
                    );
                }
                if let Some(fields) = &patch.structured_fields {
                    set(
                        &mut sets,
                        &mut values,
                        "structured_fields",
                        Box::new(fields.to_string()),
                    );
                }
                if let Some(at) = patch.last_call_at {
                    set(&mut sets, &mut values, "last_call_at", Box::new(ts_to_sql(&at)));
                }
                if let Some(reason) = &patch.last_terminal_reason {
                    set(
                        &mut sets,
                        &mut values,
                        "last_terminal_reason",
                        Box::new(reason.clone()),
                    );
                }
                if let Some(at) = patch.callback_requested_at {
                    set(
                        &mut sets,
                        &mut values,
                        "callback_requested_at",
                        Box::new(at.as_ref().map(ts_to_sql)),
                    );
                }

                if !patch.extra.is_empty() {
                    // Create any missing analysis columns before the UPDATE.
                    let mut stmt = conn.prepare("PRAGMA table_info(leads)")?;
                    let existing: HashSet<String> = stmt
                        .query_map([], |row| row.get::<_, String>(1))?
                        .collect::<Result<_, _>>()?;
                    drop(stmt);
                    for (key, value) in &patch.extra {
                        let column = sanitize_column(key);
                        if column.is_empty() {
                            continue;
                        }
                        if !existing.contains(&column) {
                            conn.execute(
                                &format!("ALTER TABLE leads ADD COLUMN \"{column}\" TEXT"),
                                [],
                            )?;
                        }
                        set(&mut sets, &mut values, &column, Box::new(value.clone()));
                    }
                }

                let sql = format!("UPDATE leads SET {} WHERE id = ?", sets.join(", "));
                values.push(Box::new(id_str));
                let affected = conn.execute(
                    &sql,
                    params_from_iter(values.iter().map(|v| v.as_ref())),
                )?;
                Ok(affected)
            })
            .await
            .map_err(map_tr_err)?;

        if affected == 0 {
            return Err(LeadflowError::LeadNotFound { id });
        }
        Ok(())
    }

    async fn append(&self, lead: &Lead) -> Result<(), LeadflowError> {
        let lead = lead.clone();
        self.db
            .connection()
            .call(move |conn| {
                let columns = LEAD_COLUMNS.join(", ");
                let placeholders = (1..=LEAD_COLUMNS.len())
                    .map(|i| format!("?{i}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                conn.execute(
                    &format!("INSERT INTO leads ({columns}) VALUES ({placeholders})"),
                    params![
                        lead.id.to_string(),
                        lead.phone,
                        lead.whatsapp_phone,
                        lead.email,
                        lead.display_name,
                        lead.partner_tag,
                        lead.call_status.to_string(),
                        lead.retry_count,
                        lead.next_retry_at.as_ref().map(ts_to_sql),
                        lead.whatsapp_sent,
                        lead.email_sent,
                        lead.external_call_id.as_ref().map(|c| c.0.clone()),
                        lead.summary,
                        lead.qualification,
                        lead.structured_fields.as_ref().map(|v| v.to_string()),
                        lead.last_call_at.as_ref().map(ts_to_sql),
                        lead.last_terminal_reason,
                        lead.callback_requested_at.as_ref().map(ts_to_sql),
                        ts_to_sql(&lead.created_at),
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    async fn delete(&self, id: LeadId) -> Result<bool, LeadflowError> {
        let id = id.to_string();
        self.db
            .connection()
            .call(move |conn| {
                let affected = conn.execute("DELETE FROM leads WHERE id = ?1", params![id])?;
                Ok(affected > 0)
            })
            .await
            .map_err(map_tr_err)
    }

    async fn log_conversation(&self, entry: &ConversationEntry) -> Result<(), LeadflowError> {
        let entry = entry.clone();
        self.db
            .connection()
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO conversations (lead_id, channel, direction, timestamp, subject, content, status)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![
                        entry.lead_id.to_string(),
                        entry.channel.to_string(),
                        entry.direction.to_string(),
                        ts_to_sql(&entry.timestamp),
                        entry.subject,
                        entry.content,
                        entry.status,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    async fn conversations_for(
        &self,
        id: LeadId,
    ) -> Result<Vec<ConversationEntry>, LeadflowError> {
        let id = id.to_string();
        self.db
            .connection()
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT lead_id, channel, direction, timestamp, subject, content, status
                     FROM conversations WHERE lead_id = ?1 ORDER BY timestamp ASC, id ASC",
                )?;
                let rows = stmt.query_map(params![id], |row| {
                    let lead_id: String = row.get(0)?;
                    let channel: String = row.get(1)?;
                    let direction: String = row.get(2)?;
                    Ok(ConversationEntry {
                        lead_id: parse_enum::<uuid::Uuid>(0, lead_id).map(LeadId)?,
                        channel: parse_enum::<Channel>(1, channel)?,
                        direction: parse_enum::<Direction>(2, direction)?,
                        timestamp: parse_ts(3, row.get(3)?)?,
                        subject: row.get(4)?,
                        content: row.get(5)?,
                        status: row.get(6)?,
                    })
                })?;
                let mut entries = Vec::new();
                for row in rows {
                    entries.push(row?);
                }
                Ok(entries)
            })
            .await
            .map_err(map_tr_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    async fn repo() -> SqliteLeadRepository {
        let db = Database::open_in_memory().await.unwrap();
        SqliteLeadRepository::new(db)
    }

    fn lead(name: &str) -> Lead {
        Lead::new_pending("+15550001111", None, "a@b.c", name, "partner")
    }

    #[tokio::test]
    async fn append_and_get_round_trip() {
        let repo = repo().await;
        let mut lead = lead("Round Trip");
        lead.next_retry_at = Some(Utc::now() + Duration::hours(1));
        lead.structured_fields = Some(serde_json::json!({"country": "Germany"}));
        repo.append(&lead).await.unwrap();

        let stored = repo.get_by_id(lead.id).await.unwrap().unwrap();
        assert_eq!(stored.phone, lead.phone);
        assert_eq!(stored.call_status, CallStatus::Pending);
        assert_eq!(
            stored.next_retry_at.map(|t| t.timestamp()),
            lead.next_retry_at.map(|t| t.timestamp())
        );
        assert_eq!(stored.structured_fields, lead.structured_fields);
        assert!(repo.get_by_id(LeadId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_fields_is_one_batched_write() {
        let repo = repo().await;
        let lead = lead("Patched");
        repo.append(&lead).await.unwrap();

        let mut patch = LeadPatch::default().status(CallStatus::Missed);
        patch.retry_count = Some(2);
        patch.next_retry_at = Some(Some(Utc::now() + Duration::hours(4)));
        patch.last_terminal_reason = Some("customer-busy".to_string());
        repo.update_fields(lead.id, &patch).await.unwrap();

        let stored = repo.get_by_id(lead.id).await.unwrap().unwrap();
        assert_eq!(stored.call_status, CallStatus::Missed);
        assert_eq!(stored.retry_count, 2);
        assert!(stored.next_retry_at.is_some());
        assert_eq!(stored.last_terminal_reason.as_deref(), Some("customer-busy"));
    }

    #[tokio::test]
    async fn nullable_fields_can_be_cleared() {
        let repo = repo().await;
        let mut lead = lead("Cleared");
        lead.next_retry_at = Some(Utc::now());
        repo.append(&lead).await.unwrap();

        let mut patch = LeadPatch::default();
        patch.next_retry_at = Some(None);
        repo.update_fields(lead.id, &patch).await.unwrap();

        let stored = repo.get_by_id(lead.id).await.unwrap().unwrap();
        assert!(stored.next_retry_at.is_none());
    }

    #[tokio::test]
    async fn extra_fields_create_columns_on_first_write() {
        let repo = repo().await;
        let lead = lead("Extra Columns");
        repo.append(&lead).await.unwrap();

        let mut patch = LeadPatch::default();
        patch.extra.insert("course".to_string(), "MSc Data".to_string());
        patch.extra.insert("visa_status".to_string(), "ready".to_string());
        repo.update_fields(lead.id, &patch).await.unwrap();

        // Second write to an existing dynamic column must not re-ALTER.
        let mut patch = LeadPatch::default();
        patch.extra.insert("course".to_string(), "MBA".to_string());
        repo.update_fields(lead.id, &patch).await.unwrap();
    }

    #[tokio::test]
    async fn update_unknown_lead_reports_not_found() {
        let repo = repo().await;
        let patch = LeadPatch::default().status(CallStatus::Missed);
        let err = repo.update_fields(LeadId::new(), &patch).await.unwrap_err();
        assert!(matches!(err, LeadflowError::LeadNotFound { .. }));
    }

    #[tokio::test]
    async fn due_filter_matches_pending_and_overdue() {
        let repo = repo().await;
        let pending = lead("Pending");
        repo.append(&pending).await.unwrap();

        let mut overdue = lead("Overdue");
        overdue.call_status = CallStatus::Missed;
        overdue.next_retry_at = Some(Utc::now() - Duration::minutes(5));
        repo.append(&overdue).await.unwrap();

        let mut future = lead("Future");
        future.call_status = CallStatus::Missed;
        future.next_retry_at = Some(Utc::now() + Duration::hours(1));
        repo.append(&future).await.unwrap();

        let mut exhausted = lead("Exhausted");
        exhausted.call_status = CallStatus::Missed;
        repo.append(&exhausted).await.unwrap();

        let due = repo
            .list(&LeadFilter::due_for_call(Utc::now(), true))
            .await
            .unwrap();
        let ids: Vec<LeadId> = due.iter().map(|l| l.id).collect();
        assert!(ids.contains(&pending.id));
        assert!(ids.contains(&overdue.id));
        assert!(!ids.contains(&future.id));
        assert!(!ids.contains(&exhausted.id));
    }

    #[tokio::test]
    async fn in_flight_filter_requires_call_id() {
        let repo = repo().await;
        let mut with_id = lead("With Call");
        with_id.call_status = CallStatus::Initiated;
        with_id.external_call_id = Some(CallId("call-1".to_string()));
        repo.append(&with_id).await.unwrap();

        let mut without_id = lead("No Call");
        without_id.call_status = CallStatus::Initiated;
        repo.append(&without_id).await.unwrap();

        let stuck = repo.list(&LeadFilter::in_flight()).await.unwrap();
        assert_eq!(stuck.len(), 1);
        assert_eq!(stuck[0].id, with_id.id);
    }

    #[tokio::test]
    async fn delete_reports_existence() {
        let repo = repo().await;
        let lead = lead("Deleted");
        repo.append(&lead).await.unwrap();
        assert!(repo.delete(lead.id).await.unwrap());
        assert!(!repo.delete(lead.id).await.unwrap());
    }

    #[tokio::test]
    async fn conversation_log_appends_in_order() {
        let repo = repo().await;
        let lead = lead("Chatty");
        repo.append(&lead).await.unwrap();

        let first = ConversationEntry::outbound(lead.id, Channel::Email, "subject", "first");
        let second = ConversationEntry::outbound(lead.id, Channel::Whatsapp, "tpl", "second")
            .with_status("dry-run");
        repo.log_conversation(&first).await.unwrap();
        repo.log_conversation(&second).await.unwrap();

        let log = repo.conversations_for(lead.id).await.unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].content, "first");
        assert_eq!(log[1].channel, Channel::Whatsapp);
        assert_eq!(log[1].status, "dry-run");
    }

    #[tokio::test]
    async fn data_survives_reopening_the_database_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("leads.db");
        let path = path.to_str().unwrap();

        let lead = lead("Durable");
        {
            let db = Database::open(path).await.unwrap();
            let repo = SqliteLeadRepository::new(db);
            repo.append(&lead).await.unwrap();
        }

        let db = Database::open(path).await.unwrap();
        let repo = SqliteLeadRepository::new(db);
        let stored = repo.get_by_id(lead.id).await.unwrap().unwrap();
        assert_eq!(stored.display_name, "Durable");
    }

    #[test]
    fn column_sanitization_strips_injection() {
        assert_eq!(sanitize_column("visa_status"), "visa_status");
        assert_eq!(sanitize_column("bad; DROP TABLE"), "bad__DROP_TABLE");
    }
}

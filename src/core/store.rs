//! SQLite interaction log and handoff desk
//!
//! Migrations are SQL files embedded at compile time and applied in order on
//! open, tracked by the `_callbot_migrations` table. Timestamps are stored as
//! RFC 3339 UTC strings with millisecond precision so they sort lexically.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};
use uuid::Uuid;

use crate::core::records::{CallSummary, HandoffDesk, InteractionLog, TurnRecord};
use crate::error::{CallbotError, Result};
use crate::types::{HandoffTicket, Role};

struct Migration {
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        name: "000_interactions",
        sql: include_str!("migrations/000_interactions.sql"),
    },
    Migration {
        name: "001_conversation_messages",
        sql: include_str!("migrations/001_conversation_messages.sql"),
    },
    Migration {
        name: "002_handoff_tickets",
        sql: include_str!("migrations/002_handoff_tickets.sql"),
    },
];

/// Apply pending migrations; returns how many ran
pub fn run_migrations(conn: &Connection) -> Result<usize> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _callbot_migrations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;

    let mut applied = 0;
    for migration in MIGRATIONS {
        let done: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM _callbot_migrations WHERE name = ?1",
            [migration.name],
            |row| row.get(0),
        )?;
        if done {
            debug!(migration = migration.name, "migration already applied, skipping");
            continue;
        }

        info!(migration = migration.name, "applying migration");
        let tx = conn.unchecked_transaction()?;
        tx.execute_batch(migration.sql)?;
        tx.execute("INSERT INTO _callbot_migrations (name) VALUES (?1)", [migration.name])?;
        tx.commit()?;
        applied += 1;
    }
    Ok(applied)
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn percent(part: i64, whole: i64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    (part as f64 * 1000.0 / whole as f64).round() / 10.0
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InteractionRow {
    pub id: String,
    pub session_id: String,
    pub started_at: String,
    pub ended_at: Option<String>,
    pub status: String,
    pub satisfaction_score: Option<i64>,
    pub final_intent: Option<String>,
    pub turn_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageRow {
    pub turn_number: i64,
    pub role: String,
    pub text: String,
    pub intent: Option<String>,
    pub action: Option<String>,
    pub route: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TicketRow {
    pub id: String,
    pub interaction_id: Option<String>,
    pub queue_type: String,
    pub reason: String,
    pub key_information: serde_json::Value,
    pub created_at: String,
}

/// Satisfaction over a time window. Rates are percentages, one decimal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SatisfactionStats {
    pub total_calls: i64,
    pub feedbacks: i64,
    pub satisfied: i64,
    pub unsatisfied: i64,
    pub satisfaction_rate: f64,
    pub feedback_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntentSatisfaction {
    pub intent: String,
    pub feedbacks: i64,
    pub satisfied: i64,
    pub unsatisfied: i64,
    pub satisfaction_rate: f64,
}

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a database file; ":memory:" gives a private in-memory one
    pub fn open(path: &str) -> Result<Self> {
        let conn = if path == ":memory:" {
            Connection::open_in_memory()?
        } else {
            Connection::open(path)?
        };
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn interaction(&self, id: &str) -> Result<Option<InteractionRow>> {
        let conn = self.conn();
        let row = conn
            .query_row(
                "SELECT id, session_id, started_at, ended_at, status, satisfaction_score, final_intent, turn_count
                 FROM callbot_interactions WHERE id = ?1",
                [id],
                |row| {
                    Ok(InteractionRow {
                        id: row.get(0)?,
                        session_id: row.get(1)?,
                        started_at: row.get(2)?,
                        ended_at: row.get(3)?,
                        status: row.get(4)?,
                        satisfaction_score: row.get(5)?,
                        final_intent: row.get(6)?,
                        turn_count: row.get(7)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    pub fn messages(&self, interaction_id: &str) -> Result<Vec<MessageRow>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT turn_number, role, text, intent, action, route
             FROM conversation_messages WHERE interaction_id = ?1 ORDER BY id",
        )?;
        let rows = stmt
            .query_map([interaction_id], |row| {
                Ok(MessageRow {
                    turn_number: row.get(0)?,
                    role: row.get(1)?,
                    text: row.get(2)?,
                    intent: row.get(3)?,
                    action: row.get(4)?,
                    route: row.get(5)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn tickets(&self, interaction_id: &str) -> Result<Vec<TicketRow>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, interaction_id, queue_type, reason, key_information, created_at
             FROM handoff_tickets WHERE interaction_id = ?1 ORDER BY created_at",
        )?;
        let rows = stmt
            .query_map([interaction_id], |row| {
                let raw: String = row.get(4)?;
                let key_information = serde_json::from_str(&raw).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
                })?;
                Ok(TicketRow {
                    id: row.get(0)?,
                    interaction_id: row.get(1)?,
                    queue_type: row.get(2)?,
                    reason: row.get(3)?,
                    key_information,
                    created_at: row.get(5)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Calls started in the last `days` days, or all calls when `None`.
    /// A window reaching past the representable date range covers all calls.
    pub fn satisfaction_statistics(&self, days: Option<u32>) -> Result<SatisfactionStats> {
        let cutoff = days
            .and_then(|d| Duration::try_days(i64::from(d)))
            .and_then(|window| Utc::now().checked_sub_signed(window))
            .map(timestamp)
            .unwrap_or_default();
        let conn = self.conn();
        let (total_calls, feedbacks, satisfied, unsatisfied): (i64, i64, i64, i64) = conn.query_row(
            "SELECT COUNT(*),
                    COUNT(satisfaction_score),
                    COALESCE(SUM(CASE WHEN satisfaction_score = 1 THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN satisfaction_score = 2 THEN 1 ELSE 0 END), 0)
             FROM callbot_interactions WHERE started_at >= ?1",
            [cutoff],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )?;

        Ok(SatisfactionStats {
            total_calls,
            feedbacks,
            satisfied,
            unsatisfied,
            satisfaction_rate: percent(satisfied, feedbacks),
            feedback_rate: percent(feedbacks, total_calls),
        })
    }

    /// Satisfaction per final intent, most answered first
    pub fn satisfaction_by_intent(&self) -> Result<Vec<IntentSatisfaction>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT final_intent,
                    COUNT(*) AS feedbacks,
                    SUM(CASE WHEN satisfaction_score = 1 THEN 1 ELSE 0 END),
                    SUM(CASE WHEN satisfaction_score = 2 THEN 1 ELSE 0 END)
             FROM callbot_interactions
             WHERE satisfaction_score IS NOT NULL AND final_intent IS NOT NULL
             GROUP BY final_intent
             ORDER BY feedbacks DESC, final_intent",
        )?;
        let rows = stmt
            .query_map([], |row| {
                let feedbacks: i64 = row.get(1)?;
                let satisfied: i64 = row.get(2)?;
                Ok(IntentSatisfaction {
                    intent: row.get(0)?,
                    feedbacks,
                    satisfied,
                    unsatisfied: row.get(3)?,
                    satisfaction_rate: percent(satisfied, feedbacks),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

impl InteractionLog for SqliteStore {
    fn open_interaction(&self, session_id: &str) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        self.conn().execute(
            "INSERT INTO callbot_interactions (id, session_id, started_at) VALUES (?1, ?2, ?3)",
            params![id, session_id, timestamp(Utc::now())],
        )?;
        Ok(id)
    }

    fn log_turn(&self, record: &TurnRecord) -> Result<()> {
        let conn = self.conn();
        let tx = conn.unchecked_transaction()?;
        let d = &record.decision;
        let at = timestamp(record.at);

        for (role, text) in [
            (Role::Caller, record.observation.transcript.as_str()),
            (Role::Bot, record.bot_reply.as_str()),
        ] {
            tx.execute(
                "INSERT INTO conversation_messages
                    (interaction_id, turn_number, role, text, intent, urgency, emotion, emotion_score,
                     confidence, action, route, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    record.interaction_id,
                    record.turn_number,
                    role.as_str(),
                    text,
                    d.intent.as_str(),
                    d.urgency.as_str(),
                    record.observation.emotion_label.as_str(),
                    record.observation.emotion_score,
                    d.confidence,
                    d.action.as_str(),
                    record.route.as_str(),
                    at,
                ],
            )?;
        }
        tx.execute(
            "UPDATE callbot_interactions SET turn_count = MAX(turn_count, ?2) WHERE id = ?1",
            params![record.interaction_id, record.turn_number],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn finalize(&self, interaction_id: &str, summary: &CallSummary) -> Result<()> {
        let updated = self.conn().execute(
            "UPDATE callbot_interactions
             SET status = ?2, satisfaction_score = ?3, final_intent = ?4, turn_count = ?5, ended_at = ?6
             WHERE id = ?1",
            params![
                interaction_id,
                summary.status.as_str(),
                summary.satisfaction.map(|s| s.value()),
                summary.final_intent.map(|i| i.as_str()),
                summary.turns,
                timestamp(summary.ended_at),
            ],
        )?;
        if updated == 0 {
            return Err(CallbotError::collaborator(
                "interaction log",
                format!("unknown interaction {interaction_id}"),
            ));
        }
        Ok(())
    }
}

impl HandoffDesk for SqliteStore {
    fn open_ticket(&self, interaction_id: Option<&str>, ticket: HandoffTicket) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let key_information = serde_json::to_string(&ticket.key_information)
            .map_err(|e| CallbotError::collaborator("handoff desk", e.to_string()))?;
        self.conn().execute(
            "INSERT INTO handoff_tickets (id, interaction_id, queue_type, reason, key_information, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                id,
                interaction_id,
                ticket.queue_type.as_str(),
                ticket.reason,
                key_information,
                timestamp(ticket.created_at),
            ],
        )?;
        Ok(id)
    }
}

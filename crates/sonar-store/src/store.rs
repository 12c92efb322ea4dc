//! SQLite-backed store access.
//!
//! One `Mutex<Connection>` serializes access; WAL mode keeps concurrent
//! readers cheap. All dashboard tables are read-only from here — the only
//! table this crate creates is `agent_runs`.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use serde_json::Value;
use sonar_types::{CallSummary, IcpProfile, TeamRole, TeamRoleKind};
use tracing::info;

use crate::decode;
use crate::error::Result;
use crate::rows::{CoachingNote, CompanyRow, MemberStats, TeamMemberRow, TranscriptRow, UserRow};

/// Sales data store backed by SQLite.
pub struct SalesStore {
    pub(crate) conn: Mutex<Connection>,
}

impl std::fmt::Debug for SalesStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SalesStore").finish_non_exhaustive()
    }
}

impl SalesStore {
    /// Open or create a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_FULL_MUTEX,
        )?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize()?;

        info!("Sales store opened at {:?}", path);
        Ok(store)
    }

    /// Create an in-memory store (useful for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize()?;
        Ok(store)
    }

    /// Set pragmas and ensure the one table this crate owns.
    fn initialize(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA foreign_keys = ON;

             CREATE TABLE IF NOT EXISTS agent_runs (
                 id TEXT PRIMARY KEY,
                 agent_type TEXT NOT NULL,
                 prompt TEXT NOT NULL,
                 system_prompt TEXT NOT NULL,
                 user_message TEXT NOT NULL,
                 output TEXT NOT NULL,
                 model TEXT NOT NULL,
                 prompt_tokens INTEGER NOT NULL,
                 completion_tokens INTEGER NOT NULL,
                 total_tokens INTEGER NOT NULL,
                 cost_usd REAL NOT NULL,
                 transcript_id TEXT,
                 company_id TEXT,
                 user_id TEXT,
                 context_type TEXT NOT NULL,
                 duration_ms INTEGER NOT NULL,
                 status TEXT NOT NULL,
                 error_message TEXT,
                 is_best INTEGER NOT NULL DEFAULT 0,
                 created_at TEXT NOT NULL
             );
             CREATE INDEX IF NOT EXISTS idx_agent_runs_created
                 ON agent_runs(created_at);",
        )?;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Transcripts
    // ─────────────────────────────────────────────────────────────────────────

    /// Fetch one transcript with its decoded JSON columns.
    pub fn transcript(&self, id: &str) -> Result<Option<TranscriptRow>> {
        let conn = self.conn.lock().unwrap();
        let row = conn
            .query_row(
                "SELECT id, title, company_id, user_id, created_at, score, deal_signal,
                        participants, analysis, lines
                 FROM transcripts WHERE id = ?1",
                params![id],
                |row| {
                    Ok(TranscriptRow::decode(
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                        row.get(6)?,
                        row.get(7)?,
                        row.get(8)?,
                        row.get(9)?,
                    ))
                },
            )
            .optional()?;
        Ok(row)
    }

    /// The company a transcript belongs to, if linked.
    pub fn transcript_company_id(&self, transcript_id: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().unwrap();
        let company: Option<Option<String>> = conn
            .query_row(
                "SELECT company_id FROM transcripts WHERE id = ?1",
                params![transcript_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(company.flatten())
    }

    /// All of a user's calls as summaries, newest first.
    pub fn transcripts_for_user(&self, user_id: &str) -> Result<Vec<CallSummary>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, title, score, deal_signal, created_at
             FROM transcripts WHERE user_id = ?1
             ORDER BY created_at DESC",
        )?;
        let rows = stmt.query_map(params![user_id], map_call_summary)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// The user's most recent scored calls, newest first.
    pub fn recent_scored_calls(&self, user_id: &str, limit: usize) -> Result<Vec<CallSummary>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, title, score, deal_signal, created_at
             FROM transcripts WHERE user_id = ?1 AND score IS NOT NULL
             ORDER BY created_at DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![user_id, limit as i64], map_call_summary)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Companies
    // ─────────────────────────────────────────────────────────────────────────

    /// Fetch one company with its decoded JSON columns.
    pub fn company(&self, id: &str) -> Result<Option<CompanyRow>> {
        let conn = self.conn.lock().unwrap();
        let row = conn
            .query_row(
                "SELECT id, name, domain, user_id, pain_points, contacts, goal
                 FROM companies WHERE id = ?1",
                params![id],
                map_company_row,
            )
            .optional()?;
        Ok(row)
    }

    /// All companies owned by a user.
    pub fn companies_for_user(&self, user_id: &str) -> Result<Vec<CompanyRow>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, name, domain, user_id, pain_points, contacts, goal
             FROM companies WHERE user_id = ?1 ORDER BY name",
        )?;
        let rows = stmt.query_map(params![user_id], map_company_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Calls associated with a company, newest first, capped.
    pub fn recent_company_calls(&self, company_id: &str, limit: usize) -> Result<Vec<CallSummary>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT t.id, t.title, t.score, t.deal_signal, t.created_at
             FROM company_calls cc
             JOIN transcripts t ON t.id = cc.transcript_id
             WHERE cc.company_id = ?1
             ORDER BY t.created_at DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![company_id, limit as i64], map_call_summary)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Calls for a company excluding one transcript, newest first, capped.
    ///
    /// Used for the previous-calls fragment when the current call itself is
    /// already in the context.
    pub fn other_company_calls(
        &self,
        company_id: &str,
        exclude_transcript_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<CallSummary>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT t.id, t.title, t.score, t.deal_signal, t.created_at
             FROM company_calls cc
             JOIN transcripts t ON t.id = cc.transcript_id
             WHERE cc.company_id = ?1 AND t.id != ?2
             ORDER BY t.created_at DESC LIMIT ?3",
        )?;
        let rows = stmt.query_map(
            params![company_id, exclude_transcript_id.unwrap_or(""), limit as i64],
            map_call_summary,
        )?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Users & teams
    // ─────────────────────────────────────────────────────────────────────────

    /// Fetch a user row.
    pub fn user(&self, id: &str) -> Result<Option<UserRow>> {
        let conn = self.conn.lock().unwrap();
        let row = conn
            .query_row(
                "SELECT id, name, team_id, sales_motion FROM users WHERE id = ?1",
                params![id],
                |row| {
                    Ok(UserRow {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        team_id: row.get(2)?,
                        sales_motion: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    /// Resolved role entries for a user.
    pub fn roles_for_user(&self, user_id: &str) -> Result<Vec<TeamRole>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT role, is_system, description
             FROM team_roles WHERE user_id = ?1 ORDER BY is_system DESC, role",
        )?;
        let rows = stmt.query_map(params![user_id], |row| {
            let is_system: bool = row.get(1)?;
            Ok(TeamRole {
                name: row.get(0)?,
                kind: if is_system {
                    TeamRoleKind::System
                } else {
                    TeamRoleKind::Custom
                },
                description: row.get(2)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Roster of a team.
    pub fn team_members(&self, team_id: &str) -> Result<Vec<TeamMemberRow>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare("SELECT id, name FROM users WHERE team_id = ?1 ORDER BY name")?;
        let rows = stmt.query_map(params![team_id], |row| {
            Ok(TeamMemberRow {
                user_id: row.get(0)?,
                name: row.get(1)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Call count and average score for one member.
    pub fn member_call_stats(&self, user_id: &str) -> Result<MemberStats> {
        let conn = self.conn.lock().unwrap();
        let stats = conn.query_row(
            "SELECT COUNT(*), AVG(score) FROM transcripts WHERE user_id = ?1",
            params![user_id],
            |row| {
                Ok(MemberStats {
                    call_count: row.get(0)?,
                    average_score: row.get(1)?,
                })
            },
        )?;
        Ok(stats)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Enrichment
    // ─────────────────────────────────────────────────────────────────────────

    /// ICP/persona enrichment for the company, decoded tolerantly.
    pub fn icp_for_company(&self, company_id: &str) -> Result<Option<IcpProfile>> {
        let conn = self.conn.lock().unwrap();
        let raw: Option<(Option<String>, Option<String>, Option<String>, Option<String>)> = conn
            .query_row(
                "SELECT value_proposition, products, icp_attributes, personas
                 FROM company_icp WHERE company_id = ?1",
                params![company_id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()?;

        Ok(raw.map(|(value_proposition, products, attributes, personas)| {
            let products: Option<Value> =
                decode::parse_json(products.as_deref(), "company_icp.products");
            let attributes: Option<Value> =
                decode::parse_json(attributes.as_deref(), "company_icp.icp_attributes");
            let personas: Option<Value> =
                decode::parse_json(personas.as_deref(), "company_icp.personas");

            IcpProfile {
                value_proposition: value_proposition.filter(|v| !v.is_empty()),
                products: decode::string_list(products.as_ref()),
                icp_attributes: decode::string_list(attributes.as_ref()),
                personas: decode::persona_list(personas.as_ref()),
            }
        }))
    }

    /// Recent coaching notes for a user, newest first.
    pub fn coaching_notes_for_user(&self, user_id: &str, limit: usize) -> Result<Vec<CoachingNote>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT note, transcript_id, created_at
             FROM coaching_notes WHERE user_id = ?1
             ORDER BY created_at DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![user_id, limit as i64], |row| {
            Ok(CoachingNote {
                note: row.get(0)?,
                transcript_id: row.get(1)?,
                created_at: row.get(2)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

fn map_call_summary(row: &rusqlite::Row<'_>) -> rusqlite::Result<CallSummary> {
    Ok(CallSummary {
        transcript_id: row.get(0)?,
        title: row.get(1)?,
        score: row.get(2)?,
        deal_signal: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn map_company_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CompanyRow> {
    Ok(CompanyRow::decode(
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

//! Schema and seed fixtures for tests.
//!
//! The dashboard owns these tables in production; tests recreate them here so
//! the accessors and fetchers have something to read.

use crate::store::SalesStore;
use rusqlite::params;

/// Create the dashboard-owned tables in an (in-memory) store.
pub fn create_dashboard_schema(store: &SalesStore) {
    let conn = store.conn.lock().unwrap();
    conn.execute_batch(
        "CREATE TABLE transcripts (
             id TEXT PRIMARY KEY,
             title TEXT NOT NULL,
             company_id TEXT,
             user_id TEXT,
             created_at TEXT NOT NULL,
             score INTEGER,
             deal_signal TEXT,
             participants TEXT,
             analysis TEXT,
             lines TEXT
         );
         CREATE TABLE companies (
             id TEXT PRIMARY KEY,
             name TEXT NOT NULL,
             domain TEXT,
             user_id TEXT,
             pain_points TEXT,
             contacts TEXT,
             goal TEXT
         );
         CREATE TABLE company_calls (
             company_id TEXT NOT NULL,
             transcript_id TEXT NOT NULL,
             created_at TEXT NOT NULL
         );
         CREATE TABLE users (
             id TEXT PRIMARY KEY,
             name TEXT,
             team_id TEXT,
             sales_motion TEXT
         );
         CREATE TABLE team_roles (
             team_id TEXT NOT NULL,
             user_id TEXT NOT NULL,
             role TEXT NOT NULL,
             is_system INTEGER NOT NULL,
             description TEXT
         );
         CREATE TABLE company_icp (
             company_id TEXT PRIMARY KEY,
             value_proposition TEXT,
             products TEXT,
             icp_attributes TEXT,
             personas TEXT
         );
         CREATE TABLE coaching_notes (
             id INTEGER PRIMARY KEY AUTOINCREMENT,
             user_id TEXT NOT NULL,
             transcript_id TEXT,
             note TEXT NOT NULL,
             created_at TEXT NOT NULL
         );",
    )
    .expect("failed to create dashboard schema");
}

/// Run arbitrary SQL against the store, for fixture surgery in tests
/// (deleting rows, dropping tables to simulate failures).
pub fn execute(store: &SalesStore, sql: &str) {
    let conn = store.conn.lock().unwrap();
    conn.execute_batch(sql).expect("failed to execute test SQL");
}

/// Seed data for one transcript row.
#[derive(Debug, Clone)]
pub struct TranscriptFixture {
    pub id: String,
    pub title: String,
    pub company_id: Option<String>,
    pub user_id: Option<String>,
    pub created_at: String,
    pub score: Option<i64>,
    pub deal_signal: Option<String>,
    pub participants: Option<String>,
    pub analysis: Option<String>,
    pub lines: Option<String>,
}

impl Default for TranscriptFixture {
    fn default() -> Self {
        Self {
            id: "t1".to_string(),
            title: "Untitled call".to_string(),
            company_id: None,
            user_id: None,
            created_at: "2026-01-01T00:00:00Z".to_string(),
            score: None,
            deal_signal: None,
            participants: None,
            analysis: None,
            lines: None,
        }
    }
}

/// Insert a transcript row.
pub fn insert_transcript(store: &SalesStore, fixture: TranscriptFixture) {
    let conn = store.conn.lock().unwrap();
    conn.execute(
        "INSERT INTO transcripts (id, title, company_id, user_id, created_at, score,
                                  deal_signal, participants, analysis, lines)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            fixture.id,
            fixture.title,
            fixture.company_id,
            fixture.user_id,
            fixture.created_at,
            fixture.score,
            fixture.deal_signal,
            fixture.participants,
            fixture.analysis,
            fixture.lines,
        ],
    )
    .expect("failed to insert transcript fixture");
}

/// Link a transcript to a company.
pub fn link_company_call(store: &SalesStore, company_id: &str, transcript_id: &str, at: &str) {
    let conn = store.conn.lock().unwrap();
    conn.execute(
        "INSERT INTO company_calls (company_id, transcript_id, created_at) VALUES (?1, ?2, ?3)",
        params![company_id, transcript_id, at],
    )
    .expect("failed to link company call");
}

/// Insert a company row.
pub fn insert_company(
    store: &SalesStore,
    id: &str,
    name: &str,
    domain: Option<&str>,
    user_id: Option<&str>,
    pain_points_json: Option<&str>,
    contacts_json: Option<&str>,
    goal: Option<&str>,
) {
    let conn = store.conn.lock().unwrap();
    conn.execute(
        "INSERT INTO companies (id, name, domain, user_id, pain_points, contacts, goal)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![id, name, domain, user_id, pain_points_json, contacts_json, goal],
    )
    .expect("failed to insert company fixture");
}

/// Insert a user row.
pub fn insert_user(
    store: &SalesStore,
    id: &str,
    name: Option<&str>,
    team_id: Option<&str>,
    sales_motion: Option<&str>,
) {
    let conn = store.conn.lock().unwrap();
    conn.execute(
        "INSERT INTO users (id, name, team_id, sales_motion) VALUES (?1, ?2, ?3, ?4)",
        params![id, name, team_id, sales_motion],
    )
    .expect("failed to insert user fixture");
}

/// Insert a team role entry.
pub fn insert_role(
    store: &SalesStore,
    team_id: &str,
    user_id: &str,
    role: &str,
    is_system: bool,
    description: Option<&str>,
) {
    let conn = store.conn.lock().unwrap();
    conn.execute(
        "INSERT INTO team_roles (team_id, user_id, role, is_system, description)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![team_id, user_id, role, is_system, description],
    )
    .expect("failed to insert role fixture");
}

/// Insert an ICP enrichment row.
pub fn insert_icp(
    store: &SalesStore,
    company_id: &str,
    value_proposition: Option<&str>,
    products_json: Option<&str>,
    icp_attributes_json: Option<&str>,
    personas_json: Option<&str>,
) {
    let conn = store.conn.lock().unwrap();
    conn.execute(
        "INSERT INTO company_icp (company_id, value_proposition, products, icp_attributes, personas)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            company_id,
            value_proposition,
            products_json,
            icp_attributes_json,
            personas_json,
        ],
    )
    .expect("failed to insert ICP fixture");
}

/// Insert a coaching note.
pub fn insert_coaching_note(
    store: &SalesStore,
    user_id: &str,
    transcript_id: Option<&str>,
    note: &str,
    at: &str,
) {
    let conn = store.conn.lock().unwrap();
    conn.execute(
        "INSERT INTO coaching_notes (user_id, transcript_id, note, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![user_id, transcript_id, note, at],
    )
    .expect("failed to insert coaching note fixture");
}

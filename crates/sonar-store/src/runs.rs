//! Persistence for agent run records.
//!
//! One row per invocation, written after the user-visible stream has
//! finished. Callers treat failures here as diagnostics only; nothing in
//! this module is on the response path.

use std::sync::Arc;

use rusqlite::{OptionalExtension, params};
use sonar_types::{AgentRunRecord, RunStatus};
use tracing::debug;

use crate::error::{Result, StoreError};
use crate::store::SalesStore;

/// Writer for the `agent_runs` table.
#[derive(Debug, Clone)]
pub struct RunLogger {
    store: Arc<SalesStore>,
}

impl RunLogger {
    /// Create a logger over the given store.
    pub fn new(store: Arc<SalesStore>) -> Self {
        Self { store }
    }

    /// Insert exactly one record for a finished run.
    pub fn record(&self, record: &AgentRunRecord) -> Result<()> {
        let conn = self.store.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO agent_runs (
                 id, agent_type, prompt, system_prompt, user_message, output,
                 model, prompt_tokens, completion_tokens, total_tokens, cost_usd,
                 transcript_id, company_id, user_id, context_type, duration_ms,
                 status, error_message, is_best, created_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13,
                       ?14, ?15, ?16, ?17, ?18, ?19, ?20)",
            params![
                record.id,
                record.agent_type,
                record.prompt,
                record.system_prompt,
                record.user_message,
                record.output,
                record.model,
                record.prompt_tokens,
                record.completion_tokens,
                record.total_tokens,
                record.cost_usd,
                record.transcript_id,
                record.company_id,
                record.user_id,
                record.context_type,
                record.duration_ms as i64,
                record.status.as_str(),
                record.error_message,
                record.is_best,
                record.created_at,
            ],
        )?;

        debug!(
            run_id = %record.id,
            status = record.status.as_str(),
            duration_ms = record.duration_ms,
            "agent run recorded"
        );
        Ok(())
    }

    /// Toggle the reviewer-facing "best answer" flag.
    ///
    /// Returns `false` when no run with that id exists.
    pub fn set_best(&self, run_id: &str, is_best: bool) -> Result<bool> {
        let conn = self.store.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE agent_runs SET is_best = ?2 WHERE id = ?1",
            params![run_id, is_best],
        )?;
        Ok(changed > 0)
    }

    /// Fetch one run record.
    pub fn get(&self, run_id: &str) -> Result<Option<AgentRunRecord>> {
        let conn = self.store.conn.lock().unwrap();
        let record = conn
            .query_row(
                "SELECT id, agent_type, prompt, system_prompt, user_message, output,
                        model, prompt_tokens, completion_tokens, total_tokens, cost_usd,
                        transcript_id, company_id, user_id, context_type, duration_ms,
                        status, error_message, is_best, created_at
                 FROM agent_runs WHERE id = ?1",
                params![run_id],
                |row| {
                    let status: String = row.get(16)?;
                    let duration_ms: i64 = row.get(15)?;
                    Ok(AgentRunRecord {
                        id: row.get(0)?,
                        agent_type: row.get(1)?,
                        prompt: row.get(2)?,
                        system_prompt: row.get(3)?,
                        user_message: row.get(4)?,
                        output: row.get(5)?,
                        model: row.get(6)?,
                        prompt_tokens: row.get(7)?,
                        completion_tokens: row.get(8)?,
                        total_tokens: row.get(9)?,
                        cost_usd: row.get(10)?,
                        transcript_id: row.get(11)?,
                        company_id: row.get(12)?,
                        user_id: row.get(13)?,
                        context_type: row.get(14)?,
                        duration_ms: duration_ms.max(0) as u64,
                        status: RunStatus::parse(&status).unwrap_or(RunStatus::Error),
                        error_message: row.get(17)?,
                        is_best: row.get(18)?,
                        created_at: row.get(19)?,
                    })
                },
            )
            .optional()?;
        Ok(record)
    }

    /// Fetch the most recently created run, if any.
    pub fn latest(&self) -> Result<Option<AgentRunRecord>> {
        let id: Option<String> = {
            let conn = self.store.conn.lock().unwrap();
            conn.query_row(
                "SELECT id FROM agent_runs ORDER BY created_at DESC, rowid DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?
        };
        match id {
            Some(id) => self.get(&id),
            None => Ok(None),
        }
    }

    /// Number of recorded runs.
    pub fn count(&self) -> Result<i64> {
        let conn = self.store.conn.lock().unwrap();
        conn.query_row("SELECT COUNT(*) FROM agent_runs", [], |row| row.get(0))
            .map_err(StoreError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> AgentRunRecord {
        let mut record = AgentRunRecord::new("chat", "mock-model");
        record.system_prompt = "You are a sales assistant.".to_string();
        record.user_message = "How did the demo go?".to_string();
        record.output = "It went well.".to_string();
        record.prompt_tokens = 100;
        record.completion_tokens = 40;
        record.total_tokens = 140;
        record.cost_usd = 0.0009;
        record.transcript_id = Some("42".to_string());
        record.context_type = "call".to_string();
        record.duration_ms = 1200;
        record
    }

    #[test]
    fn test_record_and_get_round_trip() {
        let store = Arc::new(SalesStore::open_in_memory().unwrap());
        let logger = RunLogger::new(store);

        let record = sample_record();
        logger.record(&record).unwrap();

        let loaded = logger.get(&record.id).unwrap().unwrap();
        assert_eq!(loaded.status, RunStatus::Completed);
        assert_eq!(loaded.transcript_id.as_deref(), Some("42"));
        assert_eq!(loaded.context_type, "call");
        assert_eq!(loaded.prompt_tokens, 100);
        assert_eq!(loaded.duration_ms, 1200);
        assert!(!loaded.is_best);
    }

    #[test]
    fn test_error_record_keeps_message() {
        let store = Arc::new(SalesStore::open_in_memory().unwrap());
        let logger = RunLogger::new(store);

        let mut record = sample_record();
        record.output = "Hello".to_string();
        record.fail("stream aborted mid-flight");
        logger.record(&record).unwrap();

        let loaded = logger.get(&record.id).unwrap().unwrap();
        assert_eq!(loaded.status, RunStatus::Error);
        assert_eq!(loaded.output, "Hello");
        assert_eq!(
            loaded.error_message.as_deref(),
            Some("stream aborted mid-flight")
        );
    }

    #[test]
    fn test_set_best() {
        let store = Arc::new(SalesStore::open_in_memory().unwrap());
        let logger = RunLogger::new(store);

        let record = sample_record();
        logger.record(&record).unwrap();

        assert!(logger.set_best(&record.id, true).unwrap());
        assert!(logger.get(&record.id).unwrap().unwrap().is_best);

        assert!(logger.set_best(&record.id, false).unwrap());
        assert!(!logger.get(&record.id).unwrap().unwrap().is_best);

        assert!(!logger.set_best("missing", true).unwrap());
    }

    #[test]
    fn test_count_and_latest() {
        let store = Arc::new(SalesStore::open_in_memory().unwrap());
        let logger = RunLogger::new(store);
        assert_eq!(logger.count().unwrap(), 0);
        assert!(logger.latest().unwrap().is_none());

        let first = sample_record();
        logger.record(&first).unwrap();
        let second = sample_record();
        logger.record(&second).unwrap();

        assert_eq!(logger.count().unwrap(), 2);
        assert_eq!(logger.latest().unwrap().unwrap().id, second.id);
    }
}

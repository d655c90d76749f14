//! SQLite storage for synced bills, summaries, sync jobs, and query usage.

use std::fmt;
use std::path::Path;

use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

#[derive(thiserror::Error, Debug)]
pub enum DbError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("date parse error: {0}")]
    Date(#[from] chrono::ParseError),
    #[error("unknown job status: {0}")]
    UnknownStatus(String),
}

/// Summary type stored for the one-paragraph AI summary.
pub const SUMMARY_BRIEF: &str = "BRIEF";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "PENDING" => Some(Self::Pending),
            "RUNNING" => Some(Self::Running),
            "COMPLETED" => Some(Self::Completed),
            "FAILED" => Some(Self::Failed),
            "CANCELLED" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateRecord {
    pub state_id: i64,
    pub code: String,
    pub name: String,
}

/// Bill row as written by a sync.
#[derive(Debug, Clone, Default)]
pub struct NewBill {
    pub state_id: i64,
    pub legiscan_bill_id: Option<i64>,
    pub session_id: Option<i64>,
    pub bill_number: String,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub status_date: Option<String>,
    pub last_action_date: Option<String>,
    pub last_action: Option<String>,
    pub sponsor: Option<String>,
    /// `None` leaves previously stored text in place.
    pub full_text: Option<String>,
    pub source_url: Option<String>,
    pub change_hash: Option<String>,
}

/// Outcome of writing a bill row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BillUpsert {
    pub bill_id: i64,
    /// True for a new row or when the stored change hash differed.
    pub changed: bool,
}

#[derive(Debug, Clone)]
pub struct NewSummary {
    pub bill_id: i64,
    pub summary_type: String,
    pub content: String,
    pub key_points: Vec<String>,
    pub impact: Option<String>,
    pub category: Option<String>,
    pub priority: Option<String>,
    pub ai_model: Option<String>,
    pub confidence: Option<f64>,
}

/// Partial job update; `None` fields keep their stored value.
#[derive(Debug, Clone, Default)]
pub struct JobUpdate {
    pub status: Option<JobStatus>,
    pub bills_found: Option<i64>,
    pub bills_processed: Option<i64>,
    pub bills_summarized: Option<i64>,
    pub errors: Option<Vec<String>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Job {
    pub job_id: i64,
    pub state: String,
    pub status: JobStatus,
    pub bills_found: i64,
    pub bills_processed: i64,
    pub bills_summarized: i64,
    pub errors: Vec<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Bill row joined with its latest brief summary.
#[derive(Debug, Clone, Serialize)]
pub struct StoredBill {
    pub bill_id: i64,
    pub bill_number: String,
    pub title: String,
    pub status: String,
    pub last_action_date: Option<String>,
    pub last_action: Option<String>,
    pub sponsor: Option<String>,
    pub has_text: bool,
    pub summary: Option<String>,
}

/// Monthly query consumption against the plan allowance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuotaUsage {
    pub month: String,
    pub used: u64,
    pub limit: u64,
    pub remaining: u64,
    pub percentage: f64,
    pub reset_date: NaiveDate,
}

impl QuotaUsage {
    pub fn new(today: NaiveDate, used: u64, limit: u64) -> Self {
        let percentage = if limit == 0 {
            100.0
        } else {
            used as f64 / limit as f64 * 100.0
        };
        let reset_date = today
            .with_day(1)
            .and_then(|first| first.checked_add_months(Months::new(1)))
            .unwrap_or(today);
        Self {
            month: month_key(today),
            used,
            limit,
            remaining: limit.saturating_sub(used),
            percentage,
            reset_date,
        }
    }

    pub fn exhausted(&self) -> bool {
        self.used >= self.limit
    }
}

/// Usage bucket key, e.g. `2025-04`.
pub fn month_key(date: NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}

/// Persistence operations the ingestion adapter depends on.
pub trait Storage {
    fn upsert_state(&self, code: &str, name: &str) -> Result<StateRecord, DbError>;
    fn upsert_bill(&self, bill: &NewBill) -> Result<BillUpsert, DbError>;
    fn create_summary(&self, summary: &NewSummary) -> Result<i64, DbError>;
    /// True once a summarizer-generated (not placeholder) summary exists.
    fn has_generated_summary(&self, bill_id: i64) -> Result<bool, DbError>;
    fn create_job(&self, state: &str) -> Result<i64, DbError>;
    fn update_job(&self, job_id: i64, update: &JobUpdate) -> Result<(), DbError>;
    fn get_job(&self, job_id: i64) -> Result<Option<Job>, DbError>;
    fn record_query_usage(&self, month: &str, queries: u64) -> Result<(), DbError>;
    fn query_usage(&self, month: &str) -> Result<u64, DbError>;
}

pub struct Db {
    conn: Connection,
}

impl Db {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self { conn })
    }

    /// Creates any missing tables. Safe to call on every start.
    pub fn init(&self) -> Result<(), DbError> {
        let schema = include_str!("../../schema/sqlite.sql");
        self.conn.execute_batch(schema)?;
        self.conn.pragma_update(None, "user_version", 1)?;
        Ok(())
    }

    pub fn bill_count(&self) -> Result<i64, DbError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(1) FROM bills", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Bills for a state, most recent action first.
    pub fn bills_for_state(&self, code: &str, limit: usize) -> Result<Vec<StoredBill>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT b.bill_id, b.bill_number, b.title, b.status, b.last_action_date,
                    b.last_action, b.sponsor, b.full_text IS NOT NULL,
                    (SELECT s.content FROM summaries s
                     WHERE s.bill_id = b.bill_id AND s.summary_type = ?2
                     ORDER BY s.summary_id DESC LIMIT 1)
             FROM bills b
             JOIN states st ON st.state_id = b.state_id
             WHERE st.code = ?1
             ORDER BY b.last_action_date DESC, b.bill_number
             LIMIT ?3",
        )?;
        let rows = stmt.query_map(
            params![code.to_uppercase(), SUMMARY_BRIEF, limit as i64],
            |row| {
                Ok(StoredBill {
                    bill_id: row.get(0)?,
                    bill_number: row.get(1)?,
                    title: row.get(2)?,
                    status: row.get(3)?,
                    last_action_date: row.get(4)?,
                    last_action: row.get(5)?,
                    sponsor: row.get(6)?,
                    has_text: row.get(7)?,
                    summary: row.get(8)?,
                })
            },
        )?;
        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }

    pub fn recent_jobs(&self, limit: usize) -> Result<Vec<Job>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT job_id, state, status, bills_found, bills_processed, bills_summarized, errors,
                    started_at, completed_at, created_at
             FROM scraping_jobs
             ORDER BY created_at DESC, job_id DESC
             LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(params![limit as i64], raw_job)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(RawJob::into_job).collect()
    }

    pub fn summaries_for_bill(&self, bill_id: i64) -> Result<i64, DbError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(1) FROM summaries WHERE bill_id = ?1",
            params![bill_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

impl Storage for Db {
    fn upsert_state(&self, code: &str, name: &str) -> Result<StateRecord, DbError> {
        let code = code.to_uppercase();
        self.conn.execute(
            "INSERT INTO states (code, name) VALUES (?1, ?2)
             ON CONFLICT(code) DO NOTHING",
            params![code, name],
        )?;
        let record = self.conn.query_row(
            "SELECT state_id, code, name FROM states WHERE code = ?1",
            params![code],
            |row| {
                Ok(StateRecord {
                    state_id: row.get(0)?,
                    code: row.get(1)?,
                    name: row.get(2)?,
                })
            },
        )?;
        Ok(record)
    }

    fn upsert_bill(&self, bill: &NewBill) -> Result<BillUpsert, DbError> {
        let now = Utc::now().to_rfc3339();
        let stored_hash: Option<Option<String>> = self
            .conn
            .query_row(
                "SELECT change_hash FROM bills WHERE state_id = ?1 AND bill_number = ?2",
                params![bill.state_id, bill.bill_number],
                |row| row.get(0),
            )
            .optional()?;
        let changed = match stored_hash {
            None => true,
            Some(hash) => hash != bill.change_hash,
        };
        self.conn.execute(
            "INSERT INTO bills (
                state_id, legiscan_bill_id, session_id, bill_number, title, description,
                status, status_date, last_action_date, last_action, sponsor, full_text,
                source_url, change_hash, scraped_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?15)
             ON CONFLICT(state_id, bill_number) DO UPDATE SET
                legiscan_bill_id = excluded.legiscan_bill_id,
                session_id = excluded.session_id,
                title = excluded.title,
                description = excluded.description,
                status = excluded.status,
                status_date = excluded.status_date,
                last_action_date = excluded.last_action_date,
                last_action = excluded.last_action,
                sponsor = excluded.sponsor,
                full_text = COALESCE(excluded.full_text, bills.full_text),
                source_url = excluded.source_url,
                change_hash = excluded.change_hash,
                updated_at = excluded.updated_at",
            params![
                bill.state_id,
                bill.legiscan_bill_id,
                bill.session_id,
                bill.bill_number,
                bill.title,
                bill.description,
                bill.status,
                bill.status_date,
                bill.last_action_date,
                bill.last_action,
                bill.sponsor,
                bill.full_text,
                bill.source_url,
                bill.change_hash,
                now,
            ],
        )?;
        let id: i64 = self.conn.query_row(
            "SELECT bill_id FROM bills WHERE state_id = ?1 AND bill_number = ?2",
            params![bill.state_id, bill.bill_number],
            |row| row.get(0),
        )?;
        Ok(BillUpsert {
            bill_id: id,
            changed,
        })
    }

    fn create_summary(&self, summary: &NewSummary) -> Result<i64, DbError> {
        let key_points = serde_json::to_string(&summary.key_points)?;
        self.conn.execute(
            "INSERT INTO summaries (
                bill_id, summary_type, content, key_points, impact, category,
                priority, ai_model, confidence
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                summary.bill_id,
                summary.summary_type,
                summary.content,
                key_points,
                summary.impact,
                summary.category,
                summary.priority,
                summary.ai_model,
                summary.confidence,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn has_generated_summary(&self, bill_id: i64) -> Result<bool, DbError> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM summaries WHERE bill_id = ?1 AND ai_model IS NOT NULL LIMIT 1",
                params![bill_id],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn create_job(&self, state: &str) -> Result<i64, DbError> {
        self.conn.execute(
            "INSERT INTO scraping_jobs (state, status, created_at) VALUES (?1, ?2, ?3)",
            params![
                state.to_uppercase(),
                JobStatus::Pending.as_str(),
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update_job(&self, job_id: i64, update: &JobUpdate) -> Result<(), DbError> {
        let errors = update
            .errors
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        self.conn.execute(
            "UPDATE scraping_jobs SET
                status = COALESCE(?2, status),
                bills_found = COALESCE(?3, bills_found),
                bills_processed = COALESCE(?4, bills_processed),
                bills_summarized = COALESCE(?5, bills_summarized),
                errors = COALESCE(?6, errors),
                started_at = COALESCE(?7, started_at),
                completed_at = COALESCE(?8, completed_at)
             WHERE job_id = ?1",
            params![
                job_id,
                update.status.map(|s| s.as_str()),
                update.bills_found,
                update.bills_processed,
                update.bills_summarized,
                errors,
                update.started_at.map(|t| t.to_rfc3339()),
                update.completed_at.map(|t| t.to_rfc3339()),
            ],
        )?;
        Ok(())
    }

    fn get_job(&self, job_id: i64) -> Result<Option<Job>, DbError> {
        let raw = self
            .conn
            .query_row(
                "SELECT job_id, state, status, bills_found, bills_processed, bills_summarized, errors,
                        started_at, completed_at, created_at
                 FROM scraping_jobs WHERE job_id = ?1",
                params![job_id],
                raw_job,
            )
            .optional()?;
        raw.map(RawJob::into_job).transpose()
    }

    fn record_query_usage(&self, month: &str, queries: u64) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT INTO api_usage (month, queries, updated_at)
             VALUES (?1, ?2, datetime('now'))
             ON CONFLICT(month) DO UPDATE SET
                queries = api_usage.queries + excluded.queries,
                updated_at = excluded.updated_at",
            params![month, queries as i64],
        )?;
        Ok(())
    }

    fn query_usage(&self, month: &str) -> Result<u64, DbError> {
        let used: Option<i64> = self
            .conn
            .query_row(
                "SELECT queries FROM api_usage WHERE month = ?1",
                params![month],
                |row| row.get(0),
            )
            .optional()?;
        Ok(used.unwrap_or(0).max(0) as u64)
    }
}

struct RawJob {
    job_id: i64,
    state: String,
    status: String,
    bills_found: i64,
    bills_processed: i64,
    bills_summarized: i64,
    errors: String,
    started_at: Option<String>,
    completed_at: Option<String>,
    created_at: String,
}

fn raw_job(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawJob> {
    Ok(RawJob {
        job_id: row.get(0)?,
        state: row.get(1)?,
        status: row.get(2)?,
        bills_found: row.get(3)?,
        bills_processed: row.get(4)?,
        bills_summarized: row.get(5)?,
        errors: row.get(6)?,
        started_at: row.get(7)?,
        completed_at: row.get(8)?,
        created_at: row.get(9)?,
    })
}

impl RawJob {
    fn into_job(self) -> Result<Job, DbError> {
        let status = JobStatus::parse(&self.status)
            .ok_or_else(|| DbError::UnknownStatus(self.status.clone()))?;
        Ok(Job {
            job_id: self.job_id,
            state: self.state,
            status,
            bills_found: self.bills_found,
            bills_processed: self.bills_processed,
            bills_summarized: self.bills_summarized,
            errors: serde_json::from_str(&self.errors)?,
            started_at: self.started_at.as_deref().map(parse_timestamp).transpose()?,
            completed_at: self.completed_at.as_deref().map(parse_timestamp).transpose()?,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, DbError> {
    Ok(DateTime::parse_from_rfc3339(value)?.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_test_db() -> Db {
        let db = Db::open_in_memory().expect("open in-memory db");
        db.init().expect("init schema");
        db
    }

    fn sample_bill(state_id: i64, number: &str) -> NewBill {
        NewBill {
            state_id,
            legiscan_bill_id: Some(1),
            bill_number: number.to_string(),
            title: "An act relating to water".to_string(),
            status: "Introduced".to_string(),
            last_action_date: Some("2025-03-01".to_string()),
            full_text: Some("full text".to_string()),
            ..NewBill::default()
        }
    }

    #[test]
    fn test_init_idempotent() {
        let db = open_test_db();
        db.init().expect("second init");
        assert_eq!(db.bill_count().unwrap(), 0);
    }

    #[test]
    fn test_upsert_state_returns_same_row() {
        let db = open_test_db();
        let first = db.upsert_state("ca", "California").unwrap();
        let second = db.upsert_state("CA", "California").unwrap();
        assert_eq!(first, second);
        assert_eq!(first.code, "CA");
    }

    #[test]
    fn test_upsert_bill_updates_in_place() {
        let db = open_test_db();
        let state = db.upsert_state("CA", "California").unwrap();
        let first = db.upsert_bill(&sample_bill(state.state_id, "AB1")).unwrap();
        assert!(first.changed);

        let mut changed = sample_bill(state.state_id, "AB1");
        changed.status = "Passed".to_string();
        changed.full_text = None;
        let again = db.upsert_bill(&changed).unwrap();

        assert_eq!(first.bill_id, again.bill_id);
        assert_eq!(db.bill_count().unwrap(), 1);
        let bills = db.bills_for_state("CA", 10).unwrap();
        assert_eq!(bills[0].status, "Passed");
        assert!(bills[0].has_text, "missing text must not wipe stored text");
    }

    #[test]
    fn test_bills_for_state_orders_and_joins_summary() {
        let db = open_test_db();
        let state = db.upsert_state("CA", "California").unwrap();
        let older = db.upsert_bill(&sample_bill(state.state_id, "AB1")).unwrap().bill_id;
        let mut newer = sample_bill(state.state_id, "AB2");
        newer.last_action_date = Some("2025-04-02".to_string());
        db.upsert_bill(&newer).unwrap();

        db.create_summary(&NewSummary {
            bill_id: older,
            summary_type: SUMMARY_BRIEF.to_string(),
            content: "Funds water projects.".to_string(),
            key_points: vec!["a".to_string()],
            impact: None,
            category: Some("Environment".to_string()),
            priority: Some("HIGH".to_string()),
            ai_model: None,
            confidence: Some(0.9),
        })
        .unwrap();

        let bills = db.bills_for_state("ca", 10).unwrap();
        assert_eq!(bills.len(), 2);
        assert_eq!(bills[0].bill_number, "AB2");
        assert_eq!(bills[1].summary.as_deref(), Some("Funds water projects."));
        assert_eq!(db.summaries_for_bill(older).unwrap(), 1);
        assert!(!db.has_generated_summary(older).unwrap(), "placeholder has no model");
    }

    #[test]
    fn test_upsert_bill_reports_hash_change() {
        let db = open_test_db();
        let state = db.upsert_state("CA", "California").unwrap();
        let mut bill = sample_bill(state.state_id, "AB1");
        bill.change_hash = Some("h1".to_string());

        assert!(db.upsert_bill(&bill).unwrap().changed);
        assert!(!db.upsert_bill(&bill).unwrap().changed);

        bill.change_hash = Some("h2".to_string());
        assert!(db.upsert_bill(&bill).unwrap().changed);
        let bill_id = db.upsert_bill(&bill).unwrap().bill_id;
        assert!(!db.has_generated_summary(bill_id).unwrap());
        db.create_summary(&NewSummary {
            bill_id,
            summary_type: SUMMARY_BRIEF.to_string(),
            content: "Funds water projects.".to_string(),
            key_points: Vec::new(),
            impact: None,
            category: None,
            priority: None,
            ai_model: Some("gemini-1.5-flash".to_string()),
            confidence: Some(0.8),
        })
        .unwrap();
        assert!(db.has_generated_summary(bill_id).unwrap());
    }

    #[test]
    fn test_job_lifecycle() {
        let db = open_test_db();
        let id = db.create_job("tx").unwrap();
        let job = db.get_job(id).unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.state, "TX");
        assert!(job.errors.is_empty());

        db.update_job(
            id,
            &JobUpdate {
                status: Some(JobStatus::Running),
                started_at: Some(Utc::now()),
                ..JobUpdate::default()
            },
        )
        .unwrap();
        db.update_job(
            id,
            &JobUpdate {
                status: Some(JobStatus::Completed),
                bills_found: Some(3),
                bills_processed: Some(2),
                errors: Some(vec!["Error processing bill HB3: boom".to_string()]),
                completed_at: Some(Utc::now()),
                ..JobUpdate::default()
            },
        )
        .unwrap();

        let job = db.get_job(id).unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.bills_found, 3);
        assert_eq!(job.bills_processed, 2);
        assert_eq!(job.errors.len(), 1);
        assert!(job.started_at.is_some());
        assert!(job.completed_at.is_some());
        assert!(db.get_job(id + 100).unwrap().is_none());
        assert_eq!(db.recent_jobs(5).unwrap().len(), 1);
    }

    #[test]
    fn test_query_usage_accumulates_per_month() {
        let db = open_test_db();
        assert_eq!(db.query_usage("2025-04").unwrap(), 0);
        db.record_query_usage("2025-04", 12).unwrap();
        db.record_query_usage("2025-04", 3).unwrap();
        db.record_query_usage("2025-05", 1).unwrap();
        assert_eq!(db.query_usage("2025-04").unwrap(), 15);
        assert_eq!(db.query_usage("2025-05").unwrap(), 1);
    }

    #[test]
    fn test_quota_usage_math() {
        let today = NaiveDate::from_ymd_opt(2025, 12, 14).unwrap();
        let usage = QuotaUsage::new(today, 7_500, 30_000);
        assert_eq!(usage.month, "2025-12");
        assert_eq!(usage.remaining, 22_500);
        assert!((usage.percentage - 25.0).abs() < 1e-9);
        assert_eq!(usage.reset_date, NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
        assert!(!usage.exhausted());
        assert!(QuotaUsage::new(today, 30_000, 30_000).exhausted());
    }

    #[test]
    fn test_job_status_round_trip() {
        for status in [
            JobStatus::Pending,
            JobStatus::Running,
            JobStatus::Completed,
            JobStatus::Failed,
            JobStatus::Cancelled,
        ] {
            assert_eq!(JobStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(JobStatus::parse("running"), None);
    }
}

//! Change-detecting sync engine.
//!
//! One run resolves a jurisdiction's current session, pulls the master list,
//! and refreshes at most `limit` bills, reusing cached detail for any bill
//! whose change hash is unchanged. Per-bill failures are collected into the
//! report; only session or master-list failures abort a run.

use std::cmp::Ordering;
use std::fmt;
use std::time::Duration;

use chrono::NaiveDate;
use legiscan_api::types::{BillDetail, HistoryAction, MasterListEntry, Session};
use serde::Serialize;

use crate::cache::CacheStats;
use crate::client::CachedClient;
use crate::error::BillTrackerError;
use crate::text::{resolve_text, strip_nulls, ResolvedText};

pub const DEFAULT_BILL_LIMIT: usize = 25;
pub const DEFAULT_BILL_DELAY: Duration = Duration::from_millis(150);

#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Maximum bills refreshed per run, most recently active first.
    pub limit: usize,
    /// Pause between consecutive bills.
    pub bill_delay: Duration,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            limit: DEFAULT_BILL_LIMIT,
            bill_delay: DEFAULT_BILL_DELAY,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum SyncError {
    #[error("no active session found for {0}")]
    NoActiveSession(String),
    #[error("failed to fetch sessions for {jurisdiction}: {source}")]
    Sessions {
        jurisdiction: String,
        #[source]
        source: BillTrackerError,
    },
    #[error("failed to fetch master list for session {session_id}: {source}")]
    MasterList {
        session_id: i64,
        #[source]
        source: BillTrackerError,
    },
}

/// Progress status derived from LegiScan's numeric status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BillStatus {
    Introduced,
    Engrossed,
    Enrolled,
    Passed,
    Vetoed,
    Failed,
    Unknown,
}

impl BillStatus {
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => Self::Introduced,
            2 => Self::Engrossed,
            3 => Self::Enrolled,
            4 => Self::Passed,
            5 => Self::Vetoed,
            6 => Self::Failed,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Introduced => "Introduced",
            Self::Engrossed => "Engrossed",
            Self::Enrolled => "Enrolled",
            Self::Passed => "Passed",
            Self::Vetoed => "Vetoed",
            Self::Failed => "Failed",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for BillStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A bill ready for persistence, with text resolved and nul bytes removed.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedBill {
    pub bill_id: i64,
    pub bill_number: String,
    pub title: String,
    pub description: String,
    pub status_code: i64,
    pub status: BillStatus,
    pub status_date: Option<String>,
    pub last_action_date: Option<String>,
    pub last_action: Option<String>,
    pub sponsor: Option<String>,
    pub history: Vec<HistoryAction>,
    pub text: ResolvedText,
    pub url: String,
    pub state_link: Option<String>,
    pub change_hash: String,
}

impl ResolvedBill {
    fn from_detail(detail: &BillDetail, text: ResolvedText) -> Self {
        let (last_action_date, last_action) = detail.latest_action();
        Self {
            bill_id: detail.bill_id,
            bill_number: detail.bill_number.clone(),
            title: strip_nulls(&detail.title),
            description: strip_nulls(&detail.description),
            status_code: detail.status,
            status: BillStatus::from_code(detail.status),
            status_date: detail.status_date.clone(),
            last_action_date: last_action_date.map(str::to_string),
            last_action: last_action.map(strip_nulls),
            sponsor: detail.primary_sponsor().map(strip_nulls),
            history: detail
                .history
                .iter()
                .map(|h| HistoryAction {
                    date: h.date.clone(),
                    action: strip_nulls(&h.action),
                    chamber: h.chamber.clone(),
                })
                .collect(),
            text,
            url: detail.url.clone(),
            state_link: detail.state_link.clone(),
            change_hash: detail.change_hash.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub jurisdiction: String,
    pub session: Session,
    /// False when the master list matched the cached copy and nothing ran.
    pub changed: bool,
    pub bills: Vec<ResolvedBill>,
    pub errors: Vec<String>,
    /// Bills selected for processing after ordering and the limit.
    pub total_candidates: usize,
    /// Bills served from cache because their hash was unchanged.
    pub reused: usize,
    /// Bills fetched live.
    pub updated: usize,
    pub queries_used: u64,
    pub cache: CacheStats,
}

pub struct SyncEngine {
    client: CachedClient,
}

impl SyncEngine {
    pub fn new(client: CachedClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &CachedClient {
        &self.client
    }

    pub async fn run(
        &self,
        jurisdiction: &str,
        options: &SyncOptions,
    ) -> Result<SyncReport, SyncError> {
        let start_queries = self.client.query_count();

        let session = self
            .client
            .current_session(jurisdiction)
            .await
            .map_err(|source| SyncError::Sessions {
                jurisdiction: jurisdiction.to_string(),
                source,
            })?
            .ok_or_else(|| SyncError::NoActiveSession(jurisdiction.to_string()))?;

        tracing::info!(
            "Syncing {} session {} ({})",
            jurisdiction,
            session.session_id,
            session.session_name
        );

        let master = self
            .client
            .master_list(session.session_id)
            .await
            .map_err(|source| SyncError::MasterList {
                session_id: session.session_id,
                source,
            })?;

        let mut report = SyncReport {
            jurisdiction: jurisdiction.to_string(),
            session,
            changed: master.changed,
            bills: Vec::new(),
            errors: Vec::new(),
            total_candidates: 0,
            reused: 0,
            updated: 0,
            queries_used: 0,
            cache: self.client.cache_stats(),
        };

        if !master.changed {
            tracing::info!("No changes detected for {}, skipping bill fetch", jurisdiction);
            report.queries_used = self.client.query_count() - start_queries;
            return Ok(report);
        }

        let candidates = select_candidates(master.entries, options.limit);
        report.total_candidates = candidates.len();
        tracing::info!("Processing {} bills for {}", candidates.len(), jurisdiction);

        for (i, entry) in candidates.iter().enumerate() {
            if i > 0 && !options.bill_delay.is_zero() {
                tokio::time::sleep(options.bill_delay).await;
            }
            self.sync_bill(entry, &mut report).await;
        }

        report.queries_used = self.client.query_count() - start_queries;
        report.cache = self.client.cache_stats();
        tracing::info!(
            "Sync of {} finished: {} bills ({} reused, {} updated), {} errors, {} queries",
            jurisdiction,
            report.bills.len(),
            report.reused,
            report.updated,
            report.errors.len(),
            report.queries_used
        );
        Ok(report)
    }

    async fn sync_bill(&self, entry: &MasterListEntry, report: &mut SyncReport) {
        let reused = self.client.is_detail_fresh(entry.bill_id, &entry.change_hash);

        let detail = match self
            .client
            .bill_detail(entry.bill_id, Some(&entry.change_hash))
            .await
        {
            Ok(Some(detail)) => detail,
            Ok(None) => {
                tracing::info!("Bill {} returned no detail, skipping", entry.number);
                return;
            }
            Err(e) => {
                let msg = format!("Error processing bill {}: {}", entry.number, e);
                tracing::warn!("{}", msg);
                report.errors.push(msg);
                return;
            }
        };

        if reused {
            report.reused += 1;
        } else {
            report.updated += 1;
        }

        let text = match detail.texts.first() {
            Some(text_ref) => match self.client.bill_text(text_ref.doc_id).await {
                Ok(payload) => resolve_text(&payload),
                Err(e) => {
                    let msg = format!("Error fetching text for bill {}: {}", entry.number, e);
                    tracing::warn!("{}", msg);
                    report.errors.push(msg);
                    ResolvedText::Missing
                }
            },
            None => ResolvedText::Missing,
        };

        report.bills.push(ResolvedBill::from_detail(&detail, text));
    }
}

/// Most recently active bills first; entries without a parseable date go
/// last in their original order.
fn select_candidates(mut entries: Vec<MasterListEntry>, limit: usize) -> Vec<MasterListEntry> {
    entries.sort_by(|a, b| {
        match (
            parse_action_date(a.last_action_date.as_deref()),
            parse_action_date(b.last_action_date.as_deref()),
        ) {
            (Some(a), Some(b)) => b.cmp(&a),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    });
    entries.truncate(limit);
    entries
}

fn parse_action_date(value: Option<&str>) -> Option<NaiveDate> {
    let value = value?.trim();
    let date_part = value.split(['T', ' ']).next().unwrap_or(value);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

//! Sync-job runner that persists engine output.
//!
//! Each run is tracked as a job row: created `PENDING`, moved to `RUNNING`,
//! and finished as `COMPLETED` (possibly with per-bill errors) or `FAILED`.
//! Upstream queries spent by the run are added to the monthly usage bucket
//! whichever way it ends.

use std::time::Duration;

use chrono::Utc;
use serde::Serialize;

use crate::db::{
    month_key, BillUpsert, JobStatus, JobUpdate, NewBill, NewSummary, Storage, SUMMARY_BRIEF,
};
use crate::error::BillTrackerError;
use crate::summarize::{SummaryOutcome, Summarizer};
use crate::sync::{ResolvedBill, SyncEngine, SyncOptions};
use crate::validation::{state_name, validate_state};

/// Bodies at or below this many characters are stored but not summarized.
pub const MIN_SUMMARY_CHARS: usize = 100;

#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub sync: SyncOptions,
    pub summarize: bool,
    /// Pause after persisting each bill.
    pub bill_delay: Duration,
    /// Refuse to start once this month's recorded usage reaches the limit.
    pub monthly_limit: Option<u64>,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            sync: SyncOptions::default(),
            summarize: true,
            bill_delay: Duration::ZERO,
            monthly_limit: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestOutcome {
    pub job_id: i64,
    pub state: String,
    pub status: JobStatus,
    pub changed: bool,
    pub bills_found: usize,
    pub bills_processed: usize,
    pub bills_summarized: usize,
    pub errors: Vec<String>,
    pub queries_used: u64,
}

pub struct IngestionAdapter<'a, S: Storage> {
    engine: &'a SyncEngine,
    storage: &'a S,
    summarizer: &'a dyn Summarizer,
}

impl<'a, S: Storage> IngestionAdapter<'a, S> {
    pub fn new(engine: &'a SyncEngine, storage: &'a S, summarizer: &'a dyn Summarizer) -> Self {
        Self {
            engine,
            storage,
            summarizer,
        }
    }

    /// Runs one tracked sync for `state`.
    ///
    /// Only input validation failures and job row writes that cannot be made
    /// at all (creating or finishing the job) are returned as `Err`.
    /// Once the job row exists, any run-level failure (upstream or storage)
    /// ends the job as `FAILED`, and the queries spent are still recorded.
    pub async fn run(
        &self,
        state: &str,
        options: &IngestOptions,
    ) -> Result<IngestOutcome, BillTrackerError> {
        let code = validate_state(state)?;
        let name = state_name(&code).to_string();
        let month = month_key(Utc::now().date_naive());

        let job_id = self.storage.create_job(&code)?;
        let mut outcome = IngestOutcome {
            job_id,
            state: code.clone(),
            status: JobStatus::Pending,
            changed: false,
            bills_found: 0,
            bills_processed: 0,
            bills_summarized: 0,
            errors: Vec::new(),
            queries_used: 0,
        };

        let start_queries = self.engine.client().query_count();
        let mut status = match self.process(&code, &name, &month, options, &mut outcome).await {
            Ok(()) => JobStatus::Completed,
            Err(msg) => {
                tracing::error!("Job {}: {}", job_id, msg);
                outcome.errors.push(msg);
                JobStatus::Failed
            }
        };

        outcome.queries_used = self.engine.client().query_count() - start_queries;
        if let Err(e) = self.storage.record_query_usage(&month, outcome.queries_used) {
            let msg = format!("Failed to record query usage: {}", e);
            tracing::error!("Job {}: {}", job_id, msg);
            outcome.errors.push(msg);
            status = JobStatus::Failed;
        }

        if status == JobStatus::Completed {
            tracing::info!(
                "Job {} completed for {}: {}/{} bills processed, {} summarized",
                job_id,
                name,
                outcome.bills_processed,
                outcome.bills_found,
                outcome.bills_summarized
            );
        }
        self.finish(outcome, status)
    }

    /// Body of a run once the job exists. `Err` carries the message that
    /// fails the job; per-bill problems are pushed onto `outcome.errors`.
    async fn process(
        &self,
        code: &str,
        name: &str,
        month: &str,
        options: &IngestOptions,
        outcome: &mut IngestOutcome,
    ) -> Result<(), String> {
        let job_id = outcome.job_id;
        let job_failed = |e: &dyn std::fmt::Display| format!("Job failed: {}", e);

        self.storage
            .update_job(
                job_id,
                &JobUpdate {
                    status: Some(JobStatus::Running),
                    started_at: Some(Utc::now()),
                    ..JobUpdate::default()
                },
            )
            .map_err(|e| job_failed(&e))?;
        outcome.status = JobStatus::Running;

        if let Some(limit) = options.monthly_limit {
            let used = self
                .storage
                .query_usage(month)
                .map_err(|e| job_failed(&e))?;
            if used >= limit {
                return Err(format!("Monthly query limit reached ({}/{})", used, limit));
            }
        }

        let state_record = self
            .storage
            .upsert_state(code, name)
            .map_err(|e| job_failed(&e))?;
        tracing::info!("Starting data fetch for {}", name);

        let report = self
            .engine
            .run(code, &options.sync)
            .await
            .map_err(|e| job_failed(&e))?;

        outcome.changed = report.changed;
        outcome.bills_found = report.total_candidates;
        outcome.errors.extend(report.errors.iter().cloned());
        self.storage
            .update_job(
                job_id,
                &JobUpdate {
                    bills_found: Some(report.total_candidates as i64),
                    ..JobUpdate::default()
                },
            )
            .map_err(|e| job_failed(&e))?;

        tracing::info!(
            "Processing {} bills for {} ({} queries used)",
            report.bills.len(),
            name,
            report.queries_used
        );

        for (i, bill) in report.bills.iter().enumerate() {
            if i > 0 && !options.bill_delay.is_zero() {
                tokio::time::sleep(options.bill_delay).await;
            }

            let new_bill = new_bill(state_record.state_id, report.session.session_id, bill);
            let stored = match self.storage.upsert_bill(&new_bill) {
                Ok(stored) => stored,
                Err(e) => {
                    let msg = format!("Failed to process {}: {}", bill.bill_number, e);
                    tracing::warn!("{}", msg);
                    outcome.errors.push(msg);
                    continue;
                }
            };
            outcome.bills_processed += 1;

            if options.summarize {
                let body = bill
                    .text
                    .body()
                    .filter(|b| b.chars().count() > MIN_SUMMARY_CHARS);
                if let Some(body) = body {
                    if self.needs_summary(stored, bill, outcome) {
                        self.summarize_bill(stored.bill_id, bill, body, name, outcome)
                            .await;
                    }
                }
            }

            let progress = JobUpdate {
                bills_processed: Some(outcome.bills_processed as i64),
                bills_summarized: Some(outcome.bills_summarized as i64),
                ..JobUpdate::default()
            };
            if let Err(e) = self.storage.update_job(job_id, &progress) {
                let msg = format!("Failed to record progress after {}: {}", bill.bill_number, e);
                tracing::warn!("{}", msg);
                outcome.errors.push(msg);
            }
        }

        Ok(())
    }

    /// A bill with a generated summary at its current change hash is not sent
    /// to the summarizer again. Placeholder summaries are retried.
    fn needs_summary(
        &self,
        stored: BillUpsert,
        bill: &ResolvedBill,
        outcome: &mut IngestOutcome,
    ) -> bool {
        if stored.changed {
            return true;
        }
        match self.storage.has_generated_summary(stored.bill_id) {
            Ok(true) => {
                tracing::debug!("{} unchanged and already summarized", bill.bill_number);
                false
            }
            Ok(false) => true,
            Err(e) => {
                let msg = format!("AI processing failed for {}: {}", bill.bill_number, e);
                tracing::warn!("{}", msg);
                outcome.errors.push(msg);
                false
            }
        }
    }

    async fn summarize_bill(
        &self,
        bill_id: i64,
        bill: &ResolvedBill,
        body: &str,
        state_name: &str,
        outcome: &mut IngestOutcome,
    ) {
        tracing::debug!("Generating summary for {}", bill.bill_number);
        let result = self.summarizer.summarize(&bill.title, body, state_name).await;
        let generated = !result.is_degraded();
        let ai_model = generated
            .then(|| self.summarizer.model_name().map(str::to_string))
            .flatten();
        if let SummaryOutcome::Degraded { reason, .. } = &result {
            tracing::warn!("Summary degraded for {}: {}", bill.bill_number, reason);
        }

        let summary = result.into_summary();
        let record = NewSummary {
            bill_id,
            summary_type: SUMMARY_BRIEF.to_string(),
            content: summary.brief,
            key_points: summary.key_points,
            impact: Some(summary.impact),
            category: Some(summary.category),
            priority: Some(summary.priority.as_str().to_string()),
            ai_model,
            confidence: Some(summary.confidence),
        };
        match self.storage.create_summary(&record) {
            Ok(_) if generated => outcome.bills_summarized += 1,
            Ok(_) => {}
            Err(e) => {
                let msg = format!("AI processing failed for {}: {}", bill.bill_number, e);
                tracing::warn!("{}", msg);
                outcome.errors.push(msg);
            }
        }
    }

    fn finish(
        &self,
        mut outcome: IngestOutcome,
        status: JobStatus,
    ) -> Result<IngestOutcome, BillTrackerError> {
        self.storage.update_job(
            outcome.job_id,
            &JobUpdate {
                status: Some(status),
                bills_processed: Some(outcome.bills_processed as i64),
                bills_summarized: Some(outcome.bills_summarized as i64),
                errors: Some(outcome.errors.clone()),
                completed_at: Some(Utc::now()),
                ..JobUpdate::default()
            },
        )?;
        outcome.status = status;
        Ok(outcome)
    }
}

fn new_bill(state_id: i64, session_id: i64, bill: &ResolvedBill) -> NewBill {
    NewBill {
        state_id,
        legiscan_bill_id: Some(bill.bill_id),
        session_id: Some(session_id),
        bill_number: bill.bill_number.clone(),
        title: bill.title.clone(),
        description: Some(bill.description.clone()).filter(|d| !d.is_empty()),
        status: bill.status.as_str().to_string(),
        status_date: bill.status_date.clone(),
        last_action_date: bill.last_action_date.clone(),
        last_action: bill.last_action.clone(),
        sponsor: bill.sponsor.clone(),
        full_text: bill.text.as_str().map(str::to_string),
        source_url: Some(bill.url.clone())
            .filter(|u| !u.is_empty())
            .or_else(|| bill.state_link.clone()),
        change_hash: Some(bill.change_hash.clone()).filter(|h| !h.is_empty()),
    }
}

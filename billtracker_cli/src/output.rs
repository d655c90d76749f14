use billtracker_lib::types::Session;
use billtracker_lib::{IngestOutcome, Job, QuotaUsage, StoredBill};
use tabled::{Table, Tabled};

#[derive(Clone, Debug)]
pub enum OutputFormat {
    Table,
    Json,
}

#[derive(Tabled)]
struct SessionRow {
    #[tabled(rename = "ID")]
    session_id: i64,
    #[tabled(rename = "Session")]
    name: String,
    #[tabled(rename = "Years")]
    years: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Current")]
    current: String,
}

#[derive(Tabled)]
struct BillRow {
    #[tabled(rename = "Bill")]
    number: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Last Action")]
    last_action_date: String,
    #[tabled(rename = "Sponsor")]
    sponsor: String,
    #[tabled(rename = "Text")]
    has_text: String,
    #[tabled(rename = "Summary")]
    summary: String,
}

#[derive(Tabled)]
struct JobRow {
    #[tabled(rename = "Job")]
    job_id: i64,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Found")]
    found: i64,
    #[tabled(rename = "Processed")]
    processed: i64,
    #[tabled(rename = "Summarized")]
    summarized: i64,
    #[tabled(rename = "Errors")]
    errors: usize,
    #[tabled(rename = "Created")]
    created: String,
}

#[derive(Tabled)]
struct SyncRow {
    #[tabled(rename = "Job")]
    job_id: i64,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Changed")]
    changed: String,
    #[tabled(rename = "Found")]
    found: usize,
    #[tabled(rename = "Processed")]
    processed: usize,
    #[tabled(rename = "Summarized")]
    summarized: usize,
    #[tabled(rename = "Errors")]
    errors: usize,
    #[tabled(rename = "Queries")]
    queries: u64,
}

#[derive(Tabled)]
struct UsageRow {
    #[tabled(rename = "Month")]
    month: String,
    #[tabled(rename = "Used")]
    used: u64,
    #[tabled(rename = "Limit")]
    limit: u64,
    #[tabled(rename = "Remaining")]
    remaining: u64,
    #[tabled(rename = "Used %")]
    percentage: String,
    #[tabled(rename = "Resets")]
    reset_date: String,
}

// -- Row builders --

fn build_session_rows(sessions: &[Session], current: Option<i64>) -> Vec<SessionRow> {
    sessions
        .iter()
        .map(|s| SessionRow {
            session_id: s.session_id,
            name: s.session_name.clone(),
            years: if s.year_start == s.year_end {
                s.year_start.to_string()
            } else {
                format!("{}-{}", s.year_start, s.year_end)
            },
            kind: match (s.special, s.prior) {
                (true, _) => "special".to_string(),
                (false, true) => "prior".to_string(),
                (false, false) => "regular".to_string(),
            },
            current: if current == Some(s.session_id) { "*" } else { "" }.to_string(),
        })
        .collect()
}

fn build_bill_rows(bills: &[StoredBill]) -> Vec<BillRow> {
    bills
        .iter()
        .map(|b| BillRow {
            number: b.bill_number.clone(),
            title: truncate(&b.title, 60),
            status: b.status.clone(),
            last_action_date: b.last_action_date.clone().unwrap_or_default(),
            sponsor: b.sponsor.clone().unwrap_or_default(),
            has_text: if b.has_text { "yes" } else { "no" }.to_string(),
            summary: b
                .summary
                .as_deref()
                .map(|s| truncate(s, 80))
                .unwrap_or_default(),
        })
        .collect()
}

fn build_job_rows(jobs: &[Job]) -> Vec<JobRow> {
    jobs.iter()
        .map(|j| JobRow {
            job_id: j.job_id,
            state: j.state.clone(),
            status: j.status.to_string(),
            found: j.bills_found,
            processed: j.bills_processed,
            summarized: j.bills_summarized,
            errors: j.errors.len(),
            created: j.created_at.format("%Y-%m-%d %H:%M").to_string(),
        })
        .collect()
}

// -- Table output --

pub fn print_sessions_table(sessions: &[Session], current: Option<i64>) {
    println!("{}", Table::new(build_session_rows(sessions, current)));
}

pub fn print_bills_table(bills: &[StoredBill]) {
    println!("{}", Table::new(build_bill_rows(bills)));
}

pub fn print_jobs_table(jobs: &[Job]) {
    println!("{}", Table::new(build_job_rows(jobs)));
}

pub fn print_sync_table(outcome: &IngestOutcome) {
    let row = SyncRow {
        job_id: outcome.job_id,
        state: outcome.state.clone(),
        status: outcome.status.to_string(),
        changed: if outcome.changed { "yes" } else { "no" }.to_string(),
        found: outcome.bills_found,
        processed: outcome.bills_processed,
        summarized: outcome.bills_summarized,
        errors: outcome.errors.len(),
        queries: outcome.queries_used,
    };
    println!("{}", Table::new(vec![row]));
}

pub fn print_usage_table(usage: &QuotaUsage) {
    let row = UsageRow {
        month: usage.month.clone(),
        used: usage.used,
        limit: usage.limit,
        remaining: usage.remaining,
        percentage: format!("{:.1}", usage.percentage),
        reset_date: usage.reset_date.to_string(),
    };
    println!("{}", Table::new(vec![row]));
}

// -- JSON output --

pub fn print_json<T: serde::Serialize>(data: &T) {
    match serde_json::to_string_pretty(data) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize to JSON: {}", e),
    }
}

fn truncate(value: &str, max: usize) -> String {
    if value.chars().count() <= max {
        return value.to_string();
    }
    let mut out: String = value.chars().take(max.saturating_sub(3)).collect();
    out.push_str("...");
    out
}

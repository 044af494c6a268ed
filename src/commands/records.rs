//! Record mutation commands.
//!
//! The CLI holds no query cache across invocations, so nothing needs
//! invalidating here. Long-lived callers should follow a mutation with
//! `QueryClient::invalidate_resource`.

use crate::config::Config;
use crate::display::format_record_summary;
use crate::error::Result;
use crate::remote::{CallOutcome, CallRecord, HttpBackend, LeadDraft, RawItem};

use super::print_json;

fn report(action: &str, record: &RawItem, json: bool) -> Result<()> {
    if json {
        return print_json(record);
    }
    println!("{}", format_record_summary(action, record));
    Ok(())
}

pub async fn cmd_lead_create(draft: LeadDraft, json: bool) -> Result<()> {
    draft.validate_for_create()?;
    let config = Config::load()?;
    let backend = HttpBackend::from_config(&config)?;

    let record = backend.create_lead(&draft).await?;
    report("Created lead", &record, json)
}

pub async fn cmd_lead_update(id: &str, draft: LeadDraft, json: bool) -> Result<()> {
    draft.validate()?;
    let config = Config::load()?;
    let backend = HttpBackend::from_config(&config)?;

    let record = backend.update_lead(id, &draft).await?;
    report("Updated lead", &record, json)
}

pub async fn cmd_call_log(
    lead_id: &str,
    outcome: CallOutcome,
    notes: Option<String>,
    json: bool,
) -> Result<()> {
    let mut record = CallRecord::new(lead_id, outcome);
    if let Some(notes) = notes {
        record = record.with_notes(notes);
    }
    record.validate()?;

    let config = Config::load()?;
    let backend = HttpBackend::from_config(&config)?;

    let saved = backend.log_call(&record).await?;
    report("Logged call", &saved, json)
}

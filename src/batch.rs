//! Many single documents merged into one PDF.
//!
//! Items are processed strictly in input order. A failing item is counted
//! and logged; it never aborts the batch.

use crate::certificate::{compose_certificate, participation_class_label};
use crate::doc_context::DocContext;
use crate::error::PiagamError;
use crate::id_card::compose_id_card;
use crate::model::{AthleteRecord, MedalStatus, ParticipationRecord};
use crate::pdf::PdfDocument;

#[derive(Debug, Clone, PartialEq)]
pub struct BatchFailure {
    pub participant_id: i64,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub bytes: Vec<u8>,
    pub page_count: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub failures: Vec<BatchFailure>,
}

impl BatchOutcome {
    pub fn summary(&self) -> String {
        format!("{} succeeded, {} failed", self.succeeded, self.failed)
    }
}

/// The athlete of a participation, carrying that participation as its only one.
pub fn enhanced_athlete(participation: &ParticipationRecord) -> Result<AthleteRecord, PiagamError> {
    let athlete = participation
        .athlete
        .as_deref()
        .ok_or(PiagamError::MissingAthlete(participation.id))?;
    Ok(AthleteRecord {
        participations: vec![participation.detached()],
        ..athlete.clone()
    })
}

#[tracing::instrument(skip_all, fields(participants = participants.len(), medal = ?medal))]
pub fn assemble_certificates(
    ctx: &DocContext<'_>,
    participants: &[ParticipationRecord],
    medal: MedalStatus,
    theme: Option<&str>,
) -> Result<BatchOutcome, PiagamError> {
    assemble(participants, |participation| {
        let athlete = enhanced_athlete(participation)?;
        let class_label = participation_class_label(participation);
        compose_certificate(ctx, &athlete, medal, &class_label, theme)
    })
}

/// ID cards for every participant; the participant list doubles as the
/// richer record source for class labels.
#[tracing::instrument(skip_all, fields(participants = participants.len()))]
pub fn assemble_id_cards(
    ctx: &DocContext<'_>,
    participants: &[ParticipationRecord],
    theme: Option<&str>,
) -> Result<BatchOutcome, PiagamError> {
    assemble(participants, |participation| {
        let athlete = enhanced_athlete(participation)?;
        compose_id_card(ctx, &athlete, Some(participants), theme)
    })
}

fn assemble<F>(participants: &[ParticipationRecord], mut compose: F) -> Result<BatchOutcome, PiagamError>
where
    F: FnMut(&ParticipationRecord) -> Result<Vec<u8>, PiagamError>,
{
    let mut output = PdfDocument::create();
    let mut succeeded = 0usize;
    let mut failures = Vec::new();

    for participation in participants {
        let result = compose(participation)
            .and_then(|bytes| PdfDocument::load(&bytes))
            .and_then(|doc| output.copy_pages_from(&doc));
        match result {
            Ok(pages) => {
                succeeded += 1;
                tracing::debug!(participant = participation.id, pages, "batch item composed");
            }
            Err(err) => {
                tracing::warn!(participant = participation.id, error = %err, "batch item failed");
                failures.push(BatchFailure {
                    participant_id: participation.id,
                    reason: err.to_string(),
                });
            }
        }
    }

    let page_count = output.page_count();
    let bytes = output.save()?;
    let outcome = BatchOutcome {
        bytes,
        page_count,
        succeeded,
        failed: failures.len(),
        failures,
    };
    tracing::info!(pages = outcome.page_count, "{}", outcome.summary());
    Ok(outcome)
}

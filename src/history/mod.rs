//! Service History & Auto-Fill
//!
//! Every service a crew member submits is folded into a rolling aggregate
//! keyed by (crew member, service number). The aggregate counts how often the
//! pattern was repeated and how often it was edited once established, and is
//! what the auto-fill suggestion reads from.

pub mod store;

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

pub use store::{HistoryStore, MemoryHistoryStore, PgHistoryStore};

/// Submissions needed before the aggregate is offered as a pre-fill
pub const AUTOFILL_THRESHOLD: i32 = 5;

/// Stored repeat count from which differing submissions count as edits
pub const EDIT_TRACKING_THRESHOLD: i32 = 3;

/// Composite identity of an aggregate
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HistoryKey {
    #[serde(rename = "tripulante_id")]
    pub crew_member_id: String,
    #[serde(rename = "numero_servico")]
    pub service_number: String,
}

impl HistoryKey {
    pub fn new(crew_member_id: impl Into<String>, service_number: impl Into<String>) -> Self {
        Self {
            crew_member_id: crew_member_id.into(),
            service_number: service_number.into(),
        }
    }
}

/// The six tracked values of a service, also the auto-fill payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceFields {
    #[serde(rename = "local_inicio")]
    pub start_location: String,
    #[serde(rename = "local_fim")]
    pub end_location: String,
    #[serde(rename = "hora_inicio")]
    pub start_time: NaiveTime,
    #[serde(rename = "hora_fim")]
    pub end_time: NaiveTime,
    #[serde(rename = "numero_chapa")]
    pub vehicle_plate: String,
    #[serde(rename = "afetacao")]
    pub assignment: String,
}

/// One validated service submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistorySubmission {
    pub key: HistoryKey,
    pub fields: ServiceFields,
}

/// Per-(crew member, service number) rolling aggregate
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceHistory {
    #[serde(flatten)]
    pub key: HistoryKey,
    #[serde(flatten)]
    pub fields: ServiceFields,
    #[serde(rename = "contagem")]
    pub repeat_count: i32,
    #[serde(rename = "edicoes_count")]
    pub edit_count: i32,
    #[serde(rename = "ultima_edicao")]
    pub last_edited_at: DateTime<Utc>,
}

impl ServiceHistory {
    /// Aggregate created by the first submission for a pair
    pub fn first(submission: HistorySubmission, now: DateTime<Utc>) -> Self {
        Self {
            key: submission.key,
            fields: submission.fields,
            repeat_count: 1,
            edit_count: 0,
            last_edited_at: now,
        }
    }

    /// Fold another submission for the same pair into this aggregate.
    ///
    /// Values are last-write-wins. The edit counter only moves when the
    /// stored count, before this submission, is already at the tracking
    /// threshold and at least one tracked value differs.
    pub fn record(&self, submission: HistorySubmission, now: DateTime<Utc>) -> Self {
        debug_assert_eq!(self.key, submission.key);

        let changed = self.fields != submission.fields;
        let edit_count = if self.repeat_count >= EDIT_TRACKING_THRESHOLD && changed {
            self.edit_count + 1
        } else {
            self.edit_count
        };

        Self {
            key: submission.key,
            fields: submission.fields,
            repeat_count: self.repeat_count + 1,
            edit_count,
            last_edited_at: now,
        }
    }

    /// Stored values, once the pattern has been repeated often enough
    pub fn suggestion(&self) -> Option<&ServiceFields> {
        (self.repeat_count >= AUTOFILL_THRESHOLD).then_some(&self.fields)
    }
}

/// Next aggregate state for a submission, given what is stored now
pub fn apply_submission(
    existing: Option<&ServiceHistory>,
    submission: HistorySubmission,
    now: DateTime<Utc>,
) -> ServiceHistory {
    match existing {
        Some(history) => history.record(submission, now),
        None => ServiceHistory::first(submission, now),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn fields(plate: &str) -> ServiceFields {
        ServiceFields {
            start_location: "Garagem".to_string(),
            end_location: "Terminal".to_string(),
            start_time: NaiveTime::from_hms_opt(7, 30, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(15, 0, 0).unwrap(),
            vehicle_plate: plate.to_string(),
            assignment: "12E".to_string(),
        }
    }

    pub(crate) fn submission(plate: &str) -> HistorySubmission {
        HistorySubmission {
            key: HistoryKey::new("18001", "A1"),
            fields: fields(plate),
        }
    }

    fn submit_all(plates: &[&str]) -> ServiceHistory {
        let mut current: Option<ServiceHistory> = None;
        for plate in plates {
            current = Some(apply_submission(current.as_ref(), submission(plate), Utc::now()));
        }
        current.expect("at least one submission")
    }

    #[test]
    fn test_first_submission_starts_counters() {
        let history = submit_all(&["545"]);
        assert_eq!(history.repeat_count, 1);
        assert_eq!(history.edit_count, 0);
    }

    #[test]
    fn test_identical_submissions_never_count_edits() {
        let history = submit_all(&["545"; 7]);
        assert_eq!(history.repeat_count, 7);
        assert_eq!(history.edit_count, 0);
    }

    #[test]
    fn test_change_after_three_repeats_is_an_edit() {
        let history = submit_all(&["545", "545", "545", "548"]);
        assert_eq!(history.repeat_count, 4);
        assert_eq!(history.edit_count, 1);
        assert_eq!(history.fields.vehicle_plate, "548");
    }

    #[test]
    fn test_changes_before_threshold_are_not_edits() {
        // stored counts 1 and 2 are below the threshold
        let history = submit_all(&["545", "546", "547"]);
        assert_eq!(history.repeat_count, 3);
        assert_eq!(history.edit_count, 0);
        assert_eq!(history.fields.vehicle_plate, "547");
    }

    #[test]
    fn test_every_differing_submission_after_threshold_counts() {
        let history = submit_all(&["1", "1", "1", "2", "2", "3"]);
        assert_eq!(history.repeat_count, 6);
        assert_eq!(history.edit_count, 2);
        assert!(history.edit_count <= history.repeat_count);
    }

    #[test]
    fn test_any_tracked_field_counts_as_change() {
        let base = submit_all(&["545", "545", "545"]);
        let mut moved = submission("545");
        moved.fields.end_time = NaiveTime::from_hms_opt(16, 0, 0).unwrap();
        let history = base.record(moved, Utc::now());
        assert_eq!(history.edit_count, 1);
    }

    #[test]
    fn test_suggestion_threshold() {
        for n in 1..AUTOFILL_THRESHOLD {
            let plates = vec!["545"; n as usize];
            assert!(submit_all(&plates).suggestion().is_none(), "count {n}");
        }
        let history = submit_all(&["545", "545", "545", "545", "550"]);
        let suggestion = history.suggestion().expect("suggestion at threshold");
        assert_eq!(suggestion.start_location, "Garagem");
        assert_eq!(suggestion.vehicle_plate, "550");
    }

    #[test]
    fn test_last_edited_at_follows_latest_submission() {
        let first = ServiceHistory::first(submission("545"), Utc::now());
        let later = first.last_edited_at + chrono::Duration::minutes(5);
        let next = first.record(submission("545"), later);
        assert_eq!(next.last_edited_at, later);
    }

    #[test]
    fn test_suggestion_serializes_with_wire_names() {
        let json = serde_json::to_value(fields("545")).unwrap();
        assert_eq!(json["local_inicio"], "Garagem");
        assert_eq!(json["numero_chapa"], "545");
        assert_eq!(json["hora_inicio"], "07:30:00");
    }
}

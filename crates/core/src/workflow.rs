use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::budget::BudgetId;
use crate::domain::ActorId;

/// Lifecycle states of a budget.
///
/// `Draft -> Sent -> {Approved, Rejected}`, `Approved -> Printing ->
/// Completed`, `Rejected -> Draft` (reopen). `Completed` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Draft,
    Sent,
    Approved,
    Rejected,
    Printing,
    Completed,
}

impl Status {
    pub const ALL: [Status; 6] = [
        Status::Draft,
        Status::Sent,
        Status::Approved,
        Status::Rejected,
        Status::Printing,
        Status::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Sent => "sent",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Printing => "printing",
            Self::Completed => "completed",
        }
    }
}

impl std::str::FromStr for Status {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "draft" => Ok(Self::Draft),
            "sent" => Ok(Self::Sent),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "printing" => Ok(Self::Printing),
            "completed" => Ok(Self::Completed),
            other => Err(format!("unknown budget status `{other}`")),
        }
    }
}

/// The complete transition table. Any pair not listed is illegal, including
/// every self-loop.
pub fn is_valid_transition(current: Status, requested: Status) -> bool {
    matches!(
        (current, requested),
        (Status::Draft, Status::Sent)
            | (Status::Sent, Status::Approved)
            | (Status::Sent, Status::Rejected)
            | (Status::Approved, Status::Printing)
            | (Status::Printing, Status::Completed)
            | (Status::Rejected, Status::Draft)
    )
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HistoryId(pub Uuid);

/// One recorded status transition. Immutable once written; the forensic
/// trail is never edited or pruned.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusHistoryEntry {
    pub id: HistoryId,
    pub budget_id: BudgetId,
    pub previous_status: Status,
    pub new_status: Status,
    pub changed_by: ActorId,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl StatusHistoryEntry {
    pub fn new(
        budget_id: BudgetId,
        previous_status: Status,
        new_status: Status,
        changed_by: ActorId,
        notes: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: HistoryId(Uuid::new_v4()),
            budget_id,
            previous_status,
            new_status,
            changed_by,
            notes,
            created_at,
        }
    }
}

/// Append-only view over a budget's transition records. The inner sequence
/// is private on purpose: entries can be appended and read, never replaced
/// or removed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusLog(Vec<StatusHistoryEntry>);

impl StatusLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, entry: StatusHistoryEntry) {
        self.0.push(entry);
    }

    pub fn entries(&self) -> &[StatusHistoryEntry] {
        &self.0
    }

    pub fn latest(&self) -> Option<&StatusHistoryEntry> {
        self.0.last()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<StatusHistoryEntry>> for StatusLog {
    fn from(entries: Vec<StatusHistoryEntry>) -> Self {
        Self(entries)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::{is_valid_transition, Status, StatusHistoryEntry, StatusLog};
    use crate::domain::budget::BudgetId;
    use crate::domain::ActorId;

    #[test]
    fn no_status_transitions_to_itself() {
        for status in Status::ALL {
            assert!(!is_valid_transition(status, status), "{status:?} must not self-loop");
        }
    }

    #[test]
    fn completed_is_terminal() {
        for target in Status::ALL {
            assert!(!is_valid_transition(Status::Completed, target));
        }
    }

    #[test]
    fn happy_path_is_fully_permitted() {
        assert!(is_valid_transition(Status::Draft, Status::Sent));
        assert!(is_valid_transition(Status::Sent, Status::Approved));
        assert!(is_valid_transition(Status::Approved, Status::Printing));
        assert!(is_valid_transition(Status::Printing, Status::Completed));
    }

    #[test]
    fn rejected_budgets_can_reopen_as_draft() {
        assert!(is_valid_transition(Status::Sent, Status::Rejected));
        assert!(is_valid_transition(Status::Rejected, Status::Draft));
        assert!(!is_valid_transition(Status::Rejected, Status::Approved));
    }

    #[test]
    fn shortcuts_around_the_table_are_rejected() {
        assert!(!is_valid_transition(Status::Draft, Status::Approved));
        assert!(!is_valid_transition(Status::Draft, Status::Completed));
        assert!(!is_valid_transition(Status::Approved, Status::Completed));
        assert!(!is_valid_transition(Status::Printing, Status::Draft));
    }

    #[test]
    fn status_log_appends_in_order() {
        let budget_id = BudgetId(Uuid::new_v4());
        let mut log = StatusLog::new();
        assert!(log.is_empty());

        log.append(StatusHistoryEntry::new(
            budget_id,
            Status::Draft,
            Status::Sent,
            ActorId("u-1".to_string()),
            None,
            Utc::now(),
        ));
        log.append(StatusHistoryEntry::new(
            budget_id,
            Status::Sent,
            Status::Approved,
            ActorId("u-2".to_string()),
            Some("customer signed off".to_string()),
            Utc::now(),
        ));

        assert_eq!(log.len(), 2);
        assert_eq!(log.entries()[0].new_status, Status::Sent);
        assert_eq!(log.latest().map(|entry| entry.new_status), Some(Status::Approved));
    }

    #[test]
    fn status_round_trips_through_str() {
        for status in Status::ALL {
            assert_eq!(status.as_str().parse::<Status>(), Ok(status));
        }
        assert!("archived".parse::<Status>().is_err());
    }

    #[test]
    fn status_serializes_with_the_stored_wire_names() {
        for status in Status::ALL {
            let json = serde_json::to_string(&status).expect("serialize");
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
    }
}

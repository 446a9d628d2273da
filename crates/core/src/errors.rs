use thiserror::Error;

use crate::workflow::Status;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid status transition from {from:?} to {to:?}")]
    InvalidTransition { from: Status, to: Status },
    #[error("only draft budgets can be edited (current status is {0:?})")]
    NotEditable(Status),
    #[error("budgets in status {0:?} cannot be deleted")]
    NotDeletable(Status),
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

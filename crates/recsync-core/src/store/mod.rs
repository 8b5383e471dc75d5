//! Domain state containers.
//!
//! Each container owns its state behind a `RefCell`, its own
//! [`AsyncActions`](crate::action::AsyncActions) bookkeeping, and its own
//! memoization wrappers. State is only changed through short, synchronous
//! merges; no borrow is ever held across an `.await`, and every merge that
//! follows a suspension point re-checks whatever it depends on first.

pub mod edit;
pub mod list;
pub mod reference;

pub use edit::{EditPhase, EditStore, RelatedRecord};
pub use list::{ListPhase, ListStore, SelectedView};
pub use reference::{ReferenceKey, ReferenceTable};

use crate::error::SyncError;
use crate::record::RecordId;

/// Fail with `SaveMismatch` unless the server acknowledged `expected`.
fn ensure_acknowledged(expected: &RecordId, acknowledged: &[RecordId]) -> Result<(), SyncError> {
    if acknowledged.contains(expected) {
        return Ok(());
    }
    Err(SyncError::SaveMismatch {
        expected: expected.to_string(),
        acknowledged: acknowledged.iter().map(ToString::to_string).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acknowledgement_must_contain_the_identity() {
        let id = RecordId::new("00U1");
        assert!(ensure_acknowledged(&id, &[RecordId::new("00U0"), id.clone()]).is_ok());
        let err = ensure_acknowledged(&id, &[RecordId::new("00U0")]).expect_err("missing");
        assert_eq!(err.code(), crate::error::ErrorCode::SaveMismatch);
    }
}

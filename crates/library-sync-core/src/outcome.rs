use crate::error::StoreError;

/// What happened to one write across the optimistic, commit and reconcile phases
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationOutcome {
    pub applied_optimistically: bool,
    pub committed: bool,
    pub rolled_back: bool,
    pub error: Option<StoreError>,
}

impl MutationOutcome {
    pub(crate) fn rejected(error: StoreError) -> Self {
        Self {
            applied_optimistically: false,
            committed: false,
            rolled_back: false,
            error: Some(error),
        }
    }

    pub(crate) fn committed() -> Self {
        Self {
            applied_optimistically: true,
            committed: true,
            rolled_back: false,
            error: None,
        }
    }

    /// The remote row was already gone; the optimistic state stands
    pub(crate) fn already_satisfied() -> Self {
        Self {
            applied_optimistically: true,
            committed: false,
            rolled_back: false,
            error: Some(StoreError::NotFound),
        }
    }

    pub(crate) fn rolled_back(error: StoreError) -> Self {
        Self {
            applied_optimistically: true,
            committed: false,
            rolled_back: true,
            error: Some(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.as_ref().map_or(true, StoreError::is_benign)
    }

    pub fn into_result(self) -> Result<(), StoreError> {
        match self.error {
            Some(e) if !e.is_benign() => Err(e),
            _ => Ok(()),
        }
    }
}

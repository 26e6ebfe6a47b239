// Checkout Form Controller
//
// Drives one submission at a time: read the inputs, validate,
// persist, then report the outcome through the status line.

use tracing::{info, warn};

use crate::record::LoanRecord;
use crate::store::{LoanStore, StoreError};
use crate::validate::{validate, RawEntry, ValidationError};

pub const READY_MESSAGE: &str = "Ready to add a new entry.";
pub const MISSING_FIELD_MESSAGE: &str = "Error: All fields must be filled out.";
pub const INVALID_BARCODE_MESSAGE: &str = "Error: Barcode Number must be a whole number.";

/// Lifecycle of a single submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionState {
    Idle,
    Validating,
    /// Validation failed; nothing was written.
    Rejected,
    Persisting,
    Persisted,
    /// The store refused the write; inputs are kept for a retry.
    Failed,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StateError {
    #[error("illegal submission transition: {from:?} -> {to:?}")]
    IllegalTransition {
        from: SubmissionState,
        to: SubmissionState,
    },
}

/// Reducer over [`SubmissionState`].
#[derive(Debug)]
pub struct SubmissionMachine {
    state: SubmissionState,
}

impl Default for SubmissionMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl SubmissionMachine {
    pub fn new() -> Self {
        Self {
            state: SubmissionState::Idle,
        }
    }

    pub fn advance(&mut self, to: SubmissionState) -> Result<(), StateError> {
        use SubmissionState::*;

        let legal = matches!(
            (self.state, to),
            (Idle, Validating)
                | (Validating, Rejected | Persisting)
                | (Persisting, Persisted | Failed)
                | (Rejected | Persisted | Failed, Idle)
        );
        if !legal {
            return Err(StateError::IllegalTransition {
                from: self.state,
                to,
            });
        }

        self.state = to;
        Ok(())
    }

    pub fn current_state(&self) -> SubmissionState {
        self.state
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error(transparent)]
    Rejected(#[from] ValidationError),

    #[error(transparent)]
    NotSaved(#[from] StoreError),

    #[error(transparent)]
    State(#[from] StateError),
}

/// Form state plus the store it writes to.
#[derive(Debug)]
pub struct FormController<S: LoanStore> {
    store: S,
    inputs: RawEntry,
    status: String,
    machine: SubmissionMachine,
}

impl<S: LoanStore> FormController<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            inputs: RawEntry::default(),
            status: READY_MESSAGE.to_string(),
            machine: SubmissionMachine::new(),
        }
    }

    /// Replace the initial status line, e.g. after recovering from a
    /// corrupt table at startup.
    pub fn with_notice(mut self, notice: impl Into<String>) -> Self {
        self.status = notice.into();
        self
    }

    pub fn inputs(&self) -> &RawEntry {
        &self.inputs
    }

    pub fn inputs_mut(&mut self) -> &mut RawEntry {
        &mut self.inputs
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn state(&self) -> SubmissionState {
        self.machine.current_state()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Validate and persist the current inputs.
    ///
    /// Inputs are cleared only when the record was written.
    pub fn submit(&mut self) -> Result<LoanRecord, SubmitError> {
        use SubmissionState::*;

        if self.machine.current_state() != Idle {
            self.machine.advance(Idle)?;
        }
        self.machine.advance(Validating)?;

        let record = match validate(&self.inputs) {
            Ok(record) => record,
            Err(err) => {
                self.machine.advance(Rejected)?;
                self.status = match err {
                    ValidationError::MissingField { .. } => MISSING_FIELD_MESSAGE,
                    ValidationError::InvalidBarcode { .. } => INVALID_BARCODE_MESSAGE,
                }
                .to_string();
                info!(%err, "submission rejected");
                return Err(err.into());
            }
        };

        self.machine.advance(Persisting)?;
        if let Err(err) = self.store.append(&record) {
            self.machine.advance(Failed)?;
            self.status = format!("FATAL ERROR: Could not save data. {err}");
            warn!(%err, "submission not saved");
            return Err(err.into());
        }

        self.machine.advance(Persisted)?;
        self.status = format!(
            "SUCCESS: Added entry for {} {} and saved to {}.",
            record.first_name(),
            record.last_name(),
            self.store.location()
        );
        self.inputs = RawEntry::default();
        Ok(record)
    }
}

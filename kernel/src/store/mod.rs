// Loan Store Abstraction
//
// Defines the durability contract for the loan table.
// Implementations persist to a local table file or a remote sheet.

use crate::record::LoanRecord;

pub mod remote;
pub mod table;

pub use remote::{RemoteSheetStore, ServiceCredentials};
pub use table::LocalTableStore;

/// Errors raised while loading or writing a store.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("error loading {path}: {reason}")]
    Corrupt { path: String, reason: String },

    #[error("failed to save data to {path}: {reason}")]
    StoreWrite { path: String, reason: String },

    #[error("remote append failed: {0}")]
    RemoteWrite(String),

    #[error("cannot connect to remote sheet: {0}")]
    Connection(String),
}

/// Backing store for loan records.
///
/// Properties required from implementations:
/// - Append-only
/// - One attempt per call, no retry
///
/// Implementations MUST NOT:
/// - Deduplicate records
/// - Mutate or delete stored records
pub trait LoanStore {
    /// Durably append one record.
    fn append(&mut self, record: &LoanRecord) -> Result<(), StoreError>;

    /// Human-readable name of the backing store.
    fn location(&self) -> String;
}

impl<S: LoanStore + ?Sized> LoanStore for Box<S> {
    fn append(&mut self, record: &LoanRecord) -> Result<(), StoreError> {
        (**self).append(record)
    }

    fn location(&self) -> String {
        (**self).location()
    }
}

// Entry Validation
//
// Turns the raw text of a checkout form into a typed loan record.
// Pure: no I/O, no state. A record that fails here never reaches a store.

use crate::record::{Field, LoanRecord};

/// Raw, untrimmed form input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawEntry {
    pub first_name: String,
    pub last_name: String,
    pub barcode_number: String,
    pub checkout_date: String,
}

impl RawEntry {
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        barcode_number: impl Into<String>,
        checkout_date: impl Into<String>,
    ) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            barcode_number: barcode_number.into(),
            checkout_date: checkout_date.into(),
        }
    }

    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::FirstName => &self.first_name,
            Field::LastName => &self.last_name,
            Field::BarcodeNumber => &self.barcode_number,
            Field::CheckoutDate => &self.checkout_date,
        }
    }

    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        let slot = match field {
            Field::FirstName => &mut self.first_name,
            Field::LastName => &mut self.last_name,
            Field::BarcodeNumber => &mut self.barcode_number,
            Field::CheckoutDate => &mut self.checkout_date,
        };
        *slot = value.into();
    }
}

/// Why a submission was rejected.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing required field: {field}")]
    MissingField { field: Field },

    #[error("barcode `{input}` is not a whole number")]
    InvalidBarcode { input: String },
}

/// Validate a raw entry.
///
/// Every field is checked for emptiness (after trimming) before the
/// barcode is parsed, so an empty barcode reports as missing.
pub fn validate(entry: &RawEntry) -> Result<LoanRecord, ValidationError> {
    for field in Field::ALL {
        if entry.get(field).trim().is_empty() {
            return Err(ValidationError::MissingField { field });
        }
    }

    let barcode_text = entry.barcode_number.trim();
    let barcode_number = barcode_text
        .parse::<i64>()
        .map_err(|_| ValidationError::InvalidBarcode {
            input: barcode_text.to_string(),
        })?;

    Ok(LoanRecord::new(
        entry.first_name.trim().to_string(),
        entry.last_name.trim().to_string(),
        barcode_number,
        entry.checkout_date.trim().to_string(),
    ))
}

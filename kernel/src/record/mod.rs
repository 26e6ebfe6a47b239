// Loan Records
//
// A loan record is one checkout event: who borrowed the device,
// which barcode it carries, and the day it left the library.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Column names of the loan table, in storage order.
pub const COLUMNS: [&str; 4] = ["first-name", "last-name", "barcode-number", "date"];

/// The four inputs a checkout form collects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    FirstName,
    LastName,
    BarcodeNumber,
    CheckoutDate,
}

impl Field {
    /// Form order.
    pub const ALL: [Field; 4] = [
        Field::FirstName,
        Field::LastName,
        Field::BarcodeNumber,
        Field::CheckoutDate,
    ];

    /// Human label shown next to the input.
    pub fn label(&self) -> &'static str {
        match self {
            Field::FirstName => "First Name",
            Field::LastName => "Last Name",
            Field::BarcodeNumber => "Barcode Number",
            Field::CheckoutDate => "Date (mm-dd-yyyy)",
        }
    }

    /// Table column backing this field.
    pub fn column(&self) -> &'static str {
        match self {
            Field::FirstName => COLUMNS[0],
            Field::LastName => COLUMNS[1],
            Field::BarcodeNumber => COLUMNS[2],
            Field::CheckoutDate => COLUMNS[3],
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A validated checkout event.
///
/// Records are immutable once built. Outside this crate the only way
/// to obtain one is through [`crate::validate::validate`] or by
/// reading a stored table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanRecord {
    #[serde(rename = "first-name")]
    first_name: String,

    #[serde(rename = "last-name")]
    last_name: String,

    #[serde(rename = "barcode-number")]
    barcode_number: i64,

    #[serde(rename = "date")]
    checkout_date: String,
}

impl LoanRecord {
    pub(crate) fn new(
        first_name: String,
        last_name: String,
        barcode_number: i64,
        checkout_date: String,
    ) -> Self {
        Self {
            first_name,
            last_name,
            barcode_number,
            checkout_date,
        }
    }

    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    pub fn last_name(&self) -> &str {
        &self.last_name
    }

    pub fn barcode_number(&self) -> i64 {
        self.barcode_number
    }

    pub fn checkout_date(&self) -> &str {
        &self.checkout_date
    }

    /// Ordered row `[first, last, barcode, date]` as sent to a remote sheet.
    pub fn row(&self) -> Vec<Value> {
        vec![
            Value::from(self.first_name.as_str()),
            Value::from(self.last_name.as_str()),
            Value::from(self.barcode_number),
            Value::from(self.checkout_date.as_str()),
        ]
    }
}

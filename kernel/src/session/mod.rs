// Terminal Sessions
//
// Line-oriented front ends over a FormController: the labelled form
// session and the plain "Add another?" prompt loop.

use std::io::Write;

use chrono::Local;

use crate::form::{FormController, SubmitError};
use crate::record::{Field, LoanRecord};
use crate::store::LoanStore;

/// Format used to prefill the date field.
pub const DATE_FORMAT: &str = "%m-%d-%Y";

#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    #[error("prompt failed: {0}")]
    Input(String),

    #[error("output failed: {0}")]
    Output(#[from] std::io::Error),
}

/// Source of user input.
pub trait Prompter {
    /// Ask for one line. `initial` is the editable default.
    ///
    /// Returns `Ok(None)` at end of input.
    fn prompt(&mut self, label: &str, initial: &str) -> Result<Option<String>, PromptError>;
}

/// Options shared by both sessions.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionOptions {
    /// Prefill an empty date field with today's date.
    pub prefill_today: bool,
}

/// Today's date in the form's display format.
pub fn today() -> String {
    Local::now().format(DATE_FORMAT).to_string()
}

/// Summary of a finished session.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SessionReport {
    pub saved: usize,
    pub rejected: usize,
    pub failed: usize,
}

impl SessionReport {
    fn tally(&mut self, result: &Result<LoanRecord, SubmitError>) {
        match result {
            Ok(_) => self.saved += 1,
            Err(SubmitError::Rejected(_)) => self.rejected += 1,
            Err(_) => self.failed += 1,
        }
    }
}

/// Interactive form: four labelled inputs, submit, status line.
///
/// Each pass edits the current inputs, so values survive a failed
/// submission. Ends when the prompter reports end of input.
pub fn run_form_session<S, P, W>(
    form: &mut FormController<S>,
    prompter: &mut P,
    out: &mut W,
    options: SessionOptions,
) -> Result<SessionReport, PromptError>
where
    S: LoanStore,
    P: Prompter,
    W: Write,
{
    let mut report = SessionReport::default();
    writeln!(out, "{}", form.status())?;

    loop {
        if options.prefill_today && form.inputs().checkout_date.trim().is_empty() {
            form.inputs_mut().set(Field::CheckoutDate, today());
        }

        for field in Field::ALL {
            let label = format!("{}: ", field.label());
            let current = form.inputs().get(field).to_string();
            match prompter.prompt(&label, &current)? {
                Some(value) => form.inputs_mut().set(field, value),
                None => return Ok(report),
            }
        }

        let result = form.submit();
        report.tally(&result);
        writeln!(out, "{}", form.status())?;
    }
}

/// Command-line fallback: read the four fields, save, ask to continue.
///
/// Stops on `n` or end of input. Rejected entries are reported and
/// the loop carries on.
pub fn run_prompt_loop<S, P, W>(
    form: &mut FormController<S>,
    prompter: &mut P,
    out: &mut W,
) -> Result<SessionReport, PromptError>
where
    S: LoanStore,
    P: Prompter,
    W: Write,
{
    const PROMPTS: [(Field, &str); 4] = [
        (Field::FirstName, "Enter first name: "),
        (Field::LastName, "Enter last name: "),
        (Field::BarcodeNumber, "Enter barcode number: "),
        (Field::CheckoutDate, "Enter date (mm-dd-yyyy): "),
    ];

    let mut report = SessionReport::default();

    loop {
        for (field, label) in PROMPTS {
            match prompter.prompt(label, "")? {
                Some(value) => form.inputs_mut().set(field, value),
                None => return Ok(report),
            }
        }

        let result = form.submit();
        report.tally(&result);
        writeln!(out, "{}", form.status())?;

        match prompter.prompt("Add another? (y/n): ", "")? {
            Some(answer) if !answer.trim().eq_ignore_ascii_case("n") => {}
            _ => return Ok(report),
        }
    }
}

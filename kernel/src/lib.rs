// Loaner Kernel
//
// Validation and persistence for device checkout records.

pub mod config;
pub mod form;
pub mod record;
pub mod session;
pub mod store;
pub mod validate;

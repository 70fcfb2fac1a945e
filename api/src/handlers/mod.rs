pub mod error;

pub use error::{handle_domain_error, json_error_handler, outcome_error, validation_error};

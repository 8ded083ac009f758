//! Reply generation endpoint

mod errors;
pub(crate) mod generate;

//! Domain models for the lab-result system.

mod doctor;
mod lab_result;
mod principal;

pub use doctor::*;
pub use lab_result::*;
pub use principal::*;

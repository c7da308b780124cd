//! Feature preprocessing
//!
//! Standard scaling learned on the training partition and reapplied, unchanged,
//! to held-out rows and live records.

mod scaler;

pub use scaler::{Scaler, ZeroVariance};

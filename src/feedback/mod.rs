//! Correction feedback and running accuracy

pub mod accuracy;
pub mod reconciler;

pub use accuracy::{AccuracySnapshot, AccuracyState, LabelCounts};
pub use reconciler::{CorrectionOutcome, CorrectionReconciler};

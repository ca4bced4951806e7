//! Issue report triage: classification, local explanations and live
//! correction accuracy.
//!
//! The [`ml::TriageService`] ties together a frozen [`ml::Classifier`], the
//! token importance ranker, the perturbation-based explainer and the
//! [`feedback::CorrectionReconciler`]. The [`api`] module exposes it over HTTP.

pub mod api;
pub mod config;
pub mod error;
pub mod feedback;
pub mod metrics;
pub mod ml;
pub mod models;
pub mod state;
pub mod text;

pub use error::{AppError, Result};

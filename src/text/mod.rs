//! Text normalization and language gating in front of the classifier.
//!
//! Both concerns sit behind traits so the core can consume any tokenizer or
//! language detector. Language identification is backed by `whatlang`.

pub mod language;
pub mod normalizer;

pub use language::{LanguageDetector, WhatlangDetector, UNKNOWN_LANGUAGE};
pub use normalizer::{Normalizer, TextNormalizer, ENGLISH_STOP_WORDS};

//! cheatdoc - cheatsheet generation pipeline for programming languages
//!
//! This library turns a feature request ("language X, feature Y") into a
//! cached, scored set of web references and then into a structured
//! documentation record, walking a feature tree idempotently.

pub mod cli;
pub mod error;
pub mod feature;
pub mod generate;
pub mod llm;
pub mod reference;
pub mod storage;
pub mod web;
pub mod workspace;

/// Re-export commonly used types
pub use error::{Error, Result};
pub use feature::{FeatureAddress, FeatureRecord, FeatureStore, FsFeatureStore, LanguageProfile};
pub use generate::{ContentSynthesizer, FeatureTreeWalker, GenerationMode};
pub use reference::{ReferenceCollector, ReferenceDocument};
pub use storage::ContentCache;
pub use workspace::Workspace;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const APP_NAME: &str = "cheatdoc";

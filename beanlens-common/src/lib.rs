//! # bean-lens Common Library
//!
//! Shared code for the bean-lens normalization crates:
//! - Error taxonomy (`Error`, `Result`)
//! - Normalization configuration and its resolution (CLI → ENV → TOML → defaults)
//! - Timestamp helpers

pub mod config;
pub mod error;
pub mod time;

pub use config::{FlavorNoteMode, NormalizationConfig};
pub use error::{Error, Result};

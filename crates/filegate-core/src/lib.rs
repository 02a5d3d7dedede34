//! filegate-core - check uploads by what they contain, not what they claim
//!
//! A file is accepted when its leading (and, for JPEG, trailing) bytes match
//! the signature of a type in the caller's allow-list. ZIP archives are
//! additionally opened in memory and every entry is screened for executables
//! and scripts hiding behind harmless-looking names.
//!
//! # Overview
//!
//! - [`signature`]: the fixed magic-number table.
//! - [`validator`]: allow-list matching, the entry point for callers.
//! - [`archive`]: ZIP entry walk.
//! - [`detect`]: per-entry executable-disguise rules.
//! - [`config`]: `config.toml` and inspection limits.
//!
//! Malformed input never errors or panics; it is always a
//! [`Verdict::Rejected`] with a [`Rejection`] naming the reason.

pub mod archive;
pub mod config;
pub mod detect;
pub mod io;
pub mod signature;
pub mod validator;
pub mod verdict;

pub use archive::validate_archive;
pub use config::{Config, ConfigError, Policy};
pub use detect::{ExecutableKind, is_executable};
pub use signature::{Signature, SignatureMatch, TypeTag, lookup};
pub use validator::{AllowedTypes, Validator, validate, validate_tags};
pub use verdict::{Rejection, Verdict};

//! Check command

use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use filegate_core::{AllowedTypes, Config, TypeTag, Validator, Verdict};
use serde::Serialize;
use tracing::debug;

/// One line of `--json` output.
#[derive(Debug, Serialize)]
pub struct Report {
    /// File as given on the command line, lossily decoded
    pub path: String,
    /// `accepted` or `rejected`
    pub verdict: &'static str,
    /// Rejection category, absent when accepted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<&'static str>,
    /// Human-readable rejection reason, absent when accepted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Report {
    /// Build the report for one file.
    pub fn new(path: &Path, verdict: &Verdict) -> Self {
        let rejection = verdict.rejection();
        Self {
            path: path.display().to_string(),
            verdict: if verdict.is_accepted() {
                "accepted"
            } else {
                "rejected"
            },
            kind: rejection.map(filegate_core::Rejection::kind),
            reason: verdict.reason(),
        }
    }

    /// Plain-text line: `ACCEPTED path` or `REJECTED path: reason`.
    pub fn to_line(&self) -> String {
        match &self.reason {
            None => format!("ACCEPTED {}", self.path),
            Some(reason) => format!("REJECTED {}: {reason}", self.path),
        }
    }
}

/// The allow-list for this run: the command line wins over the config file.
///
/// # Errors
///
/// Fails when neither source names any type.
pub fn resolve_allowed(cli: &[TypeTag], config: &Config) -> Result<AllowedTypes> {
    let allowed = if cli.is_empty() {
        AllowedTypes::from(&config.allow)
    } else {
        AllowedTypes::new(cli.iter().copied())
    };

    if allowed.is_empty() {
        bail!("No allowed types given. Pass --allow or set `allow` in the config file.");
    }
    Ok(allowed)
}

/// Validate each file in order and print one line per file.
///
/// Returns whether every file was accepted.
///
/// # Errors
///
/// Fails on an empty allow-list or if JSON serialization fails.
pub async fn check(files: &[PathBuf], allow: &[TypeTag], json: bool, config: &Config) -> Result<bool> {
    let allowed = resolve_allowed(allow, config)?;
    let validator = Validator::new(config.policy.clone());

    let mut all_accepted = true;
    for file in files {
        let verdict = validator.validate_path(file, &allowed).await;
        debug!("{}: {verdict}", file.display());
        all_accepted &= verdict.is_accepted();

        let report = Report::new(file, &verdict);
        if json {
            println!("{}", serde_json::to_string(&report)?);
        } else {
            println!("{}", report.to_line());
        }
    }

    Ok(all_accepted)
}

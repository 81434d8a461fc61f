//! The audit engine.
//!
//! [`audit_file`] walks one parsed file, turns every value-into-slot transfer into
//! a [`sites::Site`] and runs the two-step check of [`assignable`] on it. The
//! engine has no failure mode of its own: sites whose types cannot be resolved
//! are skipped, and findings go straight to the [`report::Reporter`].

pub mod assignable;
pub mod oracle;
pub mod report;
pub mod sites;

use crate::language::ast::File;
use oracle::TypeOracle;
use report::Reporter;
use serde::Deserialize;
use std::fmt;
use tracing::debug;

/// Which binding forms are audited.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Pass {
    /// Every binding form, including destructuring and variadic arguments.
    #[default]
    Assignable,
    /// Equal-arity bindings and calls whose argument count matches the parameter count.
    TypeAnnotation,
}

impl fmt::Display for Pass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Pass::Assignable => "assignable",
            Pass::TypeAnnotation => "type-annotation",
        })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AuditSummary {
    pub sites: usize,
    pub skipped: usize,
}

pub fn audit_file<O, R>(file: &File, oracle: &O, pass: Pass, reporter: &mut R) -> AuditSummary
where
    O: TypeOracle + ?Sized,
    R: Reporter + ?Sized,
{
    let mut summary = AuditSummary::default();
    sites::extract_sites(file, oracle, pass, |site| {
        summary.sites += 1;
        if !assignable::check_site(oracle, &site, reporter) {
            summary.skipped += 1;
        }
    });
    debug!(
        path = %file.path.display(),
        %pass,
        sites = summary.sites,
        skipped = summary.skipped,
        "audited file"
    );
    summary
}

use crate::{
    audit::report::{Finding, FindingKind},
    language::{
        errors::SyntaxError,
        span::{LineIndex, Span},
    },
    typeinfo::ResolveError,
};
use miette::{Diagnostic, NamedSource, Report, SourceSpan};
use serde::Deserialize;
use std::{fmt, path::Path};
use thiserror::Error;

/// How findings are printed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    /// miette reports with source snippets.
    #[default]
    Fancy,
    /// One `path:line:col: [kind] message` line per finding.
    Plain,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutputFormat::Fancy => "fancy",
            OutputFormat::Plain => "plain",
        })
    }
}

#[derive(Debug, Error, Diagnostic, Clone)]
#[error("{message}")]
pub struct SyntaxDiagnostic {
    #[source_code]
    src: NamedSource<String>,
    #[label("{label}")]
    span: SourceSpan,
    #[help]
    help: Option<String>,
    message: String,
    label: String,
}

impl SyntaxDiagnostic {
    pub fn from_error(src: NamedSource<String>, err: SyntaxError) -> Self {
        Self {
            src,
            span: err.to_source_span(),
            help: err.help.clone(),
            message: err.message.clone(),
            label: err.label,
        }
    }
}

#[derive(Debug, Error, Diagnostic, Clone)]
#[error("{message}")]
#[diagnostic(code(phantom::type_mismatch))]
pub struct TypeMismatchDiagnostic {
    #[source_code]
    src: NamedSource<String>,
    #[label("value flows into a slot of another type here")]
    span: SourceSpan,
    message: String,
}

#[derive(Debug, Error, Diagnostic, Clone)]
#[error("{message}")]
#[diagnostic(
    code(phantom::phantom_argument_mismatch),
    help("instantiations of the same alias must agree on every type argument")
)]
pub struct PhantomMismatchDiagnostic {
    #[source_code]
    src: NamedSource<String>,
    #[label("type arguments differ here")]
    span: SourceSpan,
    message: String,
}

#[derive(Debug, Error, Diagnostic, Clone)]
#[error("{message}")]
#[diagnostic(code(phantom::resolve), severity(Warning))]
pub struct ResolveDiagnostic {
    #[source_code]
    src: NamedSource<String>,
    #[label("{message}")]
    span: SourceSpan,
    message: String,
}

pub fn finding_report(src: &NamedSource<String>, finding: &Finding) -> Report {
    let span = finding.span.to_source_span();
    let message = finding.message.clone();
    match finding.kind {
        FindingKind::TypeMismatch => Report::new(TypeMismatchDiagnostic {
            src: src.clone(),
            span,
            message,
        }),
        FindingKind::PhantomArgumentMismatch => Report::new(PhantomMismatchDiagnostic {
            src: src.clone(),
            span,
            message,
        }),
    }
}

pub fn plain_line(path: &Path, index: &LineIndex, span: Span, kind: &str, message: &str) -> String {
    let (line, col) = index.line_col(span.start);
    format!("{}:{line}:{col}: [{kind}] {message}", path.display())
}

pub fn emit_findings(path: &Path, source: &str, findings: &[Finding], format: OutputFormat) {
    match format {
        OutputFormat::Fancy => {
            let named = NamedSource::new(path.display().to_string(), source.to_string());
            for finding in findings {
                eprintln!("{:?}", finding_report(&named, finding));
            }
        }
        OutputFormat::Plain => {
            let index = LineIndex::new(source);
            for finding in findings {
                println!(
                    "{}",
                    plain_line(path, &index, finding.span, finding.kind.code(), &finding.message)
                );
            }
        }
    }
}

pub fn emit_syntax_errors(path: &Path, source: &str, errors: &[SyntaxError], format: OutputFormat) {
    match format {
        OutputFormat::Fancy => {
            let named = NamedSource::new(path.display().to_string(), source.to_string());
            for err in errors {
                let diagnostic = SyntaxDiagnostic::from_error(named.clone(), err.clone());
                eprintln!("{:?}", Report::new(diagnostic));
            }
        }
        OutputFormat::Plain => {
            let index = LineIndex::new(source);
            for err in errors {
                eprintln!("{}", plain_line(path, &index, err.span, "syntax", &err.message));
            }
        }
    }
}

pub fn emit_resolve_errors(path: &Path, source: &str, errors: &[ResolveError], format: OutputFormat) {
    match format {
        OutputFormat::Fancy => {
            let named = NamedSource::new(path.display().to_string(), source.to_string());
            for err in errors {
                let diagnostic = ResolveDiagnostic {
                    src: named.clone(),
                    span: err.span.to_source_span(),
                    message: err.message.clone(),
                };
                eprintln!("{:?}", Report::new(diagnostic));
            }
        }
        OutputFormat::Plain => {
            let index = LineIndex::new(source);
            for err in errors {
                eprintln!("{}", plain_line(path, &index, err.span, "warning", &err.message));
            }
        }
    }
}

pub fn report_io_error(path: &Path, error: &std::io::Error) {
    eprintln!("Failed to access {}: {}", path.display(), error);
}

use crate::{config::ConfigError, language::errors::SyntaxErrors, tools::expect::ExpectError};
use std::path::PathBuf;
use thiserror::Error;

/// Failures of the harness around the audit. The audit itself never fails.
#[derive(Debug, Error)]
pub enum PhantomError {
    #[error("failed to access {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{}: {errors}", path.display())]
    Syntax {
        path: PathBuf,
        #[source]
        errors: SyntaxErrors,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("file watcher failed")]
    Watch(#[from] notify::Error),
    #[error("{}: {source}", path.display())]
    Expect {
        path: PathBuf,
        #[source]
        source: ExpectError,
    },
    #[error("{} expectation(s) not met in {}", count, path.display())]
    Unmet { path: PathBuf, count: usize },
    #[error("failed to initialize logging")]
    Logging(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T, E = PhantomError> = std::result::Result<T, E>;

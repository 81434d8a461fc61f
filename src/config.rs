use crate::{audit::Pass, tools::diagnostics::OutputFormat};
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

pub const CONFIG_FILE: &str = "phantom.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {error}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },
    #[error("invalid {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },
}

/// The `[lint]` table of `phantom.toml`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LintConfig {
    pub pass: Pass,
    pub format: OutputFormat,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawConfig {
    lint: LintConfig,
}

impl LintConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|error| ConfigError::Io {
            path: path.to_path_buf(),
            error,
        })?;
        Self::parse(path, &content)
    }

    pub fn parse(path: &Path, content: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(content).map_err(|error| ConfigError::Parse {
            path: path.to_path_buf(),
            message: error.message().to_string(),
        })?;
        Ok(raw.lint)
    }

    /// Loads `explicit` if given, otherwise the first `phantom.toml` found next to
    /// `file` or in `cwd`. Defaults apply when there is none.
    pub fn resolve(explicit: Option<&Path>, file: &Path, cwd: &Path) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match find_config(file, cwd) {
            Some(path) => {
                tracing::debug!(config = %path.display(), "using configuration");
                Self::load(&path)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn with_overrides(mut self, pass: Option<Pass>, format: Option<OutputFormat>) -> Self {
        if let Some(pass) = pass {
            self.pass = pass;
        }
        if let Some(format) = format {
            self.format = format;
        }
        self
    }
}

pub fn find_config(file: &Path, cwd: &Path) -> Option<PathBuf> {
    let beside = file
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(|dir| dir.join(CONFIG_FILE));
    beside
        .into_iter()
        .chain(std::iter::once(cwd.join(CONFIG_FILE)))
        .find(|candidate| candidate.is_file())
}

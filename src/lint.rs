use crate::{
    audit::{audit_file, report::Finding, AuditSummary, Pass},
    config::LintConfig,
    error::{PhantomError, Result},
    language::{errors::SyntaxErrors, parser::parse_file},
    tools::{
        diagnostics::{
            emit_findings, emit_resolve_errors, emit_syntax_errors, report_io_error, OutputFormat,
        },
        expect::{self, Mismatch},
    },
    typeinfo::{resolve_file, ResolveError},
};
use notify::{Config, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::mpsc,
    time::Duration,
};
use tracing::{debug, info};

/// Flags given on the command line; unset fields fall back to `phantom.toml`.
#[derive(Clone, Debug, Default)]
pub struct LintOptions {
    pub pass: Option<Pass>,
    pub format: Option<OutputFormat>,
    pub config: Option<PathBuf>,
}

impl LintOptions {
    fn config_for(&self, file: &Path) -> Result<LintConfig> {
        let cwd = std::env::current_dir().map_err(|source| PhantomError::Io {
            path: PathBuf::from("."),
            source,
        })?;
        let config = LintConfig::resolve(self.config.as_deref(), file, &cwd)?;
        Ok(config.with_overrides(self.pass, self.format))
    }
}

#[derive(Debug)]
pub struct FileAudit {
    pub findings: Vec<Finding>,
    pub resolve_errors: Vec<ResolveError>,
    pub summary: AuditSummary,
}

/// Parses, resolves and audits one source text.
pub fn audit_source(path: &Path, source: &str, pass: Pass) -> std::result::Result<FileAudit, SyntaxErrors> {
    let file = parse_file(path.to_path_buf(), source)?;
    let info = resolve_file(&file);
    let mut findings = Vec::new();
    let summary = audit_file(&file, &info, pass, &mut findings);
    Ok(FileAudit {
        findings,
        resolve_errors: info.errors,
        summary,
    })
}

fn read_source(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| PhantomError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Checks every file once, then keeps re-checking on change when `watch` is set.
///
/// Returns `true` when no file produced a finding or an error.
pub fn run_check(files: &[PathBuf], options: &LintOptions, watch: bool) -> Result<bool> {
    let clean = check_all(files, options);
    if !watch {
        return Ok(clean);
    }

    let (tx, rx) = mpsc::channel();
    let mut watcher = build_watcher(tx)?;
    for file in files {
        watcher.watch(file, RecursiveMode::NonRecursive)?;
    }

    println!(
        "Watching {} file(s) for changes. Press Ctrl+C to stop…",
        files.len()
    );

    for event in rx {
        match event {
            Ok(evt) => {
                if matches!(
                    evt.kind,
                    EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_)
                ) {
                    debug!(paths = ?evt.paths, "change detected");
                    check_all(files, options);
                }
            }
            Err(err) => eprintln!("watch error: {err}"),
        }
    }

    Ok(clean)
}

fn build_watcher(
    tx: mpsc::Sender<std::result::Result<notify::Event, notify::Error>>,
) -> notify::Result<RecommendedWatcher> {
    notify::recommended_watcher(move |res| {
        let _ = tx.send(res);
    })
    .map(|mut watcher| {
        watcher
            .configure(Config::default().with_poll_interval(Duration::from_millis(200)))
            .ok();
        watcher
    })
}

fn check_all(files: &[PathBuf], options: &LintOptions) -> bool {
    let mut clean = true;
    let mut total = 0;
    for file in files {
        match check_file(file, options) {
            Ok(count) => {
                total += count;
                clean &= count == 0;
            }
            Err(PhantomError::Io { path, source }) => {
                report_io_error(&path, &source);
                clean = false;
            }
            Err(err) => {
                eprintln!("error: {err}");
                clean = false;
            }
        }
    }
    info!(files = files.len(), findings = total, "check finished");
    clean
}

/// Returns the number of findings and syntax errors reported for `path`.
fn check_file(path: &Path, options: &LintOptions) -> Result<usize> {
    let config = options.config_for(path)?;
    let source = read_source(path)?;

    let audit = match audit_source(path, &source, config.pass) {
        Ok(audit) => audit,
        Err(errs) => {
            emit_syntax_errors(path, &source, &errs.errors, config.format);
            return Ok(errs.errors.len());
        }
    };
    emit_resolve_errors(path, &source, &audit.resolve_errors, config.format);
    emit_findings(path, &source, &audit.findings, config.format);
    if audit.findings.is_empty() && config.format == OutputFormat::Fancy {
        println!("{}: no findings", path.display());
    }
    info!(
        path = %path.display(),
        pass = %config.pass,
        sites = audit.summary.sites,
        skipped = audit.summary.skipped,
        findings = audit.findings.len(),
        "checked file"
    );
    Ok(audit.findings.len())
}

/// Audits `source` and matches the findings against its `// want` comments.
pub fn expect_source(path: &Path, source: &str, pass: Pass) -> Result<Vec<Mismatch>> {
    let audit = audit_source(path, source, pass).map_err(|errors| PhantomError::Syntax {
        path: path.to_path_buf(),
        errors,
    })?;
    expect::verify(source, &audit.findings).map_err(|source| PhantomError::Expect {
        path: path.to_path_buf(),
        source,
    })
}

fn expect_file(path: &Path, options: &LintOptions) -> Result<()> {
    let config = options.config_for(path)?;
    let source = read_source(path)?;
    let mismatches = expect_source(path, &source, config.pass)?;
    for mismatch in &mismatches {
        eprintln!("{}: {mismatch}", path.display());
    }
    if mismatches.is_empty() {
        Ok(())
    } else {
        Err(PhantomError::Unmet {
            path: path.to_path_buf(),
            count: mismatches.len(),
        })
    }
}

/// Verifies the `// want` expectations of every file. Returns `true` when all hold.
pub fn run_expectations(files: &[PathBuf], options: &LintOptions) -> bool {
    let mut failures = 0;
    for file in files {
        match expect_file(file, options) {
            Ok(()) => println!("test path:{} status:ok", file.display()),
            Err(err) => {
                failures += 1;
                eprintln!("test path:{} status:failed\n{err}", file.display());
            }
        }
    }
    if failures > 0 {
        eprintln!("test result: FAILED. {failures} file(s) failed");
        false
    } else {
        println!("test result: ok. {} passed", files.len());
        true
    }
}

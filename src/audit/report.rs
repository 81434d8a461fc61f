use crate::language::span::Span;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FindingKind {
    /// The source value is not assignable to the target slot.
    TypeMismatch,
    /// Two instantiations of the same alias disagree on a type argument.
    PhantomArgumentMismatch,
}

impl FindingKind {
    pub fn code(self) -> &'static str {
        match self {
            FindingKind::TypeMismatch => "type-mismatch",
            FindingKind::PhantomArgumentMismatch => "phantom-argument-mismatch",
        }
    }
}

impl fmt::Display for FindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Finding {
    pub span: Span,
    pub kind: FindingKind,
    pub message: String,
}

/// Sink for audit findings. The engine never reads anything back from it.
pub trait Reporter {
    fn report(&mut self, span: Span, kind: FindingKind, message: String);
}

impl Reporter for Vec<Finding> {
    fn report(&mut self, span: Span, kind: FindingKind, message: String) {
        self.push(Finding {
            span,
            kind,
            message,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vec_reporter_keeps_report_order() {
        let mut findings = Vec::new();
        findings.report(Span::new(3, 4), FindingKind::PhantomArgumentMismatch, "b".into());
        findings.report(Span::new(1, 2), FindingKind::TypeMismatch, "a".into());
        let codes: Vec<&str> = findings.iter().map(|finding| finding.kind.code()).collect();
        assert_eq!(codes, ["phantom-argument-mismatch", "type-mismatch"]);
        assert_eq!(findings[1].span, Span::new(1, 2));
    }
}

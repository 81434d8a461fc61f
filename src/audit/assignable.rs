use super::{
    oracle::{TypeId, TypeOracle},
    report::{FindingKind, Reporter},
    sites::{Endpoint, Site},
};
use crate::language::span::Span;
use tracing::debug;

/// Checks one site. Returns `false` when either side has no resolvable type and the site was skipped.
pub fn check_site<O, R>(oracle: &O, site: &Site<'_>, reporter: &mut R) -> bool
where
    O: TypeOracle + ?Sized,
    R: Reporter + ?Sized,
{
    let Some(source) = resolve(oracle, site.source) else {
        debug!(shape = site.shape.name(), start = site.span.start, "source type unresolved");
        return false;
    };
    let Some(target) = resolve(oracle, site.target) else {
        debug!(shape = site.shape.name(), start = site.span.start, "target type unresolved");
        return false;
    };
    check_types(oracle, site.span, source, target, reporter);
    true
}

fn resolve<O: TypeOracle + ?Sized>(oracle: &O, endpoint: Endpoint<'_>) -> Option<TypeId> {
    match endpoint {
        Endpoint::Element(element) => oracle.type_of(element),
        Endpoint::Resolved(ty) => Some(ty),
    }
}

/// Ordinary assignability first, then the type-argument comparison for
/// instantiations of the same alias.
pub fn check_types<O, R>(oracle: &O, span: Span, source: TypeId, target: TypeId, reporter: &mut R)
where
    O: TypeOracle + ?Sized,
    R: Reporter + ?Sized,
{
    if !oracle.assignable(source, target) {
        reporter.report(
            span,
            FindingKind::TypeMismatch,
            format!(
                "types are not assignable: {} to {}",
                oracle.display(source),
                oracle.display(target)
            ),
        );
    }

    if !oracle.is_alias_instantiation(source) || !oracle.is_alias_instantiation(target) {
        return;
    }
    if oracle.origin(source) != oracle.origin(target) {
        return;
    }
    let (from, to) = (oracle.type_arguments(source), oracle.type_arguments(target));
    if from.is_empty() || from.len() != to.len() {
        return;
    }
    for (arg_from, arg_to) in from.iter().zip(&to) {
        if !oracle.assignable(*arg_from, *arg_to) {
            reporter.report(
                span,
                FindingKind::PhantomArgumentMismatch,
                format!(
                    "type annotations are not assignable: {} to {}",
                    oracle.display(source),
                    oracle.display(target)
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{audit::report::Finding, tests::stub_oracle::StubOracle};

    fn check(oracle: &StubOracle, source: TypeId, target: TypeId) -> Vec<Finding> {
        let mut findings = Vec::new();
        check_types(oracle, Span::new(0, 1), source, target, &mut findings);
        findings
    }

    #[test]
    fn same_origin_different_tag_is_a_phantom_mismatch_only() {
        let mut oracle = StubOracle::new();
        let any = oracle.basic("any");
        let string = oracle.basic("string");
        let boolean = oracle.basic("bool");
        let tagged_string = oracle.instance("a.A", 0, &[string], any);
        let tagged_bool = oracle.instance("a.A", 0, &[boolean], any);

        let findings = check(&oracle, tagged_bool, tagged_string);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, FindingKind::PhantomArgumentMismatch);
        assert_eq!(
            findings[0].message,
            "type annotations are not assignable: a.A[bool] to a.A[string]"
        );
        assert!(check(&oracle, tagged_string, tagged_string).is_empty());
    }

    #[test]
    fn different_origins_only_get_the_ordinary_check() {
        let mut oracle = StubOracle::new();
        let any = oracle.basic("any");
        let int = oracle.basic("int");
        let string = oracle.basic("string");
        let boolean = oracle.basic("bool");
        let a = oracle.instance("a.A", 0, &[string], any);
        let b = oracle.instance("a.B", 1, &[boolean], any);
        let c = oracle.instance("a.C", 2, &[boolean], int);

        assert!(check(&oracle, b, a).is_empty());
        let findings = check(&oracle, c, a);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, FindingKind::TypeMismatch);
        assert_eq!(
            findings[0].message,
            "types are not assignable: a.C[bool] to a.A[string]"
        );
    }

    #[test]
    fn each_failing_argument_is_reported() {
        let mut oracle = StubOracle::new();
        let any = oracle.basic("any");
        let int = oracle.basic("int");
        let string = oracle.basic("string");
        let from = oracle.instance("a.P", 0, &[int, int], any);
        let to = oracle.instance("a.P", 0, &[string, string], any);
        let partial = oracle.instance("a.P", 0, &[int, string], any);

        assert_eq!(check(&oracle, from, to).len(), 2);
        assert_eq!(check(&oracle, partial, to).len(), 1);
    }

    #[test]
    fn untyped_sources_never_reach_the_argument_check() {
        let mut oracle = StubOracle::new();
        let any = oracle.basic("any");
        let string = oracle.basic("string");
        let nil = oracle.basic("untyped nil");
        oracle.allow(nil, any);
        let tagged = oracle.instance("a.A", 0, &[string], any);

        assert!(check(&oracle, nil, tagged).is_empty());
    }

    #[test]
    fn mismatched_argument_counts_stop_the_comparison() {
        let mut oracle = StubOracle::new();
        let any = oracle.basic("any");
        let int = oracle.basic("int");
        let string = oracle.basic("string");
        let one = oracle.instance("a.A", 0, &[int], any);
        let two = oracle.instance("a.A", 0, &[string, string], any);

        assert!(check(&oracle, one, two).is_empty());
    }

    #[test]
    fn both_sides_must_be_instantiations() {
        let mut oracle = StubOracle::new();
        let any = oracle.basic("any");
        let string = oracle.basic("string");
        let tagged = oracle.instance("a.A", 0, &[string], any);

        assert!(oracle.is_alias_instantiation(tagged));
        assert!(!oracle.is_alias_instantiation(any));
        assert_eq!(oracle.origin(any), None);
        assert!(oracle.type_arguments(any).is_empty());
        assert!(check(&oracle, any, tagged).is_empty());
        assert!(check(&oracle, tagged, any).is_empty());
    }

    #[test]
    fn origins_and_arguments_come_from_the_oracle_queries() {
        let mut oracle = StubOracle::new();
        let any = oracle.basic("any");
        let string = oracle.basic("string");
        let boolean = oracle.basic("bool");
        let tagged_string = oracle.instance("a.A", 7, &[string], any);
        let tagged_bool = oracle.instance("a.A", 7, &[boolean], any);

        assert_eq!(oracle.origin(tagged_string), oracle.origin(tagged_bool));
        assert_eq!(oracle.type_arguments(tagged_bool), [boolean]);
        let findings = check(&oracle, tagged_bool, tagged_string);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, FindingKind::PhantomArgumentMismatch);
    }
}

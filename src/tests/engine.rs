use super::stub_oracle::StubOracle;
use crate::{
    audit::{
        audit_file,
        report::{Finding, FindingKind},
        AuditSummary, Pass,
    },
    language::{ast::File, parser::parse_file},
};
use std::path::PathBuf;

fn body(statements: &str) -> String {
    format!("package a\n\nfunc f() {{\n{statements}\n}}\n")
}

fn parse(source: &str) -> File {
    parse_file(PathBuf::from("a.ph"), source).expect("source parses")
}

fn run(source: &str, oracle: &StubOracle, pass: Pass) -> (Vec<Finding>, AuditSummary) {
    let file = parse(source);
    let mut findings = Vec::new();
    let summary = audit_file(&file, oracle, pass, &mut findings);
    (findings, summary)
}

fn messages(findings: &[Finding]) -> Vec<&str> {
    findings.iter().map(|finding| finding.message.as_str()).collect()
}

fn tagged() -> (StubOracle, [crate::audit::oracle::TypeId; 4]) {
    let mut oracle = StubOracle::new();
    let any = oracle.basic("any");
    let string = oracle.basic("string");
    let boolean = oracle.basic("bool");
    let int = oracle.basic("int");
    let tag_string = oracle.instance("Tag", 0, &[string], any);
    let tag_bool = oracle.instance("Tag", 0, &[boolean], any);
    (oracle, [tag_string, tag_bool, boolean, int])
}

#[test]
fn parallel_pairs_are_checked_positionally() {
    let mut oracle = StubOracle::new();
    let int = oracle.basic("int");
    let string = oracle.basic("string");
    oracle.variable("a", int);
    oracle.variable("b", string);
    oracle.variable("x", int);
    oracle.variable("y", string);

    let (findings, _) = run(&body("\ta, b = x, y"), &oracle, Pass::Assignable);
    assert!(findings.is_empty());
    let (findings, _) = run(&body("\tb, a = y, x"), &oracle, Pass::Assignable);
    assert!(findings.is_empty());

    let (findings, _) = run(&body("\ta, b = y, x"), &oracle, Pass::Assignable);
    assert_eq!(
        messages(&findings),
        [
            "types are not assignable: string to int",
            "types are not assignable: int to string"
        ]
    );
}

#[test]
fn argument_mismatch_is_reported_at_the_call() {
    let mut oracle = StubOracle::new();
    let int = oracle.basic("int");
    let string = oracle.basic("string");
    oracle.function("f", &[int, int], false, &[]);
    oracle.variable("x", string);
    oracle.variable("y", int);

    let source = body("\tf(x, y)");
    let (findings, summary) = run(&source, &oracle, Pass::Assignable);
    assert_eq!(summary.sites, 2);
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].kind, FindingKind::TypeMismatch);
    assert_eq!(findings[0].message, "types are not assignable: string to int");
    assert_eq!(Some(findings[0].span.start), source.find("f(x, y)"));
}

#[test]
fn trailing_arguments_bind_to_the_variadic_element() {
    let mut oracle = StubOracle::new();
    let int = oracle.basic("int");
    let string = oracle.basic("string");
    let strings = oracle.slice(string);
    oracle.function("log", &[int, strings], true, &[]);
    oracle.variable("level", int);
    oracle.variable("s", string);
    oracle.variable("n", int);
    oracle.variable("parts", strings);

    let (findings, summary) = run(&body("\tlog(level, s, n, s)"), &oracle, Pass::Assignable);
    assert_eq!(summary.sites, 4);
    assert_eq!(messages(&findings), ["types are not assignable: int to string"]);

    let (findings, _) = run(&body("\tlog(level)"), &oracle, Pass::Assignable);
    assert!(findings.is_empty());

    let (findings, _) = run(&body("\tlog(level, parts...)"), &oracle, Pass::Assignable);
    assert!(findings.is_empty(), "{findings:?}");
}

#[test]
fn same_alias_with_other_tag_is_only_a_phantom_finding() {
    let (mut oracle, [tag_string, tag_bool, ..]) = tagged();
    oracle.variable("target", tag_string);
    oracle.variable("source", tag_bool);

    let source = body("\tvar target Tag[string] = source");
    let (findings, _) = run(&source, &oracle, Pass::Assignable);
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].kind, FindingKind::PhantomArgumentMismatch);
    assert_eq!(
        findings[0].message,
        "type annotations are not assignable: Tag[bool] to Tag[string]"
    );
    assert_eq!(Some(findings[0].span.start), source.find("target"));
}

#[test]
fn lookup_checks_the_value_and_never_the_flag() {
    let (mut oracle, [tag_string, tag_bool, boolean, int]) = tagged();
    oracle.lookup("lookup", tag_bool, boolean);
    oracle.variable("a", tag_string);
    // The flag target is deliberately not a boolean.
    oracle.variable("b", int);

    let (findings, summary) = run(&body("\ta, b = lookup[key]"), &oracle, Pass::Assignable);
    assert_eq!(summary.sites, 1);
    assert_eq!(
        messages(&findings),
        ["type annotations are not assignable: Tag[bool] to Tag[string]"]
    );
}

#[test]
fn assertion_checks_the_asserted_type() {
    let (mut oracle, [tag_string, ..]) = tagged();
    oracle.variable("a", tag_string);

    let (findings, _) = run(&body("\ta, ok = v.(Tag[bool])"), &oracle, Pass::Assignable);
    assert_eq!(
        messages(&findings),
        ["type annotations are not assignable: Tag[bool] to Tag[string]"]
    );
}

#[test]
fn call_results_use_the_statement_position() {
    let (mut oracle, [tag_string, tag_bool, ..]) = tagged();
    oracle.function("pair", &[], false, &[tag_string, tag_bool]);
    oracle.variable("p", tag_string);
    oracle.variable("q", tag_string);

    let source = body("\tvar p, q = pair()");
    let (findings, _) = run(&source, &oracle, Pass::Assignable);
    assert_eq!(findings.len(), 1);
    assert_eq!(Some(findings[0].span.start), source.find("var p"));

    let source = body("\tp, q = pair()");
    let (findings, _) = run(&source, &oracle, Pass::Assignable);
    assert_eq!(findings.len(), 1);
    assert_eq!(Some(findings[0].span.start), source.find("p, q"));
}

#[test]
fn result_count_must_match_the_targets() {
    let (mut oracle, [tag_string, tag_bool, ..]) = tagged();
    oracle.function("triple", &[], false, &[tag_bool, tag_bool, tag_bool]);
    oracle.variable("p", tag_string);
    oracle.variable("q", tag_string);

    let (findings, summary) = run(&body("\tp, q = triple()"), &oracle, Pass::Assignable);
    assert!(findings.is_empty());
    assert_eq!(summary.sites, 0);
}

#[test]
fn unresolved_sides_are_skipped_silently() {
    let mut oracle = StubOracle::new();
    let int = oracle.basic("int");
    oracle.variable("a", int);

    let (findings, summary) = run(&body("\ta = missing\n\tmissing = a"), &oracle, Pass::Assignable);
    assert!(findings.is_empty());
    assert_eq!(summary, AuditSummary { sites: 2, skipped: 2 });
}

#[test]
fn type_annotation_pass_skips_destructuring_and_uneven_calls() {
    let (mut oracle, [tag_string, tag_bool, boolean, int]) = tagged();
    oracle.lookup("lookup", tag_bool, boolean);
    oracle.function("pair", &[], false, &[tag_bool, tag_bool]);
    oracle.function("take", &[tag_string, int], false, &[]);
    oracle.variable("a", tag_string);
    oracle.variable("b", boolean);
    oracle.variable("t", tag_bool);
    oracle.variable("n", int);

    let source = body("\ta, b = lookup[key]\n\ta, b = pair()\n\ttake(t)\n\ttake(t, n)");
    let (findings, summary) = run(&source, &oracle, Pass::TypeAnnotation);
    assert_eq!(summary.sites, 2);
    assert_eq!(
        messages(&findings),
        ["type annotations are not assignable: Tag[bool] to Tag[string]"]
    );
    assert_eq!(Some(findings[0].span.start), source.find("take(t, n)"));

    let (findings, _) = run(&source, &oracle, Pass::Assignable);
    assert_eq!(findings.len(), 5);
}

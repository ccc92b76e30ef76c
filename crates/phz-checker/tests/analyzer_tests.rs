//! End-to-end analyzer scenarios: PHP source in, diagnostics out.

use std::fs;
use std::path::PathBuf;

use phz_checker::Analyzer;
use phz_common::CheckerOptions;

fn analyze_with_options(source: &str, options: CheckerOptions) -> Vec<String> {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("input.php");
    fs::write(&path, source).expect("write source");
    let mut analyzer = Analyzer::new(options);
    let result = analyzer
        .analyze(&[path], &[])
        .expect("analysis should not fail");
    result
        .diagnostics
        .into_iter()
        .map(|diag| diag.message)
        .collect()
}

fn analyze(source: &str) -> Vec<String> {
    analyze_with_options(source, CheckerOptions::default())
}

fn assert_clean(source: &str) {
    let messages = analyze(source);
    assert!(messages.is_empty(), "expected no diagnostics, got {messages:?}");
}

fn assert_contains(messages: &[String], needle: &str) {
    assert!(
        messages.iter().any(|m| m.contains(needle)),
        "no message containing {needle:?} in {messages:?}"
    );
}

// ---------------------------------------------------------------------
// Core scenarios
// ---------------------------------------------------------------------

#[test]
fn undefined_variable_is_reported() {
    let messages = analyze("<?php print($x);");
    assert_eq!(messages, ["Undefined variable `$x`"]);
}

#[test]
fn return_type_mismatch_is_reported() {
    let messages = analyze("<?php function f(): int { return \"a\"; }");
    assert_eq!(
        messages,
        ["Returned type `string` is incompatible with the return type hint `int`"]
    );
}

#[test]
fn too_few_arguments_is_reported() {
    let messages = analyze("<?php function f(int $a, int $b) {} f(1);");
    assert_eq!(messages, ["Too few arguments provided to function `f`"]);
}

#[test]
fn impossible_identity_comparison_is_reported() {
    let messages = analyze("<?php $x = 1; if ($x === \"a\") {}");
    assert_eq!(
        messages,
        ["Condition is never fulfilled because of the type mismatch between `int` and `string`"]
    );
}

#[test]
fn interface_parameter_mismatch_is_reported() {
    let messages = analyze(
        "<?php interface I { function m(int $x): void; } \
         class C implements I { function m(string $x): void {} }",
    );
    assert_eq!(
        messages,
        ["Method `m` has different parameter types compared to the definition in the interface"]
    );
}

#[test]
fn abstract_instantiation_is_reported() {
    let messages = analyze("<?php abstract class A {} new A();");
    assert_eq!(messages, ["Cannot instantiate abstract class `A`"]);
}

// ---------------------------------------------------------------------
// Boundary behaviors
// ---------------------------------------------------------------------

#[test]
fn super_globals_are_always_defined() {
    assert_clean("<?php print($_GET); function f() { print($_SERVER); }");
}

#[test]
fn null_default_makes_parameter_nullable() {
    assert_clean("<?php function f(string $x = null) {} f(null);");
}

#[test]
fn int_argument_passes_float_parameter() {
    assert_clean("<?php function f(float $x) {} f(1);");
}

#[test]
fn float_argument_fails_int_parameter() {
    let messages = analyze("<?php function f(int $x) {} f(1.5);");
    assert_contains(&messages, "incompatible with the type hint `int`");
}

#[test]
fn string_passes_where_callable_expected() {
    assert_clean("<?php function f(callable $c) {} f('strlen');");
}

#[test]
fn closure_passes_where_callable_expected() {
    assert_clean("<?php function f(callable $c) {} f(function () { return 1; });");
}

#[test]
fn tostring_class_passes_where_string_expected() {
    assert_clean(
        "<?php class W { public function __toString(): string { return 'w'; } } \
         function f(string $s) {} f(new W());",
    );
}

#[test]
fn spread_disables_argument_position_checking() {
    assert_clean("<?php function f(int $a, int $b) {} $args = [1, 2]; f(...$args);");
}

#[test]
fn too_many_arguments() {
    let messages = analyze("<?php function f(int $a) {} f(1, 2);");
    assert_eq!(messages, ["Too many arguments provided to function `f`"]);
}

#[test]
fn variadic_absorbs_extra_arguments() {
    assert_clean("<?php function f(int $a, int ...$rest) {} f(1, 2, 3, 4);");
}

#[test]
fn named_arguments_fill_required_parameters() {
    assert_clean("<?php function f(int $a, int $b) {} f(b: 2, a: 1);");
}

#[test]
fn unknown_named_argument() {
    let messages = analyze("<?php function f(int $a) {} f(c: 1);");
    assert_contains(&messages, "Unknown named argument `$c` for function `f`");
}

#[test]
fn by_ref_argument_must_be_a_variable() {
    let messages = analyze("<?php sort(42);");
    assert_contains(&messages, "passed by reference and must be a variable");
}

#[test]
fn by_ref_argument_defines_the_variable() {
    assert_clean("<?php preg_match('/a/', 'haystack', $m); var_dump($m);");
}

// ---------------------------------------------------------------------
// Functions and returns
// ---------------------------------------------------------------------

#[test]
fn missing_return_reported_once() {
    let messages = analyze("<?php function f(): int { $x = 1; }");
    assert_eq!(
        messages,
        ["Function `f` has a non-void return type hint but does not return a value"]
    );
}

#[test]
fn void_function_needs_no_return() {
    assert_clean("<?php function f(): void { $x = 1; }");
}

#[test]
fn generator_needs_no_return() {
    assert_clean("<?php function f(): Generator { yield 1; }");
}

#[test]
fn undefined_function_call() {
    let messages = analyze("<?php nope();");
    assert_eq!(messages, ["Undefined function `nope`"]);
}

#[test]
fn host_function_signatures_are_checked() {
    let messages = analyze("<?php strlen([]);");
    assert_contains(&messages, "incompatible with the type hint `string`");
}

#[test]
fn forward_reference_within_scope_is_tolerated() {
    assert_clean("<?php function f() { g($later); $later = 1; } function g($x) {}");
}

#[test]
fn conditional_assignment_widens_types() {
    // Both branches run through the same optimistic scope: int|string.
    assert_clean(
        "<?php function f(bool $c) { if ($c) { $v = 1; } else { $v = 'a'; } return $v; }",
    );
}

// ---------------------------------------------------------------------
// Classes
// ---------------------------------------------------------------------

#[test]
fn duplicate_class_yields_exactly_one_diagnostic() {
    let messages = analyze("<?php class A {} class A {}");
    let dupes: Vec<_> = messages
        .iter()
        .filter(|m| m.contains("redeclare class"))
        .collect();
    assert_eq!(dupes.len(), 1, "{messages:?}");
}

#[test]
fn self_check_mode_suppresses_redeclaration() {
    let options = CheckerOptions {
        self_check: true,
        ..CheckerOptions::default()
    };
    let messages = analyze_with_options("<?php class A {} class A {}", options);
    assert!(messages.is_empty(), "{messages:?}");
}

#[test]
fn undefined_class_in_new() {
    let messages = analyze("<?php new Missing();");
    assert_eq!(messages, ["Undefined class `Missing`"]);
}

#[test]
fn arguments_to_class_without_constructor() {
    let messages = analyze("<?php class A {} new A(1);");
    assert_contains(&messages, "does not have a constructor");
}

#[test]
fn constructor_arguments_are_validated() {
    let messages = analyze(
        "<?php class A { public function __construct(int $n) {} } new A('s');",
    );
    assert_contains(&messages, "incompatible with the type hint `int`");
}

#[test]
fn cannot_extend_final_class() {
    let messages = analyze("<?php final class A {} class B extends A {}");
    assert_eq!(messages, ["Cannot extend final class `A`"]);
}

#[test]
fn cannot_override_final_method() {
    let messages = analyze(
        "<?php class A { final public function m(): void {} } \
         class B extends A { public function m(): void {} }",
    );
    assert_eq!(messages, ["Cannot override final method `A::m`"]);
}

#[test]
fn concrete_class_must_implement_abstract_methods() {
    let messages = analyze(
        "<?php abstract class A { abstract public function m(): void; } class B extends A {}",
    );
    assert_contains(&messages, "contains abstract method `A::m`");
}

#[test]
fn interface_methods_are_obligations() {
    let messages = analyze("<?php interface I { function m(): void; } class C implements I {}");
    assert_contains(&messages, "contains abstract method `I::m`");
}

#[test]
fn interface_may_not_declare_properties() {
    let messages = analyze("<?php interface I { public $x; }");
    assert_contains(&messages, "may not include properties");
}

#[test]
fn readonly_property_requires_type() {
    let messages = analyze("<?php class A { public readonly $x; }");
    assert_contains(&messages, "must have a type");
}

#[test]
fn readonly_property_rejects_default() {
    let messages = analyze("<?php class A { public readonly int $x = 1; }");
    assert_contains(&messages, "cannot have a default value");
}

#[test]
fn property_default_must_match_hint() {
    let messages = analyze("<?php class A { public int $x = 'nope'; }");
    assert_contains(&messages, "incompatible with the type hint `int`");
}

#[test]
fn promoted_constructor_parameters_become_properties() {
    assert_clean(
        "<?php class P { public function __construct(private int $n) {} \
         public function get(): int { return $this->n; } }",
    );
}

#[test]
fn property_assignment_checks_types() {
    let messages = analyze(
        "<?php class P { public int $n = 0; } $p = new P(); $p->n = 'nope';",
    );
    assert_contains(&messages, "Assigned type `string` is incompatible");
}

#[test]
fn undefined_property_read() {
    let messages = analyze("<?php class P {} $p = new P(); print($p->missing);");
    assert_eq!(messages, ["Undefined property `P::$missing`"]);
}

#[test]
fn magic_get_suppresses_undefined_property() {
    assert_clean(
        "<?php class P { public function __get(string $name): mixed { return null; } } \
         $p = new P(); print($p->anything);",
    );
}

#[test]
fn undefined_method_call() {
    let messages = analyze("<?php class P {} $p = new P(); $p->nope();");
    assert_eq!(messages, ["Call to undefined method `P::nope`"]);
}

#[test]
fn magic_call_suppresses_undefined_method() {
    assert_clean(
        "<?php class P { public function __call(string $name, array $args): mixed { \
         return null; } } $p = new P(); $p->anything(1, 2);",
    );
}

#[test]
fn static_property_access() {
    let messages = analyze(
        "<?php class P { public static int $count = 0; public int $n = 0; } \
         print(P::$count); print(P::$n);",
    );
    assert_eq!(messages, ["Property `P::$n` is not static"]);
}

#[test]
fn static_property_accessed_non_statically() {
    let messages = analyze(
        "<?php class P { public static int $count = 0; } $p = new P(); print($p->count);",
    );
    assert_contains(&messages, "cannot be accessed non-statically");
}

#[test]
fn non_static_method_called_statically() {
    let messages = analyze(
        "<?php class P { public function m(): void {} } P::m();",
    );
    assert_eq!(messages, ["Cannot call non-static method `P::m` statically"]);
}

#[test]
fn self_call_to_non_static_method_is_allowed() {
    assert_clean(
        "<?php class P { public function a(): void { self::b(); } \
         public function b(): void {} }",
    );
}

#[test]
fn self_outside_class_is_reported() {
    let messages = analyze("<?php new self();");
    assert_eq!(messages, ["Cannot use `self` outside of a class"]);
}

#[test]
fn parent_without_parent_class_is_reported() {
    let messages = analyze(
        "<?php class P { public function m(): void { parent::m(); } }",
    );
    assert_contains(&messages, "Cannot use `parent` in a class with no parent");
}

#[test]
fn undefined_class_constant() {
    let messages = analyze("<?php class P { const A = 1; } print(P::NOPE);");
    assert_eq!(messages, ["Undefined class constant `P::NOPE`"]);
}

#[test]
fn class_constant_fetch_is_typed() {
    let messages = analyze(
        "<?php class P { const GREETING = 'hi'; } \
         function f(int $n) {} f(P::GREETING);",
    );
    assert_contains(&messages, "incompatible with the type hint `int`");
}

// ---------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------

#[test]
fn trait_methods_are_merged() {
    assert_clean(
        "<?php trait Greets { public function hello(): string { return 'hi'; } } \
         class C { use Greets; } $c = new C(); print($c->hello());",
    );
}

#[test]
fn trait_collision_without_insteadof() {
    let messages = analyze(
        "<?php trait T1 { public function m(): int { return 1; } } \
         trait T2 { public function m(): int { return 2; } } \
         class C { use T1, T2; }",
    );
    assert_contains(&messages, "collides with a method from another trait");
}

#[test]
fn insteadof_resolves_trait_collision() {
    assert_clean(
        "<?php trait T1 { public function m(): int { return 1; } } \
         trait T2 { public function m(): int { return 2; } } \
         class C { use T1, T2 { T1::m insteadof T2; } }",
    );
}

#[test]
fn trait_alias_introduces_method() {
    assert_clean(
        "<?php trait T { public function m(): int { return 1; } } \
         class C { use T { T::m as n; } } $c = new C(); print($c->n());",
    );
}

// ---------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------

#[test]
fn backed_enum_case_value_must_match_backing() {
    let messages = analyze("<?php enum E: int { case A = 'x'; }");
    assert_contains(
        &messages,
        "Enum case value type `string` is incompatible with the backing type `int`",
    );
}

#[test]
fn backed_enum_case_requires_value() {
    let messages = analyze("<?php enum E: int { case A; }");
    assert_contains(&messages, "must have a value");
}

#[test]
fn pure_enum_case_rejects_value() {
    let messages = analyze("<?php enum E { case A = 1; }");
    assert_contains(&messages, "cannot have a value");
}

#[test]
fn backed_enum_value_property_is_typed() {
    assert_clean(
        "<?php enum E: string { case A = 'a'; } \
         function f(E $e): string { return $e->value; }",
    );
}

#[test]
fn enum_from_is_available_on_backed_enums() {
    assert_clean("<?php enum E: int { case A = 1; } E::from(1); E::tryFrom(2); E::cases();");
}

#[test]
fn enum_cannot_be_instantiated() {
    let messages = analyze("<?php enum E { case A; } new E();");
    assert_contains(&messages, "Cannot instantiate enum `E`");
}

// ---------------------------------------------------------------------
// Scopes, closures, catches
// ---------------------------------------------------------------------

#[test]
fn closure_use_of_undefined_variable() {
    let messages = analyze("<?php $f = function () use ($missing) { return $missing; };");
    assert_eq!(messages, ["Undefined variable `$missing`"]);
}

#[test]
fn closure_by_ref_use_creates_the_variable() {
    assert_clean(
        "<?php $f = function () use (&$acc) { $acc = 1; }; print($acc);",
    );
}

#[test]
fn closure_captures_by_value_read_the_parent() {
    assert_clean("<?php $n = 1; $f = function () use ($n) { return $n; };");
}

#[test]
fn function_scope_does_not_see_outer_variables() {
    let messages = analyze("<?php $outer = 1; function f() { return $outer; }");
    assert_eq!(messages, ["Undefined variable `$outer`"]);
}

#[test]
fn global_statement_imports_the_variable() {
    assert_clean("<?php $g = 1; function f() { global $g; return $g; }");
}

#[test]
fn static_variables_are_defined() {
    assert_clean("<?php function f() { static $n = 0; return $n; }");
}

#[test]
fn catch_defines_the_variable_with_listed_types() {
    assert_clean(
        "<?php try { $x = 1; } catch (RuntimeException | LogicException $e) { \
         print($e->getMessage()); }",
    );
}

#[test]
fn catch_of_undefined_class() {
    let messages = analyze("<?php try { $x = 1; } catch (NoSuchError $e) {}");
    assert_eq!(messages, ["Undefined class `NoSuchError`"]);
}

#[test]
fn instanceof_narrows_the_variable() {
    let messages = analyze(
        "<?php function f($x) { if ($x instanceof RuntimeException) { $x->nope(); } }",
    );
    assert_eq!(
        messages,
        ["Call to undefined method `RuntimeException::nope`"]
    );
}

#[test]
fn foreach_defines_key_and_value() {
    assert_clean("<?php $xs = [1, 2]; foreach ($xs as $k => $v) { print($k); print($v); }");
}

#[test]
fn foreach_value_must_be_writable() {
    let messages = analyze("<?php $xs = [1]; foreach ($xs as f()) {}");
    assert_contains(&messages, "Cannot assign to this expression");
}

#[test]
fn destructuring_defines_components() {
    assert_clean("<?php [$a, [$b, $c]] = [1, [2, 3]]; print($a); print($b); print($c);");
}

#[test]
fn identity_contradiction_with_not_identical() {
    let messages = analyze("<?php $x = 1; if ($x !== 'a') {}");
    assert_eq!(
        messages,
        ["Condition is always fulfilled because of the type mismatch between `int` and `string`"]
    );
}

#[test]
fn identity_between_bool_and_literals_is_not_flagged() {
    assert_clean("<?php function f(bool $b) { if ($b === true) {} }");
}

#[test]
fn isset_operands_are_exempt() {
    assert_clean("<?php if (isset($maybe)) { print(1); } if (empty($other)) { print(2); }");
}

// ---------------------------------------------------------------------
// Namespaces and constants
// ---------------------------------------------------------------------

#[test]
fn namespaced_function_resolution_falls_back_to_global() {
    assert_clean("<?php namespace App; strlen('x');");
}

#[test]
fn namespaced_class_has_no_global_fallback() {
    let messages = analyze(
        "<?php namespace App; class Local {} new Local(); new Exception('x');",
    );
    assert_eq!(messages, ["Undefined class `App\\Exception`"]);
}

#[test]
fn use_alias_resolves_classes() {
    assert_clean(
        "<?php namespace App; use RuntimeException as Boom; throw new Boom('x');",
    );
}

#[test]
fn reserved_constant_names_are_rejected() {
    let messages = analyze("<?php const TRUE = 1;");
    assert_contains(&messages, "reserved name");
}

#[test]
fn user_constants_are_typed_by_their_value() {
    let messages = analyze(
        "<?php const LIMIT = 10; function f(string $s) {} f(LIMIT);",
    );
    assert_contains(&messages, "incompatible with the type hint `string`");
}

#[test]
fn undefined_constant() {
    let messages = analyze("<?php print(NOPE);");
    assert_eq!(messages, ["Undefined constant `NOPE`"]);
}

#[test]
fn host_constants_exist() {
    assert_clean("<?php print(PHP_EOL); print(PHP_INT_MAX);");
}

#[test]
fn union_members_keep_being_validated_by_default() {
    let messages = analyze("<?php function f(MissingA|MissingB $x) {}");
    assert_eq!(messages.len(), 2, "{messages:?}");
}

#[test]
fn union_validation_stops_after_first_error_when_configured() {
    let options = CheckerOptions {
        validate_union_after_error: false,
        ..CheckerOptions::default()
    };
    let messages = analyze_with_options("<?php function f(MissingA|MissingB $x) {}", options);
    assert_eq!(messages.len(), 1, "{messages:?}");
}

// ---------------------------------------------------------------------
// Multi-file behavior
// ---------------------------------------------------------------------

#[test]
fn includes_are_followed_statically() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(
        dir.path().join("main.php"),
        "<?php require __DIR__ . '/lib.php'; helper();",
    )
    .expect("write main");
    fs::write(
        dir.path().join("lib.php"),
        "<?php function helper(): void {}",
    )
    .expect("write lib");
    let mut analyzer = Analyzer::new(CheckerOptions::default());
    let result = analyzer
        .analyze(&[dir.path().join("main.php")], &[])
        .expect("analyze");
    assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
    assert_eq!(result.files_checked.len(), 2);
}

#[test]
fn missing_include_is_reported() {
    let messages = analyze("<?php require __DIR__ . '/nope.php';");
    assert_contains(&messages, "not found");
}

#[test]
fn dynamic_include_is_reported_and_skipped() {
    let messages = analyze("<?php $path = 'x.php'; include $path;");
    assert_contains(&messages, "Cannot statically resolve include path");
}

#[test]
fn parse_error_aborts_only_that_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let bad = dir.path().join("bad.php");
    let good = dir.path().join("good.php");
    fs::write(&bad, "<?php $x = ;").expect("write bad");
    fs::write(&good, "<?php print($y);").expect("write good");
    let mut analyzer = Analyzer::new(CheckerOptions::default());
    let result = analyzer
        .analyze(&[bad, good], &[])
        .expect("analyze");
    let messages: Vec<_> = result.diagnostics.iter().map(|d| d.message.clone()).collect();
    assert_eq!(messages.len(), 2, "{messages:?}");
    assert!(messages[1].contains("Undefined variable `$y`"));
}

#[test]
fn ignored_prefixes_suppress_validation() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("vendor.php");
    fs::write(&path, "<?php print($undefined);").expect("write");
    let canonical = fs::canonicalize(&path).expect("canonicalize");
    let prefix = canonical.parent().unwrap().display().to_string();
    let mut analyzer = Analyzer::new(CheckerOptions::default());
    let result = analyzer
        .analyze(&[path], &[prefix])
        .expect("analyze");
    assert!(result.diagnostics.is_empty());
    assert_eq!(result.files_ignored.len(), 1);
    assert!(result.files_checked.is_empty());
}

#[test]
fn analysis_is_deterministic() {
    let source = "<?php class A {} new B(); print($x); $y = 1; if ($y === 'a') {}";
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("input.php");
    fs::write(&path, source).expect("write");
    let run = |path: &PathBuf| {
        let mut analyzer = Analyzer::new(CheckerOptions::default());
        let result = analyzer.analyze(&[path.clone()], &[]).expect("analyze");
        result
            .diagnostics
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
    };
    assert_eq!(run(&path), run(&path));
}

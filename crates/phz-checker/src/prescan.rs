//! Scope pre-scan: find the variables a body will ever write.
//!
//! A stripped-down linear walk of a function/method/closure body that
//! records every variable name that is eventually assigned (plain and
//! destructuring assignment targets, foreach targets, catch variables,
//! `global`/`static` declarations, by-reference arguments to known
//! callables, closure by-reference use-bindings). Later type checks treat
//! these names as defined, so forward references within the same scope do
//! not produce spurious undefined-variable errors. One pass suffices:
//! variable types only widen, so no fixed point is needed.
//!
//! The walk does not descend into nested function or class declarations; it
//! enters closure expressions only to pick up their by-reference
//! use-bindings, which leak into the enclosing scope.

use rustc_hash::FxHashSet;

use phz_parser::{Arg, ArrayItem, Callee, CatchClause, Expr, Stmt};

use crate::context::{Checker, Scope};

impl Checker {
    /// Collect every variable name `stmts` eventually writes.
    pub fn prescan(&self, scope: &Scope, stmts: &[Stmt]) -> FxHashSet<String> {
        let mut found = FxHashSet::default();
        for stmt in stmts {
            self.scan_stmt(scope, stmt, &mut found);
        }
        found
    }

    fn scan_stmt(&self, scope: &Scope, stmt: &Stmt, found: &mut FxHashSet<String>) {
        match stmt {
            Stmt::Expr(expr) | Stmt::Return { value: Some(expr), .. } => {
                self.scan_expr(scope, expr, found)
            }
            Stmt::Echo { values, .. } => {
                for value in values {
                    self.scan_expr(scope, value, found);
                }
            }
            Stmt::If {
                cond,
                then,
                elseifs,
                else_body,
                ..
            } => {
                self.scan_expr(scope, cond, found);
                self.scan_all(scope, then, found);
                for elseif in elseifs {
                    self.scan_expr(scope, &elseif.cond, found);
                    self.scan_all(scope, &elseif.body, found);
                }
                if let Some(body) = else_body {
                    self.scan_all(scope, body, found);
                }
            }
            Stmt::While { cond, body, .. } | Stmt::DoWhile { body, cond, .. } => {
                self.scan_expr(scope, cond, found);
                self.scan_all(scope, body, found);
            }
            Stmt::For {
                init,
                cond,
                step,
                body,
                ..
            } => {
                for expr in init.iter().chain(cond).chain(step) {
                    self.scan_expr(scope, expr, found);
                }
                self.scan_all(scope, body, found);
            }
            Stmt::Foreach(foreach) => {
                self.scan_expr(scope, &foreach.subject, found);
                if let Some(key) = &foreach.key {
                    self.collect_write_target(key, found);
                }
                self.collect_write_target(&foreach.value, found);
                self.scan_all(scope, &foreach.body, found);
            }
            Stmt::Switch { subject, cases, .. } => {
                self.scan_expr(scope, subject, found);
                for case in cases {
                    if let Some(test) = &case.test {
                        self.scan_expr(scope, test, found);
                    }
                    self.scan_all(scope, &case.body, found);
                }
            }
            Stmt::Try {
                body,
                catches,
                finally,
                ..
            } => {
                self.scan_all(scope, body, found);
                for CatchClause { var, body, .. } in catches {
                    if let Some(var) = var {
                        found.insert(var.clone());
                    }
                    self.scan_all(scope, body, found);
                }
                if let Some(body) = finally {
                    self.scan_all(scope, body, found);
                }
            }
            Stmt::Global { names, .. } => {
                found.extend(names.iter().cloned());
            }
            Stmt::StaticVars { vars, .. } => {
                for (name, default) in vars {
                    found.insert(name.clone());
                    if let Some(default) = default {
                        self.scan_expr(scope, default, found);
                    }
                }
            }
            Stmt::Unset { targets, .. } => {
                for target in targets {
                    self.scan_expr(scope, target, found);
                }
            }
            Stmt::Block(stmts) => self.scan_all(scope, stmts, found),
            // Nested declarations keep their own scope.
            Stmt::Function(_) | Stmt::Class(_) => {}
            _ => {}
        }
    }

    fn scan_all(&self, scope: &Scope, stmts: &[Stmt], found: &mut FxHashSet<String>) {
        for stmt in stmts {
            self.scan_stmt(scope, stmt, found);
        }
    }

    fn scan_expr(&self, scope: &Scope, expr: &Expr, found: &mut FxHashSet<String>) {
        match expr {
            Expr::Assign { target, value, .. } => {
                self.collect_write_target(target, found);
                self.scan_expr(scope, value, found);
            }
            Expr::AssignOp { target, value, .. } => {
                self.collect_write_target(target, found);
                self.scan_expr(scope, value, found);
            }
            Expr::Closure(closure) => {
                // By-reference use-bindings create the variable in the
                // enclosing scope; the body itself is a separate scope.
                for use_binding in &closure.uses {
                    if use_binding.by_ref {
                        found.insert(use_binding.name.clone());
                    }
                }
            }
            Expr::Call { callee, args, .. } => {
                if let Callee::Expr(inner) = callee {
                    self.scan_expr(scope, inner, found);
                }
                self.scan_call_args(scope, callee, args, found);
            }
            Expr::MethodCall { object, args, .. } => {
                self.scan_expr(scope, object, found);
                for arg in args {
                    self.scan_expr(scope, &arg.value, found);
                }
            }
            Expr::StaticCall { args, .. } | Expr::New { args, .. } => {
                for arg in args {
                    self.scan_expr(scope, &arg.value, found);
                }
            }
            Expr::Binary { lhs, rhs, .. } => {
                self.scan_expr(scope, lhs, found);
                self.scan_expr(scope, rhs, found);
            }
            Expr::Unary { expr, .. }
            | Expr::Cast { expr, .. }
            | Expr::Clone { expr, .. }
            | Expr::Throw { expr, .. }
            | Expr::Print { expr, .. }
            | Expr::EmptyCheck { expr, .. } => self.scan_expr(scope, expr, found),
            Expr::Ternary {
                cond, then, else_, ..
            } => {
                self.scan_expr(scope, cond, found);
                if let Some(then) = then {
                    self.scan_expr(scope, then, found);
                }
                self.scan_expr(scope, else_, found);
            }
            Expr::ArrayLit { items, .. } => {
                for ArrayItem { key, value, .. } in items {
                    if let Some(key) = key {
                        self.scan_expr(scope, key, found);
                    }
                    self.scan_expr(scope, value, found);
                }
            }
            Expr::List { items, .. } => {
                for item in items.iter().flatten() {
                    self.scan_expr(scope, &item.value, found);
                }
            }
            Expr::Index { base, index, .. } => {
                self.scan_expr(scope, base, found);
                if let Some(index) = index {
                    self.scan_expr(scope, index, found);
                }
            }
            Expr::Prop { object, .. } => self.scan_expr(scope, object, found),
            Expr::Isset { vars, .. } => {
                for var in vars {
                    self.scan_expr(scope, var, found);
                }
            }
            Expr::Yield {
                value: Some(value), ..
            } => self.scan_expr(scope, value, found),
            Expr::Instanceof { expr, .. } => self.scan_expr(scope, expr, found),
            Expr::Include { path, .. } => self.scan_expr(scope, path, found),
            Expr::Exit {
                value: Some(value), ..
            } => self.scan_expr(scope, value, found),
            _ => {}
        }
    }

    /// Arguments passed by reference to a statically known callable count as
    /// writes (e.g. `preg_match($re, $s, $matches)` defines `$matches`).
    fn scan_call_args(
        &self,
        scope: &Scope,
        callee: &Callee,
        args: &[Arg],
        found: &mut FxHashSet<String>,
    ) {
        let sig = match callee {
            Callee::Name(name) => self
                .registry
                .resolve_function_ref(name, &scope.namespace, &scope.aliases)
                .and_then(|id| self.registry.function(id).sig.clone()),
            Callee::Expr(_) => None,
        };
        for (index, arg) in args.iter().enumerate() {
            let by_ref = sig
                .as_ref()
                .and_then(|sig| {
                    sig.parameters
                        .get(index)
                        .or_else(|| sig.parameters.last().filter(|p| p.variadic))
                })
                .map(|param| param.by_ref)
                .unwrap_or(false);
            if by_ref {
                if let Expr::Var { name, .. } = &arg.value {
                    found.insert(name.clone());
                    continue;
                }
            }
            self.scan_expr(scope, &arg.value, found);
        }
    }

    /// Variables written by an assignment-like target.
    fn collect_write_target(&self, target: &Expr, found: &mut FxHashSet<String>) {
        match target {
            Expr::Var { name, .. } => {
                found.insert(name.clone());
            }
            Expr::ArrayLit { items, .. } => {
                for item in items {
                    self.collect_write_target(&item.value, found);
                }
            }
            Expr::List { items, .. } => {
                for item in items.iter().flatten() {
                    self.collect_write_target(&item.value, found);
                }
            }
            // `$a[0] = …` and `$a[] = …` write the base variable.
            Expr::Index { base, .. } => self.collect_write_target(base, found),
            // Property and static-property writes touch no local variable.
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use phz_common::CheckerOptions;
    use phz_parser::parse_file;
    use phz_reflect::FileId;

    fn scan(body_source: &str) -> FxHashSet<String> {
        let checker = Checker::new(CheckerOptions::default());
        let stmts = parse_file(body_source).expect("parse failed");
        let scope = Scope::new(FileId(0));
        checker.prescan(&scope, &stmts)
    }

    #[test]
    fn collects_assignment_targets() {
        let found = scan("<?php $a = 1; [$b, [$c]] = $x; $d[0] = 2;");
        for name in ["a", "b", "c", "d"] {
            assert!(found.contains(name), "missing {name}");
        }
    }

    #[test]
    fn collects_foreach_catch_global_static() {
        let found = scan(
            "<?php foreach ($xs as $k => $v) {} try {} catch (Exception $e) {} \
             global $g; static $s = 1;",
        );
        for name in ["k", "v", "e", "g", "s"] {
            assert!(found.contains(name), "missing {name}");
        }
    }

    #[test]
    fn collects_by_ref_args_of_known_callables() {
        let found = scan("<?php preg_match('/x/', $subject, $matches);");
        assert!(found.contains("matches"));
        assert!(!found.contains("subject"));
    }

    #[test]
    fn closure_bodies_stay_out_but_ref_uses_leak() {
        let found = scan("<?php $f = function () use (&$leaked, $copied) { $inner = 1; };");
        assert!(found.contains("f"));
        assert!(found.contains("leaked"));
        assert!(!found.contains("copied"));
        assert!(!found.contains("inner"));
    }

    #[test]
    fn nested_declarations_are_opaque() {
        let found = scan("<?php function g() { $hidden = 1; } $seen = 2;");
        assert!(found.contains("seen"));
        assert!(!found.contains("hidden"));
    }
}

//! Checker context.
//!
//! The `Checker` owns what is shared across the whole run: the registry, the
//! options and the diagnostic sink. The `Scope` is the per-lexical-scope
//! value threaded through the walk; entering a namespace block, class body,
//! function, method or closure clones it, so changes never leak back out.
//! The "any error seen" bit propagates upward for free because the sink is
//! shared.

use rustc_hash::{FxHashMap, FxHashSet};
use std::path::PathBuf;
use std::rc::Rc;

use phz_common::{CheckerOptions, DiagnosticSink};
use phz_parser::{Name, TypeExpr};
use phz_reflect::{ClassId, FileId, FunctionSig, Registry, UseAliases};
use phz_types::{is_primitive, Ty, TypeSet};

/// Variables considered pre-defined in every scope, typed `array`.
pub const SUPER_GLOBALS: &[&str] = &[
    "_GET", "_ENV", "_POST", "_FILES", "_COOKIE", "_SERVER", "_GLOBALS", "_REQUEST", "_SESSION",
];

pub struct Checker {
    pub registry: Registry,
    pub options: CheckerOptions,
    pub sink: DiagnosticSink,
    /// Classes currently being initialized; guards resolver re-entry.
    pub(crate) initializing: FxHashSet<ClassId>,
    /// Files loaded but excluded from validation (preloads, ignored prefixes).
    pub(crate) skip_validation: FxHashSet<FileId>,
    /// Working directory used to relativize display paths.
    pub(crate) cwd: Option<PathBuf>,
}

impl Checker {
    pub fn new(options: CheckerOptions) -> Self {
        Checker {
            registry: Registry::with_host(),
            options,
            sink: DiagnosticSink::new(),
            initializing: FxHashSet::default(),
            skip_validation: FxHashSet::default(),
            cwd: std::env::current_dir().ok(),
        }
    }

    /// Append a diagnostic at `line` of the scope's file.
    pub fn error(&mut self, scope: &Scope, line: u32, message: impl Into<String>) {
        let path = self.registry.file(scope.file).pretty.clone();
        self.sink.error(path, line, message);
    }

    /// Resolve a class-position name to its fully qualified form, handling
    /// `self`/`parent`/`static` against the current class.
    pub fn fq_class_name(&mut self, scope: &Scope, name: &Name, report: bool) -> Option<String> {
        if name.is_simple() {
            let lower = name.first().to_ascii_lowercase();
            match lower.as_str() {
                "self" | "static" => {
                    return match scope.current_class {
                        Some(id) => Some(self.registry.class(id).name.clone()),
                        None => {
                            if report {
                                self.error(
                                    scope,
                                    name.line,
                                    format!("Cannot use `{lower}` outside of a class"),
                                );
                            }
                            None
                        }
                    };
                }
                "parent" => {
                    return match scope.current_class {
                        Some(id) => match self.registry.class(id).parent {
                            Some(parent) => Some(self.registry.class(parent).name.clone()),
                            None => {
                                if report {
                                    self.error(
                                        scope,
                                        name.line,
                                        "Cannot use `parent` in a class with no parent",
                                    );
                                }
                                None
                            }
                        },
                        None => {
                            if report {
                                self.error(scope, name.line, "Cannot use `parent` outside of a class");
                            }
                            None
                        }
                    };
                }
                _ => {}
            }
        }
        Some(
            self.registry
                .resolve_class_name(name, &scope.namespace, &scope.aliases),
        )
    }

    /// Resolve a declared type expression into the lattice.
    ///
    /// Union members keep being validated after the first bad one only when
    /// `validate_union_after_error` is set.
    pub fn resolve_type(&mut self, scope: &Scope, expr: &TypeExpr, report: bool) -> Ty {
        match expr {
            TypeExpr::Name(name) => self.resolve_type_name(scope, name, report).0,
            TypeExpr::Nullable(inner) => match self.resolve_type(scope, inner, report) {
                Ty::Named { name, .. } => Ty::Named {
                    name,
                    nullable: true,
                },
                other => Ty::union(vec![other, Ty::named("null")]),
            },
            TypeExpr::Union(parts) => {
                let mut resolved = Vec::with_capacity(parts.len());
                let mut reporting = report;
                for part in parts {
                    match part {
                        TypeExpr::Name(name) => {
                            let (ty, had_error) = self.resolve_type_name(scope, name, reporting);
                            if had_error && !self.options.validate_union_after_error {
                                reporting = false;
                            }
                            resolved.push(ty);
                        }
                        other => resolved.push(self.resolve_type(scope, other, reporting)),
                    }
                }
                Ty::union(resolved)
            }
            TypeExpr::Intersection(parts) => {
                let resolved: Vec<Ty> = parts
                    .iter()
                    .map(|part| self.resolve_type(scope, part, report))
                    .collect();
                Ty::Intersection(resolved)
            }
        }
    }

    /// Resolve a single type name. Returns the type and whether an error was
    /// reported for it.
    fn resolve_type_name(&mut self, scope: &Scope, name: &Name, report: bool) -> (Ty, bool) {
        if name.is_simple() && is_primitive(name.first()) {
            return (Ty::named(name.first().to_ascii_lowercase()), false);
        }
        let Some(fqn) = self.fq_class_name(scope, name, report) else {
            return (Ty::Unknown, true);
        };
        if !self.registry.class_exists(&fqn) {
            if report {
                self.error(scope, name.line, format!("Undefined class `{fqn}`"));
            }
            return (Ty::named(fqn), true);
        }
        (Ty::named(fqn), false)
    }
}

/// Per-scope mutable state, cloned on entering any nested scope.
#[derive(Clone)]
pub struct Scope {
    pub file: FileId,
    pub namespace: String,
    pub aliases: UseAliases,
    pub current_class: Option<ClassId>,
    pub current_function: Option<Rc<FunctionSig>>,
    /// Variable name (without `$`) to its possible types.
    pub vars: FxHashMap<String, TypeSet>,
    /// Snapshot of the enclosing global scope, for `global` statements.
    pub global_vars: FxHashMap<String, TypeSet>,
    /// Names the pre-scan says this scope eventually writes.
    pub pending_vars: FxHashSet<String>,
    pub has_return: bool,
    pub in_assignment: bool,
}

impl Scope {
    pub fn new(file: FileId) -> Self {
        let mut scope = Scope {
            file,
            namespace: String::new(),
            aliases: UseAliases::default(),
            current_class: None,
            current_function: None,
            vars: FxHashMap::default(),
            global_vars: FxHashMap::default(),
            pending_vars: FxHashSet::default(),
            has_return: false,
            in_assignment: false,
        };
        scope.preload_super_globals();
        scope
    }

    fn preload_super_globals(&mut self) {
        for name in SUPER_GLOBALS {
            self.vars
                .insert((*name).to_string(), TypeSet::of(Ty::named("array")));
        }
    }

    /// First write creates the variable; later writes union the types.
    /// A variable already at `Unknown` ignores new information.
    pub fn add_var(&mut self, name: &str, types: TypeSet) {
        match self.vars.get_mut(name) {
            Some(existing) => existing.merge(&types),
            None => {
                self.vars.insert(name.to_string(), types);
            }
        }
    }

    pub fn var_defined(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    /// Entering a fresh function scope: current variables become the global
    /// snapshot, the map is cleared and superglobals are re-seeded.
    pub fn reset_vars(&mut self) {
        self.global_vars = std::mem::take(&mut self.vars);
        self.pending_vars = FxHashSet::default();
        self.preload_super_globals();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn super_globals_preloaded() {
        let scope = Scope::new(FileId(0));
        assert!(scope.var_defined("_GET"));
        assert!(scope.var_defined("_SESSION"));
        assert!(!scope.var_defined("x"));
    }

    #[test]
    fn add_var_unions_and_absorbs() {
        let mut scope = Scope::new(FileId(0));
        scope.add_var("x", TypeSet::of(Ty::named("int")));
        scope.add_var("x", TypeSet::of(Ty::named("string")));
        assert_eq!(scope.vars["x"].len(), 2);

        scope.add_var("y", TypeSet::unknown());
        scope.add_var("y", TypeSet::of(Ty::named("int")));
        assert!(scope.vars["y"].is_unknown());
    }

    #[test]
    fn reset_vars_snapshots_globals() {
        let mut scope = Scope::new(FileId(0));
        scope.add_var("top", TypeSet::of(Ty::named("int")));
        scope.reset_vars();
        assert!(!scope.var_defined("top"));
        assert!(scope.global_vars.contains_key("top"));
        assert!(scope.var_defined("_GET"));
    }
}

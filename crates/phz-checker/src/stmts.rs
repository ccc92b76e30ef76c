//! Statement validation.
//!
//! Walks every statement of a file, threading the scope value, delegating
//! expressions to the typer and entering nested scopes (namespace blocks,
//! classes, functions, methods, closures) with clone-on-enter semantics.

use std::rc::Rc;

use phz_parser::{
    ArrowFnExpr, CatchClause, ClassMember, ClosureExpr, Expr, FunctionDecl, Stmt,
};
use phz_reflect::{modifier, ClassId, FileId, FunctionSig};
use phz_types::{set_subtype, set_to_string, type_to_string, Ty, TypeSet};

use crate::context::{Checker, Scope};
use crate::loader::{apply_use_to_aliases, qualified_name};

impl Checker {
    /// Validate every loaded file not excluded from validation.
    pub fn validate_all(&mut self) {
        let ids: Vec<FileId> = self.registry.files().map(|(id, _)| id).collect();
        for id in ids {
            if !self.skip_validation.contains(&id) {
                self.validate_file(id);
            }
        }
    }

    pub fn validate_file(&mut self, file: FileId) {
        // The walk needs `&mut self`; park the statements while it runs.
        let stmts = std::mem::take(&mut self.registry.file_mut(file).stmts);
        let mut scope = Scope::new(file);
        for stmt in &stmts {
            self.check_stmt(&mut scope, stmt);
        }
        self.registry.file_mut(file).stmts = stmts;
    }

    pub fn check_stmt(&mut self, scope: &mut Scope, stmt: &Stmt) {
        match stmt {
            Stmt::Expr(expr) => {
                self.check_expr(scope, expr);
            }
            Stmt::Echo { values, .. } => {
                for value in values {
                    self.check_expr(scope, value);
                }
            }
            Stmt::Return { value, line } => self.check_return(scope, value.as_ref(), *line),
            Stmt::If {
                cond,
                then,
                elseifs,
                else_body,
                ..
            } => {
                self.check_expr(scope, cond);
                self.check_body(scope, then);
                for elseif in elseifs {
                    self.check_expr(scope, &elseif.cond);
                    self.check_body(scope, &elseif.body);
                }
                if let Some(body) = else_body {
                    self.check_body(scope, body);
                }
            }
            Stmt::While { cond, body, .. } => {
                self.check_expr(scope, cond);
                self.check_body(scope, body);
            }
            Stmt::DoWhile { body, cond, .. } => {
                self.check_body(scope, body);
                self.check_expr(scope, cond);
            }
            Stmt::For {
                init,
                cond,
                step,
                body,
                ..
            } => {
                for expr in init {
                    self.check_expr(scope, expr);
                }
                for expr in cond {
                    self.check_expr(scope, expr);
                }
                self.check_body(scope, body);
                for expr in step {
                    self.check_expr(scope, expr);
                }
            }
            Stmt::Foreach(foreach) => {
                self.check_expr(scope, &foreach.subject);
                if let Some(key) = &foreach.key {
                    self.assign_to(scope, key, &TypeSet::unknown(), key.line());
                }
                self.assign_to(scope, &foreach.value, &TypeSet::unknown(), foreach.value.line());
                self.check_body(scope, &foreach.body);
            }
            Stmt::Switch { subject, cases, .. } => {
                self.check_expr(scope, subject);
                for case in cases {
                    if let Some(test) = &case.test {
                        self.check_expr(scope, test);
                    }
                    self.check_body(scope, &case.body);
                }
            }
            Stmt::Break { .. } | Stmt::Continue { .. } | Stmt::Nop => {}
            Stmt::Try {
                body,
                catches,
                finally,
                ..
            } => {
                self.check_body(scope, body);
                for catch in catches {
                    self.check_catch(scope, catch);
                }
                if let Some(body) = finally {
                    self.check_body(scope, body);
                }
            }
            Stmt::Global { names, .. } => {
                for name in names {
                    let types = scope
                        .global_vars
                        .get(name)
                        .cloned()
                        .unwrap_or_else(TypeSet::unknown);
                    scope.add_var(name, types);
                }
            }
            Stmt::StaticVars { vars, .. } => {
                for (name, default) in vars {
                    let types = match default {
                        Some(default) => self.check_expr(scope, default),
                        None => TypeSet::unknown(),
                    };
                    let types = if types.is_empty() {
                        TypeSet::unknown()
                    } else {
                        types
                    };
                    scope.add_var(name, types);
                }
            }
            // Unset probes names the way isset does; its targets are exempt.
            Stmt::Unset { .. } => {}
            Stmt::Namespace { name, body, .. } => {
                let namespace = name.as_ref().map(|n| n.joined()).unwrap_or_default();
                match body {
                    Some(body) => {
                        let mut child = scope.clone();
                        child.namespace = namespace;
                        child.aliases = Default::default();
                        for stmt in body {
                            self.check_stmt(&mut child, stmt);
                        }
                    }
                    None => {
                        scope.namespace = namespace;
                        scope.aliases = Default::default();
                    }
                }
            }
            Stmt::Use { kind, items, .. } => {
                apply_use_to_aliases(&mut scope.aliases, *kind, items);
            }
            Stmt::Const { entries, .. } => {
                for entry in entries {
                    self.check_expr(scope, &entry.value);
                }
            }
            Stmt::Function(decl) => self.check_function_decl(scope, decl),
            Stmt::Class(decl) => self.check_class_decl(scope, decl),
            Stmt::Block(stmts) => {
                for stmt in stmts {
                    self.check_stmt(scope, stmt);
                }
            }
        }
    }

    fn check_body(&mut self, scope: &mut Scope, stmts: &[Stmt]) {
        for stmt in stmts {
            self.check_stmt(scope, stmt);
        }
    }

    fn check_return(&mut self, scope: &mut Scope, value: Option<&Expr>, line: u32) {
        let types = match value {
            Some(value) => self.check_expr(scope, value),
            None => TypeSet::of(Ty::named("void")),
        };
        let Some(sig) = scope.current_function.clone() else {
            // Top-level `return` is not type-checked.
            return;
        };
        scope.has_return = true;
        if sig.is_generator {
            return;
        }
        if let Some(hint) = &sig.return_type {
            let expected = TypeSet::of(hint.clone());
            if !set_subtype(&types, &expected, &self.registry) {
                let given = set_to_string(&types);
                let hint_str = type_to_string(hint, false);
                self.error(
                    scope,
                    line,
                    format!(
                        "Returned type `{given}` is incompatible with the return type hint \
                         `{hint_str}`"
                    ),
                );
            }
        }
    }

    fn check_catch(&mut self, scope: &mut Scope, catch: &CatchClause) {
        let mut caught = TypeSet::new();
        for name in &catch.types {
            let Some(fqn) = self.fq_class_name(scope, name, true) else {
                continue;
            };
            match self.registry.get_class(&fqn) {
                Some(id) => {
                    let display = self.registry.class(id).name.clone();
                    caught.push(Ty::named(display));
                }
                None => {
                    self.error(scope, name.line, format!("Undefined class `{fqn}`"));
                }
            }
        }
        if let Some(var) = &catch.var {
            let types = if caught.is_empty() {
                TypeSet::unknown()
            } else {
                caught
            };
            scope.add_var(var, types);
        }
        self.check_body(scope, &catch.body);
    }

    // ------------------------------------------------------------------
    // Callable bodies
    // ------------------------------------------------------------------

    fn check_function_decl(&mut self, scope: &mut Scope, decl: &Rc<FunctionDecl>) {
        let qualified = qualified_name(&scope.namespace, &decl.name);
        let sig = match self
            .registry
            .get_function(&qualified)
            .and_then(|id| self.registry.function(id).sig.clone())
        {
            Some(sig) => sig,
            // Conditionally declared function the loader never saw.
            None => self.build_signature(
                scope,
                &qualified,
                &decl.params,
                decl.return_type.as_ref(),
                decl.body.is_some(),
                decl.has_yield,
                modifier::PUBLIC,
                None,
                decl.line,
            ),
        };
        if let Some(body) = &decl.body {
            let desc = format!("Function `{qualified}`");
            self.check_callable_body(scope, &sig, body, false, &desc);
        }
    }

    fn check_class_decl(&mut self, scope: &mut Scope, decl: &Rc<phz_parser::ClassDecl>) {
        let qualified = qualified_name(&scope.namespace, &decl.name);
        let Some(id) = self.registry.get_class(&qualified) else {
            return;
        };
        let (same_decl, poisoned, display) = {
            let info = self.registry.class(id);
            (
                info.decl()
                    .map(|registered| Rc::ptr_eq(registered, decl))
                    .unwrap_or(false),
                info.poisoned,
                info.name.clone(),
            )
        };
        // A duplicate declaration (the registered one wins) is not analyzed.
        if !same_decl || poisoned {
            return;
        }
        let mut class_scope = scope.clone();
        class_scope.current_class = Some(id);
        for member in &decl.members {
            let ClassMember::Method(method) = member else {
                continue;
            };
            let Some(body) = &method.body else {
                continue;
            };
            let sig = match self.method_sig(id, &method.name) {
                Some(sig) => sig,
                None => self.build_signature(
                    &class_scope,
                    &format!("{display}::{}", method.name),
                    &method.params,
                    method.return_type.as_ref(),
                    true,
                    method.has_yield,
                    modifier::PUBLIC,
                    Some(id),
                    method.line,
                ),
            };
            let bind_this = !sig.is_static();
            let desc = format!("Method `{display}::{}`", method.name);
            self.check_callable_body(&class_scope, &sig, body, bind_this, &desc);
        }
    }

    fn method_sig(&self, id: ClassId, name: &str) -> Option<Rc<FunctionSig>> {
        self.registry.class(id).method(name).cloned()
    }

    /// Enter a function/method body: fresh variable table, parameters bound,
    /// `$this` seeded for instance methods, pre-scan installed, and the
    /// missing-return check after the walk.
    fn check_callable_body(
        &mut self,
        scope: &Scope,
        sig: &Rc<FunctionSig>,
        body: &[Stmt],
        bind_this: bool,
        desc: &str,
    ) {
        let mut child = scope.clone();
        child.reset_vars();
        child.current_function = Some(sig.clone());
        child.has_return = false;
        child.in_assignment = false;
        self.bind_params(&mut child, sig);
        if bind_this {
            if let Some(class_id) = child.current_class {
                let display = self.registry.class(class_id).name.clone();
                child
                    .vars
                    .insert("this".to_string(), TypeSet::of(Ty::named(display)));
            }
        }
        child.pending_vars = self.prescan(&child, body);
        for stmt in body {
            self.check_stmt(&mut child, stmt);
        }
        if sig.is_return_required && !child.has_return {
            self.error(
                scope,
                sig.line,
                format!("{desc} has a non-void return type hint but does not return a value"),
            );
        }
    }

    fn bind_params(&self, child: &mut Scope, sig: &FunctionSig) {
        for param in &sig.parameters {
            let types = if param.variadic {
                TypeSet::of(Ty::named("array"))
            } else {
                param
                    .ty
                    .clone()
                    .map(TypeSet::of)
                    .unwrap_or_else(TypeSet::unknown)
            };
            child.vars.insert(param.name.clone(), types);
        }
    }

    /// Closures: captured `use` bindings read the parent scope (by value) or
    /// create a fresh variable in both scopes (by reference).
    pub(crate) fn check_closure(&mut self, scope: &mut Scope, closure: &ClosureExpr) {
        let sig = self.build_signature(
            scope,
            "{closure}",
            &closure.params,
            closure.return_type.as_ref(),
            true,
            closure.has_yield,
            modifier::PUBLIC,
            scope.current_class,
            closure.line,
        );
        let mut child = scope.clone();
        child.reset_vars();
        child.current_function = Some(sig.clone());
        child.has_return = false;
        child.in_assignment = false;
        self.bind_params(&mut child, &sig);
        for use_binding in &closure.uses {
            if use_binding.by_ref {
                child
                    .vars
                    .insert(use_binding.name.clone(), TypeSet::unknown());
                scope.add_var(&use_binding.name, TypeSet::unknown());
            } else if let Some(types) = scope.vars.get(&use_binding.name) {
                child.vars.insert(use_binding.name.clone(), types.clone());
            } else if scope.pending_vars.contains(&use_binding.name) {
                child
                    .vars
                    .insert(use_binding.name.clone(), TypeSet::unknown());
            } else {
                self.error(
                    scope,
                    use_binding.line,
                    format!("Undefined variable `${}`", use_binding.name),
                );
                child
                    .vars
                    .insert(use_binding.name.clone(), TypeSet::unknown());
            }
        }
        if !closure.is_static {
            if let Some(this_types) = scope.vars.get("this").cloned() {
                child.vars.insert("this".to_string(), this_types);
            }
        }
        child.pending_vars = self.prescan(&child, &closure.body);
        for stmt in &closure.body {
            self.check_stmt(&mut child, stmt);
        }
        if sig.is_return_required && !child.has_return {
            self.error(
                scope,
                closure.line,
                "Closure has a non-void return type hint but does not return a value",
            );
        }
    }

    /// Arrow functions capture the enclosing scope implicitly; the body is a
    /// single expression, so the return requirement is trivially met.
    pub(crate) fn check_arrow_fn(&mut self, scope: &mut Scope, arrow: &ArrowFnExpr) {
        let sig = self.build_signature(
            scope,
            "{closure}",
            &arrow.params,
            arrow.return_type.as_ref(),
            true,
            false,
            modifier::PUBLIC,
            scope.current_class,
            arrow.line,
        );
        let mut child = scope.clone();
        child.current_function = Some(sig.clone());
        child.in_assignment = false;
        self.bind_params(&mut child, &sig);
        let body_types = self.check_expr(&mut child, &arrow.body);
        if let Some(hint) = &sig.return_type {
            let expected = TypeSet::of(hint.clone());
            if !set_subtype(&body_types, &expected, &self.registry) {
                let given = set_to_string(&body_types);
                let hint_str = type_to_string(hint, false);
                self.error(
                    scope,
                    arrow.line,
                    format!(
                        "Returned type `{given}` is incompatible with the return type hint \
                         `{hint_str}`"
                    ),
                );
            }
        }
    }
}

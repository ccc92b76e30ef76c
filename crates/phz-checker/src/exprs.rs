//! Expression typing and validation.
//!
//! `check_expr` walks an expression, reports defects at the leaves and
//! returns the set of statically possible types. An empty set means "known
//! invalid" (an error was just reported there); `{Unknown}` means the
//! analysis cannot tell, which downstream checks treat optimistically.

use phz_parser::{
    BinaryOp, Callee, CastKind, ClassKind, ClassRef, Expr, MagicConst, MemberName, UnaryOp,
};
use phz_reflect::ClassId;
use phz_types::{is_primitive, set_subtype, set_to_string, ty_eq, Ty, TypeSet};

use crate::context::{Checker, Scope};

/// Primitive type of a literal expression, if it is one.
pub fn literal_type(expr: &Expr) -> Option<Ty> {
    match expr {
        Expr::Int { .. } => Some(Ty::named("int")),
        Expr::Float { .. } => Some(Ty::named("float")),
        Expr::Str { .. } => Some(Ty::named("string")),
        Expr::ArrayLit { .. } | Expr::List { .. } => Some(Ty::named("array")),
        Expr::ConstFetch { name, .. } if name.is_simple() => {
            let lower = name.first().to_ascii_lowercase();
            match lower.as_str() {
                "true" | "false" | "null" => Some(Ty::named(lower)),
                _ => None,
            }
        }
        Expr::Unary {
            op: UnaryOp::Neg | UnaryOp::Plus,
            expr,
            ..
        } => match literal_type(expr) {
            Some(ty) if ty.is_named("int") || ty.is_named("float") => Some(ty),
            _ => None,
        },
        Expr::MagicConst { kind, .. } => Some(match kind {
            MagicConst::Line => Ty::named("int"),
            _ => Ty::named("string"),
        }),
        _ => None,
    }
}

/// How a class-position reference resolved.
enum ClassTarget {
    Named { fqn: String, id: Option<ClassId> },
    Dynamic,
}

impl Checker {
    pub fn check_expr(&mut self, scope: &mut Scope, expr: &Expr) -> TypeSet {
        match expr {
            Expr::Int { .. }
            | Expr::Float { .. }
            | Expr::Str { .. }
            | Expr::ArrayLit { .. }
            | Expr::List { .. }
            | Expr::MagicConst { .. } => {
                if let Expr::ArrayLit { items, .. } = expr {
                    let saved = scope.in_assignment;
                    scope.in_assignment = false;
                    for item in items {
                        if let Some(key) = &item.key {
                            self.check_expr(scope, key);
                        }
                        self.check_expr(scope, &item.value);
                    }
                    scope.in_assignment = saved;
                }
                literal_type(expr)
                    .map(TypeSet::of)
                    .unwrap_or_else(TypeSet::unknown)
            }
            Expr::Var { name, line } => {
                if let Some(types) = scope.vars.get(name) {
                    return types.clone();
                }
                if scope.pending_vars.contains(name) {
                    return TypeSet::unknown();
                }
                self.error(scope, *line, format!("Undefined variable `${name}`"));
                TypeSet::new()
            }
            Expr::VarVar { expr, .. } => {
                let saved = scope.in_assignment;
                scope.in_assignment = false;
                self.check_expr(scope, expr);
                scope.in_assignment = saved;
                TypeSet::unknown()
            }
            Expr::ConstFetch { name, line } => self.check_const_fetch(scope, name, *line),
            Expr::ClassConst {
                class,
                constant,
                line,
            } => self.check_class_const(scope, class, constant, *line),
            Expr::StaticProp { class, prop, line } => {
                self.check_static_prop(scope, class, prop, *line)
            }
            Expr::Prop {
                object,
                name,
                nullsafe: _,
                line,
            } => self.check_prop_fetch(scope, object, name, *line),
            Expr::Index { base, index, .. } => {
                let saved = scope.in_assignment;
                scope.in_assignment = false;
                let base_types = self.check_expr(scope, base);
                if let Some(index) = index {
                    self.check_expr(scope, index);
                }
                scope.in_assignment = saved;
                if !base_types.is_empty()
                    && !base_types.is_unknown()
                    && base_types.iter().all(|ty| ty.is_named("string"))
                {
                    TypeSet::of(Ty::named("string"))
                } else {
                    TypeSet::unknown()
                }
            }
            Expr::Call {
                callee,
                args,
                first_class,
                line,
            } => self.check_call(scope, callee, args, *first_class, *line),
            Expr::MethodCall {
                object,
                name,
                args,
                first_class,
                ..
            } => self.check_method_call(scope, object, name, args, *first_class),
            Expr::StaticCall {
                class,
                name,
                args,
                first_class,
                line,
            } => self.check_static_call(scope, class, name, args, *first_class, *line),
            Expr::New { class, args, line } => self.check_new(scope, class, args, *line),
            Expr::Assign {
                target,
                value,
                by_ref: _,
                line,
            } => {
                let value_types = self.check_expr(scope, value);
                self.assign_to(scope, target, &value_types, *line);
                value_types
            }
            Expr::AssignOp { target, value, .. } => {
                self.check_expr(scope, value);
                self.check_expr(scope, target);
                if let Expr::Var { name, .. } = target.as_ref() {
                    scope.add_var(name, TypeSet::unknown());
                }
                TypeSet::unknown()
            }
            Expr::Binary { op, lhs, rhs, line } => self.check_binary(scope, *op, lhs, rhs, *line),
            Expr::Unary { op, expr, .. } => {
                let inner = self.check_expr(scope, expr);
                match op {
                    UnaryOp::Not => TypeSet::of(Ty::named("bool")),
                    UnaryOp::BitNot => TypeSet::of(Ty::named("int")),
                    UnaryOp::Neg | UnaryOp::Plus => {
                        if inner.iter().all(|ty| ty.is_named("int")) && !inner.is_empty() {
                            TypeSet::of(Ty::named("int"))
                        } else if inner.iter().all(|ty| ty.is_named("float")) && !inner.is_empty()
                        {
                            TypeSet::of(Ty::named("float"))
                        } else {
                            TypeSet::unknown()
                        }
                    }
                    UnaryOp::PreInc | UnaryOp::PreDec | UnaryOp::PostInc | UnaryOp::PostDec => {
                        if let Expr::Var { name, .. } = expr.as_ref() {
                            scope.add_var(name, TypeSet::unknown());
                        }
                        inner
                    }
                    UnaryOp::Suppress => inner,
                }
            }
            Expr::Ternary {
                cond, then, else_, ..
            } => {
                let cond_types = self.check_expr(scope, cond);
                let mut out = match then {
                    Some(then) => self.check_expr(scope, then),
                    None => cond_types,
                };
                let else_types = self.check_expr(scope, else_);
                out.merge(&else_types);
                out
            }
            Expr::Closure(closure) => {
                self.check_closure(scope, closure);
                TypeSet::of(Ty::named("Closure"))
            }
            Expr::ArrowFn(arrow) => {
                self.check_arrow_fn(scope, arrow);
                TypeSet::of(Ty::named("Closure"))
            }
            Expr::Instanceof { expr, class, line } => {
                self.check_instanceof(scope, expr, class, *line)
            }
            Expr::Cast { to, expr, .. } => {
                self.check_expr(scope, expr);
                let name = match to {
                    CastKind::Int => "int",
                    CastKind::Float => "float",
                    CastKind::String => "string",
                    CastKind::Bool => "bool",
                    CastKind::Array => "array",
                    CastKind::Object => "object",
                };
                TypeSet::of(Ty::named(name))
            }
            // `isset`/`empty` exist to probe undefined names; their operands
            // are exempt from undefined reporting.
            Expr::Isset { .. } | Expr::EmptyCheck { .. } => TypeSet::of(Ty::named("bool")),
            Expr::Print { expr, .. } => {
                self.check_expr(scope, expr);
                TypeSet::of(Ty::named("int"))
            }
            Expr::Clone { expr, .. } => self.check_expr(scope, expr),
            Expr::Throw { expr, .. } => {
                self.check_expr(scope, expr);
                TypeSet::of(Ty::named("never"))
            }
            Expr::Yield { value, .. } => {
                if let Some(value) = value {
                    self.check_expr(scope, value);
                }
                TypeSet::unknown()
            }
            Expr::Include { path, .. } => {
                self.check_expr(scope, path);
                TypeSet::unknown()
            }
            Expr::Exit { value, .. } => {
                if let Some(value) = value {
                    self.check_expr(scope, value);
                }
                TypeSet::of(Ty::named("never"))
            }
        }
    }

    // ------------------------------------------------------------------
    // Name-based fetches
    // ------------------------------------------------------------------

    fn check_const_fetch(&mut self, scope: &Scope, name: &phz_parser::Name, line: u32) -> TypeSet {
        if name.is_simple() {
            let lower = name.first().to_ascii_lowercase();
            if matches!(lower.as_str(), "true" | "false" | "null") {
                return TypeSet::of(Ty::named(lower));
            }
        }
        let def = self
            .registry
            .resolve_const_ref(name, &scope.namespace, &scope.aliases)
            .cloned();
        match def {
            Some(def) => {
                if let Some(ty) = def.ty {
                    TypeSet::of(ty)
                } else if let Some(value) = &def.value {
                    literal_type(value)
                        .map(TypeSet::of)
                        .unwrap_or_else(TypeSet::unknown)
                } else {
                    TypeSet::unknown()
                }
            }
            None => {
                self.error(
                    scope,
                    line,
                    format!("Undefined constant `{}`", name.joined()),
                );
                TypeSet::unknown()
            }
        }
    }

    fn resolve_class_target(
        &mut self,
        scope: &mut Scope,
        class: &ClassRef,
        report: bool,
    ) -> ClassTarget {
        match class {
            ClassRef::Name(name) => match self.fq_class_name(scope, name, report) {
                Some(fqn) => {
                    let id = self.registry.get_class(&fqn);
                    ClassTarget::Named { fqn, id }
                }
                None => ClassTarget::Dynamic,
            },
            ClassRef::Expr(expr) => {
                let saved = scope.in_assignment;
                scope.in_assignment = false;
                let types = self.check_expr(scope, expr);
                scope.in_assignment = saved;
                for ty in types.iter() {
                    if let Ty::Named { name, .. } = ty {
                        if !is_primitive(name) {
                            let id = self.registry.get_class(name);
                            return ClassTarget::Named {
                                fqn: name.clone(),
                                id,
                            };
                        }
                    }
                }
                ClassTarget::Dynamic
            }
        }
    }

    fn check_class_const(
        &mut self,
        scope: &mut Scope,
        class: &ClassRef,
        constant: &str,
        line: u32,
    ) -> TypeSet {
        if constant == "class" {
            if let ClassRef::Name(name) = class {
                self.fq_class_name(scope, name, true);
            }
            return TypeSet::of(Ty::named("string"));
        }
        match self.resolve_class_target(scope, class, true) {
            ClassTarget::Named { fqn, id: Some(id) } => {
                let info = self.registry.class(id);
                match info.constants.get(constant) {
                    Some(const_info) => const_info
                        .ty
                        .clone()
                        .map(TypeSet::of)
                        .unwrap_or_else(TypeSet::unknown),
                    None => {
                        self.error(
                            scope,
                            line,
                            format!("Undefined class constant `{fqn}::{constant}`"),
                        );
                        TypeSet::unknown()
                    }
                }
            }
            ClassTarget::Named { fqn, id: None } => {
                self.error(scope, line, format!("Undefined class `{fqn}`"));
                TypeSet::unknown()
            }
            ClassTarget::Dynamic => TypeSet::unknown(),
        }
    }

    fn check_static_prop(
        &mut self,
        scope: &mut Scope,
        class: &ClassRef,
        prop: &Expr,
        line: u32,
    ) -> TypeSet {
        let prop_name = match prop {
            Expr::Var { name, .. } => name.clone(),
            other => {
                let saved = scope.in_assignment;
                scope.in_assignment = false;
                self.check_expr(scope, other);
                scope.in_assignment = saved;
                return TypeSet::unknown();
            }
        };
        match self.resolve_class_target(scope, class, true) {
            ClassTarget::Named { fqn, id: Some(id) } => {
                let found = self.registry.class(id).properties.get(&prop_name).cloned();
                match found {
                    Some(info) => {
                        if !info.is_static() {
                            self.error(
                                scope,
                                line,
                                format!("Property `{fqn}::${prop_name}` is not static"),
                            );
                        }
                        info.ty.map(TypeSet::of).unwrap_or_else(TypeSet::unknown)
                    }
                    None => {
                        self.error(
                            scope,
                            line,
                            format!("Undefined static property `{fqn}::${prop_name}`"),
                        );
                        TypeSet::unknown()
                    }
                }
            }
            ClassTarget::Named { fqn, id: None } => {
                self.error(scope, line, format!("Undefined class `{fqn}`"));
                TypeSet::unknown()
            }
            ClassTarget::Dynamic => TypeSet::unknown(),
        }
    }

    fn check_prop_fetch(
        &mut self,
        scope: &mut Scope,
        object: &Expr,
        name: &MemberName,
        line: u32,
    ) -> TypeSet {
        let in_assignment = scope.in_assignment;
        scope.in_assignment = false;
        let object_types = self.check_expr(scope, object);
        let prop_name = match name {
            MemberName::Name(name) => name.clone(),
            MemberName::Expr(expr) => {
                self.check_expr(scope, expr);
                scope.in_assignment = in_assignment;
                return TypeSet::unknown();
            }
        };
        scope.in_assignment = in_assignment;

        if object_types.is_empty() || object_types.is_unknown() {
            return TypeSet::unknown();
        }
        // A receiver that may be anything object-shaped suppresses property
        // checking entirely.
        let opaque = object_types.iter().any(|ty| match ty {
            Ty::Named { name, .. } => {
                name.eq_ignore_ascii_case("mixed")
                    || name.eq_ignore_ascii_case("object")
                    || name.eq_ignore_ascii_case("stdClass")
            }
            _ => false,
        });
        if opaque {
            return TypeSet::unknown();
        }
        let mut out = TypeSet::new();
        let mut give_unknown = false;
        for ty in object_types.clone().iter() {
            let Ty::Named { name: class_name, .. } = ty else {
                give_unknown = true;
                continue;
            };
            if class_name.eq_ignore_ascii_case("null") {
                continue;
            }
            if is_primitive(class_name) || class_name.eq_ignore_ascii_case("stdClass") {
                give_unknown = true;
                continue;
            }
            let Some(id) = self.registry.get_class(class_name) else {
                give_unknown = true;
                continue;
            };
            let info = self.registry.class(id);
            let magic = if in_assignment { "__set" } else { "__get" };
            let has_magic = info.method(magic).is_some();
            let display = info.name.clone();
            let found = info.properties.get(&prop_name).cloned();
            match found {
                Some(prop) => {
                    if prop.is_static() {
                        self.error(
                            scope,
                            line,
                            format!(
                                "Static property `{display}::${prop_name}` cannot be accessed \
                                 non-statically"
                            ),
                        );
                    }
                    match prop.ty {
                        Some(ty) => out.push(ty),
                        None => give_unknown = true,
                    }
                }
                None if has_magic => give_unknown = true,
                None if in_assignment => {
                    // Dynamic property creation on write.
                    give_unknown = true;
                }
                None => {
                    self.error(
                        scope,
                        line,
                        format!("Undefined property `{display}::${prop_name}`"),
                    );
                }
            }
        }
        if out.is_empty() || give_unknown {
            return TypeSet::unknown();
        }
        out
    }

    // ------------------------------------------------------------------
    // Calls
    // ------------------------------------------------------------------

    fn check_call(
        &mut self,
        scope: &mut Scope,
        callee: &Callee,
        args: &[phz_parser::Arg],
        first_class: bool,
        line: u32,
    ) -> TypeSet {
        match callee {
            Callee::Name(name) => {
                let resolved =
                    self.registry
                        .resolve_function_ref(name, &scope.namespace, &scope.aliases);
                let desc = format!("function `{}`", name.joined());
                match resolved {
                    Some(id) => {
                        let sig = self.registry.function(id).sig.clone();
                        if first_class {
                            return TypeSet::of(Ty::named("Closure"));
                        }
                        self.check_args(scope, sig.as_deref(), args, &desc, line);
                        sig.and_then(|s| s.return_type.clone())
                            .map(TypeSet::of)
                            .unwrap_or_else(TypeSet::unknown)
                    }
                    None => {
                        self.error(scope, line, format!("Undefined function `{}`", name.joined()));
                        if !first_class {
                            self.check_args(scope, None, args, &desc, line);
                        }
                        TypeSet::unknown()
                    }
                }
            }
            Callee::Expr(expr) => {
                let saved = scope.in_assignment;
                scope.in_assignment = false;
                self.check_expr(scope, expr);
                scope.in_assignment = saved;
                if first_class {
                    return TypeSet::of(Ty::named("Closure"));
                }
                self.check_args(scope, None, args, "the callable", line);
                TypeSet::unknown()
            }
        }
    }

    fn check_method_call(
        &mut self,
        scope: &mut Scope,
        object: &Expr,
        name: &MemberName,
        args: &[phz_parser::Arg],
        first_class: bool,
    ) -> TypeSet {
        let saved = scope.in_assignment;
        scope.in_assignment = false;
        let object_types = self.check_expr(scope, object);
        scope.in_assignment = saved;

        let method_name = match name {
            MemberName::Name(name) => name.clone(),
            MemberName::Expr(expr) => {
                self.check_expr(scope, expr);
                self.check_args(scope, None, args, "the callable", object.line());
                return TypeSet::unknown();
            }
        };
        if first_class {
            return TypeSet::of(Ty::named("Closure"));
        }
        if object_types.is_empty() || object_types.is_unknown() || object_types.contains_mixed() {
            self.check_args(scope, None, args, "the callable", object.line());
            return TypeSet::unknown();
        }

        let mut returns = TypeSet::new();
        let mut give_unknown = false;
        let mut args_checked = false;
        for ty in object_types.clone().iter() {
            let Ty::Named { name: class_name, .. } = ty else {
                give_unknown = true;
                continue;
            };
            if class_name.eq_ignore_ascii_case("null") {
                continue;
            }
            if is_primitive(class_name) {
                give_unknown = true;
                continue;
            }
            let Some(id) = self.registry.get_class(class_name) else {
                give_unknown = true;
                continue;
            };
            let info = self.registry.class(id);
            let display = info.name.clone();
            let has_call = info.method("__call").is_some();
            let sig = info.method(&method_name).cloned();
            match sig {
                Some(sig) => {
                    if !args_checked {
                        let desc = format!("method `{display}::{method_name}`");
                        self.check_args(scope, Some(sig.as_ref()), args, &desc, object.line());
                        args_checked = true;
                    }
                    match &sig.return_type {
                        Some(ty) => returns.push(ty.clone()),
                        None => give_unknown = true,
                    }
                }
                None if has_call => give_unknown = true,
                None => {
                    self.error(
                        scope,
                        object.line(),
                        format!("Call to undefined method `{display}::{method_name}`"),
                    );
                }
            }
        }
        if !args_checked {
            self.check_args(scope, None, args, "the callable", object.line());
        }
        if returns.is_empty() || give_unknown {
            return TypeSet::unknown();
        }
        returns
    }

    fn check_static_call(
        &mut self,
        scope: &mut Scope,
        class: &ClassRef,
        name: &MemberName,
        args: &[phz_parser::Arg],
        first_class: bool,
        line: u32,
    ) -> TypeSet {
        let method_name = match name {
            MemberName::Name(name) => name.clone(),
            MemberName::Expr(expr) => {
                self.check_expr(scope, expr);
                self.check_args(scope, None, args, "the callable", line);
                return TypeSet::unknown();
            }
        };
        let relative_keyword = match class {
            ClassRef::Name(name) if name.is_simple() => {
                let lower = name.first().to_ascii_lowercase();
                matches!(lower.as_str(), "self" | "parent" | "static")
            }
            _ => false,
        };
        match self.resolve_class_target(scope, class, true) {
            ClassTarget::Named { fqn: _, id: Some(id) } => {
                let info = self.registry.class(id);
                let display = info.name.clone();
                let has_call_static = info.method("__callstatic").is_some();
                let sig = info.method(&method_name).cloned();
                if first_class {
                    return TypeSet::of(Ty::named("Closure"));
                }
                match sig {
                    Some(sig) => {
                        if !sig.is_static() && !relative_keyword && !self.in_class_lineage(scope, id)
                        {
                            self.error(
                                scope,
                                line,
                                format!(
                                    "Cannot call non-static method `{display}::{method_name}` \
                                     statically"
                                ),
                            );
                        }
                        let desc = format!("method `{display}::{method_name}`");
                        self.check_args(scope, Some(sig.as_ref()), args, &desc, line);
                        sig.return_type
                            .clone()
                            .map(TypeSet::of)
                            .unwrap_or_else(TypeSet::unknown)
                    }
                    None if has_call_static => {
                        self.check_args(scope, None, args, "the callable", line);
                        TypeSet::unknown()
                    }
                    None => {
                        self.error(
                            scope,
                            line,
                            format!("Call to undefined method `{display}::{method_name}`"),
                        );
                        self.check_args(scope, None, args, "the callable", line);
                        TypeSet::unknown()
                    }
                }
            }
            ClassTarget::Named { fqn, id: None } => {
                self.error(scope, line, format!("Undefined class `{fqn}`"));
                self.check_args(scope, None, args, "the callable", line);
                TypeSet::unknown()
            }
            ClassTarget::Dynamic => {
                if first_class {
                    return TypeSet::of(Ty::named("Closure"));
                }
                self.check_args(scope, None, args, "the callable", line);
                TypeSet::unknown()
            }
        }
    }

    /// Is `id` the current class or one of its ancestors?
    fn in_class_lineage(&self, scope: &Scope, id: ClassId) -> bool {
        let Some(current) = scope.current_class else {
            return false;
        };
        if current == id {
            return true;
        }
        self.registry.ancestors(current).contains(&id)
    }

    fn check_new(
        &mut self,
        scope: &mut Scope,
        class: &ClassRef,
        args: &[phz_parser::Arg],
        line: u32,
    ) -> TypeSet {
        match self.resolve_class_target(scope, class, true) {
            ClassTarget::Named { fqn: _, id: Some(id) } => {
                let info = self.registry.class(id);
                let display = info.name.clone();
                let kind = info.kind;
                let is_abstract = info.is_abstract;
                let ctor = info.method("__construct").cloned();
                match kind {
                    ClassKind::Interface => {
                        self.error(
                            scope,
                            line,
                            format!("Cannot instantiate interface `{display}`"),
                        );
                    }
                    ClassKind::Trait => {
                        self.error(scope, line, format!("Cannot instantiate trait `{display}`"));
                    }
                    ClassKind::Enum => {
                        self.error(scope, line, format!("Cannot instantiate enum `{display}`"));
                    }
                    ClassKind::Class if is_abstract => {
                        self.error(
                            scope,
                            line,
                            format!("Cannot instantiate abstract class `{display}`"),
                        );
                    }
                    ClassKind::Class => {}
                }
                match ctor {
                    Some(sig) => {
                        let desc = format!("constructor of class `{display}`");
                        self.check_args(scope, Some(sig.as_ref()), args, &desc, line);
                    }
                    None => {
                        if !args.is_empty() {
                            self.error(
                                scope,
                                line,
                                format!(
                                    "Class `{display}` does not have a constructor, but \
                                     arguments were provided"
                                ),
                            );
                        }
                        self.check_args(scope, None, args, "the constructor", line);
                    }
                }
                TypeSet::of(Ty::named(display))
            }
            ClassTarget::Named { fqn, id: None } => {
                self.error(scope, line, format!("Undefined class `{fqn}`"));
                self.check_args(scope, None, args, "the constructor", line);
                TypeSet::unknown()
            }
            ClassTarget::Dynamic => {
                self.check_args(scope, None, args, "the constructor", line);
                TypeSet::unknown()
            }
        }
    }

    // ------------------------------------------------------------------
    // Assignment
    // ------------------------------------------------------------------

    pub(crate) fn assign_to(
        &mut self,
        scope: &mut Scope,
        target: &Expr,
        value_types: &TypeSet,
        line: u32,
    ) {
        match target {
            Expr::Var { name, .. } => {
                scope.add_var(name, value_types.clone());
            }
            Expr::ArrayLit { items, .. } => {
                // Destructuring: each component is defined with Unknown.
                for item in items {
                    self.assign_to(scope, &item.value, &TypeSet::unknown(), line);
                }
            }
            Expr::List { items, .. } => {
                for item in items.iter().flatten() {
                    self.assign_to(scope, &item.value, &TypeSet::unknown(), line);
                }
            }
            Expr::Prop { .. } | Expr::StaticProp { .. } => {
                let saved = scope.in_assignment;
                scope.in_assignment = true;
                let target_types = self.check_expr(scope, target);
                scope.in_assignment = saved;
                if !target_types.is_empty()
                    && !target_types.is_unknown()
                    && !set_subtype(value_types, &target_types, &self.registry)
                {
                    let given = set_to_string(value_types);
                    let declared = set_to_string(&target_types);
                    self.error(
                        scope,
                        line,
                        format!(
                            "Assigned type `{given}` is incompatible with the declared type \
                             `{declared}`"
                        ),
                    );
                }
            }
            Expr::Index { base, index, .. } => {
                if let Expr::Var { name, .. } = base.as_ref() {
                    // Writing an element brings the array itself to life.
                    if !scope.var_defined(name) {
                        scope.add_var(name, TypeSet::of(Ty::named("array")));
                    }
                } else {
                    let saved = scope.in_assignment;
                    scope.in_assignment = true;
                    self.check_expr(scope, base);
                    scope.in_assignment = saved;
                }
                if let Some(index) = index {
                    let saved = scope.in_assignment;
                    scope.in_assignment = false;
                    self.check_expr(scope, index);
                    scope.in_assignment = saved;
                }
            }
            Expr::VarVar { expr, .. } => {
                let saved = scope.in_assignment;
                scope.in_assignment = false;
                self.check_expr(scope, expr);
                scope.in_assignment = saved;
            }
            other => {
                self.error(scope, other.line(), "Cannot assign to this expression");
            }
        }
    }

    // ------------------------------------------------------------------
    // Operators
    // ------------------------------------------------------------------

    fn check_binary(
        &mut self,
        scope: &mut Scope,
        op: BinaryOp,
        lhs: &Expr,
        rhs: &Expr,
        line: u32,
    ) -> TypeSet {
        if matches!(op, BinaryOp::Identical | BinaryOp::NotIdentical) {
            return self.check_identity(scope, op, lhs, rhs, line);
        }
        let left = self.check_expr(scope, lhs);
        let right = self.check_expr(scope, rhs);
        match op {
            BinaryOp::BoolAnd | BinaryOp::BoolOr | BinaryOp::LogicalXor => {
                TypeSet::of(Ty::named("bool"))
            }
            BinaryOp::Equal
            | BinaryOp::NotEqual
            | BinaryOp::Less
            | BinaryOp::LessEqual
            | BinaryOp::Greater
            | BinaryOp::GreaterEqual => TypeSet::of(Ty::named("bool")),
            BinaryOp::Spaceship => TypeSet::of(Ty::named("int")),
            BinaryOp::Concat => TypeSet::of(Ty::named("string")),
            BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor | BinaryOp::Shl
            | BinaryOp::Shr => TypeSet::of(Ty::named("int")),
            BinaryOp::Coalesce => {
                let mut out = left;
                out.merge(&right);
                out
            }
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Mod | BinaryOp::Pow => {
                let all = |set: &TypeSet, name: &str| {
                    !set.is_empty() && !set.is_unknown() && set.iter().all(|ty| ty.is_named(name))
                };
                let numeric = |set: &TypeSet| {
                    !set.is_empty()
                        && !set.is_unknown()
                        && set
                            .iter()
                            .all(|ty| ty.is_named("int") || ty.is_named("float"))
                };
                if all(&left, "array") && all(&right, "array") && op == BinaryOp::Add {
                    TypeSet::of(Ty::named("array"))
                } else if all(&left, "int") && all(&right, "int") {
                    TypeSet::of(Ty::named("int"))
                } else if numeric(&left) && numeric(&right) {
                    TypeSet::of(Ty::named("float"))
                } else {
                    TypeSet::unknown()
                }
            }
            BinaryOp::Div => TypeSet::unknown(),
            BinaryOp::Identical | BinaryOp::NotIdentical => unreachable!(),
        }
    }

    /// `===`/`!==` with statically disjoint operand types is a tautology or
    /// contradiction.
    fn check_identity(
        &mut self,
        scope: &mut Scope,
        op: BinaryOp,
        lhs: &Expr,
        rhs: &Expr,
        line: u32,
    ) -> TypeSet {
        let left = self.check_expr(scope, lhs);
        let right = self.check_expr(scope, rhs);
        let undecidable = left.is_empty()
            || right.is_empty()
            || left.is_unknown()
            || right.is_unknown()
            || left.contains_mixed()
            || right.contains_mixed();
        if !undecidable {
            let left_flat = expand_for_identity(&left);
            let right_flat = expand_for_identity(&right);
            let disjoint = !left_flat
                .iter()
                .any(|a| right_flat.iter().any(|b| self.identity_overlap(a, b)));
            if disjoint {
                let verdict = if op == BinaryOp::Identical {
                    "never"
                } else {
                    "always"
                };
                let left_str = set_to_string(&left);
                let right_str = set_to_string(&right);
                self.error(
                    scope,
                    line,
                    format!(
                        "Condition is {verdict} fulfilled because of the type mismatch between \
                         `{left_str}` and `{right_str}`"
                    ),
                );
            }
        }
        TypeSet::of(Ty::named("bool"))
    }

    fn identity_overlap(&self, a: &Ty, b: &Ty) -> bool {
        match (a, b) {
            (Ty::Intersection(parts), other) | (other, Ty::Intersection(parts)) => parts
                .iter()
                .any(|part| self.identity_overlap(part, other)),
            (Ty::Named { name: n, .. }, Ty::Named { name: m, .. }) => {
                if n.eq_ignore_ascii_case(m) {
                    return true;
                }
                let wide = |name: &str| {
                    name.eq_ignore_ascii_case("iterable") || name.eq_ignore_ascii_case("callable")
                };
                if wide(n) || wide(m) {
                    return true;
                }
                let n_class = !is_primitive(n);
                let m_class = !is_primitive(m);
                if n_class && m.eq_ignore_ascii_case("object") {
                    return true;
                }
                if m_class && n.eq_ignore_ascii_case("object") {
                    return true;
                }
                if n_class && m_class {
                    use phz_types::ClassGraph;
                    return self.registry.is_subclass_of(n, m)
                        || self.registry.is_subclass_of(m, n);
                }
                false
            }
            _ => ty_eq(a, b),
        }
    }

    fn check_instanceof(
        &mut self,
        scope: &mut Scope,
        expr: &Expr,
        class: &ClassRef,
        _line: u32,
    ) -> TypeSet {
        self.check_expr(scope, expr);
        match class {
            ClassRef::Name(name) => {
                if let Some(fqn) = self.fq_class_name(scope, name, false) {
                    if let Some(id) = self.registry.get_class(&fqn) {
                        // Single-form narrowing: the variable now holds that
                        // class for the rest of the enclosing scope.
                        if let Expr::Var { name: var_name, .. } = expr {
                            let display = self.registry.class(id).name.clone();
                            scope
                                .vars
                                .insert(var_name.clone(), TypeSet::of(Ty::named(display)));
                        }
                    }
                }
            }
            ClassRef::Expr(class_expr) => {
                self.check_expr(scope, class_expr);
            }
        }
        TypeSet::of(Ty::named("bool"))
    }
}

/// Normalize a possible-types set for the disjointness test: `bool` expands
/// to `true`/`false`, nullable named types split off `null`, unions flatten.
fn expand_for_identity(set: &TypeSet) -> Vec<Ty> {
    let mut out = Vec::new();
    for ty in set.iter() {
        expand_ty(ty, &mut out);
    }
    out
}

fn expand_ty(ty: &Ty, out: &mut Vec<Ty>) {
    match ty {
        Ty::Named { name, nullable } => {
            if *nullable {
                out.push(Ty::named("null"));
            }
            if name.eq_ignore_ascii_case("bool") {
                out.push(Ty::named("true"));
                out.push(Ty::named("false"));
            } else {
                out.push(Ty::named(name.clone()));
            }
        }
        Ty::Union(parts) => {
            for part in parts {
                expand_ty(part, out);
            }
        }
        other => out.push(other.clone()),
    }
}

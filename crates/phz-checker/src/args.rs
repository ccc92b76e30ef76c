//! Call-site argument validation.
//!
//! Checks one argument list against a callable signature: positional and
//! named matching, arity, by-reference lvalue requirements and per-parameter
//! type compatibility. A spread argument (`...$args`) ends positional
//! checking for the call. `sig` may be absent (unknown callable); argument
//! expressions are still walked so their own defects surface.

use rustc_hash::FxHashSet;

use phz_parser::{Arg, Expr};
use phz_reflect::{FunctionSig, Parameter};
use phz_types::{set_subtype, set_to_string, type_to_string, TypeSet};

use crate::context::{Checker, Scope};

impl Checker {
    /// Validate `args` against `sig`. `callee_desc` reads like
    /// "function `strlen`" or "method `Foo::bar`".
    pub fn check_args(
        &mut self,
        scope: &mut Scope,
        sig: Option<&FunctionSig>,
        args: &[Arg],
        callee_desc: &str,
        line: u32,
    ) {
        let mut filled: FxHashSet<String> = FxHashSet::default();
        let mut positional = 0usize;
        let mut too_many_reported = false;
        let mut saw_spread = false;

        for arg in args {
            if arg.spread {
                // Unpacking disables further positional bookkeeping.
                saw_spread = true;
                self.check_expr(scope, &arg.value);
                continue;
            }
            let param: Option<Parameter> = match (&arg.name, sig) {
                (Some(label), Some(sig)) => {
                    let found = sig
                        .parameters
                        .iter()
                        .find(|p| p.name == *label)
                        .cloned();
                    if found.is_none() && !sig.is_variadic {
                        self.error(
                            scope,
                            arg.line,
                            format!("Unknown named argument `${label}` for {callee_desc}"),
                        );
                    }
                    if let Some(param) = &found {
                        filled.insert(param.name.clone());
                    }
                    found
                }
                (None, Some(sig)) => {
                    let index = positional;
                    positional += 1;
                    match sig.parameters.get(index) {
                        Some(param) => {
                            filled.insert(param.name.clone());
                            Some(param.clone())
                        }
                        None => {
                            let variadic = sig.parameters.last().filter(|p| p.variadic);
                            if variadic.is_none() && !too_many_reported && !saw_spread {
                                self.error(
                                    scope,
                                    arg.line,
                                    format!("Too many arguments provided to {callee_desc}"),
                                );
                                too_many_reported = true;
                            }
                            variadic.cloned()
                        }
                    }
                }
                _ => {
                    if arg.name.is_none() {
                        positional += 1;
                    }
                    None
                }
            };

            let arg_types = self.check_argument_value(scope, param.as_ref(), arg, callee_desc);

            if let Some(param) = &param {
                if let Some(param_ty) = &param.ty {
                    let expected = TypeSet::of(param_ty.clone());
                    if !set_subtype(&arg_types, &expected, &self.registry) {
                        let given = set_to_string(&arg_types);
                        let hint = type_to_string(param_ty, false);
                        self.error(
                            scope,
                            arg.line,
                            format!(
                                "Argument type `{given}` is incompatible with the type hint \
                                 `{hint}` of parameter `${}`",
                                param.name
                            ),
                        );
                    }
                }
            }
        }

        if saw_spread {
            return;
        }
        if let Some(sig) = sig {
            let missing = sig
                .parameters
                .iter()
                .any(|p| !p.optional && !p.variadic && !filled.contains(&p.name));
            if missing {
                self.error(
                    scope,
                    line,
                    format!("Too few arguments provided to {callee_desc}"),
                );
            }
        }
    }

    /// Type an argument value, honoring by-reference parameters: a
    /// by-reference variable argument is a write (possibly the defining
    /// one), and only lvalues may be passed at all.
    fn check_argument_value(
        &mut self,
        scope: &mut Scope,
        param: Option<&Parameter>,
        arg: &Arg,
        callee_desc: &str,
    ) -> TypeSet {
        let by_ref = param.map(|p| p.by_ref).unwrap_or(false);
        if !by_ref {
            return self.check_expr(scope, &arg.value);
        }
        match &arg.value {
            Expr::Var { name, .. } => {
                let seeded = param
                    .and_then(|p| p.ty.clone())
                    .map(TypeSet::of)
                    .unwrap_or_else(TypeSet::unknown);
                scope.add_var(name, seeded.clone());
                seeded
            }
            Expr::Prop { .. } | Expr::StaticProp { .. } | Expr::Index { .. } => {
                self.check_expr(scope, &arg.value)
            }
            other => {
                let param_name = param.map(|p| p.name.as_str()).unwrap_or("");
                self.error(
                    scope,
                    other.line(),
                    format!(
                        "Argument `${param_name}` of {callee_desc} is passed by reference and \
                         must be a variable"
                    ),
                );
                self.check_expr(scope, &arg.value)
            }
        }
    }
}

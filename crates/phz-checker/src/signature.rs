//! Callable signature construction.
//!
//! Turns a parameter list + return hint (function, method, closure or arrow
//! function) into a resolved `FunctionSig`, reporting declaration-site
//! defects. Must run with the scope aligned to the declaration's original
//! file/namespace/aliases so type names resolve as written.

use std::rc::Rc;

use phz_parser::{Expr, Param, TypeExpr, Visibility};
use phz_reflect::{modifier, ClassId, FunctionSig, Parameter};
use phz_types::{set_subtype, Ty, TypeSet};

use crate::context::{Checker, Scope};
use crate::exprs::literal_type;

pub fn visibility_bits(visibility: Option<Visibility>) -> u32 {
    match visibility {
        Some(Visibility::Public) | None => modifier::PUBLIC,
        Some(Visibility::Protected) => modifier::PROTECTED,
        Some(Visibility::Private) => modifier::PRIVATE,
    }
}

impl Checker {
    /// Build a signature for any callable shape.
    ///
    /// `in_interface` marks interface members, whose missing body does not
    /// make them abstract-with-body errors (the class resolver checks those
    /// separately).
    #[allow(clippy::too_many_arguments)]
    pub fn build_signature(
        &mut self,
        scope: &Scope,
        qualified_name: &str,
        params: &[Param],
        return_hint: Option<&TypeExpr>,
        has_body: bool,
        has_yield: bool,
        modifiers: u32,
        declaring_class: Option<ClassId>,
        line: u32,
    ) -> Rc<FunctionSig> {
        let mut parameters = Vec::with_capacity(params.len());
        let last = params.len().saturating_sub(1);
        for (index, param) in params.iter().enumerate() {
            let mut ty = param
                .hint
                .as_ref()
                .map(|hint| self.resolve_type(scope, hint, true));
            if param.variadic && param.default.is_some() {
                self.error(
                    scope,
                    param.line,
                    format!(
                        "Variadic parameter `${}` cannot have a default value",
                        param.name
                    ),
                );
            }
            if param.variadic && index != last {
                self.error(
                    scope,
                    param.line,
                    format!("Only the last parameter can be variadic, `${}` is not", param.name),
                );
            }
            if let Some(default) = &param.default {
                if is_null_literal(default) {
                    // A null default on a non-nullable hint makes the
                    // parameter implicitly nullable. Surfaced as-is rather
                    // than hidden, for compatibility with the language.
                    if let Some(declared) = ty.take() {
                        ty = Some(if accepts_null(&declared) {
                            declared
                        } else {
                            widen_with_null(declared)
                        });
                    }
                } else if let (Some(value_ty), Some(declared)) = (literal_type(default), &ty) {
                    if !set_subtype(
                        &TypeSet::of(value_ty.clone()),
                        &TypeSet::of(declared.clone()),
                        &self.registry,
                    ) {
                        let value_str = phz_types::type_to_string(&value_ty, false);
                        let declared_str = phz_types::type_to_string(declared, false);
                        self.error(
                            scope,
                            param.line,
                            format!(
                                "Default value type `{value_str}` is incompatible with the type \
                                 hint `{declared_str}` of parameter `${}`",
                                param.name
                            ),
                        );
                    }
                }
            }
            parameters.push(Parameter {
                name: param.name.clone(),
                ty,
                by_ref: param.by_ref,
                optional: param.default.is_some() || param.variadic,
                variadic: param.variadic,
                has_default: param.default.is_some(),
                default: param.default.clone(),
            });
        }

        let return_type = return_hint.map(|hint| self.resolve_type(scope, hint, true));
        let is_variadic = parameters.iter().any(|p| p.variadic);
        let is_abstract = modifiers & modifier::ABSTRACT != 0;
        let is_return_required = has_body
            && !is_abstract
            && !has_yield
            && matches!(
                &return_type,
                Some(ty) if !ty.is_named("void") && !ty.is_named("never")
            );

        Rc::new(FunctionSig {
            qualified_name: qualified_name.to_string(),
            parameters,
            return_type,
            is_variadic,
            is_generator: has_yield,
            is_abstract,
            modifiers,
            declaring_class,
            is_return_required,
            line,
        })
    }
}

fn is_null_literal(expr: &Expr) -> bool {
    matches!(
        expr,
        Expr::ConstFetch { name, .. }
            if name.is_simple() && name.first().eq_ignore_ascii_case("null")
    )
}

fn accepts_null(ty: &Ty) -> bool {
    match ty {
        Ty::Named { name, nullable } => {
            *nullable
                || name.eq_ignore_ascii_case("null")
                || name.eq_ignore_ascii_case("mixed")
        }
        Ty::Union(parts) => parts.iter().any(accepts_null),
        Ty::Intersection(_) => false,
        Ty::Unknown => true,
    }
}

fn widen_with_null(ty: Ty) -> Ty {
    Ty::union(vec![ty, Ty::named("null")])
}

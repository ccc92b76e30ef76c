//! The subtype relation.
//!
//! `subtype(a, b)` answers: is every runtime value of type `a` also
//! acceptable where type `b` is expected? The relation is optimistic —
//! `Unknown` and `mixed` are absorbing on both sides — which trades missed
//! errors for the absence of false positives.

use crate::{ClassGraph, Ty, TypeSet};

/// Composite subtype check over possible-type sets, each side read as an
/// anonymous union. An empty side means an error was already reported there;
/// the check passes to avoid cascades.
pub fn set_subtype(left: &TypeSet, right: &TypeSet, graph: &dyn ClassGraph) -> bool {
    if left.is_empty() || right.is_empty() {
        return true;
    }
    subtype(&left.to_ty(), &right.to_ty(), graph)
}

pub fn subtype(a: &Ty, b: &Ty, graph: &dyn ClassGraph) -> bool {
    // Optimism: an uninferred side accepts everything.
    if a.contains_unknown() || b.contains_unknown() {
        return true;
    }
    if a.contains_mixed() || b.contains_mixed() {
        return true;
    }
    match (a, b) {
        (Ty::Union(parts), _) => parts.iter().all(|x| subtype(x, b, graph)),
        (_, Ty::Union(parts)) => {
            // `bool` is the two-member union `true|false` for this purpose.
            if a.is_named("bool")
                && parts.iter().any(|p| p.is_named("true"))
                && parts.iter().any(|p| p.is_named("false"))
            {
                return true;
            }
            parts.iter().any(|y| subtype(a, y, graph))
        }
        (_, Ty::Intersection(parts)) => parts.iter().all(|y| subtype(a, y, graph)),
        (Ty::Intersection(parts), _) => parts.iter().any(|x| subtype(x, b, graph)),
        (
            Ty::Named {
                name: n,
                nullable: nul_a,
            },
            Ty::Named {
                name: m,
                nullable: nul_b,
            },
        ) => named_subtype(n, *nul_a, m, *nul_b, graph),
        _ => false,
    }
}

fn named_subtype(n: &str, nul_a: bool, m: &str, nul_b: bool, graph: &dyn ClassGraph) -> bool {
    if n.eq_ignore_ascii_case(m) {
        return true;
    }
    if n.eq_ignore_ascii_case("null") {
        return nul_b;
    }
    if nul_a && nul_b {
        return named_subtype(n, false, m, false, graph);
    }
    if nul_a && m.eq_ignore_ascii_case("null") {
        return true;
    }

    let n_lower = n.to_ascii_lowercase();
    let m_lower = m.to_ascii_lowercase();
    match (n_lower.as_str(), m_lower.as_str()) {
        // Widening
        ("int", "float") => true,
        // Boolean literal types
        ("true", "bool") | ("false", "bool") => true,
        // Callable conversions; closure<->callable is symmetric on purpose,
        // the checker cannot tell a Closure-typed value from a callable one.
        ("closure", "callable") | ("callable", "closure") | ("string", "callable") => true,
        // `object` and concrete class names, both directions
        (name, "object") if graph.is_class_like(name) => true,
        ("object", name) if graph.is_class_like(name) => true,
        // A string passes where a Stringable-implementing class is expected,
        // and a Stringable instance passes where a string is expected.
        ("string", target) if graph.is_class_like(target) && graph.has_stringable(m) => true,
        (source, "string") if graph.is_class_like(source) && graph.has_stringable(n) => true,
        (name, target) if graph.is_class_like(name) && graph.is_class_like(target) => {
            graph.is_subclass_of(n, m)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EmptyClassGraph;

    fn st(a: &Ty, b: &Ty) -> bool {
        subtype(a, b, &EmptyClassGraph)
    }

    #[test]
    fn reflexive_on_named() {
        for name in crate::PRIMITIVES {
            let ty = Ty::named(*name);
            assert!(st(&ty, &ty), "{name} not reflexive");
        }
    }

    #[test]
    fn int_widens_to_float_not_back() {
        assert!(st(&Ty::named("int"), &Ty::named("float")));
        assert!(!st(&Ty::named("float"), &Ty::named("int")));
    }

    #[test]
    fn null_accepted_by_nullable_only() {
        assert!(st(&Ty::named("null"), &Ty::nullable("int")));
        assert!(!st(&Ty::named("null"), &Ty::named("int")));
    }

    #[test]
    fn bool_vs_literal_booleans() {
        assert!(st(&Ty::named("true"), &Ty::named("bool")));
        assert!(st(&Ty::named("false"), &Ty::named("bool")));
        assert!(!st(&Ty::named("bool"), &Ty::named("true")));
        let both = Ty::Union(vec![Ty::named("true"), Ty::named("false")]);
        assert!(st(&Ty::named("bool"), &both));
    }

    #[test]
    fn union_quantifiers() {
        let int_or_string = Ty::Union(vec![Ty::named("int"), Ty::named("string")]);
        assert!(st(&Ty::named("int"), &int_or_string));
        assert!(!st(&int_or_string, &Ty::named("int")));
        assert!(st(&int_or_string, &int_or_string));
    }

    #[test]
    fn unknown_is_absorbing() {
        assert!(st(&Ty::Unknown, &Ty::named("int")));
        assert!(st(&Ty::named("int"), &Ty::Unknown));
    }

    #[test]
    fn mixed_is_absorbing() {
        assert!(st(&Ty::named("mixed"), &Ty::named("int")));
        assert!(st(&Ty::named("int"), &Ty::named("mixed")));
    }

    #[test]
    fn string_passes_for_callable() {
        assert!(st(&Ty::named("string"), &Ty::named("callable")));
        assert!(st(&Ty::named("Closure"), &Ty::named("callable")));
        assert!(st(&Ty::named("callable"), &Ty::named("Closure")));
    }

    #[test]
    fn class_vs_object_both_ways() {
        assert!(st(&Ty::named("Foo"), &Ty::named("object")));
        assert!(st(&Ty::named("object"), &Ty::named("Foo")));
        assert!(!st(&Ty::named("int"), &Ty::named("Foo")));
    }

    #[test]
    fn intersection_quantifiers() {
        struct Graph;
        impl ClassGraph for Graph {
            fn is_subclass_of(&self, name: &str, ancestor: &str) -> bool {
                name == "Impl" && (ancestor == "A" || ancestor == "B")
            }
            fn has_stringable(&self, _name: &str) -> bool {
                false
            }
        }
        let a_and_b = Ty::Intersection(vec![Ty::named("A"), Ty::named("B")]);
        assert!(subtype(&Ty::named("Impl"), &a_and_b, &Graph));
        assert!(!subtype(&Ty::named("A"), &a_and_b, &Graph));
        // Intersection on the left: any member suffices.
        assert!(subtype(&a_and_b, &Ty::named("A"), &Graph));
    }

    #[test]
    fn stringable_accepts_string() {
        struct Graph;
        impl ClassGraph for Graph {
            fn is_subclass_of(&self, _: &str, _: &str) -> bool {
                false
            }
            fn has_stringable(&self, name: &str) -> bool {
                name == "Wrapper"
            }
        }
        assert!(subtype(&Ty::named("string"), &Ty::named("Wrapper"), &Graph));
        assert!(!subtype(&Ty::named("string"), &Ty::named("Other"), &Graph));
    }

    #[test]
    fn set_subtype_treats_sides_as_unions() {
        let graph = EmptyClassGraph;
        let left = TypeSet::from_types(vec![Ty::named("int")]);
        let right = TypeSet::from_types(vec![Ty::named("int"), Ty::named("string")]);
        assert!(set_subtype(&left, &right, &graph));
        assert!(!set_subtype(&right, &left, &graph));
        assert!(set_subtype(&TypeSet::new(), &left, &graph));
        assert!(set_subtype(&TypeSet::unknown(), &left, &graph));
    }
}

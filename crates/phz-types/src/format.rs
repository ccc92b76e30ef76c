//! Type pretty-printing.
//!
//! One rendering routine for both purposes: `sort = false` preserves author
//! order for error messages, `sort = true` canonicalizes member order for
//! structural comparison (interface conformance checks compare the rendered
//! strings).

use crate::{Ty, TypeSet};

pub fn type_to_string(ty: &Ty, sort: bool) -> String {
    match ty {
        Ty::Named { name, nullable } => {
            if *nullable {
                format!("?{name}")
            } else {
                name.clone()
            }
        }
        Ty::Union(parts) => join_members(parts, "|", sort),
        Ty::Intersection(parts) => join_members(parts, "&", sort),
        Ty::Unknown => "unknown".to_string(),
    }
}

/// Render a possible-types set the way it appears in messages: members in
/// encounter order, `|`-joined.
pub fn set_to_string(set: &TypeSet) -> String {
    let rendered: Vec<String> = set.iter().map(|ty| type_to_string(ty, false)).collect();
    rendered.join("|")
}

fn join_members(parts: &[Ty], separator: &str, sort: bool) -> String {
    let mut rendered: Vec<String> = parts.iter().map(|p| type_to_string(p, sort)).collect();
    if sort {
        rendered.sort();
    }
    rendered.join(separator)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_and_nullable() {
        assert_eq!(type_to_string(&Ty::named("int"), false), "int");
        assert_eq!(type_to_string(&Ty::nullable("Foo\\Bar"), false), "?Foo\\Bar");
    }

    #[test]
    fn union_preserves_author_order_unsorted() {
        let ty = Ty::Union(vec![Ty::named("string"), Ty::named("int")]);
        assert_eq!(type_to_string(&ty, false), "string|int");
    }

    #[test]
    fn sorted_union_is_stable_under_permutation() {
        let ab = Ty::Union(vec![Ty::named("string"), Ty::named("int")]);
        let ba = Ty::Union(vec![Ty::named("int"), Ty::named("string")]);
        assert_eq!(type_to_string(&ab, true), type_to_string(&ba, true));
    }

    #[test]
    fn intersection() {
        let ty = Ty::Intersection(vec![Ty::named("Countable"), Ty::named("ArrayAccess")]);
        assert_eq!(type_to_string(&ty, false), "Countable&ArrayAccess");
        assert_eq!(type_to_string(&ty, true), "ArrayAccess&Countable");
    }
}

//! Lattice laws the rest of the analyzer leans on.

use phz_types::{
    set_subtype, subtype, type_to_string, ClassGraph, EmptyClassGraph, Ty, TypeSet, PRIMITIVES,
};

fn st(a: &Ty, b: &Ty) -> bool {
    subtype(a, b, &EmptyClassGraph)
}

#[test]
fn subtype_is_reflexive_for_all_non_unknown_types() {
    for name in PRIMITIVES {
        let ty = Ty::named(*name);
        assert!(st(&ty, &ty), "`{name}` is not reflexive");
        let nullable = Ty::nullable(*name);
        assert!(st(&nullable, &nullable), "`?{name}` is not reflexive");
    }
    let union = Ty::Union(vec![Ty::named("int"), Ty::named("string")]);
    assert!(st(&union, &union));
    let intersection = Ty::Intersection(vec![Ty::named("Countable"), Ty::named("ArrayAccess")]);
    assert!(st(&intersection, &intersection));
}

#[test]
fn mixed_absorbs_in_both_directions() {
    for name in PRIMITIVES {
        let ty = Ty::named(*name);
        assert!(st(&ty, &Ty::named("mixed")), "`{name}` <: mixed failed");
        assert!(st(&Ty::named("mixed"), &ty), "mixed <: `{name}` failed");
    }
}

#[test]
fn unknown_is_optimistic_on_either_side() {
    assert!(st(&Ty::Unknown, &Ty::named("never")));
    assert!(st(&Ty::named("never"), &Ty::Unknown));
    let union_with_unknown = Ty::Union(vec![Ty::named("int"), Ty::Unknown]);
    assert!(st(&union_with_unknown, &Ty::named("string")));
    assert!(st(&Ty::named("string"), &union_with_unknown));
}

#[test]
fn empty_or_unknown_sets_never_fail_composite_checks() {
    let graph = EmptyClassGraph;
    let ints = TypeSet::of(Ty::named("int"));
    assert!(set_subtype(&TypeSet::new(), &ints, &graph));
    assert!(set_subtype(&ints, &TypeSet::new(), &graph));
    assert!(set_subtype(&TypeSet::unknown(), &ints, &graph));
}

#[test]
fn union_on_the_left_is_universally_quantified() {
    let graph = EmptyClassGraph;
    let int_or_string = Ty::Union(vec![Ty::named("int"), Ty::named("string")]);
    // Both members fit int|string|bool.
    let wider = Ty::Union(vec![
        Ty::named("int"),
        Ty::named("string"),
        Ty::named("bool"),
    ]);
    assert!(subtype(&int_or_string, &wider, &graph));
    // One member does not fit int.
    assert!(!subtype(&int_or_string, &Ty::named("int"), &graph));
}

#[test]
fn class_likeness_defaults_to_non_primitive_names() {
    let graph = EmptyClassGraph;
    assert!(graph.is_class_like("Foo\\Bar"));
    assert!(graph.is_class_like("Stringable"));
    for name in PRIMITIVES {
        assert!(!graph.is_class_like(name), "`{name}` should not be class-like");
    }
}

#[test]
fn inheritance_goes_through_the_graph() {
    struct Graph;
    impl ClassGraph for Graph {
        fn is_subclass_of(&self, name: &str, ancestor: &str) -> bool {
            name == "Child" && (ancestor == "Base" || ancestor == "Marker")
        }
        fn has_stringable(&self, _name: &str) -> bool {
            false
        }
    }
    assert!(subtype(&Ty::named("Child"), &Ty::named("Base"), &Graph));
    assert!(subtype(&Ty::named("Child"), &Ty::named("Marker"), &Graph));
    assert!(!subtype(&Ty::named("Base"), &Ty::named("Child"), &Graph));
}

#[test]
fn sorted_printing_is_stable_under_permutation() {
    let permutations = [
        vec!["int", "string", "null"],
        vec!["null", "int", "string"],
        vec!["string", "null", "int"],
    ];
    let rendered: Vec<String> = permutations
        .iter()
        .map(|names| {
            let ty = Ty::Union(names.iter().map(|n| Ty::named(*n)).collect());
            type_to_string(&ty, true)
        })
        .collect();
    assert_eq!(rendered[0], rendered[1]);
    assert_eq!(rendered[1], rendered[2]);
}

#[test]
fn unsorted_printing_preserves_author_order() {
    let ty = Ty::Union(vec![Ty::named("string"), Ty::named("int")]);
    assert_eq!(type_to_string(&ty, false), "string|int");
    let flipped = Ty::Union(vec![Ty::named("int"), Ty::named("string")]);
    assert_eq!(type_to_string(&flipped, false), "int|string");
}

#[test]
fn union_construction_normalizes_to_a_canonical_set() {
    // Flattening + dedup means printing a normalized set and rebuilding it
    // from its members lands on the same set.
    let built = Ty::union(vec![
        Ty::named("int"),
        Ty::Union(vec![Ty::named("string"), Ty::named("int")]),
    ]);
    let Ty::Union(members) = &built else {
        panic!("expected union, got {built:?}");
    };
    let rebuilt = Ty::union(members.clone());
    assert_eq!(type_to_string(&built, true), type_to_string(&rebuilt, true));
}

//! Type lattice for the phz analyzer.
//!
//! This crate defines the type representation (`Ty`), the possible-types set
//! attached to expressions and variables (`TypeSet`), the subtype relation,
//! and type pretty-printing. The lattice is deliberately optimistic: the
//! `Unknown` sentinel is a subtype and supertype of everything, so a failed
//! inference never cascades into false positives.

pub mod format;
pub mod subtype;

pub use format::{set_to_string, type_to_string};
pub use subtype::{set_subtype, subtype};

/// Primitive type tags of the language, in canonical lowercase spelling.
/// Everything else in `Named` position is a class/interface/trait name.
pub const PRIMITIVES: &[&str] = &[
    "int", "float", "string", "bool", "true", "false", "null", "array", "object", "callable",
    "iterable", "void", "never", "mixed", "resource", "self", "static", "parent",
];

pub fn is_primitive(name: &str) -> bool {
    PRIMITIVES.iter().any(|p| name.eq_ignore_ascii_case(p))
}

/// A resolved type.
///
/// Invariants: `Union` never nests `Union` and has at least two members;
/// `Intersection` contains only non-nullable `Named` members.
#[derive(Debug, Clone, PartialEq)]
pub enum Ty {
    Named { name: String, nullable: bool },
    Union(Vec<Ty>),
    Intersection(Vec<Ty>),
    /// Not inferred. Distinct from the definite type `never`.
    Unknown,
}

impl Ty {
    pub fn named(name: impl Into<String>) -> Ty {
        Ty::Named {
            name: name.into(),
            nullable: false,
        }
    }

    pub fn nullable(name: impl Into<String>) -> Ty {
        Ty::Named {
            name: name.into(),
            nullable: true,
        }
    }

    /// Build a union, flattening nested unions and deduplicating. A single
    /// surviving member collapses to itself.
    pub fn union(parts: Vec<Ty>) -> Ty {
        let mut flat: Vec<Ty> = Vec::new();
        let mut stack: Vec<Ty> = parts.into_iter().rev().collect();
        while let Some(part) = stack.pop() {
            match part {
                Ty::Union(inner) => stack.extend(inner.into_iter().rev()),
                other => {
                    if !flat.iter().any(|t| ty_eq(t, &other)) {
                        flat.push(other);
                    }
                }
            }
        }
        match flat.len() {
            1 => flat.swap_remove(0),
            0 => Ty::Unknown,
            _ => Ty::Union(flat),
        }
    }

    pub fn is_named(&self, name: &str) -> bool {
        matches!(self, Ty::Named { name: n, .. } if n.eq_ignore_ascii_case(name))
    }

    pub fn contains_unknown(&self) -> bool {
        match self {
            Ty::Unknown => true,
            Ty::Union(parts) | Ty::Intersection(parts) => {
                parts.iter().any(Ty::contains_unknown)
            }
            Ty::Named { .. } => false,
        }
    }

    pub fn contains_mixed(&self) -> bool {
        match self {
            Ty::Named { name, .. } => name.eq_ignore_ascii_case("mixed"),
            Ty::Union(parts) | Ty::Intersection(parts) => parts.iter().any(Ty::contains_mixed),
            Ty::Unknown => false,
        }
    }
}

/// Structural equality with case-insensitive names.
pub fn ty_eq(a: &Ty, b: &Ty) -> bool {
    match (a, b) {
        (
            Ty::Named {
                name: n,
                nullable: na,
            },
            Ty::Named {
                name: m,
                nullable: nb,
            },
        ) => na == nb && n.eq_ignore_ascii_case(m),
        (Ty::Union(xs), Ty::Union(ys)) | (Ty::Intersection(xs), Ty::Intersection(ys)) => {
            xs.len() == ys.len()
                && xs.iter().all(|x| ys.iter().any(|y| ty_eq(x, y)))
        }
        (Ty::Unknown, Ty::Unknown) => true,
        _ => false,
    }
}

/// The set of types a value may have at runtime.
///
/// Empty means "known invalid" (an error has already been reported);
/// a set containing `Unknown` means "not determinable" and absorbs any
/// further widening.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeSet {
    types: Vec<Ty>,
}

impl TypeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unknown() -> Self {
        TypeSet {
            types: vec![Ty::Unknown],
        }
    }

    pub fn of(ty: Ty) -> Self {
        TypeSet { types: vec![ty] }
    }

    pub fn from_types(types: Vec<Ty>) -> Self {
        let mut set = TypeSet::new();
        for ty in types {
            set.push(ty);
        }
        set
    }

    pub fn push(&mut self, ty: Ty) {
        if !self.types.iter().any(|t| ty_eq(t, &ty)) {
            self.types.push(ty);
        }
    }

    /// Union-merge: widening is monotone and `Unknown` is absorbing.
    pub fn merge(&mut self, other: &TypeSet) {
        if self.is_unknown() {
            return;
        }
        if other.is_unknown() {
            self.types = vec![Ty::Unknown];
            return;
        }
        for ty in &other.types {
            self.push(ty.clone());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_unknown(&self) -> bool {
        self.types.iter().any(Ty::contains_unknown)
    }

    pub fn contains_mixed(&self) -> bool {
        self.types.iter().any(Ty::contains_mixed)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Ty> {
        self.types.iter()
    }

    pub fn contains(&self, ty: &Ty) -> bool {
        self.types.iter().any(|t| ty_eq(t, ty))
    }

    /// View the whole set as one type for subtype queries.
    pub fn to_ty(&self) -> Ty {
        match self.types.len() {
            0 => Ty::Unknown,
            1 => self.types[0].clone(),
            _ => Ty::union(self.types.clone()),
        }
    }
}

impl FromIterator<Ty> for TypeSet {
    fn from_iter<I: IntoIterator<Item = Ty>>(iter: I) -> Self {
        TypeSet::from_types(iter.into_iter().collect())
    }
}

/// The lattice's one seam to the reflection layer: class-hierarchy queries
/// the subtype relation needs. The registry implements this.
pub trait ClassGraph {
    /// Does `name` denote a class/interface/trait rather than a primitive
    /// tag? The default answer is purely syntactic.
    fn is_class_like(&self, name: &str) -> bool {
        !is_primitive(name)
    }

    /// Is `ancestor` reachable from `name` through `extends`/`implements`
    /// (self excluded; identity is handled by the relation itself)?
    fn is_subclass_of(&self, name: &str, ancestor: &str) -> bool;

    /// Does `name` (a class) transitively carry the `Stringable` marker?
    fn has_stringable(&self, name: &str) -> bool;
}

/// Graph with no user classes; every hierarchy query is negative.
/// Useful in tests and for primitive-only subtype questions.
pub struct EmptyClassGraph;

impl ClassGraph for EmptyClassGraph {
    fn is_subclass_of(&self, _name: &str, _ancestor: &str) -> bool {
        false
    }

    fn has_stringable(&self, _name: &str) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_flattens_and_dedups() {
        let ty = Ty::union(vec![
            Ty::named("int"),
            Ty::union(vec![Ty::named("string"), Ty::named("INT")]),
        ]);
        match ty {
            Ty::Union(parts) => assert_eq!(parts.len(), 2),
            other => panic!("expected union, got {other:?}"),
        }
    }

    #[test]
    fn union_of_one_collapses() {
        let ty = Ty::union(vec![Ty::named("int"), Ty::named("int")]);
        assert!(ty.is_named("int"));
    }

    #[test]
    fn merge_is_unknown_absorbing() {
        let mut set = TypeSet::unknown();
        set.merge(&TypeSet::of(Ty::named("int")));
        assert!(set.is_unknown());
        assert_eq!(set.len(), 1);

        let mut set = TypeSet::of(Ty::named("int"));
        set.merge(&TypeSet::unknown());
        assert!(set.is_unknown());
    }

    #[test]
    fn merge_widens() {
        let mut set = TypeSet::of(Ty::named("int"));
        set.merge(&TypeSet::of(Ty::named("string")));
        set.merge(&TypeSet::of(Ty::named("int")));
        assert_eq!(set.len(), 2);
    }
}

//! Reflection model for the phz analyzer.
//!
//! A uniform read-only view of classes, functions, methods, properties,
//! constants and parameters, regardless of whether they come from analyzed
//! source or from the host environment the checker embeds. One shape serves
//! both: a host entity has no declaration handle, a user-defined one carries
//! its AST `Rc` plus the namespace/alias snapshot taken at its declaration
//! site.

pub mod host;
pub mod registry;

pub use registry::Registry;

use rustc_hash::{FxHashMap, FxHashSet};
use std::path::PathBuf;
use std::rc::Rc;

use phz_parser::{ClassDecl, ClassKind, Expr, FunctionDecl, Stmt};
use phz_types::Ty;

/// Stable identifier of a class in the registry arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassId(pub u32);

/// Stable identifier of a function in the registry arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FuncId(pub u32);

/// Stable identifier of a loaded source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileId(pub u32);

/// Member modifier bits.
pub mod modifier {
    pub const NONE: u32 = 0;
    pub const PUBLIC: u32 = 1 << 0;
    pub const PROTECTED: u32 = 1 << 1;
    pub const PRIVATE: u32 = 1 << 2;
    pub const STATIC: u32 = 1 << 3;
    pub const ABSTRACT: u32 = 1 << 4;
    pub const FINAL: u32 = 1 << 5;
    pub const READONLY: u32 = 1 << 6;

    pub const VISIBILITY_MASK: u32 = PUBLIC | PROTECTED | PRIVATE;

    /// Render a modifier set the way conformance messages compare them.
    pub fn to_string(mods: u32) -> String {
        let mut parts = Vec::new();
        if mods & PUBLIC != 0 {
            parts.push("public");
        }
        if mods & PROTECTED != 0 {
            parts.push("protected");
        }
        if mods & PRIVATE != 0 {
            parts.push("private");
        }
        if mods & STATIC != 0 {
            parts.push("static");
        }
        if mods & ABSTRACT != 0 {
            parts.push("abstract");
        }
        if mods & FINAL != 0 {
            parts.push("final");
        }
        if mods & READONLY != 0 {
            parts.push("readonly");
        }
        parts.join(" ")
    }
}

/// Per-file `use` alias maps, keyed by lowercased alias. The language keeps
/// separate symbol tables for class, function and constant imports.
#[derive(Debug, Clone, Default)]
pub struct UseAliases {
    pub classes: FxHashMap<String, String>,
    pub functions: FxHashMap<String, String>,
    pub constants: FxHashMap<String, String>,
}

/// A resolved parameter of a function or method.
#[derive(Debug, Clone)]
pub struct Parameter {
    pub name: String,
    pub ty: Option<Ty>,
    pub by_ref: bool,
    /// Has a default or is variadic: callers may omit it.
    pub optional: bool,
    pub variadic: bool,
    pub has_default: bool,
    /// Default expression AST, for user-declared callables.
    pub default: Option<Expr>,
}

impl Parameter {
    pub fn new(name: impl Into<String>, ty: Option<Ty>) -> Self {
        Parameter {
            name: name.into(),
            ty,
            by_ref: false,
            optional: false,
            variadic: false,
            has_default: false,
            default: None,
        }
    }
}

/// A resolved function or method signature.
#[derive(Debug, Clone)]
pub struct FunctionSig {
    /// Fully qualified for free functions, `Class::method` for methods;
    /// display case preserved.
    pub qualified_name: String,
    pub parameters: Vec<Parameter>,
    pub return_type: Option<Ty>,
    pub is_variadic: bool,
    pub is_generator: bool,
    pub is_abstract: bool,
    pub modifiers: u32,
    pub declaring_class: Option<ClassId>,
    /// Body present, not abstract, not a generator, and the return hint is
    /// neither absent nor `void`/`never`.
    pub is_return_required: bool,
    pub line: u32,
}

impl FunctionSig {
    pub fn is_static(&self) -> bool {
        self.modifiers & modifier::STATIC != 0
    }

    /// Number of parameters a caller must provide.
    pub fn required_params(&self) -> usize {
        self.parameters
            .iter()
            .filter(|p| !p.optional && !p.variadic)
            .count()
    }
}

/// A declared or inherited property.
#[derive(Debug, Clone)]
pub struct PropInfo {
    pub name: String,
    pub ty: Option<Ty>,
    pub modifiers: u32,
    pub has_default: bool,
}

impl PropInfo {
    pub fn is_static(&self) -> bool {
        self.modifiers & modifier::STATIC != 0
    }
}

/// A class constant (or enum case).
#[derive(Debug, Clone)]
pub struct ConstInfo {
    pub name: String,
    pub ty: Option<Ty>,
    pub modifiers: u32,
}

/// Where a reflected class comes from. Query methods dispatch on the
/// variant: a `Host` entity is fully described by its resolved member maps,
/// a `UserDefined` one carries its declaration handle plus the namespace
/// and alias snapshot taken at the declaration site.
#[derive(Debug, Clone)]
pub enum ClassOrigin {
    Host,
    UserDefined {
        decl: Rc<ClassDecl>,
        file: FileId,
        namespace: String,
        aliases: UseAliases,
    },
}

/// Provenance of a free function, mirroring `ClassOrigin`.
#[derive(Debug, Clone)]
pub enum FuncOrigin {
    Host,
    UserDefined {
        decl: Rc<FunctionDecl>,
        file: FileId,
        namespace: String,
        aliases: UseAliases,
    },
}

/// One class-like entity: class, interface, trait or enum.
///
/// Created lazily by the loader; the class resolver fills in the inherited
/// member maps and flips `initialized`. All cross references are ids.
#[derive(Debug, Clone)]
pub struct ClassInfo {
    /// Fully qualified, display case.
    pub name: String,
    pub kind: ClassKind,
    pub is_abstract: bool,
    pub is_final: bool,
    pub parent: Option<ClassId>,
    pub interfaces: Vec<ClassId>,
    pub traits: Vec<ClassId>,
    /// Case-sensitive property names.
    pub properties: FxHashMap<String, PropInfo>,
    /// Case-sensitive constant names.
    pub constants: FxHashMap<String, ConstInfo>,
    /// Lowercased method names.
    pub methods: FxHashMap<String, Rc<FunctionSig>>,
    pub enum_backing: Option<Ty>,
    /// Transitive closure of implemented/extended interface names,
    /// lowercased. Includes the `Stringable` marker when `__toString`
    /// exists.
    pub interface_closure: FxHashSet<String>,
    pub initialized: bool,
    /// Duplicate declaration: registered but never analyzed.
    pub poisoned: bool,
    pub origin: ClassOrigin,
}

impl ClassInfo {
    pub fn is_user_defined(&self) -> bool {
        matches!(self.origin, ClassOrigin::UserDefined { .. })
    }

    /// Declaration handle, for user-defined classes.
    pub fn decl(&self) -> Option<&Rc<ClassDecl>> {
        match &self.origin {
            ClassOrigin::UserDefined { decl, .. } => Some(decl),
            ClassOrigin::Host => None,
        }
    }

    pub fn method(&self, name: &str) -> Option<&Rc<FunctionSig>> {
        self.methods.get(&name.to_ascii_lowercase())
    }

    pub fn implements(&self, interface: &str) -> bool {
        self.interface_closure
            .contains(&interface.to_ascii_lowercase())
    }
}

/// A lazily-registered free function.
#[derive(Debug, Clone)]
pub struct FuncEntry {
    /// Fully qualified, display case.
    pub name: String,
    /// Present once initialized (host functions are born initialized).
    pub sig: Option<Rc<FunctionSig>>,
    pub origin: FuncOrigin,
}

/// A global constant.
#[derive(Debug, Clone)]
pub struct ConstDef {
    pub name: String,
    /// Host constants carry their primitive type directly.
    pub ty: Option<Ty>,
    /// User constants carry the declared value expression.
    pub value: Option<Expr>,
}

/// One parsed source file, owned by the registry.
#[derive(Debug)]
pub struct SourceFile {
    pub path: PathBuf,
    /// Display form used in diagnostics.
    pub pretty: String,
    pub stmts: Vec<Stmt>,
    pub line_count: u32,
}

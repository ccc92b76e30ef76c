//! Global loader: the first pass.
//!
//! Parses each input file, walks its top level (namespace blocks recurse),
//! registers classes, functions and constants lazily, and follows `include`
//! statements whose path is statically computable (string literals,
//! `__FILE__`/`__DIR__`, and concatenations thereof). A parse failure
//! abandons the single file, never the run. Files are deduplicated by
//! canonical path, so diamond includes load once.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use phz_parser::{parse_file, BinaryOp, Expr, MagicConst, Stmt, UseKind};
use phz_reflect::{
    ClassInfo, ClassOrigin, ConstDef, FileId, FuncEntry, FuncOrigin, SourceFile, UseAliases,
};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::context::Checker;

/// Names that can never be declared as constants.
const RESERVED_CONSTANTS: &[&str] = &["null", "true", "false"];

/// Namespace and alias state while walking one file's top level.
#[derive(Default, Clone)]
struct LoaderState {
    namespace: String,
    aliases: UseAliases,
}

impl Checker {
    /// Load a file (and everything it statically includes) into the
    /// registry. Returns the new `FileId`, or `None` when the file was
    /// already loaded or failed to parse. `Err` means the file itself could
    /// not be read.
    pub fn load_file(&mut self, path: &Path) -> Result<Option<FileId>, String> {
        let canonical = fs::canonicalize(path)
            .map_err(|err| format!("cannot open `{}`: {err}", path.display()))?;
        if self.registry.is_loaded(&canonical) {
            return Ok(None);
        }
        self.registry.mark_loaded(canonical.clone());
        let source = fs::read_to_string(&canonical)
            .map_err(|err| format!("cannot read `{}`: {err}", canonical.display()))?;
        let pretty = self.pretty_path(&canonical);
        debug!(file = %pretty, "loading");

        let stmts = match parse_file(&source) {
            Ok(stmts) => stmts,
            Err(err) => {
                self.sink.error(pretty, err.line, err.message);
                return Ok(None);
            }
        };
        let line_count = source.lines().count() as u32;
        let file = self.registry.add_file(SourceFile {
            path: canonical.clone(),
            pretty,
            stmts: Vec::new(),
            line_count,
        });
        let mut state = LoaderState::default();
        self.collect_top_level(file, &stmts, &mut state, &canonical);
        self.registry.file_mut(file).stmts = stmts;
        Ok(Some(file))
    }

    /// Display form of a path: `./…` when under the working directory.
    pub(crate) fn pretty_path(&self, path: &Path) -> String {
        if let Some(cwd) = &self.cwd {
            if let Ok(relative) = path.strip_prefix(cwd) {
                return format!("./{}", relative.display());
            }
        }
        path.display().to_string()
    }

    fn file_error(&mut self, file: FileId, line: u32, message: impl Into<String>) {
        let pretty = self.registry.file(file).pretty.clone();
        self.sink.error(pretty, line, message);
    }

    fn collect_top_level(
        &mut self,
        file: FileId,
        stmts: &[Stmt],
        state: &mut LoaderState,
        source_path: &Path,
    ) {
        for stmt in stmts {
            match stmt {
                Stmt::Namespace { name, body, line: _ } => {
                    let namespace = name.as_ref().map(|n| n.joined()).unwrap_or_default();
                    match body {
                        Some(body) => {
                            let mut inner = LoaderState {
                                namespace,
                                aliases: UseAliases::default(),
                            };
                            self.collect_top_level(file, body, &mut inner, source_path);
                        }
                        None => {
                            state.namespace = namespace;
                            state.aliases = UseAliases::default();
                        }
                    }
                }
                Stmt::Use { kind, items, .. } => {
                    apply_use_items(&mut state.aliases, *kind, items);
                }
                Stmt::Const { entries, .. } => {
                    for entry in entries {
                        if RESERVED_CONSTANTS
                            .iter()
                            .any(|reserved| entry.name.eq_ignore_ascii_case(reserved))
                        {
                            self.file_error(
                                file,
                                entry.line,
                                format!("Cannot use reserved name `{}` as a constant", entry.name),
                            );
                            continue;
                        }
                        let qualified = qualified_name(&state.namespace, &entry.name);
                        let added = self.registry.add_constant(ConstDef {
                            name: qualified.clone(),
                            ty: None,
                            value: Some(entry.value.clone()),
                        });
                        if !added && !self.options.self_check {
                            self.file_error(
                                file,
                                entry.line,
                                format!("Cannot redeclare constant `{qualified}`"),
                            );
                        }
                    }
                }
                Stmt::Class(decl) => {
                    let qualified = qualified_name(&state.namespace, &decl.name);
                    let info = ClassInfo {
                        name: qualified.clone(),
                        kind: decl.kind,
                        is_abstract: decl.is_abstract,
                        is_final: decl.is_final,
                        parent: None,
                        interfaces: Vec::new(),
                        traits: Vec::new(),
                        properties: FxHashMap::default(),
                        constants: FxHashMap::default(),
                        methods: FxHashMap::default(),
                        enum_backing: None,
                        interface_closure: FxHashSet::default(),
                        initialized: false,
                        poisoned: false,
                        origin: ClassOrigin::UserDefined {
                            decl: decl.clone(),
                            file,
                            namespace: state.namespace.clone(),
                            aliases: state.aliases.clone(),
                        },
                    };
                    if self.registry.add_class(info).is_err() && !self.options.self_check {
                        self.file_error(
                            file,
                            decl.line,
                            format!("Cannot redeclare class `{qualified}`"),
                        );
                    }
                }
                Stmt::Function(decl) => {
                    let qualified = qualified_name(&state.namespace, &decl.name);
                    let entry = FuncEntry {
                        name: qualified.clone(),
                        sig: None,
                        origin: FuncOrigin::UserDefined {
                            decl: decl.clone(),
                            file,
                            namespace: state.namespace.clone(),
                            aliases: state.aliases.clone(),
                        },
                    };
                    if self.registry.add_function(entry).is_err() && !self.options.self_check {
                        self.file_error(
                            file,
                            decl.line,
                            format!("Cannot redeclare function `{qualified}`"),
                        );
                    }
                }
                Stmt::Expr(Expr::Include { path, line, .. }) => {
                    self.follow_include(file, path, *line, source_path);
                }
                Stmt::Block(body) => {
                    self.collect_top_level(file, body, state, source_path);
                }
                _ => {}
            }
        }
    }

    fn follow_include(&mut self, file: FileId, path_expr: &Expr, line: u32, source_path: &Path) {
        let Some(raw) = static_include_path(path_expr, source_path) else {
            warn!(line, "dynamic include skipped");
            self.file_error(
                file,
                line,
                "Cannot statically resolve include path; file not analyzed",
            );
            return;
        };
        let mut target = PathBuf::from(&raw);
        if target.is_relative() {
            if let Some(parent) = source_path.parent() {
                target = parent.join(target);
            }
        }
        // Canonicalization resolves symlinks and verifies existence.
        match fs::canonicalize(&target) {
            Ok(resolved) => {
                if let Err(message) = self.load_file(&resolved) {
                    self.file_error(file, line, message);
                }
            }
            Err(_) => {
                self.file_error(file, line, format!("Include file `{raw}` not found"));
            }
        }
    }
}

fn apply_use_items(aliases: &mut UseAliases, kind: UseKind, items: &[phz_parser::UseItem]) {
    for item in items {
        let alias = item
            .alias
            .clone()
            .unwrap_or_else(|| item.name.last().to_string())
            .to_ascii_lowercase();
        let target = item.name.joined();
        let map = match kind {
            UseKind::Class => &mut aliases.classes,
            UseKind::Function => &mut aliases.functions,
            UseKind::Const => &mut aliases.constants,
        };
        map.insert(alias, target);
    }
}

pub(crate) fn qualified_name(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{namespace}\\{name}")
    }
}

/// Evaluate an include path made of string literals, `__FILE__`, `__DIR__`
/// and concatenations of those. Anything else is dynamic.
fn static_include_path(expr: &Expr, source_path: &Path) -> Option<String> {
    match expr {
        Expr::Str { value, .. } => Some(value.clone()),
        Expr::MagicConst {
            kind: MagicConst::File,
            ..
        } => Some(source_path.display().to_string()),
        Expr::MagicConst {
            kind: MagicConst::Dir,
            ..
        } => source_path
            .parent()
            .map(|parent| parent.display().to_string()),
        Expr::Binary {
            op: BinaryOp::Concat,
            lhs,
            rhs,
            ..
        } => {
            let left = static_include_path(lhs, source_path)?;
            let right = static_include_path(rhs, source_path)?;
            Some(format!("{left}{right}"))
        }
        _ => None,
    }
}

/// Expose the alias application to the statement validator, which mirrors
/// the loader's bookkeeping while walking.
pub(crate) fn apply_use_to_aliases(
    aliases: &mut UseAliases,
    kind: UseKind,
    items: &[phz_parser::UseItem],
) {
    apply_use_items(aliases, kind, items);
}

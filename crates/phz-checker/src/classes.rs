//! Class resolver.
//!
//! Initializes every user-defined class once: resolves parent, interfaces
//! and traits, flattens inherited members with the precedence cascade
//! (methods: own > traits > parent > interfaces; constants: own > traits >
//! parent > interfaces; properties: own > traits > parent), validates
//! interface conformance, abstract obligations and enum backing, and
//! freezes the result in the registry. Recursion over `extends`/`implements`
//! is guarded so a malformed cycle cannot loop.

use rustc_hash::{FxHashMap, FxHashSet};
use std::rc::Rc;

use phz_parser::{
    ClassDecl, ClassKind, ClassMember, ConstGroup, EnumCase, FunctionDecl, PropGroup,
    TraitAdaptation, UseTrait, Visibility,
};
use phz_reflect::{modifier, ClassId, ClassOrigin, ConstInfo, FuncOrigin, FunctionSig, PropInfo};
use phz_types::{set_subtype, type_to_string, Ty, TypeSet};

use crate::context::{Checker, Scope};
use crate::exprs::literal_type;
use crate::signature::visibility_bits;

/// Working member maps accumulated while resolving one class.
#[derive(Default)]
struct MemberMaps {
    iface_methods: FxHashMap<String, Rc<FunctionSig>>,
    iface_consts: FxHashMap<String, ConstInfo>,
    parent_methods: FxHashMap<String, Rc<FunctionSig>>,
    parent_props: FxHashMap<String, PropInfo>,
    parent_consts: FxHashMap<String, ConstInfo>,
    trait_methods: FxHashMap<String, Rc<FunctionSig>>,
    trait_props: FxHashMap<String, PropInfo>,
    trait_consts: FxHashMap<String, ConstInfo>,
    own_methods: FxHashMap<String, Rc<FunctionSig>>,
    own_props: FxHashMap<String, PropInfo>,
    own_consts: FxHashMap<String, ConstInfo>,
    closure: FxHashSet<String>,
}

impl Checker {
    /// Initialize every registered user-defined class, in registration
    /// order. Idempotent.
    pub fn init_all_classes(&mut self) {
        let ids: Vec<ClassId> = self.registry.class_ids().collect();
        for id in ids {
            self.init_class(id);
        }
    }

    /// Build signatures for every registered user-defined function.
    pub fn init_all_functions(&mut self) {
        let ids: Vec<_> = self.registry.function_ids().collect();
        for id in ids {
            let (decl, file, namespace, aliases, name) = {
                let entry = self.registry.function(id);
                if entry.sig.is_some() {
                    continue;
                }
                let FuncOrigin::UserDefined {
                    decl,
                    file,
                    namespace,
                    aliases,
                } = &entry.origin
                else {
                    continue;
                };
                (
                    decl.clone(),
                    *file,
                    namespace.clone(),
                    aliases.clone(),
                    entry.name.clone(),
                )
            };
            let mut scope = Scope::new(file);
            scope.namespace = namespace;
            scope.aliases = aliases;
            let sig = self.build_signature(
                &scope,
                &name,
                &decl.params,
                decl.return_type.as_ref(),
                decl.body.is_some(),
                decl.has_yield,
                modifier::PUBLIC,
                None,
                decl.line,
            );
            self.registry.function_mut(id).sig = Some(sig);
        }
    }

    pub fn init_class(&mut self, id: ClassId) {
        let (decl, file) = {
            let info = self.registry.class(id);
            if info.initialized {
                return;
            }
            let ClassOrigin::UserDefined { decl, file, .. } = &info.origin else {
                return;
            };
            (decl.clone(), *file)
        };
        if !self.initializing.insert(id) {
            // Re-entered through a cyclic parent/interface reference.
            self.registry.class_mut(id).poisoned = true;
            return;
        }

        let mut scope = Scope::new(file);
        {
            let info = self.registry.class(id);
            if let ClassOrigin::UserDefined {
                namespace, aliases, ..
            } = &info.origin
            {
                scope.namespace = namespace.clone();
                scope.aliases = aliases.clone();
            }
        }
        scope.current_class = Some(id);
        let display = self.registry.class(id).name.clone();

        let mut maps = MemberMaps::default();
        let mut interface_ids = Vec::new();
        let mut trait_ids = Vec::new();
        let mut parent_id = None;

        // Interfaces, in declaration order. An interface's `extends` list is
        // its interface list.
        let declared_interfaces = if decl.kind == ClassKind::Interface {
            &decl.extends
        } else {
            &decl.implements
        };
        for name in declared_interfaces {
            let Some(fqn) = self.fq_class_name(&scope, name, true) else {
                continue;
            };
            let Some(iid) = self.registry.get_class(&fqn) else {
                self.error(&scope, name.line, format!("Undefined interface `{fqn}`"));
                continue;
            };
            self.init_class(iid);
            let (kind, iface_display, iface_closure, iface_methods, iface_consts) = {
                let iface = self.registry.class(iid);
                (
                    iface.kind,
                    iface.name.clone(),
                    iface.interface_closure.clone(),
                    iface.methods.clone(),
                    iface.constants.clone(),
                )
            };
            if kind != ClassKind::Interface {
                self.error(
                    &scope,
                    name.line,
                    format!("`{iface_display}` is not an interface"),
                );
                continue;
            }
            interface_ids.push(iid);
            maps.closure.insert(iface_display.to_ascii_lowercase());
            maps.closure.extend(iface_closure);
            for (key, sig) in iface_methods {
                maps.iface_methods.entry(key).or_insert(sig);
            }
            for (key, const_info) in iface_consts {
                maps.iface_consts.entry(key).or_insert(const_info);
            }
        }

        // Parent class.
        if decl.kind == ClassKind::Class {
            if decl.extends.len() > 1 {
                self.error(
                    &scope,
                    decl.line,
                    format!("Class `{display}` may extend only one class"),
                );
            }
            if let Some(parent_name) = decl.extends.first() {
                if let Some(fqn) = self.fq_class_name(&scope, parent_name, true) {
                    match self.registry.get_class(&fqn) {
                        None => {
                            self.error(
                                &scope,
                                parent_name.line,
                                format!("Undefined class `{fqn}`"),
                            );
                        }
                        Some(pid) => {
                            self.init_class(pid);
                            let (kind, is_final, parent_display, methods, props, consts, closure) = {
                                let parent = self.registry.class(pid);
                                (
                                    parent.kind,
                                    parent.is_final,
                                    parent.name.clone(),
                                    parent.methods.clone(),
                                    parent.properties.clone(),
                                    parent.constants.clone(),
                                    parent.interface_closure.clone(),
                                )
                            };
                            if is_final {
                                self.error(
                                    &scope,
                                    parent_name.line,
                                    format!("Cannot extend final class `{parent_display}`"),
                                );
                            }
                            if kind != ClassKind::Class {
                                self.error(
                                    &scope,
                                    parent_name.line,
                                    format!("Cannot extend `{parent_display}` because it is not a class"),
                                );
                            } else {
                                parent_id = Some(pid);
                                maps.parent_methods = methods;
                                maps.parent_props = props;
                                maps.parent_consts = consts;
                                maps.closure.extend(closure);
                            }
                        }
                    }
                }
            }
        }

        // Enum backing type.
        let mut enum_backing = None;
        if decl.kind == ClassKind::Enum {
            if let Some(backing_expr) = &decl.enum_backing {
                let backing = self.resolve_type(&scope, backing_expr, true);
                if !backing.is_named("int") && !backing.is_named("string") {
                    let rendered = type_to_string(&backing, false);
                    self.error(
                        &scope,
                        decl.line,
                        format!(
                            "Enum `{display}` backing type must be `int` or `string`, \
                             `{rendered}` given"
                        ),
                    );
                }
                enum_backing = Some(backing);
            }
        }

        // Body statements in source order; trait uses are collected and
        // applied afterwards.
        let mut trait_uses: Vec<&UseTrait> = Vec::new();
        for member in &decl.members {
            match member {
                ClassMember::Properties(group) => {
                    self.resolve_prop_group(&scope, &decl, &display, group, &mut maps);
                }
                ClassMember::Constants(group) => {
                    self.resolve_const_group(&scope, &decl, &display, group, &mut maps);
                }
                ClassMember::Method(method) => {
                    self.resolve_method(&scope, id, &decl, &display, method, &mut maps);
                }
                ClassMember::EnumCase(case) => {
                    self.resolve_enum_case(&scope, &decl, &display, case, &enum_backing, &mut maps);
                }
                ClassMember::UseTrait(use_trait) => trait_uses.push(use_trait),
            }
        }

        // Traits.
        for use_trait in &trait_uses {
            self.resolve_trait_use(&scope, &display, use_trait, &mut trait_ids, &mut maps);
        }

        // Precedence cascade.
        let mut methods = std::mem::take(&mut maps.iface_methods);
        methods.extend(std::mem::take(&mut maps.parent_methods));
        methods.extend(std::mem::take(&mut maps.trait_methods));
        methods.extend(std::mem::take(&mut maps.own_methods));
        let mut constants = std::mem::take(&mut maps.iface_consts);
        constants.extend(std::mem::take(&mut maps.parent_consts));
        constants.extend(std::mem::take(&mut maps.trait_consts));
        constants.extend(std::mem::take(&mut maps.own_consts));
        let mut properties = std::mem::take(&mut maps.parent_props);
        properties.extend(std::mem::take(&mut maps.trait_props));
        properties.extend(std::mem::take(&mut maps.own_props));
        let mut closure = std::mem::take(&mut maps.closure);

        if methods.contains_key("__tostring") {
            closure.insert("stringable".to_string());
        }

        // Enums implement the enum interfaces and inherit their surface.
        if decl.kind == ClassKind::Enum {
            let enum_iface = if enum_backing.is_some() {
                "BackedEnum"
            } else {
                "UnitEnum"
            };
            closure.insert("unitenum".to_string());
            if enum_backing.is_some() {
                closure.insert("backedenum".to_string());
            }
            if let Some(iid) = self.registry.get_class(enum_iface) {
                let (iface_methods, iface_props) = {
                    let iface = self.registry.class(iid);
                    (iface.methods.clone(), iface.properties.clone())
                };
                for (key, sig) in iface_methods {
                    methods.entry(key).or_insert(sig);
                }
                for (key, prop) in iface_props {
                    properties.entry(key).or_insert(prop);
                }
            }
            if let Some(backing) = &enum_backing {
                properties.insert(
                    "value".to_string(),
                    PropInfo {
                        name: "value".to_string(),
                        ty: Some(backing.clone()),
                        modifiers: modifier::PUBLIC | modifier::READONLY,
                        has_default: false,
                    },
                );
            }
        }

        // A concrete class must implement every abstract method it carries.
        let is_concrete = matches!(decl.kind, ClassKind::Class | ClassKind::Enum)
            && !decl.is_abstract;
        if is_concrete {
            let mut abstract_names: Vec<&String> = methods
                .iter()
                .filter(|(_, sig)| sig.is_abstract)
                .map(|(key, _)| key)
                .collect();
            abstract_names.sort();
            let pending: Vec<String> = abstract_names
                .iter()
                .map(|key| methods[*key].qualified_name.clone())
                .collect();
            for qualified in pending {
                self.error(
                    &scope,
                    decl.line,
                    format!(
                        "Class `{display}` contains abstract method `{qualified}` and must \
                         implement it or be declared abstract"
                    ),
                );
            }
        }

        let info = self.registry.class_mut(id);
        info.parent = parent_id;
        info.interfaces = interface_ids;
        info.traits = trait_ids;
        info.methods = methods;
        info.properties = properties;
        info.constants = constants;
        info.interface_closure = closure;
        info.enum_backing = enum_backing;
        info.initialized = true;
        self.initializing.remove(&id);
    }

    fn resolve_prop_group(
        &mut self,
        scope: &Scope,
        decl: &ClassDecl,
        display: &str,
        group: &PropGroup,
        maps: &mut MemberMaps,
    ) {
        if decl.kind == ClassKind::Interface {
            self.error(
                scope,
                group.line,
                format!("Interface `{display}` may not include properties"),
            );
            return;
        }
        let hint = group
            .hint
            .as_ref()
            .map(|hint| self.resolve_type(scope, hint, true));
        let mut modifiers = visibility_bits(group.modifiers.visibility);
        if group.modifiers.is_static {
            modifiers |= modifier::STATIC;
        }
        if group.modifiers.is_readonly {
            modifiers |= modifier::READONLY;
        }
        for entry in &group.entries {
            if group.modifiers.is_readonly && group.hint.is_none() {
                self.error(
                    scope,
                    entry.line,
                    format!("Readonly property `{display}::${}` must have a type", entry.name),
                );
            }
            if group.modifiers.is_readonly && entry.default.is_some() {
                self.error(
                    scope,
                    entry.line,
                    format!(
                        "Readonly property `{display}::${}` cannot have a default value",
                        entry.name
                    ),
                );
            }
            if let (Some(default), Some(hint_ty)) = (&entry.default, &hint) {
                if let Some(value_ty) = literal_type(default) {
                    if !set_subtype(
                        &TypeSet::of(value_ty.clone()),
                        &TypeSet::of(hint_ty.clone()),
                        &self.registry,
                    ) {
                        let value_str = type_to_string(&value_ty, false);
                        let hint_str = type_to_string(hint_ty, false);
                        self.error(
                            scope,
                            entry.line,
                            format!(
                                "Default value type `{value_str}` is incompatible with the type \
                                 hint `{hint_str}` of property `${}`",
                                entry.name
                            ),
                        );
                    }
                }
            }
            if maps.own_props.contains_key(&entry.name) {
                self.error(
                    scope,
                    entry.line,
                    format!("Cannot redeclare property `{display}::${}`", entry.name),
                );
                continue;
            }
            maps.own_props.insert(
                entry.name.clone(),
                PropInfo {
                    name: entry.name.clone(),
                    ty: hint.clone(),
                    modifiers,
                    has_default: entry.default.is_some(),
                },
            );
        }
    }

    fn resolve_const_group(
        &mut self,
        scope: &Scope,
        _decl: &ClassDecl,
        display: &str,
        group: &ConstGroup,
        maps: &mut MemberMaps,
    ) {
        let hint = group
            .hint
            .as_ref()
            .map(|hint| self.resolve_type(scope, hint, true));
        let mut modifiers = visibility_bits(group.modifiers.visibility);
        if group.modifiers.is_final {
            modifiers |= modifier::FINAL;
        }
        for entry in &group.entries {
            let value_ty = literal_type(&entry.value);
            if let (Some(value_ty), Some(hint_ty)) = (&value_ty, &hint) {
                if !set_subtype(
                    &TypeSet::of(value_ty.clone()),
                    &TypeSet::of(hint_ty.clone()),
                    &self.registry,
                ) {
                    let value_str = type_to_string(value_ty, false);
                    let hint_str = type_to_string(hint_ty, false);
                    self.error(
                        scope,
                        entry.line,
                        format!(
                            "Value type `{value_str}` is incompatible with the type hint \
                             `{hint_str}` of constant `{}`",
                            entry.name
                        ),
                    );
                }
            }
            if maps.own_consts.contains_key(&entry.name) {
                self.error(
                    scope,
                    entry.line,
                    format!("Cannot redeclare constant `{display}::{}`", entry.name),
                );
                continue;
            }
            maps.own_consts.insert(
                entry.name.clone(),
                ConstInfo {
                    name: entry.name.clone(),
                    ty: hint.clone().or(value_ty),
                    modifiers,
                },
            );
        }
    }

    fn resolve_method(
        &mut self,
        scope: &Scope,
        id: ClassId,
        decl: &ClassDecl,
        display: &str,
        method: &Rc<FunctionDecl>,
        maps: &mut MemberMaps,
    ) {
        let name = &method.name;
        let lower = name.to_ascii_lowercase();
        let in_interface = decl.kind == ClassKind::Interface;

        if method.modifiers.is_abstract {
            if method.body.is_some() {
                self.error(
                    scope,
                    method.line,
                    format!("Abstract method `{display}::{name}` cannot have a body"),
                );
            }
            if method.modifiers.visibility == Some(Visibility::Private) {
                self.error(
                    scope,
                    method.line,
                    format!("Abstract method `{display}::{name}` cannot be private"),
                );
            }
            if in_interface {
                self.error(
                    scope,
                    method.line,
                    format!("Interface method `{display}::{name}` must not be declared abstract"),
                );
            }
        }
        if in_interface {
            if matches!(
                method.modifiers.visibility,
                Some(Visibility::Protected) | Some(Visibility::Private)
            ) {
                self.error(
                    scope,
                    method.line,
                    format!("Interface method `{display}::{name}` must be public"),
                );
            }
            if method.body.is_some() {
                self.error(
                    scope,
                    method.line,
                    format!("Interface method `{display}::{name}` cannot have a body"),
                );
            }
        }
        if let Some(inherited) = maps.parent_methods.get(&lower) {
            if inherited.modifiers & modifier::FINAL != 0 {
                let inherited_name = inherited.qualified_name.clone();
                self.error(
                    scope,
                    method.line,
                    format!("Cannot override final method `{inherited_name}`"),
                );
            }
        }

        let mut bits = visibility_bits(method.modifiers.visibility);
        if method.modifiers.is_static {
            bits |= modifier::STATIC;
        }
        if method.modifiers.is_final {
            bits |= modifier::FINAL;
        }
        if method.modifiers.is_abstract || in_interface {
            bits |= modifier::ABSTRACT;
        }
        let sig = self.build_signature(
            scope,
            &format!("{display}::{name}"),
            &method.params,
            method.return_type.as_ref(),
            method.body.is_some(),
            method.has_yield,
            bits,
            Some(id),
            method.line,
        );

        if let Some(iface_sig) = maps.iface_methods.get(&lower).cloned() {
            self.check_interface_conformance(scope, name, method.line, &sig, &iface_sig);
        }

        if lower == "__construct" {
            for (index, param) in method.params.iter().enumerate() {
                let Some(visibility) = param.promotion else {
                    continue;
                };
                let mut prop_bits = visibility_bits(Some(visibility));
                if param.readonly {
                    prop_bits |= modifier::READONLY;
                }
                if maps.own_props.contains_key(&param.name) {
                    self.error(
                        scope,
                        param.line,
                        format!("Cannot redeclare property `{display}::${}`", param.name),
                    );
                    continue;
                }
                maps.own_props.insert(
                    param.name.clone(),
                    PropInfo {
                        name: param.name.clone(),
                        ty: sig.parameters.get(index).and_then(|p| p.ty.clone()),
                        modifiers: prop_bits,
                        has_default: param.default.is_some(),
                    },
                );
            }
        }

        maps.own_methods.insert(lower, sig);
    }

    /// Cross-check a method against the interface definition of the same
    /// name: modifiers (ignoring abstract), parameter count and types, and
    /// return type. Types compare by canonical sorted rendering; a variadic
    /// parameter absorbs the remaining tail.
    fn check_interface_conformance(
        &mut self,
        scope: &Scope,
        name: &str,
        line: u32,
        sig: &FunctionSig,
        iface_sig: &FunctionSig,
    ) {
        if (sig.modifiers ^ iface_sig.modifiers) & !modifier::ABSTRACT != 0 {
            self.error(
                scope,
                line,
                format!(
                    "Method `{name}` has different modifiers compared to the definition in the \
                     interface"
                ),
            );
        }

        let hint_str = |ty: &Option<Ty>| {
            ty.as_ref()
                .map(|ty| type_to_string(ty, true))
                .unwrap_or_default()
        };

        let mut index = 0;
        loop {
            let impl_param = sig.parameters.get(index);
            let iface_param = iface_sig.parameters.get(index);
            if impl_param.map(|p| p.variadic).unwrap_or(false)
                || iface_param.map(|p| p.variadic).unwrap_or(false)
            {
                break;
            }
            match (impl_param, iface_param) {
                (Some(impl_param), Some(iface_param)) => {
                    if hint_str(&impl_param.ty) != hint_str(&iface_param.ty) {
                        self.error(
                            scope,
                            line,
                            format!(
                                "Method `{name}` has different parameter types compared to the \
                                 definition in the interface"
                            ),
                        );
                        break;
                    }
                }
                (Some(impl_param), None) => {
                    // Additional parameters are fine while they stay optional.
                    if !impl_param.optional {
                        self.error(
                            scope,
                            line,
                            format!(
                                "Method `{name}` has a different number of parameters compared \
                                 to the definition in the interface"
                            ),
                        );
                    }
                    break;
                }
                (None, Some(_)) => {
                    self.error(
                        scope,
                        line,
                        format!(
                            "Method `{name}` has a different number of parameters compared to \
                             the definition in the interface"
                        ),
                    );
                    break;
                }
                (None, None) => break,
            }
            index += 1;
        }

        if hint_str(&sig.return_type) != hint_str(&iface_sig.return_type) {
            self.error(
                scope,
                line,
                format!(
                    "Method `{name}` has a different return type compared to the definition in \
                     the interface"
                ),
            );
        }
    }

    fn resolve_enum_case(
        &mut self,
        scope: &Scope,
        decl: &ClassDecl,
        display: &str,
        case: &EnumCase,
        enum_backing: &Option<Ty>,
        maps: &mut MemberMaps,
    ) {
        if decl.kind != ClassKind::Enum {
            self.error(
                scope,
                case.line,
                format!("Enum case `{}` outside of an enum", case.name),
            );
            return;
        }
        let backed = enum_backing.is_some();
        match (&case.value, backed) {
            (None, true) => {
                self.error(
                    scope,
                    case.line,
                    format!(
                        "Case `{}` of backed enum `{display}` must have a value",
                        case.name
                    ),
                );
            }
            (Some(_), false) => {
                self.error(
                    scope,
                    case.line,
                    format!(
                        "Case `{}` of non-backed enum `{display}` cannot have a value",
                        case.name
                    ),
                );
            }
            (Some(value), true) => {
                if let (Some(value_ty), Some(backing)) = (literal_type(value), enum_backing) {
                    if !set_subtype(
                        &TypeSet::of(value_ty.clone()),
                        &TypeSet::of(backing.clone()),
                        &self.registry,
                    ) {
                        let value_str = type_to_string(&value_ty, false);
                        let backing_str = type_to_string(backing, false);
                        self.error(
                            scope,
                            case.line,
                            format!(
                                "Enum case value type `{value_str}` is incompatible with the \
                                 backing type `{backing_str}`"
                            ),
                        );
                    }
                }
            }
            (None, false) => {}
        }
        if maps.own_consts.contains_key(&case.name) {
            self.error(
                scope,
                case.line,
                format!("Cannot redeclare case `{display}::{}`", case.name),
            );
            return;
        }
        maps.own_consts.insert(
            case.name.clone(),
            ConstInfo {
                name: case.name.clone(),
                ty: Some(Ty::named(display)),
                modifiers: modifier::PUBLIC,
            },
        );
    }

    fn resolve_trait_use(
        &mut self,
        scope: &Scope,
        display: &str,
        use_trait: &UseTrait,
        trait_ids: &mut Vec<ClassId>,
        maps: &mut MemberMaps,
    ) {
        let mut resolved: Vec<(String, ClassId)> = Vec::new();
        for name in &use_trait.traits {
            let Some(fqn) = self.fq_class_name(scope, name, true) else {
                continue;
            };
            let Some(tid) = self.registry.get_class(&fqn) else {
                self.error(scope, name.line, format!("Undefined trait `{fqn}`"));
                continue;
            };
            self.init_class(tid);
            let (kind, trait_display) = {
                let info = self.registry.class(tid);
                (info.kind, info.name.clone())
            };
            if kind != ClassKind::Trait {
                self.error(scope, name.line, format!("`{trait_display}` is not a trait"));
                continue;
            }
            trait_ids.push(tid);
            resolved.push((trait_display.to_ascii_lowercase(), tid));
        }

        // `insteadof` exclusions: (trait, method) pairs to skip.
        let mut skip: FxHashSet<(String, String)> = FxHashSet::default();
        for adaptation in &use_trait.adaptations {
            if let TraitAdaptation::InsteadOf {
                method, excluded, ..
            } = adaptation
            {
                for name in excluded {
                    if let Some(fqn) = self.fq_class_name(scope, name, false) {
                        skip.insert((fqn.to_ascii_lowercase(), method.to_ascii_lowercase()));
                    }
                }
            }
        }

        // Merge, trait-collision aware.
        let mut contributed: FxHashMap<String, String> = FxHashMap::default();
        for (trait_lower, tid) in &resolved {
            let (trait_methods, trait_props, trait_consts) = {
                let info = self.registry.class(*tid);
                (
                    info.methods.clone(),
                    info.properties.clone(),
                    info.constants.clone(),
                )
            };
            for (key, sig) in trait_methods {
                if skip.contains(&(trait_lower.clone(), key.clone())) {
                    continue;
                }
                if maps.own_methods.contains_key(&key) {
                    continue;
                }
                if let Some(previous) = contributed.get(&key) {
                    if previous != trait_lower {
                        self.error(
                            scope,
                            use_trait.line,
                            format!(
                                "Trait method `{key}` collides with a method from another trait \
                                 in class `{display}`"
                            ),
                        );
                    }
                    continue;
                }
                contributed.insert(key.clone(), trait_lower.clone());
                maps.trait_methods.insert(key, sig);
            }
            for (key, prop) in trait_props {
                maps.trait_props.entry(key).or_insert(prop);
            }
            for (key, const_info) in trait_consts {
                maps.trait_consts.entry(key).or_insert(const_info);
            }
        }

        // `as` adaptations: re-expose under a new name or visibility.
        for adaptation in &use_trait.adaptations {
            let TraitAdaptation::Alias {
                trait_name,
                method,
                alias,
                visibility,
                line,
            } = adaptation
            else {
                continue;
            };
            let method_lower = method.to_ascii_lowercase();
            let source = match trait_name {
                Some(name) => self
                    .fq_class_name(scope, name, false)
                    .and_then(|fqn| self.registry.get_class(&fqn))
                    .and_then(|tid| self.registry.class(tid).methods.get(&method_lower).cloned()),
                None => resolved.iter().find_map(|(_, tid)| {
                    self.registry
                        .class(*tid)
                        .methods
                        .get(&method_lower)
                        .cloned()
                }),
            };
            let Some(source) = source else {
                self.error(
                    scope,
                    *line,
                    format!("Method `{method}` was not found in the used traits"),
                );
                continue;
            };
            let mut adapted = (*source).clone();
            if let Some(visibility) = visibility {
                adapted.modifiers = (adapted.modifiers & !modifier::VISIBILITY_MASK)
                    | visibility_bits(Some(*visibility));
            }
            match alias {
                Some(alias) => {
                    adapted.qualified_name = format!("{display}::{alias}");
                    maps.trait_methods
                        .insert(alias.to_ascii_lowercase(), Rc::new(adapted));
                }
                None => {
                    maps.trait_methods.insert(method_lower, Rc::new(adapted));
                }
            }
        }
    }
}

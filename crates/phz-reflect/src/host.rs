//! Host environment: the runtime the checker embeds.
//!
//! A curated table of builtin interfaces, classes, functions and constants,
//! expressed in the same `ClassInfo`/`FunctionSig` shapes user-defined code
//! uses. Installed once into a fresh registry; install order matters only in
//! that parents and interfaces come before their users.

use rustc_hash::{FxHashMap, FxHashSet};
use std::rc::Rc;

use phz_parser::ClassKind;
use phz_types::Ty;

use crate::{
    modifier, ClassInfo, ClassOrigin, ConstDef, FuncEntry, FuncOrigin, FunctionSig, Parameter,
    PropInfo, Registry,
};

pub fn install(registry: &mut Registry) {
    install_interfaces(registry);
    install_classes(registry);
    install_functions(registry);
    install_constants(registry);
}

/// Parse a compact type spec: `"int"`, `"?Throwable"`, `"int|false"`.
fn ty(spec: &str) -> Ty {
    if let Some(rest) = spec.strip_prefix('?') {
        return Ty::nullable(rest);
    }
    if spec.contains('|') {
        Ty::union(spec.split('|').map(Ty::named).collect())
    } else {
        Ty::named(spec)
    }
}

fn p(name: &str, spec: &str) -> Parameter {
    Parameter::new(name, Some(ty(spec)))
}

fn p_opt(name: &str, spec: &str) -> Parameter {
    Parameter {
        optional: true,
        has_default: true,
        ..Parameter::new(name, Some(ty(spec)))
    }
}

fn p_ref(name: &str, spec: &str) -> Parameter {
    Parameter {
        by_ref: true,
        ..Parameter::new(name, Some(ty(spec)))
    }
}

fn p_ref_opt(name: &str, spec: &str) -> Parameter {
    Parameter {
        by_ref: true,
        optional: true,
        has_default: true,
        ..Parameter::new(name, Some(ty(spec)))
    }
}

fn p_variadic(name: &str, spec: &str) -> Parameter {
    Parameter {
        variadic: true,
        optional: true,
        ..Parameter::new(name, Some(ty(spec)))
    }
}

fn sig(qualified: &str, params: Vec<Parameter>, ret: Option<&str>, mods: u32) -> Rc<FunctionSig> {
    let is_variadic = params.iter().any(|param| param.variadic);
    Rc::new(FunctionSig {
        qualified_name: qualified.to_string(),
        parameters: params,
        return_type: ret.map(ty),
        is_variadic,
        is_generator: false,
        is_abstract: mods & modifier::ABSTRACT != 0,
        modifiers: mods,
        declaring_class: None,
        is_return_required: false,
        line: 0,
    })
}

fn method(class: &str, name: &str, params: Vec<Parameter>, ret: Option<&str>) -> Rc<FunctionSig> {
    sig(
        &format!("{class}::{name}"),
        params,
        ret,
        modifier::PUBLIC,
    )
}

fn abstract_method(
    class: &str,
    name: &str,
    params: Vec<Parameter>,
    ret: Option<&str>,
) -> Rc<FunctionSig> {
    sig(
        &format!("{class}::{name}"),
        params,
        ret,
        modifier::PUBLIC | modifier::ABSTRACT,
    )
}

fn static_method(
    class: &str,
    name: &str,
    params: Vec<Parameter>,
    ret: Option<&str>,
) -> Rc<FunctionSig> {
    sig(
        &format!("{class}::{name}"),
        params,
        ret,
        modifier::PUBLIC | modifier::STATIC,
    )
}

fn blank_class(name: &str, kind: ClassKind) -> ClassInfo {
    ClassInfo {
        name: name.to_string(),
        kind,
        is_abstract: false,
        is_final: false,
        parent: None,
        interfaces: Vec::new(),
        traits: Vec::new(),
        properties: FxHashMap::default(),
        constants: FxHashMap::default(),
        methods: FxHashMap::default(),
        enum_backing: None,
        interface_closure: FxHashSet::default(),
        initialized: true,
        poisoned: false,
        origin: ClassOrigin::Host,
    }
}

/// Empty initialized interface, for tests that need a registered name.
pub fn marker_interface(name: &str) -> ClassInfo {
    blank_class(name, ClassKind::Interface)
}

/// Register a host class/interface, flattening parent and interface members
/// the same way the class resolver does for user code.
fn add_host_class(
    registry: &mut Registry,
    name: &str,
    kind: ClassKind,
    parent: Option<&str>,
    interfaces: &[&str],
    methods: Vec<Rc<FunctionSig>>,
) {
    let mut info = blank_class(name, kind);
    if let Some(parent_name) = parent {
        if let Some(pid) = registry.get_class(parent_name) {
            let parent_info = registry.class(pid);
            info.parent = Some(pid);
            info.interface_closure
                .extend(parent_info.interface_closure.iter().cloned());
            info.methods.extend(
                parent_info
                    .methods
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone())),
            );
            info.properties.extend(
                parent_info
                    .properties
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone())),
            );
            info.constants.extend(
                parent_info
                    .constants
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone())),
            );
        }
    }
    for interface in interfaces {
        if let Some(iid) = registry.get_class(interface) {
            let iface = registry.class(iid);
            info.interface_closure
                .insert(iface.name.to_ascii_lowercase());
            info.interface_closure
                .extend(iface.interface_closure.iter().cloned());
            let inherited: Vec<_> = iface
                .methods
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            info.interfaces.push(iid);
            for (key, sig) in inherited {
                info.methods.entry(key).or_insert(sig);
            }
        }
    }
    for sig in methods {
        let key = sig
            .qualified_name
            .rsplit("::")
            .next()
            .unwrap_or("")
            .to_ascii_lowercase();
        info.methods.insert(key, sig);
    }
    if info.methods.contains_key("__tostring") {
        info.interface_closure.insert("stringable".to_string());
    }
    let _ = registry.add_class(info);
}

fn install_interfaces(registry: &mut Registry) {
    add_host_class(
        registry,
        "Stringable",
        ClassKind::Interface,
        None,
        &[],
        vec![abstract_method("Stringable", "__toString", vec![], Some("string"))],
    );
    add_host_class(registry, "Traversable", ClassKind::Interface, None, &[], vec![]);
    add_host_class(
        registry,
        "Iterator",
        ClassKind::Interface,
        None,
        &["Traversable"],
        vec![
            abstract_method("Iterator", "current", vec![], Some("mixed")),
            abstract_method("Iterator", "key", vec![], Some("mixed")),
            abstract_method("Iterator", "next", vec![], Some("void")),
            abstract_method("Iterator", "rewind", vec![], Some("void")),
            abstract_method("Iterator", "valid", vec![], Some("bool")),
        ],
    );
    add_host_class(
        registry,
        "IteratorAggregate",
        ClassKind::Interface,
        None,
        &["Traversable"],
        vec![abstract_method(
            "IteratorAggregate",
            "getIterator",
            vec![],
            Some("Traversable"),
        )],
    );
    add_host_class(
        registry,
        "ArrayAccess",
        ClassKind::Interface,
        None,
        &[],
        vec![
            abstract_method("ArrayAccess", "offsetExists", vec![p("offset", "mixed")], Some("bool")),
            abstract_method("ArrayAccess", "offsetGet", vec![p("offset", "mixed")], Some("mixed")),
            abstract_method(
                "ArrayAccess",
                "offsetSet",
                vec![p("offset", "mixed"), p("value", "mixed")],
                Some("void"),
            ),
            abstract_method("ArrayAccess", "offsetUnset", vec![p("offset", "mixed")], Some("void")),
        ],
    );
    add_host_class(
        registry,
        "Countable",
        ClassKind::Interface,
        None,
        &[],
        vec![abstract_method("Countable", "count", vec![], Some("int"))],
    );
    add_host_class(
        registry,
        "JsonSerializable",
        ClassKind::Interface,
        None,
        &[],
        vec![abstract_method("JsonSerializable", "jsonSerialize", vec![], Some("mixed"))],
    );
    add_host_class(
        registry,
        "Throwable",
        ClassKind::Interface,
        None,
        &["Stringable"],
        vec![
            abstract_method("Throwable", "getMessage", vec![], Some("string")),
            abstract_method("Throwable", "getCode", vec![], Some("int")),
            abstract_method("Throwable", "getFile", vec![], Some("string")),
            abstract_method("Throwable", "getLine", vec![], Some("int")),
            abstract_method("Throwable", "getTrace", vec![], Some("array")),
            abstract_method("Throwable", "getTraceAsString", vec![], Some("string")),
            abstract_method("Throwable", "getPrevious", vec![], Some("?Throwable")),
        ],
    );
    add_host_class(
        registry,
        "UnitEnum",
        ClassKind::Interface,
        None,
        &[],
        vec![static_method("UnitEnum", "cases", vec![], Some("array"))],
    );
    add_host_class(
        registry,
        "BackedEnum",
        ClassKind::Interface,
        None,
        &["UnitEnum"],
        vec![
            static_method("BackedEnum", "from", vec![p("value", "int|string")], Some("static")),
            static_method(
                "BackedEnum",
                "tryFrom",
                vec![p("value", "int|string")],
                Some("static"),
            ),
        ],
    );
}

fn throwable_impl_methods(class: &str) -> Vec<Rc<FunctionSig>> {
    vec![
        method(
            class,
            "__construct",
            vec![
                p_opt("message", "string"),
                p_opt("code", "int"),
                p_opt("previous", "?Throwable"),
            ],
            None,
        ),
        method(class, "getMessage", vec![], Some("string")),
        method(class, "getCode", vec![], Some("int")),
        method(class, "getFile", vec![], Some("string")),
        method(class, "getLine", vec![], Some("int")),
        method(class, "getTrace", vec![], Some("array")),
        method(class, "getTraceAsString", vec![], Some("string")),
        method(class, "getPrevious", vec![], Some("?Throwable")),
        method(class, "__toString", vec![], Some("string")),
    ]
}

fn install_classes(registry: &mut Registry) {
    add_host_class(registry, "stdClass", ClassKind::Class, None, &[], vec![]);
    add_host_class(
        registry,
        "Closure",
        ClassKind::Class,
        None,
        &[],
        vec![
            method(
                "Closure",
                "bindTo",
                vec![p("newThis", "?object"), p_opt("newScope", "object|string|null")],
                Some("?Closure"),
            ),
            static_method(
                "Closure",
                "bind",
                vec![
                    p("closure", "Closure"),
                    p("newThis", "?object"),
                    p_opt("newScope", "object|string|null"),
                ],
                Some("?Closure"),
            ),
            method(
                "Closure",
                "call",
                vec![p("newThis", "object"), p_variadic("args", "mixed")],
                Some("mixed"),
            ),
            static_method(
                "Closure",
                "fromCallable",
                vec![p("callback", "callable")],
                Some("Closure"),
            ),
        ],
    );
    add_host_class(
        registry,
        "Generator",
        ClassKind::Class,
        None,
        &["Iterator"],
        vec![
            method("Generator", "current", vec![], Some("mixed")),
            method("Generator", "key", vec![], Some("mixed")),
            method("Generator", "next", vec![], Some("void")),
            method("Generator", "rewind", vec![], Some("void")),
            method("Generator", "valid", vec![], Some("bool")),
            method("Generator", "send", vec![p("value", "mixed")], Some("mixed")),
            method("Generator", "getReturn", vec![], Some("mixed")),
        ],
    );
    add_host_class(
        registry,
        "Exception",
        ClassKind::Class,
        None,
        &["Throwable"],
        throwable_impl_methods("Exception"),
    );
    add_host_class(
        registry,
        "Error",
        ClassKind::Class,
        None,
        &["Throwable"],
        throwable_impl_methods("Error"),
    );
    for (name, parent) in [
        ("TypeError", "Error"),
        ("ValueError", "Error"),
        ("ArgumentCountError", "TypeError"),
        ("ArithmeticError", "Error"),
        ("DivisionByZeroError", "ArithmeticError"),
        ("ErrorException", "Exception"),
        ("RuntimeException", "Exception"),
        ("LogicException", "Exception"),
        ("InvalidArgumentException", "LogicException"),
        ("DomainException", "LogicException"),
        ("RangeException", "RuntimeException"),
        ("OutOfRangeException", "LogicException"),
        ("OutOfBoundsException", "RuntimeException"),
        ("LengthException", "LogicException"),
        ("UnexpectedValueException", "RuntimeException"),
        ("JsonException", "Exception"),
    ] {
        add_host_class(registry, name, ClassKind::Class, Some(parent), &[], vec![]);
    }
    add_host_class(
        registry,
        "ArrayIterator",
        ClassKind::Class,
        None,
        &["Iterator", "ArrayAccess", "Countable"],
        vec![
            method("ArrayIterator", "__construct", vec![p_opt("array", "array")], None),
            method("ArrayIterator", "current", vec![], Some("mixed")),
            method("ArrayIterator", "key", vec![], Some("mixed")),
            method("ArrayIterator", "next", vec![], Some("void")),
            method("ArrayIterator", "rewind", vec![], Some("void")),
            method("ArrayIterator", "valid", vec![], Some("bool")),
            method("ArrayIterator", "count", vec![], Some("int")),
            method("ArrayIterator", "offsetExists", vec![p("key", "mixed")], Some("bool")),
            method("ArrayIterator", "offsetGet", vec![p("key", "mixed")], Some("mixed")),
            method(
                "ArrayIterator",
                "offsetSet",
                vec![p("key", "mixed"), p("value", "mixed")],
                Some("void"),
            ),
            method("ArrayIterator", "offsetUnset", vec![p("key", "mixed")], Some("void")),
        ],
    );
    add_host_class(
        registry,
        "ArrayObject",
        ClassKind::Class,
        None,
        &["IteratorAggregate", "ArrayAccess", "Countable"],
        vec![
            method("ArrayObject", "__construct", vec![p_opt("array", "array|object")], None),
            method("ArrayObject", "getIterator", vec![], Some("Iterator")),
            method("ArrayObject", "count", vec![], Some("int")),
            method("ArrayObject", "offsetExists", vec![p("key", "mixed")], Some("bool")),
            method("ArrayObject", "offsetGet", vec![p("key", "mixed")], Some("mixed")),
            method(
                "ArrayObject",
                "offsetSet",
                vec![p("key", "mixed"), p("value", "mixed")],
                Some("void"),
            ),
            method("ArrayObject", "offsetUnset", vec![p("key", "mixed")], Some("void")),
            method("ArrayObject", "getArrayCopy", vec![], Some("array")),
        ],
    );

    // Enum cases surface as instances carrying a readonly `name`.
    if let Some(id) = registry.get_class("UnitEnum") {
        let info = registry.class_mut(id);
        info.properties.insert(
            "name".to_string(),
            PropInfo {
                name: "name".to_string(),
                ty: Some(Ty::named("string")),
                modifiers: modifier::PUBLIC | modifier::READONLY,
                has_default: false,
            },
        );
    }
}

fn func(registry: &mut Registry, name: &str, params: Vec<Parameter>, ret: Option<&str>) {
    let entry = FuncEntry {
        name: name.to_string(),
        sig: Some(sig(name, params, ret, modifier::PUBLIC)),
        origin: FuncOrigin::Host,
    };
    let _ = registry.add_function(entry);
}

fn install_functions(registry: &mut Registry) {
    // String functions
    func(registry, "strlen", vec![p("string", "string")], Some("int"));
    func(
        registry,
        "substr",
        vec![p("string", "string"), p("offset", "int"), p_opt("length", "?int")],
        Some("string"),
    );
    func(
        registry,
        "strpos",
        vec![p("haystack", "string"), p("needle", "string"), p_opt("offset", "int")],
        Some("int|false"),
    );
    func(
        registry,
        "str_replace",
        vec![
            p("search", "array|string"),
            p("replace", "array|string"),
            p("subject", "string|array"),
            p_ref_opt("count", "int"),
        ],
        Some("string|array"),
    );
    func(
        registry,
        "str_contains",
        vec![p("haystack", "string"), p("needle", "string")],
        Some("bool"),
    );
    func(
        registry,
        "str_starts_with",
        vec![p("haystack", "string"), p("needle", "string")],
        Some("bool"),
    );
    func(
        registry,
        "str_ends_with",
        vec![p("haystack", "string"), p("needle", "string")],
        Some("bool"),
    );
    func(
        registry,
        "str_repeat",
        vec![p("string", "string"), p("times", "int")],
        Some("string"),
    );
    func(registry, "strtolower", vec![p("string", "string")], Some("string"));
    func(registry, "strtoupper", vec![p("string", "string")], Some("string"));
    func(registry, "ucfirst", vec![p("string", "string")], Some("string"));
    func(
        registry,
        "trim",
        vec![p("string", "string"), p_opt("characters", "string")],
        Some("string"),
    );
    func(
        registry,
        "ltrim",
        vec![p("string", "string"), p_opt("characters", "string")],
        Some("string"),
    );
    func(
        registry,
        "rtrim",
        vec![p("string", "string"), p_opt("characters", "string")],
        Some("string"),
    );
    func(
        registry,
        "sprintf",
        vec![p("format", "string"), p_variadic("values", "mixed")],
        Some("string"),
    );
    func(
        registry,
        "printf",
        vec![p("format", "string"), p_variadic("values", "mixed")],
        Some("int"),
    );
    func(
        registry,
        "implode",
        vec![p("separator", "string"), p("array", "array")],
        Some("string"),
    );
    func(
        registry,
        "explode",
        vec![p("separator", "string"), p("string", "string"), p_opt("limit", "int")],
        Some("array"),
    );
    func(
        registry,
        "number_format",
        vec![p("num", "float"), p_opt("decimals", "int")],
        Some("string"),
    );

    // Array functions
    func(
        registry,
        "count",
        vec![p("value", "Countable|array"), p_opt("mode", "int")],
        Some("int"),
    );
    func(
        registry,
        "in_array",
        vec![p("needle", "mixed"), p("haystack", "array"), p_opt("strict", "bool")],
        Some("bool"),
    );
    func(
        registry,
        "array_search",
        vec![p("needle", "mixed"), p("haystack", "array"), p_opt("strict", "bool")],
        Some("int|string|false"),
    );
    func(
        registry,
        "array_map",
        vec![p("callback", "?callable"), p("array", "array"), p_variadic("arrays", "array")],
        Some("array"),
    );
    func(
        registry,
        "array_filter",
        vec![p("array", "array"), p_opt("callback", "?callable"), p_opt("mode", "int")],
        Some("array"),
    );
    func(registry, "array_keys", vec![p("array", "array")], Some("array"));
    func(registry, "array_values", vec![p("array", "array")], Some("array"));
    func(registry, "array_merge", vec![p_variadic("arrays", "array")], Some("array"));
    func(
        registry,
        "array_key_exists",
        vec![p("key", "string|int"), p("array", "array")],
        Some("bool"),
    );
    func(
        registry,
        "array_push",
        vec![p_ref("array", "array"), p_variadic("values", "mixed")],
        Some("int"),
    );
    func(registry, "array_pop", vec![p_ref("array", "array")], Some("mixed"));
    func(registry, "array_shift", vec![p_ref("array", "array")], Some("mixed"));
    func(
        registry,
        "array_unshift",
        vec![p_ref("array", "array"), p_variadic("values", "mixed")],
        Some("int"),
    );
    func(
        registry,
        "array_slice",
        vec![
            p("array", "array"),
            p("offset", "int"),
            p_opt("length", "?int"),
            p_opt("preserve_keys", "bool"),
        ],
        Some("array"),
    );
    func(
        registry,
        "sort",
        vec![p_ref("array", "array"), p_opt("flags", "int")],
        Some("true"),
    );
    func(
        registry,
        "rsort",
        vec![p_ref("array", "array"), p_opt("flags", "int")],
        Some("true"),
    );
    func(
        registry,
        "ksort",
        vec![p_ref("array", "array"), p_opt("flags", "int")],
        Some("true"),
    );
    func(
        registry,
        "usort",
        vec![p_ref("array", "array"), p("callback", "callable")],
        Some("true"),
    );

    // Type inspection and conversion
    for name in [
        "is_string",
        "is_int",
        "is_float",
        "is_bool",
        "is_array",
        "is_object",
        "is_callable",
        "is_null",
        "is_numeric",
        "is_iterable",
    ] {
        func(registry, name, vec![p("value", "mixed")], Some("bool"));
    }
    func(
        registry,
        "intval",
        vec![p("value", "mixed"), p_opt("base", "int")],
        Some("int"),
    );
    func(registry, "floatval", vec![p("value", "mixed")], Some("float"));
    func(registry, "strval", vec![p("value", "mixed")], Some("string"));
    func(registry, "boolval", vec![p("value", "mixed")], Some("bool"));
    func(registry, "gettype", vec![p("value", "mixed")], Some("string"));
    func(registry, "get_class", vec![p("object", "object")], Some("string"));
    func(
        registry,
        "function_exists",
        vec![p("function", "string")],
        Some("bool"),
    );
    func(
        registry,
        "class_exists",
        vec![p("class", "string"), p_opt("autoload", "bool")],
        Some("bool"),
    );
    func(
        registry,
        "method_exists",
        vec![p("object_or_class", "object|string"), p("method", "string")],
        Some("bool"),
    );
    func(
        registry,
        "property_exists",
        vec![p("object_or_class", "object|string"), p("property", "string")],
        Some("bool"),
    );
    func(
        registry,
        "define",
        vec![p("constant_name", "string"), p("value", "mixed")],
        Some("bool"),
    );
    func(registry, "defined", vec![p("constant_name", "string")], Some("bool"));
    func(
        registry,
        "spl_autoload_register",
        vec![p("callback", "callable")],
        Some("bool"),
    );

    // Math
    func(registry, "abs", vec![p("num", "int|float")], Some("int|float"));
    func(registry, "max", vec![p_variadic("values", "mixed")], Some("mixed"));
    func(registry, "min", vec![p_variadic("values", "mixed")], Some("mixed"));
    func(
        registry,
        "round",
        vec![p("num", "int|float"), p_opt("precision", "int")],
        Some("float"),
    );
    func(registry, "floor", vec![p("num", "int|float")], Some("float"));
    func(registry, "ceil", vec![p("num", "int|float")], Some("float"));
    func(registry, "sqrt", vec![p("num", "int|float")], Some("float"));
    func(
        registry,
        "intdiv",
        vec![p("num1", "int"), p("num2", "int")],
        Some("int"),
    );
    func(
        registry,
        "rand",
        vec![p_opt("min", "int"), p_opt("max", "int")],
        Some("int"),
    );

    // Output and debugging
    func(registry, "var_dump", vec![p_variadic("values", "mixed")], Some("void"));
    func(
        registry,
        "print_r",
        vec![p("value", "mixed"), p_opt("return", "bool")],
        Some("string|true"),
    );

    // Encoding and filesystem
    func(
        registry,
        "json_encode",
        vec![p("value", "mixed"), p_opt("flags", "int"), p_opt("depth", "int")],
        Some("string|false"),
    );
    func(
        registry,
        "json_decode",
        vec![
            p("json", "string"),
            p_opt("associative", "?bool"),
            p_opt("depth", "int"),
            p_opt("flags", "int"),
        ],
        Some("mixed"),
    );
    func(
        registry,
        "file_get_contents",
        vec![p("filename", "string")],
        Some("string|false"),
    );
    func(
        registry,
        "file_put_contents",
        vec![p("filename", "string"), p("data", "mixed"), p_opt("flags", "int")],
        Some("int|false"),
    );
    func(registry, "file_exists", vec![p("filename", "string")], Some("bool"));
    func(
        registry,
        "dirname",
        vec![p("path", "string"), p_opt("levels", "int")],
        Some("string"),
    );
    func(
        registry,
        "basename",
        vec![p("path", "string"), p_opt("suffix", "string")],
        Some("string"),
    );
    func(registry, "realpath", vec![p("path", "string")], Some("string|false"));

    // PCRE
    func(
        registry,
        "preg_match",
        vec![
            p("pattern", "string"),
            p("subject", "string"),
            p_ref_opt("matches", "array"),
            p_opt("flags", "int"),
            p_opt("offset", "int"),
        ],
        Some("int|false"),
    );
    func(
        registry,
        "preg_replace",
        vec![
            p("pattern", "string|array"),
            p("replacement", "string|array"),
            p("subject", "string|array"),
            p_opt("limit", "int"),
            p_ref_opt("count", "int"),
        ],
        Some("string|array|null"),
    );
}

fn constant(registry: &mut Registry, name: &str, spec: &str) {
    registry.add_constant(ConstDef {
        name: name.to_string(),
        ty: Some(ty(spec)),
        value: None,
    });
}

fn install_constants(registry: &mut Registry) {
    constant(registry, "PHP_EOL", "string");
    constant(registry, "PHP_INT_MAX", "int");
    constant(registry, "PHP_INT_MIN", "int");
    constant(registry, "PHP_INT_SIZE", "int");
    constant(registry, "PHP_FLOAT_EPSILON", "float");
    constant(registry, "PHP_FLOAT_MAX", "float");
    constant(registry, "PHP_FLOAT_MIN", "float");
    constant(registry, "PHP_FLOAT_DIG", "int");
    constant(registry, "PHP_VERSION", "string");
    constant(registry, "PHP_MAJOR_VERSION", "int");
    constant(registry, "PHP_OS", "string");
    constant(registry, "PHP_OS_FAMILY", "string");
    constant(registry, "DIRECTORY_SEPARATOR", "string");
    constant(registry, "PATH_SEPARATOR", "string");
    constant(registry, "M_PI", "float");
    constant(registry, "M_E", "float");
    constant(registry, "E_ALL", "int");
    constant(registry, "E_ERROR", "int");
    constant(registry, "E_WARNING", "int");
    constant(registry, "E_NOTICE", "int");
    constant(registry, "E_DEPRECATED", "int");
    constant(registry, "E_STRICT", "int");
    constant(registry, "SORT_REGULAR", "int");
    constant(registry, "SORT_NUMERIC", "int");
    constant(registry, "SORT_STRING", "int");
    constant(registry, "COUNT_NORMAL", "int");
    constant(registry, "COUNT_RECURSIVE", "int");
    constant(registry, "JSON_PRETTY_PRINT", "int");
    constant(registry, "JSON_THROW_ON_ERROR", "int");
    constant(registry, "PREG_PATTERN_ORDER", "int");
    constant(registry, "PREG_SET_ORDER", "int");
    constant(registry, "STR_PAD_LEFT", "int");
    constant(registry, "STR_PAD_RIGHT", "int");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_install_is_idempotent_per_name() {
        let mut registry = Registry::with_host();
        let before = registry.class_count();
        install(&mut registry);
        assert_eq!(registry.class_count(), before);
    }

    #[test]
    fn exception_flattens_throwable() {
        let registry = Registry::with_host();
        let id = registry.get_class("exception").unwrap();
        let info = registry.class(id);
        assert!(info.implements("Throwable"));
        assert!(info.implements("Stringable"));
        assert!(info.method("getmessage").is_some());
        assert!(info.method("__tostring").is_some());
    }

    #[test]
    fn sort_takes_array_by_ref() {
        let registry = Registry::with_host();
        let id = registry.get_function("sort").unwrap();
        let sig = registry.function(id).sig.clone().unwrap();
        assert!(sig.parameters[0].by_ref);
        assert!(!sig.parameters[0].optional);
        assert!(sig.parameters[1].optional);
    }

    #[test]
    fn backed_enum_interface_present() {
        let registry = Registry::with_host();
        let id = registry.get_class("BackedEnum").unwrap();
        let info = registry.class(id);
        assert!(info.implements("UnitEnum"));
        assert!(info.method("from").is_some());
        assert!(info.method("tryfrom").is_some());
    }
}

//! Builtin functions and the fixed core-module table.
//!
//! Call resolution tries these tables before user functions: a builtin
//! matches by bare name, a core function matches when its module is
//! imported. Parameter type `"any"` is a wildcard; everything else is
//! compared against the argument's rendered type.

/// A function signature resolved without user code.
#[derive(Debug, Clone, Copy)]
pub struct FixedFn {
    pub name: &'static str,
    /// Rendered parameter types; `"any"` accepts every type.
    pub params: &'static [&'static str],
    /// Rendered return type; `"void"` for none.
    pub return_type: &'static str,
}

/// Functions callable without any import.
pub static BUILTIN_FUNCTIONS: &[FixedFn] = &[
    FixedFn {
        name: "print",
        params: &["any"],
        return_type: "void",
    },
    FixedFn {
        name: "printerr",
        params: &["any"],
        return_type: "void",
    },
    FixedFn {
        name: "assert",
        params: &["bool"],
        return_type: "void",
    },
    FixedFn {
        name: "str",
        params: &["any"],
        return_type: "str",
    },
    FixedFn {
        name: "panic",
        params: &["str"],
        return_type: "void",
    },
    FixedFn {
        name: "typeof",
        params: &["any"],
        return_type: "str",
    },
];

/// One core module and its overload table.
#[derive(Debug, Clone, Copy)]
pub struct CoreModule {
    pub name: &'static str,
    pub functions: &'static [FixedFn],
}

/// The fixed table of `Core.*` modules.
pub static CORE_MODULES: &[CoreModule] = &[
    CoreModule {
        name: "print",
        functions: &[
            FixedFn {
                name: "print",
                params: &["any"],
                return_type: "void",
            },
            FixedFn {
                name: "println",
                params: &["any"],
                return_type: "void",
            },
            FixedFn {
                name: "printerr",
                params: &["any"],
                return_type: "void",
            },
        ],
    },
    CoreModule {
        name: "read",
        functions: &[
            FixedFn {
                name: "read_str",
                params: &[],
                return_type: "str",
            },
            FixedFn {
                name: "read_i32",
                params: &[],
                return_type: "i32",
            },
            FixedFn {
                name: "read_f64",
                params: &[],
                return_type: "f64",
            },
        ],
    },
    CoreModule {
        name: "filesystem",
        functions: &[
            FixedFn {
                name: "read_file",
                params: &["str"],
                return_type: "str",
            },
            FixedFn {
                name: "write_file",
                params: &["str", "str"],
                return_type: "bool",
            },
            FixedFn {
                name: "file_exists",
                params: &["str"],
                return_type: "bool",
            },
        ],
    },
    CoreModule {
        name: "env",
        functions: &[
            FixedFn {
                name: "get_env",
                params: &["str"],
                return_type: "str",
            },
            FixedFn {
                name: "set_env",
                params: &["str", "str"],
                return_type: "bool",
            },
        ],
    },
    CoreModule {
        name: "system",
        functions: &[FixedFn {
            name: "system_command",
            params: &["str"],
            return_type: "i32",
        }],
    },
    CoreModule {
        name: "math",
        functions: &[
            FixedFn {
                name: "abs",
                params: &["i32"],
                return_type: "i32",
            },
            FixedFn {
                name: "sqrt",
                params: &["f64"],
                return_type: "f64",
            },
            FixedFn {
                name: "pow",
                params: &["f64", "f64"],
                return_type: "f64",
            },
        ],
    },
    CoreModule {
        name: "time",
        functions: &[FixedFn {
            name: "now",
            params: &[],
            return_type: "u64",
        }],
    },
];

pub fn builtin(name: &str) -> Option<&'static FixedFn> {
    BUILTIN_FUNCTIONS.iter().find(|fixed| fixed.name == name)
}

pub fn core_module(name: &str) -> Option<&'static CoreModule> {
    CORE_MODULES.iter().find(|module| module.name == name)
}

/// Find a function among the given imported core modules.
pub fn core_function(imported: &[String], name: &str) -> Option<(&'static str, FixedFn)> {
    for module_name in imported {
        if let Some(module) = core_module(module_name) {
            if let Some(function) = module.functions.iter().find(|f| f.name == name) {
                return Some((module.name, *function));
            }
        }
    }
    None
}

pub fn is_core_module(name: &str) -> bool {
    core_module(name).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_resolve_by_name() {
        assert!(builtin("print").is_some());
        assert!(builtin("assert").is_some());
        assert!(builtin("frobnicate").is_none());
    }

    #[test]
    fn core_functions_need_their_module_imported() {
        let imported = vec!["filesystem".to_string()];
        assert!(core_function(&imported, "read_file").is_some());
        assert!(core_function(&imported, "get_env").is_none());
    }

    #[test]
    fn known_core_modules() {
        assert!(is_core_module("print"));
        assert!(is_core_module("env"));
        assert!(!is_core_module("network"));
    }
}

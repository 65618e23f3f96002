//! Single-file-component compiler, packaged as a program unit.
//!
//! The unit exports one object, `sfc`, with four entry points:
//!
//! | entry             | argument shape                                              |
//! |-------------------|-------------------------------------------------------------|
//! | `parse`           | `(source, { filename })`                                    |
//! | `compileScript`   | `(descriptor, { id, isProd })`                              |
//! | `compileTemplate` | `({ source, filename, id, scoped, compilerOptions })`       |
//! | `compileStyle`    | `({ source, filename, id, scoped })`                        |
//!
//! Every entry point returns a plain object. Diagnostics travel inside the
//! result; an entry point only throws when its input cannot be interpreted at
//! all.

pub mod compile_script;
pub mod compile_style;
pub mod compile_template;
pub mod descriptor;
pub mod expression;
pub mod parse;

use crate::runner::plugin::registry::{ExportRegistry, UnitError};
use crate::runner::plugin::resolver::ProgramUnit;
use crate::runner::plugin::types::{ExportObject, UnitInfo};
use crate::runner::runtime::EntryPoint;

pub use descriptor::{AttrValue, CompilerError, SfcBlock, SfcDescriptor};

/// Name the unit is configured and resolved under.
pub const UNIT_NAME: &str = "sfc";

pub struct SfcCompilerUnit;

impl ProgramUnit for SfcCompilerUnit {
    fn info(&self) -> UnitInfo {
        UnitInfo::new(UNIT_NAME, env!("CARGO_PKG_VERSION")).with_provides(
            EntryPoint::ALL
                .iter()
                .map(|e| format!("{}.{}", UNIT_NAME, e.name()))
                .collect(),
        )
    }

    fn export_name(&self) -> &str {
        UNIT_NAME
    }

    fn initialize(&self, registry: &mut ExportRegistry) -> Result<(), UnitError> {
        let object = ExportObject::new(UNIT_NAME)
            .add_method(EntryPoint::Parse.name(), parse::parse)
            .add_method(EntryPoint::CompileScript.name(), compile_script::compile_script)
            .add_method(EntryPoint::CompileTemplate.name(), compile_template::compile_template)
            .add_method(EntryPoint::CompileStyle.name(), compile_style::compile_style);
        registry.register_object(object);
        Ok(())
    }
}

/// Strips an optional `data-v-` prefix from a scope id.
pub fn short_id(id: &str) -> &str {
    id.strip_prefix("data-v-").unwrap_or(id)
}

/// Name of the custom property that carries a `v-bind()` value.
///
/// Development names stay readable; production names are hashed.
pub fn css_var_name(id: &str, expr: &str, is_prod: bool) -> String {
    if is_prod {
        format!("{:08x}", fnv1a(&format!("{}{}", id, expr)))
    } else {
        let mut escaped = String::with_capacity(expr.len());
        for c in expr.chars() {
            if !(c.is_ascii_alphanumeric() || c == '_' || c == '-') {
                escaped.push('\\');
            }
            escaped.push(c);
        }
        format!("{}-{}", id, escaped)
    }
}

/// `foo-bar` to `fooBar`.
pub fn camelize(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut upper = false;
    for c in s.chars() {
        if c == '-' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// 32-bit FNV-1a.
pub fn fnv1a(s: &str) -> u32 {
    s.bytes().fold(0x811c_9dc5u32, |hash, b| {
        (hash ^ b as u32).wrapping_mul(0x0100_0193)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_registers_every_entry_point() {
        let mut registry = ExportRegistry::new();
        SfcCompilerUnit.initialize(&mut registry).unwrap();
        for entry in EntryPoint::ALL.iter() {
            assert!(registry.has_method(UNIT_NAME, entry.name()));
        }
        assert_eq!(SfcCompilerUnit.info().provides.len(), 4);
    }

    #[test]
    fn test_css_var_name() {
        assert_eq!(short_id("data-v-abc"), "abc");
        assert_eq!(css_var_name("abc", "color", false), "abc-color");
        assert_eq!(css_var_name("abc", "a.b", false), "abc-a\\.b");
        let hashed = css_var_name("abc", "color", true);
        assert_eq!(hashed.len(), 8);
        assert_eq!(hashed, css_var_name("abc", "color", true));
        assert_ne!(hashed, css_var_name("abc", "size", true));
    }

    #[test]
    fn test_case_helpers() {
        assert_eq!(camelize("my-comp-name"), "myCompName");
        assert_eq!(capitalize(&camelize("my-comp")), "MyComp");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn test_fnv1a() {
        assert_eq!(fnv1a(""), 0x811c_9dc5);
        assert_eq!(fnv1a("a"), 0xe40c_292c);
    }
}

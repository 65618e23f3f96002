//! The `compileStyle` entry point: scoped selector rewriting and `v-bind()`
//! variable injection.

use crate::parser::style::parse_stylesheet;
use crate::parser::template::Span;
use crate::runner::ds::builder::{build_array, build_object};
use crate::runner::ds::error::JErrorType;
use crate::runner::ds::value::JsValue;
use crate::runner::plugin::types::{arg, InvokeContext};

use super::descriptor::{errors_to_value, CompilerError, DEFAULT_FILENAME};
use super::parse::v_bind_calls;
use super::{css_var_name, short_id};

pub struct StyleOptions {
    pub source: String,
    pub filename: String,
    pub id: String,
    pub scoped: bool,
    pub is_prod: bool,
}

impl StyleOptions {
    fn from_value(v: &JsValue) -> Result<Self, JErrorType> {
        Ok(StyleOptions {
            source: v
                .get_string("source")
                .ok_or_else(|| JErrorType::TypeError("options.source must be a string".to_string()))?,
            filename: v
                .get_string("filename")
                .filter(|f| !f.is_empty())
                .unwrap_or_else(|| DEFAULT_FILENAME.to_string()),
            id: v.get_string("id").unwrap_or_default(),
            scoped: v.get_bool("scoped").unwrap_or(false),
            is_prod: v.get_bool("isProd").unwrap_or(false),
        })
    }
}

pub struct StyleOutput {
    pub code: String,
    pub errors: Vec<CompilerError>,
}

impl StyleOutput {
    pub fn to_value(&self) -> JsValue {
        build_object()
            .add_field("code", self.code.as_str())
            .add_field("errors", errors_to_value(&self.errors))
            .add_field("dependencies", build_array(Vec::<JsValue>::new()))
            .build()
    }
}

/// `compileStyle({ source, filename, id, scoped })`
pub fn compile_style(
    _ctx: &mut InvokeContext,
    _this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    let options = StyleOptions::from_value(&arg(&args, 0))?;
    Ok(compile(&options).to_value())
}

pub fn compile(options: &StyleOptions) -> StyleOutput {
    let source = options.source.as_str();
    let sheet = match parse_stylesheet(source) {
        Ok(sheet) => sheet,
        Err(e) => {
            return StyleOutput {
                code: String::new(),
                errors: vec![CompilerError::new(e.to_message(&options.filename))],
            }
        }
    };
    let id = short_id(&options.id);
    let mut edits: Vec<(Span, String)> = Vec::new();
    if options.scoped {
        for span in &sheet.selectors {
            edits.push((*span, scope_selector(&source[span.start..span.end], id)));
        }
    }
    for span in &sheet.declarations {
        let body = &source[span.start..span.end];
        for (start, end, expr) in v_bind_calls(body) {
            edits.push((
                Span {
                    start: span.start + start,
                    end: span.start + end,
                },
                format!("var(--{})", css_var_name(id, &expr, options.is_prod)),
            ));
        }
    }
    edits.sort_by_key(|(span, _)| span.start);
    let mut code = String::with_capacity(source.len());
    let mut pos = 0;
    for (span, replacement) in edits {
        code.push_str(&source[pos..span.start]);
        code.push_str(&replacement);
        pos = span.end;
    }
    code.push_str(&source[pos..]);
    StyleOutput {
        code,
        errors: Vec::new(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum PartKind {
    Combinator,
    Pseudo,
    Simple,
}

#[derive(Debug, Clone, Copy)]
struct Part {
    kind: PartKind,
    start: usize,
    end: usize,
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_' || c == '\\' || !c.is_ascii()
}

fn is_combinator_char(c: char) -> bool {
    c.is_whitespace() || c == '>' || c == '+' || c == '~'
}

/// Splits a selector into simple selectors, pseudos and combinators.
fn scan_selector(sel: &str) -> Vec<Part> {
    let chars: Vec<(usize, char)> = sel.char_indices().collect();
    let offset_at = |i: usize| chars.get(i).map_or(sel.len(), |(o, _)| *o);
    let mut parts = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let start = i;
        let c = chars[i].1;
        let kind = if is_combinator_char(c) {
            while i < chars.len() && is_combinator_char(chars[i].1) {
                i += 1;
            }
            PartKind::Combinator
        } else if c == ':' {
            i += 1;
            if i < chars.len() && chars[i].1 == ':' {
                i += 1;
            }
            while i < chars.len() && is_ident_char(chars[i].1) {
                i += 1;
            }
            if i < chars.len() && chars[i].1 == '(' {
                i = skip_group(&chars, i, '(', ')');
            }
            PartKind::Pseudo
        } else if c == '[' {
            i = skip_group(&chars, i, '[', ']');
            PartKind::Simple
        } else if c == '.' || c == '#' {
            i += 1;
            while i < chars.len() && is_ident_char(chars[i].1) {
                i += 1;
            }
            PartKind::Simple
        } else if is_ident_char(c) {
            while i < chars.len() && is_ident_char(chars[i].1) {
                i += 1;
            }
            PartKind::Simple
        } else {
            i += 1;
            PartKind::Simple
        };
        parts.push(Part {
            kind,
            start: offset_at(start),
            end: offset_at(i),
        });
    }
    parts
}

/// Index just past the group opened at `open`, honouring nesting and quotes.
fn skip_group(chars: &[(usize, char)], open: usize, left: char, right: char) -> usize {
    let mut depth = 0;
    let mut quote: Option<char> = None;
    let mut i = open;
    while i < chars.len() {
        let c = chars[i].1;
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c == left => depth += 1,
            None if c == right => {
                depth -= 1;
                if depth == 0 {
                    return i + 1;
                }
            }
            None => {}
        }
        i += 1;
    }
    chars.len()
}

/// Splits `:name(arg)` into its name and trimmed argument.
fn pseudo_parts(text: &str) -> (&str, Option<&str>) {
    match text.find('(') {
        Some(i) if text.ends_with(')') => (&text[..i], Some(text[i + 1..text.len() - 1].trim())),
        _ => (text, None),
    }
}

/// Adds `attr` after the last simple selector that is not a pseudo.
fn inject(sel: &str, attr: &str) -> String {
    let parts = scan_selector(sel);
    match parts.iter().rev().find(|p| p.kind == PartKind::Simple) {
        Some(p) => format!("{}{}{}", &sel[..p.end], attr, &sel[p.end..]),
        None => format!("{}{}", attr, sel.trim_start()),
    }
}

pub fn scope_selector(sel: &str, id: &str) -> String {
    let attr = format!("[data-v-{}]", id);
    for part in scan_selector(sel).iter().filter(|p| p.kind == PartKind::Pseudo) {
        let (name, inner) = pseudo_parts(&sel[part.start..part.end]);
        let before = &sel[..part.start];
        let after = &sel[part.end..];
        match (name, inner) {
            (":global", Some(inner)) | ("::v-global", Some(inner)) => {
                return format!("{}{}{}", before, inner, after);
            }
            (":deep", Some(inner)) | ("::v-deep", Some(inner)) => {
                let prefix = before.trim_end();
                let scoped = if prefix.is_empty() {
                    attr.clone()
                } else {
                    inject(prefix, &attr)
                };
                return format!("{} {}{}", scoped, inner, after);
            }
            ("::v-deep", None) => {
                let prefix = before.trim_end();
                let scoped = if prefix.is_empty() {
                    attr.clone()
                } else {
                    inject(prefix, &attr)
                };
                return format!("{} {}", scoped, after.trim_start());
            }
            (":slotted", Some(inner)) | ("::v-slotted", Some(inner)) => {
                let slotted = inject(inner, &format!("[data-v-{}-s]", id));
                return format!("{}{}{}", before, slotted, after);
            }
            _ => {}
        }
    }
    inject(sel, &attr)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(source: &str, scoped: bool) -> StyleOptions {
        StyleOptions {
            source: source.to_string(),
            filename: "a.vue".to_string(),
            id: "data-v-123".to_string(),
            scoped,
            is_prod: false,
        }
    }

    #[test]
    fn test_scope_selector() {
        assert_eq!(scope_selector(".a", "1"), ".a[data-v-1]");
        assert_eq!(scope_selector(".a .b:hover", "1"), ".a .b[data-v-1]:hover");
        assert_eq!(scope_selector("p::before", "1"), "p[data-v-1]::before");
        assert_eq!(scope_selector(":hover", "1"), "[data-v-1]:hover");
        assert_eq!(scope_selector("a[href=\"x y\"]", "1"), "a[href=\"x y\"][data-v-1]");
        assert_eq!(scope_selector(".a > :first-child", "1"), ".a[data-v-1] > :first-child");
    }

    #[test]
    fn test_special_pseudos() {
        assert_eq!(scope_selector(".a :deep(.b)", "1"), ".a[data-v-1] .b");
        assert_eq!(scope_selector(":deep(.b)", "1"), "[data-v-1] .b");
        assert_eq!(scope_selector(".a ::v-deep .b", "1"), ".a[data-v-1] .b");
        assert_eq!(scope_selector(":slotted(.b)", "1"), ".b[data-v-1-s]");
        assert_eq!(scope_selector(":global(.b)", "1"), ".b");
    }

    #[test]
    fn test_scoped_sheet() {
        let out = compile(&options(
            ".a, .b { color: red }\n@media print { p { x: y } }\n@keyframes k { from { a: b } }",
            true,
        ));
        assert!(out.errors.is_empty());
        assert_eq!(
            out.code,
            ".a[data-v-123], .b[data-v-123] { color: red }\n@media print { p[data-v-123] { x: y } }\n@keyframes k { from { a: b } }"
        );
    }

    #[test]
    fn test_unscoped_keeps_selectors() {
        let out = compile(&options(".a { color: red }", false));
        assert_eq!(out.code, ".a { color: red }");
    }

    #[test]
    fn test_v_bind() {
        let out = compile(&options(".a { color: v-bind(color); width: v-bind('size.w') }", false));
        assert_eq!(
            out.code,
            ".a { color: var(--123-color); width: var(--123-size\\.w) }"
        );
    }

    #[test]
    fn test_syntax_error() {
        let out = compile(&options(".a { color: red", true));
        assert_eq!(out.code, "");
        assert_eq!(out.errors.len(), 1);
        assert!(out.errors[0].message.starts_with("a.vue:1:"));
        assert!(out.errors[0].message.ends_with("Unclosed block"));
    }
}

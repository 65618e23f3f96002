//! The `compileScript` entry point.
//!
//! `<script setup>` is compiled into a component definition whose `setup()`
//! returns the top-level bindings. A lone `<script>` is passed through and
//! only analysed for binding metadata.

use std::collections::{HashMap, HashSet};
use std::ops::Range;
use std::path::{Component, Path, PathBuf};

use crate::parser::script::{
    depth_delta, is_identifier, matching_angle, matching_close, object_literal_keys,
    pattern_names, source_of, split_statements, split_top_level, tokenize, Token, TokenKind,
};
use crate::parser::template::{parse_template, TemplateNode};
use crate::runner::ds::builder::{build_array, build_object, ObjectBuilder};
use crate::runner::ds::error::JErrorType;
use crate::runner::ds::value::JsValue;
use crate::runner::plugin::types::{arg, InvokeContext};

use super::descriptor::{SfcBlock, SfcDescriptor, DEFAULT_FILENAME};
use super::expression::{BindingType, Bindings, PrefixContext};
use super::{camelize, capitalize, css_var_name, short_id};

const DEFAULT_VAR: &str = "__default__";

const EXPORT_ERROR: &str = "<script setup> cannot contain ES module exports. If you are using a previous version of <script setup>, please consult the updated RFC at https://github.com/vuejs/rfcs/pull/227.";

lazy_static! {
    static ref MACROS: HashSet<&'static str> = [
        "defineProps", "defineEmits", "defineExpose", "defineOptions", "defineSlots", "withDefaults",
    ]
    .iter()
    .copied()
    .collect();
}

/// Vue APIs whose result is always a ref.
const REF_APIS: &[&str] = &["ref", "computed", "shallowRef", "customRef", "toRef"];

const UNARY_OPERATORS: &[&str] = &["!", "~", "+", "-", "typeof", "void", "delete", "++", "--"];

const BINARY_OPERATORS: &[&str] = &[
    "+", "-", "*", "/", "%", "**", "==", "!=", "===", "!==", "<", ">", "<=", ">=", "<<", ">>",
    ">>>", "&", "|", "^", "in", "instanceof",
];

/// Operators binding looser than any binary operator.
const LOOSE_OPERATORS: &[&str] = &[
    "?", "??", "||", "&&", "=", "+=", "-=", "*=", "/=", "%=", "||=", "&&=", "??=", ",",
];

fn sfc_error(message: impl std::fmt::Display) -> JErrorType {
    JErrorType::SyntaxError(format!("[@vue/compiler-sfc] {}", message))
}

pub struct ScriptOptions {
    pub id: String,
    pub is_prod: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportBinding {
    pub is_type: bool,
    pub imported: String,
    pub source: String,
    pub is_from_setup: bool,
}

impl ImportBinding {
    fn to_value(&self) -> JsValue {
        build_object()
            .add_field("isType", self.is_type)
            .add_field("imported", self.imported.as_str())
            .add_field("source", self.source.as_str())
            .add_field("isFromSetup", self.is_from_setup)
            .build()
    }
}

pub struct ScriptOutput {
    pub block: SfcBlock,
    pub bindings: Bindings,
    pub imports: Vec<(String, ImportBinding)>,
    pub warnings: Vec<String>,
    pub deps: Vec<String>,
}

impl ScriptOutput {
    pub fn to_value(&self) -> JsValue {
        let value = self.block.to_value();
        let mut bindings = ObjectBuilder::new();
        for (name, ty) in self.bindings.iter() {
            bindings.set_field(name, ty.as_str());
        }
        let mut imports = ObjectBuilder::new();
        for (local, binding) in &self.imports {
            imports.set_field(local, binding.to_value());
        }
        value.set("bindings", bindings.build());
        value.set("imports", imports.build());
        value.set("warnings", build_array(self.warnings.iter().map(|w| w.as_str())));
        value.set("deps", build_array(self.deps.iter().map(|d| d.as_str())));
        value
    }
}

/// `compileScript(descriptor, { id, isProd })`
pub fn compile_script(
    _ctx: &mut InvokeContext,
    _this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    let descriptor = SfcDescriptor::from_value(&arg(&args, 0))
        .ok_or_else(|| JErrorType::TypeError("descriptor must be an object".to_string()))?;
    let options = arg(&args, 1);
    let options = ScriptOptions {
        id: options.get_string("id").unwrap_or_default(),
        is_prod: options.get_bool("isProd").unwrap_or(false),
    };
    Ok(compile(&descriptor, &options)?.to_value())
}

pub fn compile(descriptor: &SfcDescriptor, options: &ScriptOptions) -> Result<ScriptOutput, JErrorType> {
    match (&descriptor.script, &descriptor.script_setup) {
        (None, None) => Err(sfc_error("SFC contains no <script> tags.")),
        (Some(script), None) => Ok(compile_normal(descriptor, script, options)),
        (script, Some(setup)) => SetupCompiler::new(descriptor, script.as_ref(), setup, options).compile(),
    }
}

fn compile_normal(descriptor: &SfcDescriptor, script: &SfcBlock, options: &ScriptOptions) -> ScriptOutput {
    let src = script.content.as_str();
    let tokens = tokenize(src);
    let statements = split_statements(&tokens);
    let bindings = options_bindings(&tokens, &statements);
    let mut content = src.to_string();
    if !descriptor.css_vars.is_empty() {
        content = rewrite_default(src, &tokens, &statements);
        content.push_str(&normal_script_css_vars(
            &descriptor.css_vars,
            short_id(&options.id),
            options.is_prod,
        ));
        content.push_str(&format!("\nexport default {}", DEFAULT_VAR));
    }
    let mut block = script.clone();
    block.content = content;
    ScriptOutput {
        block,
        bindings,
        imports: Vec::new(),
        warnings: Vec::new(),
        deps: Vec::new(),
    }
}

fn find_default_export(tokens: &[Token], statements: &[Range<usize>]) -> Option<usize> {
    statements
        .iter()
        .map(|r| r.start)
        .find(|&i| tokens[i].is("export") && tokens.get(i + 1).map_or(false, |t| t.is("default")))
}

/// Turns `export default` into a `__default__` declaration.
fn rewrite_default(src: &str, tokens: &[Token], statements: &[Range<usize>]) -> String {
    match find_default_export(tokens, statements) {
        Some(i) => format!(
            "{}const {} ={}",
            &src[..tokens[i].start],
            DEFAULT_VAR,
            &src[tokens[i + 1].end..]
        ),
        None => format!("{}\nconst {} = {{}}", src, DEFAULT_VAR),
    }
}

/// The options object of `export default { ... }`, optionally wrapped in
/// `defineComponent(...)`.
fn default_export_object<'t, 'a>(tokens: &'t [Token<'a>], statements: &[Range<usize>]) -> Option<&'t [Token<'a>]> {
    let mut i = find_default_export(tokens, statements)? + 2;
    if tokens.get(i)?.is("defineComponent") && tokens.get(i + 1)?.is("(") {
        i += 2;
    }
    if !tokens.get(i)?.is("{") {
        return None;
    }
    let close = matching_close(tokens, i)?;
    Some(&tokens[i..=close])
}

/// Binding metadata of an options-API component.
fn options_bindings(tokens: &[Token], statements: &[Range<usize>]) -> Bindings {
    let mut bindings = Bindings::new();
    let object = match default_export_object(tokens, statements) {
        Some(o) => o,
        None => return bindings,
    };
    for (key, range) in object_literal_keys(object) {
        let entry = &object[range];
        let value = property_value(entry);
        match key.as_str() {
            "props" => {
                for name in literal_keys(value) {
                    bindings.insert(&name, BindingType::Props);
                }
            }
            "inject" => {
                for name in literal_keys(value) {
                    bindings.insert(&name, BindingType::Options);
                }
            }
            "computed" | "methods" => {
                for (name, _) in object_literal_keys(value) {
                    bindings.insert(&name, BindingType::Options);
                }
            }
            "setup" | "data" => {
                let ty = if key == "data" {
                    BindingType::Data
                } else {
                    BindingType::SetupMaybeRef
                };
                if let Some(returned) = returned_object(entry) {
                    for (name, _) in object_literal_keys(returned) {
                        bindings.insert(&name, ty);
                    }
                }
            }
            _ => {}
        }
    }
    bindings
}

/// Value tokens of an object literal entry; the whole entry for methods.
fn property_value<'t, 'a>(entry: &'t [Token<'a>]) -> &'t [Token<'a>] {
    match entry.get(1) {
        Some(t) if t.is(":") => &entry[2..],
        _ => entry,
    }
}

/// Names listed by an array of strings or an object literal.
fn literal_keys(value: &[Token]) -> Vec<String> {
    match value.first() {
        Some(t) if t.is("[") => {
            let close = matching_close(value, 0).unwrap_or(value.len());
            split_top_level(&value[1..close.min(value.len())], ",")
                .into_iter()
                .filter_map(|e| e.first().and_then(|t| t.string_value()))
                .map(|s| s.to_string())
                .collect()
        }
        Some(t) if t.is("{") => object_literal_keys(value).into_iter().map(|(k, _)| k).collect(),
        _ => Vec::new(),
    }
}

/// The object literal returned by a `data`/`setup` function.
fn returned_object<'t, 'a>(entry: &'t [Token<'a>]) -> Option<&'t [Token<'a>]> {
    if let Some(arrow) = entry.iter().position(|t| t.is("=>")) {
        if entry.get(arrow + 1)?.is("(") && entry.get(arrow + 2)?.is("{") {
            let close = matching_close(entry, arrow + 2)?;
            return Some(&entry[arrow + 2..=close]);
        }
    }
    let open = entry.iter().position(|t| t.is("{"))?;
    let close = matching_close(entry, open)?;
    let mut depth = 0;
    for i in open + 1..close {
        let t = &entry[i];
        if depth == 0 && t.is("return") && entry.get(i + 1).map_or(false, |n| n.is("{")) {
            let end = matching_close(entry, i + 1)?;
            return Some(&entry[i + 1..=end]);
        }
        depth += depth_delta(t);
    }
    None
}

fn normal_script_css_vars(vars: &[String], id: &str, is_prod: bool) -> String {
    format!(
        "\nimport {{ useCssVars as _useCssVars }} from 'vue'\n\
         const __injectCSSVars__ = () => {{\n{}}}\n\
         const __setup__ = {d}.setup\n\
         {d}.setup = __setup__\n  \
         ? (props, ctx) => {{ __injectCSSVars__();return __setup__(props, ctx) }}\n  \
         : __injectCSSVars__\n",
        css_vars_code(vars, None, id, is_prod),
        d = DEFAULT_VAR
    )
}

fn css_vars_code(vars: &[String], bindings: Option<&Bindings>, id: &str, is_prod: bool) -> String {
    let ctx = PrefixContext::inline(bindings);
    let entries: Vec<String> = vars
        .iter()
        .map(|v| format!("\"{}\": ({})", css_var_name(id, v, is_prod), ctx.prefix(v)))
        .collect();
    format!("_useCssVars(_ctx => ({{\n  {}\n}}))", entries.join(",\n  "))
}

fn strip_semicolon<'t, 'a>(tokens: &'t [Token<'a>]) -> &'t [Token<'a>] {
    match tokens.last() {
        Some(t) if t.is(";") => &tokens[..tokens.len() - 1],
        _ => tokens,
    }
}

fn is_import(stmt: &[Token]) -> bool {
    stmt.first().map_or(false, |t| t.is("import"))
        && !stmt.get(1).map_or(false, |t| t.is("(") || t.is("."))
}

struct ImportSpec {
    local: String,
    imported: String,
    is_type: bool,
}

struct ImportDecl {
    specs: Vec<ImportSpec>,
    source: String,
    type_only: bool,
}

impl ImportDecl {
    fn render(&self, kept: &[usize]) -> String {
        let specs: Vec<&ImportSpec> = kept.iter().map(|&i| &self.specs[i]).collect();
        let mut parts = Vec::new();
        if let Some(d) = specs.iter().find(|s| s.imported == "default") {
            parts.push(d.local.clone());
        }
        if let Some(ns) = specs.iter().find(|s| s.imported == "*") {
            parts.push(format!("* as {}", ns.local));
        }
        let named: Vec<String> = specs
            .iter()
            .filter(|s| s.imported != "default" && s.imported != "*")
            .map(|s| {
                let ty = if s.is_type && !self.type_only { "type " } else { "" };
                if s.local == s.imported {
                    format!("{}{}", ty, s.local)
                } else {
                    format!("{}{} as {}", ty, s.imported, s.local)
                }
            })
            .collect();
        if !named.is_empty() {
            parts.push(format!("{{ {} }}", named.join(", ")));
        }
        format!(
            "import {}{} from '{}'",
            if self.type_only { "type " } else { "" },
            parts.join(", "),
            self.source
        )
    }
}

fn parse_import(stmt: &[Token]) -> Option<ImportDecl> {
    let stmt = strip_semicolon(stmt);
    let mut i = 1;
    let mut type_only = false;
    if stmt.get(i)?.is("type") && stmt.get(i + 1).map_or(false, |n| !n.is("from") && !n.is(",")) {
        type_only = true;
        i += 1;
    }
    let mut specs = Vec::new();
    if let Some(source) = stmt.get(i)?.string_value() {
        return Some(ImportDecl {
            specs,
            source: source.to_string(),
            type_only,
        });
    }
    if stmt[i].is_ident() && !stmt[i].is("from") {
        specs.push(ImportSpec {
            local: stmt[i].text.to_string(),
            imported: "default".to_string(),
            is_type: type_only,
        });
        i += 1;
        if stmt.get(i).map_or(false, |t| t.is(",")) {
            i += 1;
        }
    }
    if stmt.get(i).map_or(false, |t| t.is("*")) {
        specs.push(ImportSpec {
            local: stmt.get(i + 2)?.text.to_string(),
            imported: "*".to_string(),
            is_type: type_only,
        });
        i += 3;
    }
    if stmt.get(i).map_or(false, |t| t.is("{")) {
        let close = matching_close(stmt, i)?;
        for part in split_top_level(&stmt[i + 1..close], ",") {
            let (part, is_type) = match part.first() {
                Some(t) if t.is("type") && part.len() > 1 && !part[1].is("as") => (&part[1..], true),
                _ => (part, type_only),
            };
            let first = match part.first() {
                Some(t) => t,
                None => continue,
            };
            let imported = first.string_value().unwrap_or(first.text).to_string();
            let local = match (part.get(1), part.get(2)) {
                (Some(a), Some(l)) if a.is("as") => l.text.to_string(),
                _ => imported.clone(),
            };
            specs.push(ImportSpec {
                local,
                imported,
                is_type: is_type || type_only,
            });
        }
        i = close + 1;
    }
    if !stmt.get(i)?.is("from") {
        return None;
    }
    Some(ImportDecl {
        specs,
        source: stmt.get(i + 1)?.string_value()?.to_string(),
        type_only,
    })
}

#[derive(Clone)]
enum TypeDecl<'a> {
    Interface {
        body: Vec<Token<'a>>,
        extends: Vec<String>,
    },
    Alias(Vec<Token<'a>>),
}

fn type_declaration<'a>(stmt: &[Token<'a>]) -> Option<(String, TypeDecl<'a>)> {
    let mut stmt = strip_semicolon(stmt);
    if stmt.first()?.is("export") {
        stmt = &stmt[1..];
    }
    if stmt.first()?.is("declare") {
        stmt = &stmt[1..];
    }
    let name = stmt.get(1).filter(|t| t.is_ident())?.text.to_string();
    if stmt[0].is("interface") {
        let open = stmt.iter().position(|t| t.is("{"))?;
        let extends = if stmt.get(2).map_or(false, |t| t.is("extends")) {
            let mut names = Vec::new();
            let mut angle = 0;
            for t in &stmt[3..open] {
                match t.text {
                    "<" => angle += 1,
                    ">" => angle -= 1,
                    _ if angle == 0 && t.is_ident() => names.push(t.text.to_string()),
                    _ => {}
                }
            }
            names
        } else {
            Vec::new()
        };
        let close = matching_close(stmt, open)?;
        return Some((
            name,
            TypeDecl::Interface {
                body: stmt[open..=close].to_vec(),
                extends,
            },
        ));
    }
    if stmt[0].is("type") {
        let eq = stmt.iter().position(|t| t.is("="))?;
        return Some((name, TypeDecl::Alias(stmt[eq + 1..].to_vec())));
    }
    None
}

/// A call `name<types>(args)` starting at `tokens[0]`.
struct Call<'a> {
    name: &'a str,
    type_args: Option<Range<usize>>,
    args: Range<usize>,
    end: usize,
}

fn parse_call<'a>(tokens: &[Token<'a>]) -> Option<Call<'a>> {
    let name = tokens.first().filter(|t| t.is_ident())?;
    let mut i = 1;
    let mut type_args = None;
    if tokens.get(i)?.is("<") {
        let close = matching_angle(tokens, i)?;
        type_args = Some(i + 1..close);
        i = close + 1;
    }
    if !tokens.get(i)?.is("(") {
        return None;
    }
    let close = matching_close(tokens, i)?;
    Some(Call {
        name: name.text,
        type_args,
        args: i + 1..close,
        end: close,
    })
}

/// A macro call spanning all of `tokens`.
fn macro_call<'a>(tokens: &[Token<'a>]) -> Option<Call<'a>> {
    parse_call(tokens).filter(|c| c.end + 1 == tokens.len() && MACROS.contains(c.name))
}

fn has_top_level(tokens: &[Token], ops: &[&str]) -> bool {
    let mut depth = 0;
    for (i, t) in tokens.iter().enumerate() {
        if depth == 0 && i > 0 && matches!(t.kind, TokenKind::Punct | TokenKind::Ident) && ops.contains(&t.text) {
            return true;
        }
        depth += depth_delta(t);
    }
    false
}

fn strip_ts_cast<'t, 'a>(tokens: &'t [Token<'a>]) -> &'t [Token<'a>] {
    let mut depth = 0;
    for (i, t) in tokens.iter().enumerate() {
        if depth == 0 && i > 0 && (t.is("as") || t.is("satisfies")) {
            return &tokens[..i];
        }
        depth += depth_delta(t);
    }
    match tokens.last() {
        Some(t) if t.is("!") && tokens.len() > 1 => &tokens[..tokens.len() - 1],
        _ => tokens,
    }
}

enum InitKind<'a> {
    Literal,
    NeverRef,
    Call(&'a str),
    Other,
}

fn init_kind<'a>(tokens: &[Token<'a>]) -> InitKind<'a> {
    let tokens = strip_ts_cast(tokens);
    let first = match tokens.first() {
        Some(t) => t,
        None => return InitKind::Other,
    };
    if tokens.len() == 1 {
        return match first.kind {
            TokenKind::String | TokenKind::Number => InitKind::Literal,
            TokenKind::Template if !first.text.contains("${") => InitKind::Literal,
            TokenKind::Ident if matches!(first.text, "true" | "false" | "null") => InitKind::Literal,
            TokenKind::Regex => InitKind::NeverRef,
            _ => InitKind::Other,
        };
    }
    if tokens.len() == 2 && first.is("-") && tokens[1].kind == TokenKind::Number {
        return InitKind::Literal;
    }
    if first.is("function") || first.is("class") || has_top_level(tokens, &["=>"]) {
        return InitKind::NeverRef;
    }
    if first.is("async") && tokens.get(1).map_or(false, |t| t.is("function")) {
        return InitKind::NeverRef;
    }
    if (first.is("[") || first.is("{")) && matching_close(tokens, 0) == Some(tokens.len() - 1) {
        return InitKind::NeverRef;
    }
    if UNARY_OPERATORS.contains(&first.text) && first.kind != TokenKind::String {
        return InitKind::NeverRef;
    }
    if let Some(call) = parse_call(tokens).filter(|c| c.end + 1 == tokens.len()) {
        return InitKind::Call(call.name);
    }
    if has_top_level(tokens, LOOSE_OPERATORS) {
        return InitKind::Other;
    }
    if has_top_level(tokens, BINARY_OPERATORS) {
        return InitKind::NeverRef;
    }
    if tokens.len() == 2 && first.is_ident() && tokens[1].kind == TokenKind::Template {
        return InitKind::NeverRef;
    }
    InitKind::Other
}

fn top_level_eq(tokens: &[Token]) -> Option<usize> {
    let mut depth = 0;
    for (i, t) in tokens.iter().enumerate() {
        if depth == 0 && t.is("=") {
            return Some(i);
        }
        depth += depth_delta(t);
    }
    None
}

/// Bindings declared by a top-level statement other than a macro call.
fn declared_bindings(stmt: &[Token], aliases: &HashMap<String, String>) -> Vec<(String, BindingType)> {
    let mut stmt = strip_semicolon(stmt);
    if stmt.first().map_or(false, |t| t.is("export")) {
        stmt = &stmt[1..];
    }
    let first = match stmt.first() {
        Some(t) => t,
        None => return Vec::new(),
    };
    let named = |i: usize| -> Vec<(String, BindingType)> {
        stmt.get(i)
            .filter(|t| t.is_ident())
            .map(|t| vec![(t.text.to_string(), BindingType::SetupConst)])
            .unwrap_or_default()
    };
    match first.text {
        "const" if stmt.get(1).map_or(false, |t| t.is("enum")) => named(2),
        "const" | "let" | "var" => {
            let is_const = first.is("const");
            let mut out = Vec::new();
            for declarator in split_top_level(&stmt[1..], ",") {
                let (pattern, init) = match top_level_eq(declarator) {
                    Some(eq) => (&declarator[..eq], Some(&declarator[eq + 1..])),
                    None => (declarator, None),
                };
                let simple = pattern.first().map_or(false, |t| t.is_ident());
                for name in pattern_names(pattern) {
                    let ty = if simple {
                        classify(is_const, init, aliases)
                    } else if is_const {
                        BindingType::SetupMaybeRef
                    } else {
                        BindingType::SetupLet
                    };
                    out.push((name, ty));
                }
            }
            out
        }
        "function" => named(if stmt.get(1).map_or(false, |t| t.is("*")) { 2 } else { 1 }),
        "async" if stmt.get(1).map_or(false, |t| t.is("function")) => {
            named(if stmt.get(2).map_or(false, |t| t.is("*")) { 3 } else { 2 })
        }
        "class" | "enum" => named(1),
        "abstract" if stmt.get(1).map_or(false, |t| t.is("class")) => named(2),
        _ => Vec::new(),
    }
}

fn classify(is_const: bool, init: Option<&[Token]>, aliases: &HashMap<String, String>) -> BindingType {
    let init = match init {
        Some(init) if !init.is_empty() => init,
        _ => {
            return if is_const {
                BindingType::SetupMaybeRef
            } else {
                BindingType::SetupLet
            }
        }
    };
    let is_api = |api: &str, name: &str| aliases.get(api).map_or(false, |local| local == name);
    match init_kind(init) {
        InitKind::Literal if is_const => BindingType::LiteralConst,
        InitKind::Call(name) if is_api("reactive", name) => {
            if is_const {
                BindingType::SetupReactiveConst
            } else {
                BindingType::SetupLet
            }
        }
        _ if !is_const => BindingType::SetupLet,
        InitKind::NeverRef | InitKind::Literal => BindingType::SetupConst,
        InitKind::Call(name) if REF_APIS.iter().any(|api| is_api(*api, name)) => BindingType::SetupRef,
        _ => BindingType::SetupMaybeRef,
    }
}

#[derive(Debug, Clone, PartialEq)]
struct TypeMember {
    key: String,
    optional: bool,
    types: Vec<String>,
}

enum PropsDecl {
    Runtime { source: Option<String>, keys: Vec<String> },
    Typed(Vec<TypeMember>),
}

impl PropsDecl {
    fn keys(&self) -> Vec<String> {
        match self {
            PropsDecl::Runtime { keys, .. } => keys.clone(),
            PropsDecl::Typed(members) => members.iter().map(|m| m.key.clone()).collect(),
        }
    }
}

enum PropsDefaults {
    /// `key` → `default: value` text, from an object literal.
    Static(Vec<(String, String)>),
    /// Anything else, merged at runtime.
    Dynamic(String),
}

fn runtime_type_string(types: &[String]) -> String {
    if types.is_empty() || types.iter().any(|t| t == "null") {
        return "null".to_string();
    }
    if types.len() == 1 {
        return types[0].clone();
    }
    format!("[{}]", types.join(", "))
}

fn quote_key(key: &str) -> String {
    if is_identifier(key) {
        key.to_string()
    } else {
        format!("\"{}\"", key)
    }
}

/// `./Foo.vue` imported from `src/App.vue` is `src/Foo.vue`.
fn resolve_relative(filename: &str, source: &str) -> String {
    let base = Path::new(filename).parent().unwrap_or_else(|| Path::new(""));
    let mut out = PathBuf::new();
    for c in base.join(source).components() {
        match c {
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out.to_string_lossy().replace('\\', "/")
}

fn component_name(filename: &str) -> Option<String> {
    if filename == DEFAULT_FILENAME {
        return None;
    }
    let path = Path::new(filename);
    path.extension()?;
    path.file_stem().map(|s| s.to_string_lossy().into_owned())
}

fn apply_edits(src: &str, edits: &mut Vec<(Range<usize>, String)>) -> String {
    edits.sort_by_key(|(r, _)| r.start);
    let mut out = String::with_capacity(src.len());
    let mut pos = 0;
    for (range, text) in edits.iter() {
        if range.start < pos {
            continue;
        }
        out.push_str(&src[pos..range.start]);
        out.push_str(text);
        pos = range.end;
    }
    out.push_str(&src[pos..]);
    out
}

/// Identifiers and component names a template refers to.
fn template_usage(descriptor: &SfcDescriptor) -> Option<HashSet<String>> {
    let template = descriptor.template.as_ref()?;
    if template.src.is_some() || template.lang.as_deref().map_or(false, |l| l != "html") {
        return None;
    }
    let nodes = parse_template(&template.content).ok()?;
    let mut used = HashSet::new();
    collect_usage(&nodes, &mut used);
    Some(used)
}

fn add_idents(expr: &str, used: &mut HashSet<String>) {
    for t in tokenize(expr) {
        if t.is_ident() {
            used.insert(t.text.to_string());
        }
    }
}

fn collect_usage(nodes: &[TemplateNode], used: &mut HashSet<String>) {
    for node in nodes {
        match node {
            TemplateNode::Element(el) => {
                used.insert(el.tag.clone());
                used.insert(capitalize(&camelize(&el.tag)));
                for attr in &el.attrs {
                    let name = attr.name.as_str();
                    if let Some(dir) = name.strip_prefix("v-") {
                        let dir = dir.split(|c| c == ':' || c == '.').next().unwrap_or("");
                        used.insert(format!("v{}", capitalize(&camelize(dir))));
                    }
                    let is_directive = name.starts_with("v-")
                        || name.starts_with(':')
                        || name.starts_with('@')
                        || name.starts_with('#');
                    if is_directive {
                        if let Some(v) = &attr.value {
                            add_idents(v, used);
                        }
                    }
                }
                collect_usage(&el.children, used);
            }
            TemplateNode::Interpolation(expr, _) => add_idents(expr, used),
            _ => {}
        }
    }
}

struct SetupCompiler<'a> {
    descriptor: &'a SfcDescriptor,
    script: Option<&'a SfcBlock>,
    setup: &'a SfcBlock,
    options: &'a ScriptOptions,
    is_ts: bool,
    imports: Vec<(String, ImportBinding)>,
    /// Vue API name to its local alias.
    vue_aliases: HashMap<String, String>,
    option_bindings: Bindings,
    script_bindings: Bindings,
    setup_bindings: Bindings,
    type_decls: HashMap<String, TypeDecl<'a>>,
    props: Option<PropsDecl>,
    props_defaults: Option<PropsDefaults>,
    has_emits: bool,
    emits_decl: Option<String>,
    has_expose: bool,
    options_decl: Option<String>,
    has_await: bool,
    helpers: Vec<&'static str>,
    warnings: Vec<String>,
    deps: Vec<String>,
}

impl<'a> SetupCompiler<'a> {
    fn new(
        descriptor: &'a SfcDescriptor,
        script: Option<&'a SfcBlock>,
        setup: &'a SfcBlock,
        options: &'a ScriptOptions,
    ) -> Self {
        SetupCompiler {
            descriptor,
            script,
            setup,
            options,
            is_ts: setup.is_ts() || script.map_or(false, |s| s.is_ts()),
            imports: Vec::new(),
            vue_aliases: HashMap::new(),
            option_bindings: Bindings::new(),
            script_bindings: Bindings::new(),
            setup_bindings: Bindings::new(),
            type_decls: HashMap::new(),
            props: None,
            props_defaults: None,
            has_emits: false,
            emits_decl: None,
            has_expose: false,
            options_decl: None,
            has_await: false,
            helpers: Vec::new(),
            warnings: Vec::new(),
            deps: Vec::new(),
        }
    }

    fn helper(&mut self, name: &'static str) {
        if !self.helpers.contains(&name) {
            self.helpers.push(name);
        }
    }

    /// Records an import; returns the indices of the specifiers to keep.
    fn register_import(&mut self, decl: &ImportDecl, from_setup: bool) -> Result<Vec<usize>, JErrorType> {
        let mut kept = Vec::new();
        for (i, spec) in decl.specs.iter().enumerate() {
            if decl.source == "vue" && MACROS.contains(spec.imported.as_str()) {
                if spec.local != spec.imported {
                    return Err(sfc_error(format!(
                        "`{}` is a compiler macro and cannot be aliased to a different name.",
                        spec.imported
                    )));
                }
                self.warnings.push(format!(
                    "`{}` is a compiler macro and no longer needs to be imported.",
                    spec.imported
                ));
                continue;
            }
            if self
                .imports
                .iter()
                .any(|(l, b)| l == &spec.local && b.source == decl.source)
            {
                continue;
            }
            if decl.source == "vue" && !spec.is_type {
                self.vue_aliases.insert(spec.imported.clone(), spec.local.clone());
            }
            self.imports.push((
                spec.local.clone(),
                ImportBinding {
                    is_type: spec.is_type,
                    imported: spec.imported.clone(),
                    source: decl.source.clone(),
                    is_from_setup: from_setup,
                },
            ));
            kept.push(i);
        }
        Ok(kept)
    }

    fn note_type_dependency(&mut self, name: &str) {
        let source = match self.imports.iter().find(|(l, _)| l == name) {
            Some((_, b)) if b.source.starts_with('.') => b.source.clone(),
            _ => return,
        };
        let path = resolve_relative(&self.descriptor.filename, &source);
        if !self.deps.contains(&path) {
            self.deps.push(path);
        }
    }

    /// Handles a macro call; returns the expression that replaces it.
    fn process_macro(&mut self, src: &str, tokens: &[Token<'a>], call: &Call) -> Result<String, JErrorType> {
        let args = &tokens[call.args.clone()];
        match call.name {
            "defineProps" => {
                self.define_props(src, tokens, call)?;
                Ok("__props".to_string())
            }
            "withDefaults" => {
                let parts = split_top_level(args, ",");
                let inner = parts
                    .first()
                    .and_then(|p| parse_call(p).map(|c| (*p, c)))
                    .filter(|(_, c)| c.name == "defineProps" && c.type_args.is_some());
                let (props_tokens, props_call) = inner.ok_or_else(|| {
                    sfc_error("withDefaults can only be used with type-based defineProps declaration.")
                })?;
                self.define_props(src, props_tokens, &props_call)?;
                self.props_defaults = parts.get(1).map(|d| defaults_of(src, d));
                Ok("__props".to_string())
            }
            "defineEmits" => {
                if self.has_emits {
                    return Err(sfc_error("duplicate defineEmits() call"));
                }
                if call.type_args.is_some() && !args.is_empty() {
                    return Err(sfc_error(
                        "defineEmits() cannot accept both type and non-type arguments at the same time. Use one or the other.",
                    ));
                }
                self.has_emits = true;
                self.emits_decl = match &call.type_args {
                    Some(range) => {
                        let names = self.emit_names(&tokens[range.clone()], 0);
                        let quoted: Vec<String> = names.iter().map(|n| format!("\"{}\"", n)).collect();
                        Some(format!("[{}]", quoted.join(", ")))
                    }
                    None if args.is_empty() => None,
                    None => Some(source_of(src, args).to_string()),
                };
                Ok("__emit".to_string())
            }
            "defineExpose" => {
                if self.has_expose {
                    return Err(sfc_error("duplicate defineExpose() call"));
                }
                self.has_expose = true;
                Ok(format!("__expose({})", source_of(src, args)))
            }
            "defineOptions" => {
                if self.options_decl.is_some() {
                    return Err(sfc_error("duplicate defineOptions() call"));
                }
                for (key, _) in object_literal_keys(args) {
                    match key.as_str() {
                        "props" => {
                            return Err(sfc_error(
                                "defineOptions() cannot be used to declare props. Use defineProps() instead.",
                            ))
                        }
                        "emits" => {
                            return Err(sfc_error(
                                "defineOptions() cannot be used to declare emits. Use defineEmits() instead.",
                            ))
                        }
                        _ => {}
                    }
                }
                if !args.is_empty() {
                    self.options_decl = Some(source_of(src, args).to_string());
                }
                Ok(String::new())
            }
            "defineSlots" => {
                self.helper("useSlots");
                Ok("_useSlots()".to_string())
            }
            _ => Ok(source_of(src, tokens).to_string()),
        }
    }

    fn define_props(&mut self, src: &str, tokens: &[Token<'a>], call: &Call) -> Result<(), JErrorType> {
        if self.props.is_some() {
            return Err(sfc_error("duplicate defineProps() call"));
        }
        let args = &tokens[call.args.clone()];
        if call.type_args.is_some() && !args.is_empty() {
            return Err(sfc_error(
                "defineProps() cannot accept both type and non-type arguments at the same time. Use one or the other.",
            ));
        }
        self.props = Some(match &call.type_args {
            Some(range) => PropsDecl::Typed(self.type_members(&tokens[range.clone()], 0)),
            None if args.is_empty() => PropsDecl::Runtime {
                source: None,
                keys: Vec::new(),
            },
            None => PropsDecl::Runtime {
                source: Some(source_of(src, args).to_string()),
                keys: literal_keys(args),
            },
        });
        Ok(())
    }

    /// Looks a local type up, noting a dependency when it is imported.
    fn lookup_type(&mut self, name: &str) -> Option<TypeDecl<'a>> {
        let found = self.type_decls.get(name).cloned();
        if found.is_none() {
            self.note_type_dependency(name);
        }
        found
    }

    /// Members of an object type: a literal, an interface, an alias or an
    /// intersection of those.
    fn type_members(&mut self, tokens: &[Token<'a>], depth: usize) -> Vec<TypeMember> {
        let mut members: Vec<TypeMember> = Vec::new();
        if depth > 8 {
            return members;
        }
        for part in split_top_level(tokens, "&") {
            let found = match part.first() {
                Some(t) if t.is("{") => self.literal_members(part, depth),
                Some(t) if t.is_ident() && part.len() == 1 => match self.lookup_type(t.text) {
                    Some(TypeDecl::Interface { body, extends }) => {
                        let mut all = Vec::new();
                        for parent in extends {
                            if let Some(decl) = self.lookup_type(&parent) {
                                let parent_tokens = match decl {
                                    TypeDecl::Interface { body, .. } => body,
                                    TypeDecl::Alias(tokens) => tokens,
                                };
                                all.extend(self.type_members(&parent_tokens, depth + 1));
                            }
                        }
                        all.extend(self.literal_members(&body, depth));
                        all
                    }
                    Some(TypeDecl::Alias(alias)) => self.type_members(&alias, depth + 1),
                    None => Vec::new(),
                },
                _ => Vec::new(),
            };
            for m in found {
                match members.iter_mut().find(|x| x.key == m.key) {
                    Some(existing) => *existing = m,
                    None => members.push(m),
                }
            }
        }
        members
    }

    fn literal_members(&mut self, tokens: &[Token<'a>], depth: usize) -> Vec<TypeMember> {
        let close = matching_close(tokens, 0).unwrap_or(tokens.len());
        let inner = &tokens[1.min(tokens.len())..close.min(tokens.len())];
        let mut members = Vec::new();
        for range in split_statements(inner) {
            for member in split_top_level(strip_semicolon(&inner[range]), ",") {
                let member = match member.first() {
                    Some(t) if t.is("readonly") && member.len() > 2 => &member[1..],
                    _ => member,
                };
                let key = match member.first() {
                    Some(t) if t.is_ident() => t.text.to_string(),
                    Some(t) if t.kind == TokenKind::String => t.string_value().unwrap_or("").to_string(),
                    _ => continue,
                };
                let mut i = 1;
                let optional = member.get(i).map_or(false, |t| t.is("?"));
                if optional {
                    i += 1;
                }
                let types = match member.get(i) {
                    Some(t) if t.is("(") || t.is("<") => vec!["Function".to_string()],
                    Some(t) if t.is(":") => self.runtime_types(&member[i + 1..], depth + 1),
                    _ => vec!["null".to_string()],
                };
                members.push(TypeMember { key, optional, types });
            }
        }
        members
    }

    /// Runtime constructors a type can be checked against; `null` when
    /// unknown.
    fn runtime_types(&mut self, tokens: &[Token<'a>], depth: usize) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        if depth > 8 {
            return vec!["null".to_string()];
        }
        for alt in split_top_level(tokens, "|") {
            if alt.is_empty() {
                continue;
            }
            let found: Vec<String> = if has_top_level_from(alt, "=>") {
                vec!["Function".to_string()]
            } else if alt.len() >= 2 && alt[alt.len() - 1].is("]") && alt[alt.len() - 2].is("[") {
                vec!["Array".to_string()]
            } else {
                let first = &alt[0];
                match first.kind {
                    TokenKind::String | TokenKind::Template => vec!["String".to_string()],
                    TokenKind::Number => vec!["Number".to_string()],
                    _ if first.is("{") => vec!["Object".to_string()],
                    _ if first.is("[") => vec!["Array".to_string()],
                    _ if first.is("(") => {
                        let close = matching_close(alt, 0).unwrap_or(alt.len());
                        self.runtime_types(&alt[1..close.min(alt.len())], depth + 1)
                    }
                    _ if first.is("readonly") => self.runtime_types(&alt[1..], depth + 1),
                    _ => self.named_type(first.text, depth),
                }
            };
            for t in found {
                if !out.contains(&t) {
                    out.push(t);
                }
            }
        }
        out
    }

    fn named_type(&mut self, name: &str, depth: usize) -> Vec<String> {
        let known = match name {
            "string" => "String",
            "number" => "Number",
            "boolean" | "true" | "false" => "Boolean",
            "object" => "Object",
            "symbol" => "Symbol",
            "bigint" => "BigInt",
            "Function" => "Function",
            "Array" | "ReadonlyArray" => "Array",
            "Record" | "Partial" | "Required" | "Readonly" | "Pick" | "Omit" | "Object" => "Object",
            "Date" | "Promise" | "Map" | "Set" | "WeakMap" | "WeakSet" | "Error" | "RegExp" => name,
            "Uppercase" | "Lowercase" | "Capitalize" | "Uncapitalize" | "String" => "String",
            "Number" => "Number",
            "Boolean" => "Boolean",
            _ => "",
        };
        if !known.is_empty() {
            return vec![known.to_string()];
        }
        match self.lookup_type(name) {
            Some(TypeDecl::Interface { .. }) => vec!["Object".to_string()],
            Some(TypeDecl::Alias(tokens)) => self.runtime_types(&tokens, depth + 1),
            None => vec!["null".to_string()],
        }
    }

    /// Event names declared by a `defineEmits` type argument.
    fn emit_names(&mut self, tokens: &[Token<'a>], depth: usize) -> Vec<String> {
        let mut names = Vec::new();
        if depth > 8 {
            return names;
        }
        for part in split_top_level(tokens, "&") {
            match part.first() {
                Some(t) if t.is("{") => {
                    let close = matching_close(part, 0).unwrap_or(part.len());
                    let inner = &part[1..close.min(part.len())];
                    for range in split_statements(inner) {
                        for member in split_top_level(strip_semicolon(&inner[range]), ",") {
                            collect_emit_member(member, &mut names);
                        }
                    }
                }
                Some(t) if t.is("(") => collect_emit_member(part, &mut names),
                Some(t) if t.is_ident() && part.len() == 1 => {
                    let decl = self.lookup_type(t.text);
                    let body = match decl {
                        Some(TypeDecl::Interface { body, .. }) => body,
                        Some(TypeDecl::Alias(tokens)) => tokens,
                        None => continue,
                    };
                    for n in self.emit_names(&body, depth + 1) {
                        if !names.contains(&n) {
                            names.push(n);
                        }
                    }
                }
                _ => {}
            }
        }
        names
    }

    fn gen_runtime_props(&mut self) -> Option<String> {
        let object = match self.props.as_ref()? {
            PropsDecl::Runtime { source, .. } => return source.clone(),
            PropsDecl::Typed(members) if members.is_empty() => "{}".to_string(),
            PropsDecl::Typed(members) => {
                let statics = match &self.props_defaults {
                    Some(PropsDefaults::Static(d)) => d.as_slice(),
                    _ => &[],
                };
                let lines: Vec<String> = members
                    .iter()
                    .map(|m| {
                        let mut fields = vec![
                            format!("type: {}", runtime_type_string(&m.types)),
                            format!("required: {}", !m.optional),
                        ];
                        if let Some((_, d)) = statics.iter().find(|(k, _)| k == &m.key) {
                            fields.push(d.clone());
                        }
                        format!("{}: {{ {} }}", quote_key(&m.key), fields.join(", "))
                    })
                    .collect();
                format!("{{\n    {}\n  }}", lines.join(",\n    "))
            }
        };
        if let Some(PropsDefaults::Dynamic(defaults)) = &self.props_defaults {
            let merged = format!("/*#__PURE__*/_mergeDefaults({}, {})", object, defaults);
            self.helper("mergeDefaults");
            return Some(merged);
        }
        Some(object)
    }

    fn compile(mut self) -> Result<ScriptOutput, JErrorType> {
        let setup_src: &'a str = self.setup.content.as_str();
        let setup_tokens = tokenize(setup_src);
        let setup_statements = split_statements(&setup_tokens);

        let mut script_code = String::new();
        let mut default_export = false;
        let mut has_default_name = false;
        if let Some(script) = self.script {
            let src: &'a str = script.content.as_str();
            let tokens = tokenize(src);
            let statements = split_statements(&tokens);
            for range in &statements {
                let stmt = &tokens[range.clone()];
                if is_import(stmt) {
                    if let Some(decl) = parse_import(stmt) {
                        self.register_import(&decl, false)?;
                    }
                } else if let Some((name, decl)) = type_declaration(stmt) {
                    self.type_decls.insert(name, decl);
                } else {
                    for (name, ty) in declared_bindings(stmt, &self.vue_aliases) {
                        self.script_bindings.insert(&name, ty);
                    }
                }
            }
            self.option_bindings = options_bindings(&tokens, &statements);
            script_code = match find_default_export(&tokens, &statements) {
                Some(_) => {
                    default_export = true;
                    has_default_name = default_export_object(&tokens, &statements)
                        .map_or(false, |o| object_literal_keys(o).iter().any(|(k, _)| k == "name"));
                    rewrite_default(src, &tokens, &statements)
                }
                None => src.to_string(),
            };
        }

        // Type declarations are visible to macros anywhere in setup.
        for range in &setup_statements {
            if let Some((name, decl)) = type_declaration(&setup_tokens[range.clone()]) {
                self.type_decls.insert(name, decl);
            }
        }

        let mut edits: Vec<(Range<usize>, String)> = Vec::new();
        let mut hoisted: Vec<String> = Vec::new();
        for range in &setup_statements {
            let stmt = &setup_tokens[range.clone()];
            let span = stmt[0].start..stmt[stmt.len() - 1].end;
            if is_import(stmt) {
                if let Some(decl) = parse_import(stmt) {
                    let kept = self.register_import(&decl, true)?;
                    if decl.specs.is_empty() || kept.len() == decl.specs.len() {
                        hoisted.push(source_of(setup_src, stmt).to_string());
                    } else if !kept.is_empty() {
                        hoisted.push(decl.render(&kept));
                    }
                }
                edits.push((span, String::new()));
                continue;
            }
            if stmt[0].is("export") {
                let type_export = stmt
                    .get(1)
                    .map_or(false, |t| t.is("type") || t.is("interface") || t.is("declare"));
                if !type_export {
                    return Err(sfc_error(EXPORT_ERROR));
                }
                hoisted.push(source_of(setup_src, stmt).to_string());
                edits.push((span, String::new()));
                continue;
            }
            if type_declaration(stmt).is_some() {
                continue;
            }
            let body = strip_semicolon(stmt);
            if let Some(call) = macro_call(body) {
                let replacement = self.process_macro(setup_src, body, &call)?;
                let text = if call.name == "defineExpose" {
                    replacement
                } else {
                    String::new()
                };
                edits.push((span, text));
                continue;
            }
            if stmt[0].is("await") {
                self.has_await = true;
            }
            if let Some(handled) = self.macro_declaration(setup_src, body, &mut edits)? {
                for (name, ty) in handled {
                    self.setup_bindings.insert(&name, ty);
                }
                continue;
            }
            for (name, ty) in declared_bindings(stmt, &self.vue_aliases) {
                self.setup_bindings.insert(&name, ty);
            }
        }

        // Binding metadata.
        let mut bindings = Bindings::new();
        if let Some(props) = &self.props {
            for key in props.keys() {
                bindings.insert(&key, BindingType::Props);
            }
        }
        for (name, ty) in self.option_bindings.iter() {
            bindings.insert(name, *ty);
        }
        for (local, b) in &self.imports {
            if b.is_type {
                continue;
            }
            let ty = if b.imported == "*"
                || (b.imported == "default" && b.source.ends_with(".vue"))
                || b.source == "vue"
            {
                BindingType::SetupConst
            } else {
                BindingType::SetupMaybeRef
            };
            bindings.insert(local, ty);
        }
        for (name, ty) in self.script_bindings.iter().chain(self.setup_bindings.iter()) {
            bindings.insert(name, *ty);
        }

        let usage = if self.is_ts {
            template_usage(self.descriptor)
        } else {
            None
        };
        let mut returned: Vec<String> = Vec::new();
        for (name, _) in self.script_bindings.iter().chain(self.setup_bindings.iter()) {
            if !returned.contains(name) {
                returned.push(name.clone());
            }
        }
        for (local, b) in &self.imports {
            let used = usage.as_ref().map_or(true, |u| u.contains(local));
            if !b.is_type && used && !returned.contains(local) {
                returned.push(local.clone());
            }
        }

        let id = short_id(&self.options.id);
        let css = if self.descriptor.css_vars.is_empty() {
            String::new()
        } else {
            self.helper("useCssVars");
            self.helper("unref");
            format!(
                "\n{}\n",
                css_vars_code(&self.descriptor.css_vars, Some(&bindings), id, self.options.is_prod)
            )
        };
        let props_decl = self.gen_runtime_props();

        let mut runtime_options = String::new();
        if !has_default_name {
            if let Some(name) = component_name(&self.descriptor.filename) {
                runtime_options.push_str(&format!("\n  __name: '{}',", name));
            }
        }
        if let Some(props) = props_decl {
            runtime_options.push_str(&format!("\n  props: {},", props));
        }
        if let Some(emits) = &self.emits_decl {
            runtime_options.push_str(&format!("\n  emits: {},", emits));
        }

        let mut destructure = vec!["expose: __expose"];
        if self.has_emits {
            destructure.push("emit: __emit");
        }
        let typed_props = matches!(self.props, Some(PropsDecl::Typed(_)));
        let args = format!(
            "__props{}, {{ {} }}",
            if typed_props { ": any" } else { "" },
            destructure.join(", ")
        );
        let expose_call = if self.has_expose { "" } else { "  __expose();\n" };
        let async_kw = if self.has_await { "async " } else { "" };
        let (open, close) = if self.is_ts {
            self.helper("defineComponent");
            let mut def = String::new();
            if default_export {
                def.push_str(&format!("\n  ...{},", DEFAULT_VAR));
            }
            if let Some(o) = &self.options_decl {
                def.push_str(&format!("\n  ...{},", o));
            }
            (
                format!(
                    "export default /*#__PURE__*/_defineComponent({{{}{}\n  {}setup({}) {{\n{}",
                    def, runtime_options, async_kw, args, expose_call
                ),
                "})",
            )
        } else if default_export || self.options_decl.is_some() {
            let mut targets = String::new();
            if default_export {
                targets.push_str(&format!("{}, ", DEFAULT_VAR));
            }
            if let Some(o) = &self.options_decl {
                targets.push_str(&format!("{}, ", o));
            }
            (
                format!(
                    "export default /*#__PURE__*/Object.assign({}{{{}\n  {}setup({}) {{\n{}",
                    targets, runtime_options, async_kw, args, expose_call
                ),
                "})",
            )
        } else {
            (
                format!(
                    "export default {{{}\n  {}setup({}) {{\n{}",
                    runtime_options, async_kw, args, expose_call
                ),
                "}",
            )
        };

        let returned_text = if returned.is_empty() {
            "{}".to_string()
        } else {
            format!("{{ {} }}", returned.join(", "))
        };
        let marker = if self.options.is_prod {
            ""
        } else {
            "Object.defineProperty(__returned__, '__isScriptSetup', { enumerable: false, value: true })\n"
        };

        let mut code = String::new();
        if !self.helpers.is_empty() {
            let helpers: Vec<String> = self.helpers.iter().map(|h| format!("{} as _{}", h, h)).collect();
            code.push_str(&format!("import {{ {} }} from 'vue'\n", helpers.join(", ")));
        }
        if !script_code.trim().is_empty() {
            code.push_str(script_code.trim_end());
            code.push('\n');
        }
        for h in &hoisted {
            code.push_str(h);
            code.push('\n');
        }
        code.push('\n');
        code.push_str(&open);
        code.push_str(&css);
        code.push_str(apply_edits(setup_src, &mut edits).trim_end());
        code.push_str(&format!(
            "\n\nconst __returned__ = {}\n{}return __returned__\n}}\n\n{}",
            returned_text, marker, close
        ));

        let mut block = self.setup.clone();
        block.content = code;
        Ok(ScriptOutput {
            block,
            bindings,
            imports: self.imports,
            warnings: self.warnings,
            deps: self.deps,
        })
    }

    /// `const x = defineProps(...)` and friends. Returns the bindings it
    /// declares, or `None` when the statement is not a macro declaration.
    fn macro_declaration(
        &mut self,
        src: &str,
        stmt: &[Token<'a>],
        edits: &mut Vec<(Range<usize>, String)>,
    ) -> Result<Option<Vec<(String, BindingType)>>, JErrorType> {
        let first = match stmt.first() {
            Some(t) if t.is("const") || t.is("let") || t.is("var") => t,
            _ => return Ok(None),
        };
        let declarators = split_top_level(&stmt[1..], ",");
        if declarators.len() != 1 {
            return Ok(None);
        }
        let declarator = declarators[0];
        let eq = match top_level_eq(declarator) {
            Some(eq) => eq,
            None => return Ok(None),
        };
        let init = &declarator[eq + 1..];
        let call = match macro_call(init) {
            Some(call) => call,
            None => return Ok(None),
        };
        let replacement = self.process_macro(src, init, &call)?;
        edits.push((init[0].start..init[init.len() - 1].end, replacement));
        let pattern = &declarator[..eq];
        let simple = pattern.first().map_or(false, |t| t.is_ident());
        let ty = match call.name {
            "defineProps" | "withDefaults" if simple => BindingType::SetupReactiveConst,
            _ if first.is("const") => BindingType::SetupConst,
            _ => BindingType::SetupLet,
        };
        Ok(Some(pattern_names(pattern).into_iter().map(|n| (n, ty)).collect()))
    }
}

fn has_top_level_from(tokens: &[Token], op: &str) -> bool {
    let mut depth = 0;
    for t in tokens {
        if depth == 0 && t.is(op) {
            return true;
        }
        depth += depth_delta(t);
    }
    false
}

/// `(e: 'a' | 'b', ...)` call signatures and `name: [...]` properties.
fn collect_emit_member(member: &[Token], names: &mut Vec<String>) {
    let push = |n: &str, names: &mut Vec<String>| {
        if !names.iter().any(|x| x == n) {
            names.push(n.to_string());
        }
    };
    match member.first() {
        Some(t) if t.is("(") => {
            let close = matching_close(member, 0).unwrap_or(member.len());
            let params = split_top_level(&member[1..close.min(member.len())], ",");
            if let Some(first) = params.first() {
                if let Some(colon) = first.iter().position(|t| t.is(":")) {
                    for t in &first[colon + 1..] {
                        if let Some(s) = t.string_value().filter(|_| t.kind == TokenKind::String) {
                            push(s, names);
                        }
                    }
                }
            }
        }
        Some(t) if t.is_ident() => push(t.text, names),
        Some(t) if t.kind == TokenKind::String => {
            if let Some(s) = t.string_value() {
                push(s, names);
            }
        }
        _ => {}
    }
}

fn defaults_of(src: &str, tokens: &[Token]) -> PropsDefaults {
    if !tokens.first().map_or(false, |t| t.is("{")) || matching_close(tokens, 0) != Some(tokens.len() - 1) {
        return PropsDefaults::Dynamic(source_of(src, tokens).to_string());
    }
    let mut defaults = Vec::new();
    for (key, range) in object_literal_keys(tokens) {
        let entry = &tokens[range];
        let text = match entry.iter().position(|t| t.is(":")) {
            Some(colon) if colon <= 1 => format!("default: {}", source_of(src, &entry[colon + 1..])),
            _ if entry.len() == 1 => format!("default: {}", key),
            _ => match entry.iter().position(|t| t.is("(")) {
                Some(paren) => format!("default{}", source_of(src, &entry[paren..])),
                None => continue,
            },
        };
        defaults.push((key, text));
    }
    PropsDefaults::Static(defaults)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sfc::parse::parse_sfc;

    fn compile_sfc(src: &str) -> ScriptOutput {
        let descriptor = parse_sfc(src, "src/App.vue").descriptor;
        let options = ScriptOptions {
            id: "data-v-abc".to_string(),
            is_prod: false,
        };
        compile(&descriptor, &options).unwrap()
    }

    fn binding(out: &ScriptOutput, name: &str) -> Option<&'static str> {
        out.bindings.get(name).map(|t| t.as_str())
    }

    #[test]
    fn test_no_script_tags() {
        let descriptor = parse_sfc("<template><div/></template>", "a.vue").descriptor;
        let options = ScriptOptions {
            id: "x".to_string(),
            is_prod: false,
        };
        let err = compile(&descriptor, &options).err().unwrap();
        assert!(err.message().contains("SFC contains no <script> tags."));
    }

    #[test]
    fn test_setup_bindings() {
        let out = compile_sfc(
            "<script setup>\nimport { ref, reactive, computed } from 'vue'\nimport Foo from './Foo.vue'\nimport { helper } from './util'\nconst msg = 'hi'\nconst count = ref(0)\nconst state = reactive({})\nconst double = computed(() => count.value * 2)\nconst fn = () => 1\nconst obj = { a: 1 }\nconst other = useThing()\nlet changing = 1\nfunction go() {}\nclass K {}\nconst { a, b } = other\n</script>",
        );
        assert_eq!(binding(&out, "msg"), Some("literal-const"));
        assert_eq!(binding(&out, "count"), Some("setup-ref"));
        assert_eq!(binding(&out, "state"), Some("setup-reactive-const"));
        assert_eq!(binding(&out, "double"), Some("setup-ref"));
        assert_eq!(binding(&out, "fn"), Some("setup-const"));
        assert_eq!(binding(&out, "obj"), Some("setup-const"));
        assert_eq!(binding(&out, "other"), Some("setup-maybe-ref"));
        assert_eq!(binding(&out, "changing"), Some("setup-let"));
        assert_eq!(binding(&out, "go"), Some("setup-const"));
        assert_eq!(binding(&out, "K"), Some("setup-const"));
        assert_eq!(binding(&out, "a"), Some("setup-maybe-ref"));
        assert_eq!(binding(&out, "ref"), Some("setup-const"));
        assert_eq!(binding(&out, "Foo"), Some("setup-const"));
        assert_eq!(binding(&out, "helper"), Some("setup-maybe-ref"));
        let (_, foo) = out.imports.iter().find(|(l, _)| l == "Foo").unwrap();
        assert_eq!(foo.imported, "default");
        assert!(foo.is_from_setup);
    }

    #[test]
    fn test_generated_component() {
        let out = compile_sfc(
            "<script setup>\nimport { ref } from 'vue'\nconst count = ref(0)\n</script>",
        );
        let code = &out.block.content;
        assert!(code.starts_with("import { ref } from 'vue'\n\nexport default {\n  __name: 'App',\n  setup(__props, { expose: __expose }) {\n  __expose();\n"));
        assert!(code.contains("const count = ref(0)"));
        assert!(code.contains("const __returned__ = { count, ref }"));
        assert!(code.contains("'__isScriptSetup'"));
        assert!(code.ends_with("return __returned__\n}\n\n}"));
    }

    #[test]
    fn test_prod_has_no_marker() {
        let descriptor = parse_sfc("<script setup>const a = 1</script>", "a.vue").descriptor;
        let options = ScriptOptions {
            id: "x".to_string(),
            is_prod: true,
        };
        let out = compile(&descriptor, &options).unwrap();
        assert!(!out.block.content.contains("__isScriptSetup"));
    }

    #[test]
    fn test_runtime_props_and_emits() {
        let out = compile_sfc(
            "<script setup>\nconst props = defineProps({ msg: String, n: Number })\nconst emit = defineEmits(['change'])\ndefineExpose({ a: 1 })\n</script>",
        );
        assert_eq!(binding(&out, "msg"), Some("props"));
        assert_eq!(binding(&out, "n"), Some("props"));
        assert_eq!(binding(&out, "props"), Some("setup-reactive-const"));
        assert_eq!(binding(&out, "emit"), Some("setup-const"));
        let code = &out.block.content;
        assert!(code.contains("props: { msg: String, n: Number },"));
        assert!(code.contains("emits: ['change'],"));
        assert!(code.contains("setup(__props, { expose: __expose, emit: __emit })"));
        assert!(code.contains("const props = __props"));
        assert!(code.contains("const emit = __emit"));
        assert!(code.contains("__expose({ a: 1 })"));
        assert!(!code.contains("__expose();"));
    }

    #[test]
    fn test_type_props_with_defaults() {
        let out = compile_sfc(
            "<script setup lang=\"ts\">\ninterface Props {\n  msg?: string\n  labels: string[]\n  size: number | string\n}\nconst props = withDefaults(defineProps<Props>(), { msg: 'hello' })\n</script>",
        );
        let code = &out.block.content;
        assert!(code.starts_with("import { defineComponent as _defineComponent } from 'vue'\n"));
        assert!(code.contains("msg: { type: String, required: false, default: 'hello' }"));
        assert!(code.contains("labels: { type: Array, required: true }"));
        assert!(code.contains("size: { type: [Number, String], required: true }"));
        assert!(code.contains("setup(__props: any, { expose: __expose })"));
        assert_eq!(binding(&out, "labels"), Some("props"));
    }

    #[test]
    fn test_type_emits() {
        let out = compile_sfc(
            "<script setup lang=\"ts\">\nconst emit = defineEmits<{ (e: 'change', id: number): void; (e: 'update'): void }>()\n</script>",
        );
        assert!(out.block.content.contains("emits: [\"change\", \"update\"],"));
    }

    #[test]
    fn test_macro_import_warning() {
        let out = compile_sfc(
            "<script setup>\nimport { defineProps, ref } from 'vue'\ndefineProps(['a'])\n</script>",
        );
        assert_eq!(
            out.warnings,
            vec!["`defineProps` is a compiler macro and no longer needs to be imported.".to_string()]
        );
        assert!(out.block.content.starts_with("import { ref } from 'vue'\n"));
        assert!(!out.imports.iter().any(|(l, _)| l == "defineProps"));
    }

    #[test]
    fn test_duplicate_macro() {
        let descriptor = parse_sfc(
            "<script setup>\ndefineProps(['a'])\ndefineProps(['b'])\n</script>",
            "a.vue",
        )
        .descriptor;
        let options = ScriptOptions {
            id: "x".to_string(),
            is_prod: false,
        };
        let err = compile(&descriptor, &options).err().unwrap();
        assert!(err.message().contains("duplicate defineProps() call"));
    }

    #[test]
    fn test_exports_rejected() {
        let descriptor = parse_sfc("<script setup>\nexport const a = 1\n</script>", "a.vue").descriptor;
        let options = ScriptOptions {
            id: "x".to_string(),
            is_prod: false,
        };
        let err = compile(&descriptor, &options).err().unwrap();
        assert!(err.message().contains("cannot contain ES module exports"));
    }

    #[test]
    fn test_normal_script_merge() {
        let out = compile_sfc(
            "<script>\nexport default { name: 'Named', inheritAttrs: false }\n</script>\n<script setup>\nconst a = 1\n</script>",
        );
        let code = &out.block.content;
        assert!(code.contains("const __default__ = { name: 'Named', inheritAttrs: false }"));
        assert!(code.contains("export default /*#__PURE__*/Object.assign(__default__, {"));
        assert!(!code.contains("__name"));
        assert!(code.ends_with("})"));
    }

    #[test]
    fn test_ts_returns_only_template_used_imports() {
        let out = compile_sfc(
            "<template><Foo :x=\"used\"/></template>\n<script setup lang=\"ts\">\nimport Foo from './Foo.vue'\nimport { used, unused } from './util'\nimport type { T } from './types'\n</script>",
        );
        let code = &out.block.content;
        assert!(code.contains("const __returned__ = { Foo, used }"));
        assert_eq!(binding(&out, "unused"), Some("setup-maybe-ref"));
        assert_eq!(binding(&out, "T"), None);
        let (_, t) = out.imports.iter().find(|(l, _)| l == "T").unwrap();
        assert!(t.is_type);
    }

    #[test]
    fn test_imported_prop_types_are_deps() {
        let out = compile_sfc(
            "<script setup lang=\"ts\">\nimport type { Props } from './types'\ndefineProps<Props>()\n</script>",
        );
        assert_eq!(out.deps, vec!["src/types".to_string()]);
    }

    #[test]
    fn test_css_vars_in_setup() {
        let out = compile_sfc(
            "<script setup>\nimport { ref } from 'vue'\nconst color = ref('red')\n</script>\n<style>.a { color: v-bind(color) }</style>",
        );
        let code = &out.block.content;
        assert!(code.starts_with("import { useCssVars as _useCssVars, unref as _unref } from 'vue'\n"));
        assert!(code.contains("\"abc-color\": (color.value)"));
    }

    #[test]
    fn test_normal_script_only() {
        let out = compile_sfc(
            "<script>\nexport default {\n  props: ['title'],\n  inject: ['theme'],\n  data() { return { count: 0 } },\n  computed: { double() { return 2 } },\n  methods: { go() {} },\n  setup() { return { fromSetup: 1 } }\n}\n</script>",
        );
        assert_eq!(binding(&out, "title"), Some("props"));
        assert_eq!(binding(&out, "theme"), Some("options"));
        assert_eq!(binding(&out, "count"), Some("data"));
        assert_eq!(binding(&out, "double"), Some("options"));
        assert_eq!(binding(&out, "go"), Some("options"));
        assert_eq!(binding(&out, "fromSetup"), Some("setup-maybe-ref"));
        assert!(out.block.content.contains("export default {"));
    }

    #[test]
    fn test_normal_script_css_vars() {
        let out = compile_sfc(
            "<script>\nexport default { data() { return { c: 'red' } } }\n</script>\n<style>.a { color: v-bind(c) }</style>",
        );
        let code = &out.block.content;
        assert!(code.contains("const __default__ = { data()"));
        assert!(code.contains("\"abc-c\": (_ctx.c)"));
        assert!(code.ends_with("\nexport default __default__"));
    }

    #[test]
    fn test_result_value_shape() {
        let out = compile_sfc("<script setup>\nimport { ref } from 'vue'\nconst a = ref(1)\n</script>");
        let v = out.to_value();
        assert_eq!(v.get_string("type"), Some("script".to_string()));
        assert_eq!(v.get("setup"), Some(JsValue::Boolean(true)));
        let bindings = v.get("bindings").unwrap();
        assert_eq!(bindings.own_entry_at(0), Some(("ref".to_string(), JsValue::from("setup-const"))));
        let import = v.get("imports").and_then(|i| i.get("ref")).unwrap();
        assert_eq!(import.get_string("source"), Some("vue".to_string()));
    }

    #[test]
    fn test_resolve_relative() {
        assert_eq!(resolve_relative("src/comp/App.vue", "../types"), "src/types");
        assert_eq!(resolve_relative("App.vue", "./a.ts"), "a.ts");
    }
}

//! Identifier prefixing for template and CSS-variable expressions.
//!
//! Free identifiers are rewritten to read from the render proxies
//! (`$setup.x`, `$props.x`, `_ctx.x`, ...) according to the binding metadata
//! produced by `compileScript`.

use std::collections::HashSet;

use crate::parser::script::{matching_close, pattern_names, split_top_level, tokenize, Token, TokenKind};

lazy_static! {
    static ref GLOBALS: HashSet<&'static str> = [
        "Infinity", "undefined", "NaN", "isFinite", "isNaN", "parseFloat", "parseInt",
        "decodeURI", "decodeURIComponent", "encodeURI", "encodeURIComponent", "Math", "Number",
        "Date", "Array", "Object", "Boolean", "String", "RegExp", "Map", "Set", "JSON", "Intl",
        "BigInt", "console", "Error", "Symbol",
    ]
    .iter()
    .copied()
    .collect();
    static ref KEYWORDS: HashSet<&'static str> = [
        "true", "false", "null", "this", "typeof", "instanceof", "in", "of", "new", "delete",
        "void", "await", "async", "function", "return", "if", "else", "let", "const", "var",
        "class", "super", "yield",
    ]
    .iter()
    .copied()
    .collect();
}

/// How a top-level name is reachable from the render function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingType {
    Data,
    Props,
    PropsAliased,
    SetupLet,
    SetupConst,
    SetupReactiveConst,
    SetupMaybeRef,
    SetupRef,
    Options,
    LiteralConst,
}

impl BindingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BindingType::Data => "data",
            BindingType::Props => "props",
            BindingType::PropsAliased => "props-aliased",
            BindingType::SetupLet => "setup-let",
            BindingType::SetupConst => "setup-const",
            BindingType::SetupReactiveConst => "setup-reactive-const",
            BindingType::SetupMaybeRef => "setup-maybe-ref",
            BindingType::SetupRef => "setup-ref",
            BindingType::Options => "options",
            BindingType::LiteralConst => "literal-const",
        }
    }

    pub fn parse(s: &str) -> Option<BindingType> {
        Some(match s {
            "data" => BindingType::Data,
            "props" => BindingType::Props,
            "props-aliased" => BindingType::PropsAliased,
            "setup-let" => BindingType::SetupLet,
            "setup-const" => BindingType::SetupConst,
            "setup-reactive-const" => BindingType::SetupReactiveConst,
            "setup-maybe-ref" => BindingType::SetupMaybeRef,
            "setup-ref" => BindingType::SetupRef,
            "options" => BindingType::Options,
            "literal-const" => BindingType::LiteralConst,
            _ => return None,
        })
    }

    fn proxy(&self) -> &'static str {
        match self {
            BindingType::Data => "$data",
            BindingType::Props | BindingType::PropsAliased => "$props",
            BindingType::Options => "$options",
            _ => "$setup",
        }
    }
}

/// Ordered binding metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings {
    entries: Vec<(String, BindingType)>,
}

impl Bindings {
    pub fn new() -> Self {
        Bindings::default()
    }

    /// Inserts or overwrites, keeping the first insertion position.
    pub fn insert(&mut self, name: &str, ty: BindingType) {
        match self.entries.iter_mut().find(|(k, _)| k == name) {
            Some(entry) => entry.1 = ty,
            None => self.entries.push((name.to_string(), ty)),
        }
    }

    pub fn get(&self, name: &str) -> Option<BindingType> {
        self.entries.iter().find(|(k, _)| k == name).map(|(_, t)| *t)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, BindingType)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub struct PrefixContext<'b> {
    pub bindings: Option<&'b Bindings>,
    /// Names in scope from `v-for`, slot props or handler parameters.
    pub locals: Vec<String>,
    /// Reference setup bindings directly, as code inside `setup()` does,
    /// instead of through the render proxies.
    pub inline: bool,
}

impl<'b> PrefixContext<'b> {
    pub fn new(bindings: Option<&'b Bindings>) -> Self {
        PrefixContext {
            bindings,
            locals: Vec::new(),
            inline: false,
        }
    }

    pub fn inline(bindings: Option<&'b Bindings>) -> Self {
        PrefixContext {
            inline: true,
            ..PrefixContext::new(bindings)
        }
    }

    fn is_local(&self, name: &str) -> bool {
        self.locals.iter().any(|l| l == name)
    }

    fn rewrite(&self, name: &str) -> Option<String> {
        if self.is_local(name) || GLOBALS.contains(name) || KEYWORDS.contains(name) {
            return None;
        }
        let ty = self.bindings.and_then(|b| b.get(name));
        if self.inline {
            return Some(match ty {
                Some(BindingType::SetupRef) => format!("{}.value", name),
                Some(BindingType::SetupMaybeRef) | Some(BindingType::SetupLet) => {
                    format!("_unref({})", name)
                }
                Some(BindingType::SetupConst)
                | Some(BindingType::SetupReactiveConst)
                | Some(BindingType::LiteralConst) => name.to_string(),
                Some(BindingType::Props) | Some(BindingType::PropsAliased) => {
                    format!("__props.{}", name)
                }
                _ => format!("_ctx.{}", name),
            });
        }
        Some(match ty {
            Some(ty) => format!("{}.{}", ty.proxy(), name),
            None => format!("_ctx.{}", name),
        })
    }

    /// Rewrites free identifiers of `expr`.
    pub fn prefix(&self, expr: &str) -> String {
        let tokens = tokenize(expr);
        let mut scoped = PrefixContext {
            bindings: self.bindings,
            locals: self.locals.clone(),
            inline: self.inline,
        };
        scoped.locals.extend(arrow_params(&tokens));

        let mut out = String::with_capacity(expr.len() + 16);
        let mut pos = 0;
        for (i, t) in tokens.iter().enumerate() {
            let replacement = match t.kind {
                TokenKind::Ident => scoped.ident_replacement(&tokens, i),
                TokenKind::Template if t.text.contains("${") => Some(scoped.prefix_template(t.text)),
                _ => None,
            };
            if let Some(r) = replacement {
                out.push_str(&expr[pos..t.start]);
                out.push_str(&r);
                pos = t.end;
            }
        }
        out.push_str(&expr[pos..]);
        out
    }

    fn ident_replacement(&self, tokens: &[Token], i: usize) -> Option<String> {
        let t = &tokens[i];
        let prev = if i > 0 { tokens.get(i - 1) } else { None };
        let next = tokens.get(i + 1);
        if prev.map_or(false, |p| p.is(".") || p.is("?.")) {
            return None;
        }
        if next.map_or(false, |n| n.is("=>")) {
            return None;
        }
        if in_object_key_position(tokens, i) {
            let shorthand = next.map_or(true, |n| n.is(",") || n.is("}"));
            if !shorthand {
                return None;
            }
            return self.rewrite(t.text).map(|r| format!("{}: {}", t.text, r));
        }
        self.rewrite(t.text)
    }

    fn prefix_template(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len() + 16);
        let mut rest = text;
        while let Some(i) = rest.find("${") {
            out.push_str(&rest[..i + 2]);
            rest = &rest[i + 2..];
            let mut depth = 1;
            let mut end = rest.len();
            for (j, c) in rest.char_indices() {
                match c {
                    '{' => depth += 1,
                    '}' => {
                        depth -= 1;
                        if depth == 0 {
                            end = j;
                            break;
                        }
                    }
                    _ => {}
                }
            }
            out.push_str(&self.prefix(&rest[..end]));
            rest = &rest[end..];
        }
        out.push_str(rest);
        out
    }
}

/// Whether the identifier at `i` sits where an object literal key goes.
fn in_object_key_position(tokens: &[Token], i: usize) -> bool {
    let prev = match i.checked_sub(1).and_then(|p| tokens.get(p)) {
        Some(p) => p,
        None => return false,
    };
    if !(prev.is("{") || prev.is(",")) {
        return false;
    }
    let next_is_key_end = tokens
        .get(i + 1)
        .map_or(false, |n| n.is(":") || n.is(",") || n.is("}"));
    if !next_is_key_end {
        return false;
    }
    innermost_open(tokens, i).map_or(false, |o| tokens[o].is("{"))
}

/// Index of the innermost unclosed bracket before `i`.
fn innermost_open(tokens: &[Token], i: usize) -> Option<usize> {
    let mut depth = 0;
    for j in (0..i).rev() {
        let t = &tokens[j];
        if t.kind != TokenKind::Punct {
            continue;
        }
        match t.text {
            ")" | "]" | "}" => depth += 1,
            "(" | "[" | "{" => {
                if depth == 0 {
                    return Some(j);
                }
                depth -= 1;
            }
            _ => {}
        }
    }
    None
}

/// Parameter names of every arrow function in the token stream.
pub fn arrow_params(tokens: &[Token]) -> Vec<String> {
    let mut names = Vec::new();
    for (i, t) in tokens.iter().enumerate() {
        if !t.is("=>") || i == 0 {
            continue;
        }
        let prev = &tokens[i - 1];
        if prev.is_ident() {
            names.push(prev.text.to_string());
        } else if prev.is(")") {
            if let Some(open) = matching_open(tokens, i - 1) {
                for param in split_top_level(&tokens[open + 1..i - 1], ",") {
                    names.extend(pattern_names(param));
                }
            }
        }
    }
    names
}

fn matching_open(tokens: &[Token], close: usize) -> Option<usize> {
    (0..close).rev().find(|&o| tokens[o].is("(") && matching_close(tokens, o) == Some(close))
}

/// Whether `expr` is a plain member path such as `a`, `a.b` or `a[0]`.
pub fn is_member_expression(expr: &str) -> bool {
    let tokens = tokenize(expr.trim());
    if tokens.is_empty() || !tokens[0].is_ident() || KEYWORDS.contains(tokens[0].text) {
        return false;
    }
    let mut i = 1;
    while i < tokens.len() {
        let t = &tokens[i];
        if (t.is(".") || t.is("?.")) && tokens.get(i + 1).map_or(false, |n| n.is_ident()) {
            i += 2;
        } else if t.is("[") {
            match matching_close(&tokens, i) {
                Some(close) => i = close + 1,
                None => return false,
            }
        } else {
            return false;
        }
    }
    true
}

/// Whether `expr` is a function expression: an arrow or `function`.
pub fn is_function_expression(expr: &str) -> bool {
    let tokens = tokenize(expr.trim());
    match tokens.first() {
        Some(t) if t.is("function") => true,
        Some(t) if t.is("async") => tokens.get(1).map_or(false, |n| n.is("function")) || tokens.iter().any(|x| x.is("=>")),
        Some(t) if t.is_ident() => tokens.get(1).map_or(false, |n| n.is("=>")),
        Some(t) if t.is("(") => matching_close(&tokens, 0)
            .and_then(|c| tokens.get(c + 1))
            .map_or(false, |n| n.is("=>")),
        _ => false,
    }
}

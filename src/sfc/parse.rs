//! The `parse` entry point: splits a single-file component into blocks.

use crate::parser::template::{parse_start_tag, parse_template, Attribute, StartTag, MISSING_END_TAG};
use crate::parser::util::{find_ignore_ascii_case, LineIndex};
use crate::runner::ds::builder::build_object;
use crate::runner::ds::error::JErrorType;
use crate::runner::ds::value::JsValue;
use crate::runner::plugin::types::{arg, InvokeContext};

use super::descriptor::{
    errors_to_value, AttrValue, CompilerError, SfcBlock, SfcDescriptor, SourceLocation,
    DEFAULT_FILENAME,
};

pub struct ParseOutput {
    pub descriptor: SfcDescriptor,
    pub errors: Vec<CompilerError>,
}

impl ParseOutput {
    pub fn to_value(&self) -> JsValue {
        build_object()
            .add_field("descriptor", self.descriptor.to_value())
            .add_field("errors", errors_to_value(&self.errors))
            .build()
    }
}

/// `parse(source, { filename })`
pub fn parse(_ctx: &mut InvokeContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let source = arg(&args, 0);
    let source = source
        .as_str()
        .ok_or_else(|| JErrorType::TypeError("source must be a string".to_string()))?;
    let filename = arg(&args, 1)
        .get_string("filename")
        .filter(|f| !f.is_empty())
        .unwrap_or_else(|| DEFAULT_FILENAME.to_string());
    Ok(parse_sfc(source, &filename).to_value())
}

pub fn parse_sfc(source: &str, filename: &str) -> ParseOutput {
    let mut descriptor = SfcDescriptor::new(filename, source);
    let mut errors = Vec::new();
    let index = LineIndex::new(source);
    let mut pos = 0;

    while let Some(found) = source[pos..].find('<') {
        let open = pos + found;
        let rest = &source[open..];
        if rest.starts_with("<!--") {
            pos = match rest.find("-->") {
                Some(end) => open + end + 3,
                None => source.len(),
            };
            continue;
        }
        let tag = match parse_start_tag(rest) {
            Some(tag) => tag,
            None => {
                pos = open + 1;
                continue;
            }
        };
        let content_start = open + tag.len;
        let (content_end, next) = if tag.self_closing {
            (content_start, content_start)
        } else {
            match find_end_tag(source, &tag.name, content_start) {
                Some((end, after)) => (end, after),
                None => {
                    errors.push(CompilerError::at(MISSING_END_TAG, index.position(open)));
                    (source.len(), source.len())
                }
            }
        };
        pos = next;

        let block = create_block(source, &index, &tag, content_start, content_end);
        match block.block_type.as_str() {
            "template" => {
                if descriptor.template.is_some() {
                    errors.push(duplicate_block_error(&block, &index, open));
                    continue;
                }
                if matches!(block.lang.as_deref(), None | Some("html")) && block.src.is_none() {
                    if let Err(e) = parse_template(&block.content) {
                        errors.push(CompilerError::at(
                            e.message,
                            index.position(content_start + e.offset),
                        ));
                    }
                }
                descriptor.template = Some(block);
            }
            "script" => {
                if is_ignorable(&block) {
                    continue;
                }
                let is_setup = block.setup.is_some();
                if is_setup && descriptor.script_setup.is_none() {
                    descriptor.script_setup = Some(block);
                } else if !is_setup && descriptor.script.is_none() {
                    descriptor.script = Some(block);
                } else {
                    errors.push(duplicate_block_error(&block, &index, open));
                }
            }
            "style" => {
                if !is_ignorable(&block) {
                    descriptor.styles.push(block);
                }
            }
            _ => {
                if !is_ignorable(&block) {
                    descriptor.custom_blocks.push(block);
                }
            }
        }
    }

    if descriptor.script_setup.as_ref().map_or(false, |s| s.src.is_some()) {
        errors.push(CompilerError::new(
            "<script setup> cannot use the \"src\" attribute because its syntax will be ambiguous outside of the component.",
        ));
        descriptor.script_setup = None;
    }
    if let (Some(script), Some(setup)) = (&descriptor.script, &descriptor.script_setup) {
        if script.src.is_some() {
            errors.push(CompilerError::new(
                "<script> cannot use the \"src\" attribute when <script setup> is also present because they must be processed together.",
            ));
            descriptor.script = None;
        } else if script.lang != setup.lang {
            errors.push(CompilerError::new(
                "<script> and <script setup> must have the same language type.",
            ));
        }
    }

    descriptor.css_vars = parse_css_vars(&descriptor.styles);
    descriptor.slotted = descriptor
        .styles
        .iter()
        .any(|s| s.scoped && (s.content.contains(":slotted(") || s.content.contains("::v-slotted(")));

    ParseOutput { descriptor, errors }
}

/// Empty blocks other than `<template>` are dropped unless they point elsewhere.
fn is_ignorable(block: &SfcBlock) -> bool {
    block.src.is_none() && block.content.trim().is_empty()
}

fn duplicate_block_error(block: &SfcBlock, index: &LineIndex, open: usize) -> CompilerError {
    let setup = if block.setup.is_some() { " setup" } else { "" };
    CompilerError::at(
        format!(
            "Single file component can contain only one <{}{}> element",
            block.block_type, setup
        ),
        index.position(open),
    )
}

/// Finds the end tag closing a block whose content starts at `from`.
///
/// Returns the offset of `</name` and the offset just past the end tag.
/// `<template>` nests; every other block is raw text up to its first end tag.
fn find_end_tag(source: &str, name: &str, from: usize) -> Option<(usize, usize)> {
    let close = format!("</{}", name);
    let open = format!("<{}", name);
    let nests = name.eq_ignore_ascii_case("template");
    let mut depth = 0usize;
    let mut pos = from;
    loop {
        let end = next_tag(source, &close, pos)?;
        if nests {
            let mut scan = pos;
            while let Some(inner) = next_tag(source, &open, scan).filter(|&i| i < end) {
                let self_closing = parse_start_tag(&source[inner..]).map_or(false, |t| t.self_closing);
                if !self_closing {
                    depth += 1;
                }
                scan = inner + open.len();
            }
        }
        let after = source[end..].find('>').map_or(source.len(), |i| end + i + 1);
        if depth == 0 {
            return Some((end, after));
        }
        depth -= 1;
        pos = after;
    }
}

/// Like `find_ignore_ascii_case`, but only where the tag name ends.
fn next_tag(source: &str, needle: &str, from: usize) -> Option<usize> {
    let mut pos = from;
    while let Some(i) = find_ignore_ascii_case(source, needle, pos) {
        let next = source.as_bytes().get(i + needle.len()).copied();
        match next {
            None | Some(b'>') | Some(b'/') => return Some(i),
            Some(c) if c.is_ascii_whitespace() => return Some(i),
            _ => pos = i + needle.len(),
        }
    }
    None
}

fn create_block(source: &str, index: &LineIndex, tag: &StartTag, start: usize, end: usize) -> SfcBlock {
    let content = source[start..end].to_string();
    let attrs: Vec<(String, AttrValue)> = tag.attrs.iter().map(attr_entry).collect();
    let find = |name: &str| attrs.iter().find(|(k, _)| k == name).map(|(_, v)| v.clone());
    let text = |name: &str| find(name).and_then(|v| v.as_str().map(|s| s.to_string()));
    let block_type = tag.name.clone();
    let (scoped, module, setup) = match block_type.as_str() {
        "style" => (find("scoped").is_some(), find("module"), None),
        "script" => (false, None, find("setup")),
        _ => (false, None, None),
    };
    SfcBlock {
        block_type,
        loc: SourceLocation {
            start: index.position(start),
            end: index.position(end),
            source: content.clone(),
        },
        content,
        lang: text("lang"),
        src: text("src"),
        attrs,
        scoped,
        module,
        setup,
    }
}

fn attr_entry(attr: &Attribute) -> (String, AttrValue) {
    let value = match &attr.value {
        Some(v) => AttrValue::Str(v.clone()),
        None => AttrValue::Flag,
    };
    (attr.name.clone(), value)
}

/// Collects the unique `v-bind(...)` arguments used across style blocks.
pub fn parse_css_vars(styles: &[SfcBlock]) -> Vec<String> {
    let mut vars: Vec<String> = Vec::new();
    for style in styles {
        let content = strip_css_comments(&style.content);
        for expr in v_bind_args(&content) {
            if !vars.contains(&expr) {
                vars.push(expr);
            }
        }
    }
    vars
}

/// Byte range of the parenthesised argument of each `v-bind(` call.
pub fn v_bind_calls(css: &str) -> Vec<(usize, usize, String)> {
    let mut calls = Vec::new();
    let mut pos = 0;
    while let Some(i) = css[pos..].find("v-bind") {
        let start = pos + i;
        let after = start + "v-bind".len();
        let paren = after + (css[after..].len() - css[after..].trim_start().len());
        pos = after;
        if !css[paren..].starts_with('(') {
            continue;
        }
        let mut depth = 0;
        let mut quote: Option<char> = None;
        let mut close = None;
        for (j, c) in css[paren..].char_indices() {
            match (quote, c) {
                (Some(q), c) if c == q => quote = None,
                (Some(_), _) => {}
                (None, '\'') | (None, '"') => quote = Some(c),
                (None, '(') => depth += 1,
                (None, ')') => {
                    depth -= 1;
                    if depth == 0 {
                        close = Some(paren + j);
                        break;
                    }
                }
                _ => {}
            }
        }
        if let Some(close) = close {
            let raw = css[paren + 1..close].trim();
            let unquoted = raw
                .strip_prefix('\'')
                .and_then(|r| r.strip_suffix('\''))
                .or_else(|| raw.strip_prefix('"').and_then(|r| r.strip_suffix('"')))
                .unwrap_or(raw);
            calls.push((start, close + 1, unquoted.trim().to_string()));
            pos = close + 1;
        }
    }
    calls
}

fn v_bind_args(css: &str) -> Vec<String> {
    v_bind_calls(css).into_iter().map(|(_, _, expr)| expr).collect()
}

fn strip_css_comments(css: &str) -> String {
    let mut out = String::with_capacity(css.len());
    let mut rest = css;
    while let Some(i) = rest.find("/*") {
        out.push_str(&rest[..i]);
        rest = match rest[i + 2..].find("*/") {
            Some(j) => &rest[i + 2 + j + 2..],
            None => "",
        };
    }
    out.push_str(rest);
    out
}

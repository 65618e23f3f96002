//! The `compileTemplate` entry point: template markup to a render function
//! module.

use std::collections::HashSet;

use crate::parser::script::{is_identifier, pattern_names, split_top_level, tokenize};
use crate::parser::template::{parse_template, Attribute, ElementNode, TemplateNode};
use crate::parser::util::{indent_value, LineIndex};
use crate::runner::ds::builder::{build_array, build_object};
use crate::runner::ds::error::JErrorType;
use crate::runner::ds::value::JsValue;
use crate::runner::plugin::types::{arg, InvokeContext};

use super::descriptor::{errors_to_value, CompilerError, DEFAULT_FILENAME};
use super::expression::{is_function_expression, is_member_expression, BindingType, Bindings, PrefixContext};
use super::{camelize, capitalize, short_id};

lazy_static! {
    static ref HTML_TAGS: HashSet<&'static str> = "html,body,base,head,link,meta,style,title,address,article,aside,footer,\
        header,hgroup,h1,h2,h3,h4,h5,h6,nav,section,div,dd,dl,dt,figcaption,figure,picture,hr,img,li,main,ol,p,pre,\
        ul,a,b,abbr,bdi,bdo,br,cite,code,data,dfn,em,i,kbd,mark,q,rp,rt,ruby,s,samp,small,span,strong,sub,sup,time,\
        u,var,wbr,area,audio,map,track,video,embed,object,param,source,canvas,script,noscript,del,ins,caption,col,\
        colgroup,table,thead,tbody,td,th,tr,button,datalist,fieldset,form,input,label,legend,meter,optgroup,option,\
        output,progress,select,textarea,details,dialog,menu,summary,template,blockquote,iframe,tfoot,search"
        .split(',')
        .collect();
    static ref SVG_TAGS: HashSet<&'static str> = "svg,animate,animateMotion,animateTransform,circle,clipPath,\
        color-profile,defs,desc,discard,ellipse,feBlend,feColorMatrix,feComponentTransfer,feComposite,\
        feConvolveMatrix,feDiffuseLighting,feDisplacementMap,feDistantLight,feDropShadow,feFlood,feFuncA,feFuncB,\
        feFuncG,feFuncR,feGaussianBlur,feImage,feMerge,feMergeNode,feMorphology,feOffset,fePointLight,\
        feSpecularLighting,feSpotLight,feTile,feTurbulence,filter,foreignObject,g,hatch,hatchpath,image,line,\
        linearGradient,marker,mask,mesh,meshgradient,meshpatch,meshrow,metadata,mpath,path,pattern,polygon,\
        polyline,radialGradient,rect,set,solidcolor,stop,switch,symbol,text,textPath,tspan,unknown,use,view"
        .split(',')
        .collect();
}

const TEXT: i32 = 1;
const CLASS: i32 = 1 << 1;
const STYLE: i32 = 1 << 2;
const PROPS: i32 = 1 << 3;
const FULL_PROPS: i32 = 1 << 4;
const NEED_HYDRATION: i32 = 1 << 5;
const STABLE_FRAGMENT: i32 = 1 << 6;
const KEYED_FRAGMENT: i32 = 1 << 7;
const UNKEYED_FRAGMENT: i32 = 1 << 8;
const NEED_PATCH: i32 = 1 << 9;
const DYNAMIC_SLOTS: i32 = 1 << 10;
const DEV_ROOT_FRAGMENT: i32 = 1 << 11;

const FLAG_NAMES: &[(i32, &str)] = &[
    (TEXT, "TEXT"),
    (CLASS, "CLASS"),
    (STYLE, "STYLE"),
    (PROPS, "PROPS"),
    (FULL_PROPS, "FULL_PROPS"),
    (NEED_HYDRATION, "NEED_HYDRATION"),
    (STABLE_FRAGMENT, "STABLE_FRAGMENT"),
    (KEYED_FRAGMENT, "KEYED_FRAGMENT"),
    (UNKEYED_FRAGMENT, "UNKEYED_FRAGMENT"),
    (NEED_PATCH, "NEED_PATCH"),
    (DYNAMIC_SLOTS, "DYNAMIC_SLOTS"),
    (DEV_ROOT_FRAGMENT, "DEV_ROOT_FRAGMENT"),
];

const NO_ADJACENT_IF: &str = "v-else/v-else-if has no adjacent v-if or v-else-if.";
const FOR_MISSING_EXPRESSION: &str = "v-for is missing expression.";
const FOR_MALFORMED: &str = "v-for has invalid expression.";
const MODEL_MISSING_EXPRESSION: &str = "v-model is missing expression.";
const MODEL_MALFORMED: &str = "v-model value must be a valid JavaScript member expression.";
const MODEL_ON_SCOPE: &str =
    "v-model cannot be used on v-for or v-slot scope variables because they are not writable.";
const MODEL_ARG_ON_ELEMENT: &str = "v-model argument is not supported on plain elements.";
const MODEL_ON_INVALID_ELEMENT: &str = "v-model can only be used on <input>, <textarea> and <select> elements.";
const HTML_WITH_CHILDREN: &str = "v-html will override element children.";
const TEXT_WITH_CHILDREN: &str = "v-text will override element children.";
const SLOT_MISPLACED: &str = "v-slot can only be used on components or <template> tags.";
const IF_WITH_FOR_TIP: &str =
    "v-if has higher priority than v-for when used on the same element; move v-if to a wrapper <template>.";

const EVENT_OPTION_MODIFIERS: &[&str] = &["passive", "once", "capture"];
const NON_KEY_MODIFIERS: &[&str] = &["stop", "prevent", "self", "ctrl", "shift", "alt", "meta", "exact", "middle"];

pub struct TemplateOptions {
    pub source: String,
    pub filename: String,
    pub id: String,
    pub scoped: bool,
    pub bindings: Option<Bindings>,
}

impl TemplateOptions {
    fn from_value(v: &JsValue) -> Result<Self, JErrorType> {
        let bindings = v
            .get_present("compilerOptions")
            .and_then(|o| o.get_present("bindingMetadata"))
            .and_then(|b| bindings_from_value(&b));
        Ok(TemplateOptions {
            source: v
                .get_string("source")
                .ok_or_else(|| JErrorType::TypeError("options.source must be a string".to_string()))?,
            filename: v
                .get_string("filename")
                .filter(|f| !f.is_empty())
                .unwrap_or_else(|| DEFAULT_FILENAME.to_string()),
            id: v.get_string("id").unwrap_or_default(),
            scoped: v.get_bool("scoped").unwrap_or(false),
            bindings,
        })
    }
}

/// Binding metadata as produced by `compileScript`; unknown entries are
/// skipped.
pub fn bindings_from_value(v: &JsValue) -> Option<Bindings> {
    let count = v.own_key_count()?;
    let mut bindings = Bindings::new();
    for i in 0..count {
        if let Some((name, JsValue::String(ty))) = v.own_entry_at(i) {
            if let Some(ty) = BindingType::parse(&ty) {
                bindings.insert(&name, ty);
            }
        }
    }
    Some(bindings)
}

pub struct TemplateOutput {
    pub code: String,
    pub source: String,
    pub errors: Vec<CompilerError>,
    pub tips: Vec<String>,
}

impl TemplateOutput {
    pub fn to_value(&self) -> JsValue {
        build_object()
            .add_field("code", self.code.as_str())
            .add_field("source", self.source.as_str())
            .add_field("errors", errors_to_value(&self.errors))
            .add_field("tips", build_array(self.tips.iter().map(|t| t.as_str())))
            .build()
    }
}

/// `compileTemplate({ source, filename, id, scoped, compilerOptions })`
pub fn compile_template(
    _ctx: &mut InvokeContext,
    _this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    let options = TemplateOptions::from_value(&arg(&args, 0))?;
    Ok(compile(&options).to_value())
}

pub fn compile(options: &TemplateOptions) -> TemplateOutput {
    let index = LineIndex::new(&options.source);
    let nodes = match parse_template(&options.source) {
        Ok(nodes) => nodes,
        Err(e) => {
            return TemplateOutput {
                code: String::new(),
                source: options.source.clone(),
                errors: vec![CompilerError::at(e.message, index.position(e.offset))],
                tips: Vec::new(),
            }
        }
    };
    let mut gen = Codegen {
        index,
        ctx: PrefixContext::new(options.bindings.as_ref()),
        bindings: options.bindings.as_ref(),
        scope_attr: if options.scoped {
            Some(format!("data-v-{}", short_id(&options.id)))
        } else {
            None
        },
        helpers: Vec::new(),
        assets: Vec::new(),
        cache: 0,
        errors: Vec::new(),
        tips: Vec::new(),
    };
    let body = gen.gen_root(&nodes);
    let code = if gen.errors.is_empty() {
        gen.module(&body)
    } else {
        String::new()
    };
    TemplateOutput {
        code,
        source: options.source.clone(),
        errors: gen.errors,
        tips: gen.tips,
    }
}

/// JSON-style string literal.
fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn prop_key(name: &str) -> String {
    if is_identifier(name) {
        name.to_string()
    } else {
        quote(name)
    }
}

fn patch_flag(flag: i32) -> String {
    let names: Vec<&str> = FLAG_NAMES
        .iter()
        .filter(|(bit, _)| flag & bit != 0)
        .map(|(_, name)| *name)
        .collect();
    format!("{} /* {} */", flag, names.join(", "))
}

/// `[\n  a,\n  b\n]`
fn array(items: &[String]) -> String {
    if items.is_empty() {
        return "[]".to_string();
    }
    let items: Vec<String> = items.iter().map(|i| indent_value(i, 1)).collect();
    format!("[\n  {}\n]", items.join(",\n  "))
}

/// Drops trailing `null` arguments.
fn call(callee: &str, args: Vec<String>) -> String {
    let mut args = args;
    while args.last().map_or(false, |a| a == "null") {
        args.pop();
    }
    format!("{}({})", callee, args.join(", "))
}

fn is_html_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r' | '\u{c}')
}

fn condense(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for c in text.chars() {
        if is_html_whitespace(c) {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}

/// `color: red; font-size: 1px` to `{"color":"red","font-size":"1px"}`.
fn static_style(text: &str) -> String {
    let mut entries = Vec::new();
    let mut depth = 0;
    let mut start = 0;
    let mut declarations = Vec::new();
    for (i, c) in text.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            ';' if depth == 0 => {
                declarations.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    declarations.push(&text[start..]);
    for decl in declarations {
        if let Some((name, value)) = decl.split_once(':') {
            let (name, value) = (name.trim(), value.trim());
            if !name.is_empty() {
                entries.push(format!("{}:{}", quote(name), quote(value)));
            }
        }
    }
    format!("{{{}}}", entries.join(","))
}

/// `_component_my_comp` for `my-comp`.
fn asset_id(kind: &str, name: &str) -> String {
    let mut id = format!("_{}_", kind);
    for c in name.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            id.push(c);
        } else if c == '-' {
            id.push('_');
        } else {
            id.push_str(&(c as u32).to_string());
        }
    }
    id
}

#[derive(Debug, Clone, PartialEq)]
enum DirArg {
    Static(String),
    Dynamic(String),
}

#[derive(Debug, Clone, PartialEq)]
struct Directive<'n> {
    name: String,
    arg: Option<DirArg>,
    modifiers: Vec<String>,
    value: Option<&'n str>,
    offset: usize,
}

impl<'n> Directive<'n> {
    fn has_modifier(&self, m: &str) -> bool {
        self.modifiers.iter().any(|x| x == m)
    }

    fn static_arg(&self) -> Option<&str> {
        match &self.arg {
            Some(DirArg::Static(s)) => Some(s),
            _ => None,
        }
    }
}

/// Splits `v-name:arg.mod`, `:arg`, `@arg` and `#arg` attribute names.
fn parse_directive(attr: &Attribute) -> Option<Directive<'_>> {
    let raw = attr.name.as_str();
    let (name, rest) = if let Some(r) = raw.strip_prefix("v-") {
        let end = r.find(|c| c == ':' || c == '.').unwrap_or(r.len());
        let rest = &r[end..];
        (&r[..end], rest.strip_prefix(':').map(|a| (a, true)).unwrap_or((rest, false)))
    } else if let Some(r) = raw.strip_prefix(':') {
        ("bind", (r, true))
    } else if let Some(r) = raw.strip_prefix('.') {
        ("bind", (r, true))
    } else if let Some(r) = raw.strip_prefix('@') {
        ("on", (r, true))
    } else if let Some(r) = raw.strip_prefix('#') {
        ("slot", (r, true))
    } else {
        return None;
    };
    let (text, has_arg) = rest;
    let (arg, modifiers) = if has_arg && text.starts_with('[') {
        match text.find(']') {
            Some(close) => (
                Some(DirArg::Dynamic(text[1..close].to_string())),
                &text[close + 1..],
            ),
            None => (Some(DirArg::Dynamic(text[1..].to_string())), ""),
        }
    } else if has_arg {
        let end = text.find('.').unwrap_or(text.len());
        (Some(DirArg::Static(text[..end].to_string())), &text[end..])
    } else {
        (None, text)
    };
    let mut modifiers: Vec<String> = modifiers
        .split('.')
        .filter(|m| !m.is_empty())
        .map(|m| m.to_string())
        .collect();
    if raw.starts_with('.') {
        modifiers.push("prop".to_string());
    }
    Some(Directive {
        name: name.to_string(),
        arg,
        modifiers,
        value: attr.value.as_deref(),
        offset: attr.span.start,
    })
}

fn has_directive(el: &ElementNode, name: &str) -> bool {
    find_directive(el, name).is_some()
}

fn find_directive<'n>(el: &'n ElementNode, name: &str) -> Option<Directive<'n>> {
    el.attrs
        .iter()
        .filter_map(parse_directive)
        .find(|d| d.name == name)
}

#[derive(Debug, Clone, PartialEq)]
enum TextPart<'n> {
    Static(String),
    Expr(&'n str),
}

enum Item<'n> {
    Text(Vec<TextPart<'n>>),
    Comment(&'n str),
    Element(&'n ElementNode),
    If(Vec<(Option<&'n str>, &'n ElementNode)>),
}

impl<'n> Item<'n> {
    fn is_blank(&self) -> bool {
        match self {
            Item::Comment(_) => true,
            Item::Text(parts) => parts.iter().all(|p| match p {
                TextPart::Static(s) => s.chars().all(is_html_whitespace),
                TextPart::Expr(_) => false,
            }),
            _ => false,
        }
    }
}

enum Raw<'n> {
    Text(String),
    Interpolation(&'n str),
    Comment(&'n str),
    Element(&'n ElementNode),
}

enum PropKey {
    Static(String),
    Dynamic(String),
}

enum PropValue {
    Code(String),
    /// Values with whether each is dynamic.
    Class(Vec<(String, bool)>),
    Style(Vec<(String, bool)>),
}

enum PropSegment {
    Object(Vec<(PropKey, PropValue)>),
    Spread(String),
}

#[derive(Default)]
struct PropsBuilder {
    segments: Vec<PropSegment>,
    current: Vec<(PropKey, PropValue)>,
    dynamic_names: Vec<String>,
    class_dynamic: bool,
    style_dynamic: bool,
    full_props: bool,
    hydration: bool,
}

impl PropsBuilder {
    fn push(&mut self, key: PropKey, value: PropValue) {
        self.current.push((key, value));
    }

    fn push_code(&mut self, name: &str, code: String) {
        self.push(PropKey::Static(name.to_string()), PropValue::Code(code));
    }

    fn push_dynamic(&mut self, name: &str, code: String) {
        if !self.dynamic_names.iter().any(|n| n == name) {
            self.dynamic_names.push(name.to_string());
        }
        self.push_code(name, code);
    }

    fn push_class(&mut self, code: String, dynamic: bool) {
        self.class_dynamic |= dynamic;
        for (key, value) in self.current.iter_mut() {
            if let (PropKey::Static(k), PropValue::Class(values)) = (key, value) {
                if k == "class" {
                    values.push((code, dynamic));
                    return;
                }
            }
        }
        self.push(PropKey::Static("class".to_string()), PropValue::Class(vec![(code, dynamic)]));
    }

    fn push_style(&mut self, code: String, dynamic: bool) {
        self.style_dynamic |= dynamic;
        for (key, value) in self.current.iter_mut() {
            if let (PropKey::Static(k), PropValue::Style(values)) = (key, value) {
                if k == "style" {
                    values.push((code, dynamic));
                    return;
                }
            }
        }
        self.push(PropKey::Static("style".to_string()), PropValue::Style(vec![(code, dynamic)]));
    }

    fn spread(&mut self, code: String) {
        self.flush();
        self.segments.push(PropSegment::Spread(code));
        self.full_props = true;
    }

    fn flush(&mut self) {
        if !self.current.is_empty() {
            let current = std::mem::take(&mut self.current);
            self.segments.push(PropSegment::Object(current));
        }
    }
}

struct Codegen<'b> {
    index: LineIndex<'b>,
    ctx: PrefixContext<'b>,
    bindings: Option<&'b Bindings>,
    scope_attr: Option<String>,
    helpers: Vec<&'static str>,
    /// `const _component_x = ...` lines hoisted to the top of `render`.
    assets: Vec<String>,
    cache: usize,
    errors: Vec<CompilerError>,
    tips: Vec<String>,
}

impl<'b> Codegen<'b> {
    fn helper(&mut self, name: &'static str) -> String {
        if !self.helpers.contains(&name) {
            self.helpers.push(name);
        }
        format!("_{}", name)
    }

    fn error(&mut self, message: &str, offset: usize) {
        self.errors.push(CompilerError::at(message, self.index.position(offset)));
    }

    fn expr(&self, e: &str) -> String {
        self.ctx.prefix(e.trim())
    }

    fn references_locals(&self, e: &str) -> bool {
        tokenize(e)
            .iter()
            .any(|t| t.is_ident() && self.ctx.locals.iter().any(|l| l == t.text))
    }

    fn with_locals<T>(&mut self, names: Vec<String>, f: impl FnOnce(&mut Self) -> T) -> T {
        let mark = self.ctx.locals.len();
        self.ctx.locals.extend(names);
        let out = f(self);
        self.ctx.locals.truncate(mark);
        out
    }

    fn cached(&mut self, code: String) -> String {
        let i = self.cache;
        self.cache += 1;
        format!("_cache[{i}] || (_cache[{i}] = {code})", i = i, code = code)
    }

    fn module(&self, body: &str) -> String {
        let mut code = String::new();
        if !self.helpers.is_empty() {
            let imports: Vec<String> = self.helpers.iter().map(|h| format!("{} as _{}", h, h)).collect();
            code.push_str(&format!("import {{ {} }} from \"vue\"\n\n", imports.join(", ")));
        }
        let params = if self.bindings.is_some() {
            "_ctx, _cache, $props, $setup, $data, $options"
        } else {
            "_ctx, _cache"
        };
        code.push_str(&format!("export function render({}) {{\n", params));
        for asset in &self.assets {
            code.push_str(&format!("  {}\n", asset));
        }
        if !self.assets.is_empty() {
            code.push('\n');
        }
        code.push_str(&format!("  return {}\n}}", indent_value(body, 1)));
        code
    }

    fn gen_root(&mut self, nodes: &[TemplateNode]) -> String {
        let items = self.prepare_children(nodes, false);
        match items.as_slice() {
            [] => "null".to_string(),
            [Item::Element(el)] => self.gen_element(el, true, None),
            [Item::If(branches)] => self.gen_if(branches),
            [Item::Text(parts)] => self.gen_text(parts).0,
            [Item::Comment(c)] => self.gen_comment(c),
            _ => {
                let mut flag = STABLE_FRAGMENT;
                if items.iter().any(|i| matches!(i, Item::Comment(_))) {
                    flag |= DEV_ROOT_FRAGMENT;
                }
                let children: Vec<String> = items.iter().map(|i| self.gen_item(i)).collect();
                let open = self.helper("openBlock");
                let create = self.helper("createElementBlock");
                let fragment = self.helper("Fragment");
                format!(
                    "({}(), {}({}, null, {}, {}))",
                    open,
                    create,
                    fragment,
                    array(&children),
                    patch_flag(flag)
                )
            }
        }
    }

    /// Condenses whitespace, merges text runs and groups `v-if` chains.
    fn prepare_children<'n>(&mut self, nodes: &'n [TemplateNode], preserve: bool) -> Vec<Item<'n>> {
        let mut raw: Vec<Option<Raw<'n>>> = nodes
            .iter()
            .map(|n| {
                Some(match n {
                    TemplateNode::Text(t, _) => Raw::Text(t.clone()),
                    TemplateNode::Interpolation(e, _) => Raw::Interpolation(e),
                    TemplateNode::Comment(c, _) => Raw::Comment(c),
                    TemplateNode::Element(el) => Raw::Element(el),
                })
            })
            .collect();
        if !preserve {
            for i in 0..nodes.len() {
                let text = match &nodes[i] {
                    TemplateNode::Text(t, _) => t,
                    _ => continue,
                };
                if text.chars().all(is_html_whitespace) {
                    let prev = if i > 0 { nodes.get(i - 1) } else { None };
                    let next = nodes.get(i + 1);
                    let remove = match (prev, next) {
                        (None, _) | (_, None) => true,
                        (Some(TemplateNode::Comment(..)), _) | (_, Some(TemplateNode::Comment(..))) => true,
                        (Some(TemplateNode::Element(_)), Some(TemplateNode::Element(_))) => text.contains('\n'),
                        _ => false,
                    };
                    raw[i] = if remove { None } else { Some(Raw::Text(" ".to_string())) };
                } else {
                    raw[i] = Some(Raw::Text(condense(text)));
                }
            }
        }

        let mut merged: Vec<Item<'n>> = Vec::new();
        for r in raw.into_iter().flatten() {
            let part = match r {
                Raw::Text(t) => TextPart::Static(t),
                Raw::Interpolation(e) => TextPart::Expr(e),
                Raw::Comment(c) => {
                    merged.push(Item::Comment(c));
                    continue;
                }
                Raw::Element(el) => {
                    merged.push(Item::Element(el));
                    continue;
                }
            };
            match merged.last_mut() {
                Some(Item::Text(parts)) => parts.push(part),
                _ => merged.push(Item::Text(vec![part])),
            }
        }

        let mut items: Vec<Item<'n>> = Vec::new();
        let mut iter = merged.into_iter().peekable();
        while let Some(item) = iter.next() {
            let el = match item {
                Item::Element(el) => el,
                other => {
                    items.push(other);
                    continue;
                }
            };
            if let Some(dir) = find_directive(el, "else").or_else(|| find_directive(el, "else-if")) {
                self.error(NO_ADJACENT_IF, dir.offset);
                continue;
            }
            let cond = match find_directive(el, "if") {
                Some(dir) => dir.value.unwrap_or("undefined"),
                None => {
                    items.push(Item::Element(el));
                    continue;
                }
            };
            let mut branches = vec![(Some(cond), el)];
            let mut skipped: Vec<Item<'n>> = Vec::new();
            loop {
                match iter.peek() {
                    Some(next) if next.is_blank() => {
                        if let Some(i) = iter.next() {
                            skipped.push(i);
                        }
                    }
                    Some(Item::Element(next))
                        if has_directive(next, "else-if") || has_directive(next, "else") =>
                    {
                        let next = *next;
                        iter.next();
                        skipped.clear();
                        match find_directive(next, "else-if") {
                            Some(d) => branches.push((Some(d.value.unwrap_or("undefined")), next)),
                            None => {
                                branches.push((None, next));
                                break;
                            }
                        }
                    }
                    _ => break,
                }
            }
            items.push(Item::If(branches));
            items.extend(skipped);
        }
        items
    }

    fn gen_item(&mut self, item: &Item) -> String {
        match item {
            Item::Text(parts) => {
                let (code, dynamic) = self.gen_text(parts);
                let create = self.helper("createTextVNode");
                if dynamic {
                    format!("{}({}, {})", create, code, patch_flag(TEXT))
                } else {
                    format!("{}({})", create, code)
                }
            }
            Item::Comment(c) => self.gen_comment(c),
            Item::Element(el) => self.gen_element(el, false, None),
            Item::If(branches) => self.gen_if(branches),
        }
    }

    fn gen_text(&mut self, parts: &[TextPart]) -> (String, bool) {
        let mut dynamic = false;
        let mut codes = Vec::new();
        for part in parts {
            match part {
                TextPart::Static(s) => codes.push(quote(s)),
                TextPart::Expr(e) => {
                    dynamic = true;
                    let display = self.helper("toDisplayString");
                    codes.push(format!("{}({})", display, self.expr(e)));
                }
            }
        }
        (codes.join(" + "), dynamic)
    }

    fn gen_comment(&mut self, text: &str) -> String {
        let create = self.helper("createCommentVNode");
        format!("{}({})", create, quote(text))
    }

    fn gen_if(&mut self, branches: &[(Option<&str>, &ElementNode)]) -> String {
        let mut out = String::new();
        for (key, (cond, el)) in branches.iter().enumerate() {
            if has_directive(el, "for") && cond.is_some() && has_directive(el, "if") {
                self.tips.push(IF_WITH_FOR_TIP.to_string());
            }
            let node = self.gen_branch(el, key);
            match cond {
                Some(c) => out.push_str(&format!(
                    "({})\n  ? {}\n  : ",
                    self.expr(c),
                    indent_value(&node, 1)
                )),
                None => out.push_str(&indent_value(&node, 1)),
            }
        }
        if branches.last().map_or(false, |(c, _)| c.is_some()) {
            let create = self.helper("createCommentVNode");
            out.push_str(&format!("{}(\"v-if\", true)", create));
        }
        out
    }

    fn gen_branch(&mut self, el: &ElementNode, key: usize) -> String {
        if el.tag == "template" && !has_directive(el, "for") {
            let children = self.gen_children(el, false);
            let open = self.helper("openBlock");
            let create = self.helper("createElementBlock");
            let fragment = self.helper("Fragment");
            return format!(
                "({}(), {}({}, {{ key: {} }}, {}, {}))",
                open,
                create,
                fragment,
                key,
                array(&children),
                patch_flag(STABLE_FRAGMENT)
            );
        }
        self.gen_element(el, true, Some(key))
    }

    fn gen_children(&mut self, el: &ElementNode, preserve: bool) -> Vec<String> {
        let items = self.prepare_children(&el.children, preserve);
        items.iter().map(|i| self.gen_item(i)).collect()
    }

    fn gen_element(&mut self, el: &ElementNode, block: bool, key: Option<usize>) -> String {
        if let Some(dir) = find_directive(el, "for") {
            return self.gen_for(el, &dir, key);
        }
        if el.tag == "slot" {
            return self.gen_slot_outlet(el);
        }
        self.gen_plain(el, block, key)
    }

    fn gen_for(&mut self, el: &ElementNode, dir: &Directive, key: Option<usize>) -> String {
        let value = match dir.value.map(str::trim).filter(|v| !v.is_empty()) {
            Some(v) => v,
            None => {
                self.error(FOR_MISSING_EXPRESSION, dir.offset);
                return "null".to_string();
            }
        };
        let (alias, source) = match split_for(value) {
            Some(parts) => parts,
            None => {
                self.error(FOR_MALFORMED, dir.offset);
                return "null".to_string();
            }
        };
        let params = alias
            .strip_prefix('(')
            .and_then(|a| a.strip_suffix(')'))
            .unwrap_or(alias)
            .trim()
            .to_string();
        let tokens = tokenize(&params);
        let names: Vec<String> = split_top_level(&tokens, ",")
            .into_iter()
            .flat_map(pattern_names)
            .collect();
        let source = self.expr(source);
        let keyed = el
            .attrs
            .iter()
            .any(|a| a.name == "key" || a.name == ":key" || a.name == "v-bind:key");
        let item = self.with_locals(names, |gen| {
            if el.tag == "template" {
                let key_dir = el
                    .attrs
                    .iter()
                    .filter_map(parse_directive)
                    .find(|d| d.name == "bind" && d.static_arg() == Some("key"));
                let key_prop = match key_dir {
                    Some(d) => format!("{{ key: {} }}", gen.expr(d.value.unwrap_or("undefined"))),
                    None => "null".to_string(),
                };
                let children = gen.gen_children(el, false);
                let open = gen.helper("openBlock");
                let create = gen.helper("createElementBlock");
                let fragment = gen.helper("Fragment");
                format!(
                    "({}(), {}({}, {}, {}, {}))",
                    open,
                    create,
                    fragment,
                    key_prop,
                    array(&children),
                    patch_flag(STABLE_FRAGMENT)
                )
            } else if el.tag == "slot" {
                gen.gen_slot_outlet(el)
            } else {
                gen.gen_plain(el, true, None)
            }
        });
        let open = self.helper("openBlock");
        let create = self.helper("createElementBlock");
        let fragment = self.helper("Fragment");
        let render_list = self.helper("renderList");
        let flag = if keyed { KEYED_FRAGMENT } else { UNKEYED_FRAGMENT };
        let fragment_props = match key {
            Some(k) => format!("{{ key: {} }}", k),
            None => "null".to_string(),
        };
        format!(
            "({}(true), {}({}, {}, {}({}, ({}) => {{\n  return {}\n}}), {}))",
            open,
            create,
            fragment,
            fragment_props,
            render_list,
            source,
            params,
            indent_value(&item, 1),
            patch_flag(flag)
        )
    }

    fn gen_slot_outlet(&mut self, el: &ElementNode) -> String {
        let mut name = quote("default");
        let mut props = PropsBuilder::default();
        for attr in &el.attrs {
            match parse_directive(attr) {
                None if attr.name == "name" => name = quote(attr.value.as_deref().unwrap_or("default")),
                None => props.push_code(&attr.name, quote(attr.value.as_deref().unwrap_or(""))),
                Some(d) if d.name == "bind" && d.static_arg() == Some("name") => {
                    name = self.expr(d.value.unwrap_or("name"));
                }
                Some(d) if d.name == "bind" || d.name == "on" => self.apply_directive(el, &d, &mut props, &mut Vec::new(), false),
                Some(_) => {}
            }
        }
        let props_code = self.gen_props(props);
        let children = self.gen_children(el, false);
        let render = self.helper("renderSlot");
        let mut args = vec!["_ctx.$slots".to_string(), name];
        if !children.is_empty() {
            args.push(if props_code == "null" { "{}".to_string() } else { props_code });
            args.push(format!("() => {}", array(&children)));
        } else {
            args.push(props_code);
        }
        call(&render, args)
    }

    /// Render-function reference for a tag, and whether its children are
    /// passed as slots.
    fn resolve_tag(&mut self, el: &ElementNode) -> (String, TagKind) {
        let tag = el.tag.as_str();
        if tag == "component" {
            let is = el.attrs.iter().find_map(|a| match parse_directive(a) {
                Some(d) if d.name == "bind" && d.static_arg() == Some("is") => {
                    Some(self.expr(d.value.unwrap_or("is")))
                }
                None if a.name == "is" => Some(quote(a.value.as_deref().unwrap_or(""))),
                _ => None,
            });
            if let Some(is) = is {
                let resolve = self.helper("resolveDynamicComponent");
                return (format!("{}({})", resolve, is), TagKind::Component);
            }
        }
        let pascal = capitalize(&camelize(tag));
        match pascal.as_str() {
            "Teleport" => return (self.helper("Teleport"), TagKind::Builtin),
            "KeepAlive" => return (self.helper("KeepAlive"), TagKind::Builtin),
            "Transition" => return (self.helper("Transition"), TagKind::Component),
            "TransitionGroup" => return (self.helper("TransitionGroup"), TagKind::Component),
            "Suspense" => return (self.helper("Suspense"), TagKind::Component),
            _ => {}
        }
        if HTML_TAGS.contains(tag) || SVG_TAGS.contains(tag) {
            return (quote(tag), TagKind::Native);
        }
        let candidates = [tag.to_string(), camelize(tag), pascal];
        if let Some(bindings) = self.bindings {
            for name in candidates.iter() {
                let is_setup = matches!(
                    bindings.get(name),
                    Some(BindingType::SetupConst)
                        | Some(BindingType::SetupReactiveConst)
                        | Some(BindingType::LiteralConst)
                        | Some(BindingType::SetupLet)
                        | Some(BindingType::SetupRef)
                        | Some(BindingType::SetupMaybeRef)
                );
                if is_setup {
                    return (format!("$setup[{}]", quote(name)), TagKind::Component);
                }
            }
        }
        let id = asset_id("component", tag);
        let line = format!("const {} = {}({})", id, self.helper("resolveComponent"), quote(tag));
        if !self.assets.contains(&line) {
            self.assets.push(line);
        }
        (id, TagKind::Component)
    }

    fn resolve_directive(&mut self, name: &str) -> String {
        let local = format!("v{}", capitalize(&camelize(name)));
        if let Some(bindings) = self.bindings {
            if bindings.get(&local).map_or(false, |t| {
                !matches!(t, BindingType::Props | BindingType::PropsAliased | BindingType::Data | BindingType::Options)
            }) {
                return format!("$setup[{}]", quote(&local));
            }
        }
        let id = asset_id("directive", name);
        let line = format!("const {} = {}({})", id, self.helper("resolveDirective"), quote(name));
        if !self.assets.contains(&line) {
            self.assets.push(line);
        }
        id
    }

    fn gen_plain(&mut self, el: &ElementNode, block: bool, key: Option<usize>) -> String {
        let (tag, kind) = self.resolve_tag(el);
        let native = kind == TagKind::Native;
        if let Some(d) = find_directive(el, "slot") {
            if native && el.tag != "template" {
                self.error(SLOT_MISPLACED, d.offset);
            }
        }
        let mut props = PropsBuilder::default();
        if let Some(k) = key {
            props.push_code("key", k.to_string());
        }
        let mut directives: Vec<String> = Vec::new();
        let mut has_ref = false;
        let mut overrides_children = false;
        for attr in &el.attrs {
            let dir = match parse_directive(attr) {
                Some(d) => d,
                None => {
                    let value = attr.value.as_deref().unwrap_or("");
                    match attr.name.as_str() {
                        "is" if el.tag == "component" => {}
                        "class" => props.push_class(quote(value.trim()), false),
                        "style" => props.push_style(static_style(value), false),
                        name => {
                            has_ref |= name == "ref";
                            props.push_code(name, quote(value));
                        }
                    }
                    continue;
                }
            };
            match dir.name.as_str() {
                "html" | "text" => {
                    overrides_children = true;
                    if !el.children.is_empty() {
                        let message = if dir.name == "html" {
                            HTML_WITH_CHILDREN
                        } else {
                            TEXT_WITH_CHILDREN
                        };
                        self.error(message, dir.offset);
                    }
                }
                "bind" if dir.static_arg() == Some("ref") => has_ref = true,
                "bind" if dir.static_arg() == Some("is") && el.tag == "component" => continue,
                _ => {}
            }
            self.apply_directive(el, &dir, &mut props, &mut directives, native);
        }
        if native {
            if let Some(attr) = self.scope_attr.clone() {
                props.push_code(&attr, quote(""));
            }
        }

        let mut flag = 0;
        let (children, dynamic_slots) = if overrides_children {
            ("null".to_string(), false)
        } else if native || kind == TagKind::Builtin {
            let keep_alive = capitalize(&camelize(&el.tag)) == "KeepAlive";
            let preserve = el.tag == "pre" || el.tag == "textarea";
            let items = self.prepare_children(&el.children, preserve);
            match items.as_slice() {
                [] => ("null".to_string(), false),
                [Item::Text(parts)] if native => {
                    let (code, dynamic) = self.gen_text(parts);
                    if dynamic {
                        flag |= TEXT;
                    }
                    (code, false)
                }
                _ => {
                    let codes: Vec<String> = items.iter().map(|i| self.gen_item(i)).collect();
                    (array(&codes), keep_alive)
                }
            }
        } else {
            match self.gen_slots(el) {
                Some((code, dynamic)) => (code, dynamic),
                None => ("null".to_string(), false),
            }
        };
        if dynamic_slots {
            flag |= DYNAMIC_SLOTS;
        }

        let dynamic_names = if props.full_props {
            flag |= FULL_PROPS;
            Vec::new()
        } else {
            let mut names = Vec::new();
            if props.class_dynamic {
                if native {
                    flag |= CLASS;
                } else {
                    names.push("class".to_string());
                }
            }
            if props.style_dynamic {
                if native {
                    flag |= STYLE;
                } else {
                    names.push("style".to_string());
                }
            }
            names.extend(props.dynamic_names.iter().cloned());
            if !names.is_empty() {
                flag |= PROPS;
            }
            names
        };
        if native && props.hydration {
            flag |= NEED_HYDRATION;
        }
        if flag == 0 && (has_ref || !directives.is_empty()) {
            flag |= NEED_PATCH;
        }
        let props_code = self.gen_props(props);

        let mut args = vec![tag, props_code, children];
        if flag != 0 {
            args.push(patch_flag(flag));
            if flag & PROPS != 0 {
                let quoted: Vec<String> = dynamic_names.iter().map(|n| quote(n)).collect();
                args.push(format!("[{}]", quoted.join(", ")));
            }
        }
        let node = match (native, block) {
            (true, true) => {
                let open = self.helper("openBlock");
                let create = self.helper("createElementBlock");
                format!("({}(), {})", open, call(&create, args))
            }
            (true, false) => call(&self.helper("createElementVNode"), args),
            (false, true) => {
                let open = self.helper("openBlock");
                let create = self.helper("createBlock");
                format!("({}(), {})", open, call(&create, args))
            }
            (false, false) => call(&self.helper("createVNode"), args),
        };
        if directives.is_empty() {
            return node;
        }
        let with = self.helper("withDirectives");
        format!("{}({}, {})", with, node, array(&directives))
    }

    fn apply_directive(
        &mut self,
        el: &ElementNode,
        dir: &Directive,
        props: &mut PropsBuilder,
        directives: &mut Vec<String>,
        native: bool,
    ) {
        match dir.name.as_str() {
            "if" | "else-if" | "else" | "for" | "slot" | "cloak" | "once" | "memo" | "pre" => {}
            "bind" => self.gen_bind(dir, props),
            "on" => self.gen_on(dir, props, native),
            "model" => self.gen_model(el, dir, props, directives, native),
            "show" => {
                let show = self.helper("vShow");
                directives.push(format!("[{}, {}]", show, self.expr(dir.value.unwrap_or("undefined"))));
            }
            "html" => {
                let value = self.expr(dir.value.unwrap_or("\"\""));
                props.push_dynamic("innerHTML", value);
            }
            "text" => {
                let display = self.helper("toDisplayString");
                let value = format!("{}({})", display, self.expr(dir.value.unwrap_or("\"\"")));
                props.push_dynamic("textContent", value);
            }
            name => {
                let mut parts = vec![self.resolve_directive(name)];
                parts.push(dir.value.map(|v| self.expr(v)).unwrap_or_else(|| "void 0".to_string()));
                parts.push(match &dir.arg {
                    Some(DirArg::Static(a)) => quote(a),
                    Some(DirArg::Dynamic(a)) => self.expr(a),
                    None => "void 0".to_string(),
                });
                if !dir.modifiers.is_empty() {
                    let mods: Vec<String> = dir.modifiers.iter().map(|m| format!("{}: true", prop_key(m))).collect();
                    parts.push(format!("{{ {} }}", mods.join(", ")));
                }
                while parts.last().map_or(false, |p| p == "void 0") {
                    parts.pop();
                }
                directives.push(format!("[{}]", parts.join(", ")));
            }
        }
    }

    fn gen_bind(&mut self, dir: &Directive, props: &mut PropsBuilder) {
        match &dir.arg {
            None => match dir.value {
                Some(v) => {
                    let value = self.expr(v);
                    props.spread(value);
                }
                None => {}
            },
            Some(DirArg::Dynamic(a)) => {
                let key = format!("{} || \"\"", self.expr(a));
                let value = self.expr(dir.value.unwrap_or("undefined"));
                props.push(PropKey::Dynamic(key), PropValue::Code(value));
                props.full_props = true;
            }
            Some(DirArg::Static(name)) => {
                let name = if dir.has_modifier("camel") { camelize(name) } else { name.clone() };
                let same_name = camelize(&name);
                let value = self.expr(dir.value.unwrap_or(&same_name));
                match name.as_str() {
                    "class" => props.push_class(value, true),
                    "style" => props.push_style(value, true),
                    "key" => props.push_code("key", value),
                    _ => props.push_dynamic(&name, value),
                }
            }
        }
    }

    fn gen_handler(&mut self, value: Option<&str>) -> (String, bool) {
        let value = match value.map(str::trim).filter(|v| !v.is_empty()) {
            Some(v) => v,
            None => return ("() => {}".to_string(), true),
        };
        let cacheable = !self.references_locals(value);
        if is_member_expression(value) {
            let target = self.expr(value);
            if cacheable {
                return (format!("(...args) => ({t} && {t}(...args))", t = target), true);
            }
            return (target, false);
        }
        if is_function_expression(value) {
            return (self.expr(value), cacheable);
        }
        let body = self.with_locals(vec!["$event".to_string()], |gen| gen.expr(value));
        let multi = body.contains(';') || body.contains('\n');
        if multi {
            (format!("$event => {{{}}}", body), cacheable)
        } else {
            (format!("$event => ({})", body), cacheable)
        }
    }

    fn gen_on(&mut self, dir: &Directive, props: &mut PropsBuilder, native: bool) {
        let key = match &dir.arg {
            None => {
                let handlers = self.helper("toHandlers");
                let value = format!("{}({})", handlers, self.expr(dir.value.unwrap_or("{}")));
                props.spread(value);
                return;
            }
            Some(DirArg::Dynamic(a)) => {
                let to_key = self.helper("toHandlerKey");
                PropKey::Dynamic(format!("{}({})", to_key, self.expr(a)))
            }
            Some(DirArg::Static(name)) => {
                let mut event = name.clone();
                if event == "click" && dir.has_modifier("right") {
                    event = "contextmenu".to_string();
                } else if event == "click" && dir.has_modifier("middle") {
                    event = "mouseup".to_string();
                }
                if let Some(hook) = event.strip_prefix("vue:") {
                    event = format!("vnode-{}", hook);
                }
                let mut key = if native && !event.starts_with("vnode") && event.chars().any(|c| c.is_ascii_uppercase()) {
                    format!("on:{}", event)
                } else {
                    format!("on{}", capitalize(&camelize(&event)))
                };
                for m in dir.modifiers.iter().filter(|m| EVENT_OPTION_MODIFIERS.contains(&m.as_str())) {
                    key.push_str(&capitalize(m));
                }
                PropKey::Static(key)
            }
        };
        let is_key_event = match &key {
            PropKey::Static(k) => k.starts_with("onKey"),
            PropKey::Dynamic(_) => true,
        };
        let (mut handler, cacheable) = self.gen_handler(dir.value);
        let non_key: Vec<&String> = dir
            .modifiers
            .iter()
            .filter(|m| {
                NON_KEY_MODIFIERS.contains(&m.as_str())
                    || (!is_key_event && (m.as_str() == "left" || m.as_str() == "right"))
            })
            .collect();
        let keys: Vec<&String> = dir
            .modifiers
            .iter()
            .filter(|m| {
                !EVENT_OPTION_MODIFIERS.contains(&m.as_str())
                    && !NON_KEY_MODIFIERS.contains(&m.as_str())
                    && (is_key_event || (m.as_str() != "left" && m.as_str() != "right"))
            })
            .collect();
        if !non_key.is_empty() {
            let with = self.helper("withModifiers");
            let list: Vec<String> = non_key.iter().map(|m| quote(m)).collect();
            handler = format!("{}({}, [{}])", with, handler, list.join(","));
        }
        if !keys.is_empty() && is_key_event {
            let with = self.helper("withKeys");
            let list: Vec<String> = keys.iter().map(|m| quote(m)).collect();
            handler = format!("{}({}, [{}])", with, handler, list.join(","));
        }
        match key {
            PropKey::Static(name) => {
                if native && name != "onClick" && name != "onUpdate:modelValue" {
                    props.hydration = true;
                }
                if cacheable {
                    let value = self.cached(handler);
                    props.push_code(&name, value);
                } else {
                    props.push_dynamic(&name, handler);
                }
            }
            PropKey::Dynamic(k) => {
                props.full_props = true;
                props.hydration |= native;
                props.push(PropKey::Dynamic(k), PropValue::Code(handler));
            }
        }
    }

    fn gen_model(
        &mut self,
        el: &ElementNode,
        dir: &Directive,
        props: &mut PropsBuilder,
        directives: &mut Vec<String>,
        native: bool,
    ) {
        let value = match dir.value.map(str::trim).filter(|v| !v.is_empty()) {
            Some(v) => v,
            None => {
                self.error(MODEL_MISSING_EXPRESSION, dir.offset);
                return;
            }
        };
        if !is_member_expression(value) {
            self.error(MODEL_MALFORMED, dir.offset);
            return;
        }
        if is_identifier(value) && self.ctx.locals.iter().any(|l| l == value) {
            self.error(MODEL_ON_SCOPE, dir.offset);
            return;
        }
        let target = self.expr(value);
        let assign = format!("$event => (({}) = $event)", target);
        let assign = if self.references_locals(value) {
            assign
        } else {
            self.cached(assign)
        };
        let modifiers: Vec<String> = dir.modifiers.iter().map(|m| format!("{}: true", prop_key(m))).collect();

        if native {
            if dir.arg.is_some() {
                self.error(MODEL_ARG_ON_ELEMENT, dir.offset);
                return;
            }
            let helper = match el.tag.as_str() {
                "select" => "vModelSelect",
                "textarea" => "vModelText",
                "input" => {
                    let dynamic_type = el.attrs.iter().any(|a| a.name == ":type" || a.name == "v-bind:type");
                    match el.attr("type").and_then(|a| a.value.as_deref()) {
                        _ if dynamic_type => "vModelDynamic",
                        Some("checkbox") => "vModelCheckbox",
                        Some("radio") => "vModelRadio",
                        _ => "vModelText",
                    }
                }
                _ => {
                    self.error(MODEL_ON_INVALID_ELEMENT, dir.offset);
                    return;
                }
            };
            props.push_code("onUpdate:modelValue", assign);
            let helper = self.helper(helper);
            if modifiers.is_empty() {
                directives.push(format!("[{}, {}]", helper, target));
            } else {
                directives.push(format!("[{}, {}, void 0, {{ {} }}]", helper, target, modifiers.join(", ")));
            }
            return;
        }

        match &dir.arg {
            Some(DirArg::Dynamic(a)) => {
                let name = self.expr(a);
                props.push(PropKey::Dynamic(name.clone()), PropValue::Code(target));
                props.push(PropKey::Dynamic(format!("\"onUpdate:\" + {}", name)), PropValue::Code(assign));
                props.full_props = true;
            }
            other => {
                let name = match other {
                    Some(DirArg::Static(s)) => s.clone(),
                    _ => "modelValue".to_string(),
                };
                props.push_dynamic(&name, target);
                props.push_code(&format!("onUpdate:{}", name), assign);
                if !modifiers.is_empty() {
                    let key = if name == "modelValue" {
                        "modelModifiers".to_string()
                    } else {
                        format!("{}Modifiers", name)
                    };
                    props.push_code(&key, format!("{{ {} }}", modifiers.join(", ")));
                }
            }
        }
    }

    fn gen_props(&mut self, mut props: PropsBuilder) -> String {
        props.flush();
        let mut segments: Vec<String> = Vec::new();
        let mut has_dynamic_key = false;
        let mut only_spread = None;
        for segment in std::mem::take(&mut props.segments) {
            match segment {
                PropSegment::Spread(code) => {
                    only_spread = Some(code.clone());
                    segments.push(code);
                }
                PropSegment::Object(entries) => {
                    let mut fields = Vec::new();
                    for (key, value) in entries {
                        let key = match key {
                            PropKey::Static(k) => prop_key(&k),
                            PropKey::Dynamic(k) => {
                                has_dynamic_key = true;
                                format!("[{}]", k)
                            }
                        };
                        let value = match value {
                            PropValue::Code(c) => c,
                            PropValue::Class(values) => self.merge_values("normalizeClass", values),
                            PropValue::Style(values) => self.merge_values("normalizeStyle", values),
                        };
                        fields.push(format!("{}: {}", key, value));
                    }
                    segments.push(if fields.len() > 1 {
                        format!("{{\n  {}\n}}", fields.iter().map(|f| indent_value(f, 1)).collect::<Vec<_>>().join(",\n  "))
                    } else {
                        format!("{{ {} }}", fields.join(", "))
                    });
                }
            }
        }
        match segments.len() {
            0 => "null".to_string(),
            1 => {
                if let Some(spread) = only_spread {
                    let normalize = self.helper("normalizeProps");
                    let guard = self.helper("guardReactiveProps");
                    format!("{}({}({}))", normalize, guard, spread)
                } else if has_dynamic_key {
                    let normalize = self.helper("normalizeProps");
                    format!("{}({})", normalize, segments[0])
                } else {
                    segments.remove(0)
                }
            }
            _ => {
                let merge = self.helper("mergeProps");
                format!("{}({})", merge, segments.join(", "))
            }
        }
    }

    fn merge_values(&mut self, normalize: &'static str, values: Vec<(String, bool)>) -> String {
        match values.as_slice() {
            [(code, false)] => code.clone(),
            [(code, true)] => format!("{}({})", self.helper(normalize), code),
            _ => {
                let codes: Vec<&str> = values.iter().map(|(c, _)| c.as_str()).collect();
                format!("{}([{}])", self.helper(normalize), codes.join(", "))
            }
        }
    }

    /// Slot functions for a component's children.
    fn gen_slots(&mut self, el: &ElementNode) -> Option<(String, bool)> {
        let mut slots: Vec<(String, String)> = Vec::new();
        let mut dynamic = !self.ctx.locals.is_empty();
        if let Some(dir) = find_directive(el, "slot") {
            let (key, is_dynamic) = self.slot_key(&dir);
            dynamic |= is_dynamic;
            let body = self.gen_slot_fn(&el.children, dir.value);
            slots.push((key, body));
        } else {
            let mut implicit: Vec<TemplateNode> = Vec::new();
            for child in &el.children {
                match child {
                    TemplateNode::Element(t) if t.tag == "template" && has_directive(t, "slot") => {
                        if let Some(dir) = find_directive(t, "slot") {
                            let (key, is_dynamic) = self.slot_key(&dir);
                            dynamic |= is_dynamic;
                            let body = self.gen_slot_fn(&t.children, dir.value);
                            slots.push((key, body));
                        }
                    }
                    other => implicit.push(other.clone()),
                }
            }
            let blank = implicit.iter().all(|n| match n {
                TemplateNode::Text(t, _) => t.chars().all(is_html_whitespace),
                TemplateNode::Comment(..) => true,
                _ => false,
            });
            if !blank {
                let body = self.gen_slot_fn(&implicit, None);
                slots.insert(0, ("default".to_string(), body));
            }
        }
        if slots.is_empty() {
            return None;
        }
        let mut fields: Vec<String> = slots.into_iter().map(|(k, v)| format!("{}: {}", k, v)).collect();
        fields.push(if dynamic {
            "_: 2 /* DYNAMIC */".to_string()
        } else {
            "_: 1 /* STABLE */".to_string()
        });
        let fields: Vec<String> = fields.iter().map(|f| indent_value(f, 1)).collect();
        Some((format!("{{\n  {}\n}}", fields.join(",\n  ")), dynamic))
    }

    fn slot_key(&self, dir: &Directive) -> (String, bool) {
        match &dir.arg {
            None => ("default".to_string(), false),
            Some(DirArg::Static(name)) => (prop_key(name), false),
            Some(DirArg::Dynamic(name)) => (format!("[{}]", self.expr(name)), true),
        }
    }

    fn gen_slot_fn(&mut self, children: &[TemplateNode], params: Option<&str>) -> String {
        let params = params.map(str::trim).filter(|p| !p.is_empty());
        let names: Vec<String> = params
            .map(|p| {
                let tokens = tokenize(p);
                split_top_level(&tokens, ",").into_iter().flat_map(pattern_names).collect()
            })
            .unwrap_or_default();
        let body = self.with_locals(names, |gen| {
            let items = gen.prepare_children(children, false);
            let codes: Vec<String> = items.iter().map(|i| gen.gen_item(i)).collect();
            array(&codes)
        });
        let with = self.helper("withCtx");
        format!("{}(({}) => {})", with, params.unwrap_or(""), body)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum TagKind {
    Native,
    Component,
    /// Built-in components that take their children as an array.
    Builtin,
}

/// Splits `alias in source` / `alias of source` at the top level.
fn split_for(value: &str) -> Option<(&str, &str)> {
    let tokens = tokenize(value);
    let mut depth = 0;
    for t in &tokens {
        match t.text {
            "(" | "[" | "{" => depth += 1,
            ")" | "]" | "}" => depth -= 1,
            "in" | "of" if depth == 0 && t.is_ident() => {
                let alias = value[..t.start].trim();
                let source = value[t.end..].trim();
                if alias.is_empty() || source.is_empty() {
                    return None;
                }
                return Some((alias, source));
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(source: &str) -> TemplateOptions {
        TemplateOptions {
            source: source.to_string(),
            filename: "a.vue".to_string(),
            id: "data-v-1".to_string(),
            scoped: false,
            bindings: None,
        }
    }

    fn render(source: &str) -> String {
        let out = compile(&options(source));
        assert!(out.errors.is_empty(), "{:?}", out.errors);
        out.code
    }

    #[test]
    fn test_minimal_template() {
        let code = render("<div>hello</div>");
        assert_eq!(
            code,
            "import { openBlock as _openBlock, createElementBlock as _createElementBlock } from \"vue\"\n\n\
             export function render(_ctx, _cache) {\n  \
             return (_openBlock(), _createElementBlock(\"div\", null, \"hello\"))\n}"
        );
    }

    #[test]
    fn test_interpolation_and_text_flag() {
        let code = render("<p>Hi {{ name }}!</p>");
        assert!(code.contains("_createElementBlock(\"p\", null, \"Hi \" + _toDisplayString(_ctx.name) + \"!\", 1 /* TEXT */)"));
        assert!(code.starts_with(
            "import { toDisplayString as _toDisplayString, openBlock as _openBlock, createElementBlock as _createElementBlock }"
        ));
    }

    #[test]
    fn test_bindings_change_output() {
        let mut opts = options("<div>{{ count }}</div>");
        let mut b = Bindings::new();
        b.insert("count", BindingType::SetupRef);
        opts.bindings = Some(b);
        let code = compile(&opts).code;
        assert!(code.contains("export function render(_ctx, _cache, $props, $setup, $data, $options)"));
        assert!(code.contains("_toDisplayString($setup.count)"));
        assert!(render("<div>{{ count }}</div>").contains("_toDisplayString(_ctx.count)"));
    }

    #[test]
    fn test_whitespace_condensing() {
        let code = render("<div>\n  <span>a</span>\n  <span>b</span>\n</div>");
        assert!(code.contains("[\n    _createElementVNode(\"span\", null, \"a\"),\n    _createElementVNode(\"span\", null, \"b\")\n  ]"));
        let code = render("<div><b>a</b> <i>b</i></div>");
        assert!(code.contains("_createTextVNode(\" \")"));
    }

    #[test]
    fn test_multiple_roots() {
        let code = render("<!-- c --><div/><span/>");
        assert!(code.contains("_createElementBlock(_Fragment, null, ["));
        assert!(code.contains("_createCommentVNode(\" c \")"));
        assert!(code.contains("2112 /* STABLE_FRAGMENT, DEV_ROOT_FRAGMENT */"));
    }

    #[test]
    fn test_v_if_chain() {
        let code = render("<div v-if=\"a\">1</div>\n<p v-else-if=\"b\">2</p>\n<span v-else>3</span>");
        assert!(code.contains("(_ctx.a)\n    ? (_openBlock(), _createElementBlock(\"div\", { key: 0 }, \"1\"))"));
        assert!(code.contains("(_ctx.b)\n    ? (_openBlock(), _createElementBlock(\"p\", { key: 1 }, \"2\"))"));
        assert!(code.contains(": (_openBlock(), _createElementBlock(\"span\", { key: 2 }, \"3\"))"));
        let code = render("<div v-if=\"a\"/>");
        assert!(code.contains(": _createCommentVNode(\"v-if\", true)"));
    }

    #[test]
    fn test_stray_else() {
        let out = compile(&options("<div><p v-else>x</p></div>"));
        assert_eq!(out.code, "");
        assert_eq!(out.errors.len(), 1);
        assert_eq!(out.errors[0].message, NO_ADJACENT_IF);
        assert_eq!(out.errors[0].loc.map(|p| p.offset), Some(8));
    }

    #[test]
    fn test_v_for() {
        let code = render("<ul><li v-for=\"(item, i) in items\" :key=\"item.id\">{{ i }}: {{ item.name }}</li></ul>");
        assert!(code.contains("_renderList(_ctx.items, (item, i) => {"));
        assert!(code.contains("_createElementBlock(\"li\", { key: item.id }, _toDisplayString(i) + \": \" + _toDisplayString(item.name), 1 /* TEXT */)"));
        assert!(code.contains("128 /* KEYED_FRAGMENT */"));
        assert!(render("<li v-for=\"x of 3\">{{ x }}</li>").contains("256 /* UNKEYED_FRAGMENT */"));
    }

    #[test]
    fn test_v_for_errors() {
        let out = compile(&options("<li v-for=\"items\"></li>"));
        assert_eq!(out.errors[0].message, FOR_MALFORMED);
        let out = compile(&options("<li v-for></li>"));
        assert_eq!(out.errors[0].message, FOR_MISSING_EXPRESSION);
    }

    #[test]
    fn test_bind_and_class_style() {
        let code = render("<div class=\"a\" :class=\"{ on: active }\" style=\"color: red\" :title=\"t\"></div>");
        assert!(code.contains("class: _normalizeClass([\"a\", { on: _ctx.active }])"));
        assert!(code.contains("style: {\"color\":\"red\"}"));
        assert!(code.contains("title: _ctx.t"));
        assert!(code.contains("10 /* CLASS, PROPS */, [\"title\"]"));
    }

    #[test]
    fn test_bind_object_spread() {
        let code = render("<div v-bind=\"attrs\"></div>");
        assert!(code.contains("_normalizeProps(_guardReactiveProps(_ctx.attrs)), null, 16 /* FULL_PROPS */"));
        let code = render("<div id=\"x\" v-bind=\"attrs\"></div>");
        assert!(code.contains("_mergeProps({ id: \"x\" }, _ctx.attrs)"));
    }

    #[test]
    fn test_events() {
        let code = render("<button @click=\"go\">x</button>");
        assert!(code.contains("onClick: _cache[0] || (_cache[0] = (...args) => (_ctx.go && _ctx.go(...args)))"));
        let code = render("<button @click.stop.prevent=\"count++\">x</button>");
        assert!(code.contains("_withModifiers($event => (_ctx.count++), [\"stop\",\"prevent\"])"));
        let code = render("<input @keyup.enter=\"submit\">");
        assert!(code.contains("onKeyup: _cache[0] || (_cache[0] = _withKeys((...args) => (_ctx.submit && _ctx.submit(...args)), [\"enter\"]))"));
        assert!(code.contains("32 /* NEED_HYDRATION */"));
        let code = render("<div @scroll.passive=\"onScroll\"></div>");
        assert!(code.contains("onScrollPassive:"));
    }

    #[test]
    fn test_uncached_handler_in_loop() {
        let code = render("<button v-for=\"i in list\" @click=\"pick(i)\">x</button>");
        assert!(code.contains("onClick: $event => (_ctx.pick(i))"));
        assert!(code.contains("8 /* PROPS */, [\"onClick\"]"));
    }

    #[test]
    fn test_v_model() {
        let code = render("<input v-model.trim=\"text\">");
        assert!(code.contains("\"onUpdate:modelValue\": _cache[0] || (_cache[0] = $event => ((_ctx.text) = $event))"));
        assert!(code.contains("512 /* NEED_PATCH */"));
        assert!(code.contains("[_vModelText, _ctx.text, void 0, { trim: true }]"));
        assert!(render("<input type=\"checkbox\" v-model=\"on\">").contains("_vModelCheckbox"));
        assert!(render("<select v-model=\"x\"></select>").contains("_vModelSelect"));
        let code = render("<MyInput v-model=\"text\" />");
        assert!(code.contains("modelValue: _ctx.text"));
        assert!(code.contains("8 /* PROPS */, [\"modelValue\"]"));
        let out = compile(&options("<div v-model=\"x\"></div>"));
        assert_eq!(out.errors[0].message, MODEL_ON_INVALID_ELEMENT);
    }

    #[test]
    fn test_v_show_html_text() {
        let code = render("<div v-show=\"ok\"></div>");
        assert!(code.contains("_withDirectives((_openBlock(), _createElementBlock(\"div\", null, null, 512 /* NEED_PATCH */)), [\n    [_vShow, _ctx.ok]\n  ])"));
        let code = render("<div v-html=\"raw\"></div>");
        assert!(code.contains("{ innerHTML: _ctx.raw }, null, 8 /* PROPS */, [\"innerHTML\"]"));
        let code = render("<span v-text=\"msg\"></span>");
        assert!(code.contains("textContent: _toDisplayString(_ctx.msg)"));
    }

    #[test]
    fn test_components_and_slots() {
        let code = render("<MyComp :msg=\"m\"><template #header=\"{ title }\">{{ title }}</template><p>body</p></MyComp>");
        assert!(code.contains("const _component_MyComp = _resolveComponent(\"MyComp\")"));
        assert!(code.contains("_createBlock(_component_MyComp, { msg: _ctx.m }, {"));
        assert!(code.contains("default: _withCtx(() => ["));
        assert!(code.contains("header: _withCtx(({ title }) => ["));
        assert!(code.contains("_toDisplayString(title)"));
        assert!(code.contains("_: 1 /* STABLE */"));
    }

    #[test]
    fn test_setup_component_binding() {
        let mut opts = options("<my-comp/>");
        let mut b = Bindings::new();
        b.insert("MyComp", BindingType::SetupConst);
        opts.bindings = Some(b);
        let code = compile(&opts).code;
        assert!(code.contains("_createBlock($setup[\"MyComp\"])"));
        assert!(!code.contains("_resolveComponent"));
    }

    #[test]
    fn test_custom_directive() {
        let code = render("<input v-focus:arg.lazy=\"x\">");
        assert!(code.contains("const _directive_focus = _resolveDirective(\"focus\")"));
        assert!(code.contains("[_directive_focus, _ctx.x, \"arg\", { lazy: true }]"));
    }

    #[test]
    fn test_slot_outlet() {
        let code = render("<div><slot name=\"foot\" :x=\"y\">fallback</slot></div>");
        assert!(code.contains("_renderSlot(_ctx.$slots, \"foot\", { x: _ctx.y }, () => [\n"));
        assert!(render("<slot/>").contains("return _renderSlot(_ctx.$slots, \"default\")"));
    }

    #[test]
    fn test_scoped_attribute() {
        let mut opts = options("<div><MyComp/></div>");
        opts.scoped = true;
        let code = compile(&opts).code;
        assert!(code.contains("_createElementBlock(\"div\", { \"data-v-1\": \"\" }"));
        assert!(!code.contains("_createVNode(_component_MyComp, { \"data-v-1\""));
    }

    #[test]
    fn test_parse_error() {
        let out = compile(&options("<div>"));
        assert_eq!(out.code, "");
        assert_eq!(out.errors[0].message, "Element is missing end tag.");
    }

    #[test]
    fn test_directive_parsing() {
        let attr = Attribute {
            name: "v-on:[evt].stop".to_string(),
            value: Some("go".to_string()),
            span: Default::default(),
        };
        let d = parse_directive(&attr).unwrap();
        assert_eq!(d.name, "on");
        assert_eq!(d.arg, Some(DirArg::Dynamic("evt".to_string())));
        assert_eq!(d.modifiers, vec!["stop".to_string()]);
        let attr = Attribute {
            name: "v-model.trim".to_string(),
            value: None,
            span: Default::default(),
        };
        let d = parse_directive(&attr).unwrap();
        assert_eq!(d.arg, None);
        assert_eq!(d.modifiers, vec!["trim".to_string()]);
    }

    #[test]
    fn test_result_value() {
        let v = compile(&options("<div/>")).to_value();
        assert_eq!(v.get_string("source"), Some("<div/>".to_string()));
        assert_eq!(v.get("errors").and_then(|e| e.array_len()), Some(0));
        assert_eq!(v.get("tips").and_then(|e| e.array_len()), Some(0));
    }
}

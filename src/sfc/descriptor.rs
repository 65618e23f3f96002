//! Descriptor and block model, and its projection to and from managed values.

use crate::parser::util::Position;
use crate::runner::ds::builder::{build_array, build_object, ObjectBuilder};
use crate::runner::ds::value::JsValue;

pub const DEFAULT_FILENAME: &str = "anonymous.vue";

#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Str(String),
    /// Key-only attribute such as `scoped`.
    Flag,
}

impl AttrValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Str(s) => Some(s),
            AttrValue::Flag => None,
        }
    }

    fn to_value(&self) -> JsValue {
        match self {
            AttrValue::Str(s) => JsValue::from(s.as_str()),
            AttrValue::Flag => JsValue::Boolean(true),
        }
    }

    fn from_value(v: &JsValue) -> Option<AttrValue> {
        match v {
            JsValue::String(s) => Some(AttrValue::Str(s.clone())),
            JsValue::Boolean(true) => Some(AttrValue::Flag),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceLocation {
    pub start: Position,
    pub end: Position,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SfcBlock {
    pub block_type: String,
    pub content: String,
    pub attrs: Vec<(String, AttrValue)>,
    pub loc: SourceLocation,
    pub lang: Option<String>,
    pub src: Option<String>,
    pub scoped: bool,
    pub module: Option<AttrValue>,
    pub setup: Option<AttrValue>,
}

impl SfcBlock {
    pub fn attr(&self, name: &str) -> Option<&AttrValue> {
        self.attrs.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn is_ts(&self) -> bool {
        matches!(self.lang.as_deref(), Some("ts") | Some("tsx"))
    }

    pub fn to_value(&self) -> JsValue {
        let mut attrs = ObjectBuilder::new();
        for (k, v) in &self.attrs {
            attrs.set_field(k, v.to_value());
        }
        let mut block = build_object()
            .add_field("type", self.block_type.as_str())
            .add_field("content", self.content.as_str())
            .add_field("loc", location_to_value(&self.loc))
            .add_field("attrs", attrs.build())
            .add_optional_field("lang", self.lang.as_deref())
            .add_optional_field("src", self.src.as_deref());
        if self.scoped {
            block = block.add_field("scoped", true);
        }
        block
            .add_optional_field("module", self.module.as_ref().map(|m| m.to_value()))
            .add_optional_field("setup", self.setup.as_ref().map(|s| s.to_value()))
            .build()
    }

    pub fn from_value(v: &JsValue) -> Option<SfcBlock> {
        if !v.is_object() {
            return None;
        }
        let mut attrs = Vec::new();
        if let Some(attrs_value) = v.get("attrs") {
            for i in 0..attrs_value.own_key_count().unwrap_or(0) {
                if let Some((k, val)) = attrs_value.own_entry_at(i) {
                    if let Some(val) = AttrValue::from_value(&val) {
                        attrs.push((k, val));
                    }
                }
            }
        }
        Some(SfcBlock {
            block_type: v.get_string("type")?,
            content: v.get_string("content").unwrap_or_default(),
            attrs,
            loc: v
                .get("loc")
                .and_then(|l| location_from_value(&l))
                .unwrap_or_else(empty_location),
            lang: v.get_string("lang"),
            src: v.get_string("src"),
            scoped: v.get_bool("scoped").unwrap_or(false),
            module: v.get("module").and_then(|m| AttrValue::from_value(&m)),
            setup: v.get("setup").and_then(|s| AttrValue::from_value(&s)),
        })
    }
}

pub fn position_to_value(p: &Position) -> JsValue {
    build_object()
        .add_field("offset", p.offset)
        .add_field("line", p.line)
        .add_field("column", p.column)
        .build()
}

fn position_from_value(v: &JsValue) -> Option<Position> {
    Some(Position {
        offset: v.get("offset")?.as_u64()? as usize,
        line: v.get("line")?.as_u64()? as usize,
        column: v.get("column")?.as_u64()? as usize,
    })
}

pub fn location_to_value(loc: &SourceLocation) -> JsValue {
    build_object()
        .add_field("source", loc.source.as_str())
        .add_field("start", position_to_value(&loc.start))
        .add_field("end", position_to_value(&loc.end))
        .build()
}

fn location_from_value(v: &JsValue) -> Option<SourceLocation> {
    Some(SourceLocation {
        start: position_from_value(&v.get("start")?)?,
        end: position_from_value(&v.get("end")?)?,
        source: v.get_string("source").unwrap_or_default(),
    })
}

fn empty_location() -> SourceLocation {
    let origin = Position {
        offset: 0,
        line: 1,
        column: 1,
    };
    SourceLocation {
        start: origin,
        end: origin,
        source: String::new(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SfcDescriptor {
    pub filename: String,
    pub source: String,
    pub template: Option<SfcBlock>,
    pub script: Option<SfcBlock>,
    pub script_setup: Option<SfcBlock>,
    pub styles: Vec<SfcBlock>,
    pub custom_blocks: Vec<SfcBlock>,
    pub css_vars: Vec<String>,
    pub slotted: bool,
}

impl SfcDescriptor {
    pub fn new(filename: &str, source: &str) -> Self {
        SfcDescriptor {
            filename: filename.to_string(),
            source: source.to_string(),
            template: None,
            script: None,
            script_setup: None,
            styles: Vec::new(),
            custom_blocks: Vec::new(),
            css_vars: Vec::new(),
            slotted: false,
        }
    }

    pub fn to_value(&self) -> JsValue {
        let block_or_null = |b: &Option<SfcBlock>| match b {
            Some(b) => b.to_value(),
            None => JsValue::Null,
        };
        build_object()
            .add_field("filename", self.filename.as_str())
            .add_field("source", self.source.as_str())
            .add_field("template", block_or_null(&self.template))
            .add_field("script", block_or_null(&self.script))
            .add_field("scriptSetup", block_or_null(&self.script_setup))
            .add_field("styles", build_array(self.styles.iter().map(|s| s.to_value())))
            .add_field(
                "customBlocks",
                build_array(self.custom_blocks.iter().map(|s| s.to_value())),
            )
            .add_field("cssVars", build_array(self.css_vars.iter().map(|s| s.as_str())))
            .add_field("slotted", self.slotted)
            .build()
    }

    pub fn from_value(v: &JsValue) -> Option<SfcDescriptor> {
        if !v.is_object() {
            return None;
        }
        let blocks = |name: &str| -> Vec<SfcBlock> {
            v.get(name)
                .and_then(|a| a.array_values())
                .unwrap_or_default()
                .iter()
                .filter_map(SfcBlock::from_value)
                .collect()
        };
        Some(SfcDescriptor {
            filename: v
                .get_string("filename")
                .unwrap_or_else(|| DEFAULT_FILENAME.to_string()),
            source: v.get_string("source").unwrap_or_default(),
            template: v.get("template").and_then(|b| SfcBlock::from_value(&b)),
            script: v.get("script").and_then(|b| SfcBlock::from_value(&b)),
            script_setup: v.get("scriptSetup").and_then(|b| SfcBlock::from_value(&b)),
            styles: blocks("styles"),
            custom_blocks: blocks("customBlocks"),
            css_vars: v
                .get("cssVars")
                .and_then(|a| a.array_values())
                .unwrap_or_default()
                .iter()
                .filter_map(|s| s.as_str().map(|s| s.to_string()))
                .collect(),
            slotted: v.get_bool("slotted").unwrap_or(false),
        })
    }
}

/// A compiler diagnostic, as carried in `errors` arrays.
#[derive(Debug, Clone, PartialEq)]
pub struct CompilerError {
    pub message: String,
    pub loc: Option<Position>,
}

impl CompilerError {
    pub fn new(message: impl Into<String>) -> Self {
        CompilerError {
            message: message.into(),
            loc: None,
        }
    }

    pub fn at(message: impl Into<String>, loc: Position) -> Self {
        CompilerError {
            message: message.into(),
            loc: Some(loc),
        }
    }

    pub fn to_value(&self) -> JsValue {
        build_object()
            .add_field("message", self.message.as_str())
            .add_optional_field(
                "loc",
                self.loc
                    .map(|p| build_object().add_field("start", position_to_value(&p)).build()),
            )
            .build()
    }
}

pub fn errors_to_value(errors: &[CompilerError]) -> JsValue {
    build_array(errors.iter().map(|e| e.to_value()))
}

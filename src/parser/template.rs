//! Template markup parser.
//!
//! Produces a small element tree for the template compiler and also parses
//! the start tags of top-level SFC blocks.

use pest::error::InputLocation;
use pest_consume::{match_nodes, Error, Parser};

type Result<T> = std::result::Result<T, Error<Rule>>;
type Node<'i> = pest_consume::Node<'i, Rule, ()>;

pub const MISSING_END_TAG: &str = "Element is missing end tag.";
pub const INVALID_END_TAG: &str = "Invalid end tag.";
pub const MISSING_INTERPOLATION_END: &str = "Interpolation end sign was not found.";
pub const ILLEGAL_TAG: &str = "Illegal tag syntax.";

#[derive(Parser)]
#[grammar = "parser/template.pest"] // relative to src
pub struct TemplateParser;

/// Byte range into the parsed text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    /// `None` for key-only attributes such as `scoped`.
    pub value: Option<String>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElementNode {
    pub tag: String,
    pub attrs: Vec<Attribute>,
    pub children: Vec<TemplateNode>,
    pub self_closing: bool,
    pub span: Span,
}

impl ElementNode {
    pub fn attr(&self, name: &str) -> Option<&Attribute> {
        self.attrs.iter().find(|a| a.name == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TemplateNode {
    Element(ElementNode),
    Text(String, Span),
    Interpolation(String, Span),
    Comment(String, Span),
}

/// Start tag of a top-level block.
#[derive(Debug, Clone, PartialEq)]
pub struct StartTag {
    pub name: String,
    pub attrs: Vec<Attribute>,
    pub self_closing: bool,
    /// Byte length of the tag text, from `<` to `>` inclusive.
    pub len: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TemplateError {
    pub message: String,
    pub offset: usize,
}

fn span_of(input: &Node) -> Span {
    let span = input.as_span();
    Span {
        start: span.start(),
        end: span.end(),
    }
}

#[pest_consume::parser]
impl TemplateParser {
    #[allow(non_snake_case)]
    fn EOI(_input: Node) -> Result<()> {
        Ok(())
    }

    fn template(input: Node) -> Result<Vec<TemplateNode>> {
        Ok(match_nodes!(input.into_children();
            [node(nodes).., EOI(_)] => nodes.collect(),
        ))
    }

    fn node(input: Node) -> Result<TemplateNode> {
        Ok(match_nodes!(input.into_children();
            [comment(n)] => n,
            [void_element(n)] => n,
            [element(n)] => n,
            [interpolation(n)] => n,
            [text(n)] => n,
        ))
    }

    fn comment(input: Node) -> Result<TemplateNode> {
        let span = span_of(&input);
        Ok(match_nodes!(input.into_children();
            [comment_body(body)] => TemplateNode::Comment(body, span),
        ))
    }

    fn comment_body(input: Node) -> Result<String> {
        Ok(input.as_str().to_string())
    }

    fn interpolation(input: Node) -> Result<TemplateNode> {
        let span = span_of(&input);
        Ok(match_nodes!(input.into_children();
            [interpolation_body(body)] => TemplateNode::Interpolation(body, span),
        ))
    }

    fn interpolation_body(input: Node) -> Result<String> {
        Ok(input.as_str().trim().to_string())
    }

    fn text(input: Node) -> Result<TemplateNode> {
        Ok(TemplateNode::Text(
            decode_entities(input.as_str()),
            span_of(&input),
        ))
    }

    fn void_element(input: Node) -> Result<TemplateNode> {
        let span = span_of(&input);
        Ok(match_nodes!(input.into_children();
            [void_name(tag), attributes(attrs)] => TemplateNode::Element(ElementNode {
                tag,
                attrs,
                children: vec![],
                self_closing: true,
                span,
            }),
        ))
    }

    fn void_name(input: Node) -> Result<String> {
        Ok(input.as_str().to_ascii_lowercase())
    }

    fn element(input: Node) -> Result<TemplateNode> {
        let span = span_of(&input);
        Ok(match_nodes!(input.into_children();
            [tag_name(tag), attributes(attrs), self_close(_)] => TemplateNode::Element(ElementNode {
                tag,
                attrs,
                children: vec![],
                self_closing: true,
                span,
            }),
            [tag_name(tag), attributes(attrs), children(children)] => TemplateNode::Element(ElementNode {
                tag,
                attrs,
                children,
                self_closing: false,
                span,
            }),
        ))
    }

    fn children(input: Node) -> Result<Vec<TemplateNode>> {
        Ok(match_nodes!(input.into_children();
            [node(nodes)..] => nodes.collect(),
        ))
    }

    fn start_tag(input: Node) -> Result<StartTag> {
        let len = input.as_span().end() - input.as_span().start();
        Ok(match_nodes!(input.into_children();
            [tag_name(name), attributes(attrs), self_close(_)] => StartTag {
                name,
                attrs,
                self_closing: true,
                len,
            },
            [tag_name(name), attributes(attrs)] => StartTag {
                name,
                attrs,
                self_closing: false,
                len,
            },
        ))
    }

    fn self_close(_input: Node) -> Result<()> {
        Ok(())
    }

    fn tag_name(input: Node) -> Result<String> {
        Ok(input.as_str().to_string())
    }

    fn attributes(input: Node) -> Result<Vec<Attribute>> {
        Ok(match_nodes!(input.into_children();
            [attribute(attrs)..] => attrs.collect(),
        ))
    }

    fn attribute(input: Node) -> Result<Attribute> {
        let span = span_of(&input);
        Ok(match_nodes!(input.into_children();
            [attr_name(name)] => Attribute { name, value: None, span },
            [attr_name(name), attr_value(value)] => Attribute { name, value: Some(value), span },
        ))
    }

    fn attr_name(input: Node) -> Result<String> {
        Ok(input.as_str().to_string())
    }

    fn attr_value(input: Node) -> Result<String> {
        let raw = input.as_str();
        let unquoted = if raw.len() >= 2
            && ((raw.starts_with('"') && raw.ends_with('"'))
                || (raw.starts_with('\'') && raw.ends_with('\'')))
        {
            &raw[1..raw.len() - 1]
        } else {
            raw
        };
        Ok(decode_entities(unquoted))
    }
}

/// Parses template markup into a node list.
///
/// The first syntax error stops parsing; its offset is relative to `source`.
pub fn parse_template(source: &str) -> std::result::Result<Vec<TemplateNode>, TemplateError> {
    let nodes = TemplateParser::parse(Rule::template, source).map_err(|e| describe(source, &e))?;
    let node = nodes.single().map_err(|e| describe(source, &e))?;
    TemplateParser::template(node).map_err(|e| describe(source, &e))
}

/// Parses the start tag at the beginning of `source`, if there is one.
pub fn parse_start_tag(source: &str) -> Option<StartTag> {
    let nodes = TemplateParser::parse(Rule::start_tag, source).ok()?;
    let node = nodes.single().ok()?;
    TemplateParser::start_tag(node).ok()
}

fn describe(source: &str, e: &Error<Rule>) -> TemplateError {
    let offset = match e.location {
        InputLocation::Pos(p) => p,
        InputLocation::Span((s, _)) => s,
    }
    .min(source.len());
    if let Some(open) = unclosed_interpolation(source) {
        return TemplateError {
            message: MISSING_INTERPOLATION_END.to_string(),
            offset: open,
        };
    }
    let near = offset.saturating_sub(2);
    let message = if source.is_char_boundary(near) && source[near..].starts_with("</")
        || source[offset..].starts_with("</")
    {
        INVALID_END_TAG
    } else if offset >= source.len() || source[offset..].trim().is_empty() {
        MISSING_END_TAG
    } else {
        ILLEGAL_TAG
    };
    TemplateError {
        message: message.to_string(),
        offset,
    }
}

fn unclosed_interpolation(source: &str) -> Option<usize> {
    let mut from = 0;
    while let Some(i) = source[from..].find("{{") {
        let open = from + i;
        match source[open + 2..].find("}}") {
            Some(j) => from = open + 2 + j + 2,
            None => return Some(open),
        }
    }
    None
}

/// Decodes the handful of named and numeric character references that show
/// up in hand-written templates. Unknown references are kept verbatim.
pub fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(i) = rest.find('&') {
        out.push_str(&rest[..i]);
        rest = &rest[i..];
        let decoded = rest.find(';').filter(|&end| end <= 10).and_then(|end| {
            let entity = &rest[1..end];
            let ch = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ if entity.starts_with("#x") || entity.starts_with("#X") => {
                    u32::from_str_radix(&entity[2..], 16).ok().and_then(char::from_u32)
                }
                _ if entity.starts_with('#') => {
                    entity[1..].parse::<u32>().ok().and_then(char::from_u32)
                }
                _ => None,
            };
            ch.map(|c| (c, end + 1))
        });
        match decoded {
            Some((c, len)) => {
                out.push(c);
                rest = &rest[len..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(node: &TemplateNode) -> &ElementNode {
        match node {
            TemplateNode::Element(e) => e,
            other => panic!("expected element, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_nested_elements() {
        let nodes = parse_template("<div id=\"app\"><p>Hello {{ name }}!</p><br></div>").unwrap();
        assert_eq!(nodes.len(), 1);
        let div = element(&nodes[0]);
        assert_eq!(div.tag, "div");
        assert_eq!(div.attr("id").unwrap().value.as_deref(), Some("app"));
        assert_eq!(div.children.len(), 2);
        let p = element(&div.children[0]);
        assert_eq!(
            p.children,
            vec![
                TemplateNode::Text("Hello ".to_string(), Span { start: 17, end: 23 }),
                TemplateNode::Interpolation("name".to_string(), Span { start: 23, end: 33 }),
                TemplateNode::Text("!".to_string(), Span { start: 33, end: 34 }),
            ]
        );
        assert!(element(&div.children[1]).self_closing);
    }

    #[test]
    fn test_parse_directives_and_self_closing() {
        let nodes =
            parse_template("<MyComp v-if=\"a > b\" @click='go(1)' :foo=bar disabled/>").unwrap();
        let comp = element(&nodes[0]);
        assert!(comp.self_closing);
        let names: Vec<&str> = comp.attrs.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["v-if", "@click", ":foo", "disabled"]);
        assert_eq!(comp.attrs[0].value.as_deref(), Some("a > b"));
        assert_eq!(comp.attrs[1].value.as_deref(), Some("go(1)"));
        assert_eq!(comp.attrs[2].value.as_deref(), Some("bar"));
        assert_eq!(comp.attrs[3].value, None);
    }

    #[test]
    fn test_comment_and_entities() {
        let nodes = parse_template("<!-- note --><p>a &amp; b &#x41;</p>").unwrap();
        assert_eq!(
            nodes[0],
            TemplateNode::Comment(" note ".to_string(), Span { start: 0, end: 13 })
        );
        match &element(&nodes[1]).children[0] {
            TemplateNode::Text(t, _) => assert_eq!(t, "a & b A"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_missing_end_tag() {
        let err = parse_template("<div><span>").unwrap_err();
        assert_eq!(err.message, MISSING_END_TAG);
    }

    #[test]
    fn test_unclosed_interpolation() {
        let err = parse_template("<p>{{ msg </p>").unwrap_err();
        assert_eq!(err.message, MISSING_INTERPOLATION_END);
        assert_eq!(err.offset, 3);
    }

    #[test]
    fn test_stray_end_tag() {
        let err = parse_template("<p></p></div>").unwrap_err();
        assert_eq!(err.message, INVALID_END_TAG);
    }

    #[test]
    fn test_start_tag() {
        let tag = parse_start_tag("<style scoped lang=\"scss\">\n.a{}</style>").unwrap();
        assert_eq!(tag.name, "style");
        assert_eq!(tag.len, 26);
        assert!(!tag.self_closing);
        assert_eq!(tag.attrs[0].name, "scoped");
        assert_eq!(tag.attrs[1].value.as_deref(), Some("scss"));

        let tag = parse_start_tag("<script src=\"./a.js\" />").unwrap();
        assert!(tag.self_closing);
        assert!(parse_start_tag("</template>").is_none());
    }
}

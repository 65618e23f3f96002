use pest::error::{Error, InputLocation};
use pest::iterators::{Pair, Pairs};
use pest::Parser;
use pest_derive::Parser;

use super::template::Span;
use super::util::LineIndex;

#[derive(Parser)]
#[grammar = "parser/style.pest"] // relative to src
pub struct StyleParser;

/// Rewritable regions of a stylesheet.
#[derive(Debug, Default, PartialEq)]
pub struct Stylesheet {
    /// Each selector of every qualified rule outside `@keyframes`, trimmed.
    pub selectors: Vec<Span>,
    /// Declaration bodies, plus raw `@keyframes` bodies.
    pub declarations: Vec<Span>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StyleSyntaxError {
    pub reason: &'static str,
    pub line: usize,
    pub column: usize,
}

impl StyleSyntaxError {
    pub fn to_message(&self, filename: &str) -> String {
        format!("{}:{}:{}: {}", filename, self.line, self.column, self.reason)
    }
}

pub fn parse_stylesheet(source: &str) -> Result<Stylesheet, StyleSyntaxError> {
    let pairs = StyleParser::parse(Rule::stylesheet, source).map_err(|e| describe(source, &e))?;
    let mut sheet = Stylesheet::default();
    for pair in pairs {
        collect(pair.into_inner(), &mut sheet);
    }
    Ok(sheet)
}

fn collect(pairs: Pairs<Rule>, sheet: &mut Stylesheet) {
    for pair in pairs {
        match pair.as_rule() {
            Rule::qualified_rule => {
                for inner in pair.into_inner() {
                    match inner.as_rule() {
                        Rule::selector_list => {
                            for selector in inner.into_inner() {
                                if let Some(span) = trimmed_span(&selector) {
                                    sheet.selectors.push(span);
                                }
                            }
                        }
                        Rule::declarations => sheet.declarations.push(span_of(&inner)),
                        _ => {}
                    }
                }
            }
            Rule::nested_at_rule => collect(pair.into_inner(), sheet),
            Rule::at_rule => {
                for inner in pair.into_inner() {
                    if inner.as_rule() == Rule::declarations {
                        sheet.declarations.push(span_of(&inner));
                    }
                }
            }
            Rule::keyframes => {
                for inner in pair.into_inner() {
                    if inner.as_rule() == Rule::raw_block {
                        sheet.declarations.push(span_of(&inner));
                    }
                }
            }
            _ => {}
        }
    }
}

fn span_of(pair: &Pair<Rule>) -> Span {
    let span = pair.as_span();
    Span {
        start: span.start(),
        end: span.end(),
    }
}

fn trimmed_span(pair: &Pair<Rule>) -> Option<Span> {
    let span = pair.as_span();
    let text = span.as_str();
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    let start = span.start() + (text.len() - text.trim_start().len());
    Some(Span {
        start,
        end: start + trimmed.len(),
    })
}

fn describe(source: &str, e: &Error<Rule>) -> StyleSyntaxError {
    let offset = match e.location {
        InputLocation::Pos(p) => p,
        InputLocation::Span((s, _)) => s,
    }
    .min(source.len());
    let rest = source[offset..].trim_start();
    let reason = if rest.is_empty() {
        "Unclosed block"
    } else if rest.starts_with('}') {
        "Unexpected }"
    } else {
        "Unknown word"
    };
    let pos = LineIndex::new(source).position(offset);
    StyleSyntaxError {
        reason,
        line: pos.line,
        column: pos.column,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts<'a>(source: &'a str, spans: &[Span]) -> Vec<&'a str> {
        spans.iter().map(|s| &source[s.start..s.end]).collect()
    }

    #[test]
    fn test_selectors_and_declarations() {
        let src = ".a, .b:hover > p { color: red }\n@media (max-width: 10px) { .c { x: y } }";
        let sheet = parse_stylesheet(src).unwrap();
        assert_eq!(texts(src, &sheet.selectors), vec![".a", ".b:hover > p", ".c"]);
        assert_eq!(texts(src, &sheet.declarations), vec![" color: red ", " x: y "]);
    }

    #[test]
    fn test_keyframes_are_opaque() {
        let src = "@keyframes spin { from { a: b } to { a: c } }\n.x:is(.y, .z) { }";
        let sheet = parse_stylesheet(src).unwrap();
        assert_eq!(texts(src, &sheet.selectors), vec![".x:is(.y, .z)"]);
        assert_eq!(sheet.declarations.len(), 2);
    }

    #[test]
    fn test_statements_and_comments() {
        let src = "@import url(\"a.css\");\n/* c { */\n@font-face { font-family: x }\n[data-a=\"1,2\"] { }";
        let sheet = parse_stylesheet(src).unwrap();
        assert_eq!(texts(src, &sheet.selectors), vec!["[data-a=\"1,2\"]"]);
    }

    #[test]
    fn test_unclosed_block() {
        let err = parse_stylesheet(".a { color: red;").unwrap_err();
        assert_eq!(err.reason, "Unclosed block");
        assert_eq!(err.to_message("x.vue"), format!("x.vue:1:{}: Unclosed block", err.column));
    }

    #[test]
    fn test_unexpected_close() {
        let err = parse_stylesheet(".a { }\n}").unwrap_err();
        assert_eq!(err.reason, "Unexpected }");
        assert_eq!(err.line, 2);
    }
}

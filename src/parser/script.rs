//! A lexer for script blocks and template expressions.
//!
//! It is shallow: enough to find top-level statements, walk
//! declarations and imports, and locate identifiers for rewriting. It never
//! builds an expression tree.

use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    Punct,
    String,
    Template,
    Number,
    Regex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub start: usize,
    pub end: usize,
    /// A line break (outside comments' own content) precedes this token.
    pub newline_before: bool,
}

impl<'a> Token<'a> {
    pub fn is(&self, text: &str) -> bool {
        self.text == text && matches!(self.kind, TokenKind::Ident | TokenKind::Punct)
    }

    pub fn is_ident(&self) -> bool {
        self.kind == TokenKind::Ident
    }

    /// Value of a plain string literal, without quotes or escape handling.
    pub fn string_value(&self) -> Option<&'a str> {
        match self.kind {
            TokenKind::String if self.text.len() >= 2 => Some(&self.text[1..self.text.len() - 1]),
            TokenKind::Template if self.text.len() >= 2 && !self.text.contains("${") => {
                Some(&self.text[1..self.text.len() - 1])
            }
            _ => None,
        }
    }
}

const PUNCTUATORS: &[&str] = &[
    ">>>=", "...", "===", "!==", "**=", "<<=", ">>=", ">>>", "&&=", "||=", "??=", "=>", "==",
    "!=", "<=", ">=", "&&", "||", "??", "?.", "++", "--", "+=", "-=", "*=", "/=", "%=", "&=",
    "|=", "^=", "**", "<<", ">>", "{", "}", "(", ")", "[", "]", ";", ",", "<", ">", "+", "-", "*",
];

const SINGLE_PUNCT: &str = "/%&|^!~?:=.@#";

const REGEX_AFTER_KEYWORDS: &[&str] = &[
    "return", "typeof", "instanceof", "in", "of", "new", "delete", "void", "throw", "case", "do",
    "else",
];

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$' || (!c.is_ascii() && c.is_alphabetic())
}

fn is_ident_part(c: char) -> bool {
    is_ident_start(c) || c.is_ascii_digit() || (!c.is_ascii() && c.is_alphanumeric())
}

pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if is_ident_start(c) => chars.all(is_ident_part),
        _ => false,
    }
}

pub fn tokenize(src: &str) -> Vec<Token<'_>> {
    let bytes = src.as_bytes();
    let mut tokens: Vec<Token> = Vec::new();
    let mut i = 0;
    let mut newline = false;
    while i < bytes.len() {
        let c = bytes[i];
        if c == b'\n' {
            newline = true;
            i += 1;
            continue;
        }
        if c.is_ascii_whitespace() {
            i += 1;
            continue;
        }
        if src[i..].starts_with("//") {
            i = src[i..].find('\n').map(|n| i + n).unwrap_or(bytes.len());
            continue;
        }
        if src[i..].starts_with("/*") {
            let end = src[i + 2..].find("*/").map(|n| i + 2 + n + 2).unwrap_or(bytes.len());
            if src[i..end].contains('\n') {
                newline = true;
            }
            i = end;
            continue;
        }
        let start = i;
        let kind = if c == b'"' || c == b'\'' {
            i = skip_string(bytes, i);
            TokenKind::String
        } else if c == b'`' {
            i = skip_template(src, i);
            TokenKind::Template
        } else if c.is_ascii_digit() || (c == b'.' && bytes.get(i + 1).map_or(false, |b| b.is_ascii_digit())) {
            i += 1;
            while i < bytes.len() {
                let b = bytes[i];
                let exponent_sign = (b == b'+' || b == b'-')
                    && matches!(bytes[i - 1], b'e' | b'E')
                    && !src[start..i].starts_with("0x");
                if b.is_ascii_alphanumeric() || b == b'.' || b == b'_' || exponent_sign {
                    i += 1;
                } else {
                    break;
                }
            }
            TokenKind::Number
        } else if c == b'/' && regex_allowed(tokens.last()) {
            i = skip_regex(bytes, i);
            TokenKind::Regex
        } else {
            let ch = src[i..].chars().next().unwrap_or(' ');
            if is_ident_start(ch) || ch == '\\' {
                i += ch.len_utf8();
                while let Some(next) = src[i..].chars().next() {
                    if is_ident_part(next) {
                        i += next.len_utf8();
                    } else {
                        break;
                    }
                }
                TokenKind::Ident
            } else {
                let len = PUNCTUATORS
                    .iter()
                    .find(|p| src[i..].starts_with(**p))
                    .map(|p| p.len())
                    .unwrap_or_else(|| {
                        if SINGLE_PUNCT.contains(ch) {
                            1
                        } else {
                            ch.len_utf8()
                        }
                    });
                i += len;
                TokenKind::Punct
            }
        };
        let end = i.min(bytes.len());
        tokens.push(Token {
            kind,
            text: &src[start..end],
            start,
            end,
            newline_before: newline,
        });
        newline = false;
    }
    tokens
}

fn regex_allowed(prev: Option<&Token>) -> bool {
    match prev {
        None => true,
        Some(t) => match t.kind {
            TokenKind::Punct => !matches!(t.text, ")" | "]" | "}" | "++" | "--"),
            TokenKind::Ident => REGEX_AFTER_KEYWORDS.contains(&t.text),
            _ => false,
        },
    }
}

fn skip_string(bytes: &[u8], start: usize) -> usize {
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'\n' => return i,
            b if b == quote => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}

fn skip_template(src: &str, start: usize) -> usize {
    let bytes = src.as_bytes();
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'`' => return i + 1,
            b'$' if bytes.get(i + 1) == Some(&b'{') => {
                i = skip_balanced(src, i + 1);
            }
            _ => i += 1,
        }
    }
    bytes.len()
}

/// `open` points at a `{`; returns the offset just past its matching `}`.
fn skip_balanced(src: &str, open: usize) -> usize {
    let bytes = src.as_bytes();
    let mut depth = 0usize;
    let mut i = open;
    while i < bytes.len() {
        match bytes[i] {
            b'{' => {
                depth += 1;
                i += 1;
            }
            b'}' => {
                depth -= 1;
                i += 1;
                if depth == 0 {
                    return i;
                }
            }
            b'"' | b'\'' => i = skip_string(bytes, i),
            b'`' => i = skip_template(src, i),
            _ => i += 1,
        }
    }
    bytes.len()
}

fn skip_regex(bytes: &[u8], start: usize) -> usize {
    let mut i = start + 1;
    let mut in_class = false;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'[' => {
                in_class = true;
                i += 1;
            }
            b']' => {
                in_class = false;
                i += 1;
            }
            b'/' if !in_class => {
                i += 1;
                while i < bytes.len() && bytes[i].is_ascii_alphabetic() {
                    i += 1;
                }
                return i;
            }
            b'\n' => return i,
            _ => i += 1,
        }
    }
    bytes.len()
}

/// Bracket nesting change contributed by one token.
pub fn depth_delta(t: &Token) -> isize {
    if t.kind != TokenKind::Punct {
        return 0;
    }
    match t.text {
        "(" | "[" | "{" => 1,
        ")" | "]" | "}" => -1,
        _ => 0,
    }
}

const CONTINUE_BEFORE: &[&str] = &[
    ".", "?.", ",", "?", ":", "+", "-", "*", "/", "%", "**", "=", "==", "===", "!=", "!==", "<",
    ">", "<=", ">=", "&&", "||", "??", "=>", "|", "&", "^", "<<", ">>", ">>>", "(", "[", "+=",
    "-=", "*=", "/=", "||=", "&&=",
];

const CONTINUE_AFTER_IDENT: &[&str] = &[
    "else", "catch", "finally", "instanceof", "in", "of", "as", "satisfies", "extends",
    "implements", "from", "keyof",
];

const BLOCK_STATEMENT_STARTS: &[&str] = &[
    "function", "class", "if", "for", "while", "switch", "try", "interface", "enum", "namespace",
    "module", "abstract", "async", "declare",
];

fn continues(prev: &Token, next: &Token) -> bool {
    if next.kind == TokenKind::Template {
        return true;
    }
    if next.kind == TokenKind::Punct && CONTINUE_BEFORE.contains(&next.text) {
        return true;
    }
    if next.kind == TokenKind::Ident && CONTINUE_AFTER_IDENT.contains(&next.text) {
        return true;
    }
    match prev.kind {
        TokenKind::Punct => !matches!(prev.text, ")" | "]" | "}" | "++" | "--" | ";"),
        TokenKind::Ident => matches!(
            prev.text,
            "new" | "typeof" | "void" | "delete" | "await" | "extends" | "in" | "instanceof"
                | "as" | "satisfies" | "keyof"
        ),
        _ => false,
    }
}

/// Splits a token stream into top-level statements, applying automatic
/// semicolon insertion at line breaks. Each range indexes into `tokens` and
/// includes a terminating `;` when present.
pub fn split_statements(tokens: &[Token]) -> Vec<Range<usize>> {
    let mut statements = Vec::new();
    let mut start = 0;
    let mut depth: isize = 0;
    let mut i = 0;
    while i < tokens.len() {
        let t = &tokens[i];
        if i > start && depth == 0 && t.newline_before && !continues(&tokens[i - 1], t) {
            statements.push(start..i);
            start = i;
        }
        depth += depth_delta(t);
        if depth < 0 {
            depth = 0;
        }
        i += 1;
        if depth == 0 && t.is(";") {
            statements.push(start..i);
            start = i;
        } else if depth == 0 && t.is("}") && block_statement(&tokens[start..i]) {
            let next_continues = tokens
                .get(i)
                .map_or(false, |n| matches!(n.text, "else" | "catch" | "finally"));
            if !next_continues {
                statements.push(start..i);
                start = i;
            }
        }
    }
    if start < tokens.len() {
        statements.push(start..tokens.len());
    }
    statements
}

fn block_statement(tokens: &[Token]) -> bool {
    let first = match tokens.first() {
        Some(t) => t,
        None => return false,
    };
    let lead = if first.is("export") {
        match tokens.get(1) {
            Some(t) if t.is("default") => tokens.get(2),
            other => other,
        }
    } else {
        Some(first)
    };
    match lead {
        Some(t) if t.is_ident() && BLOCK_STATEMENT_STARTS.contains(&t.text) => {
            // `async` only starts a block statement as `async function`
            !t.is("async") || tokens.iter().any(|x| x.is("function"))
        }
        Some(t) => t.is("{"),
        None => false,
    }
}

/// Splits on commas at nesting depth zero.
pub fn split_top_level<'t, 'a>(tokens: &'t [Token<'a>], sep: &str) -> Vec<&'t [Token<'a>]> {
    let mut parts = Vec::new();
    let mut depth: isize = 0;
    let mut angle: isize = 0;
    let mut start = 0;
    for (i, t) in tokens.iter().enumerate() {
        depth += depth_delta(t);
        if t.kind == TokenKind::Punct {
            match t.text {
                "<" => angle += 1,
                ">" => angle = (angle - 1).max(0),
                ">>" => angle = (angle - 2).max(0),
                ">>>" => angle = (angle - 3).max(0),
                _ => {}
            }
        }
        if depth == 0 && angle == 0 && t.is(sep) {
            parts.push(&tokens[start..i]);
            start = i + 1;
        }
    }
    if start < tokens.len() {
        parts.push(&tokens[start..]);
    }
    parts
}

/// Index of the token that closes the bracket opened at `open`.
pub fn matching_close(tokens: &[Token], open: usize) -> Option<usize> {
    let mut depth: isize = 0;
    for (i, t) in tokens.iter().enumerate().skip(open) {
        depth += depth_delta(t);
        if depth == 0 {
            return Some(i);
        }
    }
    None
}

/// Index of the `>` closing a type-argument list opened at `open`.
pub fn matching_angle(tokens: &[Token], open: usize) -> Option<usize> {
    let mut angle: isize = 0;
    let mut depth: isize = 0;
    for (i, t) in tokens.iter().enumerate().skip(open) {
        depth += depth_delta(t);
        if depth == 0 && t.kind == TokenKind::Punct {
            match t.text {
                "<" => angle += 1,
                ">" => angle -= 1,
                ">>" => angle -= 2,
                _ => {}
            }
            if angle <= 0 {
                return Some(i);
            }
        }
    }
    None
}

/// Names bound by a declaration pattern: an identifier, or an object or
/// array destructuring pattern.
pub fn pattern_names(tokens: &[Token]) -> Vec<String> {
    let mut names = Vec::new();
    collect_pattern_names(tokens, &mut names);
    names
}

fn collect_pattern_names(tokens: &[Token], names: &mut Vec<String>) {
    let first = match tokens.first() {
        Some(t) => t,
        None => return,
    };
    if first.is("{") || first.is("[") {
        let close = matching_close(tokens, 0).unwrap_or(tokens.len());
        let inner = &tokens[1..close.min(tokens.len())];
        for element in split_top_level(inner, ",") {
            let element = strip_default(element);
            if element.is_empty() {
                continue;
            }
            if element[0].is("...") {
                collect_pattern_names(&element[1..], names);
            } else if first.is("{") {
                match element.iter().position(|t| t.is(":")) {
                    Some(colon) => collect_pattern_names(&element[colon + 1..], names),
                    None => collect_pattern_names(element, names),
                }
            } else {
                collect_pattern_names(element, names);
            }
        }
    } else if first.is_ident() {
        names.push(first.text.to_string());
    }
}

/// Drops a trailing `= default` at depth zero.
fn strip_default<'t, 'a>(tokens: &'t [Token<'a>]) -> &'t [Token<'a>] {
    let mut depth: isize = 0;
    for (i, t) in tokens.iter().enumerate() {
        depth += depth_delta(t);
        if depth == 0 && t.is("=") {
            return &tokens[..i];
        }
    }
    tokens
}

/// Keys of an object literal `{ ... }` starting at `tokens[0]`: plain,
/// quoted and shorthand keys, and method shorthands. Spreads and computed
/// keys are skipped.
pub fn object_literal_keys<'a>(tokens: &[Token<'a>]) -> Vec<(String, Range<usize>)> {
    let mut keys = Vec::new();
    if !tokens.first().map_or(false, |t| t.is("{")) {
        return keys;
    }
    let close = matching_close(tokens, 0).unwrap_or(tokens.len());
    let inner_start = 1;
    let inner = &tokens[inner_start..close.min(tokens.len())];
    let mut offset = inner_start;
    for entry in split_top_level(inner, ",") {
        let base = offset;
        offset += entry.len() + 1;
        let mut idx = 0;
        while idx < entry.len() && matches!(entry[idx].text, "async" | "get" | "set" | "*" | "readonly")
            && entry.get(idx + 1).map_or(false, |n| !n.is(":") && !n.is("(") && !n.is(","))
        {
            idx += 1;
        }
        let key = match entry.get(idx) {
            Some(t) if t.is_ident() => t.text.to_string(),
            Some(t) if t.kind == TokenKind::String => t.string_value().unwrap_or("").to_string(),
            Some(t) if t.kind == TokenKind::Number => t.text.to_string(),
            _ => continue,
        };
        keys.push((key, base..base + entry.len()));
    }
    keys
}

/// Source text covered by a token slice.
pub fn source_of<'a>(src: &'a str, tokens: &[Token]) -> &'a str {
    match (tokens.first(), tokens.last()) {
        (Some(f), Some(l)) => &src[f.start..l.end],
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts<'a>(tokens: &[Token<'a>]) -> Vec<&'a str> {
        tokens.iter().map(|t| t.text).collect()
    }

    fn statements(src: &str) -> Vec<String> {
        let tokens = tokenize(src);
        split_statements(&tokens)
            .into_iter()
            .map(|r| source_of(src, &tokens[r]).to_string())
            .collect()
    }

    #[test]
    fn test_tokenize_basics() {
        let tokens = tokenize("const a = `x${ {b: 1}.b }y` // c\nlet r = /[/]x/g.test(s) / 2");
        assert_eq!(
            texts(&tokens),
            vec![
                "const", "a", "=", "`x${ {b: 1}.b }y`", "let", "r", "=", "/[/]x/g", ".", "test",
                "(", "s", ")", "/", "2"
            ]
        );
        assert!(tokens[4].newline_before);
        assert_eq!(tokens[7].kind, TokenKind::Regex);
        assert_eq!(tokens[13].kind, TokenKind::Punct);
    }

    #[test]
    fn test_numbers_and_punct() {
        let tokens = tokenize("x?.y ?? 1e-3 >>>= 0x1F");
        assert_eq!(texts(&tokens), vec!["x", "?.", "y", "??", "1e-3", ">>>=", "0x1F"]);
    }

    #[test]
    fn test_split_statements_asi() {
        let src = "import { ref } from 'vue'\nconst a = ref(1)\nconst b = a\n  .value + 1\nfunction f() {\n  return 1\n} f()\nif (a) { x() } else { y() }\nlet c = 1; let d = 2";
        assert_eq!(
            statements(src),
            vec![
                "import { ref } from 'vue'",
                "const a = ref(1)",
                "const b = a\n  .value + 1",
                "function f() {\n  return 1\n}",
                "f()",
                "if (a) { x() } else { y() }",
                "let c = 1;",
                "let d = 2"
            ]
        );
    }

    #[test]
    fn test_split_statements_multiline_object() {
        let src = "const props = defineProps({\n  a: String,\n})\ndefineEmits(['x'])";
        assert_eq!(
            statements(src),
            vec!["const props = defineProps({\n  a: String,\n})", "defineEmits(['x'])"]
        );
    }

    #[test]
    fn test_pattern_names() {
        let tokens = tokenize("{ a, b: c, d = 1, e: [f, , g = 2], ...rest }");
        assert_eq!(pattern_names(&tokens), vec!["a", "c", "d", "f", "g", "rest"]);
        assert_eq!(pattern_names(&tokenize("count")), vec!["count"]);
    }

    #[test]
    fn test_object_literal_keys() {
        let tokens = tokenize("{ a: 1, 'b-c': 2, d, e() {}, async f() {}, ...g, [h]: 3 }");
        let keys: Vec<String> = object_literal_keys(&tokens).into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "b-c", "d", "e", "f"]);
    }

    #[test]
    fn test_split_top_level_ignores_generics() {
        let tokens = tokenize("a: Map<string, number>, b: string");
        assert_eq!(split_top_level(&tokens, ",").len(), 2);
    }

    #[test]
    fn test_is_identifier() {
        assert!(is_identifier("_foo$1"));
        assert!(!is_identifier("1foo"));
        assert!(!is_identifier("data-v"));
    }
}

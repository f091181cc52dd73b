//! Syntax-only scanner for C and C++ sources.
//!
//! This is not a parser. It tracks just enough structure to find function
//! definitions at namespace scope: namespace blocks, brace depth, doc
//! comments, string and character literals, and preprocessor conditionals
//! (evaluated against the `-D` defines in the forwarded flags). Function
//! bodies are skipped without being looked at.

use super::{Declaration, ExtractError, Extractor, Filters, Marker, MarkerSet, Param, SyntaxNode};
use crate::compiler_flags;
use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

/// Namespace name recorded for `namespace { ... }`.
pub const ANONYMOUS_NAMESPACE: &str = "(anonymous)";

/// Names that can precede `(` but never name a function.
const NOT_FUNCTIONS: &[&str] = &[
    "if",
    "while",
    "for",
    "switch",
    "return",
    "sizeof",
    "alignof",
    "decltype",
    "static_assert",
    "__attribute__",
];

/// Doc blocks that are grouping commands rather than documentation.
const GROUP_COMMANDS: &[&str] = &["@{", "@}", "@file", "@addtogroup", "@defgroup", "@name"];

static ANNOTATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"__attribute__\s*\(\(\s*annotate\s*\(\s*"[^"]*"\s*\)\s*\)\)"#)
        .expect("annotation pattern is valid")
});

static MARKER_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:IGEN_INTERFACE|IGEN_PRIVATE|igen_interface|igen_private)\b")
        .expect("marker pattern is valid")
});

#[derive(Debug, Clone, Copy, Default)]
pub struct SourceScanner;

impl Extractor for SourceScanner {
    fn extract(
        &self,
        path: &Path,
        flags: &[String],
        filters: &Filters<'_>,
    ) -> Result<Vec<Declaration>, ExtractError> {
        let text = fs::read_to_string(path).map_err(|source| ExtractError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let defines: HashMap<String, Option<String>> =
            compiler_flags::defines(flags).into_iter().collect();

        let mut declarations = Vec::new();
        Scanner::new(path, &text, &defines).run(|node, namespaces| {
            if !filters.syntax.accept(node, filters.artifact) {
                return;
            }
            if let Some(decl) = resolve(node, namespaces)
                && filters.declaration.accept(&decl, filters.artifact)
            {
                declarations.push(decl);
            }
        })?;
        Ok(declarations)
    }
}

struct Namespace {
    /// Empty for transparent blocks such as `extern "C" { ... }`.
    name: String,
    /// Brace depth inside the block.
    depth: usize,
}

struct Conditional {
    active: bool,
    parent_active: bool,
    taken: bool,
}

struct Scanner<'a> {
    path: &'a Path,
    src: &'a str,
    bytes: &'a [u8],
    defines: &'a HashMap<String, Option<String>>,
    pos: usize,
    line: usize,
    depth: usize,
    namespaces: Vec<Namespace>,
    conditionals: Vec<Conditional>,
    doc: Vec<String>,
    pending: String,
    pending_line: usize,
    pending_doc: Vec<String>,
    line_start: bool,
    line_blank: bool,
}

impl<'a> Scanner<'a> {
    fn new(path: &'a Path, src: &'a str, defines: &'a HashMap<String, Option<String>>) -> Self {
        Self {
            path,
            src,
            bytes: src.as_bytes(),
            defines,
            pos: 0,
            line: 1,
            depth: 0,
            namespaces: Vec::new(),
            conditionals: Vec::new(),
            doc: Vec::new(),
            pending: String::new(),
            pending_line: 1,
            pending_doc: Vec::new(),
            line_start: true,
            line_blank: true,
        }
    }

    fn run<F>(mut self, mut emit: F) -> Result<(), ExtractError>
    where
        F: FnMut(&SyntaxNode<'_>, &[Namespace]),
    {
        while self.pos < self.bytes.len() {
            let c = self.bytes[self.pos];
            if c == b'\n' {
                self.newline();
                continue;
            }
            if self.line_start && c == b'#' {
                self.directive()?;
                continue;
            }
            if !self.active() {
                self.skip_line();
                continue;
            }
            if c.is_ascii_whitespace() {
                if self.at_scope() {
                    self.push_space();
                }
                self.pos += 1;
                continue;
            }

            self.line_start = false;
            self.line_blank = false;
            match (c, self.bytes.get(self.pos + 1).copied()) {
                (b'/', Some(b'/')) => self.line_comment(),
                (b'/', Some(b'*')) => self.block_comment()?,
                (b'"', _) => self.literal(b'"')?,
                (b'\'', _) if !self.in_number() => self.literal(b'\'')?,
                (b'{', _) => self.open_brace(&mut emit),
                (b'}', _) => self.close_brace()?,
                (b';', _) => {
                    if self.at_scope() {
                        self.reset_pending();
                    }
                    self.pos += 1;
                }
                _ => self.push_char(),
            }
        }

        if !self.conditionals.is_empty() {
            return Err(self.error("unterminated #if at end of file"));
        }
        if self.depth != 0 {
            return Err(self.error(format!(
                "unbalanced braces: {} block(s) still open at end of file",
                self.depth
            )));
        }
        Ok(())
    }

    fn error(&self, message: impl Into<String>) -> ExtractError {
        self.error_at(self.line, message)
    }

    fn error_at(&self, line: usize, message: impl Into<String>) -> ExtractError {
        ExtractError::Syntax {
            path: self.path.to_path_buf(),
            line,
            message: message.into(),
        }
    }

    fn active(&self) -> bool {
        self.conditionals.last().is_none_or(|c| c.active)
    }

    fn at_scope(&self) -> bool {
        self.depth == self.namespaces.last().map_or(0, |n| n.depth)
    }

    fn newline(&mut self) {
        // A blank line detaches a doc comment from whatever follows.
        if self.line_blank && self.pending.is_empty() {
            self.doc.clear();
        }
        if self.at_scope() {
            self.push_space();
        }
        self.line += 1;
        self.pos += 1;
        self.line_start = true;
        self.line_blank = true;
    }

    fn skip_line(&mut self) {
        self.line_start = false;
        while self.pos < self.bytes.len() && self.bytes[self.pos] != b'\n' {
            self.pos += 1;
        }
    }

    fn begin_pending(&mut self) {
        if self.pending.is_empty() {
            self.pending_line = self.line;
            self.pending_doc = std::mem::take(&mut self.doc);
        }
    }

    fn reset_pending(&mut self) {
        self.pending.clear();
        self.pending_doc.clear();
        self.doc.clear();
    }

    fn push_space(&mut self) {
        if !self.pending.is_empty() && !self.pending.ends_with(' ') {
            self.pending.push(' ');
        }
    }

    fn push_char(&mut self) {
        let Some(ch) = self.src[self.pos..].chars().next() else {
            self.pos += 1;
            return;
        };
        if self.at_scope() {
            self.begin_pending();
            self.pending.push(ch);
        }
        self.pos += ch.len_utf8();
    }

    /// Whether a `'` at the cursor is a digit separator (`1'000`, `0xff'ff`).
    fn in_number(&self) -> bool {
        let mut start = self.pos;
        while start > 0 && (self.bytes[start - 1].is_ascii_alphanumeric() || self.bytes[start - 1] == b'_') {
            start -= 1;
        }
        start < self.pos && self.bytes[start].is_ascii_digit()
    }

    fn line_comment(&mut self) {
        let end = self.src[self.pos..]
            .find('\n')
            .map_or(self.src.len(), |i| self.pos + i);
        let body = &self.src[self.pos..end];
        if self.at_scope()
            && self.pending.is_empty()
            && body.starts_with("///")
            && !body.starts_with("////")
            && !body.starts_with("///<")
        {
            let text = &body[3..];
            let text = text.strip_prefix(' ').unwrap_or(text).trim_end();
            self.doc.push(text.to_string());
        }
        self.pos = end;
    }

    fn block_comment(&mut self) -> Result<(), ExtractError> {
        let start_line = self.line;
        let Some(offset) = self.src[self.pos + 2..].find("*/") else {
            return Err(self.error_at(start_line, "unterminated block comment"));
        };
        let end = self.pos + 2 + offset + 2;
        let body = &self.src[self.pos..end];
        self.line += body.matches('\n').count();

        if self.at_scope() {
            if !self.pending.is_empty() {
                self.push_space();
            } else if body.starts_with("/**") && !body.starts_with("/***") && body.len() > 4 {
                let lines = doc_block_lines(body);
                let is_group = lines
                    .first()
                    .is_some_and(|l| GROUP_COMMANDS.iter().any(|g| l.starts_with(g)));
                if is_group {
                    self.doc.clear();
                } else {
                    self.doc = lines;
                }
            }
        }
        self.pos = end;
        Ok(())
    }

    fn literal(&mut self, quote: u8) -> Result<(), ExtractError> {
        let start = self.pos;
        let start_line = self.line;
        let raw = quote == b'"' && start > 0 && self.bytes[start - 1] == b'R';

        let end = if raw {
            let Some(open) = self.src[start + 1..].find('(') else {
                return Err(self.error_at(start_line, "malformed raw string literal"));
            };
            let delimiter = &self.src[start + 1..start + 1 + open];
            let closing = format!("){}\"", delimiter);
            let body_start = start + 1 + open + 1;
            let Some(close) = self.src[body_start..].find(&closing) else {
                return Err(self.error_at(start_line, "unterminated raw string literal"));
            };
            body_start + close + closing.len()
        } else {
            let mut i = start + 1;
            loop {
                match self.bytes.get(i) {
                    None | Some(b'\n') => {
                        return Err(self.error_at(start_line, "unterminated literal"));
                    }
                    Some(b'\\') => i += 2,
                    Some(&b) if b == quote => break i + 1,
                    Some(_) => i += 1,
                }
            }
        };

        let end = end.min(self.src.len());
        self.line += self.src[start..end].matches('\n').count();
        if self.at_scope() {
            self.begin_pending();
            self.pending.push_str(&self.src[start..end]);
        }
        self.pos = end;
        Ok(())
    }

    fn open_brace<F>(&mut self, emit: &mut F)
    where
        F: FnMut(&SyntaxNode<'_>, &[Namespace]),
    {
        if self.at_scope() {
            let text = self.pending.trim();
            if let Some(name) = namespace_head(text) {
                self.namespaces.push(Namespace {
                    name,
                    depth: self.depth + 1,
                });
            } else if is_linkage_block(text) {
                self.namespaces.push(Namespace {
                    name: String::new(),
                    depth: self.depth + 1,
                });
            } else if text.contains('(') {
                let node = SyntaxNode {
                    file: self.path,
                    line: self.pending_line,
                    doc: &self.pending_doc,
                    markers: markers_in(text),
                    text,
                };
                emit(&node, &self.namespaces);
            }
            self.reset_pending();
        }
        self.depth += 1;
        self.pos += 1;
    }

    fn close_brace(&mut self) -> Result<(), ExtractError> {
        if self.depth == 0 {
            return Err(self.error("unmatched '}'"));
        }
        self.depth -= 1;
        if self.namespaces.last().is_some_and(|n| n.depth > self.depth) {
            self.namespaces.pop();
        }
        if self.at_scope() {
            self.reset_pending();
        }
        self.pos += 1;
        Ok(())
    }

    fn directive(&mut self) -> Result<(), ExtractError> {
        let start_line = self.line;
        let mut end = self.pos;
        loop {
            let nl = self.src[end..].find('\n').map_or(self.src.len(), |i| end + i);
            let continued = self.src[..nl].trim_end_matches('\r').ends_with('\\');
            if continued && nl < self.src.len() {
                self.line += 1;
                end = nl + 1;
                continue;
            }
            end = nl;
            break;
        }

        let text = strip_trailing_comment(&self.src[self.pos + 1..end]).replace("\\\n", " ");
        let text = text.trim();
        let (keyword, rest) = match text.find(|c: char| !c.is_ascii_alphanumeric() && c != '_') {
            Some(i) => (&text[..i], text[i..].trim()),
            None => (text, ""),
        };
        self.pos = end;
        self.line_start = false;
        self.line_blank = false;

        match keyword {
            "if" => self.push_conditional(self.eval(rest)),
            "ifdef" => self.push_conditional(self.defines.contains_key(rest)),
            "ifndef" => self.push_conditional(!self.defines.contains_key(rest)),
            "elif" | "elifdef" | "elifndef" => {
                let value = match keyword {
                    "elif" => self.eval(rest),
                    "elifdef" => self.defines.contains_key(rest),
                    _ => !self.defines.contains_key(rest),
                };
                let Some(top) = self.conditionals.last_mut() else {
                    return Err(self.error_at(start_line, format!("#{} without #if", keyword)));
                };
                if top.taken {
                    top.active = false;
                } else {
                    top.active = top.parent_active && value;
                    top.taken = value;
                }
            }
            "else" => {
                let Some(top) = self.conditionals.last_mut() else {
                    return Err(self.error_at(start_line, "#else without #if"));
                };
                top.active = top.parent_active && !top.taken;
                top.taken = true;
            }
            "endif" => {
                if self.conditionals.pop().is_none() {
                    return Err(self.error_at(start_line, "#endif without #if"));
                }
            }
            _ => {}
        }

        if self.pending.is_empty() {
            self.doc.clear();
        }
        Ok(())
    }

    fn push_conditional(&mut self, value: bool) {
        let parent_active = self.active();
        self.conditionals.push(Conditional {
            active: parent_active && value,
            parent_active,
            taken: value,
        });
    }

    /// Evaluates an `#if` expression. Anything not understood counts as true.
    fn eval(&self, expr: &str) -> bool {
        self.try_eval(expr.trim()).unwrap_or(true)
    }

    fn try_eval(&self, expr: &str) -> Option<bool> {
        if let Some(rest) = expr.strip_prefix('!') {
            return self.try_eval(rest.trim()).map(|v| !v);
        }
        if let Some(rest) = expr.strip_prefix("defined") {
            let name = rest.trim();
            let name = name
                .strip_prefix('(')
                .and_then(|n| n.strip_suffix(')'))
                .unwrap_or(name)
                .trim();
            return is_identifier(name).then(|| self.defines.contains_key(name));
        }
        if let Ok(value) = expr.parse::<i64>() {
            return Some(value != 0);
        }
        if is_identifier(expr) {
            return Some(match self.defines.get(expr) {
                Some(Some(value)) => value.trim() != "0",
                Some(None) => true,
                None => false,
            });
        }
        None
    }
}

fn strip_trailing_comment(line: &str) -> &str {
    let cut = [line.find("//"), line.find("/*")]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(line.len());
    &line[..cut]
}

fn doc_block_lines(body: &str) -> Vec<String> {
    let inner = body
        .strip_prefix("/**")
        .and_then(|b| b.strip_suffix("*/"))
        .unwrap_or(body);
    let mut lines: Vec<String> = inner
        .lines()
        .map(|line| {
            let line = line.trim_start();
            let line = match line.strip_prefix('*') {
                Some(rest) => rest.strip_prefix(' ').unwrap_or(rest),
                None => line,
            };
            line.trim_end().to_string()
        })
        .collect();
    while lines.first().is_some_and(|l| l.is_empty()) {
        lines.remove(0);
    }
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn namespace_head(text: &str) -> Option<String> {
    let text = text.strip_prefix("inline ").unwrap_or(text).trim_start();
    let rest = text.strip_prefix("namespace")?;
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let name: String = rest.split_whitespace().collect();
    if name.is_empty() {
        return Some(ANONYMOUS_NAMESPACE.to_string());
    }
    name.split("::")
        .all(is_identifier)
        .then_some(name)
}

fn is_linkage_block(text: &str) -> bool {
    matches!(text, "extern \"C\"" | "extern \"C++\"")
}

fn markers_in(text: &str) -> MarkerSet {
    text.split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .filter_map(Marker::from_token)
        .collect()
}

fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Index of the `)` matching the `(` at `open`.
fn matching_paren(s: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, b) in s.bytes().enumerate().skip(open) {
        match b {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Splits `head` into (return type, qualified name).
fn split_name(head: &str) -> Option<(&str, &str)> {
    let bytes = head.as_bytes();
    let is_name_byte = |b: u8| b.is_ascii_alphanumeric() || b == b'_' || b == b':' || b == b'~';

    let operator = head.rfind("operator").filter(|&i| {
        i == 0 || !(bytes[i - 1].is_ascii_alphanumeric() || bytes[i - 1] == b'_')
    });
    let mut start = match operator {
        Some(i) => i,
        None => {
            let mut start = head.len();
            while start > 0 && is_name_byte(bytes[start - 1]) {
                start -= 1;
            }
            start
        }
    };
    if operator.is_some() {
        while head[..start].ends_with("::") {
            start -= 2;
            while start > 0 && is_name_byte(bytes[start - 1]) && bytes[start - 1] != b':' {
                start -= 1;
            }
        }
    }

    let name = head[start..].trim();
    let first = name.chars().next()?;
    if !(first.is_ascii_alphabetic() || first == '_' || first == '~' || first == ':') {
        return None;
    }
    Some((head[..start].trim(), name))
}

fn split_params(s: &str) -> Vec<Param> {
    let s = s.trim();
    if s.is_empty() || s == "void" {
        return Vec::new();
    }
    let mut params = Vec::new();
    let mut parens = 0usize;
    let mut angles = 0usize;
    let mut start = 0;
    for (i, b) in s.bytes().enumerate() {
        match b {
            b'(' | b'[' | b'{' => parens += 1,
            b')' | b']' | b'}' => parens = parens.saturating_sub(1),
            b'<' if parens == 0 => angles += 1,
            b'>' if parens == 0 => angles = angles.saturating_sub(1),
            b',' if parens == 0 && angles == 0 => {
                params.push(parse_param(&s[start..i]));
                start = i + 1;
            }
            _ => {}
        }
    }
    params.push(parse_param(&s[start..]));
    params
}

fn parse_param(raw: &str) -> Param {
    const DEFAULT_MACRO: &str = "IGEN_DEFAULT";
    if let Some(at) = raw.find(DEFAULT_MACRO)
        && let Some(open) = raw[at..].find('(').map(|i| at + i)
        && raw[at + DEFAULT_MACRO.len()..open].trim().is_empty()
        && let Some(close) = matching_paren(raw, open)
    {
        let text = format!("{} {}", &raw[..at], &raw[close + 1..]);
        return Param {
            text: normalize_ws(&text),
            default: Some(normalize_ws(&raw[open + 1..close])),
        };
    }
    Param {
        text: normalize_ws(raw),
        default: None,
    }
}

/// Text after the parameter list, up to a constructor initializer list.
fn trailing(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut cut = s.len();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b':' {
            if bytes.get(i + 1) == Some(&b':') {
                i += 2;
                continue;
            }
            cut = i;
            break;
        }
        i += 1;
    }
    normalize_ws(&s[..cut])
}

fn resolve(node: &SyntaxNode<'_>, namespaces: &[Namespace]) -> Option<Declaration> {
    let text = ANNOTATION.replace_all(node.text, " ");
    let text = MARKER_TOKEN.replace_all(&text, " ");
    let text = text.trim();

    let search_from = text
        .find("operator()")
        .map_or(0, |i| i + "operator()".len());
    let open = search_from + text[search_from..].find('(')?;
    let close = matching_paren(text, open)?;
    let (return_type, qualified) = split_name(text[..open].trim_end())?;

    let first_word = return_type.split_whitespace().next().unwrap_or("");
    if matches!(first_word, "typedef" | "using" | "friend") {
        return None;
    }

    let qualified = normalize_ws(qualified);
    let (qualifier, name) = match qualified.rsplit_once("::") {
        Some((q, n)) => (Some(q), n),
        None => (None, qualified.as_str()),
    };
    if name.is_empty() || NOT_FUNCTIONS.contains(&name) {
        return None;
    }

    let namespace = match qualifier {
        // `::name` and `::ns::name` are absolute.
        Some(q) if qualified.starts_with("::") => q.trim_start_matches("::").to_string(),
        _ => {
            let mut parts: Vec<&str> = namespaces
                .iter()
                .map(|n| n.name.as_str())
                .filter(|n| !n.is_empty())
                .collect();
            if let Some(q) = qualifier {
                parts.push(q);
            }
            parts.join("::")
        }
    };

    Some(Declaration {
        file: node.file.to_path_buf(),
        line: node.line,
        namespace,
        name: name.to_string(),
        return_type: normalize_ws(return_type),
        params: split_params(&text[open + 1..close]),
        suffix: trailing(&text[close + 1..]),
        doc: node.doc.to_vec(),
        markers: node.markers,
    })
}

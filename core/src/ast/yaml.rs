//! YAML parser that records byte spans.
//!
//! Covers what API descriptions are written in: block mappings and sequences
//! (including compact `- key: value` entries), flow collections, plain and
//! quoted scalars, literal and folded block scalars, comments, directives and
//! document markers. Anchors are recorded as nodes are parsed and an alias
//! expands to a copy of the anchored node, spans included, so a location
//! found through an alias points at the anchor's definition. The core schema
//! tags (`!!str`, `!!int`, `!!float`, `!!bool`, `!!null`) and the
//! non-specific `!` decide how a scalar resolves; other tags are ignored.
//! Complex keys, properties on keys and multi-document streams are rejected.

use super::json::parse_number;
use super::{check_duplicate, Entry, Node, NodeKind, Scalar, Span, SyntaxError};
use regex::Regex;
use serde_json::Number;
use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

const MAX_DEPTH: usize = 512;
const MAX_ALIAS_NODES: usize = 100_000;

pub(super) fn parse(text: &str) -> Result<Node, SyntaxError> {
    let mut parser = YamlParser {
        src: text,
        pos: 0,
        depth: 0,
        anchors: HashMap::new(),
        expanded: 0,
    };
    parser.document()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ctx {
    Document,
    Value,
    Entry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stop {
    Eol,
    Colon,
    Comment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Chomp {
    Clip,
    Strip,
    Keep,
}

/// A tag as far as scalar resolution is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tag {
    Str,
    Int,
    Float,
    Bool,
    Null,
    /// `!` forces a plain scalar to be a string.
    NonSpecific,
    Other,
}

impl Tag {
    fn parse(token: &str) -> Tag {
        let name = token
            .strip_prefix("!<tag:yaml.org,2002:")
            .and_then(|rest| rest.strip_suffix('>'))
            .or_else(|| token.strip_prefix("!!"));
        match (token, name) {
            ("!", _) => Tag::NonSpecific,
            (_, Some("str")) => Tag::Str,
            (_, Some("int")) => Tag::Int,
            (_, Some("float")) => Tag::Float,
            (_, Some("bool")) => Tag::Bool,
            (_, Some("null")) => Tag::Null,
            _ => Tag::Other,
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Tag::Str => "!!str",
            Tag::Int => "!!int",
            Tag::Float => "!!float",
            Tag::Bool => "!!bool",
            Tag::Null => "!!null",
            Tag::NonSpecific => "!",
            Tag::Other => "tagged",
        };
        write!(f, "{}", name)
    }
}

/// Anchor and tag written in front of a node.
#[derive(Debug, Default)]
struct Properties {
    tag: Option<(Tag, usize)>,
    anchor: Option<String>,
    /// A line break follows the properties.
    crossed: bool,
}

impl Properties {
    fn is_empty(&self) -> bool {
        self.tag.is_none() && self.anchor.is_none()
    }
}

struct YamlParser<'a> {
    src: &'a str,
    pos: usize,
    depth: usize,
    anchors: HashMap<String, Node>,
    /// Nodes copied by alias expansion so far.
    expanded: usize,
}

fn is_blank(c: Option<char>) -> bool {
    matches!(c, None | Some(' ' | '\t' | '\n' | '\r'))
}

fn is_flow_indicator(c: char) -> bool {
    matches!(c, ',' | '[' | ']' | '{' | '}')
}

impl<'a> YamlParser<'a> {
    fn error(&self, message: impl Into<String>) -> SyntaxError {
        SyntaxError::new(self.pos, message)
    }

    fn char_at(&self, p: usize) -> Option<char> {
        self.src.get(p..).and_then(|s| s.chars().next())
    }

    fn peek(&self) -> Option<char> {
        self.char_at(self.pos)
    }

    fn peek_second(&self) -> Option<char> {
        let first = self.peek()?;
        self.char_at(self.pos + first.len_utf8())
    }

    fn bump(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn line_start(&self, p: usize) -> usize {
        self.src[..p]
            .rfind(['\n', '\r'])
            .map(|i| i + 1)
            .unwrap_or(0)
    }

    fn column(&self, p: usize) -> usize {
        p - self.line_start(p)
    }

    fn skip_inline_space(&mut self) {
        while let Some(' ' | '\t') = self.peek() {
            self.pos += 1;
        }
    }

    fn skip_comment(&mut self) {
        if self.peek() == Some('#') {
            while let Some(c) = self.peek() {
                if c == '\n' || c == '\r' {
                    break;
                }
                self.bump();
            }
        }
    }

    fn skip_newline(&mut self) -> bool {
        if self.src[self.pos..].starts_with("\r\n") {
            self.pos += 2;
            true
        } else if let Some('\n' | '\r') = self.peek() {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Skips spaces, comments and line breaks. Returns true if a line break
    /// was crossed.
    fn skip_to_content(&mut self) -> bool {
        let mut crossed = false;
        loop {
            self.skip_inline_space();
            self.skip_comment();
            if self.skip_newline() {
                crossed = true;
                continue;
            }
            return crossed;
        }
    }

    fn at_marker(&self, marker: &str) -> bool {
        self.column(self.pos) == 0
            && self.src[self.pos..].starts_with(marker)
            && is_blank(self.char_at(self.pos + 3))
    }

    fn at_document_marker(&self) -> bool {
        self.at_marker("---") || self.at_marker("...")
    }

    fn enter(&mut self) -> Result<(), SyntaxError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(self.error("Nesting too deep"));
        }
        Ok(())
    }

    fn document(&mut self) -> Result<Node, SyntaxError> {
        if self.src.starts_with('\u{FEFF}') {
            self.pos = '\u{FEFF}'.len_utf8();
        }
        loop {
            self.skip_to_content();
            if self.column(self.pos) == 0 && self.peek() == Some('%') {
                while let Some(c) = self.peek() {
                    if c == '\n' || c == '\r' {
                        break;
                    }
                    self.bump();
                }
                continue;
            }
            break;
        }
        if self.at_marker("---") {
            self.pos += 3;
        }
        let root = self.block_node(-1, Ctx::Document)?;
        self.skip_to_content();
        if self.at_marker("...") {
            self.pos += 3;
            self.skip_to_content();
        }
        if self.at_marker("---") {
            return Err(self.error("Multiple documents in one file are not supported"));
        }
        if !self.at_end() {
            return Err(self.error("Unexpected content, check the indentation"));
        }
        Ok(root)
    }

    fn block_node(&mut self, parent_indent: isize, ctx: Ctx) -> Result<Node, SyntaxError> {
        self.enter()?;
        let node = self.block_node_inner(parent_indent, ctx);
        self.depth -= 1;
        node
    }

    fn block_node_inner(&mut self, parent_indent: isize, ctx: Ctx) -> Result<Node, SyntaxError> {
        let empty_at = self.pos;
        let crossed = self.skip_to_content();
        let props = self.properties(false)?;
        let crossed = crossed || props.crossed;
        let node = self.block_content(parent_indent, ctx, crossed, &props, empty_at)?;
        self.finish_node(props, node)
    }

    fn block_content(
        &mut self,
        parent_indent: isize,
        ctx: Ctx,
        crossed: bool,
        props: &Properties,
        empty_at: usize,
    ) -> Result<Node, SyntaxError> {
        if self.at_end() || self.at_document_marker() {
            return Ok(Node::scalar(Scalar::Null, Span::new(empty_at, empty_at)));
        }

        let col = self.column(self.pos) as isize;
        let seq_entry = self.peek() == Some('-') && is_blank(self.peek_second());
        if crossed && col <= parent_indent {
            // A mapping value may be a block sequence at the key's own column.
            if ctx == Ctx::Value && col == parent_indent && seq_entry {
                return self.block_sequence(col as usize);
            }
            return Ok(Node::scalar(Scalar::Null, Span::new(empty_at, empty_at)));
        }
        let same_line = !crossed && ctx == Ctx::Value;

        match self.peek() {
            Some('-') if seq_entry => {
                if same_line {
                    return Err(self.error("Block sequence entries are not allowed here"));
                }
                self.block_sequence(col as usize)
            }
            Some('?') if is_blank(self.peek_second()) => {
                Err(self.error("Complex mapping keys are not supported"))
            }
            Some('*') => {
                if !props.is_empty() {
                    return Err(self.error("An alias cannot have an anchor or a tag"));
                }
                let node = self.alias(false)?;
                self.end_of_line()?;
                Ok(node)
            }
            Some('@' | '`') => Err(self.error("Reserved indicator cannot start a plain scalar")),
            Some('[' | '{') => {
                let node = self.flow_node()?;
                self.end_of_line()?;
                Ok(node)
            }
            Some('|' | '>') => self.block_scalar(parent_indent),
            _ => {
                if self.at_mapping_key()? {
                    if !props.is_empty() && !props.crossed {
                        return Err(self.error("Anchors and tags on mapping keys are not supported"));
                    }
                    if same_line {
                        return Err(
                            self.error("Nested mappings are not allowed in compact notation")
                        );
                    }
                    return self.block_mapping(col as usize);
                }
                if let Some('"' | '\'') = self.peek() {
                    let (value, span) = self.quoted()?;
                    self.end_of_line()?;
                    return Ok(Node::scalar(Scalar::String(value), span));
                }
                self.plain_scalar(parent_indent)
            }
        }
    }

    /// Reads the anchor and tag in front of a node, in either order.
    fn properties(&mut self, flow: bool) -> Result<Properties, SyntaxError> {
        let mut props = Properties::default();
        while let Some(indicator @ ('!' | '&')) = self.peek() {
            let start = self.pos;
            if self.src[start..].starts_with("!<") {
                let close = self.src[start..]
                    .find('>')
                    .ok_or_else(|| self.error("Unterminated verbatim tag"))?;
                self.pos = start + close + 1;
            } else {
                while !is_blank(self.peek())
                    && !(flow && self.peek().is_some_and(is_flow_indicator))
                {
                    self.bump();
                }
            }
            let token = &self.src[start..self.pos];
            if indicator == '&' {
                let name = &token[1..];
                if name.is_empty() {
                    return Err(SyntaxError::new(start, "Expected an anchor name"));
                }
                if props.anchor.replace(name.to_string()).is_some() {
                    return Err(SyntaxError::new(start, "A node can only have one anchor"));
                }
            } else if props.tag.replace((Tag::parse(token), start)).is_some() {
                return Err(SyntaxError::new(start, "A node can only have one tag"));
            }
            if flow {
                self.skip_flow_space();
            } else {
                props.crossed |= self.skip_to_content();
            }
        }
        Ok(props)
    }

    /// Expands `*name` into a copy of the anchored node.
    fn alias(&mut self, flow: bool) -> Result<Node, SyntaxError> {
        let start = self.pos;
        self.bump();
        while !is_blank(self.peek()) && !(flow && self.peek().is_some_and(is_flow_indicator)) {
            self.bump();
        }
        let name = &self.src[start + 1..self.pos];
        let node = self
            .anchors
            .get(name)
            .cloned()
            .ok_or_else(|| SyntaxError::new(start, format!("Unknown alias '{}'", name)))?;
        self.expanded += node_count(&node);
        if self.expanded > MAX_ALIAS_NODES {
            return Err(SyntaxError::new(start, "Too many nodes expanded from aliases"));
        }
        Ok(node)
    }

    /// Applies the tag, then records the anchor.
    fn finish_node(&mut self, props: Properties, node: Node) -> Result<Node, SyntaxError> {
        let node = match props.tag {
            Some((tag, at)) => self.apply_tag(tag, at, node)?,
            None => node,
        };
        if let Some(name) = props.anchor {
            self.anchors.insert(name, node.clone());
        }
        Ok(node)
    }

    fn apply_tag(&self, tag: Tag, at: usize, node: Node) -> Result<Node, SyntaxError> {
        if !matches!(node.kind, NodeKind::Scalar(_)) {
            return match tag {
                Tag::NonSpecific | Tag::Other => Ok(node),
                _ => Err(SyntaxError::new(at, format!("{} cannot tag a collection", tag))),
            };
        }
        let text = match &node.kind {
            NodeKind::Scalar(Scalar::String(s)) => s.clone(),
            _ => self.src[node.span.start..node.span.end].to_string(),
        };
        let resolved = match (tag, resolve_plain(&text)) {
            (Tag::Other, _) => return Ok(node),
            (Tag::Str | Tag::NonSpecific, _) => Some(Scalar::String(text.clone())),
            (Tag::Null, Scalar::Null) => Some(Scalar::Null),
            (Tag::Bool, b @ Scalar::Bool(_)) => Some(b),
            (Tag::Int, Scalar::Number(n)) if !n.is_f64() => Some(Scalar::Number(n)),
            (Tag::Float, Scalar::Number(n)) => {
                n.as_f64().and_then(Number::from_f64).map(Scalar::Number)
            }
            _ => None,
        };
        let scalar = resolved.ok_or_else(|| {
            SyntaxError::new(at, format!("'{}' is not a valid {} value", text, tag))
        })?;
        Ok(Node::scalar(scalar, node.span))
    }

    /// Only whitespace or a comment may follow a complete value on its line.
    fn end_of_line(&mut self) -> Result<(), SyntaxError> {
        let save = self.pos;
        self.skip_inline_space();
        match self.peek() {
            None | Some('\n' | '\r') => {}
            Some('#') if self.pos > save => {}
            Some(_) => return Err(self.error("Unexpected characters after value")),
        }
        self.pos = save;
        Ok(())
    }

    /// True if the scalar at the current position is a mapping key.
    fn at_mapping_key(&mut self) -> Result<bool, SyntaxError> {
        let save = self.pos;
        let is_key = match self.peek() {
            Some('"' | '\'') => {
                self.quoted()?;
                self.skip_inline_space();
                self.peek() == Some(':') && is_blank(self.peek_second())
            }
            _ => self.scan_plain_line(self.pos).1 == Stop::Colon,
        };
        self.pos = save;
        Ok(is_key)
    }

    /// Scans one line of a block plain scalar starting at `from`. Returns the
    /// end of its text (trailing spaces excluded) and what stopped the scan.
    fn scan_plain_line(&self, from: usize) -> (usize, Stop) {
        let mut text_end = from;
        let mut prev = ' ';
        for (i, c) in self.src[from..].char_indices() {
            let at = from + i;
            match c {
                '\n' | '\r' => return (text_end, Stop::Eol),
                ':' if is_blank(self.char_at(at + 1)) => return (text_end, Stop::Colon),
                '#' if prev == ' ' || prev == '\t' => return (text_end, Stop::Comment),
                ' ' | '\t' => {}
                _ => text_end = at + c.len_utf8(),
            }
            prev = c;
        }
        (text_end, Stop::Eol)
    }

    fn block_mapping(&mut self, col: usize) -> Result<Node, SyntaxError> {
        let start = self.pos;
        let mut end = start;
        let mut entries: Vec<Entry> = Vec::new();
        loop {
            let (key, key_span) = self.mapping_key()?;
            check_duplicate(&entries, &key, key_span.start)?;
            end = end.max(self.pos);
            let value = self.block_node(col as isize, Ctx::Value)?;
            end = end.max(value.span.end);
            entries.push(Entry {
                key,
                key_span,
                value,
            });

            self.skip_to_content();
            if self.at_end() || self.at_document_marker() {
                break;
            }
            let next = self.column(self.pos);
            if next < col {
                break;
            }
            if next > col {
                return Err(self.error("Bad indentation of a mapping entry"));
            }
            if self.peek() == Some('-') && is_blank(self.peek_second()) {
                return Err(self.error("Unexpected sequence entry inside a mapping"));
            }
        }
        Ok(Node {
            kind: NodeKind::Mapping(entries),
            span: Span::new(start, end),
        })
    }

    /// Parses `key:` and leaves the position right after the colon.
    fn mapping_key(&mut self) -> Result<(String, Span), SyntaxError> {
        let (key, span) = match self.peek() {
            Some('"' | '\'') => self.quoted()?,
            Some('[' | '{') => {
                return Err(self.error("Flow collections as mapping keys are not supported"))
            }
            Some('?') => return Err(self.error("Complex mapping keys are not supported")),
            _ => {
                let start = self.pos;
                let (text_end, stop) = self.scan_plain_line(start);
                if stop != Stop::Colon || text_end == start {
                    return Err(self.error("Expected a mapping key"));
                }
                self.pos = text_end;
                (self.src[start..text_end].to_string(), Span::new(start, text_end))
            }
        };
        self.skip_inline_space();
        if self.peek() != Some(':') || !is_blank(self.peek_second()) {
            return Err(self.error("Expected ':' after mapping key"));
        }
        self.pos += 1;
        Ok((key, span))
    }

    fn block_sequence(&mut self, col: usize) -> Result<Node, SyntaxError> {
        let start = self.pos;
        let mut end = start;
        let mut items = Vec::new();
        loop {
            // consume '-'
            self.pos += 1;
            end = end.max(self.pos);
            let item = self.block_node(col as isize, Ctx::Entry)?;
            end = end.max(item.span.end);
            items.push(item);

            self.skip_to_content();
            if self.at_end() || self.at_document_marker() {
                break;
            }
            let next = self.column(self.pos);
            if next > col {
                return Err(self.error("Bad indentation of a sequence entry"));
            }
            if next < col || !(self.peek() == Some('-') && is_blank(self.peek_second())) {
                break;
            }
        }
        Ok(Node {
            kind: NodeKind::Sequence(items),
            span: Span::new(start, end),
        })
    }

    fn plain_scalar(&mut self, parent_indent: isize) -> Result<Node, SyntaxError> {
        let start = self.pos;
        let (first_end, mut stop) = self.scan_plain_line(start);
        let mut value = self.src[start..first_end].to_string();
        let mut end = first_end;
        self.pos = first_end;

        while stop == Stop::Eol {
            self.skip_inline_space();
            if !self.skip_newline() {
                break;
            }
            let mut blank_lines = 0;
            loop {
                self.skip_inline_space();
                if self.skip_newline() {
                    blank_lines += 1;
                    continue;
                }
                break;
            }
            if self.at_end()
                || self.at_document_marker()
                || self.peek() == Some('#')
                || self.column(self.pos) as isize <= parent_indent
            {
                break;
            }
            let line_start = self.pos;
            let (line_end, line_stop) = self.scan_plain_line(line_start);
            if line_stop == Stop::Colon {
                return Err(self.error("Mapping values are not allowed in this context"));
            }
            if blank_lines > 0 {
                value.push_str(&"\n".repeat(blank_lines));
            } else {
                value.push(' ');
            }
            value.push_str(&self.src[line_start..line_end]);
            end = line_end;
            self.pos = line_end;
            stop = line_stop;
        }

        self.pos = end;
        Ok(Node::scalar(resolve_plain(&value), Span::new(start, end)))
    }

    fn quoted(&mut self) -> Result<(String, Span), SyntaxError> {
        let start = self.pos;
        let quote = self.peek().ok_or_else(|| self.error("Expected a quoted scalar"))?;
        self.bump();
        let mut out = String::new();
        loop {
            match self.peek() {
                None => return Err(SyntaxError::new(start, "Unterminated quoted scalar")),
                Some('\'') if quote == '\'' => {
                    if self.peek_second() == Some('\'') {
                        out.push('\'');
                        self.pos += 2;
                    } else {
                        self.pos += 1;
                        break;
                    }
                }
                Some('"') if quote == '"' => {
                    self.pos += 1;
                    break;
                }
                Some('\\') if quote == '"' => {
                    self.pos += 1;
                    self.double_escape(&mut out)?;
                }
                Some('\n' | '\r') => self.fold_line(&mut out),
                Some(c) => {
                    out.push(c);
                    self.bump();
                }
            }
        }
        Ok((out, Span::new(start, self.pos)))
    }

    /// Folds a line break inside a quoted scalar.
    fn fold_line(&mut self, out: &mut String) {
        let trimmed = out.trim_end_matches([' ', '\t']).len();
        out.truncate(trimmed);
        self.skip_newline();
        let mut blank_lines = 0;
        loop {
            self.skip_inline_space();
            if self.skip_newline() {
                blank_lines += 1;
                continue;
            }
            break;
        }
        if blank_lines > 0 {
            out.push_str(&"\n".repeat(blank_lines));
        } else {
            out.push(' ');
        }
    }

    fn double_escape(&mut self, out: &mut String) -> Result<(), SyntaxError> {
        let c = self.peek().ok_or_else(|| self.error("Unterminated escape"))?;
        if c == '\n' || c == '\r' {
            self.skip_newline();
            self.skip_inline_space();
            return Ok(());
        }
        self.bump();
        let decoded = match c {
            '0' => '\0',
            'a' => '\u{7}',
            'b' => '\u{8}',
            't' | '\t' => '\t',
            'n' => '\n',
            'v' => '\u{b}',
            'f' => '\u{c}',
            'r' => '\r',
            'e' => '\u{1b}',
            ' ' => ' ',
            '"' => '"',
            '/' => '/',
            '\\' => '\\',
            'N' => '\u{85}',
            '_' => '\u{a0}',
            'L' => '\u{2028}',
            'P' => '\u{2029}',
            'x' => self.hex_escape(2)?,
            'u' => self.hex_escape(4)?,
            'U' => self.hex_escape(8)?,
            _ => return Err(SyntaxError::new(self.pos - 1, "Invalid escape sequence")),
        };
        out.push(decoded);
        Ok(())
    }

    fn hex_escape(&mut self, len: usize) -> Result<char, SyntaxError> {
        let digits = self
            .src
            .get(self.pos..self.pos + len)
            .ok_or_else(|| self.error("Truncated escape sequence"))?;
        let code =
            u32::from_str_radix(digits, 16).map_err(|_| self.error("Invalid escape sequence"))?;
        let c = char::from_u32(code).ok_or_else(|| self.error("Invalid escape sequence"))?;
        self.pos += len;
        Ok(c)
    }

    fn block_scalar(&mut self, parent_indent: isize) -> Result<Node, SyntaxError> {
        let start = self.pos;
        let folded = self.peek() == Some('>');
        self.bump();

        let mut chomp = Chomp::Clip;
        let mut explicit: Option<usize> = None;
        while let Some(c) = self.peek() {
            match c {
                '+' => chomp = Chomp::Keep,
                '-' => chomp = Chomp::Strip,
                '1'..='9' => explicit = c.to_digit(10).map(|d| d as usize),
                _ => break,
            }
            self.bump();
        }
        let header_end = self.pos;
        self.skip_inline_space();
        if self.peek() == Some('#') && self.pos > header_end {
            self.skip_comment();
        }
        if !self.at_end() && !self.skip_newline() {
            return Err(self.error("Invalid block scalar header"));
        }

        let base = parent_indent.max(0) as usize;
        let mut indent = explicit.map(|d| base + d);
        let mut lines: Vec<&str> = Vec::new();
        let mut end = header_end;
        let mut trailing_blank = 0;

        loop {
            if self.at_end() {
                break;
            }
            let line_begin = self.pos;
            let rest = &self.src[line_begin..];
            let line_len = rest.find(['\n', '\r']).unwrap_or(rest.len());
            let line = &rest[..line_len];
            let spaces = line.len() - line.trim_start_matches(' ').len();
            let is_empty = line.trim_start_matches(' ').is_empty();

            if is_empty {
                if indent.is_some_and(|n| spaces > n) {
                    lines.push(&line[indent.unwrap_or(0)..]);
                    trailing_blank = 0;
                    end = line_begin + line_len;
                } else {
                    lines.push("");
                    trailing_blank += 1;
                }
            } else {
                let n = *indent.get_or_insert(spaces);
                if spaces < n || (spaces as isize) <= parent_indent {
                    break;
                }
                if self.column(line_begin) == 0 && self.at_marker_at(line_begin) {
                    break;
                }
                lines.push(&line[n..]);
                trailing_blank = 0;
                end = line_begin + line_len;
            }
            self.pos = line_begin + line_len;
            if !self.skip_newline() {
                break;
            }
        }

        // Trailing blank lines only matter for chomping; leave them to the caller.
        let content_lines = lines.len() - trailing_blank;
        let body = if folded {
            fold_lines(&lines[..content_lines])
        } else {
            lines[..content_lines].join("\n")
        };
        let mut value = body;
        if content_lines > 0 {
            match chomp {
                Chomp::Strip => {}
                Chomp::Clip => value.push('\n'),
                Chomp::Keep => value.push_str(&"\n".repeat(trailing_blank + 1)),
            }
        }

        self.pos = end;
        Ok(Node::scalar(Scalar::String(value), Span::new(start, end)))
    }

    fn at_marker_at(&self, p: usize) -> bool {
        let rest = &self.src[p..];
        (rest.starts_with("---") || rest.starts_with("...")) && is_blank(self.char_at(p + 3))
    }

    fn skip_flow_space(&mut self) {
        loop {
            self.skip_inline_space();
            if self.peek() == Some('#') {
                self.skip_comment();
            }
            if !self.skip_newline() {
                break;
            }
        }
    }

    fn flow_node(&mut self) -> Result<Node, SyntaxError> {
        self.enter()?;
        let node = self.flow_node_inner();
        self.depth -= 1;
        node
    }

    fn flow_node_inner(&mut self) -> Result<Node, SyntaxError> {
        let props = self.properties(true)?;
        let node = match self.peek() {
            Some('*') => {
                if !props.is_empty() {
                    return Err(self.error("An alias cannot have an anchor or a tag"));
                }
                return self.alias(true);
            }
            Some('[') => self.flow_sequence()?,
            Some('{') => self.flow_mapping()?,
            Some(',' | ']' | '}') | None if !props.is_empty() => {
                Node::scalar(Scalar::Null, Span::new(self.pos, self.pos))
            }
            _ => self.flow_scalar()?,
        };
        self.finish_node(props, node)
    }

    fn flow_sequence(&mut self) -> Result<Node, SyntaxError> {
        let start = self.pos;
        self.bump();
        let mut items = Vec::new();
        loop {
            self.skip_flow_space();
            match self.peek() {
                Some(']') => {
                    self.bump();
                    break;
                }
                None => return Err(SyntaxError::new(start, "Unterminated flow sequence")),
                _ => {}
            }
            let item = self.flow_node()?;
            self.skip_flow_space();
            if self.peek() == Some(':') {
                // single pair mapping: [a: b]
                let NodeKind::Scalar(ref key_scalar) = item.kind else {
                    return Err(self.error("Flow collections as mapping keys are not supported"));
                };
                let key = scalar_key(key_scalar, &self.src[item.span.start..item.span.end]);
                self.bump();
                self.skip_flow_space();
                let value = self.flow_value_or_empty()?;
                let span = Span::new(item.span.start, value.span.end.max(item.span.end));
                items.push(Node {
                    kind: NodeKind::Mapping(vec![Entry {
                        key,
                        key_span: item.span,
                        value,
                    }]),
                    span,
                });
                self.skip_flow_space();
            } else {
                items.push(item);
            }
            match self.peek() {
                Some(',') => self.bump(),
                Some(']') => {
                    self.bump();
                    break;
                }
                _ => return Err(self.error("Expected ',' or ']'")),
            }
        }
        Ok(Node {
            kind: NodeKind::Sequence(items),
            span: Span::new(start, self.pos),
        })
    }

    fn flow_mapping(&mut self) -> Result<Node, SyntaxError> {
        let start = self.pos;
        self.bump();
        let mut entries: Vec<Entry> = Vec::new();
        loop {
            self.skip_flow_space();
            match self.peek() {
                Some('}') => {
                    self.bump();
                    break;
                }
                Some('[' | '{') => {
                    return Err(self.error("Flow collections as mapping keys are not supported"))
                }
                Some('!' | '&' | '*') => {
                    return Err(
                        self.error("Anchors, tags and aliases on mapping keys are not supported")
                    )
                }
                None => return Err(SyntaxError::new(start, "Unterminated flow mapping")),
                _ => {}
            }
            let key_node = self.flow_scalar()?;
            let NodeKind::Scalar(ref key_scalar) = key_node.kind else {
                return Err(self.error("Expected a mapping key"));
            };
            let key = scalar_key(key_scalar, &self.src[key_node.span.start..key_node.span.end]);
            check_duplicate(&entries, &key, key_node.span.start)?;
            self.skip_flow_space();
            let value = if self.peek() == Some(':') {
                self.bump();
                self.skip_flow_space();
                self.flow_value_or_empty()?
            } else {
                Node::scalar(Scalar::Null, Span::new(key_node.span.end, key_node.span.end))
            };
            entries.push(Entry {
                key,
                key_span: key_node.span,
                value,
            });
            self.skip_flow_space();
            match self.peek() {
                Some(',') => self.bump(),
                Some('}') => {
                    self.bump();
                    break;
                }
                _ => return Err(self.error("Expected ',' or '}'")),
            }
        }
        Ok(Node {
            kind: NodeKind::Mapping(entries),
            span: Span::new(start, self.pos),
        })
    }

    fn flow_value_or_empty(&mut self) -> Result<Node, SyntaxError> {
        match self.peek() {
            Some(',' | '}' | ']') | None => {
                Ok(Node::scalar(Scalar::Null, Span::new(self.pos, self.pos)))
            }
            _ => self.flow_node(),
        }
    }

    fn flow_scalar(&mut self) -> Result<Node, SyntaxError> {
        match self.peek() {
            Some('"' | '\'') => {
                let (value, span) = self.quoted()?;
                Ok(Node::scalar(Scalar::String(value), span))
            }
            Some('[' | '{') => self.flow_node(),
            _ => {
                let start = self.pos;
                let mut text_end = start;
                let mut prev = ' ';
                while let Some(c) = self.peek() {
                    let next = self.peek_second();
                    if c == '\n' || c == '\r' || is_flow_indicator(c) {
                        break;
                    }
                    if c == ':' && (is_blank(next) || next.is_some_and(is_flow_indicator)) {
                        break;
                    }
                    if c == '#' && (prev == ' ' || prev == '\t') {
                        break;
                    }
                    self.bump();
                    if c != ' ' && c != '\t' {
                        text_end = self.pos;
                    }
                    prev = c;
                }
                if text_end == start {
                    return Err(self.error("Expected a value"));
                }
                self.pos = text_end;
                let text = &self.src[start..text_end];
                Ok(Node::scalar(resolve_plain(text), Span::new(start, text_end)))
            }
        }
    }
}

fn fold_lines(lines: &[&str]) -> String {
    let mut out = String::new();
    let mut prev: Option<&str> = None;
    for &line in lines {
        if let Some(prev) = prev {
            let indented = |l: &str| l.starts_with(' ') || l.starts_with('\t');
            if line.is_empty() {
                out.push('\n');
            } else if !prev.is_empty() {
                out.push(if indented(line) || indented(prev) { '\n' } else { ' ' });
            }
        }
        out.push_str(line);
        prev = Some(line);
    }
    out
}

fn node_count(node: &Node) -> usize {
    match &node.kind {
        NodeKind::Scalar(_) => 1,
        NodeKind::Sequence(items) => 1 + items.iter().map(node_count).sum::<usize>(),
        NodeKind::Mapping(entries) => {
            1 + entries.iter().map(|e| node_count(&e.value)).sum::<usize>()
        }
    }
}

/// Keys are strings; a plain key keeps its literal spelling (`200`, `true`).
fn scalar_key(scalar: &Scalar, source: &str) -> String {
    match scalar {
        Scalar::String(s) => s.clone(),
        _ => source.to_string(),
    }
}

fn int_pattern() -> &'static Regex {
    static INT_RE: OnceLock<Regex> = OnceLock::new();
    INT_RE.get_or_init(|| Regex::new(r"^[-+]?[0-9]+$").expect("Invalid regex"))
}

fn float_pattern() -> &'static Regex {
    static FLOAT_RE: OnceLock<Regex> = OnceLock::new();
    FLOAT_RE.get_or_init(|| {
        Regex::new(r"^[-+]?(\.[0-9]+|[0-9]+(\.[0-9]*)?)([eE][-+]?[0-9]+)?$")
            .expect("Invalid regex")
    })
}

/// Resolves a plain scalar with the YAML 1.2 core schema.
fn resolve_plain(text: &str) -> Scalar {
    match text {
        "" | "~" | "null" | "Null" | "NULL" => return Scalar::Null,
        "true" | "True" | "TRUE" => return Scalar::Bool(true),
        "false" | "False" | "FALSE" => return Scalar::Bool(false),
        _ => {}
    }
    if int_pattern().is_match(text) {
        let digits = text.strip_prefix('+').unwrap_or(text);
        if let Some(n) = parse_number(digits) {
            return Scalar::Number(n);
        }
    }
    if let Some(oct) = text.strip_prefix("0o") {
        if let Ok(n) = i64::from_str_radix(oct, 8) {
            return Scalar::Number(Number::from(n));
        }
    }
    if let Some(hex) = text.strip_prefix("0x") {
        if let Ok(n) = i64::from_str_radix(hex, 16) {
            return Scalar::Number(Number::from(n));
        }
    }
    if float_pattern().is_match(text) {
        if let Some(n) = text.parse::<f64>().ok().and_then(Number::from_f64) {
            return Scalar::Number(n);
        }
    }
    Scalar::String(text.to_string())
}

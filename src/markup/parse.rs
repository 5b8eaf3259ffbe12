//! # Markup Parser
//!
//! A small XML reader covering what receipt documents use: one root
//! element, attributes in single or double quotes, self-closing tags,
//! comments, CDATA sections, an optional `<?xml ...?>` declaration and the
//! predefined and numeric character entities.
//!
//! Element names are resolved to [`Tag`] while parsing, so a document using
//! an element outside the vocabulary is rejected before anything is printed.
//!
//! ```
//! use tillprint::markup::{parse::parse, Tag};
//!
//! let root = parse("<receipt><p>Thanks &amp; bye</p></receipt>").unwrap();
//! assert_eq!(root.tag, Tag::Receipt);
//! assert_eq!(root.children[0].text, "Thanks & bye");
//! ```

use super::{MAX_DEPTH, Node, Tag};
use crate::error::CompileError;

/// Parse a markup document into its root node.
pub fn parse(src: &str) -> Result<Node, CompileError> {
    let mut parser = Parser { src, pos: 0 };
    parser.skip_misc()?;
    if parser.rest().is_empty() {
        return Err(parser.error("document has no root element"));
    }
    let root = parser.element(1)?;
    parser.skip_misc()?;
    if !parser.rest().is_empty() {
        return Err(parser.error("unexpected content after the root element"));
    }
    Ok(root)
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn error(&self, message: impl Into<String>) -> CompileError {
        CompileError::Markup {
            offset: self.pos,
            message: message.into(),
        }
    }

    fn eat(&mut self, token: &str) -> bool {
        if self.rest().starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &str) -> Result<(), CompileError> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.error(format!("expected '{}'", token)))
        }
    }

    fn skip_ws(&mut self) {
        let trimmed = self.rest().trim_start();
        self.pos = self.src.len() - trimmed.len();
    }

    /// Skip everything up to and including `end`.
    fn skip_past(&mut self, end: &str, what: &str) -> Result<&'a str, CompileError> {
        match self.rest().find(end) {
            Some(i) => {
                let skipped = &self.rest()[..i];
                self.pos += i + end.len();
                Ok(skipped)
            }
            None => Err(self.error(format!("unterminated {}", what))),
        }
    }

    /// Whitespace, comments, declarations and processing instructions.
    fn skip_misc(&mut self) -> Result<(), CompileError> {
        loop {
            self.skip_ws();
            if self.eat("<!--") {
                self.skip_past("-->", "comment")?;
            } else if self.eat("<?") {
                self.skip_past("?>", "processing instruction")?;
            } else if self.eat("<!DOCTYPE") {
                self.skip_past(">", "doctype")?;
            } else {
                return Ok(());
            }
        }
    }

    fn name(&mut self) -> Result<&'a str, CompileError> {
        let rest = self.rest();
        let end = rest
            .find(|c: char| c.is_whitespace() || matches!(c, '/' | '>' | '='))
            .unwrap_or(rest.len());
        if end == 0 {
            return Err(self.error("expected a name"));
        }
        self.pos += end;
        Ok(&rest[..end])
    }

    /// Parse one element. `depth` counts it and its open ancestors.
    fn element(&mut self, depth: usize) -> Result<Node, CompileError> {
        if depth > MAX_DEPTH {
            return Err(self.error(format!(
                "elements are nested deeper than {} levels",
                MAX_DEPTH
            )));
        }
        let start = self.pos;
        self.expect("<")?;
        let name = self.name()?;
        let tag = Tag::from_name(name)
            .ok_or_else(|| CompileError::UnsupportedElement(name.to_string()))?;
        let mut node = Node::new(tag);

        loop {
            self.skip_ws();
            if self.eat("/>") {
                return Ok(node);
            }
            if self.eat(">") {
                break;
            }
            if self.rest().is_empty() {
                self.pos = start;
                return Err(self.error(format!("unterminated <{}> tag", name)));
            }
            let attr = self.name()?;
            self.skip_ws();
            self.expect("=")?;
            self.skip_ws();
            let value = self.quoted()?;
            if node.attr(attr).is_some() {
                return Err(self.error(format!("duplicate attribute '{}'", attr)));
            }
            node.attrs.push((attr.to_string(), value));
        }

        loop {
            if self.eat("</") {
                let close = self.name()?;
                if close != name {
                    return Err(self.error(format!(
                        "mismatched end tag: expected </{}>, found </{}>",
                        name, close
                    )));
                }
                self.skip_ws();
                self.expect(">")?;
                return Ok(node);
            } else if self.eat("<!--") {
                self.skip_past("-->", "comment")?;
            } else if self.eat("<![CDATA[") {
                let data = self.skip_past("]]>", "CDATA section")?;
                append_text(&mut node, data);
            } else if self.rest().starts_with('<') {
                let child = self.element(depth + 1)?;
                node.children.push(child);
            } else if self.rest().is_empty() {
                return Err(self.error(format!("missing </{}>", name)));
            } else {
                let end = self.rest().find('<').unwrap_or(self.rest().len());
                let raw = &self.rest()[..end];
                let text = self.decode_entities(raw)?;
                self.pos += end;
                append_text(&mut node, &text);
            }
        }
    }

    fn quoted(&mut self) -> Result<String, CompileError> {
        let quote = match self.rest().chars().next() {
            Some(q @ ('"' | '\'')) => q,
            _ => return Err(self.error("expected a quoted attribute value")),
        };
        self.pos += 1;
        let end = self
            .rest()
            .find(quote)
            .ok_or_else(|| self.error("unterminated attribute value"))?;
        let raw = &self.rest()[..end];
        if raw.contains('<') {
            return Err(self.error("'<' is not allowed in attribute values"));
        }
        let value = self.decode_entities(raw)?;
        self.pos += end + 1;
        Ok(value)
    }

    fn decode_entities(&self, raw: &str) -> Result<String, CompileError> {
        if !raw.contains('&') {
            return Ok(raw.to_string());
        }
        let mut out = String::with_capacity(raw.len());
        let mut rest = raw;
        while let Some(amp) = rest.find('&') {
            out.push_str(&rest[..amp]);
            let after = &rest[amp + 1..];
            let semi = after
                .find(';')
                .ok_or_else(|| self.error("unterminated character entity"))?;
            let entity = &after[..semi];
            let ch = match entity {
                "lt" => '<',
                "gt" => '>',
                "amp" => '&',
                "quot" => '"',
                "apos" => '\'',
                _ => {
                    let code = if let Some(hex) = entity.strip_prefix("#x") {
                        u32::from_str_radix(hex, 16).ok()
                    } else if let Some(dec) = entity.strip_prefix('#') {
                        dec.parse::<u32>().ok()
                    } else {
                        None
                    };
                    code.and_then(char::from_u32).ok_or_else(|| {
                        self.error(format!("unknown character entity '&{};'", entity))
                    })?
                }
            };
            out.push(ch);
            rest = &after[semi + 1..];
        }
        out.push_str(rest);
        Ok(out)
    }
}

/// Text goes before the first child, or after the most recent one.
fn append_text(node: &mut Node, text: &str) {
    match node.children.last_mut() {
        Some(last) => last.tail.push_str(text),
        None => node.text.push_str(text),
    }
}

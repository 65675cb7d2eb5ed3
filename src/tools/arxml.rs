//! Minimal ARXML text writer.
//!
//! Documents are built as indented text with escaped content; there is no DOM.
//! Every document gets the r4.0 namespace, a schema location and an
//! ADMIN-DATA revision block.

use chrono::{DateTime, Utc};
use std::fmt::Display;

pub const AUTOSAR_NS: &str = "http://autosar.org/schema/r4.0";
const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";
pub const SCHEMA_LOCATION: &str = "AUTOSAR_4-2-2.xsd";
const INDENT: &str = "  ";

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

pub struct ArxmlWriter {
    buf: String,
    stack: Vec<&'static str>,
}

impl ArxmlWriter {
    /// Start a document: declaration, AUTOSAR root, ADMIN-DATA, open AR-PACKAGES.
    pub fn document(revision: &str, generated_at: DateTime<Utc>) -> Self {
        let mut w = Self { buf: String::new(), stack: Vec::new() };
        w.buf.push_str("<?xml version='1.0' encoding='UTF-8'?>\n");
        w.buf.push_str(&format!(
            "<AUTOSAR xmlns=\"{AUTOSAR_NS}\" xmlns:xsi=\"{XSI_NS}\" xsi:schemaLocation=\"{AUTOSAR_NS} {SCHEMA_LOCATION}\">\n"
        ));
        w.stack.push("AUTOSAR");
        w.open("ADMIN-DATA")
            .open("DOC-REVISIONS")
            .open("DOC-REVISION")
            .leaf("REVISION-LABEL", revision)
            .leaf("DATE", generated_at.format("%Y-%m-%dT%H:%M:%S"))
            .close()
            .close()
            .close();
        w.open("AR-PACKAGES");
        w
    }

    fn pad(&mut self) {
        for _ in 0..self.stack.len() {
            self.buf.push_str(INDENT);
        }
    }

    pub fn open(&mut self, tag: &'static str) -> &mut Self {
        self.pad();
        self.buf.push_str(&format!("<{tag}>\n"));
        self.stack.push(tag);
        self
    }

    pub fn leaf(&mut self, tag: &str, text: impl Display) -> &mut Self {
        self.pad();
        let text = escape(&text.to_string());
        self.buf.push_str(&format!("<{tag}>{text}</{tag}>\n"));
        self
    }

    pub fn close(&mut self) -> &mut Self {
        if let Some(tag) = self.stack.pop() {
            self.pad();
            self.buf.push_str(&format!("</{tag}>\n"));
        }
        self
    }

    /// Insert an already rendered element, re-indented to the current depth.
    /// `source_indent` is the leading whitespace the block had in its source.
    pub fn raw(&mut self, block: &str, source_indent: &str) -> &mut Self {
        for line in block.lines() {
            let line = line.strip_prefix(source_indent).unwrap_or(line);
            self.pad();
            self.buf.push_str(line);
            self.buf.push('\n');
        }
        self
    }

    pub fn finish(mut self) -> String {
        while !self.stack.is_empty() {
            self.close();
        }
        self.buf
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    Open,
    Close,
    Empty,
}

/// One element tag. Comments, CDATA sections, processing instructions and
/// DOCTYPE declarations never produce a `Tag`.
#[derive(Debug, Clone, Copy)]
pub struct Tag<'a> {
    pub kind: TagKind,
    /// Qualified name as written, e.g. `ar:AR-PACKAGE`.
    pub qname: &'a str,
    /// Name with any namespace prefix stripped.
    pub name: &'a str,
    /// The full tag text from `<` to `>`.
    pub raw: &'a str,
    pub start: usize,
    pub end: usize,
}

/// Streaming tag scanner. Yields `Err` once on unterminated markup and stops.
pub struct Tags<'a> {
    doc: &'a str,
    pos: usize,
}

impl<'a> Tags<'a> {
    pub fn new(doc: &'a str) -> Self {
        Self { doc, pos: 0 }
    }

    fn skip_to(&mut self, from: usize, terminator: &str, what: &str) -> Result<(), String> {
        match self.doc[from..].find(terminator) {
            Some(off) => {
                self.pos = from + off + terminator.len();
                Ok(())
            }
            None => Err(format!("unterminated {what} at byte {}", self.pos)),
        }
    }

    /// End of the tag starting at `from`, ignoring `>` inside quoted attribute values.
    fn tag_end(&self, from: usize) -> Option<usize> {
        let mut quote = None;
        for (i, c) in self.doc[from..].char_indices() {
            match (quote, c) {
                (None, '"' | '\'') => quote = Some(c),
                (Some(q), c) if c == q => quote = None,
                (None, '>') => return Some(from + i + 1),
                _ => {}
            }
        }
        None
    }
}

impl<'a> Iterator for Tags<'a> {
    type Item = Result<Tag<'a>, String>;

    fn next(&mut self) -> Option<Self::Item> {
        let doc = self.doc;
        loop {
            let start = self.pos + doc.get(self.pos..)?.find('<')?;
            let rest = &doc[start..];
            self.pos = start;

            let skipped = if rest.starts_with("<!--") {
                Some(self.skip_to(start + 4, "-->", "comment"))
            } else if rest.starts_with("<![CDATA[") {
                Some(self.skip_to(start + 9, "]]>", "CDATA section"))
            } else if rest.starts_with("<?") {
                Some(self.skip_to(start + 2, "?>", "processing instruction"))
            } else if rest.starts_with("<!") {
                Some(self.skip_to(start + 2, ">", "declaration"))
            } else {
                None
            };
            match skipped {
                Some(Ok(())) => continue,
                Some(Err(e)) => {
                    self.pos = doc.len();
                    return Some(Err(e));
                }
                None => {}
            }

            let Some(end) = self.tag_end(start) else {
                self.pos = doc.len();
                return Some(Err(format!("unterminated tag at byte {start}")));
            };
            self.pos = end;

            let raw = &doc[start..end];
            let inner = &raw[1..raw.len() - 1];
            let (kind, body) = if let Some(b) = inner.strip_prefix('/') {
                (TagKind::Close, b)
            } else if let Some(b) = inner.strip_suffix('/') {
                (TagKind::Empty, b)
            } else {
                (TagKind::Open, inner)
            };
            let qname = body.split(|c: char| c.is_whitespace()).next().unwrap_or("").trim();
            if qname.is_empty() {
                self.pos = doc.len();
                return Some(Err(format!("malformed tag at byte {start}")));
            }
            let name = qname.rsplit(':').next().unwrap_or(qname);
            return Some(Ok(Tag { kind, qname, name, raw, start, end }));
        }
    }
}

/// Value of attribute `key` in a raw tag, unescaped text left as is.
pub fn attribute<'a>(raw: &'a str, key: &str) -> Option<&'a str> {
    let mut rest = raw;
    while let Some(at) = rest.find(key) {
        let before = rest[..at].chars().next_back();
        let after = rest[at + key.len()..].trim_start();
        rest = &rest[at + key.len()..];
        if !before.map_or(false, char::is_whitespace) {
            continue;
        }
        let Some(value) = after.strip_prefix('=') else { continue };
        let value = value.trim_start();
        let quote = value.chars().next()?;
        if quote != '"' && quote != '\'' {
            continue;
        }
        let body = &value[1..];
        return body.find(quote).map(|end| &body[..end]);
    }
    None
}

fn package_at(doc: &str, from: usize, to: usize) -> (&str, &str) {
    let line_start = doc[..from].rfind('\n').map(|n| n + 1).unwrap_or(0);
    let lead = &doc[line_start..from];
    let indent = if lead.trim().is_empty() { lead } else { "" };
    (&doc[from..to], indent)
}

/// Top-level `<AR-PACKAGE>` elements of a document, each with the
/// whitespace that preceded it on its line. Scanning stops at the first
/// malformed markup.
pub fn extract_packages(doc: &str) -> Vec<(&str, &str)> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;

    for tag in Tags::new(doc) {
        let Ok(tag) = tag else { break };
        if tag.name != "AR-PACKAGE" {
            continue;
        }
        match tag.kind {
            TagKind::Open => {
                if depth == 0 {
                    start = tag.start;
                }
                depth += 1;
            }
            TagKind::Empty if depth == 0 => out.push(package_at(doc, tag.start, tag.end)),
            TagKind::Empty => {}
            TagKind::Close if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    out.push(package_at(doc, start, tag.end));
                }
            }
            TagKind::Close => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap()
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(escape("a<b & 'c'"), "a&lt;b &amp; &apos;c&apos;");
    }

    #[test]
    fn document_has_header_admin_data_and_closes_everything() {
        let mut w = ArxmlWriter::document("1.0.0", at());
        w.open("AR-PACKAGE").leaf("SHORT-NAME", "Pkg");
        let doc = w.finish();
        assert!(doc.starts_with("<?xml version='1.0' encoding='UTF-8'?>\n<AUTOSAR xmlns=\"http://autosar.org/schema/r4.0\""));
        assert!(doc.contains("AUTOSAR_4-2-2.xsd"));
        assert!(doc.contains("<REVISION-LABEL>1.0.0</REVISION-LABEL>"));
        assert!(doc.contains("<DATE>2024-05-01T12:30:00</DATE>"));
        assert!(doc.contains("    <AR-PACKAGE>\n      <SHORT-NAME>Pkg</SHORT-NAME>\n    </AR-PACKAGE>\n"));
        assert!(doc.trim_end().ends_with("</AUTOSAR>"));
    }

    #[test]
    fn extracts_top_level_packages_only() {
        let doc = "<AUTOSAR>\n  <AR-PACKAGES>\n    <AR-PACKAGE>\n      <SHORT-NAME>A</SHORT-NAME>\n      <AR-PACKAGES>\n        <AR-PACKAGE UUID=\"x\"><SHORT-NAME>B</SHORT-NAME></AR-PACKAGE>\n      </AR-PACKAGES>\n    </AR-PACKAGE>\n    <AR-PACKAGE><SHORT-NAME>C</SHORT-NAME></AR-PACKAGE>\n  </AR-PACKAGES>\n</AUTOSAR>";
        let pkgs = extract_packages(doc);
        assert_eq!(pkgs.len(), 2);
        assert!(pkgs[0].0.contains("<SHORT-NAME>B</SHORT-NAME>"));
        assert_eq!(pkgs[0].1, "    ");
        assert_eq!(pkgs[1].0, "<AR-PACKAGE><SHORT-NAME>C</SHORT-NAME></AR-PACKAGE>");
    }

    #[test]
    fn no_packages_in_garbage() {
        assert!(extract_packages("not xml at all").is_empty());
        assert!(extract_packages("<AR-PACKAGE><SHORT-NAME>open").is_empty());
    }

    #[test]
    fn packages_in_comments_and_cdata_are_ignored() {
        let doc = "<AUTOSAR>\n  <AR-PACKAGES>\n    <!-- legacy <AR-PACKAGE> removed -->\n    <AR-PACKAGE>\n      <SHORT-NAME>Can</SHORT-NAME>\n      <DESC><![CDATA[</AR-PACKAGE> <AR-PACKAGE>]]></DESC>\n    </AR-PACKAGE>\n  </AR-PACKAGES>\n</AUTOSAR>";
        let pkgs = extract_packages(doc);
        assert_eq!(pkgs.len(), 1);
        assert!(pkgs[0].0.starts_with("<AR-PACKAGE>\n      <SHORT-NAME>Can</SHORT-NAME>"));
        assert!(pkgs[0].0.ends_with("</DESC>\n    </AR-PACKAGE>"));
        assert_eq!(pkgs[0].1, "    ");
    }

    #[test]
    fn prefixed_and_empty_packages_are_found() {
        let doc = "<ar:AUTOSAR><ar:AR-PACKAGES><ar:AR-PACKAGE><ar:SHORT-NAME>P</ar:SHORT-NAME></ar:AR-PACKAGE><AR-PACKAGE/></ar:AR-PACKAGES></ar:AUTOSAR>";
        let pkgs = extract_packages(doc);
        assert_eq!(pkgs.len(), 2);
        assert_eq!(pkgs[0].0, "<ar:AR-PACKAGE><ar:SHORT-NAME>P</ar:SHORT-NAME></ar:AR-PACKAGE>");
        assert_eq!(pkgs[1].0, "<AR-PACKAGE/>");
    }

    #[test]
    fn scanner_reports_unterminated_markup_once() {
        let tags: Vec<_> = Tags::new("<A><!-- never closed <B>").collect();
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0].as_ref().map(|t| t.name), Ok("A"));
        assert!(tags[1].as_ref().unwrap_err().starts_with("unterminated comment"));
    }

    #[test]
    fn scanner_skips_declarations_and_quoted_gt() {
        let doc = "<?xml version='1.0'?><!DOCTYPE x><X a=\"1>2\" b='c'/>";
        let tags: Vec<Tag> = Tags::new(doc).map(Result::unwrap).collect();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].kind, TagKind::Empty);
        assert_eq!(attribute(tags[0].raw, "a"), Some("1>2"));
        assert_eq!(attribute(tags[0].raw, "b"), Some("c"));
        assert_eq!(attribute(tags[0].raw, "missing"), None);
    }

    #[test]
    fn attribute_does_not_confuse_prefixed_names() {
        let raw = "<AUTOSAR xmlns:xsi=\"http://x\" xmlns=\"http://autosar.org/schema/r4.0\">";
        assert_eq!(attribute(raw, "xmlns"), Some(AUTOSAR_NS));
    }

    #[test]
    fn raw_reindents_block() {
        let mut w = ArxmlWriter::document("1.0.0", at());
        w.raw("<AR-PACKAGE>\n      <SHORT-NAME>X</SHORT-NAME>\n    </AR-PACKAGE>", "    ");
        let doc = w.finish();
        assert!(doc.contains("\n    <AR-PACKAGE>\n      <SHORT-NAME>X</SHORT-NAME>\n    </AR-PACKAGE>\n"));
    }
}

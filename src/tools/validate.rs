//! Structural lint for ARXML documents.
//!
//! Checks well-formedness, the AUTOSAR root, the presence of AR-PACKAGES, the
//! r4.0 namespace and SHORT-NAME uniqueness. It does not load an XSD.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::core::tool::{require, Tool, ToolError, ToolSpec};
use crate::tools::arxml::{attribute, Tag, TagKind, Tags, AUTOSAR_NS};

pub const AUTOSAR_VERSIONS: &[&str] = &["4.0.3", "4.2.2", "4.3.1", "4.4.0"];
const MINIMAL_DOCUMENT_LEN: usize = 500;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub recommendations: Vec<String>,
    /// Elements below the root.
    pub element_count: usize,
}

struct Outline<'a> {
    root: Tag<'a>,
    element_count: usize,
    has_packages: bool,
    short_names: Vec<&'a str>,
}

/// Walk every tag, requiring balanced elements under a single root.
fn outline(doc: &str) -> Result<Outline<'_>, String> {
    let mut stack: Vec<&str> = Vec::new();
    let mut root: Option<Tag> = None;
    let mut element_count = 0;
    let mut has_packages = false;
    let mut short_names = Vec::new();

    for tag in Tags::new(doc) {
        let tag = tag?;
        match tag.kind {
            TagKind::Open | TagKind::Empty => {
                if stack.is_empty() {
                    if root.is_some() {
                        return Err(format!("extra content after the root element at byte {}", tag.start));
                    }
                    root = Some(tag);
                } else {
                    element_count += 1;
                }
                has_packages |= tag.name == "AR-PACKAGES";
                if tag.kind == TagKind::Open {
                    if tag.name == "SHORT-NAME" {
                        let text = &doc[tag.end..];
                        let text = text[..text.find('<').unwrap_or(text.len())].trim();
                        short_names.push(text);
                    }
                    stack.push(tag.qname);
                }
            }
            TagKind::Close => match stack.pop() {
                Some(open) if open == tag.qname => {}
                Some(open) => {
                    return Err(format!(
                        "mismatched closing tag </{}> for <{open}> at byte {}",
                        tag.qname, tag.start
                    ))
                }
                None => return Err(format!("unexpected closing tag </{}> at byte {}", tag.qname, tag.start)),
            },
        }
    }

    if let Some(open) = stack.last() {
        return Err(format!("unclosed element <{open}>"));
    }
    let root = root.ok_or_else(|| "document has no root element".to_string())?;
    Ok(Outline { root, element_count, has_packages, short_names })
}

pub fn validate_arxml(doc: &str, autosar_version: &str) -> ValidationReport {
    tracing::info!(version = autosar_version, bytes = doc.len(), "validating ARXML");

    let outline = match outline(doc) {
        Ok(o) => o,
        Err(e) => {
            return ValidationReport { errors: vec![format!("XML syntax error: {e}")], ..Default::default() };
        }
    };

    let mut report = ValidationReport { element_count: outline.element_count, ..Default::default() };
    if outline.root.name != "AUTOSAR" {
        report.errors.push("Root element must be <AUTOSAR>".into());
    }
    if !outline.has_packages {
        report.warnings.push("No AR-PACKAGES found in configuration".into());
    }
    if attribute(outline.root.raw, "xmlns") != Some(AUTOSAR_NS) {
        report.warnings.push("Standard AUTOSAR namespace not declared".into());
    }

    let mut seen: BTreeMap<&str, usize> = BTreeMap::new();
    for name in outline.short_names.iter().copied() {
        *seen.entry(name).or_default() += 1;
    }
    let duplicates: Vec<&str> = seen.into_iter().filter(|(_, n)| *n > 1).map(|(k, _)| k).collect();
    if !duplicates.is_empty() {
        report.warnings.push(format!("Duplicate SHORT-NAMEs found: {}", duplicates.join(", ")));
    }

    if doc.len() < MINIMAL_DOCUMENT_LEN {
        report.recommendations.push("Configuration seems minimal; consider adding more modules".into());
    }
    report.recommendations.push("Consider adding ADMIN-DATA section with revision history".into());
    report.recommendations.push("Verify parameter values against ECU hardware specifications".into());

    report.valid = report.errors.is_empty();
    report
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValidateParams {
    arxml_content: String,
    #[serde(default = "default_version")]
    autosar_version: String,
}

fn default_version() -> String {
    "4.2.2".into()
}

#[derive(Clone, Default)]
pub struct ValidateConfigTool;

impl ToolSpec for ValidateConfigTool {
    fn name(&self) -> &'static str {
        "validateConfig"
    }
    fn description(&self) -> &'static str {
        "Lint an ARXML document: well-formedness, AUTOSAR root and namespace, AR-PACKAGES \
         presence and duplicate SHORT-NAMEs. Returns errors, warnings and recommendations."
    }
    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "arxmlContent": { "type": "string", "description": "ARXML content to validate" },
                "autosarVersion": {
                    "type": "string",
                    "description": "AUTOSAR version to validate against",
                    "enum": AUTOSAR_VERSIONS
                }
            },
            "required": ["arxmlContent"]
        })
    }
}

#[async_trait]
impl Tool for ValidateConfigTool {
    async fn call(&self, arguments: &serde_json::Value) -> Result<serde_json::Value, ToolError> {
        require(arguments, "arxmlContent")?;
        let p: ValidateParams = serde_json::from_value(arguments.clone())
            .map_err(|e| ToolError::InvalidParams(format!("Invalid parameters: {e}")))?;
        if !AUTOSAR_VERSIONS.contains(&p.autosar_version.as_str()) {
            return Err(ToolError::InvalidParams(format!(
                "autosarVersion must be one of {}",
                AUTOSAR_VERSIONS.join(", ")
            )));
        }
        let report = validate_arxml(&p.arxml_content, &p.autosar_version);
        Ok(json!({ "success": true, "validation": report }))
    }
}

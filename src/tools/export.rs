use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

use crate::core::tool::{require, Tool, ToolError, ToolSpec};
use crate::tools::arxml::{extract_packages, ArxmlWriter};

#[derive(Debug, Clone, Deserialize)]
pub struct ModuleArtifact {
    #[serde(rename = "type", default = "unknown_module")]
    pub kind: String,
    #[serde(default)]
    pub arxml: String,
}

fn unknown_module() -> String {
    "Unknown".into()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportParams {
    pub modules: Vec<ModuleArtifact>,
    #[serde(default = "default_project")]
    pub project_name: String,
    #[serde(default = "default_ecu")]
    pub ecu_name: String,
}

fn default_project() -> String {
    "AutosarProject".into()
}

fn default_ecu() -> String {
    "ECU".into()
}

/// Merge module documents into one, nesting each module's packages under the
/// project package next to an ECU-INSTANCE. Returns the document and the
/// number of modules that contributed packages.
pub fn merge_modules(p: &ExportParams, generated_at: DateTime<Utc>) -> (String, usize) {
    tracing::info!(modules = p.modules.len(), project = %p.project_name, "merging modules");

    let mut w = ArxmlWriter::document("1.0.0", generated_at);
    w.open("AR-PACKAGE")
        .leaf("SHORT-NAME", &p.project_name)
        .open("ELEMENTS")
        .open("ECU-INSTANCE")
        .leaf("SHORT-NAME", &p.ecu_name)
        .close()
        .close()
        .open("AR-PACKAGES");

    let mut merged = 0;
    for module in &p.modules {
        if module.arxml.trim().is_empty() {
            continue;
        }
        let packages = extract_packages(&module.arxml);
        if packages.is_empty() {
            tracing::warn!(module = %module.kind, "failed to merge module: no AR-PACKAGE found");
            continue;
        }
        for (block, indent) in packages {
            w.raw(block, indent);
        }
        merged += 1;
    }

    (w.finish(), merged)
}

#[derive(Clone, Default)]
pub struct ExportArxmlTool;

impl ToolSpec for ExportArxmlTool {
    fn name(&self) -> &'static str {
        "exportArxml"
    }
    fn description(&self) -> &'static str {
        "Merge generated module configurations (CAN, NvM, ...) into a single ARXML document \
         with project and ECU metadata."
    }
    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "modules": {
                    "type": "array",
                    "description": "Module configurations to merge: {type, arxml}",
                    "items": { "type": "object" }
                },
                "projectName": { "type": "string" },
                "ecuName": { "type": "string" }
            },
            "required": ["modules", "projectName"]
        })
    }
}

#[async_trait]
impl Tool for ExportArxmlTool {
    async fn call(&self, arguments: &serde_json::Value) -> Result<serde_json::Value, ToolError> {
        require(arguments, "modules")?;
        let p: ExportParams = serde_json::from_value(arguments.clone())
            .map_err(|e| ToolError::InvalidParams(format!("Invalid parameters: {e}")))?;
        let (arxml, merged) = merge_modules(&p, Utc::now());
        Ok(json!({
            "success": true,
            "module": "Export",
            "arxml": arxml,
            "projectName": p.project_name,
            "ecuName": p.ecu_name,
            "moduleCount": p.modules.len(),
            "mergedCount": merged,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::can::{render_can, CanParams};
    use crate::tools::nvm::{render_nvm, NvmParams};
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn can_doc() -> String {
        render_can(
            &CanParams {
                ecu_type: "chassis".into(),
                baudrate: 500,
                message_objects: 1,
                error_handling: true,
                wakeup_support: false,
            },
            at(),
        )
    }

    fn nvm_doc() -> String {
        render_nvm(
            &NvmParams {
                block_count: 1,
                block_size: 16,
                write_strategy: "immediate".into(),
                crc_protection: true,
                redundancy: false,
                wear_leveling: true,
            },
            at(),
        )
    }

    #[test]
    fn merges_module_packages_under_project() {
        let p = ExportParams {
            modules: vec![
                ModuleArtifact { kind: "CAN".into(), arxml: can_doc() },
                ModuleArtifact { kind: "NvM".into(), arxml: nvm_doc() },
                ModuleArtifact { kind: "Empty".into(), arxml: String::new() },
                ModuleArtifact { kind: "Broken".into(), arxml: "<nope".into() },
            ],
            project_name: "Demo".into(),
            ecu_name: "ChassisECU".into(),
        };
        let (doc, merged) = merge_modules(&p, at());
        assert_eq!(merged, 2);
        assert!(doc.contains("<SHORT-NAME>Demo</SHORT-NAME>"));
        assert!(doc.contains("<ECU-INSTANCE>"));
        assert!(doc.contains("<SHORT-NAME>CanConfiguration</SHORT-NAME>"));
        assert!(doc.contains("<SHORT-NAME>NvMConfiguration</SHORT-NAME>"));
        assert_eq!(doc.matches("<ADMIN-DATA>").count(), 1);
        // merged output is itself mergeable
        assert_eq!(extract_packages(&doc).len(), 1);
    }

    #[test]
    fn commented_out_package_does_not_drop_module() {
        let can = can_doc().replacen(
            "<AR-PACKAGES>",
            "<AR-PACKAGES>\n    <!-- legacy <AR-PACKAGE> removed -->",
            1,
        );
        let p = ExportParams {
            modules: vec![ModuleArtifact { kind: "CAN".into(), arxml: can }],
            project_name: "Demo".into(),
            ecu_name: "ECU".into(),
        };
        let (doc, merged) = merge_modules(&p, at());
        assert_eq!(merged, 1);
        assert!(doc.contains("<SHORT-NAME>CanConfiguration</SHORT-NAME>"));
        assert!(!doc.contains("legacy"));
    }

    #[tokio::test]
    async fn call_uses_defaults_and_counts_modules() {
        let out = ExportArxmlTool
            .call(&json!({"modules": [{"type": "CAN", "arxml": can_doc()}]}))
            .await
            .unwrap();
        assert_eq!(out["projectName"], "AutosarProject");
        assert_eq!(out["ecuName"], "ECU");
        assert_eq!(out["moduleCount"], 1);
        assert_eq!(out["mergedCount"], 1);
    }

    #[tokio::test]
    async fn call_requires_modules() {
        let err = ExportArxmlTool.call(&json!({"projectName": "X"})).await.unwrap_err();
        assert_eq!(err.to_string(), "Missing required field: modules");
    }
}

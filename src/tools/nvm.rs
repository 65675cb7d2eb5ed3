use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::core::tool::{require, Tool, ToolError, ToolSpec};
use crate::tools::arxml::ArxmlWriter;

pub const MAX_BLOCK_COUNT: u32 = 256;
pub const MAX_BLOCK_SIZE: u32 = 65535;

fn enabled() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NvmParams {
    pub block_count: u32,
    pub block_size: u32,
    pub write_strategy: String,
    #[serde(default = "enabled")]
    pub crc_protection: bool,
    #[serde(default)]
    pub redundancy: bool,
    #[serde(default = "enabled")]
    pub wear_leveling: bool,
}

/// Unrecognized strategies are written as cyclic.
pub fn write_strategy_code(strategy: &str) -> &'static str {
    match strategy {
        "immediate" => "NVM_WRITE_BLOCK_ONCE",
        "triggered" => "NVM_WRITE_BLOCK_TRIGGERED",
        _ => "NVM_WRITE_BLOCK_CYCLIC",
    }
}

pub fn render_nvm(p: &NvmParams, generated_at: DateTime<Utc>) -> String {
    tracing::info!(blocks = p.block_count, block_size = p.block_size, "rendering NvM configuration");
    let strategy = write_strategy_code(&p.write_strategy);

    let mut w = ArxmlWriter::document("1.0.0", generated_at);
    w.open("AR-PACKAGE")
        .leaf("SHORT-NAME", "NvMConfiguration")
        .open("ELEMENTS")
        .open("NVM-BLOCK-DESCRIPTOR")
        .leaf("SHORT-NAME", "NvMBlockConfiguration")
        .open("NVM-BLOCKS");

    for i in 0..p.block_count {
        w.open("NVM-BLOCK")
            .leaf("SHORT-NAME", format!("NvMBlock_{i}"))
            .leaf("NVM-BLOCK-ID", i + 1)
            .leaf("NVM-BLOCK-LENGTH", p.block_size)
            .leaf("NVM-WRITE-STRATEGY", strategy);
        if p.crc_protection {
            w.open("NVM-BLOCK-CRC-TYPE").leaf("CRC-TYPE", "NVM_CRC_16").close();
        }
        if p.redundancy {
            w.open("NVM-REDUNDANCY").leaf("REDUNDANT-BLOCK-COUNT", 1).close();
        }
        let address = u64::from(i) * u64::from(p.block_size);
        w.open("NVM-BLOCK-STORAGE")
            .leaf("STORAGE-DEVICE", "EEPROM")
            .leaf("STORAGE-ADDRESS", format!("{address:#x}"))
            .close();
        w.close();
    }
    w.close();

    if p.wear_leveling {
        w.open("NVM-WEAR-LEVELING")
            .leaf("WEAR-LEVELING-ENABLED", "true")
            .leaf("WEAR-LEVELING-THRESHOLD", 1000)
            .close();
    }

    w.finish()
}

#[derive(Clone, Default)]
pub struct NvmConfigTool;

impl NvmConfigTool {
    fn parse(args: &serde_json::Value) -> Result<NvmParams, ToolError> {
        for field in ["blockCount", "blockSize", "writeStrategy"] {
            require(args, field)?;
        }
        let p: NvmParams = serde_json::from_value(args.clone())
            .map_err(|e| ToolError::InvalidParams(format!("Invalid parameters: {e}")))?;
        if !(1..=MAX_BLOCK_COUNT).contains(&p.block_count) {
            return Err(ToolError::InvalidParams(format!(
                "blockCount must be between 1 and {MAX_BLOCK_COUNT}"
            )));
        }
        if !(1..=MAX_BLOCK_SIZE).contains(&p.block_size) {
            return Err(ToolError::InvalidParams(format!(
                "blockSize must be between 1 and {MAX_BLOCK_SIZE}"
            )));
        }
        Ok(p)
    }
}

impl ToolSpec for NvmConfigTool {
    fn name(&self) -> &'static str {
        "generateNvmConfig"
    }
    fn description(&self) -> &'static str {
        "Generate AUTOSAR NvM (non-volatile memory) block configuration: block size and count, \
         write strategy, CRC protection, redundancy and wear-leveling."
    }
    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "blockCount": {
                    "type": "integer",
                    "description": "Number of NvM blocks",
                    "minimum": 1,
                    "maximum": MAX_BLOCK_COUNT
                },
                "blockSize": {
                    "type": "integer",
                    "description": "Size per block in bytes",
                    "minimum": 1,
                    "maximum": MAX_BLOCK_SIZE
                },
                "writeStrategy": {
                    "type": "string",
                    "enum": ["immediate", "deferred", "triggered"]
                },
                "crcProtection": { "type": "boolean" },
                "redundancy": { "type": "boolean" },
                "wearLeveling": { "type": "boolean" }
            },
            "required": ["blockCount", "blockSize", "writeStrategy"]
        })
    }
}

#[async_trait]
impl Tool for NvmConfigTool {
    async fn call(&self, arguments: &serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let p = Self::parse(arguments)?;
        let arxml = render_nvm(&p, Utc::now());
        Ok(json!({
            "success": true,
            "module": "NvM",
            "arxml": arxml,
            "parameters": p,
        }))
    }
}

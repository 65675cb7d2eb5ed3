use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::core::tool::{require, Tool, ToolError, ToolSpec};
use crate::tools::arxml::ArxmlWriter;

pub const MAX_MESSAGE_OBJECTS: u32 = 128;

fn enabled() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanParams {
    pub ecu_type: String,
    pub baudrate: u32,
    pub message_objects: u32,
    #[serde(default = "enabled")]
    pub error_handling: bool,
    #[serde(default)]
    pub wakeup_support: bool,
}

/// Bit timing for an 80 MHz peripheral clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanTiming {
    pub prop_seg: u8,
    pub phase_seg1: u8,
    pub phase_seg2: u8,
    pub sjw: u8,
}

/// Unknown rates fall back to the 500 kbps row.
pub fn can_timing(baudrate_kbps: u32) -> CanTiming {
    match baudrate_kbps {
        1000 => CanTiming { prop_seg: 5, phase_seg1: 6, phase_seg2: 2, sjw: 1 },
        _ => CanTiming { prop_seg: 6, phase_seg1: 7, phase_seg2: 2, sjw: 1 },
    }
}

pub fn render_can(p: &CanParams, generated_at: DateTime<Utc>) -> String {
    tracing::info!(ecu = %p.ecu_type, baudrate = p.baudrate, "rendering CAN configuration");
    let timing = can_timing(p.baudrate);

    let mut w = ArxmlWriter::document("1.0.0", generated_at);
    w.open("AR-PACKAGE")
        .leaf("SHORT-NAME", "CanConfiguration")
        .open("ELEMENTS")
        .open("CAN-CONTROLLER")
        .leaf("SHORT-NAME", format!("CanController_{}", p.ecu_type))
        .open("CAN-CONTROLLER-BAUDRATE-CONFIG")
        .leaf("BAUDRATE", u64::from(p.baudrate) * 1000)
        .leaf("PROP-SEG", timing.prop_seg)
        .leaf("PHASE-SEG1", timing.phase_seg1)
        .leaf("PHASE-SEG2", timing.phase_seg2)
        .leaf("SYNC-JUMP-WIDTH", timing.sjw)
        .close();

    for i in 0..p.message_objects {
        w.open("CAN-HW-OBJECT")
            .leaf("SHORT-NAME", format!("CanHwObject_{i}"))
            .leaf("OBJECT-TYPE", if i % 2 == 0 { "TRANSMIT" } else { "RECEIVE" })
            .leaf("ID-TYPE", "STANDARD")
            .leaf("CAN-OBJECT-ID", 0x100 + i)
            .close();
    }

    if p.error_handling {
        w.open("CAN-ERROR-HANDLING")
            .leaf("BUS-OFF-RECOVERY", "AUTOMATIC")
            .leaf("ERROR-PASSIVE-MODE", "ENABLED")
            .leaf("ERROR-WARNING-THRESHOLD", 96)
            .close();
    }

    if p.wakeup_support {
        w.open("CAN-WAKEUP-SUPPORT")
            .leaf("WAKEUP-ENABLED", "true")
            .leaf("WAKEUP-FILTER-ENABLED", "true")
            .close();
    }

    w.finish()
}

#[derive(Clone, Default)]
pub struct CanConfigTool;

impl CanConfigTool {
    fn parse(args: &serde_json::Value) -> Result<CanParams, ToolError> {
        for field in ["ecuType", "baudrate", "messageObjects"] {
            require(args, field)?;
        }
        let p: CanParams = serde_json::from_value(args.clone())
            .map_err(|e| ToolError::InvalidParams(format!("Invalid parameters: {e}")))?;
        if p.baudrate == 0 {
            return Err(ToolError::InvalidParams("baudrate must be positive".into()));
        }
        if !(1..=MAX_MESSAGE_OBJECTS).contains(&p.message_objects) {
            return Err(ToolError::InvalidParams(format!(
                "messageObjects must be between 1 and {MAX_MESSAGE_OBJECTS}"
            )));
        }
        Ok(p)
    }
}

impl ToolSpec for CanConfigTool {
    fn name(&self) -> &'static str {
        "generateCanConfig"
    }
    fn description(&self) -> &'static str {
        "Generate AUTOSAR CAN controller configuration: baudrate and bit timing, \
         message objects, error handling and wakeup support for powertrain, body or chassis ECUs."
    }
    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "ecuType": {
                    "type": "string",
                    "description": "ECU type",
                    "enum": ["powertrain", "body", "chassis", "telematics", "gateway"]
                },
                "baudrate": {
                    "type": "integer",
                    "description": "CAN baudrate in kbps",
                    "enum": [125, 250, 500, 1000]
                },
                "messageObjects": {
                    "type": "integer",
                    "description": "Number of CAN message objects",
                    "minimum": 1,
                    "maximum": MAX_MESSAGE_OBJECTS
                },
                "errorHandling": { "type": "boolean", "description": "Enable extended error handling" },
                "wakeupSupport": { "type": "boolean", "description": "Enable CAN bus wakeup" }
            },
            "required": ["ecuType", "baudrate", "messageObjects"]
        })
    }
}

#[async_trait]
impl Tool for CanConfigTool {
    async fn call(&self, arguments: &serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let p = Self::parse(arguments)?;
        let arxml = render_can(&p, Utc::now());
        Ok(json!({
            "success": true,
            "module": "CAN",
            "arxml": arxml,
            "parameters": p,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn params() -> CanParams {
        CanParams {
            ecu_type: "body".into(),
            baudrate: 250,
            message_objects: 3,
            error_handling: false,
            wakeup_support: true,
        }
    }

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()
    }

    #[test]
    fn timing_table() {
        assert_eq!(can_timing(1000).prop_seg, 5);
        assert_eq!(can_timing(125), can_timing(500));
        assert_eq!(can_timing(42), can_timing(500));
    }

    #[test]
    fn renders_controller_objects_and_optional_blocks() {
        let doc = render_can(&params(), at());
        assert!(doc.contains("<SHORT-NAME>CanConfiguration</SHORT-NAME>"));
        assert!(doc.contains("<SHORT-NAME>CanController_body</SHORT-NAME>"));
        assert!(doc.contains("<BAUDRATE>250000</BAUDRATE>"));
        assert!(doc.contains("<PROP-SEG>6</PROP-SEG>"));
        assert_eq!(doc.matches("<CAN-HW-OBJECT>").count(), 3);
        assert!(doc.contains("<CAN-OBJECT-ID>256</CAN-OBJECT-ID>"));
        assert!(doc.contains("<CAN-OBJECT-ID>258</CAN-OBJECT-ID>"));
        assert_eq!(doc.matches("<OBJECT-TYPE>TRANSMIT</OBJECT-TYPE>").count(), 2);
        assert!(!doc.contains("CAN-ERROR-HANDLING"));
        assert!(doc.contains("<WAKEUP-ENABLED>true</WAKEUP-ENABLED>"));
    }

    #[test]
    fn escapes_ecu_type() {
        let mut p = params();
        p.ecu_type = "a<b".into();
        assert!(render_can(&p, at()).contains("CanController_a&lt;b"));
    }

    #[tokio::test]
    async fn call_applies_defaults_and_echoes_parameters() {
        let out = CanConfigTool
            .call(&json!({"ecuType": "powertrain", "baudrate": 500, "messageObjects": 8}))
            .await
            .unwrap();
        assert_eq!(out["success"], true);
        assert_eq!(out["module"], "CAN");
        assert_eq!(out["parameters"]["errorHandling"], true);
        assert_eq!(out["parameters"]["wakeupSupport"], false);
        assert!(out["arxml"].as_str().unwrap().contains("BUS-OFF-RECOVERY"));
    }

    #[tokio::test]
    async fn call_reports_first_missing_field() {
        let err = CanConfigTool.call(&json!({"ecuType": "body"})).await.unwrap_err();
        assert_eq!(err.to_string(), "Missing required field: baudrate");
    }

    #[tokio::test]
    async fn call_rejects_bad_types_and_ranges() {
        let err = CanConfigTool
            .call(&json!({"ecuType": "body", "baudrate": "fast", "messageObjects": 8}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidParams(_)));
        let err = CanConfigTool
            .call(&json!({"ecuType": "body", "baudrate": 500, "messageObjects": 500}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("between 1 and 128"));
        let err = CanConfigTool
            .call(&json!({"ecuType": "body", "baudrate": 500, "messageObjects": i64::MAX}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidParams(_)));
    }
}

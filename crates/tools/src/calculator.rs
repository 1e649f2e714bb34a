//! Calculator tool. Two operands, one operation, JSON in and out.
//!
//! Arithmetic failures are reported inside the result payload rather than
//! as errors so the model can read them and recover in conversation.

use async_trait::async_trait;
use chatloom_core::error::ToolError;
use chatloom_core::tool::{Tool, ToolResult};

pub struct CalculatorTool;

#[async_trait]
impl Tool for CalculatorTool {
    fn name(&self) -> &str {
        "calculator"
    }

    fn description(&self) -> &str {
        "Perform basic arithmetic on two numbers. Supported operations: add, sub, mul, div."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "a": {
                    "type": "number",
                    "description": "First operand"
                },
                "b": {
                    "type": "number",
                    "description": "Second operand"
                },
                "operation": {
                    "type": "string",
                    "enum": ["add", "sub", "mul", "div"],
                    "description": "The arithmetic operation to perform"
                }
            },
            "required": ["a", "b", "operation"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let a = arguments["a"]
            .as_f64()
            .ok_or_else(|| ToolError::InvalidArguments("Missing numeric 'a' argument".into()))?;
        let b = arguments["b"]
            .as_f64()
            .ok_or_else(|| ToolError::InvalidArguments("Missing numeric 'b' argument".into()))?;
        let operation = arguments["operation"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'operation' argument".into()))?;

        let payload = match operation {
            "add" => serde_json::json!({"result": number(a + b)}),
            "sub" => serde_json::json!({"result": number(a - b)}),
            "mul" => serde_json::json!({"result": number(a * b)}),
            "div" => {
                if b == 0.0 {
                    serde_json::json!({"result": "error: divide by zero"})
                } else {
                    serde_json::json!({"result": number(a / b)})
                }
            }
            _ => serde_json::json!({"result": "Invalid operation"}),
        };

        Ok(ToolResult {
            call_id: String::new(),
            success: true,
            output: payload.to_string(),
            data: Some(payload),
        })
    }
}

/// Whole numbers render without a trailing `.0` in the JSON payload.
fn number(value: f64) -> serde_json::Value {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        serde_json::json!(value as i64)
    } else {
        serde_json::json!(value)
    }
}

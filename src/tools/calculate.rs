//! Tools: calculate, add, subtract, multiply, divide

use crate::error::{HandlerResult, ToolError};
use crate::protocol::{CallToolResult, Tool};
use crate::registry::ToolHandler;
use crate::tools::parse_args;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::instrument;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl Operation {
    pub const ALL: [Operation; 4] = [Self::Add, Self::Subtract, Self::Multiply, Self::Divide];

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "add" => Some(Self::Add),
            "subtract" => Some(Self::Subtract),
            "multiply" => Some(Self::Multiply),
            "divide" => Some(Self::Divide),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Subtract => "subtract",
            Self::Multiply => "multiply",
            Self::Divide => "divide",
        }
    }

    pub fn apply(self, a: f64, b: f64) -> HandlerResult<f64> {
        match self {
            Self::Add => Ok(a + b),
            Self::Subtract => Ok(a - b),
            Self::Multiply => Ok(a * b),
            Self::Divide if b == 0.0 => Err(ToolError::DivisionByZero),
            Self::Divide => Ok(a / b),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CalculateArgs {
    pub operation: String,
    pub a: f64,
    pub b: f64,
}

#[derive(Debug, Deserialize)]
pub struct OperandArgs {
    pub a: f64,
    pub b: f64,
}

fn result_text(value: f64) -> String {
    format!("Result: {}", value)
}

/// Four-function calculator selected by an `operation` argument.
pub struct CalculateTool;

impl CalculateTool {
    pub fn definition() -> Tool {
        crate::define_tool! {
            name: "calculate",
            description: "Perform a basic arithmetic operation (add, subtract, multiply, divide)",
            schema: {
                "type": "object",
                "properties": {
                    "operation": {
                        "type": "string",
                        "enum": ["add", "subtract", "multiply", "divide"],
                        "description": "Operation to perform"
                    },
                    "a": { "type": "number", "description": "First operand" },
                    "b": { "type": "number", "description": "Second operand" }
                },
                "required": ["operation", "a", "b"]
            }
        }
    }
}

#[async_trait]
impl ToolHandler for CalculateTool {
    #[instrument(skip(self, arguments))]
    async fn call(&self, arguments: Value) -> HandlerResult<CallToolResult> {
        let args: CalculateArgs = parse_args(arguments)?;
        let op = Operation::parse(&args.operation)
            .ok_or_else(|| ToolError::UnknownOperation(args.operation.clone()))?;

        Ok(CallToolResult::text(result_text(op.apply(args.a, args.b)?)))
    }
}

/// A single arithmetic operation exposed as its own tool.
pub struct ArithmeticTool {
    op: Operation,
}

impl ArithmeticTool {
    pub fn new(op: Operation) -> Self {
        Self { op }
    }

    pub fn definition(op: Operation) -> Tool {
        crate::define_tool! {
            name: op.name(),
            description: format!("Compute a {} b", match op {
                Operation::Add => "+",
                Operation::Subtract => "-",
                Operation::Multiply => "*",
                Operation::Divide => "/",
            }),
            schema: {
                "type": "object",
                "properties": {
                    "a": { "type": "number", "description": "First operand" },
                    "b": { "type": "number", "description": "Second operand" }
                },
                "required": ["a", "b"]
            }
        }
    }
}

#[async_trait]
impl ToolHandler for ArithmeticTool {
    async fn call(&self, arguments: Value) -> HandlerResult<CallToolResult> {
        let args: OperandArgs = parse_args(arguments)?;
        Ok(CallToolResult::text(result_text(self.op.apply(args.a, args.b)?)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_calculate_multiply() {
        let result = CalculateTool
            .call(json!({"operation": "multiply", "a": 42, "b": 100}))
            .await
            .unwrap();
        assert_eq!(result.first_text(), Some("Result: 4200"));
    }

    #[tokio::test]
    async fn test_calculate_fractional_division() {
        let result = CalculateTool
            .call(json!({"operation": "divide", "a": 5, "b": 2}))
            .await
            .unwrap();
        assert_eq!(result.first_text(), Some("Result: 2.5"));
    }

    #[tokio::test]
    async fn test_divide_by_zero_is_handler_failure() {
        let err = ArithmeticTool::new(Operation::Divide)
            .call(json!({"a": 5, "b": 0}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::DivisionByZero));
        assert!(err.to_string().contains("divide by zero"));
    }

    #[tokio::test]
    async fn test_unknown_operation() {
        let err = CalculateTool
            .call(json!({"operation": "modulo", "a": 1, "b": 2}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::UnknownOperation(ref op) if op == "modulo"));
    }

    #[test]
    fn test_definitions_are_named_after_operations() {
        let names: Vec<_> = Operation::ALL
            .iter()
            .map(|op| ArithmeticTool::definition(*op).name)
            .collect();
        assert_eq!(names, vec!["add", "subtract", "multiply", "divide"]);
    }
}

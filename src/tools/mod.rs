//! MCP tool definitions.

pub mod calculate;
pub mod files;
pub mod weather;

pub use calculate::{ArithmeticTool, CalculateTool, Operation};
pub use files::{ListFilesTool, ReadFileTool};
pub use weather::GetWeatherTool;

use crate::error::{RegistryResult, ToolError};
use crate::registry::RegistryBuilder;
use serde::de::DeserializeOwned;
use serde_json::Value;

#[macro_export]
macro_rules! define_tool {
    (
        name: $name:expr,
        description: $desc:expr,
        schema: $schema:tt
    ) => {
        $crate::protocol::Tool {
            name: $name.into(),
            description: Some($desc.into()),
            input_schema: serde_json::json!($schema),
        }
    };
}

/// Deserialize tool arguments, treating `null` as an empty object.
pub(crate) fn parse_args<T: DeserializeOwned>(arguments: Value) -> Result<T, ToolError> {
    let arguments = if arguments.is_null() {
        Value::Object(Default::default())
    } else {
        arguments
    };
    serde_json::from_value(arguments).map_err(|e| ToolError::InvalidArguments(e.to_string()))
}

/// Register all built-in tools.
pub fn register(builder: &mut RegistryBuilder) -> RegistryResult<()> {
    builder.register_tool(CalculateTool::definition(), CalculateTool)?;

    for op in Operation::ALL {
        builder.register_tool(ArithmeticTool::definition(op), ArithmeticTool::new(op))?;
    }

    builder
        .register_tool(GetWeatherTool::definition(), GetWeatherTool::new())?
        .register_tool(ListFilesTool::definition(), ListFilesTool)?
        .register_tool(ReadFileTool::definition(), ReadFileTool)?;

    Ok(())
}

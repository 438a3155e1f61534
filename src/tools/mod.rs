pub mod convert;
pub mod rates;

use std::fmt::Debug;

use serde_json::Value;

/// A tool the model may invoke by name.
pub struct Tool {
    /// The name the model uses to request this tool
    pub name: String,
    /// A description of what the tool does
    pub description: String,
    /// A json schema describing the parameters
    pub parameters: Value,
    /// The function that powers the tool
    pub function: Box<dyn Fn(&Value) -> anyhow::Result<Value> + Send + Sync>,
}

impl Tool {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
        function: impl Fn(&Value) -> anyhow::Result<Value> + Send + Sync + 'static,
    ) -> Self {
        Tool {
            name: name.into(),
            description: description.into(),
            parameters,
            function: Box::new(function),
        }
    }
}

impl Debug for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("parameters", &self.parameters)
            .field("function", &"<function>")
            .finish()
    }
}

/// A closed name-to-tool table. The model is told about exactly this set and
/// dispatch rejects anything outside it.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: Vec<Tool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    pub fn register(&mut self, tool: Tool) -> anyhow::Result<()> {
        if self.tools.iter().any(|t| t.name == tool.name) {
            return Err(anyhow::anyhow!("Duplicate tool name: {}", tool.name));
        }
        self.tools.push(tool);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.tools.iter().find(|t| t.name == name)
    }

    /// The full set, handed to the provider so the model knows what it may call.
    pub fn tools(&self) -> &[Tool] {
        &self.tools
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

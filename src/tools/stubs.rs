//! Descriptor-only toolsets (spec §4.9): `handoff` and `transfer_task`
//! publish fixed schemas with no handler. The agent loop intercepts these
//! tool calls by name rather than invoking them through this crate.

use serde_json::json;

use crate::framing::{Tool, ToolContext, ToolSet};

pub struct StubsToolSet;

impl ToolSet for StubsToolSet {
    fn tools(&self, _ctx: &ToolContext) -> anyhow::Result<Vec<Tool>> {
        let handoff = Tool::descriptor_only(
            "handoff",
            "handoff",
            "Hand off the conversation to another agent.",
            json!({
                "type": "object",
                "properties": {"agent": {"type": "string"}},
                "required": ["agent"],
                "additionalProperties": false
            }),
        );

        let transfer_task = Tool::descriptor_only(
            "transfer_task",
            "transfer",
            "Transfer a task to another agent, with the expected output described.",
            json!({
                "type": "object",
                "properties": {
                    "agent": {"type": "string"},
                    "task": {"type": "string"},
                    "expected_output": {"type": "string"}
                },
                "required": ["agent", "task", "expected_output"],
                "additionalProperties": false
            }),
        );

        Ok(vec![handoff, transfer_task])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framing::ToolCall;

    #[test]
    fn publishes_both_descriptor_only_tools() {
        let toolset = StubsToolSet;
        let ctx = ToolContext::new();
        let tools = toolset.tools(&ctx).unwrap();
        assert_eq!(tools.len(), 2);
        assert!(tools.iter().all(|t| t.handler.is_none()));
    }

    #[tokio::test]
    async fn invoking_a_stub_is_an_error() {
        let toolset = StubsToolSet;
        let ctx = ToolContext::new();
        let tools = toolset.tools(&ctx).unwrap();
        let handoff = tools.iter().find(|t| t.name == "handoff").unwrap();
        let call = ToolCall::new("handoff", r#"{"agent":"researcher"}"#);
        assert!(handoff.invoke(&ctx, &call).await.is_err());
    }
}

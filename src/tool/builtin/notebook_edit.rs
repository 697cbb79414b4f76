use crate::error::ToolError;
use crate::tool::{DangerLevel, Tool, ToolContext, ToolResult};
use async_trait::async_trait;
use serde_json::{json, Value};

pub struct NotebookEditTool;

fn split_source(source: &str) -> Value {
    let mut lines: Vec<String> = source.split_inclusive('\n').map(str::to_string).collect();
    if lines.is_empty() {
        lines.push(String::new());
    }
    json!(lines)
}

#[async_trait]
impl Tool for NotebookEditTool {
    fn name(&self) -> &str {
        "notebookEdit"
    }

    fn description(&self) -> &str {
        "Edit a cell in a Jupyter notebook (.ipynb)"
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "notebookPath": {"type": "string"},
                "cellIndex": {"type": "integer"},
                "newSource": {"type": "string"},
                "cellType": {"type": "string", "enum": ["code", "markdown"]},
                "editMode": {"type": "string", "enum": ["replace", "insert", "delete"], "default": "replace"}
            },
            "required": ["notebookPath", "cellIndex", "newSource"]
        })
    }

    fn danger_level(&self) -> DangerLevel {
        DangerLevel::Restricted
    }

    async fn execute(&self, args: serde_json::Value, ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        let notebook_path = args
            .get("notebookPath")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::ValidationError("notebookPath is required".into()))?;
        if !notebook_path.ends_with(".ipynb") {
            return Err(ToolError::ValidationError("notebookPath must end with .ipynb".into()));
        }
        let cell_index =
            args.get("cellIndex").and_then(serde_json::Value::as_u64).ok_or_else(|| {
                ToolError::ValidationError("cellIndex is required".into())
            })? as usize;
        let new_source = args
            .get("newSource")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::ValidationError("newSource is required".into()))?;
        let cell_type = args.get("cellType").and_then(|v| v.as_str()).unwrap_or("code");
        let edit_mode = args.get("editMode").and_then(|v| v.as_str()).unwrap_or("replace");

        let resolved = ctx.gate.resolve(notebook_path, &ctx.working_dir)?;
        ctx.gate.assert_write_allowed(&resolved)?;

        let content = tokio::fs::read_to_string(&resolved)
            .await
            .map_err(|_| ToolError::NotFound(format!("notebook not found: {notebook_path}")))?;
        let mut notebook: Value =
            serde_json::from_str(&content).map_err(|e| ToolError::ValidationError(format!("invalid notebook JSON: {e}")))?;

        let cells = notebook
            .get_mut("cells")
            .and_then(Value::as_array_mut)
            .ok_or_else(|| ToolError::ValidationError("notebook has no cells array".into()))?;

        match edit_mode {
            "replace" => {
                let cell = cells
                    .get_mut(cell_index)
                    .ok_or_else(|| ToolError::ValidationError(format!("cellIndex {cell_index} out of range")))?;
                cell["source"] = split_source(new_source);
                if let Some(ct) = args.get("cellType").and_then(|v| v.as_str()) {
                    cell["cell_type"] = json!(ct);
                }
            }
            "insert" => {
                if cell_index > cells.len() {
                    return Err(ToolError::ValidationError(format!("cellIndex {cell_index} out of range")));
                }
                let new_cell = json!({
                    "cell_type": cell_type,
                    "metadata": {},
                    "source": split_source(new_source),
                    "outputs": [],
                    "execution_count": Value::Null,
                });
                cells.insert(cell_index, new_cell);
            }
            "delete" => {
                if cell_index >= cells.len() {
                    return Err(ToolError::ValidationError(format!("cellIndex {cell_index} out of range")));
                }
                cells.remove(cell_index);
            }
            other => return Err(ToolError::ValidationError(format!("unknown editMode: {other}"))),
        }

        let serialized =
            serde_json::to_string_pretty(&notebook).map_err(|e| ToolError::Upstream(e.to_string()))?;
        tokio::fs::write(&resolved, serialized)
            .await
            .map_err(|e| ToolError::Upstream(format!("failed to write notebook: {e}")))?;

        Ok(ToolResult::ok(format!("Applied {edit_mode} to cell {cell_index} of {notebook_path}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AgentConfig;
    use crate::pathgate::PathGate;
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;

    fn ctx_for(dir: std::path::PathBuf) -> ToolContext {
        let canon = dir.canonicalize().unwrap();
        ToolContext {
            working_dir: canon.clone(),
            session_id: "t".into(),
            gate: Arc::new(PathGate::new(canon.clone(), vec![canon.clone()], vec![canon])),
            config: Arc::new(AgentConfig::for_tests()),
            abort_signal: CancellationToken::new(),
            spawn_depth: 0,
            auto_approve: false,
            approve_command: Arc::new(|_| Box::pin(async { crate::tool::ApprovalDecision::Approved })),
            ask_user: Arc::new(|_| Box::pin(async { Default::default() })),
            update_todos: Arc::new(|_| {}),
            spawn_agent: Arc::new(|_, _| Box::pin(async { Err(crate::error::ToolError::PolicyDenied("spawnAgent unavailable in this test context".into())) })),
        }
    }

    fn sample_notebook() -> String {
        json!({
            "nbformat": 4,
            "metadata": {},
            "cells": [
                {"cell_type": "code", "metadata": {}, "source": ["print(1)\n"], "outputs": [], "execution_count": null}
            ]
        })
        .to_string()
    }

    #[tokio::test]
    async fn rejects_non_ipynb_path() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ctx_for(dir.path().to_path_buf());
        let err = NotebookEditTool
            .execute(json!({"notebookPath": "x.txt", "cellIndex": 0, "newSource": "x"}), &ctx)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "ValidationError");
    }

    #[tokio::test]
    async fn replace_updates_source() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("nb.ipynb"), sample_notebook()).unwrap();
        let ctx = ctx_for(dir.path().to_path_buf());
        NotebookEditTool
            .execute(json!({"notebookPath": "nb.ipynb", "cellIndex": 0, "newSource": "print(2)\n"}), &ctx)
            .await
            .unwrap();
        let content = std::fs::read_to_string(dir.path().join("nb.ipynb")).unwrap();
        let parsed: Value = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed["cells"][0]["source"], json!(["print(2)\n"]));
    }

    #[tokio::test]
    async fn insert_adds_new_cell_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("nb.ipynb"), sample_notebook()).unwrap();
        let ctx = ctx_for(dir.path().to_path_buf());
        NotebookEditTool
            .execute(
                json!({"notebookPath": "nb.ipynb", "cellIndex": 0, "newSource": "# header", "cellType": "markdown", "editMode": "insert"}),
                &ctx,
            )
            .await
            .unwrap();
        let content = std::fs::read_to_string(dir.path().join("nb.ipynb")).unwrap();
        let parsed: Value = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed["cells"].as_array().unwrap().len(), 2);
        assert_eq!(parsed["cells"][0]["cell_type"], "markdown");
        assert_eq!(parsed["cells"][0]["outputs"], json!([]));
        assert_eq!(parsed["cells"][0]["execution_count"], Value::Null);
    }

    #[tokio::test]
    async fn delete_removes_cell() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("nb.ipynb"), sample_notebook()).unwrap();
        let ctx = ctx_for(dir.path().to_path_buf());
        NotebookEditTool
            .execute(json!({"notebookPath": "nb.ipynb", "cellIndex": 0, "newSource": "", "editMode": "delete"}), &ctx)
            .await
            .unwrap();
        let content = std::fs::read_to_string(dir.path().join("nb.ipynb")).unwrap();
        let parsed: Value = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed["cells"].as_array().unwrap().len(), 0);
    }
}

use crate::error::ToolError;
use crate::skill;
use crate::tool::{DangerLevel, Tool, ToolContext, ToolResult};
use async_trait::async_trait;
use serde_json::json;

pub struct SkillTool;

#[async_trait]
impl Tool for SkillTool {
    fn name(&self) -> &str {
        "skill"
    }

    fn description(&self) -> &str {
        "Load a named skill's instructions from the configured skills directories"
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "skillName": {"type": "string", "description": "Name of the skill to load"}
            },
            "required": ["skillName"]
        })
    }

    fn danger_level(&self) -> DangerLevel {
        DangerLevel::Safe
    }

    async fn execute(&self, args: serde_json::Value, ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        let skill_name = args
            .get("skillName")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::ValidationError("skillName is required".into()))?;

        match skill::resolve(&ctx.config.skills_dirs, skill_name).await {
            Some(content) => Ok(ToolResult::ok(content)),
            None => Ok(ToolResult::ok(format!("Skill \"{skill_name}\" not found."))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AgentConfig;
    use crate::pathgate::PathGate;
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;

    fn ctx_with_skills_dir(dir: std::path::PathBuf) -> ToolContext {
        let mut config = AgentConfig::for_tests();
        config.skills_dirs = vec![dir.clone()];
        ToolContext {
            working_dir: dir.clone(),
            session_id: "t".into(),
            gate: Arc::new(PathGate::new(dir.clone(), vec![dir.clone()], vec![dir])),
            config: Arc::new(config),
            abort_signal: CancellationToken::new(),
            spawn_depth: 0,
            auto_approve: false,
            approve_command: Arc::new(|_| Box::pin(async { crate::tool::ApprovalDecision::Approved })),
            ask_user: Arc::new(|_| Box::pin(async { Default::default() })),
            update_todos: Arc::new(|_| {}),
            spawn_agent: Arc::new(|_, _| Box::pin(async { Err(crate::error::ToolError::PolicyDenied("spawnAgent unavailable in this test context".into())) })),
        }
    }

    #[tokio::test]
    async fn loads_matching_skill() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("review")).unwrap();
        std::fs::write(dir.path().join("review/SKILL.md"), "Review instructions").unwrap();
        let ctx = ctx_with_skills_dir(dir.path().to_path_buf());
        let result = SkillTool.execute(json!({"skillName": "review"}), &ctx).await.unwrap();
        assert_eq!(result.content, "Review instructions");
    }

    #[tokio::test]
    async fn missing_skill_returns_not_found_message() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ctx_with_skills_dir(dir.path().to_path_buf());
        let result = SkillTool.execute(json!({"skillName": "nope"}), &ctx).await.unwrap();
        assert_eq!(result.content, "Skill \"nope\" not found.");
    }
}

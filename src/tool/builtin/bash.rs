use crate::error::ToolError;
use crate::pathgate::{classify_command, CommandClass};
use crate::tool::{ApprovalDecision, DangerLevel, Tool, ToolContext, ToolResult};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;
use tokio::process::Command;

/// Per-stream truncation limit (advisory).
const MAX_STREAM_BYTES: usize = 30_000;
const DEFAULT_STALL_SECS: u64 = 90;

pub struct BashTool;

#[derive(Serialize)]
struct BashOutput {
    stdout: String,
    stderr: String,
    #[serde(rename = "exitCode")]
    exit_code: i32,
}

fn truncate_bytes(s: &mut String, max: usize) {
    if s.len() <= max {
        return;
    }
    let cut = s.char_indices().take_while(|(i, _)| *i < max).last().map_or(0, |(i, c)| i + c.len_utf8());
    s.truncate(cut);
    s.push_str("\n[truncated]");
}

#[async_trait]
impl Tool for BashTool {
    fn name(&self) -> &str {
        "bash"
    }

    fn description(&self) -> &str {
        "Execute a bash command in the working directory"
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "command": {"type": "string", "description": "The command to execute"},
                "timeout": {"type": "integer", "description": "Soft stall deadline in ms"}
            },
            "required": ["command"]
        })
    }

    fn danger_level(&self) -> DangerLevel {
        DangerLevel::Restricted
    }

    async fn execute(&self, args: serde_json::Value, ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        let command = args
            .get("command")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::ValidationError("command is required".into()))?;
        let stall = args
            .get("timeout")
            .and_then(serde_json::Value::as_u64)
            .map_or(DEFAULT_STALL_SECS, |ms| ms.div_ceil(1000));

        let class = classify_command(command);

        // Sub-agents cannot drive an interactive approval prompt, so any
        // command that would need one is rejected outright rather than
        // forwarded through the (still-shared) approveCommand callback.
        let needs_approval = !matches!(class, CommandClass::Auto);
        if needs_approval {
            if ctx.auto_approve {
                return Ok(ToolResult {
                    content: serde_json::to_string(&BashOutput {
                        stdout: String::new(),
                        stderr: "command rejected: sub-agents may only run auto-approved commands".into(),
                        exit_code: 1,
                    })
                    .unwrap_or_default(),
                    is_error: true,
                    metadata: None,
                });
            }
            let decision = (ctx.approve_command)(command.to_string()).await;
            if decision == ApprovalDecision::Denied {
                return Ok(ToolResult {
                    content: serde_json::to_string(&BashOutput {
                        stdout: String::new(),
                        stderr: "command rejected by user".into(),
                        exit_code: 1,
                    })
                    .unwrap_or_default(),
                    is_error: true,
                    metadata: None,
                });
            }
        }

        let mut child = Command::new("bash")
            .arg("-c")
            .arg(command)
            .current_dir(&ctx.working_dir)
            .env("CLICOLOR_FORCE", "1")
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ToolError::Upstream(format!("failed to spawn command: {e}")))?;

        let stall_duration = std::time::Duration::from_secs(stall);
        let output = tokio::select! {
            res = child.wait_with_output() => {
                res.map_err(|e| ToolError::Upstream(format!("failed to read command output: {e}")))?
            }
            () = ctx.abort_signal.cancelled() => {
                return Ok(ToolResult {
                    content: serde_json::to_string(&BashOutput {
                        stdout: String::new(),
                        stderr: "aborted".into(),
                        exit_code: 130,
                    }).unwrap_or_default(),
                    is_error: true,
                    metadata: None,
                });
            }
            () = tokio::time::sleep(stall_duration) => {
                return Err(ToolError::Timeout(format!("command exceeded stall deadline of {stall}s")));
            }
        };

        let mut stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let mut stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        truncate_bytes(&mut stdout, MAX_STREAM_BYTES);
        truncate_bytes(&mut stderr, MAX_STREAM_BYTES);
        let exit_code = output.status.code().unwrap_or(-1);

        Ok(ToolResult {
            content: serde_json::to_string(&BashOutput { stdout, stderr, exit_code })
                .map_err(|e| ToolError::Upstream(e.to_string()))?,
            is_error: !output.status.success(),
            metadata: Some(json!({"exitCode": exit_code})),
        })
    }
}

//! Session memory: plain markdown files under the configured `memoryDirs`,
//! plus a project/user `AGENT.md` hot cache. No embeddings, no database —
//! `read`/`write`/`search` operate directly on the filesystem.

use crate::error::ToolError;
use std::path::{Path, PathBuf};

/// `read` with no key, or key `hot`/`AGENT.md`, returns the project
/// `AGENT.md`, falling back to the user directory's copy.
pub async fn read_hot(project_agent_dir: &Path, user_agent_dir: &Path) -> Result<String, ToolError> {
    let project_path = project_agent_dir.join("AGENT.md");
    if let Ok(content) = tokio::fs::read_to_string(&project_path).await {
        return Ok(content);
    }
    let user_path = user_agent_dir.join("AGENT.md");
    tokio::fs::read_to_string(&user_path)
        .await
        .map_err(|_| ToolError::NotFound("no AGENT.md found in the project or user directory".into()))
}

/// Resolve `key` (accepting an explicit `.md` suffix) to `<memoryDir>/<key>.md`
/// against the first `memoryDir` that contains it, rejecting any key that
/// escapes the directory after canonicalization.
fn resolve_key(memory_dirs: &[PathBuf], key: &str) -> Result<PathBuf, ToolError> {
    let file_name = if key.ends_with(".md") { key.to_string() } else { format!("{key}.md") };
    let primary =
        memory_dirs.first().ok_or_else(|| ToolError::ValidationError("no memory directories configured".into()))?;
    let candidate = primary.join(&file_name);

    let canonical_dir =
        primary.canonicalize().map_err(|e| ToolError::Upstream(format!("cannot resolve memory directory: {e}")))?;
    let lexical_parent = candidate.parent().unwrap_or(primary).to_path_buf();
    let canonical_parent = lexical_parent.canonicalize().unwrap_or(lexical_parent);
    if !canonical_parent.starts_with(&canonical_dir) {
        return Err(ToolError::PolicyDenied(format!("memory key escapes its directory: {key}")));
    }

    Ok(candidate)
}

pub async fn read(memory_dirs: &[PathBuf], key: &str) -> Result<String, ToolError> {
    for dir in memory_dirs {
        let file_name = if key.ends_with(".md") { key.to_string() } else { format!("{key}.md") };
        let candidate = dir.join(&file_name);
        if let Ok(content) = tokio::fs::read_to_string(&candidate).await {
            return Ok(content);
        }
    }
    Err(ToolError::NotFound(format!("no memory entry for key: {key}")))
}

pub async fn write(memory_dirs: &[PathBuf], key: &str, content: &str) -> Result<(), ToolError> {
    let path = resolve_key(memory_dirs, key)?;
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| ToolError::Upstream(format!("failed to create memory directory: {e}")))?;
    }
    let tmp_path = path.with_extension("md.tmp");
    tokio::fs::write(&tmp_path, content)
        .await
        .map_err(|e| ToolError::Upstream(format!("failed to write memory entry: {e}")))?;
    tokio::fs::rename(&tmp_path, &path)
        .await
        .map_err(|e| ToolError::Upstream(format!("failed to finalize memory entry: {e}")))?;
    Ok(())
}

/// Plain-text content search across every `.md` file under `memory_dirs`.
/// Formats matches as `path:line:content`, mirroring `grep`'s output shape.
pub async fn search(memory_dirs: &[PathBuf], query: &str) -> Result<Vec<String>, ToolError> {
    let mut results = Vec::new();
    for dir in memory_dirs {
        let Ok(mut entries) = tokio::fs::read_dir(dir).await else { continue };
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("md") {
                continue;
            }
            let Ok(content) = tokio::fs::read_to_string(&path).await else { continue };
            let display = path.strip_prefix(dir).unwrap_or(&path);
            for (i, line) in content.lines().enumerate() {
                if line.contains(query) {
                    results.push(format!("{}:{}:{}", display.display(), i + 1, line.trim()));
                }
            }
        }
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn read_hot_prefers_project_over_user() {
        let project = tempfile::tempdir().unwrap();
        let user = tempfile::tempdir().unwrap();
        std::fs::write(project.path().join("AGENT.md"), "project notes").unwrap();
        std::fs::write(user.path().join("AGENT.md"), "user notes").unwrap();
        let result = read_hot(project.path(), user.path()).await.unwrap();
        assert_eq!(result, "project notes");
    }

    #[tokio::test]
    async fn read_hot_falls_back_to_user() {
        let project = tempfile::tempdir().unwrap();
        let user = tempfile::tempdir().unwrap();
        std::fs::write(user.path().join("AGENT.md"), "user notes").unwrap();
        let result = read_hot(project.path(), user.path()).await.unwrap();
        assert_eq!(result, "user notes");
    }

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let dirs = vec![dir.path().to_path_buf()];
        write(&dirs, "notes/design", "some design notes").await.unwrap();
        let result = read(&dirs, "notes/design").await.unwrap();
        assert_eq!(result, "some design notes");
    }

    #[tokio::test]
    async fn escaping_key_is_denied() {
        let dir = tempfile::tempdir().unwrap();
        let dirs = vec![dir.path().to_path_buf()];
        let err = write(&dirs, "../outside", "x").await.unwrap_err();
        assert_eq!(err.kind(), "PolicyDenied");
    }

    #[tokio::test]
    async fn search_finds_matching_lines_with_location() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.md"), "line one\nline with needle\n").unwrap();
        let dirs = vec![dir.path().to_path_buf()];
        let results = search(&dirs, "needle").await.unwrap();
        assert_eq!(results, vec!["a.md:2:line with needle"]);
    }
}

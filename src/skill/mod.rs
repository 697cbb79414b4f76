//! Skill resolution: an ordered list of `skillsDirs`, first match wins.
//! Nothing here caches file contents across calls — the `skill` tool
//! re-reads from disk every time it is invoked.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Optional YAML front matter a skill file may carry, delimited by a pair
/// of `---` lines at the top of the file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SkillMetadata {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub allowed_tools: Vec<String>,
}

/// Split `---\n<yaml>\n---\n<body>` into its parsed metadata and the
/// remaining body. Returns `None` metadata and the whole input as body when
/// there is no front matter.
#[must_use]
pub fn parse_front_matter(content: &str) -> (Option<SkillMetadata>, &str) {
    let Some(rest) = content.strip_prefix("---\n") else {
        return (None, content);
    };
    let Some(end) = rest.find("\n---\n") else {
        return (None, content);
    };
    let (yaml, body) = rest.split_at(end);
    let body = &body[5..]; // skip "\n---\n"
    match serde_yaml::from_str(yaml) {
        Ok(meta) => (Some(meta), body),
        Err(_) => (None, content),
    }
}

/// `<dir>/<name>/SKILL.md` for the first `dir` in `skills_dirs` where it
/// exists. No flat-file fallback (`<dir>/<name>.md` does not count).
fn locate(skills_dirs: &[PathBuf], name: &str) -> Option<PathBuf> {
    skills_dirs.iter().map(|dir| dir.join(name).join("SKILL.md")).find(|path| path.is_file())
}

/// Read-through resolution over the ordered `skillsDirs`. Returns `None` if
/// no directory has a matching `SKILL.md`.
pub async fn resolve(skills_dirs: &[PathBuf], name: &str) -> Option<String> {
    let path = locate(skills_dirs, name)?;
    tokio::fs::read_to_string(&path).await.ok()
}

/// List every discoverable skill across `skills_dirs`, deduplicated by name
/// with the earliest directory's entry winning.
pub async fn list(skills_dirs: &[PathBuf]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut names = Vec::new();
    for dir in skills_dirs {
        let Ok(mut entries) = tokio::fs::read_dir(dir).await else { continue };
        while let Ok(Some(entry)) = entries.next_entry().await {
            let Ok(file_type) = entry.file_type().await else { continue };
            if !file_type.is_dir() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else { continue };
            if !entry.path().join("SKILL.md").is_file() {
                continue;
            }
            if seen.insert(name.clone()) {
                names.push(name);
            }
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_front_matter() {
        let content = "---\nname: foo\ndescription: does foo things\n---\nBody text\n";
        let (meta, body) = parse_front_matter(content);
        let meta = meta.unwrap();
        assert_eq!(meta.name.as_deref(), Some("foo"));
        assert_eq!(body, "Body text\n");
    }

    #[test]
    fn missing_front_matter_returns_whole_body() {
        let content = "Just a plain skill file.\n";
        let (meta, body) = parse_front_matter(content);
        assert!(meta.is_none());
        assert_eq!(body, content);
    }

    #[tokio::test]
    async fn resolve_returns_first_matching_directory() {
        let dir_a = tempfile::tempdir().unwrap();
        let dir_b = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir_b.path().join("greet")).unwrap();
        std::fs::write(dir_b.path().join("greet/SKILL.md"), "hello from b").unwrap();

        let dirs = vec![dir_a.path().to_path_buf(), dir_b.path().to_path_buf()];
        let resolved = resolve(&dirs, "greet").await;
        assert_eq!(resolved.as_deref(), Some("hello from b"));
    }

    #[tokio::test]
    async fn resolve_returns_none_when_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let dirs = vec![dir.path().to_path_buf()];
        assert!(resolve(&dirs, "nope").await.is_none());
    }

    #[tokio::test]
    async fn earlier_directory_wins_over_later() {
        let dir_a = tempfile::tempdir().unwrap();
        let dir_b = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir_a.path().join("greet")).unwrap();
        std::fs::write(dir_a.path().join("greet/SKILL.md"), "from a").unwrap();
        std::fs::create_dir_all(dir_b.path().join("greet")).unwrap();
        std::fs::write(dir_b.path().join("greet/SKILL.md"), "from b").unwrap();

        let dirs = vec![dir_a.path().to_path_buf(), dir_b.path().to_path_buf()];
        assert_eq!(resolve(&dirs, "greet").await.as_deref(), Some("from a"));
    }
}

mod ask;
mod bash;
mod edit;
mod glob;
mod grep;
mod memory;
mod notebook_edit;
mod read;
mod skill;
mod spawn_agent;
mod todo_write;
mod web_fetch;
mod web_search;
mod write;

pub use ask::AskTool;
pub use bash::BashTool;
pub use edit::EditTool;
pub use glob::GlobTool;
pub use grep::GrepTool;
pub use memory::MemoryTool;
pub use notebook_edit::NotebookEditTool;
pub use read::ReadTool;
pub use skill::SkillTool;
pub use spawn_agent::SpawnAgentTool;
pub use todo_write::TodoWriteTool;
pub use web_fetch::WebFetchTool;
pub use web_search::WebSearchTool;
pub use write::WriteTool;

//! Agent tools: registry plus filesystem, git, SQLite, and web wrappers.

pub mod base;
pub mod filesystem;
pub mod git;
pub mod registry;
pub mod sqlite;
pub mod web;

pub use base::{Tool, ToolExecutionResult};
pub use registry::ToolRegistry;

use crate::config::schema::ToolsConfig;

/// Build the default tool registry from configuration.
///
/// This is the single place tools come into existence; the registry is
/// read-only after this returns.
pub fn build_registry(config: &ToolsConfig) -> ToolRegistry {
    let mut registry = ToolRegistry::new();

    // Filesystem.
    registry.register(Box::new(filesystem::GetCwdTool));
    registry.register(Box::new(filesystem::ReadFileTool));
    registry.register(Box::new(filesystem::WriteFileTool));
    registry.register(Box::new(filesystem::AppendFileTool));
    registry.register(Box::new(filesystem::EditFileTool));
    registry.register(Box::new(filesystem::CreateDirectoryTool));
    registry.register(Box::new(filesystem::ListDirectoryTool));
    registry.register(Box::new(filesystem::CopyFileTool));
    registry.register(Box::new(filesystem::RemoveFileTool));
    registry.register(Box::new(filesystem::RemoveDirectoryTool));
    registry.register(Box::new(filesystem::CopyDirectoryTool));

    // Version control.
    registry.register(Box::new(git::GitCloneTool));
    registry.register(Box::new(git::GitCommitTool));
    registry.register(Box::new(git::GitRestoreTool));
    registry.register(Box::new(git::GitPushTool));
    registry.register(Box::new(git::GitLogTool));
    registry.register(Box::new(git::GitShowTool));
    registry.register(Box::new(git::GitStatusTool));
    registry.register(Box::new(git::GitDiffTool));

    // SQLite.
    registry.register(Box::new(sqlite::SqliteConnectTool));
    registry.register(Box::new(sqlite::SqliteExecuteQueryTool));
    registry.register(Box::new(sqlite::SqliteExecuteCommandTool));
    registry.register(Box::new(sqlite::SqliteGetSchemaTool));
    registry.register(Box::new(sqlite::SqliteListTablesTool));

    // Web.
    registry.register(Box::new(web::BraveWebSearchTool::new(
        config.brave_api_key.clone(),
    )));
    registry.register(Box::new(web::FetchWebPageTool::new()));

    registry
}

//! File system tools: cwd, read, write, append, edit, and directory ops.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::base::Tool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Expand a leading `~` to the user's home directory.
fn expand_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.join(rest)
    } else if path == "~" {
        dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
    } else {
        PathBuf::from(path)
    }
}

fn str_arg<'a>(params: &'a HashMap<String, serde_json::Value>, key: &str) -> Option<&'a str> {
    params.get(key).and_then(|v| v.as_str())
}

fn bool_arg(params: &HashMap<String, serde_json::Value>, key: &str, default: bool) -> bool {
    params.get(key).and_then(|v| v.as_bool()).unwrap_or(default)
}

fn usize_arg(params: &HashMap<String, serde_json::Value>, key: &str) -> Option<usize> {
    params.get(key).and_then(|v| v.as_u64()).map(|n| n as usize)
}

/// Recursively copy a directory tree.
async fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<u64> {
    let mut copied = 0u64;
    tokio::fs::create_dir_all(dst).await?;

    let mut stack = vec![(src.to_path_buf(), dst.to_path_buf())];
    while let Some((from, to)) = stack.pop() {
        let mut entries = tokio::fs::read_dir(&from).await?;
        while let Some(entry) = entries.next_entry().await? {
            let target = to.join(entry.file_name());
            let file_type = entry.file_type().await?;
            if file_type.is_dir() {
                tokio::fs::create_dir_all(&target).await?;
                stack.push((entry.path(), target));
            } else if file_type.is_file() {
                tokio::fs::copy(entry.path(), &target).await?;
                copied += 1;
            }
            // Symlinks are skipped: copying them across trees is
            // platform-dependent and the catalogue promises files only.
        }
    }

    Ok(copied)
}

fn io_error_string(action: &str, path: &str, e: &std::io::Error) -> String {
    if e.kind() == std::io::ErrorKind::PermissionDenied {
        format!("Error: Permission denied: {}", path)
    } else {
        format!("Error {} {}: {}", action, path, e)
    }
}

// ---------------------------------------------------------------------------
// GetCwdTool
// ---------------------------------------------------------------------------

/// Tool to report the process working directory.
pub struct GetCwdTool;

#[async_trait]
impl Tool for GetCwdTool {
    fn name(&self) -> &str {
        "get_cwd"
    }

    fn description(&self) -> &str {
        "Get the current working directory"
    }

    fn parameters(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {}
        })
    }

    fn returns(&self) -> &str {
        "String - information about the current working directory"
    }

    async fn execute(&self, _params: HashMap<String, serde_json::Value>) -> String {
        match std::env::current_dir() {
            Ok(dir) => format!("Current working directory: {}", dir.display()),
            Err(e) => format!("Error getting working directory: {}", e),
        }
    }
}

// ---------------------------------------------------------------------------
// ReadFileTool
// ---------------------------------------------------------------------------

/// Tool to read file contents with optional line numbering, range selection,
/// and debug formatting.
pub struct ReadFileTool;

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read a file in the filesystem with optional line numbering, range selection, and debug formatting"
    }

    fn parameters(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "path and filename of the file to read"
                },
                "show_line_numbers": {
                    "type": "boolean",
                    "description": "whether to include line numbers (defaults to false)"
                },
                "start_line": {
                    "type": "integer",
                    "description": "first line to read, 1-indexed (defaults to 1)"
                },
                "end_line": {
                    "type": "integer",
                    "description": "last line to read, 1-indexed; omit for all lines"
                },
                "show_repr": {
                    "type": "boolean",
                    "description": "whether to show a debug rendering of each line, revealing whitespace and special characters (defaults to false)"
                }
            },
            "required": ["path"]
        })
    }

    fn returns(&self) -> &str {
        "String - the contents of the file (potentially formatted with line numbers), or an error message if reading fails"
    }

    async fn execute(&self, params: HashMap<String, serde_json::Value>) -> String {
        let path = match str_arg(&params, "path") {
            Some(p) => p,
            None => return "Error: 'path' parameter is required".to_string(),
        };
        let show_line_numbers = bool_arg(&params, "show_line_numbers", false);
        let show_repr = bool_arg(&params, "show_repr", false);
        let start_line = usize_arg(&params, "start_line").unwrap_or(1).max(1);
        let end_line = usize_arg(&params, "end_line");

        let file_path = expand_path(path);
        if !file_path.exists() {
            return format!("Error: File not found: {}", path);
        }
        if !file_path.is_file() {
            return format!("Error: Not a file: {}", path);
        }

        let content = match tokio::fs::read_to_string(&file_path).await {
            Ok(c) => c,
            Err(e) => return io_error_string("reading", path, &e),
        };

        if !show_line_numbers && !show_repr && start_line == 1 && end_line.is_none() {
            return content;
        }

        let lines: Vec<&str> = content.lines().collect();
        if lines.is_empty() {
            return String::new();
        }
        if start_line > lines.len() {
            return format!(
                "Error: start_line {} is past the end of the file ({} lines)",
                start_line,
                lines.len()
            );
        }
        let last = end_line
            .unwrap_or(lines.len())
            .min(lines.len())
            .max(start_line - 1);

        lines[start_line - 1..last]
            .iter()
            .enumerate()
            .map(|(i, line)| {
                let rendered = if show_repr {
                    format!("{:?}", line)
                } else {
                    (*line).to_string()
                };
                if show_line_numbers {
                    format!("{:>6}  {}", start_line + i, rendered)
                } else {
                    rendered
                }
            })
            .collect::<Vec<String>>()
            .join("\n")
    }
}

// ---------------------------------------------------------------------------
// WriteFileTool
// ---------------------------------------------------------------------------

/// Tool to write content to a file.
pub struct WriteFileTool;

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Write content to a file in the filesystem"
    }

    fn parameters(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "path and filename of the file to write"
                },
                "content": {
                    "type": "string",
                    "description": "the content to write to the file"
                }
            },
            "required": ["path", "content"]
        })
    }

    fn returns(&self) -> &str {
        "String - confirmation message indicating success or failure"
    }

    async fn execute(&self, params: HashMap<String, serde_json::Value>) -> String {
        let path = match str_arg(&params, "path") {
            Some(p) => p,
            None => return "Error: 'path' parameter is required".to_string(),
        };
        let content = match str_arg(&params, "content") {
            Some(c) => c,
            None => return "Error: 'content' parameter is required".to_string(),
        };

        let file_path = expand_path(path);
        if let Some(parent) = file_path.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                return format!("Error creating directories: {}", e);
            }
        }

        match tokio::fs::write(&file_path, content).await {
            Ok(()) => format!("Successfully wrote {} bytes to {}", content.len(), path),
            Err(e) => io_error_string("writing", path, &e),
        }
    }
}

// ---------------------------------------------------------------------------
// AppendFileTool
// ---------------------------------------------------------------------------

/// Tool to append content to an existing file.
pub struct AppendFileTool;

#[async_trait]
impl Tool for AppendFileTool {
    fn name(&self) -> &str {
        "append_file"
    }

    fn description(&self) -> &str {
        "Append content to an existing file in the filesystem"
    }

    fn parameters(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "path and filename of the file to append to"
                },
                "content": {
                    "type": "string",
                    "description": "the content to append to the file"
                }
            },
            "required": ["path", "content"]
        })
    }

    fn returns(&self) -> &str {
        "String - confirmation message indicating success or failure"
    }

    async fn execute(&self, params: HashMap<String, serde_json::Value>) -> String {
        let path = match str_arg(&params, "path") {
            Some(p) => p,
            None => return "Error: 'path' parameter is required".to_string(),
        };
        let content = match str_arg(&params, "content") {
            Some(c) => c,
            None => return "Error: 'content' parameter is required".to_string(),
        };

        let file_path = expand_path(path);
        if !file_path.exists() {
            return format!("Error: File not found: {}", path);
        }

        let existing = match tokio::fs::read_to_string(&file_path).await {
            Ok(c) => c,
            Err(e) => return io_error_string("reading", path, &e),
        };

        let combined = format!("{}{}", existing, content);
        match tokio::fs::write(&file_path, &combined).await {
            Ok(()) => format!("Successfully appended {} bytes to {}", content.len(), path),
            Err(e) => io_error_string("writing", path, &e),
        }
    }
}

// ---------------------------------------------------------------------------
// EditFileTool
// ---------------------------------------------------------------------------

/// Tool to edit a file by replacing text that appears exactly once.
pub struct EditFileTool;

#[async_trait]
impl Tool for EditFileTool {
    fn name(&self) -> &str {
        "edit_file"
    }

    fn description(&self) -> &str {
        "Make a line-based edit to a file by replacing old_text with new_text. The old_text must appear exactly once in the file for safety."
    }

    fn parameters(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "path and filename of the file to edit"
                },
                "old_text": {
                    "type": "string",
                    "description": "text to be replaced (must match exactly once)"
                },
                "new_text": {
                    "type": "string",
                    "description": "replacement text"
                },
                "dry_run": {
                    "type": "boolean",
                    "description": "if true, just return the diff without making changes (defaults to false)"
                }
            },
            "required": ["path", "old_text", "new_text"]
        })
    }

    fn returns(&self) -> &str {
        "String - confirmation message with diff showing changes, or error message if editing fails"
    }

    async fn execute(&self, params: HashMap<String, serde_json::Value>) -> String {
        let path = match str_arg(&params, "path") {
            Some(p) => p,
            None => return "Error: 'path' parameter is required".to_string(),
        };
        let old_text = match str_arg(&params, "old_text") {
            Some(t) => t,
            None => return "Error: 'old_text' parameter is required".to_string(),
        };
        let new_text = match str_arg(&params, "new_text") {
            Some(t) => t,
            None => return "Error: 'new_text' parameter is required".to_string(),
        };
        let dry_run = bool_arg(&params, "dry_run", false);

        let file_path = expand_path(path);
        if !file_path.exists() {
            return format!("Error: File not found: {}", path);
        }

        let content = match tokio::fs::read_to_string(&file_path).await {
            Ok(c) => c,
            Err(e) => return io_error_string("reading", path, &e),
        };

        let count = content.matches(old_text).count();
        if count == 0 {
            return "Error: old_text not found in file. Make sure it matches exactly.".to_string();
        }
        if count > 1 {
            return format!(
                "Error: old_text appears {} times. Please provide more context to make it unique.",
                count
            );
        }

        let diff = render_diff(old_text, new_text);
        if dry_run {
            return format!("Dry run - no changes made to {}.\n{}", path, diff);
        }

        let new_content = content.replacen(old_text, new_text, 1);
        match tokio::fs::write(&file_path, new_content).await {
            Ok(()) => format!("Successfully edited {}.\n{}", path, diff),
            Err(e) => io_error_string("writing", path, &e),
        }
    }
}

/// Minimal removed/added rendering of a replacement.
fn render_diff(old_text: &str, new_text: &str) -> String {
    let mut out = String::new();
    for line in old_text.lines() {
        out.push_str("- ");
        out.push_str(line);
        out.push('\n');
    }
    for line in new_text.lines() {
        out.push_str("+ ");
        out.push_str(line);
        out.push('\n');
    }
    out.trim_end().to_string()
}

// ---------------------------------------------------------------------------
// CreateDirectoryTool
// ---------------------------------------------------------------------------

/// Tool to create a directory (including parents).
pub struct CreateDirectoryTool;

#[async_trait]
impl Tool for CreateDirectoryTool {
    fn name(&self) -> &str {
        "create_directory"
    }

    fn description(&self) -> &str {
        "Create a new directory in the filesystem"
    }

    fn parameters(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "path of the directory to create"
                }
            },
            "required": ["path"]
        })
    }

    fn returns(&self) -> &str {
        "String - confirmation message indicating success or failure"
    }

    async fn execute(&self, params: HashMap<String, serde_json::Value>) -> String {
        let path = match str_arg(&params, "path") {
            Some(p) => p,
            None => return "Error: 'path' parameter is required".to_string(),
        };

        let dir_path = expand_path(path);
        match tokio::fs::create_dir_all(&dir_path).await {
            Ok(()) => format!("Successfully created directory {}", path),
            Err(e) => io_error_string("creating directory", path, &e),
        }
    }
}

// ---------------------------------------------------------------------------
// ListDirectoryTool
// ---------------------------------------------------------------------------

/// Tool to list directory contents. Defaults to the working directory.
pub struct ListDirectoryTool;

#[async_trait]
impl Tool for ListDirectoryTool {
    fn name(&self) -> &str {
        "list_directory"
    }

    fn description(&self) -> &str {
        "List the contents of a directory in the filesystem"
    }

    fn parameters(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "path of the directory to list. If not provided, lists the current working directory."
                }
            }
        })
    }

    fn returns(&self) -> &str {
        "String - a list of files and directories in the specified path"
    }

    async fn execute(&self, params: HashMap<String, serde_json::Value>) -> String {
        let path = str_arg(&params, "path").unwrap_or(".").to_string();

        let dir_path = expand_path(&path);
        if !dir_path.exists() {
            return format!("Error: Directory not found: {}", path);
        }
        if !dir_path.is_dir() {
            return format!("Error: Not a directory: {}", path);
        }

        let mut entries = match tokio::fs::read_dir(&dir_path).await {
            Ok(e) => e,
            Err(e) => return io_error_string("listing", &path, &e),
        };

        let mut items: Vec<(bool, String)> = Vec::new();
        loop {
            match entries.next_entry().await {
                Ok(Some(entry)) => {
                    let name = entry.file_name().to_string_lossy().to_string();
                    let is_dir = entry
                        .file_type()
                        .await
                        .map(|ft| ft.is_dir())
                        .unwrap_or(false);
                    items.push((is_dir, name));
                }
                Ok(None) => break,
                Err(e) => return io_error_string("listing", &path, &e),
            }
        }

        if items.is_empty() {
            return format!("Directory {} is empty", path);
        }

        items.sort_by(|a, b| a.1.cmp(&b.1));
        items
            .into_iter()
            .map(|(is_dir, name)| {
                if is_dir {
                    format!("[dir]  {}", name)
                } else {
                    format!("[file] {}", name)
                }
            })
            .collect::<Vec<String>>()
            .join("\n")
    }
}

// ---------------------------------------------------------------------------
// CopyFileTool
// ---------------------------------------------------------------------------

/// Tool to copy a single file.
pub struct CopyFileTool;

#[async_trait]
impl Tool for CopyFileTool {
    fn name(&self) -> &str {
        "copy_file"
    }

    fn description(&self) -> &str {
        "Copy a file from source to destination"
    }

    fn parameters(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "source": {
                    "type": "string",
                    "description": "path to the source file to copy"
                },
                "destination": {
                    "type": "string",
                    "description": "path where the file should be copied to"
                }
            },
            "required": ["source", "destination"]
        })
    }

    fn returns(&self) -> &str {
        "String - confirmation message indicating success or failure"
    }

    async fn execute(&self, params: HashMap<String, serde_json::Value>) -> String {
        let source = match str_arg(&params, "source") {
            Some(s) => s,
            None => return "Error: 'source' parameter is required".to_string(),
        };
        let destination = match str_arg(&params, "destination") {
            Some(d) => d,
            None => return "Error: 'destination' parameter is required".to_string(),
        };

        let src = expand_path(source);
        let dst = expand_path(destination);
        if !src.is_file() {
            return format!("Error: File not found: {}", source);
        }
        if let Some(parent) = dst.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                return format!("Error creating directories: {}", e);
            }
        }

        match tokio::fs::copy(&src, &dst).await {
            Ok(bytes) => format!(
                "Successfully copied {} to {} ({} bytes)",
                source, destination, bytes
            ),
            Err(e) => io_error_string("copying", source, &e),
        }
    }
}

// ---------------------------------------------------------------------------
// RemoveFileTool
// ---------------------------------------------------------------------------

/// Tool to remove a single file.
pub struct RemoveFileTool;

#[async_trait]
impl Tool for RemoveFileTool {
    fn name(&self) -> &str {
        "remove_file"
    }

    fn description(&self) -> &str {
        "Remove/delete a single file"
    }

    fn parameters(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "path to the file to delete"
                }
            },
            "required": ["path"]
        })
    }

    fn returns(&self) -> &str {
        "String - confirmation message indicating success or failure"
    }

    async fn execute(&self, params: HashMap<String, serde_json::Value>) -> String {
        let path = match str_arg(&params, "path") {
            Some(p) => p,
            None => return "Error: 'path' parameter is required".to_string(),
        };

        let file_path = expand_path(path);
        if !file_path.exists() {
            return format!("Error: File not found: {}", path);
        }
        if !file_path.is_file() {
            return format!("Error: Not a file: {} (use remove_directory for directories)", path);
        }

        match tokio::fs::remove_file(&file_path).await {
            Ok(()) => format!("Successfully removed {}", path),
            Err(e) => io_error_string("removing", path, &e),
        }
    }
}

// ---------------------------------------------------------------------------
// RemoveDirectoryTool
// ---------------------------------------------------------------------------

/// Tool to remove a directory and all its contents.
pub struct RemoveDirectoryTool;

#[async_trait]
impl Tool for RemoveDirectoryTool {
    fn name(&self) -> &str {
        "remove_directory"
    }

    fn description(&self) -> &str {
        "Remove/delete a directory and all its contents"
    }

    fn parameters(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "path to the directory to delete"
                }
            },
            "required": ["path"]
        })
    }

    fn returns(&self) -> &str {
        "String - confirmation message indicating success or failure"
    }

    async fn execute(&self, params: HashMap<String, serde_json::Value>) -> String {
        let path = match str_arg(&params, "path") {
            Some(p) => p,
            None => return "Error: 'path' parameter is required".to_string(),
        };

        let dir_path = expand_path(path);
        if !dir_path.exists() {
            return format!("Error: Directory not found: {}", path);
        }
        if !dir_path.is_dir() {
            return format!("Error: Not a directory: {}", path);
        }

        match tokio::fs::remove_dir_all(&dir_path).await {
            Ok(()) => format!("Successfully removed directory {}", path),
            Err(e) => io_error_string("removing directory", path, &e),
        }
    }
}

// ---------------------------------------------------------------------------
// CopyDirectoryTool
// ---------------------------------------------------------------------------

/// Tool to copy a directory tree.
pub struct CopyDirectoryTool;

#[async_trait]
impl Tool for CopyDirectoryTool {
    fn name(&self) -> &str {
        "copy_directory"
    }

    fn description(&self) -> &str {
        "Copy a directory and all its contents to a new location"
    }

    fn parameters(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "source": {
                    "type": "string",
                    "description": "path to the source directory to copy"
                },
                "destination": {
                    "type": "string",
                    "description": "path where the directory should be copied to"
                }
            },
            "required": ["source", "destination"]
        })
    }

    fn returns(&self) -> &str {
        "String - confirmation message indicating success or failure"
    }

    async fn execute(&self, params: HashMap<String, serde_json::Value>) -> String {
        let source = match str_arg(&params, "source") {
            Some(s) => s,
            None => return "Error: 'source' parameter is required".to_string(),
        };
        let destination = match str_arg(&params, "destination") {
            Some(d) => d,
            None => return "Error: 'destination' parameter is required".to_string(),
        };

        let src = expand_path(source);
        let dst = expand_path(destination);
        if !src.is_dir() {
            return format!("Error: Directory not found: {}", source);
        }

        match copy_dir_recursive(&src, &dst).await {
            Ok(files) => format!(
                "Successfully copied directory {} to {} ({} files)",
                source, destination, files
            ),
            Err(e) => io_error_string("copying directory", source, &e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn make_params(pairs: &[(&str, &str)]) -> HashMap<String, serde_json::Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), serde_json::Value::String(v.to_string())))
            .collect()
    }

    // -----------------------------------------------------------------------
    // expand_path tests
    // -----------------------------------------------------------------------

    #[test]
    fn test_expand_path_absolute() {
        assert_eq!(expand_path("/tmp/test.txt"), PathBuf::from("/tmp/test.txt"));
    }

    #[test]
    fn test_expand_path_tilde_subpath() {
        let result = expand_path("~/Documents/file.txt");
        assert!(result.to_string_lossy().ends_with("Documents/file.txt"));
    }

    // -----------------------------------------------------------------------
    // GetCwdTool tests
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_get_cwd_no_params() {
        let tool = GetCwdTool;
        let result = tool.execute(HashMap::new()).await;
        assert!(result.starts_with("Current working directory:"));
    }

    // -----------------------------------------------------------------------
    // ReadFileTool tests
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_read_file_plain() {
        let dir = TempDir::new().unwrap();
        let file_path = dir.path().join("hello.txt");
        std::fs::write(&file_path, "hello world").unwrap();

        let tool = ReadFileTool;
        let params = make_params(&[("path", file_path.to_str().unwrap())]);
        assert_eq!(tool.execute(params).await, "hello world");
    }

    #[tokio::test]
    async fn test_read_file_line_numbers_and_range() {
        let dir = TempDir::new().unwrap();
        let file_path = dir.path().join("lines.txt");
        std::fs::write(&file_path, "one\ntwo\nthree\nfour").unwrap();

        let tool = ReadFileTool;
        let mut params = make_params(&[("path", file_path.to_str().unwrap())]);
        params.insert("show_line_numbers".into(), serde_json::Value::Bool(true));
        params.insert("start_line".into(), serde_json::json!(2));
        params.insert("end_line".into(), serde_json::json!(3));

        let result = tool.execute(params).await;
        assert!(result.contains("2  two"));
        assert!(result.contains("3  three"));
        assert!(!result.contains("one"));
        assert!(!result.contains("four"));
    }

    #[tokio::test]
    async fn test_read_file_show_repr_reveals_whitespace() {
        let dir = TempDir::new().unwrap();
        let file_path = dir.path().join("tabs.txt");
        std::fs::write(&file_path, "a\tb").unwrap();

        let tool = ReadFileTool;
        let mut params = make_params(&[("path", file_path.to_str().unwrap())]);
        params.insert("show_repr".into(), serde_json::Value::Bool(true));

        let result = tool.execute(params).await;
        assert!(result.contains("\\t"));
    }

    #[tokio::test]
    async fn test_read_file_missing() {
        let tool = ReadFileTool;
        let params = make_params(&[("path", "/tmp/qwen_agent_missing_file_xyz.txt")]);
        let result = tool.execute(params).await;
        assert!(result.starts_with("Error: File not found"));
    }

    #[tokio::test]
    async fn test_read_file_missing_param() {
        let tool = ReadFileTool;
        let result = tool.execute(HashMap::new()).await;
        assert!(result.contains("'path' parameter is required"));
    }

    // -----------------------------------------------------------------------
    // WriteFileTool / AppendFileTool tests
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_write_file_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let file_path = dir.path().join("subdir").join("nested").join("file.txt");

        let tool = WriteFileTool;
        let params = make_params(&[
            ("path", file_path.to_str().unwrap()),
            ("content", "nested content"),
        ]);
        let result = tool.execute(params).await;
        assert!(result.starts_with("Successfully wrote"));
        assert!(file_path.exists());
    }

    #[tokio::test]
    async fn test_append_file() {
        let dir = TempDir::new().unwrap();
        let file_path = dir.path().join("log.txt");
        std::fs::write(&file_path, "first\n").unwrap();

        let tool = AppendFileTool;
        let params = make_params(&[
            ("path", file_path.to_str().unwrap()),
            ("content", "second\n"),
        ]);
        let result = tool.execute(params).await;
        assert!(result.starts_with("Successfully appended"));
        assert_eq!(
            std::fs::read_to_string(&file_path).unwrap(),
            "first\nsecond\n"
        );
    }

    #[tokio::test]
    async fn test_append_file_requires_existing() {
        let dir = TempDir::new().unwrap();
        let file_path = dir.path().join("missing.txt");

        let tool = AppendFileTool;
        let params = make_params(&[("path", file_path.to_str().unwrap()), ("content", "x")]);
        let result = tool.execute(params).await;
        assert!(result.starts_with("Error: File not found"));
    }

    // -----------------------------------------------------------------------
    // EditFileTool tests
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_edit_file_replace_once() {
        let dir = TempDir::new().unwrap();
        let file_path = dir.path().join("edit_me.txt");
        std::fs::write(&file_path, "Hello World! This is a test.").unwrap();

        let tool = EditFileTool;
        let params = make_params(&[
            ("path", file_path.to_str().unwrap()),
            ("old_text", "World"),
            ("new_text", "Rust"),
        ]);
        let result = tool.execute(params).await;
        assert!(result.starts_with("Successfully edited"));
        assert!(result.contains("- World"));
        assert!(result.contains("+ Rust"));
        assert_eq!(
            std::fs::read_to_string(&file_path).unwrap(),
            "Hello Rust! This is a test."
        );
    }

    #[tokio::test]
    async fn test_edit_file_dry_run_leaves_file() {
        let dir = TempDir::new().unwrap();
        let file_path = dir.path().join("dry.txt");
        std::fs::write(&file_path, "keep me").unwrap();

        let tool = EditFileTool;
        let mut params = make_params(&[
            ("path", file_path.to_str().unwrap()),
            ("old_text", "keep"),
            ("new_text", "change"),
        ]);
        params.insert("dry_run".into(), serde_json::Value::Bool(true));

        let result = tool.execute(params).await;
        assert!(result.starts_with("Dry run"));
        assert_eq!(std::fs::read_to_string(&file_path).unwrap(), "keep me");
    }

    #[tokio::test]
    async fn test_edit_file_multiple_occurrences() {
        let dir = TempDir::new().unwrap();
        let file_path = dir.path().join("dup.txt");
        std::fs::write(&file_path, "aaa bbb aaa").unwrap();

        let tool = EditFileTool;
        let params = make_params(&[
            ("path", file_path.to_str().unwrap()),
            ("old_text", "aaa"),
            ("new_text", "ccc"),
        ]);
        let result = tool.execute(params).await;
        assert!(result.contains("appears 2 times"));
    }

    #[tokio::test]
    async fn test_edit_file_old_text_not_found() {
        let dir = TempDir::new().unwrap();
        let file_path = dir.path().join("edit_me.txt");
        std::fs::write(&file_path, "Hello World!").unwrap();

        let tool = EditFileTool;
        let params = make_params(&[
            ("path", file_path.to_str().unwrap()),
            ("old_text", "nonexistent text"),
            ("new_text", "replacement"),
        ]);
        let result = tool.execute(params).await;
        assert!(result.contains("old_text not found"));
    }

    // -----------------------------------------------------------------------
    // Directory tools tests
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_create_and_list_directory() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("a").join("b");

        let create = CreateDirectoryTool;
        let result = create
            .execute(make_params(&[("path", sub.to_str().unwrap())]))
            .await;
        assert!(result.starts_with("Successfully created"));

        std::fs::write(dir.path().join("file.txt"), "").unwrap();
        let list = ListDirectoryTool;
        let result = list
            .execute(make_params(&[("path", dir.path().to_str().unwrap())]))
            .await;
        assert!(result.contains("[dir]  a"));
        assert!(result.contains("[file] file.txt"));
    }

    #[tokio::test]
    async fn test_list_directory_defaults_to_cwd() {
        let tool = ListDirectoryTool;
        let result = tool.execute(HashMap::new()).await;
        // Whatever the cwd holds, this must not be a parameter error.
        assert!(!result.contains("parameter is required"));
    }

    #[tokio::test]
    async fn test_copy_and_remove_file() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src.txt");
        let dst = dir.path().join("dst.txt");
        std::fs::write(&src, "payload").unwrap();

        let copy = CopyFileTool;
        let result = copy
            .execute(make_params(&[
                ("source", src.to_str().unwrap()),
                ("destination", dst.to_str().unwrap()),
            ]))
            .await;
        assert!(result.starts_with("Successfully copied"));
        assert_eq!(std::fs::read_to_string(&dst).unwrap(), "payload");

        let remove = RemoveFileTool;
        let result = remove
            .execute(make_params(&[("path", dst.to_str().unwrap())]))
            .await;
        assert!(result.starts_with("Successfully removed"));
        assert!(!dst.exists());
    }

    #[tokio::test]
    async fn test_copy_directory_recursive() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("tree");
        std::fs::create_dir_all(src.join("nested")).unwrap();
        std::fs::write(src.join("top.txt"), "1").unwrap();
        std::fs::write(src.join("nested").join("deep.txt"), "2").unwrap();

        let dst = dir.path().join("copy");
        let tool = CopyDirectoryTool;
        let result = tool
            .execute(make_params(&[
                ("source", src.to_str().unwrap()),
                ("destination", dst.to_str().unwrap()),
            ]))
            .await;
        assert!(result.contains("2 files"));
        assert_eq!(
            std::fs::read_to_string(dst.join("nested").join("deep.txt")).unwrap(),
            "2"
        );
    }

    #[tokio::test]
    async fn test_remove_directory() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("doomed");
        std::fs::create_dir(&sub).unwrap();
        std::fs::write(sub.join("f.txt"), "x").unwrap();

        let tool = RemoveDirectoryTool;
        let result = tool
            .execute(make_params(&[("path", sub.to_str().unwrap())]))
            .await;
        assert!(result.starts_with("Successfully removed"));
        assert!(!sub.exists());
    }
}

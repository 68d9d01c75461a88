//! Version-control tools backed by the `git` command-line client.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::process::Command;

use super::base::Tool;

/// Hard ceiling on any single git invocation.
const GIT_TIMEOUT_SECS: u64 = 60;

/// Unit separator used in `--pretty` formats so commit fields can be split
/// without colliding with message content.
const FIELD_SEP: char = '\u{1f}';

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn str_arg<'a>(params: &'a HashMap<String, serde_json::Value>, key: &str) -> Option<&'a str> {
    params.get(key).and_then(|v| v.as_str())
}

/// Run git with `args` in `repo_path` (or the working directory) and return
/// trimmed stdout. Non-zero exit or timeout becomes an `Err` string.
async fn run_git(args: &[&str], repo_path: Option<&str>) -> Result<String, String> {
    let mut cmd = Command::new("git");
    cmd.args(args);
    if let Some(path) = repo_path {
        cmd.current_dir(path);
    }
    cmd.kill_on_drop(true);

    let output = match tokio::time::timeout(
        Duration::from_secs(GIT_TIMEOUT_SECS),
        cmd.output(),
    )
    .await
    {
        Ok(Ok(out)) => out,
        Ok(Err(e)) => return Err(format!("failed to run git: {}", e)),
        Err(_) => {
            return Err(format!(
                "git {} timed out after {} seconds",
                args.first().unwrap_or(&""),
                GIT_TIMEOUT_SECS
            ))
        }
    };

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Err(if stderr.is_empty() { stdout } else { stderr })
    }
}

fn repo_path_schema() -> serde_json::Value {
    json!({
        "type": "string",
        "description": "The path to the git repository (defaults to current directory)"
    })
}

// ---------------------------------------------------------------------------
// GitCloneTool
// ---------------------------------------------------------------------------

/// Clone a repository over HTTPS.
pub struct GitCloneTool;

#[async_trait]
impl Tool for GitCloneTool {
    fn name(&self) -> &str {
        "git_clone"
    }

    fn description(&self) -> &str {
        "Clone a git repository using HTTPS"
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "repo_url": {
                    "type": "string",
                    "description": "The HTTPS URL of the repository to clone"
                },
                "target_path": {
                    "type": "string",
                    "description": "The path where to clone the repository"
                }
            },
            "required": ["repo_url"]
        })
    }

    fn returns(&self) -> &str {
        "String - confirmation message indicating success or failure"
    }

    async fn execute(&self, params: HashMap<String, serde_json::Value>) -> String {
        let repo_url = match str_arg(&params, "repo_url") {
            Some(u) => u,
            None => return "Error: 'repo_url' parameter is required".to_string(),
        };
        if !repo_url.starts_with("https://") {
            return "Error: Only HTTPS repository URLs are supported".to_string();
        }

        let mut args = vec!["clone", repo_url];
        if let Some(target) = str_arg(&params, "target_path") {
            args.push(target);
        }

        match run_git(&args, None).await {
            Ok(_) => format!("Successfully cloned {}", repo_url),
            Err(e) => format!("Error cloning repository: {}", e),
        }
    }
}

// ---------------------------------------------------------------------------
// GitCommitTool
// ---------------------------------------------------------------------------

/// Stage all changes and create a commit.
pub struct GitCommitTool;

#[async_trait]
impl Tool for GitCommitTool {
    fn name(&self) -> &str {
        "git_commit"
    }

    fn description(&self) -> &str {
        "Stage all changes and create a commit"
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "message": {
                    "type": "string",
                    "description": "The commit message"
                },
                "path": repo_path_schema()
            },
            "required": ["message"]
        })
    }

    fn returns(&self) -> &str {
        "String - confirmation message indicating success or failure"
    }

    async fn execute(&self, params: HashMap<String, serde_json::Value>) -> String {
        let message = match str_arg(&params, "message") {
            Some(m) => m,
            None => return "Error: 'message' parameter is required".to_string(),
        };
        let path = str_arg(&params, "path");

        if let Err(e) = run_git(&["add", "-A"], path).await {
            return format!("Error staging changes: {}", e);
        }

        match run_git(&["commit", "-m", message], path).await {
            Ok(out) => format!("Commit created.\n{}", out),
            Err(e) => format!("Error creating commit: {}", e),
        }
    }
}

// ---------------------------------------------------------------------------
// GitRestoreTool
// ---------------------------------------------------------------------------

/// Restore the repository or specific files to a previous state.
pub struct GitRestoreTool;

#[async_trait]
impl Tool for GitRestoreTool {
    fn name(&self) -> &str {
        "git_restore"
    }

    fn description(&self) -> &str {
        "Restore the repository or specific files to a previous state"
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "commit_hash": {
                    "type": "string",
                    "description": "The commit hash to restore to. If not provided, unstages all changes"
                },
                "path": repo_path_schema(),
                "files": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "List of specific files to restore. If not provided, restores everything"
                }
            }
        })
    }

    fn returns(&self) -> &str {
        "String - confirmation message indicating success or failure"
    }

    async fn execute(&self, params: HashMap<String, serde_json::Value>) -> String {
        let path = str_arg(&params, "path");
        let commit_hash = str_arg(&params, "commit_hash");
        let files: Vec<String> = params
            .get("files")
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default();

        let result = match commit_hash {
            None => {
                // No commit: unstage everything (or the named files).
                let mut args = vec!["reset".to_string(), "HEAD".to_string()];
                args.extend(files.iter().cloned());
                let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
                run_git(&arg_refs, path).await.map(|_| "Unstaged changes".to_string())
            }
            Some(hash) => {
                let mut args = vec!["checkout".to_string(), hash.to_string()];
                if !files.is_empty() {
                    args.push("--".to_string());
                    args.extend(files.iter().cloned());
                }
                let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
                run_git(&arg_refs, path)
                    .await
                    .map(|_| format!("Restored to {}", hash))
            }
        };

        match result {
            Ok(msg) => format!("Successfully restored: {}", msg),
            Err(e) => format!("Error restoring: {}", e),
        }
    }
}

// ---------------------------------------------------------------------------
// GitPushTool
// ---------------------------------------------------------------------------

/// Push commits to a remote.
pub struct GitPushTool;

#[async_trait]
impl Tool for GitPushTool {
    fn name(&self) -> &str {
        "git_push"
    }

    fn description(&self) -> &str {
        "Push commits to a remote repository"
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "remote": {
                    "type": "string",
                    "description": "The remote name (defaults to 'origin')"
                },
                "branch": {
                    "type": "string",
                    "description": "The branch name to push to (defaults to 'main')"
                },
                "path": repo_path_schema()
            }
        })
    }

    fn returns(&self) -> &str {
        "String - confirmation message indicating success or failure"
    }

    async fn execute(&self, params: HashMap<String, serde_json::Value>) -> String {
        let remote = str_arg(&params, "remote").unwrap_or("origin");
        let branch = str_arg(&params, "branch").unwrap_or("main");
        let path = str_arg(&params, "path");

        match run_git(&["push", remote, branch], path).await {
            Ok(_) => format!("Successfully pushed to {}/{}", remote, branch),
            Err(e) => format!("Error pushing: {}", e),
        }
    }
}

// ---------------------------------------------------------------------------
// GitLogTool
// ---------------------------------------------------------------------------

/// Commit history as JSON.
pub struct GitLogTool;

#[async_trait]
impl Tool for GitLogTool {
    fn name(&self) -> &str {
        "git_log"
    }

    fn description(&self) -> &str {
        "Get the commit history of the repository"
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "path": repo_path_schema(),
                "max_count": {
                    "type": "integer",
                    "description": "Maximum number of commits to return"
                },
                "since": {
                    "type": "string",
                    "description": "Get commits since this date (e.g., \"2024-01-01\" or \"1 week ago\")"
                }
            }
        })
    }

    fn returns(&self) -> &str {
        "String - JSON formatted commit history with hash, author, date, and message for each commit"
    }

    async fn execute(&self, params: HashMap<String, serde_json::Value>) -> String {
        let path = str_arg(&params, "path");
        let format = format!("--pretty=format:%H{0}%an{0}%ad{0}%s", FIELD_SEP);

        let mut args: Vec<String> = vec!["log".into(), format, "--date=iso".into()];
        if let Some(n) = params.get("max_count").and_then(|v| v.as_u64()) {
            args.push(format!("--max-count={}", n));
        }
        if let Some(since) = str_arg(&params, "since") {
            args.push(format!("--since={}", since));
        }

        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let out = match run_git(&arg_refs, path).await {
            Ok(o) => o,
            Err(e) => return format!("Error getting log: {}", e),
        };

        let commits: Vec<serde_json::Value> = out
            .lines()
            .filter(|l| !l.is_empty())
            .filter_map(|line| {
                let fields: Vec<&str> = line.split(FIELD_SEP).collect();
                if fields.len() == 4 {
                    Some(json!({
                        "hash": fields[0],
                        "author": fields[1],
                        "date": fields[2],
                        "message": fields[3],
                    }))
                } else {
                    None
                }
            })
            .collect();

        serde_json::to_string_pretty(&json!({ "commits": commits }))
            .unwrap_or_else(|e| format!("Error formatting log: {}", e))
    }
}

// ---------------------------------------------------------------------------
// GitShowTool
// ---------------------------------------------------------------------------

/// Details of one commit as JSON.
pub struct GitShowTool;

#[async_trait]
impl Tool for GitShowTool {
    fn name(&self) -> &str {
        "git_show"
    }

    fn description(&self) -> &str {
        "Get detailed information about a specific commit"
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "commit_hash": {
                    "type": "string",
                    "description": "The hash of the commit to inspect"
                },
                "path": repo_path_schema()
            },
            "required": ["commit_hash"]
        })
    }

    fn returns(&self) -> &str {
        "String - JSON formatted commit details including metadata and changed files"
    }

    async fn execute(&self, params: HashMap<String, serde_json::Value>) -> String {
        let commit_hash = match str_arg(&params, "commit_hash") {
            Some(h) => h,
            None => return "Error: 'commit_hash' parameter is required".to_string(),
        };
        let path = str_arg(&params, "path");

        let format = format!("--pretty=format:%H{0}%an{0}%ae{0}%ad{0}%B", FIELD_SEP);
        let meta = match run_git(
            &["show", "--no-patch", &format, "--date=iso", commit_hash],
            path,
        )
        .await
        {
            Ok(o) => o,
            Err(e) => return format!("Error showing commit: {}", e),
        };

        let fields: Vec<&str> = meta.splitn(5, FIELD_SEP).collect();
        if fields.len() != 5 {
            return format!("Error showing commit: unexpected git output: {}", meta);
        }

        let files = match run_git(
            &["show", "--name-status", "--pretty=format:", commit_hash],
            path,
        )
        .await
        {
            Ok(o) => o,
            Err(e) => return format!("Error listing changed files: {}", e),
        };

        let changed: Vec<serde_json::Value> = files
            .lines()
            .filter(|l| !l.trim().is_empty())
            .filter_map(|line| {
                let mut parts = line.splitn(2, '\t');
                let status = parts.next()?.trim();
                let file = parts.next()?.trim();
                Some(json!({"status": status, "file": file}))
            })
            .collect();

        serde_json::to_string_pretty(&json!({
            "hash": fields[0],
            "author": fields[1],
            "email": fields[2],
            "date": fields[3],
            "message": fields[4].trim(),
            "changed_files": changed,
        }))
        .unwrap_or_else(|e| format!("Error formatting commit: {}", e))
    }
}

// ---------------------------------------------------------------------------
// GitStatusTool
// ---------------------------------------------------------------------------

/// Repository status as JSON.
pub struct GitStatusTool;

#[async_trait]
impl Tool for GitStatusTool {
    fn name(&self) -> &str {
        "git_status"
    }

    fn description(&self) -> &str {
        "Get the current status of the repository"
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "path": repo_path_schema()
            }
        })
    }

    fn returns(&self) -> &str {
        "String - JSON formatted repository status including staged, unstaged, and untracked changes"
    }

    async fn execute(&self, params: HashMap<String, serde_json::Value>) -> String {
        let path = str_arg(&params, "path");

        let out = match run_git(&["status", "--porcelain"], path).await {
            Ok(o) => o,
            Err(e) => return format!("Error getting status: {}", e),
        };

        let branch = run_git(&["rev-parse", "--abbrev-ref", "HEAD"], path)
            .await
            .unwrap_or_else(|_| "unknown".to_string());

        let mut staged = Vec::new();
        let mut unstaged = Vec::new();
        let mut untracked = Vec::new();

        for line in out.lines() {
            if line.len() < 3 {
                continue;
            }
            let index_status = line.as_bytes()[0] as char;
            let worktree_status = line.as_bytes()[1] as char;
            let file = line[3..].to_string();

            if index_status == '?' && worktree_status == '?' {
                untracked.push(file);
                continue;
            }
            if index_status != ' ' {
                staged.push(json!({"status": index_status.to_string(), "file": file.clone()}));
            }
            if worktree_status != ' ' {
                unstaged.push(json!({"status": worktree_status.to_string(), "file": file}));
            }
        }

        serde_json::to_string_pretty(&json!({
            "branch": branch,
            "staged": staged,
            "unstaged": unstaged,
            "untracked": untracked,
            "clean": out.is_empty(),
        }))
        .unwrap_or_else(|e| format!("Error formatting status: {}", e))
    }
}

// ---------------------------------------------------------------------------
// GitDiffTool
// ---------------------------------------------------------------------------

/// Maximum diff text carried in the JSON response.
const MAX_DIFF_CHARS: usize = 20_000;

/// Differences between commits, the index, or the working tree, as JSON.
pub struct GitDiffTool;

#[async_trait]
impl Tool for GitDiffTool {
    fn name(&self) -> &str {
        "git_diff"
    }

    fn description(&self) -> &str {
        "Get the differences between commits, staged changes, or working directory"
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "path": repo_path_schema(),
                "commit1": {
                    "type": "string",
                    "description": "First commit hash for comparison"
                },
                "commit2": {
                    "type": "string",
                    "description": "Second commit hash for comparison"
                },
                "staged": {
                    "type": "boolean",
                    "description": "If true, show staged changes (ignored if commits are specified)"
                },
                "file_path": {
                    "type": "string",
                    "description": "Path to specific file to diff"
                }
            }
        })
    }

    fn returns(&self) -> &str {
        "String - JSON formatted diff information with a summary (files changed, additions/deletions) and the patch text"
    }

    async fn execute(&self, params: HashMap<String, serde_json::Value>) -> String {
        let path = str_arg(&params, "path");
        let staged = params
            .get("staged")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);

        let mut selector: Vec<String> = Vec::new();
        match (str_arg(&params, "commit1"), str_arg(&params, "commit2")) {
            (Some(c1), Some(c2)) => {
                selector.push(c1.to_string());
                selector.push(c2.to_string());
            }
            (Some(c1), None) => selector.push(c1.to_string()),
            _ => {
                if staged {
                    selector.push("--cached".to_string());
                }
            }
        }
        if let Some(file) = str_arg(&params, "file_path") {
            selector.push("--".to_string());
            selector.push(file.to_string());
        }

        let mut numstat_args = vec!["diff".to_string(), "--numstat".to_string()];
        numstat_args.extend(selector.iter().cloned());
        let arg_refs: Vec<&str> = numstat_args.iter().map(String::as_str).collect();
        let numstat = match run_git(&arg_refs, path).await {
            Ok(o) => o,
            Err(e) => return format!("Error getting diff: {}", e),
        };

        let mut additions = 0u64;
        let mut deletions = 0u64;
        let mut files = Vec::new();
        for line in numstat.lines() {
            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() != 3 {
                continue;
            }
            let add = fields[0].parse::<u64>().unwrap_or(0);
            let del = fields[1].parse::<u64>().unwrap_or(0);
            additions += add;
            deletions += del;
            files.push(json!({
                "file": fields[2],
                "additions": add,
                "deletions": del,
            }));
        }

        let mut patch_args = vec!["diff".to_string()];
        patch_args.extend(selector.iter().cloned());
        let arg_refs: Vec<&str> = patch_args.iter().map(String::as_str).collect();
        let mut patch = match run_git(&arg_refs, path).await {
            Ok(o) => o,
            Err(e) => return format!("Error getting diff: {}", e),
        };
        if patch.len() > MAX_DIFF_CHARS {
            patch.truncate(MAX_DIFF_CHARS);
            patch.push_str("\n...[truncated]");
        }

        serde_json::to_string_pretty(&json!({
            "summary": {
                "files_changed": files.len(),
                "additions": additions,
                "deletions": deletions,
            },
            "files": files,
            "patch": patch,
        }))
        .unwrap_or_else(|e| format!("Error formatting diff: {}", e))
    }
}

//! # File System Tools
//!
//! `read_file`, `write_file` and `list_directory`, confined to the roots
//! listed in the group's `allowedPaths`.
//!
//! Paths are normalised lexically before the root check, so `..` cannot
//! climb out of a root. Relative paths resolve against the first root.
//! Symlinks inside a root are followed as-is.

use async_trait::async_trait;
use capstan_core::tool::required_str;
use capstan_core::{ApprovalRequest, ExtensionError, ExtensionResult, Tool, ToolExecutionContext};
use serde_json::{Value, json};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::fs;

#[derive(Debug, thiserror::Error)]
pub enum PathPolicyError {
    #[error("allowedPaths must list at least one directory")]
    NoRoots,

    #[error("cannot resolve relative root '{root}': {source}")]
    CurrentDir {
        root: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Lexical `.`/`..` resolution. Never touches the filesystem.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // Popping past the root is a no-op, as on a real filesystem.
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// The set of directory trees the filesystem tools may touch.
#[derive(Debug, Clone)]
pub struct PathPolicy {
    roots: Vec<PathBuf>,
}

impl PathPolicy {
    pub fn new<P: AsRef<Path>>(allowed: &[P]) -> Result<Self, PathPolicyError> {
        if allowed.is_empty() {
            return Err(PathPolicyError::NoRoots);
        }
        let mut roots = Vec::with_capacity(allowed.len());
        for root in allowed {
            let root = root.as_ref();
            let absolute = if root.is_absolute() {
                root.to_path_buf()
            } else {
                std::env::current_dir()
                    .map_err(|source| PathPolicyError::CurrentDir {
                        root: root.to_path_buf(),
                        source,
                    })?
                    .join(root)
            };
            roots.push(normalize(&absolute));
        }
        Ok(Self { roots })
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Resolve `requested` and check it lies under one of the roots.
    pub fn resolve(&self, tool: &str, requested: &str) -> ExtensionResult<PathBuf> {
        let requested_path = Path::new(requested);
        let joined = if requested_path.is_absolute() {
            requested_path.to_path_buf()
        } else {
            self.roots[0].join(requested_path)
        };
        let resolved = normalize(&joined);
        if self.roots.iter().any(|root| resolved.starts_with(root)) {
            Ok(resolved)
        } else {
            tracing::warn!(tool, path = requested, "Path outside allowed roots");
            Err(ExtensionError::denied(
                tool,
                format!("access '{requested}' outside allowedPaths"),
            ))
        }
    }
}

fn io_failure(tool: &str, path: &Path, err: std::io::Error) -> ExtensionError {
    let reason = match err.kind() {
        ErrorKind::NotFound => format!("'{}' not found", path.display()),
        _ => format!("'{}': {err}", path.display()),
    };
    ExtensionError::failed(tool, reason)
}

fn path_schema(extra: Value) -> Value {
    let mut schema = json!({
        "type": "object",
        "properties": { "path": { "type": "string" } },
        "required": ["path"]
    });
    if let (Some(properties), Value::Object(extra)) = (schema["properties"].as_object_mut(), extra)
    {
        properties.extend(extra);
    }
    schema
}

pub struct ReadFileTool {
    policy: Arc<PathPolicy>,
}

impl ReadFileTool {
    pub fn new(policy: Arc<PathPolicy>) -> Self {
        Self { policy }
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read a UTF-8 text file"
    }

    fn input_schema(&self) -> Value {
        path_schema(json!({}))
    }

    async fn execute(&self, input: Value, ctx: &ToolExecutionContext) -> ExtensionResult<Value> {
        let requested = required_str(self.name(), &input, "path")?;
        let path = self.policy.resolve(self.name(), requested)?;
        let content = fs::read_to_string(&path)
            .await
            .map_err(|e| io_failure(self.name(), &path, e))?;
        ctx.logger
            .debug(&format!("read_file {} ({} bytes)", path.display(), content.len()));

        Ok(json!({
            "path": path.display().to_string(),
            "content": content,
            "size": content.len(),
        }))
    }
}

pub struct WriteFileTool {
    policy: Arc<PathPolicy>,
    require_approval: bool,
}

impl WriteFileTool {
    pub fn new(policy: Arc<PathPolicy>, require_approval: bool) -> Self {
        Self {
            policy,
            require_approval,
        }
    }

    async fn approve(&self, path: &Path, input: &Value, ctx: &ToolExecutionContext) -> ExtensionResult<()> {
        if !self.require_approval {
            return Ok(());
        }
        let decision = ctx
            .services
            .approval
            .request_approval(ApprovalRequest {
                tool_name: self.name().to_string(),
                summary: format!("write {}", path.display()),
                arguments: input.clone(),
            })
            .await?;
        match decision {
            capstan_core::ApprovalDecision::Approved => Ok(()),
            capstan_core::ApprovalDecision::Denied { reason } => Err(ExtensionError::denied(
                self.name(),
                format!("write '{}' ({reason})", path.display()),
            )),
        }
    }
}

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Write text to a file, optionally creating parent directories"
    }

    fn input_schema(&self) -> Value {
        let mut schema = path_schema(json!({
            "content": { "type": "string" },
            "createDirs": { "type": "boolean" }
        }));
        schema["required"] = json!(["path", "content"]);
        schema
    }

    async fn execute(&self, input: Value, ctx: &ToolExecutionContext) -> ExtensionResult<Value> {
        let requested = required_str(self.name(), &input, "path")?;
        let content = required_str(self.name(), &input, "content")?;
        let create_dirs = input
            .get("createDirs")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let path = self.policy.resolve(self.name(), requested)?;
        self.approve(&path, &input, ctx).await?;

        if create_dirs && let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| io_failure(self.name(), parent, e))?;
        }
        fs::write(&path, content)
            .await
            .map_err(|e| io_failure(self.name(), &path, e))?;
        ctx.logger
            .info(&format!("write_file {} ({} bytes)", path.display(), content.len()));

        Ok(json!({
            "path": path.display().to_string(),
            "bytes": content.len(),
        }))
    }
}

pub struct ListDirectoryTool {
    policy: Arc<PathPolicy>,
}

impl ListDirectoryTool {
    pub fn new(policy: Arc<PathPolicy>) -> Self {
        Self { policy }
    }
}

#[async_trait]
impl Tool for ListDirectoryTool {
    fn name(&self) -> &str {
        "list_directory"
    }

    fn description(&self) -> &str {
        "List the entries of a directory, sorted by name"
    }

    fn input_schema(&self) -> Value {
        path_schema(json!({}))
    }

    async fn execute(&self, input: Value, _ctx: &ToolExecutionContext) -> ExtensionResult<Value> {
        let requested = required_str(self.name(), &input, "path")?;
        let path = self.policy.resolve(self.name(), requested)?;
        let mut reader = fs::read_dir(&path)
            .await
            .map_err(|e| io_failure(self.name(), &path, e))?;

        let mut entries = Vec::new();
        while let Some(entry) = reader
            .next_entry()
            .await
            .map_err(|e| io_failure(self.name(), &path, e))?
        {
            let metadata = entry
                .metadata()
                .await
                .map_err(|e| io_failure(self.name(), &entry.path(), e))?;
            entries.push(json!({
                "name": entry.file_name().to_string_lossy(),
                "kind": if metadata.is_dir() { "directory" } else { "file" },
                "size": metadata.len(),
            }));
        }
        entries.sort_by(|a, b| a["name"].as_str().cmp(&b["name"].as_str()));

        Ok(json!({
            "path": path.display().to_string(),
            "count": entries.len(),
            "entries": entries,
        }))
    }
}

/// The three filesystem tools sharing one policy.
pub fn filesystem_tools(policy: PathPolicy, require_write_approval: bool) -> Vec<Arc<dyn Tool>> {
    let policy = Arc::new(policy);
    vec![
        Arc::new(ReadFileTool::new(policy.clone())),
        Arc::new(WriteFileTool::new(policy.clone(), require_write_approval)),
        Arc::new(ListDirectoryTool::new(policy)),
    ]
}

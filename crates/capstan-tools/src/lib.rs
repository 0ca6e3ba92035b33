//! # Capstan Tools
//!
//! Reference tool groups. Each group is a single configuration entry that
//! fans out into several tools:
//!
//! - **`filesystem-tools`**: `read_file`, `write_file`, `list_directory`
//!   confined to `allowedPaths`
//! - **`text-tools`**: `text_uppercase`, `text_reverse`, `text_split`
//! - **`kv-tools`**: `kv_get`, `kv_set`, `kv_delete` over the context database
//!
//! ## Usage
//!
//! ```rust
//! use capstan_resolver::{Factory, ToolFactory};
//! use capstan_tools::text_tools_factory;
//! use serde_json::json;
//!
//! let factory = text_tools_factory();
//! let options = factory.config_schema().validate(&json!({ "type": "text-tools" })).unwrap();
//! let tools = factory.create(options).unwrap();
//! assert_eq!(tools[0].name(), "text_uppercase");
//! ```

pub mod factories;
pub mod filesystem;
pub mod kv;
pub mod text;

pub use factories::{
    FilesystemToolsConfig, KvToolsConfig, TextToolsConfig, filesystem_tools_factory,
    kv_tools_factory, text_tools_factory,
};
pub use filesystem::{
    ListDirectoryTool, PathPolicy, PathPolicyError, ReadFileTool, WriteFileTool, filesystem_tools,
};
pub use kv::{KvDeleteTool, KvGetTool, KvSetTool, kv_tools};
pub use text::{TextReverseTool, TextSplitTool, TextUppercaseTool, text_tools};

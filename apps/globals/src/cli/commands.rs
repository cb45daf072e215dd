//! CLI command implementations.
//!
//! Every command returns the text it wants printed so the binary and the
//! integration tests share one code path.

use crate::config::Settings;
use globals_core::formats::zwr;
use globals_core::{GlobalsError, Node, Store, export_node, import_into};
use std::path::{Path, PathBuf};

/// Maximum size of a ZWRITE file accepted by `load` (64 MiB).
const MAX_LOAD_FILE_SIZE: u64 = 64 * 1024 * 1024;

/// Maximum size of a snapshot accepted by `import` (500 MiB).
const MAX_IMPORT_FILE_SIZE: u64 = 500 * 1024 * 1024;

/// What every command runs against.
#[derive(Debug)]
pub struct Context<'a> {
    pub store: &'a Store,
    pub settings: &'a Settings,
    pub json_mode: bool,
    pub quiet: bool,
}

impl Context<'_> {
    fn node(&self, reference: &str) -> Result<Node<&Store>, GlobalsError> {
        let (name, path) = zwr::parse_reference(reference)?;
        Node::new(self.store, name, path)
    }

    /// Confirmation line of a writing command; empty when quiet.
    fn confirm(&self, json: serde_json::Value, text: String) -> String {
        if self.json_mode {
            render_json(&json)
        } else if self.quiet {
            String::new()
        } else {
            text
        }
    }
}

fn render_json(value: &serde_json::Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

/// Validate an input file path and its size.
fn validate_input_file(path: &Path, max_size: u64) -> Result<PathBuf, GlobalsError> {
    let canonical = path.canonicalize().map_err(|e| {
        GlobalsError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    let metadata = std::fs::metadata(&canonical)
        .map_err(|e| GlobalsError::IoError(format!("Cannot read file metadata: {}", e)))?;
    if !metadata.is_file() {
        return Err(GlobalsError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }
    if metadata.len() > max_size {
        return Err(GlobalsError::IoError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(canonical)
}

/// Validate that an output file's directory exists.
fn validate_output_path(path: &Path) -> Result<PathBuf, GlobalsError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let canonical_parent = parent.canonicalize().map_err(|e| {
        GlobalsError::IoError(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;
    if !canonical_parent.is_dir() {
        return Err(GlobalsError::IoError(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| GlobalsError::IoError("Output path has no filename".to_string()))?;
    Ok(canonical_parent.join(filename))
}

// =============================================================================
// VALUE COMMANDS
// =============================================================================

pub fn cmd_get(ctx: &Context<'_>, reference: &str) -> Result<String, GlobalsError> {
    let node = ctx.node(reference)?;
    let value = node.read()?;

    if ctx.json_mode {
        return Ok(render_json(&serde_json::json!({
            "name": node.name(),
            "path": node.path(),
            "value": value,
        })));
    }
    Ok(value)
}

pub fn cmd_set(ctx: &Context<'_>, reference: &str, value: &str) -> Result<String, GlobalsError> {
    let node = ctx.node(reference)?;
    node.with_lock(ctx.settings.lock_timeout, || node.write(value))??;
    tracing::info!(node = %node, bytes = value.len(), "set");

    Ok(ctx.confirm(
        serde_json::json!({ "set": node.to_string() }),
        format!("Set {}", node),
    ))
}

pub fn cmd_delete(ctx: &Context<'_>, reference: &str) -> Result<String, GlobalsError> {
    let node = ctx.node(reference)?;
    node.with_lock(ctx.settings.lock_timeout, || node.delete_value())??;
    tracing::info!(node = %node, "deleted value");

    Ok(ctx.confirm(
        serde_json::json!({ "deleted": node.to_string() }),
        format!("Deleted value of {}", node),
    ))
}

pub fn cmd_kill(ctx: &Context<'_>, reference: &str) -> Result<String, GlobalsError> {
    let node = ctx.node(reference)?;
    node.with_lock(ctx.settings.lock_timeout, || node.kill())??;
    tracing::info!(node = %node, "killed subtree");

    Ok(ctx.confirm(
        serde_json::json!({ "killed": node.to_string() }),
        format!("Killed {}", node),
    ))
}

// =============================================================================
// INSPECTION COMMANDS
// =============================================================================

pub fn cmd_data(ctx: &Context<'_>, reference: &str) -> Result<String, GlobalsError> {
    let node = ctx.node(reference)?;
    let status = node.data_status()?;

    if ctx.json_mode {
        return Ok(render_json(&serde_json::json!({
            "data": status.code(),
            "has_value": status.has_value(),
            "has_children": status.has_children(),
        })));
    }
    Ok(status.to_string())
}

pub fn cmd_children(ctx: &Context<'_>, reference: &str) -> Result<String, GlobalsError> {
    let node = ctx.node(reference)?;
    let mut paths = Vec::new();
    for suffix in node.iter() {
        let mut full = node.path().to_vec();
        full.extend(suffix?);
        paths.push(full);
    }
    tracing::debug!(node = %node, count = paths.len(), "listed descendants");

    if ctx.json_mode {
        return Ok(render_json(&serde_json::json!(paths)));
    }
    let lines: Vec<String> = paths
        .iter()
        .map(|p| zwr::format_reference(node.name(), p))
        .collect();
    Ok(lines.join("\n"))
}

pub fn cmd_subscripts(ctx: &Context<'_>, reference: &str) -> Result<String, GlobalsError> {
    let node = ctx.node(reference)?;
    let subscripts = node.subscripts().collect::<Result<Vec<String>, _>>()?;

    if ctx.json_mode {
        return Ok(render_json(&serde_json::json!(subscripts)));
    }
    Ok(subscripts.join("\n"))
}

pub fn cmd_count(ctx: &Context<'_>, reference: &str) -> Result<String, GlobalsError> {
    let node = ctx.node(reference)?;
    let count = node.len()?;

    if ctx.json_mode {
        return Ok(render_json(&serde_json::json!({ "count": count })));
    }
    Ok(count.to_string())
}

pub fn cmd_status(ctx: &Context<'_>) -> Result<String, GlobalsError> {
    let node_count = ctx.store.node_count()?;
    let globals = ctx.store.global_names()?;

    if ctx.json_mode {
        return Ok(render_json(&serde_json::json!({
            "database": ctx.settings.database.to_string_lossy(),
            "backend": ctx.store.backend_name(),
            "persistent": ctx.store.is_persistent(),
            "node_count": node_count,
            "globals": globals,
        })));
    }

    let mut out = String::new();
    out.push_str("=== Store Status ===\n");
    out.push_str(&format!("Database: {}\n", ctx.settings.database.display()));
    out.push_str(&format!("Backend:  {}\n", ctx.store.backend_name()));
    out.push_str(&format!("Values:   {}\n", node_count));
    out.push_str(&format!("Globals:  {}", globals.len()));
    for name in &globals {
        out.push_str(&format!("\n  {}", name));
    }
    Ok(out)
}

// =============================================================================
// TEXT DUMP COMMANDS
// =============================================================================

pub fn cmd_zwrite(ctx: &Context<'_>, reference: &str) -> Result<String, GlobalsError> {
    let node = ctx.node(reference)?;
    let lines = zwr::zwrite(&node)?;
    tracing::debug!(node = %node, lines = lines.len(), "zwrite");

    if ctx.json_mode {
        return Ok(render_json(&serde_json::json!(lines)));
    }
    Ok(lines.join("\n"))
}

pub fn cmd_load(ctx: &Context<'_>, input: &Path) -> Result<String, GlobalsError> {
    tracing::info!("Loading ZWRITE text from {:?}", input);

    let validated = validate_input_file(input, MAX_LOAD_FILE_SIZE)?;
    let text = std::fs::read_to_string(&validated)
        .map_err(|e| GlobalsError::IoError(format!("Read file: {}", e)))?;
    let written = zwr::load(ctx.store, &text)?;

    Ok(ctx.confirm(
        serde_json::json!({ "loaded": written }),
        format!("Loaded {} values", written),
    ))
}

// =============================================================================
// SNAPSHOT COMMANDS
// =============================================================================

pub fn cmd_export(
    ctx: &Context<'_>,
    reference: &str,
    output: &Path,
) -> Result<String, GlobalsError> {
    let node = ctx.node(reference)?;
    let validated = validate_output_path(output)?;

    let bytes = export_node(&node)?;
    std::fs::write(&validated, &bytes)
        .map_err(|e| GlobalsError::IoError(format!("Write file: {}", e)))?;
    tracing::info!(node = %node, bytes = bytes.len(), "exported snapshot to {:?}", validated);

    Ok(ctx.confirm(
        serde_json::json!({ "exported": node.to_string(), "bytes": bytes.len() }),
        format!("Exported {} ({} bytes) to {:?}", node, bytes.len(), validated),
    ))
}

pub fn cmd_import(ctx: &Context<'_>, reference: &str, input: &Path) -> Result<String, GlobalsError> {
    let node = ctx.node(reference)?;
    let validated = validate_input_file(input, MAX_IMPORT_FILE_SIZE)?;

    let bytes = std::fs::read(&validated)
        .map_err(|e| GlobalsError::IoError(format!("Read file: {}", e)))?;
    let written = node.with_lock(ctx.settings.lock_timeout, || import_into(&node, &bytes))??;
    tracing::info!(node = %node, values = written, "imported snapshot");

    Ok(ctx.confirm(
        serde_json::json!({ "imported": written, "into": node.to_string() }),
        format!("Imported {} values into {}", written, node),
    ))
}

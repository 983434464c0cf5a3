//! Reading resource payloads from files or stdin

use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context, Result};
use couchstate_core::LogicalResource;
use serde_json::Value;

/// Read JSON for `resource` from `file` (or stdin) and check its shape
pub fn read(resource: LogicalResource, file: Option<&Path>) -> Result<Value> {
    let content = match file {
        Some(path) => {
            tracing::debug!("Reading {resource} from {}", path.display());
            std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?
        }
        None => {
            let mut content = String::new();
            std::io::stdin()
                .read_to_string(&mut content)
                .context("Failed to read stdin")?;
            content
        }
    };

    parse(resource, &content)
}

fn parse(resource: LogicalResource, content: &str) -> Result<Value> {
    let value: Value =
        serde_json::from_str(content).with_context(|| format!("Invalid JSON for {resource}"))?;

    if !resource.accepts(&value) {
        let expected = match resource {
            LogicalResource::Flows => "an array",
            LogicalResource::Credentials | LogicalResource::Settings => "an object",
        };
        bail!("{resource} must be {expected}");
    }

    Ok(value)
}

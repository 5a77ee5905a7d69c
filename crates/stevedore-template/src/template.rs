//! The host CloudFormation template that synthesized graphs are merged into.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::graph::InfrastructureGraph;

const FORMAT_VERSION: &str = "2010-09-09";

#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("failed to read template {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse template {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("template {path} is not a JSON object")]
    NotAnObject { path: PathBuf },

    #[error("template section '{section}' is not a JSON object")]
    InvalidSection { section: &'static str },

    #[error("failed to serialize template")]
    Serialize(#[source] serde_json::Error),

    #[error("{section} entry '{name}' already exists in the template with different content")]
    Conflict { section: &'static str, name: String },

    #[error("failed to write template {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A CloudFormation template document.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    root: Map<String, Value>,
}

impl Template {
    /// A template with only a format version.
    pub fn empty() -> Self {
        let mut root = Map::new();
        root.insert(
            "AWSTemplateFormatVersion".to_owned(),
            Value::String(FORMAT_VERSION.to_owned()),
        );
        Self { root }
    }

    pub fn load(path: &Path) -> Result<Self, TemplateError> {
        let content = std::fs::read_to_string(path).map_err(|e| TemplateError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        let value: Value = serde_json::from_str(&content).map_err(|e| TemplateError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;

        match value {
            Value::Object(root) => Ok(Self { root }),
            _ => Err(TemplateError::NotAnObject {
                path: path.to_path_buf(),
            }),
        }
    }

    /// Merge every resource and output of `graph`.
    ///
    /// Entries already present with identical content are left alone. On
    /// conflict the template is unchanged.
    pub fn merge_graph(&mut self, graph: &InfrastructureGraph) -> Result<(), TemplateError> {
        let mut pending = Vec::with_capacity(graph.len());
        for (name, resource) in graph.resources() {
            let value = serde_json::to_value(resource).map_err(TemplateError::Serialize)?;
            pending.push(("Resources", name, value));
        }
        for (name, output) in graph.outputs() {
            let value = serde_json::to_value(output).map_err(TemplateError::Serialize)?;
            pending.push(("Outputs", name, value));
        }

        for &(section, name, ref value) in &pending {
            self.check(section, name, value)?;
        }

        let mut merged = 0usize;
        for (section, name, value) in pending {
            let entries = self.section_mut(section)?;
            if !entries.contains_key(name) {
                entries.insert(name.to_owned(), value);
                merged += 1;
            }
        }

        tracing::debug!(merged, total = graph.len(), "merged graph into template");
        Ok(())
    }

    pub fn resource(&self, name: &str) -> Option<&Value> {
        self.root.get("Resources").and_then(|r| r.get(name))
    }

    pub fn output(&self, name: &str) -> Option<&Value> {
        self.root.get("Outputs").and_then(|o| o.get(name))
    }

    pub fn as_json(&self) -> &Map<String, Value> {
        &self.root
    }

    pub fn to_string_pretty(&self) -> Result<String, TemplateError> {
        serde_json::to_string_pretty(&self.root).map_err(TemplateError::Serialize)
    }

    pub fn write(&self, path: &Path) -> Result<(), TemplateError> {
        let mut content = self.to_string_pretty()?;
        content.push('\n');

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| TemplateError::Write {
                path: path.to_path_buf(),
                source: e,
            })?;
        }
        std::fs::write(path, content).map_err(|e| TemplateError::Write {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Fails when `name` exists in `section` with different content.
    fn check(&self, section: &'static str, name: &str, value: &Value) -> Result<(), TemplateError> {
        let existing = match self.root.get(section) {
            None => return Ok(()),
            Some(Value::Object(entries)) => entries.get(name),
            Some(_) => return Err(TemplateError::InvalidSection { section }),
        };
        match existing {
            Some(existing) if existing != value => Err(TemplateError::Conflict {
                section,
                name: name.to_owned(),
            }),
            _ => Ok(()),
        }
    }

    fn section_mut(&mut self, section: &'static str) -> Result<&mut Map<String, Value>, TemplateError> {
        self.root
            .entry(section)
            .or_insert_with(|| Value::Object(Map::new()))
            .as_object_mut()
            .ok_or(TemplateError::InvalidSection { section })
    }
}

impl Default for Template {
    fn default() -> Self {
        Self::empty()
    }
}

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::fragment::{Fragment, FragmentClass, Output, Resource};

/// Accumulated resources and outputs of one synthesis pass.
///
/// Merging is additive. Re-merging an identical fragment is a no-op;
/// merging different content under an existing name is rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InfrastructureGraph {
    #[serde(rename = "Resources")]
    resources: BTreeMap<String, Resource>,
    #[serde(rename = "Outputs", skip_serializing_if = "BTreeMap::is_empty")]
    outputs: BTreeMap<String, Output>,
    #[serde(skip)]
    methods: BTreeSet<String>,
}

impl InfrastructureGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn merge(&mut self, fragment: Fragment) -> Result<(), GraphError> {
        let Fragment {
            logical_name,
            resource,
            class,
        } = fragment;

        if let Some(existing) = self.resources.get(&logical_name) {
            if *existing != resource {
                return Err(GraphError::Conflict { logical_name });
            }
            tracing::trace!(name = %logical_name, "fragment already merged");
            return Ok(());
        }

        tracing::trace!(name = %logical_name, kind = %resource.kind, "merging fragment");
        if class == FragmentClass::ApiMethod {
            self.methods.insert(logical_name.clone());
        }
        self.resources.insert(logical_name, resource);
        Ok(())
    }

    pub fn merge_output(&mut self, name: &str, output: Output) -> Result<(), GraphError> {
        match self.outputs.get(name) {
            Some(existing) if *existing != output => Err(GraphError::OutputConflict {
                name: name.to_owned(),
            }),
            Some(_) => Ok(()),
            None => {
                self.outputs.insert(name.to_owned(), output);
                Ok(())
            }
        }
    }

    pub fn get(&self, logical_name: &str) -> Option<&Resource> {
        self.resources.get(logical_name)
    }

    pub fn contains(&self, logical_name: &str) -> bool {
        self.resources.contains_key(logical_name)
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn resources(&self) -> impl Iterator<Item = (&str, &Resource)> {
        self.resources.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn outputs(&self) -> impl Iterator<Item = (&str, &Output)> {
        self.outputs.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Logical names of every API method merged so far, sorted.
    pub fn api_methods(&self) -> Vec<String> {
        self.methods.iter().cloned().collect()
    }

    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("resource '{logical_name}' is already defined with different content")]
    Conflict { logical_name: String },

    #[error("output '{name}' is already defined with a different value")]
    OutputConflict { name: String },
}

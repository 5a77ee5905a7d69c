use serde::Serialize;
use serde_json::{Value, json};

/// A CloudFormation resource declaration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resource {
    #[serde(rename = "Type")]
    pub kind: String,
    #[serde(rename = "DependsOn", skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    #[serde(rename = "Properties")]
    pub properties: Value,
}

/// How the graph should account for a fragment beyond storing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FragmentClass {
    #[default]
    Standard,
    /// An API Gateway method; deployments must depend on every one of these
    ApiMethod,
}

/// One named resource produced by synthesis, ready to merge into a graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    pub logical_name: String,
    pub resource: Resource,
    pub class: FragmentClass,
}

impl Fragment {
    pub fn new(logical_name: impl Into<String>, kind: &str, properties: Value) -> Self {
        Self {
            logical_name: logical_name.into(),
            resource: Resource {
                kind: kind.to_owned(),
                depends_on: Vec::new(),
                properties,
            },
            class: FragmentClass::Standard,
        }
    }

    pub fn depends_on<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.resource
            .depends_on
            .extend(names.into_iter().map(Into::into));
        self
    }

    pub fn api_method(mut self) -> Self {
        self.class = FragmentClass::ApiMethod;
        self
    }

    pub fn kind(&self) -> &str {
        &self.resource.kind
    }

    pub fn properties(&self) -> &Value {
        &self.resource.properties
    }

    pub fn dependencies(&self) -> &[String] {
        &self.resource.depends_on
    }
}

/// A template output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Output {
    #[serde(rename = "Description", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "Value")]
    pub value: Value,
}

/// `{"Ref": name}`
pub fn reference(logical_name: &str) -> Value {
    json!({ "Ref": logical_name })
}

/// `{"Fn::GetAtt": [name, attribute]}`
pub fn get_att(logical_name: &str, attribute: &str) -> Value {
    json!({ "Fn::GetAtt": [logical_name, attribute] })
}

//! Attribute schemas describing each resource to the host.

use serde::Serialize;

/// Value kind of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    /// UTF-8 string
    String,
    /// Boolean
    Bool,
    /// Integer
    Int,
    /// Floating point number
    Float,
    /// Ordered list of strings
    List,
    /// Unordered set of strings
    Set,
}

/// Who supplies an attribute's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Presence {
    /// Must be set in configuration
    Required,
    /// May be set in configuration
    Optional,
    /// Set by the provider
    Computed,
}

/// One scalar or collection attribute.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attribute {
    /// Attribute name
    pub name: &'static str,
    /// Value kind
    #[serde(rename = "type")]
    pub kind: AttributeType,
    /// Presence
    pub presence: Presence,
    /// Human readable description
    pub description: &'static str,
    /// Default when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    /// Attributes that may not be set alongside this one
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub conflicts_with: Vec<&'static str>,
    /// Closed set of accepted values
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub allowed_values: Vec<&'static str>,
    /// Whether the value is hidden from output
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub sensitive: bool,
}

impl Attribute {
    fn new(name: &'static str, kind: AttributeType, presence: Presence) -> Self {
        Self {
            name,
            kind,
            presence,
            description: "",
            default: None,
            conflicts_with: Vec::new(),
            allowed_values: Vec::new(),
            sensitive: false,
        }
    }

    /// A required attribute.
    #[must_use]
    pub fn required(name: &'static str, kind: AttributeType) -> Self {
        Self::new(name, kind, Presence::Required)
    }

    /// An optional attribute.
    #[must_use]
    pub fn optional(name: &'static str, kind: AttributeType) -> Self {
        Self::new(name, kind, Presence::Optional)
    }

    /// A provider-computed attribute.
    #[must_use]
    pub fn computed(name: &'static str, kind: AttributeType) -> Self {
        Self::new(name, kind, Presence::Computed)
    }

    /// Sets the description.
    #[must_use]
    pub const fn describe(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    /// Sets the default value.
    #[must_use]
    pub fn default_value(mut self, value: impl Into<serde_json::Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Declares conflicting attributes.
    #[must_use]
    pub fn conflicts_with(mut self, names: &[&'static str]) -> Self {
        self.conflicts_with.extend_from_slice(names);
        self
    }

    /// Restricts to a closed set of values.
    #[must_use]
    pub fn allowed(mut self, values: Vec<&'static str>) -> Self {
        self.allowed_values = values;
        self
    }

    /// Marks the value as sensitive.
    #[must_use]
    pub const fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }
}

/// How many instances of a nested block are allowed, and how they compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Nesting {
    /// Zero or one
    Single,
    /// Ordered repetition
    List,
    /// Unordered repetition, identity by content
    Set,
}

/// A repeated or singular sub-block such as `rule` or `viz_options`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NestedBlock {
    /// Block name
    pub name: &'static str,
    /// Nesting mode
    pub nesting: Nesting,
    /// Minimum occurrences
    pub min_items: usize,
    /// Maximum occurrences, `None` for unbounded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,
    /// Block content
    pub block: Block,
}

/// A set of attributes and nested blocks.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Block {
    /// Attributes in declaration order
    pub attributes: Vec<Attribute>,
    /// Nested blocks in declaration order
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub blocks: Vec<NestedBlock>,
}

impl Block {
    /// An empty block.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an attribute.
    #[must_use]
    pub fn attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Adds a nested block.
    #[must_use]
    pub fn nested(
        mut self,
        name: &'static str,
        nesting: Nesting,
        min_items: usize,
        max_items: Option<usize>,
        block: Self,
    ) -> Self {
        self.blocks.push(NestedBlock {
            name,
            nesting,
            min_items,
            max_items,
            block,
        });
        self
    }

    /// Looks up an attribute by name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|attribute| attribute.name == name)
    }

    /// Looks up a nested block by name.
    #[must_use]
    pub fn find_block(&self, name: &str) -> Option<&NestedBlock> {
        self.blocks.iter().find(|block| block.name == name)
    }
}

/// A resource's complete schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Schema {
    /// Resource type name
    pub type_name: &'static str,
    /// State schema version
    pub version: u32,
    /// Top level block
    pub block: Block,
}

/// Attributes every resource carries for lifecycle tracking.
#[must_use]
pub fn with_lifecycle_attributes(block: Block) -> Block {
    block
        .attribute(
            Attribute::computed("id", AttributeType::String)
                .describe("ID assigned by SignalFx"),
        )
        .attribute(
            Attribute::optional("synced", AttributeType::Bool)
                .describe("Whether the remote object matches the last applied configuration")
                .default_value(true),
        )
        .attribute(
            Attribute::computed("last_updated", AttributeType::Float)
                .describe("Server modification time in epoch milliseconds"),
        )
        .attribute(
            Attribute::computed("url", AttributeType::String)
                .describe("Link to the object in the SignalFx web app"),
        )
}

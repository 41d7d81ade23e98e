// ── Value ─────────────────────────────────────────────────────────────────

/// A literal value in a property.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Quoted string: `"hello"`. May span several lines.
    Str(String),
    /// Numeric literal: `16`, `-0.5`, `1e-3`.
    Number(f64),
    /// Unquoted identifier: enum variants such as `vertex` or `float32x4`.
    Ident(String),
    /// Bracketed list: `[0.0, 0.5, 1]`. Commas are optional.
    List(Vec<Value>),
    /// Braced record of properties: `{ offset: 16 format: float32x4 }`.
    Record(Props),
}

impl Value {
    /// Short name of the value's shape, used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Str(_) => "string",
            Value::Number(_) => "number",
            Value::Ident(_) => "identifier",
            Value::List(_) => "list",
            Value::Record(_) => "record",
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the text of a `Str` or `Ident`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) | Value::Ident(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Props> {
        match self {
            Value::Record(props) => Some(props),
            _ => None,
        }
    }
}

// ── Prop ──────────────────────────────────────────────────────────────────

/// A single `key: value` property inside a node block or record.
#[derive(Debug, Clone, PartialEq)]
pub struct Prop {
    pub key: String,
    pub value: Value,
}

// ── Props ─────────────────────────────────────────────────────────────────

/// Ordered property bag attached to a node.
///
/// Keys are not deduplicated; lookups return the last occurrence so later
/// lines override earlier ones.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Props(pub Vec<Prop>);

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, mainly for constructing props in code.
    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.0.push(Prop { key: key.into(), value });
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.iter().rev().find(|p| p.key == key).map(|p| &p.value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Prop> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ── Node ──────────────────────────────────────────────────────────────────

/// An element instantiation in the scene tree.
///
/// ```lsm
/// mesh {
///     shaders { code: "..." }
/// }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Element tag as written: `"mesh"`, `"vertexBuffer"`, `"shaders"`.
    pub tag: String,
    /// Properties inside the block (`key: value` lines).
    pub props: Props,
    /// Nested child nodes inside the block, in source order.
    pub children: Vec<Node>,
    /// 1-based line of the tag.
    pub line: usize,
}

impl Node {
    pub fn prop(&self, key: &str) -> Option<&Value> {
        self.props.get(key)
    }
}

// ── SceneDocument ─────────────────────────────────────────────────────────

/// The top-level parse result for an `.lsm` source file: zero or more root nodes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneDocument {
    pub roots: Vec<Node>,
}

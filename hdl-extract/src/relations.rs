//! Entity tables and relationship edges derived from an extracted module.

use std::fmt;
use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{Direction, ExtractedModule, NetType, Operation, OperationType};

/// A namespaced reference to one extracted entity, serialized as
/// `module_X`, `signal_X`, `param_X` or `operation_X`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum EntityRef {
    Module(String),
    Signal(String),
    Parameter(String),
    Operation(String),
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityRef::Module(name) => write!(f, "module_{}", name),
            EntityRef::Signal(name) => write!(f, "signal_{}", name),
            EntityRef::Parameter(name) => write!(f, "param_{}", name),
            EntityRef::Operation(id) => write!(f, "operation_{}", id),
        }
    }
}

impl From<EntityRef> for String {
    fn from(entity: EntityRef) -> Self {
        entity.to_string()
    }
}

impl TryFrom<String> for EntityRef {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let (namespace, name) = value
            .split_once('_')
            .ok_or_else(|| format!("entity reference without namespace: {}", value))?;
        let name = name.to_string();
        match namespace {
            "module" => Ok(EntityRef::Module(name)),
            "signal" => Ok(EntityRef::Signal(name)),
            "param" => Ok(EntityRef::Parameter(name)),
            "operation" => Ok(EntityRef::Operation(name)),
            _ => Err(format!("unknown entity namespace '{}'", namespace)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    UsesSignal,
    ProducesSignal,
    DependsOnParameter,
    UsesParameter,
    Instantiates,
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::UsesSignal => "uses_signal",
            EdgeKind::ProducesSignal => "produces_signal",
            EdgeKind::DependsOnParameter => "depends_on_parameter",
            EdgeKind::UsesParameter => "uses_parameter",
            EdgeKind::Instantiates => "instantiates",
        }
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub source: EntityRef,
    pub target: EntityRef,
    pub kind: EdgeKind,
}

impl Edge {
    fn new(source: EntityRef, target: EntityRef, kind: EdgeKind) -> Self {
        Self {
            source,
            target,
            kind,
        }
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -{}-> {}", self.source, self.kind, self.target)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalEntry {
    pub width: String,
    #[serde(rename = "type")]
    pub net_type: NetType,
    pub module: Option<String>,
    pub direction: Direction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterEntry {
    pub value: String,
    pub module: Option<String>,
}

/// Lookup tables keyed by name (signals, parameters) or id (operations), in
/// extraction order, plus the derived edges.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityTables {
    pub module: Option<String>,
    pub signals: IndexMap<String, SignalEntry>,
    pub parameters: IndexMap<String, ParameterEntry>,
    pub operations: IndexMap<String, Operation>,
    pub edges: Vec<Edge>,
}

impl EntityTables {
    pub fn edges_of_kind(&self, kind: EdgeKind) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(move |edge| edge.kind == kind)
    }

    pub fn has_edge(&self, source: &EntityRef, target: &EntityRef, kind: EdgeKind) -> bool {
        self.edges
            .iter()
            .any(|edge| edge.kind == kind && &edge.source == source && &edge.target == target)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationOptions {
    /// Match parameter names on identifier boundaries instead of as plain
    /// substrings, so `N` no longer matches inside `MIN`.
    pub word_boundary_parameters: bool,
}

impl RelationOptions {
    fn mentions(&self, text: &str, parameter: &str) -> bool {
        if !self.word_boundary_parameters {
            return text.contains(parameter);
        }
        text.match_indices(parameter).any(|(start, _)| {
            let before = text[..start].chars().next_back();
            let after = text[start + parameter.len()..].chars().next();
            !before.is_some_and(is_identifier_char) && !after.is_some_and(is_identifier_char)
        })
    }
}

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

static NAMED_CONNECTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\.\s*[A-Za-z_][\w$]*\s*\(\s*(.*?)\s*\)$").expect("valid connection pattern")
});

/// Reduce an operand or target to the signal name it refers to:
/// `.a(data[3:0])` and `data[3:0]` both become `data`.
pub fn signal_name(token: &str) -> &str {
    let mut token = token.trim();
    if let Some(inner) = NAMED_CONNECTION.captures(token).and_then(|caps| caps.get(1)) {
        token = inner.as_str();
    }
    match token.find('[') {
        Some(select) => token[..select].trim_end(),
        None => token,
    }
}

/// Build the entity tables and edges for `module`.
pub fn extract_entities(module: &ExtractedModule, options: &RelationOptions) -> EntityTables {
    let owner = module.name.clone();
    let mut tables = EntityTables {
        module: owner.clone(),
        ..EntityTables::default()
    };

    for port in module.ports() {
        tables.signals.insert(
            port.name.clone(),
            SignalEntry {
                width: port.width.clone(),
                net_type: port.net_type.unwrap_or(NetType::Wire),
                module: owner.clone(),
                direction: port.direction,
            },
        );
    }
    for signal in &module.signals {
        tables.signals.insert(
            signal.name.clone(),
            SignalEntry {
                width: signal.width.clone(),
                net_type: signal.net_type,
                module: owner.clone(),
                direction: Direction::Internal,
            },
        );
    }

    for parameter in &module.parameters {
        tables.parameters.insert(
            parameter.name.clone(),
            ParameterEntry {
                value: parameter.value.clone(),
                module: owner.clone(),
            },
        );
    }

    for operation in &module.operations {
        tables
            .operations
            .insert(operation.id.clone(), operation.clone());
    }

    let mut edges = Vec::new();
    for operation in &module.operations {
        let op_ref = EntityRef::Operation(operation.id.clone());

        for operand in &operation.operands {
            let name = signal_name(operand);
            if tables.signals.contains_key(name) {
                edges.push(Edge::new(
                    op_ref.clone(),
                    EntityRef::Signal(name.to_string()),
                    EdgeKind::UsesSignal,
                ));
            }
        }

        let target = signal_name(&operation.target);
        if tables.signals.contains_key(target) {
            edges.push(Edge::new(
                op_ref.clone(),
                EntityRef::Signal(target.to_string()),
                EdgeKind::ProducesSignal,
            ));
        }

        for parameter in tables.parameters.keys() {
            if options.mentions(&operation.expression, parameter) {
                edges.push(Edge::new(
                    op_ref.clone(),
                    EntityRef::Parameter(parameter.clone()),
                    EdgeKind::DependsOnParameter,
                ));
            }
        }

        if operation.kind == OperationType::Instantiation {
            let module_type = operation
                .expression
                .split('(')
                .next()
                .unwrap_or_default()
                .trim();
            if let (Some(owner), false) = (&owner, module_type.is_empty()) {
                edges.push(Edge::new(
                    EntityRef::Module(owner.clone()),
                    EntityRef::Module(module_type.to_string()),
                    EdgeKind::Instantiates,
                ));
            }
        }
    }

    for (name, signal) in &tables.signals {
        for parameter in tables.parameters.keys() {
            if options.mentions(&signal.width, parameter) {
                edges.push(Edge::new(
                    EntityRef::Signal(name.clone()),
                    EntityRef::Parameter(parameter.clone()),
                    EdgeKind::UsesParameter,
                ));
            }
        }
    }

    tables.edges = edges;
    tables
}

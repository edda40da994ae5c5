//! Best-effort structural extraction for Verilog/SystemVerilog modules.
//!
//! Two independent passes run over the same macro-normalized text: a chumsky
//! grammar ([`parser`]) that recovers the module header precisely when it can,
//! and a line-oriented scanner ([`scanner`]) that never fails and recovers
//! everything else. [`Extractor`] merges the two and [`relations`] derives the
//! signal/parameter/operation tables and the relationship edges.

pub mod ast;
pub mod classify;
pub mod cli;
pub mod error;
pub mod extractor;
pub mod ids;
pub mod parser;
pub mod preprocessor;
pub mod relations;
pub mod scanner;
pub mod sink;

use serde::{Deserialize, Serialize};

pub use cli::{parse_vcs_style_args, ParsedArgs};
pub use error::{ExtractError, ExtractResult};
pub use extractor::{Extraction, Extractor, ExtractorConfig};
pub use ids::{IdGenerator, SequentialIds, UuidIds};
pub use parser::SystemVerilogParser;
pub use relations::{extract_entities, Edge, EdgeKind, EntityRef, EntityTables, RelationOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Input,
    Output,
    Inout,
    Internal,
}

impl Direction {
    pub fn from_keyword(word: &str) -> Option<Self> {
        match word {
            "input" => Some(Direction::Input),
            "output" => Some(Direction::Output),
            "inout" => Some(Direction::Inout),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Input => "input",
            Direction::Output => "output",
            Direction::Inout => "inout",
            Direction::Internal => "internal",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetType {
    Wire,
    Reg,
    Logic,
}

impl NetType {
    pub fn from_keyword(word: &str) -> Option<Self> {
        match word {
            "wire" => Some(NetType::Wire),
            "reg" => Some(NetType::Reg),
            "logic" => Some(NetType::Logic),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NetType::Wire => "wire",
            NetType::Reg => "reg",
            NetType::Logic => "logic",
        }
    }
}

impl std::fmt::Display for NetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A module-boundary signal. `width` is the textual range, `"1"` when none
/// was written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    pub name: String,
    pub width: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub net_type: Option<NetType>,
    pub direction: Direction,
}

/// A `wire`/`reg`/`logic` declared in the module body that is not a port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signal {
    pub name: String,
    #[serde(rename = "type")]
    pub net_type: NetType,
    pub width: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    /// Raw, unevaluated value text
    pub value: String,
    #[serde(default)]
    pub local: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationType {
    And,
    Or,
    Xor,
    Add,
    Subtract,
    Lshift,
    Rshift,
    Not,
    NonBlockingAssign,
    Assign,
    Unknown,
    Instantiation,
}

impl OperationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::And => "AND",
            OperationType::Or => "OR",
            OperationType::Xor => "XOR",
            OperationType::Add => "ADD",
            OperationType::Subtract => "SUBTRACT",
            OperationType::Lshift => "LSHIFT",
            OperationType::Rshift => "RSHIFT",
            OperationType::Not => "NOT",
            OperationType::NonBlockingAssign => "NON_BLOCKING_ASSIGN",
            OperationType::Assign => "ASSIGN",
            OperationType::Unknown => "UNKNOWN",
            OperationType::Instantiation => "INSTANTIATION",
        }
    }
}

impl std::fmt::Display for OperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationContext {
    Combinational,
    Sequential,
    Structural,
}

impl OperationContext {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationContext::Combinational => "combinational",
            OperationContext::Sequential => "sequential",
            OperationContext::Structural => "structural",
        }
    }
}

impl std::fmt::Display for OperationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recovered assignment or instantiation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: OperationType,
    pub target: String,
    pub expression: String,
    pub operands: Vec<String>,
    pub context: OperationContext,
}

/// Everything recovered from one module's source text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedModule {
    pub name: Option<String>,
    pub input_ports: Vec<Port>,
    pub output_ports: Vec<Port>,
    pub signals: Vec<Signal>,
    pub parameters: Vec<Parameter>,
    pub operations: Vec<Operation>,
}

impl ExtractedModule {
    /// True when no module header was found and nothing was extracted.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.input_ports.is_empty()
            && self.output_ports.is_empty()
            && self.signals.is_empty()
            && self.parameters.is_empty()
            && self.operations.is_empty()
    }

    pub fn is_port(&self, name: &str) -> bool {
        self.ports().any(|port| port.name == name)
    }

    pub fn ports(&self) -> impl Iterator<Item = &Port> {
        self.input_ports.iter().chain(self.output_ports.iter())
    }

    pub fn signal(&self, name: &str) -> Option<&Signal> {
        self.signals.iter().find(|signal| signal.name == name)
    }
}

#[derive(Debug, Clone)]
pub struct ParseResult {
    pub ast: Option<ast::SourceUnit>,
    pub errors: Vec<SingleParseError>,
}

#[derive(Debug, Clone)]
pub struct ParseError {
    pub errors: Vec<SingleParseError>,
}

#[derive(Debug, Clone)]
pub struct SingleParseError {
    pub message: String,
    pub error_type: ParseErrorType,
    pub location: Option<SourceLocation>,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SourceLocation {
    pub line: usize,                  // 0-based line number
    pub column: usize,                // 0-based column number
    pub span: Option<(usize, usize)>, // character start/end positions
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParseErrorType {
    UnexpectedToken,
    ExpectedToken(String),
    UnexpectedEndOfInput,
    InvalidSyntax,
}

impl ParseError {
    pub fn new(error: SingleParseError) -> Self {
        Self {
            errors: vec![error],
        }
    }

    pub fn multiple(errors: Vec<SingleParseError>) -> Self {
        Self { errors }
    }

    pub fn primary_error(&self) -> Option<&SingleParseError> {
        self.errors.first()
    }
}

impl SingleParseError {
    pub fn new(message: String, error_type: ParseErrorType) -> Self {
        Self {
            message,
            error_type,
            location: None,
            suggestions: Vec::new(),
        }
    }

    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_suggestions(mut self, suggestions: Vec<String>) -> Self {
        self.suggestions.extend(suggestions);
        self
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.errors.len() == 1 {
            write!(f, "{}", self.errors[0])
        } else {
            writeln!(f, "Multiple parse errors:")?;
            for (i, error) in self.errors.iter().enumerate() {
                write!(f, "  {}: {}", i + 1, error)?;
                if i < self.errors.len() - 1 {
                    writeln!(f)?;
                }
            }
            Ok(())
        }
    }
}

impl std::fmt::Display for SingleParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(location) = &self.location {
            write!(
                f,
                "Error at line {}, column {}: {}",
                location.line + 1,
                location.column + 1,
                self.message
            )?;
        } else {
            write!(f, "Parse error: {}", self.message)?;
        }

        if !self.suggestions.is_empty() {
            write!(f, " (Suggestions: {})", self.suggestions.join(", "))?;
        }

        Ok(())
    }
}

impl std::error::Error for ParseError {}

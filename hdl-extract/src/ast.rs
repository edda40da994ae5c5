//! Syntax tree produced by the structural grammar.
//!
//! Expressions are kept as raw text: the structural pass only needs module
//! headers precisely, the body is parsed so that malformed bodies surface as
//! diagnostics rather than silently skewing the header.

/// Byte offsets `(start, end)` into the parsed text.
pub type Span = (usize, usize);

#[derive(Debug, Clone, Default)]
pub struct SourceUnit {
    pub modules: Vec<ModuleDecl>,
}

impl SourceUnit {
    pub fn first_module(&self) -> Option<&ModuleDecl> {
        self.modules.first()
    }
}

#[derive(Debug, Clone)]
pub struct ModuleDecl {
    pub name: String,
    pub name_span: Span,
    pub parameters: Vec<ParamAssignment>,
    pub ports: Vec<HeaderPort>,
    pub items: Vec<ModuleItem>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortDirection {
    Input,
    Output,
    Inout,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Range {
    pub msb: String,
    pub lsb: String,
}

impl std::fmt::Display for Range {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}:{}]", self.msb, self.lsb)
    }
}

/// A port as written in the module header.
///
/// `direction` is `None` for non-ANSI headers, where only names appear and the
/// direction is declared in the body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderPort {
    pub name: String,
    pub name_span: Span,
    pub direction: Option<PortDirection>,
    pub net_type: Option<String>,
    pub range: Option<Range>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamAssignment {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProceduralBlockType {
    Always,
    AlwaysFF,
    AlwaysComb,
    AlwaysLatch,
    Initial,
    Final,
}

#[derive(Debug, Clone)]
pub enum ModuleItem {
    PortDeclaration {
        direction: PortDirection,
        net_type: Option<String>,
        range: Option<Range>,
        names: Vec<String>,
        span: Span,
    },
    NetDeclaration {
        net_type: String,
        range: Option<Range>,
        names: Vec<String>,
        span: Span,
    },
    ParameterDeclaration {
        local: bool,
        assignments: Vec<ParamAssignment>,
        span: Span,
    },
    ContinuousAssign {
        target: String,
        expr: String,
        span: Span,
    },
    ProceduralBlock {
        block_type: ProceduralBlockType,
        sensitivity: Option<String>,
        body: Statement,
        span: Span,
    },
    Instantiation {
        module_type: String,
        instance: String,
        connections: Vec<String>,
        span: Span,
    },
    /// `function`, `task` or `generate` regions, consumed without inspection
    Skipped {
        keyword: String,
        span: Span,
    },
    Other {
        text: String,
        span: Span,
    },
}

#[derive(Debug, Clone)]
pub enum Statement {
    Block(Vec<Statement>),
    If {
        condition: String,
        then_branch: Box<Statement>,
        else_branch: Option<Box<Statement>>,
    },
    Case {
        subject: String,
        body: String,
    },
    Assignment {
        target: String,
        blocking: bool,
        expr: String,
    },
    Other(String),
}

impl Statement {
    /// Number of assignment statements reachable from this one.
    pub fn assignment_count(&self) -> usize {
        match self {
            Statement::Block(statements) => statements.iter().map(Self::assignment_count).sum(),
            Statement::If {
                then_branch,
                else_branch,
                ..
            } => {
                then_branch.assignment_count()
                    + else_branch.as_ref().map_or(0, |b| b.assignment_count())
            }
            Statement::Assignment { .. } => 1,
            Statement::Case { .. } | Statement::Other(_) => 0,
        }
    }
}

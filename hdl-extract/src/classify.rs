//! Operation classification for right-hand-side expressions.
//!
//! Classification is an ordered rule list, first match wins. The order is a
//! tie-break policy: `a & b | c` is `AND`, `a + b << 1` is `ADD`.

use std::sync::LazyLock;

use regex::Regex;

use crate::OperationType;

/// The statement form an expression was taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentKind {
    /// `assign x = ...;` or `wire x = ...;`
    Continuous,
    /// `x = ...;` inside a procedural block
    Blocking,
    /// `x <= ...;` inside a procedural block
    NonBlocking,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub kind: OperationType,
    pub operands: Vec<String>,
}

struct Rule {
    kind: OperationType,
    applies: fn(&str) -> bool,
    /// Operator text blanked out before operand extraction
    operator: Option<&'static str>,
}

const RULES: &[Rule] = &[
    Rule {
        kind: OperationType::And,
        applies: is_bitwise_and,
        operator: Some("&"),
    },
    Rule {
        kind: OperationType::Or,
        applies: is_bitwise_or,
        operator: Some("|"),
    },
    Rule {
        kind: OperationType::Xor,
        applies: has_xor,
        operator: Some("^"),
    },
    Rule {
        kind: OperationType::Add,
        applies: has_add,
        operator: Some("+"),
    },
    Rule {
        kind: OperationType::Subtract,
        applies: is_subtract,
        operator: Some("-"),
    },
    Rule {
        kind: OperationType::Lshift,
        applies: has_left_shift,
        operator: Some("<<"),
    },
    Rule {
        kind: OperationType::Rshift,
        applies: has_right_shift,
        operator: Some(">>"),
    },
    Rule {
        kind: OperationType::Not,
        applies: has_not,
        operator: Some("~"),
    },
    Rule {
        kind: OperationType::NonBlockingAssign,
        applies: has_non_blocking,
        operator: None,
    },
    Rule {
        kind: OperationType::Assign,
        applies: is_plain_assign,
        operator: None,
    },
];

fn is_bitwise_and(expr: &str) -> bool {
    expr.contains('&') && !expr.contains("&&")
}

fn is_bitwise_or(expr: &str) -> bool {
    expr.contains('|') && !expr.contains("||")
}

fn has_xor(expr: &str) -> bool {
    expr.contains('^')
}

fn has_add(expr: &str) -> bool {
    expr.contains('+')
}

fn is_subtract(expr: &str) -> bool {
    expr.contains('-') && !expr.contains("->")
}

fn has_left_shift(expr: &str) -> bool {
    expr.contains("<<")
}

fn has_right_shift(expr: &str) -> bool {
    expr.contains(">>")
}

fn has_not(expr: &str) -> bool {
    expr.contains('~')
}

fn has_non_blocking(expr: &str) -> bool {
    expr.contains("<=")
}

fn is_plain_assign(expr: &str) -> bool {
    expr.contains('=') && !expr.contains("==")
}

/// Classify `expr` and collect its operands.
///
/// When no rule matches and the expression is the right-hand side of an
/// assignment, the assignment operator decides: `<=` gives
/// `NON_BLOCKING_ASSIGN`, `=` gives `ASSIGN`. A bare expression with no
/// recognised operator is `UNKNOWN`.
pub fn classify_operation(expr: &str, assignment: Option<AssignmentKind>) -> Classification {
    let expr = expr.trim();

    let matched = RULES.iter().find(|rule| (rule.applies)(expr));

    let kind = match (matched, assignment) {
        (Some(rule), _) => rule.kind,
        (None, Some(AssignmentKind::NonBlocking)) => OperationType::NonBlockingAssign,
        (None, Some(AssignmentKind::Blocking | AssignmentKind::Continuous)) => {
            OperationType::Assign
        }
        (None, None) => OperationType::Unknown,
    };

    let blanked = match matched.and_then(|rule| rule.operator) {
        Some(operator) => expr.replace(operator, &" ".repeat(operator.len())),
        None => expr.to_string(),
    };

    Classification {
        kind,
        operands: extract_operands(&blanked),
    }
}

static OPERAND: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z0-9_$][\w$\[\]:]*").expect("valid operand pattern"));

/// Identifier-like tokens of `expr` in order of appearance. Bit selects stay
/// attached (`data[3:0]`); numeric literals and the digits of based literals
/// (`4'b1010`) are skipped.
pub fn extract_operands(expr: &str) -> Vec<String> {
    OPERAND
        .find_iter(expr)
        .filter(|m| !expr[..m.start()].ends_with('\''))
        .map(|m| balance_selects(m.as_str()))
        .filter(|token| {
            token
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        })
        .collect()
}

/// Drop a dangling select left over from an expression inside brackets, so
/// `mem[i+1]` yields `mem` rather than `mem[i`.
fn balance_selects(token: &str) -> String {
    let mut token = token.to_string();
    while token.ends_with(']') && token.matches(']').count() > token.matches('[').count() {
        token.pop();
    }
    if token.matches('[').count() != token.matches(']').count() {
        token.truncate(token.find('[').unwrap_or(token.len()));
    }
    token.trim_end_matches(':').to_string()
}

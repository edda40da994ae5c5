//! Line-oriented heuristic scanner.
//!
//! Runs on every input, independent of the structural grammar, and never
//! fails: anything it does not recognise is skipped. It is the only source of
//! internal signals, parameters and operations, and the source of ports when
//! the grammar finds none.

use std::collections::HashMap;
use std::sync::LazyLock;

use log::{debug, trace, warn};
use regex::Regex;

use crate::classify::{classify_operation, AssignmentKind};
use crate::ids::IdGenerator;
use crate::{
    Direction, NetType, Operation, OperationContext, OperationType, Parameter, Port, Signal,
};

macro_rules! pattern {
    ($name:ident, $re:expr) => {
        static $name: LazyLock<Regex> =
            LazyLock::new(|| Regex::new($re).expect(concat!("valid pattern ", stringify!($name))));
    };
}

pattern!(MODULE_HEADER, r"^(?:module|macromodule)\b\s*([A-Za-z_][\w$]*)(.*)$");
pattern!(ENDMODULE, r"^endmodule\b");
pattern!(
    HEADER_PORT,
    r"^(?:(input|output|inout)\b\s*)?(?:(wire|reg|logic)\b\s*)?(?:(?:signed|unsigned)\b\s*)?(\[[^\]]*\])?\s*([A-Za-z_][\w$]*)"
);
pattern!(
    PORT_DECL,
    r"^(input|output|inout)\b\s*(?:(wire|reg|logic)\b\s*)?(?:(?:signed|unsigned)\b\s*)?(\[[^\]]*\])?\s*([A-Za-z_][\w$]*(?:\s*,\s*[A-Za-z_][\w$]*)*)\s*;"
);
pattern!(
    SIGNAL_DECL,
    r"^(wire|reg|logic)\b\s*(?:(?:signed|unsigned)\b\s*)?(\[[^\]]*\])?\s*(.+?)\s*;$"
);
pattern!(
    DECLARATOR,
    r"^([A-Za-z_][\w$]*)\s*(?:\[[^\]]*\]\s*)*(?:=\s*(.+))?$"
);
pattern!(
    PARAM_DECL,
    r"^(parameter|localparam)\b\s*(?:(?:integer|int|logic|bit|real|signed|unsigned)\b\s*)*(?:\[[^\]]*\]\s*)?(.+?)\s*;$"
);
pattern!(
    PARAM_PORT,
    r"^(?:(parameter|localparam)\b\s*)?(?:(?:integer|int|logic|bit|real|signed|unsigned)\b\s*)*(?:\[[^\]]*\]\s*)?([A-Za-z_][\w$]*)\s*=\s*(.+)$"
);
pattern!(PARAM_PAIR, r"^([A-Za-z_][\w$]*)\s*=\s*(.+)$");
pattern!(NAME_ASSIGN_AHEAD, r"^\s*[A-Za-z_][\w$]*\s*=(?:[^=]|$)");
pattern!(
    CONTINUOUS_ASSIGN,
    r"^assign\b\s*(?:#\s*\S+\s*)?([A-Za-z_][\w$\[\]:.]*|\{[^}]*\})\s*=\s*([^;]+);"
);
pattern!(
    INSTANTIATION,
    r"^([A-Za-z_][\w$]*)(?:\s*#\s*\(.*\)\s*|\s+)([A-Za-z_][\w$]*)\s*(?:\[[^\]]*\])?\s*\((.*)\)\s*;$"
);
pattern!(
    PROCEDURAL_HEADER,
    r"^(always_ff|always_comb|always_latch|always|initial|final)\b\s*(.*)$"
);
pattern!(EDGE_KEYWORD, r"\b(?:posedge|negedge|edge)\b");
pattern!(REGION_HEADER, r"^(function|task)\b");
pattern!(
    NON_BLOCKING,
    r"^([A-Za-z_][\w$\[\]:.]*|\{[^}]*\})\s*<=\s*([^;]+);"
);
pattern!(
    BLOCKING,
    r"^([A-Za-z_][\w$\[\]:.]*|\{[^}]*\})\s*=\s*([^=;][^;]*);"
);
pattern!(
    CASE_LABEL,
    r"^(?:default\b\s*:?|[\w'$]+(?:\s*,\s*[\w'$]+)*\s*:)"
);
pattern!(DELAY, r"^#\s*(?:\d+(?:\.\d+)?\w*|[A-Za-z_][\w$]*)");
pattern!(BLOCK_LABEL, r"^:\s*[A-Za-z_][\w$]*");
pattern!(
    BODY_START,
    r"^(?:assign|always|always_ff|always_comb|always_latch|initial|function|task|generate|endmodule)\b"
);

/// Where the scanner is within the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    SeekingModule,
    InHeader,
    InBody,
    Done,
}

/// A port declaration as the scanner last saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortDecl {
    pub direction: Direction,
    pub width: String,
    pub net_type: Option<NetType>,
}

/// Everything the heuristic pass recovered from one module.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeuristicScan {
    pub module_name: Option<String>,
    pub input_ports: Vec<Port>,
    pub output_ports: Vec<Port>,
    pub signals: Vec<Signal>,
    pub parameters: Vec<Parameter>,
    pub operations: Vec<Operation>,
    /// Every declared port, `inout` included
    pub port_decls: HashMap<String, PortDecl>,
}

impl HeuristicScan {
    pub fn direction_of(&self, name: &str) -> Option<Direction> {
        self.port_decls.get(name).map(|decl| decl.direction)
    }

    fn is_port(&self, name: &str) -> bool {
        self.input_ports
            .iter()
            .chain(self.output_ports.iter())
            .any(|port| port.name == name)
    }

    fn port_mut(&mut self, name: &str) -> Option<&mut Port> {
        self.input_ports
            .iter_mut()
            .chain(self.output_ports.iter_mut())
            .find(|port| port.name == name)
    }
}

/// Scan `text` for the first module it contains.
pub fn scan_module<G: IdGenerator + ?Sized>(text: &str, ids: &mut G) -> HeuristicScan {
    let mut scanner = Scanner::new(ids);

    for raw in text.lines() {
        let line = scanner.strip_comments(raw);
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match scanner.state {
            State::SeekingModule => scanner.seek_module(line),
            // An unclosed header ends where the body visibly starts
            State::InHeader if BODY_START.is_match(line) => {
                scanner.close_header("");
                scanner.scan_body(line);
            }
            State::InHeader => scanner.accumulate_header(line),
            State::InBody => scanner.scan_body(line),
            State::Done => break,
        }
    }

    scanner.finish()
}

struct Scanner<'g, G: IdGenerator + ?Sized> {
    ids: &'g mut G,
    state: State,
    in_block_comment: bool,
    header: String,
    header_depth: usize,
    param_group: bool,
    unresolved_ports: Vec<String>,
    block: Option<OperationContext>,
    saved_block: Option<OperationContext>,
    region_end: Option<&'static str>,
    scan: HeuristicScan,
}

impl<'g, G: IdGenerator + ?Sized> Scanner<'g, G> {
    fn new(ids: &'g mut G) -> Self {
        Self {
            ids,
            state: State::SeekingModule,
            in_block_comment: false,
            header: String::new(),
            header_depth: 0,
            param_group: false,
            unresolved_ports: Vec::new(),
            block: None,
            saved_block: None,
            region_end: None,
            scan: HeuristicScan::default(),
        }
    }

    fn strip_comments(&mut self, raw: &str) -> String {
        let mut out = String::new();
        let mut rest = raw;

        loop {
            if self.in_block_comment {
                match rest.find("*/") {
                    Some(end) => {
                        rest = &rest[end + 2..];
                        self.in_block_comment = false;
                    }
                    None => return out,
                }
            }

            match (rest.find("//"), rest.find("/*")) {
                (Some(line), block) if block.map_or(true, |block| line < block) => {
                    out.push_str(&rest[..line]);
                    return out;
                }
                (_, Some(block)) => {
                    out.push_str(&rest[..block]);
                    out.push(' ');
                    rest = &rest[block + 2..];
                    self.in_block_comment = true;
                }
                _ => {
                    out.push_str(rest);
                    return out;
                }
            }
        }
    }

    fn seek_module(&mut self, line: &str) {
        let Some(caps) = MODULE_HEADER.captures(line) else {
            trace!("outside module: {}", line);
            return;
        };

        let name = caps[1].to_string();
        debug!("found module header '{}'", name);
        self.scan.module_name = Some(name);
        self.state = State::InHeader;

        let rest = caps.get(2).map_or("", |m| m.as_str());
        self.accumulate_header(rest);
    }

    /// Collect header text until the port list closes or a `;` ends the
    /// header; text after it on the same line is body text.
    fn accumulate_header(&mut self, text: &str) {
        for (i, c) in text.char_indices() {
            match c {
                '(' => {
                    if self.header_depth == 0 {
                        self.param_group = self.header.trim_end().ends_with('#');
                    }
                    self.header_depth += 1;
                    self.header.push(c);
                }
                ')' => {
                    self.header.push(c);
                    if self.header_depth > 0 {
                        self.header_depth -= 1;
                        if self.header_depth == 0 && !self.param_group {
                            let rest = text[i + 1..].trim_start();
                            self.close_header(rest.strip_prefix(';').unwrap_or(rest));
                            return;
                        }
                    }
                }
                ';' if self.header_depth == 0 => {
                    self.close_header(&text[i + 1..]);
                    return;
                }
                _ => self.header.push(c),
            }
        }
        self.header.push(' ');
    }

    fn close_header(&mut self, rest: &str) {
        self.finish_header();
        self.state = State::InBody;

        let rest = rest.trim();
        if !rest.is_empty() {
            self.scan_body(rest);
        }
    }

    fn finish_header(&mut self) {
        let header = std::mem::take(&mut self.header);
        let mut rest = header.trim();

        if let Some(after_hash) = rest.strip_prefix('#') {
            let (group, remaining) = split_group(after_hash.trim_start());
            self.scan_parameter_ports(group);
            rest = remaining.trim();
        }

        if rest.starts_with('(') {
            let (ports, _) = split_group(rest);
            self.scan_header_ports(ports);
        }
    }

    fn scan_parameter_ports(&mut self, text: &str) {
        for item in split_top_level(text, ',') {
            match PARAM_PORT.captures(item) {
                Some(caps) => {
                    let local = caps.get(1).is_some_and(|m| m.as_str() == "localparam");
                    self.push_parameter(&caps[2], &caps[3], local);
                }
                None => trace!("unrecognised parameter port: {}", item),
            }
        }
    }

    fn scan_header_ports(&mut self, text: &str) {
        let text = text.replace(';', ",");
        let mut previous: Option<PortDecl> = None;

        for candidate in split_top_level(&text, ',') {
            let Some(caps) = HEADER_PORT.captures(candidate) else {
                trace!("unrecognised header port: {}", candidate);
                continue;
            };
            let name = &caps[4];

            match caps.get(1).and_then(|m| Direction::from_keyword(m.as_str())) {
                Some(direction) => {
                    let decl = PortDecl {
                        direction,
                        width: width_of(caps.get(3).map(|m| m.as_str())),
                        net_type: caps.get(2).and_then(|m| NetType::from_keyword(m.as_str())),
                    };
                    self.register_port(name, decl.clone());
                    previous = Some(decl);
                }
                // `input [3:0] a, b` - b continues the previous declaration
                None => match &previous {
                    Some(decl) => {
                        let decl = decl.clone();
                        self.register_port(name, decl);
                    }
                    None => self.unresolved_ports.push(name.to_string()),
                },
            }
        }
    }

    fn register_port(&mut self, name: &str, decl: PortDecl) {
        let port = Port {
            name: name.to_string(),
            width: decl.width.clone(),
            net_type: decl.net_type,
            direction: decl.direction,
        };
        let exists = |ports: &[Port]| ports.iter().any(|p| p.name == name);

        match decl.direction {
            Direction::Input if !exists(&self.scan.input_ports) => self.scan.input_ports.push(port),
            Direction::Output if !exists(&self.scan.output_ports) => {
                self.scan.output_ports.push(port)
            }
            // inout is only recorded as a direction
            _ => {}
        }
        self.scan.port_decls.insert(name.to_string(), decl);
    }

    fn scan_body(&mut self, line: &str) {
        for statement in split_statements(line) {
            if self.state == State::Done {
                return;
            }
            self.scan_statement(statement);
        }
    }

    fn scan_statement(&mut self, stmt: &str) {
        if ENDMODULE.is_match(stmt) {
            self.state = State::Done;
            return;
        }

        if let Some(end) = self.region_end {
            if strip_word(stmt, end).is_some() {
                self.block = self.saved_block.take();
                self.region_end = None;
            }
            return;
        }

        let recognised = self.enter_procedural_block(stmt)
            || self.enter_region(stmt)
            || self.scan_port_declaration(stmt)
            || self.scan_signal_declaration(stmt)
            || self.scan_parameter_declaration(stmt)
            || self.scan_continuous_assign(stmt)
            // `if (c) y <= f(x);` would otherwise look like an instance
            || self.scan_block_assignment(stmt)
            || self.scan_instantiation(stmt);

        if !recognised {
            trace!("skipped: {}", stmt);
        }
    }

    fn enter_procedural_block(&mut self, stmt: &str) -> bool {
        let Some(caps) = PROCEDURAL_HEADER.captures(stmt) else {
            return false;
        };
        let keyword = caps.get(1).map_or("", |m| m.as_str());
        let rest = caps.get(2).map_or("", |m| m.as_str()).trim_start();

        let (sensitivity, body) = match rest.strip_prefix('@') {
            Some(control) => {
                let control = control.trim_start();
                match control.strip_prefix('*') {
                    Some(after) => ("*", after),
                    None if control.starts_with('(') => split_group(control),
                    None => ("", control),
                }
            }
            None => ("", rest),
        };

        self.block = match keyword {
            "always_ff" => Some(OperationContext::Sequential),
            "always_comb" | "always_latch" => Some(OperationContext::Combinational),
            "always" if EDGE_KEYWORD.is_match(sensitivity) => Some(OperationContext::Sequential),
            "always" => Some(OperationContext::Combinational),
            // initial/final blocks describe no hardware
            _ => None,
        };

        let body = body.trim();
        if !body.is_empty() {
            self.scan_block_assignment(body);
        }
        true
    }

    fn enter_region(&mut self, stmt: &str) -> bool {
        let Some(caps) = REGION_HEADER.captures(stmt) else {
            return false;
        };
        self.region_end = Some(match &caps[1] {
            "function" => "endfunction",
            _ => "endtask",
        });
        self.saved_block = self.block.take();
        true
    }

    fn scan_port_declaration(&mut self, stmt: &str) -> bool {
        let Some(caps) = PORT_DECL.captures(stmt) else {
            return false;
        };
        let Some(direction) = Direction::from_keyword(&caps[1]) else {
            return false;
        };
        let width = width_of(caps.get(3).map(|m| m.as_str()));
        let net_type = caps.get(2).and_then(|m| NetType::from_keyword(m.as_str()));

        for name in caps[4].split(',').map(str::trim).filter(|n| !n.is_empty()) {
            self.register_port(
                name,
                PortDecl {
                    direction,
                    width: width.clone(),
                    net_type,
                },
            );
        }
        true
    }

    fn scan_signal_declaration(&mut self, stmt: &str) -> bool {
        let Some(caps) = SIGNAL_DECL.captures(stmt) else {
            return false;
        };
        let Some(net_type) = NetType::from_keyword(&caps[1]) else {
            return false;
        };
        let width = width_of(caps.get(2).map(|m| m.as_str()));

        for declarator in split_top_level(&caps[3], ',') {
            let Some(decl) = DECLARATOR.captures(declarator) else {
                trace!("unrecognised declarator: {}", declarator);
                continue;
            };
            let name = &decl[1];

            if self.scan.is_port(name) {
                // `output q; reg q;` types the port
                if let Some(port) = self.scan.port_mut(name) {
                    port.net_type.get_or_insert(net_type);
                }
                if let Some(port_decl) = self.scan.port_decls.get_mut(name) {
                    port_decl.net_type.get_or_insert(net_type);
                }
            } else if !self.scan.signals.iter().any(|s| s.name == name) {
                self.scan.signals.push(Signal {
                    name: name.to_string(),
                    net_type,
                    width: width.clone(),
                });
            }

            // A net declaration assignment is a continuous assignment
            if let (NetType::Wire, Some(expr)) = (net_type, decl.get(2)) {
                self.push_operation(
                    name,
                    expr.as_str(),
                    AssignmentKind::Continuous,
                    OperationContext::Combinational,
                );
            }
        }
        true
    }

    fn scan_parameter_declaration(&mut self, stmt: &str) -> bool {
        let Some(caps) = PARAM_DECL.captures(stmt) else {
            return false;
        };
        let local = &caps[1] == "localparam";

        for pair in split_parameter_pairs(&caps[2]) {
            match PARAM_PAIR.captures(pair.trim()) {
                Some(pair) => self.push_parameter(&pair[1], &pair[2], local),
                None => trace!("unrecognised parameter assignment: {}", pair),
            }
        }
        true
    }

    fn scan_continuous_assign(&mut self, stmt: &str) -> bool {
        let Some(caps) = CONTINUOUS_ASSIGN.captures(stmt) else {
            return false;
        };
        self.push_operation(
            &caps[1],
            &caps[2],
            AssignmentKind::Continuous,
            OperationContext::Combinational,
        );
        true
    }

    fn scan_instantiation(&mut self, stmt: &str) -> bool {
        let Some(caps) = INSTANTIATION.captures(stmt) else {
            return false;
        };
        let module_type = &caps[1];
        let instance = &caps[2];
        let leading_word = leading_identifier(stmt);
        if is_keyword(leading_word) || is_keyword(module_type) || is_keyword(instance) {
            return false;
        }

        let connections: Vec<String> = split_top_level(&caps[3], ',')
            .into_iter()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect();

        let operation = Operation {
            id: self.ids.next_id(),
            kind: OperationType::Instantiation,
            target: instance.to_string(),
            expression: format!("{}({})", module_type, connections.join(", ")),
            operands: connections,
            context: OperationContext::Structural,
        };
        self.scan.operations.push(operation);
        true
    }

    /// Procedural assignments are collected from the first block header on
    /// until `endmodule`, with the context of the most recent block.
    fn scan_block_assignment(&mut self, stmt: &str) -> bool {
        let Some(context) = self.block else {
            return false;
        };
        let stmt = strip_control_prefix(stmt);

        if let Some(caps) = NON_BLOCKING.captures(stmt) {
            self.push_operation(&caps[1], &caps[2], AssignmentKind::NonBlocking, context);
            return true;
        }
        if let Some(caps) = BLOCKING.captures(stmt) {
            self.push_operation(&caps[1], &caps[2], AssignmentKind::Blocking, context);
            return true;
        }
        false
    }

    fn push_operation(
        &mut self,
        target: &str,
        expr: &str,
        assignment: AssignmentKind,
        context: OperationContext,
    ) {
        let expression = expr.trim().to_string();
        let classification = classify_operation(&expression, Some(assignment));
        self.scan.operations.push(Operation {
            id: self.ids.next_id(),
            kind: classification.kind,
            target: target.trim().to_string(),
            expression,
            operands: classification.operands,
            context,
        });
    }

    fn push_parameter(&mut self, name: &str, value: &str, local: bool) {
        let value = value.trim();
        debug!("parameter {} = {}", name, value);
        self.scan.parameters.push(Parameter {
            name: name.to_string(),
            value: value.to_string(),
            local,
        });
    }

    fn finish(mut self) -> HeuristicScan {
        if self.state == State::InHeader {
            // Unterminated header: use what was collected
            self.finish_header();
        }

        // Header names without a direction default to input; inout drops out
        for name in std::mem::take(&mut self.unresolved_ports) {
            let decl = self.scan.port_decls.get(&name).cloned().unwrap_or(PortDecl {
                direction: Direction::Input,
                width: "1".to_string(),
                net_type: None,
            });
            self.register_port(&name, decl);
        }

        let mut scan = self.scan;
        let ports: Vec<String> = scan.port_decls.keys().cloned().collect();
        scan.signals.retain(|signal| !ports.contains(&signal.name));

        match &scan.module_name {
            Some(name) => debug!(
                "scanned module '{}': {} inputs, {} outputs, {} signals, {} parameters, {} operations",
                name,
                scan.input_ports.len(),
                scan.output_ports.len(),
                scan.signals.len(),
                scan.parameters.len(),
                scan.operations.len()
            ),
            None => warn!("no module declaration found"),
        }
        scan
    }
}

/// `[msb:lsb]` with each bound trimmed, or `"1"` when no range was written.
fn width_of(range: Option<&str>) -> String {
    let Some(range) = range.map(str::trim).filter(|r| !r.is_empty()) else {
        return "1".to_string();
    };
    range
        .strip_prefix('[')
        .and_then(|r| r.strip_suffix(']'))
        .and_then(|inner| inner.split_once(':'))
        .map(|(msb, lsb)| format!("[{}:{}]", msb.trim(), lsb.trim()))
        .unwrap_or_else(|| range.to_string())
}

/// Split a line into `;`-terminated statements, ignoring `;` nested in
/// parentheses (`for (i = 0; i < 4; i = i + 1)`).
fn split_statements(line: &str) -> Vec<&str> {
    let mut statements = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, c) in line.char_indices() {
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            ';' if depth == 0 => {
                statements.push(line[start..=i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    statements.push(line[start..].trim());
    statements.retain(|s| !s.is_empty());
    statements
}

/// Split on `separator` outside any bracket pair.
fn split_top_level(text: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, c) in text.char_indices() {
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            c if c == separator && depth == 0 => {
                parts.push(text[start..i].trim());
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(text[start..].trim());
    parts.retain(|p| !p.is_empty());
    parts
}

/// Split `(inner) rest` into `inner` and `rest`. An unclosed group takes the
/// remainder of the text.
fn split_group(text: &str) -> (&str, &str) {
    let Some(body) = text.strip_prefix('(') else {
        return ("", text);
    };

    let mut depth = 1usize;
    for (i, c) in body.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return (&body[..i], &body[i + 1..]);
                }
            }
            _ => {}
        }
    }
    (body, "")
}

/// Split `A = 1, B = {C, D}` only at commas followed by `name =`.
fn split_parameter_pairs(text: &str) -> Vec<&str> {
    let mut pairs = Vec::new();
    let mut start = 0;

    for (i, c) in text.char_indices() {
        if c == ',' && NAME_ASSIGN_AHEAD.is_match(&text[i + 1..]) {
            pairs.push(&text[start..i]);
            start = i + 1;
        }
    }
    pairs.push(&text[start..]);
    pairs
}

/// `word` followed by a non-identifier character (or nothing), returning
/// the remainder.
fn strip_word<'a>(text: &'a str, word: &str) -> Option<&'a str> {
    let rest = text.strip_prefix(word)?;
    match rest.chars().next() {
        Some(c) if c.is_ascii_alphanumeric() || c == '_' || c == '$' => None,
        _ => Some(rest),
    }
}

/// Remove `begin`, `end`, `else`, `if (...)`, loop and case headers, delays,
/// event controls and case labels in front of a procedural assignment.
fn strip_control_prefix(stmt: &str) -> &str {
    let mut rest = stmt.trim_start();

    loop {
        if let Some(after) = strip_word(rest, "begin").or_else(|| strip_word(rest, "end")) {
            let after = after.trim_start();
            rest = BLOCK_LABEL
                .find(after)
                .map_or(after, |m| &after[m.end()..])
                .trim_start();
            continue;
        }
        if let Some(after) = strip_word(rest, "else") {
            rest = after.trim_start();
            continue;
        }

        let guarded = ["if", "for", "while", "repeat", "case", "casez", "casex"]
            .iter()
            .find_map(|kw| strip_word(rest, kw))
            .or_else(|| rest.strip_prefix('@'))
            .map(str::trim_start)
            .filter(|after| after.starts_with('('));
        if let Some(after) = guarded {
            rest = split_group(after).1.trim_start();
            continue;
        }

        if let Some(after) = strip_word(rest, "unique").or_else(|| strip_word(rest, "priority")) {
            rest = after.trim_start();
            continue;
        }
        if let Some(m) = DELAY.find(rest) {
            rest = rest[m.end()..].trim_start();
            continue;
        }
        if let Some(m) = CASE_LABEL.find(rest) {
            // `pkg::NAME` is a scope, not a label
            if !rest[m.end()..].starts_with(':') {
                rest = rest[m.end()..].trim_start();
                continue;
            }
        }
        return rest;
    }
}

fn leading_identifier(text: &str) -> &str {
    let end = text
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '$'))
        .unwrap_or(text.len());
    &text[..end]
}

fn is_keyword(word: &str) -> bool {
    matches!(
        word,
        "module"
            | "endmodule"
            | "input"
            | "output"
            | "inout"
            | "wire"
            | "reg"
            | "logic"
            | "integer"
            | "genvar"
            | "assign"
            | "always"
            | "always_ff"
            | "always_comb"
            | "always_latch"
            | "initial"
            | "final"
            | "begin"
            | "end"
            | "if"
            | "else"
            | "case"
            | "casez"
            | "casex"
            | "endcase"
            | "for"
            | "while"
            | "repeat"
            | "forever"
            | "function"
            | "endfunction"
            | "task"
            | "endtask"
            | "generate"
            | "endgenerate"
            | "parameter"
            | "localparam"
            | "return"
            | "typedef"
            | "import"
            | "default"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statements_split_outside_parentheses() {
        assert_eq!(
            split_statements("assign a = b; assign c = d;"),
            vec!["assign a = b;", "assign c = d;"]
        );
        assert_eq!(
            split_statements("for (i = 0; i < 4; i = i + 1) x[i] <= 0;"),
            vec!["for (i = 0; i < 4; i = i + 1) x[i] <= 0;"]
        );
    }

    #[test]
    fn parameter_pairs_keep_concatenations_whole() {
        assert_eq!(
            split_parameter_pairs("A = 1, B = {C, D}, E=2"),
            vec!["A = 1", " B = {C, D}", " E=2"]
        );
    }

    #[test]
    fn control_prefixes_are_stripped() {
        assert_eq!(strip_control_prefix("if (rst) q <= 0;"), "q <= 0;");
        assert_eq!(strip_control_prefix("end else begin q <= d;"), "q <= d;");
        assert_eq!(strip_control_prefix("2'b01: y = b;"), "y = b;");
        assert_eq!(strip_control_prefix("default: y = 0;"), "y = 0;");
        assert_eq!(strip_control_prefix("begin : blk q <= d;"), "q <= d;");
        assert_eq!(strip_control_prefix("q <= sel ? a : b;"), "q <= sel ? a : b;");
    }

    #[test]
    fn widths_match_the_grammar_rendering() {
        assert_eq!(width_of(Some("[ WIDTH-1 : 0 ]")), "[WIDTH-1:0]");
        assert_eq!(width_of(Some("[3]")), "[3]");
        assert_eq!(width_of(None), "1");
    }

    #[test]
    fn instance_pattern_never_splits_a_word() {
        assert!(!INSTANTIATION.is_match("if (en) y <= (a);"));
        assert!(!INSTANTIATION.is_match("notify(a);"));
        let caps = INSTANTIATION
            .captures("fifo #(.DEPTH(4)) u_fifo (.clk(clk));")
            .expect("parameterised instance");
        assert_eq!((&caps[1], &caps[2]), ("fifo", "u_fifo"));
    }

    #[test]
    fn groups_split_at_matching_paren() {
        assert_eq!(split_group("(a, (b)) rest"), ("a, (b)", " rest"));
        assert_eq!(split_group("(open"), ("open", ""));
    }
}

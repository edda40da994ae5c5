use chumsky::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::ast::{
    HeaderPort, ModuleDecl, ModuleItem, ParamAssignment, PortDirection, ProceduralBlockType,
    Range, SourceUnit, Statement,
};
use crate::error::ExtractResult;
use crate::preprocessor::DirectiveExpander;
use crate::{
    Direction, NetType, ParseError, ParseErrorType, ParseResult, Port, SingleParseError,
    SourceLocation,
};

type Span = std::ops::Range<usize>;

pub struct SystemVerilogParser {
    expander: DirectiveExpander,
}

impl SystemVerilogParser {
    pub fn new(include_dirs: Vec<PathBuf>, initial_macros: HashMap<String, String>) -> Self {
        Self {
            expander: DirectiveExpander::new(include_dirs, initial_macros),
        }
    }

    /// Expand directives in `file_path` and parse the result with recovery.
    pub fn parse_file(&mut self, file_path: &Path) -> ExtractResult<ParseResult> {
        let expanded = self.expander.expand_file(file_path)?;
        Ok(self.parse_content_recovery(&expanded))
    }

    /// Parse with error recovery - returns partial AST even if there are errors
    pub fn parse_content_recovery(&self, content: &str) -> ParseResult {
        let (ast, chumsky_errors) = self.source_unit_parser().parse_recovery(content);

        let mut errors: Vec<SingleParseError> = chumsky_errors
            .iter()
            .map(|error| self.convert_chumsky_error(error, content))
            .collect();
        sort_by_location(&mut errors);

        ParseResult { ast, errors }
    }

    /// Strict parse: any diagnostic is an error.
    pub fn parse_content(&self, content: &str) -> Result<SourceUnit, ParseError> {
        let ParseResult { ast, errors } = self.parse_content_recovery(content);
        match ast {
            Some(unit) if errors.is_empty() => Ok(unit),
            _ if errors.is_empty() => Err(ParseError::new(SingleParseError::new(
                "Unknown parse error".to_string(),
                ParseErrorType::InvalidSyntax,
            ))),
            _ => Err(ParseError::multiple(errors)),
        }
    }

    fn span_to_location(&self, span: Span, content: &str) -> Option<SourceLocation> {
        if span.start > content.len() {
            return None;
        }

        let prefix = content.get(..span.start)?;
        let line = prefix.matches('\n').count();
        let column = prefix.split('\n').last().unwrap_or("").len();

        Some(SourceLocation {
            line,
            column,
            span: Some((span.start, span.end)),
        })
    }

    fn convert_chumsky_error(&self, error: &Simple<char>, content: &str) -> SingleParseError {
        let (message, error_type, suggestions) = match error.reason() {
            chumsky::error::SimpleReason::Unexpected => {
                let found = error
                    .found()
                    .map(|c| format!("'{}'", c.escape_default()))
                    .unwrap_or_else(|| "end of input".to_string());

                let expected: Vec<String> = error
                    .expected()
                    .map(|exp| match exp {
                        Some(c) => format!("'{}'", c.escape_default()),
                        None => "end of input".to_string(),
                    })
                    .filter(|exp| is_meaningful_expectation(exp))
                    .collect();

                if found == "end of input" {
                    (
                        "Unexpected end of input, missing 'endmodule' or ';'".to_string(),
                        ParseErrorType::UnexpectedEndOfInput,
                        vec!["Check that every statement and module is closed".to_string()],
                    )
                } else if expected.is_empty() {
                    (
                        format!("Unexpected {}", found),
                        ParseErrorType::UnexpectedToken,
                        Vec::new(),
                    )
                } else {
                    (
                        format!(
                            "Unexpected {}, expected {}",
                            found,
                            format_expectations(&expected)
                        ),
                        ParseErrorType::UnexpectedToken,
                        Vec::new(),
                    )
                }
            }
            chumsky::error::SimpleReason::Unclosed { delimiter, .. } => (
                format!("Unclosed delimiter '{}'", delimiter),
                ParseErrorType::ExpectedToken(delimiter.to_string()),
                vec![format!("Add closing '{}'", delimiter)],
            ),
            chumsky::error::SimpleReason::Custom(msg) => {
                (msg.clone(), ParseErrorType::InvalidSyntax, Vec::new())
            }
        };

        let mut single = SingleParseError::new(message, error_type).with_suggestions(suggestions);
        if let Some(location) = self.span_to_location(error.span(), content) {
            single = single.with_location(location);
        }
        single
    }

    fn source_unit_parser(&self) -> impl Parser<char, SourceUnit, Error = Simple<char>> + Clone {
        // Comments
        let line_comment = just("//").then(filter(|c| *c != '\n').repeated()).ignored();
        let block_comment = just("/*").then(take_until(just("*/"))).ignored();
        let comment = choice((line_comment, block_comment));

        let whitespace = choice((one_of(" \t\r\n").repeated().at_least(1).ignored(), comment))
            .repeated()
            .ignored();

        // Basic tokens
        let identifier_inner = filter(|c: &char| c.is_ascii_alphabetic() || *c == '_')
            .then(filter(|c: &char| c.is_ascii_alphanumeric() || *c == '_' || *c == '$').repeated())
            .map(|(first, rest): (char, Vec<char>)| {
                let mut result = String::new();
                result.push(first);
                result.extend(rest);
                result
            });

        let name_inner = identifier_inner.clone().try_map(|name: String, span: Span| {
            if is_reserved(&name) {
                Err(Simple::custom(span, format!("Unexpected keyword '{}'", name)))
            } else {
                Ok(name)
            }
        });

        let name = name_inner.clone().padded_by(whitespace.clone());

        let name_with_span = name_inner
            .clone()
            .map_with_span(|name, span: Span| (name, (span.start, span.end)))
            .padded_by(whitespace.clone());

        // Raw text with balanced parentheses; expressions stay unparsed
        let paren_group = recursive(|group| {
            choice((group, none_of("()").map(String::from)))
                .repeated()
                .delimited_by(just('('), just(')'))
                .map(|parts: Vec<String>| format!("({})", parts.concat()))
        });

        let expr_text = choice((paren_group.clone(), none_of("();").map(String::from)))
            .repeated()
            .at_least(1)
            .map(|parts: Vec<String>| parts.concat().trim().to_string());

        let list_item_text = choice((paren_group.clone(), none_of("(),;").map(String::from)))
            .repeated()
            .map(|parts: Vec<String>| parts.concat().trim().to_string());

        let comma = just(',').padded_by(whitespace.clone());
        let semicolon = just(';').padded_by(whitespace.clone());

        let port_direction = choice((
            kw("input").to(PortDirection::Input),
            kw("output").to(PortDirection::Output),
            kw("inout").to(PortDirection::Inout),
        ))
        .padded_by(whitespace.clone());

        let net_type = choice((
            kw("wire").to("wire"),
            kw("reg").to("reg"),
            kw("logic").to("logic"),
            kw("tri").to("tri"),
            kw("bit").to("bit"),
            kw("integer").to("integer"),
            kw("int").to("int"),
        ))
        .map(String::from)
        .padded_by(whitespace.clone());

        let signing = choice((kw("signed"), kw("unsigned")))
            .padded_by(whitespace.clone())
            .or_not()
            .ignored();

        // Range parser [msb:lsb] e.g., [7:0] or [WIDTH-1:0]
        let range = just('[')
            .ignore_then(none_of(":]").repeated().at_least(1).collect::<String>())
            .then_ignore(just(':'))
            .then(none_of("]").repeated().at_least(1).collect::<String>())
            .then_ignore(just(']'))
            .map(|(msb, lsb)| Range {
                msb: msb.trim().to_string(),
                lsb: lsb.trim().to_string(),
            })
            .padded_by(whitespace.clone());

        // Module header ports:
        // - just identifier: clk
        // - direction [type] [signed] [range] identifier: input wire [3:0] clk
        let directed_port = port_direction
            .clone()
            .then(net_type.clone().or_not())
            .then_ignore(signing.clone())
            .then(range.clone().or_not())
            .then(name_with_span.clone())
            .map_with_span(
                |(((direction, net_type), range), (name, name_span)), span: Span| HeaderPort {
                    name,
                    name_span,
                    direction: Some(direction),
                    net_type,
                    range,
                    span: (span.start, span.end),
                },
            );

        let bare_port = name_with_span
            .clone()
            .map_with_span(|(name, name_span), span: Span| HeaderPort {
                name,
                name_span,
                direction: None,
                net_type: None,
                range: None,
                span: (span.start, span.end),
            });

        let port_list = choice((directed_port, bare_port))
            .separated_by(comma.clone())
            .allow_trailing()
            .delimited_by(just('('), just(')'))
            .padded_by(whitespace.clone())
            .or_not()
            .map(|ports| inherit_ansi_directions(ports.unwrap_or_default()));

        let param_keyword = choice((kw("parameter").to(false), kw("localparam").to(true)))
            .padded_by(whitespace.clone());

        let param_assignment = name
            .clone()
            .then_ignore(just('=').padded_by(whitespace.clone()))
            .then(list_item_text.clone())
            .map(|(name, value)| ParamAssignment { name, value });

        // #(parameter WIDTH = 8, parameter DEPTH = 4)
        let param_port_list = just('#')
            .padded_by(whitespace.clone())
            .ignore_then(
                param_keyword
                    .clone()
                    .or_not()
                    .ignore_then(net_type.clone().or_not())
                    .ignore_then(signing.clone())
                    .ignore_then(range.clone().or_not())
                    .ignore_then(param_assignment.clone())
                    .separated_by(comma.clone())
                    .delimited_by(just('('), just(')')),
            )
            .padded_by(whitespace.clone());

        let port_declaration = port_direction
            .clone()
            .then(net_type.clone().or_not())
            .then_ignore(signing.clone())
            .then(range.clone().or_not())
            .then(name.clone().separated_by(comma.clone()).at_least(1))
            .then_ignore(semicolon.clone())
            .map_with_span(|(((direction, net_type), range), names), span: Span| {
                ModuleItem::PortDeclaration {
                    direction,
                    net_type,
                    range,
                    names,
                    span: (span.start, span.end),
                }
            });

        // wire a; reg [7:0] b, c; logic [3:0] d = 4'b0;
        let declarator = name
            .clone()
            .then_ignore(range.clone().repeated())
            .then_ignore(
                just('=')
                    .padded_by(whitespace.clone())
                    .then(list_item_text.clone())
                    .or_not(),
            );

        let net_declaration = net_type
            .clone()
            .then_ignore(signing.clone())
            .then(range.clone().or_not())
            .then(declarator.separated_by(comma.clone()).at_least(1))
            .then_ignore(semicolon.clone())
            .map_with_span(|((net_type, range), names), span: Span| {
                ModuleItem::NetDeclaration {
                    net_type,
                    range,
                    names,
                    span: (span.start, span.end),
                }
            });

        let parameter_declaration = param_keyword
            .clone()
            .then_ignore(net_type.clone().or_not())
            .then_ignore(signing.clone())
            .then_ignore(range.clone().or_not())
            .then(param_assignment.separated_by(comma.clone()).at_least(1))
            .then_ignore(semicolon.clone())
            .map_with_span(|(local, assignments), span: Span| {
                ModuleItem::ParameterDeclaration {
                    local,
                    assignments,
                    span: (span.start, span.end),
                }
            });

        let select_text = none_of("]")
            .repeated()
            .delimited_by(just('['), just(']'))
            .collect::<String>()
            .map(|s| format!("[{}]", s));

        let lvalue = choice((
            name_inner
                .clone()
                .then(select_text.repeated())
                .map(|(name, selects): (String, Vec<String>)| {
                    format!("{}{}", name, selects.concat())
                }),
            none_of("}")
                .repeated()
                .delimited_by(just('{'), just('}'))
                .collect::<String>()
                .map(|s| format!("{{{}}}", s)),
        ))
        .padded_by(whitespace.clone());

        let continuous_assign = kw("assign")
            .padded_by(whitespace.clone())
            .ignore_then(lvalue.clone())
            .then_ignore(just('=').padded_by(whitespace.clone()))
            .then(expr_text.clone())
            .then_ignore(semicolon.clone())
            .map_with_span(|(target, expr), span: Span| ModuleItem::ContinuousAssign {
                target,
                expr,
                span: (span.start, span.end),
            });

        // Leading word of a statement the grammar does not model (system
        // tasks, loops, event controls, ...)
        let opaque_head = choice((
            identifier_inner
                .clone()
                .try_map(|word: String, span: Span| {
                    if closes_region(&word) {
                        Err(Simple::custom(span, format!("Unexpected keyword '{}'", word)))
                    } else {
                        Ok(word)
                    }
                }),
            one_of("$#@`").map(String::from),
        ));

        let opaque_text = opaque_head
            .then(choice((paren_group.clone(), none_of("();").map(String::from))).repeated())
            .then_ignore(just(';'))
            .map(|(head, rest): (String, Vec<String>)| format!("{}{}", head, rest.concat()))
            .padded_by(whitespace.clone());

        // Statement parser for procedural blocks
        let statement = recursive(|statement| {
            let block = kw("begin")
                .padded_by(whitespace.clone())
                .ignore_then(just(':').padded_by(whitespace.clone()).ignore_then(name.clone()).or_not())
                .ignore_then(statement.clone().repeated())
                .then_ignore(kw("end").padded_by(whitespace.clone()))
                .then_ignore(just(':').padded_by(whitespace.clone()).ignore_then(name.clone()).or_not())
                .map(Statement::Block);

            let if_statement = kw("if")
                .padded_by(whitespace.clone())
                .ignore_then(paren_group.clone().padded_by(whitespace.clone()))
                .then(statement.clone())
                .then(
                    kw("else")
                        .padded_by(whitespace.clone())
                        .ignore_then(statement.clone())
                        .or_not(),
                )
                .map(|((condition, then_branch), else_branch)| Statement::If {
                    condition: strip_outer_parens(&condition),
                    then_branch: Box::new(then_branch),
                    else_branch: else_branch.map(Box::new),
                });

            let case_statement = choice((kw("case"), kw("casez"), kw("casex")))
                .padded_by(whitespace.clone())
                .ignore_then(paren_group.clone())
                .then(
                    take_until(kw("endcase"))
                        .map(|(body, ()): (Vec<char>, ())| body.into_iter().collect::<String>()),
                )
                .padded_by(whitespace.clone())
                .map(|(subject, body)| Statement::Case {
                    subject: strip_outer_parens(&subject),
                    body: body.trim().to_string(),
                });

            let assignment = lvalue
                .clone()
                .then(choice((just("<=").to(false), just('=').to(true))))
                .then(expr_text.clone())
                .then_ignore(semicolon.clone())
                .map(|((target, blocking), expr)| Statement::Assignment {
                    target,
                    blocking,
                    expr,
                });

            let empty = semicolon.clone().to(Statement::Other(String::new()));

            choice((
                block,
                if_statement,
                case_statement,
                assignment,
                opaque_text.clone().map(Statement::Other),
                empty,
            ))
            .boxed()
        });

        let block_type = choice((
            kw("always_ff").to(ProceduralBlockType::AlwaysFF),
            kw("always_comb").to(ProceduralBlockType::AlwaysComb),
            kw("always_latch").to(ProceduralBlockType::AlwaysLatch),
            kw("always").to(ProceduralBlockType::Always),
            kw("initial").to(ProceduralBlockType::Initial),
            kw("final").to(ProceduralBlockType::Final),
        ))
        .padded_by(whitespace.clone());

        // Optional event control like @(posedge clk), @(*) or @*
        let event_control = just('@')
            .padded_by(whitespace.clone())
            .ignore_then(choice((
                just('*').to("*".to_string()),
                paren_group.clone().map(|group| strip_outer_parens(&group)),
            )))
            .padded_by(whitespace.clone());

        let procedural_block = block_type
            .then(event_control.or_not())
            .then(statement)
            .map_with_span(|((block_type, sensitivity), body), span: Span| {
                ModuleItem::ProceduralBlock {
                    block_type,
                    sensitivity,
                    body,
                    span: (span.start, span.end),
                }
            });

        let skipped = choice((
            kw("function")
                .then(take_until(kw("endfunction")))
                .to("function"),
            kw("task").then(take_until(kw("endtask"))).to("task"),
            kw("generate")
                .then(take_until(kw("endgenerate")))
                .to("generate"),
        ))
        .padded_by(whitespace.clone())
        .map_with_span(|keyword: &str, span: Span| ModuleItem::Skipped {
            keyword: keyword.to_string(),
            span: (span.start, span.end),
        });

        // mux #(.W(8)) u1 (.a(a), .b(b));
        let instantiation = name
            .clone()
            .then_ignore(
                just('#')
                    .padded_by(whitespace.clone())
                    .then(paren_group.clone())
                    .padded_by(whitespace.clone())
                    .or_not(),
            )
            .then(name.clone())
            .then_ignore(range.clone().or_not())
            .then(
                list_item_text
                    .clone()
                    .separated_by(comma.clone())
                    .delimited_by(just('('), just(')'))
                    .padded_by(whitespace.clone()),
            )
            .then_ignore(semicolon.clone())
            .map_with_span(|((module_type, instance), connections), span: Span| {
                ModuleItem::Instantiation {
                    module_type,
                    instance,
                    connections: connections.into_iter().filter(|c| !c.is_empty()).collect(),
                    span: (span.start, span.end),
                }
            });

        let other_item = opaque_text.map_with_span(|text, span: Span| ModuleItem::Other {
            text,
            span: (span.start, span.end),
        });

        let module_item = choice((
            port_declaration,
            net_declaration,
            parameter_declaration,
            continuous_assign,
            procedural_block,
            skipped,
            instantiation,
            other_item,
        ))
        .boxed();

        // Module body with error recovery - skip to the next statement or endmodule
        let module_body = module_item
            .recover_with(skip_then_retry_until([';', 'e']))
            .repeated();

        let module_declaration = choice((kw("module"), kw("macromodule")))
            .padded_by(whitespace.clone())
            .ignore_then(name_with_span.clone())
            .then(param_port_list.or_not())
            .then(port_list)
            .then_ignore(semicolon.clone())
            .then(module_body)
            .then_ignore(kw("endmodule").padded_by(whitespace.clone()))
            .then_ignore(just(':').padded_by(whitespace.clone()).ignore_then(name.clone()).or_not())
            .map_with_span(
                |((((name, name_span), parameters), ports), items), span: Span| ModuleDecl {
                    name,
                    name_span,
                    parameters: parameters.unwrap_or_default(),
                    ports,
                    items,
                    span: (span.start, span.end),
                },
            );

        // Top-level text outside modules (packages, imports, typedefs) is
        // skipped, but a malformed module is never skipped over
        let top_level_head = identifier_inner.try_map(|word: String, span: Span| {
            if matches!(word.as_str(), "module" | "macromodule" | "endmodule") {
                Err(Simple::custom(span, format!("Unexpected keyword '{}'", word)))
            } else {
                Ok(word)
            }
        });

        let top_level_skip = choice((
            kw("package").then(take_until(kw("endpackage"))).ignored(),
            kw("interface").then(take_until(kw("endinterface"))).ignored(),
            top_level_head
                .then(none_of(";").repeated())
                .then(just(';'))
                .ignored(),
        ))
        .padded_by(whitespace.clone());

        choice((module_declaration.map(Some), top_level_skip.to(None)))
            .repeated()
            .then_ignore(end())
            .map(|modules| SourceUnit {
                modules: modules.into_iter().flatten().collect(),
            })
            .padded_by(whitespace)
    }
}

/// Port information recovered by the structural pass for the first module.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructuralPorts {
    pub module_name: Option<String>,
    pub input_ports: Vec<Port>,
    pub output_ports: Vec<Port>,
    /// Ports named in a non-ANSI header, direction still unknown
    pub header_ports: Vec<String>,
}

impl StructuralPorts {
    pub fn has_ports(&self) -> bool {
        !self.input_ports.is_empty()
            || !self.output_ports.is_empty()
            || !self.header_ports.is_empty()
    }
}

/// Collect the first module's name and header ports. `inout` ports are not
/// reported in either list.
pub fn extract_ports(unit: &SourceUnit) -> StructuralPorts {
    let Some(module) = unit.first_module() else {
        return StructuralPorts::default();
    };

    let mut ports = StructuralPorts {
        module_name: Some(module.name.clone()),
        ..StructuralPorts::default()
    };

    for port in &module.ports {
        let width = port
            .range
            .as_ref()
            .map(Range::to_string)
            .unwrap_or_else(|| "1".to_string());
        let net_type = port.net_type.as_deref().and_then(NetType::from_keyword);

        match port.direction {
            Some(PortDirection::Input) => ports.input_ports.push(Port {
                name: port.name.clone(),
                width,
                net_type,
                direction: Direction::Input,
            }),
            Some(PortDirection::Output) => ports.output_ports.push(Port {
                name: port.name.clone(),
                width,
                net_type,
                direction: Direction::Output,
            }),
            Some(PortDirection::Inout) => {}
            None => ports.header_ports.push(port.name.clone()),
        }
    }

    ports
}

/// In an ANSI header a bare name continues the previous port's declaration.
fn inherit_ansi_directions(mut ports: Vec<HeaderPort>) -> Vec<HeaderPort> {
    let ansi = ports.first().is_some_and(|port| port.direction.is_some());
    if !ansi {
        return ports;
    }

    for i in 1..ports.len() {
        if ports[i].direction.is_none() {
            let (before, after) = ports.split_at_mut(i);
            let previous = &before[i - 1];
            after[0].direction = previous.direction;
            after[0].net_type = previous.net_type.clone();
            after[0].range = previous.range.clone();
        }
    }
    ports
}

fn kw(word: &'static str) -> impl Parser<char, (), Error = Simple<char>> + Clone {
    text::keyword(word)
}

fn strip_outer_parens(text: &str) -> String {
    let trimmed = text.trim();
    trimmed
        .strip_prefix('(')
        .and_then(|inner| inner.strip_suffix(')'))
        .unwrap_or(trimmed)
        .trim()
        .to_string()
}

fn is_reserved(word: &str) -> bool {
    closes_region(word)
        || matches!(
            word,
            "module"
                | "macromodule"
                | "if"
                | "case"
                | "casez"
                | "casex"
                | "always"
                | "always_ff"
                | "always_comb"
                | "always_latch"
                | "initial"
                | "final"
                | "assign"
                | "input"
                | "output"
                | "inout"
                | "wire"
                | "reg"
                | "logic"
                | "tri"
                | "bit"
                | "int"
                | "integer"
                | "signed"
                | "unsigned"
                | "parameter"
                | "localparam"
                | "function"
                | "task"
                | "generate"
        )
}

fn closes_region(word: &str) -> bool {
    matches!(
        word,
        "begin"
            | "end"
            | "else"
            | "endcase"
            | "endmodule"
            | "endfunction"
            | "endtask"
            | "endgenerate"
    )
}

fn is_meaningful_expectation(exp: &str) -> bool {
    // Single letters are usually the inside of a keyword
    matches!(
        exp,
        "';'" | "'('" | "')'" | "'['" | "']'" | "','" | "'='" | "end of input"
    )
}

fn format_expectations(expected: &[String]) -> String {
    if expected.len() == 1 {
        expected[0].clone()
    } else if expected.len() <= 3 {
        expected.join(" or ")
    } else {
        format!("one of: {}", expected.join(", "))
    }
}

fn sort_by_location(errors: &mut [SingleParseError]) {
    errors.sort_by(|a, b| match (&a.location, &b.location) {
        (Some(loc_a), Some(loc_b)) => loc_a
            .line
            .cmp(&loc_b.line)
            .then_with(|| loc_a.column.cmp(&loc_b.column)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
}

use hdl_extract::relations::{signal_name, SignalEntry};
use hdl_extract::{
    extract_entities, Direction, EdgeKind, EntityRef, ExtractedModule, NetType, Operation,
    OperationContext, OperationType, Parameter, Port, RelationOptions, Signal,
};

mod common;

fn port(name: &str, width: &str, direction: Direction) -> Port {
    Port {
        name: name.to_string(),
        width: width.to_string(),
        net_type: None,
        direction,
    }
}

fn operation(id: &str, kind: OperationType, target: &str, expression: &str, operands: &[&str]) -> Operation {
    Operation {
        id: id.to_string(),
        kind,
        target: target.to_string(),
        expression: expression.to_string(),
        operands: operands.iter().map(|o| o.to_string()).collect(),
        context: OperationContext::Combinational,
    }
}

fn signal(name: &str) -> EntityRef {
    EntityRef::Signal(name.to_string())
}

fn op(id: &str) -> EntityRef {
    EntityRef::Operation(id.to_string())
}

fn param(name: &str) -> EntityRef {
    EntityRef::Parameter(name.to_string())
}

#[test]
fn test_signal_table_merges_ports_and_internals() {
    let module = ExtractedModule {
        name: Some("m".to_string()),
        input_ports: vec![port("a", "[3:0]", Direction::Input)],
        output_ports: vec![Port {
            net_type: Some(NetType::Reg),
            ..port("q", "1", Direction::Output)
        }],
        signals: vec![Signal {
            name: "tmp".to_string(),
            net_type: NetType::Logic,
            width: "[7:0]".to_string(),
        }],
        ..ExtractedModule::default()
    };

    let tables = extract_entities(&module, &RelationOptions::default());

    let names: Vec<&str> = tables.signals.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["a", "q", "tmp"]);
    assert_eq!(
        tables.signals["a"],
        SignalEntry {
            width: "[3:0]".to_string(),
            net_type: NetType::Wire,
            module: Some("m".to_string()),
            direction: Direction::Input,
        }
    );
    assert_eq!(tables.signals["q"].net_type, NetType::Reg);
    assert_eq!(tables.signals["tmp"].direction, Direction::Internal);
}

#[test]
fn test_adder_edges() {
    let extraction = common::TestHarness::default().extract_fixture("adder.v");
    let tables = &extraction.tables;

    assert!(tables.has_edge(&op("op-1"), &signal("a"), EdgeKind::UsesSignal));
    assert!(tables.has_edge(&op("op-1"), &signal("b"), EdgeKind::UsesSignal));
    assert!(tables.has_edge(&op("op-1"), &signal("sum"), EdgeKind::ProducesSignal));
    assert_eq!(tables.edges.len(), 3);
    assert_eq!(tables.operations["op-1"].kind, OperationType::Add);
}

#[test]
fn test_width_parameter_edge() {
    let extraction = common::TestHarness::default().extract_fixture("regfile.v");
    let tables = &extraction.tables;

    assert_eq!(tables.parameters["WIDTH"].value, "8");
    assert!(tables.has_edge(&signal("data"), &param("WIDTH"), EdgeKind::UsesParameter));
    assert!(tables.has_edge(&signal("out"), &param("WIDTH"), EdgeKind::UsesParameter));
    assert!(tables.has_edge(&signal("store"), &param("WIDTH"), EdgeKind::UsesParameter));
    assert!(!tables.has_edge(&signal("clk"), &param("WIDTH"), EdgeKind::UsesParameter));
}

#[test]
fn test_instantiation_edge() {
    let extraction = common::TestHarness::default().extract_fixture("top_mux.v");
    let tables = &extraction.tables;

    assert!(tables.has_edge(
        &EntityRef::Module("top".to_string()),
        &EntityRef::Module("mux".to_string()),
        EdgeKind::Instantiates,
    ));
    assert_eq!(tables.edges_of_kind(EdgeKind::UsesSignal).count(), 4);
    // The instance name is not a signal
    assert_eq!(tables.edges_of_kind(EdgeKind::ProducesSignal).count(), 0);
}

#[test]
fn test_instantiation_without_owner_has_no_module_edge() {
    let module = ExtractedModule {
        name: None,
        operations: vec![operation(
            "op-1",
            OperationType::Instantiation,
            "u1",
            "mux(a)",
            &["a"],
        )],
        ..ExtractedModule::default()
    };

    let tables = extract_entities(&module, &RelationOptions::default());
    assert_eq!(tables.edges_of_kind(EdgeKind::Instantiates).count(), 0);
}

#[test]
fn test_selects_and_named_connections_resolve() {
    let module = ExtractedModule {
        name: Some("m".to_string()),
        input_ports: vec![port("bus", "[7:0]", Direction::Input)],
        output_ports: vec![port("lane", "[1:0]", Direction::Output)],
        operations: vec![
            operation("op-1", OperationType::Or, "lane[0]", "bus[0] | bus[1]", &["bus[0]", "bus[1]"]),
            operation(
                "op-2",
                OperationType::Instantiation,
                "u0",
                "buf1(.i(bus[2]), .o(lane[1]))",
                &[".i(bus[2])", ".o(lane[1])"],
            ),
        ],
        ..ExtractedModule::default()
    };

    let tables = extract_entities(&module, &RelationOptions::default());

    assert!(tables.has_edge(&op("op-1"), &signal("lane"), EdgeKind::ProducesSignal));
    assert_eq!(
        tables
            .edges_of_kind(EdgeKind::UsesSignal)
            .filter(|e| e.source == op("op-1"))
            .count(),
        2
    );
    assert!(tables.has_edge(&op("op-2"), &signal("bus"), EdgeKind::UsesSignal));
    assert!(tables.has_edge(&op("op-2"), &signal("lane"), EdgeKind::UsesSignal));
}

// Substring matching is the default: `N` is found inside `MIN`
#[test]
fn test_parameter_substring_matching() {
    let extraction = common::TestHarness::default().extract_fixture("min_param.v");
    let tables = &extraction.tables;
    let add = &extraction.module.operations[0];

    assert!(tables.has_edge(&op(&add.id), &param("MIN"), EdgeKind::DependsOnParameter));
    assert!(tables.has_edge(&op(&add.id), &param("N"), EdgeKind::DependsOnParameter));
}

#[test]
fn test_parameter_word_boundary_matching() {
    let config = hdl_extract::ExtractorConfig::new().with_word_boundary_parameters(true);
    let extraction = common::TestHarness::with_config(config).extract_fixture("min_param.v");
    let tables = &extraction.tables;
    let add = &extraction.module.operations[0];

    assert!(tables.has_edge(&op(&add.id), &param("MIN"), EdgeKind::DependsOnParameter));
    assert!(!tables.has_edge(&op(&add.id), &param("N"), EdgeKind::DependsOnParameter));
}

#[test]
fn test_edges_only_reference_known_signals() {
    for fixture in [
        "adder.v", "alu.sv", "bidir.v", "dff.v", "idx_macro.sv", "legacy.v", "malformed.v",
        "min_param.v", "regfile.v", "top_mux.v",
    ] {
        let extraction = common::TestHarness::default().extract_fixture(fixture);
        for edge in &extraction.tables.edges {
            if matches!(edge.kind, EdgeKind::UsesSignal | EdgeKind::ProducesSignal) {
                match &edge.target {
                    EntityRef::Signal(name) => assert!(
                        extraction.tables.signals.contains_key(name),
                        "{}: edge {} targets unknown signal",
                        fixture,
                        edge
                    ),
                    other => panic!("{}: signal edge targets {}", fixture, other),
                }
            }
        }
    }
}

#[test]
fn test_inout_targets_produce_no_edges() {
    let extraction = common::TestHarness::default().extract_fixture("bidir.v");
    let tables = &extraction.tables;

    assert!(!tables.signals.contains_key("pin"));
    assert!(!tables
        .edges
        .iter()
        .any(|edge| edge.target == signal("pin")));
}

#[test]
fn test_parameter_table() {
    let module = ExtractedModule {
        name: Some("m".to_string()),
        parameters: vec![Parameter {
            name: "DEPTH".to_string(),
            value: "2 ** 4".to_string(),
            local: true,
        }],
        ..ExtractedModule::default()
    };

    let tables = extract_entities(&module, &RelationOptions::default());
    assert_eq!(tables.parameters["DEPTH"].value, "2 ** 4");
    assert_eq!(tables.parameters["DEPTH"].module.as_deref(), Some("m"));
}

#[test]
fn test_signal_name_reduction() {
    assert_eq!(signal_name("q[3:0]"), "q");
    assert_eq!(signal_name(".d(data)"), "data");
}

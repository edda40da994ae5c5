use hdl_extract::sink::{ExtractionSink, JsonSink};
use hdl_extract::Extraction;
use serde_json::Value;

mod common;

fn write_json(extractions: &[Extraction], pretty: bool) -> String {
    let mut sink = JsonSink::new(Vec::new()).pretty(pretty);
    for extraction in extractions {
        sink.accept(extraction).unwrap();
    }
    sink.finish().unwrap();
    String::from_utf8(sink.into_inner()).unwrap()
}

#[test]
fn test_json_document_shape() {
    let extraction = common::TestHarness::default().extract_fixture("adder.v");
    let output = write_json(&[extraction], false);
    let document: Value = serde_json::from_str(output.trim()).unwrap();

    assert_eq!(document["module"]["name"], "adder");
    assert_eq!(document["module"]["input_ports"][0]["name"], "a");
    assert_eq!(document["module"]["input_ports"][0]["width"], "[3:0]");
    assert_eq!(document["module"]["input_ports"][0]["direction"], "input");
    assert_eq!(document["module"]["operations"][0]["type"], "ADD");
    assert_eq!(document["module"]["operations"][0]["context"], "combinational");

    assert_eq!(document["tables"]["signals"]["sum"]["type"], "wire");
    assert_eq!(document["tables"]["signals"]["sum"]["module"], "adder");
    assert_eq!(document["tables"]["edges"][0]["source"], "operation_op-1");
    assert_eq!(document["tables"]["edges"][0]["target"], "signal_a");
    assert_eq!(document["tables"]["edges"][0]["kind"], "uses_signal");
}

#[test]
fn test_one_line_per_compact_document() {
    let harness = common::TestHarness::default();
    let extractions = vec![
        harness.extract_fixture("adder.v"),
        harness.extract_fixture("dff.v"),
    ];

    let output = write_json(&extractions, false);
    let lines: Vec<&str> = output.lines().collect();

    assert_eq!(lines.len(), 2);
    let second: Value = serde_json::from_str(lines[1]).unwrap();
    assert_eq!(second["module"]["operations"][0]["type"], "NON_BLOCKING_ASSIGN");
}

#[test]
fn test_documents_read_back() {
    let extraction = common::TestHarness::default().extract_fixture("top_mux.v");
    let output = write_json(std::slice::from_ref(&extraction), true);

    let parsed: Extraction = serde_json::from_str(output.trim()).unwrap();
    assert_eq!(parsed, extraction);
}

#[test]
fn test_empty_extraction_serializes() {
    let extraction = common::TestHarness::default().extract_fixture("no_module.v");
    let output = write_json(&[extraction], false);
    let document: Value = serde_json::from_str(output.trim()).unwrap();

    assert!(document["module"]["name"].is_null());
    assert_eq!(document["tables"]["edges"], Value::Array(vec![]));
}

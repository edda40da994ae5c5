use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use hdl_extract::preprocessor::{normalize_macro_calls, DirectiveExpander};
use hdl_extract::ExtractError;
use tempfile::TempDir;

fn create_temp_file(dir: &TempDir, filename: &str, content: &str) -> PathBuf {
    let file_path = dir.path().join(filename);
    fs::write(&file_path, content).unwrap();
    file_path
}

#[test]
fn test_idx_macro_normalized() {
    let code = "assign y = data[`IDX(3)] & data[`IDX(10)];";
    assert_eq!(
        normalize_macro_calls(code),
        "assign y = data[IDX3] & data[IDX10];"
    );
}

#[test]
fn test_normalization_leaves_other_text_alone() {
    let code = "module m(input a); assign b = `WIDTH + a; endmodule";
    assert_eq!(normalize_macro_calls(code), code);
}

#[test]
fn test_expand_simple_content() {
    let mut expander = DirectiveExpander::new(vec![], HashMap::new());
    let content = "module test; endmodule";

    let result = expander.expand_content(content, None).unwrap();
    assert_eq!(result.trim(), "module test; endmodule");
}

#[test]
fn test_define_lines_are_removed_and_expanded() {
    let mut expander = DirectiveExpander::new(vec![], HashMap::new());
    let content = "`define WIDTH 8\nreg [`WIDTH-1:0] data;";

    let result = expander.expand_content(content, None).unwrap();
    assert!(!result.contains("`define"));
    assert!(result.contains("reg [8-1:0] data;"));
}

#[test]
fn test_longer_macro_names_expand_first() {
    let mut expander = DirectiveExpander::new(vec![], HashMap::new());
    let content = "`define W 4\n`define W_MAX 15\nassign x = `W_MAX - `W;";

    let result = expander.expand_content(content, None).unwrap();
    assert!(result.contains("assign x = 15 - 4;"));
}

#[test]
fn test_initial_defines_are_used() {
    let mut defines = HashMap::new();
    defines.insert("DEPTH".to_string(), "32".to_string());
    let mut expander = DirectiveExpander::new(vec![], defines);

    let result = expander
        .expand_content("parameter D = `DEPTH;", None)
        .unwrap();
    assert!(result.contains("parameter D = 32;"));
}

#[test]
fn test_conditional_directives_keep_both_branches() {
    let mut expander = DirectiveExpander::new(vec![], HashMap::new());
    let content = r#"
`ifdef FAST
    wire a;
`else
    wire b;
`endif
module test; endmodule
"#;

    let result = expander.expand_content(content, None).unwrap();
    assert!(result.contains("wire a;"));
    assert!(result.contains("wire b;"));
    assert!(!result.contains("`ifdef"));
}

#[test]
fn test_include_relative() {
    let temp_dir = TempDir::new().unwrap();
    create_temp_file(&temp_dir, "params.vh", "parameter WIDTH = 8;");
    let main_path = create_temp_file(
        &temp_dir,
        "main.v",
        "`include \"params.vh\"\nmodule test; endmodule",
    );

    let mut expander = DirectiveExpander::new(vec![], HashMap::new());
    let result = expander.expand_file(&main_path).unwrap();

    assert!(result.contains("parameter WIDTH = 8;"));
    assert!(result.contains("module test; endmodule"));
}

#[test]
fn test_include_angle_brackets_from_incdir() {
    let temp_dir = TempDir::new().unwrap();
    let inc_dir = temp_dir.path().join("includes");
    fs::create_dir(&inc_dir).unwrap();
    fs::write(inc_dir.join("constants.vh"), "localparam DELAY = 10;").unwrap();

    let main_path = create_temp_file(
        &temp_dir,
        "main.v",
        "`include <constants.vh>\nmodule test; endmodule",
    );

    let mut expander = DirectiveExpander::new(vec![inc_dir], HashMap::new());
    let result = expander.expand_file(&main_path).unwrap();

    assert!(result.contains("localparam DELAY = 10;"));
}

#[test]
fn test_nested_includes() {
    let temp_dir = TempDir::new().unwrap();
    create_temp_file(&temp_dir, "deep.vh", "parameter DEEP = 42;");
    create_temp_file(
        &temp_dir,
        "middle.vh",
        "`include \"deep.vh\"\nparameter MID = 24;",
    );
    let top_path = create_temp_file(
        &temp_dir,
        "top.v",
        "`include \"middle.vh\"\nmodule test; endmodule",
    );

    let mut expander = DirectiveExpander::new(vec![], HashMap::new());
    let result = expander.expand_file(&top_path).unwrap();

    assert!(result.contains("parameter DEEP = 42;"));
    assert!(result.contains("parameter MID = 24;"));
}

#[test]
fn test_include_not_found() {
    let temp_dir = TempDir::new().unwrap();
    let main_path = create_temp_file(
        &temp_dir,
        "main.v",
        "module test;\n`include \"missing.vh\"\nendmodule",
    );

    let mut expander = DirectiveExpander::new(vec![], HashMap::new());
    match expander.expand_file(&main_path) {
        Err(ExtractError::IncludeNotFound { file, line }) => {
            assert_eq!(file, "missing.vh");
            assert_eq!(line, 2);
        }
        other => panic!("Expected IncludeNotFound, got {:?}", other),
    }
}

#[test]
fn test_file_read_error() {
    let mut expander = DirectiveExpander::new(vec![], HashMap::new());
    let result = expander.expand_file(&PathBuf::from("/nonexistent/path/file.v"));

    assert!(matches!(result, Err(ExtractError::Read(_, _))));
}

#[test]
fn test_self_include_is_reported() {
    let temp_dir = TempDir::new().unwrap();
    create_temp_file(&temp_dir, "loop.vh", "`include \"loop.vh\"\nwire w;");
    let top_path = create_temp_file(
        &temp_dir,
        "top.v",
        "module top;\n`include \"loop.vh\"\nendmodule",
    );

    let mut expander = DirectiveExpander::new(vec![], HashMap::new());
    match expander.expand_file(&top_path) {
        Err(ExtractError::IncludeCycle { file, line }) => {
            assert_eq!(file, "loop.vh");
            assert_eq!(line, 1);
        }
        other => panic!("Expected IncludeCycle, got {:?}", other),
    }
}

#[test]
fn test_guarded_mutual_include_is_reported() {
    let temp_dir = TempDir::new().unwrap();
    create_temp_file(
        &temp_dir,
        "a.vh",
        "`ifndef A_VH\n`define A_VH\n`include \"b.vh\"\n`endif",
    );
    create_temp_file(
        &temp_dir,
        "b.vh",
        "`ifndef B_VH\n`define B_VH\n`include \"a.vh\"\n`endif",
    );
    let top_path = create_temp_file(&temp_dir, "top.v", "`include \"a.vh\"\nmodule top;\nendmodule");

    let mut expander = DirectiveExpander::new(vec![], HashMap::new());
    let result = expander.expand_file(&top_path);

    assert!(matches!(result, Err(ExtractError::IncludeCycle { .. })));
}

#[test]
fn test_repeated_sibling_include_is_not_a_cycle() {
    let temp_dir = TempDir::new().unwrap();
    create_temp_file(&temp_dir, "defs.vh", "parameter P = 1;");
    let top_path = create_temp_file(
        &temp_dir,
        "top.v",
        "module top;\n`include \"defs.vh\"\n`include \"defs.vh\"\nendmodule",
    );

    let mut expander = DirectiveExpander::new(vec![], HashMap::new());
    let result = expander.expand_file(&top_path).unwrap();

    assert_eq!(result.matches("parameter P = 1;").count(), 2);
}

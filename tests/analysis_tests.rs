use codeshape::ast::{FunctionNode, SourceFile, TreeFilter};
use codeshape::var_flow::{VARIABLE_DEFINITION, VARIABLE_MENTION};
use codeshape::{AnalysisError, Mixer, SampleSize};
use indexmap::IndexMap;
use pretty_assertions::assert_eq;
use serde_json::json;

const ADD: &str = "function add(a, b){\n  const c = a + b;\n    return c;\n}";
const ONE_LINE: &str = "function a(){return 1}";
const FOO: &str = "function foo(a, b) {\n  return a + b;\n}";

const BLUE: &str = "rgb(65, 105, 225)";
const GREEN: &str = "rgb(0, 255, 0)";
const YELLOW: &str = "rgb(254, 255, 0)";

fn palette(entries: &[(&str, &str)]) -> IndexMap<String, String> {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

// ============ Functions ============

#[test]
fn test_function_catalogue() {
    let source = r#"
    'use strict'
    const zeroEks = require('../')
    const { join } = require('path')
    function a(z) {
      let b = function () {
        let c = 1;
      };
      let d = () => {
        let e = 2;
      };
      let f = new Function("{let g = 2;}");
      function h() {}
    }
    "#;
    let functions = SourceFile::parse(source).unwrap().functions().unwrap();
    let types: Vec<&str> = functions.iter().map(FunctionNode::node_type).collect();
    assert_eq!(
        types,
        vec![
            "FunctionDeclaration",
            "FunctionExpression",
            "ArrowFunctionExpression",
            "FunctionExpression",
            "FunctionDeclaration",
        ]
    );
    assert_eq!(functions[0].name(), Some("a"));
    assert_eq!(functions[0].params().len(), 1);
}

#[test]
fn test_every_function_form_is_found() {
    let source = r#"
    function a(){};
    function b(param){};
    (function c(){})();
    () =>{ };
    d = ()=>{ };
    e = (param) => retVal;
    (()=>{})()
    new Function('{return 0}')
    new Function('a', 'b', '{return a+b}')
    "#;
    let list = codeshape::function_list(source).unwrap();
    assert_eq!(list.functions.len(), 9);
    assert_eq!(list.normalized.len(), 9);
    assert!(list.available.is_empty());

    let iife = "(function(o, m, k, k2) {\n  if (k2 === undefined) k2 = k;\n  o[k2] = m[k];\n})()";
    assert_eq!(codeshape::function_list(iife).unwrap().functions.len(), 1);
}

#[test]
fn test_available_functions() {
    let source = "
    function a(){
      // invalid
    }
    function valid(parameter = 1){
      let variable = 1;
    }
    function b(){
      let c = 1;
      const d = 3;
    }
    function valid_c(){
      let variable_1 = 1;
      let variable_2 = 2;
      let variable_3 = 3;
    }
    ";
    let available = SourceFile::parse(source).unwrap().available_functions().unwrap();
    let names: Vec<Option<&str>> = available.iter().map(FunctionNode::name).collect();
    assert_eq!(names, vec![Some("valid"), Some("b"), Some("valid_c")]);
}

#[test]
fn test_available_functions_include_constructed() {
    let source = "
    function a(z){
      let [, b=1,...rest] = obj;
      let i = 2;
      let {j, k: {l}} = obj;
    }
    const c = ()=>{
      let [, bob=1,...rest] = obj;
    }
    const d = new Function('param', 'let [, bob=1,...rest] = obj;')
    ";
    let available = SourceFile::parse(source).unwrap().available_functions().unwrap();
    let types: Vec<&str> = available.iter().map(FunctionNode::node_type).collect();
    assert_eq!(
        types,
        vec!["FunctionDeclaration", "ArrowFunctionExpression", "FunctionExpression"]
    );
    let constructed = available[2].bindings().unwrap();
    assert_eq!(constructed.parameter_names(), vec!["param"]);
    assert_eq!(constructed.declaration_names(), vec!["bob", "...rest"]);
}

#[test]
fn test_normalized_functions() {
    let source = "
      function invalidF(){
      }
      function f1(PARA_METER=1){
        let variableName1 = 1;
        const variableName2 = 2;
        let VARIABLE_NAME_3 = 3;
        return VARIABLE_NAME_3;
      }
    ";
    let normalized = SourceFile::parse(source).unwrap().normalized_functions().unwrap();
    assert_eq!(normalized.len(), 2);

    let bindings = normalized[1].bindings().unwrap();
    assert_eq!(bindings.parameter_names(), vec!["paraMeter"]);
    assert_eq!(
        bindings.declaration_names(),
        vec!["variableName1", "variableName2", "variableName3"]
    );

    let text = normalized[1].render();
    assert!(text.starts_with("function f1(paraMeter=1){"));
    assert!(text.contains("return variableName3;"));
    assert!(!text.contains("VARIABLE_NAME_3"));
}

#[test]
fn test_typed_this_parameter_is_accepted() {
    let source = "function f(this: Window, a: number) { let b = a; }";
    let list = codeshape::function_list(source).unwrap();
    assert_eq!(list.available.len(), 1);
    let functions = SourceFile::parse(source).unwrap().functions().unwrap();
    assert_eq!(functions[0].bindings().unwrap().parameter_names(), vec!["a"]);

    let ranges = codeshape::heat_map(source, Mixer::Average, &IndexMap::new()).unwrap();
    assert!(ranges.iter().any(|r| r.color == BLUE));
}

// ============ Variables ============

#[test]
fn test_var_list_names() {
    let source = "function f(node) {
      const list = [node];
      const a = 1;
      const [b, , h=2, [j],...c] = o;
      const {d, e, g=1, k:{z},...f} = k2;
      let [path, ...rest] = node.parentPath;
      while (path) {
        list.unshift(path);
        path = path.parentPath;
      }
      return list;
    }";
    let vars = codeshape::var_list(source).unwrap();
    assert_eq!(
        vars.var_list,
        vec!["list", "a", "b", "h", "j", "...c", "d", "e", "g", "z", "...f", "path", "...rest"]
    );
    assert_eq!(vars.loc_list["list"].len(), 3);
    assert_eq!(vars.loc_list["path"].len(), 5);
}

#[test]
fn test_var_list_ranges_are_local_and_sorted() {
    let source = "const zero = 0;\nfunction f(x){\n  let y = x;\n  y = y + 1;\n  return y;\n}";
    let vars = codeshape::var_list(source).unwrap();
    assert_eq!(vars.var_list, vec!["y"]);
    assert_eq!(
        vars.loc_list["y"],
        vec![[2, 7, 2, 8], [3, 7, 3, 8], [3, 3, 3, 4], [4, 10, 4, 11]]
    );

    let value = serde_json::to_value(&vars).unwrap();
    assert_eq!(value["varList"], json!(["y"]));
    assert_eq!(value["locList"]["y"][0], json!([2, 7, 2, 8]));
}

#[test]
fn test_var_list_without_function() {
    assert_eq!(codeshape::var_list("let a = 1;").unwrap_err(), AnalysisError::NoFunction);
}

// ============ Lifecycle ============

#[test]
fn test_lifecycle() {
    let lifecycle = codeshape::lifecycle_data(ADD).unwrap();
    assert_eq!(lifecycle.node.node_type, "Program");
    assert_eq!(lifecycle.children.len(), 1);
    assert_eq!(lifecycle.children[0].node.node_type, "FunctionDeclaration");
    assert_eq!(lifecycle.children[0].children.len(), 4);
}

// ============ Phenograms ============

#[test]
fn test_phenogram() {
    let matrix = codeshape::phenogram(ADD, None).unwrap();
    assert_eq!(matrix.len(), 4);
    assert_eq!(matrix[0].len(), 19);
    let types: Vec<&str> = matrix[3][0].iter().map(|n| n.node_type.as_str()).collect();
    assert_eq!(types, vec!["Program", "FunctionDeclaration", "BlockStatement"]);
    assert!(matrix[3][1].is_empty());
}

#[test]
fn test_multi_phenogram_keeps_order() {
    let sample = SampleSize::new(10, 10).unwrap();
    let sources = vec![ONE_LINE.to_string(), ADD.to_string()];
    let matrices = codeshape::multi_phenogram(&sources, Some(sample)).unwrap();
    assert_eq!(matrices.len(), 2);
    for matrix in &matrices {
        assert_eq!(matrix.len(), 10);
        assert!(matrix.iter().all(|row| row.len() == 10));
    }
    assert!(matrices[0][1].iter().all(Vec::is_empty));
    assert_eq!(matrices[0][0][0][1].node_type, "FunctionDeclaration");
    assert_eq!(matrices[1][0][0][1].loc.end.line, 4);
}

#[test]
fn test_multi_phenogram_reports_parse_errors() {
    let sources = [ONE_LINE, "function ("];
    let err = codeshape::multi_phenogram(&sources, None).unwrap_err();
    assert!(matches!(err, AnalysisError::Parse { .. }));
}

// ============ Var Flow ============

#[test]
fn test_heat_map_default_palette() {
    let ranges = codeshape::heat_map(FOO, Mixer::Average, &IndexMap::new()).unwrap();
    let blue: Vec<[usize; 4]> = ranges
        .iter()
        .filter(|r| r.color == BLUE)
        .map(|r| r.range)
        .collect();
    assert_eq!(
        blue,
        vec![[1, 14, 1, 15], [1, 17, 1, 18], [2, 10, 2, 11], [2, 14, 2, 15]]
    );
}

#[test]
fn test_heat_map_with_overrides() {
    let overrides = palette(&[
        ("BlockStatement", YELLOW),
        ("ReturnStatement", GREEN),
        (VARIABLE_DEFINITION, ""),
        (VARIABLE_MENTION, ""),
    ]);
    let ranges = codeshape::heat_map(FOO, Mixer::Average, &overrides).unwrap();
    let value = serde_json::to_value(&ranges).unwrap();
    assert_eq!(value[1]["range"], json!([1, 20, 2, 3]));
    assert_eq!(value[1]["color"], json!(YELLOW));
    assert_eq!(value[2]["range"], json!([2, 3, 2, 16]));
    assert_eq!(value[2]["color"], json!("rgb(127, 255, 0)"));
}

#[test]
fn test_heat_map_accepts_css_color_names() {
    let overrides = palette(&[
        ("BlockStatement", "yellow"),
        ("ReturnStatement", "green"),
        (VARIABLE_DEFINITION, ""),
        (VARIABLE_MENTION, ""),
    ]);
    let ranges = codeshape::heat_map(FOO, Mixer::Average, &overrides).unwrap();
    assert_eq!(ranges[1].color, "rgb(255, 255, 0)");
    assert_eq!(ranges[2].range, [2, 3, 2, 16]);
    assert_eq!(ranges[2].color, "rgb(128, 192, 0)");
}

#[test]
fn test_mixer_changes_overlap_color() {
    let overrides = palette(&[
        ("BlockStatement", YELLOW),
        ("ReturnStatement", GREEN),
        (VARIABLE_DEFINITION, ""),
        (VARIABLE_MENTION, ""),
    ]);
    let ranges = codeshape::heat_map(FOO, Mixer::Harmonic, &overrides).unwrap();
    // Weights 1 and 1/2: two thirds of the outer yellow.
    assert_eq!(ranges[2].color, "rgb(169, 255, 0)");
}

// ============ Identifier Trees ============

#[test]
fn test_identifier_tree() {
    let code = "function f(a, b, c) { let d = a + b + c; return d; }";
    let filter = TreeFilter::new(Some(vec!["d".into()]), None, None).unwrap();
    let summary = codeshape::identifier_tree(code, &filter).unwrap();
    assert_eq!(serde_json::to_value(summary).unwrap(), json!([[["d"]], ["d"]]));

    let everything = codeshape::identifier_tree(code, &TreeFilter::default()).unwrap();
    assert_eq!(
        serde_json::to_value(everything).unwrap(),
        json!(["f", "a", "b", "c", [[["d", [["a", "b"], "c"]]], ["d"]]])
    );
}

#[test]
fn test_identifier_tree_rejects_conflicting_filters() {
    let err = TreeFilter::new(None, Some(vec!["Program".into()]), Some(vec!["File".into()])).unwrap_err();
    assert_eq!(err, AnalysisError::ConflictingTypeFilters);
}

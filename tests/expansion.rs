// End-to-end checks of the public compile API.

use macrojs::codegen::SourceMap;
use macrojs::{compile_source, CompileOptions, Compiler, ErrorType};

fn compile(source: &str) -> String {
    compile_source(source, CompileOptions::default()).unwrap().code
}

#[test]
fn recursive_macros_expand_to_a_fixed_point() {
    let source = "macro sum {\n    ($x:literal) => { $x }\n    ($x:literal, $($rest:literal),) => { $x + sum($($rest),) }\n}\nlet total = sum(1, 2, 3, 4);";
    assert_eq!(compile(source), "let total = 1 + (2 + (3 + 4));\n");
}

#[test]
fn macros_are_visible_after_their_declaration_only_in_scope() {
    let source = "function f() {\n    macro one { () => { 1 } }\n    return one();\n}\nlet one = 2;";
    assert_eq!(compile(source), "function f() {\n    return 1;\n}\nlet one = 2;\n");
}

#[test]
fn hygiene_colors_grow_per_expansion() {
    let source = "macro tmp { ($e:expr) => { let t = $e; use(t); } }\ntmp(1);\ntmp(2);\nlet t = 3;";
    assert_eq!(
        compile(source),
        "let t_1 = 1;\nuse(t_1);\nlet t_2 = 2;\nuse(t_2);\nlet t = 3;\n"
    );
}

#[test]
fn source_map_is_emitted_alongside_code() {
    let options = CompileOptions {
        source_name: "demo.js".to_string(),
        include_sources_content: true,
        ..CompileOptions::default()
    };
    let source = "macro id { ($e:expr) => { $e } }\nlet x = id(value);";
    let result = compile_source(source, options).unwrap();
    assert_eq!(result.code, "let x = value;\n");

    let map: SourceMap = result.map.unwrap();
    assert_eq!(map.version, 3);
    assert_eq!(map.sources, ["demo.js"]);
    assert_eq!(map.sources_content.as_deref(), Some(&[source.to_string()][..]));
    assert!(!map.mappings.is_empty());

    let json: serde_json::Value = serde_json::from_str(&map.to_json().unwrap()).unwrap();
    assert_eq!(json["version"], 3);
    assert!(json.get("sourcesContent").is_some());
}

#[test]
fn errors_render_as_miette_reports() {
    let err = compile_source("macro m { (a) => { 1 } }\nm(b);", CompileOptions::default()).unwrap_err();
    assert_eq!(err.error_type(), ErrorType::Expansion);
    let message = err.to_string();
    assert!(message.starts_with("in m: no matches found for macro m ("), "{message}");

    let report = format!("{:?}", miette::Report::new(err));
    assert!(report.contains("macrojs::expansion"), "{report}");
}

#[test]
fn trace_is_recorded_on_request() {
    let mut compiler = Compiler::new(CompileOptions {
        record_trace: true,
        ..CompileOptions::default()
    });
    compiler
        .expand_source("macro two { () => { 2 } }\nmacro tmp { () => { let t = 2; } }\nlet a = two();\ntmp();\ntmp();")
        .unwrap();
    let trace = compiler.trace();
    let names: Vec<_> = trace.iter().map(|step| step.macro_name.as_str()).collect();
    assert_eq!(names, ["two", "tmp", "tmp"]);

    let colors: Vec<_> = trace.iter().map(|step| step.color.map(|c| c.value())).collect();
    assert_eq!(colors, [None, Some(1), Some(2)]);
}

#[test]
fn caller_names_are_not_renamed_by_earlier_expansions() {
    let source = "macro foo { ($name:ident) => { let $name = 1; let two = 2; } }\nmacro id { ($e:expr) => { $e } }\nfoo(bar);\nlet two = 5;\nlog(id(two));";
    assert_eq!(
        compile(source),
        "let bar = 1;\nlet two_1 = 2;\nlet two = 5;\nlog(two);\n"
    );
}

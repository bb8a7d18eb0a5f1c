//! Runs the full pipeline over a real temporary tree with a scripted toolchain.

use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use serde_json::Value;

use scantest::core::types::UnitInfo;
use scantest::io::config::ScantestConfig;
use scantest::io::toolchain::Invocation;
use scantest::io::trigger;
use scantest::pipeline::{self, PipelineOptions};
use scantest::stages::printer::OutputMode;
use scantest::test_support::{ScriptedToolchain, go_tree};

/// Keeps the first report, then refuses to flush so the pipeline stops.
#[derive(Clone, Default)]
struct FirstReport {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl FirstReport {
    fn text(&self) -> String {
        String::from_utf8(self.bytes.lock().expect("lock").clone()).expect("utf8")
    }
}

impl Write for FirstReport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes.lock().expect("lock").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "reader went away"))
    }
}

fn unit(root: &Path, name: &str, imports: &[&str]) -> UnitInfo {
    UnitInfo {
        import_path: format!("example.com/{name}"),
        dir: root.join(name),
        imports: imports.iter().map(|s| s.to_string()).collect(),
        test_imports: vec!["testing".to_string()],
        standard: false,
    }
}

#[test]
fn first_cycle_reports_every_package_worst_first() {
    let tree = go_tree(&[
        ("calc/calc.go", "package calc"),
        ("calc/calc_test.go", "package calc"),
        ("calc/generated_by_gunit_test.go", "package calc"),
        ("app/main.go", "package main"),
        ("docs/README.md", "# docs"),
        (".git/hooks/x.go", "package hooks"),
    ]);
    let root = tree.path();
    let failing = "\
=== RUN   TestAdd
--- FAIL: TestAdd (0.00s)
FAIL\texample.com/calc\t0.001s
";
    let toolchain = ScriptedToolchain::new()
        .with_standard("fmt")
        .with_standard("testing")
        .with_unit(unit(root, "calc", &["fmt"]))
        .with_unit(unit(root, "app", &["example.com/calc"]))
        .with_test("example.com/calc", Invocation::exited(1, failing));

    let config = ScantestConfig {
        scan_interval_ms: 10,
        ..ScantestConfig::default()
    };
    let (_trigger, listener) = trigger::channel();
    let report = FirstReport::default();

    let err = pipeline::run(
        PipelineOptions {
            root: root.to_path_buf(),
            config,
            mode: OutputMode::Json,
        },
        toolchain,
        listener,
        report.clone(),
    )
    .expect_err("printer failure stops the pipeline");
    assert!(format!("{err:#}").contains("printer stage"));

    let text = report.text();
    let line = text.lines().next().expect("one report line");
    let json: Value = serde_json::from_str(line).expect("json");
    let packages = json["packages"].as_array().expect("packages");
    assert_eq!(packages.len(), 2);
    assert_eq!(packages[0]["PackageName"], "example.com/calc");
    assert_eq!(packages[0]["Status"], 2);
    assert_eq!(packages[0]["Failures"].as_array().map(Vec::len), Some(1));
    assert_eq!(packages[1]["PackageName"], "example.com/app");
    assert_eq!(packages[1]["Status"], 3);
    assert_eq!(packages[1]["Failures"], Value::Array(Vec::new()));
}

//! Extraction of per-test failure excerpts from `go test -v` output.
//!
//! The scanner is a single pass with no lookahead. Test binaries that
//! interleave output from parallel tests will be attributed to whichever
//! `=== RUN` line came last.

const RUN_PREFIX: &str = "=== RUN";
const TEST_NAME_PREFIX: &str = "Test";
const PACKAGE_FAIL_MARKER: &str = "FAIL";
const PASS_MARKER: &str = "--- PASS: Test";
const FAIL_MARKER: &str = "--- FAIL: Test";

/// `=== RUN   TestFoo`, with any run of whitespace before the name.
fn is_run_line(line: &str) -> bool {
    line.strip_prefix(RUN_PREFIX)
        .is_some_and(|rest| rest.trim_start().starts_with(TEST_NAME_PREFIX))
}

/// Line-oriented state machine over verbose test output.
#[derive(Debug)]
struct FailureScanner {
    buffer: String,
    /// Length of the `=== RUN` line opening `buffer`.
    header_len: usize,
    last_passed: bool,
    failures: Vec<String>,
}

impl FailureScanner {
    fn new() -> Self {
        Self {
            buffer: String::new(),
            header_len: 0,
            last_passed: true,
            failures: Vec::new(),
        }
    }

    fn feed(&mut self, line: &str) {
        if is_run_line(line) {
            if !self.buffer.is_empty() && !self.last_passed {
                self.failures.push(std::mem::take(&mut self.buffer));
            }
            self.buffer.clear();
            self.buffer.push_str(line);
            self.header_len = line.len();
        } else if line.starts_with(PACKAGE_FAIL_MARKER) {
            self.failures.push(self.buffer.clone());
        } else if line.starts_with(PASS_MARKER) {
            // A passing test keeps only its header.
            self.buffer.truncate(self.header_len);
            self.last_passed = true;
        } else if line.starts_with(FAIL_MARKER) {
            self.buffer.push_str(line);
            self.last_passed = false;
        } else {
            self.buffer.push_str(line);
        }
    }
}

/// Split the output of a failed run into one excerpt per failing test.
///
/// Each `FAIL` package line also records the case in flight when it appeared.
/// Every line keeps a trailing newline.
pub fn parse_failures(output: &str) -> Vec<String> {
    let mut scanner = FailureScanner::new();
    for line in output.lines() {
        scanner.feed(&format!("{line}\n"));
    }
    scanner.failures
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIXED: &str = "\
=== RUN TestFoo
    foo_test.go:12: expected 1, got 2
--- FAIL: TestFoo (0.00s)
=== RUN TestBar
--- PASS: TestBar (0.00s)
FAIL\texample.com/pkg\t0.003s
";

    #[test]
    fn failing_case_is_extracted_and_passing_result_dropped() {
        let failures = parse_failures(MIXED);
        assert_eq!(failures.len(), 2);
        assert_eq!(
            failures[0],
            "=== RUN TestFoo\n    foo_test.go:12: expected 1, got 2\n--- FAIL: TestFoo (0.00s)\n"
        );
        assert_eq!(failures[1], "=== RUN TestBar\n");
        assert!(failures.iter().all(|excerpt| !excerpt.contains("--- PASS")));
    }

    #[test]
    fn real_go_output_with_padded_run_lines_is_split_per_test() {
        let output = "\
=== RUN   TestFoo
    foo_test.go:12: expected 1, got 2
--- FAIL: TestFoo (0.00s)
=== RUN   TestBar
    bar_test.go:3: bar log
--- PASS: TestBar (0.00s)
FAIL
FAIL\texample.com/pkg\t0.003s
";
        let failures = parse_failures(output);
        assert_eq!(
            failures,
            vec![
                "=== RUN   TestFoo\n    foo_test.go:12: expected 1, got 2\n--- FAIL: TestFoo (0.00s)\n"
                    .to_string(),
                "=== RUN   TestBar\n".to_string(),
                "=== RUN   TestBar\n".to_string(),
            ]
        );
        assert!(failures.iter().all(|excerpt| !excerpt.contains("bar log")));
    }

    #[test]
    fn run_line_needs_a_test_name() {
        assert!(is_run_line("=== RUN   TestFoo\n"));
        assert!(is_run_line("=== RUN\tTestFoo/sub_case\n"));
        assert!(!is_run_line("=== RUN   ExampleFoo\n"));
        assert!(!is_run_line("=== PAUSE TestFoo\n"));
    }

    #[test]
    fn every_package_fail_line_records_the_buffer() {
        let output = format!("{MIXED}FAIL\n");
        let failures = parse_failures(&output);
        assert_eq!(failures.len(), 3);
        assert_eq!(failures[1], failures[2]);
    }

    #[test]
    fn trailing_summary_yields_in_flight_buffer() {
        let output = "\
=== RUN TestFoo
--- FAIL: TestFoo (0.00s)
FAIL\texample.com/pkg\t0.003s
";
        let failures = parse_failures(output);
        assert_eq!(
            failures,
            vec!["=== RUN TestFoo\n--- FAIL: TestFoo (0.00s)\n".to_string()]
        );
    }

    #[test]
    fn panic_output_stays_with_its_test() {
        let output = "\
=== RUN TestBoom
panic: runtime error: index out of range
goroutine 7 [running]:
FAIL\texample.com/pkg\t0.010s
";
        let failures = parse_failures(output);
        assert_eq!(failures.len(), 1);
        assert!(failures[0].starts_with("=== RUN TestBoom\npanic:"));
        assert!(failures[0].contains("goroutine 7"));
    }

    #[test]
    fn consecutive_failures_each_get_an_excerpt() {
        let output = "\
=== RUN TestOne
--- FAIL: TestOne (0.00s)
=== RUN TestTwo
--- FAIL: TestTwo (0.00s)
FAIL\texample.com/pkg\t0.003s
";
        let failures = parse_failures(output);
        assert_eq!(
            failures,
            vec![
                "=== RUN TestOne\n--- FAIL: TestOne (0.00s)\n".to_string(),
                "=== RUN TestTwo\n--- FAIL: TestTwo (0.00s)\n".to_string(),
            ]
        );
    }

    #[test]
    fn output_without_markers_yields_nothing() {
        assert!(parse_failures("ok  \texample.com/pkg\t0.002s\n").is_empty());
        assert!(parse_failures("").is_empty());
    }
}

//! Classification of `go test` exit codes.

use crate::core::failures::parse_failures;
use crate::core::types::{Status, TestResult};

/// Map a test-step exit code onto a result.
///
/// - `0`: the tests ran and passed.
/// - `1`: at least one test failed or panicked; failure excerpts are parsed.
/// - anything else, or no code at all (signal, kill): the package did not
///   build, so no tests ran and the output is kept verbatim.
pub fn classify_test_exit(unit: &str, exit_code: Option<i32>, output: String) -> TestResult {
    match exit_code {
        Some(0) => TestResult::new(unit, Status::TestsPassed, output),
        Some(1) => {
            let failures = parse_failures(&output);
            TestResult {
                failures,
                ..TestResult::new(unit, Status::TestsFailed, output)
            }
        }
        Some(_) | None => TestResult::new(unit, Status::CompileFailed, output),
    }
}

use std::fmt::Write as _;
use std::io::{self, IsTerminal, Write};
use std::sync::Mutex;
use std::time::Duration;

use proctor_matcher::{format_differences, format_unmatched};
use proctor_runner::{Reporter, RunId, SuiteSummary, TestResult, TestStatus};
use tracing::debug;

use crate::writer::{lock, Sink};

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";

/// Line-per-test output with failure details indented underneath.
pub struct HumanReporter {
    out: Sink,
    verbose: bool,
    color: bool,
}

impl HumanReporter {
    /// Writes to stdout, coloured when stdout is a terminal and `NO_COLOR`
    /// is unset.
    pub fn stdout(verbose: bool) -> Self {
        let color = io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none();
        Self::with_writer(io::stdout(), verbose, color)
    }

    pub fn with_writer<W: Write + Send + 'static>(writer: W, verbose: bool, color: bool) -> Self {
        Self {
            out: Mutex::new(Box::new(writer)),
            verbose,
            color,
        }
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.color {
            format!("{code}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    fn emit(&self, text: &str) {
        let mut out = lock(&self.out);
        if let Err(e) = out.write_all(text.as_bytes()).and_then(|_| out.flush()) {
            debug!(error = %e, "report output dropped");
        }
    }

    fn render_test(&self, result: &TestResult) -> String {
        let (label, code) = match result.status {
            TestStatus::Passed => ("PASS", GREEN),
            TestStatus::Skipped => ("SKIP", YELLOW),
            _ => ("FAIL", RED),
        };
        let mut text = String::new();
        let _ = writeln!(
            text,
            "  {} {}",
            self.paint(code, &format!("[{label}] {}", result.name)),
            self.paint(DIM, &format!("({})", human_duration(result.duration)))
        );
        if let Some(error) = &result.error {
            let _ = writeln!(text, "    {}", self.paint(RED, &format!("Error: {error}")));
        }
        if result.status == TestStatus::Failed {
            text.push_str(&indent(&format_differences(&result.differences), "    "));
            text.push_str(&indent(&format_unmatched(&result.unmatched), "    "));
        }
        text
    }
}

impl Reporter for HumanReporter {
    fn start_suite(&self, _run_id: &RunId, total: usize) {
        self.emit(&format!("Running {total} test(s)...\n\n"));
    }

    fn start_test(&self, name: &str) {
        if self.verbose {
            self.emit(&format!("  {}\n", self.paint(DIM, &format!("[RUN ] {name}"))));
        }
    }

    fn end_test(&self, result: &TestResult) {
        self.emit(&self.render_test(result));
    }

    fn end_suite(&self, summary: &SuiteSummary) {
        let mut text = String::new();
        let _ = writeln!(text, "{}", "-".repeat(60));
        let failed = format!("{} failed", summary.failed);
        let _ = write!(
            text,
            "Results: {}, {}",
            self.paint(GREEN, &format!("{} passed", summary.passed)),
            if summary.failed > 0 { self.paint(RED, &failed) } else { failed }
        );
        if summary.skipped > 0 {
            let _ = write!(text, ", {}", self.paint(YELLOW, &format!("{} skipped", summary.skipped)));
        }
        let _ = writeln!(text, " of {} total", summary.total);
        let _ = writeln!(text, "{}", self.paint(DIM, &format!("Duration: {}", human_duration(summary.duration))));
        text.push('\n');
        let verdict = if summary.success() {
            self.paint(GREEN, "PASSED")
        } else {
            self.paint(RED, "FAILED")
        };
        let _ = writeln!(text, "{verdict}");
        self.emit(&text);
    }
}

fn human_duration(d: Duration) -> String {
    format!("{d:.2?}")
}

fn indent(block: &str, prefix: &str) -> String {
    block.lines().map(|line| format!("{prefix}{line}\n")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::SharedBuffer;
    use proctor_core::{Expectation, HeadersExpectation, ProcessingPhase};
    use proctor_matcher::Difference;
    use proctor_runner::TestError;

    fn result(name: &str, status: TestStatus) -> TestResult {
        let mut r = TestResult::skipped(name, "suite", None);
        r.status = status;
        r.duration = Duration::from_millis(3);
        r
    }

    #[test]
    fn test_plain_output_for_a_mixed_run() {
        let buf = SharedBuffer::new();
        let reporter = HumanReporter::with_writer(buf.clone(), false, false);

        reporter.start_suite(&RunId::from_str("r"), 3);
        reporter.start_test("ok");
        reporter.end_test(&result("ok", TestStatus::Passed));

        let mut failed = result("bad", TestStatus::Failed);
        failed.differences.push(Difference::new(
            ProcessingPhase::RequestHeaders,
            "set_headers[x-custom-header]",
            "custom-value",
            "wrong-value",
        ));
        failed.unmatched.push(Expectation::headers(
            ProcessingPhase::RequestBody,
            HeadersExpectation::default(),
        ));
        reporter.end_test(&failed);
        reporter.end_test(&TestResult::skipped("later", "suite", Some(TestError::Cancelled)));
        reporter.end_suite(&SuiteSummary {
            total: 3,
            passed: 1,
            failed: 1,
            skipped: 1,
            duration: Duration::from_millis(12),
        });

        let out = buf.contents();
        assert!(out.starts_with("Running 3 test(s)...\n\n"));
        assert!(out.contains("  [PASS] ok (3.00ms)\n"));
        assert!(out.contains("  [FAIL] bad (3.00ms)\n"));
        assert!(out.contains("    Differences:\n      [REQUEST_HEADERS] set_headers[x-custom-header]:\n"));
        assert!(out.contains("        expected: custom-value\n        actual:   wrong-value\n"));
        assert!(out.contains("    Unmatched expectations:\n      - Phase: REQUEST_BODY\n"));
        assert!(out.contains("  [SKIP] later"));
        assert!(out.contains("    Error: run cancelled before the test case started\n"));
        assert!(out.contains("Results: 1 passed, 1 failed, 1 skipped of 3 total\n"));
        assert!(out.trim_end().ends_with("FAILED"));
        assert!(!out.contains('\x1b'));
        assert!(!out.contains("[RUN ]"));
    }

    #[test]
    fn test_verbose_and_colour() {
        let buf = SharedBuffer::new();
        let reporter = HumanReporter::with_writer(buf.clone(), true, true);

        reporter.start_test("ok");
        reporter.end_test(&result("ok", TestStatus::Passed));
        reporter.end_suite(&SuiteSummary {
            total: 1,
            passed: 1,
            ..SuiteSummary::default()
        });

        let out = buf.contents();
        assert!(out.contains("[RUN ] ok"));
        assert!(out.contains(&format!("{GREEN}[PASS] ok{RESET}")));
        assert!(out.contains(&format!("{GREEN}PASSED{RESET}")));
    }
}

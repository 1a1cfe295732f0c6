use crate::executor::{RunOutcome, RunResult};
use crate::input::Input;

/// A crash observed for one input, as reported by an [`Oracle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrashReport<I: Input> {
    /// The input that was executed.
    pub input: I,
    /// Non-zero exit status of the target.
    pub exit_code: i32,
    /// Captured output of the crashing run; the deduplication key.
    pub output: String,
    /// MD5 of the input bytes, lowercase hex.
    pub input_hash: String,
}

/// An `Oracle` decides whether a finished run is a crash worth recording.
pub trait Oracle<I: Input>: Send + Sync {
    /// Examines the result of running `input`.
    ///
    /// # Returns
    /// `Some(CrashReport)` for an interesting run, otherwise `None`.
    fn examine(&self, input: &I, result: &RunResult) -> Option<CrashReport<I>>;
}

/// Reports every run that exited with a non-zero status.
///
/// The cause of the exit is not inspected: an explicit failure code and a
/// signal are treated alike. Clean exits and timeouts are never crashes.
#[derive(Debug, Default)]
pub struct CrashOracle;

impl CrashOracle {
    /// Creates a new `CrashOracle`.
    pub fn new() -> Self {
        CrashOracle
    }
}

impl<I: Input> Oracle<I> for CrashOracle {
    fn examine(&self, input: &I, result: &RunResult) -> Option<CrashReport<I>> {
        match result.outcome {
            RunOutcome::Exited(code) if code != 0 => Some(CrashReport {
                input: input.clone(),
                exit_code: code,
                output: result.output.clone(),
                input_hash: format!("{:x}", md5::compute(input.as_bytes())),
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crash_oracle_detects_nonzero_exit_and_creates_valid_report() {
        let oracle = CrashOracle::new();
        let input = "<<a>".to_string();
        let result = RunResult::exited(1, "bad\n");

        let report = oracle
            .examine(&input, &result)
            .expect("Oracle should report a non-zero exit");
        assert_eq!(report.input, input);
        assert_eq!(report.exit_code, 1);
        assert_eq!(report.output, "bad\n");
        assert_eq!(
            report.input_hash,
            format!("{:x}", md5::compute(input.as_bytes()))
        );
    }

    #[test]
    fn crash_oracle_reports_signal_style_codes() {
        let oracle = CrashOracle::new();
        let report = oracle.examine(&"x".to_string(), &RunResult::exited(139, ""));
        assert_eq!(report.map(|r| r.exit_code), Some(139));
    }

    #[test]
    fn crash_oracle_ignores_zero_exit_regardless_of_output() {
        let oracle = CrashOracle::new();
        let result = RunResult::exited(0, "Segmentation fault\n");
        assert!(oracle.examine(&"x".to_string(), &result).is_none());
    }

    #[test]
    fn crash_oracle_ignores_timeout() {
        let oracle = CrashOracle::new();
        assert!(
            oracle
                .examine(&"x".to_string(), &RunResult::timed_out())
                .is_none()
        );
    }

    #[test]
    fn empty_input_hash_is_md5_of_nothing() {
        let report = CrashOracle
            .examine(&String::new(), &RunResult::exited(2, ""))
            .unwrap();
        assert_eq!(report.input_hash, "d41d8cd98f00b204e9800998ecf8427e");
    }
}

use rpcbench_core::{JobResult, JobState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,

    /// Invalid CLI/job input (bad flags, unknown scenario, malformed properties, unreadable PEM files).
    InvalidInput = 30,

    /// The job could not produce statistics (connect failure, no completed requests).
    RuntimeError = 40,

    /// The job completed and published statistics, but one or more connections failed.
    CompletedWithErrors = 50,
}

impl ExitCode {
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    #[must_use]
    pub fn from_job_result(res: &JobResult) -> Self {
        if res.state != JobState::Completed {
            return Self::RuntimeError;
        }

        match (res.has_errors(), res.requests_per_sec.is_some()) {
            (false, _) => Self::Success,
            (true, true) => Self::CompletedWithErrors,
            (true, false) => Self::RuntimeError,
        }
    }
}

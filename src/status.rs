//! Exit status codes for the CLI
//!
//! flowsim follows standard Unix exit code conventions:
//! - 0: Success
//! - 1: Any error (bad arguments, config problems, local validation errors)
//! - 10: A workflow run was aborted because a step failed
//! - 130: User interrupted (Ctrl+C, standard SIGINT exit code)

use std::process::{ExitCode, Termination};

/// Exit status codes following standard Unix conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitStatus {
    /// Successful execution
    Success = 0,
    /// Any error
    Error = 1,
    /// A step failed (non-2xx or transport error)
    StepFailed = 10,
    /// User interrupted (Ctrl+C) - standard SIGINT code
    Interrupted = 130,
}

impl From<ExitStatus> for ExitCode {
    fn from(status: ExitStatus) -> Self {
        ExitCode::from(status as u8)
    }
}

impl Termination for ExitStatus {
    fn report(self) -> ExitCode {
        ExitCode::from(self as u8)
    }
}

impl ExitStatus {
    /// Exit status for a single executed step
    pub fn from_http_status(status_code: u16) -> Self {
        if (200..300).contains(&status_code) {
            ExitStatus::Success
        } else {
            ExitStatus::StepFailed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_http_status() {
        assert_eq!(ExitStatus::from_http_status(200), ExitStatus::Success);
        assert_eq!(ExitStatus::from_http_status(201), ExitStatus::Success);
        assert_eq!(ExitStatus::from_http_status(0), ExitStatus::StepFailed);
        assert_eq!(ExitStatus::from_http_status(422), ExitStatus::StepFailed);
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(ExitStatus::Success as u8, 0);
        assert_eq!(ExitStatus::StepFailed as u8, 10);
        assert_eq!(ExitStatus::Interrupted as u8, 130);
    }
}

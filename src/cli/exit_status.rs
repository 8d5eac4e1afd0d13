use std::process::ExitCode;

/// Exit status for CLI commands, following common conventions for batch
/// analysis tools.
///
/// - `Success` (0): run completed, no error-severity hints
/// - `Failure` (1): run completed but error-severity hints were found
/// - `Error` (2): the pipeline itself failed (config error, missing
///   workspace, unresolvable templates)
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ExitStatus {
    Success,
    Failure,
    Error,
}

impl From<ExitStatus> for ExitCode {
    fn from(status: ExitStatus) -> Self {
        match status {
            ExitStatus::Success => ExitCode::from(0),
            ExitStatus::Failure => ExitCode::from(1),
            ExitStatus::Error => ExitCode::from(2),
        }
    }
}

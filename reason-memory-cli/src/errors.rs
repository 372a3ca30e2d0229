//! CLI-facing error wrapper: maps [`reason_memory_core::Error`] kinds onto
//! process exit codes and adds short operator-facing suggestions.

use colored::Colorize;

/// Exit codes the binary returns, chosen so scripts can branch on failure
/// class without parsing stderr.
pub const EXIT_OK: i32 = 0;
pub const EXIT_VALIDATION: i32 = 2;
pub const EXIT_CONFIRMATION_REQUIRED: i32 = 3;
pub const EXIT_AUTH: i32 = 4;
pub const EXIT_OTHER: i32 = 1;

/// Classifies a core error into an exit code.
#[must_use]
pub fn exit_code(err: &reason_memory_core::Error) -> i32 {
    match err {
        reason_memory_core::Error::Validation(_) => EXIT_VALIDATION,
        reason_memory_core::Error::ConfirmationRequired(_) => EXIT_CONFIRMATION_REQUIRED,
        reason_memory_core::Error::Auth(_) => EXIT_AUTH,
        _ => EXIT_OTHER,
    }
}

/// Prints a core error to stderr with a one-line suggestion, where one applies.
pub fn print_error(err: &reason_memory_core::Error) {
    eprintln!("{} {err}", "error:".red().bold());
    let help = match err {
        reason_memory_core::Error::ConfirmationRequired(_) => {
            Some("pass --confirm to proceed with this destructive operation")
        }
        reason_memory_core::Error::Auth(_) => {
            Some("check the configured API key and model identifier")
        }
        reason_memory_core::Error::Validation(_) => Some("check --help for this subcommand's input constraints"),
        _ => None,
    };
    if let Some(help) = help {
        eprintln!("  {} {help}", "help:".yellow().bold());
    }
}

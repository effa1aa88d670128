//! cforest binary.
//!
//! Exit codes:
//! - 0: success
//! - 1: general failure
//! - 2: request rejected (validation or cycle)
//! - 3: corpus not found
//! - 4: retryable failure (conflict or store outage)

use std::process::ExitCode;

use corpus_forest::manager::{ErrorKind, ManagerError};

fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<ManagerError>().map(ManagerError::kind) {
        Some(ErrorKind::Rejected) => 2,
        Some(ErrorKind::NotFound) => 3,
        Some(ErrorKind::Retryable) => 4,
        None => 1,
    }
}

fn main() -> ExitCode {
    match corpus_forest::cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::from(exit_code(&err))
        }
    }
}

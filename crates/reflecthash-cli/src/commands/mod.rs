//! Subcommand implementations.

pub mod hash;
pub mod json_hash;
pub mod normalize_float;

use std::io::{self, Read};

use thiserror::Error;

/// Failure to obtain command input.
#[derive(Debug, Error)]
pub enum InputError {
    /// The named file could not be read.
    #[error("Failed to read file {path}: {source}")]
    File {
        path: String,
        #[source]
        source: io::Error,
    },
    /// Standard input could not be read.
    #[error("Failed to read stdin: {0}")]
    Stdin(#[source] io::Error),
}

/// Reads `input` as a file path, or all of stdin when absent.
pub fn read_input(input: Option<String>) -> Result<String, InputError> {
    match input {
        Some(path) => {
            std::fs::read_to_string(&path).map_err(|source| InputError::File { path, source })
        }
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .map_err(InputError::Stdin)?;
            Ok(buffer)
        }
    }
}

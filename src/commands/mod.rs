mod config;
mod list;
mod records;

pub use config::{cmd_config_get, cmd_config_path, cmd_config_set, cmd_config_show};
pub use list::{ListOptions, build_list_query, cmd_list, cmd_options, cmd_resources};
pub use records::{cmd_call_log, cmd_lead_create, cmd_lead_update};

use serde::Serialize;

use crate::error::{LeadboardError, Result};
use crate::query::ErrorInfo;

/// Print a value as pretty JSON on stdout.
pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Turn a view error into a command failure.
pub(crate) fn surface_error(error: &ErrorInfo) -> LeadboardError {
    LeadboardError::Other(error.message.clone())
}

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::io;
use std::str::FromStr;

use crate::remote::{CallOutcome, LeadDraft};

#[derive(Parser)]
#[command(name = "leadboard")]
#[command(about = "Browse and search sales-ops listings from the dashboard API")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List one page of a resource, or search across pages
    #[command(visible_alias = "ls")]
    List {
        /// Resource name (shops, leads, cases, or a configured one)
        resource: String,

        /// Filter as key=value, can be repeated
        #[arg(short, long = "filter", value_parser = parse_filter, action = clap::ArgAction::Append)]
        filters: Vec<(String, String)>,

        /// Page number (default: 1)
        #[arg(short, long)]
        page: Option<u32>,

        /// Search text, matched across several pages
        #[arg(short, long)]
        search: Option<String>,

        /// Restore a saved list query string (e.g. 'page=2&category=cafe')
        #[arg(long)]
        query: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show filter dropdown options for a resource
    Options {
        /// Resource name
        resource: String,

        /// Context filter as key=value, can be repeated
        #[arg(short, long = "filter", value_parser = parse_filter, action = clap::ArgAction::Append)]
        filters: Vec<(String, String)>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List known resources
    Resources {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create or update leads
    Lead {
        #[command(subcommand)]
        action: LeadAction,
    },

    /// Record call history
    Call {
        #[command(subcommand)]
        action: CallAction,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Lead fields shared by create and update
#[derive(Args, Debug, Default)]
pub struct LeadFields {
    /// Shop name (required on create)
    #[arg(long)]
    pub shop_name: Option<String>,

    /// Contact person
    #[arg(long)]
    pub contact_name: Option<String>,

    #[arg(long)]
    pub phone: Option<String>,

    #[arg(long)]
    pub email: Option<String>,

    #[arg(long)]
    pub address: Option<String>,

    #[arg(long)]
    pub city: Option<String>,

    #[arg(long)]
    pub postcode: Option<String>,

    #[arg(long)]
    pub category: Option<String>,

    /// Pipeline status
    #[arg(long)]
    pub status: Option<String>,

    #[arg(long)]
    pub notes: Option<String>,
}

impl From<LeadFields> for LeadDraft {
    fn from(fields: LeadFields) -> Self {
        LeadDraft {
            shop_name: fields.shop_name,
            contact_name: fields.contact_name,
            phone: fields.phone,
            email: fields.email,
            address: fields.address,
            city: fields.city,
            postcode: fields.postcode,
            category: fields.category,
            status: fields.status,
            notes: fields.notes,
        }
    }
}

#[derive(Subcommand)]
pub enum LeadAction {
    /// Create a new lead
    Create {
        #[command(flatten)]
        fields: LeadFields,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Update fields of an existing lead
    Update {
        /// Lead ID
        id: String,

        #[command(flatten)]
        fields: LeadFields,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum CallAction {
    /// Log a call against a lead
    Log {
        /// Lead ID
        lead_id: String,

        /// Outcome: answered, no_answer, voicemail, callback, not_interested, converted
        #[arg(value_parser = parse_outcome)]
        outcome: CallOutcome,

        /// Call notes
        #[arg(long)]
        notes: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Set a configuration value
    Set {
        /// Configuration key (e.g. api.base_url, query.debounce_ms)
        key: String,
        /// Value to set (empty to unset optional keys)
        value: String,
    },
    /// Get a configuration value
    Get {
        /// Configuration key
        key: String,
    },
    /// Print the path of the configuration file
    Path,
}

impl Cli {
    pub async fn run(self) -> crate::error::Result<()> {
        use crate::commands::{
            ListOptions, cmd_call_log, cmd_config_get, cmd_config_path, cmd_config_set,
            cmd_config_show, cmd_lead_create, cmd_lead_update, cmd_list, cmd_options,
            cmd_resources,
        };

        match self.command {
            Commands::List {
                resource,
                filters,
                page,
                search,
                query,
                json,
            } => {
                cmd_list(ListOptions {
                    resource,
                    filters,
                    page,
                    search,
                    query,
                    json,
                })
                .await
            }
            Commands::Options {
                resource,
                filters,
                json,
            } => cmd_options(&resource, filters, json).await,
            Commands::Resources { json } => cmd_resources(json),

            Commands::Lead { action } => match action {
                LeadAction::Create { fields, json } => cmd_lead_create(fields.into(), json).await,
                LeadAction::Update { id, fields, json } => {
                    cmd_lead_update(&id, fields.into(), json).await
                }
            },
            Commands::Call { action } => match action {
                CallAction::Log {
                    lead_id,
                    outcome,
                    notes,
                    json,
                } => cmd_call_log(&lead_id, outcome, notes, json).await,
            },

            Commands::Config { action } => match action {
                ConfigAction::Show { json } => cmd_config_show(json),
                ConfigAction::Set { key, value } => cmd_config_set(&key, &value),
                ConfigAction::Get { key } => cmd_config_get(&key),
                ConfigAction::Path => cmd_config_path(),
            },

            Commands::Completions { shell } => {
                generate_completions(shell);
                Ok(())
            }
        }
    }
}

/// Parse a `key=value` filter. An empty value is allowed and means "unset".
fn parse_filter(s: &str) -> Result<(String, String), String> {
    let Some((key, value)) = s.split_once('=') else {
        return Err(format!("Invalid filter '{s}'. Expected key=value"));
    };
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("Invalid filter '{s}'. Filter name cannot be empty"));
    }
    Ok((key.to_string(), value.trim().to_string()))
}

fn parse_outcome(s: &str) -> Result<CallOutcome, String> {
    CallOutcome::from_str(s).map_err(|_| {
        let valid: Vec<&str> = CallOutcome::ALL.iter().map(|o| o.as_str()).collect();
        format!(
            "Invalid outcome '{s}'. Must be one of: {}",
            valid.join(", ")
        )
    })
}

pub fn generate_completions(shell: Shell) {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "leadboard", &mut io::stdout());
}

pub mod cli;
pub mod commands;
pub mod config;
pub mod controller;
pub mod display;
pub mod error;
pub mod item;
pub mod options;
pub mod paths;
pub mod query;
pub mod remote;
pub mod resource;
pub mod search;

pub use config::{Config, QuerySettings};
pub use controller::{
    ControllerEvent, ControllerOptions, DisplayMode, ListViewModel, RemoteListController,
};
pub use error::{LeadboardError, Result};
pub use item::DisplayItem;
pub use options::FilterOptionSet;
pub use query::{ErrorInfo, QueryClient, QueryKind};
pub use remote::{
    CredentialProvider, Filters, HttpBackend, ListBackend, ListQuery, MemoryCredentials, RawPage,
};
pub use resource::ResourceSpec;

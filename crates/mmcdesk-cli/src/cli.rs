//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "mmcdesk",
    version,
    about = "Terminal front end for the mmc back-office console",
    arg_required_else_help = true
)]
pub struct Cli {
    /// Backend base URL [default: http://localhost:3000]
    #[arg(long, env = "API_BASE_URL", global = true)]
    pub api_base_url: Option<String>,

    /// Session and log directory
    #[arg(long, env = "MMCDESK_CACHE_DIR", global = true)]
    pub cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Sign in
    Login {
        #[arg(short, long)]
        username: Option<String>,

        /// Keep the password in the OS keychain for the next sign-in
        #[arg(long)]
        remember: bool,
    },
    /// Sign out
    Logout,
    /// Show the signed-in user
    #[command(name = "whoami")]
    WhoAmI,
    /// Create an account
    Register,
    /// Confirm the emailed registration code
    Verify { code: String },
    /// Send the registration code again
    Resend,
    /// Customer records
    Customers {
        #[command(subcommand)]
        action: CustomerAction,
    },
    /// Investment products
    Products {
        #[command(subcommand)]
        action: ProductAction,
    },
    /// Purchases and redemptions
    Transactions {
        #[command(subcommand)]
        action: TransactionAction,
    },
    /// Show where the route gate sends a console path
    Gate { path: String },
    /// Probe the backend
    Health,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum CustomerAction {
    List(ListArgs),
    Get { id: String },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ProductAction {
    List(ListArgs),
    Get { id: String },
    /// Print a download link for a spreadsheet of matching products
    Export(ListArgs),
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum TransactionAction {
    List(ListArgs),
    Get { id: String },
    /// Customers and products a transaction can use
    Choices,
}

#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct ListArgs {
    /// Page number, starting at 1
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub page: Option<u32>,

    /// Rows per page
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub limit: Option<u32>,

    #[arg(long)]
    pub search: Option<String>,

    /// Column filter, may be repeated
    #[arg(long = "filter", value_name = "KEY=VALUE", value_parser = parse_filter)]
    pub filters: Vec<(String, String)>,

    /// Field to sort by [default: createdAt]
    #[arg(long = "sort", value_name = "FIELD")]
    pub sort_by: Option<String>,

    /// Sort ascending instead of descending
    #[arg(long = "asc")]
    pub ascending: bool,
}

fn parse_filter(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got '{}'", raw)),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Customers,
    Products,
    Transactions,
}

impl Resource {
    /// Console page the resource is shown on, used for the route gate and
    /// as the location to come back to after signing in again.
    pub fn page_path(self) -> &'static str {
        match self {
            Resource::Customers => "/dashboard/customer",
            Resource::Products => "/dashboard/products",
            Resource::Transactions => "/dashboard/transaction",
        }
    }
}

impl Command {
    fn resource(&self) -> Option<Resource> {
        match self {
            Command::Customers { .. } => Some(Resource::Customers),
            Command::Products { .. } => Some(Resource::Products),
            Command::Transactions { .. } => Some(Resource::Transactions),
            _ => None,
        }
    }

    /// Resource page a command acts on, if it needs a signed-in session.
    pub fn page(&self) -> Option<&'static str> {
        self.resource().map(Resource::page_path)
    }
}

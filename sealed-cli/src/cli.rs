//! CLI argument parsing types using `clap`.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

/// Sealed command-line interface for a Bitwarden vault
#[derive(Parser)]
#[command(name = "sealed-cli")]
#[command(author, version, about = "Sealed vault command-line interface")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the configuration directory
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the Bitwarden CLI executable
    #[arg(long, global = true, env = "SEALED_BW_PATH")]
    pub bw: Option<PathBuf>,

    /// Directory where the Bitwarden CLI keeps its state
    #[arg(long, global = true, env = "SEALED_BW_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Account email; omit to unlock the account already logged in
    #[arg(short, long, global = true, env = "SEALED_EMAIL")]
    pub email: Option<String>,

    /// Two-step login code
    #[arg(long, global = true)]
    pub code: Option<String>,

    /// Seconds to wait for each Bitwarden CLI call
    #[arg(long, global = true, default_value_t = 60)]
    pub timeout: u64,

    /// Output format
    #[arg(short, long, global = true, default_value = "table", value_enum)]
    pub format: OutputFormat,

    /// Increase output verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Log filter directive, e.g. `sealed_core=debug`; overrides -v
    #[arg(long, global = true, env = "SEALED_LOG")]
    pub log_filter: Option<String>,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true, env = "SEALED_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Show the account state
    #[command(about = "Show whether an account is logged in and unlocked")]
    Status,

    /// Show which login inputs are needed
    #[command(about = "List the inputs the next login needs")]
    Fields,

    /// Check the Bitwarden CLI
    #[command(about = "Check that the Bitwarden CLI can be run")]
    Check,

    /// Verify credentials
    #[command(about = "Log in, load the vault and log out again")]
    Login,

    /// List vault items
    #[command(about = "List vault items")]
    List {
        /// Show only trashed items
        #[arg(long, conflicts_with = "all")]
        trash: bool,

        /// Include trashed items
        #[arg(short, long)]
        all: bool,
    },

    /// Show one item, secrets included
    #[command(about = "Show all fields of an item")]
    Show {
        /// Item id
        id: String,
    },

    /// Add a login item
    #[command(about = "Add a login item; the password is prompted for")]
    AddLogin {
        /// Item name
        #[arg(short, long)]
        name: String,

        /// Username
        #[arg(short, long)]
        username: Option<String>,

        /// Notes
        #[arg(long)]
        notes: Option<String>,

        /// Mark as favourite
        #[arg(long)]
        favorite: bool,

        /// Generate the password instead of prompting for it
        #[arg(short, long)]
        generate: bool,

        /// Prompt for a TOTP secret
        #[arg(long)]
        totp: bool,
    },

    /// Add a card item
    #[command(about = "Add a card item; number and security code are prompted for")]
    AddCard {
        /// Item name
        #[arg(short, long)]
        name: String,

        /// Cardholder name
        #[arg(long)]
        holder: Option<String>,

        /// Card brand
        #[arg(long)]
        brand: Option<String>,

        /// Expiry month (1-12)
        #[arg(long)]
        exp_month: Option<String>,

        /// Expiry year
        #[arg(long)]
        exp_year: Option<String>,

        /// Notes
        #[arg(long)]
        notes: Option<String>,

        /// Mark as favourite
        #[arg(long)]
        favorite: bool,
    },

    /// Edit a login item
    #[command(about = "Change fields of a login item")]
    EditLogin {
        /// Item id
        id: String,

        /// New name
        #[arg(short, long)]
        name: Option<String>,

        /// New username
        #[arg(short, long)]
        username: Option<String>,

        /// New notes
        #[arg(long)]
        notes: Option<String>,

        /// Favourite flag
        #[arg(long)]
        favorite: Option<bool>,

        /// Prompt for a new password
        #[arg(long, conflicts_with = "generate")]
        password: bool,

        /// Generate a new password
        #[arg(short, long)]
        generate: bool,

        /// Prompt for a new TOTP secret
        #[arg(long)]
        totp: bool,
    },

    /// Edit a card item
    #[command(about = "Change fields of a card item")]
    EditCard {
        /// Item id
        id: String,

        /// New name
        #[arg(short, long)]
        name: Option<String>,

        /// New cardholder name
        #[arg(long)]
        holder: Option<String>,

        /// New brand
        #[arg(long)]
        brand: Option<String>,

        /// New expiry month (1-12)
        #[arg(long)]
        exp_month: Option<String>,

        /// New expiry year
        #[arg(long)]
        exp_year: Option<String>,

        /// New notes
        #[arg(long)]
        notes: Option<String>,

        /// Favourite flag
        #[arg(long)]
        favorite: Option<bool>,

        /// Prompt for a new card number
        #[arg(long)]
        number: bool,

        /// Prompt for a new security code
        #[arg(long)]
        security_code: bool,
    },

    /// Move an item to the trash
    #[command(about = "Move an item to the trash")]
    Trash {
        /// Item id
        id: String,
    },

    /// Restore an item from the trash
    #[command(about = "Restore an item from the trash")]
    Restore {
        /// Item id
        id: String,
    },

    /// Delete an item permanently
    #[command(about = "Delete an item permanently")]
    Delete {
        /// Item id
        id: String,
    },

    /// Compute a TOTP code
    #[command(about = "Compute the current TOTP code for a secret or an item")]
    Totp {
        /// Use the TOTP secret stored in this login item instead of prompting
        #[arg(short, long)]
        item: Option<String>,
    },

    /// Generate a password
    #[command(about = "Generate a random password")]
    Generate {
        /// Password length
        #[arg(short, long, default_value_t = 16)]
        length: u8,

        /// Include punctuation
        #[arg(short, long)]
        special: bool,

        /// Leave out digits
        #[arg(long)]
        no_numbers: bool,

        /// Leave out upper case letters
        #[arg(long)]
        no_uppercase: bool,

        /// Leave out lower case letters
        #[arg(long)]
        no_lowercase: bool,
    },

    /// Switch vault server
    #[command(about = "Point the Bitwarden CLI at another server; logs out")]
    Server {
        /// Server URL, e.g. https://vault.example.com
        url: String,
    },

    /// Enable or disable crash reports
    #[command(about = "Enable or disable crash reports")]
    CrashLogs {
        /// true to enable, false to disable
        #[arg(action = ArgAction::Set)]
        enabled: bool,
    },

    /// Show settings
    #[command(about = "Show persisted settings")]
    Config,

    /// Sync the vault
    #[command(about = "Sync with the server and list all items")]
    Refresh,

    /// Generate shell completions
    #[command(about = "Generate shell completion scripts")]
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Generate a man page
    #[command(about = "Generate a man page")]
    Manpage,
}

/// Output format options
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Table,
    /// The structured reply as JSON
    Json,
}

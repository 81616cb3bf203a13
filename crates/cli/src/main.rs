//! Brightline Studio CLI - local cart and admin tools.
//!
//! # Usage
//!
//! ```bash
//! # Add a service package to the local cart
//! bl-cli cart add --type managed-hosting --domain example.com --price 49 --email ops@example.com
//!
//! # Show the local cart
//! bl-cli cart show
//!
//! # Rotate the admin password (prompts unless the env vars are set)
//! bl-cli admin rotate-password
//! ```
//!
//! # Commands
//!
//! - `cart` - Show and edit the local cart file
//! - `admin rotate-password` - Rotate the admin password in blob storage

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::num::NonZeroU32;
use std::path::PathBuf;

use brightline_storefront::config::DEFAULT_BLOB_DIR;
use brightline_storefront::routes::cart::CartView;
use clap::{Parser, Subcommand};
use inquire::{Password, PasswordDisplayMode};
use secrecy::SecretString;

mod commands;

use commands::CliError;

#[derive(Parser)]
#[command(name = "bl-cli")]
#[command(author, version, about = "Brightline Studio CLI tools")]
struct Cli {
    /// Local store file holding the cart
    #[arg(
        long,
        global = true,
        env = "BRIGHTLINE_LOCAL_STORE",
        default_value = ".brightline/local-store.json"
    )]
    store: PathBuf,

    /// Blob storage directory
    #[arg(long, global = true, env = "BRIGHTLINE_BLOB_DIR", default_value = DEFAULT_BLOB_DIR)]
    blob_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the local cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Manage the admin area
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Print the cart as JSON
    Show,
    /// Add a line item
    Add {
        /// Service type / package tier
        #[arg(long = "type")]
        kind: String,

        /// Customer domain the package is for
        #[arg(long)]
        domain: String,

        /// Unit price
        #[arg(long)]
        price: f64,

        /// Number of units
        #[arg(long, default_value = "1")]
        quantity: NonZeroU32,

        /// Contact email
        #[arg(long)]
        email: String,
    },
    /// Remove a line item by id
    Remove {
        /// Line item id
        id: String,
    },
    /// Remove every line item
    Clear,
}

#[derive(Subcommand)]
enum AdminAction {
    /// Replace the admin password
    ///
    /// The current and replacement passwords are read from
    /// ADMIN_CURRENT_PASSWORD and ADMIN_NEW_PASSWORD, or prompted for
    /// without echo when those are unset.
    RotatePassword {
        /// Password in effect until the first rotation
        #[arg(long, env = "ADMIN_INITIAL_PASSWORD", hide_env_values = true)]
        initial_password: String,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file if present (ignore errors if not found)
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bl_cli=info,brightline_storefront=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Cart { action } => {
            let view = match action {
                CartAction::Show => commands::cart::show(&cli.store).await?,
                CartAction::Add {
                    kind,
                    domain,
                    price,
                    quantity,
                    email,
                } => {
                    let item = commands::cart::AddItem {
                        kind,
                        domain,
                        price,
                        quantity,
                        email,
                    };
                    commands::cart::add(&cli.store, item).await?
                }
                CartAction::Remove { id } => commands::cart::remove(&cli.store, &id).await?,
                CartAction::Clear => commands::cart::clear(&cli.store).await?,
            };
            print_cart(&view)?;
        }
        Commands::Admin { action } => match action {
            AdminAction::RotatePassword { initial_password } => {
                let current =
                    read_password(CURRENT_PASSWORD_VAR, "Current admin password:", false)?;
                let new = read_password(NEW_PASSWORD_VAR, "New admin password:", true)?;
                commands::admin::rotate_password(
                    &cli.blob_dir,
                    &SecretString::from(initial_password),
                    &current,
                    &new,
                )
                .await?;
            }
        },
    }
    Ok(())
}

const CURRENT_PASSWORD_VAR: &str = "ADMIN_CURRENT_PASSWORD";
const NEW_PASSWORD_VAR: &str = "ADMIN_NEW_PASSWORD";

/// Read a password from `var`, or prompt for it without echo.
///
/// `confirm` asks for the password twice.
fn read_password(var: &str, message: &str, confirm: bool) -> Result<SecretString, CliError> {
    if let Ok(value) = std::env::var(var) {
        return Ok(SecretString::from(value));
    }

    let prompt = Password::new(message).with_display_mode(PasswordDisplayMode::Hidden);
    let prompt = if confirm {
        prompt
    } else {
        prompt.without_confirmation()
    };
    Ok(SecretString::from(prompt.prompt()?))
}

/// Write the cart to stdout as pretty JSON.
fn print_cart(view: &CartView) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(view)?;
    #[allow(clippy::print_stdout)]
    {
        println!("{json}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_rotate_password_takes_no_password_arguments() {
        let parsed = Cli::try_parse_from([
            "bl-cli",
            "admin",
            "rotate-password",
            "--initial-password",
            "initial-Pa55word!",
        ]);
        assert!(parsed.is_ok());

        let rejected = Cli::try_parse_from([
            "bl-cli",
            "admin",
            "rotate-password",
            "--initial-password",
            "initial-Pa55word!",
            "--new-password",
            "visible-in-ps-42",
        ]);
        assert!(rejected.is_err());
    }
}

//! Command handler modules for the CLI.

mod items;
mod session;
mod settings;
mod shell;
mod tools;

use crate::cli::{Cli, Commands};
use crate::error::CliError;

/// Dispatch a CLI command to the appropriate handler.
pub async fn dispatch(cli: &Cli) -> Result<(), CliError> {
    match &cli.command {
        Commands::Status => session::cmd_status(cli).await,
        Commands::Fields => session::cmd_fields(cli).await,
        Commands::Check => session::cmd_check(cli).await,
        Commands::Login => session::cmd_login(cli).await,
        Commands::List { trash, all } => items::cmd_list(cli, *trash, *all).await,
        Commands::Show { id } => items::cmd_show(cli, id).await,
        Commands::AddLogin {
            name,
            username,
            notes,
            favorite,
            generate,
            totp,
        } => {
            items::cmd_add_login(
                cli,
                items::AddLoginParams {
                    name,
                    username: username.as_deref(),
                    notes: notes.as_deref(),
                    favorite: *favorite,
                    generate: *generate,
                    totp: *totp,
                },
            )
            .await
        }
        Commands::AddCard {
            name,
            holder,
            brand,
            exp_month,
            exp_year,
            notes,
            favorite,
        } => {
            items::cmd_add_card(
                cli,
                items::AddCardParams {
                    name,
                    holder: holder.as_deref(),
                    brand: brand.as_deref(),
                    exp_month: exp_month.as_deref(),
                    exp_year: exp_year.as_deref(),
                    notes: notes.as_deref(),
                    favorite: *favorite,
                },
            )
            .await
        }
        Commands::EditLogin {
            id,
            name,
            username,
            notes,
            favorite,
            password,
            generate,
            totp,
        } => {
            items::cmd_edit_login(
                cli,
                items::EditLoginParams {
                    id,
                    name: name.as_deref(),
                    username: username.as_deref(),
                    notes: notes.as_deref(),
                    favorite: *favorite,
                    password: *password,
                    generate: *generate,
                    totp: *totp,
                },
            )
            .await
        }
        Commands::EditCard {
            id,
            name,
            holder,
            brand,
            exp_month,
            exp_year,
            notes,
            favorite,
            number,
            security_code,
        } => {
            items::cmd_edit_card(
                cli,
                items::EditCardParams {
                    id,
                    name: name.as_deref(),
                    holder: holder.as_deref(),
                    brand: brand.as_deref(),
                    exp_month: exp_month.as_deref(),
                    exp_year: exp_year.as_deref(),
                    notes: notes.as_deref(),
                    favorite: *favorite,
                    number: *number,
                    security_code: *security_code,
                },
            )
            .await
        }
        Commands::Trash { id } => items::cmd_trash(cli, id).await,
        Commands::Restore { id } => items::cmd_restore(cli, id).await,
        Commands::Delete { id } => items::cmd_delete(cli, id).await,
        Commands::Refresh => items::cmd_refresh(cli).await,
        Commands::Totp { item } => tools::cmd_totp(cli, item.as_deref()).await,
        Commands::Generate {
            length,
            special,
            no_numbers,
            no_uppercase,
            no_lowercase,
        } => {
            let policy =
                tools::policy_from_flags(*length, *special, *no_numbers, *no_uppercase, *no_lowercase);
            tools::cmd_generate(cli, policy).await
        }
        Commands::Server { url } => settings::cmd_server(cli, url).await,
        Commands::CrashLogs { enabled } => settings::cmd_crash_logs(cli, *enabled).await,
        Commands::Config => settings::cmd_config(cli).await,
        Commands::Completions { shell } => shell::cmd_completions(*shell),
        Commands::Manpage => shell::cmd_manpage(),
    }
}

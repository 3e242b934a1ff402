//! TOTP and password generation commands.

use sealed_core::reply::{PasswordPayload, Reply, TotpPayload};
use sealed_core::{ItemId, PasswordPolicy, VaultError, VaultOperations, VaultResult};

use super::session::{close, open};
use crate::cli::Cli;
use crate::error::CliError;
use crate::output::emit;
use crate::util::{create_bridge, prompt_secret};

/// TOTP command handler
///
/// Without `--item` the secret is prompted for and no login happens.
pub async fn cmd_totp(cli: &Cli, item: Option<&str>) -> Result<(), CliError> {
    let Some(id) = item else {
        let secret = prompt_secret("TOTP secret or otpauth:// URI: ")?;
        let bridge = create_bridge(cli)?;
        let result = bridge.generate_totp(&secret).map(TotpPayload::from);
        return emit(&Reply::from(result), cli.format);
    };

    let bridge = open(cli).await?;
    let result: VaultResult<TotpPayload> = async {
        let id = ItemId::new(id);
        let items = bridge.list_items(true).await?;
        let item = items
            .iter()
            .find(|item| item.id == id)
            .ok_or_else(|| VaultError::NotFound(id.to_string()))?;
        let secret = item
            .login()
            .and_then(|login| login.totp.as_ref())
            .ok_or_else(|| VaultError::Validation("Item has no TOTP secret".to_string()))?;
        bridge.generate_totp(secret).map(TotpPayload::from)
    }
    .await;
    close(&bridge).await;

    emit(&Reply::from(result), cli.format)
}

/// Builds the policy from the generate flags
pub fn policy_from_flags(
    length: u8,
    special: bool,
    no_numbers: bool,
    no_uppercase: bool,
    no_lowercase: bool,
) -> PasswordPolicy {
    PasswordPolicy::default()
        .with_length(length)
        .with_special(special)
        .with_numbers(!no_numbers)
        .with_letters(!no_uppercase, !no_lowercase)
}

/// Generate command handler
pub async fn cmd_generate(cli: &Cli, policy: PasswordPolicy) -> Result<(), CliError> {
    let bridge = open(cli).await?;
    let result = bridge.generate_password(Some(policy)).await;
    close(&bridge).await;

    let reply = Reply::from(result.map(|password| PasswordPayload::reveal(&password)));
    emit(&reply, cli.format)
}

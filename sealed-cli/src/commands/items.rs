//! Item commands: listing, showing, creating, editing and removing items.

use secrecy::{ExposeSecret, SecretString};
use sealed_core::reply::{CreatedPayload, Empty, ItemsPayload, Reply};
use sealed_core::{
    CardDraft, ItemDraft, ItemId, ItemView, LoginDraft, VaultError, VaultOperations, VaultResult,
};

use super::session::{close, open};
use crate::cli::Cli;
use crate::error::CliError;
use crate::output::emit;
use crate::util::{non_empty, prompt_secret};

/// Parameters for the add-login command
pub struct AddLoginParams<'a> {
    pub name: &'a str,
    pub username: Option<&'a str>,
    pub notes: Option<&'a str>,
    pub favorite: bool,
    pub generate: bool,
    pub totp: bool,
}

/// Parameters for the add-card command
pub struct AddCardParams<'a> {
    pub name: &'a str,
    pub holder: Option<&'a str>,
    pub brand: Option<&'a str>,
    pub exp_month: Option<&'a str>,
    pub exp_year: Option<&'a str>,
    pub notes: Option<&'a str>,
    pub favorite: bool,
}

/// Parameters for the edit-login command
pub struct EditLoginParams<'a> {
    pub id: &'a str,
    pub name: Option<&'a str>,
    pub username: Option<&'a str>,
    pub notes: Option<&'a str>,
    pub favorite: Option<bool>,
    pub password: bool,
    pub generate: bool,
    pub totp: bool,
}

/// Parameters for the edit-card command
pub struct EditCardParams<'a> {
    pub id: &'a str,
    pub name: Option<&'a str>,
    pub holder: Option<&'a str>,
    pub brand: Option<&'a str>,
    pub exp_month: Option<&'a str>,
    pub exp_year: Option<&'a str>,
    pub notes: Option<&'a str>,
    pub favorite: Option<bool>,
    pub number: bool,
    pub security_code: bool,
}

impl EditLoginParams<'_> {
    const fn changes_nothing(&self) -> bool {
        self.name.is_none()
            && self.username.is_none()
            && self.notes.is_none()
            && self.favorite.is_none()
            && !self.password
            && !self.generate
            && !self.totp
    }
}

impl EditCardParams<'_> {
    const fn changes_nothing(&self) -> bool {
        self.name.is_none()
            && self.holder.is_none()
            && self.brand.is_none()
            && self.exp_month.is_none()
            && self.exp_year.is_none()
            && self.notes.is_none()
            && self.favorite.is_none()
            && !self.number
            && !self.security_code
    }
}

fn nothing_to_change() -> CliError {
    CliError::Input("Nothing to change; pass at least one field".to_string())
}

/// Prompts for a secret; an empty answer means "not set"
fn prompt_optional(prompt: &str) -> Result<Option<SecretString>, CliError> {
    let secret = prompt_secret(prompt)?;
    if secret.expose_secret().trim().is_empty() {
        Ok(None)
    } else {
        Ok(Some(secret))
    }
}

fn with_common(
    mut draft: ItemDraft,
    name: Option<&str>,
    notes: Option<&str>,
    favorite: Option<bool>,
) -> ItemDraft {
    draft.name = name.map(ToString::to_string);
    draft.notes = notes.map(ToString::to_string);
    draft.favorite = favorite;
    draft
}

/// List command handler
pub async fn cmd_list(cli: &Cli, trash: bool, all: bool) -> Result<(), CliError> {
    let bridge = open(cli).await?;
    let result = if trash {
        bridge.list_trash().await
    } else {
        bridge.list_items(all).await
    };
    close(&bridge).await;

    let reply = Reply::from(result.map(|items| ItemsPayload::from_items(&items).sorted()));
    emit(&reply, cli.format)
}

/// Show command handler
pub async fn cmd_show(cli: &Cli, id: &str) -> Result<(), CliError> {
    let bridge = open(cli).await?;
    let result = bridge.list_items(true).await.and_then(|items| {
        items
            .iter()
            .find(|item| item.id.as_str() == id)
            .map(ItemView::from_item)
            .ok_or_else(|| VaultError::NotFound(id.to_string()))
    });
    close(&bridge).await;

    emit(&Reply::from(result), cli.format)
}

/// Add-login command handler
pub async fn cmd_add_login(cli: &Cli, params: AddLoginParams<'_>) -> Result<(), CliError> {
    let password = if params.generate {
        None
    } else {
        prompt_optional("Password (leave empty for none): ")?
    };
    let totp = if params.totp {
        prompt_optional("TOTP secret: ")?
    } else {
        None
    };

    let bridge = open(cli).await?;
    let result: VaultResult<ItemId> = async {
        let password = if params.generate {
            Some(bridge.generate_password(None).await?)
        } else {
            password
        };
        let draft = with_common(
            ItemDraft::login(),
            Some(params.name),
            params.notes,
            Some(params.favorite),
        )
        .with_login(LoginDraft {
            username: non_empty(params.username),
            password,
            totp,
        });
        bridge.create_item(draft).await
    }
    .await;
    close(&bridge).await;

    emit(&Reply::from(result.map(CreatedPayload::from)), cli.format)
}

/// Add-card command handler
pub async fn cmd_add_card(cli: &Cli, params: AddCardParams<'_>) -> Result<(), CliError> {
    let number = prompt_optional("Card number (leave empty for none): ")?;
    let code = prompt_optional("Security code (leave empty for none): ")?;

    let draft = with_common(
        ItemDraft::card(),
        Some(params.name),
        params.notes,
        Some(params.favorite),
    )
    .with_card(CardDraft {
        cardholder_name: non_empty(params.holder),
        brand: non_empty(params.brand),
        number,
        exp_month: non_empty(params.exp_month),
        exp_year: non_empty(params.exp_year),
        code,
    });

    let bridge = open(cli).await?;
    let result = bridge.create_item(draft).await;
    close(&bridge).await;

    emit(&Reply::from(result.map(CreatedPayload::from)), cli.format)
}

/// Edit-login command handler
pub async fn cmd_edit_login(cli: &Cli, params: EditLoginParams<'_>) -> Result<(), CliError> {
    if params.changes_nothing() {
        return Err(nothing_to_change());
    }
    let password = if params.password {
        Some(prompt_secret("New password: ")?)
    } else {
        None
    };
    let totp = if params.totp {
        Some(prompt_secret("New TOTP secret (leave empty to remove): ")?)
    } else {
        None
    };

    let bridge = open(cli).await?;
    let result: VaultResult<()> = async {
        let password = if params.generate {
            Some(bridge.generate_password(None).await?)
        } else {
            password
        };
        let draft = with_common(
            ItemDraft::login(),
            params.name,
            params.notes,
            params.favorite,
        )
        .with_login(LoginDraft {
            username: params.username.map(ToString::to_string),
            password,
            totp,
        });
        bridge.edit_item(ItemId::new(params.id), draft).await
    }
    .await;
    close(&bridge).await;

    emit(&Reply::from(result.map(Empty::from)), cli.format)
}

/// Edit-card command handler
pub async fn cmd_edit_card(cli: &Cli, params: EditCardParams<'_>) -> Result<(), CliError> {
    if params.changes_nothing() {
        return Err(nothing_to_change());
    }
    let number = if params.number {
        Some(prompt_secret("New card number: ")?)
    } else {
        None
    };
    let code = if params.security_code {
        Some(prompt_secret("New security code: ")?)
    } else {
        None
    };

    let draft = with_common(
        ItemDraft::card(),
        params.name,
        params.notes,
        params.favorite,
    )
    .with_card(CardDraft {
        cardholder_name: params.holder.map(ToString::to_string),
        brand: params.brand.map(ToString::to_string),
        number,
        exp_month: params.exp_month.map(ToString::to_string),
        exp_year: params.exp_year.map(ToString::to_string),
        code,
    });

    let bridge = open(cli).await?;
    let result = bridge.edit_item(ItemId::new(params.id), draft).await;
    close(&bridge).await;

    emit(&Reply::from(result.map(Empty::from)), cli.format)
}

/// Trash command handler
pub async fn cmd_trash(cli: &Cli, id: &str) -> Result<(), CliError> {
    let bridge = open(cli).await?;
    let result = bridge.trash_item(ItemId::new(id)).await;
    close(&bridge).await;
    emit(&Reply::from(result.map(Empty::from)), cli.format)
}

/// Restore command handler
pub async fn cmd_restore(cli: &Cli, id: &str) -> Result<(), CliError> {
    let bridge = open(cli).await?;
    let result = bridge.restore_item(ItemId::new(id)).await;
    close(&bridge).await;
    emit(&Reply::from(result.map(Empty::from)), cli.format)
}

/// Delete command handler
pub async fn cmd_delete(cli: &Cli, id: &str) -> Result<(), CliError> {
    let bridge = open(cli).await?;
    let result = bridge.delete_item(ItemId::new(id)).await;
    close(&bridge).await;
    emit(&Reply::from(result.map(Empty::from)), cli.format)
}

/// Refresh command handler
pub async fn cmd_refresh(cli: &Cli) -> Result<(), CliError> {
    let bridge = open(cli).await?;
    let result = match bridge.refresh().await {
        Ok(()) => bridge.list_items(true).await,
        Err(e) => Err(e),
    };
    close(&bridge).await;

    let reply = Reply::from(result.map(|items| ItemsPayload::from_items(&items).sorted()));
    emit(&reply, cli.format)
}

//! Rendering of replies as text or JSON.

use std::fmt::Write as _;

use sealed_core::ItemView;
use sealed_core::reply::{
    ConfigurationPayload, CreatedPayload, Empty, ItemsPayload, LoginFieldsPayload,
    PasswordPayload, Reply, StatusPayload, TotpPayload, VersionPayload,
};
use serde::Serialize;

use crate::cli::OutputFormat;
use crate::error::CliError;

/// Human-readable form of a reply payload
pub trait Render {
    /// Text shown in table mode
    fn render(&self) -> String;
}

impl Render for Empty {
    fn render(&self) -> String {
        "OK".to_string()
    }
}

impl Render for ItemsPayload {
    fn render(&self) -> String {
        format_items(&self.items)
    }
}

impl Render for ItemView {
    fn render(&self) -> String {
        let mut output = String::new();
        let fields = [
            ("ID", self.id.as_str()),
            ("Name", self.name.as_str()),
            ("Type", self.item_type.as_str()),
            ("Notes", self.notes.as_str()),
            ("Created", self.created.as_str()),
            ("Updated", self.updated.as_str()),
            ("Username", self.username.as_str()),
            ("Password", self.password.as_str()),
            ("TOTP", self.totp.as_str()),
            ("Cardholder", self.cardholder_name.as_str()),
            ("Brand", self.brand.as_str()),
            ("Number", self.number.as_str()),
            ("Expiry month", self.expiry_month.as_str()),
            ("Expiry year", self.expiry_year.as_str()),
            ("Security code", self.code.as_str()),
        ];
        for (label, value) in fields.iter().filter(|(_, v)| !v.is_empty()) {
            let _ = writeln!(output, "{label:<14} {value}");
        }
        let _ = writeln!(output, "{:<14} {}", "Favorite", yes_no(self.favorite));
        let _ = write!(output, "{:<14} {}", "Trashed", yes_no(self.trashed));
        output
    }
}

impl Render for CreatedPayload {
    fn render(&self) -> String {
        format!("Created item {}", self.id)
    }
}

impl Render for TotpPayload {
    fn render(&self) -> String {
        format!("{} (valid for {}s)", self.code, self.remaining_seconds)
    }
}

impl Render for PasswordPayload {
    fn render(&self) -> String {
        self.password().to_string()
    }
}

impl Render for LoginFieldsPayload {
    fn render(&self) -> String {
        if self.fields.is_empty() {
            return "Unlocked, no input needed.".to_string();
        }
        self.fields
            .iter()
            .map(|field| match field {
                sealed_core::LoginField::Email => "email",
                sealed_core::LoginField::Password => "password",
                sealed_core::LoginField::Totp => "totp",
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Render for ConfigurationPayload {
    fn render(&self) -> String {
        format!(
            "server_url  {}\ncrash_logs  {}",
            self.server_url, self.crash_logs
        )
    }
}

impl Render for StatusPayload {
    fn render(&self) -> String {
        let status = match self.status {
            sealed_core::VaultStatus::Unauthenticated => "logged out",
            sealed_core::VaultStatus::Locked => "locked",
            sealed_core::VaultStatus::Unlocked => "unlocked",
        };
        format!("Vault: {status}")
    }
}

impl Render for VersionPayload {
    fn render(&self) -> String {
        format!("Bitwarden CLI {}", self.version)
    }
}

const fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

/// Format items as a table string
#[must_use]
pub fn format_items(items: &[ItemView]) -> String {
    if items.is_empty() {
        return "No items found.".to_string();
    }

    let mut output = String::new();

    let id_width = items.iter().map(|i| i.id.len()).max().unwrap_or(2).max(2);
    let name_width = items.iter().map(|i| i.name.len()).max().unwrap_or(4).max(4);
    let type_width = 11;

    let _ = writeln!(
        output,
        "{:<id_width$}  {:<name_width$}  {:<type_width$}  FAV  TRASHED",
        "ID", "NAME", "TYPE"
    );
    let _ = writeln!(
        output,
        "{:-<id_width$}  {:-<name_width$}  {:-<type_width$}  ---  -------",
        "", "", ""
    );

    for item in items {
        let _ = writeln!(
            output,
            "{:<id_width$}  {:<name_width$}  {:<type_width$}  {:<3}  {}",
            item.id,
            item.name,
            item.item_type,
            if item.favorite { "*" } else { "" },
            yes_no(item.trashed)
        );
    }

    output.trim_end().to_string()
}

/// Prints a reply and turns a failed one into an error
///
/// In JSON mode the whole reply is printed, failures included. In table
/// mode only a successful payload is printed; the caller reports failures.
///
/// # Errors
///
/// Returns `CliError::Vault` for a failed reply and `CliError::Output` if
/// JSON serialization fails.
pub fn emit<T: Serialize + Render>(reply: &Reply<T>, format: OutputFormat) -> Result<(), CliError> {
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(reply)
                .map_err(|e| CliError::Output(format!("Failed to serialize to JSON: {e}")))?;
            println!("{json}");
        }
        OutputFormat::Table => {
            if let Some(payload) = &reply.payload {
                println!("{}", payload.render());
            }
        }
    }

    if reply.success {
        Ok(())
    } else {
        Err(CliError::Vault {
            kind: reply
                .error_kind
                .unwrap_or(sealed_core::ErrorKind::Internal),
            message: reply.message.clone().unwrap_or_default(),
        })
    }
}

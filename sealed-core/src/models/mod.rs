//! Core data structures: vault items, drafts and their display form

mod item;
mod view;

pub use item::{
    CardData, CardDraft, DraftFields, ItemDraft, ItemId, ItemKind, ItemPayload, LoginData,
    LoginDraft, VaultItem,
};
pub use view::{ItemView, sort_for_display, zero_pad};

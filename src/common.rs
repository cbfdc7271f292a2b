pub mod cache;
pub mod error;
pub mod extract;
pub mod i18n;
pub mod pagination;
pub mod slug;
pub mod validators;

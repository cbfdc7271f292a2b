pub mod auth;
pub mod hosts;
pub mod i18n;
pub mod permissions;
pub mod throttle;

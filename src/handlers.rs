pub mod auth;
pub mod categories;
pub mod products;
pub mod profiles;
pub mod system;
pub mod tags;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::i18n::Locale,
};

/// Traduz o erro do serviço para a resposta da API no idioma da requisição.
pub(crate) trait Localized<T> {
    fn localized(self, locale: &Locale, app_state: &AppState) -> Result<T, ApiError>;
}

impl<T> Localized<T> for Result<T, AppError> {
    fn localized(self, locale: &Locale, app_state: &AppState) -> Result<T, ApiError> {
        self.map_err(|e| e.to_api_error(locale, &app_state.i18n_store))
    }
}

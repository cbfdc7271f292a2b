pub mod user_repo;
pub use user_repo::UserRepository;
pub mod profile_repo;
pub use profile_repo::ProfileRepository;
pub mod product_repo;
pub use product_repo::{ProductLookup, ProductRepository};
pub mod category_repo;
pub use category_repo::CategoryRepository;
pub mod tag_repo;
pub use tag_repo::TagRepository;

use crate::{common::error::AppError, common::i18n::Params};

/// Converte violações de unicidade (pelo nome da constraint) em `AppError::Conflict`.
/// Demais erros seguem como `DatabaseError`.
pub(crate) fn map_unique_violation(
    e: sqlx::Error,
    constraints: &[(&str, &'static str, &'static str)],
    params: Params,
) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            if let Some(constraint) = db_err.constraint() {
                if let Some((_, field, key)) =
                    constraints.iter().find(|(name, _, _)| *name == constraint)
                {
                    return AppError::conflict(field, key, params);
                }
            }
        }
    }
    e.into()
}

// src/common/db_utils.rs

use crate::common::error::AppError;

/// Chave duplicada (23505)?
pub(crate) fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

/// Converte chave duplicada no erro de negócio; o resto segue a regra geral do `From`.
pub(crate) fn map_unique_violation(e: sqlx::Error, on_duplicate: impl FnOnce() -> AppError) -> AppError {
    if is_unique_violation(&e) {
        return on_duplicate();
    }
    e.into()
}

/// Violação de FK (23503): o registro pai sumiu no meio do caminho.
pub(crate) fn map_fk_violation(e: sqlx::Error, on_missing: impl FnOnce() -> AppError) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_foreign_key_violation() {
            return on_missing();
        }
    }
    e.into()
}

// src/db/user_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::store::UserStore,
    models::auth::{Role, User},
};

// Diretório de usuários replicado do serviço de identidade; aqui é só leitura
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for UserRepository {
    // Busca um usuário pelo seu ID
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let maybe_user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, display_name, email, role, active, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(maybe_user)
    }

    // Consultores ativos: o universo válido das chaves de distribuição
    async fn list_active_consultants(&self) -> Result<Vec<User>, AppError> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, display_name, email, role, active, created_at
            FROM users
            WHERE role = $1 AND active
            ORDER BY display_name ASC
            "#,
        )
        .bind(Role::Consultant)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }
}

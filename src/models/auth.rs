// src/models/auth.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use utoipa::ToSchema;

// Perfis vindos do serviço de identidade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "user_role", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Consultant,
    BackOffice,
}

/// Quem executa a operação. Chega pronto do middleware de autenticação.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub id: Uuid,
    #[schema(example = "Marco Rossi")]
    pub display_name: String,
    pub role: Role,
}

impl Actor {
    pub fn new(id: Uuid, display_name: impl Into<String>, role: Role) -> Self {
        Self { id, display_name: display_name.into(), role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

// Representa um usuário (somente leitura: o cadastro é do serviço de identidade)
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    #[schema(example = "Marco Rossi")]
    pub display_name: String,
    #[schema(example = "marco.rossi@example.com")]
    pub email: String,
    pub role: Role,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn as_actor(&self) -> Actor {
        Actor::new(self.id, self.display_name.clone(), self.role)
    }
}

// Estrutura de dados ("claims") dentro do JWT
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,    // Subject (ID do usuário)
    pub name: String, // Nome de exibição
    pub role: Role,
    pub exp: usize, // Expiration time (quando o token expira)
    pub iat: usize, // Issued At (quando o token foi criado)
}

// src/services/auth.rs

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

use crate::{
    common::error::AppError,
    models::auth::{Actor, Claims},
};

// Só valida: os tokens são emitidos pelo serviço de identidade externo.
#[derive(Clone)]
pub struct AuthService {
    jwt_secret: String,
}

impl AuthService {
    pub fn new(jwt_secret: String) -> Self {
        Self { jwt_secret }
    }

    pub fn validate_token(&self, token: &str) -> Result<Actor, AppError> {
        let validation = Validation::new(Algorithm::HS256);
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &validation,
        )
        .map_err(|_| AppError::InvalidToken)?;

        let claims = token_data.claims;
        Ok(Actor::new(claims.sub, claims.name, claims.role))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::auth::Role;
    use chrono::Utc;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use uuid::Uuid;

    fn token(secret: &str, exp_offset: i64) -> (Uuid, String) {
        let now = Utc::now().timestamp();
        let id = Uuid::new_v4();
        let claims = Claims {
            sub: id,
            name: "Giulia Neri".into(),
            role: Role::BackOffice,
            exp: (now + exp_offset) as usize,
            iat: now as usize,
        };
        let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_ref())).unwrap();
        (id, token)
    }

    #[test]
    fn valid_token_becomes_actor() {
        let service = AuthService::new("segredo".into());
        let (id, token) = token("segredo", 3600);
        let actor = service.validate_token(&token).unwrap();
        assert_eq!(actor.id, id);
        assert_eq!(actor.role, Role::BackOffice);
        assert_eq!(actor.display_name, "Giulia Neri");
    }

    #[test]
    fn wrong_secret_or_expired_is_rejected() {
        let service = AuthService::new("segredo".into());
        let (_, forged) = token("outro", 3600);
        assert!(matches!(service.validate_token(&forged), Err(AppError::InvalidToken)));
        let (_, expired) = token("segredo", -3600);
        assert!(matches!(service.validate_token(&expired), Err(AppError::InvalidToken)));
    }
}

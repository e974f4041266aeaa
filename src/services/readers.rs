//! Reader registration, authentication and administration

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use validator::Validate;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::{
        reader::{CreateReader, ReaderClaims},
        Actor, Reader, ReaderDetails,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct ReadersService {
    repository: Repository,
    config: AuthConfig,
}

impl ReadersService {
    pub fn new(repository: Repository, config: AuthConfig) -> Self {
        Self { repository, config }
    }

    /// Register a new reader
    pub async fn register(&self, request: CreateReader) -> AppResult<ReaderDetails> {
        request.validate()?;

        let reader = Reader {
            id: request.id,
            name: request.name,
            email: request.email,
            registration: request.registration,
            password_hash: self.hash_password(&request.password)?,
            role: request.role,
            loans: Vec::new(),
            reservations: Vec::new(),
        };
        let details = ReaderDetails::from(&reader);

        self.repository
            .transact(|desk| desk.register_reader(reader))
            .await?;

        tracing::info!(reader_id = %details.id, role = %details.role, "Reader registered");
        Ok(details)
    }

    /// Verify credentials and return a signed token with the reader profile
    pub async fn authenticate(
        &self,
        reader_id: &str,
        password: &str,
    ) -> AppResult<(String, ReaderDetails)> {
        let reader = self
            .repository
            .read(|desk| desk.ledger().get(reader_id).ok().cloned())
            .await
            .ok_or_else(|| AppError::Authentication("Invalid reader id or password".to_string()))?;

        if !self.verify_password(&reader, password)? {
            tracing::warn!(reader_id, "Rejected login attempt");
            return Err(AppError::Authentication(
                "Invalid reader id or password".to_string(),
            ));
        }

        let now = Utc::now().timestamp();
        let claims = ReaderClaims {
            sub: reader.id.clone(),
            role: reader.role,
            exp: now + (self.config.jwt_expiration_hours as i64 * 3600),
            iat: now,
        };
        let token = claims
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))?;

        Ok((token, ReaderDetails::from(&reader)))
    }

    /// Identity behind a verified token, with the role as currently stored
    pub async fn resolve(&self, claims: &ReaderClaims) -> AppResult<Actor> {
        self.repository
            .read(|desk| {
                desk.ledger()
                    .get(&claims.sub)
                    .map(|reader| Actor::new(reader.id.clone(), reader.role))
                    .ok()
            })
            .await
            .ok_or_else(|| {
                tracing::warn!(reader_id = %claims.sub, "Token presented for unknown reader");
                AppError::Authentication("Reader no longer exists".to_string())
            })
    }

    /// Profile of the calling reader
    pub async fn me(&self, actor: &Actor) -> AppResult<ReaderDetails> {
        self.get_reader(actor, &actor.reader_id).await
    }

    pub async fn list_readers(&self, actor: &Actor) -> AppResult<Vec<ReaderDetails>> {
        actor.require_staff()?;
        Ok(self
            .repository
            .read(|desk| desk.ledger().iter().map(ReaderDetails::from).collect())
            .await)
    }

    pub async fn get_reader(&self, actor: &Actor, reader_id: &str) -> AppResult<ReaderDetails> {
        actor.require_staff_or_self(reader_id)?;
        Ok(self
            .repository
            .read(|desk| desk.ledger().get(reader_id).map(ReaderDetails::from))
            .await?)
    }

    /// Delete a reader with no copies out
    pub async fn delete_reader(&self, actor: &Actor, reader_id: &str) -> AppResult<()> {
        actor.require_staff()?;

        self.repository
            .transact(|desk| desk.remove_reader(reader_id))
            .await?;

        tracing::info!(reader_id, "Reader deleted");
        Ok(())
    }

    fn verify_password(&self, reader: &Reader, password: &str) -> AppResult<bool> {
        let parsed_hash = PasswordHash::new(&reader.password_hash)
            .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }

    /// Hash a password using Argon2
    pub fn hash_password(&self, password: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
        Ok(hash.to_string())
    }
}

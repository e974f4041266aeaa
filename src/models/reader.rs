//! Reader model, identity claims and related types

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use super::loan::Loan;
use crate::error::CirculationError;

/// Reader roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Staff,
    Student,
    Faculty,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Staff => "staff",
            Role::Student => "student",
            Role::Faculty => "faculty",
        }
    }

    /// Staff run the desk; they never borrow or reserve
    pub fn may_borrow(&self) -> bool {
        !matches!(self, Role::Staff)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "staff" => Ok(Role::Staff),
            "student" => Ok(Role::Student),
            "faculty" => Ok(Role::Faculty),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

/// Reader as persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reader {
    /// Natural identity key (national document number)
    pub id: String,
    pub name: String,
    pub email: String,
    /// Enrolment number, unique across readers
    pub registration: String,
    /// Argon2 PHC string
    pub password_hash: String,
    pub role: Role,
    pub loans: Vec<Loan>,
    /// Title ids the reader is queued for, in reservation order
    pub reservations: Vec<i32>,
}

impl Reader {
    /// Index of the reader's unfinished loan for a title
    pub fn open_loan_position(&self, title_id: i32) -> Option<usize> {
        self.loans
            .iter()
            .position(|loan| loan.title_id == title_id && loan.is_open())
    }

    pub fn open_loan_count(&self) -> usize {
        self.loans.iter().filter(|loan| loan.is_open()).count()
    }

    pub fn has_reservation(&self, title_id: i32) -> bool {
        self.reservations.contains(&title_id)
    }

    pub fn remove_reservation(&mut self, title_id: i32) -> bool {
        let before = self.reservations.len();
        self.reservations.retain(|id| *id != title_id);
        self.reservations.len() != before
    }
}

/// Reader profile as returned by the API (no credentials)
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReaderDetails {
    pub id: String,
    pub name: String,
    pub email: String,
    pub registration: String,
    pub role: Role,
    pub loans: Vec<Loan>,
    pub reservations: Vec<i32>,
}

impl From<&Reader> for ReaderDetails {
    fn from(reader: &Reader) -> Self {
        Self {
            id: reader.id.clone(),
            name: reader.name.clone(),
            email: reader.email.clone(),
            registration: reader.registration.clone(),
            role: reader.role,
            loans: reader.loans.clone(),
            reservations: reader.reservations.clone(),
        }
    }
}

/// Registration request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateReader {
    #[validate(length(min = 1, message = "Reader id is required"))]
    pub id: String,
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 1, message = "Registration number is required"))]
    pub registration: String,
    #[validate(length(min = 4, message = "Password must be at least 4 characters"))]
    pub password: String,
    pub role: Role,
}

/// The caller performing an operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub reader_id: String,
    pub role: Role,
}

impl Actor {
    pub fn new(reader_id: impl Into<String>, role: Role) -> Self {
        Self {
            reader_id: reader_id.into(),
            role,
        }
    }

    pub fn is_staff(&self) -> bool {
        self.role == Role::Staff
    }

    pub fn require_staff(&self) -> Result<(), CirculationError> {
        if self.is_staff() {
            Ok(())
        } else {
            Err(CirculationError::Forbidden)
        }
    }

    /// Staff may act for anyone; other readers only for themselves
    pub fn require_staff_or_self(&self, reader_id: &str) -> Result<(), CirculationError> {
        if self.is_staff() || self.reader_id == reader_id {
            Ok(())
        } else {
            Err(CirculationError::Forbidden)
        }
    }
}

/// JWT claims identifying a reader
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReaderClaims {
    pub sub: String,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

impl ReaderClaims {
    /// Create a new JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse JWT token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }
}

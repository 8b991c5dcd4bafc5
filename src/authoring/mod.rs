// src/authoring/mod.rs

//! Quiz authoring: staging questions, synchronizing them to the store and the quiz lifecycle.

pub mod lifecycle;
pub mod session;
pub mod staging;
pub mod sync;

use crate::{error::AppError, utils::jwt::Claims};

pub use lifecycle::QuizLifecycle;
pub use session::{AuthoringSession, SessionRegistry};
pub use staging::{DraftQuestion, StagingBuffer};
pub use sync::{SyncReport, Synchronizer};

/// Identity of the author on whose behalf an operation runs.
/// Passed explicitly into every lifecycle and synchronization call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Author {
    pub id: i64,
}

impl Author {
    pub fn new(id: i64) -> Self {
        Self { id }
    }

    /// Fails with `AuthenticationRequired` when there are no claims or the subject is not a user id.
    pub fn from_claims(claims: Option<&Claims>) -> Result<Self, AppError> {
        let claims = claims.ok_or(AppError::AuthenticationRequired)?;
        claims
            .sub
            .parse::<i64>()
            .map(Author::new)
            .map_err(|_| AppError::AuthenticationRequired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(sub: &str) -> Claims {
        Claims {
            sub: sub.to_string(),
            role: "teacher".to_string(),
            exp: usize::MAX,
        }
    }

    #[test]
    fn author_requires_claims() {
        assert_eq!(Author::from_claims(None), Err(AppError::AuthenticationRequired));
    }

    #[test]
    fn author_requires_numeric_subject() {
        assert_eq!(Author::from_claims(Some(&claims("42"))), Ok(Author::new(42)));
        assert_eq!(
            Author::from_claims(Some(&claims("not-a-user"))),
            Err(AppError::AuthenticationRequired)
        );
    }
}

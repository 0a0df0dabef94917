use argon2::{
    password_hash::{Encoding, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use chrono::{Duration, Utc};
use rand::rngs::OsRng;
use std::sync::Arc;
use thiserror::Error;

use crate::{util::random_string, Database, DatabaseError, NewSession, NewUser, SessionData, UserData};

pub struct Auth<Db> {
    db: Arc<Db>,
    argon: Argon2<'static>,
}

#[derive(Debug, Error)]
pub enum AuthError {
    /// Username or password is incorrect
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("An admin user already exists")]
    AdminExists,
    /// Something else went wrong with the database
    #[error(transparent)]
    Db(DatabaseError),
    #[error("HashError: {0}")]
    HashError(String),
}

impl<Db> Auth<Db>
where
    Db: Database,
{
    const SESSION_DURATION_IN_DAYS: usize = 7;

    pub fn new(db: &Arc<Db>) -> Self {
        Self {
            db: db.clone(),
            argon: Argon2::default(),
        }
    }

    /// Logs in a user, returning a new session
    pub async fn login(&self, credentials: Credentials) -> Result<SessionData, AuthError> {
        self.clear_expired().await;

        let user = self
            .db
            .user_by_username(&credentials.username)
            .await
            .map_err(|e| match e {
                DatabaseError::NotFound {
                    resource: _,
                    identifier: _,
                } => AuthError::InvalidCredentials,
                err => AuthError::Db(err),
            })?;

        let stored_password = PasswordHash::parse(&user.password, Encoding::default())
            .map_err(|e| AuthError::HashError(e.to_string()))?;

        self.argon
            .verify_password(credentials.password.as_bytes(), &stored_password)
            .map_err(|_| AuthError::InvalidCredentials)?;

        let expires_at = Utc::now() + Duration::days(Self::SESSION_DURATION_IN_DAYS as i64);

        let new_session = NewSession {
            token: random_string(32),
            user_id: user.id,
            expires_at,
        };

        let new_session = self
            .db
            .create_session(new_session)
            .await
            .map_err(AuthError::Db)?;

        Ok(new_session)
    }

    /// Deletes the associated session, if it exists
    pub async fn logout(&self, token: &str) -> Result<(), DatabaseError> {
        self.db.delete_session_by_token(token).await
    }

    /// Creates a basic user
    pub async fn register(&self, new_user: NewPlainUser) -> Result<UserData, AuthError> {
        self.create_user(NewUser {
            username: new_user.username,
            password: new_user.password,
            display_name: new_user.display_name,
            is_admin: false,
        })
        .await
    }

    /// Creates an admin user, if one doesn't already exist
    pub async fn register_admin(&self, new_user: NewPlainUser) -> Result<UserData, AuthError> {
        let has_admin = self.db.check_for_admin().await.map_err(AuthError::Db)?;

        if has_admin {
            return Err(AuthError::AdminExists);
        }

        self.create_user(NewUser {
            username: new_user.username,
            password: new_user.password,
            display_name: new_user.display_name,
            is_admin: true,
        })
        .await
    }

    /// Returns a session if it exists
    pub async fn session(&self, token: &str) -> Result<SessionData, DatabaseError> {
        self.db.session_by_token(token).await
    }

    async fn create_user(&self, new_user: NewUser) -> Result<UserData, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        let hashed_password = self
            .argon
            .hash_password(new_user.password.as_bytes(), &salt)
            .map_err(|e| AuthError::HashError(e.to_string()))?
            .to_string();

        self.db
            .create_user(NewUser {
                username: new_user.username,
                password: hashed_password,
                display_name: new_user.display_name,
                is_admin: new_user.is_admin,
            })
            .await
            .map_err(AuthError::Db)
    }

    async fn clear_expired(&self) {
        self.db
            .clear_expired_sessions()
            .await
            .expect("sessions are cleared")
    }
}

#[derive(Debug)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug)]
pub struct NewPlainUser {
    pub username: String,
    pub password: String,
    pub display_name: String,
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::MemoryDatabase;

    fn auth() -> Auth<MemoryDatabase> {
        Auth::new(&Arc::new(MemoryDatabase::new()))
    }

    fn new_user(username: &str) -> NewPlainUser {
        NewPlainUser {
            username: username.to_string(),
            password: "correct horse battery staple".to_string(),
            display_name: username.to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_and_login() {
        let auth = auth();

        let user = auth.register(new_user("sam")).await.expect("user is created");
        assert!(!user.is_admin);
        assert_ne!(
            user.password, "correct horse battery staple",
            "password should be stored hashed"
        );

        let session = auth
            .login(Credentials {
                username: "sam".to_string(),
                password: "correct horse battery staple".to_string(),
            })
            .await
            .expect("login succeeds");

        assert_eq!(session.user.id, user.id);

        let resolved = auth.session(&session.token).await.expect("session resolves");
        assert_eq!(resolved.user.username, "sam");
    }

    #[tokio::test]
    async fn test_wrong_password_is_rejected() {
        let auth = auth();
        auth.register(new_user("sam")).await.expect("user is created");

        let result = auth
            .login(Credentials {
                username: "sam".to_string(),
                password: "wrong".to_string(),
            })
            .await;

        assert!(matches!(result, Err(AuthError::InvalidCredentials)));

        // An unknown username looks the same as a wrong password
        let result = auth
            .login(Credentials {
                username: "nobody".to_string(),
                password: "wrong".to_string(),
            })
            .await;

        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_duplicate_username_conflicts() {
        let auth = auth();
        auth.register(new_user("sam")).await.expect("user is created");

        let result = auth.register(new_user("sam")).await;
        assert!(matches!(
            result,
            Err(AuthError::Db(DatabaseError::Conflict { .. }))
        ));
    }

    #[tokio::test]
    async fn test_only_one_admin_is_bootstrapped() {
        let auth = auth();

        let admin = auth
            .register_admin(new_user("admin"))
            .await
            .expect("admin is created");
        assert!(admin.is_admin);

        let result = auth.register_admin(new_user("second")).await;
        assert!(matches!(result, Err(AuthError::AdminExists)));
    }

    #[tokio::test]
    async fn test_logout_invalidates_session() {
        let auth = auth();
        auth.register(new_user("sam")).await.expect("user is created");

        let session = auth
            .login(Credentials {
                username: "sam".to_string(),
                password: "correct horse battery staple".to_string(),
            })
            .await
            .expect("login succeeds");

        auth.logout(&session.token).await.expect("logout succeeds");

        let result = auth.session(&session.token).await;
        assert!(matches!(result, Err(DatabaseError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_expired_session_is_rejected() {
        let db = Arc::new(MemoryDatabase::new());
        let auth = Auth::new(&db);

        let user = auth.register(new_user("sam")).await.expect("user is created");

        let expired = db
            .create_session(NewSession {
                token: "stale-token".to_string(),
                user_id: user.id,
                expires_at: Utc::now() - Duration::hours(1),
            })
            .await
            .expect("session is created");

        let result = auth.session(&expired.token).await;
        assert!(matches!(result, Err(DatabaseError::NotFound { .. })));
    }
}

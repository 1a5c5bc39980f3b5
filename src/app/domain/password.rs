use argon2::{
    password_hash::SaltString,
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use rand_core::OsRng;
use validator::ValidationError;

/// Plaintext password. `new` enforces signup strength rules; `for_verification` does not.
#[derive(Debug, Clone)]
pub struct Password(String);

impl Password {
    /// Wrap a login attempt. Accounts created under older rules must still be able to sign in.
    pub fn for_verification(plaintext: String) -> Self {
        Self(plaintext)
    }

    pub fn new(password: String) -> Result<Self, ValidationError> {
        let problem = if password.len() < 8 {
            Some(("password_too_short", "Password must be at least 8 characters"))
        } else if password.len() > 128 {
            Some(("password_too_long", "Password must be at most 128 characters"))
        } else if !(password.chars().any(char::is_uppercase)
            && password.chars().any(char::is_lowercase)
            && password.chars().any(char::is_numeric))
        {
            Some(("weak_password", "Password must contain uppercase, lowercase, and digit"))
        } else {
            None
        };

        match problem {
            Some((code, message)) => {
                let mut error = ValidationError::new(code);
                error.message = Some(message.into());
                Err(error)
            }
            None => Ok(Self(password)),
        }
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

/// Argon2id hash as stored in `users.password_hash` and in pending signup payloads.
#[derive(Debug, Clone)]
pub struct HashedPassword(String);

impl HashedPassword {
    pub fn from_password(password: &Password) -> Result<Self, argon2::password_hash::Error> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
        Ok(Self(hash.to_string()))
    }

    pub fn verify(&self, password: &Password) -> Result<(), argon2::password_hash::Error> {
        let parsed_hash = PasswordHash::new(&self.0)?;
        Argon2::default().verify_password(password.as_bytes(), &parsed_hash)
    }

    pub fn from_string(s: String) -> Self {
        Self(s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

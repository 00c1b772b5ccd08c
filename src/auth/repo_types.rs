use sqlx::FromRow;

/// User record in the database.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,                    // assigned by the database
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub email: String,              // lower-cased login identifier
    pub mobile: Option<String>,
    pub password: String,           // Argon2 PHC string, never the plaintext
    pub created_at: i64,            // unix seconds
}

impl User {
    /// Name shown on the home page.
    pub fn display_name(&self) -> &str {
        self.first_name
            .as_deref()
            .or(self.username.as_deref())
            .unwrap_or(&self.email)
    }
}

/// Fields for a row about to be inserted.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub email: String,
    pub mobile: Option<String>,
    pub password_hash: String,
}

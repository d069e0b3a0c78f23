use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub is_admin: bool,
    pub is_premium: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(email: String, full_name: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            email,
            full_name,
            is_admin: false,
            is_premium: false,
            created_at: Utc::now(),
        }
    }

    pub fn display_name(&self) -> &str {
        self.full_name.as_deref().unwrap_or(&self.email)
    }

    pub fn session(&self) -> Session {
        Session::new(self.id, self.is_admin)
    }
}

/// Who is making a request. Passed explicitly wherever a decision depends
/// on the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    user_id: Uuid,
    is_admin: bool,
}

impl Session {
    pub fn new(user_id: Uuid, is_admin: bool) -> Self {
        Self { user_id, is_admin }
    }
    pub fn user_id(&self) -> Uuid {
        self.user_id
    }
    pub fn is_admin(&self) -> bool {
        self.is_admin
    }
}

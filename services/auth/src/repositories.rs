//! Repositories for database operations

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{NewUser, User};

#[cfg(test)]
pub mod memory;
pub mod user;

pub use user::UserRepository;

/// Credits granted to a user on creation
pub const STARTING_CREDITS: i32 = 100;

/// User accounts as seen by the sign-in flow
#[async_trait]
pub trait UserAccounts: Send + Sync {
    /// Find a user by ID
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;

    /// Find a user by email address
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Return the user with this email, creating it on first sign-in
    ///
    /// An existing user is returned unchanged.
    async fn find_or_create(&self, new_user: &NewUser) -> Result<User>;
}

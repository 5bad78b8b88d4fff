//! Accounts: signup, login and the current-user session.
//!
//! Credentials are stored and compared in plaintext. The store is a single-user silo and this
//! module makes no attempt at authentication security.

use crate::constants::{CURRENT_USER_KEY, USERS_KEY};
use crate::store::LocalStore;
use crate::{RxError, RxResult};
use rx_types::{EmailAddress, NonEmptyText};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The dashboard a user is routed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Doctor,
    Patient,
    Pharmacy,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Doctor, Role::Patient, Role::Pharmacy];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Doctor => "Doctor",
            Role::Patient => "Patient",
            Role::Pharmacy => "Pharmacy",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = RxError;

    /// Case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Role::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| RxError::InvalidInput(format!("unknown role: {wanted}")))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub password: String,
    pub name: String,
    pub role: Role,
}

impl User {
    /// Fails with `RxError::Forbidden` unless this user has `required`.
    pub fn require_role(&self, required: Role) -> RxResult<()> {
        if self.role == required {
            Ok(())
        } else {
            Err(RxError::Forbidden {
                required,
                actual: self.role,
            })
        }
    }
}

/// Raw signup input, as typed into the signup form.
#[derive(Clone, Debug)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

#[derive(Clone, Debug)]
pub struct AccountService {
    store: LocalStore,
}

impl AccountService {
    pub fn new(store: LocalStore) -> Self {
        Self { store }
    }

    /// Registers a user and signs them in.
    ///
    /// # Errors
    ///
    /// - `RxError::MissingSignupFields` if name, email or password is empty,
    /// - `RxError::Text` if the email is malformed,
    /// - `RxError::DuplicateEmail` if the email is already registered,
    /// - storage errors.
    pub fn sign_up(&self, new_user: NewUser) -> RxResult<User> {
        if new_user.password.is_empty() {
            return Err(RxError::MissingSignupFields);
        }
        let name = NonEmptyText::new(&new_user.name).map_err(|_| RxError::MissingSignupFields)?;
        if new_user.email.trim().is_empty() {
            return Err(RxError::MissingSignupFields);
        }
        let email = EmailAddress::parse(&new_user.email)?;

        let user = User {
            id: uuid::Uuid::new_v4().simple().to_string(),
            email: email.as_str().to_string(),
            password: new_user.password,
            name: name.into_inner(),
            role: new_user.role,
        };

        self.store.update::<Vec<User>, _>(USERS_KEY, |users| {
            if users.iter().any(|u| u.email == user.email) {
                return Err(RxError::DuplicateEmail);
            }
            users.push(user.clone());
            Ok(())
        })?;

        tracing::info!(user_id = %user.id, role = %user.role, "user signed up");
        self.store.set(CURRENT_USER_KEY, &user)?;
        Ok(user)
    }

    /// Signs in the user whose email, password and role all match.
    pub fn login(&self, email: &str, password: &str, role: Role) -> RxResult<User> {
        let email = email.trim();
        let users: Vec<User> = self.store.get_or_default(USERS_KEY)?;

        let Some(user) = users
            .into_iter()
            .find(|u| u.email == email && u.password == password && u.role == role)
        else {
            tracing::warn!(%role, "rejected login");
            return Err(RxError::InvalidCredentials);
        };

        tracing::info!(user_id = %user.id, role = %user.role, "user logged in");
        self.store.set(CURRENT_USER_KEY, &user)?;
        Ok(user)
    }

    pub fn current_user(&self) -> RxResult<Option<User>> {
        self.store.get(CURRENT_USER_KEY)
    }

    /// Like [`AccountService::current_user`] but failing with `RxError::NotSignedIn`.
    pub fn require_current_user(&self) -> RxResult<User> {
        self.current_user()?.ok_or(RxError::NotSignedIn)
    }

    pub fn logout(&self) -> RxResult<()> {
        self.store.remove(CURRENT_USER_KEY)
    }

    pub fn find_by_id(&self, id: &str) -> RxResult<Option<User>> {
        let users: Vec<User> = self.store.get_or_default(USERS_KEY)?;
        Ok(users.into_iter().find(|u| u.id == id))
    }
}

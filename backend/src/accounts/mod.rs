//! Accounts: enrollment, credentials and profile maintenance.
//!
//! The submission lifecycle only needs the narrow [`AccountDirectory`] view; the HTTP
//! layer uses the full [`Accounts`] service.

pub mod password;
pub mod token;

use crate::config::BootstrapAdmin;
use crate::db::{self, Database};
use crate::error::ApiError;
use chrono::Utc;
use regex::Regex;
use rusqlite::ErrorCode;
use taxdesk_common::model::page::Page;
use taxdesk_common::model::user::{Role, User};
use taxdesk_common::requests::{
    ChangePasswordRequest, CreateUserRequest, EnrollRequest, LoginRequest, UpdateProfileRequest,
    UpdateUserRequest,
};

pub const USERS_PAGE_SIZE: u32 = 10;

const EMAIL_PATTERN: &str = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";

/// Identity lookups the submission lifecycle depends on.
pub trait AccountDirectory: Send + Sync {
    /// Resolves an account, failing with `NotFound` when it does not exist.
    fn find_by_id(&self, id: &str) -> Result<User, ApiError>;
    /// Resolves an NSTIN or an email address.
    fn find_by_identifier(&self, identifier: &str) -> Result<Option<User>, ApiError>;
    fn verify_credential(&self, id: &str, plaintext: &str) -> Result<bool, ApiError>;
}

#[derive(Clone)]
pub struct Accounts {
    db: Database,
}

impl AccountDirectory for Accounts {
    fn find_by_id(&self, id: &str) -> Result<User, ApiError> {
        self.db
            .call(|conn| db::users::find_by_id(conn, id))?
            .map(|record| record.user)
            .ok_or(ApiError::NotFound("User"))
    }

    fn find_by_identifier(&self, identifier: &str) -> Result<Option<User>, ApiError> {
        Ok(self
            .db
            .call(|conn| db::users::find_by_identifier(conn, identifier.trim()))?
            .map(|record| record.user))
    }

    fn verify_credential(&self, id: &str, plaintext: &str) -> Result<bool, ApiError> {
        Ok(self
            .db
            .call(|conn| db::users::find_by_id(conn, id))?
            .is_some_and(|record| password::verify_password(plaintext, &record.password_hash)))
    }
}

fn require(value: &str, message: &str) -> Result<String, ApiError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ApiError::validation(message));
    }
    Ok(value.to_string())
}

fn require_len(value: &str, min: usize, max: usize, message: &str) -> Result<String, ApiError> {
    let value = require(value, message)?;
    if !(min..=max).contains(&value.chars().count()) {
        return Err(ApiError::validation(message));
    }
    Ok(value)
}

fn valid_email(value: &str) -> Result<String, ApiError> {
    let email_re = Regex::new(EMAIL_PATTERN).map_err(ApiError::internal)?;
    let value = value.trim().to_ascii_lowercase();
    if !email_re.is_match(&value) {
        return Err(ApiError::validation("Please include a valid email"));
    }
    Ok(value)
}

fn valid_phone(value: &str) -> Result<String, ApiError> {
    require_len(value, 10, 15, "Phone number is required (10-15 characters)")
}

fn valid_password(value: &str, message: &str) -> Result<(), ApiError> {
    if value.chars().count() < 6 {
        return Err(ApiError::validation(message));
    }
    Ok(())
}

/// A unique-index violation means another request registered the same identity first.
fn conflict_on_duplicate(e: rusqlite::Error, message: &str) -> ApiError {
    match &e {
        rusqlite::Error::SqliteFailure(err, _) if err.code == ErrorCode::ConstraintViolation => {
            ApiError::Conflict(message.to_string())
        }
        _ => e.into(),
    }
}

struct NewAccount {
    nstin: String,
    name: String,
    email: String,
    phone: String,
    password: String,
    role: Role,
}

impl Accounts {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn register(&self, account: NewAccount) -> Result<User, ApiError> {
        const DUPLICATE: &str = "User already exists with this NSTIN or email";

        let taken = self.db.call(|conn| {
            db::users::identity_taken(conn, Some(&account.nstin), Some(&account.email), None)
        })?;
        if taken {
            return Err(ApiError::Conflict(DUPLICATE.to_string()));
        }

        let now = Utc::now();
        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            nstin: account.nstin,
            name: account.name,
            email: account.email,
            phone: account.phone,
            role: account.role,
            created_at: now,
            updated_at: now,
        };
        let hash = password::hash_password(&account.password)?;

        self.db
            .call(|conn| Ok(db::users::insert(conn, &user, &hash)))?
            .map_err(|e| conflict_on_duplicate(e, DUPLICATE))?;
        log::info!("Registered {} account {}", user.role, user.id);
        Ok(user)
    }

    /// Self-service enrollment. New accounts always get the `user` role.
    pub fn enroll(&self, req: EnrollRequest) -> Result<User, ApiError> {
        valid_password(&req.password, "Password must be at least 6 characters")?;
        self.register(NewAccount {
            nstin: require_len(&req.nstin, 10, 15, "NSTIN is required (10-15 characters)")?,
            name: require(&req.name, "Name is required")?,
            email: valid_email(&req.email)?,
            phone: valid_phone(&req.phone)?,
            password: req.password,
            role: Role::User,
        })
    }

    /// Admin-side account creation.
    pub fn create(&self, req: CreateUserRequest) -> Result<User, ApiError> {
        valid_password(&req.password, "Password must be at least 6 characters")?;
        self.register(NewAccount {
            nstin: require_len(&req.nstin, 10, 15, "NSTIN is required (10-15 characters)")?,
            name: require(&req.name, "Name is required")?,
            email: valid_email(&req.email)?,
            phone: valid_phone(&req.phone)?,
            password: req.password,
            role: req.role.unwrap_or_default(),
        })
    }

    /// Authenticates by NSTIN. Unknown accounts and wrong passwords look the same.
    pub fn login(&self, req: LoginRequest) -> Result<User, ApiError> {
        let nstin = require(&req.nstin, "NSTIN is required")?;
        if req.password.is_empty() {
            return Err(ApiError::validation("Password is required"));
        }
        let invalid = || ApiError::validation("Invalid credentials");

        let record = self
            .db
            .call(|conn| db::users::find_by_identifier(conn, &nstin))?
            .filter(|record| record.user.nstin == nstin)
            .ok_or_else(invalid)?;
        if !password::verify_password(&req.password, &record.password_hash) {
            return Err(invalid());
        }
        Ok(record.user)
    }

    pub fn update_profile(&self, id: &str, req: UpdateProfileRequest) -> Result<User, ApiError> {
        let mut user = self.find_by_id(id)?;
        let email = valid_email(&req.email)?;
        user.name = require(&req.name, "Name is required")?;
        user.phone = valid_phone(&req.phone)?;
        self.apply_update(user, email, None)
    }

    pub fn change_password(&self, id: &str, req: ChangePasswordRequest) -> Result<(), ApiError> {
        if req.current_password.is_empty() {
            return Err(ApiError::validation("Current password is required"));
        }
        valid_password(
            &req.new_password,
            "New password must be at least 6 characters",
        )?;
        self.find_by_id(id)?;
        if !self.verify_credential(id, &req.current_password)? {
            return Err(ApiError::validation("Current password is incorrect"));
        }
        self.set_password(id, &req.new_password)
    }

    /// Admin edit. Absent fields keep their value; a new password replaces the old one.
    pub fn admin_update(&self, id: &str, req: UpdateUserRequest) -> Result<User, ApiError> {
        let mut user = self.find_by_id(id)?;
        let email = match req.email.as_deref().map(str::trim).filter(|e| !e.is_empty()) {
            Some(email) => valid_email(email)?,
            None => user.email.clone(),
        };
        if let Some(name) = req.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            user.name = name.to_string();
        }
        if let Some(phone) = req.phone.as_deref().filter(|p| !p.trim().is_empty()) {
            user.phone = valid_phone(phone)?;
        }
        if let Some(role) = req.role {
            user.role = role;
        }
        let password = req.password.filter(|p| !p.is_empty());
        if let Some(password) = &password {
            valid_password(password, "Password must be at least 6 characters")?;
        }
        self.apply_update(user, email, password)
    }

    fn apply_update(
        &self,
        mut user: User,
        email: String,
        password: Option<String>,
    ) -> Result<User, ApiError> {
        const IN_USE: &str = "Email is already in use";

        if email != user.email {
            let taken = self
                .db
                .call(|conn| db::users::identity_taken(conn, None, Some(&email), Some(&user.id)))?;
            if taken {
                return Err(ApiError::Conflict(IN_USE.to_string()));
            }
            user.email = email;
        }
        user.updated_at = Utc::now();

        let changed = self
            .db
            .call(|conn| Ok(db::users::update(conn, &user)))?
            .map_err(|e| conflict_on_duplicate(e, IN_USE))?;
        if changed == 0 {
            return Err(ApiError::NotFound("User"));
        }
        if let Some(password) = password {
            self.set_password(&user.id, &password)?;
        }
        Ok(user)
    }

    fn set_password(&self, id: &str, plaintext: &str) -> Result<(), ApiError> {
        let hash = password::hash_password(plaintext)?;
        let changed = self
            .db
            .call(|conn| db::users::set_password(conn, id, &hash, &Utc::now()))?;
        if changed == 0 {
            return Err(ApiError::NotFound("User"));
        }
        Ok(())
    }

    /// Removes the account. Its submissions stay on record.
    pub fn delete(&self, id: &str) -> Result<(), ApiError> {
        let removed = self.db.call(|conn| db::users::delete(conn, id))?;
        if removed == 0 {
            return Err(ApiError::NotFound("User"));
        }
        log::info!("Deleted account {}", id);
        Ok(())
    }

    pub fn list(&self, search: Option<&str>, page: u32) -> Result<Page<User>, ApiError> {
        let page = page.max(1);
        let search = search.map(str::trim).filter(|s| !s.is_empty());
        let (users, total) = self
            .db
            .call(|conn| db::users::list(conn, search, page, USERS_PAGE_SIZE))?;
        Ok(Page::new(users, page, USERS_PAGE_SIZE, total))
    }

    pub fn count_citizens(&self) -> Result<u64, ApiError> {
        self.db
            .call(|conn| db::users::count_by_role(conn, Role::User))
    }

    /// Creates the configured first-run administrator unless the NSTIN is already taken.
    pub fn ensure_admin(&self, admin: &BootstrapAdmin) -> Result<bool, ApiError> {
        if self.find_by_identifier(&admin.nstin)?.is_some() {
            return Ok(false);
        }
        self.create(CreateUserRequest {
            nstin: admin.nstin.clone(),
            name: "Administrator".to_string(),
            email: admin.email.clone(),
            phone: "0000000000".to_string(),
            password: admin.password.clone(),
            role: Some(Role::Admin),
        })?;
        Ok(true)
    }
}

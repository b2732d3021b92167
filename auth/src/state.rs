//! Account types.
//!
//! [`User`] is the public view of an account. The password hash only ever
//! travels inside [`StoredUser`] between a repository and the identity
//! service.

use car_rental_core::UserId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Tier every new account starts in.
pub const DEFAULT_MEMBERSHIP_TIER: &str = "Basic";

// ═══════════════════════════════════════════════════════════════════════
// Users
// ═══════════════════════════════════════════════════════════════════════

/// A registered user, without credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User identifier
    pub user_id: UserId,
    /// Display name
    pub name: String,
    /// Login email, unique
    pub email: String,
    /// Phone number, unique
    pub phone_no: String,
    /// Date of birth
    pub dob: NaiveDate,
    /// Membership tier name
    pub membership_tier: String,
}

/// Account row as a repository stores it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredUser {
    /// Public fields
    pub user: User,
    /// Argon2 PHC string
    pub password_hash: String,
}

/// Registration payload.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    /// Display name
    pub name: String,
    /// Login email
    pub email: String,
    /// Phone number
    pub phone_no: String,
    /// Plaintext password, hashed before storage
    pub password: String,
    /// Date of birth
    pub dob: NaiveDate,
}

/// Registration data after hashing, handed to the repository.
#[derive(Debug, Clone)]
pub struct NewUserRecord {
    /// Display name
    pub name: String,
    /// Login email
    pub email: String,
    /// Phone number
    pub phone_no: String,
    /// Argon2 PHC string
    pub password_hash: String,
    /// Date of birth
    pub dob: NaiveDate,
}

/// Partial profile update. Absent fields keep their value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    /// New display name
    pub name: Option<String>,
    /// New login email
    pub email: Option<String>,
    /// New phone number
    pub phone_no: Option<String>,
    /// New date of birth
    pub dob: Option<NaiveDate>,
    /// New plaintext password, re-hashed before storage
    pub password: Option<String>,
}

/// Update data after hashing, handed to the repository.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    /// New display name
    pub name: Option<String>,
    /// New login email
    pub email: Option<String>,
    /// New phone number
    pub phone_no: Option<String>,
    /// New date of birth
    pub dob: Option<NaiveDate>,
    /// New password hash
    pub password_hash: Option<String>,
}

// ═══════════════════════════════════════════════════════════════════════
// Membership
// ═══════════════════════════════════════════════════════════════════════

/// Benefits attached to a membership tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Membership {
    /// Tier name
    pub tier: String,
    /// Percentage taken off the hourly rate
    pub hourly_rate_discount: f64,
    /// Early access to new vehicles
    pub priority_access: bool,
    /// Maximum concurrent bookings
    pub booking_limit: i32,
}

impl Membership {
    /// The built-in tiers: Basic, Premium, VIP.
    #[must_use]
    pub fn standard_tiers() -> Vec<Self> {
        vec![
            Self {
                tier: DEFAULT_MEMBERSHIP_TIER.to_string(),
                hourly_rate_discount: 0.0,
                priority_access: false,
                booking_limit: 2,
            },
            Self {
                tier: "Premium".to_string(),
                hourly_rate_discount: 10.0,
                priority_access: true,
                booking_limit: 5,
            },
            Self {
                tier: "VIP".to_string(),
                hourly_rate_discount: 20.0,
                priority_access: true,
                booking_limit: 10,
            },
        ]
    }
}

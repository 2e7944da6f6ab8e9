//! Account Lockout Entity

use chrono::{DateTime, Utc};
use kernel::id::AccountLockoutId;

use crate::domain::value_object::UserId;

/// Reason recorded when the failure threshold trips
pub const REASON_FAILED_ATTEMPTS: &str = "multiple failed attempts";

#[derive(Debug, Clone)]
pub struct AccountLockout {
    pub id: AccountLockoutId,
    pub user_id: UserId,
    pub email: String,
    pub locked_at: DateTime<Utc>,
    /// `None` means "until released"
    pub unlocked_at: Option<DateTime<Utc>>,
    pub failed_count: i32,
    pub reason: String,
    pub is_active: bool,
}

impl AccountLockout {
    pub fn new(
        user_id: UserId,
        email: impl Into<String>,
        reason: impl Into<String>,
        failed_count: i32,
    ) -> Self {
        Self {
            id: AccountLockoutId::new(),
            user_id,
            email: email.into(),
            locked_at: Utc::now(),
            unlocked_at: None,
            failed_count,
            reason: reason.into(),
            is_active: true,
        }
    }

    /// Active, and either open-ended or unlocking in the future
    pub fn is_in_force(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.unlocked_at.is_none_or(|at| at > now)
    }

    /// Whole minutes until release, rounded up. `None` when open-ended.
    pub fn remaining_minutes(&self, now: DateTime<Utc>) -> Option<i64> {
        let unlock_at = self.unlocked_at.filter(|at| *at > now)?;
        let millis = (unlock_at - now).num_milliseconds();
        Some((millis + 59_999) / 60_000)
    }

    pub fn release(&mut self) {
        self.is_active = false;
        self.unlocked_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn lockout() -> AccountLockout {
        AccountLockout::new(UserId::new(), "a@b.io", REASON_FAILED_ATTEMPTS, 5)
    }

    #[test]
    fn test_open_ended_lockout_is_in_force() {
        let lockout = lockout();
        assert!(lockout.is_in_force(Utc::now()));
        assert_eq!(lockout.remaining_minutes(Utc::now()), None);
    }

    #[test]
    fn test_future_unlock_rounds_up() {
        let now = Utc::now();
        let mut lockout = lockout();
        lockout.unlocked_at = Some(now + Duration::seconds(61));

        assert!(lockout.is_in_force(now));
        assert_eq!(lockout.remaining_minutes(now), Some(2));
    }

    #[test]
    fn test_sub_second_remainder_counts_as_a_minute() {
        let now = Utc::now();
        let mut lockout = lockout();
        lockout.unlocked_at = Some(now + Duration::milliseconds(500));

        assert!(lockout.is_in_force(now));
        assert_eq!(lockout.remaining_minutes(now), Some(1));
    }

    #[test]
    fn test_past_unlock_is_not_in_force() {
        let now = Utc::now();
        let mut lockout = lockout();
        lockout.unlocked_at = Some(now - Duration::minutes(1));

        assert!(!lockout.is_in_force(now));
        assert_eq!(lockout.remaining_minutes(now), None);
    }

    #[test]
    fn test_release() {
        let mut lockout = lockout();
        lockout.release();
        assert!(!lockout.is_active);
        assert!(!lockout.is_in_force(Utc::now()));
    }
}

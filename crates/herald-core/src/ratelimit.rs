//! Global and per-user cooldown tracking.
//!
//! Two independent maps hold "not-before" timestamps in milliseconds:
//!
//! ```text
//! global:   command ─────────────► not_before
//! per_user: user ──► command ────► not_before
//! ```
//!
//! A pair is blocked while `now < not_before`. Entries are never removed,
//! only overwritten by the next successful dispatch. Keys are command names,
//! so cooldowns carry across a registry reload.
//!
//! The dispatcher checks and records under a single [`RateLimitGuard`] so two
//! concurrent dispatches of the same command cannot both slip past a gate
//! before either records.

use std::collections::HashMap;

use parking_lot::{Mutex, MutexGuard};

use crate::command::Command;
use crate::interaction::UserId;

#[derive(Debug, Default)]
struct State {
    global: HashMap<String, u64>,
    per_user: HashMap<UserId, HashMap<String, u64>>,
}

/// Process-wide cooldown state.
#[derive(Debug, Default)]
pub struct RateLimiter {
    state: Mutex<State>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the state for a check-then-record sequence.
    pub fn lock(&self) -> RateLimitGuard<'_> {
        RateLimitGuard {
            state: self.state.lock(),
        }
    }

    /// `true` if the command's global cooldown has elapsed.
    pub fn check_global(&self, command: &Command, now: u64) -> bool {
        self.lock().check_global(command, now)
    }

    /// `true` if this user's cooldown for the command has elapsed.
    pub fn check_per_user(&self, user: &UserId, command: &Command, now: u64) -> bool {
        self.lock().check_per_user(user, command, now)
    }

    /// Starts the command's global cooldown at `now`.
    pub fn record_global(&self, command: &Command, now: u64) {
        self.lock().record_global(command, now)
    }

    /// Starts this user's cooldown for the command at `now`.
    pub fn record_per_user(&self, user: &UserId, command: &Command, now: u64) {
        self.lock().record_per_user(user, command, now)
    }

    /// Milliseconds left on the global cooldown, if any.
    pub fn remaining_global(&self, command: &Command, now: u64) -> Option<u64> {
        self.lock().remaining_global(command, now)
    }

    /// Milliseconds left on this user's cooldown, if any.
    pub fn remaining_per_user(&self, user: &UserId, command: &Command, now: u64) -> Option<u64> {
        self.lock().remaining_per_user(user, command, now)
    }

    /// Number of users with at least one recorded cooldown.
    pub fn tracked_users(&self) -> usize {
        self.state.lock().per_user.len()
    }
}

/// Exclusive view of the rate-limit state.
pub struct RateLimitGuard<'a> {
    state: MutexGuard<'a, State>,
}

fn remaining(not_before: Option<&u64>, now: u64) -> Option<u64> {
    not_before.and_then(|&t| (now < t).then(|| t - now))
}

impl RateLimitGuard<'_> {
    pub fn check_global(&self, command: &Command, now: u64) -> bool {
        self.remaining_global(command, now).is_none()
    }

    pub fn check_per_user(&self, user: &UserId, command: &Command, now: u64) -> bool {
        self.remaining_per_user(user, command, now).is_none()
    }

    pub fn remaining_global(&self, command: &Command, now: u64) -> Option<u64> {
        remaining(self.state.global.get(command.name()), now)
    }

    pub fn remaining_per_user(&self, user: &UserId, command: &Command, now: u64) -> Option<u64> {
        remaining(
            self.state
                .per_user
                .get(user)
                .and_then(|m| m.get(command.name())),
            now,
        )
    }

    pub fn record_global(&mut self, command: &Command, now: u64) {
        self.state.global.insert(
            command.name().to_string(),
            now.saturating_add(command.global_cooldown_ms()),
        );
    }

    pub fn record_per_user(&mut self, user: &UserId, command: &Command, now: u64) {
        self.state
            .per_user
            .entry(user.clone())
            .or_default()
            .insert(
                command.name().to_string(),
                now.saturating_add(command.per_user_cooldown_ms()),
            );
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::command::CommandContext;

    async fn noop(_ctx: CommandContext) {}

    fn ping() -> Command {
        Command::new("ping", noop)
            .global_cooldown(Duration::from_millis(5000))
            .per_user_cooldown(Duration::from_millis(10_000))
    }

    #[test]
    fn global_window_boundaries() {
        let limiter = RateLimiter::new();
        let cmd = ping();

        assert!(limiter.check_global(&cmd, 0));
        limiter.record_global(&cmd, 0);
        assert!(!limiter.check_global(&cmd, 3000));
        assert_eq!(limiter.remaining_global(&cmd, 3000), Some(2000));
        assert!(limiter.check_global(&cmd, 5000));
        assert!(limiter.check_global(&cmd, 5001));
    }

    #[test]
    fn per_user_windows_are_independent() {
        let limiter = RateLimiter::new();
        let cmd = ping();
        let alice = UserId::new("alice");
        let bob = UserId::new("bob");

        limiter.record_per_user(&alice, &cmd, 0);
        assert!(!limiter.check_per_user(&alice, &cmd, 100));
        assert!(limiter.check_per_user(&bob, &cmd, 100));
        assert_eq!(limiter.tracked_users(), 1);
    }

    #[test]
    fn zero_cooldown_still_writes_entry() {
        let limiter = RateLimiter::new();
        let cmd = Command::new("info", noop);
        let user = UserId::new("alice");

        limiter.record_per_user(&user, &cmd, 42);
        assert_eq!(limiter.tracked_users(), 1);
        assert!(limiter.check_per_user(&user, &cmd, 42));
        assert!(limiter.check_global(&cmd, 42));
    }

    #[test]
    fn guard_checks_and_records_together() {
        let limiter = RateLimiter::new();
        let cmd = ping();
        let user = UserId::new("alice");

        {
            let mut guard = limiter.lock();
            assert!(guard.check_global(&cmd, 0));
            assert!(guard.check_per_user(&user, &cmd, 0));
            guard.record_global(&cmd, 0);
            guard.record_per_user(&user, &cmd, 0);
        }

        assert_eq!(limiter.remaining_per_user(&user, &cmd, 4000), Some(6000));
    }
}

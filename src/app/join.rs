//! Join/retry controller.
//!
//! ```text
//!   Idle(n) ──request──▶ Joining ──Joined / attached──▶ Joined
//!      ▲                   │  ▲
//!      │        joiner Idle│  │retry (under cap and deadline)
//!      │                   ▼  │
//!      └────give up──────── (attempt n+1)
//! ```
//!
//! The deadline is checked on each retry; there is no separate timer.

use log::{info, warn};

/// One commissioning session, from request until success or give-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinAttempt {
    pub attempt_count: u32,
    pub started_at_ms: u64,
    pub deadline_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinState {
    /// Not joining.  Carries the attempt count of the last session.
    Idle(u32),
    Joining(JoinAttempt),
    Joined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinRejected {
    AlreadyJoined,
    AlreadyJoining,
}

/// What to do after the low-level procedure ended without success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Kick another low-level attempt.
    Retry { attempt: u32 },
    /// Stop blinking; no further automatic attempts.
    GiveUp { attempts: u32 },
    /// No join in progress.
    Ignore,
}

#[derive(Debug, Clone, Copy)]
pub struct JoinController {
    state: JoinState,
    timeout_ms: u64,
    max_attempts: u32,
}

impl JoinController {
    pub fn new(timeout_secs: u32, max_attempts: u32) -> Self {
        Self {
            state: JoinState::Idle(0),
            timeout_ms: u64::from(timeout_secs) * 1000,
            max_attempts,
        }
    }

    pub fn state(&self) -> JoinState {
        self.state
    }

    pub fn is_joining(&self) -> bool {
        matches!(self.state, JoinState::Joining(_))
    }

    /// Open a new session.  The caller kicks the low-level attempt and
    /// calls [`abandon`](Self::abandon) if that fails.
    pub fn begin(&mut self, now_ms: u64) -> Result<(), JoinRejected> {
        match self.state {
            JoinState::Joined => Err(JoinRejected::AlreadyJoined),
            JoinState::Joining(_) => Err(JoinRejected::AlreadyJoining),
            JoinState::Idle(_) => {
                self.state = JoinState::Joining(JoinAttempt {
                    attempt_count: 0,
                    started_at_ms: now_ms,
                    deadline_ms: now_ms + self.timeout_ms,
                });
                info!("Join: started at {} ms", now_ms);
                Ok(())
            }
        }
    }

    /// The first low-level call failed; drop the session.
    pub fn abandon(&mut self) {
        if let JoinState::Joining(attempt) = self.state {
            self.state = JoinState::Idle(attempt.attempt_count);
        }
    }

    /// Low-level attempt ended without success.
    pub fn on_joiner_idle(&mut self, now_ms: u64) -> RetryDecision {
        let JoinState::Joining(mut attempt) = self.state else {
            return RetryDecision::Ignore;
        };

        attempt.attempt_count = attempt.attempt_count.saturating_add(1);

        if now_ms > attempt.deadline_ms || attempt.attempt_count >= self.max_attempts {
            warn!(
                "Join: giving up after {} attempts ({} ms)",
                attempt.attempt_count,
                now_ms.saturating_sub(attempt.started_at_ms)
            );
            self.state = JoinState::Idle(attempt.attempt_count);
            return RetryDecision::GiveUp {
                attempts: attempt.attempt_count,
            };
        }

        self.state = JoinState::Joining(attempt);
        RetryDecision::Retry {
            attempt: attempt.attempt_count,
        }
    }

    /// The node is on the network (joiner success or attached role).
    pub fn on_joined(&mut self) {
        if self.state != JoinState::Joined {
            info!("Join: joined");
        }
        self.state = JoinState::Joined;
    }

    /// Network membership was wiped; joining is possible again.
    pub fn reset(&mut self) {
        self.state = JoinState::Idle(0);
    }
}

//! Attempt budget for sequential tiers
//!
//! A tier walks its endpoint list one request at a time. Before the stop
//! signal every endpoint may be tried. Once the signal fires the tier gets
//! a small, fixed number of further attempts and then must give up.

/// Kind of attempt granted by the budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    /// Issued before the stop signal; races the cancellation token
    Normal,
    /// Issued after the stop signal; bounded by the grace timeout only
    Grace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Open,
    Draining { used: usize },
    Exhausted,
}

/// Two-counter state machine: attempts before and after the stop signal
#[derive(Debug, Clone)]
pub struct AttemptBudget {
    grace: usize,
    phase: Phase,
    attempts: usize,
}

impl AttemptBudget {
    pub fn new(grace: usize) -> Self {
        Self {
            grace,
            phase: Phase::Open,
            attempts: 0,
        }
    }

    /// Ask for the next attempt
    ///
    /// `stopped` is the current state of the stop signal. Returns `None`
    /// once the grace allowance is spent; the budget never reopens.
    pub fn next(&mut self, stopped: bool) -> Option<Attempt> {
        if stopped && self.phase == Phase::Open {
            self.phase = Phase::Draining { used: 0 };
        }

        let attempt = match self.phase {
            Phase::Open => Attempt::Normal,
            Phase::Draining { used } if used < self.grace => {
                self.phase = Phase::Draining { used: used + 1 };
                Attempt::Grace
            }
            Phase::Draining { .. } | Phase::Exhausted => {
                self.phase = Phase::Exhausted;
                return None;
            }
        };

        self.attempts += 1;
        Some(attempt)
    }

    /// Attempts granted so far
    pub fn attempts(&self) -> usize {
        self.attempts
    }

    /// Attempts granted after the stop signal
    pub fn grace_used(&self) -> usize {
        match self.phase {
            Phase::Open => 0,
            Phase::Draining { used } => used,
            Phase::Exhausted => self.grace,
        }
    }
}

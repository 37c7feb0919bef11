//! Cooperative suspend/resume shared by every delivery path.
//!
//! Delivery paths call [`PauseGate::await_if_paused`] right before handing an item
//! to the sink. While the gate is paused they park on a `watch` channel; `resume`
//! publishes a new state and every parked caller wakes and re-reads it.

use tokio::sync::watch;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Running,
    Paused,
    /// Terminal. Set on shutdown; wakes all waiters without letting them deliver.
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    Proceed,
    Interrupted,
}

#[derive(Debug)]
pub struct PauseGate {
    state: watch::Sender<GateState>,
}

impl Default for PauseGate {
    fn default() -> Self {
        Self::new()
    }
}

impl PauseGate {
    pub fn new() -> Self {
        let (state, _) = watch::channel(GateState::Running);
        Self { state }
    }

    pub fn state(&self) -> GateState {
        *self.state.borrow()
    }

    pub fn is_paused(&self) -> bool {
        self.state() == GateState::Paused
    }

    pub fn is_closed(&self) -> bool {
        self.state() == GateState::Closed
    }

    pub fn pause(&self) {
        let changed = self.state.send_if_modified(|state| match state {
            GateState::Running => {
                *state = GateState::Paused;
                true
            }
            _ => false,
        });
        if changed {
            info!("ingestion paused");
        }
    }

    pub fn resume(&self) {
        let changed = self.state.send_if_modified(|state| match state {
            GateState::Paused => {
                *state = GateState::Running;
                true
            }
            _ => false,
        });
        if changed {
            info!("ingestion resumed");
        }
    }

    pub fn close(&self) {
        let changed = self.state.send_if_modified(|state| match state {
            GateState::Closed => false,
            _ => {
                *state = GateState::Closed;
                true
            }
        });
        if changed {
            info!("pause gate closed");
        }
    }

    /// Returns at once unless paused; otherwise parks until resumed or closed.
    pub async fn await_if_paused(&self) -> GateOutcome {
        match self.state() {
            GateState::Running => return GateOutcome::Proceed,
            GateState::Closed => return GateOutcome::Interrupted,
            GateState::Paused => {}
        }

        let mut rx = self.state.subscribe();
        loop {
            let state = *rx.borrow_and_update();
            match state {
                GateState::Running => return GateOutcome::Proceed,
                GateState::Closed => return GateOutcome::Interrupted,
                GateState::Paused => {}
            }
            if rx.changed().await.is_err() {
                return GateOutcome::Interrupted;
            }
        }
    }

    /// Resolves once the gate is closed. Used to cut other waits short on shutdown.
    pub async fn closed(&self) {
        let mut rx = self.state.subscribe();
        let _ = rx.wait_for(|state| *state == GateState::Closed).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn running_gate_lets_callers_through() {
        let gate = PauseGate::new();
        assert_eq!(gate.await_if_paused().await, GateOutcome::Proceed);
    }

    #[test]
    fn pause_and_resume_are_idempotent() {
        let gate = PauseGate::new();
        gate.pause();
        gate.pause();
        assert_eq!(gate.state(), GateState::Paused);
        gate.resume();
        gate.resume();
        assert_eq!(gate.state(), GateState::Running);
    }

    #[tokio::test]
    async fn paused_gate_blocks_until_resume() {
        let gate = Arc::new(PauseGate::new());
        gate.pause();

        let waiter = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.await_if_paused().await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        gate.resume();
        assert_eq!(waiter.await.unwrap(), GateOutcome::Proceed);
    }

    #[tokio::test]
    async fn resume_wakes_every_waiter() {
        let gate = Arc::new(PauseGate::new());
        gate.pause();

        let waiters: Vec<_> = (0..4)
            .map(|_| {
                let gate = gate.clone();
                tokio::spawn(async move { gate.await_if_paused().await })
            })
            .collect();
        tokio::time::sleep(Duration::from_millis(20)).await;

        gate.resume();
        for waiter in waiters {
            let outcome = tokio::time::timeout(Duration::from_secs(1), waiter)
                .await
                .unwrap()
                .unwrap();
            assert_eq!(outcome, GateOutcome::Proceed);
        }
    }

    #[tokio::test]
    async fn close_interrupts_waiters_and_is_terminal() {
        let gate = Arc::new(PauseGate::new());
        gate.pause();
        let waiter = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.await_if_paused().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        gate.close();
        assert_eq!(waiter.await.unwrap(), GateOutcome::Interrupted);

        gate.resume();
        gate.pause();
        assert!(gate.is_closed());
        assert_eq!(gate.await_if_paused().await, GateOutcome::Interrupted);
        tokio::time::timeout(Duration::from_secs(1), gate.closed()).await.unwrap();
    }
}

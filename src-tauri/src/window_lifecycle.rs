use thiserror::Error;

use crate::unsaved_state::UnsavedStateDescriptor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum LifecycleState {
    #[default]
    Uninitialized,
    Creating,
    Visible,
    ClosePending,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LifecycleEvent {
    HostReady,
    FirstPaint,
    CloseRequested,
    PromptResolved,
    CloseCompleted,
    Reactivated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LifecycleTransition {
    pub(crate) from: LifecycleState,
    pub(crate) event: LifecycleEvent,
    pub(crate) to: LifecycleState,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum LifecycleError {
    #[error("invalid window lifecycle transition from {from:?} on {event:?}")]
    InvalidTransition {
        from: LifecycleState,
        event: LifecycleEvent,
    },
}

pub(crate) type LifecycleResult<T> = std::result::Result<T, LifecycleError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum CloseDecision {
    /// Let the window close; bounds should be persisted first.
    Proceed,
    /// Veto the close and ask the user.
    Prompt(UnsavedStateDescriptor),
    /// A prompt is already open; drop this request.
    Ignore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PromptChoice {
    First,
    Second,
    Dismissed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PromptOutcome {
    RunSaveCheck,
    CloseAfterDelay,
    StayOpen,
}

/// Lifecycle of the single main window, including unsaved-state close
/// protection. Lockdown is tracked separately in `LockdownState`.
#[derive(Debug, Default)]
pub(crate) struct WindowLifecycle {
    state: LifecycleState,
    unsaved: Option<UnsavedStateDescriptor>,
    prompt_open: bool,
    discard_scheduled: bool,
    history: Vec<LifecycleTransition>,
}

impl WindowLifecycle {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> LifecycleState {
        self.state
    }

    pub(crate) fn unsaved(&self) -> Option<&UnsavedStateDescriptor> {
        self.unsaved.as_ref()
    }

    pub(crate) fn set_unsaved(&mut self, descriptor: Option<UnsavedStateDescriptor>) {
        tracing::debug!(present = descriptor.is_some(), "unsaved state updated");
        self.unsaved = descriptor;
    }

    pub(crate) fn history(&self) -> &[LifecycleTransition] {
        &self.history
    }

    pub(crate) fn host_ready(&mut self) -> LifecycleResult<()> {
        match self.state {
            LifecycleState::Uninitialized => {
                self.advance(LifecycleEvent::HostReady, LifecycleState::Creating)
            }
            from => Err(self.reject(from, LifecycleEvent::HostReady)),
        }
    }

    pub(crate) fn first_paint(&mut self) -> LifecycleResult<()> {
        match self.state {
            LifecycleState::Creating => {
                self.advance(LifecycleEvent::FirstPaint, LifecycleState::Visible)
            }
            // Reloads fire further page loads; they do not change the state.
            LifecycleState::Visible | LifecycleState::ClosePending => Ok(()),
            from => Err(self.reject(from, LifecycleEvent::FirstPaint)),
        }
    }

    pub(crate) fn request_close(&mut self) -> LifecycleResult<CloseDecision> {
        match self.state {
            LifecycleState::Creating | LifecycleState::Visible => {
                self.advance(LifecycleEvent::CloseRequested, LifecycleState::ClosePending)?;
                match self.unsaved.clone() {
                    Some(descriptor) => {
                        self.prompt_open = true;
                        Ok(CloseDecision::Prompt(descriptor))
                    }
                    None => Ok(CloseDecision::Proceed),
                }
            }
            LifecycleState::ClosePending if self.prompt_open => Ok(CloseDecision::Ignore),
            LifecycleState::ClosePending => Ok(CloseDecision::Proceed),
            from => Err(self.reject(from, LifecycleEvent::CloseRequested)),
        }
    }

    pub(crate) fn resolve_prompt(
        &mut self,
        choice: PromptChoice,
    ) -> LifecycleResult<PromptOutcome> {
        if self.state != LifecycleState::ClosePending || !self.prompt_open {
            return Err(self.reject(self.state, LifecycleEvent::PromptResolved));
        }
        self.prompt_open = false;

        match choice {
            PromptChoice::First => {
                self.advance(LifecycleEvent::PromptResolved, LifecycleState::Visible)?;
                Ok(PromptOutcome::RunSaveCheck)
            }
            PromptChoice::Second => {
                self.unsaved = None;
                self.discard_scheduled = true;
                Ok(PromptOutcome::CloseAfterDelay)
            }
            PromptChoice::Dismissed => {
                self.advance(LifecycleEvent::PromptResolved, LifecycleState::Visible)?;
                Ok(PromptOutcome::StayOpen)
            }
        }
    }

    pub(crate) fn close_completed(&mut self) -> LifecycleResult<()> {
        match self.state {
            LifecycleState::ClosePending => {
                self.discard_scheduled = false;
                self.advance(LifecycleEvent::CloseCompleted, LifecycleState::Closed)
            }
            from => Err(self.reject(from, LifecycleEvent::CloseCompleted)),
        }
    }

    /// Returns true when a fresh window has to be created.
    pub(crate) fn reactivate(&mut self) -> LifecycleResult<bool> {
        match self.state {
            LifecycleState::Closed => {
                self.unsaved = None;
                self.advance(LifecycleEvent::Reactivated, LifecycleState::Creating)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    pub(crate) fn discard_scheduled(&self) -> bool {
        self.discard_scheduled
    }

    fn advance(&mut self, event: LifecycleEvent, to: LifecycleState) -> LifecycleResult<()> {
        let from = self.state;
        tracing::debug!(?from, ?event, ?to, "window lifecycle transition");
        self.history.push(LifecycleTransition { from, event, to });
        self.state = to;
        Ok(())
    }

    fn reject(&self, from: LifecycleState, event: LifecycleEvent) -> LifecycleError {
        tracing::warn!(?from, ?event, "invalid window lifecycle transition requested");
        LifecycleError::InvalidTransition { from, event }
    }
}

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;

use crate::lifecycle::{CallGuard, Lifecycle};
use crate::message::{UserMessage, user_message};

/// State of a form submission. The submitted value is handed back to the
/// caller instead of being stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionState {
    pub loading: bool,
    pub error: Option<String>,
    pub success: bool,
}

/// Callbacks for one submission.
pub struct SubmitOptions<T> {
    on_success: Option<Box<dyn FnOnce(&T) + Send>>,
    on_error: Option<Box<dyn FnOnce(&str) + Send>>,
}

impl<T> Default for SubmitOptions<T> {
    fn default() -> Self {
        Self {
            on_success: None,
            on_error: None,
        }
    }
}

impl<T> SubmitOptions<T> {
    pub fn on_success(
        mut self,
        callback: impl FnOnce(&T) + Send + 'static,
    ) -> Self {
        self.on_success = Some(Box::new(callback));
        self
    }

    pub fn on_error(
        mut self,
        callback: impl FnOnce(&str) + Send + 'static,
    ) -> Self {
        self.on_error = Some(Box::new(callback));
        self
    }
}

#[derive(Clone)]
pub struct UseSubmit {
    lifecycle: Arc<Lifecycle<SubmissionState>>,
}

impl UseSubmit {
    pub fn state(&self) -> SubmissionState {
        self.lifecycle.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<SubmissionState> {
        self.lifecycle.subscribe()
    }

    /// Submit `call`. The caller gets the call's own result back, so a
    /// failure is both recorded in state and returned as the original
    /// error. Dropping the returned future before it resolves only clears
    /// `loading`.
    pub fn submit<T, E, Fut>(
        &self,
        call: Fut,
        options: SubmitOptions<T>,
    ) -> impl Future<Output = Result<T, E>> + use<T, E, Fut>
    where
        E: UserMessage,
        Fut: Future<Output = Result<T, E>>,
    {
        let lifecycle = self.lifecycle.clone();
        let ticket = lifecycle.begin(|state| {
            state.loading = true;
            state.error = None;
            state.success = false;
        });
        let guard = CallGuard::new({
            let lifecycle = lifecycle.clone();
            move || {
                lifecycle.settle(ticket, |state| state.loading = false);
            }
        });
        async move {
            let result = call.await;
            guard.disarm();
            match &result {
                Ok(value) => {
                    let applied = lifecycle.settle(ticket, |state| {
                        *state = SubmissionState {
                            loading: false,
                            error: None,
                            success: true,
                        }
                    });
                    if let (true, Some(on_success)) =
                        (applied, options.on_success)
                    {
                        on_success(value);
                    }
                }
                Err(e) => {
                    let message = user_message(e);
                    tracing::debug!("submission failed: {message}");
                    let applied = lifecycle.settle(ticket, |state| {
                        *state = SubmissionState {
                            loading: false,
                            error: Some(message.clone()),
                            success: false,
                        }
                    });
                    if let (true, Some(on_error)) =
                        (applied, options.on_error)
                    {
                        on_error(message.as_str());
                    }
                }
            }
            result
        }
    }

    /// Return to `{loading: false, error: None, success: false}`,
    /// discarding any submission in flight.
    pub fn reset(&self) {
        self.lifecycle
            .invalidate(|state| *state = SubmissionState::default());
    }

    pub fn teardown(&self) {
        self.lifecycle.teardown();
    }
}

pub fn use_submit() -> UseSubmit {
    UseSubmit {
        lifecycle: Arc::new(Lifecycle::new(SubmissionState::default())),
    }
}

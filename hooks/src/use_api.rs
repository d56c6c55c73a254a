use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::sync::watch;

use crate::lifecycle::{CallGuard, Lifecycle, Ticket};
use crate::message::{UserMessage, user_message};

/// State of a single read operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestState<T> {
    pub data: Option<T>,
    pub loading: bool,
    pub error: Option<String>,
}

impl<T> Default for RequestState<T> {
    fn default() -> Self {
        Self {
            data: None,
            loading: false,
            error: None,
        }
    }
}

impl<T> RequestState<T> {
    /// Returns true if this is the initial load (data not yet fetched,
    /// currently loading, and no error).
    pub fn is_initial_loading(&self) -> bool {
        self.loading && self.data.is_none() && self.error.is_none()
    }
}

pub(crate) type SuccessCallback<T> = Arc<dyn Fn(&T) + Send + Sync>;
pub(crate) type ErrorCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Options bound once when a hook is created.
pub struct ApiOptions<T> {
    /// Run the call from [`UseApi::effect_with`].
    pub immediate: bool,
    pub on_success: Option<SuccessCallback<T>>,
    pub on_error: Option<ErrorCallback>,
}

impl<T> Default for ApiOptions<T> {
    fn default() -> Self {
        Self {
            immediate: false,
            on_success: None,
            on_error: None,
        }
    }
}

impl<T> Clone for ApiOptions<T> {
    fn clone(&self) -> Self {
        Self {
            immediate: self.immediate,
            on_success: self.on_success.clone(),
            on_error: self.on_error.clone(),
        }
    }
}

impl<T> ApiOptions<T> {
    pub fn immediate() -> Self {
        Self {
            immediate: true,
            ..Self::default()
        }
    }

    pub fn on_success(
        mut self,
        callback: impl Fn(&T) + Send + Sync + 'static,
    ) -> Self {
        self.on_success = Some(Arc::new(callback));
        self
    }

    pub fn on_error(
        mut self,
        callback: impl Fn(&str) + Send + Sync + 'static,
    ) -> Self {
        self.on_error = Some(Arc::new(callback));
        self
    }

    /// Fire the callback matching `result`.
    pub(crate) fn notify(&self, result: Result<&T, &str>) {
        match result {
            Ok(value) => {
                if let Some(on_success) = &self.on_success {
                    on_success(value);
                }
            }
            Err(message) => {
                if let Some(on_error) = &self.on_error {
                    on_error(message);
                }
            }
        }
    }
}

/// A call whose errors have already been normalized for display.
pub(crate) type Call<T> =
    Arc<dyn Fn() -> BoxFuture<'static, Result<T, String>> + Send + Sync>;

pub(crate) fn normalized<T, E, F, Fut>(call: F) -> Call<T>
where
    T: Send + 'static,
    E: UserMessage + Send + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
{
    Arc::new(move || {
        let pending = call();
        async move { pending.await.map_err(|e| user_message(&e)) }.boxed()
    })
}

struct Inner<T> {
    call: Call<T>,
    options: ApiOptions<T>,
    lifecycle: Lifecycle<RequestState<T>>,
}

impl<T: Clone> Inner<T> {
    /// The call's future was dropped before it resolved.
    fn abandon(&self, ticket: Ticket) {
        self.lifecycle.settle(ticket, |state| state.loading = false);
    }

    fn finish(&self, ticket: Ticket, result: &Result<T, String>) {
        let applied = self.lifecycle.settle(ticket, |state| {
            state.loading = false;
            match result {
                Ok(data) => {
                    state.data = Some(data.clone());
                    state.error = None;
                }
                // Data from an earlier success stays visible.
                Err(message) => state.error = Some(message.clone()),
            }
        });
        if applied {
            self.options
                .notify(result.as_ref().map_err(String::as_str));
        }
    }
}

/// Handle to a single-request hook. Clones share the same state.
pub struct UseApi<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for UseApi<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> UseApi<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn state(&self) -> RequestState<T> {
        self.inner.lifecycle.snapshot()
    }

    /// Receives every state change; this is the re-render signal.
    pub fn subscribe(&self) -> watch::Receiver<RequestState<T>> {
        self.inner.lifecycle.subscribe()
    }

    /// Run the call. The state switches to loading as soon as this is
    /// called; the returned future settles it. Dropping the future before
    /// it resolves clears `loading` and leaves data and error as they were.
    ///
    /// Issuing a new call supersedes any call still in flight: the older
    /// call still resolves for its caller but no longer touches state or
    /// fires callbacks.
    pub fn execute(
        &self,
    ) -> impl Future<Output = Result<T, String>> + Send + use<T> {
        let inner = self.inner.clone();
        let ticket = inner.lifecycle.begin(|state| {
            state.loading = true;
            state.error = None;
        });
        let pending = (inner.call)();
        let guard = CallGuard::new({
            let inner = inner.clone();
            move || inner.abandon(ticket)
        });
        async move {
            let result = pending.await;
            guard.disarm();
            inner.finish(ticket, &result);
            result
        }
    }

    /// Run the call if the hook is `immediate` and `deps` changed since the
    /// last invocation. Call this wherever the page's inputs may have
    /// changed; the first invocation always runs.
    pub fn effect_with<D: Hash + ?Sized>(
        &self,
        deps: &D,
    ) -> Option<BoxFuture<'static, Result<T, String>>> {
        let changed = self.inner.lifecycle.deps_changed(deps);
        (self.inner.options.immediate && changed)
            .then(|| self.execute().boxed())
    }

    /// Return to idle, discarding any call in flight.
    pub fn reset(&self) {
        self.inner
            .lifecycle
            .invalidate(|state| *state = RequestState::default());
    }

    /// Stop all further state updates and callbacks, e.g. when the page
    /// goes away.
    pub fn teardown(&self) {
        self.inner.lifecycle.teardown();
    }
}

/// Create a hook around `call`, which is invoked afresh for every
/// execution.
pub fn use_api<T, E, F, Fut>(call: F, options: ApiOptions<T>) -> UseApi<T>
where
    T: Clone + Send + Sync + 'static,
    E: UserMessage + Send + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
{
    UseApi {
        inner: Arc::new(Inner {
            call: normalized(call),
            options,
            lifecycle: Lifecycle::new(RequestState::default()),
        }),
    }
}

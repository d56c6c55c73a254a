use std::collections::BTreeMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};
use tokio::sync::watch;

use crate::lifecycle::{CallGuard, Lifecycle, Ticket};
use crate::message::UserMessage;
use crate::use_api::{ApiOptions, Call, normalized};

/// Aggregate state of a named group of reads.
///
/// Results share one type, so groups of different payloads use an enum
/// with a variant per payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiRequestState<T> {
    pub data: BTreeMap<String, T>,
    pub loading: bool,
    pub error: Option<String>,
    /// Per-name failures. Only [`UseMultipleApi::execute_settled`] records
    /// more than one.
    pub failures: BTreeMap<String, String>,
}

impl<T> Default for MultiRequestState<T> {
    fn default() -> Self {
        Self {
            data: BTreeMap::new(),
            loading: false,
            error: None,
            failures: BTreeMap::new(),
        }
    }
}

/// The named calls of a multi-request hook.
pub struct Requests<T> {
    calls: Vec<(String, Call<T>)>,
}

impl<T> Default for Requests<T> {
    fn default() -> Self {
        Self { calls: Vec::new() }
    }
}

impl<T: Send + 'static> Requests<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a call under `name`. A later call with the same name replaces
    /// the earlier one.
    pub fn add<E, F, Fut>(mut self, name: impl Into<String>, call: F) -> Self
    where
        E: UserMessage + Send + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let name = name.into();
        self.calls.retain(|(existing, _)| *existing != name);
        self.calls.push((name, normalized(call)));
        self
    }

    /// Start every call at once, tagging each result with its name.
    fn issue(
        &self,
    ) -> FuturesUnordered<BoxFuture<'static, (String, Result<T, String>)>> {
        self.calls
            .iter()
            .map(|(name, call)| {
                let name = name.clone();
                let pending = call();
                async move { (name, pending.await) }.boxed()
            })
            .collect()
    }
}

type Options<T> = ApiOptions<BTreeMap<String, T>>;

struct Inner<T> {
    requests: Requests<T>,
    options: Options<T>,
    lifecycle: Lifecycle<MultiRequestState<T>>,
}

pub struct UseMultipleApi<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for UseMultipleApi<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> Inner<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn start(&self) -> Ticket {
        self.lifecycle.begin(|state| {
            state.loading = true;
            state.error = None;
            state.failures.clear();
        })
    }

    fn abandon(&self, ticket: Ticket) {
        self.lifecycle.settle(ticket, |state| state.loading = false);
    }

    fn finish(
        &self,
        ticket: Ticket,
        data: BTreeMap<String, T>,
        failures: BTreeMap<String, String>,
        error: Option<String>,
    ) {
        let applied = self.lifecycle.settle(ticket, |state| {
            *state = MultiRequestState {
                data: data.clone(),
                loading: false,
                error: error.clone(),
                failures,
            }
        });
        if applied {
            match &error {
                Some(message) => self.options.notify(Err(message.as_str())),
                None => self.options.notify(Ok(&data)),
            }
        }
    }
}

impl<T> UseMultipleApi<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn state(&self) -> MultiRequestState<T> {
        self.inner.lifecycle.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<MultiRequestState<T>> {
        self.inner.lifecycle.subscribe()
    }

    /// Run every call concurrently. All must succeed: the first failure
    /// settles the group with empty data and drops the remaining calls.
    /// Dropping the returned future drops every call and clears `loading`.
    pub fn execute(
        &self,
    ) -> impl Future<Output = Result<BTreeMap<String, T>, String>>
    + Send
    + use<T> {
        let inner = self.inner.clone();
        let ticket = inner.start();
        let mut pending = inner.requests.issue();
        let guard = CallGuard::new({
            let inner = inner.clone();
            move || inner.abandon(ticket)
        });
        async move {
            let mut data = BTreeMap::new();
            let outcome = loop {
                match pending.next().await {
                    Some((name, Ok(value))) => {
                        data.insert(name, value);
                    }
                    Some((name, Err(message))) => break Err((name, message)),
                    None => break Ok(data),
                }
            };
            drop(pending);
            guard.disarm();

            match outcome {
                Ok(data) => {
                    inner.finish(ticket, data.clone(), BTreeMap::new(), None);
                    Ok(data)
                }
                Err((name, message)) => {
                    let failures = BTreeMap::from([(name, message.clone())]);
                    inner.finish(
                        ticket,
                        BTreeMap::new(),
                        failures,
                        Some(message.clone()),
                    );
                    Err(message)
                }
            }
        }
    }

    /// Run every call concurrently and wait for all of them. Successes are
    /// kept in `data` even when others fail; `error` is the first failure
    /// to arrive.
    pub fn execute_settled(
        &self,
    ) -> impl Future<Output = BTreeMap<String, Result<T, String>>>
    + Send
    + use<T> {
        let inner = self.inner.clone();
        let ticket = inner.start();
        let pending = inner.requests.issue();
        let guard = CallGuard::new({
            let inner = inner.clone();
            move || inner.abandon(ticket)
        });
        async move {
            let results: Vec<(String, Result<T, String>)> =
                pending.collect().await;
            guard.disarm();

            let mut data = BTreeMap::new();
            let mut failures = BTreeMap::new();
            let mut first_error = None;
            for (name, result) in &results {
                match result {
                    Ok(value) => {
                        data.insert(name.clone(), value.clone());
                    }
                    Err(message) => {
                        first_error.get_or_insert_with(|| message.clone());
                        failures.insert(name.clone(), message.clone());
                    }
                }
            }
            inner.finish(ticket, data, failures, first_error);
            results.into_iter().collect()
        }
    }

    /// See [`crate::UseApi::effect_with`].
    pub fn effect_with<D: Hash + ?Sized>(
        &self,
        deps: &D,
    ) -> Option<BoxFuture<'static, Result<BTreeMap<String, T>, String>>> {
        let changed = self.inner.lifecycle.deps_changed(deps);
        (self.inner.options.immediate && changed)
            .then(|| self.execute().boxed())
    }

    pub fn reset(&self) {
        self.inner
            .lifecycle
            .invalidate(|state| *state = MultiRequestState::default());
    }

    pub fn teardown(&self) {
        self.inner.lifecycle.teardown();
    }
}

pub fn use_multiple_api<T>(
    requests: Requests<T>,
    options: ApiOptions<BTreeMap<String, T>>,
) -> UseMultipleApi<T>
where
    T: Clone + Send + Sync + 'static,
{
    UseMultipleApi {
        inner: Arc::new(Inner {
            requests,
            options,
            lifecycle: Lifecycle::new(MultiRequestState::default()),
        }),
    }
}

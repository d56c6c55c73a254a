//! Async state hooks for pages of the regulatory portal.
//!
//! A page creates a hook around a call into [`payloads::APIClient`] and
//! renders from the hook's state, re-rendering whenever the state's watch
//! channel changes:
//!
//! ```no_run
//! # async fn page(client: payloads::APIClient) {
//! use hooks::{ApiOptions, use_api};
//!
//! let permits = use_api(
//!     move || {
//!         let client = client.clone();
//!         async move { client.list_permits(None).await }
//!     },
//!     ApiOptions::immediate(),
//! );
//! let mut changes = permits.subscribe();
//! if let Some(fetch) = permits.effect_with(&()) {
//!     tokio::spawn(fetch);
//! }
//! while changes.changed().await.is_ok() {
//!     let state = changes.borrow_and_update().clone();
//!     if !state.loading {
//!         break;
//!     }
//! }
//! # }
//! ```
//!
//! Every hook follows the same rules: the most recently issued call is the
//! only one allowed to settle state or fire callbacks, `reset` returns to
//! idle and discards in-flight calls, and after `teardown` nothing is
//! written at all.

mod lifecycle;
mod message;
mod use_api;
mod use_multiple_api;
mod use_submit;

pub use message::{FALLBACK_MESSAGE, UserMessage, user_message};
pub use use_api::{ApiOptions, RequestState, UseApi, use_api};
pub use use_multiple_api::{
    MultiRequestState, Requests, UseMultipleApi, use_multiple_api,
};
pub use use_submit::{SubmissionState, SubmitOptions, UseSubmit, use_submit};

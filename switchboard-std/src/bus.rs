//! # Event Bus
//!
//! Delivers each event to the listeners bound to it, in priority order, then
//! hands chat messages to the [`CommandRouter`].
//!
//! Within a priority the bus looks at direction `both` before the event's
//! own direction, and event type `all` before the event's verb. A handler
//! runs at most once per event no matter how many bindings match it.
//!
//! Inline listeners are awaited in place and may replace the event for
//! everything after them. A failing or panicking inline listener is logged
//! and the event it was given carries on. Background listeners go to the
//! [`TaskPool`].
//!
//! Chat messages get their account and level resolved before listeners run
//! and again, from the final source, before routing.

use crate::{
    pool::{TaskPool, panic_message},
    registry::Registry,
    router::CommandRouter,
};
use futures::FutureExt;
use std::{collections::HashSet, panic::AssertUnwindSafe, sync::Arc};
use switchboard_core::{Accounts, Event, HandlerId};
use tracing::{debug, error, trace, warn};

/// Dispatches events to listeners and commands.
pub struct EventBus {
    registry: Arc<Registry>,
    accounts: Arc<dyn Accounts>,
    router: CommandRouter,
    pool: TaskPool,
}

impl EventBus {
    /// Create a bus over `registry`, with a task pool sized from the
    /// registry's settings.
    pub fn new(registry: Arc<Registry>, accounts: Arc<dyn Accounts>) -> Self {
        let pool = TaskPool::from_settings(&registry.settings().tasks);
        Self::with_pool(registry, accounts, pool)
    }

    /// Create a bus submitting background work to `pool`.
    pub fn with_pool(registry: Arc<Registry>, accounts: Arc<dyn Accounts>, pool: TaskPool) -> Self {
        Self {
            router: CommandRouter::new(registry.clone(), pool.clone()),
            registry,
            accounts,
            pool,
        }
    }

    /// The registry this bus reads from.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// The pool background work is submitted to.
    pub fn pool(&self) -> &TaskPool {
        &self.pool
    }

    /// The command router.
    pub fn router(&self) -> &CommandRouter {
        &self.router
    }

    /// Dispatch `event` and return it as the last inline listener left it.
    pub async fn dispatch(&self, event: Event) -> Event {
        let mut event = event;
        if event.is_chat_message() {
            self.attach_account(&mut event);
        }
        trace!(
            server = %event.server.name(),
            verb = %event.verb,
            direction = event.direction.as_str(),
            "Dispatching event"
        );

        let index = self.registry.listener_index();
        let mut called: HashSet<HandlerId> = HashSet::new();
        for priority in index.priorities() {
            let matched: Vec<_> = index
                .matching(priority, event.direction, &event.verb)
                .cloned()
                .collect();
            for listener in matched {
                let id = listener.handler.id();
                if !called.insert(id) {
                    continue;
                }
                if listener.inline {
                    let handler = listener.handler.clone();
                    let input = event.clone();
                    let call = AssertUnwindSafe(async move { handler.call(input).await });
                    match call.catch_unwind().await {
                        Ok(Ok(Some(replacement))) => {
                            debug!(listener = %id, verb = %replacement.verb, "Inline listener replaced event");
                            event = replacement;
                        }
                        Ok(Ok(None)) => {}
                        Ok(Err(err)) => {
                            warn!(listener = %id, verb = %event.verb, error = %err, "Inline listener failed");
                        }
                        Err(payload) => {
                            error!(
                                listener = %id,
                                verb = %event.verb,
                                panic = %panic_message(payload.as_ref()),
                                "Inline listener panicked"
                            );
                        }
                    }
                } else {
                    let task = listener.handler.call(event.clone());
                    self.pool.submit(id.to_string(), async move { task.await.map(drop) });
                }
            }
        }

        if event.is_chat_message() {
            // Inline listeners may have replaced the source.
            self.attach_account(&mut event);
            self.router.route(&event);
        }
        event
    }

    fn attach_account(&self, event: &mut Event) {
        let (account, level) = self.accounts.resolve(event.server.as_ref(), &event.source);
        event.source_account = account;
        event.source_user_level = Some(level);
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("registry", &self.registry)
            .field("pool", &self.pool)
            .finish_non_exhaustive()
    }
}

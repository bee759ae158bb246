//! Event tracing module.

use std::sync::Arc;
use switchboard_core::{
    EventSelector, ListenDirection, ListenerHandler, ListenerSpec, Module, Priority, Registrar,
    ResolveError,
};

/// Logs every event, in both directions, before anything else sees it.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogModule;

impl Module for LogModule {
    fn name(&self) -> &str {
        "log"
    }

    fn register(self: Arc<Self>, registrar: &mut Registrar) -> Result<(), ResolveError> {
        let handler = ListenerHandler::observe(|event| async move {
            tracing::debug!(
                server = %event.server.name(),
                verb = %event.verb,
                direction = event.direction.as_str(),
                source = %event.source,
                target = %event.target,
                arguments = ?event.arguments,
                "Event"
            );
        });
        registrar.listener(
            ListenerSpec::on(EventSelector::All, handler)
                .direction(ListenDirection::Both)
                .priority(Priority::HIGHEST),
        );
        Ok(())
    }
}

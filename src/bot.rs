//! Gatekeeper Bot
//!
//! Event loop around the command surface:
//! - On start, makes sure every guild the relay is in has a settings record
//! - On `GuildJoined`, creates that guild's default record
//! - On `Message`, routes through `CommandSurface` and posts the reply to
//!   the channel the message came from
//!
//! A failed message or reply never stops the loop. A settings store
//! failure does: memory and disk could no longer be trusted to agree.

use crate::commands::{CommandSurface, SurfaceConfig};
use crate::platform::{Event, Message, Platform};
use crate::relay::{EngineConfig, PropagationEngine, RelayError};
use crate::settings::ConfigStore;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default delay between event polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Moderation relay bot
pub struct GatekeeperBot<P: Platform> {
    platform: P,
    store: Arc<ConfigStore>,
    surface: CommandSurface<P>,
    poll_interval: Duration,
}

impl<P: Platform> GatekeeperBot<P> {
    pub fn new(
        platform: P,
        store: Arc<ConfigStore>,
        engine_config: EngineConfig,
        surface_config: SurfaceConfig,
    ) -> Self {
        let engine = PropagationEngine::new(platform.clone(), store.clone(), engine_config);
        let surface = CommandSurface::new(platform.clone(), store.clone(), engine, surface_config);
        Self {
            platform,
            store,
            surface,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn surface(&self) -> &CommandSurface<P> {
        &self.surface
    }

    /// Create default records for guilds joined while the relay was offline.
    ///
    /// Returns how many records were created.
    pub async fn start(&self) -> Result<usize, RelayError> {
        let guilds = self.platform.guilds().await?;
        let created = self.store.ensure_defaults(guilds.iter().map(|g| g.id))?;
        info!(
            guilds = guilds.len(),
            created,
            control_channel = %self.surface.config().control_channel,
            "gatekeeper ready"
        );
        Ok(created)
    }

    /// Poll for events forever
    pub async fn run(&self) -> Result<(), RelayError> {
        self.run_until(futures::future::pending()).await
    }

    /// Poll for events until `shutdown` completes or a fatal error occurs
    pub async fn run_until(&self, shutdown: impl Future<Output = ()>) -> Result<(), RelayError> {
        let mut interval = tokio::time::interval(self.poll_interval);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("shutting down");
                    return Ok(());
                }
                _ = interval.tick() => {
                    self.process_pending().await?;
                }
            }
        }
    }

    /// Drain queued events until none are left.
    ///
    /// Returns how many events were handled.
    pub async fn run_until_idle(&self) -> Result<usize, RelayError> {
        let mut handled = 0;
        loop {
            let batch = self.process_pending().await?;
            if batch == 0 {
                return Ok(handled);
            }
            handled += batch;
        }
    }

    async fn process_pending(&self) -> Result<usize, RelayError> {
        let events = match self.platform.receive_events().await {
            Ok(events) => events,
            Err(e) => {
                warn!(error = %e, "error receiving events, will retry");
                return Ok(0);
            }
        };

        let count = events.len();
        for event in events {
            self.handle_event(event).await?;
        }
        Ok(count)
    }

    async fn handle_event(&self, event: Event) -> Result<(), RelayError> {
        match event {
            Event::GuildJoined(guild) => {
                if self.store.ensure_default(guild.id)? {
                    info!(guild = %guild.id, name = %guild.name, "joined guild");
                } else {
                    debug!(guild = %guild.id, "rejoined guild with existing settings");
                }
                Ok(())
            }
            Event::Message(message) => self.handle_message(&message).await,
        }
    }

    async fn handle_message(&self, message: &Message) -> Result<(), RelayError> {
        let reply = match self.surface.handle_message(message).await {
            Ok(reply) => reply,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(author = %message.author.id, error = %e, "error handling message");
                Some(e.user_message())
            }
        };

        if let Some(reply) = reply {
            if let Err(e) = self.platform.send_message(message.channel, &reply).await {
                warn!(channel = %message.channel, error = %e, "could not send reply");
            }
        }
        Ok(())
    }
}

//! Hub - Startup state machine and notification loop
//!
//! The hub owns the registry, the connection and every enrolled consumer.
//! It is driven from the host's loop: [`Hub::start`] kicks off the
//! handshake, [`Hub::poll`] drains inbound events, and the host forwards
//! game state changes and object events through the hub.
//!
//! ```text
//! Idle ─▶ Connecting ─▶ Authenticating ─▶ Syncing ─▶ Ready
//!            │               │               │
//!            └───────────────┴───────────────┴─────▶ Offline
//! ```

use crate::consumer::{downcast_mut, downcast_ref};
use crate::{
    ConsumerId, Error, GameLifecycleProvider, Registry, Result, SyncConfig, SyncConsumer,
    SyncContext,
};
use econsync_core::{Coordinate, GameState, Manifest, ObjectState, Value};
use econsync_netcode::wire::{
    self, AuthorizeRequest, GameEventMessage, InitRequest, SEND_API_AUTHORIZE, SEND_GAME_EVENT,
    SEND_GAME_INIT,
};
use econsync_netcode::{Connection, DiagramElement, Inbound, RawEvent};
use indexmap::IndexMap;
use serde_json::Value as Json;
use std::collections::HashSet;
use std::time::Instant;

/// Where the hub is in its startup sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncState {
    Idle,
    Connecting,
    Authenticating,
    Syncing,
    Ready,
    Offline,
}

impl SyncState {
    /// `Ready` and `Offline` end the startup sequence
    pub fn is_terminal(self) -> bool {
        matches!(self, SyncState::Ready | SyncState::Offline)
    }

    /// Startup has begun but not finished
    pub fn is_starting(self) -> bool {
        matches!(
            self,
            SyncState::Connecting | SyncState::Authenticating | SyncState::Syncing
        )
    }
}

/// Central coordinator between the backend, the source table and consumers
///
/// # Example
///
/// ```
/// use econsync_core::{Manifest, PropertySpec, Value};
/// use econsync_hub::{FixedLifecycle, Hub, SyncConfig, SyncState, SyncedObject};
///
/// let mut hub = Hub::new(SyncConfig::default(), FixedLifecycle::default());
/// let shop = Manifest::new("shop")
///     .with_property(PropertySpec::new("gold").with_remote_id(7).with_default(Value::new(50)));
/// let id = hub.enroll(SyncedObject::new(shop)).unwrap();
///
/// // No transport: straight to offline, defaults apply
/// assert_eq!(hub.start(None).unwrap(), SyncState::Offline);
/// let shop = hub.object_mut::<SyncedObject>(id).unwrap();
/// assert_eq!(shop.current_value("gold").unwrap(), 50);
/// ```
pub struct Hub {
    config: SyncConfig,
    registry: Registry,
    state: SyncState,
    connection: Option<Box<dyn Connection>>,
    lifecycle: Box<dyn GameLifecycleProvider>,
    /// Admitted consumers, in enrollment order
    consumers: IndexMap<ConsumerId, Box<dyn SyncConsumer>>,
    /// Consumers enrolled from inside a callback, not yet admitted
    enrolled: Vec<(ConsumerId, Box<dyn SyncConsumer>)>,
    /// Consumers that already received `on_ready`
    notified: HashSet<ConsumerId>,
    next_id: u64,
    /// Auth and init requests awaiting a response
    pending_responses: usize,
    game_state: GameState,
    started_at: Option<Instant>,
}

impl Hub {
    pub fn new(config: SyncConfig, lifecycle: impl GameLifecycleProvider + 'static) -> Self {
        Self {
            registry: Registry::new(&config),
            config,
            state: SyncState::Idle,
            connection: None,
            lifecycle: Box::new(lifecycle),
            consumers: IndexMap::new(),
            enrolled: Vec::new(),
            notified: HashSet::new(),
            next_id: 0,
            pending_responses: 0,
            game_state: GameState::default(),
            started_at: None,
        }
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn game_state(&self) -> &GameState {
        &self.game_state
    }

    pub fn pending_responses(&self) -> usize {
        self.pending_responses
    }

    pub fn is_offline(&self) -> bool {
        self.state == SyncState::Offline
    }

    pub fn consumer_count(&self) -> usize {
        self.consumers.len()
    }

    pub fn consumer(&self, id: ConsumerId) -> Option<&dyn SyncConsumer> {
        self.consumers.get(&id).map(|c| c.as_ref())
    }

    /// An enrolled consumer as its concrete type
    pub fn object<T: SyncConsumer>(&self, id: ConsumerId) -> Option<&T> {
        self.consumers.get(&id).and_then(|c| downcast_ref(c.as_ref()))
    }

    pub fn object_mut<T: SyncConsumer>(&mut self, id: ConsumerId) -> Option<&mut T> {
        self.consumers
            .get_mut(&id)
            .and_then(|c| downcast_mut(c.as_mut()))
    }

    /// Add a manifest's targets to the source table
    pub fn declare(&mut self, manifest: &Manifest) -> Result<usize> {
        let added = self.registry.declare(manifest)?;
        if added > 0 && self.state != SyncState::Idle {
            tracing::warn!(
                object = manifest.object_name().unwrap_or("N/A"),
                added,
                state = ?self.state,
                "coordinates declared after startup began are not requested from the backend"
            );
        }
        Ok(added)
    }

    /// Enroll a consumer, declaring its manifest
    ///
    /// When startup already finished, the consumer is notified right away.
    pub fn enroll(&mut self, consumer: impl SyncConsumer) -> Result<ConsumerId> {
        let id = ConsumerId(self.next_id);
        self.next_id += 1;
        self.admit(id, Box::new(consumer))?;
        if self.state.is_terminal() {
            self.broadcast_ready()?;
        }
        Ok(id)
    }

    fn admit(&mut self, id: ConsumerId, consumer: Box<dyn SyncConsumer>) -> Result<()> {
        if let Some(manifest) = consumer.manifest() {
            let manifest = manifest.clone();
            self.declare(&manifest)?;
        }
        tracing::debug!(%id, object = consumer.object_name().unwrap_or("N/A"), "enrolled");
        self.consumers.insert(id, consumer);
        Ok(())
    }

    /// Begin the startup sequence
    ///
    /// Without a connection (or with one that is not open) the hub goes
    /// offline immediately and notifies consumers before returning.
    pub fn start(&mut self, connection: Option<Box<dyn Connection>>) -> Result<SyncState> {
        if self.state != SyncState::Idle {
            return Err(Error::InvalidState {
                operation: "start",
                state: self.state,
            });
        }
        self.lifecycle.on_sync_start();
        self.game_state = self.lifecycle.get_game_state();
        self.transition(SyncState::Connecting);
        self.started_at = Some(Instant::now());

        match connection {
            Some(connection) if connection.is_connected() => {
                self.connection = Some(connection);
                self.authorize()?;
            }
            Some(_) => self.go_offline("transport is not open")?,
            None => self.go_offline("no transport available")?,
        }
        Ok(self.state)
    }

    /// Drain inbound events and check the startup timeout
    pub fn poll(&mut self) -> Result<SyncState> {
        while let Some(event) = self.connection.as_mut().and_then(|c| c.recv()) {
            self.deliver(event)?;
        }
        if let (Some(timeout), Some(started_at)) = (self.config.startup_timeout(), self.started_at) {
            if self.state.is_starting() && started_at.elapsed() >= timeout {
                self.go_offline("startup timed out")?;
            }
        }
        Ok(self.state)
    }

    /// Handle one inbound event
    pub fn deliver(&mut self, event: RawEvent) -> Result<()> {
        match Inbound::decode(&event)? {
            Inbound::OpenStart | Inbound::Open => {
                tracing::debug!(event = %event.name, "transport signal");
            }
            Inbound::AuthSuccess => {
                self.pending_responses = self.pending_responses.saturating_sub(1);
                if self.state == SyncState::Authenticating {
                    tracing::info!("authorized");
                    self.request_init()?;
                }
            }
            Inbound::AuthDeny(reason) => {
                if self.state.is_starting() {
                    self.go_offline(&format!("authorization denied: {reason}"))?;
                }
            }
            Inbound::Init(elements) => self.on_init(&elements)?,
            Inbound::ElementsUpdated(elements) => self.on_elements_updated(&elements)?,
            Inbound::Error(reason) => {
                if self.state.is_starting() {
                    self.go_offline(&format!("transport error: {reason}"))?;
                } else {
                    tracing::warn!(%reason, state = ?self.state, "transport error");
                }
            }
            Inbound::Close => {
                if self.state.is_starting() {
                    self.go_offline("transport closed")?;
                } else {
                    tracing::info!(state = ?self.state, "transport closed");
                }
            }
            Inbound::Other(name) => tracing::debug!(event = %name, "ignoring event"),
        }
        Ok(())
    }

    fn authorize(&mut self) -> Result<()> {
        self.transition(SyncState::Authenticating);
        let payload = wire::to_payload(&AuthorizeRequest {
            game_name: self.config.game_name.clone(),
            diagram_token: self.config.diagram_token.clone(),
        })?;
        self.pending_responses += 1;
        self.send(SEND_API_AUTHORIZE, payload)?;
        Ok(())
    }

    fn request_init(&mut self) -> Result<()> {
        self.transition(SyncState::Syncing);
        let request = InitRequest::new(self.config.diagram_token.clone(), self.registry.remote_ids());
        tracing::info!(elements = request.element_ids.len(), "requesting initial values");
        let payload = wire::to_payload(&request)?;
        self.pending_responses += 1;
        self.send(SEND_GAME_INIT, payload)?;
        Ok(())
    }

    fn on_init(&mut self, elements: &[DiagramElement]) -> Result<()> {
        if self.state != SyncState::Syncing {
            tracing::warn!(state = ?self.state, "ignoring init response");
            return Ok(());
        }
        self.registry.apply_elements(elements, false)?;
        self.pending_responses = self.pending_responses.saturating_sub(1);
        if self.pending_responses == 0 {
            self.transition(SyncState::Ready);
            self.finish_startup()?;
        }
        Ok(())
    }

    fn on_elements_updated(&mut self, elements: &[DiagramElement]) -> Result<()> {
        let changed = self.registry.apply_elements(elements, true)?;
        if !self.state.is_terminal() {
            return Ok(());
        }
        for (coordinate, value) in &changed {
            self.notify_update(coordinate, value)?;
        }
        // Admit anything enrolled by update callbacks
        self.broadcast_ready()
    }

    fn notify_update(&mut self, coordinate: &Coordinate, value: &Value) -> Result<()> {
        let Self {
            consumers,
            notified,
            registry,
            game_state,
            enrolled,
            next_id,
            ..
        } = self;
        let mut touched = 0;
        for (id, consumer) in consumers.iter_mut() {
            if !notified.contains(id) || !consumer.binds(coordinate) {
                continue;
            }
            let mut ctx = SyncContext::new(registry, game_state, enrolled, next_id);
            consumer.on_update(coordinate, value, &mut ctx)?;
            touched += 1;
        }
        tracing::debug!(coordinate = %coordinate, touched, "live update");
        Ok(())
    }

    /// Move to `Offline`, load the cache and notify consumers
    fn go_offline(&mut self, reason: &str) -> Result<()> {
        if self.state.is_terminal() {
            return Ok(());
        }
        tracing::warn!(%reason, state = ?self.state, "going offline");
        self.pending_responses = self.pending_responses.saturating_sub(1);
        if let Some(mut connection) = self.connection.take() {
            if let Err(e) = connection.close() {
                tracing::debug!(error = %e, "closing connection failed");
            }
        }
        self.registry.set_offline(true);
        if self.config.caching_enabled() {
            if let Err(e) = self.registry.load_cache() {
                tracing::warn!(error = %e, "cache unavailable, continuing with defaults");
            }
        }
        self.transition(SyncState::Offline);
        self.finish_startup()
    }

    fn finish_startup(&mut self) -> Result<()> {
        self.broadcast_ready()?;
        self.lifecycle.on_sync_complete();
        Ok(())
    }

    /// Notify every consumer not yet notified, until no new ones appear
    fn broadcast_ready(&mut self) -> Result<()> {
        let mut passes = 0;
        loop {
            for (id, consumer) in std::mem::take(&mut self.enrolled) {
                self.admit(id, consumer)?;
            }
            let pending: Vec<ConsumerId> = self
                .consumers
                .keys()
                .filter(|id| !self.notified.contains(id))
                .copied()
                .collect();
            if pending.is_empty() {
                break;
            }
            passes += 1;
            tracing::debug!(pass = passes, consumers = pending.len(), "notifying ready");
            for id in pending {
                self.notified.insert(id);
                self.notify_ready(id)?;
            }
        }
        Ok(())
    }

    fn notify_ready(&mut self, id: ConsumerId) -> Result<()> {
        let Self {
            consumers,
            registry,
            game_state,
            enrolled,
            next_id,
            ..
        } = self;
        let Some(consumer) = consumers.get_mut(&id) else {
            return Ok(());
        };
        let mut ctx = SyncContext::new(registry, game_state, enrolled, next_id);
        consumer.on_ready(&mut ctx)
    }

    /// Change the game state; forwarded to every notified consumer
    pub fn set_game_state(&mut self, state: GameState) -> Result<()> {
        if self.game_state == state {
            return Ok(());
        }
        tracing::debug!(state = %state, "game state changed");
        self.game_state = state;
        for (id, consumer) in self.consumers.iter_mut() {
            if self.notified.contains(id) {
                consumer.on_game_state_changed(&self.game_state)?;
            }
        }
        Ok(())
    }

    /// Change one consumer's object state
    pub fn set_object_state(&mut self, id: ConsumerId, state: ObjectState) -> Result<()> {
        let consumer = self
            .consumers
            .get_mut(&id)
            .ok_or(Error::UnknownConsumer(id))?;
        consumer.on_object_state_changed(&state)
    }

    /// Send a game event on behalf of a consumer
    ///
    /// Only events listed in the consumer's manifest are sent, and nothing
    /// is sent while offline. Returns whether the event went out.
    pub fn object_event(&mut self, id: ConsumerId, event: &str) -> Result<bool> {
        let consumer = self.consumers.get(&id).ok_or(Error::UnknownConsumer(id))?;
        if !consumer.manifest().is_some_and(|m| m.emits(event)) {
            tracing::debug!(%id, event, "event not declared for emission");
            return Ok(false);
        }
        if self.connection.is_none() {
            tracing::debug!(%id, event, "no connection, dropping event");
            return Ok(false);
        }
        let payload = wire::to_payload(&GameEventMessage {
            game_obj_name: consumer.object_name().unwrap_or_default().to_string(),
            game_event: event.to_string(),
        })?;
        self.send(SEND_GAME_EVENT, payload)
    }

    /// Emit on the connection; returns whether the event went out
    fn send(&mut self, event: &str, payload: Json) -> Result<bool> {
        let Some(connection) = self.connection.as_mut() else {
            return Ok(false);
        };
        match connection.emit(event, payload) {
            Ok(()) => Ok(true),
            Err(e) if self.state.is_starting() => {
                self.go_offline(&format!("failed to send {event}: {e}"))?;
                Ok(false)
            }
            Err(e) => {
                tracing::warn!(error = %e, event, "send failed");
                Ok(false)
            }
        }
    }

    fn transition(&mut self, next: SyncState) {
        tracing::info!(from = ?self.state, to = ?next, "sync state");
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FixedLifecycle, SyncedObject};
    use econsync_cache::{CacheSnapshot, CacheStore};
    use econsync_core::{Error as CoreError, PropertySpec, StateAssociation, UNBOUNDED};
    use econsync_netcode::wire::{
        elements_payload, PROP_CAPACITY, PROP_LABEL, PROP_RESOURCES, RECEIVE_AUTH_DENY, RECEIVE_AUTH_SUCCESS,
        RECEIVE_CLOSE, RECEIVE_DIAGRAM_ELEMENTS_UPDATED, RECEIVE_ERROR, RECEIVE_GAME_INIT,
    };
    use econsync_netcode::{memory_pair, MemoryRemote};
    use serde_json::json;
    use std::cell::Cell;
    use std::rc::Rc;
    use tempfile::tempdir;

    fn shop() -> Manifest {
        Manifest::new("shop")
            .with_property(PropertySpec::new("gold").with_remote_id(7))
            .with_event("Purchase")
    }

    fn hero() -> Manifest {
        Manifest::new("hero").with_property(
            PropertySpec::new("health")
                .with_state_id("Explore", 10)
                .with_state_id("Fight", 11),
        )
        .with_common_states(vec![
            StateAssociation::new("Explore").with_game_states(["Exploring"]),
            StateAssociation::new("Fight").with_game_states(["Fighting"]),
        ])
    }

    fn element(id: i64, resources: &str) -> DiagramElement {
        DiagramElement::new(id).with_prop(PROP_RESOURCES, resources)
    }

    /// Start against a memory backend and answer the auth request
    fn connect(hub: &mut Hub) -> MemoryRemote {
        let (connection, remote) = memory_pair();
        assert_eq!(
            hub.start(Some(Box::new(connection))).unwrap(),
            SyncState::Authenticating
        );
        remote.push(RECEIVE_AUTH_SUCCESS, Json::Null);
        assert_eq!(hub.poll().unwrap(), SyncState::Syncing);
        remote
    }

    fn answer_init(hub: &mut Hub, remote: &MemoryRemote, elements: &[DiagramElement]) -> Result<SyncState> {
        remote.push(RECEIVE_GAME_INIT, elements_payload(elements));
        hub.poll()
    }

    /// Consumer counting its callbacks
    struct Probe {
        name: Option<String>,
        property: String,
        ready: Rc<Cell<usize>>,
        updates: Rc<Cell<usize>>,
        spawn: Option<Rc<Cell<usize>>>,
    }

    impl Probe {
        fn new(name: &str, property: &str) -> Self {
            Self {
                name: Some(name.to_string()),
                property: property.to_string(),
                ready: Rc::default(),
                updates: Rc::default(),
                spawn: None,
            }
        }
    }

    impl SyncConsumer for Probe {
        fn object_name(&self) -> Option<&str> {
            self.name.as_deref()
        }

        fn on_ready(&mut self, ctx: &mut SyncContext<'_>) -> Result<()> {
            self.ready.set(self.ready.get() + 1);
            if let Some(child_ready) = self.spawn.take() {
                let mut child = Probe::new("child", "none");
                child.ready = child_ready;
                ctx.enroll(child);
            }
            Ok(())
        }

        fn on_update(&mut self, _: &Coordinate, _: &Value, _: &mut SyncContext<'_>) -> Result<()> {
            self.updates.set(self.updates.get() + 1);
            Ok(())
        }

        fn binds(&self, coordinate: &Coordinate) -> bool {
            coordinate.object_name() == self.name.as_deref()
                && coordinate.property_name() == self.property
        }
    }

    /// Lifecycle counting start/complete calls
    #[derive(Clone, Default)]
    struct Recording {
        starts: Rc<Cell<usize>>,
        completes: Rc<Cell<usize>>,
    }

    impl GameLifecycleProvider for Recording {
        fn get_game_state(&self) -> GameState {
            GameState::new("Exploring")
        }

        fn on_sync_start(&mut self) {
            self.starts.set(self.starts.get() + 1);
        }

        fn on_sync_complete(&mut self) {
            self.completes.set(self.completes.get() + 1);
        }
    }

    fn hub() -> Hub {
        Hub::new(SyncConfig::default(), FixedLifecycle::default())
    }

    #[test]
    fn test_offline_without_transport_reads_cache() {
        let dir = tempdir().unwrap();
        let config = SyncConfig {
            cache_root: dir.path().to_path_buf(),
            cache_directory_name: "dungeon".into(),
            ..Default::default()
        };
        let mut snapshot = CacheSnapshot::new();
        snapshot.record(&Coordinate::new(Some("shop".into()), "gold", None, 7), &Value::new(80));
        CacheStore::new(dir.path(), "dungeon").save(&snapshot).unwrap();

        let mut hub = Hub::new(config, FixedLifecycle::default());
        let id = hub.enroll(SyncedObject::new(shop())).unwrap();
        assert_eq!(hub.start(None).unwrap(), SyncState::Offline);

        let value = econsync_core::ValueSource::find_source_value(hub.registry(), Some("shop"), "gold", None)
            .unwrap()
            .unwrap();
        assert_eq!(value.base(), 80);
        let shop = hub.object_mut::<SyncedObject>(id).unwrap();
        assert_eq!(shop.current_value("gold").unwrap(), 80);
    }

    #[test]
    fn test_ready_with_every_element() {
        let mut hub = hub();
        hub.enroll(SyncedObject::new(shop())).unwrap();
        hub.enroll(SyncedObject::game_aware(hero())).unwrap();
        let remote = connect(&mut hub);

        let sent = remote.take_sent();
        assert_eq!(sent[0].name, SEND_API_AUTHORIZE);
        assert_eq!(sent[1].name, SEND_GAME_INIT);
        assert_eq!(sent[1].data["machinationsIDs"].as_array().unwrap().len(), 3);
        assert_eq!(hub.pending_responses(), 1);

        let state = answer_init(
            &mut hub,
            &remote,
            &[element(7, "100"), element(10, "30"), element(11, "60")],
        )
        .unwrap();
        assert_eq!(state, SyncState::Ready);
        assert_eq!(hub.pending_responses(), 0);
        assert_eq!(hub.registry().len(), 3);
        assert_eq!(hub.registry().resolved_count(), 3);
    }

    #[test]
    fn test_gold_end_to_end() {
        let mut hub = hub();
        let id = hub.enroll(SyncedObject::new(shop())).unwrap();
        let remote = connect(&mut hub);
        let init = element(7, "100").with_prop(PROP_CAPACITY, "-1");
        answer_init(&mut hub, &remote, &[init]).unwrap();

        {
            let shop = hub.object_mut::<SyncedObject>(id).unwrap();
            let value = shop.binder("gold").unwrap().value().unwrap();
            assert_eq!((value.base(), value.peek(), value.max()), (100, 100, UNBOUNDED));
            assert_eq!(shop.current_value("gold").unwrap(), 100);
        }

        remote.push(RECEIVE_DIAGRAM_ELEMENTS_UPDATED, elements_payload(&[element(7, "150")]));
        hub.poll().unwrap();
        let shop = hub.object_mut::<SyncedObject>(id).unwrap();
        assert_eq!(shop.base_value("gold").unwrap(), 150);
        assert_eq!(shop.current_value("gold").unwrap(), 150);
    }

    #[test]
    fn test_live_update_reaches_only_matching_consumers() {
        let mut hub = hub();
        hub.declare(&shop()).unwrap();
        hub.declare(&hero()).unwrap();
        let gold = Probe::new("shop", "gold");
        let health = Probe::new("hero", "health");
        let (gold_updates, health_updates) = (gold.updates.clone(), health.updates.clone());
        hub.enroll(gold).unwrap();
        hub.enroll(health).unwrap();

        let remote = connect(&mut hub);
        answer_init(&mut hub, &remote, &[element(7, "1"), element(10, "2"), element(11, "3")]).unwrap();

        remote.push(RECEIVE_DIAGRAM_ELEMENTS_UPDATED, elements_payload(&[element(7, "5")]));
        hub.poll().unwrap();
        assert_eq!(gold_updates.get(), 1);
        assert_eq!(health_updates.get(), 0);

        let coordinate = hub.registry().coordinate_for_id(7).unwrap().clone();
        assert_eq!(hub.registry().get(&coordinate).map(Value::base), Some(5));
    }

    #[test]
    fn test_cascading_enrollment_reaches_fixed_point() {
        let mut hub = hub();
        let mut parent = Probe::new("parent", "none");
        let parent_ready = parent.ready.clone();
        let child_ready: Rc<Cell<usize>> = Rc::default();
        parent.spawn = Some(child_ready.clone());
        hub.enroll(parent).unwrap();

        assert_eq!(hub.start(None).unwrap(), SyncState::Offline);
        assert_eq!(parent_ready.get(), 1);
        assert_eq!(child_ready.get(), 1);
        assert_eq!(hub.consumer_count(), 2);

        // Enrolling after startup notifies immediately, once
        let late = Probe::new("late", "none");
        let late_ready = late.ready.clone();
        hub.enroll(late).unwrap();
        assert_eq!(late_ready.get(), 1);
        assert_eq!(parent_ready.get(), 1);
        assert_eq!(child_ready.get(), 1);
    }

    #[test]
    fn test_hook_can_enroll() {
        let mut hub = hub();
        let spawned = Rc::new(Cell::new(false));
        let flag = spawned.clone();
        let object = SyncedObject::new(shop()).with_hook(move |object, ctx| {
            if !flag.get() {
                flag.set(true);
                assert!(object.is_ready());
                ctx.enroll(SyncedObject::new(shop()));
            }
            Ok(())
        });
        hub.enroll(object).unwrap();
        let remote = connect(&mut hub);
        answer_init(&mut hub, &remote, &[element(7, "100")]).unwrap();

        assert!(spawned.get());
        assert_eq!(hub.consumer_count(), 2);
        let child = hub.object_mut::<SyncedObject>(ConsumerId(1)).unwrap();
        assert!(child.is_ready());
        assert_eq!(child.current_value("gold").unwrap(), 100);
    }

    #[test]
    fn test_game_aware_states() {
        let mut hub = hub();
        let id = hub.enroll(SyncedObject::game_aware(hero())).unwrap();
        let remote = connect(&mut hub);
        answer_init(&mut hub, &remote, &[element(10, "30"), element(11, "60")]).unwrap();

        hub.set_game_state(GameState::new("Exploring")).unwrap();
        assert_eq!(hub.object_mut::<SyncedObject>(id).unwrap().current_value("health").unwrap(), 30);
        hub.set_game_state(GameState::new("Fighting")).unwrap();
        assert_eq!(hub.object_mut::<SyncedObject>(id).unwrap().current_value("health").unwrap(), 60);

        // Online, an unassociated state has no slot to select
        assert!(matches!(
            hub.set_game_state(GameState::new("Shopping")),
            Err(Error::Core(CoreError::NoActiveValue(_)))
        ));
    }

    #[test]
    fn test_lifecycle_hooks_and_initial_state() {
        let lifecycle = Recording::default();
        let mut hub = Hub::new(SyncConfig::default(), lifecycle.clone());
        let id = hub.enroll(SyncedObject::game_aware(hero())).unwrap();
        let remote = connect(&mut hub);
        assert_eq!(lifecycle.starts.get(), 1);
        assert_eq!(lifecycle.completes.get(), 0);

        answer_init(&mut hub, &remote, &[element(10, "30"), element(11, "60")]).unwrap();
        assert_eq!(lifecycle.completes.get(), 1);
        assert_eq!(hub.game_state().as_str(), "Exploring");
        let hero = hub.object_mut::<SyncedObject>(id).unwrap();
        assert_eq!(hero.current_value("health").unwrap(), 30);
    }

    #[test]
    fn test_strict_offline_fails_startup() {
        let mut strict = Hub::new(
            SyncConfig {
                strict_offline: true,
                ..Default::default()
            },
            FixedLifecycle::default(),
        );
        strict.enroll(SyncedObject::new(shop())).unwrap();
        assert!(matches!(
            strict.start(None),
            Err(Error::Core(CoreError::StrictOffline(_)))
        ));

        let mut lenient = hub();
        let id = lenient.enroll(SyncedObject::new(shop())).unwrap();
        assert_eq!(lenient.start(None).unwrap(), SyncState::Offline);
        let shop = lenient.object_mut::<SyncedObject>(id).unwrap();
        assert_eq!(shop.binder("gold").unwrap().slot_count(), 0);
        assert!(matches!(
            shop.current_value("gold"),
            Err(Error::Core(CoreError::NoValueAndNoDefault(_)))
        ));
    }

    #[test]
    fn test_unknown_element_is_fatal() {
        let mut hub = hub();
        hub.enroll(SyncedObject::new(shop())).unwrap();
        let remote = connect(&mut hub);
        assert!(matches!(
            answer_init(&mut hub, &remote, &[element(99, "1")]),
            Err(Error::UnknownElement(99))
        ));
        assert_eq!(hub.state(), SyncState::Syncing);
    }

    #[test]
    fn test_rejected_update_keeps_table_and_binders_in_step() {
        let (mut hub, remote) = hub_ready_with_gold();
        let stranger = element(99, "1");
        remote.push(
            RECEIVE_DIAGRAM_ELEMENTS_UPDATED,
            elements_payload(&[element(7, "150"), stranger]),
        );
        assert!(matches!(hub.poll(), Err(Error::UnknownElement(99))));

        let coordinate = hub.registry().coordinate_for_id(7).unwrap().clone();
        assert_eq!(hub.registry().get(&coordinate).map(Value::base), Some(100));
        let shop = hub.object_mut::<SyncedObject>(ConsumerId(0)).unwrap();
        assert_eq!(shop.current_value("gold").unwrap(), 100);
    }

    #[test]
    fn test_dice_rolls_independent_per_object() {
        let goblin = || {
            Manifest::new("goblin").with_property(PropertySpec::new("damage").with_remote_id(12))
        };
        let mut hub = hub();
        let a = hub.enroll(SyncedObject::new(goblin())).unwrap();
        let b = hub.enroll(SyncedObject::new(goblin())).unwrap();
        let remote = connect(&mut hub);
        let dice = DiagramElement::new(12).with_prop(PROP_LABEL, "D1000");
        answer_init(&mut hub, &remote, &[dice]).unwrap();

        let mut rolls = |id| -> Vec<i64> {
            let goblin = hub.object_mut::<SyncedObject>(id).unwrap();
            (0..8).map(|_| goblin.current_value("damage").unwrap()).collect()
        };
        let (rolls_a, rolls_b) = (rolls(a), rolls(b));
        assert!(rolls_a.iter().all(|r| (1..=1000).contains(r)));
        assert_ne!(rolls_a, rolls_b);
    }

    #[test]
    fn test_auth_deny_goes_offline() {
        let mut hub = hub();
        hub.declare(&shop()).unwrap();
        let (connection, remote) = memory_pair();
        hub.start(Some(Box::new(connection))).unwrap();
        remote.push(RECEIVE_AUTH_DENY, json!("bad token"));
        assert_eq!(hub.poll().unwrap(), SyncState::Offline);
        assert!(remote.is_closed());
        assert_eq!(hub.pending_responses(), 0);
        assert!(hub.registry().is_offline());
    }

    #[test]
    fn test_transport_signals() {
        let mut hub = hub();
        hub.declare(&shop()).unwrap();
        let remote = connect(&mut hub);
        remote.push(RECEIVE_ERROR, json!("socket reset"));
        assert_eq!(hub.poll().unwrap(), SyncState::Offline);

        // Once ready, transport signals no longer change the state
        let (mut ready, remote) = hub_ready_with_gold();
        remote.push(RECEIVE_CLOSE, Json::Null);
        remote.push(RECEIVE_ERROR, json!("late"));
        assert_eq!(ready.poll().unwrap(), SyncState::Ready);
    }

    fn hub_ready_with_gold() -> (Hub, MemoryRemote) {
        let mut hub = hub();
        hub.enroll(SyncedObject::new(shop())).unwrap();
        let remote = connect(&mut hub);
        answer_init(&mut hub, &remote, &[element(7, "100")]).unwrap();
        (hub, remote)
    }

    #[test]
    fn test_closed_transport_at_start() {
        let mut hub = hub();
        let (connection, remote) = memory_pair();
        remote.disconnect();
        assert_eq!(hub.start(Some(Box::new(connection))).unwrap(), SyncState::Offline);
        assert!(matches!(hub.start(None), Err(Error::InvalidState { .. })));
    }

    #[test]
    fn test_startup_timeout() {
        let mut hub = Hub::new(
            SyncConfig {
                startup_timeout_ms: Some(0),
                ..Default::default()
            },
            FixedLifecycle::default(),
        );
        hub.declare(&shop()).unwrap();
        let (connection, _remote) = memory_pair();
        hub.start(Some(Box::new(connection))).unwrap();
        assert_eq!(hub.poll().unwrap(), SyncState::Offline);
    }

    #[test]
    fn test_object_events() {
        let (mut hub, remote) = hub_ready_with_gold();
        let id = ConsumerId(0);
        remote.take_sent();

        assert!(hub.object_event(id, "Purchase").unwrap());
        assert!(!hub.object_event(id, "Jump").unwrap());
        let sent = remote.take_sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].name, SEND_GAME_EVENT);
        assert_eq!(sent[0].data, json!({"gameObjName": "shop", "gameEvent": "Purchase"}));

        assert!(matches!(
            hub.object_event(ConsumerId(42), "Purchase"),
            Err(Error::UnknownConsumer(_))
        ));

        let mut offline = self::hub();
        let id = offline.enroll(SyncedObject::new(shop())).unwrap();
        offline.start(None).unwrap();
        assert!(!offline.object_event(id, "Purchase").unwrap());
    }

    #[test]
    fn test_object_state_per_instance() {
        let manifest = Manifest::new("hero")
            .with_property(
                PropertySpec::new("speed")
                    .with_state_id("Walk", 20)
                    .with_state_id("Run", 21),
            )
            .with_states_for(
                "speed",
                vec![
                    StateAssociation::new("Walk").with_object_states(["Walking"]),
                    StateAssociation::new("Run").with_object_states(["Running"]),
                ],
            );
        let mut hub = hub();
        let a = hub.enroll(SyncedObject::game_aware(manifest.clone())).unwrap();
        let b = hub.enroll(SyncedObject::game_aware(manifest)).unwrap();
        let remote = connect(&mut hub);
        answer_init(&mut hub, &remote, &[element(20, "2"), element(21, "5")]).unwrap();

        hub.set_object_state(a, ObjectState::new("Walking")).unwrap();
        hub.set_object_state(b, ObjectState::new("Running")).unwrap();
        assert_eq!(hub.object_mut::<SyncedObject>(a).unwrap().current_value("speed").unwrap(), 2);
        assert_eq!(hub.object_mut::<SyncedObject>(b).unwrap().current_value("speed").unwrap(), 5);
    }

    #[test]
    fn test_cache_saved_then_used_offline() {
        let dir = tempdir().unwrap();
        let config = SyncConfig {
            cache_root: dir.path().to_path_buf(),
            cache_directory_name: "dungeon".into(),
            ..Default::default()
        };

        let mut online = Hub::new(config.clone(), FixedLifecycle::default());
        online.enroll(SyncedObject::new(shop())).unwrap();
        let remote = connect(&mut online);
        answer_init(&mut online, &remote, &[element(7, "100")]).unwrap();
        remote.push(RECEIVE_DIAGRAM_ELEMENTS_UPDATED, elements_payload(&[element(7, "150")]));
        online.poll().unwrap();

        let mut offline = Hub::new(config, FixedLifecycle::default());
        let id = offline.enroll(SyncedObject::new(shop())).unwrap();
        offline.start(None).unwrap();
        let shop = offline.object_mut::<SyncedObject>(id).unwrap();
        assert_eq!(shop.current_value("gold").unwrap(), 150);
    }
}

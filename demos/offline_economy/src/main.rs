//! Offline Economy Example
//!
//! Syncs a shop and a hero against a scripted in-memory backend, plays with
//! game states and a live update, then starts a second hub without any
//! backend and shows the values coming back from the cache.
//!
//! Run with `RUST_LOG=debug` to see the sync engine's logs.

use econsync_core::{GameState, Manifest, PropertySpec, StateAssociation, Value};
use econsync_hub::{ConsumerId, FixedLifecycle, Hub, Result, SyncConfig, SyncState, SyncedObject};
use econsync_netcode::wire::{
    self, DiagramElement, PROP_CAPACITY, PROP_LABEL, PROP_RESOURCES, RECEIVE_AUTH_SUCCESS,
    RECEIVE_DIAGRAM_ELEMENTS_UPDATED, RECEIVE_GAME_INIT, SEND_API_AUTHORIZE, SEND_GAME_INIT,
};
use econsync_netcode::{memory_pair, MemoryRemote};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("=== Econsync Offline Economy Example ===\n");

    let config = SyncConfig {
        user_key: "demo-user".to_string(),
        game_name: "Dungeon".to_string(),
        diagram_token: "demo-token".to_string(),
        cache_root: std::env::temp_dir().join("econsync_demo"),
        cache_directory_name: "dungeon".to_string(),
        ..Default::default()
    };

    info!(game = %config.game_name, cache = %config.cache_root.display(), "starting demo");
    online_run(config.clone())?;
    offline_run(config)?;

    println!("\n=== Example Complete ===");
    Ok(())
}

fn shop() -> Manifest {
    Manifest::new("shop")
        .with_property(PropertySpec::new("gold").with_remote_id(7))
        .with_event("Purchase")
}

fn hero() -> Manifest {
    Manifest::new("hero")
        .with_property(
            PropertySpec::new("health")
                .with_state_id("Explore", 10)
                .with_state_id("Fight", 11)
                .with_default(Value::new(25)),
        )
        .with_property(PropertySpec::new("damage").with_remote_id(12))
        .with_states_for(
            "health",
            vec![
                StateAssociation::new("Explore").with_game_states(["Exploring"]),
                StateAssociation::new("Fight").with_game_states(["Fighting"]),
            ],
        )
}

/// What the scripted backend knows about each element
fn diagram(id: i64) -> Option<DiagramElement> {
    let element = DiagramElement::new(id);
    Some(match id {
        7 => element
            .with_prop(PROP_RESOURCES, "100")
            .with_prop(PROP_CAPACITY, "-1"),
        10 => element
            .with_prop(PROP_RESOURCES, "40")
            .with_prop(PROP_CAPACITY, "50"),
        11 => element.with_prop(PROP_RESOURCES, "60"),
        12 => element.with_prop(PROP_LABEL, "2+D6"),
        _ => return None,
    })
}

/// Answer whatever the client sent since the last call
fn respond(remote: &MemoryRemote) {
    for request in remote.take_sent() {
        match request.name.as_str() {
            SEND_API_AUTHORIZE => remote.push(RECEIVE_AUTH_SUCCESS, serde_json::Value::Null),
            SEND_GAME_INIT => {
                let elements: Vec<DiagramElement> = request.data["machinationsIDs"]
                    .as_array()
                    .into_iter()
                    .flatten()
                    .filter_map(|r| r["id"].as_i64())
                    .filter_map(diagram)
                    .collect();
                remote.push(RECEIVE_GAME_INIT, wire::elements_payload(&elements));
            }
            other => println!("  backend received '{}': {}", other, request.data),
        }
    }
}

fn print_hero(hub: &mut Hub, hero: ConsumerId) -> Result<()> {
    let state = hub.game_state().clone();
    if let Some(hero) = hub.object_mut::<SyncedObject>(hero) {
        println!(
            "  [{}] hero health: {}, damage roll: {}",
            state,
            hero.current_value("health")?,
            hero.current_value("damage")?
        );
    }
    Ok(())
}

fn online_run(config: SyncConfig) -> Result<()> {
    println!("--- Online: scripted backend ---\n");

    let mut hub = Hub::new(config, FixedLifecycle::new(GameState::new("Exploring")));
    let shop = hub.enroll(SyncedObject::new(shop()))?;
    let hero = hub.enroll(SyncedObject::game_aware(hero()))?;

    // A socket transport would append these to its connection URL
    let handshake = hub.config().handshake();
    info!(query = ?handshake.query(), "opening connection");
    let (connection, remote) = memory_pair();
    let mut state = hub.start(Some(Box::new(connection)))?;
    while !state.is_terminal() {
        respond(&remote);
        state = hub.poll()?;
    }
    info!(?state, values = hub.registry().resolved_count(), "online startup finished");

    if let Some(shop) = hub.object_mut::<SyncedObject>(shop) {
        println!("  shop gold: {}", shop.current_value("gold")?);
    }
    print_hero(&mut hub, hero)?;

    println!("\nEntering a fight...");
    hub.set_game_state(GameState::new("Fighting"))?;
    print_hero(&mut hub, hero)?;
    print_hero(&mut hub, hero)?;

    println!("\nBuying something...");
    if let Some(shop) = hub.object_mut::<SyncedObject>(shop) {
        shop.change_by("gold", -30)?;
        println!("  shop gold: {}", shop.current_value("gold")?);
    }
    hub.object_event(shop, "Purchase")?;
    hub.object_event(shop, "Haggle")?;
    respond(&remote);

    println!("\nDesigner raises the gold in the diagram...");
    let update = diagram(7).map(|e| e.with_prop(PROP_RESOURCES, "150"));
    remote.push(
        RECEIVE_DIAGRAM_ELEMENTS_UPDATED,
        wire::elements_payload(&update.into_iter().collect::<Vec<_>>()),
    );
    hub.poll()?;
    if let Some(shop) = hub.object_mut::<SyncedObject>(shop) {
        println!("  shop gold: {}", shop.current_value("gold")?);
    }
    Ok(())
}

fn offline_run(config: SyncConfig) -> Result<()> {
    println!("\n--- Offline: no backend, cache only ---\n");

    let mut hub = Hub::new(config, FixedLifecycle::new(GameState::new("Fighting")));
    let shop = hub.enroll(SyncedObject::new(shop()))?;
    let hero = hub.enroll(SyncedObject::game_aware(hero()))?;

    let state = hub.start(None)?;
    info!(?state, offline = state == SyncState::Offline, "offline startup finished");
    println!("{}", hub.registry().cache().to_text());

    if let Some(shop) = hub.object_mut::<SyncedObject>(shop) {
        println!("  shop gold: {}", shop.current_value("gold")?);
    }
    print_hero(&mut hub, hero)?;
    Ok(())
}

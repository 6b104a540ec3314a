use tracing::info;
use tracing_subscriber::EnvFilter;

use cell_arena_core::config::WorldConfig;
use cell_arena_core::game::entity::EntityKind;
use cell_arena_core::game::game_loop;
use cell_arena_core::game::hooks::{NoopGameMode, PushApartResolver};
use cell_arena_core::game::state::World;

const DEMO_PLAYERS: usize = 4;
const DEMO_FOOD: usize = 500;
const DEMO_VIRUSES: usize = 20;
const DEMO_TICKS: u64 = 1500;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    info!("Cell Arena v{}", env!("CARGO_PKG_VERSION"));

    let config = WorldConfig::load_or_default();
    info!(
        "Configuration loaded: border {}x{}, max mass {}, max cells {}",
        config.border.width(),
        config.border.height(),
        config.player_max_mass,
        config.player_max_cells
    );

    let mut world = World::try_new(config)?;
    let mut mode = NoopGameMode;
    let mut resolver = PushApartResolver;

    for i in 0..DEMO_PLAYERS {
        let player = world.add_player(format!("player-{}", i));
        let spawn = world.random_position();
        world.spawn(EntityKind::player(), Some(player), spawn, 100.0, &mut mode)?;
        let target = world.random_position();
        if let Some(ctx) = world.player_mut(player) {
            ctx.set_mouse(target);
        }
    }
    for _ in 0..DEMO_FOOD {
        let pos = world.random_position();
        world.spawn(EntityKind::Food, None, pos, 1.0, &mut mode)?;
    }
    for _ in 0..DEMO_VIRUSES {
        let pos = world.random_position();
        world.spawn(EntityKind::Virus, None, pos, 100.0, &mut mode)?;
    }
    info!("World seeded with {} entities", world.entity_count());

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Shutdown signal received");
    };

    tokio::select! {
        result = game_loop::run(&mut world, &mut mode, &mut resolver, Some(DEMO_TICKS)) => result?,
        _ = shutdown => {}
    }

    for id in world.player_ids() {
        if let Some(player) = world.player(*id) {
            info!(
                "{}: {} cells, mass {:.1} (best {:.1})",
                player.name,
                player.cell_count(),
                player.total_mass(),
                player.best_mass()
            );
        }
    }
    info!("Stopped at tick {}", world.tick());
    Ok(())
}

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Once};

use bevy_ecs::prelude::*;
use bodytype_core::host::ecs::{skin_type_registry, spawn_player, PlayerSkin, WorldPlayer};
use bodytype_core::{AppearanceOverrideService, OverrideConfig, PreferenceStore};
use uuid::Uuid;

static INIT: Once = Once::new();

pub fn test_config_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("test_override_config.json")
}

pub fn ensure_test_config() {
    INIT.call_once(|| {
        let config_path = test_config_path();

        debug_assert!(
            config_path.exists(),
            "missing test override config at {}",
            config_path.display()
        );

        std::env::set_var("BODYTYPES_CONFIG_PATH", &config_path);
    });
}

pub fn service_with(store: Arc<PreferenceStore>) -> AppearanceOverrideService {
    AppearanceOverrideService::new(
        store,
        OverrideConfig::builtin(),
        Arc::new(skin_type_registry()),
    )
}

pub fn in_memory_service() -> AppearanceOverrideService {
    service_with(Arc::new(PreferenceStore::in_memory()))
}

pub fn state_file(dir: &Path) -> PathBuf {
    dir.join("plugins").join("BodyTypes").join("player_state.json")
}

/// A world holding one player, as the server would spawn it.
pub struct Stage {
    pub world: World,
    pub user: Uuid,
    pub entity: Entity,
}

impl Stage {
    pub fn new() -> Self {
        Self::wearing(PlayerSkin::starter())
    }

    pub fn wearing(skin: PlayerSkin) -> Self {
        let mut world = World::new();
        let user = Uuid::new_v4();
        let entity = spawn_player(&mut world, user);
        world.entity_mut(entity).insert(skin);
        Self {
            world,
            user,
            entity,
        }
    }

    pub fn player(&mut self) -> WorldPlayer<'_> {
        WorldPlayer::new(&mut self.world, self.entity)
    }

    pub fn skin(&self) -> PlayerSkin {
        self.world
            .get::<PlayerSkin>(self.entity)
            .cloned()
            .expect("player skin present")
    }
}

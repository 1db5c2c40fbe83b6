//! `bevy_ecs` host: players are entities carrying a [`PlayerSkin`] component.

use std::any::TypeId;
use std::borrow::Cow;
use std::fmt;

use bevy_ecs::prelude::*;
use bevy_reflect::{Reflect, TypeRegistry};
use thiserror::Error;
use uuid::Uuid;

use super::{register_constructors, Constructor, HostObject, MethodSig, RecordConstructors};

pub const SKIN_GETTER: &str = "player_skin";
pub const SKIN_SETTER: &str = "set_player_skin";
pub const SKIN_FIELD_COUNT: usize = 20;

/// Separator between the pieces of a stringified [`PlayerSkinPartId`].
pub const PART_SEPARATOR: char = '.';

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PartIdError {
    #[error("part id pieces must not be empty")]
    EmptyPiece,
    #[error("part id piece `{0}` contains the `.` separator")]
    Separator(String),
    #[error("variant `{0}` requires a texture")]
    VariantWithoutTexture(String),
}

fn checked_piece(piece: impl Into<String>) -> Result<String, PartIdError> {
    let piece = piece.into();
    if piece.is_empty() {
        return Err(PartIdError::EmptyPiece);
    }
    if piece.contains(PART_SEPARATOR) {
        return Err(PartIdError::Separator(piece));
    }
    Ok(piece)
}

/// Compound cosmetic identifier, stringified as `asset.texture.variant`.
///
/// Only shapes that survive that round trip can be built: every piece is
/// non-empty and free of the separator, and a variant needs a texture.
#[derive(Debug, Clone, PartialEq, Eq, Reflect)]
pub struct PlayerSkinPartId {
    asset_id: String,
    texture_id: Option<String>,
    variant_id: Option<String>,
}

impl PlayerSkinPartId {
    pub fn new(asset_id: impl Into<String>) -> Result<Self, PartIdError> {
        Ok(Self {
            asset_id: checked_piece(asset_id)?,
            texture_id: None,
            variant_id: None,
        })
    }

    pub fn with_texture(mut self, texture_id: impl Into<String>) -> Result<Self, PartIdError> {
        self.texture_id = Some(checked_piece(texture_id)?);
        Ok(self)
    }

    pub fn with_variant(mut self, variant_id: impl Into<String>) -> Result<Self, PartIdError> {
        let variant_id = checked_piece(variant_id)?;
        if self.texture_id.is_none() {
            return Err(PartIdError::VariantWithoutTexture(variant_id));
        }
        self.variant_id = Some(variant_id);
        Ok(self)
    }

    pub fn asset_id(&self) -> &str {
        &self.asset_id
    }

    pub fn texture_id(&self) -> Option<&str> {
        self.texture_id.as_deref()
    }

    pub fn variant_id(&self) -> Option<&str> {
        self.variant_id.as_deref()
    }

    pub fn parse(value: &str) -> Option<Self> {
        let mut pieces = value.split(PART_SEPARATOR);
        let mut part = Self::new(pieces.next()?).ok()?;
        if let Some(texture) = pieces.next() {
            part = part.with_texture(texture).ok()?;
        }
        if let Some(variant) = pieces.next() {
            part = part.with_variant(variant).ok()?;
        }
        pieces.next().is_none().then_some(part)
    }

    /// Fixed ids of the starter look.
    fn known(asset_id: &str, texture_id: &str, variant_id: Option<&str>) -> Self {
        Self {
            asset_id: asset_id.to_string(),
            texture_id: Some(texture_id.to_string()),
            variant_id: variant_id.map(str::to_string),
        }
    }
}

impl fmt::Display for PlayerSkinPartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.asset_id)?;
        for piece in [&self.texture_id, &self.variant_id].into_iter().flatten() {
            write!(f, "{PART_SEPARATOR}{piece}")?;
        }
        Ok(())
    }
}

/// Immutable appearance record. Replaced wholesale, never edited in place.
#[derive(Component, Debug, Clone, PartialEq, Eq, Reflect)]
pub struct PlayerSkin {
    pub body_characteristic: String,
    pub underwear: PlayerSkinPartId,
    pub face: String,
    pub eyes: PlayerSkinPartId,
    pub ears: String,
    pub mouth: String,
    pub facial_hair: Option<PlayerSkinPartId>,
    pub haircut: Option<PlayerSkinPartId>,
    pub eyebrows: Option<PlayerSkinPartId>,
    pub pants: Option<PlayerSkinPartId>,
    pub overpants: Option<PlayerSkinPartId>,
    pub undertop: Option<PlayerSkinPartId>,
    pub overtop: Option<PlayerSkinPartId>,
    pub shoes: Option<PlayerSkinPartId>,
    pub head_accessory: Option<PlayerSkinPartId>,
    pub face_accessory: Option<PlayerSkinPartId>,
    pub ear_accessory: Option<PlayerSkinPartId>,
    pub skin_feature: Option<String>,
    pub gloves: Option<PlayerSkinPartId>,
    pub cape: Option<PlayerSkinPartId>,
}

impl PlayerSkin {
    /// Look given to a player seen for the first time.
    pub fn starter() -> Self {
        Self {
            body_characteristic: "Default".into(),
            underwear: PlayerSkinPartId::known("Underwear_Basic", "White", None),
            face: "Face_Neutral".into(),
            eyes: PlayerSkinPartId::known("Eyes_Round", "Brown", None),
            ears: "Ears_Default".into(),
            mouth: "Mouth_Smile".into(),
            facial_hair: None,
            haircut: Some(PlayerSkinPartId::known("Haircut_Short", "Chestnut", Some("Messy"))),
            eyebrows: Some(PlayerSkinPartId::known("Eyebrows_Thin", "Chestnut", None)),
            pants: Some(PlayerSkinPartId::known("Pants_Cloth", "Grey", None)),
            overpants: None,
            undertop: Some(PlayerSkinPartId::known("Shirt_Linen", "Cream", None)),
            overtop: None,
            shoes: Some(PlayerSkinPartId::known("Boots_Leather", "Brown", None)),
            head_accessory: None,
            face_accessory: None,
            ear_accessory: None,
            skin_feature: None,
            gloves: None,
            cape: None,
        }
    }

    /// Positional all-text constructor, in declared field order.
    pub fn from_parts(args: &[Option<String>]) -> Option<Self> {
        let [body_characteristic, underwear, face, eyes, ears, mouth, facial_hair, haircut, eyebrows, pants, overpants, undertop, overtop, shoes, head_accessory, face_accessory, ear_accessory, skin_feature, gloves, cape] =
            args
        else {
            return None;
        };
        let part = |value: &Option<String>| value.as_deref().and_then(PlayerSkinPartId::parse);

        Some(Self {
            body_characteristic: body_characteristic.clone()?,
            underwear: part(underwear)?,
            face: face.clone()?,
            eyes: part(eyes)?,
            ears: ears.clone()?,
            mouth: mouth.clone()?,
            facial_hair: part(facial_hair),
            haircut: part(haircut),
            eyebrows: part(eyebrows),
            pants: part(pants),
            overpants: part(overpants),
            undertop: part(undertop),
            overtop: part(overtop),
            shoes: part(shoes),
            head_accessory: part(head_accessory),
            face_accessory: part(face_accessory),
            ear_accessory: part(ear_accessory),
            skin_feature: skin_feature.clone(),
            gloves: part(gloves),
            cape: part(cape),
        })
    }
}

/// Which user an entity belongs to.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlayerId(pub Uuid);

/// Registry describing the skin types and their construction entry points.
pub fn skin_type_registry() -> TypeRegistry {
    let mut registry = TypeRegistry::new();
    registry.register::<PlayerSkinPartId>();
    register_constructors::<PlayerSkin>(
        &mut registry,
        RecordConstructors::new(vec![Constructor::text(
            "PlayerSkin::from_parts",
            SKIN_FIELD_COUNT,
            |args| PlayerSkin::from_parts(args).map(|skin| Box::new(skin) as Box<dyn Reflect>),
        )]),
    );
    registry
}

pub fn spawn_player(world: &mut World, user: Uuid) -> Entity {
    world.spawn((PlayerId(user), PlayerSkin::starter())).id()
}

/// A player entity viewed through the host object boundary.
pub struct WorldPlayer<'w> {
    world: &'w mut World,
    entity: Entity,
}

impl<'w> WorldPlayer<'w> {
    pub fn new(world: &'w mut World, entity: Entity) -> Self {
        Self { world, entity }
    }

    pub fn entity(&self) -> Entity {
        self.entity
    }

    pub fn skin(&self) -> Option<&PlayerSkin> {
        self.world.get::<PlayerSkin>(self.entity)
    }
}

impl HostObject for WorldPlayer<'_> {
    fn getters(&self) -> Vec<Cow<'static, str>> {
        vec![Cow::Borrowed(SKIN_GETTER)]
    }

    fn get(&self, getter: &str) -> Option<&dyn Reflect> {
        match getter {
            SKIN_GETTER => self.skin().map(|skin| skin as &dyn Reflect),
            _ => None,
        }
    }

    fn nested(&self, _getter: &str) -> Option<&dyn HostObject> {
        None
    }

    fn nested_mut(&mut self, _getter: &str) -> Option<&mut dyn HostObject> {
        None
    }

    fn methods(&self) -> Vec<MethodSig> {
        vec![MethodSig::new(SKIN_SETTER, TypeId::of::<PlayerSkin>())]
    }

    fn invoke(&mut self, method: &str, arg: Box<dyn Reflect>) -> Result<(), Box<dyn Reflect>> {
        if method != SKIN_SETTER {
            return Err(arg);
        }
        let skin = arg.downcast::<PlayerSkin>()?;
        match self.world.get_entity_mut(self.entity) {
            Some(mut entity) => {
                entity.insert(*skin);
                Ok(())
            }
            None => Err(skin as Box<dyn Reflect>),
        }
    }
}

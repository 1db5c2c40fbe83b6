//! Snapshot, substitute and rebuild an appearance record whose concrete type is
//! only known to the host.
//!
//! The pipeline is: locate the record on an entity, decode every configured
//! sub-field into text, overwrite one of them, find a construction entry point
//! taking exactly that many text parameters, and hand the new record to the
//! first setter the entity (or one of its nested holders) accepts.

use std::any::{Any, TypeId};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use bevy_reflect::{DynamicTypePath, Reflect, ReflectRef, TypeRegistry, VariantType};
use serde::Deserialize;

use crate::capability::{probe_first, CapabilityError};
use crate::host::{HostObject, RecordConstructors};

/// One logical sub-field and the accessor names it may be exposed under.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FieldSpec {
    name: String,
    #[serde(default)]
    aliases: Vec<String>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Accessor names to try, primary name first.
    pub fn accessors(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }
}

/// Ordered sub-field layout of the appearance record.
///
/// The order is also the positional order of the constructor parameters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RecordLayout {
    fields: Vec<FieldSpec>,
    constituents: Vec<String>,
    separator: String,
}

impl Default for RecordLayout {
    fn default() -> Self {
        Self {
            fields: Vec::new(),
            constituents: vec![
                "asset_id".to_string(),
                "texture_id".to_string(),
                "variant_id".to_string(),
            ],
            separator: ".".to_string(),
        }
    }
}

impl RecordLayout {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self {
            fields,
            ..Self::default()
        }
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn constituents(&self) -> &[String] {
        &self.constituents
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

/// Names probed when locating and committing the record.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CommitProbe {
    record_getters: Vec<String>,
    setters: Vec<String>,
    holder_hints: Vec<String>,
    holder_method_hints: Vec<String>,
}

impl Default for CommitProbe {
    fn default() -> Self {
        let owned = |names: &[&str]| -> Vec<String> { names.iter().map(|n| n.to_string()).collect() };
        Self {
            record_getters: owned(&["player_skin", "skin", "appearance"]),
            setters: owned(&["set_player_skin", "set_skin", "apply_skin", "update_skin"]),
            holder_hints: owned(&["appearance", "cosmetic", "skin"]),
            holder_method_hints: owned(&["set", "apply", "update"]),
        }
    }
}

impl CommitProbe {
    pub fn record_getters(&self) -> &[String] {
        &self.record_getters
    }

    pub fn setters(&self) -> &[String] {
        &self.setters
    }

    pub fn holder_hints(&self) -> &[String] {
        &self.holder_hints
    }

    pub fn holder_method_hints(&self) -> &[String] {
        &self.holder_method_hints
    }

    fn is_holder(&self, getter: &str) -> bool {
        contains_any(getter, &self.holder_hints)
    }

    fn is_holder_method(&self, method: &str) -> bool {
        contains_any(method, &self.holder_method_hints)
    }
}

fn contains_any(name: &str, hints: &[String]) -> bool {
    let lowered = name.to_lowercase();
    hints.iter().any(|hint| lowered.contains(&hint.to_lowercase()))
}

/// Decoded sub-field values captured right before a rebuild.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    names: Vec<String>,
    values: Vec<Option<String>>,
}

impl Snapshot {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[Option<String>] {
        &self.values
    }

    pub fn value_at(&self, index: usize) -> Option<&str> {
        self.values.get(index).and_then(|v| v.as_deref())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        let index = self.names.iter().position(|n| n == name)?;
        self.value_at(index)
    }

    /// Overwrite the value at `index`.
    pub fn substitute(&mut self, index: usize, value: Option<String>) -> Result<(), CapabilityError> {
        let len = self.values.len();
        let slot = self.values.get_mut(index).ok_or_else(|| {
            CapabilityError::mismatch(
                "snapshot substitution",
                format!("target index {index} outside {len} sub-fields"),
            )
        })?;
        *slot = value;
        Ok(())
    }
}

/// Where the record was found on the entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordLocation {
    Direct { getter: String },
    Nested { holder: String, getter: String },
}

/// Which entry point accepted the rebuilt record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitPath {
    Direct { method: String },
    Nested { holder: String, method: String },
}

impl fmt::Display for CommitPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommitPath::Direct { method } => f.write_str(method),
            CommitPath::Nested { holder, method } => write!(f, "{holder}().{method}"),
        }
    }
}

/// A record read off an entity, reduced to what a rebuild needs.
#[derive(Debug)]
pub struct CapturedRecord {
    pub location: RecordLocation,
    pub type_id: TypeId,
    pub type_name: String,
    pub snapshot: Snapshot,
    /// Reflected copy of the record as it was captured.
    pub original: Box<dyn Reflect>,
}

/// Generic snapshot/rebuild/commit machinery for one record layout.
#[derive(Clone)]
pub struct RecordAdapter {
    layout: Arc<RecordLayout>,
    probe: Arc<CommitProbe>,
    registry: Arc<TypeRegistry>,
}

impl fmt::Debug for RecordAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordAdapter")
            .field("layout", &self.layout)
            .field("probe", &self.probe)
            .finish_non_exhaustive()
    }
}

impl RecordAdapter {
    pub fn new(layout: RecordLayout, probe: CommitProbe, registry: Arc<TypeRegistry>) -> Self {
        Self {
            layout: Arc::new(layout),
            probe: Arc::new(probe),
            registry,
        }
    }

    pub fn layout(&self) -> &RecordLayout {
        &self.layout
    }

    pub fn probe(&self) -> &CommitProbe {
        &self.probe
    }

    /// Find the record on `entity`, first through its own getters and then
    /// through nested holders whose getter name hints at appearance data.
    pub fn locate<'e>(
        &self,
        entity: &'e dyn HostObject,
    ) -> Result<(&'e dyn Reflect, RecordLocation), CapabilityError> {
        let getters = self.probe.record_getters();
        if let Ok((record, getter)) = find_record(entity, getters) {
            return Ok((record, RecordLocation::Direct { getter }));
        }

        let holders = entity
            .getters()
            .into_iter()
            .filter(|getter| self.probe.is_holder(getter));
        probe_first("appearance record", holders, |holder| {
            let nested = entity
                .nested(&holder)
                .ok_or_else(|| CapabilityError::absent(holder.to_string()))?;
            let (record, getter) = find_record(nested, getters)?;
            Ok((
                record,
                RecordLocation::Nested {
                    holder: holder.into_owned(),
                    getter,
                },
            ))
        })
    }

    /// Locate the record and capture everything a rebuild needs, releasing
    /// the borrow of `entity`.
    pub fn capture(&self, entity: &dyn HostObject) -> Result<CapturedRecord, CapabilityError> {
        let (record, location) = self.locate(entity)?;
        Ok(CapturedRecord {
            location,
            type_id: Any::type_id(record.as_any()),
            type_name: record.reflect_short_type_path().to_string(),
            snapshot: self.snapshot(record)?,
            original: record.clone_value(),
        })
    }

    /// Decode every configured sub-field. Sub-fields with no usable accessor
    /// are recorded as absent.
    pub fn snapshot(&self, record: &dyn Reflect) -> Result<Snapshot, CapabilityError> {
        let ReflectRef::Struct(fields) = record.reflect_ref() else {
            return Err(CapabilityError::mismatch(
                record.reflect_short_type_path(),
                "record does not expose named sub-fields",
            ));
        };

        let mut names = Vec::with_capacity(self.layout.len());
        let mut values = Vec::with_capacity(self.layout.len());
        for spec in self.layout.fields() {
            let value = spec
                .accessors()
                .find_map(|accessor| fields.field(accessor))
                .and_then(|raw| self.decode(raw));
            names.push(spec.name().to_string());
            values.push(value);
        }
        Ok(Snapshot { names, values })
    }

    /// Decode one raw sub-field value into text.
    pub fn decode(&self, raw: &dyn Reflect) -> Option<String> {
        match raw.reflect_ref() {
            ReflectRef::Struct(part) => {
                let pieces: Vec<String> = self
                    .layout
                    .constituents()
                    .iter()
                    .filter_map(|name| part.field(name))
                    .filter_map(decode_plain)
                    .collect();
                if pieces.is_empty() {
                    None
                } else {
                    Some(pieces.join(self.layout.separator()))
                }
            }
            ReflectRef::Enum(value) => match value.variant_type() {
                VariantType::Unit => decode_unit_variant(value.variant_name()),
                _ if value.field_len() == 1 => value.field_at(0).and_then(|inner| self.decode(inner)),
                _ => None,
            },
            ReflectRef::TupleStruct(value) if value.field_len() == 1 => {
                value.field(0).and_then(|inner| self.decode(inner))
            }
            _ => decode_plain(raw),
        }
    }

    /// Build a new record of `type_id` from `snapshot`, positionally.
    pub fn reconstruct(
        &self,
        type_id: TypeId,
        type_name: &str,
        snapshot: &Snapshot,
    ) -> Result<Box<dyn Reflect>, CapabilityError> {
        let constructors = self
            .registry
            .get(type_id)
            .and_then(|registration| registration.data::<RecordConstructors>())
            .ok_or_else(|| CapabilityError::absent(format!("{type_name} constructors")))?;

        let arity = snapshot.len();
        let chosen = probe_first(
            &format!("{type_name} constructor"),
            constructors.iter(),
            |ctor| {
                if ctor.arity() != arity {
                    return Err(CapabilityError::absent(ctor.name.to_string()));
                }
                if !ctor.takes_only_text() {
                    return Err(CapabilityError::mismatch(
                        format!("{type_name}::{}", ctor.name),
                        format!("{arity} parameters but not all text"),
                    ));
                }
                Ok(ctor)
            },
        )?;

        chosen.call(snapshot.values()).ok_or_else(|| {
            CapabilityError::mismatch(
                format!("{type_name}::{}", chosen.name),
                "constructor rejected the decoded values",
            )
        })
    }

    /// Snapshot `record`, replace sub-field `target` and construct the result.
    pub fn rebuild(
        &self,
        record: &dyn Reflect,
        target: usize,
        value: Option<String>,
    ) -> Result<Box<dyn Reflect>, CapabilityError> {
        let mut snapshot = self.snapshot(record)?;
        snapshot.substitute(target, value)?;
        let rebuilt = self.reconstruct(
            Any::type_id(record.as_any()),
            record.reflect_short_type_path(),
            &snapshot,
        )?;
        self.verify_untouched(record, rebuilt.as_ref(), target)?;
        Ok(rebuilt)
    }

    /// Check that every configured sub-field other than `target` compares
    /// equal between `original` and `rebuilt`.
    ///
    /// Sub-fields the original does not expose are skipped. A sub-field whose
    /// type cannot be compared through reflection counts as changed.
    pub fn verify_untouched(
        &self,
        original: &dyn Reflect,
        rebuilt: &dyn Reflect,
        target: usize,
    ) -> Result<(), CapabilityError> {
        let type_name = rebuilt.reflect_short_type_path();
        let (ReflectRef::Struct(before), ReflectRef::Struct(after)) =
            (original.reflect_ref(), rebuilt.reflect_ref())
        else {
            return Err(CapabilityError::mismatch(
                type_name,
                "record does not expose named sub-fields",
            ));
        };

        for (index, spec) in self.layout.fields().iter().enumerate() {
            if index == target {
                continue;
            }
            let Some(old) = spec.accessors().find_map(|accessor| before.field(accessor)) else {
                continue;
            };
            let unchanged = spec
                .accessors()
                .find_map(|accessor| after.field(accessor))
                .and_then(|new| new.reflect_partial_eq(old))
                .unwrap_or(false);
            if !unchanged {
                return Err(CapabilityError::mismatch(
                    format!("{type_name}.{}", spec.name()),
                    "sub-field would change when rebuilt from text",
                ));
            }
        }
        Ok(())
    }

    /// Hand `record` to the first setter that takes its concrete type.
    ///
    /// Setters declared directly on the entity are tried in the configured
    /// order before any nested holder is consulted.
    pub fn commit(
        &self,
        entity: &mut dyn HostObject,
        record: Box<dyn Reflect>,
    ) -> Result<CommitPath, CapabilityError> {
        let accepts = Any::type_id(record.as_any());
        let type_name = record.reflect_short_type_path().to_string();
        let mut record = record;

        let declared = entity.methods();
        for setter in self.probe.setters() {
            let found = declared
                .iter()
                .any(|sig| sig.name == setter.as_str() && sig.accepts == accepts);
            if !found {
                continue;
            }
            match entity.invoke(setter, record) {
                Ok(()) => {
                    return Ok(CommitPath::Direct {
                        method: setter.clone(),
                    })
                }
                Err(returned) => record = returned,
            }
        }

        let holders: Vec<Cow<'static, str>> = entity
            .getters()
            .into_iter()
            .filter(|getter| self.probe.is_holder(getter))
            .collect();
        for holder_name in holders {
            let Some(holder) = entity.nested_mut(&holder_name) else {
                continue;
            };
            let candidates: Vec<_> = holder
                .methods()
                .into_iter()
                .filter(|sig| sig.accepts == accepts && self.probe.is_holder_method(&sig.name))
                .collect();
            for sig in candidates {
                match holder.invoke(&sig.name, record) {
                    Ok(()) => {
                        return Ok(CommitPath::Nested {
                            holder: holder_name.into_owned(),
                            method: sig.name.into_owned(),
                        })
                    }
                    Err(returned) => record = returned,
                }
            }
        }

        Err(CapabilityError::absent(format!("setter accepting {type_name}")))
    }
}

fn find_record<'e>(
    object: &'e dyn HostObject,
    getters: &[String],
) -> Result<(&'e dyn Reflect, String), CapabilityError> {
    probe_first("appearance record", getters, |getter| {
        let value = object
            .get(getter)
            .ok_or_else(|| CapabilityError::absent(getter.clone()))?;
        match value.reflect_ref() {
            ReflectRef::Struct(_) => Ok((value, getter.clone())),
            _ => Err(CapabilityError::mismatch(
                getter.clone(),
                "value has no named sub-fields",
            )),
        }
    })
}

fn decode_unit_variant(name: &str) -> Option<String> {
    if name == "None" {
        None
    } else {
        Some(name.to_string())
    }
}

/// Decode a scalar, coercing non-text scalars to their display form.
fn decode_plain(raw: &dyn Reflect) -> Option<String> {
    let any = raw.as_any();
    if let Some(text) = any.downcast_ref::<String>() {
        return Some(text.clone());
    }
    if let Some(text) = any.downcast_ref::<Option<String>>() {
        return text.clone();
    }
    if let Some(text) = any.downcast_ref::<Cow<'static, str>>() {
        return Some(text.to_string());
    }

    macro_rules! display_scalars {
        ($($ty:ty),*) => {
            $(
                if let Some(value) = any.downcast_ref::<$ty>() {
                    return Some(value.to_string());
                }
            )*
        };
    }
    display_scalars!(bool, char, u8, u16, u32, u64, usize, i8, i16, i32, i64, isize, f32, f64);

    match raw.reflect_ref() {
        ReflectRef::Enum(value) if value.variant_type() == VariantType::Unit => {
            decode_unit_variant(value.variant_name())
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{register_constructors, Constructor, MethodSig, ParamKind};

    #[derive(Debug, Clone, PartialEq, Reflect)]
    struct Part {
        asset_id: String,
        texture_id: Option<String>,
        variant_id: Option<String>,
    }

    #[derive(Debug, Clone, PartialEq, Reflect)]
    struct Look {
        body: String,
        hair: Part,
        cape: Option<String>,
    }

    fn part(value: Option<&str>) -> Option<Part> {
        let mut pieces = value?.splitn(3, '.');
        Some(Part {
            asset_id: pieces.next()?.to_string(),
            texture_id: pieces.next().map(str::to_string),
            variant_id: pieces.next().map(str::to_string),
        })
    }

    fn registry_with(ctors: Vec<Constructor>) -> Arc<TypeRegistry> {
        let mut registry = TypeRegistry::new();
        register_constructors::<Look>(&mut registry, RecordConstructors::new(ctors));
        Arc::new(registry)
    }

    fn look_ctor() -> Constructor {
        Constructor::text("new", 3, |args| {
            Some(Box::new(Look {
                body: args[0].clone()?,
                hair: part(args[1].as_deref())?,
                cape: args[2].clone(),
            }) as Box<dyn Reflect>)
        })
    }

    fn layout() -> RecordLayout {
        RecordLayout::new(vec![
            FieldSpec::new("body").with_alias("body_characteristic"),
            FieldSpec::new("hair"),
            FieldSpec::new("cape"),
        ])
    }

    fn adapter(ctors: Vec<Constructor>) -> RecordAdapter {
        RecordAdapter::new(layout(), CommitProbe::default(), registry_with(ctors))
    }

    fn sample() -> Look {
        Look {
            body: "Default".into(),
            hair: Part {
                asset_id: "Braid".into(),
                texture_id: Some("Auburn".into()),
                variant_id: None,
            },
            cape: Some("Royal".into()),
        }
    }

    #[test]
    fn snapshot_decodes_plain_compound_and_optional_fields() {
        let adapter = adapter(vec![look_ctor()]);
        let snapshot = adapter.snapshot(&sample()).unwrap();
        assert_eq!(snapshot.get("body"), Some("Default"));
        assert_eq!(snapshot.get("hair"), Some("Braid.Auburn"));
        assert_eq!(snapshot.get("cape"), Some("Royal"));
    }

    #[test]
    fn missing_accessor_is_absent_not_fatal() {
        let layout = RecordLayout::new(vec![
            FieldSpec::new("body"),
            FieldSpec::new("gloves"),
        ]);
        let adapter = RecordAdapter::new(layout, CommitProbe::default(), registry_with(vec![]));
        let snapshot = adapter.snapshot(&sample()).unwrap();
        assert_eq!(snapshot.values(), &[Some("Default".to_string()), None]);
    }

    #[test]
    fn rebuild_substitutes_only_the_target() {
        let adapter = adapter(vec![look_ctor()]);
        let original = sample();
        let rebuilt = adapter
            .rebuild(&original, 0, Some("Athletic".into()))
            .unwrap();
        let rebuilt = rebuilt.downcast::<Look>().unwrap();
        assert_eq!(rebuilt.body, "Athletic");
        assert_eq!(rebuilt.hair, original.hair);
        assert_eq!(rebuilt.cape, original.cape);
    }

    #[test]
    fn rebuild_preserves_compound_neighbours_when_middle_changes() {
        let adapter = adapter(vec![look_ctor()]);
        let rebuilt = adapter
            .rebuild(&sample(), 1, Some("Bob.Black.Short".into()))
            .unwrap()
            .downcast::<Look>()
            .unwrap();
        assert_eq!(rebuilt.body, "Default");
        assert_eq!(
            rebuilt.hair,
            Part {
                asset_id: "Bob".into(),
                texture_id: Some("Black".into()),
                variant_id: Some("Short".into()),
            }
        );
        assert_eq!(rebuilt.cape.as_deref(), Some("Royal"));
    }

    #[test]
    fn lossy_rebuild_of_an_untouched_field_is_refused() {
        // Splits on every separator, so a dotted asset id shifts into the texture.
        let greedy = Constructor::text("greedy", 3, |args| {
            let mut pieces = args[1].as_deref()?.split('.');
            Some(Box::new(Look {
                body: args[0].clone()?,
                hair: Part {
                    asset_id: pieces.next()?.to_string(),
                    texture_id: pieces.next().map(str::to_string),
                    variant_id: pieces.next().map(str::to_string),
                },
                cape: args[2].clone(),
            }) as Box<dyn Reflect>)
        });
        let adapter = adapter(vec![greedy]);
        let mut original = sample();
        original.hair.asset_id = "Braid.v2".into();
        original.hair.texture_id = None;

        let err = adapter
            .rebuild(&original, 0, Some("Athletic".into()))
            .unwrap_err();
        match err {
            CapabilityError::ShapeMismatch { what, .. } => assert_eq!(what, "Look.hair"),
            other => panic!("unexpected error {other:?}"),
        }
        assert!(adapter.rebuild(&sample(), 0, Some("Athletic".into())).is_ok());
    }

    #[test]
    fn verify_compares_against_a_captured_copy() {
        let adapter = adapter(vec![look_ctor()]);
        let copy = sample().clone_value();
        let mut rebuilt = sample();
        rebuilt.body = "Athletic".into();
        assert!(adapter.verify_untouched(copy.as_ref(), &rebuilt, 0).is_ok());

        rebuilt.cape = None;
        let err = adapter.verify_untouched(copy.as_ref(), &rebuilt, 0).unwrap_err();
        assert!(matches!(err, CapabilityError::ShapeMismatch { .. }));
    }

    #[test]
    fn constructor_with_wrong_arity_or_types_is_skipped() {
        let wrong_arity = Constructor::text("two", 2, |_| None);
        let wrong_types = Constructor::new(
            "typed",
            vec![ParamKind::Text, ParamKind::Integer, ParamKind::Text],
            |_| None,
        );
        let adapter = adapter(vec![wrong_arity, wrong_types, look_ctor()]);
        assert!(adapter.rebuild(&sample(), 0, Some("Athletic".into())).is_ok());
    }

    #[test]
    fn no_qualifying_constructor_fails_without_touching_the_record() {
        let wrong_types = Constructor::new("typed", vec![ParamKind::Flag; 3], |_| None);
        let adapter = adapter(vec![wrong_types]);
        let original = sample();
        let err = adapter
            .rebuild(&original, 0, Some("Athletic".into()))
            .unwrap_err();
        assert!(matches!(err, CapabilityError::ShapeMismatch { .. }));
        assert_eq!(original, sample());
    }

    #[test]
    fn unregistered_record_type_is_absent() {
        let adapter = RecordAdapter::new(
            layout(),
            CommitProbe::default(),
            Arc::new(TypeRegistry::new()),
        );
        let err = adapter.rebuild(&sample(), 0, None).unwrap_err();
        assert!(matches!(err, CapabilityError::Absent { .. }));
    }

    #[test]
    fn substitution_outside_layout_is_a_shape_mismatch() {
        let adapter = adapter(vec![look_ctor()]);
        let err = adapter.rebuild(&sample(), 7, None).unwrap_err();
        assert!(matches!(err, CapabilityError::ShapeMismatch { .. }));
    }

    struct Holder {
        look: Option<Look>,
    }

    impl HostObject for Holder {
        fn getters(&self) -> Vec<Cow<'static, str>> {
            vec![]
        }
        fn get(&self, _getter: &str) -> Option<&dyn Reflect> {
            None
        }
        fn nested(&self, _getter: &str) -> Option<&dyn HostObject> {
            None
        }
        fn nested_mut(&mut self, _getter: &str) -> Option<&mut dyn HostObject> {
            None
        }
        fn methods(&self) -> Vec<MethodSig> {
            vec![MethodSig::of::<Look>("update_look")]
        }
        fn invoke(&mut self, method: &str, arg: Box<dyn Reflect>) -> Result<(), Box<dyn Reflect>> {
            if method != "update_look" {
                return Err(arg);
            }
            self.look = Some(*arg.downcast::<Look>()?);
            Ok(())
        }
    }

    struct Player {
        look: Look,
        cosmetics: Holder,
        direct_calls: usize,
        expose_setter: bool,
    }

    impl HostObject for Player {
        fn getters(&self) -> Vec<Cow<'static, str>> {
            vec!["name".into(), "look".into(), "cosmetics".into()]
        }
        fn get(&self, getter: &str) -> Option<&dyn Reflect> {
            match getter {
                "look" => Some(&self.look),
                _ => None,
            }
        }
        fn nested(&self, getter: &str) -> Option<&dyn HostObject> {
            (getter == "cosmetics").then_some(&self.cosmetics as &dyn HostObject)
        }
        fn nested_mut(&mut self, getter: &str) -> Option<&mut dyn HostObject> {
            if getter == "cosmetics" {
                Some(&mut self.cosmetics)
            } else {
                None
            }
        }
        fn methods(&self) -> Vec<MethodSig> {
            let mut sigs = vec![MethodSig::of::<String>("set_look")];
            if self.expose_setter {
                sigs.push(MethodSig::of::<Look>("set_look"));
            }
            sigs
        }
        fn invoke(&mut self, method: &str, arg: Box<dyn Reflect>) -> Result<(), Box<dyn Reflect>> {
            if method != "set_look" || !self.expose_setter {
                return Err(arg);
            }
            self.direct_calls += 1;
            self.look = *arg.downcast::<Look>()?;
            Ok(())
        }
    }

    fn player(expose_setter: bool) -> Player {
        Player {
            look: sample(),
            cosmetics: Holder { look: None },
            direct_calls: 0,
            expose_setter,
        }
    }

    fn probe() -> CommitProbe {
        CommitProbe {
            record_getters: vec!["look".into()],
            setters: vec!["set_skin".into(), "set_look".into()],
            ..CommitProbe::default()
        }
    }

    #[test]
    fn direct_setter_wins_over_nested_holder() {
        let adapter = RecordAdapter::new(layout(), probe(), registry_with(vec![look_ctor()]));
        let mut target = player(true);
        let rebuilt = adapter.rebuild(&target.look, 0, Some("Athletic".into())).unwrap();
        let path = adapter.commit(&mut target, rebuilt).unwrap();
        assert_eq!(
            path,
            CommitPath::Direct {
                method: "set_look".into()
            }
        );
        assert_eq!(target.direct_calls, 1);
        assert_eq!(target.look.body, "Athletic");
        assert!(target.cosmetics.look.is_none());
    }

    #[test]
    fn holder_fallback_is_used_when_no_direct_setter_matches() {
        let adapter = RecordAdapter::new(layout(), probe(), registry_with(vec![look_ctor()]));
        let mut target = player(false);
        let rebuilt = adapter.rebuild(&target.look, 0, Some("Athletic".into())).unwrap();
        let path = adapter.commit(&mut target, rebuilt).unwrap();
        assert_eq!(
            path,
            CommitPath::Nested {
                holder: "cosmetics".into(),
                method: "update_look".into()
            }
        );
        assert_eq!(path.to_string(), "cosmetics().update_look");
        assert_eq!(target.direct_calls, 0);
        assert_eq!(
            target.cosmetics.look.as_ref().map(|l| l.body.as_str()),
            Some("Athletic")
        );
    }

    #[test]
    fn locate_and_capture_read_through_the_entity() {
        let adapter = RecordAdapter::new(layout(), probe(), registry_with(vec![look_ctor()]));
        let target = player(true);
        let captured = adapter.capture(&target).unwrap();
        assert_eq!(
            captured.location,
            RecordLocation::Direct {
                getter: "look".into()
            }
        );
        assert_eq!(captured.type_id, TypeId::of::<Look>());
        assert_eq!(captured.snapshot.get("hair"), Some("Braid.Auburn"));
    }

    #[test]
    fn holder_name_hints_are_case_insensitive() {
        let probe = CommitProbe::default();
        assert!(probe.is_holder("getPlayerSkinComponent"));
        assert!(probe.is_holder("CosmeticsHolder"));
        assert!(!probe.is_holder("inventory"));
        assert!(probe.is_holder_method("applyLook"));
    }
}

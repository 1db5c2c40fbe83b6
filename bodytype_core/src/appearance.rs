//! Applies a user's stored opt-in flag to their appearance record.
//!
//! The flag is the source of truth. A failed override leaves it untouched and
//! reports the failure to the caller; the next apply simply tries again.

use std::sync::Arc;

use bevy_reflect::TypeRegistry;
use thiserror::Error;
use tracing::debug;

use crate::capability::{report_once, CapabilityError, FailureSite};
use crate::host::HostObject;
use crate::override_config::OverrideConfig;
use crate::preferences::{PreferenceStore, UserId};
use crate::record_adapter::{CommitPath, RecordAdapter};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OverrideError {
    #[error("appearance record not reachable: {0}")]
    RecordNotFound(#[source] CapabilityError),
    #[error("target sub-field unavailable: {0}")]
    TargetField(#[source] CapabilityError),
    #[error("appearance record could not be rebuilt: {0}")]
    Rebuild(#[source] CapabilityError),
    #[error("rebuilt appearance record could not be committed: {0}")]
    Commit(#[source] CapabilityError),
}

impl OverrideError {
    pub fn site(&self) -> FailureSite {
        match self {
            OverrideError::RecordNotFound(_) => FailureSite::LocateRecord,
            OverrideError::TargetField(_) => FailureSite::ReadTargetField,
            OverrideError::Rebuild(_) => FailureSite::RebuildRecord,
            OverrideError::Commit(_) => FailureSite::CommitRecord,
        }
    }

    pub fn capability(&self) -> &CapabilityError {
        match self {
            OverrideError::RecordNotFound(err)
            | OverrideError::TargetField(err)
            | OverrideError::Rebuild(err)
            | OverrideError::Commit(err) => err,
        }
    }
}

/// Outcome of a successful override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedOverride {
    pub enabled: bool,
    /// Value written into the target sub-field.
    pub value: String,
    /// Whether this call captured the pre-override value.
    pub remembered: bool,
    pub path: CommitPath,
}

#[derive(Debug, Clone)]
pub struct AppearanceOverrideService {
    store: Arc<PreferenceStore>,
    adapter: RecordAdapter,
    config: Arc<OverrideConfig>,
}

impl AppearanceOverrideService {
    pub fn new(
        store: Arc<PreferenceStore>,
        config: Arc<OverrideConfig>,
        registry: Arc<TypeRegistry>,
    ) -> Self {
        let adapter = RecordAdapter::new(
            config.layout().clone(),
            config.commit().clone(),
            registry,
        );
        Self {
            store,
            adapter,
            config,
        }
    }

    pub fn store(&self) -> &Arc<PreferenceStore> {
        &self.store
    }

    pub fn adapter(&self) -> &RecordAdapter {
        &self.adapter
    }

    pub fn config(&self) -> &Arc<OverrideConfig> {
        &self.config
    }

    pub fn is_enabled(&self, user: UserId) -> bool {
        self.store.is_enabled(user)
    }

    pub fn set_enabled(&self, user: UserId, enabled: bool) {
        self.store.set_enabled(user, enabled);
    }

    pub fn toggle(&self, user: UserId) -> bool {
        self.store.toggle(user)
    }

    /// Rebuild the entity's appearance record with the value implied by the
    /// user's current flag and commit it.
    ///
    /// Safe to repeat: re-applying the same flag rewrites the same value.
    pub fn apply_override(
        &self,
        user: UserId,
        entity: &mut dyn HostObject,
    ) -> Result<AppliedOverride, OverrideError> {
        let result = self.try_apply(user, entity);
        match &result {
            Ok(applied) => debug!(
                target: "bodytypes::override",
                %user,
                enabled = applied.enabled,
                value = %applied.value,
                path = %applied.path,
                "override.applied"
            ),
            Err(err) => {
                report_once(err.site(), err.capability());
                debug!(
                    target: "bodytypes::override",
                    %user,
                    error = %err,
                    "override.failed"
                );
            }
        }
        result
    }

    fn try_apply(
        &self,
        user: UserId,
        entity: &mut dyn HostObject,
    ) -> Result<AppliedOverride, OverrideError> {
        let enabled = self.store.is_enabled(user);
        let captured = self
            .adapter
            .capture(entity)
            .map_err(OverrideError::RecordNotFound)?;
        let target = self.config.target_index().ok_or_else(|| {
            OverrideError::TargetField(CapabilityError::absent(format!(
                "{} sub-field `{}`",
                captured.type_name,
                self.config.target_field()
            )))
        })?;

        let mut remembered = false;
        let value = if enabled {
            let on_value = self.config.enabled_value();
            if let Some(current) = captured.snapshot.value_at(target) {
                if !current.is_empty() && current != on_value {
                    remembered = self.store.remember_original(user, current);
                }
            }
            on_value.to_string()
        } else {
            self.store
                .take_original_or_default(user, self.config.default_value())
        };

        let mut snapshot = captured.snapshot;
        snapshot
            .substitute(target, Some(value.clone()))
            .map_err(OverrideError::Rebuild)?;
        let record = self
            .adapter
            .reconstruct(captured.type_id, &captured.type_name, &snapshot)
            .map_err(OverrideError::Rebuild)?;
        self.adapter
            .verify_untouched(captured.original.as_ref(), record.as_ref(), target)
            .map_err(OverrideError::Rebuild)?;
        let path = self
            .adapter
            .commit(entity, record)
            .map_err(OverrideError::Commit)?;

        Ok(AppliedOverride {
            enabled,
            value,
            remembered,
            path,
        })
    }
}

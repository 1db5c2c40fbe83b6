//! Per-user body type preference and appearance override.
//!
//! Users opt in or out with `/bodytype`. While opted in, one sub-field of
//! their appearance record is replaced by a fixed value and every other
//! sub-field is carried over unchanged; opting out restores the value seen
//! before the override. The host's record and message APIs are reached
//! through capability probes ([`host::HostObject`], [`host::ChatMessage`])
//! so a missing capability degrades to "not applied" instead of failing.

pub mod affordance;
pub mod appearance;
pub mod capability;
pub mod chat;
pub mod commands;
pub mod host;
pub mod override_config;
pub mod preferences;
pub mod record_adapter;

pub use affordance::{AffordanceAttacher, AffordanceConfig, ClickBinding};
pub use appearance::{AppearanceOverrideService, AppliedOverride, OverrideError};
pub use capability::{report_once, CapabilityError, FailureSite};
pub use commands::{
    execute_mode, handle_page_action, CommandReply, PageOutcome, StatusLabel,
    APPLY_FAILED_NOTICE,
};
pub use override_config::{
    command_bind_from_env, load_override_config_from_env, state_path_from_env, OverrideConfig,
    OverrideConfigError, OverrideConfigMetadata, BUILTIN_OVERRIDE_CONFIG,
};
pub use preferences::{PersistedState, PersistenceError, PreferenceEntry, PreferenceStore, UserId};
pub use record_adapter::{
    CapturedRecord, CommitPath, CommitProbe, FieldSpec, RecordAdapter, RecordLayout,
    RecordLocation, Snapshot,
};

//! `/bodytype <mode>` and page button handling.
//!
//! Every mode except `status` re-applies the override after updating the
//! flag. A failed override is reported to the user but never rolls the flag
//! back.

use bodytype_runtime::{Mode, PageAction};
use tracing::info;

use crate::affordance::AffordanceAttacher;
use crate::appearance::{AppearanceOverrideService, AppliedOverride, OverrideError};
use crate::chat::{error_line, state_label, HEADER_PREFIX};
use crate::host::{ChatMessage, HostObject};
use crate::preferences::UserId;

pub const REPLY_ON_COLOR: &str = "#4aff7f";
pub const REPLY_OFF_COLOR: &str = "#ff6b6b";
pub const REPLY_APPLY_COLOR: &str = "#cbd5e0";
pub const APPLIED_TEXT: &str = "Applied current body type state.";
pub const APPLY_FAILED_NOTICE: &str = "Body type change could not be applied right now.";

pub fn reply_color(enabled: bool) -> &'static str {
    if enabled {
        REPLY_ON_COLOR
    } else {
        REPLY_OFF_COLOR
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandReply {
    pub text: String,
    pub color: &'static str,
    /// Override outcome, when the command re-applied it.
    pub applied: Option<Result<AppliedOverride, OverrideError>>,
}

impl CommandReply {
    pub fn override_failed(&self) -> bool {
        matches!(self.applied, Some(Err(_)))
    }

    /// The reply line, followed by a failure notice when the override did not
    /// take.
    pub fn to_messages<M: ChatMessage>(&self, attacher: &AffordanceAttacher) -> Vec<M> {
        let mut line = M::raw(&self.text);
        attacher.apply_color(&mut line, self.color);
        let mut lines = vec![line];
        if self.override_failed() {
            lines.push(error_line(attacher, APPLY_FAILED_NOTICE));
        }
        lines
    }
}

pub fn execute_mode(
    service: &AppearanceOverrideService,
    mode: Mode,
    user: UserId,
    entity: &mut dyn HostObject,
) -> CommandReply {
    match mode {
        Mode::On => service.set_enabled(user, true),
        Mode::Off => service.set_enabled(user, false),
        Mode::Toggle => {
            service.toggle(user);
        }
        Mode::Status | Mode::Apply => {}
    }

    let applied = mode
        .applies_override()
        .then(|| service.apply_override(user, entity));
    let enabled = service.is_enabled(user);
    info!(
        target: "bodytypes::command",
        %user,
        %mode,
        enabled,
        applied = applied.as_ref().map(Result::is_ok),
        "command.executed"
    );

    let (text, color) = match mode {
        Mode::Apply => (APPLIED_TEXT.to_string(), REPLY_APPLY_COLOR),
        _ => (
            format!("{HEADER_PREFIX}{}", state_label(enabled)),
            reply_color(enabled),
        ),
    };
    CommandReply {
        text,
        color,
        applied,
    }
}

/// Status label shown on the page after a button press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLabel {
    pub text: String,
    pub color: &'static str,
}

impl StatusLabel {
    pub fn for_state(enabled: bool) -> Self {
        Self {
            text: format!("Status: {}", state_label(enabled)),
            color: reply_color(enabled),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    /// The flag changed; the page should redraw its label.
    Updated {
        reply: CommandReply,
        status: StatusLabel,
    },
    Closed,
    /// Unknown or missing action.
    Ignored,
}

pub fn handle_page_action(
    service: &AppearanceOverrideService,
    action: Option<PageAction>,
    user: UserId,
    entity: &mut dyn HostObject,
) -> PageOutcome {
    let Some(action) = action else {
        return PageOutcome::Ignored;
    };
    match action {
        PageAction::Enable => service.set_enabled(user, true),
        PageAction::Disable => service.set_enabled(user, false),
        PageAction::Toggle => {
            service.toggle(user);
        }
        PageAction::Close => return PageOutcome::Closed,
    }

    let applied = service.apply_override(user, entity);
    let enabled = service.is_enabled(user);
    info!(
        target: "bodytypes::command",
        %user,
        action = action.as_str(),
        enabled,
        applied = applied.is_ok(),
        "page.action"
    );

    let word = if enabled { "enabled" } else { "disabled" };
    PageOutcome::Updated {
        reply: CommandReply {
            text: format!("Body types: {word}"),
            color: reply_color(enabled),
            applied: Some(applied),
        },
        status: StatusLabel::for_state(enabled),
    }
}

//! Chat lines showing a user's state, with clickable buttons where the host
//! supports them.

use bodytype_runtime::{Mode, COMMAND_NAME};

use crate::affordance::AffordanceAttacher;
use crate::host::ChatMessage;

pub const HEADER_PREFIX: &str = "Body Types: ";
pub const STATE_ON_COLOR: &str = "#55FF55";
pub const STATE_OFF_COLOR: &str = "#FF5555";
pub const TOGGLE_COLOR: &str = "#AAAAFF";
pub const ERROR_COLOR: &str = "#FF5555";
pub const BUTTON_SPACER: &str = "  ";

pub fn state_label(enabled: bool) -> &'static str {
    if enabled {
        "ON"
    } else {
        "OFF"
    }
}

/// `Body Types: ON`, with the state colored.
pub fn header_line<M: ChatMessage>(attacher: &AffordanceAttacher, enabled: bool) -> M {
    let color = if enabled {
        STATE_ON_COLOR
    } else {
        STATE_OFF_COLOR
    };
    let mut state = M::raw(state_label(enabled));
    attacher.apply_color(&mut state, color);
    M::raw(HEADER_PREFIX).insert(state)
}

/// `[ Enable ]  [ Disable ]  [ Toggle ]`, each running its `/bodytype` mode.
pub fn buttons_line<M: ChatMessage>(attacher: &AffordanceAttacher, enabled: bool) -> M {
    let current = format!("Currently {}", state_label(enabled));
    let button = |label: &str, color: &str, mode: Mode, verb: &str| -> M {
        attacher.button(
            label,
            color,
            &format!("/{COMMAND_NAME} {mode}"),
            &format!("{verb} body types ({current})"),
        )
    };

    M::raw("")
        .insert(button("[ Enable ]", STATE_ON_COLOR, Mode::On, "Enable"))
        .insert(AffordanceAttacher::spacer(BUTTON_SPACER))
        .insert(button("[ Disable ]", STATE_OFF_COLOR, Mode::Off, "Disable"))
        .insert(AffordanceAttacher::spacer(BUTTON_SPACER))
        .insert(button("[ Toggle ]", TOGGLE_COLOR, Mode::Toggle, "Toggle"))
}

pub fn error_line<M: ChatMessage>(attacher: &AffordanceAttacher, text: &str) -> M {
    let mut line = M::raw(text);
    attacher.apply_color(&mut line, ERROR_COLOR);
    line
}

/// Header followed by the button row.
pub fn status_lines<M: ChatMessage>(attacher: &AffordanceAttacher, enabled: bool) -> Vec<M> {
    vec![
        header_line(attacher, enabled),
        buttons_line(attacher, enabled),
    ]
}

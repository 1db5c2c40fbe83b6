//! Shared runtime utilities for the body type toggle.
//!
//! Holds the text grammar of the `/bodytype` command and the page action
//! payloads so that hosts and tools can speak them without pulling in the
//! Bevy-backed core crate.

mod command_text;
mod page;

pub use command_text::{
    parse_bodytype_command, parse_mode, BodyTypeCommand, CommandParseError, Mode, COMMAND_NAME,
    USAGE,
};
pub use page::{PageAction, PageEventData};

//! Clickable and hoverable chat buttons on a message type whose API varies
//! between host versions.

use std::borrow::Cow;
use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use crate::capability::{probe_first, report_once, CapabilityError, FailureSite};
use crate::host::{ActionKind, ChatMessage, MessageArg, MessageMethod, MessageParam};

/// Candidate names probed on the message type.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AffordanceConfig {
    color_methods: Vec<String>,
    hover_methods: Vec<String>,
    hover_text_methods: Vec<String>,
    run_command_constants: Vec<String>,
    click_method_hints: Vec<String>,
    direct_click_methods: Vec<String>,
}

impl Default for AffordanceConfig {
    fn default() -> Self {
        let owned = |names: &[&str]| -> Vec<String> { names.iter().map(|n| n.to_string()).collect() };
        Self {
            color_methods: owned(&["color"]),
            hover_methods: owned(&["hover", "on_hover"]),
            hover_text_methods: owned(&["hover_text"]),
            run_command_constants: owned(&["RUN_COMMAND", "RUNCOMMAND", "EXECUTE_COMMAND"]),
            click_method_hints: owned(&["click", "on_click", "set_click", "action", "with_click"]),
            direct_click_methods: owned(&[
                "run_command",
                "click_run_command",
                "on_click_run_command",
                "command",
                "on_click",
            ]),
        }
    }
}

impl AffordanceConfig {
    pub fn hover_methods(&self) -> &[String] {
        &self.hover_methods
    }

    pub fn run_command_constants(&self) -> &[String] {
        &self.run_command_constants
    }

    pub fn direct_click_methods(&self) -> &[String] {
        &self.direct_click_methods
    }
}

/// How a run-command click was attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickBinding {
    /// Through a two-argument method taking an action constant and the command.
    Action {
        method: String,
        kind: String,
        constant: String,
    },
    /// Through a single-argument method taking the command.
    Direct { method: String },
}

/// Attaches click and hover behaviour to outbound messages.
#[derive(Debug, Clone, Default)]
pub struct AffordanceAttacher {
    config: Arc<AffordanceConfig>,
}

impl AffordanceAttacher {
    pub fn new(config: AffordanceConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &AffordanceConfig {
        &self.config
    }

    /// Build a button: colored label, optional hover text, optional click
    /// command. Missing capabilities leave the label as plain text.
    pub fn button<M: ChatMessage>(&self, label: &str, color: &str, command: &str, hover: &str) -> M {
        let mut message = M::raw(label);
        if !color.is_empty() {
            self.apply_color(&mut message, color);
        }
        if !hover.is_empty() {
            self.attach_hover(&mut message, hover);
        }
        if !command.is_empty() {
            match self.attach_run_command(&mut message, command) {
                Ok(binding) => debug!(
                    target: "bodytypes::adapter",
                    label,
                    command,
                    ?binding,
                    "button.click_bound"
                ),
                Err(err) => debug!(
                    target: "bodytypes::adapter",
                    label,
                    command,
                    error = %err,
                    "button.click_unavailable"
                ),
            }
        }
        message
    }

    pub fn spacer<M: ChatMessage>(text: &str) -> M {
        M::raw(text)
    }

    pub fn apply_color<M: ChatMessage>(&self, message: &mut M, color: &str) -> bool {
        let methods = message.methods();
        let result = probe_first("message color", &self.config.color_methods, |name| {
            let method = find_method(&methods, name, &[MessageParam::Text])?;
            call_or_reject(message, method, vec![MessageArg::Text(color.to_string())])
        });
        match result {
            Ok(_) => true,
            Err(err) => {
                report_once(FailureSite::MessageColor, &err);
                false
            }
        }
    }

    /// Attach hover text. Absence is silently accepted.
    pub fn attach_hover<M: ChatMessage>(&self, message: &mut M, hover: &str) -> bool {
        let methods = message.methods();
        let as_message = probe_first("message hover", &self.config.hover_methods, |name| {
            let method = find_method(&methods, name, &[MessageParam::Message])?;
            call_or_reject(message, method, vec![MessageArg::Message(M::raw(hover))])
        });
        if as_message.is_ok() {
            return true;
        }
        probe_first("message hover text", &self.config.hover_text_methods, |name| {
            let method = find_method(&methods, name, &[MessageParam::Text])?;
            call_or_reject(message, method, vec![MessageArg::Text(hover.to_string())])
        })
        .is_ok()
    }

    /// Make `message` run `command` when clicked.
    pub fn attach_run_command<M: ChatMessage>(
        &self,
        message: &mut M,
        command: &str,
    ) -> Result<ClickBinding, CapabilityError> {
        if let Ok(binding) = self.attach_action_click(message, command) {
            return Ok(binding);
        }

        let methods = message.methods();
        let direct = probe_first("direct click", &self.config.direct_click_methods, |name| {
            let method = find_method(&methods, name, &[MessageParam::Text])?;
            call_or_reject(message, method, vec![MessageArg::Text(command.to_string())])
        });

        direct
            .map(|method| ClickBinding::Direct { method })
            .map_err(|_| {
                let err = CapabilityError::absent(format!(
                    "run-command click; related methods: [{}]",
                    describe_related(&methods)
                ));
                report_once(FailureSite::MessageClick, &err);
                err
            })
    }

    fn attach_action_click<M: ChatMessage>(
        &self,
        message: &mut M,
        command: &str,
    ) -> Result<ClickBinding, CapabilityError> {
        let kinds = message.action_kinds();
        let (kind, constant) = self.find_run_command_constant(&kinds)?;

        let methods = message.methods();
        let wanted = [MessageParam::Enum(kind.clone()), MessageParam::Text];
        let compatible: Vec<&MessageMethod> =
            methods.iter().filter(|m| m.params == wanted).collect();
        let method = compatible
            .iter()
            .find(|m| contains_any(&m.name, &self.config.click_method_hints))
            .or_else(|| compatible.last())
            .copied()
            .ok_or_else(|| CapabilityError::absent(format!("({kind}, text) click method")))?;

        let args = vec![
            MessageArg::Constant {
                kind: kind.clone(),
                name: constant.clone(),
            },
            MessageArg::Text(command.to_string()),
        ];
        if !message.call(&method.name, args) {
            return Err(CapabilityError::mismatch(
                method.name.to_string(),
                "host rejected the click arguments",
            ));
        }
        Ok(ClickBinding::Action {
            method: method.name.to_string(),
            kind: kind.into_owned(),
            constant: constant.into_owned(),
        })
    }

    /// Nested enum holding a run-command constant, with the constant's
    /// declared spelling.
    fn find_run_command_constant(
        &self,
        kinds: &[ActionKind],
    ) -> Result<(Cow<'static, str>, Cow<'static, str>), CapabilityError> {
        kinds
            .iter()
            .find_map(|kind| {
                kind.constants
                    .iter()
                    .find(|constant| {
                        self.config
                            .run_command_constants
                            .iter()
                            .any(|wanted| constant.eq_ignore_ascii_case(wanted))
                    })
                    .map(|constant| (kind.name.clone(), constant.clone()))
            })
            .ok_or_else(|| CapabilityError::absent("run-command action constant"))
    }
}

fn find_method<'m>(
    methods: &'m [MessageMethod],
    name: &str,
    params: &[MessageParam],
) -> Result<&'m MessageMethod, CapabilityError> {
    let named: Vec<&MessageMethod> = methods.iter().filter(|m| m.name == name).collect();
    if named.is_empty() {
        return Err(CapabilityError::absent(name.to_string()));
    }
    named
        .into_iter()
        .find(|m| m.params == params)
        .ok_or_else(|| CapabilityError::mismatch(name.to_string(), format!("no overload taking {params:?}")))
}

fn call_or_reject<M: ChatMessage>(
    message: &mut M,
    method: &MessageMethod,
    args: Vec<MessageArg<M>>,
) -> Result<String, CapabilityError> {
    if message.call(&method.name, args) {
        Ok(method.name.to_string())
    } else {
        Err(CapabilityError::mismatch(
            method.name.to_string(),
            "host rejected the arguments",
        ))
    }
}

fn contains_any(name: &str, hints: &[String]) -> bool {
    let lowered = name.to_lowercase();
    hints.iter().any(|hint| lowered.contains(&hint.to_lowercase()))
}

fn describe_related(methods: &[MessageMethod]) -> String {
    methods
        .iter()
        .filter(|m| {
            let name = m.name.to_lowercase();
            ["click", "hover", "command", "action"]
                .iter()
                .any(|needle| name.contains(needle))
        })
        .map(|m| format!("{}{:?}", m.name, m.params))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::text::{ClickAction, TextMessage};

    /// Message double whose API surface is configured per test.
    #[derive(Debug, Default)]
    struct Probe {
        text: String,
        kinds: Vec<ActionKind>,
        methods: Vec<MessageMethod>,
        calls: Vec<String>,
        hover: Option<String>,
        click: Option<String>,
    }

    impl ChatMessage for Probe {
        fn raw(text: &str) -> Self {
            Probe {
                text: text.to_string(),
                ..Probe::default()
            }
        }

        fn insert(mut self, child: Self) -> Self {
            self.text.push_str(&child.text);
            self
        }

        fn action_kinds(&self) -> Vec<ActionKind> {
            self.kinds.clone()
        }

        fn methods(&self) -> Vec<MessageMethod> {
            self.methods.clone()
        }

        fn call(&mut self, method: &str, args: Vec<MessageArg<Self>>) -> bool {
            self.calls.push(method.to_string());
            for arg in args {
                match arg {
                    MessageArg::Message(inner) => self.hover = Some(inner.text),
                    MessageArg::Text(text) if method.contains("hover") => self.hover = Some(text),
                    MessageArg::Text(text) => self.click = Some(text),
                    MessageArg::Constant { .. } => {}
                }
            }
            true
        }
    }

    fn text_method(name: &'static str) -> MessageMethod {
        MessageMethod::new(name, vec![MessageParam::Text])
    }

    fn click_kind() -> ActionKind {
        ActionKind {
            name: "ClickAction".into(),
            constants: vec!["OPEN_URL".into(), "run_command".into()],
        }
    }

    fn action_method(name: &'static str) -> MessageMethod {
        MessageMethod::new(
            name,
            vec![MessageParam::Enum("ClickAction".into()), MessageParam::Text],
        )
    }

    #[test]
    fn enum_click_prefers_hinted_method() {
        let attacher = AffordanceAttacher::default();
        let mut msg = Probe {
            kinds: vec![click_kind()],
            methods: vec![action_method("bind"), action_method("with_click")],
            ..Probe::default()
        };
        let binding = attacher.attach_run_command(&mut msg, "/bodytype on").unwrap();
        assert_eq!(
            binding,
            ClickBinding::Action {
                method: "with_click".into(),
                kind: "ClickAction".into(),
                constant: "run_command".into(),
            }
        );
        assert_eq!(msg.click.as_deref(), Some("/bodytype on"));
    }

    #[test]
    fn enum_click_falls_back_to_last_compatible_method() {
        let attacher = AffordanceAttacher::default();
        let mut msg = Probe {
            kinds: vec![click_kind()],
            methods: vec![action_method("bind"), action_method("attach")],
            ..Probe::default()
        };
        let binding = attacher.attach_run_command(&mut msg, "/bodytype").unwrap();
        assert!(matches!(binding, ClickBinding::Action { ref method, .. } if method == "attach"));
    }

    #[test]
    fn direct_click_is_used_without_action_enum() {
        let attacher = AffordanceAttacher::default();
        let mut msg = Probe {
            methods: vec![text_method("command"), text_method("on_click")],
            ..Probe::default()
        };
        let binding = attacher.attach_run_command(&mut msg, "/bodytype off").unwrap();
        assert_eq!(
            binding,
            ClickBinding::Direct {
                method: "command".into()
            }
        );
    }

    #[test]
    fn no_click_capability_leaves_plain_text() {
        let attacher = AffordanceAttacher::default();
        let mut msg = Probe {
            methods: vec![MessageMethod::new("on_click", vec![MessageParam::Message])],
            ..Probe::default()
        };
        let err = attacher.attach_run_command(&mut msg, "/bodytype").unwrap_err();
        assert!(err.to_string().contains("on_click"));
        assert!(msg.calls.is_empty());
    }

    #[test]
    fn hover_prefers_message_argument_then_text() {
        let attacher = AffordanceAttacher::default();
        let mut with_message = Probe {
            methods: vec![
                text_method("hover_text"),
                MessageMethod::new("on_hover", vec![MessageParam::Message]),
            ],
            ..Probe::default()
        };
        assert!(attacher.attach_hover(&mut with_message, "Currently ON"));
        assert_eq!(with_message.calls, vec!["on_hover".to_string()]);

        let mut text_only = Probe {
            methods: vec![text_method("hover_text")],
            ..Probe::default()
        };
        assert!(attacher.attach_hover(&mut text_only, "Currently OFF"));
        assert_eq!(text_only.hover.as_deref(), Some("Currently OFF"));

        let mut neither = Probe::default();
        assert!(!attacher.attach_hover(&mut neither, "ignored"));
    }

    #[test]
    fn color_and_click_probe_independently() {
        let attacher = AffordanceAttacher::default();
        let mut button = Probe::raw("[ Enable ]");
        button.methods = vec![text_method("color"), text_method("run_command")];
        assert!(attacher.apply_color(&mut button, "#55FF55"));
        attacher.attach_run_command(&mut button, "/bodytype on").unwrap();
        assert_eq!(button.calls, vec!["color".to_string(), "run_command".to_string()]);
    }

    #[test]
    fn button_without_extras_is_plain_text() {
        let attacher = AffordanceAttacher::default();
        let plain: Probe = attacher.button("[ Toggle ]", "", "", "");
        assert_eq!(plain.text, "[ Toggle ]");
        assert!(plain.calls.is_empty());
    }

    #[test]
    fn button_carries_color_hover_and_click_on_text_messages() {
        let attacher = AffordanceAttacher::default();
        let button: TextMessage =
            attacher.button("[ On ]", "#55FF55", "/bodytype on", "Enable body types");
        assert_eq!(button.color(), Some("#55FF55"));
        assert_eq!(
            button.hover().map(TextMessage::plain).as_deref(),
            Some("Enable body types")
        );
        assert_eq!(button.click(), Some((ClickAction::RunCommand, "/bodytype on")));
    }

    #[test]
    fn button_keeps_its_label_when_no_click_can_be_bound() {
        let attacher = AffordanceAttacher::default();
        let plain: Probe = attacher.button("[ Off ]", "", "/bodytype off", "");
        assert_eq!(plain.text, "[ Off ]");
        assert_eq!(plain.click, None);
        assert!(plain.calls.is_empty());
    }
}

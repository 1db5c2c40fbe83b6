//! Plain-text chat messages for hosts that talk over a line protocol.

use std::borrow::Cow;
use std::fmt;

use super::{ActionKind, ChatMessage, MessageArg, MessageMethod, MessageParam};

/// What clicking a fragment does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickAction {
    RunCommand,
    SuggestCommand,
    OpenUrl,
}

impl ClickAction {
    pub const KIND: &'static str = "ClickAction";
    pub const ALL: [ClickAction; 3] = [
        ClickAction::RunCommand,
        ClickAction::SuggestCommand,
        ClickAction::OpenUrl,
    ];

    pub fn constant(self) -> &'static str {
        match self {
            ClickAction::RunCommand => "RUN_COMMAND",
            ClickAction::SuggestCommand => "SUGGEST_COMMAND",
            ClickAction::OpenUrl => "OPEN_URL",
        }
    }

    pub fn from_constant(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|action| action.constant() == name)
    }
}

/// A message fragment with optional styling and child fragments.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TextMessage {
    text: String,
    color: Option<String>,
    hover: Option<Box<TextMessage>>,
    click: Option<(ClickAction, String)>,
    children: Vec<TextMessage>,
}

impl TextMessage {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn color(&self) -> Option<&str> {
        self.color.as_deref()
    }

    pub fn hover(&self) -> Option<&TextMessage> {
        self.hover.as_deref()
    }

    pub fn click(&self) -> Option<(ClickAction, &str)> {
        self.click
            .as_ref()
            .map(|(action, value)| (*action, value.as_str()))
    }

    pub fn children(&self) -> &[TextMessage] {
        &self.children
    }

    /// Visible text of this fragment and its children.
    pub fn plain(&self) -> String {
        let mut out = String::new();
        self.write_plain(&mut out);
        out
    }

    fn write_plain(&self, out: &mut String) {
        out.push_str(&self.text);
        for child in &self.children {
            child.write_plain(out);
        }
    }

    /// Fragments that run a command when clicked, depth first.
    pub fn commands(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_commands(&mut out);
        out
    }

    fn collect_commands<'a>(&'a self, out: &mut Vec<&'a str>) {
        if let Some((ClickAction::RunCommand, command)) = &self.click {
            out.push(command);
        }
        for child in &self.children {
            child.collect_commands(out);
        }
    }
}

/// Annotated rendering: `{#55FF55 text}` for color, `<cmd>` for click
/// commands, `(hover)` for hover text.
impl fmt::Display for TextMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.color {
            Some(color) => write!(f, "{{{color} {}}}", self.text)?,
            None => f.write_str(&self.text)?,
        }
        if let Some((action, value)) = &self.click {
            match action {
                ClickAction::RunCommand => write!(f, "<{value}>")?,
                other => write!(f, "<{}:{value}>", other.constant())?,
            }
        }
        if let Some(hover) = &self.hover {
            write!(f, "({})", hover.plain())?;
        }
        for child in &self.children {
            write!(f, "{child}")?;
        }
        Ok(())
    }
}

impl ChatMessage for TextMessage {
    fn raw(text: &str) -> Self {
        Self {
            text: text.to_string(),
            ..Self::default()
        }
    }

    fn insert(mut self, child: Self) -> Self {
        self.children.push(child);
        self
    }

    fn action_kinds(&self) -> Vec<ActionKind> {
        vec![ActionKind {
            name: Cow::Borrowed(ClickAction::KIND),
            constants: ClickAction::ALL
                .iter()
                .map(|action| Cow::Borrowed(action.constant()))
                .collect(),
        }]
    }

    fn methods(&self) -> Vec<MessageMethod> {
        vec![
            MessageMethod::new("color", vec![MessageParam::Text]),
            MessageMethod::new("hover", vec![MessageParam::Message]),
            MessageMethod::new(
                "click",
                vec![
                    MessageParam::Enum(Cow::Borrowed(ClickAction::KIND)),
                    MessageParam::Text,
                ],
            ),
        ]
    }

    fn call(&mut self, method: &str, args: Vec<MessageArg<Self>>) -> bool {
        let mut args = args.into_iter();
        let (first, second) = (args.next(), args.next());
        if args.next().is_some() {
            return false;
        }
        match (method, first, second) {
            ("color", Some(MessageArg::Text(color)), None) => {
                self.color = Some(color);
                true
            }
            ("hover", Some(MessageArg::Message(hover)), None) => {
                self.hover = Some(Box::new(hover));
                true
            }
            ("click", Some(MessageArg::Constant { kind, name }), Some(MessageArg::Text(value)))
                if kind == ClickAction::KIND =>
            {
                match ClickAction::from_constant(&name) {
                    Some(action) => {
                        self.click = Some((action, value));
                        true
                    }
                    None => false,
                }
            }
            _ => false,
        }
    }
}

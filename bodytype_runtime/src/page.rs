use serde::Deserialize;

/// Button activation reported by the toggle page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageAction {
    Enable,
    Disable,
    Toggle,
    Close,
}

impl PageAction {
    /// Map the `Action` value bound to a page button. Unknown values are ignored.
    pub fn parse(action: &str) -> Option<Self> {
        match action {
            "Enable" => Some(PageAction::Enable),
            "Disable" => Some(PageAction::Disable),
            "Toggle" => Some(PageAction::Toggle),
            "Close" => Some(PageAction::Close),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PageAction::Enable => "Enable",
            PageAction::Disable => "Disable",
            PageAction::Toggle => "Toggle",
            PageAction::Close => "Close",
        }
    }
}

/// Event payload the page sends back when a bound button is activated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PageEventData {
    #[serde(rename = "Action", default)]
    pub action: Option<String>,
}

impl PageEventData {
    pub fn page_action(&self) -> Option<PageAction> {
        self.action.as_deref().and_then(PageAction::parse)
    }
}

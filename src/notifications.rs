//! Status indicator for the background task
//!
//! Describes the indicator channel registration and renders the persistent,
//! non-dismissible notice the OS requires while a background task runs.

use serde::{Deserialize, Serialize};

use crate::core::StartParameters;

/// Glyph shown on every indicator, independent of the caller's icon reference
pub const INDICATOR_GLYPH: &str = "ic_menu_mylocation";

/// Channel importance level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Importance {
    Min,
    #[default]
    Low,
    Default,
    High,
}

/// Lock screen visibility of indicators posted to a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Private,
    Public,
    Secret,
}

/// Notice category the OS uses for ranking and grouping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Service,
}

/// Registration describing the category of the status indicator.
///
/// The OS deduplicates by `id`, so registering the same channel repeatedly is
/// harmless.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusIndicatorChannel {
    pub id: String,
    pub name: String,
    pub description: String,
    pub importance: Importance,
    pub visibility: Visibility,
    pub show_badge: bool,
}

impl Default for StatusIndicatorChannel {
    fn default() -> Self {
        Self {
            id: "background_location_channel".to_string(),
            name: "Background Location Service".to_string(),
            description: "Channel for background location tracking".to_string(),
            importance: Importance::Low,
            visibility: Visibility::Private,
            show_badge: false,
        }
    }
}

/// Opaque reference to the caller's primary UI entry point.
///
/// Only ever used as the tap target of an indicator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryPoint(String);

impl EntryPoint {
    pub fn new(target: impl Into<String>) -> Self {
        Self(target.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A rendered status indicator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusIndicator {
    /// Indicator slot id; re-posting with the same id replaces in place
    pub id: u32,
    pub channel_id: String,
    pub title: String,
    pub content: String,
    pub small_icon: String,
    pub tap_target: EntryPoint,
    /// Non-dismissible while set
    pub ongoing: bool,
    pub priority: Importance,
    pub category: Category,
}

impl StatusIndicator {
    /// Render the indicator for a set of start parameters.
    ///
    /// Pure: the result depends only on the arguments.
    pub fn render(
        id: u32,
        channel: &StatusIndicatorChannel,
        params: &StartParameters,
        tap_target: EntryPoint,
    ) -> Self {
        Self {
            id,
            channel_id: channel.id.clone(),
            title: params.title.clone(),
            content: params.content.clone(),
            small_icon: INDICATOR_GLYPH.to_string(),
            tap_target,
            ongoing: true,
            priority: Importance::Low,
            category: Category::Service,
        }
    }

    /// Whether the indicator shows the given parameters
    pub fn shows(&self, params: &StartParameters) -> bool {
        self.title == params.title && self.content == params.content
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> EntryPoint {
        EntryPoint::new("app://main")
    }

    #[test]
    fn test_render_binds_parameters() {
        let channel = StatusIndicatorChannel::default();
        let params = StartParameters::new("Trip", "Sharing your trip", "ic_car");
        let indicator = StatusIndicator::render(1001, &channel, &params, entry());

        assert_eq!(indicator.id, 1001);
        assert_eq!(indicator.channel_id, "background_location_channel");
        assert_eq!(indicator.title, "Trip");
        assert_eq!(indicator.content, "Sharing your trip");
        assert_eq!(indicator.tap_target, entry());
        assert!(indicator.shows(&params));
    }

    #[test]
    fn test_render_is_non_dismissible_low_priority_service() {
        let indicator = StatusIndicator::render(
            7,
            &StatusIndicatorChannel::default(),
            &StartParameters::default(),
            entry(),
        );
        assert!(indicator.ongoing);
        assert_eq!(indicator.priority, Importance::Low);
        assert_eq!(indicator.category, Category::Service);
    }

    #[test]
    fn test_glyph_ignores_icon_reference() {
        let channel = StatusIndicatorChannel::default();
        let a = StatusIndicator::render(1, &channel, &StartParameters::new("T", "C", "a"), entry());
        let b = StatusIndicator::render(1, &channel, &StartParameters::new("T", "C", "b"), entry());
        assert_eq!(a.small_icon, INDICATOR_GLYPH);
        assert_eq!(a, b);
    }

    #[test]
    fn test_channel_defaults() {
        let channel = StatusIndicatorChannel::default();
        assert_eq!(channel.name, "Background Location Service");
        assert_eq!(channel.importance, Importance::Low);
        assert!(!channel.show_badge);
    }
}

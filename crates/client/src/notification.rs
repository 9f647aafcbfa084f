//! Push payloads and notification clicks.
//!
//! A push payload is shallow-merged over the configured defaults, then the
//! `type` field picks the action buttons. Clicks resolve to a deep link or
//! to "just close".

use pwacache_core::NotificationDefaults;
use serde::Serialize;
use serde_json::{Map, Value, json};

/// Vibration pattern used for every notification.
const VIBRATE: [u32; 3] = [100, 50, 100];

/// A button on a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
    pub icon: String,
}

impl NotificationAction {
    fn new(action: &str, title: &str, icon: &str) -> Self {
        Self { action: action.into(), title: title.into(), icon: icon.into() }
    }
}

/// Notification ready to show.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub tag: String,
    pub renotify: bool,
    pub require_interaction: bool,
    pub vibrate: Vec<u32>,
    pub data: Value,
    pub actions: Vec<NotificationAction>,
}

/// Category carried in the payload's `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushKind {
    StreakReminder,
    BattleUpdate,
    Nudge,
    FriendActivity,
    Other,
}

impl PushKind {
    pub fn parse(kind: Option<&str>) -> Self {
        match kind {
            Some("streak-reminder") => PushKind::StreakReminder,
            Some("battle-update") => PushKind::BattleUpdate,
            Some("nudge") => PushKind::Nudge,
            Some("friend-activity") => PushKind::FriendActivity,
            _ => PushKind::Other,
        }
    }

    fn actions(&self) -> Vec<NotificationAction> {
        match self {
            PushKind::StreakReminder => vec![
                NotificationAction::new("log", "📋 Log Game", "/icons/action-log.png"),
                NotificationAction::new("snooze", "⏰ Later", "/icons/action-snooze.png"),
            ],
            PushKind::BattleUpdate => vec![
                NotificationAction::new("view-battle", "⚔️ View", "/icons/action-battle.png"),
                NotificationAction::new("dismiss", "Dismiss", "/icons/action-dismiss.png"),
            ],
            PushKind::Nudge => vec![
                NotificationAction::new("log", "🎮 Play Now", "/icons/action-play.png"),
                NotificationAction::new("dismiss", "Later", "/icons/action-dismiss.png"),
            ],
            PushKind::FriendActivity => {
                vec![NotificationAction::new("view-friends", "👥 See Friends", "/icons/action-friends.png")]
            }
            PushKind::Other => Vec::new(),
        }
    }

    fn requires_interaction(&self) -> bool {
        matches!(self, PushKind::StreakReminder | PushKind::Nudge)
    }
}

fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

fn text_field(payload: &Map<String, Value>, key: &str) -> Option<String> {
    match payload.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// Parse a raw push payload into a JSON object.
///
/// Absent, empty or unparseable payloads yield `None` and the defaults are
/// shown; a parse failure is logged.
pub fn parse_payload(raw: Option<&str>) -> Option<Map<String, Value>> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Some(map),
        Ok(other) => {
            tracing::warn!("push payload is not an object ({other}), using defaults");
            None
        }
        Err(e) => {
            tracing::warn!("push data parse error: {e}, using defaults");
            None
        }
    }
}

/// Build the notification for a push event.
pub fn build_notification(defaults: &NotificationDefaults, payload: Option<&Map<String, Value>>) -> Notification {
    let empty = Map::new();
    let payload = payload.unwrap_or(&empty);

    let non_empty = |key: &str, fallback: &str| {
        text_field(payload, key)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| fallback.to_string())
    };

    let data = match payload.get("data") {
        Some(value) if truthy(Some(value)) => value.clone(),
        _ => json!({ "url": defaults.url }),
    };

    let kind = PushKind::parse(payload.get("type").and_then(Value::as_str));

    Notification {
        title: text_field(payload, "title").unwrap_or_else(|| defaults.title.clone()),
        body: text_field(payload, "body").unwrap_or_else(|| defaults.body.clone()),
        icon: non_empty("icon", &defaults.icon),
        badge: non_empty("badge", &defaults.badge),
        tag: non_empty("tag", &defaults.tag),
        renotify: true,
        require_interaction: kind.requires_interaction() || truthy(payload.get("requireInteraction")),
        vibrate: VIBRATE.to_vec(),
        data,
        actions: kind.actions(),
    }
}

/// What a click on a notification should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickTarget {
    /// Close without navigating.
    Close,
    /// Focus the app, or open it at this path.
    Navigate(String),
}

/// Map an action code (empty for a click on the body) to a target.
///
/// Unknown codes behave like a body click. `snooze` is a plain close.
pub fn resolve_click(action: &str, data: &Value) -> ClickTarget {
    match action {
        "log" => ClickTarget::Navigate("/?action=log".into()),
        "view-battle" => ClickTarget::Navigate("/?tab=social&view=battles".into()),
        "view-friends" => ClickTarget::Navigate("/?tab=social&view=friends".into()),
        "snooze" | "dismiss" => ClickTarget::Close,
        _ => ClickTarget::Navigate(
            data.get("url")
                .and_then(Value::as_str)
                .filter(|u| !u.is_empty())
                .unwrap_or("/")
                .to_string(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> NotificationDefaults {
        NotificationDefaults { title: "Game Shelf".into(), ..Default::default() }
    }

    fn push(raw: &str) -> Notification {
        build_notification(&defaults(), parse_payload(Some(raw)).as_ref())
    }

    #[test]
    fn test_nudge_payload() {
        let n = push(r#"{"title":"T","body":"B","type":"nudge"}"#);
        assert_eq!(n.title, "T");
        assert_eq!(n.body, "B");
        assert!(n.actions.len() >= 2);
        assert!(n.require_interaction);

        let log = n.actions.iter().find(|a| a.action == "log").unwrap();
        assert_eq!(resolve_click(&log.action, &n.data), ClickTarget::Navigate("/?action=log".into()));
    }

    #[test]
    fn test_missing_payload_uses_defaults() {
        let n = build_notification(&defaults(), parse_payload(None).as_ref());
        assert_eq!(n.title, "Game Shelf");
        assert_eq!(n.body, "You have a notification");
        assert_eq!(n.icon, "/icons/icon-192.png");
        assert_eq!(n.badge, "/icons/badge-72.png");
        assert_eq!(n.tag, "default");
        assert_eq!(n.data, json!({"url": "/"}));
        assert!(n.renotify);
        assert!(!n.require_interaction);
        assert_eq!(n.vibrate, vec![100, 50, 100]);
        assert!(n.actions.is_empty());
    }

    #[test]
    fn test_malformed_payload_uses_defaults() {
        let n = push("{not json");
        assert_eq!(n.title, "Game Shelf");
        assert!(n.actions.is_empty());

        let n = push("42");
        assert_eq!(n.title, "Game Shelf");
    }

    #[test]
    fn test_empty_fields_fall_back() {
        let n = push(r#"{"icon":"","tag":"","badge":null,"data":null}"#);
        assert_eq!(n.icon, "/icons/icon-192.png");
        assert_eq!(n.tag, "default");
        assert_eq!(n.badge, "/icons/badge-72.png");
        assert_eq!(n.data, json!({"url": "/"}));
    }

    #[test]
    fn test_action_sets() {
        let kinds = [
            ("streak-reminder", vec!["log", "snooze"], true),
            ("battle-update", vec!["view-battle", "dismiss"], false),
            ("friend-activity", vec!["view-friends"], false),
            ("weekly-digest", vec![], false),
        ];
        for (kind, actions, interaction) in kinds {
            let n = push(&format!(r#"{{"type":"{kind}"}}"#));
            let codes: Vec<_> = n.actions.iter().map(|a| a.action.as_str()).collect();
            assert_eq!(codes, actions, "{kind}");
            assert_eq!(n.require_interaction, interaction, "{kind}");
        }
    }

    #[test]
    fn test_require_interaction_from_payload() {
        let n = push(r#"{"type":"battle-update","requireInteraction":true}"#);
        assert!(n.require_interaction);
    }

    #[test]
    fn test_payload_data_kept() {
        let n = push(r#"{"data":{"url":"/?tab=stats","battleId":7}}"#);
        assert_eq!(n.data["url"], "/?tab=stats");
        assert_eq!(n.data["battleId"], 7);
    }

    #[test]
    fn test_resolve_click() {
        let data = json!({"url": "/?tab=stats"});
        assert_eq!(resolve_click("view-battle", &data), ClickTarget::Navigate("/?tab=social&view=battles".into()));
        assert_eq!(resolve_click("view-friends", &data), ClickTarget::Navigate("/?tab=social&view=friends".into()));
        assert_eq!(resolve_click("snooze", &data), ClickTarget::Close);
        assert_eq!(resolve_click("dismiss", &data), ClickTarget::Close);
        assert_eq!(resolve_click("", &data), ClickTarget::Navigate("/?tab=stats".into()));
        assert_eq!(resolve_click("unknown", &Value::Null), ClickTarget::Navigate("/".into()));
    }

    #[test]
    fn test_notification_serializes_camel_case() {
        let value = serde_json::to_value(push(r#"{"type":"nudge"}"#)).unwrap();
        assert_eq!(value["requireInteraction"], true);
        assert_eq!(value["actions"][0]["action"], "log");
    }
}

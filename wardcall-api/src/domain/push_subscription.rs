use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use webpush::{ClientKeys, WebPushError};

/// One browser push registration for a staff member's device.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PushSubscription {
    pub id: i32,
    pub user_id: String,
    pub endpoint: String,
    pub p256dh: String,
    pub auth: String,
    pub preferences: NotificationPreferences,
    pub is_active: bool,
    pub last_used_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
}

impl PushSubscription {
    /// Decodes and validates the stored key material. Rejects bad rows
    /// before any crypto runs against them.
    pub fn client_keys(&self) -> Result<ClientKeys, WebPushError> {
        ClientKeys::decode(&self.p256dh, &self.auth)
    }
}

/// Per-subscription delivery preferences, stored as JSONB.
///
/// The quiet hours fields are structural; every other key is a per-category
/// boolean toggle (`"labResults": false`), kept in a map so toggles added by
/// newer frontends survive round trips.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPreferences {
    #[serde(default)]
    pub quiet_hours_enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quiet_hours_start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quiet_hours_end: Option<String>,
    #[serde(flatten)]
    pub toggles: HashMap<String, bool>,
}

impl NotificationPreferences {
    /// `None` when the subscription never set the toggle; callers treat that
    /// as enabled.
    pub fn toggle(&self, key: &str) -> Option<bool> {
        self.toggles.get(key).copied()
    }

    pub fn with_toggle(mut self, key: &str, enabled: bool) -> Self {
        self.toggles.insert(key.to_string(), enabled);
        self
    }

    pub fn with_quiet_hours(mut self, start: &str, end: &str) -> Self {
        self.quiet_hours_enabled = true;
        self.quiet_hours_start = Some(start.to_string());
        self.quiet_hours_end = Some(end.to_string());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_toggles_survive_a_round_trip() {
        let json = serde_json::json!({
            "quietHoursEnabled": true,
            "quietHoursStart": "22:00",
            "quietHoursEnd": "07:00",
            "labResults": false,
            "dietaryOrders": true
        });

        let preferences: NotificationPreferences = serde_json::from_value(json.clone()).unwrap();
        assert!(preferences.quiet_hours_enabled);
        assert_eq!(preferences.quiet_hours_start.as_deref(), Some("22:00"));
        assert_eq!(preferences.toggle("labResults"), Some(false));
        assert_eq!(preferences.toggle("dietaryOrders"), Some(true));
        assert_eq!(preferences.toggle("chatMessages"), None);

        assert_eq!(serde_json::to_value(&preferences).unwrap(), json);
    }

    #[test]
    fn empty_preferences_deserialize_to_defaults() {
        let preferences: NotificationPreferences =
            serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(!preferences.quiet_hours_enabled);
        assert!(preferences.quiet_hours_start.is_none());
        assert!(preferences.toggles.is_empty());
    }

    #[test]
    fn quiet_hours_fields_do_not_leak_into_the_toggle_map() {
        let preferences: NotificationPreferences = serde_json::from_value(serde_json::json!({
            "quietHoursEnabled": false,
            "vitalAlerts": true
        }))
        .unwrap();
        assert_eq!(preferences.toggles.len(), 1);
        assert_eq!(preferences.toggle("vitalAlerts"), Some(true));
    }
}

//! Per-subscription delivery gating: category toggles and quiet hours.
//!
//! Evaluation is pure; callers pass the hospital wall clock time so the
//! window math stays testable.

use std::fmt;

use time::Time;

use super::{NotificationPayload, NotificationPreferences, NotificationType, Urgency};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    PreferenceDisabled,
    QuietHours,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PreferenceDisabled => write!(f, "preference disabled"),
            Self::QuietHours => write!(f, "quiet hours"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyDecision {
    Deliver,
    Skip(SkipReason),
}

/// Decides whether one subscription should receive this payload right now.
///
/// The category toggle is checked first and is absolute. Quiet hours only
/// suppress deliveries that are neither critical urgency nor vital alerts,
/// and only when both window bounds parse; a window that cannot be read
/// never blocks a delivery.
pub fn evaluate(
    preferences: &NotificationPreferences,
    payload: &NotificationPayload,
    local_time: Time,
) -> PolicyDecision {
    if let Some(kind) = payload.notification_type {
        if preferences.toggle(kind.preference_key()) == Some(false) {
            return PolicyDecision::Skip(SkipReason::PreferenceDisabled);
        }
    }

    if preferences.quiet_hours_enabled && !bypasses_quiet_hours(payload) {
        let bounds = (
            preferences.quiet_hours_start.as_deref().and_then(parse_hh_mm),
            preferences.quiet_hours_end.as_deref().and_then(parse_hh_mm),
        );
        match bounds {
            (Some(start), Some(end)) => {
                let now = minutes_since_midnight(local_time);
                if in_quiet_window(now, start, end) {
                    return PolicyDecision::Skip(SkipReason::QuietHours);
                }
            }
            _ => {
                tracing::debug!(
                    start = ?preferences.quiet_hours_start,
                    end = ?preferences.quiet_hours_end,
                    "quiet hours window is unreadable, delivering anyway"
                );
            }
        }
    }

    PolicyDecision::Deliver
}

fn bypasses_quiet_hours(payload: &NotificationPayload) -> bool {
    payload.urgency == Urgency::Critical
        || payload.notification_type == Some(NotificationType::VitalAlert)
}

fn minutes_since_midnight(time: Time) -> u16 {
    u16::from(time.hour()) * 60 + u16::from(time.minute())
}

/// `[start, end)` in minutes since midnight. A window whose end precedes its
/// start wraps past midnight; equal bounds are an empty window.
fn in_quiet_window(now: u16, start: u16, end: u16) -> bool {
    if start <= end {
        now >= start && now < end
    } else {
        now >= start || now < end
    }
}

fn parse_hh_mm(value: &str) -> Option<u16> {
    let (hours, minutes) = value.split_once(':')?;
    let hours: u16 = hours.parse().ok()?;
    let minutes: u16 = minutes.parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    Some(hours * 60 + minutes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(hour: u8, minute: u8) -> Time {
        Time::from_hms(hour, minute, 0).unwrap()
    }

    fn payload(kind: NotificationType) -> NotificationPayload {
        NotificationPayload {
            title: "test".to_string(),
            notification_type: Some(kind),
            ..Default::default()
        }
    }

    fn night_owl() -> NotificationPreferences {
        NotificationPreferences::default().with_quiet_hours("22:00", "07:00")
    }

    #[test]
    fn disabled_category_is_skipped() {
        let preferences = NotificationPreferences::default().with_toggle("labResults", false);
        assert_eq!(
            evaluate(&preferences, &payload(NotificationType::LabResults), at(12, 0)),
            PolicyDecision::Skip(SkipReason::PreferenceDisabled)
        );
    }

    #[test]
    fn unset_and_enabled_categories_deliver() {
        let unset = NotificationPreferences::default();
        assert_eq!(
            evaluate(&unset, &payload(NotificationType::LabResults), at(12, 0)),
            PolicyDecision::Deliver
        );

        let enabled = NotificationPreferences::default().with_toggle("labResults", true);
        assert_eq!(
            evaluate(&enabled, &payload(NotificationType::LabResults), at(12, 0)),
            PolicyDecision::Deliver
        );
    }

    #[test]
    fn toggles_only_gate_their_own_category() {
        let preferences = NotificationPreferences::default().with_toggle("labResults", false);
        assert_eq!(
            evaluate(&preferences, &payload(NotificationType::ChatMessage), at(12, 0)),
            PolicyDecision::Deliver
        );
    }

    #[test]
    fn untyped_payloads_are_not_preference_gated() {
        let preferences = NotificationPreferences::default().with_toggle("labResults", false);
        let untyped = NotificationPayload {
            title: "test".to_string(),
            ..Default::default()
        };
        assert_eq!(evaluate(&preferences, &untyped, at(12, 0)), PolicyDecision::Deliver);
    }

    #[test]
    fn overnight_window_suppresses_at_night_only() {
        let preferences = night_owl();
        let message = payload(NotificationType::StaffMessage);

        assert_eq!(
            evaluate(&preferences, &message, at(23, 0)),
            PolicyDecision::Skip(SkipReason::QuietHours)
        );
        assert_eq!(
            evaluate(&preferences, &message, at(3, 30)),
            PolicyDecision::Skip(SkipReason::QuietHours)
        );
        assert_eq!(evaluate(&preferences, &message, at(12, 0)), PolicyDecision::Deliver);
    }

    #[test]
    fn window_bounds_are_start_inclusive_end_exclusive() {
        let preferences = night_owl();
        let message = payload(NotificationType::ChatMessage);

        assert_eq!(
            evaluate(&preferences, &message, at(22, 0)),
            PolicyDecision::Skip(SkipReason::QuietHours)
        );
        assert_eq!(evaluate(&preferences, &message, at(21, 59)), PolicyDecision::Deliver);
        assert_eq!(
            evaluate(&preferences, &message, at(6, 59)),
            PolicyDecision::Skip(SkipReason::QuietHours)
        );
        assert_eq!(evaluate(&preferences, &message, at(7, 0)), PolicyDecision::Deliver);
    }

    #[test]
    fn windows_respect_minutes_not_just_hours() {
        let preferences = NotificationPreferences::default().with_quiet_hours("22:30", "06:15");
        let message = payload(NotificationType::ChatMessage);

        assert_eq!(evaluate(&preferences, &message, at(22, 29)), PolicyDecision::Deliver);
        assert_eq!(
            evaluate(&preferences, &message, at(22, 30)),
            PolicyDecision::Skip(SkipReason::QuietHours)
        );
        assert_eq!(
            evaluate(&preferences, &message, at(6, 14)),
            PolicyDecision::Skip(SkipReason::QuietHours)
        );
        assert_eq!(evaluate(&preferences, &message, at(6, 15)), PolicyDecision::Deliver);
    }

    #[test]
    fn same_day_window_does_not_wrap() {
        let preferences = NotificationPreferences::default().with_quiet_hours("09:00", "17:00");
        let message = payload(NotificationType::ChatMessage);

        assert_eq!(
            evaluate(&preferences, &message, at(12, 0)),
            PolicyDecision::Skip(SkipReason::QuietHours)
        );
        assert_eq!(evaluate(&preferences, &message, at(8, 59)), PolicyDecision::Deliver);
        assert_eq!(evaluate(&preferences, &message, at(17, 0)), PolicyDecision::Deliver);
        assert_eq!(evaluate(&preferences, &message, at(23, 0)), PolicyDecision::Deliver);
    }

    #[test]
    fn equal_bounds_are_an_empty_window() {
        let preferences = NotificationPreferences::default().with_quiet_hours("08:00", "08:00");
        let message = payload(NotificationType::ChatMessage);
        assert_eq!(evaluate(&preferences, &message, at(8, 0)), PolicyDecision::Deliver);
        assert_eq!(evaluate(&preferences, &message, at(20, 0)), PolicyDecision::Deliver);
    }

    #[test]
    fn vital_alerts_ring_through_quiet_hours() {
        assert_eq!(
            evaluate(&night_owl(), &payload(NotificationType::VitalAlert), at(23, 0)),
            PolicyDecision::Deliver
        );
    }

    #[test]
    fn critical_urgency_rings_through_quiet_hours() {
        let mut message = payload(NotificationType::ChatMessage);
        message.urgency = Urgency::Critical;
        assert_eq!(evaluate(&night_owl(), &message, at(23, 0)), PolicyDecision::Deliver);
    }

    #[test]
    fn disabled_preference_beats_the_vital_alert_bypass() {
        let preferences = NotificationPreferences::default()
            .with_toggle("vitalAlerts", false)
            .with_quiet_hours("22:00", "07:00");
        assert_eq!(
            evaluate(&preferences, &payload(NotificationType::VitalAlert), at(23, 0)),
            PolicyDecision::Skip(SkipReason::PreferenceDisabled)
        );
    }

    #[test]
    fn unreadable_window_fails_open() {
        let mut preferences = NotificationPreferences::default();
        preferences.quiet_hours_enabled = true;
        preferences.quiet_hours_start = Some("late".to_string());
        preferences.quiet_hours_end = Some("07:00".to_string());

        let message = payload(NotificationType::ChatMessage);
        assert_eq!(evaluate(&preferences, &message, at(23, 0)), PolicyDecision::Deliver);

        // Enabled flag without any bounds behaves the same.
        let bare = NotificationPreferences {
            quiet_hours_enabled: true,
            ..Default::default()
        };
        assert_eq!(evaluate(&bare, &message, at(23, 0)), PolicyDecision::Deliver);
    }

    #[test]
    fn out_of_range_bounds_fail_open() {
        let preferences = NotificationPreferences::default().with_quiet_hours("25:00", "07:00");
        let message = payload(NotificationType::ChatMessage);
        assert_eq!(evaluate(&preferences, &message, at(3, 0)), PolicyDecision::Deliver);
    }

    #[test]
    fn hh_mm_parsing_is_strict_about_ranges() {
        assert_eq!(parse_hh_mm("00:00"), Some(0));
        assert_eq!(parse_hh_mm("23:59"), Some(23 * 60 + 59));
        assert_eq!(parse_hh_mm("7:30"), Some(7 * 60 + 30));
        assert_eq!(parse_hh_mm("24:00"), None);
        assert_eq!(parse_hh_mm("12:60"), None);
        assert_eq!(parse_hh_mm("noon"), None);
        assert_eq!(parse_hh_mm("12"), None);
    }
}

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::repositories::RepositoryError;

use super::NotificationPayload;

/// Who a dispatch request is addressed to, in precedence order: a single
/// user beats a user list, which beats a hospital-wide (optionally
/// role-filtered) broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchTarget {
    User(String),
    Users(Vec<String>),
    HospitalRole { hospital_id: String, role: String },
    Hospital(String),
}

impl fmt::Display for DispatchTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User(id) => write!(f, "user {}", id),
            Self::Users(ids) => write!(f, "{} users", ids.len()),
            Self::HospitalRole { hospital_id, role } => {
                write!(f, "{} at hospital {}", role, hospital_id)
            }
            Self::Hospital(id) => write!(f, "hospital {}", id),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("VAPID keys are not configured")]
    VapidNotConfigured,
    #[error("request must target a user, a list of users, or a hospital")]
    NoTarget,
    #[error("notification title is required")]
    MissingTitle,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("failed to encode notification payload: {0}")]
    PayloadEncoding(#[from] serde_json::Error),
}

/// Body of `POST /notifications/dispatch`. Everything is optional so that
/// targeting mistakes surface as our own 400s instead of rejections from
/// the JSON extractor.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchRequest {
    pub user_id: Option<String>,
    pub user_ids: Option<Vec<String>>,
    pub hospital_id: Option<String>,
    pub role: Option<String>,
    pub payload: Option<NotificationPayload>,
}

impl DispatchRequest {
    pub fn into_parts(self) -> Result<(DispatchTarget, NotificationPayload), DispatchError> {
        let target = if let Some(user_id) = self.user_id {
            DispatchTarget::User(user_id)
        } else if let Some(user_ids) = self.user_ids {
            DispatchTarget::Users(user_ids)
        } else if let Some(hospital_id) = self.hospital_id {
            match self.role {
                Some(role) => DispatchTarget::HospitalRole { hospital_id, role },
                None => DispatchTarget::Hospital(hospital_id),
            }
        } else {
            return Err(DispatchError::NoTarget);
        };

        let payload = self.payload.ok_or(DispatchError::MissingTitle)?;
        if payload.title.trim().is_empty() {
            return Err(DispatchError::MissingTitle);
        }

        Ok((target, payload))
    }
}

/// Outcome of a dispatch, as reported back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchSummary {
    pub success: bool,
    pub sent: usize,
    pub failed: usize,
    pub total: usize,
    pub skipped: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl DispatchSummary {
    pub fn no_recipients() -> Self {
        Self {
            success: true,
            sent: 0,
            failed: 0,
            total: 0,
            skipped: 0,
            message: Some("no active subscriptions".to_string()),
        }
    }

    pub fn tallied(sent: usize, failed: usize, skipped: usize) -> Self {
        Self {
            success: failed == 0,
            sent,
            failed,
            total: sent + failed,
            skipped,
            message: None,
        }
    }
}

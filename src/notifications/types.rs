//! Notification type definitions

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationType {
    ReportSubmitted,  // A user flagged something (sent to admins)
    ReportResolved,   // Your report was acted on
    ReportDismissed,  // Your report was dismissed
    UserSuspended,    // Your account was suspended
    UserUnsuspended,  // Your suspension was lifted
    ContentHidden,    // Your project or comment was hidden
    ContentUnhidden,  // Your project or comment is visible again
    FundingRequested, // Someone offered to fund your project
    FundingVerified,  // The project owner accepted your funding
    FundingRejected,  // The project owner declined your funding
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReportSubmitted => "report_submitted",
            Self::ReportResolved => "report_resolved",
            Self::ReportDismissed => "report_dismissed",
            Self::UserSuspended => "user_suspended",
            Self::UserUnsuspended => "user_unsuspended",
            Self::ContentHidden => "content_hidden",
            Self::ContentUnhidden => "content_unhidden",
            Self::FundingRequested => "funding_requested",
            Self::FundingVerified => "funding_verified",
            Self::FundingRejected => "funding_rejected",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "report_submitted" => Some(Self::ReportSubmitted),
            "report_resolved" => Some(Self::ReportResolved),
            "report_dismissed" => Some(Self::ReportDismissed),
            "user_suspended" => Some(Self::UserSuspended),
            "user_unsuspended" => Some(Self::UserUnsuspended),
            "content_hidden" => Some(Self::ContentHidden),
            "content_unhidden" => Some(Self::ContentUnhidden),
            "funding_requested" => Some(Self::FundingRequested),
            "funding_verified" => Some(Self::FundingVerified),
            "funding_rejected" => Some(Self::FundingRejected),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_names_are_stable() {
        assert_eq!(NotificationType::FundingVerified.as_str(), "funding_verified");
        assert_eq!(
            NotificationType::from_str("content_hidden"),
            Some(NotificationType::ContentHidden)
        );
        assert_eq!(NotificationType::from_str("mention"), None);
    }
}

use crate::{
    CompanyId, InspectionStatus, PermitId, PlanStatus, Priority, Role,
};
use jiff::Timestamp;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginCredentials {
    pub email: String,
    pub password: String,
}

/// Query parameters accepted by every list endpoint. Unset fields are left
/// off the query string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

impl ListQuery {
    pub fn status(status: impl Into<String>) -> Self {
        Self {
            status: Some(status.into()),
            ..Self::default()
        }
    }

    pub fn search(search: impl Into<String>) -> Self {
        Self {
            search: Some(search.into()),
            ..Self::default()
        }
    }

    pub fn page(mut self, page: u32, limit: u32) -> Self {
        self.page = Some(page);
        self.limit = Some(limit);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermitApplication {
    pub title: String,
    pub permit_type: String,
    pub company_id: CompanyId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Body of the `.../status` endpoints. The status is generic so permits and
/// payments can share it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusChange<S> {
    pub status: S,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDetails {
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_id: Option<CompanyId>,
    /// Only sent when creating a user or changing their password.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyDetails {
    pub name: String,
    pub registration_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDetails {
    pub company_id: CompanyId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permit_id: Option<PermitId>,
    pub amount: Decimal,
    pub currency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonnelDetails {
    pub name: String,
    pub nationality: String,
    pub position: String,
    pub company_id: CompanyId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passport_number: Option<String>,
    /// Expatriates count against the company's immigration quota.
    pub expatriate: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JointVentureDetails {
    pub name: String,
    pub operator_id: CompanyId,
    pub partner_ids: Vec<CompanyId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalContentPlanDetails {
    pub company_id: CompanyId,
    /// Reporting period, e.g. "2025-Q1".
    pub period: String,
    pub target_percentage: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<PlanStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectionDetails {
    pub facility: String,
    pub company_id: CompanyId,
    pub scheduled_for: Timestamp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inspector: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<InspectionStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub findings: Option<String>,
}

/// A notification pushed by the backend. Only used for seeding test and
/// development data; the portal itself never creates notifications.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationDetails {
    pub title: String,
    pub message: String,
    pub priority: Priority,
}

/// A file to send to `/documents/upload`. Sent as a multipart form rather
/// than JSON.
#[derive(Debug, Clone)]
pub struct DocumentUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
    pub category: Option<String>,
}

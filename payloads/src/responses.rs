use crate::{
    AlertLevel, CompanyId, DocumentId, InspectionId, InspectionStatus,
    JointVentureId, NotificationId, PaymentId, PaymentStatus, PermitId,
    PermitStatus, PersonnelId, PlanId, PlanStatus, Priority, Role, UserId,
};
use jiff::Timestamp;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The backend wraps every resource response in this envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// The token and profile returned by a successful login.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthSession {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub company_id: Option<CompanyId>,
    pub active: bool,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permit {
    pub id: PermitId,
    /// Human-facing reference number, e.g. "PRM-00012".
    pub reference: String,
    pub title: String,
    pub permit_type: String,
    pub company_id: CompanyId,
    pub description: Option<String>,
    pub status: PermitStatus,
    /// Reviewer comment left with the latest status change.
    pub comment: Option<String>,
    pub submitted_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub id: CompanyId,
    pub name: String,
    pub registration_number: String,
    pub email: Option<String>,
    pub address: Option<String>,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: PaymentId,
    pub reference: String,
    pub company_id: CompanyId,
    pub permit_id: Option<PermitId>,
    pub amount: Decimal,
    pub currency: String,
    pub description: Option<String>,
    pub status: PaymentStatus,
    pub comment: Option<String>,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Personnel {
    pub id: PersonnelId,
    pub name: String,
    pub nationality: String,
    pub position: String,
    pub company_id: CompanyId,
    pub passport_number: Option<String>,
    pub expatriate: bool,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JointVenture {
    pub id: JointVentureId,
    pub name: String,
    pub operator_id: CompanyId,
    pub partner_ids: Vec<CompanyId>,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalContentPlan {
    pub id: PlanId,
    pub company_id: CompanyId,
    pub period: String,
    pub target_percentage: Decimal,
    pub status: PlanStatus,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: DocumentId,
    pub file_name: String,
    pub content_type: String,
    pub size: u64,
    pub category: Option<String>,
    pub uploaded_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inspection {
    pub id: InspectionId,
    pub facility: String,
    pub company_id: CompanyId,
    pub scheduled_for: Timestamp,
    pub inspector: Option<String>,
    pub status: InspectionStatus,
    pub findings: Option<String>,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: NotificationId,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub priority: Priority,
    pub read: bool,
    pub acknowledged: bool,
    pub created_at: Timestamp,
}

/// Headline figures for the dashboard landing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardOverview {
    pub total_permits: u64,
    pub pending_permits: u64,
    pub approved_permits: u64,
    pub rejected_permits: u64,
    pub registered_companies: u64,
    pub scheduled_inspections: u64,
    /// Sum of all payments marked paid.
    pub payments_collected: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardAlert {
    pub level: AlertLevel,
    pub message: String,
    pub created_at: Timestamp,
}

/// Counters shown next to sidebar entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardBadges {
    pub pending_permits: u64,
    pub pending_payments: u64,
    pub unread_notifications: u64,
}

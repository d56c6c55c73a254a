use crate::{
    CompanyId, DocumentId, InspectionId, JointVentureId, NotificationAction,
    NotificationId, PaymentId, PaymentStatus, PermitId, PermitStatus,
    PersonnelId, PlanId, UserId,
    config::ClientConfig,
    requests::{self, ListQuery},
    responses::{self, Envelope},
    session::Session,
};
use reqwest::{Method, RequestBuilder, StatusCode, multipart};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

type ReqwestResult = Result<reqwest::Response, reqwest::Error>;

/// An API client for interfacing with the portal backend.
#[derive(Clone, Debug)]
pub struct APIClient {
    /// Base URL including the api prefix, e.g. `http://localhost:5000/api`.
    pub address: String,
    pub inner_client: reqwest::Client,
    pub session: Session,
}

impl APIClient {
    pub fn new(config: &ClientConfig, session: Session) -> Self {
        Self {
            address: config.base_url.clone(),
            inner_client: reqwest::Client::new(),
            session,
        }
    }
}

/// Helper methods for http actions
impl APIClient {
    fn format_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.address.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Start a request, attaching the session's bearer token if there is
    /// one.
    pub(crate) fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let request = self.inner_client.request(method, self.format_url(path));
        match self.session.token() {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        }
    }

    /// Send a request. Any 401 ends the session before the response is
    /// handed back.
    async fn send(&self, request: RequestBuilder) -> ReqwestResult {
        let request = request.build()?;
        tracing::debug!(
            method = %request.method(),
            url = %request.url(),
            "sending request"
        );
        let response = self.inner_client.execute(request).await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            tracing::warn!(
                url = %response.url(),
                "unauthorized, ending session"
            );
            self.session.expire();
        }
        Ok(response)
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        path: &str,
        query: Option<&ListQuery>,
    ) -> Result<T, ClientError> {
        let mut request = self.request(Method::GET, path);
        if let Some(query) = query {
            request = request.query(query);
        }
        let response = self.send(request).await?;
        ok_data(response).await
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &impl Serialize,
    ) -> Result<T, ClientError> {
        let response = self.send(self.request(method, path).json(body)).await?;
        ok_data(response).await
    }

    async fn empty_patch<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<T, ClientError> {
        let response = self.send(self.request(Method::PATCH, path)).await?;
        ok_data(response).await
    }

    async fn empty_delete(&self, path: &str) -> Result<(), ClientError> {
        let response = self.send(self.request(Method::DELETE, path)).await?;
        ok_empty(response).await
    }
}

/// Generic passthroughs for endpoints without a dedicated method. These
/// return the whole response body rather than its `data` field.
impl APIClient {
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<T, ClientError> {
        let response = self.send(self.request(Method::GET, path)).await?;
        ok_body(response).await
    }

    pub async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> Result<T, ClientError> {
        let response =
            self.send(self.request(Method::POST, path).json(body)).await?;
        ok_body(response).await
    }

    pub async fn put<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> Result<T, ClientError> {
        let response =
            self.send(self.request(Method::PUT, path).json(body)).await?;
        ok_body(response).await
    }

    pub async fn patch<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> Result<T, ClientError> {
        let response =
            self.send(self.request(Method::PATCH, path).json(body)).await?;
        ok_body(response).await
    }

    pub async fn delete<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<T, ClientError> {
        let response = self.send(self.request(Method::DELETE, path)).await?;
        ok_body(response).await
    }
}

/// Methods on the backend API
impl APIClient {
    /// Log in and store the issued token and profile in the session.
    pub async fn login(
        &self,
        credentials: &requests::LoginCredentials,
    ) -> Result<responses::AuthSession, ClientError> {
        let auth: responses::AuthSession =
            self.send_json(Method::POST, "auth/login", credentials).await?;
        if let Err(e) = self.session.sign_in(&auth.token, &auth.user) {
            tracing::error!("failed to cache user profile: {e}");
        }
        Ok(auth)
    }

    // Permits

    pub async fn list_permits(
        &self,
        query: Option<&ListQuery>,
    ) -> Result<Vec<responses::Permit>, ClientError> {
        self.fetch("permits", query).await
    }

    pub async fn get_permit(
        &self,
        permit_id: &PermitId,
    ) -> Result<responses::Permit, ClientError> {
        self.fetch(&format!("permits/{permit_id}"), None).await
    }

    pub async fn create_permit(
        &self,
        details: &requests::PermitApplication,
    ) -> Result<responses::Permit, ClientError> {
        self.send_json(Method::POST, "permits", details).await
    }

    pub async fn update_permit_status(
        &self,
        permit_id: &PermitId,
        status: PermitStatus,
        comment: Option<&str>,
    ) -> Result<responses::Permit, ClientError> {
        let body = requests::StatusChange {
            status,
            comment: comment.map(str::to_string),
        };
        self.send_json(
            Method::PATCH,
            &format!("permits/{permit_id}/status"),
            &body,
        )
        .await
    }

    pub async fn approve_permit(
        &self,
        permit_id: &PermitId,
        comment: Option<&str>,
    ) -> Result<responses::Permit, ClientError> {
        self.update_permit_status(permit_id, PermitStatus::Approved, comment)
            .await
    }

    pub async fn reject_permit(
        &self,
        permit_id: &PermitId,
        comment: Option<&str>,
    ) -> Result<responses::Permit, ClientError> {
        self.update_permit_status(permit_id, PermitStatus::Rejected, comment)
            .await
    }

    // Users

    pub async fn list_users(
        &self,
        query: Option<&ListQuery>,
    ) -> Result<Vec<responses::User>, ClientError> {
        self.fetch("users", query).await
    }

    pub async fn create_user(
        &self,
        details: &requests::UserDetails,
    ) -> Result<responses::User, ClientError> {
        self.send_json(Method::POST, "users", details).await
    }

    pub async fn update_user(
        &self,
        user_id: &UserId,
        details: &requests::UserDetails,
    ) -> Result<responses::User, ClientError> {
        self.send_json(Method::PUT, &format!("users/{user_id}"), details)
            .await
    }

    pub async fn delete_user(
        &self,
        user_id: &UserId,
    ) -> Result<(), ClientError> {
        self.empty_delete(&format!("users/{user_id}")).await
    }

    // Companies

    pub async fn list_companies(
        &self,
        query: Option<&ListQuery>,
    ) -> Result<Vec<responses::Company>, ClientError> {
        self.fetch("companies", query).await
    }

    pub async fn create_company(
        &self,
        details: &requests::CompanyDetails,
    ) -> Result<responses::Company, ClientError> {
        self.send_json(Method::POST, "companies", details).await
    }

    pub async fn update_company(
        &self,
        company_id: &CompanyId,
        details: &requests::CompanyDetails,
    ) -> Result<responses::Company, ClientError> {
        self.send_json(Method::PUT, &format!("companies/{company_id}"), details)
            .await
    }

    // Payments

    pub async fn list_payments(
        &self,
        query: Option<&ListQuery>,
    ) -> Result<Vec<responses::Payment>, ClientError> {
        self.fetch("payments", query).await
    }

    pub async fn create_payment(
        &self,
        details: &requests::PaymentDetails,
    ) -> Result<responses::Payment, ClientError> {
        self.send_json(Method::POST, "payments", details).await
    }

    pub async fn update_payment_status(
        &self,
        payment_id: &PaymentId,
        status: PaymentStatus,
        comment: Option<&str>,
    ) -> Result<responses::Payment, ClientError> {
        let body = requests::StatusChange {
            status,
            comment: comment.map(str::to_string),
        };
        self.send_json(
            Method::PATCH,
            &format!("payments/{payment_id}/status"),
            &body,
        )
        .await
    }

    // Personnel

    pub async fn list_personnel(
        &self,
        query: Option<&ListQuery>,
    ) -> Result<Vec<responses::Personnel>, ClientError> {
        self.fetch("personnel", query).await
    }

    pub async fn create_personnel(
        &self,
        details: &requests::PersonnelDetails,
    ) -> Result<responses::Personnel, ClientError> {
        self.send_json(Method::POST, "personnel", details).await
    }

    pub async fn update_personnel(
        &self,
        personnel_id: &PersonnelId,
        details: &requests::PersonnelDetails,
    ) -> Result<responses::Personnel, ClientError> {
        self.send_json(
            Method::PUT,
            &format!("personnel/{personnel_id}"),
            details,
        )
        .await
    }

    // Joint ventures

    pub async fn list_joint_ventures(
        &self,
        query: Option<&ListQuery>,
    ) -> Result<Vec<responses::JointVenture>, ClientError> {
        self.fetch("jv", query).await
    }

    pub async fn create_joint_venture(
        &self,
        details: &requests::JointVentureDetails,
    ) -> Result<responses::JointVenture, ClientError> {
        self.send_json(Method::POST, "jv", details).await
    }

    pub async fn update_joint_venture(
        &self,
        joint_venture_id: &JointVentureId,
        details: &requests::JointVentureDetails,
    ) -> Result<responses::JointVenture, ClientError> {
        self.send_json(Method::PUT, &format!("jv/{joint_venture_id}"), details)
            .await
    }

    // Local content

    pub async fn list_local_content_plans(
        &self,
        query: Option<&ListQuery>,
    ) -> Result<Vec<responses::LocalContentPlan>, ClientError> {
        self.fetch("localcontent/plans", query).await
    }

    pub async fn create_local_content_plan(
        &self,
        details: &requests::LocalContentPlanDetails,
    ) -> Result<responses::LocalContentPlan, ClientError> {
        self.send_json(Method::POST, "localcontent/plans", details)
            .await
    }

    pub async fn update_local_content_plan(
        &self,
        plan_id: &PlanId,
        details: &requests::LocalContentPlanDetails,
    ) -> Result<responses::LocalContentPlan, ClientError> {
        self.send_json(
            Method::PUT,
            &format!("localcontent/plans/{plan_id}"),
            details,
        )
        .await
    }

    // Documents

    pub async fn list_documents(
        &self,
        query: Option<&ListQuery>,
    ) -> Result<Vec<responses::Document>, ClientError> {
        self.fetch("documents", query).await
    }

    /// Upload a file as a multipart form with a `file` part and an optional
    /// `category` field.
    pub async fn upload_document(
        &self,
        upload: requests::DocumentUpload,
    ) -> Result<responses::Document, ClientError> {
        let file = multipart::Part::bytes(upload.bytes)
            .file_name(upload.file_name)
            .mime_str(&upload.content_type)?;
        let mut form = multipart::Form::new().part("file", file);
        if let Some(category) = upload.category {
            form = form.text("category", category);
        }

        let request = self
            .request(Method::POST, "documents/upload")
            .multipart(form);
        let response = self.send(request).await?;
        ok_data(response).await
    }

    /// Download the raw bytes of a document.
    pub async fn download_document(
        &self,
        document_id: &DocumentId,
    ) -> Result<Vec<u8>, ClientError> {
        let path = format!("documents/{document_id}/download");
        let response = self.send(self.request(Method::GET, &path)).await?;
        ok_bytes(response).await
    }

    // Inspections

    pub async fn list_inspections(
        &self,
        query: Option<&ListQuery>,
    ) -> Result<Vec<responses::Inspection>, ClientError> {
        self.fetch("inspections", query).await
    }

    pub async fn create_inspection(
        &self,
        details: &requests::InspectionDetails,
    ) -> Result<responses::Inspection, ClientError> {
        self.send_json(Method::POST, "inspections", details).await
    }

    pub async fn update_inspection(
        &self,
        inspection_id: &InspectionId,
        details: &requests::InspectionDetails,
    ) -> Result<responses::Inspection, ClientError> {
        self.send_json(
            Method::PUT,
            &format!("inspections/{inspection_id}"),
            details,
        )
        .await
    }

    // Notifications

    pub async fn list_notifications(
        &self,
        query: Option<&ListQuery>,
    ) -> Result<Vec<responses::Notification>, ClientError> {
        self.fetch("notifications", query).await
    }

    async fn update_notification(
        &self,
        notification_id: &NotificationId,
        action: NotificationAction,
    ) -> Result<responses::Notification, ClientError> {
        self.empty_patch(&format!(
            "notifications/{notification_id}/{}",
            action.as_path()
        ))
        .await
    }

    pub async fn mark_notification_read(
        &self,
        notification_id: &NotificationId,
    ) -> Result<responses::Notification, ClientError> {
        self.update_notification(notification_id, NotificationAction::Read)
            .await
    }

    pub async fn mark_notification_unread(
        &self,
        notification_id: &NotificationId,
    ) -> Result<responses::Notification, ClientError> {
        self.update_notification(notification_id, NotificationAction::Unread)
            .await
    }

    pub async fn acknowledge_notification(
        &self,
        notification_id: &NotificationId,
    ) -> Result<responses::Notification, ClientError> {
        self.update_notification(
            notification_id,
            NotificationAction::Acknowledge,
        )
        .await
    }

    pub async fn delete_notification(
        &self,
        notification_id: &NotificationId,
    ) -> Result<(), ClientError> {
        self.empty_delete(&format!("notifications/{notification_id}"))
            .await
    }

    // Dashboard

    pub async fn dashboard_overview(
        &self,
    ) -> Result<responses::DashboardOverview, ClientError> {
        self.fetch("dashboard/overview", None).await
    }

    pub async fn dashboard_alerts(
        &self,
    ) -> Result<Vec<responses::DashboardAlert>, ClientError> {
        self.fetch("dashboard/alerts", None).await
    }

    pub async fn dashboard_badges(
        &self,
    ) -> Result<responses::DashboardBadges, ClientError> {
        self.fetch("dashboard/badges", None).await
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// An unhandled API error to display, containing response text.
    #[error("{1}")]
    APIError(StatusCode, String),
    #[error("Network error. Please check your connection.")]
    Network(#[from] reqwest::Error),
}

/// Error bodies look like `{"message": "..."}`; some endpoints use `error`.
#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
}

impl ClientError {
    /// The human-readable message nested in the response body, if the
    /// backend sent one.
    pub fn response_message(&self) -> Option<String> {
        let Self::APIError(_, body) = self else {
            return None;
        };
        let body: ErrorBody = serde_json::from_str(body).ok()?;
        body.message
            .or(body.error)
            .filter(|message| !message.trim().is_empty())
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::APIError(status, _) => Some(*status),
            Self::Network(e) => e.status(),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }
}

async fn api_error(response: reqwest::Response) -> ClientError {
    let status = response.status();
    match response.text().await {
        Ok(text) => ClientError::APIError(status, text),
        Err(e) => e.into(),
    }
}

/// Deserialize a successful request into the desired type, or return an
/// appropriate error.
pub async fn ok_body<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ClientError> {
    if !response.status().is_success() {
        return Err(api_error(response).await);
    }
    Ok(response.json::<T>().await?)
}

/// Deserialize the `data` field of a successful response envelope.
pub async fn ok_data<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ClientError> {
    let envelope: Envelope<T> = ok_body(response).await?;
    Ok(envelope.data)
}

/// Check that an empty response is OK, returning a ClientError if not.
pub async fn ok_empty(response: reqwest::Response) -> Result<(), ClientError> {
    if !response.status().is_success() {
        return Err(api_error(response).await);
    }
    Ok(())
}

async fn ok_bytes(response: reqwest::Response) -> Result<Vec<u8>, ClientError> {
    if !response.status().is_success() {
        return Err(api_error(response).await);
    }
    Ok(response.bytes().await?.to_vec())
}

pub mod backend;
pub mod mock;
pub mod telemetry;

use std::sync::{Arc, Mutex, PoisonError};

use actix_web::web;
use backend::{Config, MockBackend};
use jiff::{Span, Timestamp};
use payloads::{
    APIClient, ClientConfig, CompanyId, Priority, Role, Session, requests,
    responses,
};
use reqwest::StatusCode;
use rust_decimal::dec;
use serde_json::json;

pub struct TestApp {
    #[allow(unused)]
    pub port: u16,
    pub client: APIClient,
    pub backend: web::Data<MockBackend>,
    redirects: Arc<Mutex<Vec<String>>>,
}

/// Session helpers
impl TestApp {
    /// Routes handed to the session's unauthorized handler so far.
    pub fn redirects(&self) -> Vec<String> {
        self.redirects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn redirect_count(&self) -> usize {
        self.redirects().len()
    }

    /// A second client pointed at the same backend with its own, empty
    /// session.
    pub fn anonymous_client(&self) -> APIClient {
        APIClient::new(
            &ClientConfig {
                base_url: self.client.address.clone(),
            },
            Session::in_memory(),
        )
    }

    pub async fn login_admin(&self) -> anyhow::Result<responses::AuthSession> {
        Ok(self.client.login(&admin_credentials()).await?)
    }

    pub async fn login_reviewer(
        &self,
    ) -> anyhow::Result<responses::AuthSession> {
        Ok(self.client.login(&reviewer_credentials()).await?)
    }
}

/// Functions to populate test data
///
/// Using anyhow::Result lets us get a backtrace from when the error was first
/// converted to anyhow::Result. Run with RUST_BACKTRACE=1 to view.
impl TestApp {
    pub async fn create_test_company(
        &self,
    ) -> anyhow::Result<responses::Company> {
        let details = company_details_a();
        let company = self.client.create_company(&details).await?;
        assert_eq!(company.name, details.name);
        assert_eq!(company.registration_number, details.registration_number);
        Ok(company)
    }

    pub async fn create_test_permit(
        &self,
        company_id: CompanyId,
    ) -> anyhow::Result<responses::Permit> {
        let application = permit_application_a(company_id);
        let permit = self.client.create_permit(&application).await?;
        assert_eq!(permit.title, application.title);
        assert_eq!(permit.status, payloads::PermitStatus::Pending);
        Ok(permit)
    }

    pub async fn create_test_payment(
        &self,
        company_id: CompanyId,
    ) -> anyhow::Result<responses::Payment> {
        let details = payment_details_a(company_id);
        let payment = self.client.create_payment(&details).await?;
        assert_eq!(payment.amount, details.amount);
        Ok(payment)
    }

    /// Notifications are pushed by the backend, so they are seeded directly
    /// rather than through the client.
    pub fn seed_notification(
        &self,
        details: &requests::NotificationDetails,
    ) -> anyhow::Result<responses::Notification> {
        let record = self.backend.seed("notifications", json!(details));
        Ok(serde_json::from_value(record)?)
    }
}

pub fn admin_credentials() -> requests::LoginCredentials {
    requests::LoginCredentials {
        email: "commission.admin@portal.test".into(),
        password: "supersecret".into(),
    }
}

pub fn reviewer_credentials() -> requests::LoginCredentials {
    requests::LoginCredentials {
        email: "reviewer@portal.test".into(),
        password: "reviewerpw".into(),
    }
}

fn register_accounts(backend: &MockBackend) {
    let admin = admin_credentials();
    backend.add_account(
        &admin.email,
        &admin.password,
        json!({ "name": "Commission Admin", "role": Role::CommissionAdmin }),
    );
    let reviewer = reviewer_credentials();
    backend.add_account(
        &reviewer.email,
        &reviewer.password,
        json!({ "name": "Permit Reviewer", "role": Role::Reviewer }),
    );
}

pub fn company_details_a() -> requests::CompanyDetails {
    requests::CompanyDetails {
        name: "Delta Basin Energy".into(),
        registration_number: "RC-100234".into(),
        email: Some("compliance@deltabasin.test".into()),
        address: Some("12 Marina Road".into()),
    }
}

pub fn company_details_b() -> requests::CompanyDetails {
    requests::CompanyDetails {
        name: "Northshore Offshore Services".into(),
        registration_number: "RC-208817".into(),
        email: None,
        address: None,
    }
}

pub fn permit_application_a(
    company_id: CompanyId,
) -> requests::PermitApplication {
    requests::PermitApplication {
        title: "Seismic survey, block OML-42".into(),
        permit_type: "exploration".into(),
        company_id,
        description: Some("3D survey over 120 square kilometres".into()),
    }
}

pub fn permit_application_b(
    company_id: CompanyId,
) -> requests::PermitApplication {
    requests::PermitApplication {
        title: "Flare gas recovery unit".into(),
        permit_type: "facility".into(),
        company_id,
        description: None,
    }
}

pub fn payment_details_a(company_id: CompanyId) -> requests::PaymentDetails {
    requests::PaymentDetails {
        company_id,
        permit_id: None,
        amount: dec!(1500.00),
        currency: "USD".into(),
        description: Some("Permit application fee".into()),
    }
}

pub fn inspection_details_a(
    company_id: CompanyId,
) -> requests::InspectionDetails {
    requests::InspectionDetails {
        facility: "Escravos gas plant".into(),
        company_id,
        scheduled_for: Timestamp::now() + Span::new().hours(72),
        inspector: Some("T. Okafor".into()),
        status: None,
        findings: None,
    }
}

pub fn notification_details_a() -> requests::NotificationDetails {
    requests::NotificationDetails {
        title: "Permit awaiting review".into(),
        message: "A new exploration permit was submitted".into(),
        priority: Priority::High,
    }
}

/// Assert that the result of an API action results in a specific status code.
pub fn assert_status_code<T>(
    result: Result<T, payloads::ClientError>,
    expected: StatusCode,
) {
    match result {
        Err(payloads::ClientError::APIError(code, _)) => {
            assert_eq!(code, expected)
        }
        _ => panic!("Expected APIError"),
    };
}

/// Start the mock backend on `config` and return a client pointed at it.
///
/// Telemetry is installed by whichever caller gets there first, so binaries
/// that want a more verbose level should initialize it before calling this.
pub async fn spawn_app_with(mut config: Config) -> TestApp {
    let subscriber = telemetry::get_subscriber("error");
    telemetry::init_subscriber(subscriber);

    let backend = web::Data::new(MockBackend::new());
    register_accounts(&backend);

    let server = backend::build(&mut config, backend.clone()).unwrap();
    tokio::spawn(server);

    let redirects = Arc::new(Mutex::new(Vec::new()));
    let session = Session::in_memory().on_unauthorized({
        let redirects = redirects.clone();
        move |route| {
            redirects
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(route.to_string())
        }
    });
    // 0.0.0.0 is not a connectable address
    let host = match config.ip.as_str() {
        "0.0.0.0" => "127.0.0.1",
        ip => ip,
    };
    let client_config = ClientConfig {
        base_url: format!("http://{host}:{}/api", config.port),
    };

    TestApp {
        port: config.port,
        client: APIClient::new(&client_config, session),
        backend,
        redirects,
    }
}

pub async fn spawn_app_on_port(port: u16) -> TestApp {
    spawn_app_with(Config {
        ip: "127.0.0.1".into(),
        port,
    })
    .await
}

/// Use OS-assigned port for parallel testing.
pub async fn spawn_app() -> TestApp {
    spawn_app_on_port(0).await
}

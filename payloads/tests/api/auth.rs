use payloads::{Role, requests, responses::DashboardBadges, session};
use reqwest::StatusCode;
use secrecy::ExposeSecret;
use test_helpers::{admin_credentials, assert_status_code, spawn_app};

#[tokio::test]
async fn login_stores_token_and_profile() -> anyhow::Result<()> {
    let app = spawn_app().await;

    let auth = app.login_admin().await?;

    let session = &app.client.session;
    assert_eq!(session.token().unwrap().expose_secret(), auth.token);
    let user = session.user().unwrap();
    assert_eq!(user, auth.user);
    assert_eq!(user.role, Role::CommissionAdmin);
    assert_eq!(user.email, admin_credentials().email);

    // the login itself went out without credentials
    let requests = app.backend.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].path, "/api/auth/login");
    assert_eq!(requests[0].authorization, None);
    Ok(())
}

#[tokio::test]
async fn login_refused() -> anyhow::Result<()> {
    let app = spawn_app().await;

    let body = requests::LoginCredentials {
        email: admin_credentials().email,
        password: "wrong".into(),
    };
    let result = app.client.login(&body).await;

    match result {
        Err(e @ payloads::ClientError::APIError(..)) => {
            assert_eq!(e.status(), Some(StatusCode::UNAUTHORIZED));
            assert_eq!(
                e.response_message().as_deref(),
                Some("Invalid email or password")
            );
        }
        _ => panic!("Expected APIError"),
    }
    assert!(!app.client.session.is_authenticated());
    // a 401 is a 401, whichever call received it
    assert_eq!(app.redirects(), vec![session::LOGIN_ROUTE.to_string()]);
    Ok(())
}

#[tokio::test]
async fn unauthorized_ends_session_once_per_response() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.login_admin().await?;
    app.backend.expire_tokens();

    let result = app.client.list_permits(None).await;

    assert_status_code(result, StatusCode::UNAUTHORIZED);
    assert!(app.client.session.token().is_none());
    assert!(app.client.session.user().is_none());
    assert_eq!(app.redirect_count(), 1);

    // every later 401 redirects again
    assert_status_code(
        app.client.dashboard_badges().await,
        StatusCode::UNAUTHORIZED,
    );
    assert_status_code(
        app.client.list_companies(None).await,
        StatusCode::UNAUTHORIZED,
    );
    assert_eq!(app.redirect_count(), 3);
    Ok(())
}

#[tokio::test]
async fn other_errors_leave_the_session_alone() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.login_admin().await?;
    app.backend.fail_path("/api/payments", 500, "Ledger offline");

    let result = app.client.list_payments(None).await;

    assert_status_code(result, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(app.client.session.is_authenticated());
    assert_eq!(app.redirect_count(), 0);
    Ok(())
}

#[tokio::test]
async fn bearer_token_on_every_request() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let auth = app.login_admin().await?;
    app.backend.clear_requests();

    let company = app.create_test_company().await?;
    app.create_test_permit(company.id).await?;
    app.client.list_permits(None).await?;
    app.client.dashboard_overview().await?;
    let missing = payloads::NotificationId(uuid::Uuid::new_v4());
    let _ = app.client.delete_notification(&missing).await;

    let expected = format!("Bearer {}", auth.token);
    let requests = app.backend.requests();
    assert_eq!(requests.len(), 5);
    for request in &requests {
        assert_eq!(request.authorization.as_deref(), Some(expected.as_str()));
    }
    Ok(())
}

#[tokio::test]
async fn no_authorization_header_without_token() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.login_admin().await?;
    app.client.session.sign_out();
    app.backend.clear_requests();

    let result = app.client.list_users(None).await;

    assert_status_code(result, StatusCode::UNAUTHORIZED);
    let requests = app.backend.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].authorization, None);
    Ok(())
}

#[tokio::test]
async fn generic_get_returns_the_whole_body() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.login_admin().await?;

    let body: serde_json::Value = app.client.get("dashboard/badges").await?;
    assert_eq!(body["success"], true);

    let badges: DashboardBadges = serde_json::from_value(body["data"].clone())?;
    assert_eq!(badges, DashboardBadges::default());
    Ok(())
}

#[tokio::test]
async fn generic_verbs_reach_the_backend() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.login_admin().await?;

    let created: serde_json::Value = app
        .client
        .post("companies", &test_helpers::company_details_b())
        .await?;
    let id = created["data"]["id"].as_str().unwrap().to_string();

    let updated: serde_json::Value = app
        .client
        .put(
            &format!("companies/{id}"),
            &serde_json::json!({ "address": "4 Wharf Street" }),
        )
        .await?;
    assert_eq!(updated["data"]["address"], "4 Wharf Street");

    let removed: serde_json::Value =
        app.client.delete(&format!("companies/{id}")).await?;
    assert_eq!(removed["data"], serde_json::Value::Null);

    let result = app
        .client
        .patch::<serde_json::Value>(
            &format!("companies/{id}/status"),
            &serde_json::json!({ "status": "approved" }),
        )
        .await;
    assert_status_code(result, StatusCode::NOT_FOUND);
    Ok(())
}

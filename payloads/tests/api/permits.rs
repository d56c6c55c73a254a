use payloads::{PermitId, PermitStatus, requests::ListQuery};
use reqwest::StatusCode;
use test_helpers::{assert_status_code, permit_application_b, spawn_app};
use uuid::Uuid;

#[tokio::test]
async fn create_and_get_permit() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.login_admin().await?;
    let company = app.create_test_company().await?;

    let permit = app.create_test_permit(company.id).await?;
    assert!(permit.reference.starts_with("PRM-"));
    assert_eq!(permit.company_id, company.id);

    let fetched = app.client.get_permit(&permit.id).await?;
    assert_eq!(fetched, permit);

    let permits = app.client.list_permits(None).await?;
    assert_eq!(permits, vec![permit]);
    Ok(())
}

#[tokio::test]
async fn approve_and_reject() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.login_admin().await?;
    let company = app.create_test_company().await?;
    let first = app.create_test_permit(company.id).await?;
    let second = app.create_test_permit(company.id).await?;

    let approved = app.client.approve_permit(&first.id, None).await?;
    assert_eq!(approved.status, PermitStatus::Approved);
    assert_eq!(approved.comment, None);

    let rejected = app
        .client
        .reject_permit(&second.id, Some("Incomplete survey data"))
        .await?;
    assert_eq!(rejected.status, PermitStatus::Rejected);
    assert_eq!(rejected.comment.as_deref(), Some("Incomplete survey data"));

    let under_review = app
        .client
        .update_permit_status(&first.id, PermitStatus::UnderReview, None)
        .await?;
    assert_eq!(under_review.status, PermitStatus::UnderReview);

    let recorded = app.backend.requests();
    let last = recorded.last().unwrap();
    assert_eq!(last.method, "PATCH");
    assert_eq!(last.path, format!("/api/permits/{}/status", first.id));
    Ok(())
}

#[tokio::test]
async fn list_filters_by_status_and_search() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.login_admin().await?;
    let company = app.create_test_company().await?;
    let survey = app.create_test_permit(company.id).await?;
    let flare = app
        .client
        .create_permit(&permit_application_b(company.id))
        .await?;
    app.client.approve_permit(&flare.id, None).await?;

    let approved = app
        .client
        .list_permits(Some(&ListQuery::status("approved")))
        .await?;
    assert_eq!(approved.len(), 1);
    assert_eq!(approved[0].id, flare.id);

    let found = app
        .client
        .list_permits(Some(&ListQuery::search("seismic")))
        .await?;
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, survey.id);

    let last = app.backend.requests().pop().unwrap();
    assert_eq!(last.query, "search=seismic");
    Ok(())
}

#[tokio::test]
async fn list_pages() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.login_admin().await?;
    let company = app.create_test_company().await?;
    for _ in 0..3 {
        app.create_test_permit(company.id).await?;
    }

    let query = ListQuery::default().page(1, 2);
    assert_eq!(app.client.list_permits(Some(&query)).await?.len(), 2);
    let query = ListQuery::default().page(2, 2);
    assert_eq!(app.client.list_permits(Some(&query)).await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn unknown_permit() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.login_admin().await?;

    let result = app.client.get_permit(&PermitId(Uuid::new_v4())).await;
    assert_status_code(result, StatusCode::NOT_FOUND);

    let result = app
        .client
        .approve_permit(&PermitId(Uuid::new_v4()), Some("n/a"))
        .await;
    assert_status_code(result, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn backend_error_message_is_kept() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.login_admin().await?;
    app.backend.fail_path("/api/permits", 503, "Permit registry offline");

    let error = app.client.list_permits(None).await.unwrap_err();

    assert_eq!(error.status(), Some(StatusCode::SERVICE_UNAVAILABLE));
    assert_eq!(
        error.response_message().as_deref(),
        Some("Permit registry offline")
    );

    app.backend.clear_failures();
    assert!(app.client.list_permits(None).await?.is_empty());
    Ok(())
}

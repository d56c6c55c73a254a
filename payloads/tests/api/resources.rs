use jiff::Span;
use payloads::{
    InspectionStatus, PaymentStatus, PlanStatus, Role, requests,
};
use reqwest::StatusCode;
use rust_decimal::dec;
use test_helpers::{
    assert_status_code, company_details_b, inspection_details_a, spawn_app,
};

#[tokio::test]
async fn user_lifecycle() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.login_admin().await?;
    let company = app.create_test_company().await?;

    let mut details = requests::UserDetails {
        name: "Amaka Obi".into(),
        email: "amaka@deltabasin.test".into(),
        role: Role::CompanyAdmin,
        company_id: Some(company.id),
        password: Some("initial-password".into()),
        active: None,
    };
    let user = app.client.create_user(&details).await?;
    assert_eq!(user.role, Role::CompanyAdmin);
    assert_eq!(user.company_id, Some(company.id));
    assert!(user.active);
    let stored = app.backend.records("users");
    assert!(stored.iter().all(|user| user.get("password").is_none()));

    details.active = Some(false);
    details.password = None;
    let updated = app.client.update_user(&user.id, &details).await?;
    assert!(!updated.active);

    app.client.delete_user(&user.id).await?;
    let users = app.client.list_users(None).await?;
    assert!(users.iter().all(|u| u.id != user.id));

    assert_status_code(
        app.client.delete_user(&user.id).await,
        StatusCode::NOT_FOUND,
    );
    Ok(())
}

#[tokio::test]
async fn company_update() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.login_admin().await?;
    let company = app.create_test_company().await?;

    let mut details = test_helpers::company_details_a();
    details.address = Some("1 Refinery Close".into());
    let updated = app.client.update_company(&company.id, &details).await?;

    assert_eq!(updated.id, company.id);
    assert_eq!(updated.address.as_deref(), Some("1 Refinery Close"));
    assert_eq!(app.client.list_companies(None).await?, vec![updated]);
    Ok(())
}

#[tokio::test]
async fn payment_status_changes() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.login_admin().await?;
    let company = app.create_test_company().await?;

    let payment = app.create_test_payment(company.id).await?;
    assert_eq!(payment.status, PaymentStatus::Pending);
    assert!(payment.reference.starts_with("PAY-"));

    let refunded = app
        .client
        .update_payment_status(
            &payment.id,
            PaymentStatus::Refunded,
            Some("Duplicate charge"),
        )
        .await?;
    assert_eq!(refunded.status, PaymentStatus::Refunded);
    assert_eq!(refunded.amount, dec!(1500));

    let pending = app
        .client
        .list_payments(Some(&requests::ListQuery::status("pending")))
        .await?;
    assert!(pending.is_empty());
    Ok(())
}

#[tokio::test]
async fn personnel_and_joint_ventures() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.login_admin().await?;
    let operator = app.create_test_company().await?;
    let partner = app.client.create_company(&company_details_b()).await?;

    let mut details = requests::PersonnelDetails {
        name: "Lars Henriksen".into(),
        nationality: "Norwegian".into(),
        position: "Subsea supervisor".into(),
        company_id: operator.id,
        passport_number: Some("N0471123".into()),
        expatriate: true,
    };
    let person = app.client.create_personnel(&details).await?;
    assert!(person.expatriate);

    details.position = "Subsea manager".into();
    let person = app.client.update_personnel(&person.id, &details).await?;
    assert_eq!(person.position, "Subsea manager");
    assert_eq!(app.client.list_personnel(None).await?.len(), 1);

    let mut venture = requests::JointVentureDetails {
        name: "OML-42 Joint Venture".into(),
        operator_id: operator.id,
        partner_ids: vec![],
    };
    let created = app.client.create_joint_venture(&venture).await?;
    assert!(created.partner_ids.is_empty());

    venture.partner_ids.push(partner.id);
    let updated = app
        .client
        .update_joint_venture(&created.id, &venture)
        .await?;
    assert_eq!(updated.partner_ids, vec![partner.id]);
    assert_eq!(app.client.list_joint_ventures(None).await?, vec![updated]);
    Ok(())
}

#[tokio::test]
async fn local_content_plans() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.login_admin().await?;
    let company = app.create_test_company().await?;

    let mut details = requests::LocalContentPlanDetails {
        company_id: company.id,
        period: "2025-Q3".into(),
        target_percentage: dec!(55.5),
        status: None,
    };
    let plan = app.client.create_local_content_plan(&details).await?;
    assert_eq!(plan.status, PlanStatus::Draft);
    assert_eq!(plan.target_percentage, dec!(55.5));

    details.status = Some(PlanStatus::Submitted);
    let plan = app
        .client
        .update_local_content_plan(&plan.id, &details)
        .await?;
    assert_eq!(plan.status, PlanStatus::Submitted);

    let submitted = app
        .client
        .list_local_content_plans(Some(&requests::ListQuery::status(
            "submitted",
        )))
        .await?;
    assert_eq!(submitted, vec![plan]);
    Ok(())
}

#[tokio::test]
async fn inspections() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.login_admin().await?;
    let company = app.create_test_company().await?;

    let mut details = inspection_details_a(company.id);
    let inspection = app.client.create_inspection(&details).await?;
    assert_eq!(inspection.status, InspectionStatus::Scheduled);
    assert_eq!(inspection.scheduled_for, details.scheduled_for);

    details.scheduled_for = details.scheduled_for + Span::new().hours(24);
    details.status = Some(InspectionStatus::Completed);
    details.findings = Some("No deficiencies".into());
    let inspection = app
        .client
        .update_inspection(&inspection.id, &details)
        .await?;
    assert_eq!(inspection.status, InspectionStatus::Completed);
    assert_eq!(inspection.findings.as_deref(), Some("No deficiencies"));
    assert_eq!(app.client.list_inspections(None).await?.len(), 1);
    Ok(())
}

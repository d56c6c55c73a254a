use payloads::AlertLevel;
use rust_decimal::dec;
use test_helpers::{mock::DevDataset, spawn_app};

#[tokio::test]
async fn overview_counts_the_dataset() -> anyhow::Result<()> {
    let app = spawn_app().await;
    DevDataset::create(&app).await?;

    let overview = app.client.dashboard_overview().await?;

    assert_eq!(overview.total_permits, 3);
    assert_eq!(overview.pending_permits, 1);
    assert_eq!(overview.approved_permits, 1);
    assert_eq!(overview.rejected_permits, 1);
    assert_eq!(overview.registered_companies, 2);
    assert_eq!(overview.scheduled_inspections, 1);
    assert_eq!(overview.payments_collected, dec!(1500.00));
    Ok(())
}

#[tokio::test]
async fn alerts_and_badges() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let dataset = DevDataset::create(&app).await?;

    let alerts = app.client.dashboard_alerts().await?;
    assert_eq!(alerts.len(), 2);
    assert_eq!(alerts[0].level, AlertLevel::Warning);
    assert!(alerts[0].message.contains(&dataset.pending_permit.reference));
    assert_eq!(alerts[1].level, AlertLevel::Critical);
    assert!(alerts[1].message.contains(&dataset.failed_fee.reference));

    let badges = app.client.dashboard_badges().await?;
    assert_eq!(badges.pending_permits, 1);
    assert_eq!(badges.pending_payments, 0);
    assert_eq!(badges.unread_notifications, 2);

    app.client
        .mark_notification_read(&dataset.notifications[0].id)
        .await?;
    let badges = app.client.dashboard_badges().await?;
    assert_eq!(badges.unread_notifications, 1);
    Ok(())
}

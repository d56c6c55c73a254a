use payloads::{Priority, requests::NotificationDetails};
use test_helpers::{notification_details_a, spawn_app};

#[tokio::test]
async fn read_unread_and_acknowledge() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.login_admin().await?;
    let seeded = app.seed_notification(&notification_details_a())?;
    assert!(!seeded.read);
    assert_eq!(seeded.priority, Priority::High);

    let read = app.client.mark_notification_read(&seeded.id).await?;
    assert!(read.read);
    assert!(!read.acknowledged);

    let unread = app.client.mark_notification_unread(&seeded.id).await?;
    assert!(!unread.read);

    let acknowledged = app.client.acknowledge_notification(&seeded.id).await?;
    assert!(acknowledged.read);
    assert!(acknowledged.acknowledged);

    let paths: Vec<String> = app
        .backend
        .requests()
        .into_iter()
        .filter(|request| request.method == "PATCH")
        .map(|request| request.path)
        .collect();
    let base = format!("/api/notifications/{}", seeded.id);
    assert_eq!(
        paths,
        vec![
            format!("{base}/read"),
            format!("{base}/unread"),
            format!("{base}/acknowledge"),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn delete_notification() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.login_admin().await?;
    let keep = app.seed_notification(&notification_details_a())?;
    let remove = app.seed_notification(&NotificationDetails {
        title: "Inspection rescheduled".into(),
        message: "The Escravos inspection moved to Friday".into(),
        priority: Priority::Low,
    })?;

    app.client.delete_notification(&remove.id).await?;

    let remaining = app.client.list_notifications(None).await?;
    assert_eq!(remaining, vec![keep]);
    Ok(())
}

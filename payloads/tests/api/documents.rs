use payloads::{DocumentId, requests::DocumentUpload};
use reqwest::StatusCode;
use test_helpers::{assert_status_code, spawn_app};
use uuid::Uuid;

fn survey_report() -> DocumentUpload {
    DocumentUpload {
        file_name: "seismic-survey.pdf".into(),
        content_type: "application/pdf".into(),
        bytes: b"%PDF-1.7\n% survey report\n".to_vec(),
        category: Some("permit-attachment".into()),
    }
}

#[tokio::test]
async fn upload_then_download() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.login_admin().await?;
    let upload = survey_report();

    let document = app.client.upload_document(upload.clone()).await?;
    assert_eq!(document.file_name, upload.file_name);
    assert_eq!(document.content_type, upload.content_type);
    assert_eq!(document.size, upload.bytes.len() as u64);
    assert_eq!(document.category, upload.category);

    let bytes = app.client.download_document(&document.id).await?;
    assert_eq!(bytes, upload.bytes);

    assert_eq!(app.client.list_documents(None).await?, vec![document]);
    Ok(())
}

#[tokio::test]
async fn upload_carries_the_bearer_token() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let auth = app.login_admin().await?;

    app.client
        .upload_document(DocumentUpload {
            category: None,
            ..survey_report()
        })
        .await?;

    let upload = app.backend.requests().pop().unwrap();
    assert_eq!(upload.path, "/api/documents/upload");
    assert_eq!(
        upload.authorization,
        Some(format!("Bearer {}", auth.token))
    );
    Ok(())
}

#[tokio::test]
async fn download_unknown_document() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.login_admin().await?;

    let result = app
        .client
        .download_document(&DocumentId(Uuid::new_v4()))
        .await;
    assert_status_code(result, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn upload_requires_login() -> anyhow::Result<()> {
    let app = spawn_app().await;

    let result = app.client.upload_document(survey_report()).await;

    assert_status_code(result, StatusCode::UNAUTHORIZED);
    assert_eq!(app.redirect_count(), 1);
    assert!(app.backend.records("documents").is_empty());
    Ok(())
}

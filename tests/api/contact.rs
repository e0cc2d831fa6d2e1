use crate::helpers::spawn_app;
use claims::assert_ok;
use marketing_api::models::Message;
use marketing_api::utils::{ResponseErrorMessage, ResponseMessage};
use sqlx::Row;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

fn valid_body() -> serde_json::Value {
    serde_json::json!({
        "name": "Ursula",
        "email": "ursula_le_guin@gmail.com",
        "message": "I would like to know more."
    })
}

#[tokio::test]
async fn contact_returns_a_200_for_valid_data() {
    // Arrange
    let app = spawn_app().await;

    // Act
    let response = app.post_contact(&valid_body()).await;

    // Assert
    assert_eq!(200, response.status().as_u16());

    let body: ResponseMessage = response.json().await.unwrap();
    assert_eq!(body.message, "Thank you for your message!");
}

#[tokio::test]
async fn a_contact_message_is_listed_first_for_the_admin() {
    // Arrange
    let app = spawn_app().await;
    app.post_contact(&serde_json::json!({
        "name": "Older",
        "email": "older@b.com",
        "message": "first"
    }))
    .await;

    // Act
    app.post_contact(&serde_json::json!({
        "name": "A",
        "email": "a@b.com",
        "message": "hi"
    }))
    .await;

    // Assert
    let messages: Vec<Message> = app.get_messages().await.json().await.unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].name, "A");
    assert_eq!(messages[0].email, "a@b.com");
    assert_eq!(messages[0].message, "hi");
}

#[tokio::test]
async fn identical_messages_are_all_kept() {
    // Arrange
    let app = spawn_app().await;

    // Act
    for _ in 0..3 {
        assert_eq!(200, app.post_contact(&valid_body()).await.status().as_u16());
    }

    // Assert
    let count: i64 = sqlx::query("SELECT COUNT(*) AS count FROM messages")
        .fetch_one(&app.db_pool)
        .await
        .unwrap()
        .get("count");
    assert_eq!(count, 3);
}

#[tokio::test]
async fn contact_notifies_the_admin_with_escaped_content() {
    // Arrange
    let app = spawn_app().await;

    Mock::given(path("/email"))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&app.email_server)
        .await;

    // Act
    app.post_contact(&serde_json::json!({
        "name": "Eve",
        "email": "eve@b.com",
        "message": "<script>alert(1)</script>"
    }))
    .await;

    // Assert
    let email_request = &app.wait_for_emails(1).await[0];
    let body: serde_json::Value = serde_json::from_slice(&email_request.body).unwrap();
    assert_eq!(body["To"], "admin@example.com");

    let html = body["HtmlBody"].as_str().unwrap();
    assert!(html.contains("&lt;script&gt;"));
    assert!(!html.contains("<script>"));
}

#[tokio::test]
async fn a_failing_email_api_does_not_fail_the_contact_request() {
    // Arrange
    let app = spawn_app().await;

    Mock::given(path("/email"))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&app.email_server)
        .await;

    // Act
    let response = app.post_contact(&valid_body()).await;

    // Assert
    assert_eq!(200, response.status().as_u16());
    app.wait_for_emails(1).await;
}

#[tokio::test]
async fn contact_returns_a_400_when_data_is_missing_or_invalid() {
    // Arrange
    let app = spawn_app().await;
    // Five requests fit in the contact rate limit window.
    let test_cases = vec![
        (
            serde_json::json!({"email": "a@b.com", "message": "hi"}),
            "missing the name",
        ),
        (
            serde_json::json!({"name": "A", "email": 7, "message": "hi"}),
            "a non-string email",
        ),
        (
            serde_json::json!({"name": "  ", "email": "a@b.com", "message": "hi"}),
            "a blank name",
        ),
        (
            serde_json::json!({"name": "A", "email": "not-an-email", "message": "hi"}),
            "an invalid email",
        ),
        (
            serde_json::json!({"name": "A", "email": "a@b.com", "message": ""}),
            "an empty message",
        ),
    ];

    for (invalid_body, description) in test_cases {
        // Act
        let response = app.post_contact(&invalid_body).await;

        // Assert
        assert_eq!(
            400,
            response.status().as_u16(),
            "The API did not fail with 400 Bad Request when the payload was {}.",
            description
        );
        assert_ok!(response.json::<ResponseErrorMessage>().await);
    }

    let count: i64 = sqlx::query("SELECT COUNT(*) AS count FROM messages")
        .fetch_one(&app.db_pool)
        .await
        .unwrap()
        .get("count");
    assert_eq!(count, 0);
}

#[tokio::test]
async fn contact_accepts_a_long_message() {
    // Arrange
    let app = spawn_app().await;

    // Act
    let response = app
        .post_contact(&serde_json::json!({
            "name": "A",
            "email": "a@b.com",
            "message": "a".repeat(20_000)
        }))
        .await;

    // Assert
    assert_eq!(200, response.status().as_u16());
}

#[tokio::test]
async fn contact_fails_if_there_is_a_fatal_database_error() {
    // Arrange
    let app = spawn_app().await;

    sqlx::query("DROP TABLE messages;")
        .execute(&app.db_pool)
        .await
        .unwrap();

    // Act
    let response = app.post_contact(&valid_body()).await;

    // Assert
    assert_eq!(response.status().as_u16(), 500);
}

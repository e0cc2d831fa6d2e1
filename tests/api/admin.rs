use crate::helpers::spawn_app;
use marketing_api::models::{Message, Subscriber};
use marketing_api::utils::ResponseErrorMessage;

#[tokio::test]
async fn admin_endpoints_reject_requests_without_credentials() {
    // Arrange
    let app = spawn_app().await;

    for resource in ["subscribers", "messages"] {
        // Act
        let response = app
            .api_client
            .get(&format!("{}/{}", &app.address, resource))
            .send()
            .await
            .expect("Failed to execute request.");

        // Assert
        assert_eq!(401, response.status().as_u16());
        assert_eq!(
            r#"Basic realm="admin""#,
            response.headers()["WWW-Authenticate"]
        );
        assert!(response.json::<ResponseErrorMessage>().await.is_ok());
    }
}

#[tokio::test]
async fn admin_endpoints_reject_wrong_credentials() {
    // Arrange
    let app = spawn_app().await;
    let key = app.admin_api_key.clone();
    let test_cases = vec![
        ("admin", "wrong-key".to_string(), "a wrong password"),
        ("root", key.clone(), "a wrong username"),
        ("admin", String::new(), "an empty password"),
    ];

    for (username, password, description) in test_cases {
        for resource in ["subscribers", "messages"] {
            // Act
            let response = app.get_as_admin(resource, username, &password).await;

            // Assert
            assert_eq!(
                401,
                response.status().as_u16(),
                "/{} did not reject {}.",
                resource,
                description
            );
        }
    }
}

#[tokio::test]
async fn admin_endpoints_reject_a_non_basic_scheme() {
    // Arrange
    let app = spawn_app().await;

    // Act
    let response = app
        .api_client
        .get(&format!("{}/subscribers", &app.address))
        .bearer_auth(&app.admin_api_key)
        .send()
        .await
        .expect("Failed to execute request.");

    // Assert
    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn empty_collections_are_listed_as_empty_arrays() {
    // Arrange
    let app = spawn_app().await;

    // Act
    let subscribers: Vec<Subscriber> = app.get_subscribers().await.json().await.unwrap();
    let messages: Vec<Message> = app.get_messages().await.json().await.unwrap();

    // Assert
    assert!(subscribers.is_empty());
    assert!(messages.is_empty());
}

#[tokio::test]
async fn subscribers_are_listed_newest_first() {
    // Arrange
    let app = spawn_app().await;

    for email in ["first@b.com", "second@b.com", "third@b.com"] {
        app.post_subscribe(&serde_json::json!({ "email": email }))
            .await;
    }

    // Act
    let response = app.get_subscribers().await;

    // Assert
    assert_eq!(200, response.status().as_u16());

    let subscribers: Vec<Subscriber> = response.json().await.unwrap();
    let emails: Vec<&str> = subscribers.iter().map(|s| s.email.as_str()).collect();
    assert_eq!(emails, vec!["third@b.com", "second@b.com", "first@b.com"]);
    assert!(
        subscribers
            .windows(2)
            .all(|pair| pair[0].subscribed_at >= pair[1].subscribed_at)
    );
}

#[tokio::test]
async fn listings_fail_with_a_500_if_the_store_is_broken() {
    // Arrange
    let app = spawn_app().await;

    sqlx::query("DROP TABLE subscribers;")
        .execute(&app.db_pool)
        .await
        .unwrap();

    // Act
    let response = app.get_subscribers().await;

    // Assert
    assert_eq!(500, response.status().as_u16());
}

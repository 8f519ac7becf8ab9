mod common;

use axum::http::StatusCode;
use serde_json::json;

use subscription_api::repositories::SubscriptionRepository;

use common::{get, post_json, read_body, send, send_json, subscribe_body, test_app, PHONE};

#[tokio::test]
async fn test_subscribe_twice_with_same_key_creates_one_subscription() {
    let app = test_app();

    let (first_status, first) = read_body(
        send(
            &app.router,
            post_json("/subscription/subscribe", Some("abc-123"), &subscribe_body(1, 3)),
        )
        .await,
    )
    .await;
    let (second_status, second) = read_body(
        send(
            &app.router,
            post_json("/subscription/subscribe", Some("abc-123"), &subscribe_body(1, 3)),
        )
        .await,
    )
    .await;

    assert_eq!(first_status, StatusCode::OK);
    assert_eq!(second_status, StatusCode::OK);
    assert_eq!(first, second);

    let repo = SubscriptionRepository::new(app.db.clone());
    assert_eq!(repo.count().await.unwrap(), 1);

    let subscription: serde_json::Value = serde_json::from_slice(&first).unwrap();
    assert_eq!(subscription["customerPhoneNumber"], PHONE);
    assert_eq!(subscription["serviceId"], 1);
    assert_eq!(subscription["service"]["name"], "eLearning Portal");
    assert_eq!(subscription["durationMonths"], 3);
}

#[tokio::test]
async fn test_same_key_with_different_body_is_a_new_request() {
    let app = test_app();

    let (_, first) = send_json(
        &app.router,
        post_json("/subscription/subscribe", Some("abc-123"), &subscribe_body(1, 3)),
    )
    .await;
    let (status, second) = send_json(
        &app.router,
        post_json("/subscription/subscribe", Some("abc-123"), &subscribe_body(2, 3)),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["serviceId"], 2);
    assert_ne!(first["id"], second["id"]);

    let repo = SubscriptionRepository::new(app.db.clone());
    assert_eq!(repo.count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_subscribe_without_key_is_rejected() {
    let app = test_app();

    let (status, body) = read_body(
        send(
            &app.router,
            post_json("/subscription/subscribe", None, &subscribe_body(1, 3)),
        )
        .await,
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(&body[..], br#"{"error":"Missing Idempotency-Key header"}"#);

    let repo = SubscriptionRepository::new(app.db.clone());
    assert_eq!(repo.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_subscribe_validation_errors() {
    let app = test_app();
    let body = r#"{"customerPhoneNumber":"5551234","serviceId":0,"durationMonths":13}"#;

    let (status, json) = send_json(
        &app.router,
        post_json("/subscription/subscribe", Some("bad-1"), body),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["statusCode"], 400);
    assert_eq!(json["error"], "ValidationError");
    assert_eq!(json["message"], "Request validation failed");
    assert_eq!(json["details"].as_array().unwrap().len(), 3);
    assert!(app.store.is_empty());
}

#[tokio::test]
async fn test_malformed_json_is_rejected_and_not_cached() {
    let app = test_app();

    let (status, json) = send_json(
        &app.router,
        post_json("/subscription/subscribe", Some("bad-2"), "{not json"),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "ValidationError");
    assert!(app.store.is_empty());
}

#[tokio::test]
async fn test_unknown_service_is_not_found_and_not_cached() {
    let app = test_app();

    for _ in 0..2 {
        let (status, json) = send_json(
            &app.router,
            post_json("/subscription/subscribe", Some("nf-1"), &subscribe_body(99, 3)),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(
            json,
            json!({
                "statusCode": 404,
                "message": "Service with ID 99 was not found",
                "error": "ServiceNotFound"
            })
        );
    }
    assert!(app.store.is_empty());
    assert_eq!(app.interceptor.metrics().snapshot().executions, 2);
}

#[tokio::test]
async fn test_duplicate_subscription_with_new_key_conflicts() {
    let app = test_app();

    send(
        &app.router,
        post_json("/subscription/subscribe", Some("k-1"), &subscribe_body(3, 2)),
    )
    .await;
    let (status, json) = send_json(
        &app.router,
        post_json("/subscription/subscribe", Some("k-2"), &subscribe_body(3, 2)),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"], "DuplicateSubscription");
    assert_eq!(
        json["message"],
        format!("Customer {} is already subscribed to Gaming+ Catalogue", PHONE)
    );
}

#[tokio::test]
async fn test_unsubscribe_flow() {
    let app = test_app();
    let body = format!(r#"{{"customerPhoneNumber":"{}","serviceId":4}}"#, PHONE);

    send(
        &app.router,
        post_json("/subscription/subscribe", Some("sub-1"), &subscribe_body(4, 1)),
    )
    .await;

    let (status, bytes) = read_body(
        send(
            &app.router,
            post_json("/subscription/unsubscribe", Some("unsub-1"), &body),
        )
        .await,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(bytes.is_empty());

    // Replayed without touching the store again.
    let (status, _) = read_body(
        send(
            &app.router,
            post_json("/subscription/unsubscribe", Some("unsub-1"), &body),
        )
        .await,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = send_json(
        &app.router,
        post_json("/subscription/unsubscribe", Some("unsub-2"), &body),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "SubscriptionNotFound");
}

#[tokio::test]
async fn test_list_and_get_services() {
    let app = test_app();

    let (status, json) = send_json(&app.router, get("/services")).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap())
        .collect();
    assert_eq!(
        names,
        vec!["eLearning Portal", "Health&Lifestyle", "Gaming+ Catalogue", "Magazines and News"]
    );

    let (status, json) = send_json(&app.router, get("/services/2")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["monthlyPrice"], json!(12.0));

    let (status, json) = send_json(&app.router, get("/services/9")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "ServiceNotFound");

    let (status, _) = send_json(&app.router, get("/services/abc")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_subscription_summary() {
    let app = test_app();

    send(
        &app.router,
        post_json("/subscription/subscribe", Some("s-1"), &subscribe_body(2, 1)),
    )
    .await;
    send(
        &app.router,
        post_json("/subscription/subscribe", Some("s-2"), &subscribe_body(4, 1)),
    )
    .await;

    let (status, json) = send_json(
        &app.router,
        get("/subscription/subscription-summary?customerPhoneNumber=%2B15551234567"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["customerPhoneNumber"], PHONE);
    assert_eq!(json["subscriptions"].as_array().unwrap().len(), 2);
    assert_eq!(json["totalCostBeforeDiscounts"], json!(20.0));
    assert_eq!(json["totalDiscounts"], json!(12.0));
    assert_eq!(json["finalCost"], json!(8.0));
    assert_eq!(
        json["appliedDiscounts"][0]["discountName"],
        "Service Pair Promotion (Health&Lifestyle + Magazines)"
    );
}

#[tokio::test]
async fn test_summary_requires_valid_phone() {
    let app = test_app();

    let (status, json) = send_json(
        &app.router,
        get("/subscription/subscription-summary?customerPhoneNumber=12345"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "ValidationError");

    let (status, _) = send_json(&app.router, get("/subscription/subscription-summary")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health_endpoints() {
    let app = test_app();

    let (status, json) = send_json(&app.router, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["dependencies"][0]["name"], "memory");

    assert_eq!(send(&app.router, get("/live")).await.status(), StatusCode::OK);
    assert_eq!(send(&app.router, get("/ready")).await.status(), StatusCode::OK);
    assert_eq!(send(&app.router, get("/metrics")).await.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_request_id_is_propagated() {
    let app = test_app();

    let response = send(&app.router, get("/services")).await;
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_unrouted_path_casing_skips_idempotency() {
    let app = test_app();

    let response = send(
        &app.router,
        post_json("/Subscription/Subscribe", None, &subscribe_body(1, 3)),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(app.store.is_empty());
    assert_eq!(app.interceptor.metrics().snapshot().total_requests, 0);
}

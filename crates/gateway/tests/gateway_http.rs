//! Contract tests for the provider gateway against the provider REST surface.
//!
//! These tests use wiremock to simulate a provider backend and verify the
//! wire paths, forwarded headers, authentication modes, and the mapping of
//! transport/HTTP failures into the gateway error taxonomy.

use std::time::Duration;

use common::{Money, ProviderId, UserId};
use gateway::{GatewayError, Identity, PaymentDetails, ProviderApi, ProviderGateway};
use registry::{AuthMode, Provider};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn provider(server: &MockServer, auth: AuthMode) -> Provider {
    Provider {
        id: ProviderId::new("AEROLINEAS"),
        display_name: "Aerolíneas".into(),
        base_url: server.uri(),
        auth,
        timeout_secs: 2.0,
        markup_percent: 0.0,
        enabled: true,
    }
}

fn identity() -> Identity {
    Identity::new(UserId::new(42))
        .with_email("ada@agency.test")
        .with_name("Ada")
}

fn payment() -> PaymentDetails {
    serde_json::from_value(serde_json::json!({
        "tarjeta": {"numero": "4111111111111111", "cvv": "999"},
        "facturacion": {}
    }))
    .unwrap()
}

#[tokio::test]
async fn fetch_cart_forwards_identity_headers_and_normalizes_items() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/compras/carrito"))
        .and(header("Accept", "application/json"))
        .and(header("X-User-Id", "42"))
        .and(header("X-User-Email", "ada@agency.test"))
        .and(header("X-User-Name", "Ada"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "idCarrito": 9,
            "items": [
                {"idItem": 1, "idVuelo": 204, "idClase": 2, "cantidad": 2, "precioBase": "150.00"},
                {"idItem": "x2", "idVuelo": 301, "idClase": 1, "precio": 99.5}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let gw = ProviderGateway::new();
    let cart = gw
        .fetch_cart(&provider(&server, AuthMode::None), &identity())
        .await
        .unwrap();

    assert_eq!(cart.items.len(), 2);
    assert_eq!(cart.items[0].unit_base_price, Money::from_cents(15000));
    assert_eq!(cart.items[1].item_id, "x2");
    assert_eq!(cart.items[1].quantity, 1);
    assert_eq!(cart.items[1].unit_base_price, Money::from_cents(9950));
}

#[tokio::test]
async fn credentials_mode_sends_webservice_headers() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/compras/carrito"))
        .and(header("X-WebService-Email", "ws@agency.test"))
        .and(header("X-WebService-Password", "hunter2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"items": []})))
        .expect(1)
        .mount(&server)
        .await;

    let gw = ProviderGateway::new();
    let auth = AuthMode::Credentials {
        email: "ws@agency.test".into(),
        password: "hunter2".into(),
    };
    gw.fetch_cart(&provider(&server, auth), &identity())
        .await
        .unwrap();
}

#[tokio::test]
async fn bearer_mode_handshakes_once_and_reuses_token() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .and(body_json(serde_json::json!({
            "email": "ws@agency.test",
            "password": "hunter2"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "token": "tok-abc",
            "expiresIn": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/compras/carrito"))
        .and(header("Authorization", "Bearer tok-abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"items": []})))
        .expect(2)
        .mount(&server)
        .await;

    let gw = ProviderGateway::new();
    let auth = AuthMode::BearerToken {
        email: "ws@agency.test".into(),
        password: "hunter2".into(),
    };
    let prov = provider(&server, auth);

    gw.fetch_cart(&prov, &identity()).await.unwrap();
    gw.fetch_cart(&prov, &identity()).await.unwrap();
}

#[tokio::test]
async fn add_item_sends_pair_query_and_payload() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/compras/items"))
        .and(query_param("pair", "true"))
        .and(body_json(serde_json::json!({
            "idVuelo": 204,
            "idClase": 2,
            "cantidad": 3
        })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let gw = ProviderGateway::new();
    gw.add_item(&provider(&server, AuthMode::None), &identity(), 204, 2, 3, true)
        .await
        .unwrap();
}

#[tokio::test]
async fn update_and_remove_use_sync_pareja_query() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/api/compras/items/17"))
        .and(query_param("syncPareja", "true"))
        .and(body_json(serde_json::json!({"cantidad": 5})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/api/compras/items/17"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let gw = ProviderGateway::new();
    let prov = provider(&server, AuthMode::None);
    gw.update_item(&prov, &identity(), "17", 5, true).await.unwrap();
    gw.remove_item(&prov, &identity(), "17", false).await.unwrap();
}

#[tokio::test]
async fn checkout_returns_reservation_id_and_detail_normalizes() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/compras/checkout"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"idReserva": 981})),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/compras/reservas/981"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "idReserva": 981,
            "codigo": "ABC123",
            "idEstado": 1,
            "total": "350.00"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let gw = ProviderGateway::new();
    let prov = provider(&server, AuthMode::None);

    let receipt = gw.checkout(&prov, &identity(), &payment()).await.unwrap();
    assert_eq!(receipt.reservation_id, "981");

    let detail = gw
        .reservation_detail(&prov, &identity(), &receipt.reservation_id)
        .await
        .unwrap();
    assert_eq!(detail.confirmation_code.as_deref(), Some("ABC123"));
    assert_eq!(detail.total, Money::from_cents(35000));
}

#[tokio::test]
async fn cancel_posts_to_cancelar() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/compras/reservas/981/cancelar"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let gw = ProviderGateway::new();
    gw.cancel_reservation(&provider(&server, AuthMode::None), &identity(), "981")
        .await
        .unwrap();
}

#[tokio::test]
async fn rejected_parses_provider_error_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/compras/checkout"))
        .respond_with(
            ResponseTemplate::new(409)
                .set_body_json(serde_json::json!({"error": "asientos agotados"})),
        )
        .mount(&server)
        .await;

    let gw = ProviderGateway::new();
    let err = gw
        .checkout(&provider(&server, AuthMode::None), &identity(), &payment())
        .await
        .unwrap_err();

    match err {
        GatewayError::Rejected {
            status, message, ..
        } => {
            assert_eq!(status, 409);
            assert_eq!(message, "asientos agotados");
        }
        other => panic!("expected Rejected, got {other:?}"),
    }
}

#[tokio::test]
async fn rejected_without_body_falls_back_to_status_message() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/compras/carrito"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let gw = ProviderGateway::new();
    let err = gw
        .fetch_cart(&provider(&server, AuthMode::None), &identity())
        .await
        .unwrap_err();

    match err {
        GatewayError::Rejected {
            status, message, ..
        } => {
            assert_eq!(status, 500);
            assert!(message.contains("500"));
        }
        other => panic!("expected Rejected, got {other:?}"),
    }
}

#[tokio::test]
async fn slow_provider_maps_to_timeout() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/compras/carrito"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"items": []}))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let gw = ProviderGateway::new();
    let mut prov = provider(&server, AuthMode::None);
    prov.timeout_secs = 0.2;

    let err = gw.fetch_cart(&prov, &identity()).await.unwrap_err();
    assert!(matches!(err, GatewayError::Timeout { .. }));
    assert_eq!(err.provider().as_str(), "AEROLINEAS");
    assert!(err.is_transport());
}

#[tokio::test]
async fn unreachable_host_maps_to_unreachable() {
    let gw = ProviderGateway::new();
    let prov = Provider {
        id: ProviderId::new("DOWN"),
        display_name: "Down".into(),
        // Nothing listens here.
        base_url: "http://127.0.0.1:1".into(),
        auth: AuthMode::None,
        timeout_secs: 1.0,
        markup_percent: 0.0,
        enabled: true,
    };

    let err = gw.fetch_cart(&prov, &identity()).await.unwrap_err();
    assert!(matches!(err, GatewayError::Unreachable { .. }));
}

#[tokio::test]
async fn failed_handshake_fails_the_call_fast() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    // The cart endpoint must never be hit when the handshake fails.
    Mock::given(method("GET"))
        .and(path("/api/compras/carrito"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"items": []})))
        .expect(0)
        .mount(&server)
        .await;

    let gw = ProviderGateway::new();
    let auth = AuthMode::BearerToken {
        email: "ws@agency.test".into(),
        password: "wrong".into(),
    };
    let err = gw
        .fetch_cart(&provider(&server, auth), &identity())
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Credential { .. }));
}

#[tokio::test]
async fn numeric_user_id_is_the_only_identity_requirement() {
    let server = MockServer::start().await;

    // No email/name headers when the identity carries none.
    Mock::given(method("GET"))
        .and(path("/api/compras/carrito"))
        .and(header("X-User-Id", "7"))
        .respond_with(move |req: &Request| {
            assert!(req.headers.get("X-User-Email").is_none());
            assert!(req.headers.get("X-User-Name").is_none());
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"items": []}))
        })
        .mount(&server)
        .await;

    let gw = ProviderGateway::new();
    gw.fetch_cart(
        &provider(&server, AuthMode::None),
        &Identity::new(UserId::new(7)),
    )
    .await
    .unwrap();
}

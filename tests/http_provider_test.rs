use httpmock::prelude::*;
use std::time::Duration;
use strangler_router::adapters::HttpProvider;
use strangler_router::domain::ports::CustomerProvider;
use strangler_router::{Lookup, ProviderError, RoutingKey, Selector};

fn key(raw: &str) -> RoutingKey {
    RoutingKey::parse(raw).unwrap()
}

#[tokio::test]
async fn test_found_customer_is_tagged_with_backend() {
    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(GET).path("/customers/MODERN_1");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(serde_json::json!({"id": "MODERN_1", "name": "Modern Customer"}));
    });

    let provider = HttpProvider::new(Selector::modern(), &server.url("/customers"), None).unwrap();
    let lookup = provider.lookup(&key("MODERN_1")).await.unwrap();

    api_mock.assert();
    match lookup {
        Lookup::Found(customer) => {
            assert_eq!(customer.id, "MODERN_1");
            assert_eq!(customer.name.as_deref(), Some("Modern Customer"));
            assert_eq!(customer.source, Some(Selector::modern()));
        }
        Lookup::NotFound => panic!("expected a customer"),
    }
}

#[tokio::test]
async fn test_backend_cannot_choose_its_own_source_tag() {
    let server = MockServer::start();
    let _api_mock = server.mock(|when, then| {
        when.method(GET).path("/customers/MODERN_3");
        then.status(200).json_body(
            serde_json::json!({"id": "MODERN_3", "name": "Spoof", "source": "legacy"}),
        );
    });

    let provider = HttpProvider::new(Selector::modern(), &server.url("/customers"), None).unwrap();
    let lookup = provider.lookup(&key("MODERN_3")).await.unwrap();

    match lookup {
        Lookup::Found(customer) => assert_eq!(customer.source, Some(Selector::modern())),
        Lookup::NotFound => panic!("expected a customer"),
    }
}

#[tokio::test]
async fn test_null_name_is_accepted() {
    let server = MockServer::start();
    let _api_mock = server.mock(|when, then| {
        when.method(GET).path("/customers/MODERN_2");
        then.status(200)
            .json_body(serde_json::json!({"id": "MODERN_2", "name": null}));
    });

    let provider = HttpProvider::new(Selector::modern(), &server.url("/customers"), None).unwrap();

    match provider.lookup(&key("MODERN_2")).await.unwrap() {
        Lookup::Found(customer) => assert_eq!(customer.name, None),
        Lookup::NotFound => panic!("expected a customer"),
    }
}

#[tokio::test]
async fn test_404_is_not_found_not_an_error() {
    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(GET).path("/customers/MODERN_404");
        then.status(404);
    });

    let provider = HttpProvider::new(Selector::modern(), &server.url("/customers"), None).unwrap();
    let lookup = provider.lookup(&key("MODERN_404")).await.unwrap();

    api_mock.assert();
    assert_eq!(lookup, Lookup::NotFound);
}

#[tokio::test]
async fn test_server_error_is_provider_failure() {
    let server = MockServer::start();
    let _api_mock = server.mock(|when, then| {
        when.method(GET).path("/customers/MODERN_1");
        then.status(500);
    });

    let provider = HttpProvider::new(Selector::modern(), &server.url("/customers"), None).unwrap();
    let err = provider.lookup(&key("MODERN_1")).await.unwrap_err();

    assert!(matches!(
        err,
        ProviderError::UnexpectedStatus { status: 500, .. }
    ));
}

#[tokio::test]
async fn test_malformed_body_is_invalid_payload() {
    let server = MockServer::start();
    let _api_mock = server.mock(|when, then| {
        when.method(GET).path("/customers/MODERN_1");
        then.status(200).body("<html>maintenance</html>");
    });

    let provider = HttpProvider::new(Selector::modern(), &server.url("/customers"), None).unwrap();
    let err = provider.lookup(&key("MODERN_1")).await.unwrap_err();

    assert!(matches!(err, ProviderError::InvalidPayload(_)));
}

#[tokio::test]
async fn test_oversized_body_is_rejected_before_parsing() {
    let server = MockServer::start();
    // 內容本身是合法 JSON，只是太大
    let huge_name = "x".repeat(HttpProvider::MAX_BODY_BYTES);
    let _api_mock = server.mock(|when, then| {
        when.method(GET).path("/customers/MODERN_1");
        then.status(200)
            .json_body(serde_json::json!({"id": "MODERN_1", "name": huge_name}));
    });

    let provider = HttpProvider::new(Selector::modern(), &server.url("/customers"), None).unwrap();
    let err = provider.lookup(&key("MODERN_1")).await.unwrap_err();

    match err {
        ProviderError::InvalidPayload(message) => assert!(message.contains("limit"), "{}", message),
        other => panic!("expected InvalidPayload, got {:?}", other),
    }
}

#[tokio::test]
async fn test_body_under_limit_is_accepted() {
    let server = MockServer::start();
    let name = "x".repeat(HttpProvider::MAX_BODY_BYTES / 2);
    let _api_mock = server.mock(|when, then| {
        when.method(GET).path("/customers/MODERN_1");
        then.status(200)
            .json_body(serde_json::json!({"id": "MODERN_1", "name": name.clone()}));
    });

    let provider = HttpProvider::new(Selector::modern(), &server.url("/customers"), None).unwrap();
    let lookup = provider.lookup(&key("MODERN_1")).await.unwrap();

    match lookup {
        Lookup::Found(customer) => assert_eq!(customer.name.as_deref(), Some(name.as_str())),
        Lookup::NotFound => panic!("expected a customer"),
    }
}

#[tokio::test]
async fn test_client_timeout_is_transport_failure() {
    let server = MockServer::start();
    let _api_mock = server.mock(|when, then| {
        when.method(GET).path("/customers/MODERN_1");
        then.status(200)
            .delay(Duration::from_millis(500))
            .json_body(serde_json::json!({"id": "MODERN_1", "name": "Slow"}));
    });

    let provider = HttpProvider::new(
        Selector::modern(),
        &server.url("/customers"),
        Some(Duration::from_millis(50)),
    )
    .unwrap();
    let err = provider.lookup(&key("MODERN_1")).await.unwrap_err();

    match err {
        ProviderError::Transport(e) => assert!(e.is_timeout()),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_unreachable_backend_is_transport_failure() {
    // 保留的連接埠，沒有服務在監聽
    let provider =
        HttpProvider::new(Selector::modern(), "http://127.0.0.1:9/customers", None).unwrap();

    let err = provider.lookup(&key("MODERN_1")).await.unwrap_err();

    assert!(matches!(err, ProviderError::Transport(_)));
}

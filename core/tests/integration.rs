//! End-to-end tests against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then drives `RestClient` over
//! real HTTP through `UreqTransport`. Covers every verb, both codecs,
//! content-type sniffing, basic auth, cookie replay, and transport failures.

use std::net::SocketAddr;
use std::time::Duration;

use mock_server::{Echo, PASSWORD, USERNAME};
use rest_core::{
    ClientConfig, ContentType, Decoded, Params, RestClient, RestError, UreqTransport,
};
use serde_json::{json, Value};

fn start_server() -> SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    addr
}

fn params(value: Value) -> Params {
    match value {
        Value::Object(map) => map,
        other => panic!("not an object: {other}"),
    }
}

fn echo(decoded: Decoded) -> Echo {
    serde_json::from_value(decoded.into_value()).unwrap()
}

#[test]
fn query_verbs_append_parameters() {
    let addr = start_server();
    let url = format!("http://{addr}/echo");

    for verb in ["get", "options"] {
        let mut client = RestClient::new().unwrap();
        client
            .user_agent("Yah")
            .configure(verb, &url, Some(params(json!({"a": "1", "b": "two words"}))))
            .unwrap();
        let seen = echo(client.execute(false).unwrap());
        assert_eq!(seen.method, verb.to_uppercase());
        assert_eq!(seen.query.as_deref(), Some("a=1&b=two+words"), "{verb}");
        assert_eq!(seen.user_agent.as_deref(), Some("Yah"));
        assert_eq!(seen.accept.as_deref(), Some("application/json"));
        assert_eq!(seen.body, "");
    }
}

#[test]
fn head_returns_empty_body_as_null() {
    let addr = start_server();
    let mut client = RestClient::new().unwrap();
    client
        .configure("head", &format!("http://{addr}/echo"), Some(params(json!({"a": "1"}))))
        .unwrap();
    assert_eq!(client.execute(false).unwrap(), Decoded::Mapping(Value::Null));
    assert_eq!(client.last_status(), Some(200));
}

#[test]
fn body_verbs_send_json_payload() {
    let addr = start_server();
    let url = format!("http://{addr}/echo");

    for verb in ["post", "put", "patch", "delete"] {
        let mut client = RestClient::new().unwrap();
        client
            .configure(verb, &url, Some(params(json!({"title": "milk", "done": false}))))
            .unwrap();
        let seen = echo(client.execute(false).unwrap());
        assert_eq!(seen.method, verb.to_uppercase());
        assert!(seen.query.is_none(), "{verb}");
        assert_eq!(seen.content_type.as_deref(), Some("application/json"));
        let body: Value = serde_json::from_str(&seen.body).unwrap();
        assert_eq!(body, json!({"title": "milk", "done": false}), "{verb}");
    }
}

#[test]
fn custom_verb_reaches_the_wire_in_both_modes() {
    let addr = start_server();
    let url = format!("http://{addr}/echo");

    let mut client = RestClient::new().unwrap();
    client
        .configure("custom:PURGE", &url, Some(params(json!({"key": "k1"}))))
        .unwrap();
    let seen = echo(client.execute(false).unwrap());
    assert_eq!(seen.method, "PURGE");
    assert_eq!(seen.query.as_deref(), Some("key=k1"));
    assert_eq!(seen.body, "");

    client
        .use_post(true)
        .configure("custom:PURGE", &url, Some(params(json!({"key": "k1"}))))
        .unwrap();
    let seen = echo(client.execute(false).unwrap());
    assert_eq!(seen.method, "PURGE");
    assert!(seen.query.is_none());
    assert_eq!(seen.body, r#"{"key":"k1"}"#);
}

#[test]
fn xml_request_and_response() {
    let addr = start_server();
    let mut client = RestClient::new().unwrap();
    client
        .content_type(ContentType::XML)
        .configure(
            "post",
            &format!("http://{addr}/xml"),
            Some(params(json!({"user": {"name": "ann", "roles": ["a", "b"]}}))),
        )
        .unwrap();
    let decoded = client.execute(false).unwrap();
    assert_eq!(
        decoded.into_value(),
        json!({"received": {
            "@attributes": {"method": "POST"},
            "user": {"name": "ann", "roles": ["a", "b"]}
        }})
    );
}

#[test]
fn sniffing_picks_codec_from_response() {
    let addr = start_server();

    // Server answers JSON while the client is configured for XML.
    let mut client = RestClient::new().unwrap();
    client
        .content_type(ContentType::XML)
        .use_response_content_type(true)
        .configure("get", &format!("http://{addr}/echo"), None)
        .unwrap();
    let seen = echo(client.execute(false).unwrap());
    assert_eq!(seen.accept.as_deref(), Some("application/xml"));
    assert_eq!(client.observed_content_type(), Some(&ContentType::JSON));

    // Without sniffing the same response is fed to the XML codec.
    client
        .use_response_content_type(false)
        .configure("get", &format!("http://{addr}/echo"), None)
        .unwrap();
    assert!(matches!(client.execute(false), Err(RestError::Decode(_))));
}

#[test]
fn sniffed_unknown_type_is_unsupported() {
    let addr = start_server();
    let mut client = RestClient::new().unwrap();
    client
        .use_response_content_type(true)
        .configure("get", &format!("http://{addr}/plain"), None)
        .unwrap();
    let err = client.execute(false).unwrap_err();
    assert!(matches!(err, RestError::UnsupportedContentType(t) if t == "text/plain"));
}

#[test]
fn malformed_json_is_decode_error() {
    let addr = start_server();
    let mut client = RestClient::new().unwrap();
    client
        .configure("get", &format!("http://{addr}/broken"), None)
        .unwrap();
    assert!(matches!(client.execute(false), Err(RestError::Decode(_))));
}

#[test]
fn basic_auth_is_accepted() {
    let addr = start_server();
    let url = format!("http://{addr}/protected");

    let mut anonymous = RestClient::new().unwrap();
    anonymous.configure("get", &url, None).unwrap();
    let decoded = anonymous.execute(true).unwrap();
    assert_eq!(anonymous.last_status(), Some(401));
    assert_eq!(decoded.as_record().unwrap().get("error"), Some(&json!("unauthorized")));

    let mut client = RestClient::new().unwrap();
    client.http_auth(USERNAME, PASSWORD).configure("get", &url, None).unwrap();
    let decoded = client.execute(true).unwrap();
    assert_eq!(client.last_status(), Some(200));
    assert_eq!(decoded.as_record().unwrap().get("user"), Some(&json!(USERNAME)));
}

#[test]
fn fail_on_status_turns_401_into_error() {
    let addr = start_server();
    let config = ClientConfig {
        fail_on_status: true,
        ..ClientConfig::default()
    };
    let mut client = RestClient::with_config(config).unwrap();
    client
        .configure("get", &format!("http://{addr}/protected"), None)
        .unwrap();
    assert!(matches!(
        client.execute(false),
        Err(RestError::HttpStatus { status: 401, .. })
    ));
}

#[test]
fn cookies_persist_across_calls_on_one_instance() {
    let addr = start_server();
    let mut client = RestClient::new().unwrap();

    client
        .configure(
            "get",
            &format!("http://{addr}/cookies/set"),
            Some(params(json!({"sid": "42", "theme": "dark"}))),
        )
        .unwrap();
    client.execute(false).unwrap();
    assert_eq!(client.cookie_jar().len().unwrap(), 2);

    client
        .configure("get", &format!("http://{addr}/echo"), None)
        .unwrap();
    let seen = echo(client.execute(false).unwrap());
    assert_eq!(seen.cookie.as_deref(), Some("sid=42; theme=dark"));

    // A fresh instance starts with an empty jar.
    let mut other = RestClient::new().unwrap();
    other
        .configure("get", &format!("http://{addr}/echo"), None)
        .unwrap();
    assert!(echo(other.execute(false).unwrap()).cookie.is_none());
}

#[test]
fn timeout_is_transport_error_and_jar_is_released() {
    let addr = start_server();
    let transport = UreqTransport::with_timeout(Some(Duration::from_millis(100)));
    let mut client = RestClient::with_transport(transport).unwrap();
    let jar_path = client.cookie_jar().path().to_path_buf();

    client
        .configure("get", &format!("http://{addr}/slow"), Some(params(json!({"ms": 2000}))))
        .unwrap();
    let err = client.execute(false).unwrap_err();
    assert!(matches!(err, RestError::Transport { code, .. } if code == "timeout"));

    drop(client);
    assert!(!jar_path.exists());
}

#[test]
fn bodies_over_ten_megabytes_are_read_whole() {
    let addr = start_server();
    let size = 11 * 1024 * 1024;
    let mut client = RestClient::new().unwrap();
    client
        .configure("get", &format!("http://{addr}/large"), Some(params(json!({"bytes": size}))))
        .unwrap();
    let decoded = client.execute(false).unwrap().into_value();
    assert_eq!(decoded.as_str().map(str::len), Some(size));
}

#[test]
fn body_limit_is_a_transport_error() {
    let addr = start_server();
    let transport = UreqTransport::new().with_body_limit(1024);
    let mut client = RestClient::with_transport(transport).unwrap();
    client
        .configure("get", &format!("http://{addr}/large"), Some(params(json!({"bytes": 4096}))))
        .unwrap();
    let err = client.execute(false).unwrap_err();
    assert!(matches!(err, RestError::Transport { ref code, .. } if code == "body_limit"), "{err}");
}

#[test]
fn typed_result_via_execute_into() {
    let addr = start_server();
    let mut client = RestClient::new().unwrap();
    client
        .configure("get", &format!("http://{addr}/echo"), Some(params(json!({"page": 3}))))
        .unwrap();
    let seen: Echo = client.execute_into().unwrap();
    assert_eq!(seen.query.as_deref(), Some("page=3"));
}

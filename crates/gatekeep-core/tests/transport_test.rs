mod common;

use common::{client, dead_mirror, text, FakeService, Reply, MAC, SOFT_ID, VERSION};
use gatekeep_core::{CallError, Endpoint};
use std::time::{Duration, Instant};

const LOGIN: u8 = 11;
const REGISTER: u8 = 10;
const ANNOUNCEMENT: u8 = 1;

#[tokio::test]
async fn request_is_form_encoded_with_identity_fields() {
    let service = FakeService::start().await;
    service.reply(LOGIN, text("TOKEN123"));
    let api = client(vec![service.url.clone()]);

    let token = api.user_login("alice01", "secret01").await.unwrap();
    assert_eq!(token, "TOKEN123");

    let hits = service.hits();
    assert_eq!(hits.len(), 1);
    let hit = &hits[0];
    assert_eq!(hit.query_type.as_deref(), Some("11"));
    assert_eq!(hit.form["Softid"], SOFT_ID);
    assert_eq!(hit.form["type"], "11");
    assert_eq!(hit.form["UserName"], "alice01");
    assert_eq!(hit.form["UserPwd"], "secret01");
    assert_eq!(hit.form["Version"], VERSION);
    assert_eq!(hit.form["Mac"], MAC);
}

#[tokio::test]
async fn response_body_is_trimmed() {
    let service = FakeService::start().await;
    service.reply(ANNOUNCEMENT, text("  maintenance tonight \r\n"));
    let api = client(vec![service.url.clone()]);

    assert_eq!(api.get_announcement().await.unwrap(), "maintenance tonight");
}

#[tokio::test]
async fn error_code_is_decoded() {
    let service = FakeService::start().await;
    service.reply(LOGIN, text("-82021"));
    let api = client(vec![service.url.clone()]);

    let err = api.user_login("alice01", "wrong").await.unwrap_err();
    assert_eq!(err.code(), Some("-82021"));
    assert_eq!(err.to_string(), "Wrong user name or password");
}

#[tokio::test]
async fn unknown_error_code_is_synthesized() {
    let service = FakeService::start().await;
    service.reply(LOGIN, text("-99999"));
    let api = client(vec![service.url.clone()]);

    let err = api.user_login("alice01", "pw").await.unwrap_err();
    assert!(err.to_string().contains("-99999"));
}

#[tokio::test]
async fn failover_skips_unreachable_mirror() {
    let service = FakeService::start().await;
    service.reply(ANNOUNCEMENT, text("hello"));
    let api = client(vec![dead_mirror(), service.url.clone()]);

    assert_eq!(api.get_announcement().await.unwrap(), "hello");
    assert_eq!(service.hits().len(), 1);
}

#[tokio::test]
async fn slow_mirror_times_out_and_next_answers() {
    let slow = FakeService::start().await;
    slow.reply(ANNOUNCEMENT, Reply::Delayed(Duration::from_secs(3), "late".into()));
    let fast = FakeService::start().await;
    fast.reply(ANNOUNCEMENT, text("on time"));
    let api = client(vec![slow.url.clone(), fast.url.clone()]);

    let started = Instant::now();
    assert_eq!(api.get_announcement().await.unwrap(), "on time");
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn all_mirrors_down_is_unreachable() {
    let api = client(vec![dead_mirror(), dead_mirror()]);
    assert_eq!(api.get_announcement().await, Err(CallError::Unreachable));
}

#[tokio::test]
async fn first_answering_mirror_decides_even_on_error_code() {
    let first = FakeService::start().await;
    first.reply(LOGIN, text("-82006"));
    let second = FakeService::start().await;
    second.reply(LOGIN, text("TOKEN"));
    let api = client(vec![first.url.clone(), second.url.clone()]);

    let err = api.user_login("alice01", "pw").await.unwrap_err();
    assert_eq!(err.code(), Some("-82006"));
    assert!(second.hits().is_empty());
}

#[tokio::test]
async fn error_status_ends_the_sweep() {
    let first = FakeService::start().await;
    first.reply(ANNOUNCEMENT, Reply::Status(502));
    let second = FakeService::start().await;
    second.reply(ANNOUNCEMENT, text("hello"));
    let api = client(vec![first.url.clone(), second.url.clone()]);

    assert_eq!(api.get_announcement().await, Err(CallError::Status(502)));
    assert!(second.hits().is_empty());
}

#[tokio::test]
async fn missing_endpoint_never_reaches_the_network() {
    let service = FakeService::start().await;
    let api = client(vec![service.url.clone()]);

    let err = api
        .execute(api.request().field("UserName", "alice01"))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        CallError::Contract("request parameter error: missing type".into())
    );
    assert!(service.hits().is_empty());
}

#[tokio::test]
async fn absent_optional_fields_are_omitted() {
    let service = FakeService::start().await;
    service.reply(REGISTER, text("OK"));
    let api = client(vec![service.url.clone()]);

    api.user_register("alice01", "secret01", "secret01", "", None)
        .await
        .unwrap();

    let hit = &service.hits()[0];
    assert!(!hit.form.contains_key("Recommender"));
    assert_eq!(hit.form["CardPwd"], "");
    assert_eq!(hit.form["SupPwd"], "secret01");
}

#[tokio::test]
async fn generic_call_uses_named_fields() {
    let service = FakeService::start().await;
    service.reply(25, text("120"));
    let api = client(vec![service.url.clone()]);

    let points = api
        .call(
            Endpoint::GetRemainingPoints,
            &[("UserName", Some("alice01")), ("UserPwd", None)],
        )
        .await
        .unwrap();
    assert_eq!(points, "120");

    let hit = &service.hits()[0];
    assert_eq!(hit.form["type"], "25");
    assert!(!hit.form.contains_key("UserPwd"));
}

#[tokio::test]
async fn concurrent_calls_are_independent() {
    let service = FakeService::start().await;
    service.reply(ANNOUNCEMENT, text("hello"));
    let api = client(vec![service.url.clone()]);

    let calls = (0..8).map(|_| {
        let api = api.clone();
        tokio::spawn(async move { api.get_announcement().await })
    });
    for result in futures::future::join_all(calls).await {
        tokio_test::assert_ok!(result.unwrap());
    }
    assert_eq!(service.hits().len(), 8);
}

mod common;

use common::{client, text, FakeService, Reply};
use gatekeep_core::AnnouncementWatcher;
use gatekeep_types::CoreEvent;
use std::time::Duration;
use tokio::sync::broadcast;

const ANNOUNCEMENT: u8 = 1;

fn announcements(rx: &mut broadcast::Receiver<CoreEvent>) -> Vec<String> {
    let mut seen = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let CoreEvent::Announcement { content } = event {
            seen.push(content);
        }
    }
    seen
}

#[tokio::test]
async fn repeated_announcement_is_published_once() {
    let service = FakeService::start().await;
    service.script(
        ANNOUNCEMENT,
        vec![text("v2 released"), text("v2 released"), text("maintenance"), text("")],
    );

    let (tx, mut rx) = broadcast::channel(100);
    let watcher = AnnouncementWatcher::new(client(vec![service.url.clone()]), tx);

    assert_eq!(watcher.poll_once().await.as_deref(), Some("v2 released"));
    assert_eq!(watcher.poll_once().await, None);
    assert_eq!(watcher.poll_once().await.as_deref(), Some("maintenance"));
    assert_eq!(watcher.poll_once().await, None);
    assert_eq!(watcher.cached().as_deref(), Some("maintenance"));

    assert_eq!(announcements(&mut rx), vec!["v2 released", "maintenance"]);
}

#[tokio::test]
async fn failed_poll_is_skipped() {
    let service = FakeService::start().await;
    service.script(ANNOUNCEMENT, vec![Reply::Status(500), text("back online")]);

    let (tx, mut rx) = broadcast::channel(100);
    let watcher = AnnouncementWatcher::new(client(vec![service.url.clone()]), tx);

    assert_eq!(watcher.poll_once().await, None);
    assert_eq!(watcher.cached(), None);
    assert_eq!(watcher.poll_once().await.as_deref(), Some("back online"));
    assert_eq!(announcements(&mut rx), vec!["back online"]);
}

#[tokio::test]
async fn watcher_polls_immediately_then_periodically() {
    let service = FakeService::start().await;
    service.reply(ANNOUNCEMENT, text("hello"));

    let (tx, mut rx) = broadcast::channel(100);
    let handle = AnnouncementWatcher::new(client(vec![service.url.clone()]), tx)
        .spawn(Duration::from_millis(40));

    let first = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(first, CoreEvent::Announcement { ref content } if content == "hello"));

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(service.hits_for(ANNOUNCEMENT).len() >= 2);
    assert!(announcements(&mut rx).is_empty());

    handle.stop();
    handle.join().await;
}

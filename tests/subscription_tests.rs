use ilmo::{
    MockRepository,
    models::Viewer,
    repository::Repository,
};
use std::time::Duration;
use uuid::Uuid;

const SECRET: &str = "subscription-test-secret";

fn viewer() -> Viewer {
    Viewer {
        id: Uuid::new_v4(),
        name: "Teemu".to_string(),
        username: "teemu".to_string(),
        ..Default::default()
    }
}

async fn next_update(
    subscription: &mut ilmo::subscription::ViewerSubscription,
) -> Option<Option<Viewer>> {
    tokio::time::timeout(Duration::from_secs(1), subscription.next())
        .await
        .expect("no update within deadline")
}

#[tokio::test]
async fn test_subscription_emits_initial_viewer_then_changes() {
    let viewer = viewer();
    let repo = MockRepository::new(SECRET).with_user(viewer.clone(), "pw");
    let token = repo.token_for(viewer.id);

    let mut subscription = repo.subscribe_current_user(token);
    assert_eq!(next_update(&mut subscription).await, Some(Some(viewer.clone())));

    let verified = Viewer {
        is_verified: true,
        ..viewer
    };
    repo.push_viewer_update(verified.clone());
    assert_eq!(next_update(&mut subscription).await, Some(Some(verified)));
}

#[tokio::test]
async fn test_subscription_ignores_other_viewers() {
    let watched = viewer();
    let other = viewer();
    let repo = MockRepository::new(SECRET)
        .with_user(watched.clone(), "pw")
        .with_user(other.clone(), "pw");
    let token = repo.token_for(watched.id);

    let mut subscription = repo.subscribe_current_user(token);
    next_update(&mut subscription).await;

    repo.push_viewer_update(Viewer {
        name: "Someone Else".to_string(),
        ..other
    });
    let quiet = tokio::time::timeout(Duration::from_millis(100), subscription.next()).await;
    assert!(quiet.is_err());
}

#[tokio::test]
async fn test_subscription_ends_after_logout() {
    let viewer = viewer();
    let repo = MockRepository::new(SECRET).with_user(viewer.clone(), "pw");
    let token = repo.token_for(viewer.id);

    let mut subscription = repo.subscribe_current_user(token.clone());
    next_update(&mut subscription).await;

    repo.logout(&token).await.unwrap();
    assert_eq!(next_update(&mut subscription).await, Some(None));
    assert_eq!(next_update(&mut subscription).await, None);
}

#[tokio::test]
async fn test_subscription_for_unknown_session_reports_absent_and_stops() {
    let repo = MockRepository::new(SECRET);
    let mut subscription = repo.subscribe_current_user("not-a-token".to_string());

    assert_eq!(next_update(&mut subscription).await, Some(None));
    assert_eq!(next_update(&mut subscription).await, None);
}

#[tokio::test]
async fn test_dropping_subscription_stops_producer() {
    let viewer = viewer();
    let repo = MockRepository::new(SECRET).with_user(viewer.clone(), "pw");
    let token = repo.token_for(viewer.id);

    let subscription = repo.subscribe_current_user(token);
    let producer = subscription.abort_handle();
    assert!(!producer.is_finished());

    drop(subscription);
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(producer.is_finished());
}

//! Presentation proxy integration tests
//!
//! The proxy talks over real localhost UDP to a fake controller bus.

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use bgmp_common::{ControlCommand, StateBroadcast, TrackRef};
use bgmp_ui::metadata::FileNameMetadata;
use bgmp_ui::{DisplayState, PresentationProxy, UiCommand};
use helpers::{test_config, FakeController, FakeSupervisor};
use tokio::sync::broadcast;
use tokio::time::timeout;

async fn proxy_for(
    controller: &FakeController,
    supervisor: Arc<FakeSupervisor>,
) -> PresentationProxy {
    PresentationProxy::bind(
        &test_config(controller.addr),
        supervisor,
        Arc::new(FileNameMetadata),
    )
    .await
    .expect("bind proxy")
}

/// Wait for the `playlist_state` closing a broadcast pair
async fn settled(events: &mut broadcast::Receiver<StateBroadcast>) {
    timeout(Duration::from_secs(2), async {
        loop {
            if let Ok(StateBroadcast::PlaylistState(_)) = events.recv().await {
                return;
            }
        }
    })
    .await
    .expect("broadcast pair delivered");
}

#[tokio::test]
async fn test_nothing_sent_without_permission() {
    let mut controller = FakeController::listen().await;
    let proxy = proxy_for(&controller, FakeSupervisor::new(true)).await;

    assert!(!proxy.has_permission());
    proxy.handle(UiCommand::SkipNext).await.unwrap();
    proxy.handle(UiCommand::PlayPause).await.unwrap();
    assert!(!proxy.query_service_state());
    assert!(!proxy.display().show_pause, "gated intents change nothing");

    proxy.grant_permission();
    proxy.handle(UiCommand::SkipPrevious).await.unwrap();

    assert_eq!(controller.next().await, Some(ControlCommand::SkipPrevious));
}

#[tokio::test]
async fn test_play_pause_alternates_with_local_flag() {
    let mut controller = FakeController::listen().await;
    let proxy = proxy_for(&controller, FakeSupervisor::new(true)).await;
    proxy.grant_permission();
    let mut display = proxy.subscribe();

    proxy.handle(UiCommand::PlayPause).await.unwrap();
    assert_eq!(controller.next().await, Some(ControlCommand::Play));
    display.changed().await.unwrap();
    assert!(display.borrow_and_update().show_pause);

    proxy.handle(UiCommand::PlayPause).await.unwrap();
    assert_eq!(controller.next().await, Some(ControlCommand::Pause));
    assert!(!proxy.display().show_pause);
}

#[tokio::test]
async fn test_explicit_pause_sets_flag_first() {
    let mut controller = FakeController::listen().await;
    let proxy = proxy_for(&controller, FakeSupervisor::new(true)).await;
    proxy.grant_permission();

    proxy.set_show_pause(true);
    proxy.handle(UiCommand::PlayPause).await.unwrap();

    assert_eq!(controller.next().await, Some(ControlCommand::Pause));
}

#[tokio::test]
async fn test_terminate_resets_play_control() {
    let mut controller = FakeController::listen().await;
    let proxy = proxy_for(&controller, FakeSupervisor::new(true)).await;
    proxy.grant_permission();

    proxy.handle(UiCommand::PlayPause).await.unwrap();
    proxy.handle(UiCommand::Terminate).await.unwrap();

    assert_eq!(controller.next().await, Some(ControlCommand::Play));
    assert_eq!(controller.next().await, Some(ControlCommand::Terminate));
    assert!(!proxy.display().show_pause);
}

#[tokio::test]
async fn test_add_starts_controller_when_not_running() {
    let mut controller = FakeController::listen().await;
    let supervisor = FakeSupervisor::new(false);
    let proxy = proxy_for(&controller, Arc::clone(&supervisor)).await;
    proxy.grant_permission();
    controller.answer_to(proxy.local_addr().unwrap(), "The Music Playlist is Empty.");

    let tracks = vec![TrackRef::from("/music/a.mp3"), TrackRef::from("/music/b.mp3")];
    proxy
        .handle(UiCommand::AddToPlaylist(tracks.clone()))
        .await
        .unwrap();

    assert_eq!(supervisor.starts(), 1);
    // Startup is confirmed with service_state polls before the tracks go out
    assert_eq!(controller.next().await, Some(ControlCommand::ServiceState));
    assert_eq!(
        controller.next_non_query().await,
        Some(ControlCommand::AddPlaylist(tracks))
    );
}

#[tokio::test]
async fn test_add_with_running_controller_sends_directly() {
    let mut controller = FakeController::listen().await;
    let supervisor = FakeSupervisor::new(true);
    let proxy = proxy_for(&controller, Arc::clone(&supervisor)).await;
    proxy.grant_permission();

    proxy
        .handle(UiCommand::AddToPlaylist(vec![TrackRef::from("x.ogg")]))
        .await
        .unwrap();

    assert_eq!(supervisor.starts(), 0);
    assert_eq!(
        controller.next().await,
        Some(ControlCommand::AddPlaylist(vec![TrackRef::from("x.ogg")]))
    );
}

#[tokio::test]
async fn test_empty_pick_sends_nothing() {
    let mut controller = FakeController::listen().await;
    let proxy = proxy_for(&controller, FakeSupervisor::new(true)).await;
    proxy.grant_permission();

    proxy
        .handle(UiCommand::AddToPlaylist(Vec::new()))
        .await
        .unwrap();

    assert!(controller.is_quiet(Duration::from_millis(200)).await);
}

#[tokio::test]
async fn test_broadcasts_update_display() {
    let controller = FakeController::listen().await;
    let proxy = proxy_for(&controller, FakeSupervisor::new(true)).await;
    let target = proxy.local_addr().unwrap();
    let mut events = proxy.events();

    controller.broadcast(
        target,
        StateBroadcast::TrackState(Some("/music/Ride - Vapour Trail.flac".into())),
    );
    controller.broadcast(
        target,
        StateBroadcast::PlaylistState("Track 2 of 5 in the Playlist.".to_string()),
    );
    settled(&mut events).await;

    let display = proxy.display();
    assert_eq!(display.title, "Vapour Trail");
    assert_eq!(display.artist, "Ride");
    assert_eq!(display.playlist, "Track 2 of 5 in the Playlist.");

    controller.broadcast(target, StateBroadcast::TrackState(None));
    controller.broadcast(
        target,
        StateBroadcast::PlaylistState("The Music Playlist is Empty.".to_string()),
    );
    settled(&mut events).await;

    let display = proxy.display();
    assert_eq!(display.title, "");
    assert_eq!(display.artist, "");
    assert_eq!(display, DisplayState::stopped());
}

#[tokio::test]
async fn test_album_art_follows_track_and_clears_on_empty() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("cover.jpg"), b"jpeg bytes").unwrap();
    let track = dir.path().join("Cocteau Twins - Lorelei.flac");

    let controller = FakeController::listen().await;
    let proxy = proxy_for(&controller, FakeSupervisor::new(true)).await;
    let target = proxy.local_addr().unwrap();
    let mut events = proxy.events();

    controller.broadcast(
        target,
        StateBroadcast::TrackState(Some(TrackRef::from(track.to_str().unwrap()))),
    );
    controller.broadcast(
        target,
        StateBroadcast::PlaylistState("Track 1 of 1 in the Playlist.".to_string()),
    );
    settled(&mut events).await;
    assert_eq!(proxy.display().album_art.as_deref(), Some(&b"jpeg bytes"[..]));

    controller.broadcast(target, StateBroadcast::TrackState(None));
    controller.broadcast(
        target,
        StateBroadcast::PlaylistState("The Music Playlist is Empty.".to_string()),
    );
    settled(&mut events).await;
    assert_eq!(proxy.display().album_art, None);
}

#[tokio::test]
async fn test_query_when_not_running_shows_stopped_and_sends_nothing() {
    let mut controller = FakeController::listen().await;
    let proxy = proxy_for(&controller, FakeSupervisor::new(false)).await;
    proxy.grant_permission();
    proxy.set_show_pause(true);

    assert!(!proxy.query_service_state());

    assert_eq!(proxy.display(), DisplayState::stopped());
    assert!(controller.is_quiet(Duration::from_millis(200)).await);
}

#[tokio::test]
async fn test_await_service_state_gets_reply() {
    let controller = FakeController::listen().await;
    let proxy = proxy_for(&controller, FakeSupervisor::new(true)).await;
    proxy.grant_permission();
    controller.answer_to(proxy.local_addr().unwrap(), "Track 1 of 1 in the Playlist.");

    assert!(proxy.await_service_state().await);
    assert_eq!(proxy.display().playlist, "Track 1 of 1 in the Playlist.");
}

#[tokio::test]
async fn test_silent_controller_counts_as_not_running() {
    let controller = FakeController::listen().await;
    let proxy = proxy_for(&controller, FakeSupervisor::new(true)).await;
    proxy.grant_permission();

    assert!(!proxy.await_service_state().await);
}

#[tokio::test]
async fn test_close_releases_presentation_address() {
    let controller = FakeController::listen().await;
    let proxy = proxy_for(&controller, FakeSupervisor::new(true)).await;
    let addr = proxy.local_addr().unwrap();
    proxy.close().await;

    let mut config = test_config(controller.addr);
    config.presentation_addr = addr;
    let again = PresentationProxy::bind(
        &config,
        FakeSupervisor::new(true),
        Arc::new(FileNameMetadata),
    )
    .await;
    assert!(again.is_ok());
}

use std::sync::Arc;
use std::time::Duration;

use termworld::adapter::{AdapterError, GameStateHandle, LocalGameService, VisiblePlayers, WorldEvent};
use termworld::core::builtin_content;
use termworld::types::{Direction, PlayerVisualState};

fn service() -> LocalGameService {
    LocalGameService::new()
        .with_player(PlayerVisualState::new("a", "Amy", 0, 0))
        .with_player(PlayerVisualState::new("b", "Bob", 3, -2))
        .with_player(PlayerVisualState::new("far", "Far", 50, 50))
}

#[test]
fn visible_players_are_filtered_by_radius() {
    tokio_test::block_on(async {
        let (handle, _task) = service().spawn(Duration::from_millis(100));
        let mut ids: Vec<_> = tokio_test::assert_ok!(handle.visible_players((0, 0), 3).await)
            .into_iter()
            .map(|p| p.id)
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);
    });
}

#[tokio::test]
async fn moves_turn_then_step() {
    let (handle, _task) = service().spawn(Duration::from_millis(100));
    handle.submit_move("a", Direction::Right).unwrap();
    handle.submit_move("a", Direction::Right).unwrap();
    let players = handle.visible_players((0, 0), 1).await.unwrap();
    let a = players.iter().find(|p| p.id == "a").unwrap();
    assert_eq!((a.x, a.y, a.direction), (1, 0, Direction::Right));
    assert!(a.moving);
}

#[tokio::test]
async fn sprite_upload_round_trips_and_notifies() {
    let service = service();
    let mut events = service.subscribe();
    let (handle, _task) = service.spawn(Duration::from_millis(100));
    assert_eq!(handle.sprite("a").await.unwrap(), None);

    let sprite = Arc::new(builtin_content(&[]).sprites["default"].clone());
    handle.upload_sprite("a", Arc::clone(&sprite)).unwrap();
    assert_eq!(
        events.recv().await.unwrap(),
        WorldEvent::SpriteUpdated { player_id: "a".to_string() }
    );
    let fetched = handle.sprite("a").await.unwrap().unwrap();
    assert!(Arc::ptr_eq(&fetched, &sprite));
}

#[tokio::test]
async fn join_and_leave() {
    let service = LocalGameService::new();
    let mut events = service.subscribe();
    let (handle, _task) = service.spawn(Duration::from_millis(100));
    handle.join(PlayerVisualState::new("me", "Me", 1, 1)).unwrap();
    assert_eq!(handle.visible_players((0, 0), 2).await.unwrap().len(), 1);
    handle.leave("me").unwrap();
    assert_eq!(
        events.recv().await.unwrap(),
        WorldEvent::PlayerLeft { player_id: "me".to_string() }
    );
    assert!(handle.visible_players((0, 0), 2).await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn dead_service_falls_back_to_last_known() {
    let (handle, task) = service().spawn(Duration::from_millis(40));
    let mut visible = VisiblePlayers::new();
    assert_eq!(visible.refresh(&handle, (0, 0), 3).await.len(), 2);

    task.abort();
    let _ = task.await;
    assert_eq!(visible.refresh(&handle, (0, 0), 3).await.len(), 2);
    assert_eq!(visible.failures(), 1);

    let (tx, _rx) = tokio::sync::mpsc::channel(1);
    let silent = GameStateHandle::new(tx, Duration::from_millis(40));
    assert_eq!(
        silent.visible_players((0, 0), 3).await,
        Err(AdapterError::Timeout(Duration::from_millis(40)))
    );
}

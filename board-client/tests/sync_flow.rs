//! End-to-end exercise of one board session against mock I/O: load,
//! optimistic edit, push-triggered reconciliation, transport loss and
//! recovery, teardown.

use std::time::Duration;

use boardsync_client::{
    BoardClient, BoardClientConfig, MockApi, MockChannel, PumpOutcome, PushChannel,
};
use board_types::{
    Board, BoardId, Card, CardId, Column, ColumnId, EventId, EventInfo, RemoteEvent,
    RemoteEventKind,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn card(column_id: ColumnId, title: &str, rank: f64) -> Card {
    Card {
        id: CardId::new(),
        title: title.into(),
        description: None,
        column_id,
        order_index: rank,
        assigned_user_id: None,
    }
}

fn board(event_id: EventId, todo: ColumnId, doing: ColumnId, titles: &[&str]) -> Board {
    Board {
        id: BoardId::new(),
        title: "Release planning".into(),
        event_id,
        columns: vec![
            Column {
                id: todo,
                title: "To do".into(),
                order_index: 0,
                cards: titles
                    .iter()
                    .enumerate()
                    .map(|(i, t)| card(todo, t, i as f64))
                    .collect(),
            },
            Column {
                id: doing,
                title: "Doing".into(),
                order_index: 1,
                cards: vec![],
            },
        ],
    }
}

#[tokio::test]
async fn full_session_lifecycle() {
    init_tracing();

    let api = MockApi::new();
    let channel = MockChannel::new();
    let event_id = EventId::new();
    let todo = ColumnId::new();
    let doing = ColumnId::new();

    api.queue_board(board(event_id, todo, doing, &["book venue", "send invites"]));
    api.set_event_info(EventInfo {
        id: event_id,
        invite_code: Some("JOIN-7".into()),
    });

    let config = BoardClientConfig::new(event_id).with_credential("access-token");
    let client = BoardClient::new(config, api.clone(), channel.clone());

    // Initial load.
    client.load().await.unwrap();
    assert_eq!(client.invite_code(), Some("JOIN-7".into()));
    let loaded = client.snapshot().await.unwrap();
    assert_eq!(loaded.columns[0].cards.len(), 2);

    // Push channel up, group joined.
    client.connect().await.unwrap();
    assert_eq!(channel.joined_groups(), vec![event_id]);
    assert_eq!(channel.credential(), Some("access-token".into()));

    // Optimistic move renders immediately.
    let moving = loaded.columns[0].cards[0].id;
    let outcome = client.move_card(moving, doing, 0).await;
    assert!(outcome.is_committed());
    let after_move = client.snapshot().await.unwrap();
    assert_eq!(after_move.columns[1].cards.len(), 1);

    // A collaborator's change arrives; the engine silently refetches.
    api.queue_board(board(
        event_id,
        todo,
        doing,
        &["book venue", "send invites", "order cake"],
    ));
    channel.queue_event(RemoteEvent::new(RemoteEventKind::CardCreated));
    let outcome = client.pump_once().await;
    assert_eq!(outcome, PumpOutcome::Delivered(RemoteEventKind::CardCreated));
    let reconciled = client.snapshot().await.unwrap();
    assert_eq!(reconciled.columns[0].cards.len(), 3);

    // Transport drops; the subscriber backs off, reconnects and re-joins.
    let outcome = client.pump_once().await;
    assert!(matches!(outcome, PumpOutcome::Backoff(_)));
    let outcome = client.pump_once().await;
    assert_eq!(outcome, PumpOutcome::Reconnected);
    assert_eq!(channel.joined_groups(), vec![event_id, event_id]);

    // Teardown leaves the group, closes the channel, stops the loop.
    client.teardown().await;
    assert_eq!(channel.left_groups(), vec![event_id]);
    assert!(!channel.is_connected());
    assert_eq!(client.pump_once().await, PumpOutcome::Stopped);

    // A notification queued after teardown is never delivered.
    channel.queue_event(RemoteEvent::new(RemoteEventKind::CardDeleted));
    tokio::time::sleep(Duration::from_millis(5)).await;
    assert_eq!(client.pump_once().await, PumpOutcome::Stopped);
    assert_eq!(client.snapshot().await.unwrap(), reconciled);
}

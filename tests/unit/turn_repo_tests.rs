//! Unit tests for `TurnRepo` sequence handling.

use std::sync::Arc;

use chrono::Utc;

use meeting_relay::models::meeting::Meeting;
use meeting_relay::models::turn::{PersonaTurn, TurnContent};
use meeting_relay::persistence::db;
use meeting_relay::persistence::meeting_repo::MeetingRepo;
use meeting_relay::persistence::turn_repo::TurnRepo;
use meeting_relay::AppError;

async fn setup() -> (TurnRepo, String) {
    let pool = Arc::new(db::connect_memory().await.expect("db"));
    let meeting = Meeting::new(None, None, Vec::new());
    MeetingRepo::new(Arc::clone(&pool))
        .create(&meeting)
        .await
        .expect("create meeting");
    (TurnRepo::new(pool), meeting.id)
}

fn turn(meeting_id: &str, sequence: i64) -> PersonaTurn {
    PersonaTurn {
        meeting_id: meeting_id.to_owned(),
        sequence,
        persona_id: "analyst".into(),
        section_id: Some("s1".into()),
        created_at: Utc::now(),
        content: TurnContent {
            summary: format!("turn {sequence}"),
            risks: vec!["churn".into()],
            opportunities: vec!["upsell".into(), "referrals".into()],
            recommendations: vec!["call customers".into()],
            raw_content: "raw".into(),
            metrics: Some(serde_json::json!({ "tokens": 12 })),
        },
    }
}

#[tokio::test]
async fn first_sequence_is_one() {
    let (repo, meeting_id) = setup().await;
    assert_eq!(repo.next_sequence(&meeting_id).await.unwrap(), 1);

    repo.append(&turn(&meeting_id, 1)).await.unwrap();
    assert_eq!(repo.next_sequence(&meeting_id).await.unwrap(), 2);
}

#[tokio::test]
async fn list_after_is_strict_and_ascending() {
    let (repo, meeting_id) = setup().await;
    for sequence in [2, 1, 3] {
        repo.append(&turn(&meeting_id, sequence)).await.unwrap();
    }

    let all: Vec<_> = repo
        .list_after(&meeting_id, 0)
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.sequence)
        .collect();
    assert_eq!(all, [1, 2, 3]);

    let tail: Vec<_> = repo
        .list_after(&meeting_id, 2)
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.sequence)
        .collect();
    assert_eq!(tail, [3]);
}

#[tokio::test]
async fn content_round_trips() {
    let (repo, meeting_id) = setup().await;
    let original = turn(&meeting_id, 1);
    repo.append(&original).await.unwrap();

    let stored = repo.list_after(&meeting_id, 0).await.unwrap().remove(0);
    assert_eq!(stored.content, original.content);
    assert_eq!(stored.section_id.as_deref(), Some("s1"));
}

#[tokio::test]
async fn reused_sequence_rejected() {
    let (repo, meeting_id) = setup().await;
    repo.append(&turn(&meeting_id, 1)).await.unwrap();
    let err = repo.append(&turn(&meeting_id, 1)).await.unwrap_err();
    assert!(matches!(err, AppError::Db(_)));
}

#[tokio::test]
async fn count_for_meeting() {
    let (repo, meeting_id) = setup().await;
    assert_eq!(repo.count_for_meeting(&meeting_id).await.unwrap(), 0);
    repo.append(&turn(&meeting_id, 1)).await.unwrap();
    repo.append(&turn(&meeting_id, 2)).await.unwrap();
    assert_eq!(repo.count_for_meeting(&meeting_id).await.unwrap(), 2);
}

use super::*;
use crate::test_support::{translated, FakeGateway, FakeModel};

fn manager() -> SessionManager {
    let gateway = FakeGateway::default()
        .with_model(FakeModel::new("m1", translated(0.0, 0.0, 1.0)))
        .with_model(FakeModel::new("m2", translated(0.0, 0.0, 2.0)));
    SessionManager::new(Arc::new(gateway))
}

fn ids(raw: &[&str]) -> Vec<ModelId> {
    raw.iter().map(|id| ModelId::from(*id)).collect()
}

#[tokio::test]
async fn connect_twice_with_same_identity_fails() {
    let sessions = manager();
    let conn = ConnectionId::new();
    sessions.on_connect(conn).expect("connect");
    assert!(matches!(
        sessions.on_connect(conn),
        Err(SessionError::DuplicateSession(id)) if id == conn
    ));
    assert_eq!(sessions.len(), 1);
}

#[tokio::test]
async fn disconnect_of_unknown_session_is_noop() {
    let sessions = manager();
    assert!(!sessions.on_disconnect(ConnectionId::new()));

    let conn = ConnectionId::new();
    sessions.on_connect(conn).expect("connect");
    assert!(sessions.on_disconnect(conn));
    assert!(!sessions.on_disconnect(conn));
    assert!(sessions.is_empty());
}

#[tokio::test]
async fn state_progresses_through_identity_and_binding() {
    let sessions = manager();
    let conn = ConnectionId::new();
    sessions.on_connect(conn).expect("connect");
    let handle = sessions.session(conn).expect("session");
    assert_eq!(handle.lock().await.state(), SessionState::Unidentified);

    sessions
        .set_identity(conn, Some("ada".into()), Some(ids(&["m2", "ghost", "m1"])))
        .await
        .expect("identity");
    {
        let session = handle.lock().await;
        assert_eq!(session.state(), SessionState::Identified);
        assert_eq!(session.user_name(), Some("ada"));
        assert_eq!(session.driver_model(), None);
    }

    let bound = sessions.bind_models(conn).await.expect("bind");
    assert_eq!(bound, ids(&["m2", "m1"]));
    let session = handle.lock().await;
    assert_eq!(session.state(), SessionState::ModelsBound);
    assert_eq!(session.driver_model(), Some(&ModelId::from("m2")));
    assert_eq!(
        session.poses().get(&ModelId::from("m1")).expect("m1"),
        translated(0.0, 0.0, 1.0)
    );
    assert!(!session.poses().is_bound(&ModelId::from("ghost")));
}

#[tokio::test]
async fn empty_model_list_keeps_previous_selection() {
    let sessions = manager();
    let conn = ConnectionId::new();
    sessions.on_connect(conn).expect("connect");
    sessions
        .set_identity(conn, None, Some(ids(&["m1"])))
        .await
        .expect("identity");
    sessions
        .set_identity(conn, Some("bob".into()), Some(Vec::new()))
        .await
        .expect("identity");

    let handle = sessions.session(conn).expect("session");
    let session = handle.lock().await;
    assert_eq!(session.selected_models(), ids(&["m1"]).as_slice());
    assert_eq!(session.user_name(), Some("bob"));
}

#[tokio::test]
async fn rebinding_drops_deselected_models() {
    let sessions = manager();
    let conn = ConnectionId::new();
    sessions.on_connect(conn).expect("connect");
    sessions
        .set_identity(conn, None, Some(ids(&["m1", "m2"])))
        .await
        .expect("identity");
    sessions.bind_models(conn).await.expect("bind");

    sessions
        .set_identity(conn, None, Some(ids(&["m2"])))
        .await
        .expect("identity");
    sessions.bind_models(conn).await.expect("rebind");

    let handle = sessions.session(conn).expect("session");
    let session = handle.lock().await;
    assert!(!session.poses().is_bound(&ModelId::from("m1")));
    assert!(session.poses().is_bound(&ModelId::from("m2")));
}

#[tokio::test]
async fn reset_requires_binding() {
    let sessions = manager();
    let conn = ConnectionId::new();
    sessions.on_connect(conn).expect("connect");
    let err = sessions
        .reset_pose(conn, &ModelId::from("m1"))
        .await
        .expect_err("not bound");
    assert!(matches!(err, SessionError::NotBound(_)));
}

#[tokio::test]
async fn operations_on_missing_session_fail() {
    let sessions = manager();
    let conn = ConnectionId::new();
    assert!(matches!(
        sessions.set_identity(conn, None, None).await,
        Err(SessionError::SessionNotFound(_))
    ));
    assert!(matches!(
        sessions.bind_models(conn).await,
        Err(SessionError::SessionNotFound(_))
    ));
}

#[tokio::test]
async fn driver_skips_leading_unknown_models() {
    let sessions = manager();
    let conn = ConnectionId::new();
    sessions.on_connect(conn).expect("connect");
    sessions
        .set_identity(conn, None, Some(ids(&["ghost", "m1"])))
        .await
        .expect("identity");
    sessions.bind_models(conn).await.expect("bind");

    let handle = sessions.session(conn).expect("session");
    let session = handle.lock().await;
    assert_eq!(session.selected_models(), ids(&["ghost", "m1"]).as_slice());
    assert_eq!(session.driver_model(), Some(&ModelId::from("m1")));
}

//! Integration tests for the party-lobby service
//!
//! These tests drive the dispatcher through the same JSON frames a client
//! would send and check every event each client receives:
//! - Complete session lifecycle workflows
//! - Host handover and session teardown
//! - Authorization and validation failures
//! - Broadcast scope configuration

mod fixtures;

use fixtures::{
    create_test_dispatcher, create_test_dispatcher_with, error_messages, last_roster, TestClient,
};
use party_lobby::session::LobbySettings;
use party_lobby::types::{BroadcastScope, RosterEntry, ServerMessage};
use party_lobby::utils::is_valid_session_code;
use std::collections::HashSet;

#[test]
fn test_complete_session_workflow() {
    let mut dispatcher = create_test_dispatcher();
    let mut alice = TestClient::connect(&mut dispatcher);
    let mut bob = TestClient::connect(&mut dispatcher);

    // Step 1: Alice hosts a session
    alice.create_session(&mut dispatcher, "Alice");
    let events = alice.drain();
    let code = match &events[0] {
        ServerMessage::SessionCreated { session_code } => session_code.clone(),
        other => panic!("expected sessionCreated, got {:?}", other),
    };
    assert!(is_valid_session_code(&code));
    assert_eq!(
        last_roster(&events).unwrap(),
        vec![RosterEntry::new("Alice", None, true)]
    );

    // Step 2: Bob joins with a lowercase code
    bob.join_session(&mut dispatcher, &code.to_lowercase(), "Bob");
    let bob_events = bob.drain();
    assert_eq!(
        bob_events[0],
        ServerMessage::SessionJoined {
            session_code: code.clone()
        }
    );

    let alice_events = alice.drain();
    assert!(alice_events.contains(&ServerMessage::PlayerJoined {
        player_name: "Bob".to_string()
    }));

    let expected = vec![
        RosterEntry::new("Alice", None, true),
        RosterEntry::new("Bob", None, false),
    ];
    assert_eq!(last_roster(&bob_events).unwrap(), expected);
    assert_eq!(last_roster(&alice_events).unwrap(), expected);

    // Step 3: Bob picks a team
    bob.join_team(&mut dispatcher, &code, "Bob", "Red");
    let expected = vec![
        RosterEntry::new("Alice", None, true),
        RosterEntry::new("Bob", Some("Red"), false),
    ];
    assert_eq!(last_roster(&alice.drain()).unwrap(), expected);
    assert_eq!(last_roster(&bob.drain()).unwrap(), expected);

    // Step 4: Bob drops off, Alice sees the shrunken roster
    dispatcher.on_disconnect(bob.id);
    assert_eq!(
        last_roster(&alice.drain()).unwrap(),
        vec![RosterEntry::new("Alice", None, true)]
    );

    // Step 5: Alice drops off and the session disappears
    dispatcher.on_disconnect(alice.id);
    assert!(!dispatcher.membership().store().contains(&code));
    assert!(dispatcher.membership().connections().is_empty());

    println!("✅ Complete session workflow test passed");
}

#[test]
fn test_host_disconnect_hands_session_to_teammate() {
    let mut dispatcher = create_test_dispatcher();
    let mut alice = TestClient::connect(&mut dispatcher);
    let mut bob = TestClient::connect(&mut dispatcher);

    alice.create_session(&mut dispatcher, "Alice");
    let code = alice.created_code();
    bob.join_session(&mut dispatcher, &code, "Bob");
    bob.join_team(&mut dispatcher, &code, "Bob", "Red");
    bob.drain();

    dispatcher.on_disconnect(alice.id);
    assert_eq!(
        bob.drain(),
        vec![ServerMessage::UpdateLobby {
            players: vec![RosterEntry::new("Bob", Some("Red"), true)]
        }]
    );

    dispatcher.on_disconnect(bob.id);
    assert!(dispatcher.membership().store().is_empty());

    // A fresh client cannot reach the dead code
    let mut carol = TestClient::connect(&mut dispatcher);
    carol.join_session(&mut dispatcher, &code, "Carol");
    assert_eq!(
        error_messages(&carol.drain()),
        vec!["Session not found".to_string()]
    );

    println!("✅ Host disconnect handover test passed");
}

#[test]
fn test_host_handover_and_game_lifecycle() {
    let mut dispatcher = create_test_dispatcher();
    let mut alice = TestClient::connect(&mut dispatcher);
    let mut bob = TestClient::connect(&mut dispatcher);
    let mut carol = TestClient::connect(&mut dispatcher);

    alice.create_session(&mut dispatcher, "Alice");
    let code = alice.created_code();
    bob.join_session(&mut dispatcher, &code, "Bob");
    carol.join_session(&mut dispatcher, &code, "Carol");
    alice.drain();
    bob.drain();
    carol.drain();

    // Host leaves; the next player in join order takes over
    alice.leave_session(&mut dispatcher, &code);
    let roster = last_roster(&bob.drain()).unwrap();
    assert_eq!(
        roster,
        vec![
            RosterEntry::new("Bob", None, true),
            RosterEntry::new("Carol", None, false),
        ]
    );
    assert!(alice.drain().is_empty());

    // Only the new host may start
    carol.start_game(&mut dispatcher, &code);
    assert_eq!(
        error_messages(&carol.drain()),
        vec!["Only the host can start the game".to_string()]
    );

    bob.start_game(&mut dispatcher, &code);
    assert_eq!(bob.drain(), vec![ServerMessage::GameStarted]);
    assert_eq!(carol.drain(), vec![ServerMessage::GameStarted]);

    // Late joiners are refused once the game is running
    alice.join_session(&mut dispatcher, &code, "Alice");
    assert_eq!(
        error_messages(&alice.drain()),
        vec!["Game already started".to_string()]
    );

    carol.end_game(&mut dispatcher, &code);
    assert_eq!(
        error_messages(&carol.drain()),
        vec!["Only the host can end the game".to_string()]
    );

    bob.end_game(&mut dispatcher, &code);
    assert_eq!(bob.drain(), vec![ServerMessage::GameEnded]);
    assert_eq!(carol.drain(), vec![ServerMessage::GameEnded]);
    assert!(!dispatcher.membership().store().contains(&code));

    // The ended code is gone for everyone
    carol.join_session(&mut dispatcher, &code, "Carol");
    assert_eq!(
        error_messages(&carol.drain()),
        vec!["Session not found".to_string()]
    );

    println!("✅ Host handover and game lifecycle test passed");
}

#[test]
fn test_session_codes_are_unique() {
    let mut dispatcher = create_test_dispatcher();
    let mut codes = HashSet::new();

    for i in 0..200 {
        let mut host = TestClient::connect(&mut dispatcher);
        host.create_session(&mut dispatcher, &format!("Host{}", i));
        let code = host.created_code();
        assert!(is_valid_session_code(&code), "bad code {}", code);
        assert!(codes.insert(code), "duplicate session code issued");
    }

    assert_eq!(dispatcher.membership().store().len(), 200);
    assert_eq!(dispatcher.membership().stats().sessions_created, 200);

    println!("✅ Session code uniqueness test passed");
}

#[test]
fn test_switching_sessions_leaves_the_previous_one() {
    let mut dispatcher = create_test_dispatcher();
    let mut alice = TestClient::connect(&mut dispatcher);
    let mut bob = TestClient::connect(&mut dispatcher);
    let mut carol = TestClient::connect(&mut dispatcher);

    alice.create_session(&mut dispatcher, "Alice");
    let first = alice.created_code();
    carol.create_session(&mut dispatcher, "Carol");
    let second = carol.created_code();

    bob.join_session(&mut dispatcher, &first, "Bob");
    alice.drain();
    bob.join_session(&mut dispatcher, &second, "Bob");

    // Alice's session lost Bob, Carol's gained him
    assert_eq!(
        last_roster(&alice.drain()).unwrap(),
        vec![RosterEntry::new("Alice", None, true)]
    );
    assert_eq!(
        last_roster(&carol.drain()).unwrap(),
        vec![
            RosterEntry::new("Carol", None, true),
            RosterEntry::new("Bob", None, false),
        ]
    );

    // A join to a missing session keeps the current seat
    bob.drain();
    bob.join_session(&mut dispatcher, "ZZZZZZ", "Bob");
    assert_eq!(
        error_messages(&bob.drain()),
        vec!["Session not found".to_string()]
    );
    assert_eq!(
        dispatcher.membership().roster(&second).unwrap().len(),
        2
    );

    println!("✅ Session switching test passed");
}

#[test]
fn test_rejected_join_keeps_the_current_seat() {
    let mut dispatcher = create_test_dispatcher();
    let mut alice = TestClient::connect(&mut dispatcher);
    let mut bob = TestClient::connect(&mut dispatcher);
    let mut carol = TestClient::connect(&mut dispatcher);
    let mut dan = TestClient::connect(&mut dispatcher);
    let mut erin = TestClient::connect(&mut dispatcher);

    alice.create_session(&mut dispatcher, "Alice");
    let home = alice.created_code();
    bob.join_session(&mut dispatcher, &home, "Bob");
    dan.join_session(&mut dispatcher, &home, "Dan");

    carol.create_session(&mut dispatcher, "Carol");
    let running = carol.created_code();
    carol.start_game(&mut dispatcher, &running);

    erin.create_session(&mut dispatcher, "Erin");
    let open = erin.created_code();
    alice.drain();
    bob.drain();
    dan.drain();

    // Bob targets a game that is already running
    bob.join_session(&mut dispatcher, &running, "Bob");
    assert_eq!(
        bob.drain(),
        vec![ServerMessage::error("Game already started")]
    );

    // Dan targets an open session without a name
    dan.join_session(&mut dispatcher, &open, "");
    assert_eq!(
        dan.drain(),
        vec![ServerMessage::error("Name field cannot be empty")]
    );

    let roster = dispatcher.membership().roster(&home).unwrap();
    assert_eq!(
        roster,
        vec![
            RosterEntry::new("Alice", None, true),
            RosterEntry::new("Bob", None, false),
            RosterEntry::new("Dan", None, false),
        ]
    );
    assert_eq!(
        dispatcher.membership().connections().session_of(bob.id),
        Some(home.clone())
    );
    assert_eq!(
        dispatcher.membership().connections().session_of(dan.id),
        Some(home)
    );
    // no roster churn reached the old session
    assert!(alice.drain().is_empty());

    println!("✅ Rejected join seat retention test passed");
}

#[test]
fn test_malformed_and_unknown_frames_are_dropped() {
    let mut dispatcher = create_test_dispatcher();
    let mut alice = TestClient::connect(&mut dispatcher);

    dispatcher.on_text(alice.id, "this is not json");
    dispatcher.on_text(alice.id, r#"{"type":"danceParty"}"#);
    dispatcher.on_text(alice.id, r#"{"playerName":"Alice"}"#);
    assert!(alice.drain().is_empty());

    // Missing fields decode as empty and are rejected
    dispatcher.on_text(alice.id, r#"{"type":"createSession"}"#);
    assert_eq!(
        error_messages(&alice.drain()),
        vec!["Name field cannot be empty".to_string()]
    );

    println!("✅ Malformed frame handling test passed");
}

#[test]
fn test_global_broadcast_scope_announces_new_sessions() {
    let mut dispatcher = create_test_dispatcher_with(LobbySettings {
        broadcast_scope: BroadcastScope::Global,
        ..LobbySettings::default()
    });
    let mut alice = TestClient::connect(&mut dispatcher);
    let mut bystander = TestClient::connect(&mut dispatcher);

    alice.create_session(&mut dispatcher, "Alice");
    alice.drain();

    assert_eq!(
        bystander.drain(),
        vec![ServerMessage::UpdateLobby {
            players: vec![RosterEntry::new("Alice", None, true)]
        }]
    );

    println!("✅ Global broadcast scope test passed");
}

#[test]
fn test_owner_notification_can_be_disabled() {
    let mut dispatcher = create_test_dispatcher_with(LobbySettings {
        notify_owner_on_join: false,
        ..LobbySettings::default()
    });
    let mut alice = TestClient::connect(&mut dispatcher);
    let bob = TestClient::connect(&mut dispatcher);

    alice.create_session(&mut dispatcher, "Alice");
    let code = alice.created_code();
    bob.join_session(&mut dispatcher, &code, "Bob");

    let events = alice.drain();
    assert!(events
        .iter()
        .all(|event| !matches!(event, ServerMessage::PlayerJoined { .. })));
    assert_eq!(last_roster(&events).unwrap().len(), 2);

    println!("✅ Owner notification toggle test passed");
}

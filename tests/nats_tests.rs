use lecture_live::live::{ClientContent, Part, RealtimeInput};
use lecture_live::nats::{GatewayEnvelope, LiveSubjects, ServerEnvelope};

#[test]
fn test_client_content_envelope_serialization() {
    let msg = GatewayEnvelope {
        session_id: "thermo.pdf-1700000000000".to_string(),
        sequence: 3,
        timestamp: "2025-10-27T14:30:00Z".to_string(),
        payload: ClientContent::user_turn(vec![Part::text("ACTIVE SLIDE: 2")], true),
    };

    let json = serde_json::to_string(&msg).unwrap();
    assert!(json.contains("thermo.pdf-1700000000000"));
    assert!(json.contains("\"sequence\":3"));
    assert!(json.contains("\"turnComplete\":true"));

    let deserialized: GatewayEnvelope<ClientContent> = serde_json::from_str(&json).unwrap();
    assert_eq!(deserialized.sequence, 3);
    assert_eq!(deserialized.payload.turns[0].role, "user");
    assert_eq!(
        deserialized.payload.turns[0].parts[0].as_text(),
        Some("ACTIVE SLIDE: 2")
    );
}

#[test]
fn test_realtime_input_envelope_end_of_turn() {
    let msg = GatewayEnvelope {
        session_id: "s".to_string(),
        sequence: 10,
        timestamp: "2025-10-27T14:30:00Z".to_string(),
        payload: RealtimeInput::end_of_turn(),
    };

    let json = serde_json::to_string(&msg).unwrap();
    assert!(json.contains("\"payload\":{\"event\":\"end_of_turn\"}"));
}

#[test]
fn test_server_envelope_with_message() {
    let json = r#"{
        "session_id": "thermo.pdf-1700000000000",
        "timestamp": "2025-10-27T14:30:05Z",
        "message": {
            "serverContent": {
                "outputTranscription": {"text": "Entropy measures"},
                "turnComplete": true
            }
        }
    }"#;

    let envelope: ServerEnvelope = serde_json::from_str(json).unwrap();
    assert!(!envelope.closed);
    let message = envelope.message.unwrap();
    assert!(message.ends_turn());
    assert_eq!(
        message
            .server_content
            .unwrap()
            .output_transcription
            .unwrap()
            .text,
        "Entropy measures"
    );
}

#[test]
fn test_server_envelope_closed_marker() {
    let json = r#"{"session_id": "s", "closed": true}"#;

    let envelope: ServerEnvelope = serde_json::from_str(json).unwrap();
    assert!(envelope.closed);
    assert!(envelope.message.is_none());
    assert!(envelope.timestamp.is_none());
}

#[test]
fn test_subjects_fold_session_id_into_one_token() {
    let subjects = LiveSubjects::new("week 3.pdf & notes.pdf-1700000000000");

    assert_eq!(
        subjects.setup(),
        "live.week_3_pdf_&_notes_pdf-1700000000000.setup"
    );
    assert!(subjects.server().ends_with(".server"));
    assert_eq!(subjects.server().matches('.').count(), 2);
}

#[test]
fn test_subjects_strip_wildcards() {
    let subjects = LiveSubjects::new("a*b>c");
    assert_eq!(subjects.client_content(), "live.a_b_c.client_content");
    assert_eq!(subjects.realtime_input(), "live.a_b_c.realtime_input");
    assert_eq!(subjects.tool_response(), "live.a_b_c.tool_response");
    assert_eq!(subjects.close(), "live.a_b_c.close");
}

use usp_console::protocol::client_messages::EncodedFrame;
use usp_console::protocol::frame::{self, Frame};
use usp_console::{ClientMessage, RecognitionStatus, ServerMessage, SpeechHypothesis, SpeechPhrase};

fn decode(text: &str) -> ServerMessage {
    ServerMessage::from_frame(Frame::parse_text(text).unwrap()).unwrap()
}

#[test]
fn decodes_phrase_with_status_name() {
    let message = decode(
        "X-RequestId: 0123\r\nPath: speech.phrase\r\nContent-Type: application/json\r\n\r\n\
         {\"RecognitionStatus\":\"Success\",\"DisplayText\":\"Hello.\",\"Offset\":500000,\"Duration\":12000000}",
    );
    assert_eq!(
        message,
        ServerMessage::SpeechPhrase(SpeechPhrase {
            recognition_status: RecognitionStatus::Success,
            display_text: "Hello.".to_string(),
            offset: 500_000,
            duration: 12_000_000,
        })
    );
}

#[test]
fn decodes_hypothesis() {
    let message = decode(
        "Path: speech.hypothesis\r\n\r\n{\"Text\":\"hel\",\"Offset\":1,\"Duration\":2}",
    );
    assert_eq!(
        message,
        ServerMessage::SpeechHypothesis(SpeechHypothesis {
            text: "hel".to_string(),
            offset: 1,
            duration: 2,
        })
    );
}

#[test]
fn unknown_path_becomes_user_message() {
    let message = decode("Path: extraTopic\r\nContent-Type: text/plain\r\n\r\npayload");
    match message {
        ServerMessage::User(user) => {
            assert_eq!(user.path, "extraTopic");
            assert_eq!(user.content_type, "text/plain");
            assert_eq!(user.content, b"payload");
        }
        other => panic!("unexpected message: {other:?}"),
    }
}

#[test]
fn turn_end_without_body_is_terminal() {
    assert!(decode("Path: turn.end\r\n\r\n").is_turn_end());
}

#[test]
fn audio_chunk_encodes_as_binary_frame() {
    let message = ClientMessage::Audio { chunk: vec![9, 8, 7] };
    let EncodedFrame::Binary(bytes) = message.encode("REQ", "2026-01-01T00:00:00.000Z").unwrap() else {
        panic!("audio must be binary");
    };
    let parsed = Frame::parse_binary(&bytes).unwrap();
    assert_eq!(parsed.path(), Some("audio"));
    assert_eq!(parsed.header(frame::REQUEST_ID), Some("REQ"));
    assert_eq!(parsed.body(), &[9, 8, 7]);
}

#[test]
fn end_of_audio_is_empty_audio_frame() {
    let EncodedFrame::Binary(bytes) = ClientMessage::AudioEnd.encode("REQ", "ts").unwrap() else {
        panic!("end of audio must be binary");
    };
    let parsed = Frame::parse_binary(&bytes).unwrap();
    assert_eq!(parsed.path(), Some("audio"));
    assert!(parsed.body().is_empty());
}

#[test]
fn user_message_encodes_as_text_frame() {
    let message = ClientMessage::User {
        path: "custom/path".to_string(),
        content_type: "application/json".to_string(),
        body: b"{}".to_vec(),
    };
    let EncodedFrame::Text(text) = message.encode("REQ", "ts").unwrap() else {
        panic!("user message must be text");
    };
    let parsed = Frame::parse_text(&text).unwrap();
    assert_eq!(parsed.path(), Some("custom/path"));
    assert_eq!(parsed.header(frame::TIMESTAMP), Some("ts"));
    assert_eq!(parsed.body(), b"{}");
}

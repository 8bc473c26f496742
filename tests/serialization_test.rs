//! Save/load round trips through the JSON-safe form.

mod common;

use common::{gradient, ramp, wav_bytes};
use multimodal::parts::wire::{compress, decompress};
use multimodal::{pcm, AudioPart, BinaryPart, DataPart, Extra, ImagePart, MessagePart, TextPart};
use serde_json::json;

#[test]
fn audio_saves_as_wav_uri() {
    let audio = AudioPart::new(pcm::to_bytes(&ramp(300)), 24000).unwrap();
    let value = serde_json::to_value(&audio).unwrap();
    assert!(value["wav_data"]
        .as_str()
        .unwrap()
        .starts_with("data:audio/wav;base64,"));

    let back: AudioPart = serde_json::from_value(value).unwrap();
    assert_eq!(back, audio);
}

#[test]
fn foreign_wav_is_normalized_on_load() {
    // A stereo 8 kHz WAV that was never produced by this crate.
    let stereo: Vec<i16> = ramp(100).into_iter().flat_map(|s| [s, s]).collect();
    let uri = format!(
        "data:audio/wav;base64,{}",
        multimodal_common::data_uri::encode_b64(&wav_bytes(&stereo, 8000, 2))
    );
    let audio = AudioPart::from_json(json!({ "wav_data": uri })).unwrap();
    assert_eq!(audio.sample_rate(), 8000);
    assert_eq!(audio.raw(), pcm::to_bytes(&ramp(100)).as_slice());
}

#[test]
fn binary_payload_is_zlib() {
    let data = b"the same line again\n".repeat(100);
    let part = BinaryPart::from_bytes(data.clone(), "text/plain").unwrap();
    let value = part.to_json().unwrap();

    let payload = multimodal_common::data_uri::decode_b64(value["data"].as_str().unwrap()).unwrap();
    assert_eq!(decompress(&payload).unwrap(), data);
    assert!(payload.len() < data.len());
}

#[test]
fn legacy_uncompressed_binary_loads() {
    let value = json!({
        "mime": "application/octet-stream",
        "data": multimodal_common::data_uri::encode_b64(b"\x00\x01\x02"),
    });
    let part: BinaryPart = serde_json::from_value(value).unwrap();
    assert_eq!(part.as_bytes().unwrap(), b"\x00\x01\x02");
}

#[test]
fn compressed_binary_loads() {
    let compressed = compress(b"hello").unwrap();
    let value = json!({
        "mime": "text/plain",
        "compression": "gzip",
        "data": multimodal_common::data_uri::encode_b64(&compressed),
    });
    let part = BinaryPart::from_json(value).unwrap();
    assert_eq!(part.as_bytes().unwrap(), b"hello");
}

#[test]
fn image_round_trip_preserves_png_bytes() {
    let image = ImagePart::new(gradient(12, 9));
    let json = serde_json::to_string(&image).unwrap();
    let back: ImagePart = serde_json::from_str(&json).unwrap();
    assert_eq!(back.as_bytes("png").unwrap(), image.as_bytes("png").unwrap());
}

#[test]
fn extra_survives_round_trip() {
    let mut extra = Extra::new();
    extra.insert("speaker".into(), json!("alice"));
    extra.insert("turn".into(), json!(3));

    let audio = AudioPart::new(pcm::to_bytes(&[1, 2]), 16000)
        .unwrap()
        .with_extra(extra.clone());
    let back = AudioPart::from_json(audio.to_json().unwrap()).unwrap();
    assert_eq!(back.extra, extra);

    let image = ImagePart::new(gradient(2, 2)).with_extra(extra.clone());
    let back = ImagePart::from_json(image.to_json().unwrap()).unwrap();
    assert_eq!(back.extra, extra);
}

#[test]
fn message_parts_are_tagged() {
    let parts = vec![
        MessagePart::from(TextPart::new("describe this")),
        MessagePart::from(ImagePart::new(gradient(3, 3))),
        MessagePart::from(AudioPart::new(pcm::to_bytes(&[7, 8, 9]), 16000).unwrap()),
    ];
    let value = serde_json::to_value(&parts).unwrap();
    assert_eq!(value[0]["type"], "text");
    assert_eq!(value[1]["type"], "image");
    assert_eq!(value[2]["type"], "audio");

    let back: Vec<MessagePart> = serde_json::from_value(value).unwrap();
    assert_eq!(back[0].as_text(), Some("describe this"));
    match &back[2] {
        MessagePart::Audio(audio) => {
            assert_eq!(pcm::samples(audio.raw()).collect::<Vec<_>>(), vec![7, 8, 9])
        }
        other => panic!("expected audio, got {}", other.kind()),
    }
}

#[test]
fn malformed_payloads_are_errors() {
    assert!(serde_json::from_value::<AudioPart>(json!({"wav_data": "data:audio/mp3;base64,AA=="})).is_err());
    assert!(serde_json::from_value::<ImagePart>(json!({"img_data": "not a uri"})).is_err());
    assert!(serde_json::from_value::<BinaryPart>(json!({"mime": "text/plain", "compression": "gzip", "data": "aGk="})).is_err());
}

#[test]
fn envelope_cannot_name_a_local_file() {
    let secret = common::temp_file(b"TOP-SECRET", ".txt");
    let path = secret.path().to_string_lossy().into_owned();

    for value in [
        json!({"type": "binary", "path": path, "mime": "text/plain"}),
        json!({"type": "video", "path": path}),
        json!({"type": "image", "path": path}),
    ] {
        let err = serde_json::from_value::<MessagePart>(value).unwrap_err();
        assert!(err.to_string().starts_with("Format error"), "{err}");
    }
}

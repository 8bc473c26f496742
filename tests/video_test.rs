//! Integration tests for video parts using mock capabilities.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use assert_matches::assert_matches;
use common::{temp_file, with_prober, CountingProber, FixedSampler};
use multimodal::{Capabilities, DataPart, Error, Resolution, VideoPart};

#[test]
fn metadata_is_probed_once() {
    let prober = Arc::new(CountingProber::new(219.080272, 480, 360));
    let video = VideoPart::from_bytes(vec![0u8; 64], "video/mp4")
        .unwrap()
        .with_capabilities(with_prober(prober.clone()));

    assert_eq!(video.duration().unwrap(), 219.080272);
    assert_eq!(video.resolution().unwrap(), Resolution::new(480, 360));
    assert_eq!(video.duration().unwrap(), 219.080272);
    assert_eq!(prober.calls(), 1);
}

#[test]
fn failed_probe_is_retried() {
    let prober = Arc::new(CountingProber::new(3.0, 64, 48).failing_first(1));
    let video = VideoPart::from_bytes(vec![0u8; 64], "video/mp4")
        .unwrap()
        .with_capabilities(with_prober(prober.clone()));

    assert_matches!(video.duration(), Err(Error::ToolFailed { .. }));
    assert_eq!(video.duration().unwrap(), 3.0);
    assert_eq!(video.resolution().unwrap(), Resolution::new(64, 48));
    assert_eq!(prober.calls(), 2);
}

#[test]
fn file_backed_video_is_probed_by_descriptor() {
    let file = temp_file(&[0u8; 128], ".mkv");
    let prober = Arc::new(CountingProber::new(1.0, 2, 2));
    let video = VideoPart::from_file(file.path(), None)
        .unwrap()
        .with_capabilities(with_prober(prober.clone()));

    assert_eq!(video.mime(), "video/x-matroska");
    video.duration().unwrap();
    assert!(prober.saw_descriptor.load(Ordering::SeqCst));
}

#[test]
fn missing_prober_is_capability_unavailable() {
    let video = VideoPart::from_bytes(vec![0u8; 8], "video/mp4")
        .unwrap()
        .with_capabilities(Capabilities::none());
    assert_matches!(video.resolution(), Err(Error::CapabilityUnavailable { .. }));
}

#[tokio::test]
async fn tensor_without_sampler_is_capability_unavailable() {
    let prober = Arc::new(CountingProber::new(1.0, 4, 4));
    let video = VideoPart::from_bytes(vec![0u8; 8], "video/mp4")
        .unwrap()
        .with_capabilities(with_prober(prober));
    let err = video.as_tensor(1.0, None, None).await.unwrap_err();
    assert!(err.is_capability_unavailable());
}

#[tokio::test]
async fn tensor_is_time_channel_height_width() {
    let prober = Arc::new(CountingProber::new(2.0, 8, 6));
    let sampler = Arc::new(FixedSampler::new(4));
    let caps = with_prober(prober).with_frame_sampler(sampler.clone());
    let video = VideoPart::from_bytes(vec![1u8; 32], "video/mp4")
        .unwrap()
        .with_capabilities(caps);

    let tensor = video.as_tensor(2.0, Some(0.0), Some(2.0)).await.unwrap();
    assert_eq!(tensor.shape(), &[4, 3, 6, 8]);
    assert_eq!(tensor[[3, 2, 5, 7]], 3);

    // In-memory content was spilled to a real file for the sampler.
    assert!(sampler.path_existed.load(Ordering::SeqCst));
    let requests = sampler.requests.lock().unwrap();
    assert_eq!(requests[0].resolution, Resolution::new(8, 6));
    assert_eq!(requests[0].fps, 2.0);
}

#[tokio::test(flavor = "current_thread")]
async fn tensor_probes_off_the_runtime_thread() {
    let prober = Arc::new(CountingProber::new(1.0, 4, 2));
    let sampler = Arc::new(FixedSampler::new(2));
    let caps = with_prober(prober.clone()).with_frame_sampler(sampler.clone());
    let video = VideoPart::from_bytes(vec![5u8; 16], "video/mp4")
        .unwrap()
        .with_capabilities(caps);

    let tensor = video.as_tensor(1.0, None, None).await.unwrap();
    assert_eq!(tensor.shape(), &[2, 3, 2, 4]);
    assert!(sampler.path_existed.load(Ordering::SeqCst));

    let probe_thread = prober.last_thread.lock().unwrap().unwrap();
    assert_ne!(probe_thread, std::thread::current().id());

    // The result is cached for the synchronous accessors too.
    assert_eq!(video.resolution().unwrap(), Resolution::new(4, 2));
    assert_eq!(prober.calls(), 1);
}

#[tokio::test]
async fn file_backed_tensor_uses_the_file_path() {
    let file = temp_file(&[0u8; 64], ".mp4");
    let prober = Arc::new(CountingProber::new(1.0, 2, 2));
    let sampler = Arc::new(FixedSampler::new(1));
    let caps = with_prober(prober.clone()).with_frame_sampler(sampler.clone());
    let video = VideoPart::from_file(file.path(), None)
        .unwrap()
        .with_capabilities(caps);

    video.as_tensor(1.0, None, None).await.unwrap();
    assert!(prober.saw_descriptor.load(Ordering::SeqCst));
    assert!(sampler.path_existed.load(Ordering::SeqCst));
}

#[tokio::test]
async fn invalid_frame_request_is_rejected() {
    let prober = Arc::new(CountingProber::new(2.0, 8, 6));
    let caps = with_prober(prober).with_frame_sampler(Arc::new(FixedSampler::new(1)));
    let video = VideoPart::from_bytes(vec![1u8; 32], "video/mp4")
        .unwrap()
        .with_capabilities(caps);

    assert_matches!(
        video.as_tensor(0.0, None, None).await,
        Err(Error::InvalidInput(_))
    );
    assert_matches!(
        video.as_tensor(1.0, Some(2.0), Some(1.0)).await,
        Err(Error::InvalidInput(_))
    );
}

#[test]
fn save_load_preserves_bytes() {
    let payload: Vec<u8> = (0..=255).cycle().take(4096).collect();
    let video = VideoPart::from_bytes(payload.clone(), "video/webm").unwrap();

    let value = video.to_json().unwrap();
    assert_eq!(value["mime"], "video/webm");
    assert_eq!(value["compression"], "gzip");

    let back = VideoPart::from_json(value).unwrap();
    assert_eq!(back.as_bytes().unwrap(), payload);
    assert_eq!(back.mime(), "video/webm");
}

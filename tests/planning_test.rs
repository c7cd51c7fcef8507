//! Integration tests for tier planning over probed stream descriptors.

use clsrs::compat::{classify, LevelTable};
use clsrs::config::{PipelineConfig, TierPolicy, VideoEncoderConfig};
use clsrs::schedule::{StreamCodec, TierScheduler};
use clsrs_av::probe::{AudioStream, MediaInfo, VideoStream};
use clsrs_common::VideoCodec;
use std::path::{Path, PathBuf};

fn media_info(
    codec: &str,
    width: u32,
    height: u32,
    pix_fmt: &str,
    fps: f64,
    audio: Vec<AudioStream>,
) -> MediaInfo {
    MediaInfo {
        file_path: PathBuf::from("source.mkv"),
        file_size: 64 << 20,
        container: "matroska,webm".to_string(),
        duration: Some(42.0),
        bit_rate: Some(8_000_000),
        video_streams: vec![VideoStream {
            index: 0,
            codec_name: codec.to_string(),
            width,
            height,
            pix_fmt: Some(pix_fmt.to_string()),
            fps: Some(fps),
        }],
        audio_streams: audio,
    }
}

#[test]
fn uhd_h264_sixty_fps_full_ladder() {
    // 3840x2160 @ 60fps H264: not in the 60fps table's top codec slot at
    // that size, so every tier is a transcode
    let info = media_info("h264", 3840, 2160, "yuv420p", 60.0, vec![]);
    assert_eq!(
        classify(&info.video_streams[0], &LevelTable::default_60fps()),
        0
    );

    let config = VideoEncoderConfig::default();
    let policy = TierPolicy::default();
    let scheduler = TierScheduler::new(&config, &policy);
    let spec = scheduler.schedule(&info, Path::new("out/asset")).unwrap();

    let codecs: Vec<_> = spec.video_streams.iter().map(|s| s.codec).collect();
    assert_eq!(
        codecs,
        vec![
            StreamCodec::Video(VideoCodec::Av1),
            StreamCodec::Video(VideoCodec::Vp9),
            StreamCodec::Video(VideoCodec::H264),
        ]
    );
    assert_eq!(spec.video_streams[1].size, Some((2560, 1440)));
    assert_eq!(spec.video_streams[2].size, Some((1920, 1080)));

    let deduped = scheduler
        .deduplicate(spec, policy.table_for_fps(60.0))
        .unwrap();
    assert_eq!(deduped.video_streams.len(), 3);
}

#[test]
fn dedup_leaves_exactly_one_baseline() {
    let info = media_info("h264", 1280, 720, "yuv420p", 30.0, vec![]);
    let config = VideoEncoderConfig::default();
    let policy = TierPolicy::default();
    let scheduler = TierScheduler::new(&config, &policy);

    let spec = scheduler.schedule(&info, Path::new("out/a")).unwrap();
    let deduped = scheduler
        .deduplicate(spec, policy.table_for_fps(30.0))
        .unwrap();

    let baseline_count = deduped
        .video_streams
        .iter()
        .filter(|s| s.compatibility_level == 3)
        .count();
    assert_eq!(baseline_count, 1);

    for pair in deduped.video_streams.windows(2) {
        assert_ne!(pair[0].size, pair[1].size);
    }
}

#[test]
fn six_channel_pcm_audio_becomes_stereo_opus() {
    let audio = vec![AudioStream {
        index: 1,
        codec_name: "pcm_s16le".to_string(),
        channels: 6,
        sample_rate: Some(48_000),
    }];
    let info = media_info("h264", 1920, 1080, "yuv420p", 30.0, audio);

    let config = VideoEncoderConfig::default();
    let policy = TierPolicy::default();
    let scheduler = TierScheduler::new(&config, &policy);
    let spec = scheduler.schedule(&info, Path::new("out/a")).unwrap();

    let audio_spec = &spec.audio_streams[0];
    assert!(matches!(audio_spec.codec, StreamCodec::Audio(_)));
    assert_eq!(audio_spec.compatibility_level, 3);
    assert_eq!(audio_spec.source_audio_channels, 6);
    assert_eq!(audio_spec.bitrate, Some(96_000));
}

#[test]
fn classification_agrees_across_whole_pipeline_config() {
    // the scheduler and a bare classify() see the same policy
    let config = PipelineConfig::default();
    let scheduler = TierScheduler::new(&config.video, &config.tiers);
    let info = media_info("vp9", 2560, 1440, "yuv420p", 60.0, vec![]);

    assert_eq!(
        scheduler.source_compatibility_level(&info.video_streams[0]),
        classify(&info.video_streams[0], &config.tiers.levels_60fps)
    );
}

#[test]
fn stream_copy_tier_keeps_source_container() {
    // a VP9 source that already satisfies the baseline box is demuxed
    // into its codec's container, not the tier target's
    let info = media_info("vp9", 1280, 720, "yuv420p", 60.0, vec![]);
    let config = VideoEncoderConfig::default();
    let policy = TierPolicy::default();
    let scheduler = TierScheduler::new(&config, &policy);

    let spec = scheduler.schedule(&info, Path::new("out/clip")).unwrap();
    assert_eq!(spec.video_streams.len(), 1);
    let baseline = &spec.video_streams[0];
    assert_eq!(baseline.codec, StreamCodec::Copy);
    assert_eq!(baseline.file_name, PathBuf::from("clip_cl3.webm"));
}

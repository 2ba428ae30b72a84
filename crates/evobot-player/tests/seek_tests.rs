//! 跳转集成测试

mod common;

use common::*;
use evobot_player::PlayerState;
use evobot_protocol::{HOLD_FRAME, SequenceBuilder};
use std::sync::Arc;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(10);

#[test]
fn test_seek_inside_callback() {
    let player = Arc::new(empty_player());
    let weak = Arc::downgrade(&player);
    let listener = Arc::new(RecordingListener::new().with_hook(move |index| {
        if index == 3 {
            if let Some(player) = weak.upgrade() {
                assert!(player.seek(30));
            }
        }
    }));

    player
        .play_sequence(ramp_sequence(40), 100, listener.clone())
        .unwrap();
    assert!(player.wait_until_finished(TIMEOUT));

    let mut expected: Vec<u32> = (0..=3).collect();
    expected.extend(30..40);
    assert_eq!(listener.frame_indices(), expected);
    assert_eq!(listener.completions(), 1);
    assert_eq!(player.state(), PlayerState::Stopped);
}

#[test]
fn test_seek_while_paused_then_resume() {
    let player = empty_player();
    let listener = Arc::new(RecordingListener::new());
    player
        .play_sequence(ramp_sequence(1000), 100, listener.clone())
        .unwrap();
    assert!(listener.wait_for_frames(3, TIMEOUT));
    assert!(player.pause());
    let frames_before = listener.frame_count();

    assert!(player.seek(20));
    assert_eq!(player.current_frame(), 20);
    assert_eq!(player.state(), PlayerState::Paused);

    // 暂停中跳转不投递任何帧
    std::thread::sleep(Duration::from_millis(100));
    assert_eq!(listener.frame_count(), frames_before);

    assert!(player.resume());
    assert!(listener.wait_for_frames(frames_before + 3, TIMEOUT));
    player.stop();

    let indices = listener.frame_indices();
    assert!(is_contiguous(&indices[frames_before..], 20));
}

#[test]
fn test_seek_while_playing() {
    let player = empty_player();
    let listener = Arc::new(RecordingListener::new());
    player
        .play_sequence(ramp_sequence(1000), 100, listener.clone())
        .unwrap();
    assert!(listener.wait_for_frames(2, TIMEOUT));

    // 跳转完成前调度线程可能已投递新帧，也可能已投递跳转目标
    let frames_before = listener.frame_count();
    assert!(player.seek(500));
    assert!(listener.wait_for_frames(frames_before + 5, TIMEOUT));
    player.stop();

    let indices = listener.frame_indices();
    let tail = &indices[frames_before..];
    let jump = tail.iter().position(|&index| index >= 500).unwrap();
    assert!(tail[..jump].iter().all(|&index| index < 500));
    assert!(is_contiguous(&tail[jump..], 500));
    assert!(tail.len() - jump >= 3);
}

#[test]
fn test_seek_out_of_range_is_noop() {
    let player = empty_player();
    let listener = Arc::new(RecordingListener::new());
    player
        .play_sequence(ramp_sequence(50), 1, listener.clone())
        .unwrap();
    assert!(listener.wait_for_frames(1, TIMEOUT));
    assert!(player.pause());
    let position = player.current_frame();

    assert!(!player.seek(50));
    assert!(!player.seek(u32::MAX));
    assert_eq!(player.current_frame(), position);

    // 最后一帧是合法目标
    assert!(player.seek(49));
    assert_eq!(player.current_frame(), 49);
    player.stop();
}

#[test]
fn test_seek_rejected_when_stopped() {
    let player = empty_player();
    let listener = Arc::new(RecordingListener::new());
    player
        .play_sequence(ramp_sequence(3), 100, listener.clone())
        .unwrap();
    assert!(player.wait_until_finished(TIMEOUT));

    assert!(!player.seek(0));
    assert_eq!(player.state(), PlayerState::Stopped);
}

#[test]
fn test_seek_keeps_fill_cache() {
    // 关节 0 只在第 0 帧有值，之后全部保持
    let mut first = HOLD_FRAME;
    first[0] = 1000;
    let mut builder = SequenceBuilder::new("hold").push_frame(first, HOLD_FRAME);
    for _ in 1..20 {
        builder = builder.push_frame(HOLD_FRAME, HOLD_FRAME);
    }
    let sequence = builder.build().unwrap();

    let player = Arc::new(empty_player());
    let weak = Arc::downgrade(&player);
    let listener = Arc::new(RecordingListener::new().with_hook(move |index| {
        if index == 0 {
            if let Some(player) = weak.upgrade() {
                player.seek(15);
            }
        }
    }));

    player.play_sequence(sequence, 100, listener.clone()).unwrap();
    assert!(player.wait_until_finished(TIMEOUT));

    // 跳转后仍输出跳转前的保持值
    let frames = listener.frames();
    assert_eq!(
        frames.iter().map(|(index, ..)| *index).collect::<Vec<_>>(),
        vec![0, 15, 16, 17, 18, 19]
    );
    assert!(frames.iter().all(|(_, left, _)| left[0] == 1000));
}

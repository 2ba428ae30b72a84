//! 保持值前向填充
//!
//! 序列中的 `-1` 表示"保持上一位置"。播放时按关节维护最近一次有效值，
//! 把原始帧重建成完整帧后再交给监听器。
//!
//! 规则：
//! - 有效值（0..=4095）原样输出，并更新该关节的缓存
//! - `-1` 且该关节已有缓存：输出缓存值
//! - `-1` 且该关节从未出现过有效值：输出 `-1`（下游需容忍）
//!
//! 缓存在 `play()`/`stop()`/急停时清空，`seek()` 时保留。

use evobot_protocol::{HOLD, HOLD_FRAME, JointFrame};

/// 帧重建器（双臂各 10 个关节的有效值缓存）
#[derive(Debug, Clone)]
pub struct FrameReconstructor {
    left: JointFrame,
    right: JointFrame,
}

impl FrameReconstructor {
    /// 创建空缓存（所有关节都还没有有效值）
    pub fn new() -> Self {
        Self {
            left: HOLD_FRAME,
            right: HOLD_FRAME,
        }
    }

    /// 重建一帧
    ///
    /// # 参数
    ///
    /// - `left`/`right`: 原始帧（可能含保持哨兵）
    ///
    /// # 返回
    ///
    /// 填充后的 `(左臂, 右臂)`
    pub fn reconstruct(&mut self, left: &JointFrame, right: &JointFrame) -> (JointFrame, JointFrame) {
        (
            fill_channel(&mut self.left, left),
            fill_channel(&mut self.right, right),
        )
    }

    /// 清空缓存
    pub fn reset(&mut self) {
        self.left = HOLD_FRAME;
        self.right = HOLD_FRAME;
    }

    /// 当前缓存的最近有效值（未出现过的关节为 `-1`）
    pub fn last_valid(&self) -> (&JointFrame, &JointFrame) {
        (&self.left, &self.right)
    }
}

impl Default for FrameReconstructor {
    fn default() -> Self {
        Self::new()
    }
}

/// 单臂填充
pub fn fill_channel(cache: &mut JointFrame, raw: &JointFrame) -> JointFrame {
    let mut out = *raw;
    for (slot, cached) in out.iter_mut().zip(cache.iter_mut()) {
        if *slot == HOLD {
            *slot = *cached;
        } else {
            *cached = *slot;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(values: &[i32]) -> JointFrame {
        let mut out = HOLD_FRAME;
        out[..values.len()].copy_from_slice(values);
        out
    }

    #[test]
    fn test_hold_before_any_value_stays_hold() {
        let mut recon = FrameReconstructor::new();
        let (left, right) = recon.reconstruct(&HOLD_FRAME, &HOLD_FRAME);
        assert_eq!(left, HOLD_FRAME);
        assert_eq!(right, HOLD_FRAME);
    }

    #[test]
    fn test_forward_fill_per_joint() {
        let mut recon = FrameReconstructor::new();

        // 帧 0：关节 0 = 1000
        let (left, _) = recon.reconstruct(&frame(&[1000]), &HOLD_FRAME);
        assert_eq!(left[0], 1000);
        assert_eq!(left[1], HOLD);

        // 帧 1-2：关节 0 保持
        for _ in 0..2 {
            let (left, _) = recon.reconstruct(&HOLD_FRAME, &HOLD_FRAME);
            assert_eq!(left[0], 1000);
        }

        // 帧 3：关节 0 = 1500
        let (left, _) = recon.reconstruct(&frame(&[1500]), &HOLD_FRAME);
        assert_eq!(left[0], 1500);

        // 帧 4：保持最新值
        let (left, _) = recon.reconstruct(&HOLD_FRAME, &HOLD_FRAME);
        assert_eq!(left[0], 1500);
    }

    #[test]
    fn test_arms_are_independent() {
        let mut recon = FrameReconstructor::new();
        recon.reconstruct(&frame(&[10, 20]), &frame(&[30]));

        let (left, right) = recon.reconstruct(&HOLD_FRAME, &frame(&[HOLD, 40]));
        assert_eq!(&left[..2], &[10, 20]);
        assert_eq!(&right[..2], &[30, 40]);
        assert_eq!(right[2], HOLD);
    }

    #[test]
    fn test_zero_is_a_valid_position() {
        let mut recon = FrameReconstructor::new();
        recon.reconstruct(&frame(&[0]), &HOLD_FRAME);
        let (left, _) = recon.reconstruct(&HOLD_FRAME, &HOLD_FRAME);
        assert_eq!(left[0], 0);
    }

    #[test]
    fn test_reset_clears_cache() {
        let mut recon = FrameReconstructor::new();
        recon.reconstruct(&[2048; 10], &[2048; 10]);
        recon.reset();

        assert_eq!(recon.last_valid(), (&HOLD_FRAME, &HOLD_FRAME));
        let (left, right) = recon.reconstruct(&HOLD_FRAME, &HOLD_FRAME);
        assert_eq!(left, HOLD_FRAME);
        assert_eq!(right, HOLD_FRAME);
    }

    #[test]
    fn test_output_never_contains_hold_after_first_value() {
        let mut recon = FrameReconstructor::new();
        recon.reconstruct(&[1; 10], &[2; 10]);
        for i in 0..50 {
            let raw = if i % 2 == 0 { HOLD_FRAME } else { [i; 10] };
            let (left, right) = recon.reconstruct(&raw, &HOLD_FRAME);
            assert!(left.iter().all(|&v| v != HOLD));
            assert_eq!(right, [2; 10]);
        }
    }

    #[test]
    fn test_matches_last_non_hold_scan() {
        use evobot_protocol::JOINTS_PER_ARM;
        use rand::{Rng, SeedableRng, rngs::StdRng};

        let mut rng = StdRng::seed_from_u64(0xEB5);
        let raw: Vec<JointFrame> = (0..500)
            .map(|_| {
                let mut f = HOLD_FRAME;
                for v in f.iter_mut() {
                    if rng.gen_bool(0.3) {
                        *v = rng.gen_range(0..=4095);
                    }
                }
                f
            })
            .collect();

        let mut recon = FrameReconstructor::new();
        for (i, frame) in raw.iter().enumerate() {
            let (left, _) = recon.reconstruct(frame, &HOLD_FRAME);
            for j in 0..JOINTS_PER_ARM {
                // 向前扫描最近的非保持值
                let expected = raw[..=i]
                    .iter()
                    .rev()
                    .map(|f| f[j])
                    .find(|&v| v != HOLD)
                    .unwrap_or(HOLD);
                assert_eq!(left[j], expected, "frame {} joint {}", i, j);
            }
        }
    }
}

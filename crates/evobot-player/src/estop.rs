//! 停止与急停互锁
//!
//! # 急停保证
//!
//! `emergency_stop()` 返回之前：
//! 1. 取消所有待执行的 tick
//! 2. 进入 STOPPED
//! 3. 帧号归零，清空前向填充缓存
//! 4. 恰好调用一次 `on_emergency_stop`
//!
//! 返回之后不会再观察到任何 `on_frame_data`。
//!
//! # 实现
//!
//! 急停先获取投递锁。调度线程只在持有投递锁时调用 `on_frame_data`，
//! 所以急停要么在 tick 之前完成（tick 看到 STOPPED 后空操作），
//! 要么等待在途的那一帧回调返回（最多一次回调时长，与帧间隔无关）。
//! 投递锁可重入，因此在 `on_frame_data` 内部调用急停不会死锁；
//! 会话代数递增后，回调返回时 tick 不会再推进或重新调度。

use crate::metrics::PlaybackMetrics;
use crate::session::{PlayerCore, invoke, notify_state_changes};
use crate::state::PlayerState;
use tracing::{debug, warn};

impl PlayerCore {
    /// 急停（任意状态可调用）
    pub(crate) fn emergency_stop(&self) {
        let _delivery = self.delivery.lock();

        let (listener, change) = {
            let mut session = self.session.lock();
            warn!(
                "Emergency stop requested (state={}, frame={})",
                session.state, session.current_frame
            );

            let change = self.transition(&mut session, PlayerState::Stopped);
            session.invalidate();
            session.reset_cursor();
            (session.listener.clone(), change)
        };

        PlaybackMetrics::bump(&self.metrics.emergency_stops);
        self.wake();

        if let Some(listener) = listener {
            notify_state_changes(Some(&listener), &[change]);
            invoke("on_emergency_stop", || listener.on_emergency_stop());
        }
    }

    /// 普通停止
    ///
    /// IDLE/STOPPED 下为空操作（幂等），返回是否真正执行了停止。
    pub(crate) fn stop(&self) -> bool {
        let _delivery = self.delivery.lock();

        let (listener, change) = {
            let mut session = self.session.lock();
            if !session.state.can_stop() {
                debug!("stop() ignored in state {}", session.state);
                return false;
            }

            let change = self.transition(&mut session, PlayerState::Stopped);
            session.invalidate();
            session.reset_cursor();
            (session.listener.clone(), change)
        };

        self.wake();
        notify_state_changes(listener.as_ref(), &[change]);
        true
    }
}

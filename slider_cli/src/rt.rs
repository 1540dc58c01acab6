//! Real-time scheduling helpers: SCHED_FIFO plus mlockall on Linux.
//!
//! Elevation failures are warnings, never fatal; the motion loop degrades to
//! normal scheduling with more jitter.

#[cfg(all(feature = "rt", target_os = "linux"))]
pub fn setup_rt_once(rt: bool, prio: Option<i32>) {
    use libc::{
        MCL_CURRENT, SCHED_FIFO, mlockall, sched_get_priority_max, sched_get_priority_min,
        sched_param, sched_setscheduler,
    };
    use std::sync::OnceLock;
    static RT_ONCE: OnceLock<()> = OnceLock::new();

    if !rt {
        return;
    }

    RT_ONCE.get_or_init(|| {
        // Lock currently resident pages so the pulse loop does not page-fault.
        let rc = unsafe { mlockall(MCL_CURRENT) };
        if rc != 0 {
            let err = std::io::Error::last_os_error();
            tracing::warn!(
                error = %err,
                "mlockall(current) failed; hint: needs CAP_IPC_LOCK (or root) and sufficient 'ulimit -l'"
            );
        }

        unsafe {
            let minp = sched_get_priority_min(SCHED_FIFO);
            let maxp = sched_get_priority_max(SCHED_FIFO);
            if minp < 0 || maxp < 0 || minp > maxp {
                tracing::warn!("SCHED_FIFO not available; keeping normal scheduling");
                return;
            }
            let req = prio.unwrap_or(minp.saturating_add(1)).clamp(minp, maxp);
            let param = sched_param {
                sched_priority: req,
            };
            let rc = sched_setscheduler(0, SCHED_FIFO, &param);
            if rc != 0 {
                let err = std::io::Error::last_os_error();
                match err.raw_os_error() {
                    Some(code) if code == libc::EPERM => tracing::warn!(
                        error = %err,
                        "realtime scheduling denied; hint: needs CAP_SYS_NICE or root and an adequate RLIMIT_RTPRIO"
                    ),
                    Some(code) if code == libc::EINVAL => tracing::warn!(
                        error = %err,
                        "realtime scheduling rejected; invalid priority for this policy"
                    ),
                    _ => tracing::warn!(error = %err, "realtime scheduling unavailable; expect higher jitter"),
                }
            } else {
                tracing::info!(priority = req, "SCHED_FIFO active");
            }
        }
    });
}

#[cfg(not(all(feature = "rt", target_os = "linux")))]
pub fn setup_rt_once(rt: bool, _prio: Option<i32>) {
    if rt {
        tracing::warn!("real-time mode requested but this build has no rt support");
    }
}

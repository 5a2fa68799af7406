// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

use crate::exception::{JakaException, JakaResult};
use crate::robot::control_types::RealtimeConfig;
use std::path::Path;

/// Determines whether the current OS kernel is a realtime kernel.
///
/// On Linux, this checks for the existence of `/sys/kernel/realtime`.
pub fn has_realtime_kernel() -> bool {
    Path::new("/sys/kernel/realtime").exists()
}

/// Sets the current thread to the highest possible scheduler priority.
///
/// # Errors
/// * RealtimeException if realtime priority cannot be set for the current thread.
///
/// If the method returns an Error please check your /etc/security/limits.conf file
/// There should be a line like this:
/// ```text
///operator         -       rtprio          99
/// ```
pub fn set_current_thread_to_highest_scheduler_priority() -> JakaResult<()> {
    unsafe {
        let max_priority = libc::sched_get_priority_max(libc::SCHED_FIFO);
        if max_priority == -1 {
            return Err(JakaException::RealTimeException {
                message: "libjaka-rs: unable to get maximum possible thread priority".to_string(),
            });
        }
        // one below the maximum leaves room for kernel threads
        let thread_param = libc::sched_param {
            sched_priority: max_priority - 1,
        };
        if libc::pthread_setschedparam(libc::pthread_self(), libc::SCHED_FIFO, &thread_param) != 0 {
            return Err(JakaException::RealTimeException {
                message: "libjaka-rs: unable to set realtime scheduling".to_string(),
            });
        }
        if libc::mlockall(libc::MCL_CURRENT | libc::MCL_FUTURE) != 0 {
            return Err(JakaException::RealTimeException {
                message: "libjaka-rs: unable to lock memory".to_string(),
            });
        }
    }
    Ok(())
}

/// Applies the realtime configuration to the calling thread.
///
/// # Errors
/// * RealtimeException if [`RealtimeConfig::Enforce`] is requested on a kernel without
/// realtime capabilities or if the priority cannot be raised.
pub fn apply_realtime_config(config: RealtimeConfig) -> JakaResult<()> {
    match config {
        RealtimeConfig::Ignore => Ok(()),
        RealtimeConfig::Enforce => {
            if has_realtime_kernel() {
                set_current_thread_to_highest_scheduler_priority()
            } else {
                Err(JakaException::RealTimeException {
                    message: "libjaka-rs: Running kernel does not have realtime capabilities."
                        .to_string(),
                })
            }
        }
    }
}

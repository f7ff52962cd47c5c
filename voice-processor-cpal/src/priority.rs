//! Urgent-audio scheduling for the capture worker thread.

use voice_processor_core::CaptureError;

/// Nice value the Android audio framework uses for its own capture threads.
#[cfg(any(target_os = "linux", target_os = "android"))]
const URGENT_AUDIO_NICE: libc::c_int = -19;

/// Raise the calling thread's scheduling priority.
///
/// Unprivileged processes are usually refused; the caller logs and carries on.
#[cfg(any(target_os = "linux", target_os = "android"))]
pub fn promote_current_thread() -> Result<(), CaptureError> {
    // On Linux, PRIO_PROCESS with who = 0 applies to the calling thread.
    let rc = unsafe { libc::setpriority(libc::PRIO_PROCESS, 0, URGENT_AUDIO_NICE) };
    if rc != 0 {
        return Err(CaptureError::Unknown(format!(
            "setpriority({}) failed: {}",
            URGENT_AUDIO_NICE,
            std::io::Error::last_os_error()
        )));
    }
    Ok(())
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
pub fn promote_current_thread() -> Result<(), CaptureError> {
    Err(CaptureError::Unknown(
        "thread priority elevation not supported on this platform".into(),
    ))
}

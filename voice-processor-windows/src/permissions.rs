//! Microphone permission for unpackaged desktop apps.
//!
//! Windows has no runtime consent dialog for unpackaged desktop apps: the
//! Settings > Privacy > Microphone toggle either lets the capture endpoint
//! activate or it does not. The status is read by activating the endpoint, and
//! a request is answered on the spot with that same status.

use windows::Win32::Media::Audio::*;
use windows::Win32::System::Com::*;

use voice_processor_core::{PermissionProvider, PermissionRequest, PermissionStatus};

/// Activation results that mean the privacy toggle blocks capture.
const E_ACCESSDENIED: i32 = 0x8007_0005_u32 as i32;
const AUDCLNT_E_DEVICE_IN_USE: i32 = 0x8889_000A_u32 as i32;

/// `PermissionProvider` backed by activating the default capture endpoint.
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowsMicPermissions;

impl WindowsMicPermissions {
    /// Map an `IAudioClient` activation outcome to a permission status.
    fn status_for(activation: windows::core::Result<IAudioClient>) -> PermissionStatus {
        match activation {
            Ok(_) => PermissionStatus::Granted,
            Err(e) if matches!(e.code().0, E_ACCESSDENIED | AUDCLNT_E_DEVICE_IN_USE) => {
                PermissionStatus::Denied
            }
            Err(e) => {
                log::warn!("Capture endpoint activation failed: {}", e);
                PermissionStatus::Undetermined
            }
        }
    }
}

impl PermissionProvider for WindowsMicPermissions {
    fn check(&self) -> PermissionStatus {
        unsafe {
            if let Err(e) = CoInitializeEx(None, COINIT_MULTITHREADED).ok() {
                log::warn!("CoInitializeEx failed: {}", e);
                return PermissionStatus::Undetermined;
            }

            let status = match CoCreateInstance::<_, IMMDeviceEnumerator>(&MMDeviceEnumerator, None, CLSCTX_ALL) {
                Err(e) => {
                    log::warn!("MMDeviceEnumerator unavailable: {}", e);
                    PermissionStatus::Undetermined
                }
                Ok(enumerator) => match enumerator.GetDefaultAudioEndpoint(eCapture, eConsole) {
                    // No microphone to grant access to.
                    Err(_) => PermissionStatus::Denied,
                    Ok(endpoint) => Self::status_for(endpoint.Activate(CLSCTX_ALL, None)),
                },
            };

            CoUninitialize();
            status
        }
    }

    fn request(&self, request: PermissionRequest) {
        let status = self.check();
        log::debug!("Answering permission request {} with {:?}", request.code(), status);
        request.respond(status.is_granted());
    }
}

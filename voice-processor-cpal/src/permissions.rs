//! Microphone permission probe for desktop hosts.
//!
//! Desktop audio APIs have no runtime consent prompt reachable through cpal:
//! access is either allowed by the OS privacy settings or the device fails to
//! open. Permission is therefore reported as granted whenever an input device
//! is present, and a prompt is answered immediately with that same probe.

use voice_processor_core::{PermissionProvider, PermissionRequest, PermissionStatus};

#[derive(Debug, Clone, Copy, Default)]
pub struct CpalPermissions;

impl CpalPermissions {
    fn has_input_device() -> bool {
        use cpal::traits::HostTrait;
        cpal::default_host().default_input_device().is_some()
    }
}

impl PermissionProvider for CpalPermissions {
    fn check(&self) -> PermissionStatus {
        if Self::has_input_device() {
            PermissionStatus::Granted
        } else {
            PermissionStatus::Denied
        }
    }

    fn request(&self, request: PermissionRequest) {
        let granted = Self::has_input_device();
        log::debug!("Answering permission request {} with {}", request.code(), granted);
        request.respond(granted);
    }
}

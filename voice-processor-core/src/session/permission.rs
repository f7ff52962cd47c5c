use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::delivery::DeliveryContext;
use crate::models::config::DenialPolicy;
use crate::models::error::CaptureError;
use crate::session::pending::PendingResult;
use crate::traits::permission_provider::{PermissionProvider, PermissionRequest};

/// Record-audio permission flow.
///
/// Callers asking while a prompt is already on screen wait for that same
/// prompt; only one OS request is outstanding at a time.
pub struct PermissionGate {
    provider: Arc<dyn PermissionProvider>,
    request_code: i32,
    denial_policy: DenialPolicy,
    delivery: Arc<dyn DeliveryContext>,
    waiting: Mutex<Vec<PendingResult<bool>>>,
    this: Weak<PermissionGate>,
}

impl PermissionGate {
    pub fn new(
        provider: Arc<dyn PermissionProvider>,
        request_code: i32,
        denial_policy: DenialPolicy,
        delivery: Arc<dyn DeliveryContext>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            provider,
            request_code,
            denial_policy,
            delivery,
            waiting: Mutex::new(Vec::new()),
            this: this.clone(),
        })
    }

    /// Resolve `result` with whether recording is allowed, prompting the user
    /// if it is not granted yet. An existing grant resolves on the calling
    /// thread without a prompt.
    pub fn has_capture_permission(&self, result: PendingResult<bool>) {
        if self.provider.check().is_granted() {
            result.resolve(Ok(true));
            return;
        }

        let first = {
            let mut waiting = self.waiting.lock();
            waiting.push(result);
            waiting.len() == 1
        };

        if first {
            log::info!("Requesting record audio permission (code {})", self.request_code);
            self.provider
                .request(PermissionRequest::new(self.request_code, self.this.clone()));
        }
    }

    /// OS callback for a permission prompt. Returns whether `code` belonged to
    /// this gate and someone was waiting for it.
    pub fn on_permission_result(&self, code: i32, granted: bool) -> bool {
        if code != self.request_code {
            return false;
        }

        let waiting = std::mem::take(&mut *self.waiting.lock());
        if waiting.is_empty() {
            return false;
        }

        let outcome = match (granted, self.denial_policy) {
            (true, _) => Ok(true),
            (false, DenialPolicy::ResolveFalse) => Ok(false),
            (false, DenialPolicy::Error) => Err(CaptureError::PermissionDenied),
        };
        log::info!("Record audio permission granted: {}", granted);

        self.delivery.post(Box::new(move || {
            for pending in waiting {
                pending.resolve(outcome.clone());
            }
        }));
        true
    }

    /// Fail everyone still waiting on a prompt.
    pub fn cancel_pending(&self) {
        let waiting = std::mem::take(&mut *self.waiting.lock());
        for pending in waiting {
            pending.resolve(Err(CaptureError::Unknown(
                "capture session closed".into(),
            )));
        }
    }
}

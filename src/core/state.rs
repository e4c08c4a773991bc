use std::sync::Arc;

use crate::core::config::Settings;
use crate::services::integrity::IntegrityRecorder;
use crate::store::EngineStore;

#[derive(Clone)]
pub(crate) struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    settings: Settings,
    store: Arc<dyn EngineStore>,
    recorder: IntegrityRecorder,
}

impl AppState {
    pub(crate) fn new(
        settings: Settings,
        store: Arc<dyn EngineStore>,
        recorder: IntegrityRecorder,
    ) -> Self {
        Self { inner: Arc::new(InnerState { settings, store, recorder }) }
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub(crate) fn store(&self) -> &dyn EngineStore {
        self.inner.store.as_ref()
    }

    pub(crate) fn recorder(&self) -> &IntegrityRecorder {
        &self.inner.recorder
    }
}

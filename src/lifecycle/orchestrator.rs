//! Command orchestrator - executes actions that require a backend round trip
//! while keeping the lifecycle machine consistent under failure.
//!
//! Every backend-backed action follows the same contract:
//! 1. guard - if the predicate is false, return with no observable effect;
//! 2. transition to the transient state before the call is issued;
//! 3. await the call;
//! 4. on success, run the action's follow-up and settle into the terminal
//!    success state;
//! 5. on failure, record the message and settle into the `*Failed` state;
//! 6. a user-cancelled picker reply restores the state captured before the
//!    transient transition.
//!
//! Because every transient state excludes the guards of all other actions,
//! at most one call is in flight; a second request is silently dropped by its
//! guard rather than queued. There is no timeout on backend calls: a hung
//! call leaves the transient state active indefinitely.

use std::sync::Arc;

use log::{debug, warn};

use crate::backend::{Backend, FileKind, FileStatus, HostReply};
use crate::content::ContentStore;
use crate::lifecycle::hold::{HoldGate, REMOVE_HOLD};
use crate::lifecycle::machine::{
    LifecycleAction, LifecycleEvent, LifecycleMachine, LifecycleState, TransitionResult,
};
use crate::models::ModelAvailability;
use crate::store::Store;

pub struct Orchestrator {
    backend: Arc<dyn Backend>,
    machine: Arc<LifecycleMachine>,
    availability: Arc<ModelAvailability>,
    content: Arc<ContentStore>,
    image: Arc<Store<Option<String>>>,
    host_ready: Store<bool>,
    remove_hold: HoldGate,
}

impl Orchestrator {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            machine: Arc::new(LifecycleMachine::new()),
            availability: Arc::new(ModelAvailability::new()),
            content: Arc::new(ContentStore::new()),
            image: Arc::new(Store::new(None)),
            host_ready: Store::new(false),
            remove_hold: HoldGate::new(REMOVE_HOLD),
        }
    }

    pub fn machine(&self) -> &Arc<LifecycleMachine> {
        &self.machine
    }

    pub fn availability(&self) -> &Arc<ModelAvailability> {
        &self.availability
    }

    pub fn content(&self) -> &Arc<ContentStore> {
        &self.content
    }

    /// Data URL of the currently loaded image; owned by the view layer, read
    /// here only to gate re-run.
    pub fn image(&self) -> &Arc<Store<Option<String>>> {
        &self.image
    }

    // Derived predicates over the stores. The per-state ones live on
    // `LifecycleState` itself.

    pub fn rerunnable(&self) -> bool {
        self.machine.current().runnable() && self.image.get().is_some()
    }

    pub fn settings_usable(&self) -> bool {
        self.host_ready.get() && !self.machine.current().is_running()
    }

    pub fn model_exists(&self) -> bool {
        self.availability.all_present()
    }

    /// One-shot host-ready signal: pull availability and either initialize
    /// the pipeline or settle into NoModel.
    pub async fn on_host_ready(&self) {
        self.host_ready.set(true);
        let status = self.refresh_file_status().await;
        let event = LifecycleEvent::HostReady {
            model_ready: status.all_present(),
        };
        if self.entered(event, LifecycleState::Initializing) {
            self.run_init().await;
        }
    }

    /// Pull `get_file_status` and mirror it into the availability store.
    pub async fn refresh_file_status(&self) -> FileStatus {
        let status = self.backend.get_file_status().await;
        self.availability.set(status);
        status
    }

    /// Re-check availability outside of an action settling (e.g. files
    /// changed on disk behind the app) and react to the result.
    pub async fn sync_model_state(&self) {
        let status = self.refresh_file_status().await;
        let event = LifecycleEvent::ModelsChanged {
            model_ready: status.all_present(),
        };
        if self.entered(event, LifecycleState::Initializing) {
            self.run_init().await;
        }
    }

    /// Import a single model file through the host's file picker.
    pub async fn import_file(&self, kind: FileKind) {
        if !self.settings_usable() || self.availability.has(kind) {
            debug!("import {kind} dropped by guard");
            return;
        }
        let prior = self.machine.current();
        if !self.request(LifecycleAction::Import) {
            return;
        }
        match self.backend.import_file(kind).await {
            reply if reply.is_cancelled() => self.machine.restore(prior),
            HostReply::Ok(_) => self.settle_file_action(LifecycleAction::Import).await,
            HostReply::Err(message) => self.fail(LifecycleAction::Import, message),
        }
    }

    /// Remove a model file. The raw action; the hold gate sits in front of it
    /// in [`Orchestrator::remove_file_held`].
    pub async fn remove_file(&self, kind: FileKind) {
        if !self.settings_usable() || !self.availability.has(kind) {
            debug!("remove {kind} dropped by guard");
            return;
        }
        if !self.request(LifecycleAction::Remove) {
            return;
        }
        // The worker must be torn down before its files disappear under it.
        let _ = self.backend.destroy_pipeline().await;
        match self.backend.remove_file(kind).await {
            HostReply::Ok(_) => self.settle_file_action(LifecycleAction::Remove).await,
            HostReply::Err(message) => self.fail(LifecycleAction::Remove, message),
        }
    }

    /// Remove a model file after a sustained hold completes the countdown.
    /// Releasing early resolves the hold without touching state or backend.
    pub async fn remove_file_held(&self, kind: FileKind) {
        if !self.remove_hold.press().await {
            debug!("remove {kind} hold released early");
            return;
        }
        self.remove_file(kind).await;
    }

    /// Release the removal trigger, cancelling any pending hold.
    pub fn release_remove_hold(&self) {
        self.remove_hold.release();
    }

    /// Fetch whichever model files are missing from the hub.
    pub async fn download_missing(&self) {
        if !self.settings_usable() || self.model_exists() {
            debug!("download dropped by guard");
            return;
        }
        if !self.request(LifecycleAction::Download) {
            return;
        }
        match self.backend.download_missing_model_from_hf().await {
            HostReply::Ok(_) => self.settle_file_action(LifecycleAction::Download).await,
            HostReply::Err(message) => self.fail(LifecycleAction::Download, message),
        }
    }

    /// Run inference over a data-URL encoded image. On success the extracted
    /// text is written with direct semantics so it renders immediately.
    pub async fn infer(&self, image_data_url: &str) {
        if !self.request(LifecycleAction::Infer) {
            return;
        }
        match self.backend.infer(image_data_url.to_string()).await {
            HostReply::Ok(text) => {
                self.content.set_content(text, true);
                let _ = self.machine.transition(LifecycleEvent::Succeeded {
                    action: LifecycleAction::Infer,
                    model_ready: self.availability.all_present(),
                });
            }
            HostReply::Err(message) => self.fail(LifecycleAction::Infer, message),
        }
    }

    /// Open the host's image picker, then infer over the chosen image.
    /// Dismissing the picker is a complete no-op.
    pub async fn upload_and_infer(&self) {
        if !self.machine.current().runnable() {
            debug!("upload dropped by guard");
            return;
        }
        match self.backend.open_image().await {
            reply if reply.is_cancelled() => {}
            HostReply::Ok(data_url) => {
                self.image.set(Some(data_url.clone()));
                self.infer(&data_url).await;
            }
            HostReply::Err(message) => {
                warn!("open_image failed: {message}");
                self.machine.set_error(message);
                let _ = self
                    .machine
                    .transition(LifecycleEvent::Failed(LifecycleAction::Infer));
            }
        }
    }

    /// Load an already-decoded image (paste or drop path) and infer over it.
    pub async fn load_image(&self, data_url: &str) {
        if !self.machine.current().runnable() {
            debug!("load_image dropped by guard");
            return;
        }
        self.image.set(Some(data_url.to_string()));
        self.infer(data_url).await;
    }

    /// Re-run inference over the currently loaded image.
    pub async fn rerun(&self) {
        if !self.rerunnable() {
            debug!("rerun dropped by guard");
            return;
        }
        if let Some(data_url) = self.image.get() {
            self.infer(&data_url).await;
        }
    }

    /// Drop the loaded image and blank both content buffers synchronously.
    pub fn clear(&self) {
        if !self.machine.current().runnable() || self.image.get().is_none() {
            debug!("clear dropped by guard");
            return;
        }
        self.content.set_content("", true);
        self.image.set(None);
    }

    pub async fn minimize(&self) {
        self.backend.minimize().await;
    }

    pub async fn quit(&self) {
        self.backend.quit().await;
    }

    /// Enter the action's transient state. A rejection means another action
    /// is in flight or the state forbids this one: a guarded no-op.
    fn request(&self, action: LifecycleAction) -> bool {
        match self.machine.transition(LifecycleEvent::Requested(action)) {
            Ok(_) => true,
            Err(rejection) => {
                debug!("{rejection}");
                false
            }
        }
    }

    /// Shared success path for import/remove/download: re-check availability
    /// and either fall back to NoModel or initialize the now-complete model.
    async fn settle_file_action(&self, action: LifecycleAction) {
        let status = self.refresh_file_status().await;
        let event = LifecycleEvent::Succeeded {
            action,
            model_ready: status.all_present(),
        };
        if self.entered(event, LifecycleState::Initializing) {
            self.run_init().await;
        }
    }

    /// Initialize the pipeline. Assumes the machine is already Initializing.
    async fn run_init(&self) {
        match self.backend.init_pipeline().await {
            HostReply::Ok(_) => {
                let _ = self.machine.transition(LifecycleEvent::Succeeded {
                    action: LifecycleAction::Initialize,
                    model_ready: true,
                });
            }
            HostReply::Err(message) => self.fail(LifecycleAction::Initialize, message),
        }
    }

    fn fail(&self, action: LifecycleAction, message: String) {
        warn!("{action} failed: {message}");
        self.machine.set_error(message);
        let _ = self.machine.transition(LifecycleEvent::Failed(action));
    }

    /// Apply an event and report whether the machine landed in `target`.
    fn entered(&self, event: LifecycleEvent, target: LifecycleState) -> bool {
        match self.machine.transition(event) {
            Ok(TransitionResult::Changed { to, .. }) => to == target,
            Ok(TransitionResult::Unchanged) => false,
            Err(rejection) => {
                debug!("{rejection}");
                false
            }
        }
    }
}

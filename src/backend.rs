//! Call contract for the out-of-process backend.
//!
//! The backend owns model inference and all filesystem operations; this crate
//! only talks to it through [`Backend`]. Every call is asynchronous and
//! resolves to a tagged [`HostReply`] mirroring the wire shape
//! `{ type: "ok" | "err", data: string }`.

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};

/// Distinguished `ok` payload returned by file-picker style calls when the
/// user dismissed the dialog. Neither success nor failure.
pub const USER_CANCELLED: &str = "user cancelled";

/// Tagged result from a backend call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum HostReply {
    Ok(String),
    Err(String),
}

impl HostReply {
    /// True for the distinguished user-cancelled payload of picker calls.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Ok(data) if data == USER_CANCELLED)
    }
}

/// The three model files the backend manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FileKind {
    Encoder,
    Decoder,
    Tokenizer,
}

/// On-disk presence of each model file, as reported by the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStatus {
    pub encoder: bool,
    pub decoder: bool,
    pub tokenizer: bool,
}

impl FileStatus {
    pub fn all_present(&self) -> bool {
        self.encoder && self.decoder && self.tokenizer
    }

    pub fn has(&self, kind: FileKind) -> bool {
        match kind {
            FileKind::Encoder => self.encoder,
            FileKind::Decoder => self.decoder,
            FileKind::Tokenizer => self.tokenizer,
        }
    }
}

/// Operations the orchestrator issues against the host process.
///
/// Object safe so the UI shell can inject whichever transport it uses;
/// methods return boxed futures for that reason.
pub trait Backend: Send + Sync {
    /// Run inference over a data-URL encoded image; ok payload is the
    /// extracted text.
    fn infer(&self, image_data_url: String) -> BoxFuture<'_, HostReply>;

    /// Spin up the model worker. Requires all model files present.
    fn init_pipeline(&self) -> BoxFuture<'_, HostReply>;

    /// Tear down the model worker. Safe to call when none is running.
    fn destroy_pipeline(&self) -> BoxFuture<'_, HostReply>;

    /// Open a file picker; ok payload is the image data URL, or the
    /// [`USER_CANCELLED`] sentinel.
    fn open_image(&self) -> BoxFuture<'_, HostReply>;

    /// Pick and copy a model file into place; may be cancelled.
    fn import_file(&self, kind: FileKind) -> BoxFuture<'_, HostReply>;

    /// Delete a model file from disk.
    fn remove_file(&self, kind: FileKind) -> BoxFuture<'_, HostReply>;

    /// Fetch whichever model files are missing from the hub.
    fn download_missing_model_from_hf(&self) -> BoxFuture<'_, HostReply>;

    /// Presence of each model file. Not wrapped in a reply: it cannot fail.
    fn get_file_status(&self) -> BoxFuture<'_, FileStatus>;

    fn minimize(&self) -> BoxFuture<'_, ()>;

    fn quit(&self) -> BoxFuture<'_, ()>;
}

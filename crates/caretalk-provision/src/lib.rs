//! The provisioning sequencer: sets up a doctor↔patient messaging thread in
//! the hosted chat backend, in four strictly sequential steps. All state
//! lives backend-side; each step is an idempotent ensure except the final
//! message send, which always appends.

use thiserror::Error;
use tracing::{info, warn};

use caretalk_stream::{ChatBackend, MembershipOutcome, StreamError};
use caretalk_types::{MessageRecord, Platform};

/// The doctor side of every thread this tool provisions.
pub const DOCTOR_ID: &str = "doctor_main";
pub const DOCTOR_NAME: &str = "Doctor Sami";

/// Deterministic channel id for the doctor↔patient thread, so repeat runs
/// always address the same conversation. Must never contain `:`, since the
/// backend reserves it as the `type:id` delimiter.
pub fn channel_id_for(target_user_id: &str) -> String {
    format!("user-{target_user_id}-weight-loss")
}

pub fn channel_name_for(target_user_name: &str) -> String {
    format!("Weight Loss {target_user_name}")
}

/// Inputs for one provisioning run. `device_id` and `platform` arrive as the
/// raw strings the caller supplied; an empty device id or an unrecognized
/// platform skips the device step.
#[derive(Debug, Clone)]
pub struct ProvisionRequest {
    pub target_user_id: String,
    pub target_user_name: String,
    pub message: String,
    pub device_id: String,
    pub platform: String,
}

/// What happened to the optional push-device step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceOutcome {
    /// No device id supplied, or the platform was not recognized.
    Skipped,
    Registered,
    /// Registration failed; the flow continued anyway.
    Failed(String),
}

#[derive(Debug)]
pub struct Summary {
    pub channel_id: String,
    pub member_ids: Vec<String>,
    pub message_id: String,
    pub device: DeviceOutcome,
}

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("invalid request: {0}")]
    Invalid(&'static str),
    #[error("ensuring doctor user failed: {0}")]
    DoctorUser(#[source] StreamError),
    #[error("ensuring target user failed: {0}")]
    TargetUser(#[source] StreamError),
    #[error("ensuring channel failed: {0}")]
    Channel(#[source] StreamError),
    #[error("sending message failed: {0}")]
    Message(#[source] StreamError),
}

/// Runs the four-step flow: ensure doctor, ensure patient (registering a
/// push device best-effort), ensure the shared channel, post the message as
/// the doctor. Device and membership problems degrade to logged warnings;
/// everything else aborts.
pub async fn provision(
    backend: &impl ChatBackend,
    req: &ProvisionRequest,
) -> Result<Summary, ProvisionError> {
    if req.target_user_id.is_empty() {
        return Err(ProvisionError::Invalid("target user id is empty"));
    }
    if req.message.is_empty() {
        return Err(ProvisionError::Invalid("message is empty"));
    }

    let channel_id = channel_id_for(&req.target_user_id);

    info!(doctor_id = DOCTOR_ID, "step 1: ensuring doctor user");
    backend
        .ensure_user(DOCTOR_ID, DOCTOR_NAME)
        .await
        .map_err(ProvisionError::DoctorUser)?;

    info!(user_id = %req.target_user_id, "step 2: ensuring target user");
    backend
        .ensure_user(&req.target_user_id, &req.target_user_name)
        .await
        .map_err(ProvisionError::TargetUser)?;

    let device = register_device_step(backend, req).await;
    if let DeviceOutcome::Failed(reason) = &device {
        warn!(user_id = %req.target_user_id, %reason, "device registration failed, continuing");
    }

    let members = vec![DOCTOR_ID.to_string(), req.target_user_id.clone()];
    info!(channel_id = %channel_id, "step 3: ensuring channel and members");
    let ensured = backend
        .ensure_channel(
            &channel_id,
            &channel_name_for(&req.target_user_name),
            DOCTOR_ID,
            &members,
        )
        .await
        .map_err(ProvisionError::Channel)?;
    if let MembershipOutcome::Warning(reason) = &ensured.membership {
        warn!(channel_id = %channel_id, %reason, "could not add members, they may already exist");
    }

    info!(channel_id = %channel_id, "step 4: sending message as doctor");
    let message = backend
        .post_message(&channel_id, DOCTOR_ID, DOCTOR_NAME, &req.message)
        .await
        .map_err(ProvisionError::Message)?;

    Ok(Summary { channel_id, member_ids: members, message_id: message.id, device })
}

async fn register_device_step(backend: &impl ChatBackend, req: &ProvisionRequest) -> DeviceOutcome {
    if req.device_id.is_empty() {
        return DeviceOutcome::Skipped;
    }
    let Ok(platform) = req.platform.parse::<Platform>() else {
        info!(platform = %req.platform, "unrecognized platform, skipping device registration");
        return DeviceOutcome::Skipped;
    };
    match backend
        .register_device(&req.target_user_id, &req.device_id, platform)
        .await
    {
        Ok(()) => DeviceOutcome::Registered,
        Err(err) => DeviceOutcome::Failed(err.to_string()),
    }
}

/// Posts into the user's thread attributed to the user themselves, creating
/// the thread first if it is missing.
pub async fn post_patient_message(
    backend: &impl ChatBackend,
    target_user_id: &str,
    target_user_name: &str,
    text: &str,
) -> Result<MessageRecord, ProvisionError> {
    if target_user_id.is_empty() {
        return Err(ProvisionError::Invalid("target user id is empty"));
    }
    if text.is_empty() {
        return Err(ProvisionError::Invalid("message is empty"));
    }
    let channel_id = channel_id_for(target_user_id);
    backend
        .post_message(&channel_id, target_user_id, target_user_name, text)
        .await
        .map_err(ProvisionError::Message)
}

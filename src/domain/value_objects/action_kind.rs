use super::Collection;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Remote mutation a queued task performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionKind {
    CreateTimeEntry,
    UploadPhoto,
    UpdateJobStatus,
    CreateMaterialRequest,
    UpdateCustomerNotes,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::CreateTimeEntry => "CREATE_TIME_ENTRY",
            ActionKind::UploadPhoto => "UPLOAD_PHOTO",
            ActionKind::UpdateJobStatus => "UPDATE_JOB_STATUS",
            ActionKind::CreateMaterialRequest => "CREATE_MATERIAL_REQUEST",
            ActionKind::UpdateCustomerNotes => "UPDATE_CUSTOMER_NOTES",
        }
    }

    /// Collection holding the record this action synchronizes.
    pub fn collection(&self) -> Collection {
        match self {
            ActionKind::CreateTimeEntry => Collection::TimeEntries,
            ActionKind::UploadPhoto => Collection::Photos,
            ActionKind::UpdateJobStatus => Collection::Jobs,
            ActionKind::CreateMaterialRequest => Collection::Materials,
            ActionKind::UpdateCustomerNotes => Collection::Customers,
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ActionKind {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "CREATE_TIME_ENTRY" => Ok(ActionKind::CreateTimeEntry),
            "UPLOAD_PHOTO" => Ok(ActionKind::UploadPhoto),
            "UPDATE_JOB_STATUS" => Ok(ActionKind::UpdateJobStatus),
            "CREATE_MATERIAL_REQUEST" => Ok(ActionKind::CreateMaterialRequest),
            "UPDATE_CUSTOMER_NOTES" => Ok(ActionKind::UpdateCustomerNotes),
            other => Err(format!("Unknown action kind: {other}")),
        }
    }
}

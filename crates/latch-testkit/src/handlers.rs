use anyhow::bail;
use latch_kernel::{ActionHandler, ReplayReceipt, ReplayRequest, ValidationError};
use latch_types::{TargetRef, TokenFormat};
use serde::{Deserialize, Serialize};

use crate::directory::{Directory, GROUP_TAG, USER_TAG, User};

pub const EMAIL_CHANGE: &str = "directory.email_change";
pub const CREATE_USER: &str = "directory.create_user";
pub const RENAME_GROUP: &str = "directory.rename_group";
pub const ASSIGN_GROUPS: &str = "directory.assign_groups";

fn require_target<'a>(
    request: &ReplayRequest<'a>,
    type_tag: &str,
) -> Result<&'a TargetRef, ValidationError> {
    let Some(target) = request.target else {
        return Err(ValidationError::invalid("a target reference is required"));
    };
    if target.type_tag != type_tag {
        return Err(ValidationError::invalid(format!(
            "expected a {type_tag} target, got {}",
            target.type_tag
        )));
    }
    Ok(target)
}

fn plausible_email(email: &str) -> bool {
    !email.is_empty() && email.contains('@')
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailChangeParams {
    pub email: String,
}

/// Change an existing user's email address once the user confirms from the
/// new address.
pub struct EmailChangeHandler {
    directory: Directory,
}

impl EmailChangeHandler {
    pub fn new(directory: Directory) -> Self {
        Self { directory }
    }
}

impl ActionHandler for EmailChangeHandler {
    fn kind(&self) -> &str {
        EMAIL_CHANGE
    }

    fn validate(&self, request: &ReplayRequest<'_>) -> Result<(), ValidationError> {
        let target = require_target(request, USER_TAG)?;
        if self.directory.user(&target.id).is_none() {
            return Err(ValidationError::TargetMissing(target.clone()));
        }
        let params: EmailChangeParams = request.payload()?;
        if !plausible_email(&params.email) {
            return Err(ValidationError::invalid("email address is not plausible"));
        }
        Ok(())
    }

    fn commit(&self, request: &ReplayRequest<'_>) -> anyhow::Result<ReplayReceipt> {
        let target = require_target(request, USER_TAG)?;
        let params: EmailChangeParams = request.payload()?;
        if !self
            .directory
            .update_user(&target.id, |user| user.email = params.email.clone())
        {
            bail!("user '{}' vanished before commit", target.id);
        }
        let user = self
            .directory
            .user(&target.id)
            .ok_or_else(|| anyhow::anyhow!("user '{}' vanished after commit", target.id))?;
        Ok(ReplayReceipt::from_value(EMAIL_CHANGE, &user)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateUserParams {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Create a user account once its owner confirms; uses the short uppercase
/// token format so the code can be typed from an SMS.
pub struct CreateUserHandler {
    directory: Directory,
}

impl CreateUserHandler {
    pub fn new(directory: Directory) -> Self {
        Self { directory }
    }
}

impl ActionHandler for CreateUserHandler {
    fn kind(&self) -> &str {
        CREATE_USER
    }

    fn token_format(&self) -> Option<TokenFormat> {
        Some(TokenFormat::SHORT_UPPER)
    }

    fn validate(&self, request: &ReplayRequest<'_>) -> Result<(), ValidationError> {
        let params: CreateUserParams = request.payload()?;
        if params.username.is_empty() {
            return Err(ValidationError::invalid("username must not be empty"));
        }
        if self.directory.username_taken(&params.username) {
            return Err(ValidationError::invalid(format!(
                "username '{}' is already taken",
                params.username
            )));
        }
        if !plausible_email(&params.email) {
            return Err(ValidationError::invalid("email address is not plausible"));
        }
        if params.password.is_empty() {
            return Err(ValidationError::invalid("password must not be empty"));
        }
        Ok(())
    }

    fn commit(&self, request: &ReplayRequest<'_>) -> anyhow::Result<ReplayReceipt> {
        let params: CreateUserParams = request.payload()?;
        let user = User {
            id: params.username.clone(),
            username: params.username,
            email: params.email,
            groups: Vec::new(),
        };
        self.directory.insert_user(user.clone());
        Ok(ReplayReceipt::from_value(CREATE_USER, &user)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameGroupParams {
    pub name: String,
}

/// Rename an existing group; short mixed-case token.
pub struct RenameGroupHandler {
    directory: Directory,
}

impl RenameGroupHandler {
    pub fn new(directory: Directory) -> Self {
        Self { directory }
    }
}

impl ActionHandler for RenameGroupHandler {
    fn kind(&self) -> &str {
        RENAME_GROUP
    }

    fn token_format(&self) -> Option<TokenFormat> {
        Some(TokenFormat::SHORT)
    }

    fn validate(&self, request: &ReplayRequest<'_>) -> Result<(), ValidationError> {
        let target = require_target(request, GROUP_TAG)?;
        if self.directory.group(&target.id).is_none() {
            return Err(ValidationError::TargetMissing(target.clone()));
        }
        let params: RenameGroupParams = request.payload()?;
        if params.name.is_empty() {
            return Err(ValidationError::invalid("group name must not be empty"));
        }
        Ok(())
    }

    fn commit(&self, request: &ReplayRequest<'_>) -> anyhow::Result<ReplayReceipt> {
        let target = require_target(request, GROUP_TAG)?;
        let params: RenameGroupParams = request.payload()?;
        if !self
            .directory
            .update_group(&target.id, |group| group.name = params.name.clone())
        {
            bail!("group '{}' vanished before commit", target.id);
        }
        let group = self
            .directory
            .group(&target.id)
            .ok_or_else(|| anyhow::anyhow!("group '{}' vanished after commit", target.id))?;
        Ok(ReplayReceipt::from_value(RENAME_GROUP, &group)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignGroupsParams {
    pub groups: Vec<String>,
}

/// Replace a user's group memberships. The payload carries multiple object
/// references, which is exactly the shape that makes storing raw (rather
/// than cleaned) input necessary.
pub struct AssignGroupsHandler {
    directory: Directory,
}

impl AssignGroupsHandler {
    pub fn new(directory: Directory) -> Self {
        Self { directory }
    }
}

impl ActionHandler for AssignGroupsHandler {
    fn kind(&self) -> &str {
        ASSIGN_GROUPS
    }

    fn validate(&self, request: &ReplayRequest<'_>) -> Result<(), ValidationError> {
        let target = require_target(request, USER_TAG)?;
        if self.directory.user(&target.id).is_none() {
            return Err(ValidationError::TargetMissing(target.clone()));
        }
        let params: AssignGroupsParams = request.payload()?;
        for group_id in &params.groups {
            if self.directory.group(group_id).is_none() {
                return Err(ValidationError::TargetMissing(crate::directory::group_ref(
                    group_id,
                )));
            }
        }
        Ok(())
    }

    fn commit(&self, request: &ReplayRequest<'_>) -> anyhow::Result<ReplayReceipt> {
        let target = require_target(request, USER_TAG)?;
        let params: AssignGroupsParams = request.payload()?;
        if !self
            .directory
            .update_user(&target.id, |user| user.groups = params.groups.clone())
        {
            bail!("user '{}' vanished before commit", target.id);
        }
        let user = self
            .directory
            .user(&target.id)
            .ok_or_else(|| anyhow::anyhow!("user '{}' vanished after commit", target.id))?;
        Ok(ReplayReceipt::from_value(ASSIGN_GROUPS, &user)?)
    }
}

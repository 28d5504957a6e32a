//! Ownership authorization policy.
//!
//! # Responsibility
//! - Decide allow/deny for every operation the engine performs on content.
//! - Keep the decision pure: no persistence access, no side effects.
//!
//! # Invariants
//! - The rule table enumerates exceptions requiring ownership; any
//!   (type, operation) pair without a rule is allowed by this policy.
//! - Denials are self-describing error values, never booleans.
//! - Auxiliary owners travel inside `AuthorizationContext`, so a caller
//!   cannot forget to resolve them for the types that need them.

use crate::model::item::{ContentType, ItemId};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Operation a requester asks to perform on one content item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
}

impl Display for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
        };
        write!(f, "{label}")
    }
}

/// Per-content-type authorization input.
///
/// Each variant carries exactly the auxiliary ownership data its type's
/// rules consult. Notes are the two-owner case: a note inside a project may
/// be operated on by the note owner or the containing project's owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationContext {
    Project,
    Group,
    Task,
    Note {
        /// Owner of the containing project, resolved by the caller.
        project_owner: String,
    },
    Transaction,
}

impl AuthorizationContext {
    /// Content type this context authorizes.
    pub fn content_type(&self) -> ContentType {
        match self {
            Self::Project => ContentType::Project,
            Self::Group => ContentType::Group,
            Self::Task => ContentType::Task,
            Self::Note { .. } => ContentType::Note,
            Self::Transaction => ContentType::Transaction,
        }
    }

    fn auxiliary_owner(&self) -> Option<&str> {
        match self {
            Self::Note { project_owner } => Some(project_owner.as_str()),
            _ => None,
        }
    }
}

/// Self-describing authorization denial.
///
/// Carries enough context for audit logging by the caller; the policy never
/// needs access to a logger itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnauthorizedError {
    pub content_type: ContentType,
    pub content_id: ItemId,
    pub owner: String,
    pub auxiliary_owner: Option<String>,
    pub requester: String,
    pub operation: Operation,
}

impl Display for UnauthorizedError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.auxiliary_owner {
            Some(auxiliary_owner) => write!(
                f,
                "{} {} is owned by {} and its project is owned by {} while {} request is from {}",
                self.content_type,
                self.content_id,
                self.owner,
                auxiliary_owner,
                self.operation,
                self.requester
            ),
            None => write!(
                f,
                "{} {} is owned by {} while {} request is from {}",
                self.content_type, self.content_id, self.owner, self.operation, self.requester
            ),
        }
    }
}

impl Error for UnauthorizedError {}

/// Decides whether `requester` may perform `operation` on the content item
/// owned by `owner`.
///
/// # Errors
/// Returns `UnauthorizedError` when the rule table denies the operation.
pub fn check_operation(
    owner: &str,
    requester: &str,
    content_id: ItemId,
    operation: Operation,
    context: &AuthorizationContext,
) -> Result<(), UnauthorizedError> {
    let denied = match (context, operation) {
        (AuthorizationContext::Project, Operation::Update | Operation::Delete) => {
            requester != owner
        }
        (AuthorizationContext::Group, Operation::Update | Operation::Delete) => requester != owner,
        (AuthorizationContext::Task, Operation::Update) => requester != owner,
        (
            AuthorizationContext::Note { project_owner },
            Operation::Update | Operation::Delete,
        ) => requester != owner && requester != project_owner,
        _ => false,
    };

    if denied {
        return Err(UnauthorizedError {
            content_type: context.content_type(),
            content_id,
            owner: owner.to_string(),
            auxiliary_owner: context.auxiliary_owner().map(str::to_string),
            requester: requester.to_string(),
            operation,
        });
    }
    Ok(())
}

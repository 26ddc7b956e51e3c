//! Authorization policy.
//!
//! A pure mapping from (actor, action, target) to a decision. It never reads
//! the store; callers resolve the actor and the target entity first.

use finplat_shared::WalletAddress;

use crate::workflow::error::WorkflowError;
use crate::workflow::types::{Transaction, User, UserRole};

/// The identity invoking a command.
#[derive(Debug, Clone, Copy)]
pub struct Actor<'a> {
    /// The connecting wallet.
    pub address: &'a WalletAddress,
    /// The wallet's user record, if it has one.
    pub user: Option<&'a User>,
    /// True when the wallet is the configured platform owner.
    pub is_owner: bool,
}

impl<'a> Actor<'a> {
    /// Builds an actor from a wallet, its optional user record and the owner.
    #[must_use]
    pub fn new(
        address: &'a WalletAddress,
        user: Option<&'a User>,
        owner: Option<&WalletAddress>,
    ) -> Self {
        Self {
            address,
            user,
            is_owner: owner.is_some_and(|owner| owner == address),
        }
    }

    /// The actor's registered user record, if active.
    #[must_use]
    pub fn active_user(&self) -> Option<&'a User> {
        self.user.filter(|u| u.is_active)
    }

    /// Effective role. The owner acts as Admin; disabled users hold no role.
    #[must_use]
    pub fn role(&self) -> Option<UserRole> {
        if self.is_owner {
            return Some(UserRole::Admin);
        }
        self.active_user().map(|u| u.role)
    }

    /// True for Admin authority.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role() == Some(UserRole::Admin)
    }

    /// True for Admin or Manager authority.
    #[must_use]
    pub fn can_approve(&self) -> bool {
        self.role().is_some_and(|r| r.can_approve())
    }
}

/// An action subject to authorization, with its target where one matters.
#[derive(Debug, Clone, Copy)]
pub enum Action<'a> {
    /// Admin registers another wallet with an explicit role.
    RegisterUser,
    /// A wallet registers itself as a Regular user.
    SelfRegister,
    /// Change a user's role.
    UpdateUserRole,
    /// Disable or re-enable a user.
    SetUserActive,
    /// Create a transaction sent from `from`.
    CreateTransaction {
        /// The declared sender.
        from: &'a WalletAddress,
    },
    /// Request approval for a transaction.
    RequestApproval {
        /// The transaction under review.
        transaction: &'a Transaction,
    },
    /// Approve or reject a pending approval.
    ProcessApproval,
    /// Complete an active transaction.
    CompleteTransaction {
        /// The transaction to complete.
        transaction: &'a Transaction,
    },
    /// List every user.
    ListUsers,
    /// List every transaction.
    ListTransactions,
}

impl Action<'_> {
    /// Human-readable name used in error messages and logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::RegisterUser => "register user",
            Self::SelfRegister => "self-register",
            Self::UpdateUserRole => "update user role",
            Self::SetUserActive => "change user status",
            Self::CreateTransaction { .. } => "create transaction",
            Self::RequestApproval { .. } => "request approval",
            Self::ProcessApproval => "process approval",
            Self::CompleteTransaction { .. } => "complete transaction",
            Self::ListUsers => "list all users",
            Self::ListTransactions => "list all transactions",
        }
    }
}

/// Outcome of a policy check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The action may proceed.
    Allow,
    /// The action is refused for the given reason.
    Deny(&'static str),
}

impl Decision {
    /// True if the decision is `Allow`.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

const ADMIN_REQUIRED: &str = "Admin role required";
const APPROVER_REQUIRED: &str = "Admin or Manager role required";
const ACTIVE_USER_REQUIRED: &str = "an active registered user is required";

/// Stateless role- and ownership-based authorization.
pub struct AuthorizationPolicy;

impl AuthorizationPolicy {
    /// Decides whether `actor` may perform `action`.
    ///
    /// Rules:
    /// - RegisterUser, UpdateUserRole, SetUserActive, ListUsers, ListTransactions: Admin
    /// - SelfRegister: any wallet (role is forced to Regular by the caller)
    /// - CreateTransaction: active user sending from their own address
    /// - RequestApproval: Admin or Manager, or the transaction's receiver
    /// - ProcessApproval: Admin or Manager
    /// - CompleteTransaction: the transaction's sender
    #[must_use]
    pub fn can_perform(actor: &Actor<'_>, action: &Action<'_>) -> Decision {
        match action {
            Action::RegisterUser
            | Action::UpdateUserRole
            | Action::SetUserActive
            | Action::ListUsers
            | Action::ListTransactions => allow_if(actor.is_admin(), ADMIN_REQUIRED),

            Action::SelfRegister => Decision::Allow,

            Action::CreateTransaction { from } => {
                if actor.active_user().is_none() {
                    Decision::Deny(ACTIVE_USER_REQUIRED)
                } else {
                    allow_if(
                        *from == actor.address,
                        "transactions can only be sent from your own address",
                    )
                }
            }

            Action::RequestApproval { transaction } => {
                if actor.can_approve() {
                    return Decision::Allow;
                }
                let is_receiver =
                    actor.active_user().is_some() && transaction.to == *actor.address;
                allow_if(
                    is_receiver,
                    "only the receiver, a Manager or an Admin can request approval",
                )
            }

            Action::ProcessApproval => allow_if(actor.can_approve(), APPROVER_REQUIRED),

            Action::CompleteTransaction { transaction } => {
                let is_sender = actor.active_user().is_some() && transaction.from == *actor.address;
                allow_if(is_sender, "only the sender can complete a transaction")
            }
        }
    }

    /// Like [`Self::can_perform`], but turns a denial into an error.
    pub fn authorize(actor: &Actor<'_>, action: &Action<'_>) -> Result<(), WorkflowError> {
        match Self::can_perform(actor, action) {
            Decision::Allow => Ok(()),
            Decision::Deny(reason) => Err(WorkflowError::Unauthorized {
                action: action.name(),
                reason,
            }),
        }
    }
}

fn allow_if(condition: bool, reason: &'static str) -> Decision {
    if condition {
        Decision::Allow
    } else {
        Decision::Deny(reason)
    }
}

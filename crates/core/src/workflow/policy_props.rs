//! Property-based tests for AuthorizationPolicy.

use chrono::Utc;
use finplat_shared::{TransactionId, UserId, WalletAddress};
use proptest::prelude::*;

use crate::workflow::policy::{Action, Actor, AuthorizationPolicy, Decision};
use crate::workflow::types::{Transaction, TransactionStatus, User, UserRole};

const SENDER: &str = "0x70997970c51812dc3a010c7d01b50e0d17dc79c8";
const RECEIVER: &str = "0x3c44cdddb6a900fa2b585dd299e03d12fa4293bc";

fn arb_role() -> impl Strategy<Value = UserRole> {
    prop_oneof![
        Just(UserRole::Regular),
        Just(UserRole::Manager),
        Just(UserRole::Admin),
    ]
}

fn arb_address() -> impl Strategy<Value = WalletAddress> {
    "[0-9a-f]{40}".prop_map(|hex| WalletAddress::parse(&format!("0x{hex}")).unwrap())
}

fn user(address: &WalletAddress, role: UserRole, is_active: bool) -> User {
    User {
        id: UserId::FIRST,
        wallet_address: address.clone(),
        name: "User".to_string(),
        email: "user@company.com".to_string(),
        role,
        is_active,
        created_at: Utc::now(),
    }
}

fn transaction() -> Transaction {
    Transaction {
        id: TransactionId::FIRST,
        from: WalletAddress::parse(SENDER).unwrap(),
        to: WalletAddress::parse(RECEIVER).unwrap(),
        amount: 1,
        description: "x".to_string(),
        status: TransactionStatus::Pending,
        approval_id: None,
        timestamp: Utc::now(),
        completed_at: None,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Self-registration is never denied by the policy; duplicates are the
    /// store's concern.
    #[test]
    fn prop_self_register_always_allowed(
        address in arb_address(),
        role in arb_role(),
        is_active in any::<bool>(),
        registered in any::<bool>(),
    ) {
        let record = user(&address, role, is_active);
        let actor = Actor::new(&address, registered.then_some(&record), None);
        prop_assert_eq!(AuthorizationPolicy::can_perform(&actor, &Action::SelfRegister), Decision::Allow);
    }

    /// Regular users never process approvals, whatever else is true.
    #[test]
    fn prop_regular_never_processes(address in arb_address(), is_active in any::<bool>()) {
        let record = user(&address, UserRole::Regular, is_active);
        let actor = Actor::new(&address, Some(&record), None);
        prop_assert!(!AuthorizationPolicy::can_perform(&actor, &Action::ProcessApproval).is_allowed());
    }

    /// Disabled users hold no authority for any mutating action.
    #[test]
    fn prop_inactive_users_have_no_authority(role in arb_role()) {
        let tx = transaction();
        for address in [&tx.from, &tx.to] {
            let record = user(address, role, false);
            let actor = Actor::new(address, Some(&record), None);
            for action in [
                Action::RegisterUser,
                Action::UpdateUserRole,
                Action::SetUserActive,
                Action::CreateTransaction { from: address },
                Action::RequestApproval { transaction: &tx },
                Action::ProcessApproval,
                Action::CompleteTransaction { transaction: &tx },
                Action::ListUsers,
                Action::ListTransactions,
            ] {
                prop_assert!(
                    !AuthorizationPolicy::can_perform(&actor, &action).is_allowed(),
                    "{} allowed for inactive {}",
                    action.name(),
                    role
                );
            }
        }
    }

    /// The owner is an admin with or without a user record.
    #[test]
    fn prop_owner_is_admin(owner in arb_address(), role in arb_role(), registered in any::<bool>()) {
        let record = user(&owner, role, true);
        let actor = Actor::new(&owner, registered.then_some(&record), Some(&owner));
        prop_assert!(actor.is_admin());
        prop_assert!(AuthorizationPolicy::can_perform(&actor, &Action::UpdateUserRole).is_allowed());
    }

    /// Nobody creates a transaction on someone else's behalf.
    #[test]
    fn prop_create_requires_own_address(
        actor_address in arb_address(),
        from in arb_address(),
        role in arb_role(),
    ) {
        prop_assume!(actor_address != from);
        let record = user(&actor_address, role, true);
        let actor = Actor::new(&actor_address, Some(&record), Some(&actor_address));
        let decision =
            AuthorizationPolicy::can_perform(&actor, &Action::CreateTransaction { from: &from });
        prop_assert!(!decision.is_allowed());
    }
}

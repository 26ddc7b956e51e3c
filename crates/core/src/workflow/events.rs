//! Workflow events and the in-process event bus.
//!
//! Events are stamped with a gapless sequence number when published. The
//! live feed is a `tokio::sync::broadcast` channel; a bounded history lets a
//! lagging subscriber catch up with [`EventBus::since`].

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use finplat_shared::{Amount, ApprovalId, TransactionId, UserId, WalletAddress};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::workflow::types::{ApprovalStatus, TransactionStatus, UserRole};

/// A committed state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WorkflowEvent {
    /// A user record was created.
    UserRegistered {
        /// The new user's id.
        user_id: UserId,
        /// The affected wallet.
        wallet_address: WalletAddress,
        /// Role at registration.
        role: UserRole,
    },
    /// A user's role changed.
    UserRoleUpdated {
        /// The affected wallet.
        wallet_address: WalletAddress,
        /// Role before the change.
        old_role: UserRole,
        /// Role after the change.
        new_role: UserRole,
    },
    /// A user was disabled or re-enabled.
    UserStatusUpdated {
        /// The affected wallet.
        wallet_address: WalletAddress,
        /// New active flag.
        is_active: bool,
    },
    /// A transaction was created in Pending.
    TransactionCreated {
        /// The transaction.
        transaction_id: TransactionId,
        /// Sender.
        from: WalletAddress,
        /// Receiver.
        to: WalletAddress,
        /// Amount in the smallest currency unit.
        #[serde(with = "finplat_shared::types::amount")]
        amount: Amount,
    },
    /// A transaction changed status.
    TransactionStatusUpdated {
        /// The transaction.
        transaction_id: TransactionId,
        /// Status before.
        old_status: TransactionStatus,
        /// Status after.
        new_status: TransactionStatus,
    },
    /// An approval was requested and linked.
    ApprovalRequested {
        /// The approval.
        approval_id: ApprovalId,
        /// The transaction.
        transaction_id: TransactionId,
        /// Who asked for approval.
        requester: WalletAddress,
    },
    /// An approval was decided.
    ApprovalProcessed {
        /// The approval.
        approval_id: ApprovalId,
        /// The transaction.
        transaction_id: TransactionId,
        /// Who decided.
        approver: WalletAddress,
        /// Approved or Rejected.
        status: ApprovalStatus,
    },
}

impl WorkflowEvent {
    /// The event's type name, as serialized in the `type` tag.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::UserRegistered { .. } => "UserRegistered",
            Self::UserRoleUpdated { .. } => "UserRoleUpdated",
            Self::UserStatusUpdated { .. } => "UserStatusUpdated",
            Self::TransactionCreated { .. } => "TransactionCreated",
            Self::TransactionStatusUpdated { .. } => "TransactionStatusUpdated",
            Self::ApprovalRequested { .. } => "ApprovalRequested",
            Self::ApprovalProcessed { .. } => "ApprovalProcessed",
        }
    }
}

/// An event as delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Position in the global event order, starting at 1.
    pub sequence: u64,
    /// Commit time.
    pub emitted_at: DateTime<Utc>,
    /// The event itself.
    pub event: WorkflowEvent,
}

/// Retained events after a given sequence, read in one pass over the history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventReplay {
    /// Retained events after the requested sequence, in order.
    pub events: Vec<EventEnvelope>,
    /// Sequence number of the newest published event.
    pub last_sequence: u64,
    /// Sequence number of the oldest retained event, if any are retained.
    pub oldest_retained: Option<u64>,
    /// True when events after the requested sequence were evicted and are
    /// missing from `events`.
    pub truncated: bool,
}

#[derive(Debug)]
struct History {
    entries: VecDeque<EventEnvelope>,
    capacity: usize,
    last_sequence: u64,
}

/// Publish/subscribe channel for workflow events.
#[derive(Debug)]
pub struct EventBus {
    sender: broadcast::Sender<EventEnvelope>,
    history: Mutex<History>,
}

impl EventBus {
    /// Creates a bus whose first event gets sequence `last_sequence + 1`.
    #[must_use]
    pub fn new(channel_capacity: usize, history_capacity: usize, last_sequence: u64) -> Self {
        let (sender, _) = broadcast::channel(channel_capacity.max(1));
        Self {
            sender,
            history: Mutex::new(History {
                entries: VecDeque::with_capacity(history_capacity.min(1024)),
                capacity: history_capacity,
                last_sequence,
            }),
        }
    }

    /// Stamps and publishes events in order, returning the envelopes.
    ///
    /// Publishing never blocks. Having no subscribers is not an error.
    pub fn publish(&self, events: Vec<WorkflowEvent>) -> Vec<EventEnvelope> {
        let mut history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
        let emitted_at = Utc::now();

        events
            .into_iter()
            .map(|event| {
                history.last_sequence += 1;
                let envelope = EventEnvelope {
                    sequence: history.last_sequence,
                    emitted_at,
                    event,
                };
                if history.capacity > 0 {
                    if history.entries.len() == history.capacity {
                        history.entries.pop_front();
                    }
                    history.entries.push_back(envelope.clone());
                }
                let _ = self.sender.send(envelope.clone());
                envelope
            })
            .collect()
    }

    /// Subscribes to events published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.sender.subscribe()
    }

    /// Retained events with a sequence number greater than `sequence`.
    #[must_use]
    pub fn since(&self, sequence: u64) -> Vec<EventEnvelope> {
        let history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
        history
            .entries
            .iter()
            .filter(|e| e.sequence > sequence)
            .cloned()
            .collect()
    }

    /// Retained events after `sequence`, with the newest sequence and a flag
    /// telling whether part of the requested range was already evicted.
    #[must_use]
    pub fn replay(&self, sequence: u64) -> EventReplay {
        let history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
        let oldest_retained = history.entries.front().map(|e| e.sequence);
        let first_wanted = sequence.saturating_add(1);
        let truncated = match oldest_retained {
            Some(oldest) => first_wanted < oldest,
            None => sequence < history.last_sequence,
        };
        EventReplay {
            events: history
                .entries
                .iter()
                .filter(|e| e.sequence > sequence)
                .cloned()
                .collect(),
            last_sequence: history.last_sequence,
            oldest_retained,
            truncated,
        }
    }

    /// Sequence number of the most recent event, 0 if none.
    #[must_use]
    pub fn last_sequence(&self) -> u64 {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last_sequence
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_event(id: u64) -> WorkflowEvent {
        WorkflowEvent::TransactionStatusUpdated {
            transaction_id: TransactionId::new(id).unwrap(),
            old_status: TransactionStatus::Pending,
            new_status: TransactionStatus::Active,
        }
    }

    #[test]
    fn test_sequence_is_gapless() {
        let bus = EventBus::new(16, 16, 0);
        let first = bus.publish(vec![status_event(1), status_event(2)]);
        let second = bus.publish(vec![status_event(3)]);

        let sequences: Vec<u64> = first.iter().chain(&second).map(|e| e.sequence).collect();
        assert_eq!(sequences, vec![1, 2, 3]);
        assert_eq!(bus.last_sequence(), 3);
    }

    #[test]
    fn test_resumes_after_restored_sequence() {
        let bus = EventBus::new(16, 16, 41);
        let published = bus.publish(vec![status_event(1)]);
        assert_eq!(published[0].sequence, 42);
    }

    #[test]
    fn test_since_replays_and_history_is_bounded() {
        let bus = EventBus::new(16, 2, 0);
        bus.publish((1..=3).map(status_event).collect());

        let replay: Vec<u64> = bus.since(0).iter().map(|e| e.sequence).collect();
        assert_eq!(replay, vec![2, 3]);
        assert_eq!(bus.since(2).len(), 1);
        assert!(bus.since(3).is_empty());
    }

    #[test]
    fn test_replay_flags_evicted_range() {
        let bus = EventBus::new(16, 2, 0);
        bus.publish((1..=5).map(status_event).collect());

        let replay = bus.replay(1);
        assert!(replay.truncated);
        assert_eq!(replay.oldest_retained, Some(4));
        assert_eq!(replay.last_sequence, 5);
        assert_eq!(replay.events.len(), 2);

        let replay = bus.replay(3);
        assert!(!replay.truncated);
        assert_eq!(replay.events.len(), 2);

        let replay = bus.replay(5);
        assert!(!replay.truncated);
        assert!(replay.events.is_empty());
    }

    #[test]
    fn test_replay_without_history_is_truncated_once_events_exist() {
        let bus = EventBus::new(16, 0, 0);
        assert!(!bus.replay(0).truncated);

        bus.publish(vec![status_event(1)]);
        let replay = bus.replay(0);
        assert!(replay.truncated);
        assert_eq!(replay.oldest_retained, None);
        assert!(!bus.replay(1).truncated);
    }

    #[tokio::test]
    async fn test_subscriber_receives_in_order() {
        let bus = EventBus::new(16, 16, 0);
        let mut rx = bus.subscribe();
        bus.publish(vec![status_event(1), status_event(2)]);

        assert_eq!(rx.recv().await.unwrap().sequence, 1);
        assert_eq!(rx.recv().await.unwrap().sequence, 2);
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::new(1, 0, 0);
        let published = bus.publish(vec![status_event(1)]);
        assert_eq!(published.len(), 1);
        assert!(bus.since(0).is_empty());
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let json = serde_json::to_value(WorkflowEvent::TransactionCreated {
            transaction_id: TransactionId::FIRST,
            from: WalletAddress::parse("0x70997970c51812dc3a010c7d01b50e0d17dc79c8").unwrap(),
            to: WalletAddress::parse("0x3c44cdddb6a900fa2b585dd299e03d12fa4293bc").unwrap(),
            amount: 1000,
        })
        .unwrap();
        assert_eq!(json["type"], "TransactionCreated");
        assert_eq!(json["amount"], "1000");
        assert_eq!(json["transaction_id"], 1);
    }
}

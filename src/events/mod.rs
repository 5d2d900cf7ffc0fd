use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Channel capacity for the in-process event queue.
pub const EVENT_CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event after the surrounding transaction has already committed.
    /// A full or closed channel must never surface as an error to the caller,
    /// so failures are logged and swallowed.
    pub async fn send_post_commit(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!("Dropping post-commit event: {}", e);
        }
    }
}

/// Creates the event channel and a sender wired to it.
pub fn event_channel() -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    (EventSender::new(tx), rx)
}

// The events the system can emit. Every variant carries enough context to be
// logged meaningfully without a database round trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Inventory item lifecycle
    ItemCreated(Uuid),
    ItemUpdated(Uuid),
    ItemDeleted(Uuid),

    // Stock ledger events
    StockAdded {
        item_id: Uuid,
        quantity: i32,
        new_quantity: i32,
    },
    StockRemoved {
        item_id: Uuid,
        quantity: i32,
        new_quantity: i32,
    },
    StockAdjusted {
        item_id: Uuid,
        delta: i32,
        new_quantity: i32,
    },
    PriceChanged {
        item_id: Uuid,
        old_price: Decimal,
        new_price: Decimal,
    },

    // Category events
    CategoryCreated(Uuid),
    CategoryUpdated(Uuid),
    CategoryDeleted(Uuid),

    // Sales events
    SaleCreated {
        sale_id: Uuid,
        total: Decimal,
    },
    SaleCancelled(Uuid),
    SaleRefunded {
        sale_id: Uuid,
        refund_amount: Decimal,
    },

    // Identity events
    UserSynced(Uuid),
    RoleAssigned {
        user_id: Uuid,
        role: String,
    },
}

// Drains the event channel and logs each event. Runs as a background task for
// the lifetime of the server; when the last sender drops the loop ends.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match event {
            Event::StockAdded {
                item_id,
                quantity,
                new_quantity,
            } => {
                info!(
                    "Stock added: item={}, quantity={}, new_total={}",
                    item_id, quantity, new_quantity
                );
            }
            Event::StockRemoved {
                item_id,
                quantity,
                new_quantity,
            } => {
                info!(
                    "Stock removed: item={}, quantity={}, new_total={}",
                    item_id, quantity, new_quantity
                );
                if new_quantity == 0 {
                    warn!("Item {} is now out of stock", item_id);
                }
            }
            Event::StockAdjusted {
                item_id,
                delta,
                new_quantity,
            } => {
                info!(
                    "Stock adjusted: item={}, delta={}, new_total={}",
                    item_id, delta, new_quantity
                );
            }
            Event::PriceChanged {
                item_id,
                old_price,
                new_price,
            } => {
                info!(
                    "Price changed: item={}, old={}, new={}",
                    item_id, old_price, new_price
                );
            }
            Event::SaleCreated { sale_id, total } => {
                info!("Sale created: sale={}, total={}", sale_id, total);
            }
            Event::SaleCancelled(sale_id) => {
                info!("Sale cancelled: {}", sale_id);
            }
            Event::SaleRefunded {
                sale_id,
                refund_amount,
            } => {
                info!("Sale refunded: sale={}, amount={}", sale_id, refund_amount);
            }
            Event::RoleAssigned { user_id, role } => {
                info!("Role assigned: user={}, role={}", user_id, role);
            }
            other => {
                info!("Event: {:?}", other);
            }
        }
    }

    warn!("Event processing loop has ended");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_delivers_to_receiver() {
        let (sender, mut rx) = event_channel();
        let id = Uuid::new_v4();
        sender.send(Event::ItemCreated(id)).await.unwrap();

        match rx.recv().await {
            Some(Event::ItemCreated(got)) => assert_eq!(got, id),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn send_post_commit_never_errors_on_closed_channel() {
        let (sender, rx) = event_channel();
        drop(rx);
        // Must not panic or surface the failure.
        sender.send_post_commit(Event::ItemDeleted(Uuid::new_v4())).await;
    }
}

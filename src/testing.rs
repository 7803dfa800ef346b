//! Shared fixtures: four users, four items, one order per user.

use std::sync::Arc;

use crate::graph::{Entity, NodeRef, Record, Value};
use crate::store::{EdgeStore, MemoryBackend};

/// (user id, item id) for every order line.
pub const PURCHASES: &[(u32, u32)] = &[
    (1, 1),
    (1, 4),
    (2, 1),
    (2, 2),
    (2, 4),
    (3, 1),
    (3, 3),
    (4, 3),
];

pub fn user(id: u32) -> Value {
    Record::new("User", id).with("name", format!("user-{}", id)).into_value()
}

pub fn item(id: u32) -> Value {
    Record::new("Item", id).into_value()
}

/// Order lines as entities: `order.user` and `item` are reachable members.
pub fn order_items() -> Vec<Arc<dyn Entity>> {
    PURCHASES
        .iter()
        .enumerate()
        .map(|(n, &(user_id, item_id))| {
            let order = Record::new("Order", user_id).with("user", user(user_id));
            let line = Record::new("OrderItem", n + 1)
                .with("order", order.into_value())
                .with("item", item(item_id))
                .with("user", user(user_id));
            Arc::new(line) as Arc<dyn Entity>
        })
        .collect()
}

/// In-memory edge store holding `User --Purchased--> Item` for [`PURCHASES`].
pub async fn purchase_store() -> EdgeStore {
    let store = EdgeStore::new(Arc::new(MemoryBackend::new()));
    for &(user_id, item_id) in PURCHASES {
        store
            .put(
                &NodeRef::new("User", &user_id.to_string()),
                "Purchased",
                &NodeRef::new("Item", &item_id.to_string()),
            )
            .await
            .unwrap();
    }
    store
}

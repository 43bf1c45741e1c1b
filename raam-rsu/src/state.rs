use parking_lot::Mutex;
use std::sync::Arc;

use crate::models::NodeStatus;

pub type Shared<T> = Arc<Mutex<T>>;

/// Snapshot partagé entre le pipeline (seul écrivain) et l'exporteur de
/// statut (lecteurs). `None` = aucun rapport reçu depuis le démarrage.
pub type SharedStatus = Shared<Option<NodeStatus>>;

pub fn new_state<T>(value: T) -> Shared<T> {
    Arc::new(Mutex::new(value))
}

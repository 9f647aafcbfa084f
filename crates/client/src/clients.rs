//! Window clients controlled by the worker.
//!
//! `Clients` is what the worker needs from open pages: listing, claiming,
//! focusing, messaging and opening a new window. `ClientRegistry` keeps them
//! in memory for the host process.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;
use url::Url;

/// An open page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WindowClient {
    pub id: String,
    pub url: Url,
    pub focused: bool,
    /// Whether this worker controls the page.
    pub controlled: bool,
}

#[async_trait::async_trait]
pub trait Clients: Send + Sync {
    /// Every window, controlled or not, in the order they were opened.
    async fn match_all(&self) -> Vec<WindowClient>;

    /// Take control of every window. Returns how many changed hands.
    async fn claim(&self) -> usize;

    /// Focus one window, unfocusing the rest.
    async fn focus(&self, id: &str) -> Option<WindowClient>;

    /// Deliver a message to a window. Returns false if it is gone.
    async fn post_message(&self, id: &str, message: Value) -> bool;

    /// Open and focus a new window.
    async fn open_window(&self, url: Url) -> WindowClient;
}

struct Slot {
    client: WindowClient,
    inbox: Vec<Value>,
}

/// In-memory window registry.
#[derive(Clone, Default)]
pub struct ClientRegistry {
    slots: Arc<RwLock<Vec<Slot>>>,
    next_id: Arc<AtomicU64>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a page that was opened outside the worker, uncontrolled.
    pub async fn register(&self, url: Url) -> WindowClient {
        self.insert(url, false).await
    }

    /// Drain the messages posted to a window. `None` if it is gone.
    pub async fn take_messages(&self, id: &str) -> Option<Vec<Value>> {
        let mut slots = self.slots.write().await;
        slots
            .iter_mut()
            .find(|s| s.client.id == id)
            .map(|s| std::mem::take(&mut s.inbox))
    }

    /// Forget a closed window.
    pub async fn close(&self, id: &str) -> bool {
        let mut slots = self.slots.write().await;
        let before = slots.len();
        slots.retain(|s| s.client.id != id);
        slots.len() != before
    }

    async fn insert(&self, url: Url, focused: bool) -> WindowClient {
        let id = format!("client-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let client = WindowClient { id, url, focused, controlled: false };

        let mut slots = self.slots.write().await;
        if focused {
            for slot in slots.iter_mut() {
                slot.client.focused = false;
            }
        }
        slots.push(Slot { client: client.clone(), inbox: Vec::new() });
        client
    }
}

#[async_trait::async_trait]
impl Clients for ClientRegistry {
    async fn match_all(&self) -> Vec<WindowClient> {
        self.slots.read().await.iter().map(|s| s.client.clone()).collect()
    }

    async fn claim(&self) -> usize {
        let mut slots = self.slots.write().await;
        let mut claimed = 0;
        for slot in slots.iter_mut().filter(|s| !s.client.controlled) {
            slot.client.controlled = true;
            claimed += 1;
        }
        claimed
    }

    async fn focus(&self, id: &str) -> Option<WindowClient> {
        let mut slots = self.slots.write().await;
        if !slots.iter().any(|s| s.client.id == id) {
            return None;
        }

        let mut focused = None;
        for slot in slots.iter_mut() {
            slot.client.focused = slot.client.id == id;
            if slot.client.focused {
                focused = Some(slot.client.clone());
            }
        }
        focused
    }

    async fn post_message(&self, id: &str, message: Value) -> bool {
        let mut slots = self.slots.write().await;
        match slots.iter_mut().find(|s| s.client.id == id) {
            Some(slot) => {
                slot.inbox.push(message);
                true
            }
            None => false,
        }
    }

    async fn open_window(&self, url: Url) -> WindowClient {
        let mut client = self.insert(url, true).await;
        // windows opened by the worker start out controlled
        let mut slots = self.slots.write().await;
        if let Some(slot) = slots.iter_mut().find(|s| s.client.id == client.id) {
            slot.client.controlled = true;
            client.controlled = true;
        }
        client
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_register_and_match_all() {
        let registry = ClientRegistry::new();
        let a = registry.register(url("https://gameshelf.example/gameshelf.html")).await;
        let b = registry.register(url("https://gameshelf.example/")).await;

        let all = registry.match_all().await;
        assert_eq!(all, vec![a, b]);
        assert!(all.iter().all(|c| !c.controlled));
    }

    #[tokio::test]
    async fn test_claim_counts_new_clients_only() {
        let registry = ClientRegistry::new();
        registry.register(url("https://gameshelf.example/")).await;
        registry.register(url("https://gameshelf.example/?tab=social")).await;

        assert_eq!(registry.claim().await, 2);
        assert_eq!(registry.claim().await, 0);
        assert!(registry.match_all().await.iter().all(|c| c.controlled));
    }

    #[tokio::test]
    async fn test_focus_is_exclusive() {
        let registry = ClientRegistry::new();
        let a = registry.register(url("https://gameshelf.example/a")).await;
        let b = registry.register(url("https://gameshelf.example/b")).await;

        registry.focus(&a.id).await.unwrap();
        let focused = registry.focus(&b.id).await.unwrap();
        assert!(focused.focused);

        let all = registry.match_all().await;
        assert!(!all[0].focused);
        assert!(all[1].focused);
        assert!(registry.focus("client-99").await.is_none());
    }

    #[tokio::test]
    async fn test_post_and_take_messages() {
        let registry = ClientRegistry::new();
        let a = registry.register(url("https://gameshelf.example/")).await;

        assert!(registry.post_message(&a.id, json!({"type": "ping"})).await);
        assert!(!registry.post_message("client-404", json!({})).await);

        assert_eq!(registry.take_messages(&a.id).await.unwrap(), vec![json!({"type": "ping"})]);
        assert!(registry.take_messages(&a.id).await.unwrap().is_empty());
        assert!(registry.take_messages("client-404").await.is_none());
    }

    #[tokio::test]
    async fn test_open_window_is_focused_and_controlled() {
        let registry = ClientRegistry::new();
        let existing = registry.register(url("https://gameshelf.example/")).await;
        registry.focus(&existing.id).await;

        let opened = registry.open_window(url("https://gameshelf.example/?action=log")).await;
        assert!(opened.focused);
        assert!(opened.controlled);

        let all = registry.match_all().await;
        assert!(!all[0].focused);
        assert!(registry.close(&existing.id).await);
        assert_eq!(registry.match_all().await.len(), 1);
    }
}

use std::sync::Arc;

use tokio::sync::RwLock;

/// Credential shared by every request that talks to one provider.
///
/// Holds either a long-lived API key or a session token. Cloning yields a
/// handle to the same slot. Writers replace the whole value under the write
/// lock, so readers see either the old or the new credential.
#[derive(Clone, Default)]
pub struct CredentialStore {
    inner: Arc<RwLock<Option<String>>>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current credential, if one has been stored.
    pub async fn get(&self) -> Option<String> {
        self.inner.read().await.clone()
    }

    pub async fn set(&self, credential: String) {
        *self.inner.write().await = Some(credential);
    }

    pub async fn is_set(&self) -> bool {
        self.inner.read().await.is_some()
    }
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn clones_share_the_same_slot() {
        let store = CredentialStore::new();
        let handle = store.clone();
        assert!(!handle.is_set().await);

        store.set("token-1".into()).await;
        assert_eq!(handle.get().await.as_deref(), Some("token-1"));

        handle.set("token-2".into()).await;
        assert_eq!(store.get().await.as_deref(), Some("token-2"));
    }

    #[tokio::test]
    async fn concurrent_readers_never_see_partial_values() {
        let store = CredentialStore::new();
        store.set("a".repeat(64)).await;

        let writer = {
            let store = store.clone();
            tokio::spawn(async move {
                for i in 0..100 {
                    let c = if i % 2 == 0 { 'b' } else { 'a' };
                    store.set(c.to_string().repeat(64)).await;
                }
            })
        };

        for _ in 0..100 {
            let value = store.get().await.unwrap();
            assert_eq!(value.len(), 64);
            let first = value.chars().next().unwrap();
            assert!(value.chars().all(|c| c == first));
        }
        writer.await.unwrap();
    }
}

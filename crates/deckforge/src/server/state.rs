//! State shared by every request handler.

use deckforge_core::{DeckGenerator, PresentationArtifact};
use tokio::sync::RwLock;

/// The generator plus the one piece of cross-request state: the most
/// recently written presentation.
pub struct AppState {
    pub generator: DeckGenerator,
    last: RwLock<Option<PresentationArtifact>>,
}

impl AppState {
    pub fn new(generator: DeckGenerator) -> Self {
        Self {
            generator,
            last: RwLock::new(None),
        }
    }

    pub async fn last_artifact(&self) -> Option<PresentationArtifact> {
        self.last.read().await.clone()
    }

    pub async fn set_last_artifact(&self, artifact: PresentationArtifact) {
        *self.last.write().await = Some(artifact);
    }
}

//! Automation engine seam.
//!
//! Everything above this module talks to the application under test through
//! [`AutomationEngine`]. Two implementations exist:
//!
//! - [`MockEngine`]: in-memory DOM used by unit and integration tests
//! - `CdpEngine`: Chromium over the DevTools protocol (`browser` feature)
//!
//! Handles returned by [`AutomationEngine::query_all`] are only valid until the
//! next state-changing call; acting on a node that has left the document
//! yields [`E2eError::Detached`](crate::result::E2eError::Detached).

#[cfg(feature = "browser")]
pub mod cdp;
pub mod mock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::result::E2eResult;
use crate::selector::Selector;

#[cfg(feature = "browser")]
pub use cdp::{CdpEngine, CdpEngineFactory, CdpOptions};
pub use mock::{ActionKind, MockDom, MockElement, MockEngine, MockEngineFactory};

/// Opaque reference to one node matched by a selector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementHandle {
    /// Engine-specific identifier
    pub id: String,
    /// Selector the node was matched through
    pub selector: Selector,
    /// Position among that selector's matches, in document order
    pub index: usize,
}

impl ElementHandle {
    /// Create a new element handle
    #[must_use]
    pub fn new(id: impl Into<String>, selector: Selector, index: usize) -> Self {
        Self {
            id: id.into(),
            selector,
            index,
        }
    }
}

impl fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.selector, self.index)
    }
}

/// PNG screenshot of the current page
#[derive(Debug, Clone)]
pub struct Screenshot {
    /// Raw PNG data
    pub data: Vec<u8>,
    /// Capture time
    pub taken_at: chrono::DateTime<chrono::Utc>,
}

impl Screenshot {
    /// Wrap PNG bytes captured now
    #[must_use]
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            taken_at: chrono::Utc::now(),
        }
    }

    /// Write the PNG to `path`
    pub async fn save(&self, path: &Path) -> E2eResult<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, &self.data).await?;
        Ok(())
    }
}

/// Browser automation primitives consumed by the resolver and action layer
///
/// Query methods (`query_all`, `is_visible`, `text_content`, `attribute`,
/// `input_value`, `current_url`, `get_local_storage`, `screenshot`) never
/// change application state.
#[async_trait]
pub trait AutomationEngine: Send + Sync + fmt::Debug {
    /// Navigate to an absolute URL
    async fn navigate(&self, url: &str) -> E2eResult<()>;

    /// Current page URL
    async fn current_url(&self) -> E2eResult<String>;

    /// Reload the current page
    async fn reload(&self) -> E2eResult<()>;

    /// Every node matching `selector`, in document order, visible or not
    async fn query_all(&self, selector: &Selector) -> E2eResult<Vec<ElementHandle>>;

    /// Attached, rendered and with a non-empty box
    async fn is_visible(&self, element: &ElementHandle) -> E2eResult<bool>;

    /// Text content of the node
    async fn text_content(&self, element: &ElementHandle) -> E2eResult<String>;

    /// Attribute value, `None` when absent
    async fn attribute(&self, element: &ElementHandle, name: &str) -> E2eResult<Option<String>>;

    /// Current value of an input or textarea
    async fn input_value(&self, element: &ElementHandle) -> E2eResult<String>;

    /// Click the node
    async fn click(&self, element: &ElementHandle) -> E2eResult<()>;

    /// Replace the node's value with `text`
    async fn fill(&self, element: &ElementHandle, text: &str) -> E2eResult<()>;

    /// Press a key (e.g. `Enter`, `Escape`) with the node focused
    async fn press(&self, element: &ElementHandle, key: &str) -> E2eResult<()>;

    /// Move the pointer over the node
    async fn hover(&self, element: &ElementHandle) -> E2eResult<()>;

    /// Attach files to a file input
    async fn set_input_files(&self, element: &ElementHandle, files: &[PathBuf]) -> E2eResult<()>;

    /// Write a localStorage entry for the current origin
    async fn set_local_storage(&self, key: &str, value: &str) -> E2eResult<()>;

    /// Read a localStorage entry for the current origin
    async fn get_local_storage(&self, key: &str) -> E2eResult<Option<String>>;

    /// Capture the viewport as PNG
    async fn screenshot(&self) -> E2eResult<Screenshot>;

    /// Release the context; further calls may fail
    async fn close(&self) -> E2eResult<()> {
        Ok(())
    }
}

/// Creates one isolated engine context per scenario attempt
#[async_trait]
pub trait EngineFactory: Send + Sync + fmt::Debug {
    /// Fresh context with empty storage
    async fn new_context(&self) -> E2eResult<Arc<dyn AutomationEngine>>;

    /// Shut down whatever the factory launched
    async fn shutdown(&self) -> E2eResult<()> {
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_display() {
        let h = ElementHandle::new("mock-3", Selector::css("li.msg"), 2);
        assert_eq!(h.to_string(), "li.msg[2]");
    }

    #[tokio::test]
    async fn test_screenshot_save_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("shot.png");
        Screenshot::new(vec![1, 2, 3]).save(&path).await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), vec![1, 2, 3]);
    }
}

//! Installed extensions and the feed that announces changes to them.

use std::collections::HashMap;
use std::fmt;

use tokio::sync::watch;

use crate::types::{SourceId, SourceInfo};

use super::variant::Source;

/// An installed extension package and the sources it contributes.
#[derive(Debug, Clone)]
pub struct Extension {
    pub pkg_name: String,
    pub name: String,
    pub version_name: String,
    pub lang: String,
    pub sources: Vec<Source>,
}

impl Extension {
    pub fn new(pkg_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            pkg_name: pkg_name.into(),
            name: name.into(),
            version_name: String::new(),
            lang: String::new(),
            sources: Vec::new(),
        }
    }

    pub fn with_version(mut self, version_name: impl Into<String>) -> Self {
        self.version_name = version_name.into();
        self
    }

    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = lang.into();
        self
    }

    pub fn with_source(mut self, source: Source) -> Self {
        self.sources.push(source);
        self
    }
}

/// Names for source ids that may not be installed, used to label stubs.
pub trait SourceNameLookup: Send + Sync + fmt::Debug {
    fn source_info(&self, id: SourceId) -> Option<SourceInfo>;
}

/// Lookup that knows no names; stubs fall back to remembered or nameless info.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSourceNames;

impl SourceNameLookup for NoSourceNames {
    fn source_info(&self, _id: SourceId) -> Option<SourceInfo> {
        None
    }
}

/// In-memory name table, e.g. loaded from a backup or an extension repository index.
#[derive(Debug, Default, Clone)]
pub struct ExtensionIndex {
    infos: HashMap<SourceId, SourceInfo>,
}

impl ExtensionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, info: SourceInfo) {
        self.infos.insert(info.id, info);
    }

    pub fn len(&self) -> usize {
        self.infos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }
}

impl FromIterator<SourceInfo> for ExtensionIndex {
    fn from_iter<I: IntoIterator<Item = SourceInfo>>(iter: I) -> Self {
        let mut index = Self::new();
        for info in iter {
            index.insert(info);
        }
        index
    }
}

impl SourceNameLookup for ExtensionIndex {
    fn source_info(&self, id: SourceId) -> Option<SourceInfo> {
        self.infos.get(&id).cloned()
    }
}

pub type ExtensionReceiver = watch::Receiver<Vec<Extension>>;

/// Publishing side of the installed-extension feed.
///
/// Only the latest list is retained; a slow consumer skips intermediate lists.
#[derive(Debug)]
pub struct ExtensionFeed {
    tx: watch::Sender<Vec<Extension>>,
}

impl ExtensionFeed {
    /// Replace the installed list. Succeeds even when nobody is subscribed.
    pub fn publish(&self, extensions: Vec<Extension>) {
        self.tx.send_replace(extensions);
    }

    pub fn subscribe(&self) -> ExtensionReceiver {
        self.tx.subscribe()
    }

    pub fn current(&self) -> Vec<Extension> {
        self.tx.borrow().clone()
    }
}

/// Create a feed that starts with no installed extensions.
pub fn extension_feed() -> (ExtensionFeed, ExtensionReceiver) {
    let (tx, rx) = watch::channel(Vec::new());
    (ExtensionFeed { tx }, rx)
}

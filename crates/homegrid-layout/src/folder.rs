//! Folder operations on the item store.
//!
//! Every operation is transactional: it runs against a clone of the store
//! and the clone replaces the store only when the operation and the
//! observer (the caller's render hook) both succeed. On failure the store
//! is left exactly as it was, ids included.
//!
//! Folders never remain observable with a single child: removing down to
//! one child promotes that child into the folder's slot atomically.

use std::fmt;

use crate::item::{
    DEFAULT_FOLDER_NAME, Folder, Item, ItemContent, ItemId, ItemKind, MemberRef, Placement,
};
use crate::store::ItemStore;

/// Failure reported by a [`FolderObserver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderRenderError {
    reason: String,
}

impl FolderRenderError {
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl fmt::Display for FolderRenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "folder render failed: {}", self.reason)
    }
}

impl std::error::Error for FolderRenderError {}

/// Why a folder operation was rejected or rolled back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FolderError {
    /// Target and dragged item are the same item.
    SameItem(ItemId),
    ItemNotFound(ItemId),
    NotAFolder(ItemId),
    AlreadyMember { folder: ItemId, item: ItemId },
    /// Only apps and clocks can live in folders.
    UnsupportedMember { id: ItemId, kind: ItemKind },
    MemberNotFound { folder: ItemId },
    /// The observer failed; the operation was rolled back.
    Render(FolderRenderError),
}

impl fmt::Display for FolderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SameItem(id) => write!(f, "cannot fold item {id} into itself"),
            Self::ItemNotFound(id) => write!(f, "item {id} not found"),
            Self::NotAFolder(id) => write!(f, "item {id} is not a folder"),
            Self::AlreadyMember { folder, item } => {
                write!(f, "item {item} is already in folder {folder}")
            }
            Self::UnsupportedMember { id, kind } => {
                write!(f, "item {id} of kind {kind} cannot join a folder")
            }
            Self::MemberNotFound { folder } => write!(f, "member not found in folder {folder}"),
            Self::Render(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for FolderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Render(err) => Some(err),
            _ => None,
        }
    }
}

/// What a removal did to the folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    /// Two or more children remain.
    Persisted,
    /// One child remained and took the folder's place.
    Collapsed { promoted: ItemId },
    /// No children remained; the folder is gone.
    Dissolved,
}

/// Result of [`ItemStore::remove_from_folder`].
#[derive(Debug, Clone, PartialEq)]
pub struct FolderRemoval {
    /// The removed child, with the placement it had inside the folder.
    pub removed: Item,
    pub outcome: RemoveOutcome,
}

/// A committed-but-not-yet-published folder change, shown to the observer.
#[derive(Debug)]
pub enum FolderChange<'a> {
    Merged { folder: &'a Item },
    Added { folder: &'a Item, member: ItemId },
    Removed {
        folder: ItemId,
        removed: &'a Item,
        outcome: RemoveOutcome,
    },
}

/// Render hook invoked before a folder change is published. Returning an
/// error rolls the change back.
pub trait FolderObserver {
    fn folder_changed(&mut self, change: &FolderChange<'_>) -> Result<(), FolderRenderError>;
}

impl<F> FolderObserver for F
where
    F: FnMut(&FolderChange<'_>) -> Result<(), FolderRenderError>,
{
    fn folder_changed(&mut self, change: &FolderChange<'_>) -> Result<(), FolderRenderError> {
        self(change)
    }
}

/// Observer that accepts every change.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unobserved;

impl FolderObserver for Unobserved {
    fn folder_changed(&mut self, _change: &FolderChange<'_>) -> Result<(), FolderRenderError> {
        Ok(())
    }
}

impl ItemStore {
    /// Fold `dragged` and `target` into a new folder at `target`'s place.
    pub fn merge_to_folder(&mut self, target: ItemId, dragged: ItemId) -> Result<ItemId, FolderError> {
        self.merge_to_folder_with(target, dragged, &mut Unobserved)
    }

    /// [`merge_to_folder`](Self::merge_to_folder) with a render hook.
    pub fn merge_to_folder_with<O: FolderObserver + ?Sized>(
        &mut self,
        target: ItemId,
        dragged: ItemId,
        observer: &mut O,
    ) -> Result<ItemId, FolderError> {
        self.folder_transaction("merge", |store| {
            let folder = store.apply_merge(target, dragged)?;
            let item = store.get(folder).ok_or(FolderError::ItemNotFound(folder))?;
            observer
                .folder_changed(&FolderChange::Merged { folder: item })
                .map_err(FolderError::Render)?;
            Ok(folder)
        })
    }

    /// Move a top-level item into an existing folder.
    pub fn add_to_folder(&mut self, folder: ItemId, dragged: ItemId) -> Result<(), FolderError> {
        self.add_to_folder_with(folder, dragged, &mut Unobserved)
    }

    pub fn add_to_folder_with<O: FolderObserver + ?Sized>(
        &mut self,
        folder: ItemId,
        dragged: ItemId,
        observer: &mut O,
    ) -> Result<(), FolderError> {
        self.folder_transaction("add", |store| {
            store.apply_add(folder, dragged)?;
            let item = store.get(folder).ok_or(FolderError::ItemNotFound(folder))?;
            observer
                .folder_changed(&FolderChange::Added {
                    folder: item,
                    member: dragged,
                })
                .map_err(FolderError::Render)
        })
    }

    /// Take a child out of a folder, collapsing or dissolving the folder
    /// when fewer than two children remain. The removed child is returned
    /// and is not placed anywhere.
    pub fn remove_from_folder(
        &mut self,
        folder: ItemId,
        member: &MemberRef,
    ) -> Result<FolderRemoval, FolderError> {
        self.remove_from_folder_with(folder, member, &mut Unobserved)
    }

    pub fn remove_from_folder_with<O: FolderObserver + ?Sized>(
        &mut self,
        folder: ItemId,
        member: &MemberRef,
        observer: &mut O,
    ) -> Result<FolderRemoval, FolderError> {
        self.folder_transaction("remove", |store| {
            let removal = store.apply_remove(folder, member)?;
            observer
                .folder_changed(&FolderChange::Removed {
                    folder,
                    removed: &removal.removed,
                    outcome: removal.outcome,
                })
                .map_err(FolderError::Render)?;
            Ok(removal)
        })
    }

    fn folder_transaction<T>(
        &mut self,
        operation: &'static str,
        apply: impl FnOnce(&mut ItemStore) -> Result<T, FolderError>,
    ) -> Result<T, FolderError> {
        let mut working = self.clone();
        match apply(&mut working) {
            Ok(value) => {
                tracing::debug!(
                    target: "homegrid.folder",
                    operation,
                    before_hash = self.state_hash(),
                    after_hash = working.state_hash(),
                    "folder operation committed"
                );
                *self = working;
                Ok(value)
            }
            Err(err) => {
                tracing::warn!(
                    target: "homegrid.folder",
                    operation,
                    error = %err,
                    "folder operation rolled back"
                );
                Err(err)
            }
        }
    }

    fn apply_merge(&mut self, target: ItemId, dragged: ItemId) -> Result<ItemId, FolderError> {
        if target == dragged {
            return Err(FolderError::SameItem(target));
        }
        let anchor = self.member_candidate(target)?.placement;
        self.member_candidate(dragged)?;

        let (Some(first), Some(second)) = (self.remove(target), self.remove(dragged)) else {
            return Err(FolderError::ItemNotFound(target));
        };
        let mut folder = Folder::new(DEFAULT_FOLDER_NAME);
        folder.children = vec![first, second];

        let id = self.allocate_id();
        let placement = Placement::new(anchor.col, anchor.row, anchor.span_x, anchor.span_y, anchor.page);
        let item = Item::new(id, ItemContent::Folder(folder), placement);
        self.insert_item(item)
            .map_err(|_| FolderError::ItemNotFound(target))?;
        Ok(id)
    }

    fn apply_add(&mut self, folder: ItemId, dragged: ItemId) -> Result<(), FolderError> {
        if folder == dragged {
            return Err(FolderError::SameItem(folder));
        }
        let target = self.get(folder).ok_or(FolderError::ItemNotFound(folder))?;
        let members = target.folder().ok_or(FolderError::NotAFolder(folder))?;
        if members.contains(dragged) {
            return Err(FolderError::AlreadyMember {
                folder,
                item: dragged,
            });
        }
        self.member_candidate(dragged)?;

        let child = self.remove(dragged).ok_or(FolderError::ItemNotFound(dragged))?;
        let target = self
            .get_mut(folder)
            .and_then(Item::folder_mut)
            .ok_or(FolderError::NotAFolder(folder))?;
        target.children.push(child);
        Ok(())
    }

    fn apply_remove(&mut self, folder: ItemId, member: &MemberRef) -> Result<FolderRemoval, FolderError> {
        let item = self.get_mut(folder).ok_or(FolderError::ItemNotFound(folder))?;
        let anchor = item.placement;
        let transform = item.transform;
        let members = item.folder_mut().ok_or(FolderError::NotAFolder(folder))?;
        let index = members
            .position_of(member)
            .ok_or(FolderError::MemberNotFound { folder })?;
        let removed = members.children.remove(index);

        let outcome = match members.children.len() {
            0 => {
                self.remove(folder);
                RemoveOutcome::Dissolved
            }
            1 => {
                let Some(mut promoted) = members.children.pop() else {
                    return Err(FolderError::MemberNotFound { folder });
                };
                promoted.placement = Placement::new(
                    anchor.col,
                    anchor.row,
                    promoted.placement.span_x,
                    promoted.placement.span_y,
                    anchor.page,
                );
                promoted.transform = transform;
                let promoted_id = promoted.id();
                if self.contains(promoted_id) {
                    self.remove(folder);
                } else {
                    self.replace_at_slot(folder, promoted);
                }
                RemoveOutcome::Collapsed {
                    promoted: promoted_id,
                }
            }
            _ => RemoveOutcome::Persisted,
        };
        Ok(FolderRemoval { removed, outcome })
    }

    fn member_candidate(&self, id: ItemId) -> Result<&Item, FolderError> {
        let item = self.get(id).ok_or(FolderError::ItemNotFound(id))?;
        if !item.kind().can_join_folder() {
            return Err(FolderError::UnsupportedMember {
                id,
                kind: item.kind(),
            });
        }
        Ok(item)
    }
}

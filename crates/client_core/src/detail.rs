use std::{collections::HashSet, sync::Arc};

use gateway::PackageGateway;
use shared::{
    domain::{ItemId, Package, PackageId},
    error::GatewayError,
    protocol::RefreshSet,
};
use tokio::sync::{broadcast, Mutex};
use tracing::info;

use crate::{notify_failure, Notice};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DetailPhase {
    #[default]
    Idle,
    Loading,
    Open,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionKind {
    Pack,
    Deliver,
    Cancel,
}

impl TransitionKind {
    fn past_tense(self) -> &'static str {
        match self {
            TransitionKind::Pack => "packed",
            TransitionKind::Deliver => "delivered",
            TransitionKind::Cancel => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DetailState {
    pub id: Option<PackageId>,
    pub phase: DetailPhase,
    pub package: Option<Package>,
    /// Pack-time item selection, client-held only.
    pub checked_items: HashSet<ItemId>,
    /// The open transition confirmation dialog, if any.
    pub dialog: Option<TransitionKind>,
}

impl DetailState {
    /// Pack is available only when every item row is checked and the
    /// package is still NEW.
    pub fn pack_enabled(&self) -> bool {
        let Some(package) = &self.package else {
            return false;
        };
        if !package.status.may_pack() {
            return false;
        }
        let all: HashSet<ItemId> = package.items.iter().map(|item| item.id.clone()).collect();
        self.checked_items == all
    }
}

/// Owns the currently selected package's lifecycle view. Client-side guards
/// are convenience, not security; the backend stays authoritative and the
/// controller never assumes a transition succeeded before the API confirms.
pub struct PackageDetailController {
    gateway: Arc<dyn PackageGateway>,
    notices: broadcast::Sender<Notice>,
    inner: Mutex<DetailState>,
}

impl PackageDetailController {
    pub fn new(gateway: Arc<dyn PackageGateway>) -> Self {
        let (notices, _) = broadcast::channel(64);
        Self {
            gateway,
            notices,
            inner: Mutex::new(DetailState::default()),
        }
    }

    pub fn subscribe_notices(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }

    pub async fn state(&self) -> DetailState {
        self.inner.lock().await.clone()
    }

    /// Selects a package: resets to an empty detail first, then loads.
    pub async fn open(&self, id: PackageId) {
        {
            let mut guard = self.inner.lock().await;
            *guard = DetailState {
                id: Some(id),
                ..DetailState::default()
            };
        }
        self.refresh().await;
    }

    /// Drops the selection entirely (zero or multi-row selection upstream).
    pub async fn clear(&self) {
        *self.inner.lock().await = DetailState::default();
    }

    /// Re-retrieves the open package. On failure the previously loaded data
    /// is retained and the view still lands in `Open`.
    pub async fn refresh(&self) {
        let id = {
            let mut guard = self.inner.lock().await;
            let Some(id) = guard.id.clone() else {
                return;
            };
            guard.phase = DetailPhase::Loading;
            id
        };

        let result = self.gateway.retrieve(&id).await;

        let mut guard = self.inner.lock().await;
        // A newer selection may have replaced this one while the retrieve
        // was in flight; its own refresh owns the state now.
        if guard.id.as_ref() != Some(&id) {
            return;
        }
        match result {
            Ok(package) => {
                guard
                    .checked_items
                    .retain(|checked| package.items.iter().any(|item| &item.id == checked));
                guard.package = Some(package);
                guard.phase = DetailPhase::Open;
            }
            Err(err) => {
                guard.phase = DetailPhase::Open;
                drop(guard);
                notify_failure(&self.notices, &err);
            }
        }
    }

    pub async fn set_item_checked(&self, item: &ItemId, checked: bool) {
        let mut guard = self.inner.lock().await;
        if checked {
            guard.checked_items.insert(item.clone());
        } else {
            guard.checked_items.remove(item);
        }
    }

    pub async fn set_all_items_checked(&self, checked: bool) {
        let mut guard = self.inner.lock().await;
        if !checked {
            guard.checked_items.clear();
            return;
        }
        let all: Vec<ItemId> = guard
            .package
            .iter()
            .flat_map(|package| package.items.iter().map(|item| item.id.clone()))
            .collect();
        guard.checked_items = all.into_iter().collect();
    }

    pub async fn open_dialog(&self, kind: TransitionKind) {
        self.inner.lock().await.dialog = Some(kind);
    }

    pub async fn close_dialog(&self) {
        self.inner.lock().await.dialog = None;
    }

    /// Issues a lifecycle command. Guard failures short-circuit before any
    /// network call and are surfaced exactly like backend errors. On success
    /// the open dialog closes and the same id is re-retrieved; on failure
    /// state stays whatever the last successful retrieve produced.
    pub async fn apply_transition(&self, kind: TransitionKind, reason: Option<&str>) {
        let precheck = {
            let guard = self.inner.lock().await;
            match (&guard.id, &guard.package) {
                (Some(id), Some(package)) => {
                    transition_guard(kind, reason, package, &guard.checked_items)
                        .map(|()| id.clone())
                }
                _ => Err(GatewayError::Precondition("no package is open".into())),
            }
        };
        let id = match precheck {
            Ok(id) => id,
            Err(err) => {
                notify_failure(&self.notices, &err);
                return;
            }
        };

        let result = match kind {
            TransitionKind::Pack => self.gateway.pack(&id).await,
            TransitionKind::Deliver => self.gateway.deliver(&id).await,
            TransitionKind::Cancel => self.gateway.cancel(&id, reason.unwrap_or_default()).await,
        };

        match result {
            Ok(()) => {
                self.inner.lock().await.dialog = None;
                info!(package_id = %id, action = kind.past_tense(), "transition confirmed");
                let _ = self
                    .notices
                    .send(Notice::success(format!("package {}", kind.past_tense())));
                self.refresh().await;
            }
            Err(err) => notify_failure(&self.notices, &err),
        }
    }

    /// Another actor changed this record elsewhere: close any open dialog
    /// and re-retrieve once. The newer server state simply overwrites the
    /// view; there is no conflict detection.
    pub async fn on_refresh_signal(&self, signal: &RefreshSet) {
        let hit = {
            let mut guard = self.inner.lock().await;
            let hit = matches!(&guard.id, Some(id) if signal.contains(id));
            if hit {
                guard.dialog = None;
            }
            hit
        };
        if hit {
            info!("open package changed elsewhere; re-retrieving");
            self.refresh().await;
        }
    }
}

fn transition_guard(
    kind: TransitionKind,
    reason: Option<&str>,
    package: &Package,
    checked_items: &HashSet<ItemId>,
) -> Result<(), GatewayError> {
    match kind {
        TransitionKind::Pack => {
            if !package.status.may_pack() {
                return Err(GatewayError::Precondition(
                    "package can only be packed while NEW".into(),
                ));
            }
            let all: HashSet<ItemId> =
                package.items.iter().map(|item| item.id.clone()).collect();
            if checked_items != &all {
                return Err(GatewayError::Precondition(
                    "every item must be selected before packing".into(),
                ));
            }
        }
        TransitionKind::Deliver => {
            if !package.status.may_deliver() {
                return Err(GatewayError::Precondition(
                    "package can only be delivered while PACKED".into(),
                ));
            }
        }
        TransitionKind::Cancel => {
            if !package.status.may_cancel() {
                return Err(GatewayError::Precondition(
                    "package can no longer be cancelled".into(),
                ));
            }
            if reason.unwrap_or_default().trim().is_empty() {
                return Err(GatewayError::Precondition("cancel reason is required".into()));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "tests/detail_tests.rs"]
mod tests;

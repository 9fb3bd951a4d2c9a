//! Identity loading: URL-derived state first, fetched matrix second.

use programacion_bridge::FrameParams;
use tracing::{debug, info, warn};

use super::{resolve_permissions, PermissionState, UrlOverrides, ViewMode};
use crate::backend::Backend;

/// Resolves the permission state for the user named in the frame URL.
#[derive(Debug, Clone)]
pub struct IdentityLoader {
    user_id: Option<String>,
    role: Option<String>,
    overrides: UrlOverrides,
    requested_view: ViewMode,
}

impl IdentityLoader {
    pub fn new(params: &FrameParams) -> Self {
        Self {
            user_id: params.user_id.clone(),
            role: params.role.clone(),
            overrides: UrlOverrides::from(params),
            requested_view: params
                .mode
                .as_deref()
                .and_then(ViewMode::from_param)
                .unwrap_or(ViewMode::Lab),
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn requested_view(&self) -> ViewMode {
        self.requested_view
    }

    /// State usable immediately, before any network call.
    pub fn initial_state(&self) -> PermissionState {
        resolve_permissions(
            self.role.as_deref(),
            self.overrides,
            self.requested_view,
            None,
        )
    }

    /// Fetch the stored profile and re-resolve with its matrix.
    ///
    /// A failed fetch, a missing profile or an empty matrix keeps the
    /// URL-derived state. There is no retry.
    pub fn resolve_with<B: Backend>(&self, backend: &B) -> PermissionState {
        let fallback = self.initial_state();
        let (Some(user_id), Some(_)) = (self.user_id.as_deref(), self.role.as_deref()) else {
            return fallback;
        };

        let profile = match backend.fetch_permissions(user_id) {
            Ok(Some(profile)) => profile,
            Ok(None) => {
                info!(user_id, "no stored profile, using URL permissions");
                return fallback;
            }
            Err(e) => {
                warn!(user_id, error = %e, "permission fetch failed, using URL permissions");
                return fallback;
            }
        };

        if profile.permissions.is_empty() {
            info!(user_id, "stored permission matrix is empty, using URL permissions");
            return fallback;
        }

        let role = profile.role.as_deref().or(self.role.as_deref());
        let state = resolve_permissions(
            role,
            self.overrides,
            self.requested_view,
            Some(&profile.permissions),
        );
        debug!(user_id, views = ?state.allowed_views(), "permissions resolved from profile");
        state
    }
}

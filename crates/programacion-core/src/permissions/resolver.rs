//! Pure permission resolution.

use serde::{Deserialize, Serialize};

use super::roles::{
    field_denied, heuristic_access, is_high_level_role, normalize_role, role_profile,
    SUPERADMIN_ROLE,
};
use super::{PermissionMatrix, UrlOverrides, ViewMode};
use crate::columns::ColumnSet;
use crate::models::Field;

/// Whether the permission state can be acted on yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthStatus {
    /// Identity is still being established; not the same as denied.
    Loading,
    /// No identity was supplied; the user must sign in.
    NeedsAuth,
    Ready,
}

/// Access to one view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewGrant {
    pub can_view: bool,
    pub can_write: bool,
}

/// Resolved permissions for the current user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionState {
    pub status: AuthStatus,
    /// Normalized role name.
    pub role: Option<String>,
    pub requested_view: ViewMode,
    grants: [ViewGrant; 3],
}

impl PermissionState {
    /// State shown while identity is being established.
    pub fn loading() -> Self {
        Self::empty(AuthStatus::Loading)
    }

    /// State for a visitor without identity.
    pub fn needs_auth() -> Self {
        Self::empty(AuthStatus::NeedsAuth)
    }

    fn empty(status: AuthStatus) -> Self {
        Self {
            status,
            role: None,
            requested_view: ViewMode::Lab,
            grants: [ViewGrant::default(); 3],
        }
    }

    pub fn is_ready(&self) -> bool {
        self.status == AuthStatus::Ready
    }

    pub fn grant(&self, view: ViewMode) -> ViewGrant {
        self.grants[view.index()]
    }

    pub fn can_view(&self, view: ViewMode) -> bool {
        self.is_ready() && self.grant(view).can_view
    }

    pub fn can_write(&self, view: ViewMode) -> bool {
        self.is_ready() && self.grant(view).can_write
    }

    /// Views the user may open, in display order.
    pub fn allowed_views(&self) -> Vec<ViewMode> {
        ViewMode::ALL
            .into_iter()
            .filter(|v| self.can_view(*v))
            .collect()
    }

    /// Management roles keep whatever view they ask for.
    pub fn is_high_level(&self) -> bool {
        self.role.as_deref().is_some_and(is_high_level_role)
    }

    /// Whether the role's field exception table removes `field` in `view`.
    pub fn is_field_denied(&self, view: ViewMode, field: Field) -> bool {
        self.role
            .as_deref()
            .is_some_and(|role| field_denied(role, view, field))
    }

    /// Per-field write check.
    ///
    /// Requires view-level write access, a field shown as editable in the
    /// view's column set, and no entry in the role's field exception table.
    pub fn can_write_field(&self, view: ViewMode, field: Field) -> bool {
        if !self.can_write(view) {
            return false;
        }
        if !ColumnSet::for_view(view).is_editable(field) {
            return false;
        }
        !self.is_field_denied(view, field)
    }
}

/// Resolve the permission state for a role.
///
/// Sources, highest priority first:
/// 1. `is_admin` override: every view, with write
/// 2. `can_write` override: write in the requested view
/// 3. exact role table
/// 4. substring heuristics on the normalized role
/// 5. the fetched permission matrix
/// 6. deny
///
/// Every source can only add access, so a view is visible when any of them
/// grants it.
pub fn resolve_permissions(
    role: Option<&str>,
    overrides: UrlOverrides,
    requested_view: ViewMode,
    matrix: Option<&PermissionMatrix>,
) -> PermissionState {
    let role = role.map(normalize_role).filter(|r| !r.is_empty());

    if role.is_none() && !overrides.is_admin {
        let mut state = PermissionState::needs_auth();
        state.requested_view = requested_view;
        return state;
    }

    let profile = role.as_deref().and_then(role_profile);
    let (heuristic_views, heuristic_write) = role
        .as_deref()
        .map(heuristic_access)
        .unwrap_or_default();
    let superadmin = overrides.is_admin || role.as_deref() == Some(SUPERADMIN_ROLE);

    let mut grants = [ViewGrant::default(); 3];
    for view in ViewMode::ALL {
        let from_table_view = profile.is_some_and(|p| p.views.contains(&view));
        let from_table_write = profile.is_some_and(|p| p.write.contains(&view));
        let from_matrix_view = matrix.is_some_and(|m| m.can_read(view));
        let from_matrix_write = matrix.is_some_and(|m| m.can_write(view));

        let can_view = superadmin
            || from_table_view
            || heuristic_views.contains(&view)
            || from_matrix_view;
        let can_write = superadmin
            || (overrides.can_write && view == requested_view)
            || from_table_write
            || heuristic_write.contains(&view)
            || from_matrix_write;

        grants[view.index()] = ViewGrant { can_view, can_write };
    }

    PermissionState {
        status: AuthStatus::Ready,
        role,
        requested_view,
        grants,
    }
}

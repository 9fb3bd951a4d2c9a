//! Initial view selection.

use super::roles::home_view;
use super::{PermissionState, ViewMode};

/// Pick the view to open.
///
/// An explicit `mode` parameter wins over the role's home view. Unless the
/// role is high-level, the choice is then constrained to the views the user
/// may open; `None` means no view is allowed.
pub fn select_view_mode(
    mode_param: Option<&str>,
    state: &PermissionState,
) -> Option<ViewMode> {
    let preferred = mode_param
        .and_then(ViewMode::from_param)
        .or_else(|| state.role.as_deref().map(home_view))
        .unwrap_or(ViewMode::Lab);

    if state.is_high_level() || state.can_view(preferred) {
        return Some(preferred);
    }
    state.allowed_views().into_iter().next()
}

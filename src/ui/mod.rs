//! UI components for Facing
//!
//! This module contains the panel view, the toolbar and the section switcher.

mod panel_view;
mod quick_switcher;
mod toolbar;

pub use panel_view::{show_panel, PanelAction, PanelContext, PanelViewState, TextFilter};
pub use quick_switcher::QuickSwitcher;
pub use toolbar::{show_toolbar, ToolbarAction, ToolbarState};

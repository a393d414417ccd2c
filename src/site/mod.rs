//! Public site
//!
//! The marketing page and its navigation behaviors: menu toggle, smooth
//! scrolling, scroll-spy and navbar shadow.

pub mod behavior;
pub mod page;

pub use behavior::{
    current_section, is_active_link, navbar_style, smooth_scroll_target, NavMenu, NavbarStyle,
    Section,
};
pub use page::{render_public_page, PageSection, DEFAULT_SECTIONS};

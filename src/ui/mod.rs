pub mod catalog;
pub mod episodes;
pub mod servers;
pub mod widgets;

pub use catalog::{render_latest_view, render_menu_view, render_search_view};
pub use episodes::render_episodes_view;
pub use servers::render_servers_view;

pub mod app;
pub mod filters;
pub mod form;
pub mod icons;
pub mod item_row;
pub mod list;
pub mod progress;

pub use app::App;
pub use filters::{Filter, FilterCounts, visible_items};
pub use form::TodoForm;

pub mod view;

pub use view::{build_page, navigate, visible_range, CalendarPage, CalendarView, Direction, ViewRange};

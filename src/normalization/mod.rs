pub mod html;
pub mod names;
pub mod platform;

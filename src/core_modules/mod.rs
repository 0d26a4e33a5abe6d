pub mod actuator;
pub mod condition_classifier;
pub mod contour;
pub mod frame;
pub mod frame_source;
pub mod object_locator;

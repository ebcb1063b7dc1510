pub mod classes;
pub mod feature;
pub mod matches;
pub mod status;
pub mod students;
pub mod upload;

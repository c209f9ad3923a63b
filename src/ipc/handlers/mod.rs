pub mod averages;
pub mod core;
pub mod grades;

pub mod catalog;
pub mod table;
pub mod validation;

pub mod file_system;
pub mod ocr;
pub mod parsers;
pub mod persistence;
pub mod search;
pub mod vision;

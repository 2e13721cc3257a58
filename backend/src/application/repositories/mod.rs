pub mod radio_repository;

pub use radio_repository::RadioRepository;

pub mod catalog_service;
pub mod reference_tables;
pub mod sizing_engine;

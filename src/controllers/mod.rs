pub mod catalog_controller;
pub mod health_controller;
pub mod quote_controller;
pub mod sizing_controller;

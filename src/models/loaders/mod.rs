pub mod csv_loader;

pub use csv_loader::load_urls_from_csv;

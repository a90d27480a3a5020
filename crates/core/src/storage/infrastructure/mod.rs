pub mod json_record_store;
pub mod png_file_store;

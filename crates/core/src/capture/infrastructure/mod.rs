pub mod image_file_reader;
pub mod path_permission;
pub mod still_image_camera;

pub mod component_labeler;
pub mod inference_device;
pub mod label_image_segmenter;
pub mod onnx_matte_segmenter;

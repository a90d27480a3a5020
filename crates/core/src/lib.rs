//! Isolates the largest foreground subject of a photo as a transparent
//! cutout and drives the interactive capture, review and save workflow.

pub mod shared {
    pub mod constants;
    pub mod error_kind;
    pub mod frame;
    pub mod model_resolver;
    pub mod orientation;
    pub mod pixel_rect;
}

pub mod segmentation {
    pub mod domain {
        pub mod instance_mask;
        pub mod instance_selector;
        pub mod mask_renderer;
        pub mod subject_segmenter;
    }
    pub mod infrastructure;
}

pub mod capture {
    pub mod domain {
        pub mod camera_permission;
        pub mod camera_session;
    }
    pub mod infrastructure;
}

pub mod storage {
    pub mod domain {
        pub mod cutout_file_store;
        pub mod cutout_record;
        pub mod record_store;
    }
    pub mod infrastructure;
}

pub mod pipeline {
    pub mod capture_token;
    pub mod capture_workflow;
    pub mod extract_subject_use_case;
    pub mod manage_gallery_use_case;
    pub mod workflow_presenter;

    pub mod infrastructure {
        pub mod threaded_workflow_driver;
    }
}

use std::fmt;

use ort::execution_providers::ExecutionProviderDispatch;

/// Where the matting model runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InferenceDevice {
    /// The platform accelerator (CoreML, DirectML) when one exists, else CPU.
    #[default]
    Auto,
    /// Always CPU, e.g. when an accelerator produces bad mattes.
    Cpu,
}

impl InferenceDevice {
    pub fn from_cpu_only(cpu_only: bool) -> Self {
        if cpu_only {
            InferenceDevice::Cpu
        } else {
            InferenceDevice::Auto
        }
    }

    /// Execution providers to register on the session, in preference order.
    /// Empty means ONNX Runtime's built-in CPU provider.
    pub fn execution_providers(self) -> Vec<ExecutionProviderDispatch> {
        match self {
            InferenceDevice::Cpu => Vec::new(),
            InferenceDevice::Auto => platform_accelerators(),
        }
    }
}

impl fmt::Display for InferenceDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InferenceDevice::Auto => f.write_str("auto"),
            InferenceDevice::Cpu => f.write_str("cpu"),
        }
    }
}

fn platform_accelerators() -> Vec<ExecutionProviderDispatch> {
    #[cfg(target_os = "macos")]
    {
        vec![ort::execution_providers::CoreMLExecutionProvider::default().build()]
    }
    #[cfg(target_os = "windows")]
    {
        vec![ort::execution_providers::DirectMLExecutionProvider::default().build()]
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        vec![]
    }
}

use std::fmt;

/// Tags one capture attempt. Results carrying a superseded token are dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CaptureToken(u64);

impl fmt::Display for CaptureToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "capture-{}", self.0)
    }
}

/// Mints strictly increasing tokens; none is ever handed out twice.
#[derive(Debug, Default)]
pub struct CaptureTokenSource {
    minted: u64,
}

impl CaptureTokenSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mint(&mut self) -> CaptureToken {
        self.minted += 1;
        CaptureToken(self.minted)
    }
}

//! Audio output port
//!
//! The simulation reports audible events through this trait instead of any
//! global audio state. The embedding UI supplies a real implementation;
//! headless hosts and tests run with [`NullAudio`].

pub trait AudioPort: Send + Sync {
    fn shot(&self) {}
    fn explosion(&self) {}
    fn pickup(&self) {}
    fn respawn(&self) {}
}

/// Silent implementation for headless sessions and tests
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAudio;

impl AudioPort for NullAudio {}

//! A particle network: points that drift around a surface, bounce off its edges and are joined
//! to their neighbours by lines that fade in and out.
//!
//! Nothing in here knows how to actually put pixels anywhere. The host hands over something
//! implementing [`canvas::Canvas`] and something implementing [`scheduler::FrameScheduler`], then
//! calls `tick()` once per display refresh.

pub mod canvas;
pub mod config;
pub mod connections;
pub mod debounce;
pub mod errors;
pub mod network;
pub mod particle;
pub mod scheduler;
pub mod theme;

pub use canvas::Canvas;
pub use config::{Colour, Config};
pub use network::ParticleNetwork;
pub use scheduler::{FrameQueue, FrameScheduler};
pub use theme::{Presets, Theme, ThemedNetwork};

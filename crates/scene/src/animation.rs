//! The per-frame update/render cycle.

use std::cell::RefCell;
use std::fmt::Display;

use runtime::{Frame, FrameScheduler};
use tracing::{debug, info, warn};

use crate::context::SceneContext;

/// Cloud-layer spin per frame (radians).
pub const CLOUD_SPIN_PER_FRAME: f64 = 0.00025;
/// Camera-rig spin per frame (radians); opposite to the clouds.
pub const CAMERA_RIG_SPIN_PER_FRAME: f64 = -0.00025;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
}

/// Draws one frame of a scene.
pub trait FrameRenderer {
    type Error: Display;

    fn render(&mut self, ctx: &SceneContext) -> Result<(), Self::Error>;
}

/// Applies one frame's worth of scene updates.
///
/// Refreshes a stale projection, sets the planet angle from the rotation
/// state, and advances the cloud and camera-rig spins by fixed increments.
pub fn update_scene(ctx: &mut SceneContext) {
    ctx.camera.update_projection_if_needed();

    let planet = ctx.rotation.radians();
    if let Some(t) = ctx.world.transform_mut(ctx.nodes.world_pivot) {
        t.rotation_y = planet;
    }
    if let Some(t) = ctx.world.transform_mut(ctx.nodes.clouds) {
        t.rotation_y += CLOUD_SPIN_PER_FRAME;
    }
    if let Some(t) = ctx.world.transform_mut(ctx.nodes.base) {
        t.rotation_y += CAMERA_RIG_SPIN_PER_FRAME;
    }
}

/// Idle until the first frame arrives, then Running for the rest of the session.
#[derive(Debug)]
pub struct AnimationLoop {
    state: LoopState,
    frames: u64,
    render_failures: u64,
}

impl Default for AnimationLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl AnimationLoop {
    pub fn new() -> Self {
        Self {
            state: LoopState::Idle,
            frames: 0,
            render_failures: 0,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn render_failures(&self) -> u64 {
        self.render_failures
    }

    /// Update, then render, one frame. Render errors are logged and counted;
    /// they never stop the loop.
    pub fn step<R: FrameRenderer>(&mut self, ctx: &mut SceneContext, frame: Frame, renderer: &mut R) {
        if self.state == LoopState::Idle {
            info!("animation loop running");
            self.state = LoopState::Running;
        }

        update_scene(ctx);
        if let Err(err) = renderer.render(ctx) {
            self.render_failures += 1;
            warn!(frame = frame.index, %err, "frame render failed");
        }
        self.frames += 1;
    }

    /// Drives frames until the scheduler stops yielding them.
    ///
    /// The only await is `next_frame`; the context is borrowed for the
    /// duration of one frame's synchronous work, so other tasks (clicks,
    /// geolocation, rotation refresh) can touch it between frames.
    pub async fn run<S, R>(&mut self, ctx: &RefCell<SceneContext>, scheduler: &mut S, renderer: &mut R)
    where
        S: FrameScheduler,
        R: FrameRenderer,
    {
        while let Some(frame) = scheduler.next_frame().await {
            let mut scene = ctx.borrow_mut();
            self.step(&mut scene, frame, renderer);
        }
        debug!(frames = self.frames, "frame scheduler exhausted");
    }
}

use glam::{Mat4, Vec2};

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
}

/// Fixed camera that letterboxes a world-space rectangle into the window.
///
/// World space is y-up with the origin at the bottom-left of the play field;
/// window space is physical pixels, y-down, origin top-left.
pub struct Camera2D {
    pub world_size: Vec2,
    pub viewport: (u32, u32),
}

impl Camera2D {
    pub fn new(world_width: f32, world_height: f32, viewport: (u32, u32)) -> Self {
        Self {
            world_size: Vec2::new(world_width, world_height),
            viewport,
        }
    }

    /// Pixels per world unit, the largest scale that keeps the whole field visible.
    pub fn zoom(&self) -> f32 {
        let zx = self.viewport.0.max(1) as f32 / self.world_size.x;
        let zy = self.viewport.1.max(1) as f32 / self.world_size.y;
        zx.min(zy)
    }

    fn center(&self) -> Vec2 {
        self.world_size * 0.5
    }

    pub fn build_uniform(&self) -> CameraUniform {
        let zoom = self.zoom();
        let half_w = self.viewport.0.max(1) as f32 / (2.0 * zoom);
        let half_h = self.viewport.1.max(1) as f32 / (2.0 * zoom);
        let c = self.center();

        let proj = Mat4::orthographic_rh(
            c.x - half_w,
            c.x + half_w,
            c.y - half_h,
            c.y + half_h,
            -1.0,
            1.0,
        );

        CameraUniform {
            view_proj: proj.to_cols_array_2d(),
        }
    }

    pub fn screen_to_world(&self, screen: Vec2) -> Vec2 {
        let zoom = self.zoom();
        let half_view = Vec2::new(self.viewport.0 as f32, self.viewport.1 as f32) * 0.5;
        let c = self.center();
        Vec2::new(
            c.x + (screen.x - half_view.x) / zoom,
            c.y - (screen.y - half_view.y) / zoom,
        )
    }

    pub fn world_to_screen(&self, world: Vec2) -> Vec2 {
        let zoom = self.zoom();
        let half_view = Vec2::new(self.viewport.0 as f32, self.viewport.1 as f32) * 0.5;
        let c = self.center();
        Vec2::new(
            half_view.x + (world.x - c.x) * zoom,
            half_view.y - (world.y - c.y) * zoom,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Vec2, b: Vec2) -> bool {
        (a - b).length() < 0.001
    }

    #[test]
    fn matching_viewport_maps_corners() {
        let camera = Camera2D::new(1280.0, 768.0, (1280, 768));
        assert!((camera.zoom() - 1.0).abs() < f32::EPSILON);
        assert!(close(camera.screen_to_world(Vec2::new(0.0, 768.0)), Vec2::ZERO));
        assert!(close(
            camera.screen_to_world(Vec2::new(1280.0, 0.0)),
            Vec2::new(1280.0, 768.0)
        ));
    }

    #[test]
    fn wide_viewport_letterboxes_horizontally() {
        let camera = Camera2D::new(1280.0, 768.0, (2560, 768));
        assert!((camera.zoom() - 1.0).abs() < f32::EPSILON);
        // The field is centered, so the left 640 pixels are outside it.
        let p = camera.screen_to_world(Vec2::new(640.0, 384.0));
        assert!(close(p, Vec2::new(0.0, 384.0)));
    }

    #[test]
    fn screen_world_round_trip_under_scaling() {
        let camera = Camera2D::new(1280.0, 768.0, (640, 384));
        let world = Vec2::new(480.0, 250.0);
        let back = camera.screen_to_world(camera.world_to_screen(world));
        assert!(close(world, back));
    }
}

//! Conversions between the coordinate/color structs and glam vectors.

use glam::{DVec4, UVec3};

use crate::ffi::{WGPUColor, WGPUExtent3d, WGPUOrigin3d};

impl From<UVec3> for WGPUOrigin3d {
    fn from(v: UVec3) -> Self {
        let mut origin = Self::create_heap();
        origin.set_x(v.x);
        origin.set_y(v.y);
        origin.set_z(v.z);
        origin
    }
}

impl From<WGPUOrigin3d> for UVec3 {
    fn from(origin: WGPUOrigin3d) -> Self {
        UVec3::new(origin.x(), origin.y(), origin.z())
    }
}

impl From<UVec3> for WGPUExtent3d {
    fn from(v: UVec3) -> Self {
        let mut extent = Self::create_heap();
        extent.set_width(v.x);
        extent.set_height(v.y);
        extent.set_depth(v.z);
        extent
    }
}

impl From<WGPUExtent3d> for UVec3 {
    fn from(extent: WGPUExtent3d) -> Self {
        UVec3::new(extent.width(), extent.height(), extent.depth())
    }
}

/// `r, g, b, a` map to `x, y, z, w`.
impl From<DVec4> for WGPUColor {
    fn from(v: DVec4) -> Self {
        let mut color = Self::create_heap();
        color.set_r(v.x);
        color.set_g(v.y);
        color.set_b(v.z);
        color.set_a(v.w);
        color
    }
}

impl From<WGPUColor> for DVec4 {
    fn from(color: WGPUColor) -> Self {
        DVec4::new(color.r(), color.g(), color.b(), color.a())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Direct;

    #[test]
    fn origin_from_vector() {
        let origin = WGPUOrigin3d::from(UVec3::new(1, 2, 3));
        assert_eq!((origin.x(), origin.y(), origin.z()), (1, 2, 3));
        assert_eq!(UVec3::from(origin), UVec3::new(1, 2, 3));
    }

    #[test]
    fn extent_maps_xyz_to_width_height_depth() {
        let extent = WGPUExtent3d::from(UVec3::new(640, 480, 6));
        assert_eq!(extent.width(), 640);
        assert_eq!(extent.height(), 480);
        assert_eq!(extent.depth(), 6);
    }

    #[test]
    fn color_into_direct_memory() {
        let color = Direct::from_value(WGPUColor::from(DVec4::new(0.2, 0.4, 0.6, 1.0))).unwrap();
        assert_eq!(DVec4::from(color.get()), DVec4::new(0.2, 0.4, 0.6, 1.0));
    }
}

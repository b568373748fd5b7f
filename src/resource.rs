//! The resource module encapsulates domain entities for use with Bevy.

use std::ops::{Deref, DerefMut};

use bevy::ecs::system::Resource;

use crate::domain;

macro_rules! domain_resource {
    ($name:ident, $inner:ty) => {
        #[derive(Resource)]
        pub struct $name($inner);

        impl Deref for $name {
            type Target = $inner;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl DerefMut for $name {
            fn deref_mut(&mut self) -> &mut Self::Target {
                &mut self.0
            }
        }

        impl From<$inner> for $name {
            fn from(value: $inner) -> Self {
                Self(value)
            }
        }
    };
}

domain_resource!(RobotRes, domain::Robot);
domain_resource!(SensorRes, domain::RangeSensor);
domain_resource!(FieldRes, domain::OccupancyGrid);
domain_resource!(OverlayRes, domain::TraceOverlay);
domain_resource!(PointCloudRes, domain::PointCloud);
domain_resource!(StartRes, domain::Position);

impl Default for PointCloudRes {
    fn default() -> Self {
        Self(domain::PointCloud::new())
    }
}

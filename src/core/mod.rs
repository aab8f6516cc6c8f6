//! Core types describing solids, their geometry and the articulated bodies built from them.

pub mod articulations;
pub mod mesh;
pub mod shape;
pub mod solid;
pub mod types;

pub use articulations::{ArticulatedBody, JointKind, KinematicJoint, KinematicLink};
pub use mesh::{Aabb, MeshBuilder, TriangleMesh};
pub use shape::ShapeKind;
pub use solid::{Compound, CompoundPart, PartKind, RigidSolid};
pub use types::{MassProperties, Material, Transform, Velocity, Wrench};

//! Simulation dynamics: mass properties, hydrodynamic loads and the articulated-body backend.

pub mod aba;
pub mod backend;
pub mod fluid;
pub mod hydrodynamics;
pub mod inertia;
pub mod proxy;

pub use aba::FeatherstoneBackend;
pub use backend::{BodyDescription, DynamicsBackend, JointDescription, LinkHandle, TreeHandle};
pub use fluid::{Current, FluidVolume, Ocean, Wave};
pub use hydrodynamics::{BodyMotion, HydrodynamicForceModel, HydrodynamicState, Regime};
pub use proxy::{HydrodynamicProxy, ProxyKind, Submersion};

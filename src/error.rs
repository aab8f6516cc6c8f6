//! Errors reported while assembling solids and articulated bodies.

use thiserror::Error;

/// Rejected construction request. Returned synchronously by the call that caused it;
/// nothing inside a physics step produces one.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AssemblyError {
    #[error("link index {index} is out of range ({count} links)")]
    LinkOutOfRange { index: usize, count: usize },
    #[error("joint index {index} is out of range ({count} joints)")]
    JointOutOfRange { index: usize, count: usize },
    #[error("a joint cannot connect link {0} to itself")]
    SelfJoint(usize),
    #[error("the base link cannot be the child of a joint")]
    BaseAsChild,
    #[error("link {0} already has a parent joint")]
    ChildAlreadyAttached(usize),
    #[error("joining link {parent} to link {child} would close a loop")]
    CycleDetected { parent: usize, child: usize },
    #[error("joint axis must be non-zero")]
    DegenerateAxis,
    #[error("link {0} is not connected to the base")]
    Disconnected(usize),
    #[error("articulated body `{0}` is already registered with the dynamics backend")]
    AlreadyRegistered(String),
    #[error("the dynamics backend refused link {0}")]
    BackendRejected(usize),
    #[error("solid `{0}` is not a compound")]
    NotCompound(String),
    #[error("solid `{name}` has degenerate geometry (mass {mass})")]
    DegenerateGeometry { name: String, mass: f32 },
}

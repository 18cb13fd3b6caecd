use std::fmt;

/// Failures of setup-style operations (ragdoll, hair, entity body creation).
///
/// Per-frame scripting calls do not use this: they log a warning and return
/// `false` so a bad script argument never stops the frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PhysicsError {
    /// Bone index outside the skeleton.
    NoSuchBone { bone: usize, bone_count: usize },
    /// A joint was requested on a bone that has no parent to anchor to.
    MissingParentBone { bone: usize },
    /// Hair link bone has no body to attach to.
    MissingLinkBody { bone: usize },
    TooManyJoints { joints: usize, bone_count: usize },
    TooManyBodies { bodies: usize, bone_count: usize },
    /// Hair setup without segments.
    EmptyHair,
    /// The entity's owner tag was already released.
    UnknownEntity,
}

impl fmt::Display for PhysicsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhysicsError::NoSuchBone { bone, bone_count } => {
                write!(f, "bone {} out of range (skeleton has {})", bone, bone_count)
            }
            PhysicsError::MissingParentBone { bone } => {
                write!(f, "bone {} has no parent to anchor a joint", bone)
            }
            PhysicsError::MissingLinkBody { bone } => {
                write!(f, "hair link bone {} has no body", bone)
            }
            PhysicsError::TooManyJoints { joints, bone_count } => {
                write!(f, "{} joints requested for {} bones", joints, bone_count)
            }
            PhysicsError::TooManyBodies { bodies, bone_count } => {
                write!(f, "{} bodies requested for {} bones", bodies, bone_count)
            }
            PhysicsError::EmptyHair => f.write_str("hair setup has no segments"),
            PhysicsError::UnknownEntity => f.write_str("entity owner tag is not live"),
        }
    }
}

impl std::error::Error for PhysicsError {}

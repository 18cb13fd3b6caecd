pub mod bitmask_flags;
pub mod constants;
pub mod contact;
pub mod debug_draw;
pub mod entity;
pub mod error;
pub mod factory;
pub mod filter;
pub mod ghost;
pub mod hair;
pub mod owner;
pub mod ragdoll;
pub mod settings;
pub mod tween;
pub mod world;

pub use bitmask_flags::{BitmaskFlags, CollisionGroup, CollisionMask};
pub use contact::{CollisionList, CollisionNode, NodeArena};
pub use debug_draw::DebugDrawSink;
pub use entity::{CollisionType, EntityDesc, EntityPhysics, PhysicsBody, RagdollState, ShapeMode};
pub use error::PhysicsError;
pub use factory::{ProxyShape, RigidBodyFactory, ShapeSpec};
pub use filter::CollisionFilter;
pub use ghost::GhostProxy;
pub use hair::{HairChain, HairElement, HairSetup};
pub use owner::{ColliderOwner, ObjectKind, OwnerHandle, OwnerTable, OwnerTag, pack_user_data, unpack_user_data};
pub use ragdoll::{JointKind, RagdollBodySetup, RagdollJointSetup, RagdollSetup};
pub use settings::WorldSettings;
pub use tween::{SectorTween, TweenType};
pub use world::{PhysicsWorld, QueryHit, QuerySource};

pub mod codec;
pub mod config;
pub mod error;
pub mod filter;
pub mod generator;
pub mod node;
pub mod policy_group;
pub mod resource_cache;
pub mod rules;
pub mod subscription;

pub use config::GenerationConfig;
pub use error::{Result, SubgenError};
pub use filter::{Filter, FilterField, Labeled};
pub use generator::{generate, GenerationPlan};
pub use node::{decode_link, CanonicalNode, NodeDecodeError, NodeProtocol, Scheme};
pub use policy_group::{PolicyGroupDescriptor, PolicyGroupKind, PolicyGroupSpec};
pub use resource_cache::{ResourceCache, ResourceSource};
pub use rules::{CanonicalRule, RuleKind, RuleSetConvention, RuleSetResource};
pub use subscription::Subscription;

pub mod ids;
pub mod roadmap;

pub use ids::{CommentId, RoadmapId, UserId, VersionId};
pub use roadmap::{Comment, MetaPatch, RoadmapMeta, RoadmapRecord, Visibility, VersionSummary};

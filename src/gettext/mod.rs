pub mod catalog;
pub mod po;
pub mod resolver;

pub use catalog::{Catalog, Message, MessageKey, SourceReference};
pub use resolver::{
    load_resolutions, save_resolutions, CancelToken, Problem, ProblemKind, Resolution,
    ResolverConfig, UpdateResolver, DEFAULT_AUTO_RESOLVE_SIMILARITY, DEFAULT_MAX_DISSIMILARITY,
};

pub mod config;
pub mod edge;
pub mod error;
pub mod ids;
pub mod node;

pub use config::{Config, ConfigError, EmbeddingConfig, PackageConfig, StorageConfig, WatchConfig};
pub use edge::{Edge, EdgeKey, EdgeMetadata, EdgeType, LineRange, ReferenceContext, TypeUseContext};
pub use error::{CodeGraphError, Result};
pub use ids::{generate_node_id, normalize_path, NodeId, SymbolPath};
pub use node::{
    ClassPayload, FunctionPayload, InterfacePayload, MethodPayload, Node, NodePayload, NodeType,
    Parameter, SyntheticTypePayload, TypeAliasPayload, VariablePayload, Visibility,
};

pub mod config;
pub mod errors;
pub mod metrics;
pub mod oracle;
pub mod path_option;
pub mod results;
pub mod search;
pub mod visited;
pub mod wildcard;

pub use config::{CliOverrides, FinderConfig};
pub use errors::{FindError, FindResult};
pub use metrics::{SearchMetrics, SearchStats};
pub use oracle::{LocalFs, PathKind, PathOracle};
pub use path_option::{find_all, split_path_option, PathFinder};
pub use results::{LookupReport, LookupResult};
pub use search::{CancelToken, FindKind, SearchContext, SearchRequest, StopDirs};
pub use visited::{Identity, VisitedRegistry};
pub use wildcard::{compile, CompiledRoot, Wildcard, WildcardToken};

//! Soft-keyboard decoding core: a bounded-memory beam search over a
//! compressed patricia-trie lexicon, scored by a pluggable spatial/language
//! cost model. Grounded throughout on the AOSP LatinIME native suggest
//! engine (`native/jni/src/suggest/` in the retrieved source pack).
//!
//! [`session::DecodeSession::decode`] is the single entry point; everything
//! else in this module is plumbing it assembles: [`dict_policy::DictPolicy`]
//! (the lexicon), [`proximity::ProximityState`] (the spatial input),
//! [`weighting::Weighting`] (the cost model), [`scoring::Scoring`] (final
//! ranking), and [`node_cache::NodeCache`]/[`node_pool::NodePool`] (the
//! bounded beam frontier).

pub mod bigram_cache;
pub mod config;
pub mod dic_node;
pub mod dict_policy;
pub mod digraph;
pub mod error;
pub mod node_cache;
pub mod node_pool;
pub mod proximity;
pub mod scoring;
pub mod session;
pub mod traversal;
pub mod types;
pub mod weighting;

pub use config::DecoderConfig;
pub use dic_node::DicNode;
pub use dict_policy::{ChildInfo, DictPolicy, HeaderPolicy, MemoryTrieDict, Shortcut, ShortcutsPolicy};
pub use digraph::{Digraph, DigraphTable};
pub use error::DecodeError;
pub use node_cache::NodeCache;
pub use node_pool::{NodePool, PriorityQueue};
pub use proximity::{GestureSample, GridProximityState, Key, KeyGrid, ProximityState, SampledPathProximityState};
pub use scoring::{DefaultScoring, Scoring};
pub use session::{DecodeSession, Suggestion};
pub use types::{CodePoint, ProximityType, SuggestionKind, TriePos};
pub use weighting::{GestureWeighting, TypingWeighting, Weighting};

pub mod align;
pub mod ids;
pub mod node;
pub mod pair;
pub mod prune;
pub mod reconcile;
pub mod state;
pub mod visibility;

pub use align::align;
pub use node::{NodeId, TreeNode, ROOT_ID, ROOT_LINEAR_INDEX};
pub use pair::TurnPair;
pub use prune::{delete_subtree, PruneReport};
pub use reconcile::{reconcile, ReconcileOutcome};
pub use state::{TreeError, TreeState};

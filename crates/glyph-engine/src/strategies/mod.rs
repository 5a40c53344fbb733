//! The built-in detection strategies, one per signal.

mod grammar;
mod hashbang;
mod linguist;
mod modeline;
mod path;
mod signature;
mod usertype;

pub use grammar::GrammarStrategy;
pub use hashbang::HashbangStrategy;
pub use linguist::LinguistStrategy;
pub use modeline::ModelineStrategy;
pub use path::PathStrategy;
pub use signature::SignatureStrategy;
pub use usertype::UsertypeStrategy;

use std::sync::Arc;

use crate::strategy::Strategy;

/// All built-in strategies. Evaluation order is decided by the manager from
/// each strategy's declared priority, not by this list's order.
pub fn default_strategies() -> Vec<Arc<dyn Strategy>> {
    vec![
        Arc::new(SignatureStrategy::new()),
        Arc::new(HashbangStrategy::new()),
        Arc::new(ModelineStrategy::new()),
        Arc::new(LinguistStrategy),
        Arc::new(UsertypeStrategy),
        Arc::new(GrammarStrategy),
        Arc::new(PathStrategy),
    ]
}

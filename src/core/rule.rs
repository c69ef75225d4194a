use crate::core::predicate::Predicate;

/// A (condition, action) pair. A missing condition always matches.
///
/// Generic over the action flavour so the sync and async chains share it.
#[derive(Clone)]
pub struct Rule<A> {
    pub when: Option<Predicate>,
    pub action: A,
}

impl<A> Rule<A> {
    pub fn new(when: Predicate, action: A) -> Self {
        Rule {
            when: Some(when),
            action,
        }
    }

    /// A rule whose action runs whenever the chain reaches it.
    pub fn always(action: A) -> Self {
        Rule { when: None, action }
    }
}

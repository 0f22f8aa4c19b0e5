//! The editor: current state, listeners, and the transactional update loop.
//!
//! # Overview
//!
//! [`Editor`] owns the current [`EditorState`] and is the only path through
//! which the tree is mutated. [`Editor::update`] opens a transaction, runs
//! the caller's body against a working copy, validates every structural
//! invariant, and commits a new immutable snapshot — or aborts leaving the
//! previous snapshot untouched. Exactly one snapshot is produced per
//! successful transaction regardless of how many individual edits occurred
//! inside it.
//!
//! Mutation is only expressible through [`Transaction`], so "mutating
//! outside an open transaction" is unrepresentable; nested edit calls within
//! a body simply apply in call order against the same open transaction.
//! Listener callbacks run synchronously after commit, in registration
//! order; a callback that wants another update defers it through
//! [`UpdateQueue`] and the editor runs it after the notification pass — a
//! listener can never re-enter a commit.

pub mod transaction;

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use tracing::debug;

use crate::error::DocError;
use crate::node::{NodeKey, NodeRegistry};
use crate::state::EditorState;

pub use transaction::Transaction;

/// Handle returned by [`Editor::on_change`], used to unsubscribe.
pub type ListenerId = u64;

type Listener = Box<dyn FnMut(&ChangeEvent<'_>, &mut UpdateQueue)>;
type UpdateFn = Box<dyn FnOnce(&mut Transaction) -> Result<(), DocError>>;

/// Commit notification payload: the previous and new snapshots plus the set
/// of node keys that changed (created, mutated, or destroyed).
#[derive(Debug)]
pub struct ChangeEvent<'a> {
    pub prev: &'a EditorState,
    pub next: &'a EditorState,
    pub changed: &'a BTreeSet<NodeKey>,
}

/// Collects updates requested from inside a listener callback. Queued
/// bodies run as their own transactions after the current notification pass
/// completes.
#[derive(Default)]
pub struct UpdateQueue {
    jobs: Vec<UpdateFn>,
}

impl UpdateQueue {
    pub fn defer<F>(&mut self, body: F)
    where
        F: FnOnce(&mut Transaction) -> Result<(), DocError> + 'static,
    {
        self.jobs.push(Box::new(body));
    }
}

/// A rich-text document editor instance.
///
/// There is no process-wide singleton: every operation acts on the specific
/// editor it is called on.
pub struct Editor {
    state: EditorState,
    registry: NodeRegistry,
    listeners: BTreeMap<ListenerId, Listener>,
    next_listener_id: ListenerId,
}

impl Editor {
    /// An editor over a fresh document (bare root) with an empty registry.
    pub fn new() -> Self {
        Self::with_registry(NodeRegistry::new())
    }

    pub fn with_registry(registry: NodeRegistry) -> Self {
        Self {
            state: EditorState::new(),
            registry,
            listeners: BTreeMap::new(),
            next_listener_id: 1,
        }
    }

    /// The committed snapshot. Never reflects a partially-applied update.
    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    /// Register collaborator node types before editing content that uses
    /// them.
    pub fn registry_mut(&mut self) -> &mut NodeRegistry {
        &mut self.registry
    }

    /// Install a previously produced snapshot (e.g. a deserialized document
    /// or an undo target) as the current state. No listener notification —
    /// this is a state swap, not an edit.
    pub fn replace_state(&mut self, state: EditorState) {
        self.state = state;
    }

    /// Serialize the committed snapshot.
    pub fn export_json(&self) -> Result<String, DocError> {
        crate::codec::to_json(&self.state)
    }

    /// Parse a serialized document and install it as the current state,
    /// resolving registered node types through this editor's registry.
    pub fn load_json(&mut self, text: &str) -> Result<crate::codec::RestoreReport, DocError> {
        let restored = crate::codec::from_json(text, &self.registry)?;
        self.state = restored.state;
        Ok(restored.report)
    }

    /// Subscribe to commit notifications. Listeners fire in registration
    /// order, synchronously, after the new snapshot is fully valid.
    pub fn on_change<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&ChangeEvent<'_>, &mut UpdateQueue) + 'static,
    {
        let id = self.next_listener_id;
        self.next_listener_id = self.next_listener_id.saturating_add(1);
        self.listeners.insert(id, Box::new(listener));
        id
    }

    pub fn off_change(&mut self, listener_id: ListenerId) -> bool {
        self.listeners.remove(&listener_id).is_some()
    }

    /// Run one atomic update.
    ///
    /// The body receives the open [`Transaction`]; every mutation call
    /// applies in call order and later calls see the effects of earlier
    /// ones. On success a single new snapshot is committed and listeners are
    /// notified once. On error — from the body or from validation — the
    /// whole batch is discarded and the previous snapshot stays visible.
    ///
    /// Updates deferred by listeners run afterwards, each as its own
    /// transaction; the first error stops the chain and surfaces here.
    pub fn update<F>(&mut self, body: F) -> Result<(), DocError>
    where
        F: FnOnce(&mut Transaction) -> Result<(), DocError>,
    {
        let mut follow_ups: VecDeque<UpdateFn> = VecDeque::new();
        self.run_transaction(body, &mut follow_ups)?;
        while let Some(job) = follow_ups.pop_front() {
            self.run_transaction(job, &mut follow_ups)?;
        }
        Ok(())
    }

    fn run_transaction<F>(
        &mut self,
        body: F,
        follow_ups: &mut VecDeque<UpdateFn>,
    ) -> Result<(), DocError>
    where
        F: FnOnce(&mut Transaction) -> Result<(), DocError>,
    {
        let mut tx = Transaction::new(&self.state, &self.registry);
        if let Err(err) = body(&mut tx) {
            debug!(error = %err, "update aborted by body");
            return Err(err);
        }
        let outcome = match tx.finish() {
            Ok(outcome) => outcome,
            Err(err) => {
                debug!(error = %err, "update aborted during validation");
                return Err(err);
            }
        };
        let prev = std::mem::replace(&mut self.state, outcome.state);
        debug!(changed = outcome.changed.len(), "update committed");

        let event = ChangeEvent {
            prev: &prev,
            next: &self.state,
            changed: &outcome.changed,
        };
        let mut queue = UpdateQueue::default();
        for listener in self.listeners.values_mut() {
            listener(&event, &mut queue);
        }
        follow_ups.extend(queue.jobs);
        Ok(())
    }
}

impl Default for Editor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::DocNode;
    use crate::selection::Selection;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn empty_update_commits_equal_snapshot_and_notifies_once() {
        let mut editor = Editor::new();
        let count = Rc::new(RefCell::new(0));
        let seen = Rc::clone(&count);
        editor.on_change(move |event, _| {
            *seen.borrow_mut() += 1;
            assert!(event.prev.structurally_equal(event.next));
        });
        let before = editor.state().clone();
        editor.update(|_| Ok(())).unwrap();
        assert_eq!(*count.borrow(), 1);
        assert!(before.structurally_equal(editor.state()));
    }

    #[test]
    fn failed_update_leaves_state_untouched_and_silent() {
        let mut editor = Editor::new();
        let count = Rc::new(RefCell::new(0));
        let seen = Rc::clone(&count);
        editor.on_change(move |_, _| *seen.borrow_mut() += 1);

        let before = editor.state().clone();
        let err = editor.update(|tx| {
            let para = tx.create_paragraph();
            let root = tx.root_key();
            tx.append(root, &[para])?;
            Err(DocError::mutation("caller changed its mind"))
        });
        assert!(err.is_err());
        assert_eq!(*count.borrow(), 0);
        assert_eq!(&before, editor.state());
    }

    #[test]
    fn listener_order_is_registration_order() {
        let mut editor = Editor::new();
        let log: Rc<RefCell<Vec<&'static str>>> = Rc::default();
        let first = Rc::clone(&log);
        let second = Rc::clone(&log);
        editor.on_change(move |_, _| first.borrow_mut().push("first"));
        editor.on_change(move |_, _| second.borrow_mut().push("second"));
        editor.update(|_| Ok(())).unwrap();
        assert_eq!(*log.borrow(), vec!["first", "second"]);
    }

    #[test]
    fn unsubscribed_listener_stops_firing() {
        let mut editor = Editor::new();
        let count = Rc::new(RefCell::new(0));
        let seen = Rc::clone(&count);
        let id = editor.on_change(move |_, _| *seen.borrow_mut() += 1);
        editor.update(|_| Ok(())).unwrap();
        assert!(editor.off_change(id));
        editor.update(|_| Ok(())).unwrap();
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn listener_deferred_update_runs_after_notification_pass() {
        let mut editor = Editor::new();
        let fired = Rc::new(RefCell::new(0));
        let seen = Rc::clone(&fired);
        editor.on_change(move |event, queue| {
            let n = {
                let mut n = seen.borrow_mut();
                *n += 1;
                *n
            };
            // Only the first commit schedules a follow-up, which appends a
            // paragraph as its own transaction.
            if n == 1 {
                assert_eq!(event.next.get(event.next.root_key()).map(|r| r.children().len()), Some(0));
                queue.defer(|tx| {
                    let para = tx.create_paragraph();
                    let root = tx.root_key();
                    tx.append(root, &[para])
                });
            }
        });
        editor.update(|_| Ok(())).unwrap();
        assert_eq!(*fired.borrow(), 2);
        let root = editor.state().root_key();
        let children = editor.state().get(root).map(DocNode::children).map(<[_]>::len);
        assert_eq!(children, Some(1));
    }

    #[test]
    fn commit_reports_changed_keys() {
        let mut editor = Editor::new();
        let changed: Rc<RefCell<usize>> = Rc::default();
        let seen = Rc::clone(&changed);
        editor.on_change(move |event, _| *seen.borrow_mut() = event.changed.len());
        editor
            .update(|tx| {
                let para = tx.create_paragraph();
                let root = tx.root_key();
                tx.append(root, &[para])
            })
            .unwrap();
        // The new paragraph and the root it was attached to.
        assert_eq!(*changed.borrow(), 2);
        assert!(matches!(editor.state().selection(), Selection::None));
    }
}

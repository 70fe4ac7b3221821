use std::collections::HashSet;

use thiserror::Error;
use uuid::Uuid;

/// Incoming list entries that may point at an existing row.
pub trait Identified {
    fn existing_id(&self) -> Option<Uuid>;
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    #[error("{entity} {id} does not belong to this {parent}")]
    UnknownId {
        entity: &'static str,
        parent: &'static str,
        id: Uuid,
    },
    #[error("{entity} {id} appears more than once")]
    DuplicateId { entity: &'static str, id: Uuid },
}

/// What to do to turn the current child list into the incoming one.
///
/// Positions are the indexes in the incoming list.
#[derive(Debug)]
pub struct ReconcilePlan<'a, T> {
    pub remove: Vec<Uuid>,
    pub create: Vec<(usize, &'a T)>,
    pub update: Vec<(usize, Uuid, &'a T)>,
}

impl<'a, T> ReconcilePlan<'a, T> {
    pub fn is_noop(&self) -> bool {
        self.remove.is_empty() && self.create.is_empty() && self.update.is_empty()
    }
}

/// Diffs `incoming` against the ids currently attached to a parent.
///
/// Entries without an id are created, entries whose id is attached are
/// updated, attached ids missing from `incoming` are removed. An id that is
/// not attached to the parent, or appears twice, rejects the whole list.
pub fn reconcile<'a, T: Identified>(
    entity: &'static str,
    parent: &'static str,
    current: &[Uuid],
    incoming: &'a [T],
) -> Result<ReconcilePlan<'a, T>, ReconcileError> {
    let attached: HashSet<Uuid> = current.iter().copied().collect();
    let mut seen = HashSet::new();
    let mut create = Vec::new();
    let mut update = Vec::new();

    for (position, entry) in incoming.iter().enumerate() {
        match entry.existing_id() {
            None => create.push((position, entry)),
            Some(id) => {
                if !attached.contains(&id) {
                    return Err(ReconcileError::UnknownId { entity, parent, id });
                }
                if !seen.insert(id) {
                    return Err(ReconcileError::DuplicateId { entity, id });
                }
                update.push((position, id, entry));
            }
        }
    }

    let remove = current.iter().copied().filter(|id| !seen.contains(id)).collect();

    Ok(ReconcilePlan { remove, create, update })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;

    #[derive(Debug)]
    struct Entry(Option<Uuid>);

    impl Identified for Entry {
        fn existing_id(&self) -> Option<Uuid> {
            self.0
        }
    }

    #[test]
    fn test_plan_splits_remove_create_update() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let incoming = vec![Entry(Some(c)), Entry(None), Entry(Some(a))];

        let plan = reconcile("Exercise", "workout", &[a, b, c], &incoming).unwrap();

        assert_eq!(plan.remove, vec![b]);
        assert_eq!(plan.create.iter().map(|(p, _)| *p).collect::<Vec<_>>(), vec![1]);
        assert_eq!(
            plan.update.iter().map(|(p, id, _)| (*p, *id)).collect::<Vec<_>>(),
            vec![(0, c), (2, a)]
        );
    }

    #[test]
    fn test_empty_incoming_removes_everything() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let plan = reconcile::<Entry>("Item", "session", &[a, b], &[]).unwrap();
        assert_eq!(plan.remove, vec![a, b]);
        assert!(plan.create.is_empty());
    }

    #[test]
    fn test_unknown_id_rejected() {
        let stranger = Uuid::new_v4();
        let incoming = vec![Entry(Some(stranger))];
        let err = reconcile("Item", "exercise session", &[Uuid::new_v4()], &incoming).unwrap_err();
        assert_matches!(err, ReconcileError::UnknownId { id, .. } if id == stranger);
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let a = Uuid::new_v4();
        let incoming = vec![Entry(Some(a)), Entry(Some(a))];
        assert_matches!(
            reconcile("Item", "exercise session", &[a], &incoming),
            Err(ReconcileError::DuplicateId { .. })
        );
    }

    #[test]
    fn test_unchanged_list_is_all_updates() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let incoming = vec![Entry(Some(a)), Entry(Some(b))];
        let plan = reconcile("Item", "exercise session", &[a, b], &incoming).unwrap();
        assert!(plan.remove.is_empty());
        assert!(plan.create.is_empty());
        assert_eq!(plan.update.len(), 2);
        assert!(!plan.is_noop());
    }
}

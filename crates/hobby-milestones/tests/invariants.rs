#![allow(missing_docs, unused_results)]

use hobby_core::{MilestoneId, UserId};
use hobby_milestones::{
    ManualState, MemoryStore, MilestoneCreateParams, MilestoneFilter, MilestoneNode,
    MilestoneService, MilestoneStore,
};
use proptest::prelude::*;

const MAX_DEPTH: u32 = 5;
const EPSILON: f64 = 1e-9;

#[derive(Debug, Clone)]
enum Op {
    /// Add a child under the n-th existing node (or a root when empty).
    Create(usize),
    Complete(usize),
    Incomplete(usize),
    Delete(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => any::<usize>().prop_map(Op::Create),
        2 => any::<usize>().prop_map(Op::Complete),
        2 => any::<usize>().prop_map(Op::Incomplete),
        1 => any::<usize>().prop_map(Op::Delete),
    ]
}

fn pick(ids: &[MilestoneId], n: usize) -> Option<MilestoneId> {
    if ids.is_empty() {
        None
    } else {
        Some(ids[n % ids.len()].clone())
    }
}

fn apply(svc: &MilestoneService<MemoryStore>, owner: &UserId, op: &Op) {
    let ids: Vec<MilestoneId> = svc
        .store()
        .list_nodes(&MilestoneFilter::owned_by(owner))
        .unwrap()
        .into_iter()
        .map(|n| n.id)
        .collect();

    match op {
        Op::Create(n) => {
            // depth rejections are expected and leave the tree untouched
            let _ = svc.create(
                owner,
                MilestoneCreateParams {
                    task: "step".to_string(),
                    parent_id: pick(&ids, *n),
                    ..Default::default()
                },
            );
        }
        Op::Complete(n) => {
            if let Some(id) = pick(&ids, *n) {
                svc.mark_complete(owner, &id).unwrap();
            }
        }
        Op::Incomplete(n) => {
            if let Some(id) = pick(&ids, *n) {
                svc.mark_incomplete(owner, &id).unwrap();
            }
        }
        Op::Delete(n) => {
            if let Some(id) = pick(&ids, *n) {
                svc.delete(owner, &id).unwrap();
            }
        }
    }
}

fn mean(children: &[MilestoneNode]) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let len = children.len() as f64;
    children.iter().map(|c| c.completion_rate).sum::<f64>() / len
}

fn check_node(store: &MemoryStore, node: &MilestoneNode) -> Result<(), TestCaseError> {
    prop_assert!((0.0..=1.0).contains(&node.completion_rate));
    prop_assert!(node.depth <= MAX_DEPTH);

    match &node.parent_id {
        None => {
            prop_assert_eq!(node.depth, 0);
        }
        Some(parent_id) => {
            let parent = store.load_node(parent_id).unwrap();
            prop_assert!(parent.is_some(), "dangling parent link");
            prop_assert_eq!(node.depth, parent.unwrap().depth + 1);
        }
    }

    let children = store.load_children(&node.id).unwrap();
    if children.is_empty() {
        let expected = if node.completed { 1.0 } else { 0.0 };
        prop_assert_eq!(node.completion_rate, expected);
    } else {
        let avg = mean(&children);
        match node.manual_state {
            ManualState::Complete => {
                prop_assert!((avg - 1.0).abs() < EPSILON);
                prop_assert_eq!(node.completion_rate, 1.0);
            }
            ManualState::Incomplete | ManualState::None => {
                prop_assert!((node.completion_rate - avg).abs() < EPSILON);
            }
        }
    }

    match node.manual_state {
        ManualState::Incomplete => {
            prop_assert!(!node.completed);
        }
        _ => {
            prop_assert_eq!(node.completed, node.completion_rate >= 1.0);
        }
    }
    Ok(())
}

proptest! {
    #[test]
    fn tree_stays_consistent(ops in proptest::collection::vec(op(), 1..60)) {
        let svc = MilestoneService::with_max_depth(MemoryStore::new(), MAX_DEPTH);
        let owner = UserId::new();
        for op in &ops {
            apply(&svc, &owner, op);
        }
        for node in svc.store().list_nodes(&MilestoneFilter::default()).unwrap() {
            check_node(svc.store(), &node)?;
        }
    }

    #[test]
    fn complete_cascades_to_whole_subtree(ops in proptest::collection::vec(op(), 1..40), target in any::<usize>()) {
        let svc = MilestoneService::with_max_depth(MemoryStore::new(), MAX_DEPTH);
        let owner = UserId::new();
        for op in &ops {
            apply(&svc, &owner, op);
        }
        let ids: Vec<MilestoneId> = svc
            .store()
            .list_nodes(&MilestoneFilter::owned_by(&owner))
            .unwrap()
            .into_iter()
            .map(|n| n.id)
            .collect();
        if let Some(id) = pick(&ids, target) {
            svc.mark_complete(&owner, &id).unwrap();
            let mut stack = svc.store().load_node(&id).unwrap().unwrap().children;
            while let Some(child_id) = stack.pop() {
                let child = svc.store().load_node(&child_id).unwrap().unwrap();
                prop_assert!(child.completed);
                prop_assert_eq!(child.completion_rate, 1.0);
                prop_assert_eq!(child.manual_state, ManualState::None);
                stack.extend(child.children);
            }
        }
    }
}

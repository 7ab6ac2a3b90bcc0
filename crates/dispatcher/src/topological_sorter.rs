use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use tracing::{debug, warn};

use scheduler_core::{SchedulerError, SchedulerResult};
use scheduler_domain::Task;

/// 可参与依赖排序的条目
///
/// 父条目通过键引用；不在待排序集合中的父条目被视为外部依赖，不影响顺序。
pub trait DependencyEntry {
    type Key: Copy + Eq + Hash + Debug;

    fn key(&self) -> Self::Key;

    fn parent_keys(&self) -> &[Self::Key];
}

impl DependencyEntry for Task {
    type Key = i64;

    fn key(&self) -> i64 {
        self.id
    }

    fn parent_keys(&self) -> &[i64] {
        &self.parents
    }
}

/// 基于入度的分层拓扑排序（Kahn 算法）
///
/// 同一层内的条目按输入顺序输出，因此相同输入总是得到相同结果。
pub struct TopologicalSorter;

impl TopologicalSorter {
    /// 返回按依赖顺序排列的条目引用，父条目总是先于子条目
    pub fn sort<E: DependencyEntry>(entries: Option<&[E]>) -> SchedulerResult<Vec<&E>> {
        let entries = entries
            .ok_or_else(|| SchedulerError::NullArgument("待排序的条目集合".to_string()))?;

        let order = Self::sort_indices(entries)?;
        Ok(order.into_iter().map(|index| &entries[index]).collect())
    }

    /// 返回排序后的输入下标
    pub fn sort_indices<E: DependencyEntry>(entries: &[E]) -> SchedulerResult<Vec<usize>> {
        let count = entries.len();
        if count == 0 {
            return Ok(Vec::new());
        }

        let mut index_of: HashMap<E::Key, usize> = HashMap::with_capacity(count);
        for (index, entry) in entries.iter().enumerate() {
            if index_of.insert(entry.key(), index).is_some() {
                return Err(SchedulerError::InvalidArgument(format!(
                    "重复的条目: {:?}",
                    entry.key()
                )));
            }
        }

        let mut in_degree = vec![0usize; count];
        let mut children: Vec<Vec<usize>> = vec![Vec::new(); count];
        for (index, entry) in entries.iter().enumerate() {
            for parent in entry.parent_keys() {
                if let Some(&parent_index) = index_of.get(parent) {
                    in_degree[index] += 1;
                    children[parent_index].push(index);
                }
            }
        }

        let mut layer: Vec<usize> = (0..count).filter(|&i| in_degree[i] == 0).collect();
        let mut order = Vec::with_capacity(count);

        while !layer.is_empty() {
            let mut next_layer = Vec::new();
            for &node in &layer {
                for &child in &children[node] {
                    in_degree[child] -= 1;
                    if in_degree[child] == 0 {
                        next_layer.push(child);
                    }
                }
            }
            order.append(&mut layer);
            next_layer.sort_unstable();
            layer = next_layer;
        }

        if order.len() < count {
            let remaining = count - order.len();
            warn!("依赖图中存在循环，{} 个条目无法排序", remaining);
            return Err(SchedulerError::CircularDependency { remaining });
        }

        debug!("完成 {} 个条目的拓扑排序", count);
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Node {
        id: u32,
        parents: Vec<u32>,
    }

    impl DependencyEntry for Node {
        type Key = u32;

        fn key(&self) -> u32 {
            self.id
        }

        fn parent_keys(&self) -> &[u32] {
            &self.parents
        }
    }

    fn node(id: u32, parents: &[u32]) -> Node {
        Node {
            id,
            parents: parents.to_vec(),
        }
    }

    fn ids(sorted: Vec<&Node>) -> Vec<u32> {
        sorted.into_iter().map(|n| n.id).collect()
    }

    #[test]
    fn test_independent_entries_keep_input_order() {
        let nodes = vec![node(3, &[]), node(1, &[]), node(2, &[])];
        let sorted = TopologicalSorter::sort(Some(nodes.as_slice())).unwrap();
        assert_eq!(ids(sorted), vec![3, 1, 2]);
    }

    #[test]
    fn test_layers_are_emitted_in_input_order() {
        // 4 -> {2, 3} -> 1
        let nodes = vec![
            node(1, &[2, 3]),
            node(3, &[4]),
            node(2, &[4]),
            node(4, &[]),
        ];
        let sorted = TopologicalSorter::sort(Some(nodes.as_slice())).unwrap();
        assert_eq!(ids(sorted), vec![4, 3, 2, 1]);
    }

    #[test]
    fn test_external_parents_are_ignored() {
        let nodes = vec![node(2, &[1, 99]), node(1, &[100])];
        let sorted = TopologicalSorter::sort(Some(nodes.as_slice())).unwrap();
        assert_eq!(ids(sorted), vec![1, 2]);
    }

    #[test]
    fn test_self_reference_is_a_cycle() {
        let nodes = vec![node(1, &[1])];
        let err = TopologicalSorter::sort(Some(nodes.as_slice())).unwrap_err();
        assert!(matches!(err, SchedulerError::CircularDependency { remaining: 1 }));
    }

    #[test]
    fn test_duplicate_keys_are_rejected() {
        let nodes = vec![node(1, &[]), node(1, &[])];
        let err = TopologicalSorter::sort(Some(nodes.as_slice())).unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidArgument(_)));
    }

    #[test]
    fn test_repeated_parent_reference() {
        let nodes = vec![node(2, &[1, 1]), node(1, &[])];
        let sorted = TopologicalSorter::sort(Some(nodes.as_slice())).unwrap();
        assert_eq!(ids(sorted), vec![1, 2]);
    }
}

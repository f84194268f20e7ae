//! Property-based tests comparing the tree against a flat `Vec` model.

use proptest::prelude::*;
use tinted::Edge;
use tinted::Tree;

const COLORS: usize = 3;
const ALL: u8 = 0b111;

/// One element of the model: (color slot, value).
type Model = Vec<(usize, u32)>;

// =============================================================================
// Test helpers
// =============================================================================

#[derive(Clone, Debug)]
enum Op {
    Add { pos_pct: f64, mask: u8, slot: usize, value: u32, count: usize },
    Remove { pos_pct: f64, len_pct: f64, mask: u8 },
    Set { pos_pct: f64, len_pct: f64, mask: u8, slot: usize, value: u32 },
    Recolor { pos_pct: f64, slot: usize },
}

fn arbitrary_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        // Few distinct values, so runs merge often.
        4 => (0.0..=1.0f64, 1u8..8, 0..COLORS, 0u32..3, 1usize..5)
            .prop_map(|(pos_pct, mask, slot, value, count)| Op::Add { pos_pct, mask, slot, value, count }),
        2 => (0.0..1.0f64, 0.0..=0.5f64, 1u8..8)
            .prop_map(|(pos_pct, len_pct, mask)| Op::Remove { pos_pct, len_pct, mask }),
        1 => (0.0..1.0f64, 0.0..=0.3f64, 1u8..8, 0..COLORS, 0u32..3)
            .prop_map(|(pos_pct, len_pct, mask, slot, value)| Op::Set { pos_pct, len_pct, mask, slot, value }),
        1 => (0.0..1.0f64, 0..COLORS)
            .prop_map(|(pos_pct, slot)| Op::Recolor { pos_pct, slot }),
    ]
}

fn in_mask(slot: usize, mask: u8) -> bool {
    return mask & (1 << slot) != 0;
}

/// Positions in the model of the elements whose color is in `mask`.
fn positions(model: &Model, mask: u8) -> Vec<usize> {
    return model
        .iter()
        .enumerate()
        .filter(|(_, (slot, _))| in_mask(*slot, mask))
        .map(|(position, _)| position)
        .collect();
}

/// Pick `[index, index + count)` inside a color space of `size` elements.
fn pick_range(size: usize, pos_pct: f64, len_pct: f64) -> (usize, usize) {
    let index = ((pos_pct * size as f64) as usize).min(size - 1);
    let max = size - index;
    let count = ((len_pct * max as f64) as usize).clamp(1, max);
    return (index, count);
}

fn apply(tree: &mut Tree<u32>, model: &mut Model, op: &Op) {
    match *op {
        Op::Add { pos_pct, mask, slot, value, count } => {
            let at = positions(model, mask);
            let index = ((pos_pct * (at.len() + 1) as f64) as usize).min(at.len());
            tree.add(index, mask, 1 << slot, Some(value), count).unwrap();
            // The leftmost gap with `index` mask elements before it.
            let position = if index == 0 { 0 } else { at[index - 1] + 1 };
            for _ in 0..count {
                model.insert(position, (slot, value));
            }
        }
        Op::Remove { pos_pct, len_pct, mask } => {
            let at = positions(model, mask);
            if at.is_empty() {
                return;
            }
            let (index, count) = pick_range(at.len(), pos_pct, len_pct);
            tree.remove(index, mask, count).unwrap();
            for &position in at[index..index + count].iter().rev() {
                model.remove(position);
            }
        }
        Op::Set { pos_pct, len_pct, mask, slot, value } => {
            let at = positions(model, mask);
            if at.is_empty() {
                return;
            }
            let (index, count) = pick_range(at.len(), pos_pct, len_pct);
            tree.set(index, mask, 1 << slot, Some(value), count).unwrap();
            let first = at[index];
            for &position in at[index..index + count].iter().rev() {
                model.remove(position);
            }
            for _ in 0..count {
                model.insert(first, (slot, value));
            }
        }
        Op::Recolor { pos_pct, slot } => {
            if model.is_empty() {
                return;
            }
            let index = ((pos_pct * model.len() as f64) as usize).min(model.len() - 1);
            let (node, offset) = tree.locate(index, ALL).unwrap();
            let (id, start, count) = (node.id(), index - offset, node.count());
            tree.set_color(id, 1 << slot).unwrap();
            for element in &mut model[start..start + count] {
                element.0 = slot;
            }
        }
    }
}

fn expand(tree: &Tree<u32>) -> Model {
    let mut result = Vec::new();
    for node in tree.iter(ALL) {
        let slot = node.color().trailing_zeros() as usize;
        let value = *node.value().unwrap();
        for _ in 0..node.count() {
            result.push((slot, value));
        }
    }
    return result;
}

fn build(ops: &[Op]) -> (Tree<u32>, Model) {
    let mut tree = Tree::with_color_count(COLORS).unwrap();
    let mut model = Vec::new();
    for op in ops {
        apply(&mut tree, &mut model, op);
    }
    return (tree, model);
}

// =============================================================================
// Positional properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// After every operation the tree expands to the model and is valid.
    #[test]
    fn matches_vec_model(ops in prop::collection::vec(arbitrary_op(), 1..60)) {
        let mut tree = Tree::with_color_count(COLORS).unwrap();
        let mut model = Vec::new();
        for op in &ops {
            apply(&mut tree, &mut model, op);
            prop_assert_eq!(tree.validate(), Ok(()));
            prop_assert_eq!(expand(&tree), model.clone());
        }
    }

    /// size(mask) counts exactly the model's elements of that mask.
    #[test]
    fn sizes_match(ops in prop::collection::vec(arbitrary_op(), 0..40)) {
        let (tree, model) = build(&ops);
        for mask in 0u8..8 {
            prop_assert_eq!(tree.size(mask), positions(&model, mask).len());
        }
    }

    /// get and index_of agree with the model in every color space.
    #[test]
    fn get_and_index_of(ops in prop::collection::vec(arbitrary_op(), 1..40)) {
        let (tree, model) = build(&ops);
        for mask in 1u8..8 {
            for (index, &position) in positions(&model, mask).iter().enumerate() {
                let (node, offset) = tree.locate(index, mask).unwrap();
                prop_assert_eq!(node.value(), Some(&model[position].1));
                prop_assert_eq!(tree.index_of(node.id(), mask), Ok(index - offset));
            }
            let size = tree.size(mask);
            prop_assert!(tree.get(size, mask).unwrap_err().is_out_of_range());
        }
    }

    /// Converting into another space and back lands on the same element.
    #[test]
    fn conversion_round_trip(ops in prop::collection::vec(arbitrary_op(), 1..40), from in 1u8..8) {
        let (tree, model) = build(&ops);
        let from_positions = positions(&model, from);
        for (index, &position) in from_positions.iter().enumerate() {
            let all = tree.convert_index_color(index, from, ALL, false).unwrap();
            prop_assert_eq!(all, Some(position));
            prop_assert_eq!(tree.convert_index_color(position, ALL, from, false), Ok(Some(index)));
            for to in 1u8..8 {
                let before = positions(&model, to).iter().filter(|&&p| p < position).count();
                let converted = tree.convert_index_color(index, from, to, true).unwrap();
                prop_assert_eq!(converted, Some(before));
                let exact = tree.convert_index_color(index, from, to, false).unwrap();
                if in_mask(model[position].0, to) {
                    prop_assert_eq!(exact, Some(before));
                } else {
                    prop_assert_eq!(exact, None);
                }
            }
        }
    }

    /// A cursor walking one color space visits the model's elements in order.
    #[test]
    fn cursor_walks_color_space(ops in prop::collection::vec(arbitrary_op(), 1..40), mask in 1u8..8) {
        let (tree, model) = build(&ops);
        let expected: Vec<u32> = positions(&model, mask).iter().map(|&p| model[p].1).collect();
        let mut cursor = tree.cursor();
        let mut forward = Vec::new();
        while let Some(node) = cursor.next(mask) {
            prop_assert_eq!(cursor.index(mask), Some(forward.len()));
            forward.push(*node.value().unwrap());
        }
        prop_assert_eq!(&forward, &expected);
        let mut backward = Vec::new();
        if !forward.is_empty() {
            backward.push(forward[forward.len() - 1]);
        }
        while let Some(node) = cursor.previous(mask) {
            backward.push(*node.value().unwrap());
        }
        backward.reverse();
        prop_assert_eq!(backward, expected);
    }
}

// =============================================================================
// Sorted-order properties
// =============================================================================

#[derive(Clone, Debug)]
enum SortedOp {
    Insert { slot: usize, value: u32, count: usize },
    /// An out-of-order element placed by position and excluded from sorting.
    Park { pos_pct: f64, value: u32 },
}

fn arbitrary_sorted_op() -> impl Strategy<Value = SortedOp> {
    prop_oneof![
        4 => (0..COLORS, 0u32..20, 1usize..3)
            .prop_map(|(slot, value, count)| SortedOp::Insert { slot, value, count }),
        1 => (0.0..=1.0f64, 1000u32..1010)
            .prop_map(|(pos_pct, value)| SortedOp::Park { pos_pct, value }),
    ]
}

/// (value, sorted) of every element, runs expanded.
fn sorted_elements(tree: &Tree<u32>, colors: u8) -> Vec<(u32, bool)> {
    let mut result = Vec::new();
    for node in tree.iter(colors) {
        for _ in 0..node.count() {
            result.push((*node.value().unwrap(), node.is_sorted()));
        }
    }
    return result;
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Sorted elements stay in order however unsorted ones are interleaved,
    /// and index_of_value agrees with a linear scan.
    #[test]
    fn sorted_order_is_maintained(
        ops in prop::collection::vec(arbitrary_sorted_op(), 1..60),
        target in 0u32..21,
    ) {
        let mut tree = Tree::with_comparator(
            &tinted::ColorCoder::<usize>::new(0..COLORS).unwrap(),
            |a: &u32, b: &u32| a.cmp(b),
        );
        for op in &ops {
            match *op {
                SortedOp::Insert { slot, value, count } => {
                    tree.add_in_sorted_order(ALL, 1 << slot, value, count).unwrap();
                }
                SortedOp::Park { pos_pct, value } => {
                    let size = tree.size(ALL);
                    let index = ((pos_pct * (size + 1) as f64) as usize).min(size);
                    let id = tree.add(index, ALL, 1, Some(value), 1).unwrap();
                    tree.set_sorted(id, false).unwrap();
                }
            }
        }
        prop_assert_eq!(tree.validate(), Ok(()));

        let elements = sorted_elements(&tree, ALL);
        let sorted: Vec<u32> = elements.iter().filter(|(_, s)| *s).map(|(v, _)| *v).collect();
        prop_assert!(sorted.windows(2).all(|w| w[0] <= w[1]));

        let considered = |(v, s): &(u32, bool)| *s && *v < 1000;
        let first = elements.iter().position(|e| considered(e) && e.0 == target);
        let last = elements.iter().rposition(|e| considered(e) && e.0 == target);
        prop_assert_eq!(tree.index_of_value(&target, Edge::First, false, ALL), Ok(first));
        prop_assert_eq!(tree.index_of_value(&target, Edge::Last, false, ALL), Ok(last));

        let after_last_at_most = elements
            .iter()
            .rposition(|e| considered(e) && e.0 <= target)
            .map_or(0, |p| p + 1);
        if first.is_none() {
            // A miss predicts the index the value will actually land on.
            prop_assert_eq!(
                tree.index_of_value(&target, Edge::First, true, ALL),
                Ok(Some(after_last_at_most))
            );
            prop_assert_eq!(
                tree.index_of_value(&target, Edge::Last, true, ALL),
                Ok(Some(after_last_at_most))
            );
            let id = tree.add_in_sorted_order(ALL, 1, target, 1).unwrap();
            prop_assert_eq!(tree.index_of(id, ALL), Ok(after_last_at_most));
        }
    }

    /// Inserting with a one-color mask keeps that color's elements sorted
    /// while ignoring the order of the rest.
    #[test]
    fn per_color_order(values in prop::collection::vec((0..COLORS, 0u32..50), 1..60)) {
        let mut tree: Tree<u32> = Tree::with_comparator(
            &tinted::ColorCoder::<usize>::new(0..COLORS).unwrap(),
            |a: &u32, b: &u32| a.cmp(b),
        );
        for &(slot, value) in &values {
            tree.add_in_sorted_order(1 << slot, 1 << slot, value, 1).unwrap();
        }
        for slot in 0..COLORS {
            let mut expected: Vec<u32> = values.iter().filter(|(s, _)| *s == slot).map(|(_, v)| *v).collect();
            expected.sort();
            let actual: Vec<u32> = tree.values(1 << slot).map(|v| *v.unwrap()).collect();
            prop_assert_eq!(actual, expected);
        }
        prop_assert_eq!(tree.validate(), Ok(()));
    }
}

/// Split pending items into batches of at most `batch_size`, preserving
/// order. A size of zero is treated as one; the last batch may be short.
pub fn partition<T>(items: Vec<T>, batch_size: usize) -> Vec<Vec<T>> {
    let batch_size = batch_size.max(1);
    let mut batches = Vec::with_capacity(items.len().div_ceil(batch_size));
    let mut current = Vec::with_capacity(batch_size);
    for item in items {
        current.push(item);
        if current.len() == batch_size {
            batches.push(std::mem::replace(&mut current, Vec::with_capacity(batch_size)));
        }
    }
    if !current.is_empty() {
        batches.push(current);
    }
    batches
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partitions_preserve_order_and_size() {
        let batches = partition(vec![1, 2, 3, 4, 5], 2);
        assert_eq!(batches, vec![vec![1, 2], vec![3, 4], vec![5]]);
    }

    #[test]
    fn exact_multiple_has_no_trailing_batch() {
        let batches = partition(vec![1, 2, 3, 4], 2);
        assert_eq!(batches.len(), 2);
    }

    #[test]
    fn zero_size_falls_back_to_one() {
        let batches = partition(vec![1, 2], 0);
        assert_eq!(batches, vec![vec![1], vec![2]]);
    }

    #[test]
    fn empty_input_yields_no_batches() {
        let batches: Vec<Vec<u8>> = partition(Vec::new(), 3);
        assert!(batches.is_empty());
    }
}

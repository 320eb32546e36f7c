//! Aggregation: sort everything that arrived and join it into one string

use hashline_core::{Stage, StageContext, StageError};

/// Joins sorted segments of the combined result
pub const SEPARATOR: &str = "_";

/// Terminal stage emitting exactly one combined string.
///
/// A full barrier: nothing is emitted until the input closes.
#[derive(Debug, Default)]
pub struct CombineResults;

/// Sort lexicographically and join with [`SEPARATOR`].
pub fn combine(mut values: Vec<String>) -> String {
    values.sort_unstable();
    values.join(SEPARATOR)
}

impl Stage<String, String> for CombineResults {
    fn name(&self) -> &'static str {
        "combine"
    }

    async fn run(self, ctx: StageContext<String, String>) -> Result<(), StageError> {
        let values = ctx.input.collect().await?;
        log::debug!("combine: {} segments", values.len());
        ctx.output.send(combine(values)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::Feed;
    use hashline_core::Pipeline;

    #[test]
    fn sorts_before_joining() {
        let v = vec!["b".to_string(), "c".to_string(), "a".to_string()];
        assert_eq!(combine(v), "a_b_c");
    }

    #[test]
    fn empty_is_empty_string() {
        assert_eq!(combine(Vec::new()), "");
    }

    #[test]
    fn keeps_duplicates() {
        let v = vec!["2".to_string(), "1".to_string(), "2".to_string()];
        assert_eq!(combine(v), "1_2_2");
    }

    #[test]
    fn byte_order_not_numeric() {
        let v = vec!["9".to_string(), "10".to_string()];
        assert_eq!(combine(v), "10_9");
    }

    #[tokio::test]
    async fn arrival_order_does_not_matter() {
        let a = ["x", "b", "m", "a"];
        let mut results = Vec::new();
        for perm in [[0, 1, 2, 3], [3, 2, 1, 0], [2, 0, 3, 1]] {
            let items: Vec<String> = perm.iter().map(|&i| a[i].to_string()).collect();
            let run = Pipeline::new()
                .stage(Feed::new(items))
                .stage(CombineResults)
                .run()
                .await
                .unwrap();
            assert_eq!(run.items.len(), 1);
            results.push(run.items.into_iter().next().unwrap());
        }
        assert!(results.iter().all(|r| r == "a_b_m_x"));
    }

    #[tokio::test]
    async fn emits_once_for_empty_stream() {
        let run = Pipeline::new()
            .stage(Feed::<String>::new(Vec::new()))
            .stage(CombineResults)
            .run()
            .await
            .unwrap();
        assert_eq!(run.items, vec![String::new()]);
    }
}

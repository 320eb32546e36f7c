//! Source stage feeding a finite sequence into the chain

use hashline_core::{Stage, StageContext, StageError};

/// Emits a fixed list of items, in order, after the placeholder head closes.
pub struct Feed<T> {
    items: Vec<T>,
}

impl<T> Feed<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self { items }
    }
}

impl<T: Send + 'static> Stage<(), T> for Feed<T> {
    fn name(&self) -> &'static str {
        "feed"
    }

    async fn run(self, ctx: StageContext<(), T>) -> Result<(), StageError> {
        ctx.input.drain().await?;
        for item in self.items {
            ctx.output.send(item).await?;
        }
        Ok(())
    }
}

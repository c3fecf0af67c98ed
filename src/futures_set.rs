use std::{future::Future, num::NonZeroUsize};

use tokio::task::JoinSet;
use tracing::Instrument;

use crate::error::Error;

/// Spawns `tasks` with at most `capacity` running at once and folds their
/// outputs on the calling task in completion order. Tasks run inside the
/// caller's span.
///
/// The first failing task, join error or fold error aborts everything still
/// in flight and is returned.
pub async fn try_fold_bounded<Tasks, Output, Accumulator, FoldWith>(
    tasks: Tasks,
    capacity: NonZeroUsize,
    mut accumulator: Accumulator,
    mut fold_with: FoldWith,
) -> Result<Accumulator, Error>
where
    Tasks: IntoIterator,
    Tasks::Item: Future<Output = Result<Output, Error>> + Send + 'static,
    Output: Send + 'static,
    FoldWith: FnMut(Accumulator, Output) -> Result<Accumulator, Error>,
{
    let mut pending = tasks.into_iter().fuse();
    let mut set: JoinSet<_> = (&mut pending)
        .take(capacity.get())
        .map(Instrument::in_current_span)
        .collect();

    while let Some(result) = set.join_next().await {
        let folded = match result {
            Ok(Ok(output)) => fold_with(accumulator, output),
            Ok(Err(error)) => Err(error),
            Err(error) => Err(Error::from(error)),
        };

        accumulator = match folded {
            Ok(accumulator) => accumulator,
            Err(error) => {
                set.abort_all();
                return Err(error);
            },
        };

        if let Some(task) = pending.next() {
            set.spawn(task.in_current_span());
        }
    }

    Ok(accumulator)
}

use tracing::{debug, info};

use crate::{
    error::Error,
    provider::Client,
    types::{sequence_of, Block, Crossing, HeightTime},
};

/// Tracks the hour bucket of consecutive blocks and reports the heights at
/// which it changes.
#[derive(Debug, Clone)]
pub struct CrossingDetector {
    sequence: Option<u64>,
    previous_height: u64,
    block_times: Vec<HeightTime>,
}

impl CrossingDetector {
    /// `sequence` is the bucket already processed before `start`, if known.
    /// Without it the first observed block is a crossing.
    pub fn new(start: u64, sequence: Option<u64>) -> Self {
        CrossingDetector {
            sequence,
            previous_height: start,
            block_times: vec![],
        }
    }

    /// Blocks must be observed in strictly ascending height order.
    pub fn observe(&mut self, block: &Block) -> Option<Crossing> {
        if block.height > self.previous_height {
            self.block_times.push(HeightTime {
                height: block.height,
                time: block.time,
            });
        }

        let sequence = sequence_of(&block.time);
        if self.sequence == Some(sequence) {
            return None;
        }

        let crossing = Crossing {
            height: block.height,
            sequence,
            previous_height: self.previous_height,
            block_times: std::mem::take(&mut self.block_times),
        };

        self.sequence = Some(sequence);
        self.previous_height = block.height;

        Some(crossing)
    }
}

/// Walks `start..=end` and returns every sequence crossing in height order.
pub async fn walk(
    client: &dyn Client,
    start: u64,
    end: u64,
    sequence: Option<u64>,
) -> Result<Vec<Crossing>, Error> {
    let mut detector = CrossingDetector::new(start, sequence);
    let mut crossings = vec![];

    for height in start..=end {
        let block = client.get_block(height).await?;

        if let Some(crossing) = detector.observe(&block) {
            info!(
                "sequence {} starts at height {}",
                crossing.sequence, crossing.height
            );
            crossings.push(crossing);
        }

        debug!("walked height {}", height);
    }

    Ok(crossings)
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;

    use super::*;

    fn block(height: u64, seconds: i64) -> Block {
        Block {
            height,
            hash: String::new(),
            time: DateTime::from_timestamp(seconds, 0).unwrap(),
        }
    }

    #[test]
    fn one_crossing_per_boundary() {
        let mut detector = CrossingDetector::new(100, Some(1));

        let crossings = [
            block(100, 3600 + 3500),
            block(101, 3600 + 3590),
            block(102, 7200 + 4),
            block(103, 7200 + 10),
            block(104, 10800),
            block(105, 10801),
        ]
        .iter()
        .filter_map(|block| detector.observe(block))
        .collect::<Vec<_>>();

        assert_eq!(crossings.len(), 2);

        assert_eq!(crossings[0].height, 102);
        assert_eq!(crossings[0].sequence, 2);
        assert_eq!(crossings[0].previous_height, 100);
        assert_eq!(
            crossings[0]
                .block_times
                .iter()
                .map(|item| item.height)
                .collect::<Vec<_>>(),
            vec![101, 102]
        );

        assert_eq!(crossings[1].height, 104);
        assert_eq!(crossings[1].sequence, 3);
        assert_eq!(crossings[1].previous_height, 102);
        assert_eq!(crossings[1].block_times.len(), 2);
        assert_eq!(
            crossings[1].time_of(104),
            DateTime::from_timestamp(10800, 0)
        );
    }

    #[test]
    fn unknown_sequence_makes_first_block_a_crossing() {
        let mut detector = CrossingDetector::new(50, None);

        let first = detector.observe(&block(50, 3600)).unwrap();
        assert_eq!(first.height, 50);
        assert_eq!(first.previous_height, 50);
        assert!(first.block_times.is_empty());

        assert!(detector.observe(&block(51, 3601)).is_none());
    }
}
